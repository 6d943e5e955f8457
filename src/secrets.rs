//! Credential retrieval for notification transports
//!
//! Consulted once during startup. Any failure here is fatal: the agent never enters
//! the poll loop without its transport credentials.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::{Alert, Config, SecretsConfig};

const VAULT_ADDR: &str = "VAULT_ADDR";
const VAULT_TOKEN: &str = "VAULT_TOKEN";
const DEFAULT_VAULT_ADDR: &str = "http://127.0.0.1:8200";

/// Upper bound on a single secret store request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Key/value pairs stored under one secret path
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
    fields: HashMap<String, String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Credential {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Result<&str, SecretError> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| SecretError::MissingField(name.to_string()))
    }
}

#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_credential(&self, path: &str) -> Result<Credential, SecretError>;
}

#[derive(Debug)]
pub enum SecretError {
    /// The secret store could not be reached
    Request(reqwest::Error),

    /// Non-success HTTP status from the secret store
    Status(u16),

    /// The secret exists but lacks the requested field
    MissingField(String),

    /// A required environment variable is not set
    MissingEnv(String),

    /// Response body was not the expected shape
    Decode(String),
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretError::Request(err) => write!(f, "secret store request failed: {}", err),
            SecretError::Status(status) => {
                write!(f, "secret store responded with status: {}", status)
            }
            SecretError::MissingField(field) => write!(f, "secret has no field `{}`", field),
            SecretError::MissingEnv(var) => {
                write!(f, "environment variable `{}` is not set", var)
            }
            SecretError::Decode(msg) => write!(f, "invalid secret payload: {}", msg),
        }
    }
}

impl std::error::Error for SecretError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SecretError::Request(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SecretError {
    fn from(err: reqwest::Error) -> Self {
        SecretError::Request(err)
    }
}

/// Reads KV v2 secrets over Vault's HTTP API.
#[derive(Clone)]
pub struct VaultSecretProvider {
    client: Client,
    addr: String,
    token: String,
    timeout: Duration,
}

impl fmt::Debug for VaultSecretProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSecretProvider")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

impl VaultSecretProvider {
    pub fn new(addr: &str, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            addr: addr.trim_end_matches('/').to_string(),
            token: token.into(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SecretProvider for VaultSecretProvider {
    #[instrument(skip(self))]
    async fn get_credential(&self, path: &str) -> Result<Credential, SecretError> {
        let url = format!("{}/v1/{}", self.addr, path.trim_start_matches('/'));
        debug!("reading secret from {url}");

        let response = self
            .client
            .get(&url)
            .header("X-Vault-Token", &self.token)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SecretError::Status(response.status().as_u16()));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SecretError::Decode(e.to_string()))?;

        let Some(data) = body.pointer("/data/data").and_then(Value::as_object) else {
            return Err(SecretError::Decode("missing `data.data` object".to_string()));
        };

        let fields = data
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect();

        Ok(Credential::new(fields))
    }
}

/// Serves one credential field from an environment variable, ignoring the path.
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    var: String,
    field: String,
}

impl EnvSecretProvider {
    pub fn new(var: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            field: field.into(),
        }
    }
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn get_credential(&self, _path: &str) -> Result<Credential, SecretError> {
        let value =
            std::env::var(&self.var).map_err(|_| SecretError::MissingEnv(self.var.clone()))?;
        Ok(Credential::new(HashMap::from([(self.field.clone(), value)])))
    }
}

/// The secret backend selected by configuration
#[derive(Debug, Clone)]
pub enum SecretBackend {
    Vault(VaultSecretProvider),
    Env(EnvSecretProvider),
}

impl SecretBackend {
    /// `field` names the credential field the env backend should answer with.
    pub fn from_config(config: &SecretsConfig, field: &str) -> Result<Self, SecretError> {
        match config {
            SecretsConfig::Vault { addr, token } => {
                let addr = addr
                    .clone()
                    .or_else(|| std::env::var(VAULT_ADDR).ok())
                    .unwrap_or_else(|| DEFAULT_VAULT_ADDR.to_string());
                let token = match token {
                    Some(token) => token.clone(),
                    None => std::env::var(VAULT_TOKEN)
                        .map_err(|_| SecretError::MissingEnv(VAULT_TOKEN.to_string()))?,
                };
                Ok(SecretBackend::Vault(VaultSecretProvider::new(&addr, token)))
            }
            SecretsConfig::Env { var } => {
                Ok(SecretBackend::Env(EnvSecretProvider::new(var.as_str(), field)))
            }
        }
    }
}

#[async_trait]
impl SecretProvider for SecretBackend {
    async fn get_credential(&self, path: &str) -> Result<Credential, SecretError> {
        match self {
            SecretBackend::Vault(vault) => vault.get_credential(path).await,
            SecretBackend::Env(env) => env.get_credential(path).await,
        }
    }
}

/// Fetch the credential the configured transport needs, if any.
///
/// Only Slack needs one. Every failure is returned so startup can abort.
pub async fn transport_credential(config: &Config) -> anyhow::Result<Option<String>> {
    let Alert::Slack(slack) = &config.alert else {
        return Ok(None);
    };

    let secrets = SecretBackend::from_config(&config.secrets, &slack.secret_field)
        .context("failed to set up secret backend")?;
    let credential = secrets
        .get_credential(&slack.secret_path)
        .await
        .with_context(|| format!("failed to read secret {}", slack.secret_path))?;
    let token = credential.field(&slack.secret_field)?.to_string();

    debug!("loaded Slack credential from {}", slack.secret_path);
    Ok(Some(token))
}
