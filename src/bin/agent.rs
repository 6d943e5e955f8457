use anyhow::Context;
use clap::Parser;
use host_monitoring::{
    alerts::AlertDispatcher,
    config::{Config, read_config_file},
    exporter::PrometheusExporter,
    notify::AlertTransport,
    poll::PollLoop,
    secrets::transport_credential,
    sources::SystemMetricSource,
    util::HostIdentity,
};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Samples host health, serves it as gauges and alerts on sustained breaches")]
struct Args {
    /// Config file (JSON); built-in defaults are used when omitted
    #[arg(short, long)]
    file: Option<String>,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new()
        .with_targets(vec![
            ("host_monitoring", LevelFilter::TRACE),
            ("host_agent", LevelFilter::TRACE),
        ])
        .with_default(LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    };

    let credential = transport_credential(&config).await?;
    let notifier = AlertTransport::from_config(&config.alert, credential);

    let identity = HostIdentity::resolve();
    info!("monitoring {} ({})", identity.hostname, identity.ip);

    let exporter = PrometheusExporter::new();
    exporter
        .spawn(config.exporter.bind_addr)
        .await
        .context("failed to start metrics endpoint")?;

    let dispatcher = AlertDispatcher::from_config(&config, identity);
    let source = SystemMetricSource::new(config.probe.timeout());

    PollLoop::new(&config, dispatcher, source, exporter, notifier)
        .run()
        .await;

    Ok(())
}
