pub mod condition;
pub mod throttle;

pub use condition::{
    ConditionEvaluation, ConditionState, ConditionTrackers, SustainedConditionTracker,
};
pub use throttle::{AlertThrottle, ThrottleState};
