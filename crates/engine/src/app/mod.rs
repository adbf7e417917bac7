mod input;
mod loop_runner;
mod metrics;

pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{
    run_headless, run_headless_with_metrics, AppError, InputSource, LoopConfig, LoopSummary,
    SLOW_TICK_ENV_VAR,
};
pub use metrics::{MetricsHandle, TickMetrics};
