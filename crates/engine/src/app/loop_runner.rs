use std::env;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::combat::CombatTransition;
use crate::config::ConfigError;
use crate::entity::EntityError;
use crate::grid::MapLoadError;
use crate::world::World;
use crate::StartupError;

use super::metrics::IntervalCounter;
use super::{InputSnapshot, MetricsHandle};

pub const SLOW_TICK_ENV_VAR: &str = "ISO_SLOW_TICK_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    /// Stop after this many ticks. `None` runs until the input source quits.
    pub max_ticks: Option<u64>,
    pub paced: bool,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_tick_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks: Some(600),
            paced: false,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_tick_ms: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load map: {0}")]
    MapLoad(#[from] MapLoadError),
    #[error("failed to load config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to set up scene: {0}")]
    SceneSetup(#[from] EntityError),
    #[error("scene has no entities to simulate")]
    EmptyScene,
    #[error("headless loop has neither a tick limit nor an input source that can quit")]
    Unbounded,
}

pub trait InputSource {
    fn next_input(&mut self, world: &World) -> InputSnapshot;

    /// Whether this source ever emits `InputAction::Quit`.
    fn can_quit(&self) -> bool {
        false
    }
}

impl<F> InputSource for F
where
    F: FnMut(&World) -> InputSnapshot,
{
    fn next_input(&mut self, world: &World) -> InputSnapshot {
        self(world)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks_run: u64,
    pub quit_requested: bool,
    pub combats_started: u32,
    pub arrivals: u64,
}

pub fn run_headless(
    config: LoopConfig,
    world: &mut World,
    input_source: &mut dyn InputSource,
) -> Result<LoopSummary, AppError> {
    run_headless_with_metrics(config, world, input_source, MetricsHandle::default())
}

pub fn run_headless_with_metrics(
    config: LoopConfig,
    world: &mut World,
    input_source: &mut dyn InputSource,
    metrics_handle: MetricsHandle,
) -> Result<LoopSummary, AppError> {
    if world.entities().is_empty() {
        return Err(AppError::EmptyScene);
    }
    if config.max_ticks.is_none() && !input_source.can_quit() {
        return Err(AppError::Unbounded);
    }

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let slow_tick_delay = resolve_slow_tick_delay(config.simulated_slow_tick_ms);
    info!(
        target_tps,
        max_ticks = config.max_ticks.unwrap_or(u64::MAX),
        paced = config.paced,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_tick_delay_ms = slow_tick_delay.as_millis() as u64,
        entity_count = world.entities().len(),
        "loop_config"
    );

    let mut summary = LoopSummary::default();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut interval_counter = IntervalCounter::new(metrics_log_interval, Instant::now());

    'frames: while config
        .max_ticks
        .map_or(true, |limit| summary.ticks_run < limit)
    {
        let ticks_to_run = if config.paced {
            let now = Instant::now();
            let frame_dt = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;
            accumulator = accumulator.saturating_add(clamp_frame_delta(frame_dt, max_frame_delta));

            let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
            accumulator = step_plan.remaining_accumulator;
            if step_plan.dropped_backlog > Duration::ZERO {
                warn!(
                    dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                    max_ticks_per_frame, "sim_clamp_triggered"
                );
            }
            if step_plan.ticks_to_run == 0 {
                thread::sleep(fixed_dt.saturating_sub(accumulator));
                continue;
            }
            step_plan.ticks_to_run
        } else {
            1
        };

        for _ in 0..ticks_to_run {
            if config
                .max_ticks
                .is_some_and(|limit| summary.ticks_run >= limit)
            {
                break 'frames;
            }
            let input = input_source.next_input(world);
            if input.quit_requested() {
                summary.quit_requested = true;
                info!(reason = "input_quit", tick = world.tick_count(), "shutdown_requested");
                break 'frames;
            }

            if slow_tick_delay > Duration::ZERO {
                // Explicit debug perturbation only.
                thread::sleep(slow_tick_delay);
            }
            let tick_start = Instant::now();
            let report = world.tick(&input);
            interval_counter.record(&report, world.combat().is_active(), tick_start.elapsed());

            summary.ticks_run += 1;
            summary.arrivals += report.arrivals.len() as u64;
            if matches!(report.combat, Some(CombatTransition::Started { .. })) {
                summary.combats_started += 1;
            }
        }

        if let Some(metrics) = interval_counter.flush(Instant::now()) {
            metrics_handle.publish(metrics);
            info!(
                tps = metrics.tps,
                mean_tick_ms = metrics.mean_tick_ms,
                worst_tick_ms = metrics.worst_tick_ms,
                arrivals = metrics.arrivals,
                blocked_steps = metrics.blocked_steps,
                combat_ticks = metrics.combat_ticks,
                turn_handoffs = metrics.turn_handoffs,
                entity_count = world.entities().len(),
                tick = world.tick_count(),
                in_combat = world.combat().is_active(),
                "loop_metrics"
            );
        }
    }

    info!(
        ticks_run = summary.ticks_run,
        combats_started = summary.combats_started,
        arrivals = summary.arrivals,
        "shutdown"
    );
    Ok(summary)
}

struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn resolve_slow_tick_delay(config_slow_tick_ms: u64) -> Duration {
    match env::var(SLOW_TICK_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_TICK_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-tick env var value; falling back to config"
                );
                Duration::from_millis(config_slow_tick_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_tick_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_TICK_ENV_VAR,
                error = %err,
                "unable to read slow-tick env var; falling back to config"
            );
            Duration::from_millis(config_slow_tick_ms)
        }
    }
}
