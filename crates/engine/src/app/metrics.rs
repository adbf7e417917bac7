use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::combat::TurnEvent;
use crate::world::TickReport;

/// Simulation activity over one reporting interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickMetrics {
    pub tps: f32,
    pub mean_tick_ms: f32,
    pub worst_tick_ms: f32,
    pub arrivals: u32,
    pub blocked_steps: u32,
    pub combat_ticks: u32,
    pub turn_handoffs: u32,
}

#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<TickMetrics>>,
}

impl MetricsHandle {
    pub fn latest(&self) -> TickMetrics {
        *self.latest.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, metrics: TickMetrics) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = metrics;
    }
}

#[derive(Debug)]
pub(crate) struct IntervalCounter {
    started: Instant,
    interval: Duration,
    ticks: u32,
    busy: Duration,
    worst: Duration,
    arrivals: u32,
    blocked_steps: u32,
    combat_ticks: u32,
    turn_handoffs: u32,
}

impl IntervalCounter {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            started: now,
            interval,
            ticks: 0,
            busy: Duration::ZERO,
            worst: Duration::ZERO,
            arrivals: 0,
            blocked_steps: 0,
            combat_ticks: 0,
            turn_handoffs: 0,
        }
    }

    pub(crate) fn record(&mut self, report: &TickReport, in_combat: bool, elapsed: Duration) {
        self.ticks = self.ticks.saturating_add(1);
        self.busy = self.busy.saturating_add(elapsed);
        self.worst = self.worst.max(elapsed);
        self.arrivals = self.arrivals.saturating_add(report.arrivals.len() as u32);
        self.blocked_steps = self.blocked_steps.saturating_add(report.blocked.len() as u32);
        if in_combat {
            self.combat_ticks = self.combat_ticks.saturating_add(1);
        }
        if matches!(report.turn, Some(TurnEvent::Ended { .. })) {
            self.turn_handoffs = self.turn_handoffs.saturating_add(1);
        }
    }

    pub(crate) fn flush(&mut self, now: Instant) -> Option<TickMetrics> {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.interval {
            return None;
        }

        let mean_tick_ms = if self.ticks == 0 {
            0.0
        } else {
            self.busy.as_secs_f32() * 1000.0 / self.ticks as f32
        };
        let metrics = TickMetrics {
            tps: self.ticks as f32 / elapsed.as_secs_f32().max(f32::EPSILON),
            mean_tick_ms,
            worst_tick_ms: self.worst.as_secs_f32() * 1000.0,
            arrivals: self.arrivals,
            blocked_steps: self.blocked_steps,
            combat_ticks: self.combat_ticks,
            turn_handoffs: self.turn_handoffs,
        };
        *self = Self::new(self.interval, now);
        Some(metrics)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::entity::EntityId;
    use crate::grid::TileCoord;

    fn report_with(arrivals: usize, blocked: usize, turn: Option<TurnEvent>) -> TickReport {
        TickReport {
            arrivals: (0..arrivals)
                .map(|index| (EntityId(index), TileCoord::new(index as i32, 0)))
                .collect(),
            blocked: (0..blocked).map(EntityId).collect(),
            turn,
            ..TickReport::default()
        }
    }

    #[test]
    fn interval_counts_simulation_events() {
        let base = Instant::now();
        let mut counter = IntervalCounter::new(Duration::from_secs(1), base);
        counter.record(&report_with(2, 0, None), false, Duration::from_millis(1));
        counter.record(&report_with(0, 1, None), true, Duration::from_millis(3));
        let handoff = TurnEvent::Ended {
            previous: EntityId(0),
            next: EntityId(1),
        };
        counter.record(&report_with(1, 0, Some(handoff)), true, Duration::from_millis(2));

        let metrics = counter
            .flush(base + Duration::from_secs(1))
            .expect("interval elapsed");
        assert!((metrics.tps - 3.0).abs() < 0.05);
        assert!((metrics.mean_tick_ms - 2.0).abs() < 0.001);
        assert!((metrics.worst_tick_ms - 3.0).abs() < 0.001);
        assert_eq!(metrics.arrivals, 3);
        assert_eq!(metrics.blocked_steps, 1);
        assert_eq!(metrics.combat_ticks, 2);
        assert_eq!(metrics.turn_handoffs, 1);
    }

    #[test]
    fn flush_waits_for_the_interval_then_starts_fresh() {
        let base = Instant::now();
        let mut counter = IntervalCounter::new(Duration::from_secs(1), base);
        counter.record(&report_with(1, 0, None), false, Duration::from_millis(1));
        assert!(counter.flush(base + Duration::from_millis(500)).is_none());

        let first = counter.flush(base + Duration::from_secs(1)).expect("first");
        assert_eq!(first.arrivals, 1);
        let second = counter.flush(base + Duration::from_secs(2)).expect("second");
        assert_eq!(second.arrivals, 0);
        assert_eq!(second.tps, 0.0);
    }

    #[test]
    fn poisoned_handle_still_publishes() {
        let handle = MetricsHandle::default();
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = handle.latest.write().expect("write guard");
                    panic!("poison metrics lock");
                })
                .join();
        });

        let metrics = TickMetrics {
            arrivals: 4,
            ..TickMetrics::default()
        };
        handle.publish(metrics);
        assert_eq!(handle.latest(), metrics);
    }
}
