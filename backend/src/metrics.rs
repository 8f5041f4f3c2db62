use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Process-wide counters. Built once in `main` and shared by `Arc`.
#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    connections_opened: AtomicU64,
    connections_rejected: AtomicU64,
    connections_closed: AtomicU64,
    frames_received: AtomicU64,
    moves_applied: AtomicU64,
    errors_sent: AtomicU64,
    games_finished: AtomicU64,
    settlement_failures: AtomicU64,
    liveness_failures: AtomicU64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub connections_opened: u64,
    pub connections_rejected: u64,
    pub connections_closed: u64,
    pub frames_received: u64,
    pub moves_applied: u64,
    pub errors_sent: u64,
    pub games_finished: u64,
    pub settlement_failures: u64,
    pub liveness_failures: u64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            connections_opened: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            moves_applied: AtomicU64::new(0),
            errors_sent: AtomicU64::new(0),
            games_finished: AtomicU64::new(0),
            settlement_failures: AtomicU64::new(0),
            liveness_failures: AtomicU64::new(0),
        }
    }

    counter! {
        connection_opened => connections_opened,
        connection_rejected => connections_rejected,
        connection_closed => connections_closed,
        frame_received => frames_received,
        move_applied => moves_applied,
        error_sent => errors_sent,
        game_finished => games_finished,
        settlement_failed => settlement_failures,
        liveness_failed => liveness_failures,
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        MetricsSnapshot {
            uptime_seconds: self.started.elapsed().as_secs(),
            connections_opened: load(&self.connections_opened),
            connections_rejected: load(&self.connections_rejected),
            connections_closed: load(&self.connections_closed),
            frames_received: load(&self.frames_received),
            moves_applied: load(&self.moves_applied),
            errors_sent: load(&self.errors_sent),
            games_finished: load(&self.games_finished),
            settlement_failures: load(&self.settlement_failures),
            liveness_failures: load(&self.liveness_failures),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
