use crate::game::error::close_code;
use crate::game::messages::Outbound;
use crate::game::registry::{Connection, PlayerRegistry};
use crate::metrics::Metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Invoked for every connection that fails its liveness check
pub trait DisconnectCallback: Send + Sync + 'static {
    fn on_disconnect(&self, match_id: &str, user_id: &str);
}

impl<F> DisconnectCallback for F
where
    F: Fn(&str, &str) + Send + Sync + 'static,
{
    fn on_disconnect(&self, match_id: &str, user_id: &str) {
        self(match_id, user_id)
    }
}

/// Periodically pings registered sockets and drops the ones that stopped answering
pub struct ConnectionMonitor {
    players: Arc<PlayerRegistry>,
    metrics: Arc<Metrics>,
    interval: Duration,
    timeout: Duration,
}

impl ConnectionMonitor {
    pub fn new(
        players: Arc<PlayerRegistry>,
        metrics: Arc<Metrics>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            players,
            metrics,
            interval,
            timeout,
        }
    }

    pub fn spawn(self: Arc<Self>, on_failure: Arc<dyn DisconnectCallback>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval = ?self.interval, "Connection monitor started");
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let dropped = self.sweep(on_failure.as_ref());
                if dropped > 0 {
                    info!(dropped, "Liveness sweep removed connections");
                }
            }
        })
    }

    /// One pass over every registered connection. Returns how many were dropped.
    pub fn sweep(&self, on_failure: &dyn DisconnectCallback) -> usize {
        let now = Instant::now();
        let removed = self.players.sweep(|conn| self.check(conn, now));

        for conn in &removed {
            warn!(
                match_id = conn.match_id,
                user_id = conn.user_id,
                connected_at = %conn.connected_at,
                "Connection failed liveness check"
            );
            conn.send(Outbound::Close {
                code: close_code::GOING_AWAY,
                reason: "liveness check failed".to_string(),
            });
            self.metrics.liveness_failed();
            on_failure.on_disconnect(&conn.match_id, &conn.user_id);
        }

        removed.len()
    }

    fn check(&self, conn: &mut Connection, now: Instant) -> bool {
        if !conn.is_alive() || now.duration_since(conn.last_activity) > self.timeout {
            conn.healthy = false;
            return false;
        }

        let probe_due = conn
            .last_probe
            .is_none_or(|at| now.duration_since(at) >= self.interval);
        if probe_due {
            if !conn.send(Outbound::Ping) {
                conn.healthy = false;
                return false;
            }
            debug!(match_id = conn.match_id, user_id = conn.user_id, "Sent liveness probe");
            conn.last_probe = Some(now);
        }

        true
    }
}
