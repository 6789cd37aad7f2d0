use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::SpritzClient;

/// Well inside the server's two-minute online window.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Background heartbeat task. Dropping the handle stops it.
pub struct HeartbeatHandle {
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    pub fn stop(self) {}

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Post a presence heartbeat for `address` now and then every
/// [`HEARTBEAT_INTERVAL`]. Failures are logged and retried on the next tick.
pub fn spawn_heartbeat(client: SpritzClient, address: String, status: Option<String>) -> HeartbeatHandle {
    spawn_heartbeat_every(client, address, status, HEARTBEAT_INTERVAL)
}

pub fn spawn_heartbeat_every(
    client: SpritzClient,
    address: String,
    status: Option<String>,
    period: Duration,
) -> HeartbeatHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match client.heartbeat(&address, status.as_deref()).await {
                Ok(()) => debug!("Heartbeat sent for {}", address),
                Err(e) => warn!("Heartbeat for {} failed: {}", address, e),
            }
        }
    });
    HeartbeatHandle { task }
}
