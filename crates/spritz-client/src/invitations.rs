use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use spritz_types::models::GroupInvitationView;

use crate::SpritzClient;

pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Polls pending group invitations for one wallet and publishes the latest
/// list on a watch channel. Receivers only wake when the set of invitation
/// ids changes.
pub struct InvitationPoller {
    rx: watch::Receiver<Vec<GroupInvitationView>>,
    task: JoinHandle<()>,
}

impl InvitationPoller {
    pub fn spawn(client: SpritzClient, address: String) -> Self {
        Self::spawn_every(client, address, POLL_INTERVAL)
    }

    pub fn spawn_every(client: SpritzClient, address: String, period: Duration) -> Self {
        let (tx, rx) = watch::channel(Vec::new());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                match client.group_invitations(&address).await {
                    Ok(resp) => {
                        let changed = tx.send_if_modified(|current| replace_if_changed(current, resp.invitations));
                        if changed {
                            debug!("Pending invitations for {} changed", address);
                        }
                    }
                    Err(e) => warn!("Invitation poll for {} failed: {}", address, e),
                }
            }
        });

        Self { rx, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<GroupInvitationView>> {
        self.rx.clone()
    }

    /// The most recently fetched invitations.
    pub fn current(&self) -> Vec<GroupInvitationView> {
        self.rx.borrow().clone()
    }

    pub fn stop(self) {}
}

impl Drop for InvitationPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn replace_if_changed(current: &mut Vec<GroupInvitationView>, next: Vec<GroupInvitationView>) -> bool {
    let same = current.len() == next.len() && current.iter().zip(&next).all(|(a, b)| a.id == b.id);
    if same {
        return false;
    }
    *current = next;
    true
}
