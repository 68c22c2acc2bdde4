//! Keepalive probing for a live connection.
//!
//! Idle proxies and NATs silently drop connections that neither side has
//! closed; a periodic application-level ping keeps the path warm. This is
//! a best-effort keepalive only, not a failure detector: missed pongs are
//! never counted and never force a reconnect — transport-level close and
//! error events alone drive recovery.

use std::sync::Weak;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::manager::ConnectionManager;

/// Run keepalive pings until cancelled.
///
/// At each `interval` tick a ping message is pushed through the manager's
/// send path. Ticks while the connection is not open send nothing. The
/// task also ends when the manager itself is gone.
pub(crate) async fn run_heartbeat(
    manager: Weak<ConnectionManager>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    // The first tick fires immediately; the connection just opened, so
    // skip it.
    let _ = ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(manager) = manager.upgrade() else {
                    return;
                };
                manager.heartbeat_tick();
                trace!("heartbeat tick");
            }
            () = cancel.cancelled() => {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::RealtimeConfig;
    use crate::manager::tests::manager_with_scripted_transport;

    #[tokio::test]
    async fn cancelled_heartbeat_stops() {
        let (manager, _script) = manager_with_scripted_transport(RealtimeConfig::default());
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        let handle = tokio::spawn(run_heartbeat(
            Arc::downgrade(&manager),
            Duration::from_secs(60),
            cancel2,
        ));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn heartbeat_ends_when_manager_dropped() {
        let (manager, _script) = manager_with_scripted_transport(RealtimeConfig::default());
        let weak = Arc::downgrade(&manager);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_heartbeat(
            weak,
            Duration::from_millis(5),
            cancel,
        ));

        drop(manager);
        handle.await.unwrap();
    }
}
