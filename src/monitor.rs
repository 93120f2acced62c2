//! # Monitor
//!
//! Live readout of the handset, one line per poll, with the keyboard left
//! alone. Useful for checking the button layout and deadzones of a new
//! handset before binding it to keys.

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::bridge::{interrupted, StopReason};
use crate::controller::{ControllerSnapshot, ControllerSource};

/// Prints every snapshot until Ctrl+C or until the handset is lost.
pub async fn monitor<C: ControllerSource>(source: &mut C, poll_interval: Duration) -> StopReason {
    monitor_until(source, poll_interval, interrupted(), |snapshot| {
        info!("{}", snapshot);
    })
    .await
}

/// Hands every snapshot to `report` until `stop` completes or the source
/// disconnects, then closes the source.
pub async fn monitor_until<C, F, R>(
    source: &mut C,
    poll_interval: Duration,
    stop: F,
    mut report: R,
) -> StopReason
where
    C: ControllerSource,
    F: Future<Output = ()>,
    R: FnMut(&ControllerSnapshot),
{
    info!("Monitoring {}", source.describe());

    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(stop);

    let reason = loop {
        tokio::select! {
            _ = &mut stop => break StopReason::Interrupted,

            _ = ticker.tick() => {
                match source.poll().await {
                    Some(snapshot) => report(&snapshot),
                    None if !source.is_connected() => {
                        error!("[!!!] CONTROLLER DISCONNECTED [!!!]");
                        break StopReason::Disconnected;
                    }
                    None => {}
                }
            }
        }
    };

    source.close();
    reason
}
