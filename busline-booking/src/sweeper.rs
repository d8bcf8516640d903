use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use busline_store::app_config::BookingRules;

use crate::ledger::BookingLedger;

/// Longest hold the sweeper honours: one hundred years.
const MAX_HOLD_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

fn hold_ttl(rules: &BookingRules) -> Option<chrono::Duration> {
    let secs = rules.hold_ttl_seconds?;
    if secs > MAX_HOLD_TTL_SECONDS {
        warn!(
            "hold_ttl_seconds {} is out of range, clamping to {}",
            secs, MAX_HOLD_TTL_SECONDS
        );
    }
    Some(chrono::Duration::seconds(secs.min(MAX_HOLD_TTL_SECONDS) as i64))
}

/// Starts the background task that cancels unpaid bookings older than
/// `hold_ttl_seconds`. Returns `None` when holds never expire.
pub fn spawn_hold_sweeper(ledger: Arc<BookingLedger>, rules: &BookingRules) -> Option<JoinHandle<()>> {
    let ttl = hold_ttl(rules)?;
    let period = Duration::from_secs(rules.sweep_interval_seconds.max(1));

    info!("Hold sweeper started: ttl {}s, every {}s", ttl.num_seconds(), period.as_secs());

    Some(tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match ledger.expire_holds(Utc::now() - ttl).await {
                Ok(0) => {}
                Ok(n) => info!("Expired {} unpaid bookings", n),
                Err(e) => error!("Hold sweep failed: {}", e),
            }
        }
    }))
}
