// Daily sweep that surfaces upcoming contract expirations in the logs.
// The UI polls the expirations endpoint; this sweep exists so overdue
// contracts show up even when nobody has the page open.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{error, info, warn};

use super::tracker::LeaseTracker;

pub struct ExpirationSweep {
    tracker: Arc<LeaseTracker>,
    /// UTC hour of day to run (0-23)
    execution_hour: u32,
}

impl ExpirationSweep {
    pub fn new(tracker: Arc<LeaseTracker>, execution_hour: u32) -> Self {
        Self { tracker, execution_hour }
    }

    /// Start the sweep in the background.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = Self::calculate_next_execution(now, self.execution_hour);
                let wait = next.signed_duration_since(now);
                if wait.num_seconds() > 0 {
                    info!("next expiration sweep scheduled for {} UTC", next.format("%Y-%m-%d %H:%M"));
                    tokio::time::sleep(Duration::from_secs(wait.num_seconds() as u64)).await;
                }

                match self.tracker.upcoming_expirations(None).await {
                    Ok(alerts) => {
                        for alert in &alerts {
                            if alert.already_expired {
                                warn!(
                                    contract_id = %alert.contract_id,
                                    days_overdue = -alert.days_remaining,
                                    "contract past end date but still active"
                                );
                            }
                        }
                        info!("expiration sweep completed: {} alert(s)", alerts.len());
                    }
                    Err(e) => error!("expiration sweep failed: {:?}", e),
                }
            }
        })
    }

    /// Next run at `execution_hour` UTC, today if still ahead, else tomorrow.
    fn calculate_next_execution(now: DateTime<Utc>, execution_hour: u32) -> DateTime<Utc> {
        let today = now
            .date_naive()
            .and_hms_opt(execution_hour, 0, 0)
            .unwrap_or_else(|| now.date_naive().and_hms_opt(0, 0, 0).unwrap());
        let today_dt = Utc.from_utc_datetime(&today);

        if today_dt <= now {
            let tomorrow = (now.date_naive() + chrono::Duration::days(1))
                .and_hms_opt(execution_hour, 0, 0)
                .unwrap_or_else(|| now.date_naive().and_hms_opt(0, 0, 0).unwrap());
            Utc.from_utc_datetime(&tomorrow)
        } else {
            today_dt
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_calculate_next_execution() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

        // Later today
        let next = ExpirationSweep::calculate_next_execution(now, 14);
        assert_eq!(next.hour(), 14);
        assert_eq!(next.day(), 1);

        // Already passed, so tomorrow
        let next = ExpirationSweep::calculate_next_execution(now, 6);
        assert_eq!(next.hour(), 6);
        assert_eq!(next.day(), 2);
    }
}
