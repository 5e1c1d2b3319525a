use chrono::{DateTime, NaiveTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use crate::config::SchedulerSettings;
use crate::services::engine::MatchingEngine;

/// Next time `hour:00` UTC strictly after `now`
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();

    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Run `job` every day at `hour:00` UTC until `cancel` is triggered
///
/// A job already in progress is allowed to finish before the loop exits.
pub fn spawn_daily<F, Fut>(
    name: &'static str,
    hour: u32,
    cancel: CancellationToken,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, hour);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);

            tracing::info!("Next {} run at {}", name, next);

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Stopping {} job", name);
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    job().await;
                }
            }
        }
    })
}

/// Start the daily match refresh and SLA expiry jobs
pub fn start(
    engine: MatchingEngine,
    settings: &SchedulerSettings,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    if !settings.enabled {
        tracing::info!("Scheduler disabled");
        return Vec::new();
    }

    let refresh_engine = engine.clone();
    let refresh = spawn_daily("match refresh", settings.refresh_hour_utc, cancel.clone(), move || {
        let engine = refresh_engine.clone();
        async move {
            if let Err(e) = engine.refresh_active_projects().await {
                tracing::error!("Match refresh aborted: {}", e);
            }
        }
    });

    let sla = spawn_daily("SLA expiry check", settings.sla_check_hour_utc, cancel, move || {
        let engine = engine.clone();
        async move {
            if let Err(e) = engine.flag_expired_slas().await {
                tracing::error!("SLA expiry check failed: {}", e);
            }
        }
    });

    vec![refresh, sla]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 1, 30, 0).unwrap();
        let next = next_run_after(now, 2);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
        let next = next_run_after(now, 2);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 2, 2, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_job_stops_without_running() {
        let runs = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let counter = runs.clone();
        let handle = spawn_daily("test", 2, cancel.clone(), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        });

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("job loop should exit after cancellation")
            .unwrap();

        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disabled_scheduler_spawns_nothing() {
        let engine = MatchingEngine::new(
            std::sync::Arc::new(crate::services::MemoryStore::new()),
            crate::core::Matcher::default(),
        );
        let settings = SchedulerSettings {
            enabled: false,
            ..Default::default()
        };

        assert!(start(engine, &settings, CancellationToken::new()).is_empty());
    }

    #[test]
    fn test_next_run_crosses_month() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 0).unwrap();
        let next = next_run_after(now, 3);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 2, 1, 3, 0, 0).unwrap());
    }
}
