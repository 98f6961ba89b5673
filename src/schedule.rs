//! Daily schedule trigger for unattended sends.
//!
//! A [`Scheduler`] is either idle or armed with exactly one timer task.
//! Arming computes the next wall-clock [`DailyTime`], sleeps until it, runs
//! the job, and repeats daily. Re-arming cancels the previous timer first
//! (last call wins), and dropping the scheduler disarms it so no timer
//! outlives its owner.

use anyhow::{bail, Result};
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::cache;
use crate::config::{parse_schedule_time, Config};
use crate::contacts::ContactBook;
use crate::dispatch::run_dispatch;
use crate::models::Contact;
use crate::report::{Event, EventReporter, ReportMode};
use crate::whatsapp::WhatsappClient;

/// A validated daily wall-clock firing time (24-hour clock).
///
/// Constructing one is the only way to hand a firing time to the scheduler,
/// so out-of-range values are rejected before any timer math runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DailyTime {
    hour: u32,
    minute: u32,
}

impl DailyTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            bail!("daily time out of range: {:02}:{:02}", hour, minute);
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }
}

impl std::fmt::Display for DailyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Owns the recurring timer. At most one timer exists at any instant.
#[derive(Default)]
pub struct Scheduler {
    timer: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Arms the daily timer at the given wall-clock time. An existing timer
    /// is cancelled first, so repeated calls are idempotent re-arms.
    /// Firing runs `job` once; it neither re-arms nor disarms.
    pub fn arm<F, Fut>(&mut self, time: DailyTime, job: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.disarm();
        self.timer = Some(tokio::spawn(async move {
            loop {
                let wait = duration_until_next(chrono::Local::now().naive_local(), time);
                tokio::time::sleep(wait).await;
                job().await;
            }
        }));
    }

    /// Cancels the timer if armed. Returns false ("nothing to stop") when
    /// already idle.
    pub fn disarm(&mut self) -> bool {
        match self.timer.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Next daily firing at `time` strictly after `now`: today if the time is
/// still ahead, otherwise tomorrow.
pub fn next_fire_after(now: NaiveDateTime, time: DailyTime) -> NaiveDateTime {
    let candidate = now
        .date()
        .and_hms_opt(time.hour, time.minute, 0)
        .expect("DailyTime is range-checked at construction");
    if candidate > now {
        candidate
    } else {
        candidate + ChronoDuration::days(1)
    }
}

fn duration_until_next(now: NaiveDateTime, time: DailyTime) -> Duration {
    (next_fire_after(now, time) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// One scheduled firing: reload the contact cache (the list may have been
/// re-imported since arming) and dispatch with the send filter. All outcomes
/// travel through the reporter so `--progress json` stays a clean stream.
async fn run_scheduled_send(
    config: &Config,
    ad_hoc_days: Option<i64>,
    reporter: &dyn EventReporter,
) {
    let result = async {
        let book = ContactBook::new(cache::load_contacts(&config.cache.path)?);
        let selected: Vec<Contact> = book
            .for_dispatch(config.send.days, ad_hoc_days)
            .into_iter()
            .cloned()
            .collect();
        if selected.is_empty() {
            reporter.report(Event::ScheduledRunSkipped);
            return Ok(());
        }
        let client = WhatsappClient::new(&config.whatsapp)?;
        run_dispatch(&selected, config, &client, reporter).await?;
        Ok::<_, anyhow::Error>(())
    }
    .await;

    // A failed scheduled run must not kill the timer; the next day fires again.
    if let Err(e) = result {
        reporter.report(Event::ScheduledRunFailed {
            error: format!("{:#}", e),
        });
    }
}

/// `followup schedule`: arm the timer at the configured time and run until
/// Ctrl-C, then disarm before exiting.
pub async fn run_schedule(config: &Config, ad_hoc_days: Option<i64>, mode: ReportMode) -> Result<()> {
    let (hour, minute) = parse_schedule_time(&config.schedule.time)?;
    let time = DailyTime::new(hour, minute)?;

    let mut scheduler = Scheduler::new();
    let job_config = config.clone();
    scheduler.arm(time, move || {
        let config = job_config.clone();
        async move {
            let reporter = mode.reporter();
            run_scheduled_send(&config, ad_hoc_days, reporter.as_ref()).await;
        }
    });

    let next = next_fire_after(chrono::Local::now().naive_local(), time);
    println!(
        "schedule armed: daily at {} (next fire {})",
        time,
        next.format("%Y-%m-%d %H:%M")
    );
    println!("press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    scheduler.disarm();
    println!("schedule disarmed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn daily(h: u32, m: u32) -> DailyTime {
        DailyTime::new(h, m).unwrap()
    }

    #[test]
    fn daily_time_rejects_out_of_range() {
        assert!(DailyTime::new(24, 0).is_err());
        assert!(DailyTime::new(8, 60).is_err());
        assert!(DailyTime::new(23, 59).is_ok());
        assert!(DailyTime::new(0, 0).is_ok());
    }

    #[test]
    fn next_fire_today_when_time_is_ahead() {
        let next = next_fire_after(at(7, 30, 0), daily(8, 0));
        assert_eq!(next, at(8, 0, 0));
    }

    #[test]
    fn next_fire_tomorrow_when_time_has_passed() {
        let next = next_fire_after(at(9, 0, 0), daily(8, 0));
        assert_eq!(
            next,
            NaiveDate::from_ymd_opt(2024, 6, 16)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn firing_instant_rolls_to_tomorrow() {
        // waking exactly at HH:MM must schedule the next fire a day out,
        // never a zero-length sleep loop
        let next = next_fire_after(at(8, 0, 0), daily(8, 0));
        assert_eq!(
            next,
            NaiveDate::from_ymd_opt(2024, 6, 16)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn duration_until_next_is_positive() {
        let wait = duration_until_next(at(7, 59, 59), daily(8, 0));
        assert_eq!(wait, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn armed_timer_fires_daily() {
        let fires = Arc::new(AtomicU32::new(0));
        let fires_clone = fires.clone();
        let mut scheduler = Scheduler::new();
        scheduler.arm(daily(8, 0), move || {
            let fires = fires_clone.clone();
            async move {
                fires.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert!(scheduler.is_armed());

        // two day-lengths of paused time must produce at least two fires
        tokio::time::sleep(Duration::from_secs(60 * 60 * 24 * 2 + 60)).await;
        tokio::task::yield_now().await;
        assert!(fires.load(Ordering::SeqCst) >= 2);
        scheduler.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_cancels_previous_timer() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let mut scheduler = Scheduler::new();

        let first_clone = first.clone();
        scheduler.arm(daily(8, 0), move || {
            let first = first_clone.clone();
            async move {
                first.fetch_add(1, Ordering::SeqCst);
            }
        });
        let second_clone = second.clone();
        scheduler.arm(daily(9, 0), move || {
            let second = second_clone.clone();
            async move {
                second.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(60 * 60 * 24 + 60)).await;
        tokio::task::yield_now().await;
        assert_eq!(first.load(Ordering::SeqCst), 0, "old timer must be dead");
        assert!(second.load(Ordering::SeqCst) >= 1);
        scheduler.disarm();
    }

    #[tokio::test]
    async fn disarm_when_idle_reports_nothing_to_stop() {
        let mut scheduler = Scheduler::new();
        assert!(!scheduler.is_armed());
        assert!(!scheduler.disarm());
    }

    #[tokio::test]
    async fn disarm_after_arm_reports_stopped() {
        let mut scheduler = Scheduler::new();
        scheduler.arm(daily(8, 0), || async {});
        assert!(scheduler.is_armed());
        assert!(scheduler.disarm());
        assert!(!scheduler.is_armed());
    }

    /// Records which events reach the reporter, by tag.
    struct Collector {
        events: Mutex<Vec<&'static str>>,
    }

    impl Collector {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    impl EventReporter for Collector {
        fn report(&self, event: Event) {
            let tag = match event {
                Event::ScheduledRunSkipped => "skipped",
                Event::ScheduledRunFailed { .. } => "failed",
                _ => "other",
            };
            self.events.lock().unwrap().push(tag);
        }
    }

    #[tokio::test]
    async fn scheduled_run_without_matching_contacts_reports_skip() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config: Config = toml::from_str("").unwrap();
        config.cache.path = tmp.path().join("contacts.json");

        let collector = Collector::new();
        run_scheduled_send(&config, None, &collector).await;
        assert_eq!(*collector.events.lock().unwrap(), vec!["skipped"]);
    }

    #[tokio::test]
    async fn scheduled_run_failure_is_reported_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config: Config = toml::from_str("").unwrap();
        config.cache.path = tmp.path().join("contacts.json");
        std::fs::write(&config.cache.path, "{not json").unwrap();

        let collector = Collector::new();
        run_scheduled_send(&config, None, &collector).await;
        assert_eq!(*collector.events.lock().unwrap(), vec!["failed"]);
    }
}
