use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, NaiveTime};
use tracing::Instrument;

/// Daily trigger: start preparing `lead` before `post_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    post_time: NaiveTime,
    lead: chrono::Duration,
    start: NaiveTime,
}

impl ScheduleEntry {
    pub fn new(post_time: NaiveTime, lead_minutes: u32) -> Self {
        let lead = chrono::Duration::minutes(lead_minutes as i64);
        let (start, _) = post_time.overflowing_sub_signed(lead);
        Self { post_time, lead, start }
    }

    pub fn post_time(&self) -> NaiveTime {
        self.post_time
    }

    pub fn lead_minutes(&self) -> i64 {
        self.lead.num_minutes()
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start
    }

    /// The post time an attempt begun at `started` aims for: the first
    /// occurrence of `post_time` at or after `started - lead`.
    pub fn post_target(&self, started: NaiveDateTime) -> NaiveDateTime {
        let anchor = started - self.lead;
        let target = anchor.date().and_time(self.post_time);
        if target < anchor {
            target + chrono::Duration::days(1)
        } else {
            target
        }
    }

    /// Today's start if it is still ahead of `now`, tomorrow's otherwise.
    pub fn next_run_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.start);
        if now < today {
            today
        } else {
            today + chrono::Duration::days(1)
        }
    }
}

#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> anyhow::Result<()>;
}

/// Single-job poll loop. A run is never overlapped by another; whatever the
/// job returns, the trigger is rearmed for the next day.
pub struct Scheduler {
    entry: ScheduleEntry,
    job: Box<dyn ScheduledJob>,
    next_run: NaiveDateTime,
}

impl Scheduler {
    pub fn new(entry: ScheduleEntry, job: Box<dyn ScheduledJob>, now: NaiveDateTime) -> Self {
        let next_run = entry.next_run_after(now);
        tracing::info!(
            "Post time {}, preparing {} minutes earlier at {}; next run {}",
            entry.post_time().format("%H:%M"),
            entry.lead_minutes(),
            entry.start_time().format("%H:%M"),
            next_run
        );
        Self { entry, job, next_run }
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    /// Runs the job if its trigger has passed. Returns whether it ran.
    pub async fn run_pending(&mut self, now: NaiveDateTime) -> bool {
        if now < self.next_run {
            return false;
        }
        self.run_now().await;
        self.next_run = self.entry.next_run_after(now);
        tracing::info!("Next run scheduled for {}", self.next_run);
        true
    }

    /// Runs the job once, outside the daily trigger.
    pub async fn run_now(&self) {
        let span = tracing::span!(tracing::Level::INFO, "scheduled_run", job = self.job.name());
        async {
            tracing::info!("Running {}", self.job.name());
            match self.job.run().await {
                Ok(()) => tracing::info!("{} finished", self.job.name()),
                Err(e) => tracing::error!("{} failed: {:#}", self.job.name(), e),
            }
        }
        .instrument(span)
        .await
    }

    pub async fn run_forever(mut self, poll_interval: Duration) {
        loop {
            self.run_pending(Local::now().naive_local()).await;
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn on(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap().and_time(time(h, m))
    }

    struct Counting {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ScheduledJob for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    fn scheduler(fail: bool, now: NaiveDateTime) -> (Scheduler, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let job = Box::new(Counting { runs: Arc::clone(&runs), fail });
        (Scheduler::new(ScheduleEntry::new(time(17, 50), 10), job, now), runs)
    }

    #[test]
    fn start_is_post_time_minus_lead() {
        assert_eq!(ScheduleEntry::new(time(17, 50), 10).start_time(), time(17, 40));
    }

    #[test]
    fn start_wraps_past_midnight() {
        assert_eq!(ScheduleEntry::new(time(0, 5), 10).start_time(), time(23, 55));
    }

    #[test]
    fn before_start_runs_today() {
        let entry = ScheduleEntry::new(time(17, 50), 10);
        assert_eq!(entry.next_run_after(on(1, 9, 0)), on(1, 17, 40));
    }

    #[test]
    fn after_start_runs_tomorrow() {
        let entry = ScheduleEntry::new(time(17, 50), 10);
        assert_eq!(entry.next_run_after(on(1, 17, 41)), on(2, 17, 40));
        assert_eq!(entry.next_run_after(on(1, 17, 40)), on(2, 17, 40));
    }

    #[test]
    fn post_target_is_the_same_day_for_an_on_time_start() {
        let entry = ScheduleEntry::new(time(17, 50), 10);
        assert_eq!(entry.post_target(on(1, 17, 40)), on(1, 17, 50));
        assert_eq!(entry.post_target(on(1, 17, 52)), on(1, 17, 50));
    }

    #[test]
    fn post_target_follows_a_start_that_wrapped_past_midnight() {
        let entry = ScheduleEntry::new(time(0, 5), 10);
        assert_eq!(entry.post_target(on(1, 23, 55)), on(2, 0, 5));
        assert_eq!(entry.post_target(on(2, 0, 2)), on(2, 0, 5));
    }

    #[tokio::test]
    async fn nothing_runs_before_the_trigger() {
        let (mut scheduler, runs) = scheduler(false, on(1, 9, 0));
        assert!(!scheduler.run_pending(on(1, 17, 39)).await);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn due_job_runs_once_and_rearms_for_tomorrow() {
        let (mut scheduler, runs) = scheduler(false, on(1, 9, 0));

        assert!(scheduler.run_pending(on(1, 17, 41)).await);
        assert!(!scheduler.run_pending(on(1, 17, 42)).await);

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.next_run(), on(2, 17, 40));
    }

    #[tokio::test]
    async fn failed_job_is_still_rearmed() {
        let (mut scheduler, runs) = scheduler(true, on(1, 9, 0));

        assert!(scheduler.run_pending(on(1, 18, 0)).await);

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.next_run(), on(2, 17, 40));
    }

    #[tokio::test]
    async fn run_now_leaves_the_trigger_alone() {
        let (scheduler, runs) = scheduler(false, on(1, 9, 0));
        scheduler.run_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.next_run(), on(1, 17, 40));
    }
}
