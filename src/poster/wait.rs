use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPlan {
    /// Target already reached
    Immediate,
    /// Remaining wait exceeds the threshold; posting goes ahead anyway
    TooFar(Duration),
    Sleep(Duration),
}

pub fn plan_wait(now: NaiveDateTime, target: NaiveDateTime, threshold: Duration) -> WaitPlan {
    let remaining = match (target - now).to_std() {
        Ok(remaining) if !remaining.is_zero() => remaining,
        _ => return WaitPlan::Immediate,
    };
    if remaining > threshold {
        WaitPlan::TooFar(remaining)
    } else {
        WaitPlan::Sleep(remaining)
    }
}

/// Holds the attempt until `target`, sleeping in `quantum` steps.
pub async fn wait_for_post_time(target: NaiveDateTime, threshold: Duration, quantum: Duration) {
    wait_until(target, threshold, quantum, || Local::now().naive_local()).await;
}

pub async fn wait_until<C>(target: NaiveDateTime, threshold: Duration, quantum: Duration, clock: C)
where
    C: Fn() -> NaiveDateTime,
{
    match plan_wait(clock(), target, threshold) {
        WaitPlan::Immediate => {
            tracing::info!("Post time {} already reached, posting now", target.time());
        }
        WaitPlan::TooFar(remaining) => {
            tracing::warn!("Post time {} is {}s away, more than the {}s limit; posting now", target.time(), remaining.as_secs(), threshold.as_secs());
        }
        WaitPlan::Sleep(remaining) => {
            tracing::info!("Waiting {}s until post time {}", remaining.as_secs(), target.time());
            let mut last_logged = remaining.as_secs() / 60;
            while clock() < target {
                sleep(quantum).await;
                if let Ok(left) = (target - clock()).to_std() {
                    let minutes = left.as_secs() / 60;
                    if minutes < last_logged {
                        tracing::info!("{} minutes left until post time", minutes + 1);
                        last_logged = minutes;
                    }
                }
            }
            tracing::info!("Post time reached");
        }
    }
}
