//! Weekly background jobs.
//!
//! Each (format, trigger) pair runs on its own tokio task and sleeps until its
//! next weekly firing in the configured timezone. Call `spawn_all` once during
//! startup.

pub mod cycle_scheduler;
pub mod schedule;

pub use cycle_scheduler::*;
pub use schedule::WeeklySchedule;

use chrono::Utc;
use chrono_tz::Tz;

use crate::config::SchedulerConfig;
use crate::error::{AppError, AppResult};
use crate::models::DrawFormat;

/// 解析配置中的时区
pub fn parse_timezone(name: &str) -> AppResult<Tz> {
    name.parse::<Tz>()
        .map_err(|e| AppError::ConfigError(format!("invalid scheduler timezone {name:?}: {e}")))
}

/// 每个任务的触发时间
pub fn job_schedules(config: &SchedulerConfig) -> AppResult<Vec<(Job, WeeklySchedule)>> {
    Job::ALL
        .iter()
        .map(|job| {
            let raw = match (job.format, job.trigger) {
                (DrawFormat::Lotto, Trigger::Generate) => &config.lotto_generate,
                (DrawFormat::Lotto, Trigger::Verify) => &config.lotto_verify,
                (DrawFormat::Lotto, Trigger::Refresh) => &config.lotto_refresh,
                (DrawFormat::Pension, Trigger::Generate) => &config.pension_generate,
                (DrawFormat::Pension, Trigger::Verify) => &config.pension_verify,
                (DrawFormat::Pension, Trigger::Refresh) => &config.pension_refresh,
            };
            Ok((*job, raw.parse::<WeeklySchedule>()?))
        })
        .collect()
}

/// Spawn one loop per job.
///
/// Notes
/// - A run finishes before the same job sleeps again, so firings never overlap.
/// - Manual triggers share the scheduler's per-job lock and get `Busy` meanwhile.
/// - Each firing runs in its own task; a panic is logged and the loop keeps going.
pub fn spawn_all(scheduler: CycleScheduler, schedules: Vec<(Job, WeeklySchedule)>) {
    let tz = scheduler.timezone();
    for (job, schedule) in schedules {
        let scheduler = scheduler.clone();
        log::info!("Scheduling job {job} at {schedule} ({tz})");
        tokio::spawn(async move {
            loop {
                let now = Utc::now().with_timezone(&tz);
                let next = schedule.next_after(&now);
                log::debug!("Job {job} next run at {next}");
                tokio::time::sleep(schedule.until_next(&now)).await;

                let outcome = scheduler.run_isolated(job).await;
                log::debug!("Job {job} finished with status {}", outcome.status());
            }
        });
    }
}
