use chrono::{NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::models::DrawFormat;
use crate::repositories::Repositories;
use crate::services::{
    Notification, Notifier, RecommendationComposer, ResultClassifier, SyncService,
};
use crate::utils::next_weekday;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// 生成下一回次推荐并推送
    Generate,
    /// 同步开奖后核对最新回次
    Verify,
    /// 仅同步开奖数据
    Refresh,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Generate => write!(f, "generate"),
            Trigger::Verify => write!(f, "verify"),
            Trigger::Refresh => write!(f, "refresh"),
        }
    }
}

impl FromStr for Trigger {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generate" => Ok(Trigger::Generate),
            "verify" => Ok(Trigger::Verify),
            "refresh" => Ok(Trigger::Refresh),
            other => Err(AppError::ValidationError(format!("unknown trigger: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Job {
    pub format: DrawFormat,
    pub trigger: Trigger,
}

impl Job {
    pub const ALL: [Job; 6] = [
        Job::new(DrawFormat::Lotto, Trigger::Generate),
        Job::new(DrawFormat::Lotto, Trigger::Verify),
        Job::new(DrawFormat::Lotto, Trigger::Refresh),
        Job::new(DrawFormat::Pension, Trigger::Generate),
        Job::new(DrawFormat::Pension, Trigger::Verify),
        Job::new(DrawFormat::Pension, Trigger::Refresh),
    ];

    pub const fn new(format: DrawFormat, trigger: Trigger) -> Self {
        Self { format, trigger }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.format, self.trigger)
    }
}

/// 一次触发的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed(String),
    Skipped(String),
    /// 同一任务正在运行
    Busy,
    Failed(String),
}

impl TriggerOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            TriggerOutcome::Completed(_) => "completed",
            TriggerOutcome::Skipped(_) => "skipped",
            TriggerOutcome::Busy => "busy",
            TriggerOutcome::Failed(_) => "failed",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            TriggerOutcome::Completed(m)
            | TriggerOutcome::Skipped(m)
            | TriggerOutcome::Failed(m) => Some(m.as_str()),
            TriggerOutcome::Busy => None,
        }
    }
}

/// 手动触发接口的返回体
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobRunReport {
    #[schema(example = "lotto-generate")]
    pub job: String,
    #[schema(example = "completed")]
    pub status: String,
    pub message: Option<String>,
}

impl JobRunReport {
    pub fn new(job: Job, outcome: &TriggerOutcome) -> Self {
        Self {
            job: job.to_string(),
            status: outcome.status().to_string(),
            message: outcome.message().map(str::to_string),
        }
    }
}

/// 每周推荐/核对/同步任务的执行器
///
/// 每个任务各持一把锁：同一任务的并发触发直接返回 `Busy`，不同任务互不影响。
/// 错误在 `run` 边界记录日志，不向外传播。
#[derive(Clone)]
pub struct CycleScheduler {
    repos: Repositories,
    sync: SyncService,
    composer: RecommendationComposer,
    classifier: ResultClassifier,
    notifier: Arc<dyn Notifier>,
    timezone: Tz,
    locks: Arc<HashMap<Job, Mutex<()>>>,
}

impl CycleScheduler {
    pub fn new(
        repos: Repositories,
        sync: SyncService,
        composer: RecommendationComposer,
        classifier: ResultClassifier,
        notifier: Arc<dyn Notifier>,
        timezone: Tz,
    ) -> Self {
        let locks = Job::ALL.iter().map(|job| (*job, Mutex::new(()))).collect();
        Self {
            repos,
            sync,
            composer,
            classifier,
            notifier,
            timezone,
            locks: Arc::new(locks),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub async fn run(&self, job: Job) -> TriggerOutcome {
        let Some(lock) = self.locks.get(&job) else {
            return TriggerOutcome::Failed(format!("unknown job {job}"));
        };
        let Ok(_guard) = lock.try_lock() else {
            log::warn!("Job {job} is already running, trigger ignored");
            return TriggerOutcome::Busy;
        };

        log::info!("Job {job} started");
        let outcome = match self.execute(job).await {
            Ok(outcome) => outcome,
            Err(AppError::Conflict(msg)) => TriggerOutcome::Skipped(msg),
            Err(e) => {
                log::error!("Job {job} failed: {e}");
                TriggerOutcome::Failed(e.to_string())
            }
        };
        match &outcome {
            TriggerOutcome::Skipped(reason) => log::info!("Job {job} skipped: {reason}"),
            TriggerOutcome::Completed(detail) => log::info!("Job {job} completed: {detail}"),
            _ => {}
        }
        outcome
    }

    /// 在独立任务中执行 `run`，panic 记为 `Failed`，调用方的循环不受影响
    pub async fn run_isolated(&self, job: Job) -> TriggerOutcome {
        let scheduler = self.clone();
        match tokio::spawn(async move { scheduler.run(job).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Job {job} panicked: {e}");
                TriggerOutcome::Failed(format!("job {job} panicked"))
            }
        }
    }

    async fn execute(&self, job: Job) -> AppResult<TriggerOutcome> {
        match (job.format, job.trigger) {
            (DrawFormat::Lotto, Trigger::Generate) => self.generate_lotto().await,
            (DrawFormat::Lotto, Trigger::Verify) => self.verify_lotto().await,
            (DrawFormat::Lotto, Trigger::Refresh) => self.refresh_lotto().await,
            (DrawFormat::Pension, Trigger::Generate) => self.generate_pension().await,
            (DrawFormat::Pension, Trigger::Verify) => self.verify_pension().await,
            (DrawFormat::Pension, Trigger::Refresh) => self.refresh_pension().await,
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// 推送失败只记日志，已写入的数据保持不变
    async fn deliver(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(&notification).await {
            log::error!("Failed to send {} notification: {e}", notification.kind());
        }
    }

    async fn generate_lotto(&self) -> AppResult<TriggerOutcome> {
        let target = self.composer.next_lotto_target().await?;
        let existing = self.repos.lotto_recommendations.find_by_cycle(target).await?;
        if !existing.is_empty() {
            return Ok(TriggerOutcome::Skipped(format!(
                "draw #{target} already has {} recommendations",
                existing.len()
            )));
        }

        let batch = self.composer.compose_lotto(target).await?;
        let count = batch.recommendations.len();
        let draw_date = next_weekday(self.today(), Weekday::Sat);
        self.deliver(Notification::LottoRecommendations { batch, draw_date })
            .await;
        Ok(TriggerOutcome::Completed(format!(
            "generated {count} recommendations for draw #{target}"
        )))
    }

    async fn generate_pension(&self) -> AppResult<TriggerOutcome> {
        let target = self.composer.next_pension_target().await?;
        let existing = self
            .repos
            .pension_recommendations
            .find_by_cycle(target)
            .await?;
        if !existing.is_empty() {
            return Ok(TriggerOutcome::Skipped(format!(
                "pension draw #{target} already has {} recommendations",
                existing.len()
            )));
        }

        let batch = self.composer.compose_pension(target).await?;
        let count = batch.recommendations.len();
        let draw_date = next_weekday(self.today(), Weekday::Thu);
        self.deliver(Notification::PensionRecommendations { batch, draw_date })
            .await;
        Ok(TriggerOutcome::Completed(format!(
            "generated {count} recommendations for pension draw #{target}"
        )))
    }

    async fn verify_lotto(&self) -> AppResult<TriggerOutcome> {
        if let Err(e) = self.sync.sync_lotto(None, None).await {
            log::warn!("Lotto sync before verification failed, using stored draws: {e}");
        }

        let Some(latest) = self.repos.lotto_draws.find_latest().await? else {
            return Ok(TriggerOutcome::Skipped("no draws stored".to_string()));
        };
        let Some(outcome) = self.classifier.check_lotto_cycle(latest.id).await? else {
            return Ok(TriggerOutcome::Skipped(format!(
                "no recommendations for draw #{}",
                latest.id
            )));
        };
        if outcome.newly_classified == 0 {
            return Ok(TriggerOutcome::Skipped(format!(
                "draw #{} already verified",
                latest.id
            )));
        }

        let detail = format!(
            "classified {} recommendations for draw #{}, best rank {:?}",
            outcome.newly_classified, latest.id, outcome.best_rank
        );
        self.deliver(Notification::LottoResults(outcome)).await;
        Ok(TriggerOutcome::Completed(detail))
    }

    async fn verify_pension(&self) -> AppResult<TriggerOutcome> {
        if let Err(e) = self.sync.sync_pension(None, None).await {
            log::warn!("Pension sync before verification failed, using stored draws: {e}");
        }

        let Some(latest) = self.repos.pension_draws.find_latest().await? else {
            return Ok(TriggerOutcome::Skipped("no pension draws stored".to_string()));
        };
        let Some(outcome) = self.classifier.check_pension_cycle(latest.id).await? else {
            return Ok(TriggerOutcome::Skipped(format!(
                "no recommendations for pension draw #{}",
                latest.id
            )));
        };
        if outcome.newly_classified == 0 {
            return Ok(TriggerOutcome::Skipped(format!(
                "pension draw #{} already verified",
                latest.id
            )));
        }

        let detail = format!(
            "classified {} recommendations for pension draw #{}, best rank {:?}",
            outcome.newly_classified, latest.id, outcome.best_rank
        );
        self.deliver(Notification::PensionResults(outcome)).await;
        Ok(TriggerOutcome::Completed(detail))
    }

    async fn refresh_lotto(&self) -> AppResult<TriggerOutcome> {
        let outcome = self.sync.sync_lotto(None, None).await?;
        Ok(TriggerOutcome::Completed(format!(
            "synced {} lotto draws",
            outcome.synced_count
        )))
    }

    async fn refresh_pension(&self) -> AppResult<TriggerOutcome> {
        let outcome = self.sync.sync_pension(None, None).await?;
        let detail = format!("synced {} pension draws", outcome.synced_count);
        self.deliver(Notification::PensionSyncSummary(outcome)).await;
        Ok(TriggerOutcome::Completed(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecommendationConfig;
    use crate::models::{LottoDraw, PensionDraw};
    use crate::services::sync_service::tests::{FakeSource, lotto_draw};
    use crate::services::{AiRecommender, DrawSource, StatisticsService};
    use crate::utils::SharedRng;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// 记录推送内容的通知渠道
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<&'static str>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: &Notification) -> AppResult<()> {
            self.sent.lock().await.push(notification.kind());
            if self.fail {
                return Err(AppError::ExternalApiError("telegram down".into()));
            }
            Ok(())
        }
    }

    fn scheduler(
        repos: &Repositories,
        lotto_source: Arc<dyn DrawSource<LottoDraw>>,
        pension_source: Arc<dyn DrawSource<PensionDraw>>,
        notifier: Arc<RecordingNotifier>,
    ) -> CycleScheduler {
        let rng = SharedRng::from_seed(Some(7));
        let statistics = StatisticsService::new(
            repos.lotto_draws.clone(),
            repos.pension_draws.clone(),
            rng.clone(),
        );
        let ai = AiRecommender::new(None, rng.clone(), Duration::from_secs(1));
        let composer = RecommendationComposer::new(
            repos.clone(),
            statistics,
            ai,
            RecommendationConfig::default(),
            rng,
        );
        CycleScheduler::new(
            repos.clone(),
            SyncService::new(repos.clone(), lotto_source, pension_source),
            composer,
            ResultClassifier::new(repos.clone()),
            notifier,
            chrono_tz::Asia::Seoul,
        )
    }

    fn history() -> Vec<LottoDraw> {
        vec![
            lotto_draw(1, [1, 2, 3, 4, 5, 6], 7),
            lotto_draw(2, [7, 8, 9, 10, 11, 12], 13),
            lotto_draw(3, [14, 15, 16, 17, 18, 19], 20),
            lotto_draw(4, [21, 22, 23, 24, 25, 26], 27),
        ]
    }

    async fn seed(repos: &Repositories) {
        for draw in history() {
            repos.lotto_draws.save(draw).await.unwrap();
        }
    }

    const LOTTO_GENERATE: Job = Job::new(DrawFormat::Lotto, Trigger::Generate);
    const LOTTO_VERIFY: Job = Job::new(DrawFormat::Lotto, Trigger::Verify);

    #[tokio::test]
    async fn generate_twice_produces_one_batch() {
        let repos = Repositories::in_memory();
        seed(&repos).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let s = scheduler(
            &repos,
            Arc::new(FakeSource::new(history())),
            Arc::new(FakeSource::<PensionDraw>::new(vec![])),
            notifier.clone(),
        );

        assert!(matches!(s.run(LOTTO_GENERATE).await, TriggerOutcome::Completed(_)));
        assert!(matches!(s.run(LOTTO_GENERATE).await, TriggerOutcome::Skipped(_)));

        let stored = repos.lotto_recommendations.find_by_cycle(5).await.unwrap();
        assert_eq!(stored.len(), 5);
        assert_eq!(*notifier.sent.lock().await, vec!["lotto_recommendations"]);
    }

    #[tokio::test]
    async fn verify_notifies_once_per_draw() {
        let repos = Repositories::in_memory();
        seed(&repos).await;
        let mut source_draws = history();
        source_draws.push(lotto_draw(5, [1, 2, 3, 4, 5, 45], 6));
        let notifier = Arc::new(RecordingNotifier::default());
        let s = scheduler(
            &repos,
            Arc::new(FakeSource::new(source_draws)),
            Arc::new(FakeSource::<PensionDraw>::new(vec![])),
            notifier.clone(),
        );

        s.run(LOTTO_GENERATE).await;
        assert!(matches!(s.run(LOTTO_VERIFY).await, TriggerOutcome::Completed(_)));
        assert!(repos.lotto_draws.exists(5).await.unwrap());
        assert!(matches!(s.run(LOTTO_VERIFY).await, TriggerOutcome::Skipped(_)));

        assert_eq!(
            *notifier.sent.lock().await,
            vec!["lotto_recommendations", "lotto_results"]
        );
    }

    #[tokio::test]
    async fn verify_continues_when_sync_fails() {
        let repos = Repositories::in_memory();
        seed(&repos).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let s = scheduler(
            &repos,
            Arc::new(FakeSource::<LottoDraw>::failing()),
            Arc::new(FakeSource::<PensionDraw>::failing()),
            notifier.clone(),
        );

        // 最新已存回次 4 没有推荐
        let outcome = s.run(LOTTO_VERIFY).await;
        assert_eq!(outcome.status(), "skipped");
        assert!(outcome.message().unwrap().contains("#4"));

        let outcome = s
            .run(Job::new(DrawFormat::Pension, Trigger::Verify))
            .await;
        assert_eq!(
            outcome,
            TriggerOutcome::Skipped("no pension draws stored".to_string())
        );
        assert!(notifier.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_trigger_of_same_job_is_busy() {
        let repos = Repositories::in_memory();
        let s = scheduler(
            &repos,
            Arc::new(FakeSource::<LottoDraw>::new(vec![])),
            Arc::new(FakeSource::<PensionDraw>::new(vec![])),
            Arc::new(RecordingNotifier::default()),
        );

        let _guard = s.locks[&LOTTO_GENERATE].try_lock().unwrap();
        assert_eq!(s.run(LOTTO_GENERATE).await, TriggerOutcome::Busy);
        // 其它任务不受影响
        assert_ne!(s.run(LOTTO_VERIFY).await, TriggerOutcome::Busy);
    }

    #[tokio::test]
    async fn notifier_failure_keeps_the_batch() {
        let repos = Repositories::in_memory();
        seed(&repos).await;
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let s = scheduler(
            &repos,
            Arc::new(FakeSource::new(history())),
            Arc::new(FakeSource::<PensionDraw>::new(vec![])),
            notifier.clone(),
        );

        assert!(matches!(s.run(LOTTO_GENERATE).await, TriggerOutcome::Completed(_)));
        assert!(
            repos
                .lotto_recommendations
                .exists_for_cycle(5)
                .await
                .unwrap()
        );
        assert_eq!(notifier.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn pension_refresh_sends_summary_even_without_changes() {
        let repos = Repositories::in_memory();
        let notifier = Arc::new(RecordingNotifier::default());
        let s = scheduler(
            &repos,
            Arc::new(FakeSource::<LottoDraw>::new(vec![])),
            Arc::new(FakeSource::<PensionDraw>::new(vec![])),
            notifier.clone(),
        );

        let outcome = s
            .run(Job::new(DrawFormat::Pension, Trigger::Refresh))
            .await;
        assert!(matches!(outcome, TriggerOutcome::Completed(_)));
        assert_eq!(*notifier.sent.lock().await, vec!["pension_sync_summary"]);
    }

    /// 第一次调用时 panic，之后返回空数据
    #[derive(Default)]
    struct PanicOnceSource {
        tripped: AtomicBool,
    }

    #[async_trait]
    impl DrawSource<PensionDraw> for PanicOnceSource {
        async fn latest_draw_id(&self) -> AppResult<i32> {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                panic!("malformed upstream payload");
            }
            Ok(0)
        }

        async fn draw_range(&self, _start: i32, _end: i32) -> AppResult<Vec<PensionDraw>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn panicking_run_is_reported_and_job_fires_again() {
        let repos = Repositories::in_memory();
        let notifier = Arc::new(RecordingNotifier::default());
        let s = scheduler(
            &repos,
            Arc::new(FakeSource::<LottoDraw>::new(vec![])),
            Arc::new(PanicOnceSource::default()),
            notifier.clone(),
        );
        let job = Job::new(DrawFormat::Pension, Trigger::Refresh);

        let first = s.run_isolated(job).await;
        assert!(matches!(first, TriggerOutcome::Failed(_)));
        assert!(notifier.sent.lock().await.is_empty());

        let second = s.run_isolated(job).await;
        assert!(matches!(second, TriggerOutcome::Completed(_)));
        assert_eq!(*notifier.sent.lock().await, vec!["pension_sync_summary"]);
    }

    #[test]
    fn job_names_and_trigger_parsing() {
        assert_eq!(LOTTO_GENERATE.to_string(), "lotto-generate");
        assert_eq!("Verify".parse::<Trigger>().unwrap(), Trigger::Verify);
        assert!("publish".parse::<Trigger>().is_err());
        assert_eq!(Job::ALL.len(), 6);
    }
}
