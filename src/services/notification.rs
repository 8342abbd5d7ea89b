use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppResult;
use crate::models::{LottoBatch, LottoCheckOutcome, PensionBatch, PensionCheckOutcome, SyncOutcome};

/// 推送给通知渠道的内容
#[derive(Debug, Clone)]
pub enum Notification {
    LottoRecommendations { batch: LottoBatch, draw_date: NaiveDate },
    PensionRecommendations { batch: PensionBatch, draw_date: NaiveDate },
    LottoResults(LottoCheckOutcome),
    PensionResults(PensionCheckOutcome),
    PensionSyncSummary(SyncOutcome),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::LottoRecommendations { .. } => "lotto_recommendations",
            Notification::PensionRecommendations { .. } => "pension_recommendations",
            Notification::LottoResults(_) => "lotto_results",
            Notification::PensionResults(_) => "pension_results",
            Notification::PensionSyncSummary(_) => "pension_sync_summary",
        }
    }
}

/// 通知渠道；调用方只记录失败，不会因此回滚
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> AppResult<()>;
}
