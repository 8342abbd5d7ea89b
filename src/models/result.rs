use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{LottoDraw, LottoRecommendation, PensionDraw, PensionRecommendation};
use crate::entities::{lotto_result_entity, pension_result_entity};

/// 中奖结果，与推荐一一对应
pub trait ResultRecord: Clone + Send + Sync + 'static {
    fn recommendation_id(&self) -> Uuid;
    fn prize_rank(&self) -> Option<i32>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LottoResult {
    pub id: Uuid,
    pub recommendation_id: Uuid,
    pub matched_count: i32,
    pub matched_numbers: Vec<i32>,
    pub has_bonus: bool,
    /// None = 未中奖
    pub prize_rank: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl ResultRecord for LottoResult {
    fn recommendation_id(&self) -> Uuid {
        self.recommendation_id
    }
    fn prize_rank(&self) -> Option<i32> {
        self.prize_rank
    }
}

impl From<lotto_result_entity::Model> for LottoResult {
    fn from(m: lotto_result_entity::Model) -> Self {
        LottoResult {
            id: m.id,
            recommendation_id: m.recommendation_id,
            matched_count: m.matched_count,
            matched_numbers: m.matched_numbers,
            has_bonus: m.has_bonus,
            prize_rank: m.prize_rank,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PensionResult {
    pub id: Uuid,
    pub recommendation_id: Uuid,
    pub prize_rank: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl ResultRecord for PensionResult {
    fn recommendation_id(&self) -> Uuid {
        self.recommendation_id
    }
    fn prize_rank(&self) -> Option<i32> {
        self.prize_rank
    }
}

impl From<pension_result_entity::Model> for PensionResult {
    fn from(m: pension_result_entity::Model) -> Self {
        PensionResult {
            id: m.id,
            recommendation_id: m.recommendation_id,
            prize_rank: m.prize_rank,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckedLottoRecommendation {
    pub recommendation: LottoRecommendation,
    pub result: LottoResult,
    /// 本次运行新写入的结果
    pub newly_classified: bool,
}

/// 一个回次的核对结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LottoCheckOutcome {
    pub draw: LottoDraw,
    pub entries: Vec<CheckedLottoRecommendation>,
    pub total_recommendations: usize,
    pub best_rank: Option<i32>,
    pub newly_classified: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckedPensionRecommendation {
    pub recommendation: PensionRecommendation,
    pub result: PensionResult,
    pub newly_classified: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PensionCheckOutcome {
    pub draw: PensionDraw,
    pub entries: Vec<CheckedPensionRecommendation>,
    pub total_recommendations: usize,
    pub best_rank: Option<i32>,
    pub newly_classified: usize,
}

/// 推荐及其结果（尚未核对时为 None）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LottoRecommendationView {
    pub recommendation: LottoRecommendation,
    pub result: Option<LottoResult>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PensionRecommendationView {
    pub recommendation: PensionRecommendation,
    pub result: Option<PensionResult>,
}

/// 数值越小越好，None 不参与比较
pub fn best_of(ranks: impl IntoIterator<Item = Option<i32>>) -> Option<i32> {
    ranks.into_iter().flatten().min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_rank_ignores_missing_ranks() {
        assert_eq!(best_of([None, Some(5), Some(3), None]), Some(3));
        assert_eq!(best_of([None, None]), None);
        assert_eq!(best_of(Vec::<Option<i32>>::new()), None);
    }
}
