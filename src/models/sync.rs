use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 一次开奖数据同步的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncOutcome {
    pub synced_count: usize,
    pub start_draw_id: i32,
    pub end_draw_id: i32,
    pub new_draws: Vec<i32>,
}

impl SyncOutcome {
    pub fn empty(start_draw_id: i32, end_draw_id: i32) -> Self {
        SyncOutcome {
            synced_count: 0,
            start_draw_id,
            end_draw_id,
            new_draws: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SyncRequest {
    pub start_draw_id: Option<i32>,
    pub end_draw_id: Option<i32>,
}

/// 某一玩法的本地数据概况
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawStatus {
    pub total_draws: u64,
    pub latest_draw_id: Option<i32>,
    pub latest_draw_date: Option<NaiveDate>,
    /// 下一次生成推荐的目标回次
    pub next_target_draw_id: i32,
    pub next_target_has_recommendations: bool,
}
