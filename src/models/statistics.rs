use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 单个号码的出现统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NumberFrequency {
    pub number: i32,
    pub count: u32,
    /// 占全部号码位的百分比
    pub percentage: f64,
    /// 最近一次出现的回次，从未出现为 None
    pub last_appeared: Option<i32>,
}

/// 6/45 全量统计，`frequencies` 按出现次数降序
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StatisticsSummary {
    pub total_draws: u32,
    pub frequencies: Vec<NumberFrequency>,
    pub most_frequent: Vec<NumberFrequency>,
    pub least_frequent: Vec<NumberFrequency>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DigitCount {
    pub digit: u8,
    pub count: u32,
}

/// 每个位置（0..6）上各数字的出现次数，降序
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PensionDigitFrequency {
    pub total_draws: u32,
    pub positions: Vec<Vec<DigitCount>>,
}

impl PensionDigitFrequency {
    pub fn is_empty(&self) -> bool {
        self.positions.iter().all(|p| p.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CandidatesResponse {
    pub exclude_count: usize,
    pub candidates: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CandidatesQuery {
    /// 排除的低频号码数量（默认 20）
    pub exclude: Option<usize>,
}
