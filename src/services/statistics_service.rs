use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{
    DigitCount, LOTTO_MAX_NUMBER, LOTTO_MIN_NUMBER, LOTTO_SET_SIZE, LottoDraw, NumberFrequency,
    PENSION_DIGIT_LEN, PensionDigitFrequency, PensionDraw, StatisticsSummary,
};
use crate::repositories::DrawRepository;
use crate::services::candidate_selector::{ranked_digit_sets, select_candidates};
use crate::utils::SharedRng;

const TOP_SLICE: usize = 10;

/// 6/45 号码出现频率
///
/// - 按出现次数降序，次数相同保持号码升序（稳定排序）
/// - 百分比 = 次数 / (6 × 回次数) × 100
/// - 无历史数据时返回空结果
pub fn calculate_lotto_statistics(draws: &[LottoDraw]) -> StatisticsSummary {
    if draws.is_empty() {
        return StatisticsSummary::default();
    }

    let slots = (LOTTO_MAX_NUMBER + 1) as usize;
    let mut counts = vec![0u32; slots];
    let mut last_appeared: Vec<Option<i32>> = vec![None; slots];

    for draw in draws {
        for &n in &draw.numbers {
            if !(LOTTO_MIN_NUMBER..=LOTTO_MAX_NUMBER).contains(&n) {
                log::warn!("Draw {} contains out-of-range number {n}", draw.id);
                continue;
            }
            let idx = n as usize;
            counts[idx] += 1;
            if last_appeared[idx].is_none_or(|last| draw.id > last) {
                last_appeared[idx] = Some(draw.id);
            }
        }
    }

    let total_slots = (draws.len() * LOTTO_SET_SIZE) as f64;
    let mut frequencies: Vec<NumberFrequency> = (LOTTO_MIN_NUMBER..=LOTTO_MAX_NUMBER)
        .map(|number| {
            let count = counts[number as usize];
            NumberFrequency {
                number,
                count,
                percentage: count as f64 / total_slots * 100.0,
                last_appeared: last_appeared[number as usize],
            }
        })
        .collect();
    frequencies.sort_by(|a, b| b.count.cmp(&a.count));

    let most_frequent = frequencies.iter().take(TOP_SLICE).cloned().collect();
    let least_frequent = frequencies.iter().rev().take(TOP_SLICE).cloned().collect();

    StatisticsSummary {
        total_draws: draws.len() as u32,
        frequencies,
        most_frequent,
        least_frequent,
    }
}

/// 组号 + 6 位数字的逐位频率，只统计已公布且格式正确的号码
pub fn calculate_pension_digit_frequency(draws: &[PensionDraw]) -> PensionDigitFrequency {
    let mut table = [[0u32; 10]; PENSION_DIGIT_LEN];
    let mut total = 0u32;

    for digits in draws.iter().filter_map(|d| d.published_digits()) {
        total += 1;
        for (pos, b) in digits.bytes().enumerate() {
            table[pos][(b - b'0') as usize] += 1;
        }
    }

    let positions = table
        .iter()
        .map(|counts| {
            let mut ranked: Vec<DigitCount> = counts
                .iter()
                .enumerate()
                .filter(|(_, c)| **c > 0)
                .map(|(digit, &count)| DigitCount {
                    digit: digit as u8,
                    count,
                })
                .collect();
            ranked.sort_by(|a, b| b.count.cmp(&a.count));
            ranked
        })
        .collect();

    PensionDigitFrequency {
        total_draws: total,
        positions,
    }
}

/// 基于已存开奖数据的统计查询
#[derive(Clone)]
pub struct StatisticsService {
    lotto_draws: Arc<dyn DrawRepository<LottoDraw>>,
    pension_draws: Arc<dyn DrawRepository<PensionDraw>>,
    rng: SharedRng,
}

impl StatisticsService {
    pub fn new(
        lotto_draws: Arc<dyn DrawRepository<LottoDraw>>,
        pension_draws: Arc<dyn DrawRepository<PensionDraw>>,
        rng: SharedRng,
    ) -> Self {
        Self {
            lotto_draws,
            pension_draws,
            rng,
        }
    }

    pub async fn lotto_summary(&self) -> AppResult<StatisticsSummary> {
        let draws = self.lotto_draws.find_all().await?;
        Ok(calculate_lotto_statistics(&draws))
    }

    /// 排除 `exclude_count` 个低频号码后的候选池（升序）
    pub async fn candidates(&self, exclude_count: usize) -> AppResult<Vec<i32>> {
        let summary = self.lotto_summary().await?;
        let candidates = select_candidates(&summary, exclude_count);
        log::debug!(
            "Candidate numbers (excluded {exclude_count} least frequent): {candidates:?}"
        );
        Ok(candidates)
    }

    pub async fn number_detail(&self, number: i32) -> AppResult<Option<NumberFrequency>> {
        if !(LOTTO_MIN_NUMBER..=LOTTO_MAX_NUMBER).contains(&number) {
            return Err(AppError::ValidationError(format!(
                "number must be between {LOTTO_MIN_NUMBER} and {LOTTO_MAX_NUMBER}"
            )));
        }
        let summary = self.lotto_summary().await?;
        Ok(summary.frequencies.into_iter().find(|f| f.number == number))
    }

    pub async fn pension_digit_frequency(&self) -> AppResult<PensionDigitFrequency> {
        let draws = self.pension_draws.find_all().await?;
        Ok(calculate_pension_digit_frequency(&draws))
    }

    /// 按位频率排名组合出 `k` 个互不相同的 6 位数字
    pub async fn ranked_pension_digits(&self, k: usize) -> AppResult<Vec<String>> {
        let freq = self.pension_digit_frequency().await?;
        Ok(self.rng.with(|rng| ranked_digit_sets(&freq, k, rng)))
    }
}
