use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::entities::{lotto_draw_entity, pension_draw_entity};

pub const LOTTO_MIN_NUMBER: i32 = 1;
pub const LOTTO_MAX_NUMBER: i32 = 45;
pub const LOTTO_SET_SIZE: usize = 6;
pub const PENSION_DIGIT_LEN: usize = 6;
pub const PENSION_GROUPS: std::ops::RangeInclusive<i32> = 1..=5;

/// 开奖格式
/// - `Lotto`: 6/45 + 奖金号
/// - `Pension`: 组号 1..5 + 6 位数字
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DrawFormat {
    Lotto,
    Pension,
}

impl fmt::Display for DrawFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawFormat::Lotto => write!(f, "lotto"),
            DrawFormat::Pension => write!(f, "pension"),
        }
    }
}

impl FromStr for DrawFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lotto" => Ok(DrawFormat::Lotto),
            "pension" => Ok(DrawFormat::Pension),
            other => Err(format!("unknown draw format: {other}")),
        }
    }
}

/// 各等奖金额与中奖人数（仅展示用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrizeTier {
    pub rank: i32,
    /// 单注奖金（韩元）
    pub amount: i64,
    pub winners: i64,
}

/// 所有开奖记录共有的回次号
pub trait DrawRecord: Clone + Send + Sync + 'static {
    fn draw_id(&self) -> i32;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LottoDraw {
    pub id: i32,
    pub draw_date: NaiveDate,
    /// 升序存储
    pub numbers: Vec<i32>,
    pub bonus_number: i32,
    pub prize_tiers: Vec<PrizeTier>,
}

impl DrawRecord for LottoDraw {
    fn draw_id(&self) -> i32 {
        self.id
    }
}

impl From<lotto_draw_entity::Model> for LottoDraw {
    fn from(m: lotto_draw_entity::Model) -> Self {
        LottoDraw {
            id: m.id,
            draw_date: m.draw_date,
            numbers: m.numbers,
            bonus_number: m.bonus_number,
            prize_tiers: serde_json::from_value(m.prize_tiers).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PensionDraw {
    pub id: i32,
    pub draw_date: Option<NaiveDate>,
    pub group_no: Option<i32>,
    /// 未公布时为 None
    pub digits: Option<String>,
    pub prize_tiers: Vec<PrizeTier>,
}

impl PensionDraw {
    /// 已公布且格式正确的 6 位号码
    pub fn published_digits(&self) -> Option<&str> {
        self.digits
            .as_deref()
            .filter(|d| is_valid_pension_digits(d))
    }
}

impl DrawRecord for PensionDraw {
    fn draw_id(&self) -> i32 {
        self.id
    }
}

impl From<pension_draw_entity::Model> for PensionDraw {
    fn from(m: pension_draw_entity::Model) -> Self {
        PensionDraw {
            id: m.id,
            draw_date: m.draw_date,
            group_no: m.group_no,
            digits: m.digits,
            prize_tiers: serde_json::from_value(m.prize_tiers).unwrap_or_default(),
        }
    }
}

/// 6 个互不相同且都在 1..=45 之间的整数
pub fn is_valid_lotto_set(numbers: &[i32]) -> bool {
    if numbers.len() != LOTTO_SET_SIZE {
        return false;
    }
    if numbers
        .iter()
        .any(|n| !(LOTTO_MIN_NUMBER..=LOTTO_MAX_NUMBER).contains(n))
    {
        return false;
    }
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len() == LOTTO_SET_SIZE
}

/// 恰好 6 个 ASCII 数字
pub fn is_valid_pension_digits(digits: &str) -> bool {
    digits.len() == PENSION_DIGIT_LEN && digits.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_valid_group(group_no: i32) -> bool {
    PENSION_GROUPS.contains(&group_no)
}
