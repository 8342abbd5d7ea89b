use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{lotto_recommendation_entity, pension_recommendation_entity};

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "recommendation_source"
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationSource {
    #[sea_orm(string_value = "STATISTICAL")]
    Statistical,
    #[sea_orm(string_value = "AI")]
    Ai,
}

impl std::fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationSource::Statistical => write!(f, "STATISTICAL"),
            RecommendationSource::Ai => write!(f, "AI"),
        }
    }
}

/// 推荐记录的公共部分，仓储按 (回次, 来源, 游戏号) 判重
pub trait CycleRecord: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
    fn target_draw_id(&self) -> i32;
    fn source(&self) -> RecommendationSource;
    fn game_number(&self) -> i32;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LottoRecommendation {
    pub id: Uuid,
    pub target_draw_id: i32,
    pub source: RecommendationSource,
    pub game_number: i32,
    pub numbers: Vec<i32>,
    pub ai_reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LottoRecommendation {
    pub fn new(
        target_draw_id: i32,
        source: RecommendationSource,
        game_number: i32,
        numbers: Vec<i32>,
        ai_reasoning: Option<String>,
    ) -> Self {
        LottoRecommendation {
            id: Uuid::new_v4(),
            target_draw_id,
            source,
            game_number,
            numbers,
            ai_reasoning,
            created_at: Utc::now(),
        }
    }
}

impl CycleRecord for LottoRecommendation {
    fn id(&self) -> Uuid {
        self.id
    }
    fn target_draw_id(&self) -> i32 {
        self.target_draw_id
    }
    fn source(&self) -> RecommendationSource {
        self.source
    }
    fn game_number(&self) -> i32 {
        self.game_number
    }
}

impl From<lotto_recommendation_entity::Model> for LottoRecommendation {
    fn from(m: lotto_recommendation_entity::Model) -> Self {
        LottoRecommendation {
            id: m.id,
            target_draw_id: m.target_draw_id,
            source: m.source,
            game_number: m.game_number,
            numbers: m.numbers,
            ai_reasoning: m.ai_reasoning,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PensionRecommendation {
    pub id: Uuid,
    pub target_draw_id: i32,
    pub source: RecommendationSource,
    pub game_number: i32,
    pub group_no: i32,
    pub digits: String,
    pub ai_reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PensionRecommendation {
    pub fn new(
        target_draw_id: i32,
        source: RecommendationSource,
        game_number: i32,
        group_no: i32,
        digits: String,
    ) -> Self {
        PensionRecommendation {
            id: Uuid::new_v4(),
            target_draw_id,
            source,
            game_number,
            group_no,
            digits,
            ai_reasoning: None,
            created_at: Utc::now(),
        }
    }
}

impl CycleRecord for PensionRecommendation {
    fn id(&self) -> Uuid {
        self.id
    }
    fn target_draw_id(&self) -> i32 {
        self.target_draw_id
    }
    fn source(&self) -> RecommendationSource {
        self.source
    }
    fn game_number(&self) -> i32 {
        self.game_number
    }
}

impl From<pension_recommendation_entity::Model> for PensionRecommendation {
    fn from(m: pension_recommendation_entity::Model) -> Self {
        PensionRecommendation {
            id: m.id,
            target_draw_id: m.target_draw_id,
            source: m.source,
            game_number: m.game_number,
            group_no: m.group_no,
            digits: m.digits,
            ai_reasoning: m.ai_reasoning,
            created_at: m.created_at,
        }
    }
}

/// 一个回次的完整推荐批次（统计 + AI）
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LottoBatch {
    pub target_draw_id: i32,
    pub recommendations: Vec<LottoRecommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PensionBatch {
    pub target_draw_id: i32,
    pub recommendations: Vec<PensionRecommendation>,
}

/// 手动生成推荐的请求体，不传则使用下一回次
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GenerateRequest {
    #[schema(example = 1150)]
    pub target_draw_id: Option<i32>,
}
