//! 开奖 / 推荐 / 结果的存取接口
//!
//! 服务层只依赖这里的 trait；`postgres` 为 sea-orm 实现，`memory` 为测试与
//! `memory://` 试运行使用的内存实现。

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    CycleRecord, DrawRecord, LottoDraw, LottoRecommendation, LottoResult, PensionDraw,
    PensionRecommendation, PensionResult, ResultRecord,
};

#[async_trait]
pub trait DrawRepository<D: DrawRecord>: Send + Sync {
    /// 回次号最大的一条
    async fn find_latest(&self) -> AppResult<Option<D>>;

    async fn find_by_id(&self, id: i32) -> AppResult<Option<D>>;

    /// 按回次号升序
    async fn find_all(&self) -> AppResult<Vec<D>>;

    /// 最近 `limit` 条，按回次号降序
    async fn find_recent(&self, limit: usize) -> AppResult<Vec<D>>;

    async fn exists(&self, id: i32) -> AppResult<bool>;

    /// 插入新回次；回次已存在时返回 Conflict
    async fn save(&self, draw: D) -> AppResult<()>;

    async fn count(&self) -> AppResult<u64>;
}

#[async_trait]
pub trait RecommendationRepository<R: CycleRecord>: Send + Sync {
    /// 按游戏号排序
    async fn find_by_cycle(&self, target_draw_id: i32) -> AppResult<Vec<R>>;

    async fn exists_for_cycle(&self, target_draw_id: i32) -> AppResult<bool> {
        Ok(!self.find_by_cycle(target_draw_id).await?.is_empty())
    }

    async fn save(&self, recommendation: R) -> AppResult<()>;

    /// 全部写入或全部不写入
    async fn save_many(&self, recommendations: Vec<R>) -> AppResult<()>;
}

#[async_trait]
pub trait ResultRepository<T: ResultRecord>: Send + Sync {
    async fn exists(&self, recommendation_id: Uuid) -> AppResult<bool>;

    async fn find_by_recommendation(&self, recommendation_id: Uuid) -> AppResult<Option<T>>;

    /// 同一推荐已有结果时返回 Conflict
    async fn save(&self, result: T) -> AppResult<()>;
}

/// 全部仓储的集合，服务之间共享
#[derive(Clone)]
pub struct Repositories {
    pub lotto_draws: Arc<dyn DrawRepository<LottoDraw>>,
    pub pension_draws: Arc<dyn DrawRepository<PensionDraw>>,
    pub lotto_recommendations: Arc<dyn RecommendationRepository<LottoRecommendation>>,
    pub pension_recommendations: Arc<dyn RecommendationRepository<PensionRecommendation>>,
    pub lotto_results: Arc<dyn ResultRepository<LottoResult>>,
    pub pension_results: Arc<dyn ResultRepository<PensionResult>>,
}

impl Repositories {
    pub fn postgres(pool: DatabaseConnection) -> Self {
        Repositories {
            lotto_draws: Arc::new(postgres::LottoDrawRepository::new(pool.clone())),
            pension_draws: Arc::new(postgres::PensionDrawRepository::new(pool.clone())),
            lotto_recommendations: Arc::new(postgres::LottoRecommendationRepository::new(
                pool.clone(),
            )),
            pension_recommendations: Arc::new(postgres::PensionRecommendationRepository::new(
                pool.clone(),
            )),
            lotto_results: Arc::new(postgres::LottoResultRepository::new(pool.clone())),
            pension_results: Arc::new(postgres::PensionResultRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Repositories {
            lotto_draws: Arc::new(memory::InMemoryDrawRepository::<LottoDraw>::new()),
            pension_draws: Arc::new(memory::InMemoryDrawRepository::<PensionDraw>::new()),
            lotto_recommendations: Arc::new(
                memory::InMemoryRecommendationRepository::<LottoRecommendation>::new(),
            ),
            pension_recommendations: Arc::new(
                memory::InMemoryRecommendationRepository::<PensionRecommendation>::new(),
            ),
            lotto_results: Arc::new(memory::InMemoryResultRepository::<LottoResult>::new()),
            pension_results: Arc::new(memory::InMemoryResultRepository::<PensionResult>::new()),
        }
    }
}
