use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::{DrawRepository, RecommendationRepository, ResultRepository};
use crate::entities::{
    lotto_draw_entity as lotto_draws, lotto_recommendation_entity as lotto_recs,
    lotto_result_entity as lotto_results, pension_draw_entity as pension_draws,
    pension_recommendation_entity as pension_recs, pension_result_entity as pension_results,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    LottoDraw, LottoRecommendation, LottoResult, PensionDraw, PensionRecommendation,
    PensionResult,
};

/// 唯一索引冲突转为 Conflict，其余保持数据库错误
fn insert_error(err: DbErr, what: impl FnOnce() -> String) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            AppError::Conflict(format!("{}: {detail}", what()))
        }
        _ => AppError::DatabaseError(err),
    }
}

#[derive(Clone)]
pub struct LottoDrawRepository {
    pool: DatabaseConnection,
}

impl LottoDrawRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DrawRepository<LottoDraw> for LottoDrawRepository {
    async fn find_latest(&self) -> AppResult<Option<LottoDraw>> {
        let model = lotto_draws::Entity::find()
            .order_by_desc(lotto_draws::Column::Id)
            .one(&self.pool)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<LottoDraw>> {
        let model = lotto_draws::Entity::find_by_id(id).one(&self.pool).await?;
        Ok(model.map(Into::into))
    }

    async fn find_all(&self) -> AppResult<Vec<LottoDraw>> {
        let list = lotto_draws::Entity::find()
            .order_by_asc(lotto_draws::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn find_recent(&self, limit: usize) -> AppResult<Vec<LottoDraw>> {
        let list = lotto_draws::Entity::find()
            .order_by_desc(lotto_draws::Column::Id)
            .limit(limit as u64)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn exists(&self, id: i32) -> AppResult<bool> {
        let n = lotto_draws::Entity::find_by_id(id).count(&self.pool).await?;
        Ok(n > 0)
    }

    async fn save(&self, draw: LottoDraw) -> AppResult<()> {
        let id = draw.id;
        lotto_draws::ActiveModel {
            id: Set(draw.id),
            draw_date: Set(draw.draw_date),
            numbers: Set(draw.numbers),
            bonus_number: Set(draw.bonus_number),
            prize_tiers: Set(serde_json::to_value(&draw.prize_tiers)?),
            created_at: NotSet,
        }
        .insert(&self.pool)
        .await
        .map_err(|e| insert_error(e, || format!("lotto draw {id}")))?;
        Ok(())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(lotto_draws::Entity::find().count(&self.pool).await?)
    }
}

#[derive(Clone)]
pub struct PensionDrawRepository {
    pool: DatabaseConnection,
}

impl PensionDrawRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DrawRepository<PensionDraw> for PensionDrawRepository {
    async fn find_latest(&self) -> AppResult<Option<PensionDraw>> {
        let model = pension_draws::Entity::find()
            .order_by_desc(pension_draws::Column::Id)
            .one(&self.pool)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<PensionDraw>> {
        let model = pension_draws::Entity::find_by_id(id).one(&self.pool).await?;
        Ok(model.map(Into::into))
    }

    async fn find_all(&self) -> AppResult<Vec<PensionDraw>> {
        let list = pension_draws::Entity::find()
            .order_by_asc(pension_draws::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn find_recent(&self, limit: usize) -> AppResult<Vec<PensionDraw>> {
        let list = pension_draws::Entity::find()
            .order_by_desc(pension_draws::Column::Id)
            .limit(limit as u64)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn exists(&self, id: i32) -> AppResult<bool> {
        let n = pension_draws::Entity::find_by_id(id)
            .count(&self.pool)
            .await?;
        Ok(n > 0)
    }

    async fn save(&self, draw: PensionDraw) -> AppResult<()> {
        let id = draw.id;
        pension_draws::ActiveModel {
            id: Set(draw.id),
            draw_date: Set(draw.draw_date),
            group_no: Set(draw.group_no),
            digits: Set(draw.digits),
            prize_tiers: Set(serde_json::to_value(&draw.prize_tiers)?),
            created_at: NotSet,
        }
        .insert(&self.pool)
        .await
        .map_err(|e| insert_error(e, || format!("pension draw {id}")))?;
        Ok(())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(pension_draws::Entity::find().count(&self.pool).await?)
    }
}

fn lotto_rec_active(r: LottoRecommendation) -> lotto_recs::ActiveModel {
    lotto_recs::ActiveModel {
        id: Set(r.id),
        target_draw_id: Set(r.target_draw_id),
        source: Set(r.source),
        game_number: Set(r.game_number),
        numbers: Set(r.numbers),
        ai_reasoning: Set(r.ai_reasoning),
        created_at: Set(r.created_at),
    }
}

#[derive(Clone)]
pub struct LottoRecommendationRepository {
    pool: DatabaseConnection,
}

impl LottoRecommendationRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecommendationRepository<LottoRecommendation> for LottoRecommendationRepository {
    async fn find_by_cycle(&self, target_draw_id: i32) -> AppResult<Vec<LottoRecommendation>> {
        let list = lotto_recs::Entity::find()
            .filter(lotto_recs::Column::TargetDrawId.eq(target_draw_id))
            .order_by_asc(lotto_recs::Column::GameNumber)
            .order_by_asc(lotto_recs::Column::Source)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn exists_for_cycle(&self, target_draw_id: i32) -> AppResult<bool> {
        let n = lotto_recs::Entity::find()
            .filter(lotto_recs::Column::TargetDrawId.eq(target_draw_id))
            .count(&self.pool)
            .await?;
        Ok(n > 0)
    }

    async fn save(&self, recommendation: LottoRecommendation) -> AppResult<()> {
        let target = recommendation.target_draw_id;
        lotto_rec_active(recommendation)
            .insert(&self.pool)
            .await
            .map_err(|e| insert_error(e, || format!("lotto recommendation for {target}")))?;
        Ok(())
    }

    async fn save_many(&self, recommendations: Vec<LottoRecommendation>) -> AppResult<()> {
        let txn = self.pool.begin().await?;
        for r in recommendations {
            let target = r.target_draw_id;
            lotto_rec_active(r)
                .insert(&txn)
                .await
                .map_err(|e| insert_error(e, || format!("lotto recommendation for {target}")))?;
        }
        txn.commit().await?;
        Ok(())
    }
}

fn pension_rec_active(r: PensionRecommendation) -> pension_recs::ActiveModel {
    pension_recs::ActiveModel {
        id: Set(r.id),
        target_draw_id: Set(r.target_draw_id),
        source: Set(r.source),
        game_number: Set(r.game_number),
        group_no: Set(r.group_no),
        digits: Set(r.digits),
        ai_reasoning: Set(r.ai_reasoning),
        created_at: Set(r.created_at),
    }
}

#[derive(Clone)]
pub struct PensionRecommendationRepository {
    pool: DatabaseConnection,
}

impl PensionRecommendationRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecommendationRepository<PensionRecommendation> for PensionRecommendationRepository {
    async fn find_by_cycle(&self, target_draw_id: i32) -> AppResult<Vec<PensionRecommendation>> {
        let list = pension_recs::Entity::find()
            .filter(pension_recs::Column::TargetDrawId.eq(target_draw_id))
            .order_by_asc(pension_recs::Column::GameNumber)
            .order_by_asc(pension_recs::Column::Source)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn exists_for_cycle(&self, target_draw_id: i32) -> AppResult<bool> {
        let n = pension_recs::Entity::find()
            .filter(pension_recs::Column::TargetDrawId.eq(target_draw_id))
            .count(&self.pool)
            .await?;
        Ok(n > 0)
    }

    async fn save(&self, recommendation: PensionRecommendation) -> AppResult<()> {
        let target = recommendation.target_draw_id;
        pension_rec_active(recommendation)
            .insert(&self.pool)
            .await
            .map_err(|e| insert_error(e, || format!("pension recommendation for {target}")))?;
        Ok(())
    }

    async fn save_many(&self, recommendations: Vec<PensionRecommendation>) -> AppResult<()> {
        let txn = self.pool.begin().await?;
        for r in recommendations {
            let target = r.target_draw_id;
            pension_rec_active(r)
                .insert(&txn)
                .await
                .map_err(|e| insert_error(e, || format!("pension recommendation for {target}")))?;
        }
        txn.commit().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct LottoResultRepository {
    pool: DatabaseConnection,
}

impl LottoResultRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultRepository<LottoResult> for LottoResultRepository {
    async fn exists(&self, recommendation_id: Uuid) -> AppResult<bool> {
        let n = lotto_results::Entity::find()
            .filter(lotto_results::Column::RecommendationId.eq(recommendation_id))
            .count(&self.pool)
            .await?;
        Ok(n > 0)
    }

    async fn find_by_recommendation(&self, recommendation_id: Uuid) -> AppResult<Option<LottoResult>> {
        let model = lotto_results::Entity::find()
            .filter(lotto_results::Column::RecommendationId.eq(recommendation_id))
            .one(&self.pool)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn save(&self, result: LottoResult) -> AppResult<()> {
        let rec_id = result.recommendation_id;
        lotto_results::ActiveModel {
            id: Set(result.id),
            recommendation_id: Set(result.recommendation_id),
            matched_count: Set(result.matched_count),
            matched_numbers: Set(result.matched_numbers),
            has_bonus: Set(result.has_bonus),
            prize_rank: Set(result.prize_rank),
            created_at: Set(result.created_at),
        }
        .insert(&self.pool)
        .await
        .map_err(|e| insert_error(e, || format!("lotto result for {rec_id}")))?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PensionResultRepository {
    pool: DatabaseConnection,
}

impl PensionResultRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultRepository<PensionResult> for PensionResultRepository {
    async fn exists(&self, recommendation_id: Uuid) -> AppResult<bool> {
        let n = pension_results::Entity::find()
            .filter(pension_results::Column::RecommendationId.eq(recommendation_id))
            .count(&self.pool)
            .await?;
        Ok(n > 0)
    }

    async fn find_by_recommendation(
        &self,
        recommendation_id: Uuid,
    ) -> AppResult<Option<PensionResult>> {
        let model = pension_results::Entity::find()
            .filter(pension_results::Column::RecommendationId.eq(recommendation_id))
            .one(&self.pool)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn save(&self, result: PensionResult) -> AppResult<()> {
        let rec_id = result.recommendation_id;
        pension_results::ActiveModel {
            id: Set(result.id),
            recommendation_id: Set(result.recommendation_id),
            prize_rank: Set(result.prize_rank),
            created_at: Set(result.created_at),
        }
        .insert(&self.pool)
        .await
        .map_err(|e| insert_error(e, || format!("pension result for {rec_id}")))?;
        Ok(())
    }
}
