use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DrawRepository, RecommendationRepository, ResultRepository};
use crate::error::{AppError, AppResult};
use crate::models::{CycleRecord, DrawRecord, ResultRecord};

/// 以回次号为键的内存开奖表
pub struct InMemoryDrawRepository<D> {
    draws: RwLock<BTreeMap<i32, D>>,
}

impl<D: DrawRecord> InMemoryDrawRepository<D> {
    pub fn new() -> Self {
        Self {
            draws: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<D: DrawRecord> Default for InMemoryDrawRepository<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<D: DrawRecord> DrawRepository<D> for InMemoryDrawRepository<D> {
    async fn find_latest(&self) -> AppResult<Option<D>> {
        Ok(self.draws.read().await.values().next_back().cloned())
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<D>> {
        Ok(self.draws.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<D>> {
        Ok(self.draws.read().await.values().cloned().collect())
    }

    async fn find_recent(&self, limit: usize) -> AppResult<Vec<D>> {
        Ok(self
            .draws
            .read()
            .await
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn exists(&self, id: i32) -> AppResult<bool> {
        Ok(self.draws.read().await.contains_key(&id))
    }

    async fn save(&self, draw: D) -> AppResult<()> {
        let mut draws = self.draws.write().await;
        let id = draw.draw_id();
        if draws.contains_key(&id) {
            return Err(AppError::Conflict(format!("draw {id} already stored")));
        }
        draws.insert(id, draw);
        Ok(())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.draws.read().await.len() as u64)
    }
}

pub struct InMemoryRecommendationRepository<R> {
    recommendations: RwLock<Vec<R>>,
}

impl<R: CycleRecord> InMemoryRecommendationRepository<R> {
    pub fn new() -> Self {
        Self {
            recommendations: RwLock::new(Vec::new()),
        }
    }
}

impl<R: CycleRecord> Default for InMemoryRecommendationRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn slot_key<R: CycleRecord>(r: &R) -> (i32, String, i32) {
    (r.target_draw_id(), r.source().to_string(), r.game_number())
}

#[async_trait]
impl<R: CycleRecord> RecommendationRepository<R> for InMemoryRecommendationRepository<R> {
    async fn find_by_cycle(&self, target_draw_id: i32) -> AppResult<Vec<R>> {
        let mut found: Vec<R> = self
            .recommendations
            .read()
            .await
            .iter()
            .filter(|r| r.target_draw_id() == target_draw_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.game_number(), r.source().to_string()));
        Ok(found)
    }

    async fn save(&self, recommendation: R) -> AppResult<()> {
        self.save_many(vec![recommendation]).await
    }

    async fn save_many(&self, recommendations: Vec<R>) -> AppResult<()> {
        let mut stored = self.recommendations.write().await;
        let mut taken: HashSet<(i32, String, i32)> = stored.iter().map(slot_key).collect();
        // 先整体校验，再一次性写入
        for r in &recommendations {
            if !taken.insert(slot_key(r)) {
                return Err(AppError::Conflict(format!(
                    "cycle {} already has {} game {}",
                    r.target_draw_id(),
                    r.source(),
                    r.game_number()
                )));
            }
        }
        stored.extend(recommendations);
        Ok(())
    }
}

pub struct InMemoryResultRepository<T> {
    results: RwLock<HashMap<Uuid, T>>,
}

impl<T: ResultRecord> InMemoryResultRepository<T> {
    pub fn new() -> Self {
        Self {
            results: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: ResultRecord> Default for InMemoryResultRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: ResultRecord> ResultRepository<T> for InMemoryResultRepository<T> {
    async fn exists(&self, recommendation_id: Uuid) -> AppResult<bool> {
        Ok(self.results.read().await.contains_key(&recommendation_id))
    }

    async fn find_by_recommendation(&self, recommendation_id: Uuid) -> AppResult<Option<T>> {
        Ok(self.results.read().await.get(&recommendation_id).cloned())
    }

    async fn save(&self, result: T) -> AppResult<()> {
        let mut results = self.results.write().await;
        let key = result.recommendation_id();
        if results.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "recommendation {key} already has a result"
            )));
        }
        results.insert(key, result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LottoDraw, LottoRecommendation, RecommendationSource};
    use chrono::NaiveDate;

    fn draw(id: i32) -> LottoDraw {
        LottoDraw {
            id,
            draw_date: NaiveDate::from_ymd_opt(2025, 1, 4).unwrap(),
            numbers: vec![1, 2, 3, 4, 5, 6],
            bonus_number: 7,
            prize_tiers: vec![],
        }
    }

    #[tokio::test]
    async fn draws_are_ordered_by_id() {
        let repo = InMemoryDrawRepository::<LottoDraw>::new();
        for id in [3, 1, 2] {
            repo.save(draw(id)).await.unwrap();
        }
        assert_eq!(repo.find_latest().await.unwrap().unwrap().id, 3);
        let ids: Vec<i32> = repo.find_all().await.unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let recent: Vec<i32> = repo
            .find_recent(2)
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(recent, vec![3, 2]);
        assert!(matches!(
            repo.save(draw(2)).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn save_many_is_all_or_nothing() {
        let repo = InMemoryRecommendationRepository::<LottoRecommendation>::new();
        repo.save(LottoRecommendation::new(
            10,
            RecommendationSource::Statistical,
            2,
            vec![1, 2, 3, 4, 5, 6],
            None,
        ))
        .await
        .unwrap();

        let batch = vec![
            LottoRecommendation::new(
                10,
                RecommendationSource::Statistical,
                1,
                vec![1, 2, 3, 4, 5, 6],
                None,
            ),
            LottoRecommendation::new(
                10,
                RecommendationSource::Statistical,
                2,
                vec![1, 2, 3, 4, 5, 6],
                None,
            ),
        ];
        assert!(matches!(
            repo.save_many(batch).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(repo.find_by_cycle(10).await.unwrap().len(), 1);
    }
}
