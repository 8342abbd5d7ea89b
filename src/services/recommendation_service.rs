use crate::config::RecommendationConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    LOTTO_MAX_NUMBER, LOTTO_MIN_NUMBER, LOTTO_SET_SIZE, LottoBatch, LottoRecommendation,
    PENSION_GROUPS, PensionBatch, PensionRecommendation, RecommendationSource, is_valid_group,
    is_valid_lotto_set, is_valid_pension_digits,
};
use crate::repositories::Repositories;
use crate::services::ai_recommender::AiRecommender;
use crate::services::candidate_selector::select_candidates;
use crate::services::statistics_service::StatisticsService;
use crate::utils::{SharedRng, pick_random};

/// 组装一个回次的完整推荐批次
///
/// 批次先在内存中生成，再通过一次 `save_many` 写入；回次已有推荐时拒绝写入。
#[derive(Clone)]
pub struct RecommendationComposer {
    repos: Repositories,
    statistics: StatisticsService,
    ai: AiRecommender,
    settings: RecommendationConfig,
    rng: SharedRng,
}

impl RecommendationComposer {
    pub fn new(
        repos: Repositories,
        statistics: StatisticsService,
        ai: AiRecommender,
        settings: RecommendationConfig,
        rng: SharedRng,
    ) -> Self {
        Self {
            repos,
            statistics,
            ai,
            settings,
            rng,
        }
    }

    /// 最新已存回次 + 1，无数据时为 1
    pub async fn next_lotto_target(&self) -> AppResult<i32> {
        let latest = self.repos.lotto_draws.find_latest().await?;
        Ok(latest.map_or(1, |d| d.id + 1))
    }

    pub async fn next_pension_target(&self) -> AppResult<i32> {
        let latest = self.repos.pension_draws.find_latest().await?;
        Ok(latest.map_or(1, |d| d.id + 1))
    }

    pub async fn compose_lotto(&self, target_draw_id: i32) -> AppResult<LottoBatch> {
        if self
            .repos
            .lotto_recommendations
            .exists_for_cycle(target_draw_id)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "lotto draw {target_draw_id} already has recommendations"
            )));
        }

        let summary = self.statistics.lotto_summary().await?;
        let mut candidates = select_candidates(&summary, self.settings.exclude_count);
        if candidates.len() < LOTTO_SET_SIZE {
            log::warn!(
                "Only {} candidates after excluding {}, using the full range",
                candidates.len(),
                self.settings.exclude_count
            );
            candidates = (LOTTO_MIN_NUMBER..=LOTTO_MAX_NUMBER).collect();
        }

        let mut recommendations =
            Vec::with_capacity(self.settings.statistical_games + self.settings.ai_games);
        for game in 1..=self.settings.statistical_games {
            let numbers = self
                .rng
                .with(|rng| pick_random(rng, &candidates, LOTTO_SET_SIZE));
            recommendations.push(LottoRecommendation::new(
                target_draw_id,
                RecommendationSource::Statistical,
                game as i32,
                numbers,
                None,
            ));
        }

        if self.settings.ai_games > 0 {
            let recent = self
                .repos
                .lotto_draws
                .find_recent(self.settings.ai_history)
                .await?;
            let picks = self.ai.recommend(&recent, self.settings.ai_games).await;
            for (i, pick) in picks.into_iter().enumerate() {
                recommendations.push(LottoRecommendation::new(
                    target_draw_id,
                    RecommendationSource::Ai,
                    (self.settings.statistical_games + i + 1) as i32,
                    pick.numbers,
                    Some(pick.reasoning),
                ));
            }
        }

        if let Some(bad) = recommendations.iter().find(|r| !is_valid_lotto_set(&r.numbers)) {
            return Err(AppError::InternalError(format!(
                "generated invalid lotto set {:?}",
                bad.numbers
            )));
        }

        self.repos
            .lotto_recommendations
            .save_many(recommendations.clone())
            .await?;
        log::info!(
            "Generated {} lotto recommendations for draw {target_draw_id}",
            recommendations.len()
        );

        Ok(LottoBatch {
            target_draw_id,
            recommendations,
        })
    }

    /// 每个排名的数字组合搭配组号 1..5，游戏号 = 排名 × 5 + 组号
    pub async fn compose_pension(&self, target_draw_id: i32) -> AppResult<PensionBatch> {
        if self
            .repos
            .pension_recommendations
            .exists_for_cycle(target_draw_id)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "pension draw {target_draw_id} already has recommendations"
            )));
        }

        let ranks = self.settings.pension_ranks.max(1);
        let ranked = self.statistics.ranked_pension_digits(ranks).await?;
        let groups_per_rank = PENSION_GROUPS.count() as i32;

        let mut recommendations = Vec::with_capacity(ranked.len() * groups_per_rank as usize);
        for (rank, digits) in ranked.iter().enumerate() {
            for group_no in PENSION_GROUPS {
                recommendations.push(PensionRecommendation::new(
                    target_draw_id,
                    RecommendationSource::Statistical,
                    rank as i32 * groups_per_rank + group_no,
                    group_no,
                    digits.clone(),
                ));
            }
        }

        if let Some(bad) = recommendations
            .iter()
            .find(|r| !is_valid_group(r.group_no) || !is_valid_pension_digits(&r.digits))
        {
            return Err(AppError::InternalError(format!(
                "generated invalid pension set {}/{}",
                bad.group_no, bad.digits
            )));
        }

        self.repos
            .pension_recommendations
            .save_many(recommendations.clone())
            .await?;
        log::info!(
            "Generated {} pension recommendations for draw {target_draw_id}",
            recommendations.len()
        );

        Ok(PensionBatch {
            target_draw_id,
            recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LottoDraw, PensionDraw};
    use chrono::NaiveDate;
    use std::collections::HashSet;
    use std::time::Duration;

    fn composer(repos: &Repositories, settings: RecommendationConfig) -> RecommendationComposer {
        let rng = SharedRng::from_seed(Some(2024));
        let statistics = StatisticsService::new(
            repos.lotto_draws.clone(),
            repos.pension_draws.clone(),
            rng.clone(),
        );
        let ai = AiRecommender::new(None, rng.clone(), Duration::from_secs(1));
        RecommendationComposer::new(repos.clone(), statistics, ai, settings, rng)
    }

    async fn seed_lotto(repos: &Repositories) {
        let sets = [
            [1, 2, 3, 4, 5, 6],
            [1, 2, 3, 10, 11, 12],
            [1, 7, 8, 9, 10, 40],
            [13, 14, 15, 16, 17, 18],
        ];
        for (i, numbers) in sets.iter().enumerate() {
            repos
                .lotto_draws
                .save(LottoDraw {
                    id: i as i32 + 1,
                    draw_date: NaiveDate::from_ymd_opt(2025, 1, 4).unwrap(),
                    numbers: numbers.to_vec(),
                    bonus_number: 45,
                    prize_tiers: vec![],
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn lotto_batch_has_statistical_then_ai_games() {
        let repos = Repositories::in_memory();
        seed_lotto(&repos).await;
        let composer = composer(&repos, RecommendationConfig::default());

        let target = composer.next_lotto_target().await.unwrap();
        assert_eq!(target, 5);

        let batch = composer.compose_lotto(target).await.unwrap();
        assert_eq!(batch.recommendations.len(), 5);

        let candidates: HashSet<i32> = composer
            .statistics
            .candidates(20)
            .await
            .unwrap()
            .into_iter()
            .collect();
        for (i, r) in batch.recommendations.iter().enumerate() {
            assert_eq!(r.game_number, i as i32 + 1);
            assert!(is_valid_lotto_set(&r.numbers));
            assert!(r.numbers.windows(2).all(|w| w[0] < w[1]));
            if i < 3 {
                assert_eq!(r.source, RecommendationSource::Statistical);
                assert!(r.ai_reasoning.is_none());
                assert!(r.numbers.iter().all(|n| candidates.contains(n)));
            } else {
                assert_eq!(r.source, RecommendationSource::Ai);
                assert!(r.ai_reasoning.is_some());
            }
        }
        assert_eq!(
            repos.lotto_recommendations.find_by_cycle(5).await.unwrap().len(),
            5
        );
    }

    #[tokio::test]
    async fn second_compose_for_same_cycle_is_refused() {
        let repos = Repositories::in_memory();
        let composer = composer(&repos, RecommendationConfig::default());

        composer.compose_lotto(1).await.unwrap();
        assert!(matches!(
            composer.compose_lotto(1).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(
            repos.lotto_recommendations.find_by_cycle(1).await.unwrap().len(),
            5
        );
    }

    #[tokio::test]
    async fn pension_batch_pairs_digits_with_groups() {
        let repos = Repositories::in_memory();
        for (id, digits) in [(1, "112703"), (2, "512704"), (3, "112803")] {
            repos
                .pension_draws
                .save(PensionDraw {
                    id,
                    draw_date: None,
                    group_no: Some(3),
                    digits: Some(digits.to_string()),
                    prize_tiers: vec![],
                })
                .await
                .unwrap();
        }
        let composer = composer(&repos, RecommendationConfig::default());

        let target = composer.next_pension_target().await.unwrap();
        let batch = composer.compose_pension(target).await.unwrap();
        assert_eq!(batch.target_draw_id, 4);
        assert_eq!(batch.recommendations.len(), 5);
        for (i, r) in batch.recommendations.iter().enumerate() {
            assert_eq!(r.game_number, i as i32 + 1);
            assert_eq!(r.group_no, i as i32 + 1);
            assert_eq!(r.digits, "112703");
            assert_eq!(r.source, RecommendationSource::Statistical);
        }
    }

    #[tokio::test]
    async fn multiple_pension_ranks_use_distinct_digits() {
        let repos = Repositories::in_memory();
        let settings = RecommendationConfig {
            pension_ranks: 3,
            ..RecommendationConfig::default()
        };
        let composer = composer(&repos, settings);

        let batch = composer.compose_pension(1).await.unwrap();
        assert_eq!(batch.recommendations.len(), 15);
        let games: Vec<i32> = batch.recommendations.iter().map(|r| r.game_number).collect();
        assert_eq!(games, (1..=15).collect::<Vec<_>>());
        let digits: HashSet<&str> = batch
            .recommendations
            .iter()
            .map(|r| r.digits.as_str())
            .collect();
        assert_eq!(digits.len(), 3);
    }
}
