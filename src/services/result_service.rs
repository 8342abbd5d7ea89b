use chrono::Utc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    CheckedLottoRecommendation, CheckedPensionRecommendation, LottoCheckOutcome, LottoDraw,
    LottoRecommendation, LottoRecommendationView, LottoResult, PENSION_DIGIT_LEN,
    PensionCheckOutcome, PensionRecommendationView, PensionResult, best_of,
};
use crate::repositories::Repositories;

/// 6/45 等级：
/// - 1 等: 6 个
/// - 2 等: 5 个 + 奖金号
/// - 3 等: 5 个
/// - 4 等: 4 个
/// - 5 等: 3 个
pub fn lotto_prize_rank(matched_count: usize, has_bonus: bool) -> Option<i32> {
    match (matched_count, has_bonus) {
        (6, _) => Some(1),
        (5, true) => Some(2),
        (5, false) => Some(3),
        (4, _) => Some(4),
        (3, _) => Some(5),
        _ => None,
    }
}

/// 组号 + 6 位数字等级
///
/// 组号与 6 位全部一致为 1 等；否则按末尾相同位数 L (5..1) 判定，
/// 等级为 `7 - L`，L = 1 时为 7 等。6 等不会出现。
/// 开奖号码未公布或任一方不是 6 位时无法判定。
pub fn pension_prize_rank(
    rec_group: i32,
    rec_digits: &str,
    win_group: Option<i32>,
    win_digits: Option<&str>,
) -> Option<i32> {
    let win_digits = win_digits.filter(|d| d.len() == PENSION_DIGIT_LEN)?;
    if rec_digits.len() != PENSION_DIGIT_LEN {
        return None;
    }

    if win_group == Some(rec_group) && rec_digits == win_digits {
        return Some(1);
    }

    (1..PENSION_DIGIT_LEN).rev().find_map(|len| {
        let start = PENSION_DIGIT_LEN - len;
        (rec_digits.get(start..) == win_digits.get(start..))
            .then_some(if len == 1 { 7 } else { 7 - len as i32 })
    })
}

/// 单注 6/45 比对
pub fn classify_lotto(recommendation: &LottoRecommendation, draw: &LottoDraw) -> LottoResult {
    let matched_numbers: Vec<i32> = recommendation
        .numbers
        .iter()
        .copied()
        .filter(|n| draw.numbers.contains(n))
        .collect();
    let has_bonus = recommendation.numbers.contains(&draw.bonus_number);

    LottoResult {
        id: Uuid::new_v4(),
        recommendation_id: recommendation.id,
        matched_count: matched_numbers.len() as i32,
        prize_rank: lotto_prize_rank(matched_numbers.len(), has_bonus),
        matched_numbers,
        has_bonus,
        created_at: Utc::now(),
    }
}

/// 开奖后比对推荐，写入中奖结果
#[derive(Clone)]
pub struct ResultClassifier {
    repos: Repositories,
}

impl ResultClassifier {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// 回次或推荐不存在时返回 None；已有结果的推荐不会重复写入
    pub async fn check_lotto_cycle(&self, draw_id: i32) -> AppResult<Option<LottoCheckOutcome>> {
        log::info!("Checking results for draw #{draw_id}...");

        let Some(draw) = self.repos.lotto_draws.find_by_id(draw_id).await? else {
            log::warn!("Draw #{draw_id} not found");
            return Ok(None);
        };

        let recommendations = self.repos.lotto_recommendations.find_by_cycle(draw_id).await?;
        if recommendations.is_empty() {
            log::warn!("No recommendations found for draw #{draw_id}");
            return Ok(None);
        }

        let total_recommendations = recommendations.len();
        let mut entries = Vec::with_capacity(total_recommendations);
        for recommendation in recommendations {
            if let Some(existing) = self
                .repos
                .lotto_results
                .find_by_recommendation(recommendation.id)
                .await?
            {
                log::debug!("Result already exists for recommendation {}", recommendation.id);
                entries.push(CheckedLottoRecommendation {
                    recommendation,
                    result: existing,
                    newly_classified: false,
                });
                continue;
            }

            let result = classify_lotto(&recommendation, &draw);
            self.repos.lotto_results.save(result.clone()).await?;
            log::info!(
                "Game {} ({}): {} matched{}",
                recommendation.game_number,
                recommendation.source,
                result.matched_count,
                result
                    .prize_rank
                    .map(|r| format!(" - rank {r}"))
                    .unwrap_or_default()
            );
            entries.push(CheckedLottoRecommendation {
                recommendation,
                result,
                newly_classified: true,
            });
        }

        let best_rank = best_of(entries.iter().map(|e| e.result.prize_rank));
        let newly_classified = entries.iter().filter(|e| e.newly_classified).count();
        log::info!(
            "Result check completed for draw #{draw_id}. Best rank: {}, newly classified: {newly_classified}",
            best_rank.map_or("none".to_string(), |r| r.to_string())
        );

        Ok(Some(LottoCheckOutcome {
            draw,
            entries,
            total_recommendations,
            best_rank,
            newly_classified,
        }))
    }

    /// 某回次的推荐及已有结果，不做核对
    pub async fn lotto_cycle_view(&self, draw_id: i32) -> AppResult<Vec<LottoRecommendationView>> {
        let recommendations = self.repos.lotto_recommendations.find_by_cycle(draw_id).await?;
        let mut views = Vec::with_capacity(recommendations.len());
        for recommendation in recommendations {
            let result = self
                .repos
                .lotto_results
                .find_by_recommendation(recommendation.id)
                .await?;
            views.push(LottoRecommendationView {
                recommendation,
                result,
            });
        }
        Ok(views)
    }

    pub async fn pension_cycle_view(
        &self,
        draw_id: i32,
    ) -> AppResult<Vec<PensionRecommendationView>> {
        let recommendations = self
            .repos
            .pension_recommendations
            .find_by_cycle(draw_id)
            .await?;
        let mut views = Vec::with_capacity(recommendations.len());
        for recommendation in recommendations {
            let result = self
                .repos
                .pension_results
                .find_by_recommendation(recommendation.id)
                .await?;
            views.push(PensionRecommendationView {
                recommendation,
                result,
            });
        }
        Ok(views)
    }

    pub async fn check_pension_cycle(
        &self,
        draw_id: i32,
    ) -> AppResult<Option<PensionCheckOutcome>> {
        log::info!("Checking pension results for draw #{draw_id}...");

        let Some(draw) = self.repos.pension_draws.find_by_id(draw_id).await? else {
            log::warn!("Pension draw #{draw_id} not found");
            return Ok(None);
        };

        let recommendations = self
            .repos
            .pension_recommendations
            .find_by_cycle(draw_id)
            .await?;
        if recommendations.is_empty() {
            log::warn!("No pension recommendations found for draw #{draw_id}");
            return Ok(None);
        }

        let total_recommendations = recommendations.len();
        let mut entries = Vec::with_capacity(total_recommendations);
        for recommendation in recommendations {
            if let Some(existing) = self
                .repos
                .pension_results
                .find_by_recommendation(recommendation.id)
                .await?
            {
                entries.push(CheckedPensionRecommendation {
                    recommendation,
                    result: existing,
                    newly_classified: false,
                });
                continue;
            }

            let result = PensionResult {
                id: Uuid::new_v4(),
                recommendation_id: recommendation.id,
                prize_rank: pension_prize_rank(
                    recommendation.group_no,
                    &recommendation.digits,
                    draw.group_no,
                    draw.digits.as_deref(),
                ),
                created_at: Utc::now(),
            };
            self.repos.pension_results.save(result.clone()).await?;
            entries.push(CheckedPensionRecommendation {
                recommendation,
                result,
                newly_classified: true,
            });
        }

        let best_rank = best_of(entries.iter().map(|e| e.result.prize_rank));
        let newly_classified = entries.iter().filter(|e| e.newly_classified).count();
        log::info!(
            "Pension result check completed for draw #{draw_id}. Best rank: {}, newly classified: {newly_classified}",
            best_rank.map_or("none".to_string(), |r| r.to_string())
        );

        Ok(Some(PensionCheckOutcome {
            draw,
            entries,
            total_recommendations,
            best_rank,
            newly_classified,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PensionDraw, PensionRecommendation, RecommendationSource};
    use chrono::NaiveDate;

    #[test]
    fn lotto_rank_table() {
        assert_eq!(lotto_prize_rank(6, false), Some(1));
        assert_eq!(lotto_prize_rank(6, true), Some(1));
        assert_eq!(lotto_prize_rank(5, true), Some(2));
        assert_eq!(lotto_prize_rank(5, false), Some(3));
        assert_eq!(lotto_prize_rank(4, true), Some(4));
        assert_eq!(lotto_prize_rank(3, false), Some(5));
        for matched in 0..=2 {
            assert_eq!(lotto_prize_rank(matched, true), None);
            assert_eq!(lotto_prize_rank(matched, false), None);
        }
    }

    #[test]
    fn five_matches_without_bonus_is_third() {
        let draw = LottoDraw {
            id: 1,
            draw_date: NaiveDate::from_ymd_opt(2025, 1, 4).unwrap(),
            numbers: vec![1, 2, 3, 4, 5, 6],
            bonus_number: 7,
            prize_tiers: vec![],
        };
        let rec = LottoRecommendation::new(
            1,
            RecommendationSource::Statistical,
            1,
            vec![1, 2, 3, 4, 5, 9],
            None,
        );
        let result = classify_lotto(&rec, &draw);
        assert_eq!(result.matched_count, 5);
        assert_eq!(result.matched_numbers, vec![1, 2, 3, 4, 5]);
        assert!(!result.has_bonus);
        assert_eq!(result.prize_rank, Some(3));

        let rec = LottoRecommendation::new(
            1,
            RecommendationSource::Ai,
            4,
            vec![1, 2, 3, 4, 5, 7],
            None,
        );
        assert_eq!(classify_lotto(&rec, &draw).prize_rank, Some(2));
    }

    #[test]
    fn pension_rank_table() {
        let win = Some("112703");
        assert_eq!(pension_prize_rank(3, "112703", Some(3), win), Some(1));
        // 组号不同时按末尾位数判定
        assert_eq!(pension_prize_rank(2, "112703", Some(3), win), Some(2));
        assert_eq!(pension_prize_rank(3, "012703", Some(3), win), Some(2));
        assert_eq!(pension_prize_rank(3, "992703", Some(3), win), Some(3));
        assert_eq!(pension_prize_rank(3, "999703", Some(3), win), Some(4));
        assert_eq!(pension_prize_rank(3, "999903", Some(3), win), Some(5));
        assert_eq!(pension_prize_rank(3, "999993", Some(3), win), Some(7));
        assert_eq!(pension_prize_rank(3, "999999", Some(3), win), None);
    }

    #[test]
    fn pension_rank_needs_published_six_digits() {
        assert_eq!(pension_prize_rank(3, "112703", Some(3), None), None);
        assert_eq!(pension_prize_rank(3, "112703", Some(3), Some("12703")), None);
        assert_eq!(pension_prize_rank(3, "12703", Some(3), Some("112703")), None);
        // 组号未公布时最多到 2 等
        assert_eq!(pension_prize_rank(3, "112703", None, Some("112703")), Some(2));
    }

    #[test]
    fn pension_rank_six_never_occurs() {
        let win = "123456";
        for a in 0..10u32 {
            for b in 0..10u32 {
                let rec = format!("{a}{b}3456");
                assert_ne!(pension_prize_rank(1, &rec, Some(1), Some(win)), Some(6));
            }
        }
    }

    async fn seeded_lotto() -> (Repositories, ResultClassifier) {
        let repos = Repositories::in_memory();
        repos
            .lotto_draws
            .save(LottoDraw {
                id: 10,
                draw_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                numbers: vec![1, 2, 3, 4, 5, 6],
                bonus_number: 7,
                prize_tiers: vec![],
            })
            .await
            .unwrap();
        let stat = RecommendationSource::Statistical;
        let recs = vec![
            LottoRecommendation::new(10, stat, 1, vec![1, 2, 3, 4, 5, 9], None),
            LottoRecommendation::new(10, stat, 2, vec![1, 2, 3, 20, 21, 22], None),
            LottoRecommendation::new(
                10,
                RecommendationSource::Ai,
                3,
                vec![30, 31, 32, 33, 34, 35],
                Some("pattern".into()),
            ),
        ];
        repos.lotto_recommendations.save_many(recs).await.unwrap();
        let classifier = ResultClassifier::new(repos.clone());
        (repos, classifier)
    }

    #[tokio::test]
    async fn checking_twice_is_idempotent() {
        let (repos, classifier) = seeded_lotto().await;

        let first = classifier.check_lotto_cycle(10).await.unwrap().unwrap();
        assert_eq!(first.total_recommendations, 3);
        assert_eq!(first.newly_classified, 3);
        assert_eq!(first.best_rank, Some(3));

        let second = classifier.check_lotto_cycle(10).await.unwrap().unwrap();
        assert_eq!(second.newly_classified, 0);
        assert_eq!(second.best_rank, first.best_rank);

        for entry in &first.entries {
            let stored = repos
                .lotto_results
                .find_by_recommendation(entry.recommendation.id)
                .await
                .unwrap()
                .unwrap();
            // 第二次运行读到的是第一次写入的结果
            let again = second
                .entries
                .iter()
                .find(|e| e.recommendation.id == entry.recommendation.id)
                .unwrap();
            assert_eq!(again.result.id, stored.id);
            assert_eq!(stored.id, entry.result.id);
        }
    }

    #[tokio::test]
    async fn cycle_view_shows_results_after_check() {
        let (_repos, classifier) = seeded_lotto().await;

        let before = classifier.lotto_cycle_view(10).await.unwrap();
        assert_eq!(before.len(), 3);
        assert!(before.iter().all(|v| v.result.is_none()));

        classifier.check_lotto_cycle(10).await.unwrap();
        let after = classifier.lotto_cycle_view(10).await.unwrap();
        assert_eq!(after[0].result.as_ref().unwrap().prize_rank, Some(3));
        assert!(classifier.pension_cycle_view(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_draw_or_recommendations_yield_none() {
        let (_repos, classifier) = seeded_lotto().await;
        assert!(classifier.check_lotto_cycle(11).await.unwrap().is_none());

        let repos = Repositories::in_memory();
        repos
            .pension_draws
            .save(PensionDraw {
                id: 5,
                draw_date: None,
                group_no: Some(3),
                digits: Some("112703".into()),
                prize_tiers: vec![],
            })
            .await
            .unwrap();
        let classifier = ResultClassifier::new(repos);
        assert!(classifier.check_pension_cycle(5).await.unwrap().is_none());
        assert!(classifier.check_pension_cycle(6).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pension_cycle_check_records_ranks() {
        let repos = Repositories::in_memory();
        repos
            .pension_draws
            .save(PensionDraw {
                id: 5,
                draw_date: None,
                group_no: Some(3),
                digits: Some("112703".into()),
                prize_tiers: vec![],
            })
            .await
            .unwrap();
        let recs: Vec<PensionRecommendation> = (1..=5)
            .map(|g| {
                PensionRecommendation::new(
                    5,
                    RecommendationSource::Statistical,
                    g,
                    g,
                    "992703".into(),
                )
            })
            .collect();
        repos.pension_recommendations.save_many(recs).await.unwrap();

        let classifier = ResultClassifier::new(repos.clone());
        let outcome = classifier.check_pension_cycle(5).await.unwrap().unwrap();
        assert_eq!(outcome.newly_classified, 5);
        assert!(outcome.entries.iter().all(|e| e.result.prize_rank == Some(3)));
        assert_eq!(outcome.best_rank, Some(3));

        let again = classifier.check_pension_cycle(5).await.unwrap().unwrap();
        assert_eq!(again.newly_classified, 0);
        assert_eq!(again.best_rank, Some(3));
    }
}
