use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{
    DrawRecord, LOTTO_MAX_NUMBER, LOTTO_MIN_NUMBER, LottoDraw, PensionDraw, SyncOutcome,
    is_valid_group, is_valid_lotto_set, is_valid_pension_digits,
};
use crate::repositories::{DrawRepository, Repositories};

/// 官方开奖数据来源
#[async_trait]
pub trait DrawSource<D: DrawRecord>: Send + Sync {
    async fn latest_draw_id(&self) -> AppResult<i32>;

    /// 闭区间；缺失的回次直接略过
    async fn draw_range(&self, start: i32, end: i32) -> AppResult<Vec<D>>;
}

fn is_storable_lotto(draw: &LottoDraw) -> bool {
    is_valid_lotto_set(&draw.numbers)
        && (LOTTO_MIN_NUMBER..=LOTTO_MAX_NUMBER).contains(&draw.bonus_number)
        && !draw.numbers.contains(&draw.bonus_number)
}

fn is_storable_pension(draw: &PensionDraw) -> bool {
    draw.group_no.is_none_or(is_valid_group)
        && draw.digits.as_deref().is_none_or(is_valid_pension_digits)
}

/// 把新公布的开奖写入本地，已存在的回次跳过
#[derive(Clone)]
pub struct SyncService {
    repos: Repositories,
    lotto_source: Arc<dyn DrawSource<LottoDraw>>,
    pension_source: Arc<dyn DrawSource<PensionDraw>>,
}

impl SyncService {
    pub fn new(
        repos: Repositories,
        lotto_source: Arc<dyn DrawSource<LottoDraw>>,
        pension_source: Arc<dyn DrawSource<PensionDraw>>,
    ) -> Self {
        Self {
            repos,
            lotto_source,
            pension_source,
        }
    }

    /// 起始默认为最新已存回次 + 1，结束默认为数据源最新回次
    pub async fn sync_lotto(
        &self,
        start: Option<i32>,
        end: Option<i32>,
    ) -> AppResult<SyncOutcome> {
        sync_draws(
            "lotto",
            self.repos.lotto_draws.as_ref(),
            self.lotto_source.as_ref(),
            start,
            end,
            is_storable_lotto,
        )
        .await
    }

    pub async fn sync_pension(
        &self,
        start: Option<i32>,
        end: Option<i32>,
    ) -> AppResult<SyncOutcome> {
        sync_draws(
            "pension",
            self.repos.pension_draws.as_ref(),
            self.pension_source.as_ref(),
            start,
            end,
            is_storable_pension,
        )
        .await
    }
}

async fn sync_draws<D: DrawRecord + std::fmt::Debug>(
    label: &str,
    repo: &dyn DrawRepository<D>,
    source: &dyn DrawSource<D>,
    start: Option<i32>,
    end: Option<i32>,
    storable: fn(&D) -> bool,
) -> AppResult<SyncOutcome> {
    log::info!("Starting {label} draw synchronization...");

    let start = match start {
        Some(id) => id,
        None => repo.find_latest().await?.map_or(1, |d| d.draw_id() + 1),
    };
    let end = match end {
        Some(id) => id,
        None => source.latest_draw_id().await?,
    };

    if start > end {
        log::info!("No new {label} draws to sync (next #{start}, latest #{end})");
        return Ok(SyncOutcome::empty(start, end));
    }

    log::info!("Syncing {label} draws from #{start} to #{end}");
    let fetched = source.draw_range(start, end).await?;
    log::info!("Fetched {} {label} draws from source", fetched.len());

    let mut new_draws = Vec::new();
    for draw in fetched {
        let id = draw.draw_id();
        if repo.exists(id).await? {
            log::debug!("Draw #{id} already exists, skipping");
            continue;
        }
        if !storable(&draw) {
            log::warn!("Skipping malformed {label} draw #{id}: {draw:?}");
            continue;
        }
        match repo.save(draw).await {
            Ok(()) => {
                log::info!("Synced {label} draw #{id}");
                new_draws.push(id);
            }
            Err(AppError::Conflict(_)) => log::debug!("Draw #{id} stored concurrently, skipping"),
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "Synchronization complete. Synced {} new {label} draws.",
        new_draws.len()
    );
    Ok(SyncOutcome {
        synced_count: new_draws.len(),
        start_draw_id: start,
        end_draw_id: end,
        new_draws,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tokio::sync::Mutex;

    /// 内存数据源，可记录请求区间并模拟失败
    pub(crate) struct FakeSource<D> {
        pub draws: Vec<D>,
        pub fail: bool,
        pub requests: Mutex<Vec<(i32, i32)>>,
    }

    impl<D> FakeSource<D> {
        pub fn new(draws: Vec<D>) -> Self {
            Self {
                draws,
                fail: false,
                requests: Mutex::new(vec![]),
            }
        }

        pub fn failing() -> Self {
            Self {
                draws: vec![],
                fail: true,
                requests: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl<D: DrawRecord> DrawSource<D> for FakeSource<D> {
        async fn latest_draw_id(&self) -> AppResult<i32> {
            if self.fail {
                return Err(AppError::ExternalApiError("source down".into()));
            }
            Ok(self.draws.iter().map(|d| d.draw_id()).max().unwrap_or(0))
        }

        async fn draw_range(&self, start: i32, end: i32) -> AppResult<Vec<D>> {
            if self.fail {
                return Err(AppError::ExternalApiError("source down".into()));
            }
            self.requests.lock().await.push((start, end));
            Ok(self
                .draws
                .iter()
                .filter(|d| (start..=end).contains(&d.draw_id()))
                .cloned()
                .collect())
        }
    }

    pub(crate) fn lotto_draw(id: i32, numbers: [i32; 6], bonus: i32) -> LottoDraw {
        LottoDraw {
            id,
            draw_date: NaiveDate::from_ymd_opt(2025, 1, 4).unwrap()
                + chrono::Duration::weeks(id as i64),
            numbers: numbers.to_vec(),
            bonus_number: bonus,
            prize_tiers: vec![],
        }
    }

    fn service(
        repos: &Repositories,
        lotto: Vec<LottoDraw>,
        pension: Vec<PensionDraw>,
    ) -> SyncService {
        SyncService::new(
            repos.clone(),
            Arc::new(FakeSource::new(lotto)),
            Arc::new(FakeSource::new(pension)),
        )
    }

    #[tokio::test]
    async fn syncs_only_missing_draws() {
        let repos = Repositories::in_memory();
        repos
            .lotto_draws
            .save(lotto_draw(1, [1, 2, 3, 4, 5, 6], 7))
            .await
            .unwrap();
        // 第 3 回缺失
        let remote = vec![
            lotto_draw(1, [1, 2, 3, 4, 5, 6], 7),
            lotto_draw(2, [7, 8, 9, 10, 11, 12], 13),
            lotto_draw(4, [14, 15, 16, 17, 18, 19], 20),
        ];
        let sync = service(&repos, remote, vec![]);

        let outcome = sync.sync_lotto(None, None).await.unwrap();
        assert_eq!(outcome.start_draw_id, 2);
        assert_eq!(outcome.end_draw_id, 4);
        assert_eq!(outcome.new_draws, vec![2, 4]);
        assert_eq!(outcome.synced_count, 2);
        assert_eq!(repos.lotto_draws.count().await.unwrap(), 3);

        let again = sync.sync_lotto(None, None).await.unwrap();
        assert_eq!(again, SyncOutcome::empty(5, 4));
    }

    #[tokio::test]
    async fn explicit_range_skips_existing_and_malformed() {
        let repos = Repositories::in_memory();
        repos
            .lotto_draws
            .save(lotto_draw(2, [7, 8, 9, 10, 11, 12], 13))
            .await
            .unwrap();
        let remote = vec![
            lotto_draw(1, [1, 2, 3, 4, 5, 6], 7),
            lotto_draw(2, [7, 8, 9, 10, 11, 12], 13),
            lotto_draw(3, [1, 1, 2, 3, 4, 5], 7),
        ];
        let sync = service(&repos, remote, vec![]);

        let outcome = sync.sync_lotto(Some(1), Some(3)).await.unwrap();
        assert_eq!(outcome.new_draws, vec![1]);
        assert!(!repos.lotto_draws.exists(3).await.unwrap());
    }

    #[tokio::test]
    async fn pension_sync_keeps_unpublished_digits() {
        let repos = Repositories::in_memory();
        let remote = vec![
            PensionDraw {
                id: 1,
                draw_date: None,
                group_no: Some(2),
                digits: Some("123456".into()),
                prize_tiers: vec![],
            },
            PensionDraw {
                id: 2,
                draw_date: None,
                group_no: None,
                digits: None,
                prize_tiers: vec![],
            },
        ];
        let sync = service(&repos, vec![], remote);
        let outcome = sync.sync_pension(None, None).await.unwrap();
        assert_eq!(outcome.new_draws, vec![1, 2]);
    }

    #[tokio::test]
    async fn source_failure_is_reported() {
        let repos = Repositories::in_memory();
        let sync = SyncService::new(
            repos,
            Arc::new(FakeSource::<LottoDraw>::failing()),
            Arc::new(FakeSource::<PensionDraw>::failing()),
        );
        assert!(sync.sync_lotto(None, None).await.is_err());
    }
}
