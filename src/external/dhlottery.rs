use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::DrawSourceConfig;
use crate::error::{AppError, AppResult};
use crate::models::{LottoDraw, PrizeTier};
use crate::services::sync_service::DrawSource;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// 全部回次接口中的单条记录
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhLotteryDrawData {
    pub lt_epsd: i32,
    pub tm1_wn_no: i32,
    pub tm2_wn_no: i32,
    pub tm3_wn_no: i32,
    pub tm4_wn_no: i32,
    pub tm5_wn_no: i32,
    pub tm6_wn_no: i32,
    pub bns_wn_no: i32,
    /// YYYYMMDD
    pub lt_rfl_ymd: String,
    #[serde(default)]
    pub rnk1_wn_amt: i64,
    #[serde(default)]
    pub rnk1_wn_nope: i64,
    #[serde(default)]
    pub rnk2_wn_amt: i64,
    #[serde(default)]
    pub rnk2_wn_nope: i64,
    #[serde(default)]
    pub rnk3_wn_amt: i64,
    #[serde(default)]
    pub rnk3_wn_nope: i64,
}

#[derive(Debug, Deserialize)]
pub struct DhLotteryAllResponse {
    pub data: DhLotteryAllData,
}

#[derive(Debug, Deserialize)]
pub struct DhLotteryAllData {
    #[serde(default)]
    pub list: Vec<DhLotteryDrawData>,
}

impl TryFrom<DhLotteryDrawData> for LottoDraw {
    type Error = AppError;

    fn try_from(d: DhLotteryDrawData) -> Result<Self, Self::Error> {
        let draw_date = NaiveDate::parse_from_str(&d.lt_rfl_ymd, "%Y%m%d").map_err(|e| {
            AppError::ExternalApiError(format!(
                "invalid draw date {} for draw {}: {e}",
                d.lt_rfl_ymd, d.lt_epsd
            ))
        })?;
        let mut numbers = vec![
            d.tm1_wn_no,
            d.tm2_wn_no,
            d.tm3_wn_no,
            d.tm4_wn_no,
            d.tm5_wn_no,
            d.tm6_wn_no,
        ];
        numbers.sort_unstable();

        Ok(LottoDraw {
            id: d.lt_epsd,
            draw_date,
            numbers,
            bonus_number: d.bns_wn_no,
            prize_tiers: vec![
                PrizeTier {
                    rank: 1,
                    amount: d.rnk1_wn_amt,
                    winners: d.rnk1_wn_nope,
                },
                PrizeTier {
                    rank: 2,
                    amount: d.rnk2_wn_amt,
                    winners: d.rnk2_wn_nope,
                },
                PrizeTier {
                    rank: 3,
                    amount: d.rnk3_wn_amt,
                    winners: d.rnk3_wn_nope,
                },
            ],
        })
    }
}

/// 解析全部回次响应，按回次升序；无法解析的记录记日志后跳过
pub fn parse_all_draws(body: &str) -> AppResult<Vec<LottoDraw>> {
    let response: DhLotteryAllResponse = serde_json::from_str(body)?;
    let mut draws: Vec<LottoDraw> = response
        .data
        .list
        .into_iter()
        .filter_map(|d| match LottoDraw::try_from(d) {
            Ok(draw) => Some(draw),
            Err(e) => {
                log::warn!("Skipping unparsable lotto draw: {e}");
                None
            }
        })
        .collect();
    draws.sort_by_key(|d| d.id);
    Ok(draws)
}

/// 6/45 官方数据客户端
///
/// 接口一次返回全部回次，结果缓存 `cache_ttl_secs` 秒。
pub struct DhLotteryClient {
    http: Client,
    url: String,
    cache_ttl: Duration,
    cache: Mutex<Option<(Instant, Vec<LottoDraw>)>>,
}

impl DhLotteryClient {
    pub fn new(config: &DrawSourceConfig) -> Self {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build lotto HTTP client, using defaults: {e}");
                Client::new()
            });
        Self {
            http,
            url: config.lotto_url.clone(),
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            cache: Mutex::new(None),
        }
    }

    pub async fn all_draws(&self) -> AppResult<Vec<LottoDraw>> {
        let mut cache = self.cache.lock().await;
        if let Some((fetched_at, draws)) = cache.as_ref()
            && fetched_at.elapsed() < self.cache_ttl
            && !draws.is_empty()
        {
            log::debug!("Using cached draw data");
            return Ok(draws.clone());
        }

        log::info!("Fetching all draws from lottery API...");
        let response = self
            .http
            .get(&self.url)
            .query(&[("srchLtEpsd", "all")])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::ExternalApiError(format!(
                "lotto draw API returned HTTP {}",
                status.as_u16()
            )));
        }

        let draws = parse_all_draws(&body)?;
        log::info!("Fetched {} draws from API", draws.len());
        *cache = Some((Instant::now(), draws.clone()));
        Ok(draws)
    }

    /// 清空缓存，下次请求重新拉取
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

#[async_trait]
impl DrawSource<LottoDraw> for DhLotteryClient {
    async fn latest_draw_id(&self) -> AppResult<i32> {
        let draws = self.all_draws().await?;
        let latest = draws
            .iter()
            .map(|d| d.id)
            .max()
            .ok_or_else(|| AppError::ExternalApiError("No draws found".to_string()))?;
        log::info!("Latest draw ID: {latest}");
        Ok(latest)
    }

    async fn draw_range(&self, start: i32, end: i32) -> AppResult<Vec<LottoDraw>> {
        let draws = self.all_draws().await?;
        Ok(draws
            .into_iter()
            .filter(|d| (start..=end).contains(&d.id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "resultCode": null,
        "resultMessage": null,
        "data": {
            "list": [
                {
                    "ltEpsd": 1186,
                    "tm1WnNo": 37, "tm2WnNo": 2, "tm3WnNo": 8,
                    "tm4WnNo": 13, "tm5WnNo": 16, "tm6WnNo": 33,
                    "bnsWnNo": 21,
                    "ltRflYmd": "20250823",
                    "rnk1WnAmt": 2123456789, "rnk1WnNope": 12,
                    "rnk2WnAmt": 61234567, "rnk2WnNope": 69,
                    "rnk3WnAmt": 1456789, "rnk3WnNope": 2901
                },
                {
                    "ltEpsd": 1185,
                    "tm1WnNo": 6, "tm2WnNo": 17, "tm3WnNo": 20,
                    "tm4WnNo": 29, "tm5WnNo": 30, "tm6WnNo": 42,
                    "bnsWnNo": 1,
                    "ltRflYmd": "20250816"
                },
                {
                    "ltEpsd": 1, "tm1WnNo": 1, "tm2WnNo": 2, "tm3WnNo": 3,
                    "tm4WnNo": 4, "tm5WnNo": 5, "tm6WnNo": 6, "bnsWnNo": 7,
                    "ltRflYmd": "not-a-date"
                }
            ]
        }
    }"#;

    #[test]
    fn parses_and_sorts_draws() {
        let draws = parse_all_draws(SAMPLE).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].id, 1185);

        let latest = &draws[1];
        assert_eq!(latest.numbers, vec![2, 8, 13, 16, 33, 37]);
        assert_eq!(latest.bonus_number, 21);
        assert_eq!(latest.draw_date, NaiveDate::from_ymd_opt(2025, 8, 23).unwrap());
        assert_eq!(latest.prize_tiers[0].amount, 2_123_456_789);
        assert_eq!(latest.prize_tiers[2].winners, 2901);
        assert_eq!(draws[0].prize_tiers[0].amount, 0);
    }

    #[test]
    fn rejects_non_json_body() {
        assert!(parse_all_draws("<html>maintenance</html>").is_err());
    }
}
