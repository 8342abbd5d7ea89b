use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::DrawSourceConfig;
use crate::error::{AppError, AppResult};
use crate::models::{PENSION_DIGIT_LEN, PensionDraw, PrizeTier, is_valid_pension_digits};
use crate::services::sync_service::DrawSource;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// 奖金行序号 21 表示加奖（8 等）
const BONUS_SEQUENCE: i32 = 21;
const BONUS_ROW: i32 = 8;

/// 区间查询接口返回的单行，每个回次 8 行
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhPensionRow {
    pub wn_sq_no: i32,
    #[serde(default)]
    pub wn_amt: Option<i64>,
    #[serde(default)]
    pub wn_bnd_no: Option<String>,
    #[serde(default)]
    pub wn_rnk_vl: Option<String>,
    #[serde(default)]
    pub pslt_rfl_ymd: Option<String>,
    pub pslt_epsd: i32,
    pub pslt_sn: i32,
}

#[derive(Debug, Deserialize)]
pub struct DhPensionResponse {
    pub data: Option<DhPensionData>,
}

#[derive(Debug, Deserialize)]
pub struct DhPensionData {
    #[serde(default)]
    pub result: Vec<DhPensionRow>,
}

/// 行序号对应的奖级；未知行返回 None
fn row_rank(row: &DhPensionRow) -> Option<i32> {
    match row.pslt_sn {
        sn @ 1..=7 => Some(sn),
        BONUS_ROW if row.wn_sq_no == BONUS_SEQUENCE => Some(BONUS_ROW),
        _ => None,
    }
}

/// 取末尾 6 个字符作为号码，非数字时视为未公布
fn last_digits(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let skip = trimmed.chars().count().checked_sub(PENSION_DIGIT_LEN)?;
    let tail: String = trimmed.chars().skip(skip).collect();
    is_valid_pension_digits(&tail).then_some(tail)
}

fn parse_episode(id: i32, rows: &[DhPensionRow]) -> PensionDraw {
    let draw_date = rows
        .first()
        .and_then(|r| r.pslt_rfl_ymd.as_deref())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y%m%d").ok());

    let mut group_no = None;
    let mut digits = None;
    let mut prize_tiers = Vec::new();

    for row in rows {
        if row.pslt_sn == 1 {
            group_no = row
                .wn_bnd_no
                .as_deref()
                .and_then(|g| g.trim().parse::<i32>().ok());
            digits = row.wn_rnk_vl.as_deref().and_then(last_digits);
        }
        if let Some(rank) = row_rank(row) {
            prize_tiers.push(PrizeTier {
                rank,
                amount: row.wn_amt.unwrap_or(0),
                winners: 0,
            });
        }
    }
    prize_tiers.sort_by_key(|t| t.rank);

    PensionDraw {
        id,
        draw_date,
        group_no,
        digits,
        prize_tiers,
    }
}

/// 把区间响应按回次归组并解析
pub fn parse_pension_rows(body: &str) -> AppResult<Vec<PensionDraw>> {
    let response: DhPensionResponse = serde_json::from_str(body)?;
    let rows = response.data.map(|d| d.result).unwrap_or_default();

    let mut by_episode: BTreeMap<i32, Vec<DhPensionRow>> = BTreeMap::new();
    for row in rows {
        by_episode.entry(row.pslt_epsd).or_default().push(row);
    }

    Ok(by_episode
        .iter()
        .map(|(id, rows)| parse_episode(*id, rows))
        .collect())
}

/// 720+ 官方数据客户端
///
/// 区间接口按块查询，块之间短暂停顿；单块失败只记日志。
pub struct DhPensionClient {
    http: Client,
    url: String,
    chunk_size: i32,
    chunk_delay: Duration,
    scan_limit: i32,
}

impl DhPensionClient {
    pub fn new(config: &DrawSourceConfig) -> Self {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build pension HTTP client, using defaults: {e}");
                Client::new()
            });
        Self {
            http,
            url: config.pension_url.clone(),
            chunk_size: config.pension_chunk_size.max(1),
            chunk_delay: Duration::from_millis(config.pension_chunk_delay_ms),
            scan_limit: config.pension_scan_limit,
        }
    }

    async fn fetch_chunk(&self, start: i32, end: i32) -> AppResult<Vec<PensionDraw>> {
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("srchStrPsltEpsd", start.to_string()),
                ("srchEndPsltEpsd", end.to_string()),
            ])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::ExternalApiError(format!(
                "pension draw API returned HTTP {}",
                status.as_u16()
            )));
        }
        parse_pension_rows(&body)
    }
}

#[async_trait]
impl DrawSource<PensionDraw> for DhPensionClient {
    async fn latest_draw_id(&self) -> AppResult<i32> {
        let mut last_valid = None;
        let mut start = 1;
        while start <= self.scan_limit {
            let end = (start + self.chunk_size - 1).min(self.scan_limit);
            let draws = self.draw_range(start, end).await?;
            let Some(max_id) = draws.iter().map(|d| d.id).max() else {
                break;
            };
            last_valid = Some(max_id);
            if (draws.len() as i32) < end - start + 1 {
                break;
            }
            start = end + 1;
        }
        let latest = last_valid.ok_or_else(|| {
            AppError::ExternalApiError("No pension draws found".to_string())
        })?;
        log::info!("Latest pension draw ID: {latest}");
        Ok(latest)
    }

    async fn draw_range(&self, start: i32, end: i32) -> AppResult<Vec<PensionDraw>> {
        let mut draws = Vec::new();
        let mut chunk_start = start;
        while chunk_start <= end {
            let chunk_end = (chunk_start + self.chunk_size - 1).min(end);
            match self.fetch_chunk(chunk_start, chunk_end).await {
                Ok(chunk) => draws.extend(chunk),
                Err(e) => {
                    log::warn!("Failed to fetch pension range {chunk_start}-{chunk_end}: {e}")
                }
            }
            chunk_start = chunk_end + 1;
            if chunk_start <= end {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }
        draws.sort_by_key(|d| d.id);
        Ok(draws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(epsd: i32, sn: i32, sq: i32, group: Option<&str>, value: &str, amt: i64) -> String {
        let group = group
            .map(|g| format!("\"{g}\""))
            .unwrap_or_else(|| "null".to_string());
        format!(
            r#"{{"rnum":1,"wnSqNo":{sq},"wnAmt":{amt},"wnBndNo":{group},"wnRnkVl":"{value}",
                "psltRflYmd":"20250821","psltEpsd":{epsd},"psltSn":{sn},"ltGdsCd":"LP72"}}"#
        )
    }

    #[test]
    fn groups_rows_by_episode() {
        let rows = [
            row(277, 1, 1, Some("3"), "3123456", 7_000_000),
            row(277, 2, 2, None, "23456", 1_000_000),
            row(277, 8, 21, None, "654321", 1_000_000),
            row(277, 8, 99, None, "000000", 5),
            row(276, 1, 1, Some("5"), "908172", 7_000_000),
        ];
        let body = format!(r#"{{"resultCode":null,"data":{{"result":[{}]}}}}"#, rows.join(","));

        let draws = parse_pension_rows(&body).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].id, 276);
        assert_eq!(draws[0].group_no, Some(5));

        let d = &draws[1];
        assert_eq!(d.group_no, Some(3));
        assert_eq!(d.digits.as_deref(), Some("123456"));
        assert_eq!(d.draw_date, NaiveDate::from_ymd_opt(2025, 8, 21));
        let ranks: Vec<i32> = d.prize_tiers.iter().map(|t| t.rank).collect();
        assert_eq!(ranks, vec![1, 2, 8]);
    }

    #[test]
    fn missing_first_prize_row_leaves_draw_unpublished() {
        let body = format!(
            r#"{{"data":{{"result":[{}]}}}}"#,
            row(280, 2, 2, None, "12345", 1_000_000)
        );
        let draws = parse_pension_rows(&body).unwrap();
        assert_eq!(draws[0].group_no, None);
        assert_eq!(draws[0].digits, None);
    }

    #[test]
    fn non_ascii_winning_value_is_left_unpublished() {
        let rows = [
            row(281, 1, 1, Some("2"), "가12345", 7_000_000),
            row(282, 1, 1, Some("4"), "4조654321", 7_000_000),
        ];
        let body = format!(r#"{{"data":{{"result":[{}]}}}}"#, rows.join(","));

        let draws = parse_pension_rows(&body).unwrap();
        assert_eq!(draws[0].group_no, Some(2));
        assert_eq!(draws[0].digits, None);
        assert_eq!(draws[1].digits.as_deref(), Some("654321"));
    }

    #[tokio::test]
    async fn latest_id_without_any_data_is_an_error() {
        let config = DrawSourceConfig {
            pension_url: "http://127.0.0.1:9/unreachable".to_string(),
            pension_scan_limit: 1,
            timeout_secs: 1,
            ..Default::default()
        };
        let client = DhPensionClient::new(&config);
        assert!(matches!(
            client.latest_draw_id().await,
            Err(AppError::ExternalApiError(_))
        ));
    }

    #[test]
    fn null_data_is_empty() {
        let draws = parse_pension_rows(r#"{"resultCode":null,"data":null}"#).unwrap();
        assert!(draws.is_empty());
    }
}
