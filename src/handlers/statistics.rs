use actix_web::{HttpResponse, ResponseError, Result, web};
use serde::Deserialize;
use serde_json::json;

use crate::config::RecommendationConfig;
use crate::error::AppError;
use crate::models::*;
use crate::services::StatisticsService;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

const DEFAULT_LIMIT: usize = 10;

#[utoipa::path(
    get,
    path = "/statistics/lotto",
    tag = "statistics",
    responses(
        (status = 200, description = "号码出现频率统计", body = StatisticsSummary)
    )
)]
pub async fn get_lotto_summary(
    statistics: web::Data<StatisticsService>,
) -> Result<HttpResponse> {
    match statistics.lotto_summary().await {
        Ok(summary) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": summary
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/statistics/lotto/candidates",
    tag = "statistics",
    params(
        ("exclude" = Option<usize>, Query, description = "排除的低频号码数量，默认 20")
    ),
    responses(
        (status = 200, description = "候选号码池", body = CandidatesResponse)
    )
)]
pub async fn get_candidates(
    statistics: web::Data<StatisticsService>,
    settings: web::Data<RecommendationConfig>,
    query: web::Query<CandidatesQuery>,
) -> Result<HttpResponse> {
    let exclude_count = query.exclude.unwrap_or(settings.exclude_count);
    match statistics.candidates(exclude_count).await {
        Ok(candidates) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": CandidatesResponse {
                exclude_count,
                candidates,
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/statistics/lotto/most-frequent",
    tag = "statistics",
    params(
        ("limit" = Option<usize>, Query, description = "返回数量，默认 10")
    ),
    responses(
        (status = 200, description = "出现最多的号码")
    )
)]
pub async fn get_most_frequent(
    statistics: web::Data<StatisticsService>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    match statistics.lotto_summary().await {
        Ok(summary) => {
            let top: Vec<NumberFrequency> =
                summary.frequencies.into_iter().take(limit).collect();
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": top
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/statistics/lotto/least-frequent",
    tag = "statistics",
    params(
        ("limit" = Option<usize>, Query, description = "返回数量，默认 10")
    ),
    responses(
        (status = 200, description = "出现最少的号码，最少的在前")
    )
)]
pub async fn get_least_frequent(
    statistics: web::Data<StatisticsService>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    match statistics.lotto_summary().await {
        Ok(summary) => {
            let bottom: Vec<NumberFrequency> =
                summary.frequencies.into_iter().rev().take(limit).collect();
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": bottom
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/statistics/lotto/numbers/{number}",
    tag = "statistics",
    params(
        ("number" = i32, Path, description = "号码 1-45")
    ),
    responses(
        (status = 200, description = "单个号码的统计", body = NumberFrequency),
        (status = 400, description = "号码超出范围"),
        (status = 404, description = "尚无开奖数据")
    )
)]
pub async fn get_number_detail(
    statistics: web::Data<StatisticsService>,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let number = path.into_inner();
    match statistics.number_detail(number).await {
        Ok(Some(detail)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": detail
        }))),
        Ok(None) => Ok(AppError::NotFound(format!("no statistics for number {number}"))
            .error_response()),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/statistics/pension/digits",
    tag = "statistics",
    responses(
        (status = 200, description = "720+ 各位置数字频率", body = PensionDigitFrequency)
    )
)]
pub async fn get_pension_digit_frequency(
    statistics: web::Data<StatisticsService>,
) -> Result<HttpResponse> {
    match statistics.pension_digit_frequency().await {
        Ok(freq) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": freq
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn statistics_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/statistics")
            .route("/lotto", web::get().to(get_lotto_summary))
            .route("/lotto/candidates", web::get().to(get_candidates))
            .route("/lotto/most-frequent", web::get().to(get_most_frequent))
            .route("/lotto/least-frequent", web::get().to(get_least_frequent))
            .route("/lotto/numbers/{number}", web::get().to(get_number_detail))
            .route("/pension/digits", web::get().to(get_pension_digit_frequency)),
    );
}
