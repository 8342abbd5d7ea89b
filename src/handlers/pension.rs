use actix_web::{HttpResponse, ResponseError, Result, web};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::models::*;
use crate::repositories::Repositories;
use crate::services::{RecommendationComposer, ResultClassifier, SyncService};

#[derive(Debug, Deserialize)]
pub struct DrawListQuery {
    pub limit: Option<usize>,
}

const DEFAULT_DRAW_LIMIT: usize = 10;

#[utoipa::path(
    post,
    path = "/pension/sync",
    tag = "pension",
    request_body(content = SyncRequest, description = "回次区间，缺省为增量同步"),
    responses(
        (status = 200, description = "同步完成", body = SyncOutcome),
        (status = 502, description = "开奖数据源不可用")
    )
)]
pub async fn sync_draws(
    sync_service: web::Data<SyncService>,
    body: Option<web::Json<SyncRequest>>,
) -> Result<HttpResponse> {
    let request = body.map(|b| b.into_inner()).unwrap_or_default();
    match sync_service
        .sync_pension(request.start_draw_id, request.end_draw_id)
        .await
    {
        Ok(outcome) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": outcome,
            "message": format!("{} pension draws synced", outcome.synced_count)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/pension/draws",
    tag = "pension",
    params(
        ("limit" = Option<usize>, Query, description = "返回最近的回次数，默认 10")
    ),
    responses(
        (status = 200, description = "最近开奖，新的在前")
    )
)]
pub async fn get_draws(
    repos: web::Data<Repositories>,
    query: web::Query<DrawListQuery>,
) -> Result<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_DRAW_LIMIT);
    match repos.pension_draws.find_recent(limit).await {
        Ok(draws) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": draws
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/pension/draws/latest",
    tag = "pension",
    responses(
        (status = 200, description = "最新开奖", body = PensionDraw),
        (status = 404, description = "尚无开奖数据")
    )
)]
pub async fn get_latest_draw(repos: web::Data<Repositories>) -> Result<HttpResponse> {
    match repos.pension_draws.find_latest().await {
        Ok(Some(draw)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": draw
        }))),
        Ok(None) => {
            Ok(AppError::NotFound("No pension draws stored".to_string()).error_response())
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/pension/status",
    tag = "pension",
    responses(
        (status = 200, description = "本地数据概况", body = DrawStatus)
    )
)]
pub async fn get_status(repos: web::Data<Repositories>) -> Result<HttpResponse> {
    let status = async {
        let total_draws = repos.pension_draws.count().await?;
        let latest = repos.pension_draws.find_latest().await?;
        let next_target_draw_id = latest.as_ref().map_or(1, |d| d.id + 1);
        let next_target_has_recommendations = repos
            .pension_recommendations
            .exists_for_cycle(next_target_draw_id)
            .await?;
        Ok::<_, AppError>(DrawStatus {
            total_draws,
            latest_draw_id: latest.as_ref().map(|d| d.id),
            latest_draw_date: latest.and_then(|d| d.draw_date),
            next_target_draw_id,
            next_target_has_recommendations,
        })
    }
    .await;

    match status {
        Ok(status) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": status
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/pension/recommendations",
    tag = "pension",
    request_body(content = GenerateRequest, description = "目标回次，缺省为下一回次"),
    responses(
        (status = 200, description = "生成推荐成功", body = PensionBatch),
        (status = 409, description = "该回次已有推荐")
    )
)]
pub async fn generate_recommendations(
    composer: web::Data<RecommendationComposer>,
    body: Option<web::Json<GenerateRequest>>,
) -> Result<HttpResponse> {
    let request = body.map(|b| b.into_inner()).unwrap_or_default();
    let target = match request.target_draw_id {
        Some(id) => id,
        None => match composer.next_pension_target().await {
            Ok(id) => id,
            Err(e) => return Ok(e.error_response()),
        },
    };

    match composer.compose_pension(target).await {
        Ok(batch) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": batch
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/pension/recommendations/{draw_id}",
    tag = "pension",
    params(
        ("draw_id" = i32, Path, description = "目标回次")
    ),
    responses(
        (status = 200, description = "该回次的推荐及结果")
    )
)]
pub async fn get_recommendations(
    classifier: web::Data<ResultClassifier>,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    match classifier.pension_cycle_view(path.into_inner()).await {
        Ok(views) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": views
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/pension/check/{draw_id}",
    tag = "pension",
    params(
        ("draw_id" = i32, Path, description = "已开奖回次")
    ),
    responses(
        (status = 200, description = "核对完成", body = PensionCheckOutcome),
        (status = 404, description = "回次或推荐不存在")
    )
)]
pub async fn check_results(
    classifier: web::Data<ResultClassifier>,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let draw_id = path.into_inner();
    match classifier.check_pension_cycle(draw_id).await {
        Ok(Some(outcome)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": outcome
        }))),
        Ok(None) => Ok(AppError::NotFound(format!(
            "Pension draw #{draw_id} or its recommendations not found"
        ))
        .error_response()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn pension_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/pension")
            .route("/sync", web::post().to(sync_draws))
            .route("/draws", web::get().to(get_draws))
            .route("/draws/latest", web::get().to(get_latest_draw))
            .route("/status", web::get().to(get_status))
            .route("/recommendations", web::post().to(generate_recommendations))
            .route("/recommendations/{draw_id}", web::get().to(get_recommendations))
            .route("/check/{draw_id}", web::post().to(check_results)),
    );
}
