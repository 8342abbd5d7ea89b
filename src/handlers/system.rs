use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::config::AiConfig;
use crate::error::AppError;
use crate::models::*;
use crate::services::AiRecommender;
use crate::tasks::{CycleScheduler, Job, JobRunReport, Trigger, TriggerOutcome};

#[utoipa::path(
    get,
    path = "/system/ai/status",
    tag = "system",
    responses(
        (status = 200, description = "AI 服务可用性", body = AiStatus)
    )
)]
pub async fn get_ai_status(
    ai: web::Data<AiRecommender>,
    ai_config: web::Data<AiConfig>,
) -> Result<HttpResponse> {
    let status = AiStatus {
        available: ai.is_available().await,
        base_url: ai_config.base_url.clone(),
        model: ai_config.model.clone(),
    };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": status
    })))
}

#[utoipa::path(
    post,
    path = "/system/jobs/{format}/{trigger}",
    tag = "system",
    params(
        ("format" = String, Path, description = "lotto / pension"),
        ("trigger" = String, Path, description = "generate / verify / refresh")
    ),
    responses(
        (status = 200, description = "任务已执行", body = JobRunReport),
        (status = 400, description = "未知的玩法或触发类型"),
        (status = 409, description = "同一任务正在运行")
    )
)]
pub async fn run_job(
    scheduler: web::Data<CycleScheduler>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (format, trigger) = path.into_inner();
    let format = match format.parse::<DrawFormat>() {
        Ok(f) => f,
        Err(msg) => return Ok(AppError::ValidationError(msg).error_response()),
    };
    let trigger = match trigger.parse::<Trigger>() {
        Ok(t) => t,
        Err(e) => return Ok(e.error_response()),
    };

    let job = Job::new(format, trigger);
    let outcome = scheduler.run_isolated(job).await;
    let report = JobRunReport::new(job, &outcome);
    let response = match outcome {
        TriggerOutcome::Busy => HttpResponse::Conflict().json(json!({
            "success": false,
            "data": report
        })),
        TriggerOutcome::Failed(_) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "data": report
        })),
        _ => HttpResponse::Ok().json(json!({
            "success": true,
            "data": report
        })),
    };
    Ok(response)
}

pub fn system_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/system")
            .route("/ai/status", web::get().to(get_ai_status))
            .route("/jobs/{format}/{trigger}", web::post().to(run_job)),
    );
}
