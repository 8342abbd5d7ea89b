use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;
use crate::tasks::{JobRunReport, Trigger};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::statistics::get_lotto_summary,
        handlers::statistics::get_candidates,
        handlers::statistics::get_most_frequent,
        handlers::statistics::get_least_frequent,
        handlers::statistics::get_number_detail,
        handlers::statistics::get_pension_digit_frequency,
        handlers::lotto::sync_draws,
        handlers::lotto::get_draws,
        handlers::lotto::get_latest_draw,
        handlers::lotto::get_status,
        handlers::lotto::generate_recommendations,
        handlers::lotto::get_recommendations,
        handlers::lotto::check_results,
        handlers::pension::sync_draws,
        handlers::pension::get_draws,
        handlers::pension::get_latest_draw,
        handlers::pension::get_status,
        handlers::pension::generate_recommendations,
        handlers::pension::get_recommendations,
        handlers::pension::check_results,
        handlers::system::get_ai_status,
        handlers::system::run_job,
    ),
    components(
        schemas(
            DrawFormat,
            PrizeTier,
            LottoDraw,
            PensionDraw,
            RecommendationSource,
            LottoRecommendation,
            PensionRecommendation,
            LottoBatch,
            PensionBatch,
            GenerateRequest,
            LottoResult,
            PensionResult,
            CheckedLottoRecommendation,
            CheckedPensionRecommendation,
            LottoCheckOutcome,
            PensionCheckOutcome,
            LottoRecommendationView,
            PensionRecommendationView,
            NumberFrequency,
            StatisticsSummary,
            DigitCount,
            PensionDigitFrequency,
            CandidatesResponse,
            SyncOutcome,
            SyncRequest,
            DrawStatus,
            AiStatus,
            ApiError,
            JobRunReport,
            Trigger,
        )
    ),
    tags(
        (name = "statistics", description = "Draw statistics API"),
        (name = "lotto", description = "Lotto 6/45 draws and recommendations API"),
        (name = "pension", description = "Pension 720+ draws and recommendations API"),
        (name = "system", description = "AI status and manual job triggers"),
    ),
    info(
        title = "Lotto Backend API",
        version = "1.0.0",
        description = "Lottery recommendation backend REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
