use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use chrono::Local;  // timestamp in log lines
use std::sync::Arc;
use std::time::Duration;

use lotto_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{DhLotteryClient, DhPensionClient, OllamaClient, TelegramNotifier},
    handlers,
    middlewares::create_cors,
    models::{LottoDraw, PensionDraw},
    repositories::Repositories,
    services::*,
    swagger::swagger_config,
    tasks::{self, CycleScheduler, job_schedules, parse_timezone},
    utils::SharedRng,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    // 仓储：memory:// 用于试运行，其余走 Postgres 并执行迁移
    let repos = if config.database.is_in_memory() {
        log::warn!("Using in-memory repositories, data will not survive a restart");
        Repositories::in_memory()
    } else {
        let pool = create_pool(&config.database)
            .await
            .context("Failed to create database connection pool")?;
        run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;
        Repositories::postgres(pool)
    };

    let rng = SharedRng::from_seed(config.random.seed);

    // 外部服务
    let lotto_source: Arc<dyn DrawSource<LottoDraw>> =
        Arc::new(DhLotteryClient::new(&config.draw_source));
    let pension_source: Arc<dyn DrawSource<PensionDraw>> =
        Arc::new(DhPensionClient::new(&config.draw_source));
    let generator: Option<Arc<dyn TextGenerator>> = if config.ai.enabled {
        Some(Arc::new(OllamaClient::new(&config.ai)))
    } else {
        log::warn!("AI recommendations are disabled, AI games fall back to random sets");
        None
    };
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(config.telegram.clone()));

    // 创建服务
    let ai = AiRecommender::new(
        generator,
        rng.clone(),
        Duration::from_secs(config.ai.timeout_secs),
    );
    let statistics = StatisticsService::new(
        repos.lotto_draws.clone(),
        repos.pension_draws.clone(),
        rng.clone(),
    );
    let composer = RecommendationComposer::new(
        repos.clone(),
        statistics.clone(),
        ai.clone(),
        config.recommendation.clone(),
        rng.clone(),
    );
    let classifier = ResultClassifier::new(repos.clone());
    let sync_service = SyncService::new(repos.clone(), lotto_source, pension_source);

    let scheduler = CycleScheduler::new(
        repos.clone(),
        sync_service.clone(),
        composer.clone(),
        classifier.clone(),
        notifier,
        parse_timezone(&config.scheduler.timezone)?,
    );

    // 启动每周定时任务
    if config.scheduler.enabled {
        tasks::spawn_all(scheduler.clone(), job_schedules(&config.scheduler)?);
    } else {
        log::warn!("Scheduler is disabled, jobs run only through manual triggers");
    }

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let ai_config = config.ai.clone();
    let recommendation_config = config.recommendation.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(repos.clone()))
            .app_data(web::Data::new(statistics.clone()))
            .app_data(web::Data::new(composer.clone()))
            .app_data(web::Data::new(classifier.clone()))
            .app_data(web::Data::new(sync_service.clone()))
            .app_data(web::Data::new(ai.clone()))
            .app_data(web::Data::new(scheduler.clone()))
            .app_data(web::Data::new(ai_config.clone()))
            .app_data(web::Data::new(recommendation_config.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::statistics_config)
                    .configure(handlers::lotto_config)
                    .configure(handlers::pension_config)
                    .configure(handlers::system_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
