use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use pkgsync_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{HttpResourceProvider, PlatformRegistry, ResourceProvider},
    handlers,
    middlewares::create_cors,
    repository::SeaOrmRepository,
    services::*,
    store::MemoryStore,
    swagger::swagger_config,
    tasks::{self, JobRunner, LocalTaskQueue, TaskQueue},
    utils::{Clock, SystemClock},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
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
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let repo = Arc::new(SeaOrmRepository::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.pricing.utc_offset_hours));
    let store = Arc::new(MemoryStore::new(clock.clone()));

    // 任务队列：消费端在服务组装完成后启动
    let (local_queue, workers) = LocalTaskQueue::new();
    let queue: Arc<dyn TaskQueue> = Arc::new(local_queue);

    // 外部服务
    let registry = PlatformRegistry::from_config(&config.ota);
    if registry.platforms().is_empty() {
        log::warn!("No OTA platform configured, price and inventory pushes are disabled");
    }
    let provider: Arc<dyn ResourceProvider> =
        Arc::new(HttpResourceProvider::new(config.provider.clone()));

    // 创建服务
    let change_router = ChangeRouter::new(repo.clone(), queue.clone());
    let debouncer = InventoryDebouncer::new(store.clone(), queue.clone(), config.inventory.clone());
    let order_router = OrderRouter::new(repo.clone(), repo.clone());
    let exception_service = ExceptionOrderService::new(repo.clone(), clock.clone());

    let daily_price_service = DailyPriceService::new(
        repo.clone(),
        repo.clone(),
        queue.clone(),
        clock.clone(),
        config.pricing.clone(),
        registry.platforms(),
    );
    let inventory_push_service =
        InventoryPushService::new(repo.clone(), registry.clone(), debouncer.clone());
    let ota_sync_service = OtaSyncService::new(
        repo.clone(),
        repo.clone(),
        registry,
        clock.clone(),
        config.pricing.clone(),
    );
    let fulfillment_service = FulfillmentService::new(
        repo.clone(),
        repo.clone(),
        order_router.clone(),
        exception_service.clone(),
        provider,
        queue.clone(),
        clock.clone(),
    );
    let stock_service = StockService::new(
        repo.clone(),
        debouncer,
        change_router.clone(),
        clock.clone(),
    );
    let package_service = PackageService::new(repo.clone(), repo.clone(), change_router, clock);

    // 启动后台任务
    let runner = JobRunner::new(
        daily_price_service.clone(),
        inventory_push_service,
        ota_sync_service.clone(),
        fulfillment_service.clone(),
    );
    workers.spawn(Arc::new(runner), config.tasks.clone());
    tasks::spawn_all(repo.clone(), queue, store);

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let cors_origins = config.server.cors_allowed_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors(&cors_origins))
            .app_data(web::Data::new(stock_service.clone()))
            .app_data(web::Data::new(package_service.clone()))
            .app_data(web::Data::new(daily_price_service.clone()))
            .app_data(web::Data::new(ota_sync_service.clone()))
            .app_data(web::Data::new(order_router.clone()))
            .app_data(web::Data::new(fulfillment_service.clone()))
            .app_data(web::Data::new(exception_service.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::inventory_config)
                    .configure(handlers::package_config)
                    .configure(handlers::order_config)
                    .configure(handlers::exception_order_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
