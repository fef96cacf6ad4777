#![allow(clippy::useless_format, clippy::too_many_arguments)]

pub mod domain;
pub mod handlers;
pub mod shared;
pub mod system;
pub mod usecases;

use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use axum::middleware::{self, Next};
    use axum::response::Response;
    use axum::{
        routing::{get, post},
        Router,
    };
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tower_http::cors::{Any, CorsLayer};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    use handlers::AppState;
    use shared::gateway::{PaymentGateway, SberbankApiClient};
    use shared::notify::NotificationQueue;
    use system::tasks::ReconciliationSweepWorker;
    use usecases::u501_checkout::CheckoutService;
    use usecases::u502_reconciliation::ReconciliationService;
    use usecases::u503_entitlement_grant::EntitlementService;

    // Создаем директорию для логов
    let log_dir = std::path::Path::new("target").join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file_path = log_dir.join("backend.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                // Отключаем логи SQL запросов, но оставляем логи приложения
                "info,sqlx=warn,sea_orm=warn".into()
            }),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Arc::new(log_file))
                .with_ansi(false),
        )
        .init();

    // Простой middleware для логирования запросов
    async fn request_logger(req: Request<Body>, next: Next) -> Response {
        use chrono::Utc;

        let start = std::time::Instant::now();
        let method = req.method().clone();
        let uri = req.uri().clone();

        let response = next.run(req).await;

        let duration = start.elapsed();
        let timestamp = Utc::now() + chrono::Duration::hours(3);

        // Голубой для 200, коричневый для остальных
        let color_code = if response.status().as_u16() == 200 {
            "36"
        } else {
            "33"
        };

        println!(
            "\x1b[{}m{}\x1b[0m | {:>5}ms | {} {:>6} {}",
            color_code,
            timestamp.format("%H:%M:%S"),
            duration.as_millis(),
            response.status().as_u16(),
            method,
            uri.path()
        );

        response
    }

    // Загружаем конфигурацию (config.toml рядом с исполняемым файлом)
    let config = shared::config::load_config()?;
    let db_path = shared::config::get_database_path(&config)?;

    let db = shared::data::db::initialize_database(db_path.to_str())
        .await
        .map_err(|e| anyhow::anyhow!("db init failed: {e}"))?;

    // Сервисы собираются один раз и передаются явно: конфигурация шлюза
    // и репозитории инжектируются, модульных синглтонов нет
    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(SberbankApiClient::new(config.gateway.clone()));
    let entitlements = Arc::new(EntitlementService::new(
        db.clone(),
        NotificationQueue::new(),
    ));
    let reconciliation = Arc::new(ReconciliationService::new(
        db.clone(),
        gateway.clone(),
        entitlements,
    ));
    let checkout = CheckoutService::new(db.clone(), gateway, config.gateway.currency.clone());

    let state = Arc::new(AppState {
        db,
        checkout,
        reconciliation: reconciliation.clone(),
    });

    // Фоновые сверки: экспирация брошенных заказов + починка разрыва
    // "succeeded без гранта"
    let worker = ReconciliationSweepWorker::new(reconciliation, config.sweeps.clone());
    tokio::spawn(async move {
        worker.run_loop().await;
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // PAYMENT ROUTES
        // ========================================
        .route("/api/order", post(handlers::a001_payment_order::create_order))
        .route(
            "/api/order/:order_number/status",
            get(handlers::a001_payment_order::get_status),
        )
        .route(
            "/api/order/:order_number/refund",
            post(handlers::a001_payment_order::refund),
        )
        // Callback шлюза: подтверждается даже для терминального заказа
        .route(
            "/api/payment/callback",
            post(handlers::a001_payment_order::callback),
        )
        // ========================================
        // PROGRESSION ROUTES
        // ========================================
        .route(
            "/api/enrollment",
            post(handlers::a002_enrollment::preregister),
        )
        .route(
            "/api/enrollment/:id/unlocked-days",
            get(handlers::a002_enrollment::unlocked_days),
        )
        .route(
            "/api/enrollment/:id/complete-day",
            post(handlers::a002_enrollment::complete_day),
        )
        .route(
            "/api/enrollment/:id/weeks",
            get(handlers::a002_enrollment::weeks),
        )
        .route(
            "/api/purchase/status",
            get(handlers::a003_exercise_purchase::access_status),
        )
        .route(
            "/api/progress/exercise",
            post(handlers::a004_day_progress::mark_exercise),
        )
        .route(
            "/api/progress/day",
            get(handlers::a004_day_progress::list_for_day),
        )
        .with_state(state)
        .layer(middleware::from_fn(request_logger))
        .layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], 3000).into();

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Error: Port 3000 is already in use. Please ensure no other process is using this port."
                );
            } else {
                tracing::error!("Failed to bind to port 3000. Error: {}", e);
            }
            // Propagate the error to stop the application
            return Err(e.into());
        }
    };

    axum::serve(listener, app).await?;

    Ok(())
}
