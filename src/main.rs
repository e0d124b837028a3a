use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use winestore_api::build_router;
use winestore_api::config::AppConfig;
use winestore_api::database::connection::get_db_client;
use winestore_api::repositories::MongoOrderRepository;
use winestore_api::services::mpesa_service::MpesaService;
use winestore_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let db = match get_db_client().await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    let orders = Arc::new(MongoOrderRepository::new(&db));
    let app_state = initialize_app_state(AppState::new(orders)).await;

    let app = build_router(app_state);
    start_server(app).await;
}

async fn initialize_app_state(mut app_state: AppState) -> AppState {
    match AppConfig::from_env() {
        Ok(config) => {
            tracing::info!("M-Pesa config loaded, short code {}", config.mpesa_short_code);
            let mpesa = Arc::new(MpesaService::new(config));

            // Fetch a token once up front so bad credentials surface at
            // startup instead of on the first checkout.
            match mpesa.get_access_token().await {
                Ok(_) => {
                    tracing::info!("M-Pesa service initialized and ready");
                    app_state = app_state.with_mpesa(mpesa);
                }
                Err(e) => {
                    tracing::error!("failed to get M-Pesa access token: {}", e);
                    tracing::warn!("M-Pesa service will be disabled");
                }
            }
        }
        Err(e) => {
            tracing::warn!("M-Pesa service disabled: {}", e);
        }
    }

    app_state
}

async fn start_server(app: Router) {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = SocketAddr::from(([0, 0, 0, 0], port.parse().unwrap_or(3000)));

    tracing::info!("server starting on {}", addr);

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("server error: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!("failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    }
}
