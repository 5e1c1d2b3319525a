use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vendor_match::auth::JwtVerifier;
use vendor_match::config::Settings;
use vendor_match::core::Matcher;
use vendor_match::error::{handle_json_payload_error, handle_path_error, handle_query_payload_error};
use vendor_match::routes::{self, AppState};
use vendor_match::services::{scheduler, MatchStore, MatchingEngine, MemoryStore, PostgresClient};

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

async fn build_store(settings: &Settings, matcher: &Matcher) -> std::io::Result<Arc<dyn MatchStore>> {
    let db = &settings.database;

    match &db.url {
        Some(url) => {
            let postgres = PostgresClient::from_settings(
                url,
                db.max_connections,
                db.min_connections,
                db.acquire_timeout_secs,
                db.idle_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
            })?;

            info!(
                "PostgreSQL store initialized (max: {} connections)",
                db.max_connections.unwrap_or(10)
            );
            Ok(Arc::new(postgres))
        }
        None => {
            warn!("No database URL configured, using the in-memory store");

            let store = match &db.seed_file {
                Some(path) if std::path::Path::new(path).exists() => {
                    MemoryStore::from_seed_file(path, matcher).map_err(|e| {
                        error!("Failed to load seed file {}: {}", path, e);
                        std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
                    })?
                }
                _ => MemoryStore::new(),
            };
            Ok(Arc::new(store))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings.logging.level, &settings.logging.format);

    info!("Starting vendor matching service...");

    let weights = settings.scoring_weights();
    let matcher = Matcher::new(weights);
    info!("Matcher initialized with weights: {:?}", weights);

    let store = build_store(&settings, &matcher).await?;
    let engine = MatchingEngine::new(store, matcher);

    let shutdown = CancellationToken::new();
    let jobs = scheduler::start(engine.clone(), &settings.scheduler, shutdown.clone());

    let app_state = AppState {
        engine,
        jwt: JwtVerifier::new(&settings.auth.jwt_secret),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run();

    let result = server.await;

    info!("HTTP server stopped, shutting down scheduled jobs");
    shutdown.cancel();
    for job in jobs {
        if let Err(e) = job.await {
            warn!("Scheduled job ended abnormally: {}", e);
        }
    }

    result
}
