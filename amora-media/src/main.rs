use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod access;
mod collaborators;
mod config;
mod events;
mod models;
mod moderation;
mod routes;
mod schema;
mod services;

use amora_shared::clients::db::{create_pool, DbPool};
use amora_shared::clients::minio::MinioClient;
use amora_shared::clients::rabbitmq::RabbitMQClient;

use access::AccessResolver;
use collaborators::face::{FaceApiClient, FaceMatcher};
use collaborators::relationship::SocialServiceClient;
use collaborators::speech::{SpeechToText, TranscriptionClient};
use config::AppConfig;
use moderation::pipeline;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub minio: MinioClient,
    pub resolver: AccessResolver,
    pub face: Arc<dyn FaceMatcher>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    amora_shared::middleware::init_tracing("amora-media");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url);
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let minio = MinioClient::new(
        &config.minio_endpoint,
        &config.minio_access_key,
        &config.minio_secret_key,
        &config.minio_bucket,
    )
    .await;

    let metrics_handle = amora_shared::middleware::init_metrics();

    let relationships = Arc::new(SocialServiceClient::new(&config.social_service_url));
    let resolver = AccessResolver::new(relationships);

    let face: Arc<dyn FaceMatcher> =
        Arc::new(FaceApiClient::new(&config.face_api_url, config.face_timeout_secs));

    // The transcription client is built once here and handed to the
    // moderation worker, which owns it for the life of the process.
    let speech: Arc<dyn SpeechToText> = if config.stt_api_url.is_empty() {
        Arc::new(pipeline::DisabledSpeech)
    } else {
        Arc::new(TranscriptionClient::new(
            &config.stt_api_url,
            &config.stt_api_key,
            &config.stt_model,
            config.stt_timeout_secs,
        ))
    };

    let state = Arc::new(AppState {
        db,
        config,
        rabbitmq,
        minio,
        resolver,
        face,
        metrics_handle,
    });

    // Spawn RabbitMQ subscriber for account-deletion cascades
    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_user_deleted(sub_state).await {
            tracing::error!(error = %e, "user.deleted subscriber failed");
        }
    });

    // Spawn the voice moderation worker with a shutdown channel it
    // observes between batch items and during the inter-wake sleep.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = pipeline::spawn_worker(state.clone(), speech, shutdown_rx);

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/photos", post(routes::photos::upload_photo)
            .get(routes::photos::list_my_photos)
            .layer(DefaultBodyLimit::max(10 * 1024 * 1024)))
        .route("/photos/:id", get(routes::photos::get_photo)
            .patch(routes::photos::update_photo)
            .delete(routes::photos::delete_photo))
        .route("/photos/:id/primary", put(routes::photos::set_primary))
        .route("/users/:user_id/photos", get(routes::photos::list_user_photos))
        .route("/voice", post(routes::voice::upload_voice)
            .get(routes::voice::get_my_voice)
            .delete(routes::voice::delete_voice)
            .layer(DefaultBodyLimit::max(6 * 1024 * 1024)))
        .route("/users/:user_id/voice", get(routes::voice::get_user_voice))
        .route("/reports", post(routes::reports::create_report))
        .route("/admin/reports", get(routes::admin::list_reports))
        .route("/admin/reports/:id/review", put(routes::admin::review_report))
        .route("/verification", post(routes::verification::verify)
            .layer(DefaultBodyLimit::max(10 * 1024 * 1024)))
        .route("/verification/status", get(routes::verification::get_status))
        // Internal service-to-service endpoints (no auth)
        .route("/internal/media/summaries", post(routes::internal::batch_summaries))
        .route("/internal/verification/:user_id", get(routes::internal::get_verification))
        .layer(axum::middleware::from_fn(amora_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "amora-media starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    // Give the worker a moment to observe the signal and exit cleanly.
    let _ = worker.await;

    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}
