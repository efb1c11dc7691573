mod config;
mod db;
mod errors;
mod latex;
mod models;
mod pipeline;
mod resumes;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StorageConfig};
use crate::db::create_pool;
use crate::pipeline::{DocumentWriter, Ghostscript, PdfLatex, RenderLocks, RenderPipeline};
use crate::resumes::repository::PgResumeRepository;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{ArtifactStore, LocalArtifactStore, S3ArtifactStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize artifact storage
    let store: Arc<dyn ArtifactStore> = match &config.storage {
        StorageConfig::Local { root } => Arc::new(LocalArtifactStore::new(root)),
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            access_key_id,
            secret_access_key,
        } => {
            let client =
                build_s3_client(endpoint, region, access_key_id, secret_access_key).await;
            Arc::new(S3ArtifactStore::new(client, bucket))
        }
    };
    info!("Artifact store initialized (backend: {})", store.backend());

    // Initialize render pipeline
    let pipeline = RenderPipeline::new(
        DocumentWriter::new(&config.scratch_dir),
        Arc::new(PdfLatex::new(&config.latex_bin, config.compile_timeout)),
        Arc::new(Ghostscript::new(
            &config.ghostscript_bin,
            config.preview_dpi,
            config.rasterize_timeout,
        )),
    );
    info!(
        "Render pipeline: {} ({}s) -> {} at {} dpi ({}s), scratch {}",
        config.latex_bin,
        config.compile_timeout.as_secs(),
        config.ghostscript_bin,
        config.preview_dpi,
        config.rasterize_timeout.as_secs(),
        pipeline.writer().root().display()
    );

    // Build app state
    let state = AppState {
        resumes: Arc::new(PgResumeRepository::new(db)),
        store,
        pipeline: Arc::new(pipeline),
        render_locks: RenderLocks::new(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client for MinIO, Supabase storage or AWS.
async fn build_s3_client(
    endpoint: &str,
    region: &str,
    access_key_id: &str,
    secret_access_key: &str,
) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        access_key_id,
        secret_access_key,
        None,
        None,
        "resume-api-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(credentials)
        .endpoint_url(endpoint)
        .load()
        .await;

    // MinIO and Supabase storage need path-style bucket addressing.
    let config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(config)
}
