use crate::config::Config;
use crate::data::PgFaceStore;
use crate::face::{
    EngineConfig, FaceDetector, FaceEngine, FaceImages, FaceStore, MemoryFaceStore,
    RemoteDetector, UnavailableDetector,
};
use crate::state::{AppState, ServiceStatus};
use crate::tutor::Tutor;
use crate::tutor::openai::OpenAiChat;
use crate::utils::fmt_duration;
use crate::web::create_router;
use anyhow::Context;
use sqlx::ConnectOptions;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
}

impl App {
    /// Create a new App instance with all necessary components initialized
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let db_pool = match config.database_url.as_deref() {
            Some(url) => Some(Self::connect_database(url).await?),
            None => {
                warn!("DATABASE_URL not set, face identities are kept in memory only");
                None
            }
        };

        let store: Arc<dyn FaceStore> = match &db_pool {
            Some(pool) => Arc::new(PgFaceStore::new(pool.clone())),
            None => Arc::new(MemoryFaceStore::new()),
        };

        let detector: Arc<dyn FaceDetector> = match config.inference_url.as_deref() {
            Some(raw) => {
                let url = url::Url::parse(raw).context("Failed to parse INFERENCE_URL")?;
                Arc::new(
                    RemoteDetector::new(&url, config.inference_timeout)
                        .context("Failed to create inference client")?,
                )
            }
            None => {
                warn!("INFERENCE_URL not set, frame analysis will be rejected");
                Arc::new(UnavailableDetector)
            }
        };
        let detector_configured = config.inference_url.is_some();

        let engine_config = EngineConfig {
            similarity_threshold: config.similarity_threshold,
            iou_threshold: config.tracker_iou_threshold,
            max_age: config.tracker_max_age,
        };
        let engine = FaceEngine::load(
            engine_config,
            store,
            detector,
            FaceImages::new(&config.face_image_dir),
        )
        .await
        .context("Failed to load face registry")?;

        let chat = OpenAiChat::new(
            config.tutor_api_url.clone(),
            config.tutor_api_key.clone(),
            config.tutor_model.clone(),
            config.tutor_timeout,
        )
        .context("Failed to create tutor client")?;
        let tutor = Tutor::new(Arc::new(chat));

        let app_state = AppState::new(Arc::new(engine), Arc::new(tutor), db_pool);
        app_state.service_statuses.set(
            "detector",
            if detector_configured {
                ServiceStatus::Active
            } else {
                ServiceStatus::Disabled
            },
        );
        app_state
            .service_statuses
            .set("tutor", ServiceStatus::Active);

        Ok(App { config, app_state })
    }

    async fn connect_database(url: &str) -> Result<sqlx::PgPool, anyhow::Error> {
        let connect_options = sqlx::postgres::PgConnectOptions::from_str(url)
            .context("Failed to parse database URL")?
            .log_statements(tracing::log::LevelFilter::Debug)
            .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

        let slow_threshold = Duration::from_millis(500);
        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(4)
            .acquire_slow_threshold(slow_threshold)
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect_with(connect_options)
            .await
            .context("Failed to create database pool")?;

        info!(
            min_connections = 0,
            max_connections = 4,
            acquire_timeout = "4s",
            idle_timeout = "2m",
            max_lifetime = "30m",
            acquire_slow_threshold = fmt_duration(slow_threshold),
            "database pool established"
        );

        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed successfully");

        Ok(db_pool)
    }

    pub fn state(&self) -> &AppState {
        &self.app_state
    }

    /// Serve until Ctrl-C or SIGTERM, then drain for at most `SHUTDOWN_TIMEOUT`.
    pub async fn run(self) -> ExitCode {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, %addr, "failed to bind listener");
                return ExitCode::FAILURE;
            }
        };
        info!(%addr, "web server listening");

        let router = create_router(self.app_state.clone(), self.config.request_timeout);
        let shutdown = CancellationToken::new();
        let server_token = shutdown.clone();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { server_token.cancelled().await })
                .await
        });

        tokio::select! {
            result = &mut server => {
                error!(result = ?result, "web server stopped unexpectedly");
                return ExitCode::FAILURE;
            }
            _ = shutdown_signal() => {}
        }

        let timeout = self.config.shutdown_timeout;
        info!(timeout = fmt_duration(timeout), "shutdown requested, draining connections");
        shutdown.cancel();

        match tokio::time::timeout(timeout, server).await {
            Ok(Ok(Ok(()))) => {
                info!("web server stopped");
                ExitCode::SUCCESS
            }
            Ok(Ok(Err(e))) => {
                error!(error = %e, "web server failed during shutdown");
                ExitCode::FAILURE
            }
            Ok(Err(e)) => {
                error!(error = %e, "web server task panicked");
                ExitCode::FAILURE
            }
            Err(_) => {
                warn!(timeout = fmt_duration(timeout), "graceful shutdown timed out");
                ExitCode::FAILURE
            }
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }
}
