//! Parlor server binary — a local web front-end for chatting with a
//! locally running language model.
//!
//! Starts an axum HTTP server with structured logging, database
//! initialization, speech engine wiring, and graceful shutdown on
//! SIGTERM/SIGINT. Refuses to start against a non-local inference
//! endpoint — conversation content never leaves the machine.

use parlor_server::{app, background, config, AppState};
use parlor_voice::{SttService, TtsService};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("PARLOR_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Privacy guard: refuse non-local inference endpoints outright.
    if !parlor_llm::is_local_endpoint(&config.inference.base_url) {
        tracing::error!(
            endpoint = %config.inference.base_url,
            "inference endpoint is not localhost — aborting start"
        );
        std::process::exit(1);
    }

    // Initialize database
    let pool = parlor_db::create_pool(
        &config.database.path,
        parlor_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool — check database.path in config");

    let last_model = {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied = parlor_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
        parlor_db::seed_default_agent(&conn).expect("failed to seed default agent");
        parlor_db::load_last_model(&conn).expect("failed to read last-selected model")
    };

    // Inference client and model selection
    let llm = parlor_llm::LlmClient::new(&config.inference.base_url)
        .expect("failed to construct inference client");

    let mut models = llm.list_models().await;
    if models.is_empty() {
        tracing::warn!(
            fallback = %config.inference.default_model,
            "inference server offered no models, using configured default"
        );
        models = vec![config.inference.default_model.clone()];
    }

    let current_model = match last_model {
        Some(model) if models.contains(&model) => model,
        _ => models[0].clone(),
    };
    tracing::info!(model = %current_model, available = models.len(), "using model");

    // Speech engines
    let stt = Arc::new(SttService::new(
        &config.speech.stt_model,
        &config.speech.stt_binary,
    ));
    let tts = Arc::new(TtsService::new(
        &config.speech.tts_binary,
        &config.speech.voices_dir,
        config.speech.sample_rate,
    ));

    // Build application
    let state = AppState {
        pool,
        llm,
        stt,
        tts,
        pdf: parlor_server::pdf::PdfRenderer::new(
            &config.pdf.info_binary,
            &config.pdf.render_binary,
        ),
        attachments: parlor_server::attachments::AttachmentStore::new(),
        sessions: parlor_server::sessions::SessionRegistry::new(),
        models: Arc::new(RwLock::new(models)),
        current_model: Arc::new(RwLock::new(current_model)),
    };

    let shared_state = Arc::new(state.clone());
    tokio::spawn(background::start_attachment_sweeper(
        shared_state,
        config.server.attachment_ttl_secs,
    ));

    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting parlor server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    if config.server.open_browser {
        let url = format!("http://{}", addr);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            if let Err(e) = open::that(&url) {
                tracing::warn!(url = %url, "failed to open browser: {}", e);
            }
        });
    }

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("parlor server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
