use api_router::{api_routes, api_state::ApiState};
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use common::utils::config::{get_config, AppConfig};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;
    if !config.require_auth {
        warn!("Authentication is disabled, every API route is public");
    }

    let api_state = ApiState::from_config(&config).await?;
    info!(
        references = api_state.evaluator.references().len(),
        "API state initialized"
    );

    // Reference vectors are optional at boot; /ready reports 503 until they load.
    if let Err(err) = api_state.evaluator.initialize().await {
        error!(error = %err, "Reference vectors could not be loaded at startup");
    }

    // Create Axum router
    let app = Router::new()
        .nest("/api", api_routes(&api_state))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match config
        .cors_allow_origin
        .as_deref()
        .map(HeaderValue::from_str)
    {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(err)) => {
            warn!(error = %err, "Ignoring invalid cors_allow_origin, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
    }
}
