use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use clap::Parser;
use server_api::ApiContext;
use shared::{
    domain::{DeveloperId, LevelId},
    error::{ApiError, ErrorCode},
    protocol::{DeveloperPayload, DeveloperRequest, LevelPayload, LevelRequest},
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, normalize_database_url, resolve_bind_addr};

/// Development REST backend for the levels/developers console.
#[derive(Parser, Debug)]
struct Args {
    /// Settings file; missing files fall back to defaults.
    #[arg(long, default_value = "server.toml")]
    config: PathBuf,
    /// Interface to bind. Passing the flag without a value listens on all interfaces.
    #[arg(long, num_args = 0..=1, default_missing_value = "0.0.0.0")]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    database_url: Option<String>,
}

type ApiFailure = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info,tower_http=debug")
        .init();

    let args = Args::parse();
    let mut settings = load_settings(&args.config)?;
    if let Some(database_url) = args.database_url {
        settings.database_url = database_url;
    }

    let addr = resolve_bind_addr(&settings.bind_addr, args.host.as_deref(), args.port)?;
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/levels", get(http_list_levels).post(http_create_level))
        .route(
            "/levels/:level_id",
            put(http_update_level).delete(http_delete_level),
        )
        .route(
            "/developers",
            get(http_list_developers).post(http_create_developer),
        )
        .route(
            "/developers/:developer_id",
            put(http_update_developer).delete(http_delete_developer),
        )
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn failure(err: ApiError) -> ApiFailure {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %err.message, "request failed");
    }
    (status, Json(err))
}

fn body_failure(rejection: JsonRejection) -> ApiFailure {
    failure(ApiError::validation(rejection.body_text()))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiFailure> {
    server_api::health(&state.api).await.map_err(failure)?;
    Ok("ok")
}

async fn http_list_levels(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LevelPayload<DeveloperPayload>>>, ApiFailure> {
    let levels = server_api::list_levels(&state.api).await.map_err(failure)?;
    Ok(Json(levels))
}

async fn http_create_level(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LevelRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LevelPayload>), ApiFailure> {
    let Json(req) = body.map_err(body_failure)?;
    let level = server_api::create_level(&state.api, req)
        .await
        .map_err(failure)?;
    Ok((StatusCode::CREATED, Json(level)))
}

async fn http_update_level(
    State(state): State<Arc<AppState>>,
    Path(level_id): Path<i64>,
    body: Result<Json<LevelRequest>, JsonRejection>,
) -> Result<Json<LevelPayload>, ApiFailure> {
    let Json(req) = body.map_err(body_failure)?;
    let level = server_api::update_level(&state.api, LevelId(level_id), req)
        .await
        .map_err(failure)?;
    Ok(Json(level))
}

async fn http_delete_level(
    State(state): State<Arc<AppState>>,
    Path(level_id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    server_api::delete_level(&state.api, LevelId(level_id))
        .await
        .map_err(failure)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_list_developers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeveloperPayload>>, ApiFailure> {
    let developers = server_api::list_developers(&state.api)
        .await
        .map_err(failure)?;
    Ok(Json(developers))
}

async fn http_create_developer(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DeveloperRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DeveloperPayload>), ApiFailure> {
    let Json(req) = body.map_err(body_failure)?;
    let developer = server_api::create_developer(&state.api, req)
        .await
        .map_err(failure)?;
    Ok((StatusCode::CREATED, Json(developer)))
}

async fn http_update_developer(
    State(state): State<Arc<AppState>>,
    Path(developer_id): Path<i64>,
    body: Result<Json<DeveloperRequest>, JsonRejection>,
) -> Result<Json<DeveloperPayload>, ApiFailure> {
    let Json(req) = body.map_err(body_failure)?;
    let developer = server_api::update_developer(&state.api, DeveloperId(developer_id), req)
        .await
        .map_err(failure)?;
    Ok(Json(developer))
}

async fn http_delete_developer(
    State(state): State<Arc<AppState>>,
    Path(developer_id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    server_api::delete_developer(&state.api, DeveloperId(developer_id))
        .await
        .map_err(failure)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
