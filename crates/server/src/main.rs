use std::{net::SocketAddr, sync::Arc};

use askama::Template;
use axum::{
    extract::{rejection::FormRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use server_api::{health, load_index, note_location, perform_action, ActionOutcome, ApiContext};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{ActionAck, ActionForm, LoaderData, NoteAction},
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod views;

use app_state::AppState;
use config::{load_settings, normalize_database_url};
use views::IndexPage;

#[derive(Debug, Deserialize)]
struct IndexQuery {
    #[serde(rename = "noteId")]
    note_id: Option<String>,
}

type ErrorResponse = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
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
        api: ApiContext::new(storage),
        max_form_bytes: settings.max_form_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "notes server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let max_form_bytes = state.max_form_bytes;
    Router::new()
        .route("/", get(index).post(submit_action))
        .route("/api/notes", get(api_notes))
        .route("/healthz", get(healthz))
        .layer(RequestBodyLimitLayer::new(max_form_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, ErrorResponse> {
    health(&state.api).await.map_err(error_response)?;
    Ok("ok")
}

async fn index(
    State(state): State<Arc<AppState>>,
    Query(q): Query<IndexQuery>,
) -> Result<Html<String>, ErrorResponse> {
    let data = load_index(&state.api, q.note_id.as_deref())
        .await
        .map_err(error_response)?;
    let html = IndexPage::new(&data, q.note_id.as_deref())
        .render()
        .map_err(|e| {
            error_response(ApiError::new(
                ErrorCode::Internal,
                format!("template render failed: {e}"),
            ))
        })?;
    Ok(Html(html))
}

async fn api_notes(
    State(state): State<Arc<AppState>>,
    Query(q): Query<IndexQuery>,
) -> Result<Json<LoaderData>, ErrorResponse> {
    let data = load_index(&state.api, q.note_id.as_deref())
        .await
        .map_err(error_response)?;
    Ok(Json(data))
}

async fn submit_action(
    State(state): State<Arc<AppState>>,
    form: Result<Form<ActionForm>, FormRejection>,
) -> Result<Response, ErrorResponse> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Ok(rejection.into_response());
        }
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "rejected note action");
            return Ok(rejected_action());
        }
    };
    let action = match NoteAction::try_from(form) {
        Ok(action) => action,
        Err(reason) => {
            warn!(%reason, "rejected note action");
            return Ok(rejected_action());
        }
    };

    let response = match perform_action(&state.api, action)
        .await
        .map_err(error_response)?
    {
        ActionOutcome::Created(note_id) => Redirect::to(&note_location(&note_id)).into_response(),
        ActionOutcome::Updated => Json(ActionAck::OK).into_response(),
    };
    Ok(response)
}

fn rejected_action() -> Response {
    (StatusCode::BAD_REQUEST, Json(ActionAck::REJECTED)).into_response()
}

fn error_response(err: ApiError) -> ErrorResponse {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => {
            error!(error = %err.message, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
