use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use painpoint_common::{ErrorKind, ErrorPayload};
use painpoint_pipeline::fixtures::canned_report;

use crate::AppState;

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    #[serde(default)]
    test: bool,
}

/// Serverless-job envelope: `{"input": {"prompt": ..., "test": ...}}`.
#[derive(Deserialize)]
pub struct RunRequest {
    input: RunInput,
}

#[derive(Deserialize)]
pub struct RunInput {
    prompt: Option<String>,
    #[serde(default)]
    test: bool,
}

pub async fn api_search(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchQuery>, QueryRejection>,
) -> Response {
    match params {
        Ok(Query(params)) => answer(&state, params.q.as_deref(), params.test).await,
        Err(rejection) => invalid_request(rejection.body_text()),
    }
}

pub async fn api_run(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(body)) => answer(&state, body.input.prompt.as_deref(), body.input.test).await,
        Err(rejection) => invalid_request(rejection.body_text()),
    }
}

fn invalid_request(details: impl Into<String>) -> Response {
    let details = details.into();
    warn!(%details, "Rejected malformed request");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorPayload::new(ErrorKind::InvalidRequest, details)),
    )
        .into_response()
}

/// Test mode wins over everything, including a missing keyword. Reports and
/// pipeline error payloads are both 200.
async fn answer(state: &AppState, keyword: Option<&str>, test: bool) -> Response {
    if test {
        info!("Test mode, serving canned report");
        return Json(canned_report(state.fixture_path.as_deref())).into_response();
    }

    let Some(keyword) = keyword.map(str::trim).filter(|k| !k.is_empty()) else {
        return invalid_request("a non-empty search keyword is required");
    };

    let run = state.pipeline.run(keyword).await;
    info!(
        request_id = ?run.stats.request_id,
        reviews = run.stats.reviews_fetched,
        negative = run.stats.negative_reviews,
        error = run.response.is_error(),
        "Request complete"
    );
    Json(run.response).into_response()
}
