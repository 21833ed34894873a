// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HTTP routes.
//!
//! Engine work is synchronous, so every handler moves it onto the blocking
//! pool and takes the log lock there, holding it only while reading.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pan_history::assemble::encode_png;
use pan_history::{ImageMeta, PanHistoryError, PyramidSource, ReconstructionRequest, Selection, SourceError};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::{spawn_blocking, JoinError};
use tracing::{error, info, warn};
use tracker_activity::{log_activities, LogError, Sort, SortDirection, SortKey};
use tracker_app_core::prefs::ReconstructionPrefs;
use tracker_cas::{DirArtifactSink, SinkError};

use crate::state::AppState;

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/annotation_tracker/log", post(log_activity))
        .route("/annotation_tracker/pan_history/{image_id}", get(pan_history))
        .route("/annotation_tracker/images/{image_id}", get(image_metadata))
        .with_state(state)
}

/// Handler failure mapped to a status code.
#[derive(Debug)]
pub enum ApiError {
    /// The request was malformed or out of range.
    BadRequest(String),
    /// The addressed resource does not exist.
    NotFound(String),
    /// A collaborator failed.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => {
                warn!(%msg, "rejected request");
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(msg) => {
                error!(%msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Invalid { .. } => Self::BadRequest(err.to_string()),
            _ => Self::Internal(err.to_string()),
        }
    }
}

impl From<PanHistoryError> for ApiError {
    fn from(err: PanHistoryError) -> Self {
        match err {
            PanHistoryError::Prefs(_) | PanHistoryError::ZeroScale | PanHistoryError::Sink(SinkError::InvalidName(_)) => {
                Self::BadRequest(err.to_string())
            }
            _ => Self::Internal(err.to_string()),
        }
    }
}

impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        Self::Internal(format!("worker task failed: {err}"))
    }
}

/// `POST /annotation_tracker/log`: append a batch of raw activities.
pub async fn log_activity(
    State(state): State<Arc<AppState>>,
    Json(entries): Json<Vec<Value>>,
) -> Result<Json<BTreeMap<String, Vec<u64>>>, ApiError> {
    let submitted = entries.len();
    let saved = spawn_blocking(move || {
        let mut log = state.log.blocking_write();
        log_activities(&mut **log, entries)
    })
    .await??;
    info!(submitted, sessions = saved.len(), "logged activity batch");
    Ok(Json(saved))
}

/// Output of the pan-history route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Geometry report.
    #[default]
    Json,
    /// Mosaics and descriptor written to the artifact directory.
    Composite,
    /// Flattened raster.
    Png,
}

/// Query string of the pan-history route.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanHistoryParams {
    start_time: Option<f64>,
    end_time: Option<f64>,
    zoom_precision: Option<f64>,
    threshold: Option<f64>,
    sort: Option<SortDirection>,
    limit: Option<usize>,
    offset: Option<usize>,
    format: OutputFormat,
    scale: Option<u32>,
}

impl PanHistoryParams {
    fn request(&self, image_id: String, defaults: ReconstructionPrefs) -> ReconstructionRequest {
        let prefs = ReconstructionPrefs {
            zoom_precision: self.zoom_precision.unwrap_or(defaults.zoom_precision),
            area_threshold: self.threshold.unwrap_or(defaults.area_threshold),
            ..defaults
        };
        let request = ReconstructionRequest::new(image_id).with_prefs(prefs);
        let start = self.start_time.unwrap_or(request.start_time);
        let end = self.end_time.unwrap_or(request.end_time);
        let request = request.between(start, end);
        let sort = self.sort.map_or(request.sort, |direction| Sort {
            key: SortKey::Epochms,
            direction,
        });
        request.paged(sort, self.limit, self.offset.unwrap_or(0))
    }
}

/// `GET /annotation_tracker/pan_history/{image_id}`.
pub async fn pan_history(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
    Query(params): Query<PanHistoryParams>,
) -> Result<Response, ApiError> {
    let request = params.request(image_id, state.prefs);
    spawn_blocking(move || render(&state, &request, params.format, params.scale)).await?
}

fn render(
    state: &AppState,
    request: &ReconstructionRequest,
    format: OutputFormat,
    scale: Option<u32>,
) -> Result<Response, ApiError> {
    // Appends wait only for selection, not for pixel work.
    let selection = {
        let log = state.log.blocking_read();
        Selection::new(&**log, request)?
    };
    let source = &*state.images;
    let response = match format {
        OutputFormat::Json => Json(selection.report(source)?).into_response(),
        OutputFormat::Composite => {
            let mut sink = DirArtifactSink::new(&state.artifact_dir);
            Json(selection.composite(source, &mut sink, &request.image_id)?).into_response()
        }
        OutputFormat::Png => match selection.raster(source, scale)? {
            Some(raster) => ([(header::CONTENT_TYPE, "image/png")], encode_png(&raster, "raster")?).into_response(),
            None => StatusCode::NO_CONTENT.into_response(),
        },
    };
    Ok(response)
}

/// `GET /annotation_tracker/images/{image_id}`.
pub async fn image_metadata(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
) -> Result<Json<ImageMeta>, ApiError> {
    let id = image_id.clone();
    let meta = spawn_blocking(move || state.images.metadata(&id)).await??;
    meta.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("image {image_id} not found")))
}
