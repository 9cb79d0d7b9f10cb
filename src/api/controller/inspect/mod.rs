//! Inspect controller: runs the pipeline once for one pod on demand

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::warn;
use validator::Validate;

use crate::api::dto::inspect_dto::InspectQuery;
use crate::app_state::AppState;
use crate::core::client::pods::PodIdentity;
use crate::domain::inspect::dto::render_request::RenderRequest;
use crate::domain::inspect::service::inspect_service::inspect_pod;
use crate::domain::proxy_config::ResourceKind;
use crate::errors::AppError;

pub struct InspectController;

impl InspectController {
    /// Rendered body with the content type of the requested format.
    pub async fn inspect(
        State(state): State<AppState>,
        Path((namespace, pod, kind)): Path<(String, String, String)>,
        Query(query): Query<InspectQuery>,
    ) -> Result<Response, AppError> {
        query
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let kind: ResourceKind = kind.parse()?;
        // reject bad formats and criteria before touching the pod
        let request = RenderRequest::new(
            kind,
            query.format_token(),
            &query.criteria_fields(),
            query.include_eds,
        )?;

        let pod = PodIdentity::new(namespace, pod);
        let output = inspect_pod(state.admin.as_ref(), &pod, &request, &state.retry)
            .await
            .map_err(|failure| {
                warn!(pod = %pod, stage = %failure.stage, error = %failure.error, "On-demand inspection failed");
                AppError::from(failure.error)
            })?;

        Ok(([(header::CONTENT_TYPE, output.content_type())], output.body).into_response())
    }
}
