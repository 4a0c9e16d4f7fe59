//! Request orchestration for the optimize route
//!
//! `handle` is the happy path and returns typed errors; `respond` is the one
//! boundary that logs failures and turns them into error envelopes.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use reqwest::Url;

use super::content_type::resolve_content_type;
use super::context::{RequestContext, ResponseMode};
use super::operations::{build_operations, has_operation_params, CanonicalOperation};
use super::path::{parse_image_path, ImageLocator};
use super::placeholder::{
    build_blur_placeholder_operations, is_blur_placeholder, wants_json, PlaceholderDescriptor,
    PLACEHOLDER_PARAM,
};
use super::query::QueryParams;
use super::response::ResponseEnvelope;
use crate::constants::DEFAULT_FORMAT;
use crate::engine::{ImageData, ImageEngine, ProcessedImage};
use crate::error::PipelineError;
use crate::logging::error_chain;

/// Split a request path into router segments below `route_prefix`.
///
/// Returns `None` when the path is not under the prefix. Empty segments are
/// dropped, so `/optimize` and `/optimize/` both yield no segments.
pub fn route_segments(path: &str, route_prefix: &str) -> Option<Vec<String>> {
    let rest = path.strip_prefix(route_prefix)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    Some(
        rest.split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// One request to the optimize route
#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    origin: String,
    path_and_query: String,
    segments: Vec<String>,
    query: QueryParams,
}

impl OptimizeRequest {
    /// Build from the request origin (`http://host:port`) and the raw
    /// request target. `None` when the path is outside `route_prefix`.
    pub fn new(origin: impl Into<String>, path_and_query: &str, route_prefix: &str) -> Option<Self> {
        let (path, raw_query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, query),
            None => (path_and_query, ""),
        };
        let segments = route_segments(path, route_prefix)?;

        Some(Self {
            origin: origin.into(),
            path_and_query: path_and_query.to_string(),
            segments,
            query: QueryParams::parse(raw_query),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Absolute URL of this request
    pub fn url(&self) -> Result<Url, PipelineError> {
        let absolute = format!("{}{}", self.origin.trim_end_matches('/'), self.path_and_query);
        Url::parse(&absolute).map_err(|e| PipelineError::InvalidRequestUrl(format!("{absolute}: {e}")))
    }
}

/// Composition root of the optimize route
#[derive(Clone)]
pub struct RequestHandler {
    engine: Arc<dyn ImageEngine>,
}

impl RequestHandler {
    pub fn new(engine: Arc<dyn ImageEngine>) -> Self {
        Self { engine }
    }

    /// Run the request and always produce an envelope.
    ///
    /// Failures are logged with the request id, the locator being processed
    /// and the raw `placeholder` value before being converted.
    pub async fn respond(
        &self,
        request: &OptimizeRequest,
        ctx: &mut RequestContext,
    ) -> ResponseEnvelope {
        match self.handle(request, ctx).await {
            Ok(envelope) => envelope,
            Err(err) => {
                log_failure(&err, ctx);
                ResponseEnvelope::from_error(&err)
            }
        }
    }

    pub async fn handle(
        &self,
        request: &OptimizeRequest,
        ctx: &mut RequestContext,
    ) -> Result<ResponseEnvelope, PipelineError> {
        let query = request.query();
        ctx.set_placeholder(query.get(PLACEHOLDER_PARAM).map(str::to_string));

        let locator = parse_image_path(request.segments())?;
        ctx.set_locator(locator.as_str());

        if is_blur_placeholder(query) {
            let plan = build_blur_placeholder_operations(query);
            let json = wants_json(query);
            ctx.set_mode(if json {
                ResponseMode::PlaceholderJson
            } else {
                ResponseMode::Placeholder
            });

            let result = self.process(&locator, &plan.to_operations(), ctx).await?;
            let content_type = resolve_content_type(result.format.as_deref().unwrap_or(&plan.format));
            let data = into_bytes(&locator, result.data)?;

            if json {
                let descriptor =
                    PlaceholderDescriptor::new(&plan, &data, &content_type, &request.url()?);
                return Ok(ResponseEnvelope::PlaceholderJson(descriptor));
            }
            return Ok(ResponseEnvelope::Image { data, content_type });
        }

        if !has_operation_params(query) {
            ctx.set_mode(ResponseMode::Passthrough);
            let result = self.process(&locator, &CanonicalOperation::new(), ctx).await?;
            let content_type = resolve_content_type(result.format.as_deref().unwrap_or(DEFAULT_FORMAT));
            let data = into_bytes(&locator, result.data)?;
            return Ok(ResponseEnvelope::Image { data, content_type });
        }

        ctx.set_mode(ResponseMode::Image);
        let operations = build_operations(query);
        let result = self.process(&locator, &operations, ctx).await?;
        let format = result
            .format
            .as_deref()
            .or(operations.format())
            .unwrap_or(DEFAULT_FORMAT);
        let content_type = resolve_content_type(format);
        let data = into_bytes(&locator, result.data)?;
        Ok(ResponseEnvelope::Image { data, content_type })
    }

    async fn process(
        &self,
        locator: &ImageLocator,
        operations: &CanonicalOperation,
        ctx: &mut RequestContext,
    ) -> Result<ProcessedImage, PipelineError> {
        tracing::debug!(locator = %locator, operations = %operations, "Calling image engine");
        let start = Instant::now();
        let result = self.engine.process(locator, operations).await;
        ctx.record_engine_call(start.elapsed(), result.is_err());

        result.map_err(|source| PipelineError::Engine {
            locator: locator.to_string(),
            source,
        })
    }
}

/// Engine payload as response bytes; textual payloads are not supported
fn into_bytes(locator: &ImageLocator, data: ImageData) -> Result<Bytes, PipelineError> {
    match data {
        ImageData::Bytes(bytes) => Ok(bytes),
        other => Err(PipelineError::UnsupportedResultType {
            locator: locator.to_string(),
            kind: other.kind(),
        }),
    }
}

/// Diagnostic record for a failed request; the event message is the error text
fn log_failure(err: &PipelineError, ctx: &RequestContext) {
    let stack = std::error::Error::source(err)
        .map(error_chain)
        .unwrap_or_default();
    let locator = err.locator().or(ctx.locator()).unwrap_or_default();
    let placeholder = ctx.placeholder().unwrap_or_default();

    if err.is_client_error() {
        tracing::warn!(
            request_id = %ctx.request_id(),
            stack = %stack,
            locator = %locator,
            placeholder = %placeholder,
            "{}",
            err
        );
    } else {
        tracing::error!(
            request_id = %ctx.request_id(),
            stack = %stack,
            locator = %locator,
            placeholder = %placeholder,
            "{}",
            err
        );
    }
}
