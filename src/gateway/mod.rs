// Gateway module - Pingora ProxyHttp implementation
// Answers every request locally; nothing is proxied upstream

pub mod endpoints;

use async_trait::async_trait;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::engine::ImageEngine;
use crate::metrics::Metrics;
use crate::pipeline::{HttpResponse, OptimizeRequest, RequestContext, RequestHandler};

pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";

/// ImageGateway implements the Pingora ProxyHttp trait
/// Handles routing to the optimize pipeline and the built-in endpoints
pub struct ImageGateway {
    handler: RequestHandler,
    route_prefix: String,
    public_base_url: Option<String>,
    /// Origin used when neither a public base URL nor a Host header is available
    fallback_origin: String,
    metrics: Arc<Metrics>,
    /// Gateway start time (for uptime calculation in /health endpoint)
    start_time: Instant,
}

impl ImageGateway {
    /// Create a new ImageGateway from configuration and an engine
    pub fn new(config: &Config, engine: Arc<dyn ImageEngine>) -> Self {
        Self {
            handler: RequestHandler::new(engine),
            route_prefix: config.server.normalized_route_prefix().to_string(),
            public_base_url: config
                .server
                .public_base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            fallback_origin: format!("http://{}", config.server.listen_addr()),
            metrics: Arc::new(Metrics::new()),
            start_time: Instant::now(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Origin (`scheme://host[:port]`) of rebuilt request URLs
    pub fn origin(&self, host: Option<&str>) -> String {
        if let Some(base) = &self.public_base_url {
            return base.clone();
        }
        match host {
            Some(host) if !host.trim().is_empty() => format!("http://{}", host.trim()),
            _ => self.fallback_origin.clone(),
        }
    }

    /// Route one request and produce the response to write.
    ///
    /// `HEAD` is routed like `GET`; the caller drops the body.
    pub async fn dispatch(
        &self,
        method: &str,
        path_and_query: &str,
        host: Option<&str>,
        ctx: &mut RequestContext,
    ) -> HttpResponse {
        if method != "GET" && method != "HEAD" {
            return endpoints::method_not_allowed().into_http();
        }

        let path = path_and_query
            .split_once('?')
            .map_or(path_and_query, |(path, _)| path);
        match path {
            HEALTH_PATH => return endpoints::handle_health(self.start_time).into_http(),
            METRICS_PATH => return endpoints::handle_metrics(&self.metrics).into_http(),
            _ => {}
        }

        match OptimizeRequest::new(self.origin(host), path_and_query, &self.route_prefix) {
            Some(request) => self.handler.respond(&request, ctx).await.into_http(),
            None => endpoints::not_found().into_http(),
        }
    }

    /// Record metrics for a finished request
    fn record(&self, ctx: &RequestContext, status: u16) {
        self.metrics.increment_status_count(status);
        self.metrics.increment_method_count(ctx.method());
        self.metrics
            .record_duration(ctx.elapsed().as_secs_f64() * 1000.0);
        if let Some(mode) = ctx.mode() {
            self.metrics.increment_mode_count(mode.as_str());
        }
        if let Some(engine_time) = ctx.engine_time() {
            self.metrics
                .record_engine_call(engine_time.as_secs_f64() * 1000.0, ctx.engine_failed());
        }
    }
}

/// Write a complete response; `include_body` is false for HEAD
async fn write_response(
    session: &mut Session,
    response: HttpResponse,
    include_body: bool,
) -> Result<()> {
    let mut header = ResponseHeader::build(response.status, None)?;
    for (name, value) in &response.headers {
        header.insert_header(*name, value.as_str())?;
    }
    header.insert_header("Content-Length", response.body.len().to_string())?;

    session
        .write_response_header(Box::new(header), !include_body)
        .await?;
    if include_body {
        session
            .write_response_body(Some(response.body), true)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl ProxyHttp for ImageGateway {
    type CTX = RequestContext;

    fn new_ctx(&self) -> Self::CTX {
        RequestContext::new("GET".to_string(), "/".to_string())
    }

    /// Never reached: request_filter answers every request
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Err(pingora_core::Error::explain(
            pingora_core::ErrorType::InternalError,
            "Gateway has no upstream",
        ))
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let req = session.req_header();
        let method = req.method.as_str().to_string();
        let path_and_query = req
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri.path().to_string());
        let host = req
            .headers
            .get("host")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| req.uri.authority().map(|a| a.to_string()));

        *ctx = RequestContext::new(method.clone(), req.uri.path().to_string());
        self.metrics.increment_request_count();

        let response = self
            .dispatch(&method, &path_and_query, host.as_deref(), ctx)
            .await;
        ctx.set_status(response.status);

        let include_body = method != "HEAD";
        if include_body {
            self.metrics.add_bytes_sent(response.body.len() as u64);
        }
        write_response(session, response, include_body).await?;

        Ok(true)
    }

    async fn logging(
        &self,
        session: &mut Session,
        _e: Option<&pingora_core::Error>,
        ctx: &mut Self::CTX,
    ) {
        let status_code = ctx
            .status()
            .or_else(|| session.response_written().map(|resp| resp.status.as_u16()))
            .unwrap_or(500);

        self.record(ctx, status_code);

        tracing::info!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            locator = ctx.locator().unwrap_or("-"),
            mode = ctx.mode().map(|m| m.as_str()).unwrap_or("-"),
            status = status_code,
            duration_ms = ctx.elapsed().as_secs_f64() * 1000.0,
            "Request completed"
        );
    }
}
