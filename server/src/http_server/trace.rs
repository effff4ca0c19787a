use axum::{
    extract::MatchedPath,
    http::{header, Request, Response},
};
use tower_http::trace::{MakeSpan, OnResponse};
use tracing::{field::Empty, Level};
use uuid::Uuid;

/// Span field filled in by the auth extractors once a token resolves.
pub(crate) const USER_ID_FIELD: &str = "user.id";

#[derive(Debug, Clone, Copy)]
pub(crate) struct Tracer;

/// Splits `/api/recipes/<id>/favorite` into the resource (`recipes`) and the
/// id it addresses, when there is one.
fn api_target(path: &str) -> (Option<&str>, Option<Uuid>) {
    let mut segments = path
        .strip_prefix("/api/")
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty());

    let resource = segments.next();
    let id = segments.next().and_then(|s| s.parse().ok());

    (resource, id)
}

impl<Body> MakeSpan<Body> for Tracer {
    fn make_span(&mut self, request: &Request<Body>) -> tracing::Span {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map_or("", MatchedPath::as_str);
        let (resource, target_id) = api_target(request.uri().path());

        tracing::span!(
            Level::INFO,
            "server.request",
            otel.name = format!("{} {}", request.method(), route),
            http.route = route,
            http.request.method = %request.method(),
            url.path = request.uri().path(),
            url.query = request.uri().query(),
            user_agent.original = request
                .headers()
                .get(header::USER_AGENT)
                .and_then(|h| h.to_str().ok()),
            api.resource = resource,
            api.target_id = target_id.map(tracing::field::display),
            user.id = Empty,
            http.response.status_code = Empty,
        )
    }
}

impl<Body> OnResponse<Body> for Tracer {
    fn on_response(
        self,
        response: &Response<Body>,
        latency: std::time::Duration,
        span: &tracing::Span,
    ) {
        let status_code = response.status().as_u16();
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        span.record("http.response.status_code", status_code);

        if response.status().is_server_error() {
            tracing::event!(
                Level::WARN,
                status = status_code,
                latency_ms,
                "request failed"
            );
        } else {
            tracing::event!(
                Level::INFO,
                status = status_code,
                latency_ms,
                "finished processing request"
            );
        }
    }
}
