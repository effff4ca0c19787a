use std::net::SocketAddr;

use axum::response::Response;
use color_eyre::eyre::WrapErr;
use tokio::net::TcpListener;

use crate::AppState;

use errors::ServerError;

mod api {
    pub mod catalog;
    pub mod recipes;
    pub mod users;
}

pub(crate) mod current_user;
pub(crate) mod errors;
pub(crate) mod json_body;
pub(crate) mod routes;
mod trace;

#[cfg(test)]
pub(crate) mod test_helpers;

type ResponseResult<T = Response> = Result<T, ServerError>;

pub(crate) async fn run_server(state: AppState) -> crate::Result<()> {
    let tracer = trace::Tracer;
    let trace_layer = tower_http::trace::TraceLayer::new_for_http()
        .make_span_with(tracer)
        .on_response(tracer);

    let addr = SocketAddr::from(([0, 0, 0, 0], state.app.port));
    let app = routes::make_router().layer(trace_layer).with_state(state);

    tracing::info!("Starting server on port {}", addr.port());
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err("Failed to open port")?;

    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .await
        .wrap_err("Failed to run server")
}
