use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};

/// Server errors log at error, client errors at warn. Redirects from the
/// dashboard gate count as success.
fn completion_level(status: StatusCode) -> tracing::Level {
    if status.is_server_error() {
        tracing::Level::ERROR
    } else if status.is_client_error() {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    }
}

pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let req_id: String = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::debug!(request_id = %req_id, method = %method, path = %path, "incoming request");

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();

    macro_rules! completed {
        ($level:ident, $msg:literal) => {
            tracing::$level!(
                request_id = %req_id,
                method = %method,
                path = %path,
                status = %status,
                duration_ms = %duration_ms,
                $msg
            )
        };
    }

    let level = completion_level(status);
    if level == tracing::Level::ERROR {
        completed!(error, "request completed with error");
    } else if level == tracing::Level::WARN {
        completed!(warn, "request completed with client error");
    } else {
        completed!(info, "request completed");
    }

    response
}

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
