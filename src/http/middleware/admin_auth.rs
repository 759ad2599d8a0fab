use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

/// Single capability gate for every admin surface: one shared token compared
/// in one place, instead of ad hoc checks scattered across handlers.
pub async fn require_admin_token(
    State(expected): State<String>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get("X-Admin-Token")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if provided.is_empty() || provided != expected {
        return Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .body(Body::from("unauthorized"))
            .unwrap_or_else(|_| Response::new(Body::from("unauthorized")));
    }

    next.run(request).await
}
