//! Static file serving for the embedded viewer page

use axum::{
    body::Body,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

/// Embedded viewer assets (compiled into binary)
#[derive(RustEmbed)]
#[folder = "assets/"]
struct ViewerAssets;

/// Serve the viewer page
pub async fn index() -> impl IntoResponse {
    serve_file("index.html")
        .unwrap_or_else(|| (StatusCode::NOT_FOUND, "Viewer not found").into_response())
}

/// Fallback handler: serve an embedded asset or 404
pub async fn static_handler(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');

    serve_file(path).unwrap_or_else(|| (StatusCode::NOT_FOUND, "Not found").into_response())
}

/// Serve a file from embedded assets
fn serve_file(path: &str) -> Option<Response<Body>> {
    if path.is_empty() {
        return None;
    }
    let file = ViewerAssets::get(path)?;

    // Determine content type from file extension
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .body(Body::from(file.data.into_owned()))
        .ok()
}
