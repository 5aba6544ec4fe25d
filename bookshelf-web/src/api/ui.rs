//! Catalog front end
//!
//! `index.html` holds the add-book form, upload form, file list and book
//! table; `app.js` renders them from `/api/form` and the JSON endpoints.
//! Both are compiled into the binary.

use axum::{http::header, response::Html, response::IntoResponse};

const INDEX_HTML: &str = include_str!("../../ui/index.html");
const APP_JS: &str = include_str!("../../ui/app.js");

/// GET /
pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /static/app.js
pub async fn serve_app_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], APP_JS)
}
