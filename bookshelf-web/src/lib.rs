//! bookshelf-web library - HTTP surface of the book catalog
//!
//! Serves the add-book form, the book listings (JSON file or table), search,
//! edit/delete endpoints and the JSON upload browser.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use bookshelf_common::form::{BookForm, BOOK_FORM};
use bookshelf_common::import::ImportPipeline;
use bookshelf_common::sink::PersistenceGateway;
use bookshelf_common::storage::StorageDir;
use bookshelf_common::upload::MAX_UPLOAD_BYTES;

pub mod api;
pub mod error;

/// Room for multipart framing and the title field on top of the file itself
const UPLOAD_BODY_SLACK: usize = 64 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub form: &'static BookForm,
    pub gateway: PersistenceGateway,
    pub imports: ImportPipeline,
    pub storage: StorageDir,
}

impl AppState {
    /// Create new application state using the process-wide book form
    pub fn new(pool: SqlitePool, storage: StorageDir) -> Self {
        Self::with_form(pool, storage, &*BOOK_FORM)
    }

    pub fn with_form(pool: SqlitePool, storage: StorageDir, form: &'static BookForm) -> Self {
        Self {
            form,
            gateway: PersistenceGateway::new(storage.clone(), pool),
            imports: ImportPipeline::new(storage.clone()),
            storage,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let books = Router::new()
        .route("/api/form", get(api::get_form))
        .route("/api/books", get(api::list_books).post(api::add_book))
        .route("/api/books/search", get(api::search_books))
        .route("/api/books/:id/delete", post(api::delete_book))
        .route("/api/books/:id/update", post(api::update_book));

    let files = Router::new()
        .route(
            "/api/upload",
            post(api::upload_json)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + UPLOAD_BODY_SLACK)),
        )
        .route("/api/files", get(api::list_files))
        .route("/api/files/:filename", get(api::view_file));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .merge(api::health_routes());

    Router::new()
        .merge(books)
        .merge(files)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
