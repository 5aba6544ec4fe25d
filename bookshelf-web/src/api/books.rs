//! Book form, listing, search and edit endpoints

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use bookshelf_common::form::BookForm;
use bookshelf_common::sink::{parse_update_body, SaveOutcome, SinkMode};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query parameters for add-book
#[derive(Debug, Deserialize)]
pub struct ModeQuery {
    /// Target sink: "file" (default) or "db"
    pub mode: Option<String>,
}

/// Query parameters for the book listing
#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    /// Where to read from: "file" (default) or "db"
    pub source: Option<String>,
}

/// Query parameters for search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

fn parse_mode(raw: Option<&str>) -> ApiResult<SinkMode> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(s.parse::<SinkMode>()?),
        None => Ok(SinkMode::default()),
    }
}

fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid book id: {:?}", raw)))
}

/// GET /api/form
///
/// Field list of the book form with kinds and bounds, for rendering.
pub async fn get_form(State(state): State<AppState>) -> Json<&'static BookForm> {
    Json(state.form)
}

/// POST /api/books?mode=file|db
///
/// Validates a form-encoded book and hands it to the selected sink. Field
/// errors come back as 400 with an `errors` map; a duplicate in the table is
/// a warning, not an error.
pub async fn add_book(
    State(state): State<AppState>,
    Query(query): Query<ModeQuery>,
    Form(data): Form<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let mode = parse_mode(query.mode.as_deref().or(data.get("mode").map(String::as_str)))?;
    let record = state.form.validate(&data)?;

    match state.gateway.save(mode, &record).await {
        SaveOutcome::Saved => {
            let message = match mode {
                SinkMode::File => "Book saved to the JSON file.",
                SinkMode::Db => "Book saved to the database.",
            };
            Ok(Json(json!({
                "status": "ok",
                "outcome": "saved",
                "level": "success",
                "message": message,
                "mode": mode,
                "book": record,
            })))
        }
        SaveOutcome::DuplicateSkipped => Ok(Json(json!({
            "status": "ok",
            "outcome": "duplicate-skipped",
            "level": "warning",
            "message": "This book already exists, it was not added.",
            "mode": mode,
            "book": record,
        }))),
        SaveOutcome::PersistenceError(msg) => Err(ApiError::Persistence(msg)),
    }
}

/// GET /api/books?source=file|db
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<SourceQuery>,
) -> ApiResult<Json<Value>> {
    let source = parse_mode(query.source.as_deref())?;

    let body = match source {
        SinkMode::File => {
            let books = state.gateway.file().read_all().await;
            json!({ "source": source, "count": books.len(), "books": books })
        }
        SinkMode::Db => {
            let books = state.gateway.table().list_all().await?;
            json!({ "source": source, "count": books.len(), "books": books })
        }
    };

    Ok(Json(body))
}

/// GET /api/books/search?q=
///
/// Case-insensitive substring search over author, title and genre of the
/// table rows. An empty query returns every row.
pub async fn search_books(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let results = state.gateway.table().search(&query.q).await?;
    debug!("Search {:?} matched {} rows", query.q, results.len());

    Ok(Json(json!({
        "query": query.q,
        "count": results.len(),
        "results": results,
    })))
}

/// POST /api/books/:id/delete
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id)?;
    state.gateway.table().delete(id).await?;

    Ok(Json(json!({
        "status": "ok",
        "message": format!("Book {} deleted.", id),
    })))
}

/// POST /api/books/:id/update
///
/// JSON body with author/title/pages/year/genre. Rejects the change when it
/// would give the row the same (author, title, year) as another row.
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id)?;
    let body: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    let record = parse_update_body(&body)?;

    let book = state.gateway.table().update(id, &record).await?;
    info!(
        "Book {} now {:?} by {:?} ({})",
        id, book.record.title, book.record.author, book.record.year
    );

    Ok(Json(json!({
        "status": "ok",
        "message": "Book updated.",
        "book": book,
    })))
}
