//! Integration tests for bookshelf-web API endpoints
//!
//! Each test gets its own temp directory holding the storage folder and an
//! on-disk SQLite database, and drives the router in-process.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

use bookshelf_common::db::init_database;
use bookshelf_common::storage::StorageDir;
use bookshelf_common::upload::MAX_UPLOAD_BYTES;
use bookshelf_web::{build_router, AppState};

const BOUNDARY: &str = "bookshelf-test-boundary";

/// Test helper: app over a fresh temp directory
async fn setup_app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("test.db"))
        .await
        .expect("Should create test database");
    let state = AppState::new(pool, StorageDir::new(dir.path().join("books_json")));
    (dir, build_router(state))
}

/// Test helper: send one request and return status plus JSON body
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: multipart upload request with an optional title
fn upload(filename: &str, content: &[u8], title: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(title) = title {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{}\r\n",
                BOUNDARY, title
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn add_db_book(app: &Router, author: &str, title: &str, year: i64) -> Value {
    let form = format!("author={}&title={}&pages=100&year={}", author, title, year);
    let (status, body) = send(app, post_form("/api/books?mode=db", &form)).await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn db_books(app: &Router) -> Vec<Value> {
    let (_, body) = send(app, get("/api/books?source=db")).await;
    body["books"].as_array().cloned().unwrap_or_default()
}

// =============================================================================
// Health and form
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = setup_app().await;
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "bookshelf-web");
}

#[tokio::test]
async fn test_form_description() {
    let (_dir, app) = setup_app().await;
    let (status, body) = send(&app, get("/api/form")).await;

    assert_eq!(status, StatusCode::OK);
    let fields = body["fields"].as_array().unwrap();
    let names: Vec<_> = fields.iter().map(|f| f["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["author", "title", "pages", "year", "genre"]);
    assert_eq!(fields[2]["kind"]["type"], "integer");
    assert_eq!(fields[2]["kind"]["min"], 1);
    assert!(fields[2]["kind"]["max"].is_null());
}

// =============================================================================
// Add book
// =============================================================================

#[tokio::test]
async fn test_add_book_to_file() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(
        &app,
        post_form("/api/books", "author=A&title=T&pages=10&year=2020&genre=Poetry"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "saved");
    assert_eq!(body["mode"], "file");

    let (_, listing) = send(&app, get("/api/books?source=file")).await;
    let books = listing["books"].as_array().unwrap();
    assert_eq!(
        books.last().unwrap(),
        &json!({"author": "A", "title": "T", "pages": 10, "year": 2020, "genre": "Poetry"})
    );
}

#[tokio::test]
async fn test_add_book_validation_errors() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(
        &app,
        post_form("/api/books?mode=db", "author=&title=T&pages=abc&year=99999"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["errors"]["author"].is_array());
    assert_eq!(body["errors"]["pages"][0], "Enter a whole number.");
    assert!(body["errors"]["year"][0]
        .as_str()
        .unwrap()
        .contains("less than or equal to"));
    assert!(db_books(&app).await.is_empty());
}

#[tokio::test]
async fn test_add_book_duplicate_in_db_is_skipped() {
    let (_dir, app) = setup_app().await;

    let first = add_db_book(&app, "A", "T", 2020).await;
    assert_eq!(first["outcome"], "saved");

    let second = add_db_book(&app, "A", "T", 2020).await;
    assert_eq!(second["outcome"], "duplicate-skipped");
    assert_eq!(second["level"], "warning");

    assert_eq!(db_books(&app).await.len(), 1);
}

#[tokio::test]
async fn test_add_book_storage_failure_reports_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("test.db")).await.unwrap();
    // A regular file where the storage directory should be
    let blocked = dir.path().join("not_a_dir");
    std::fs::write(&blocked, b"x").unwrap();
    let app = build_router(AppState::new(pool, StorageDir::new(&blocked)));

    let (status, body) = send(
        &app,
        post_form("/api/books", "author=A&title=T&pages=1&year=2000"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["outcome"], "persistence-error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Could not save the book"));
}

#[tokio::test]
async fn test_add_book_unknown_mode() {
    let (_dir, app) = setup_app().await;
    let (status, body) = send(
        &app,
        post_form("/api/books?mode=csv", "author=A&title=T&pages=1&year=1"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("csv"));
}

// =============================================================================
// Upload and files
// =============================================================================

#[tokio::test]
async fn test_upload_rejects_non_json_name() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, upload("data.txt", b"[]", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["file"][0], "Only .json files are allowed.");

    let (_, files) = send(&app, get("/api/files")).await;
    assert_eq!(files["count"], 0);
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let (_dir, app) = setup_app().await;

    let content = vec![b' '; MAX_UPLOAD_BYTES + 1];
    let (status, body) = send(&app, upload("big.json", &content, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["file"][0].as_str().unwrap().contains("too large"));
}

#[tokio::test]
async fn test_upload_valid_file_is_listed_and_viewable() {
    let (_dir, app) = setup_app().await;
    let content = br#"[{"author":"A","title":"T","pages":10,"year":2020}]"#;

    let (status, body) = send(&app, upload("books.json", content, Some("My shelf"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["message"].as_str().unwrap().contains("My shelf"));
    let stored = body["file"]["filename"].as_str().unwrap().to_string();

    let (_, files) = send(&app, get("/api/files")).await;
    assert_eq!(files["count"], 1);
    assert_eq!(files["files"][0]["filename"], stored.as_str());
    assert_eq!(files["files"][0]["size"], content.len());
    assert!(files.get("message").is_none());

    let (status, view) = send(&app, get(&format!("/api/files/{}", stored))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["items"][0]["title"], "T");
}

#[tokio::test]
async fn test_upload_wrong_structure_is_deleted() {
    let (_dir, app) = setup_app().await;
    let content = br#"[{"author":"A","title":"T","pages":10}]"#;

    let (status, body) = send(&app, upload("books.json", content, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("does not match the book structure"));

    let (_, files) = send(&app, get("/api/files")).await;
    assert_eq!(files["count"], 0);
    assert_eq!(files["message"], "No JSON files found.");
}

#[tokio::test]
async fn test_upload_without_file() {
    let (_dir, app) = setup_app().await;
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nx\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["file"].is_array());
}

#[tokio::test]
async fn test_view_file_errors() {
    let (dir, app) = setup_app().await;
    std::fs::create_dir_all(dir.path().join("books_json")).unwrap();
    std::fs::write(dir.path().join("books_json").join("scalar.json"), "7").unwrap();

    let (status, body) = send(&app, get("/api/files/missing.json")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");

    let (status, body) = send(&app, get("/api/files/scalar.json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("unrecognized structure"));
}

// =============================================================================
// Search, delete, update
// =============================================================================

#[tokio::test]
async fn test_search_books() {
    let (_dir, app) = setup_app().await;
    add_db_book(&app, "John%20Smith", "Memoirs", 2000).await;
    add_db_book(&app, "Ann", "Smithy", 2001).await;
    add_db_book(&app, "Bob", "Other", 2002).await;

    let (status, body) = send(&app, get("/api/books/search?q=SMITH")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, all) = send(&app, get("/api/books/search?q=")).await;
    assert_eq!(all["count"], 3);

    let (_, no_param) = send(&app, get("/api/books/search")).await;
    assert_eq!(no_param["count"], 3);
}

#[tokio::test]
async fn test_delete_book() {
    let (_dir, app) = setup_app().await;
    add_db_book(&app, "A", "T", 2020).await;
    let id = db_books(&app).await[0]["id"].as_i64().unwrap();

    let (status, body) = send(&app, post_json(&format!("/api/books/{}/delete", id), &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(db_books(&app).await.is_empty());

    let (status, body) = send(&app, post_json(&format!("/api/books/{}/delete", id), &json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_update_book() {
    let (_dir, app) = setup_app().await;
    add_db_book(&app, "A", "T", 2020).await;
    let id = db_books(&app).await[0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        post_json(
            &format!("/api/books/{}/update", id),
            &json!({"author": "A", "title": "T2", "pages": "250", "year": "2021", "genre": "Essay"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["book"]["title"], "T2");
    assert_eq!(body["book"]["pages"], 250);
    assert_eq!(body["book"]["genre"], "Essay");
}

#[tokio::test]
async fn test_update_conflict_leaves_row_unchanged() {
    let (_dir, app) = setup_app().await;
    add_db_book(&app, "X", "Row", 2010).await;
    add_db_book(&app, "Y", "Row", 2011).await;

    let books = db_books(&app).await;
    let x = books.iter().find(|b| b["author"] == "X").unwrap().clone();
    let id = x["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        post_json(
            &format!("/api/books/{}/update", id),
            &json!({"author": "Y", "title": "Row", "pages": 5, "year": 2011}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");

    let after = db_books(&app).await;
    let x_after = after.iter().find(|b| b["id"] == id).unwrap();
    assert_eq!(x_after, &x);
}

#[tokio::test]
async fn test_update_validation_and_missing() {
    let (_dir, app) = setup_app().await;
    add_db_book(&app, "A", "T", 2020).await;
    let id = db_books(&app).await[0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        post_json(
            &format!("/api/books/{}/update", id),
            &json!({"author": "", "title": "T", "pages": 1, "year": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, _) = send(
        &app,
        post_json(
            &format!("/api/books/{}/update", id),
            &json!({"author": "A", "title": "T", "pages": "many", "year": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_json = Request::builder()
        .method("POST")
        .uri(format!("/api/books/{}/update", id))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, bad_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Invalid JSON"));

    let (status, _) = send(
        &app,
        post_json(
            "/api/books/9999/update",
            &json!({"author": "A", "title": "T", "pages": 1, "year": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_id_is_json_error() {
    let (_dir, app) = setup_app().await;

    for uri in ["/api/books/abc/delete", "/api/books/abc/update"] {
        let (status, body) = send(
            &app,
            post_json(uri, &json!({"author": "A", "title": "T", "pages": 1, "year": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("abc"));
    }
}

#[tokio::test]
async fn test_index_served() {
    let (_dir, app) = setup_app().await;
    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/static/app.js")).await.unwrap();
    assert_eq!(
        response.headers()["content-type"],
        "application/javascript"
    );
}
