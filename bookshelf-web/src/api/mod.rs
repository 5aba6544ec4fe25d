//! HTTP API handlers for bookshelf-web

pub mod books;
pub mod files;
pub mod health;
pub mod ui;

pub use books::{add_book, delete_book, get_form, list_books, search_books, update_book};
pub use files::{list_files, upload_json, view_file};
pub use health::health_routes;
pub use ui::{serve_app_js, serve_index};
