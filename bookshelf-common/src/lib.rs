//! # Bookshelf Common Library
//!
//! Shared code for the bookshelf catalog service:
//! - Book schema registry and record model
//! - Form construction and validation (book form, upload form)
//! - Persistence sinks (shared JSON file, SQLite table)
//! - JSON import pipeline for uploaded artifacts
//! - Configuration loading and database initialization

pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod import;
pub mod models;
pub mod schema;
pub mod sink;
pub mod storage;
pub mod upload;

pub use error::{Error, Result};
pub use models::{Book, BookRecord};
