//! Newsdesk - a small story publishing site
//!
//! Users author stories, file them under categories and mark them public or
//! private. Pages are server-rendered Tera templates served by axum, backed
//! by SQLite or MySQL through sqlx.

pub mod api;
pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod services;
pub mod templates;
