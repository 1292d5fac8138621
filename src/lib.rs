pub mod catalog;
pub mod config;
pub mod detail;
pub mod error;
pub mod favorites;
pub mod images;
pub mod list;
pub mod retry;
pub mod tmdb;
