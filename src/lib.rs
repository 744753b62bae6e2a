pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod logging;
pub mod report;
pub mod server;
pub mod widget;
