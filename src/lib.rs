#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod avatar;
pub mod compose;
pub mod config;
pub mod dedup;
pub mod feed;
pub mod linkify;
pub mod poller;
pub mod post;
pub mod service;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
