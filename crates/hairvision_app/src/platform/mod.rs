mod app;
mod config;
mod effects;
mod history;
mod logging;
mod render;
mod signals;

pub use app::run_app;
