//! FoodScout console application: configuration, logging and the main loop.
mod app;
mod cli;
pub mod commands;
pub mod config;
pub mod effects;
pub mod logging;
pub mod render;

pub use app::{build_pipeline, run_app, App, AppInput, Flow};
pub use cli::Cli;
