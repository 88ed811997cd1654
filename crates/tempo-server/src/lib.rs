//! # tempo-server
//!
//! Admission API and background pipeline host, built on Axum.

pub mod app;
pub mod background;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod shutdown;
pub mod state;

pub use app::App;
pub use background::{init_background_tasks, PipelineTasks};
pub use state::AppState;
