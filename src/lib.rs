//! proxy-catalog — harvests proxies from public sources, validates them, and serves
//! the results over a REST API with a background scheduler and webhook fan-out.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use proxy_catalog::config::Settings;
//! use proxy_catalog::state::AppState;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load()?;
//!     let state = AppState::new(settings)?;
//!     println!("catalog ready with {} proxies", state.catalog.len());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod api;
pub mod argument;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod jobs;
pub mod models;
pub mod ops;
pub mod proxy_line;
pub mod scheduler;
pub mod state;
pub mod utils;
pub mod validator;
pub mod webhooks;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
