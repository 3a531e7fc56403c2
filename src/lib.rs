// src/lib.rs
//! Client for the Foliofy portfolio tracker: session lifecycle against the
//! identity endpoints and a synced view of holdings and the dashboard.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod store;
pub mod sync;
pub mod view;
pub mod wire;

pub use api::ApiClient;
pub use auth::AuthApi;
pub use config::Config;
pub use error::{FolioError, Result};
pub use session::{Navigator, SessionManager, SessionStatus};
pub use sync::{DashboardSync, DashboardView, HoldingsSync};
