pub mod config;
pub mod database;
pub mod error;
pub mod init;
pub mod metrics;
pub mod models;
pub mod okr;
pub mod permissions;
pub mod services;

pub use error::{AppError, Result};
pub use okr::OkrService;
