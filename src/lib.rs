pub mod config;
pub mod engine;
pub mod extract;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod policy;
pub mod scheduler;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use engine::TrackerEngine;
pub use extract::{ExtractError, PriceExtractor, SiteRegistry};
pub use models::TrackedItem;
pub use monitor::CycleSummary;
pub use notify::{Notifier, PriceAlert};
pub use policy::AlertDecision;
pub use store::SqliteStore;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
