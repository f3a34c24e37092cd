//! OctoFit Dashboard - client-side data layer
//!
//! Fetches fitness-tracking collections (users, teams, activities, workouts,
//! leaderboard) from the REST API and prepares them for display:
//! - Envelope/array normalization with per-entity field aliases
//! - Stable multi-type sorting with per-view default directions
//! - Facet extraction and exact-match filtering
//! - Edit drafts and create forms reconciled against the server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Dashboard                 │
//! │     (one ViewController per entity)     │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┴───────────┐
//!      ▼                       ▼
//! ┌─────────────┐       ┌──────────────────┐
//! │ DataService │       │ EntityDescriptor │
//! │ (HTTP/Mock) │       │ normalize / sort │
//! │             │       │ facet / filter   │
//! └─────────────┘       └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use octofit_dashboard::{Dashboard, DashboardConfig, EntityKind, FilterValue};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DashboardConfig::with_base_url("http://localhost:8000");
//! let mut dashboard = Dashboard::connect(&config)?;
//! dashboard.load_all().await;
//!
//! let leaderboard = dashboard.view_mut(EntityKind::Leaderboard);
//! leaderboard.apply_filter(FilterValue::only("Blue"))?;
//! leaderboard.apply_sort("rank")?;
//! let snapshot = leaderboard.snapshot();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dashboard;
pub mod entity;
pub mod error;
pub mod facet;
pub mod filter;
pub mod normalize;
pub mod record;
pub mod service;
pub mod sort;
pub mod view;

// Re-export main types for convenience
pub use config::DashboardConfig;
pub use dashboard::Dashboard;
pub use entity::{EntityDescriptor, EntityKind};
pub use error::{ConfigError, ServiceError, ViewError};
pub use filter::{FilterSpec, FilterValue};
pub use record::Record;
pub use service::{DataService, HttpDataService, MockDataService};
pub use sort::{FieldKind, SortDirection, SortSpec};
pub use view::{ViewController, ViewSnapshot, ViewStatus};
