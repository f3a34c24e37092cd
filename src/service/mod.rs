//! Remote data service abstraction.
//!
//! The REST API is consumed through the [`DataService`] trait:
//! - [`HttpDataService`] talks to the real server over reqwest
//! - [`MockDataService`] serves canned payloads for tests and demos

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpDataService;
pub use mock::{MockCall, MockDataService};
pub use traits::DataService;
