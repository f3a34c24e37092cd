//! Core trait for the remote data service.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ServiceResult;

/// Access to the REST data service.
///
/// Resources are the path segments under `/api/` (`users`, `teams`, ...).
/// Bodies and responses are raw JSON; shaping them into records is the
/// caller's job.
#[async_trait]
pub trait DataService: Send + Sync {
    /// `GET /api/<resource>/`
    async fn list(&self, resource: &str) -> ServiceResult<Value>;

    /// `POST /api/<resource>/` with a JSON body, returning the created record.
    async fn create(&self, resource: &str, body: Value) -> ServiceResult<Value>;

    /// `PUT /api/<resource>/<id>/` with a JSON body, returning the updated record.
    async fn update(&self, resource: &str, id: &str, body: Value) -> ServiceResult<Value>;
}
