//! In-memory data service for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::traits::DataService;
use crate::error::{ServiceError, ServiceResult};
use crate::record::{is_present, value_text, Record, ID_KEYS};

/// A request received by [`MockDataService`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    List { resource: String },
    Create { resource: String, body: Value },
    Update { resource: String, id: String, body: Value },
}

/// Mock data service.
///
/// Serves configurable payloads per resource. Creates and updates are
/// applied to array payloads so a later `list` sees them, like a real
/// server would.
pub struct MockDataService {
    collections: Mutex<HashMap<String, Value>>,
    failing_lists: Mutex<HashSet<String>>,
    fail_mutations: AtomicBool,
    next_id: AtomicU64,
    calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockDataService {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            failing_lists: Mutex::new(HashSet::new()),
            fail_mutations: AtomicBool::new(false),
            next_id: AtomicU64::new(1000),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the payload returned for `resource`.
    pub fn with_collection(self, resource: &str, payload: Value) -> Self {
        self.set_collection(resource, payload);
        self
    }

    /// Make `list` on `resource` answer with a server error.
    pub fn with_failing_list(self, resource: &str) -> Self {
        self.set_list_failing(resource, true);
        self
    }

    /// Make every create/update answer with a server error.
    pub fn with_failing_mutations(self, failing: bool) -> Self {
        self.set_mutations_failing(failing);
        self
    }

    pub fn set_collection(&self, resource: &str, payload: Value) {
        lock(&self.collections).insert(resource.to_string(), payload);
    }

    pub fn set_list_failing(&self, resource: &str, failing: bool) {
        let mut failing_lists = lock(&self.failing_lists);
        if failing {
            failing_lists.insert(resource.to_string());
        } else {
            failing_lists.remove(resource);
        }
    }

    pub fn set_mutations_failing(&self, failing: bool) {
        self.fail_mutations.store(failing, Ordering::SeqCst);
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of create/update requests received.
    pub fn mutation_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| !matches!(c, MockCall::List { .. }))
            .count()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }

    fn check_mutation(&self) -> ServiceResult<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(ServiceError::Server {
                status: 500,
                message: "Mock mutation rejected".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MockDataService {
    fn default() -> Self {
        Self::new()
    }
}

/// Items of a stored payload, looking through an envelope.
fn items_mut(payload: &mut Value) -> Option<&mut Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get_mut("results").and_then(Value::as_array_mut),
        _ => None,
    }
}

/// Identifier of a stored item, `id` before `_id`.
fn item_identifier(item: &Value) -> Option<String> {
    ID_KEYS
        .iter()
        .filter_map(|key| item.get(*key))
        .find(|value| is_present(value))
        .and_then(value_text)
}

#[async_trait]
impl DataService for MockDataService {
    async fn list(&self, resource: &str) -> ServiceResult<Value> {
        self.record(MockCall::List {
            resource: resource.to_string(),
        });

        if lock(&self.failing_lists).contains(resource) {
            return Err(ServiceError::Server {
                status: 503,
                message: format!("Mock {} unavailable", resource),
            });
        }

        Ok(lock(&self.collections)
            .get(resource)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    async fn create(&self, resource: &str, body: Value) -> ServiceResult<Value> {
        self.record(MockCall::Create {
            resource: resource.to_string(),
            body: body.clone(),
        });
        self.check_mutation()?;

        let mut created = Record::from_value(body).ok_or_else(|| ServiceError::Server {
            status: 400,
            message: "Body must be an object".to_string(),
        })?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        created.insert("id", Value::from(id));
        let created = Value::from(created);

        let mut collections = lock(&self.collections);
        let payload = collections
            .entry(resource.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Some(items) = items_mut(payload) {
            items.push(created.clone());
        }

        Ok(created)
    }

    async fn update(&self, resource: &str, id: &str, body: Value) -> ServiceResult<Value> {
        self.record(MockCall::Update {
            resource: resource.to_string(),
            id: id.to_string(),
            body: body.clone(),
        });
        self.check_mutation()?;

        let fields = match body {
            Value::Object(map) => map,
            _ => {
                return Err(ServiceError::Server {
                    status: 400,
                    message: "Body must be an object".to_string(),
                })
            }
        };

        let mut collections = lock(&self.collections);
        let items = collections.get_mut(resource).and_then(items_mut);
        let slot = items.and_then(|items| {
            items
                .iter_mut()
                .find(|item| item_identifier(item).as_deref() == Some(id))
        });

        match slot {
            Some(item) => {
                let updated = Record::from_value(item.clone())
                    .unwrap_or_default()
                    .merged(&fields);
                *item = Value::from(updated);
                Ok(item.clone())
            }
            None => Err(ServiceError::Server {
                status: 404,
                message: format!("No {} with id {}", resource, id),
            }),
        }
    }
}
