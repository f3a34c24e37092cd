//! View controller.
//!
//! One [`ViewController`] per dashboard view owns that view's session state:
//! the sorted collection, the facet options, the active sort and filter,
//! the load status and at most one open edit draft or create form. The
//! displayed list is always `filter(sort(normalize(response)))`.
//!
//! ```text
//!  list() ──► normalize ──► sort ──► facets
//!                            │
//!                            ▼
//!                          filter ──► displayed
//!
//!  apply_sort   re-runs sort + filter
//!  apply_filter re-runs filter
//!  save_edit    update() then merge + sort + filter
//!  create_entity create() then a fresh list()
//! ```
//!
//! Sorting and filtering are synchronous and never touch the network.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::entity::{EntityDescriptor, EntityKind};
use crate::error::{Result, ServiceResult, ViewError};
use crate::facet::extract_facets;
use crate::filter::{apply_filter, FilterSpec, FilterValue};
use crate::normalize::normalize_with;
use crate::record::Record;
use crate::service::DataService;
use crate::sort::{sort_records, SortSpec};

/// Lifecycle of a view's primary fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Inline message shown in an edit or create form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormMessage {
    pub kind: MessageKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
    Error,
}

impl FormMessage {
    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum EditPhase {
    Editing,
    Saved { at: Instant },
    Failed { message: String },
}

/// Shadow copy of one record's editable fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EditDraft {
    record_id: String,
    fields: Map<String, Value>,
    phase: EditPhase,
}

impl EditDraft {
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_saved(&self) -> bool {
        matches!(self.phase, EditPhase::Saved { .. })
    }

    fn message(&self, noun: &str) -> Option<FormMessage> {
        match &self.phase {
            EditPhase::Editing => None,
            EditPhase::Saved { .. } => {
                Some(FormMessage::success(format!("{} updated successfully!", noun)))
            }
            EditPhase::Failed { message } => Some(FormMessage::error(message.clone())),
        }
    }
}

/// Fields of an open create form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateForm {
    fields: Map<String, Value>,
    error: Option<String>,
}

impl CreateForm {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Serializable state of an open form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSnapshot {
    pub record_id: Option<String>,
    pub fields: Map<String, Value>,
    pub message: Option<FormMessage>,
}

/// Read-only state handed to the presentation shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub entity: EntityKind,
    pub status: ViewStatus,
    pub error_message: Option<String>,
    pub displayed_records: Vec<Record>,
    pub facet_options: Vec<Value>,
    pub active_sort: Option<SortSpec>,
    pub active_filter: Option<FilterSpec>,
    pub edit_draft: Option<FormSnapshot>,
    pub create_form: Option<FormSnapshot>,
}

/// A fetch started by [`ViewController::begin_load`].
///
/// It holds no borrow of the controller, so the shell can drive it on its
/// own schedule and hand the outcome back with
/// [`ViewController::finish_load`].
pub struct PendingLoad {
    ticket: u64,
    resource: &'static str,
    service: Arc<dyn DataService>,
}

impl PendingLoad {
    pub async fn run(self) -> LoadOutcome {
        let result = self.service.list(self.resource).await;
        LoadOutcome {
            ticket: self.ticket,
            result,
        }
    }
}

/// Result of a [`PendingLoad`].
pub struct LoadOutcome {
    ticket: u64,
    result: ServiceResult<Value>,
}

/// Session state and operations for one entity view.
pub struct ViewController {
    descriptor: &'static EntityDescriptor,
    service: Arc<dyn DataService>,
    confirmation: Duration,
    status: ViewStatus,
    error_message: Option<String>,
    /// Sorted, unfiltered
    collection: Vec<Record>,
    facets: Vec<Value>,
    sort: Option<SortSpec>,
    filter: FilterValue,
    displayed: Vec<Record>,
    edit: Option<EditDraft>,
    create_form: Option<CreateForm>,
    load_ticket: u64,
}

impl ViewController {
    pub fn new(kind: EntityKind, service: Arc<dyn DataService>, config: &DashboardConfig) -> Self {
        Self {
            descriptor: kind.descriptor(),
            service,
            confirmation: config.confirmation(),
            status: ViewStatus::Idle,
            error_message: None,
            collection: Vec::new(),
            facets: Vec::new(),
            sort: None,
            filter: FilterValue::All,
            displayed: Vec::new(),
            edit: None,
            create_form: None,
            load_ticket: 0,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.descriptor.kind
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    pub fn status(&self) -> ViewStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Sorted, unfiltered collection.
    pub fn collection(&self) -> &[Record] {
        &self.collection
    }

    pub fn displayed(&self) -> &[Record] {
        &self.displayed
    }

    pub fn facets(&self) -> &[Value] {
        &self.facets
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn filter(&self) -> &FilterValue {
        &self.filter
    }

    pub fn edit_draft(&self) -> Option<&EditDraft> {
        self.edit.as_ref()
    }

    pub fn create_form(&self) -> Option<&CreateForm> {
        self.create_form.as_ref()
    }

    // ==================== Loading ====================

    /// Fetch, normalize, sort and filter the collection.
    pub async fn load(&mut self) -> Result<()> {
        let pending = self.begin_load();
        let outcome = pending.run().await;
        self.finish_load(outcome)
    }

    /// Enter the loading state and hand out the fetch to run.
    pub fn begin_load(&mut self) -> PendingLoad {
        self.load_ticket += 1;
        self.status = ViewStatus::Loading;
        self.error_message = None;
        info!(entity = %self.kind(), resource = self.descriptor.resource, "Loading collection");

        PendingLoad {
            ticket: self.load_ticket,
            resource: self.descriptor.resource,
            service: Arc::clone(&self.service),
        }
    }

    /// Apply a fetch outcome. Outcomes of superseded loads are discarded.
    pub fn finish_load(&mut self, outcome: LoadOutcome) -> Result<()> {
        if outcome.ticket != self.load_ticket {
            debug!(entity = %self.kind(), ticket = outcome.ticket, "Discarding stale load result");
            return Ok(());
        }

        match outcome.result {
            Ok(raw) => {
                let records = normalize_with(raw, self.descriptor.aliases);
                info!(entity = %self.kind(), count = records.len(), "Collection loaded");

                if self.sort.is_none() {
                    self.sort = self
                        .descriptor
                        .default_sort
                        .map(|key| SortSpec::new(key, self.descriptor.default_direction));
                }
                self.collection = self.sorted(&records);
                self.facets = self.derive_facets();
                self.refilter();
                self.status = ViewStatus::Ready;
                Ok(())
            }
            Err(source) => {
                warn!(entity = %self.kind(), error = %source, "Failed to load collection");
                self.status = ViewStatus::Failed;
                self.error_message = Some(source.to_string());
                Err(ViewError::Fetch {
                    entity: self.descriptor.resource,
                    source,
                })
            }
        }
    }

    // ==================== Sort / Filter ====================

    /// Activate the sort column `key`: flip direction if it is already
    /// active, otherwise start at the view's default direction.
    pub fn apply_sort(&mut self, key: &str) -> Result<()> {
        if self.descriptor.sort_column(key).is_none() {
            return Err(ViewError::UnknownSortKey(key.to_string()));
        }

        let spec = SortSpec::next(self.sort.as_ref(), key, self.descriptor.default_direction);
        debug!(entity = %self.kind(), key, direction = ?spec.direction, "Sorting");
        self.sort = Some(spec);
        self.collection = self.sorted(&self.collection);
        self.refilter();
        Ok(())
    }

    pub fn apply_filter(&mut self, value: FilterValue) -> Result<()> {
        let field = self
            .descriptor
            .facet_field
            .ok_or(ViewError::NoFacet(self.descriptor.resource))?;

        debug!(entity = %self.kind(), field, value = ?value, "Filtering");
        self.filter = value;
        self.refilter();
        Ok(())
    }

    fn sorted(&self, records: &[Record]) -> Vec<Record> {
        let spec = match &self.sort {
            Some(spec) => spec,
            None => return records.to_vec(),
        };
        match self.descriptor.sort_column(&spec.key) {
            Some(column) => sort_records(records, column.key, column.kind, spec.direction),
            None => records.to_vec(),
        }
    }

    fn derive_facets(&self) -> Vec<Value> {
        self.descriptor
            .facet_field
            .map(|field| extract_facets(&self.collection, field))
            .unwrap_or_default()
    }

    fn refilter(&mut self) {
        self.displayed = match self.descriptor.facet_field {
            Some(field) => apply_filter(&self.collection, field, &self.filter),
            None => self.collection.clone(),
        };
    }

    // ==================== Editing ====================

    /// Open an edit draft for `record`, replacing any draft already open.
    pub fn begin_edit(&mut self, record: &Record) -> Result<()> {
        if !self.descriptor.is_editable() {
            return Err(ViewError::NotEditable(self.descriptor.noun));
        }
        let record_id = record.identifier().ok_or(ViewError::MissingIdentifier)?;

        let fields = self
            .descriptor
            .editable_fields
            .iter()
            .map(|f| (f.to_string(), Value::String(record.text(f).unwrap_or_default())))
            .collect();

        debug!(entity = %self.kind(), %record_id, "Opening edit draft");
        self.edit = Some(EditDraft {
            record_id,
            fields,
            phase: EditPhase::Editing,
        });
        Ok(())
    }

    /// Change one field of the open draft. Clears a previous error.
    pub fn edit_field(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        if !self.descriptor.editable_fields.contains(&field) {
            return Err(ViewError::NotEditable(self.descriptor.noun));
        }
        let draft = self.edit.as_mut().ok_or(ViewError::NoEditOpen)?;
        draft.fields.insert(field.to_string(), value.into());
        draft.phase = EditPhase::Editing;
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    /// Send the open draft to the server and merge it into the collection.
    ///
    /// On success the draft stays open in the saved phase until
    /// [`expire_confirmation`](Self::expire_confirmation) closes it. On
    /// failure the draft stays open with an error message and the
    /// collection is untouched.
    pub async fn save_edit(&mut self) -> Result<()> {
        let draft = self.edit.as_ref().ok_or(ViewError::NoEditOpen)?;
        let record_id = draft.record_id.clone();
        let fields = draft.fields.clone();
        let resource = self.descriptor.resource;

        info!(entity = %self.kind(), %record_id, "Updating record");
        let result = self
            .service
            .update(resource, &record_id, Value::Object(fields.clone()))
            .await;

        match result {
            Ok(_) => {
                let merged: Vec<Record> = self
                    .collection
                    .iter()
                    .map(|r| {
                        if r.identifier().as_deref() == Some(record_id.as_str()) {
                            r.merged(&fields)
                        } else {
                            r.clone()
                        }
                    })
                    .collect();
                self.collection = self.sorted(&merged);
                self.facets = self.derive_facets();
                self.refilter();

                if let Some(draft) = self.edit.as_mut() {
                    draft.phase = EditPhase::Saved { at: Instant::now() };
                }
                info!(entity = %self.kind(), %record_id, "Record updated");
                Ok(())
            }
            Err(source) => {
                warn!(entity = %self.kind(), %record_id, error = %source, "Update failed");
                if let Some(draft) = self.edit.as_mut() {
                    draft.phase = EditPhase::Failed {
                        message: format!(
                            "Error updating {}. Please try again.",
                            self.descriptor.noun.to_lowercase()
                        ),
                    };
                }
                Err(ViewError::Mutation {
                    entity: resource,
                    source,
                })
            }
        }
    }

    /// When the saved draft's confirmation has been visible long enough.
    pub fn confirmation_deadline(&self) -> Option<Instant> {
        match self.edit.as_ref().map(|d| &d.phase) {
            Some(EditPhase::Saved { at }) => Some(*at + self.confirmation),
            _ => None,
        }
    }

    /// Close a saved draft once its confirmation has expired at `now`.
    /// Returns whether the draft was closed.
    pub fn expire_confirmation(&mut self, now: Instant) -> bool {
        match self.confirmation_deadline() {
            Some(deadline) if now >= deadline => {
                self.edit = None;
                true
            }
            _ => false,
        }
    }

    // ==================== Creating ====================

    pub fn open_create_form(&mut self) -> Result<()> {
        let spec = self
            .descriptor
            .create
            .ok_or(ViewError::NotCreatable(self.descriptor.noun))?;

        let fields = spec
            .fields
            .iter()
            .map(|f| (f.to_string(), Value::String(String::new())))
            .collect();
        self.create_form = Some(CreateForm {
            fields,
            error: None,
        });
        Ok(())
    }

    pub fn edit_create_field(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let spec = self
            .descriptor
            .create
            .ok_or(ViewError::NotCreatable(self.descriptor.noun))?;
        if !spec.fields.contains(&field) {
            return Err(ViewError::NotCreatable(self.descriptor.noun));
        }
        let form = self.create_form.as_mut().ok_or(ViewError::NoCreateForm)?;
        form.fields.insert(field.to_string(), value.into());
        form.error = None;
        Ok(())
    }

    pub fn cancel_create(&mut self) {
        self.create_form = None;
    }

    /// Validate and submit the create form, then refetch the collection.
    ///
    /// An empty required field fails locally without a request. A rejected
    /// request keeps the form open with its error.
    pub async fn create_entity(&mut self) -> Result<()> {
        let spec = self
            .descriptor
            .create
            .ok_or(ViewError::NotCreatable(self.descriptor.noun))?;
        let noun = self.descriptor.noun;
        let resource = self.descriptor.resource;
        let form = self.create_form.as_mut().ok_or(ViewError::NoCreateForm)?;

        let text = |field: &str| -> String {
            form.fields
                .get(field)
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        if let Some(missing) = spec.required.iter().find(|f| text(**f).is_empty()) {
            let message = format!("{} {} is required", noun, missing);
            warn!(entity = resource, field = *missing, "Create rejected by validation");
            form.error = Some(message.clone());
            return Err(ViewError::Validation {
                field: missing.to_string(),
                message,
            });
        }

        let mut body = Map::new();
        for &field in spec.fields {
            body.insert(field.to_string(), Value::String(text(field)));
        }
        for &field in spec.empty_collections {
            body.insert(field.to_string(), Value::Array(Vec::new()));
        }

        info!(entity = resource, "Creating record");
        match self.service.create(resource, Value::Object(body)).await {
            Ok(created) => {
                info!(
                    entity = resource,
                    id = ?Record::from_value(created).and_then(|r| r.identifier()),
                    "Record created"
                );
                self.create_form = None;
                self.load().await
            }
            Err(source) => {
                warn!(entity = resource, error = %source, "Create failed");
                if let Some(form) = self.create_form.as_mut() {
                    form.error = Some(format!("Error creating {}: {}", noun.to_lowercase(), source));
                }
                Err(ViewError::Mutation {
                    entity: resource,
                    source,
                })
            }
        }
    }

    // ==================== Snapshot ====================

    pub fn snapshot(&self) -> ViewSnapshot {
        let noun = self.descriptor.noun;
        ViewSnapshot {
            entity: self.kind(),
            status: self.status,
            error_message: self.error_message.clone(),
            displayed_records: self.displayed.clone(),
            facet_options: self.facets.clone(),
            active_sort: self.sort.clone(),
            active_filter: self.descriptor.facet_field.map(|key| FilterSpec {
                key: key.to_string(),
                value: self.filter.clone(),
            }),
            edit_draft: self.edit.as_ref().map(|d| FormSnapshot {
                record_id: Some(d.record_id.clone()),
                fields: d.fields.clone(),
                message: d.message(noun),
            }),
            create_form: self.create_form.as_ref().map(|f| FormSnapshot {
                record_id: None,
                fields: f.fields.clone(),
                message: f.error.clone().map(FormMessage::error),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;
    use crate::service::{MockCall, MockDataService};
    use crate::sort::SortDirection;
    use serde_json::json;

    fn controller(kind: EntityKind, service: &Arc<MockDataService>) -> ViewController {
        let service: Arc<dyn DataService> = service.clone();
        ViewController::new(kind, service, &DashboardConfig::default())
    }

    fn field(records: &[Record], name: &str) -> Vec<String> {
        records.iter().map(|r| r.text(name).unwrap_or_default()).collect()
    }

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        let service = Arc::new(MockDataService::new());
        let view = controller(EntityKind::Users, &service);
        assert_eq!(view.status(), ViewStatus::Idle);
        assert!(view.displayed().is_empty());
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_sort_toggles_from_unsorted() {
        let service = Arc::new(MockDataService::new().with_collection(
            "workouts",
            json!([{"name": "Bea", "duration": 10}, {"name": "Al", "duration": 20}]),
        ));
        let mut view = controller(EntityKind::Workouts, &service);
        view.load().await.unwrap();

        assert!(view.sort().is_none());
        assert_eq!(field(view.displayed(), "name"), vec!["Bea", "Al"]);

        view.apply_sort("name").unwrap();
        assert_eq!(view.sort().unwrap().direction, SortDirection::Ascending);
        assert_eq!(field(view.displayed(), "name"), vec!["Al", "Bea"]);

        view.apply_sort("name").unwrap();
        assert_eq!(view.sort().unwrap().direction, SortDirection::Descending);
        assert_eq!(field(view.displayed(), "name"), vec!["Bea", "Al"]);

        view.apply_sort("duration").unwrap();
        assert_eq!(
            view.sort(),
            Some(&SortSpec::new("duration", SortDirection::Ascending))
        );
        assert_eq!(field(view.displayed(), "name"), vec!["Bea", "Al"]);
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn test_leaderboard_default_sort_and_filter() {
        let service = Arc::new(MockDataService::new().with_collection(
            "leaderboard",
            json!([
                {"team": "Red", "total_calories": 500},
                {"team": "Blue", "total_calories": 900}
            ]),
        ));
        let mut view = controller(EntityKind::Leaderboard, &service);
        view.load().await.unwrap();

        assert_eq!(
            view.sort(),
            Some(&SortSpec::new("total_calories", SortDirection::Descending))
        );
        assert_eq!(field(view.displayed(), "team"), vec!["Blue", "Red"]);

        view.apply_filter(FilterValue::only("Red")).unwrap();
        assert_eq!(field(view.displayed(), "team"), vec!["Red"]);
        assert_eq!(view.facets(), &[json!("Blue"), json!("Red")]);

        view.apply_sort("total_calories").unwrap();
        assert_eq!(field(view.displayed(), "team"), vec!["Red"]);
        assert_eq!(field(view.collection(), "team"), vec!["Red", "Blue"]);
        assert_eq!(view.facets(), &[json!("Blue"), json!("Red")]);

        view.apply_filter(FilterValue::All).unwrap();
        assert_eq!(view.displayed(), view.collection());
    }

    #[tokio::test]
    async fn test_leaderboard_total_points_fallback() {
        let service = Arc::new(MockDataService::new().with_collection(
            "leaderboard",
            json!({"results": [
                {"_id": "a", "user": "sam", "total_points": 300},
                {"_id": "b", "user_name": "kim", "total_calories": 700, "total_points": 10}
            ]}),
        ));
        let mut view = controller(EntityKind::Leaderboard, &service);
        view.load().await.unwrap();

        assert_eq!(field(view.displayed(), "user_name"), vec!["kim", "sam"]);
        assert_eq!(view.displayed()[1].raw("total_points"), Some(&json!(300)));
        assert_eq!(view.displayed()[1].identifier().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_activities_default_date_desc() {
        let service = Arc::new(MockDataService::new().with_collection(
            "activities",
            json!([
                {"id": 1, "activity_type": "Run", "date": "2025-01-02"},
                {"id": 2, "activity_type": "Swim", "date": "2025-03-04"},
                {"id": 3, "activity_type": "Run", "date": "garbage"}
            ]),
        ));
        let mut view = controller(EntityKind::Activities, &service);
        view.load().await.unwrap();

        let ids: Vec<_> = view.displayed().iter().filter_map(|r| r.identifier()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
        assert_eq!(view.facets(), &[json!("Swim"), json!("Run")]);

        view.apply_sort("date").unwrap();
        let ids: Vec<_> = view.displayed().iter().filter_map(|r| r.identifier()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn test_unknown_sort_and_missing_facet() {
        let service = Arc::new(MockDataService::new());
        let mut view = controller(EntityKind::Teams, &service);
        view.load().await.unwrap();

        assert!(matches!(
            view.apply_sort("password"),
            Err(ViewError::UnknownSortKey(_))
        ));
        assert!(matches!(
            view.apply_filter(FilterValue::only("x")),
            Err(ViewError::NoFacet(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure() {
        let service = Arc::new(MockDataService::new().with_failing_list("users"));
        let mut view = controller(EntityKind::Users, &service);

        let result = view.load().await;
        assert!(matches!(result, Err(ViewError::Fetch { .. })));
        assert_eq!(view.status(), ViewStatus::Failed);
        assert!(view.error_message().unwrap().contains("503"));
        assert_eq!(service.call_count(), 1);

        service.set_list_failing("users", false);
        view.load().await.unwrap();
        assert_eq!(view.status(), ViewStatus::Ready);
        assert!(view.error_message().is_none());
    }

    #[tokio::test]
    async fn test_malformed_shape_is_empty_ready() {
        let service =
            Arc::new(MockDataService::new().with_collection("teams", json!("not a collection")));
        let mut view = controller(EntityKind::Teams, &service);
        view.load().await.unwrap();
        assert_eq!(view.status(), ViewStatus::Ready);
        assert!(view.displayed().is_empty());
    }

    #[tokio::test]
    async fn test_stale_load_is_discarded() {
        let service = Arc::new(
            MockDataService::new().with_collection("users", json!([{"id": 1, "name": "first"}])),
        );
        let mut view = controller(EntityKind::Users, &service);

        let stale = view.begin_load().run().await;
        service.set_collection("users", json!([{"id": 2, "name": "second"}]));
        let fresh = view.begin_load().run().await;

        view.finish_load(fresh).unwrap();
        view.finish_load(stale).unwrap();
        assert_eq!(field(view.displayed(), "name"), vec!["second"]);
    }

    #[tokio::test]
    async fn test_reload_keeps_sort_and_filter() {
        let service = Arc::new(MockDataService::new().with_collection(
            "users",
            json!([
                {"id": 1, "name": "Al", "team": "Red"},
                {"id": 2, "name": "Bea", "team": "Blue"},
                {"id": 3, "name": "Cy", "team": "Red"}
            ]),
        ));
        let mut view = controller(EntityKind::Users, &service);
        view.load().await.unwrap();
        view.apply_sort("name").unwrap();
        view.apply_filter(FilterValue::only("Red")).unwrap();

        view.load().await.unwrap();
        assert_eq!(view.sort().unwrap().direction, SortDirection::Descending);
        assert_eq!(field(view.displayed(), "name"), vec!["Cy", "Al"]);
    }

    #[tokio::test]
    async fn test_save_edit_merges_fields() {
        let service = Arc::new(MockDataService::new().with_collection(
            "users",
            json!([{"id": 1, "name": "Old", "email": "x@y.com"}]),
        ));
        let mut view = controller(EntityKind::Users, &service);
        view.load().await.unwrap();

        let target = view.displayed()[0].clone();
        view.begin_edit(&target).unwrap();
        assert_eq!(view.edit_draft().unwrap().fields()["team"], json!(""));

        view.edit_field("name", "New Name").unwrap();
        view.save_edit().await.unwrap();

        let updated = &view.collection()[0];
        assert_eq!(updated.text("name").as_deref(), Some("New Name"));
        assert_eq!(updated.text("email").as_deref(), Some("x@y.com"));
        assert_eq!(updated.identifier().as_deref(), Some("1"));

        let draft = view.edit_draft().unwrap();
        assert!(draft.is_saved());
        let message = view.snapshot().edit_draft.unwrap().message.unwrap();
        assert_eq!(message.kind, MessageKind::Success);
        assert_eq!(message.text, "User updated successfully!");

        assert!(matches!(
            service.calls().last(),
            Some(MockCall::Update { id, .. }) if id == "1"
        ));
    }

    #[tokio::test]
    async fn test_save_edit_only_touches_edited_fields() {
        let service = Arc::new(MockDataService::new().with_collection(
            "users",
            json!([{"id": 1, "name": "Old", "email": "x@y.com"}]),
        ));
        let mut view = controller(EntityKind::Users, &service);
        view.load().await.unwrap();

        let mut draft = Map::new();
        draft.insert("name".into(), json!("New Name"));
        let merged = view.collection()[0].merged(&draft);
        assert_eq!(
            merged,
            record(json!({"id": 1, "name": "New Name", "email": "x@y.com"}))
        );
    }

    #[tokio::test]
    async fn test_save_failure_keeps_draft_and_collection() {
        let service = Arc::new(
            MockDataService::new()
                .with_collection("users", json!([{"_id": "u1", "name": "Old"}]))
                .with_failing_mutations(true),
        );
        let mut view = controller(EntityKind::Users, &service);
        view.load().await.unwrap();

        let target = view.displayed()[0].clone();
        view.begin_edit(&target).unwrap();
        view.edit_field("name", "New").unwrap();

        let result = view.save_edit().await;
        assert!(matches!(result, Err(ViewError::Mutation { .. })));
        assert_eq!(view.collection()[0].text("name").as_deref(), Some("Old"));

        let snapshot = view.snapshot();
        let draft = snapshot.edit_draft.unwrap();
        assert_eq!(draft.fields["name"], json!("New"));
        assert_eq!(
            draft.message.unwrap().text,
            "Error updating user. Please try again."
        );

        service.set_mutations_failing(false);
        view.save_edit().await.unwrap();
        assert_eq!(view.collection()[0].text("name").as_deref(), Some("New"));
    }

    #[tokio::test]
    async fn test_edit_updates_facets_and_filter() {
        let service = Arc::new(MockDataService::new().with_collection(
            "users",
            json!([
                {"id": 1, "name": "Al", "team": "Red"},
                {"id": 2, "name": "Bea", "team": "Blue"}
            ]),
        ));
        let mut view = controller(EntityKind::Users, &service);
        view.load().await.unwrap();
        view.apply_filter(FilterValue::only("Red")).unwrap();

        let target = view.displayed()[0].clone();
        view.begin_edit(&target).unwrap();
        view.edit_field("team", "Green").unwrap();
        view.save_edit().await.unwrap();

        assert!(view.displayed().is_empty());
        assert_eq!(view.facets(), &[json!("Green"), json!("Blue")]);
    }

    #[tokio::test]
    async fn test_confirmation_expiry() {
        let service =
            Arc::new(MockDataService::new().with_collection("users", json!([{"id": 1, "name": "A"}])));
        let mut view = controller(EntityKind::Users, &service);
        view.load().await.unwrap();

        let target = view.displayed()[0].clone();
        view.begin_edit(&target).unwrap();
        assert!(view.confirmation_deadline().is_none());
        assert!(!view.expire_confirmation(Instant::now()));

        view.save_edit().await.unwrap();
        let deadline = view.confirmation_deadline().unwrap();

        assert!(!view.expire_confirmation(deadline - Duration::from_millis(1)));
        assert!(view.edit_draft().is_some());
        assert!(view.expire_confirmation(deadline));
        assert!(view.edit_draft().is_none());
    }

    #[tokio::test]
    async fn test_edit_preconditions() {
        let service = Arc::new(MockDataService::new());
        let mut users = controller(EntityKind::Users, &service);
        let mut teams = controller(EntityKind::Teams, &service);

        assert!(matches!(
            users.begin_edit(&record(json!({"name": "no id"}))),
            Err(ViewError::MissingIdentifier)
        ));
        assert!(matches!(
            users.edit_field("name", "x"),
            Err(ViewError::NoEditOpen)
        ));
        assert!(matches!(users.save_edit().await, Err(ViewError::NoEditOpen)));
        assert!(matches!(
            teams.begin_edit(&record(json!({"id": 1}))),
            Err(ViewError::NotEditable(_))
        ));

        users.begin_edit(&record(json!({"id": 1}))).unwrap();
        assert!(matches!(
            users.edit_field("id", "2"),
            Err(ViewError::NotEditable(_))
        ));
        users.begin_edit(&record(json!({"id": 2}))).unwrap();
        assert_eq!(users.edit_draft().unwrap().record_id(), "2");
        users.cancel_edit();
        assert!(users.edit_draft().is_none());
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let service = Arc::new(MockDataService::new());
        let mut view = controller(EntityKind::Teams, &service);

        view.open_create_form().unwrap();
        view.edit_create_field("name", "   ").unwrap();
        view.edit_create_field("description", "d").unwrap();

        let result = view.create_entity().await;
        assert!(matches!(
            result,
            Err(ViewError::Validation { ref field, .. }) if field == "name"
        ));
        assert!(result.unwrap_err().is_validation());
        assert_eq!(service.call_count(), 0);
        assert_eq!(view.create_form().unwrap().error(), Some("Team name is required"));
    }

    #[tokio::test]
    async fn test_create_posts_and_refetches() {
        let service = Arc::new(
            MockDataService::new().with_collection("teams", json!([{"id": 1, "name": "Zeta"}])),
        );
        let mut view = controller(EntityKind::Teams, &service);
        view.load().await.unwrap();

        view.open_create_form().unwrap();
        view.edit_create_field("name", "Alpha").unwrap();
        view.create_entity().await.unwrap();

        assert!(view.create_form().is_none());
        assert_eq!(field(view.displayed(), "name"), vec!["Alpha", "Zeta"]);
        assert_eq!(view.displayed()[0].identifier().as_deref(), Some("1000"));

        let calls = service.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[1],
            MockCall::Create {
                resource: "teams".into(),
                body: json!({"name": "Alpha", "description": "", "members": []}),
            }
        );
        assert_eq!(
            calls[2],
            MockCall::List {
                resource: "teams".into()
            }
        );
    }

    #[tokio::test]
    async fn test_create_failure_keeps_form() {
        let service = Arc::new(MockDataService::new().with_failing_mutations(true));
        let mut view = controller(EntityKind::Teams, &service);

        view.open_create_form().unwrap();
        view.edit_create_field("name", "Alpha").unwrap();
        let result = view.create_entity().await;

        assert!(matches!(result, Err(ViewError::Mutation { .. })));
        let form = view.create_form().unwrap();
        assert_eq!(form.fields()["name"], json!("Alpha"));
        assert!(form.error().unwrap().starts_with("Error creating team"));
    }

    #[tokio::test]
    async fn test_create_not_supported_elsewhere() {
        let service = Arc::new(MockDataService::new());
        let mut view = controller(EntityKind::Users, &service);
        assert!(matches!(
            view.open_create_form(),
            Err(ViewError::NotCreatable(_))
        ));
        assert!(matches!(
            view.create_entity().await,
            Err(ViewError::NotCreatable(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_shape() {
        let service = Arc::new(
            MockDataService::new().with_collection("users", json!([{"id": 1, "team": "Red"}])),
        );
        let mut view = controller(EntityKind::Users, &service);
        view.load().await.unwrap();

        let snapshot = serde_json::to_value(view.snapshot()).unwrap();
        assert_eq!(snapshot["entity"], json!("users"));
        assert_eq!(snapshot["status"], json!("ready"));
        assert_eq!(snapshot["facet_options"], json!(["Red"]));
        assert_eq!(
            snapshot["active_sort"],
            json!({"key": "name", "direction": "ascending"})
        );
        assert_eq!(
            snapshot["active_filter"],
            json!({"key": "team", "value": {"type": "all"}})
        );
        assert_eq!(snapshot["edit_draft"], json!(null));
    }
}
