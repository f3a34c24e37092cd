//! Dashboard: one view controller per entity kind.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::config::DashboardConfig;
use crate::entity::EntityKind;
use crate::error::{ServiceResult, ViewError};
use crate::service::{DataService, HttpDataService};
use crate::view::ViewController;

/// All five views sharing one data service.
///
/// Views share nothing but the service handle; a failure in one view's
/// fetch or mutation never touches another view's state.
pub struct Dashboard {
    views: BTreeMap<EntityKind, ViewController>,
}

impl Dashboard {
    pub fn new(service: Arc<dyn DataService>, config: &DashboardConfig) -> Self {
        let views = EntityKind::ALL
            .into_iter()
            .map(|kind| (kind, ViewController::new(kind, Arc::clone(&service), config)))
            .collect();
        Self { views }
    }

    /// Dashboard backed by the REST service at `config.base_url`.
    pub fn connect(config: &DashboardConfig) -> ServiceResult<Self> {
        let service = HttpDataService::new(config.clone())?;
        Ok(Self::new(Arc::new(service), config))
    }

    pub fn view(&self, kind: EntityKind) -> &ViewController {
        &self.views[&kind]
    }

    pub fn view_mut(&mut self, kind: EntityKind) -> &mut ViewController {
        self.views
            .get_mut(&kind)
            .unwrap_or_else(|| unreachable!("dashboard holds every entity kind"))
    }

    pub fn views(&self) -> impl Iterator<Item = &ViewController> {
        self.views.values()
    }

    /// Run every view's initial fetch concurrently on the current task.
    ///
    /// Returns the per-view errors; views that loaded are ready regardless.
    pub async fn load_all(&mut self) -> Vec<(EntityKind, ViewError)> {
        let pending: Vec<_> = self
            .views
            .values_mut()
            .map(|view| (view.kind(), view.begin_load()))
            .collect();

        let outcomes = join_all(
            pending
                .into_iter()
                .map(|(kind, load)| async move { (kind, load.run().await) }),
        )
        .await;

        let mut errors = Vec::new();
        for (kind, outcome) in outcomes {
            if let Err(e) = self.view_mut(kind).finish_load(outcome) {
                errors.push((kind, e));
            }
        }

        if errors.is_empty() {
            info!("All views loaded");
        } else {
            warn!(failed = errors.len(), "Some views failed to load");
        }
        errors
    }
}
