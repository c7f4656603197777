// Common test fixtures: a controller wired to the in-memory API and view model
#![allow(dead_code)]

use cactus_client::mock::MockInstanceApi;
use cactus_common::Instance;
use cactus_panel::view_model::ViewModel;
use cactus_panel::{InstancePanelController, PanelSettings};
use std::sync::Arc;
use std::time::Duration;

pub const POLL: Duration = Duration::from_millis(5000);

pub struct Harness {
    pub api: Arc<MockInstanceApi>,
    pub model: Arc<ViewModel>,
    pub controller: InstancePanelController,
}

pub fn instance(id: &str, ip: &str) -> Instance {
    Instance {
        id: id.to_string(),
        name: format!("hub-{}", id),
        public_ip: ip.to_string(),
    }
}

pub fn harness(instances: Vec<Instance>) -> Harness {
    harness_with_model(instances, ViewModel::new())
}

pub fn harness_with_model(instances: Vec<Instance>, model: Arc<ViewModel>) -> Harness {
    let api = Arc::new(MockInstanceApi::with_instances(instances));
    let controller =
        InstancePanelController::new(api.clone(), model.surfaces(), &PanelSettings::default());
    Harness {
        api,
        model,
        controller,
    }
}

/// Let spawned tasks run. Under a paused clock this also advances time by `d`.
pub async fn advance(d: Duration) {
    tokio::time::sleep(d).await;
}

pub async fn settle() {
    advance(Duration::from_millis(1)).await;
}
