// Instance list rendering and readiness polling

mod common;

use cactus_client::mock::Endpoint;
use cactus_common::InstanceStatus::{Error, Pending, Ready};
use cactus_panel::surfaces::StatusCell;
use cactus_panel::RefreshOutcome;
use common::{advance, harness, instance, settle, POLL};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_rows_match_listed_instances() {
    let h = harness(vec![
        instance("a", "10.0.0.1"),
        instance("b", "10.0.0.2"),
        instance("c", "10.0.0.3"),
    ]);

    let outcome = h.controller.refresh_instance_list().await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Rendered(3));

    let snap = h.model.snapshot();
    let ids: Vec<&str> = snap.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(snap.rows.iter().all(|r| r.status == StatusCell::Pending));
    h.controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_ready_renders_hub_link_and_stops() {
    let h = harness(vec![instance("a", "10.0.0.1")]);
    h.api.script_status("a", vec![Pending, Pending, Ready]);

    h.controller.refresh_instance_list().await.unwrap();
    settle().await;
    assert_eq!(h.api.status_calls_for("a"), 1);

    advance(POLL - Duration::from_millis(2)).await;
    assert_eq!(h.api.status_calls_for("a"), 1);
    advance(Duration::from_millis(2)).await;
    assert_eq!(h.api.status_calls_for("a"), 2);

    advance(POLL).await;
    assert_eq!(h.api.status_calls_for("a"), 3);
    assert_eq!(
        h.model.snapshot().row("a").unwrap().status,
        StatusCell::Link("http://10.0.0.1:8080".into())
    );
    assert!(!h.controller.is_polling("a"));

    advance(POLL * 4).await;
    assert_eq!(h.api.status_calls_for("a"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_error_shows_label_and_stops() {
    let h = harness(vec![instance("a", "10.0.0.1")]);
    h.api.script_status("a", vec![Pending, Error]);

    h.controller.refresh_instance_list().await.unwrap();
    advance(POLL + Duration::from_millis(1)).await;

    let row = h.model.snapshot().row("a").cloned().unwrap();
    assert_eq!(row.status, StatusCell::Error);
    assert_eq!(row.status.label(), "Error ❌");

    advance(POLL * 3).await;
    assert_eq!(h.api.status_calls_for("a"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_reads_keep_polling() {
    let h = harness(vec![instance("a", "10.0.0.1")]);
    h.api.fail(Endpoint::Status);

    h.controller.refresh_instance_list().await.unwrap();
    advance(POLL * 10 + Duration::from_millis(1)).await;

    assert_eq!(h.api.status_calls_for("a"), 11);
    assert!(h.controller.is_polling("a"));
    assert_eq!(h.model.snapshot().row("a").unwrap().status, StatusCell::Pending);

    h.api.recover(Endpoint::Status);
    h.api.script_status("a", vec![Ready]);
    advance(POLL).await;
    assert!(!h.controller.is_polling("a"));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_does_not_duplicate_running_polls() {
    let h = harness(vec![instance("a", "10.0.0.1")]);

    h.controller.refresh_instance_list().await.unwrap();
    h.controller.refresh_instance_list().await.unwrap();
    h.controller.refresh_instance_list().await.unwrap();
    settle().await;

    assert_eq!(h.controller.active_polls(), 1);
    assert_eq!(h.api.status_calls_for("a"), 1);

    advance(POLL).await;
    assert_eq!(h.api.status_calls_for("a"), 2);
    h.controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_refresh_cancels_polls_for_removed_instances() {
    let h = harness(vec![instance("a", "10.0.0.1"), instance("b", "10.0.0.2")]);

    h.controller.refresh_instance_list().await.unwrap();
    settle().await;
    assert_eq!(h.controller.active_polls(), 2);

    h.api.set_instances(vec![instance("b", "10.0.0.2")]);
    h.controller.refresh_instance_list().await.unwrap();
    assert!(!h.controller.is_polling("a"));
    assert!(h.controller.is_polling("b"));

    let a_calls = h.api.status_calls_for("a");
    advance(POLL * 3).await;
    assert_eq!(h.api.status_calls_for("a"), a_calls);
    assert!(h.model.snapshot().row("a").is_none());
    h.controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_finished_instance_is_polled_again_after_refresh() {
    let h = harness(vec![instance("a", "10.0.0.1")]);
    h.api.script_status("a", vec![Ready]);

    h.controller.refresh_instance_list().await.unwrap();
    settle().await;
    assert!(matches!(
        h.model.snapshot().row("a").unwrap().status,
        StatusCell::Link(_)
    ));

    h.controller.refresh_instance_list().await.unwrap();
    assert_eq!(h.model.snapshot().row("a").unwrap().status, StatusCell::Pending);
    settle().await;
    assert_eq!(h.api.status_calls_for("a"), 2);
    assert!(matches!(
        h.model.snapshot().row("a").unwrap().status,
        StatusCell::Link(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_previous_rows() {
    let h = harness(vec![instance("a", "10.0.0.1")]);
    h.controller.refresh_instance_list().await.unwrap();

    h.api.fail(Endpoint::List);
    h.api.set_instances(vec![]);
    assert!(h.controller.refresh_instance_list().await.is_err());

    let snap = h.model.snapshot();
    assert_eq!(snap.rows.len(), 1);
    assert!(h.controller.is_polling("a"));
    h.controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_slow_refresh_is_superseded_by_newer_one() {
    let h = harness(vec![instance("a", "10.0.0.1")]);
    h.api.delay_next(Endpoint::List, Duration::from_secs(2));

    let slow = {
        let controller = h.controller.clone();
        tokio::spawn(async move { controller.refresh_instance_list().await })
    };
    settle().await;

    h.api.set_instances(vec![instance("b", "10.0.0.2")]);
    let fresh = h.controller.refresh_instance_list().await.unwrap();
    assert_eq!(fresh, RefreshOutcome::Rendered(1));

    advance(Duration::from_secs(3)).await;
    let stale = slow.await.unwrap().unwrap();
    assert_eq!(stale, RefreshOutcome::Superseded);

    let snap = h.model.snapshot();
    assert_eq!(snap.rows.len(), 1);
    assert_eq!(snap.rows[0].id, "b");
    assert!(!h.controller.is_polling("a"));
    h.controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_hub_port_comes_from_settings() {
    use cactus_client::mock::MockInstanceApi;
    use cactus_panel::view_model::ViewModel;
    use cactus_panel::{InstancePanelController, PanelSettings};
    use std::sync::Arc;

    let api = Arc::new(MockInstanceApi::with_instances(vec![instance("a", "10.9.9.9")]));
    api.script_status("a", vec![Ready]);
    let model = ViewModel::new();
    let settings = PanelSettings {
        hub_port: 8888,
        ..PanelSettings::default()
    };
    let controller = InstancePanelController::new(api, model.surfaces(), &settings);

    controller.refresh_instance_list().await.unwrap();
    settle().await;
    assert_eq!(
        model.snapshot().row("a").unwrap().status,
        StatusCell::Link("http://10.9.9.9:8888".into())
    );
}

#[tokio::test(start_paused = true)]
async fn test_ready_link_uses_address_from_latest_list() {
    let h = harness(vec![instance("a", "")]);
    h.api.script_status("a", vec![Pending, Ready]);

    h.controller.refresh_instance_list().await.unwrap();
    settle().await;
    assert_eq!(h.api.status_calls_for("a"), 1);

    h.api.set_instances(vec![instance("a", "10.0.0.9")]);
    h.controller.refresh_instance_list().await.unwrap();
    assert_eq!(h.controller.active_polls(), 1);

    advance(POLL).await;
    assert_eq!(h.api.status_calls_for("a"), 2);
    let row = h.model.snapshot().row("a").cloned().unwrap();
    assert_eq!(row.public_ip, "10.0.0.9");
    assert_eq!(row.status, StatusCell::Link("http://10.0.0.9:8080".into()));
}
