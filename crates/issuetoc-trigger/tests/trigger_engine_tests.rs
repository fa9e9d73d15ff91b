//! End-to-end tests: navigation trigger through to a mounted panel.

use std::time::Duration;

use issuetoc_config::AppConfig;
use issuetoc_core::{HostPage, MountOrchestrator};
use issuetoc_test_utils::{FakeClock, IssuePageBuilder};
use issuetoc_trigger::{NavigationDetails, NavigationMessage, TriggerService};
use pretty_assertions::assert_eq;

const WINDOW: Duration = Duration::from_millis(500);

fn message(url: &str) -> NavigationMessage {
    NavigationMessage::MountOutline(NavigationDetails {
        url: url.to_string(),
        context_id: Some(1),
        timestamp_ms: None,
    })
}

fn issue_page() -> issuetoc_core::MemoryPage {
    IssuePageBuilder::new()
        .heading(1, "Intro", 100.0)
        .heading(2, "Setup", 600.0)
        .heading(2, "Usage", 1200.0)
        .build()
}

#[test_log::test(tokio::test)]
async fn test_navigation_burst_mounts_exactly_once() {
    let (engine, engine_handle) = MountOrchestrator::new(issue_page(), AppConfig::default());
    let engine_task = tokio::spawn(engine.run());

    let (service, trigger) =
        TriggerService::with_clock(engine_handle.clone(), WINDOW, FakeClock::new());
    let trigger_task = tokio::spawn(service.run());

    // One navigation, two completion events from the host
    let url = "https://github.com/acme/widgets/issues/42";
    trigger.deliver(message(url)).await.unwrap();
    trigger.deliver(message(url)).await.unwrap();
    trigger.shutdown().await.unwrap();
    trigger_task.await.unwrap();

    engine_handle.shutdown().await.unwrap();
    let engine = engine_task.await.unwrap();

    assert!(engine.is_mounted());
    let point = engine.host().element_by_id("issuetoc-panel").unwrap();
    assert_eq!(engine.host().query_all_within(point, "ul").len(), 1);
    assert_eq!(engine.host().query_all_within(point, "li").len(), 3);
}

#[test_log::test(tokio::test)]
async fn test_out_of_scope_navigation_never_mounts() {
    let (engine, engine_handle) = MountOrchestrator::new(issue_page(), AppConfig::default());
    let engine_task = tokio::spawn(engine.run());

    let (service, trigger) =
        TriggerService::with_clock(engine_handle.clone(), WINDOW, FakeClock::new());
    let trigger_task = tokio::spawn(service.run());

    trigger
        .deliver(message("https://github.com/acme/widgets/pull/42"))
        .await
        .unwrap();
    trigger.shutdown().await.unwrap();
    trigger_task.await.unwrap();

    engine_handle.shutdown().await.unwrap();
    let engine = engine_task.await.unwrap();

    assert!(!engine.is_mounted());
    assert!(engine.host().element_by_id("issuetoc-panel").is_none());
}
