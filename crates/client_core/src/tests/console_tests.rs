use super::*;
use crate::{
    dialog::{ConfirmOutcome, DialogState},
    test_support::{developer, level, not_found, recorder, FakeGateway},
};
use shared::domain::{DeveloperId, Gender, LevelId};

fn console(gateway: Arc<FakeGateway>) -> AdminConsole<FakeGateway> {
    let (_notes, sink) = recorder();
    AdminConsole::new(gateway, sink)
}

async fn counts(console: &AdminConsole<FakeGateway>) -> Vec<usize> {
    console
        .levels()
        .store()
        .snapshot()
        .await
        .iter()
        .map(|level| level.developer_count)
        .collect()
}

#[tokio::test]
async fn nested_levels_need_no_second_fetch() {
    let gateway = FakeGateway::with(
        vec![level(1, "Junior"), level(2, "Senior")],
        vec![developer(10, 2), developer(11, 2)],
    )
    .nested();
    let console = console(gateway.clone());

    console.open_levels().await.expect("open");
    assert_eq!(counts(&console).await, vec![0, 2]);
    assert_eq!(gateway.calls(), vec!["GET levels"]);
}

#[tokio::test]
async fn flat_levels_fetch_the_roster_for_counts() {
    let gateway = FakeGateway::with(
        vec![level(1, "Junior"), level(2, "Senior")],
        vec![developer(10, 1)],
    );
    let console = console(gateway.clone());

    console.open_levels().await.expect("open");
    assert_eq!(counts(&console).await, vec![1, 0]);
    assert_eq!(gateway.calls(), vec!["GET levels", "GET developers"]);
}

#[tokio::test]
async fn developer_rows_survive_a_failed_catalog_fetch() {
    let gateway = FakeGateway::with(vec![level(1, "Junior")], vec![developer(10, 1)]);
    let console = console(gateway.clone());

    gateway.fail_call("GET levels", not_found("levels"));
    let result = console.open_developers().await;

    assert!(result.expect_err("catalog failed").is_not_found());
    let rows = console.developers().rows().await.expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cells[2], "#1");
    assert_eq!(gateway.calls().len(), 2);
}

#[tokio::test]
async fn developer_page_shows_level_labels() {
    let gateway = FakeGateway::with(vec![level(1, "Junior")], vec![developer(10, 1)]);
    let console = console(gateway);

    console.open_developers().await.expect("open");
    let rows = console.developers().rows().await.expect("rows");
    assert_eq!(rows[0].id, "10");
    assert_eq!(rows[0].cells[2], "Junior");
}

#[tokio::test]
async fn level_counts_follow_developer_changes() {
    let gateway = FakeGateway::with(
        vec![level(1, "Junior"), level(2, "Senior")],
        vec![developer(10, 1), developer(11, 1)],
    );
    let console = console(gateway.clone());
    console.open_levels().await.expect("levels");
    console.open_developers().await.expect("developers");
    assert_eq!(counts(&console).await, vec![2, 0]);

    console
        .developers()
        .request_delete(DeveloperId(11))
        .await
        .expect("request");
    assert_eq!(console.dialog().confirm().await, ConfirmOutcome::Completed);
    assert_eq!(counts(&console).await, vec![1, 0]);

    console
        .developers()
        .request_edit(DeveloperId(10))
        .await
        .expect("edit");
    console
        .developers()
        .form()
        .edit(|draft| draft.level_id = Some(LevelId(2)))
        .await
        .expect("draft");
    console.developers().form().submit().await.expect("submit");
    assert_eq!(counts(&console).await, vec![0, 1]);

    console.developers().request_create().await;
    console
        .developers()
        .form()
        .edit(|draft| {
            draft.level_id = Some(LevelId(2));
            draft.name = "Bia Souza".into();
            draft.gender = Some(Gender::Female);
            draft.date_of_birth = "1995-07-20".into();
            draft.age = Some(29);
            draft.hobby = "surf".into();
        })
        .await
        .expect("draft");
    console.developers().form().submit().await.expect("create");
    assert_eq!(counts(&console).await, vec![0, 2]);
    assert_eq!(
        gateway
            .calls()
            .iter()
            .filter(|call| *call == "GET developers")
            .count(),
        2,
        "counts follow local changes without refetching"
    );
}

#[tokio::test]
async fn manual_sync_replaces_a_nested_roster() {
    let gateway = FakeGateway::with(
        vec![level(1, "Junior"), level(2, "Senior")],
        vec![developer(10, 1)],
    )
    .nested();
    let console = console(gateway.clone());
    console.open_developers().await.expect("developers");
    gateway.remove_developer_server_side(10);

    console.open_levels().await.expect("levels");
    assert_eq!(counts(&console).await, vec![0, 0]);

    console.sync_level_counts().await;
    assert_eq!(counts(&console).await, vec![1, 0]);
}

#[tokio::test]
async fn pages_share_one_dialog() {
    let gateway = FakeGateway::with(vec![level(1, "Junior")], vec![developer(10, 1)]);
    let console = console(gateway.clone());
    console.open_levels().await.expect("levels");
    console.open_developers().await.expect("developers");

    console
        .levels()
        .request_delete(LevelId(1))
        .await
        .expect("level");
    console
        .developers()
        .request_delete(DeveloperId(10))
        .await
        .expect("developer");

    match console.dialog().state().await {
        DialogState::Open(view) => assert_eq!(view.target, "10"),
        DialogState::Closed => panic!("dialog should be open"),
    }
    assert_eq!(console.dialog().confirm().await, ConfirmOutcome::Completed);
    assert!(gateway.calls().contains(&"DELETE developers/10".to_string()));
    assert!(!gateway.calls().iter().any(|call| call == "DELETE levels/1"));
    assert_eq!(console.levels().store().len().await, 1);
}
