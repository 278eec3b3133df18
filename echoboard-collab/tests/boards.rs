mod common;

use common::{board, collab, user};
use echoboard_collab::{BoardError, Database, SettingsPatch};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn boards_with_the_same_name_get_distinct_slugs() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let first = board(&test.collab, &ada, "My Board").await;
    let second = board(&test.collab, &ada, "My Board").await;
    let third = board(&test.collab, &ada, "My Board").await;

    assert_eq!(first.slug, "my-board");
    assert_eq!(second.slug, "my-board-2");
    assert_eq!(third.slug, "my-board-3");
}

#[tokio::test]
async fn creator_is_the_first_admin_member() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;

    assert_eq!(created.members.len(), 1);
    assert_eq!(created.members[0].user.id, ada.id);
    assert!(created.members[0].admin);
    assert_eq!(created.created_by.id, ada.id);

    assert!(test
        .collab
        .boards
        .is_admin(created.id, ada.id)
        .await
        .expect("check succeeds"));
}

#[tokio::test]
async fn creating_a_board_updates_the_creator_slug_cache() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;
    let refreshed = test.database.user_by_id(ada.id).await.expect("user exists");

    assert_eq!(refreshed.board_slugs, vec![created.slug]);
}

#[tokio::test]
async fn invite_codes_are_distinct_opaque_tokens() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let first = board(&test.collab, &ada, "One").await;
    let second = board(&test.collab, &ada, "Two").await;

    assert_eq!(first.invite_code.len(), 8);
    assert!(first.invite_code.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(first.invite_code, second.invite_code);

    let link = test.collab.boards.invite_link(&first);
    assert!(link.ends_with(&format!("/invite/{}", first.invite_code)));

    let found = test
        .collab
        .boards
        .board_by_invite_code(&first.invite_code)
        .await
        .expect("board is found");

    assert_eq!(found.id, first.id);
}

#[tokio::test]
async fn lookups_for_absent_boards_fail_with_not_found() {
    let test = collab();

    let by_slug = test.collab.boards.board_by_slug("nope").await;
    let by_code = test.collab.boards.board_by_invite_code("nope").await;

    assert!(by_slug.expect_err("should fail").is_not_found());
    assert!(by_code.expect_err("should fail").is_not_found());
}

#[tokio::test]
async fn access_requests_are_recorded_and_approved() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;

    let created = board(&test.collab, &ada, "Effects").await;

    test.collab
        .boards
        .request_access(created.id, &grace, Some("let me in".to_string()))
        .await
        .expect("request is recorded");

    let pending = test
        .collab
        .boards
        .board_by_id(created.id)
        .await
        .expect("board exists")
        .pending_requests;

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].user.id, grace.id);
    assert_eq!(pending[0].message.as_deref(), Some("let me in"));

    test.collab
        .boards
        .approve_member(created.id, ada.id, grace.id)
        .await
        .expect("request is approved");

    let refreshed = test
        .collab
        .boards
        .board_by_id(created.id)
        .await
        .expect("board exists");

    assert!(refreshed.pending_requests.is_empty());
    assert!(test
        .collab
        .boards
        .is_member(created.id, grace.id)
        .await
        .expect("check succeeds"));

    // Approval also updates the denormalized cache
    let cached = test
        .database
        .user_by_id(grace.id)
        .await
        .expect("user exists");

    assert_eq!(cached.board_slugs, vec![refreshed.slug]);
}

#[tokio::test]
async fn approving_twice_fails_with_request_not_found() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;

    let created = board(&test.collab, &ada, "Effects").await;

    test.collab
        .boards
        .request_access(created.id, &grace, None)
        .await
        .expect("request is recorded");

    test.collab
        .boards
        .approve_member(created.id, ada.id, grace.id)
        .await
        .expect("request is approved");

    let second = test
        .collab
        .boards
        .approve_member(created.id, ada.id, grace.id)
        .await;

    assert!(matches!(second, Err(BoardError::RequestNotFound)));
}

#[tokio::test]
async fn members_cannot_request_access_again() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;

    let result = test.collab.boards.request_access(created.id, &ada, None).await;

    assert!(matches!(result, Err(BoardError::AlreadyMember)));

    let refreshed = test
        .collab
        .boards
        .board_by_id(created.id)
        .await
        .expect("board exists");

    assert!(refreshed.pending_requests.is_empty());
}

#[tokio::test]
async fn duplicate_requests_are_rejected() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;

    let created = board(&test.collab, &ada, "Effects").await;

    test.collab
        .boards
        .request_access(created.id, &grace, None)
        .await
        .expect("request is recorded");

    let second = test
        .collab
        .boards
        .request_access(created.id, &grace, None)
        .await;

    assert!(matches!(second, Err(BoardError::DuplicateRequest)));

    let refreshed = test
        .collab
        .boards
        .board_by_id(created.id)
        .await
        .expect("board exists");

    assert_eq!(refreshed.pending_requests.len(), 1);
}

#[tokio::test]
async fn only_admins_may_resolve_requests_or_change_settings() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;
    let evil = user(&test.database, "evil").await;

    let created = board(&test.collab, &ada, "Effects").await;

    test.collab
        .boards
        .request_access(created.id, &grace, None)
        .await
        .expect("request is recorded");

    let approve = test
        .collab
        .boards
        .approve_member(created.id, evil.id, grace.id)
        .await;
    let deny = test
        .collab
        .boards
        .deny_request(created.id, evil.id, grace.id)
        .await;
    let settings = test
        .collab
        .boards
        .update_settings(
            created.id,
            evil.id,
            SettingsPatch {
                allow_uploads: Some(false),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(approve, Err(BoardError::NotAuthorized)));
    assert!(matches!(deny, Err(BoardError::NotAuthorized)));
    assert!(matches!(settings, Err(BoardError::NotAuthorized)));

    // Nothing about the board changed
    let refreshed = test
        .collab
        .boards
        .board_by_id(created.id)
        .await
        .expect("board exists");

    assert_eq!(refreshed.pending_requests.len(), 1);
    assert_eq!(refreshed.members.len(), 1);
    assert!(refreshed.settings.allow_uploads);
}

#[tokio::test]
async fn denial_allows_requesting_again() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;

    let created = board(&test.collab, &ada, "Effects").await;

    test.collab
        .boards
        .request_access(created.id, &grace, None)
        .await
        .expect("request is recorded");

    test.collab
        .boards
        .deny_request(created.id, ada.id, grace.id)
        .await
        .expect("request is denied");

    let refreshed = test
        .collab
        .boards
        .board_by_id(created.id)
        .await
        .expect("board exists");

    assert!(refreshed.pending_requests.is_empty());
    assert!(!test
        .collab
        .boards
        .is_member(created.id, grace.id)
        .await
        .expect("check succeeds"));

    test.collab
        .boards
        .request_access(created.id, &grace, None)
        .await
        .expect("a denied user may request again");
}

#[tokio::test]
async fn settings_patches_merge_into_existing_settings() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;

    let updated = test
        .collab
        .boards
        .update_settings(
            created.id,
            ada.id,
            SettingsPatch {
                max_sounds: Some(10),
                ..Default::default()
            },
        )
        .await
        .expect("settings are updated");

    assert_eq!(updated.settings.max_sounds, 10);
    assert_eq!(
        updated.settings.max_file_size_bytes,
        created.settings.max_file_size_bytes
    );
    assert_eq!(
        updated.settings.allow_uploads,
        created.settings.allow_uploads
    );
}

#[tokio::test]
async fn board_listing_is_ordered_by_recent_activity() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let first = board(&test.collab, &ada, "First").await;
    let second = board(&test.collab, &ada, "Second").await;

    // Updating settings counts as activity
    test.collab
        .boards
        .update_settings(
            first.id,
            ada.id,
            SettingsPatch {
                max_sounds: Some(10),
                ..Default::default()
            },
        )
        .await
        .expect("settings are updated");

    let listed = test
        .collab
        .boards
        .boards_for_user(ada.id)
        .await
        .expect("listing succeeds");

    let ids: Vec<_> = listed.iter().map(|b| b.id).collect();

    assert_eq!(ids, vec![first.id, second.id]);
}
