mod common;

use common::{add_member, board, collab, upload, user};
use echoboard_collab::{RoomError, RoomEvent};
use futures_util::{FutureExt, StreamExt};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn joining_requires_membership() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;

    let created = board(&test.collab, &ada, "Effects").await;

    let result = test.collab.rooms.join(created.id, &grace).await;

    assert!(matches!(result, Err(RoomError::JoinDenied)));
    assert!(test.collab.rooms.occupants(created.id).is_empty());
}

#[tokio::test]
async fn occupants_hear_about_newcomers_but_not_themselves() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;

    let created = board(&test.collab, &ada, "Effects").await;
    add_member(&test, created.id, &grace).await;

    let mut ada_handle = test
        .collab
        .rooms
        .join(created.id, &ada)
        .await
        .expect("ada joins");

    let mut grace_handle = test
        .collab
        .rooms
        .join(created.id, &grace)
        .await
        .expect("grace joins");

    let event = ada_handle
        .next()
        .now_or_never()
        .flatten()
        .expect("ada is notified");

    assert!(
        matches!(event, RoomEvent::UserJoined { username, .. } if username == "grace"),
        "expected grace's join notification"
    );

    assert!(grace_handle.next().now_or_never().is_none());

    let occupants = test.collab.rooms.occupants(created.id);
    assert_eq!(occupants.len(), 2);
}

#[tokio::test]
async fn dropping_a_handle_leaves_the_room_and_notifies_peers() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;

    let created = board(&test.collab, &ada, "Effects").await;
    add_member(&test, created.id, &grace).await;

    let mut ada_handle = test
        .collab
        .rooms
        .join(created.id, &ada)
        .await
        .expect("ada joins");

    let grace_handle = test
        .collab
        .rooms
        .join(created.id, &grace)
        .await
        .expect("grace joins");

    // Skip over the join notification
    let _ = ada_handle.next().now_or_never();

    drop(grace_handle);

    let event = ada_handle
        .next()
        .now_or_never()
        .flatten()
        .expect("ada is notified");

    assert!(
        matches!(event, RoomEvent::UserLeft { username, .. } if username == "grace"),
        "expected grace's leave notification"
    );

    let occupants = test.collab.rooms.occupants(created.id);
    assert_eq!(occupants.len(), 1);
    assert_eq!(occupants[0].id, ada.id);
}

#[tokio::test]
async fn play_events_reach_the_whole_room_including_the_player() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;

    let created = board(&test.collab, &ada, "Effects").await;
    add_member(&test, created.id, &grace).await;

    let sound = upload(&test, created.id, &ada, "honk").await;

    let mut ada_handle = test
        .collab
        .rooms
        .join(created.id, &ada)
        .await
        .expect("ada joins");

    let mut grace_handle = test
        .collab
        .rooms
        .join(created.id, &grace)
        .await
        .expect("grace joins");

    let _ = ada_handle.next().now_or_never();

    test.collab
        .sounds
        .play(sound.id, &grace, created.id)
        .await
        .expect("play is broadcast");

    for handle in [&mut ada_handle, &mut grace_handle] {
        let event = handle
            .next()
            .now_or_never()
            .flatten()
            .expect("the play event arrives");

        match event {
            RoomEvent::SoundPlaying {
                sound_id,
                played_by,
                timestamp,
            } => {
                assert_eq!(sound_id, sound.id);
                assert_eq!(played_by, "grace");
                assert!(timestamp > 0);
            }
            other => panic!("expected a play event, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn broadcasts_never_cross_board_rooms() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let first = board(&test.collab, &ada, "First").await;
    let second = board(&test.collab, &ada, "Second").await;

    let sound = upload(&test, first.id, &ada, "honk").await;

    let mut first_handle = test
        .collab
        .rooms
        .join(first.id, &ada)
        .await
        .expect("joins the first room");

    let mut second_handle = test
        .collab
        .rooms
        .join(second.id, &ada)
        .await
        .expect("joins the second room");

    test.collab
        .sounds
        .play(sound.id, &ada, first.id)
        .await
        .expect("play is broadcast");

    assert!(first_handle.next().now_or_never().flatten().is_some());
    assert!(second_handle.next().now_or_never().is_none());
}

#[tokio::test]
async fn playing_a_sound_from_another_board_is_rejected() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let first = board(&test.collab, &ada, "First").await;
    let second = board(&test.collab, &ada, "Second").await;

    let sound = upload(&test, first.id, &ada, "honk").await;

    let result = test.collab.sounds.play(sound.id, &ada, second.id).await;

    assert!(matches!(
        result,
        Err(echoboard_collab::SoundError::WrongBoard)
    ));
}

#[tokio::test]
async fn play_counts_are_bumped_in_the_background() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;
    let sound = upload(&test, created.id, &ada, "honk").await;

    let _handle = test
        .collab
        .rooms
        .join(created.id, &ada)
        .await
        .expect("ada joins");

    test.collab
        .sounds
        .play(sound.id, &ada, created.id)
        .await
        .expect("play is broadcast");

    let mut play_count = 0;

    for _ in 0..100 {
        tokio::task::yield_now().await;

        play_count = test
            .collab
            .sounds
            .sound_for_member(sound.id, &ada)
            .await
            .expect("sound exists")
            .play_count;

        if play_count == 1 {
            break;
        }
    }

    assert_eq!(play_count, 1);
}

#[tokio::test]
async fn empty_rooms_are_dropped_from_the_registry() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;

    let handle = test
        .collab
        .rooms
        .join(created.id, &ada)
        .await
        .expect("ada joins");

    assert_eq!(test.collab.rooms.occupants(created.id).len(), 1);

    drop(handle);

    assert!(test.collab.rooms.occupants(created.id).is_empty());
}
