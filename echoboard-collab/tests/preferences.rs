mod common;

use common::{add_member, board, collab, upload, user};
use echoboard_collab::{effective_volume, PreferenceError, PreferencePatch};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn preferences_start_empty_and_upsert() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;
    let sound = upload(&test, created.id, &ada, "honk").await;

    let before = test
        .collab
        .preferences
        .for_board(&ada, created.id)
        .await
        .expect("listing succeeds");

    assert!(before.is_empty());

    let preference = test
        .collab
        .preferences
        .update(
            &ada,
            sound.id,
            PreferencePatch {
                volume: Some(0.5),
                favorite: None,
            },
        )
        .await
        .expect("the preference is stored");

    assert_eq!(preference.volume, 0.5);
    assert!(!preference.favorite);

    // A later patch only touches the given fields
    let updated = test
        .collab
        .preferences
        .update(
            &ada,
            sound.id,
            PreferencePatch {
                volume: None,
                favorite: Some(true),
            },
        )
        .await
        .expect("the preference is updated");

    assert_eq!(updated.volume, 0.5);
    assert!(updated.favorite);

    let listed = test
        .collab
        .preferences
        .for_board(&ada, created.id)
        .await
        .expect("listing succeeds");

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].sound_id, sound.id);
}

#[tokio::test]
async fn preference_volume_is_clamped_and_scales_playback() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;
    let sound = upload(&test, created.id, &ada, "honk").await;

    let preference = test
        .collab
        .preferences
        .update(
            &ada,
            sound.id,
            PreferencePatch {
                volume: Some(3.0),
                favorite: None,
            },
        )
        .await
        .expect("the preference is stored");

    assert_eq!(preference.volume, 1.0);

    // What this listener would actually hear
    assert_eq!(
        effective_volume(sound.global_volume, preference.volume),
        1.0
    );
    assert_eq!(effective_volume(0.8, 0.5), 0.4);
}

#[tokio::test]
async fn preferences_are_member_only_and_per_user() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;
    let lin = user(&test.database, "lin").await;

    let created = board(&test.collab, &ada, "Effects").await;
    add_member(&test, created.id, &grace).await;

    let sound = upload(&test, created.id, &ada, "honk").await;

    let listed = test.collab.preferences.for_board(&lin, created.id).await;
    let updated = test
        .collab
        .preferences
        .update(
            &lin,
            sound.id,
            PreferencePatch {
                volume: Some(0.5),
                favorite: None,
            },
        )
        .await;

    assert!(matches!(listed, Err(PreferenceError::NotMember)));
    assert!(matches!(updated, Err(PreferenceError::NotMember)));

    // Each member keeps their own volume for the same sound
    test.collab
        .preferences
        .update(
            &ada,
            sound.id,
            PreferencePatch {
                volume: Some(0.2),
                favorite: None,
            },
        )
        .await
        .expect("ada's preference is stored");

    test.collab
        .preferences
        .update(
            &grace,
            sound.id,
            PreferencePatch {
                volume: Some(0.9),
                favorite: None,
            },
        )
        .await
        .expect("grace's preference is stored");

    let ada_preferences = test
        .collab
        .preferences
        .for_board(&ada, created.id)
        .await
        .expect("listing succeeds");

    let grace_preferences = test
        .collab
        .preferences
        .for_board(&grace, created.id)
        .await
        .expect("listing succeeds");

    assert_eq!(ada_preferences[0].volume, 0.2);
    assert_eq!(grace_preferences[0].volume, 0.9);
}
