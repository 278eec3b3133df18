mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{add_member, board, collab, collab_with_trimmer, small_upload, upload, user};
use echoboard_collab::{
    AudioTrimmer, RoomEvent, SettingsPatch, SoundError, TrimError, TrimmedAudio,
};
use futures_util::{FutureExt, StreamExt};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn uploads_are_stored_and_announced() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;

    let mut handle = test
        .collab
        .rooms
        .join(created.id, &ada)
        .await
        .expect("ada joins");

    let sound = upload(&test, created.id, &ada, "honk").await;

    assert_eq!(sound.name, "honk");
    assert_eq!(sound.file_size, 4);
    assert_eq!(sound.uploaded_by.id, ada.id);
    assert_eq!(sound.play_count, 0);

    let bytes = test
        .collab
        .sounds
        .audio_bytes(&sound)
        .await
        .expect("audio bytes are stored");

    assert_eq!(bytes, vec![1, 2, 3, 4]);

    let event = handle
        .next()
        .now_or_never()
        .flatten()
        .expect("the upload is announced");

    assert!(
        matches!(event, RoomEvent::SoundUploaded { sound, .. } if sound.name == "honk"),
        "expected an upload announcement"
    );

    let listed = test
        .collab
        .sounds
        .sounds_on_board(created.id, &ada)
        .await
        .expect("listing succeeds");

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, sound.id);
}

#[tokio::test]
async fn non_members_cannot_upload_or_list() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;

    let created = board(&test.collab, &ada, "Effects").await;

    let uploaded = test
        .collab
        .sounds
        .upload(created.id, &grace, small_upload("honk"))
        .await;
    let listed = test.collab.sounds.sounds_on_board(created.id, &grace).await;

    assert!(matches!(uploaded, Err(SoundError::NotMember)));
    assert!(matches!(listed, Err(SoundError::NotMember)));
}

#[tokio::test]
async fn uploads_respect_board_settings() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;

    test.collab
        .boards
        .update_settings(
            created.id,
            ada.id,
            SettingsPatch {
                max_sounds: Some(1),
                max_file_size_bytes: Some(3),
                ..Default::default()
            },
        )
        .await
        .expect("settings are updated");

    let too_large = test
        .collab
        .sounds
        .upload(created.id, &ada, small_upload("honk"))
        .await;

    assert!(matches!(
        too_large,
        Err(SoundError::FileTooLarge { limit: 3 })
    ));

    let mut tiny = small_upload("honk");
    tiny.bytes = vec![1];

    test.collab
        .sounds
        .upload(created.id, &ada, tiny)
        .await
        .expect("a small enough upload succeeds");

    let mut another = small_upload("beep");
    another.bytes = vec![2];

    let board_full = test.collab.sounds.upload(created.id, &ada, another).await;

    assert!(matches!(
        board_full,
        Err(SoundError::TooManySounds { limit: 1 })
    ));

    test.collab
        .boards
        .update_settings(
            created.id,
            ada.id,
            SettingsPatch {
                allow_uploads: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("settings are updated");

    let mut disabled = small_upload("beep");
    disabled.bytes = vec![2];

    let result = test.collab.sounds.upload(created.id, &ada, disabled).await;

    assert!(matches!(result, Err(SoundError::UploadsDisabled)));
}

#[tokio::test]
async fn only_the_uploader_and_admins_may_modify_a_sound() {
    let test = collab();
    let ada = user(&test.database, "ada").await;
    let grace = user(&test.database, "grace").await;
    let lin = user(&test.database, "lin").await;

    let created = board(&test.collab, &ada, "Effects").await;
    add_member(&test, created.id, &grace).await;
    add_member(&test, created.id, &lin).await;

    let sound = upload(&test, created.id, &grace, "honk").await;

    // Another plain member may not touch it
    let update = test
        .collab
        .sounds
        .update(sound.id, &lin, Some("beep".to_string()), None, None)
        .await;
    let delete = test.collab.sounds.delete(sound.id, &lin).await;

    assert!(matches!(update, Err(SoundError::NotAllowed)));
    assert!(matches!(delete, Err(SoundError::NotAllowed)));

    // The uploader may
    let renamed = test
        .collab
        .sounds
        .update(sound.id, &grace, Some("beep".to_string()), None, Some(0.5))
        .await
        .expect("the uploader may update");

    assert_eq!(renamed.name, "beep");
    assert_eq!(renamed.global_volume, 0.5);

    // And so may a board admin
    test.collab
        .sounds
        .delete(sound.id, &ada)
        .await
        .expect("an admin may delete");
}

#[tokio::test]
async fn deleting_a_sound_removes_its_bytes_and_announces_it() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;
    let sound = upload(&test, created.id, &ada, "honk").await;

    let mut handle = test
        .collab
        .rooms
        .join(created.id, &ada)
        .await
        .expect("ada joins");

    test.collab
        .sounds
        .delete(sound.id, &ada)
        .await
        .expect("the sound is deleted");

    let event = handle
        .next()
        .now_or_never()
        .flatten()
        .expect("the deletion is announced");

    assert!(
        matches!(event, RoomEvent::SoundDeleted { sound_id, .. } if sound_id == sound.id),
        "expected a deletion announcement"
    );

    let bytes = test.collab.sounds.audio_bytes(&sound).await;
    assert!(bytes.is_err());

    let listed = test
        .collab
        .sounds
        .sounds_on_board(created.id, &ada)
        .await
        .expect("listing succeeds");

    assert!(listed.is_empty());
}

#[tokio::test]
async fn sound_images_are_stored_alongside_the_audio() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;

    let mut with_image = small_upload("honk");
    with_image.image = Some(vec![9, 9, 9]);

    let sound = test
        .collab
        .sounds
        .upload(created.id, &ada, with_image)
        .await
        .expect("the upload succeeds");

    let image = test
        .collab
        .sounds
        .image_bytes(&sound)
        .await
        .expect("image bytes are stored");

    assert_eq!(image, vec![9, 9, 9]);

    let plain = upload(&test, created.id, &ada, "beep").await;
    let missing = test.collab.sounds.image_bytes(&plain).await;

    assert!(matches!(missing, Err(SoundError::NoImage)));
}

struct HalvingTrimmer;

#[async_trait]
impl AudioTrimmer for HalvingTrimmer {
    async fn trim(
        &self,
        bytes: Vec<u8>,
        _mime_type: &str,
        start: f32,
        end: f32,
    ) -> Result<TrimmedAudio, TrimError> {
        Ok(TrimmedAudio {
            bytes: bytes[..bytes.len() / 2].to_vec(),
            duration: end - start,
        })
    }
}

#[tokio::test]
async fn trimming_replaces_bytes_and_duration() {
    let test = collab_with_trimmer(Some(Arc::new(HalvingTrimmer)));
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;

    let mut trimmed = small_upload("honk");
    trimmed.trim = Some((0.5, 1.5));

    let sound = test
        .collab
        .sounds
        .upload(created.id, &ada, trimmed)
        .await
        .expect("the upload succeeds");

    assert_eq!(sound.duration, 1.0);
    assert_eq!(sound.file_size, 2);

    let bytes = test
        .collab
        .sounds
        .audio_bytes(&sound)
        .await
        .expect("audio bytes are stored");

    assert_eq!(bytes, vec![1, 2]);
}

#[tokio::test]
async fn invalid_trim_ranges_are_rejected() {
    let test = collab_with_trimmer(Some(Arc::new(HalvingTrimmer)));
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;

    for range in [(-0.5, 1.0), (1.0, 1.0), (1.0, 0.5), (0.0, 10.0)] {
        let mut bad = small_upload("honk");
        bad.trim = Some(range);

        let result = test.collab.sounds.upload(created.id, &ada, bad).await;

        assert!(
            matches!(result, Err(SoundError::InvalidTrimRange)),
            "range {:?} should be rejected",
            range
        );
    }
}

#[tokio::test]
async fn trimming_without_a_trimmer_is_rejected() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;

    let mut wanted = small_upload("honk");
    wanted.trim = Some((0.5, 1.5));

    let result = test.collab.sounds.upload(created.id, &ada, wanted).await;

    assert!(matches!(result, Err(SoundError::TrimUnavailable)));
}

#[tokio::test]
async fn upload_volume_is_clamped() {
    let test = collab();
    let ada = user(&test.database, "ada").await;

    let created = board(&test.collab, &ada, "Effects").await;

    let mut loud = small_upload("honk");
    loud.global_volume = 4.0;

    let sound = test
        .collab
        .sounds
        .upload(created.id, &ada, loud)
        .await
        .expect("the upload succeeds");

    assert_eq!(sound.global_volume, 1.0);
}
