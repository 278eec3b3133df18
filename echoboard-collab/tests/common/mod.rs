#![allow(dead_code)]

use std::sync::Arc;

use echoboard_collab::{
    AudioTrimmer, BoardData, Collab, CollabConfig, Database, MemoryBlobStore, MemoryDatabase,
    NewBoardMember, NewSoundUpload, NewUser, SettingsPatch, SoundData, UserData,
};

pub struct TestCollab {
    pub collab: Collab,
    pub database: Arc<MemoryDatabase>,
}

pub fn collab() -> TestCollab {
    collab_with_trimmer(None)
}

pub fn collab_with_trimmer(trimmer: Option<Arc<dyn AudioTrimmer>>) -> TestCollab {
    let database = Arc::new(MemoryDatabase::new());

    let collab = Collab::new(
        database.clone(),
        Arc::new(MemoryBlobStore::new()),
        trimmer,
        CollabConfig::default(),
    );

    TestCollab { collab, database }
}

pub async fn user(database: &Arc<MemoryDatabase>, username: &str) -> UserData {
    database
        .create_user(NewUser {
            username: username.to_string(),
        })
        .await
        .expect("user is created")
}

pub async fn board(collab: &Collab, creator: &UserData, name: &str) -> BoardData {
    collab
        .boards
        .create_board(name, creator, SettingsPatch::default())
        .await
        .expect("board is created")
}

/// Installs a user directly as a member, skipping the request workflow
pub async fn add_member(test: &TestCollab, board_id: i32, user: &UserData) {
    test.database
        .create_board_member(NewBoardMember {
            board_id,
            user_id: user.id,
            admin: false,
        })
        .await
        .expect("member is added");
}

pub fn small_upload(name: &str) -> NewSoundUpload {
    NewSoundUpload {
        name: name.to_string(),
        bytes: vec![1, 2, 3, 4],
        filename: format!("{}.ogg", name),
        mime_type: "audio/ogg".to_string(),
        duration: 2.5,
        emoji: None,
        image: None,
        global_volume: 1.0,
        trim: None,
    }
}

pub async fn upload(test: &TestCollab, board_id: i32, uploader: &UserData, name: &str) -> SoundData {
    test.collab
        .sounds
        .upload(board_id, uploader, small_upload(name))
        .await
        .expect("sound is uploaded")
}
