use chrono::{DateTime, Utc};
use serde::Serialize;

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// An echoboard account.
///
/// Credentials are owned by the external identity system and are never
/// loaded into the collab layer.
#[derive(Debug, Clone, Serialize)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    /// Slugs of boards the user belongs to. This is a denormalized cache
    /// kept up to date on a best-effort basis and must never be used for
    /// authorization decisions.
    pub board_slugs: Vec<String>,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// An echoboard board
#[derive(Debug, Clone)]
pub struct BoardData {
    pub id: PrimaryKey,
    /// A unique, URL-safe slug used to identify the board
    pub slug: String,
    /// The unique opaque token granting access to the board's join page
    pub invite_code: String,
    pub name: String,
    pub created_by: UserData,
    pub members: Vec<BoardMemberData>,
    pub pending_requests: Vec<PendingRequestData>,
    pub settings: BoardSettings,
    pub last_activity: DateTime<Utc>,
}

/// A member of a board
#[derive(Debug, Clone)]
pub struct BoardMemberData {
    pub id: PrimaryKey,
    /// If this is true, the member may manage the roster and settings
    pub admin: bool,
    pub user: UserData,
}

/// A recorded intent by a non-member to join a board
#[derive(Debug, Clone)]
pub struct PendingRequestData {
    pub user: UserData,
    pub requested_at: DateTime<Utc>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardSettings {
    pub max_sounds: i32,
    pub max_file_size_bytes: i64,
    pub allow_uploads: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            max_sounds: 50,
            max_file_size_bytes: 5 * 1024 * 1024,
            allow_uploads: true,
        }
    }
}

/// A short audio clip belonging to a board
#[derive(Debug, Clone, Serialize)]
pub struct SoundData {
    pub id: PrimaryKey,
    pub board_id: PrimaryKey,
    pub name: String,
    /// Reference into the blob store
    pub blob_id: String,
    pub filename: String,
    pub mime_type: String,
    pub file_size: i64,
    /// Clip length in seconds
    pub duration: f32,
    pub uploaded_by: UserData,
    pub play_count: i64,
    pub emoji: Option<String>,
    pub image_blob_id: Option<String>,
    /// Baseline volume applied for every listener, set at upload time
    pub global_volume: f32,
    pub created_at: DateTime<Utc>,
}

/// A user's personal playback preference for one sound on one board
#[derive(Debug, Clone, Serialize)]
pub struct SoundPreferenceData {
    pub sound_id: PrimaryKey,
    pub volume: f32,
    pub favorite: bool,
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewBoard {
    pub slug: String,
    pub invite_code: String,
    pub name: String,
    /// The creator of the new board, installed as its first admin member
    pub created_by: PrimaryKey,
    pub settings: BoardSettings,
}

#[derive(Debug)]
pub struct NewBoardMember {
    pub board_id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub admin: bool,
}

#[derive(Debug)]
pub struct NewPendingRequest {
    pub board_id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub message: Option<String>,
}

/// A partial update of board settings. `None` fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct SettingsPatch {
    pub max_sounds: Option<i32>,
    pub max_file_size_bytes: Option<i64>,
    pub allow_uploads: Option<bool>,
}

impl SettingsPatch {
    pub fn apply(&self, settings: &BoardSettings) -> BoardSettings {
        BoardSettings {
            max_sounds: self.max_sounds.unwrap_or(settings.max_sounds),
            max_file_size_bytes: self
                .max_file_size_bytes
                .unwrap_or(settings.max_file_size_bytes),
            allow_uploads: self.allow_uploads.unwrap_or(settings.allow_uploads),
        }
    }
}

#[derive(Debug)]
pub struct NewSound {
    pub board_id: PrimaryKey,
    pub name: String,
    pub blob_id: String,
    pub filename: String,
    pub mime_type: String,
    pub file_size: i64,
    pub duration: f32,
    pub uploaded_by: PrimaryKey,
    pub emoji: Option<String>,
    pub image_blob_id: Option<String>,
    pub global_volume: f32,
}

#[derive(Debug)]
pub struct UpdatedSound {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub global_volume: Option<f32>,
}

/// A partial update of a sound preference. `None` fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct PreferencePatch {
    pub volume: Option<f32>,
    pub favorite: Option<bool>,
}
