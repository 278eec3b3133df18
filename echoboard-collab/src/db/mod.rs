use async_trait::async_trait;
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Represents a type that can fetch and mutate echoboard data in a database.
///
/// Uniqueness of usernames, board slugs, invite codes, board members, and
/// pending requests is enforced by the implementation itself, so callers can
/// rely on a [DatabaseError::Conflict] instead of checking first.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_username(&self, username: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    /// Appends a slug to a user's denormalized board list, ignoring duplicates
    async fn add_board_slug_to_user(&self, user_id: PrimaryKey, slug: &str) -> Result<()>;

    /// Returns the session only if it has not expired
    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;

    async fn board_by_id(&self, board_id: PrimaryKey) -> Result<BoardData>;
    async fn board_by_slug(&self, slug: &str) -> Result<BoardData>;
    async fn board_by_invite_code(&self, code: &str) -> Result<BoardData>;
    /// All boards where the user is a member, most recently active first
    async fn boards_for_user(&self, user_id: PrimaryKey) -> Result<Vec<BoardData>>;
    /// Creates the board and installs the creator as its first admin member
    async fn create_board(&self, new_board: NewBoard) -> Result<BoardData>;
    async fn update_board_settings(
        &self,
        board_id: PrimaryKey,
        patch: SettingsPatch,
    ) -> Result<BoardData>;
    /// Bumps the board's last activity timestamp
    async fn touch_board(&self, board_id: PrimaryKey) -> Result<()>;

    async fn create_board_member(&self, new_member: NewBoardMember) -> Result<BoardMemberData>;
    async fn create_pending_request(
        &self,
        new_request: NewPendingRequest,
    ) -> Result<PendingRequestData>;
    /// Removes the user's pending request, adding them as a member when
    /// `promote` is set. Removal and promotion happen atomically.
    async fn resolve_pending_request(
        &self,
        board_id: PrimaryKey,
        user_id: PrimaryKey,
        promote: bool,
    ) -> Result<()>;

    async fn sound_by_id(&self, sound_id: PrimaryKey) -> Result<SoundData>;
    /// All sounds on a board, newest first
    async fn sounds_by_board(&self, board_id: PrimaryKey) -> Result<Vec<SoundData>>;
    async fn count_sounds(&self, board_id: PrimaryKey) -> Result<i64>;
    async fn create_sound(&self, new_sound: NewSound) -> Result<SoundData>;
    async fn update_sound(&self, updated_sound: UpdatedSound) -> Result<SoundData>;
    async fn delete_sound(&self, sound_id: PrimaryKey) -> Result<()>;
    /// Returns the new play count
    async fn increment_play_count(&self, sound_id: PrimaryKey) -> Result<i64>;

    async fn preferences_for_board(
        &self,
        user_id: PrimaryKey,
        board_id: PrimaryKey,
    ) -> Result<Vec<SoundPreferenceData>>;
    async fn upsert_sound_preference(
        &self,
        user_id: PrimaryKey,
        board_id: PrimaryKey,
        sound_id: PrimaryKey,
        patch: PreferencePatch,
    ) -> Result<SoundPreferenceData>;
}
