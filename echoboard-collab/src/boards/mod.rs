mod membership;

pub use membership::*;

use log::{info, warn};
use thiserror::Error;

use crate::{
    AllocationError, BoardData, BoardSettings, CollabContext, DatabaseError, IdAllocator, NewBoard,
    PendingRequestData, PrimaryKey, SettingsPatch, UserData,
};

/// How often board creation may lose the uniqueness race before giving up
const MAX_CREATE_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("User is already a member of this board")]
    AlreadyMember,
    #[error("User already has a pending access request")]
    DuplicateRequest,
    #[error("Only board admins may do this")]
    NotAuthorized,
    #[error("Access request not found")]
    RequestNotFound,
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// User-facing board orchestration, composing the identifier allocator and
/// the membership store.
pub struct BoardManager {
    context: CollabContext,
    allocator: IdAllocator,
    membership: Membership,
}

impl BoardManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            allocator: IdAllocator::new(&context.database),
            membership: Membership::new(context),
        }
    }

    /// Creates a board with a unique slug and invite code. The creator is
    /// installed as the first admin member.
    ///
    /// Candidate identifiers are checked before the insert, but a concurrent
    /// creation can still claim them in between. The database's uniqueness
    /// constraints catch that, and the insert is retried with fresh
    /// candidates.
    pub async fn create_board(
        &self,
        name: &str,
        created_by: &UserData,
        settings: SettingsPatch,
    ) -> Result<BoardData, BoardError> {
        let settings = settings.apply(&BoardSettings::default());

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let slug = self.allocator.unique_slug(name).await?;
            let invite_code = self.allocator.unique_invite_code().await?;

            let result = self
                .context
                .database
                .create_board(NewBoard {
                    slug,
                    invite_code,
                    name: name.to_string(),
                    created_by: created_by.id,
                    settings: settings.clone(),
                })
                .await;

            match result {
                Ok(board) => {
                    // The slug cache is a read optimization, staleness is tolerated
                    if let Err(e) = self
                        .context
                        .database
                        .add_board_slug_to_user(created_by.id, &board.slug)
                        .await
                    {
                        warn!(
                            "Failed to update slug cache for user {} on board {}: {}",
                            created_by.username, board.slug, e
                        );
                    }

                    info!("Board {} created by {}", board.slug, created_by.username);

                    return Ok(board);
                }
                Err(e) if e.is_conflict() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AllocationError::Exhausted(MAX_CREATE_ATTEMPTS).into())
    }

    pub async fn board_by_id(&self, board_id: PrimaryKey) -> Result<BoardData, DatabaseError> {
        self.context.database.board_by_id(board_id).await
    }

    pub async fn board_by_slug(&self, slug: &str) -> Result<BoardData, DatabaseError> {
        self.context.database.board_by_slug(slug).await
    }

    pub async fn board_by_invite_code(&self, code: &str) -> Result<BoardData, DatabaseError> {
        self.context.database.board_by_invite_code(code).await
    }

    /// The authoritative membership listing for a user, most recently active
    /// first. The user's `board_slugs` cache is never a substitute for this.
    pub async fn boards_for_user(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<BoardData>, DatabaseError> {
        self.context.database.boards_for_user(user_id).await
    }

    /// The link shown to invitees, built from the configured base URL
    pub fn invite_link(&self, board: &BoardData) -> String {
        format!(
            "{}/invite/{}",
            self.context.config.invite_base_url.trim_end_matches('/'),
            board.invite_code
        )
    }

    pub async fn request_access(
        &self,
        board_id: PrimaryKey,
        user: &UserData,
        message: Option<String>,
    ) -> Result<PendingRequestData, BoardError> {
        let request = self
            .membership
            .add_pending_request(board_id, user.id, message)
            .await?;

        info!("{} requested access to board {}", user.username, board_id);

        Ok(request)
    }

    pub async fn approve_member(
        &self,
        board_id: PrimaryKey,
        actor_id: PrimaryKey,
        target_id: PrimaryKey,
    ) -> Result<(), BoardError> {
        self.membership.approve(board_id, actor_id, target_id).await
    }

    pub async fn deny_request(
        &self,
        board_id: PrimaryKey,
        actor_id: PrimaryKey,
        target_id: PrimaryKey,
    ) -> Result<(), BoardError> {
        self.membership.deny(board_id, actor_id, target_id).await
    }

    pub async fn update_settings(
        &self,
        board_id: PrimaryKey,
        actor_id: PrimaryKey,
        patch: SettingsPatch,
    ) -> Result<BoardData, BoardError> {
        self.membership
            .update_settings(board_id, actor_id, patch)
            .await
    }

    pub async fn is_member(
        &self,
        board_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<bool, DatabaseError> {
        self.membership.is_member(board_id, user_id).await
    }

    pub async fn is_admin(
        &self,
        board_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<bool, DatabaseError> {
        self.membership.is_admin(board_id, user_id).await
    }
}
