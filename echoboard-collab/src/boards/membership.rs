use log::warn;

use crate::{
    BoardData, CollabContext, DatabaseError, NewPendingRequest, PendingRequestData, PrimaryKey,
    SettingsPatch,
};

use super::BoardError;

/// The sole arbiter of who may act on a board.
///
/// Every check reads the live board state. Role claims supplied by callers
/// are never trusted, and the denormalized `board_slugs` cache on users is
/// never consulted.
pub struct Membership {
    context: CollabContext,
}

impl Membership {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn is_member(
        &self,
        board_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<bool, DatabaseError> {
        let board = self.context.database.board_by_id(board_id).await?;

        Ok(board.members.iter().any(|m| m.user.id == user_id))
    }

    pub async fn is_admin(
        &self,
        board_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<bool, DatabaseError> {
        let board = self.context.database.board_by_id(board_id).await?;

        Ok(board.members.iter().any(|m| m.user.id == user_id && m.admin))
    }

    /// Records a non-member's intent to join the board
    pub async fn add_pending_request(
        &self,
        board_id: PrimaryKey,
        user_id: PrimaryKey,
        message: Option<String>,
    ) -> Result<PendingRequestData, BoardError> {
        if self.is_member(board_id, user_id).await? {
            return Err(BoardError::AlreadyMember);
        }

        self.context
            .database
            .create_pending_request(NewPendingRequest {
                board_id,
                user_id,
                message,
            })
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    BoardError::DuplicateRequest
                } else {
                    e.into()
                }
            })
    }

    /// Resolves a pending request by adding the user as a member.
    /// Removal of the request and the membership grant are atomic.
    pub async fn approve(
        &self,
        board_id: PrimaryKey,
        actor_id: PrimaryKey,
        target_id: PrimaryKey,
    ) -> Result<(), BoardError> {
        let board = self.require_admin(board_id, actor_id).await?;

        self.context
            .database
            .resolve_pending_request(board_id, target_id, true)
            .await
            .map_err(|e| match e {
                e if e.is_not_found() => BoardError::RequestNotFound,
                e if e.is_conflict() => BoardError::AlreadyMember,
                e => e.into(),
            })?;

        // The slug cache is a read optimization, staleness is tolerated
        if let Err(e) = self
            .context
            .database
            .add_board_slug_to_user(target_id, &board.slug)
            .await
        {
            warn!(
                "Failed to update slug cache for user {} on board {}: {}",
                target_id, board.slug, e
            );
        }

        if let Err(e) = self.context.database.touch_board(board_id).await {
            warn!("Failed to touch board {}: {}", board_id, e);
        }

        Ok(())
    }

    /// Resolves a pending request without granting membership. A denied user
    /// is free to request access again.
    pub async fn deny(
        &self,
        board_id: PrimaryKey,
        actor_id: PrimaryKey,
        target_id: PrimaryKey,
    ) -> Result<(), BoardError> {
        self.require_admin(board_id, actor_id).await?;

        self.context
            .database
            .resolve_pending_request(board_id, target_id, false)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    BoardError::RequestNotFound
                } else {
                    e.into()
                }
            })
    }

    pub async fn update_settings(
        &self,
        board_id: PrimaryKey,
        actor_id: PrimaryKey,
        patch: SettingsPatch,
    ) -> Result<BoardData, BoardError> {
        self.require_admin(board_id, actor_id).await?;

        Ok(self
            .context
            .database
            .update_board_settings(board_id, patch)
            .await?)
    }

    async fn require_admin(
        &self,
        board_id: PrimaryKey,
        actor_id: PrimaryKey,
    ) -> Result<BoardData, BoardError> {
        let board = self.context.database.board_by_id(board_id).await?;

        let is_admin = board
            .members
            .iter()
            .any(|m| m.user.id == actor_id && m.admin);

        if !is_admin {
            return Err(BoardError::NotAuthorized);
        }

        Ok(board)
    }
}
