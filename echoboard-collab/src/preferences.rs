use thiserror::Error;

use crate::{
    CollabContext, DatabaseError, Membership, PreferencePatch, PrimaryKey, SoundPreferenceData,
    UserData,
};

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("You are not a member of this board")]
    NotMember,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// Per-user playback preferences: the personal volume and favorite flag a
/// member keeps for each sound on a board.
pub struct PreferenceManager {
    context: CollabContext,
    membership: Membership,
}

impl PreferenceManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            membership: Membership::new(context),
        }
    }

    /// All of the user's preferences on a board. Sounds without an entry
    /// fall back to full volume and no favorite.
    pub async fn for_board(
        &self,
        user: &UserData,
        board_id: PrimaryKey,
    ) -> Result<Vec<SoundPreferenceData>, PreferenceError> {
        if !self.membership.is_member(board_id, user.id).await? {
            return Err(PreferenceError::NotMember);
        }

        Ok(self
            .context
            .database
            .preferences_for_board(user.id, board_id)
            .await?)
    }

    /// Updates the user's preference for one sound
    pub async fn update(
        &self,
        user: &UserData,
        sound_id: PrimaryKey,
        patch: PreferencePatch,
    ) -> Result<SoundPreferenceData, PreferenceError> {
        let sound = self.context.database.sound_by_id(sound_id).await?;

        if !self.membership.is_member(sound.board_id, user.id).await? {
            return Err(PreferenceError::NotMember);
        }

        let patch = PreferencePatch {
            volume: patch.volume.map(|v| v.clamp(0.0, 1.0)),
            favorite: patch.favorite,
        };

        Ok(self
            .context
            .database
            .upsert_sound_preference(user.id, sound.board_id, sound_id, patch)
            .await?)
    }
}
