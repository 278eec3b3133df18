use log::{info, warn};
use thiserror::Error;
use tokio::spawn;

use crate::{
    events::timestamp_now, BlobError, BoardData, CollabContext, DatabaseError, Membership,
    NewSound, PrimaryKey, RoomEvent, SoundData, TrimError, UpdatedSound, UserData,
};

#[derive(Debug, Error)]
pub enum SoundError {
    #[error("You are not a member of this board")]
    NotMember,
    #[error("You do not have permission to modify this sound")]
    NotAllowed,
    #[error("Uploads are not allowed on this board")]
    UploadsDisabled,
    #[error("File size exceeds the limit of {limit} bytes")]
    FileTooLarge { limit: i64 },
    #[error("Board has reached the maximum of {limit} sounds")]
    TooManySounds { limit: i32 },
    #[error("Invalid trim range")]
    InvalidTrimRange,
    #[error("Audio trimming is not available")]
    TrimUnavailable,
    #[error("Sound does not belong to this board")]
    WrongBoard,
    #[error("Sound has no image")]
    NoImage,
    #[error(transparent)]
    Trim(#[from] TrimError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// A sound upload as it arrives from a client. `duration` is the client's
/// measurement of the clip and is replaced by the trimmer's result when a
/// trim range is given.
#[derive(Debug)]
pub struct NewSoundUpload {
    pub name: String,
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
    pub duration: f32,
    pub emoji: Option<String>,
    pub image: Option<Vec<u8>>,
    pub global_volume: f32,
    /// Start and end of the wanted range in seconds
    pub trim: Option<(f32, f32)>,
}

/// Manages the sounds on boards: uploads, edits, deletion, and play events.
pub struct SoundManager {
    context: CollabContext,
    membership: Membership,
}

impl SoundManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            membership: Membership::new(context),
        }
    }

    /// Stores a new sound on a board, enforcing the board's upload settings,
    /// and announces it to the room.
    pub async fn upload(
        &self,
        board_id: PrimaryKey,
        uploader: &UserData,
        upload: NewSoundUpload,
    ) -> Result<SoundData, SoundError> {
        let board = self.context.database.board_by_id(board_id).await?;

        if !self.membership.is_member(board_id, uploader.id).await? {
            return Err(SoundError::NotMember);
        }

        if !board.settings.allow_uploads {
            return Err(SoundError::UploadsDisabled);
        }

        if upload.bytes.len() as i64 > board.settings.max_file_size_bytes {
            return Err(SoundError::FileTooLarge {
                limit: board.settings.max_file_size_bytes,
            });
        }

        let amount = self.context.database.count_sounds(board_id).await?;

        if amount >= board.settings.max_sounds as i64 {
            return Err(SoundError::TooManySounds {
                limit: board.settings.max_sounds,
            });
        }

        let (bytes, duration) = match upload.trim {
            Some((start, end)) => {
                if start < 0.0 || end <= start || end > upload.duration {
                    return Err(SoundError::InvalidTrimRange);
                }

                let trimmer = self
                    .context
                    .trimmer
                    .as_ref()
                    .ok_or(SoundError::TrimUnavailable)?;

                let trimmed = trimmer
                    .trim(upload.bytes, &upload.mime_type, start, end)
                    .await?;

                (trimmed.bytes, trimmed.duration)
            }
            None => (upload.bytes, upload.duration),
        };

        let file_size = bytes.len() as i64;
        let blob_id = self.context.blobs.put(bytes).await?;

        let image_blob_id = match upload.image {
            Some(image) => Some(self.context.blobs.put(image).await?),
            None => None,
        };

        let sound = self
            .context
            .database
            .create_sound(NewSound {
                board_id,
                name: upload.name,
                blob_id,
                filename: upload.filename,
                mime_type: upload.mime_type,
                file_size,
                duration,
                uploaded_by: uploader.id,
                emoji: upload.emoji,
                image_blob_id,
                global_volume: upload.global_volume.clamp(0.0, 1.0),
            })
            .await?;

        if let Err(e) = self.context.database.touch_board(board_id).await {
            warn!("Failed to touch board {}: {}", board_id, e);
        }

        self.context.broadcast(
            board_id,
            RoomEvent::SoundUploaded {
                board_id,
                sound: sound.clone(),
                timestamp: timestamp_now(),
            },
        );

        info!(
            "Sound {} uploaded to board {} by {}",
            sound.name, board.slug, uploader.username
        );

        Ok(sound)
    }

    /// All sounds on the board, newest first. Members only.
    pub async fn sounds_on_board(
        &self,
        board_id: PrimaryKey,
        actor: &UserData,
    ) -> Result<Vec<SoundData>, SoundError> {
        if !self.membership.is_member(board_id, actor.id).await? {
            return Err(SoundError::NotMember);
        }

        Ok(self.context.database.sounds_by_board(board_id).await?)
    }

    /// Looks a sound up for a member of its board, used when serving the
    /// audio and image bytes
    pub async fn sound_for_member(
        &self,
        sound_id: PrimaryKey,
        actor: &UserData,
    ) -> Result<SoundData, SoundError> {
        let sound = self.context.database.sound_by_id(sound_id).await?;

        if !self.membership.is_member(sound.board_id, actor.id).await? {
            return Err(SoundError::NotMember);
        }

        Ok(sound)
    }

    /// The stored audio bytes of a sound
    pub async fn audio_bytes(&self, sound: &SoundData) -> Result<Vec<u8>, SoundError> {
        Ok(self.context.blobs.get(&sound.blob_id).await?)
    }

    /// The stored image bytes of a sound, if it has one
    pub async fn image_bytes(&self, sound: &SoundData) -> Result<Vec<u8>, SoundError> {
        let blob_id = sound.image_blob_id.as_ref().ok_or(SoundError::NoImage)?;

        Ok(self.context.blobs.get(blob_id).await?)
    }

    /// Updates a sound's metadata. Allowed for the uploader and board admins.
    pub async fn update(
        &self,
        sound_id: PrimaryKey,
        actor: &UserData,
        name: Option<String>,
        emoji: Option<String>,
        global_volume: Option<f32>,
    ) -> Result<SoundData, SoundError> {
        let (sound, _) = self.can_modify(sound_id, actor).await?;

        Ok(self
            .context
            .database
            .update_sound(UpdatedSound {
                id: sound.id,
                name,
                emoji,
                global_volume: global_volume.map(|v| v.clamp(0.0, 1.0)),
            })
            .await?)
    }

    /// Deletes a sound and its blobs, announcing the removal to the room.
    /// Allowed for the uploader and board admins.
    pub async fn delete(&self, sound_id: PrimaryKey, actor: &UserData) -> Result<(), SoundError> {
        let (sound, board) = self.can_modify(sound_id, actor).await?;

        if let Err(e) = self.context.blobs.delete(&sound.blob_id).await {
            warn!("Failed to delete blob for sound {}: {}", sound.id, e);
        }

        if let Some(image_blob_id) = &sound.image_blob_id {
            if let Err(e) = self.context.blobs.delete(image_blob_id).await {
                warn!("Failed to delete image blob for sound {}: {}", sound.id, e);
            }
        }

        self.context.database.delete_sound(sound_id).await?;

        self.context.broadcast(
            sound.board_id,
            RoomEvent::SoundDeleted {
                board_id: sound.board_id,
                sound_id,
                timestamp: timestamp_now(),
            },
        );

        info!(
            "Sound {} deleted from board {} by {}",
            sound.name, board.slug, actor.username
        );

        Ok(())
    }

    /// Broadcasts a play event to the board's room, stamped with the
    /// server's wall clock, and bumps the play count in the background.
    ///
    /// The caller's room membership was validated at join time, so the only
    /// check left is that the sound actually belongs to the joined board.
    pub async fn play(
        &self,
        sound_id: PrimaryKey,
        player: &UserData,
        board_id: PrimaryKey,
    ) -> Result<RoomEvent, SoundError> {
        let sound = self.context.database.sound_by_id(sound_id).await?;

        if sound.board_id != board_id {
            return Err(SoundError::WrongBoard);
        }

        let event = RoomEvent::SoundPlaying {
            sound_id,
            played_by: player.username.clone(),
            timestamp: timestamp_now(),
        };

        // Everyone in the room gets the event, including the initiator
        self.context.broadcast(board_id, event.clone());

        let database = self.context.database.clone();

        // The play count is not worth failing or delaying the broadcast for
        spawn(async move {
            if let Err(e) = database.increment_play_count(sound_id).await {
                warn!("Failed to increment play count for sound {}: {}", sound_id, e);
            }

            if let Err(e) = database.touch_board(board_id).await {
                warn!("Failed to touch board {}: {}", board_id, e);
            }
        });

        Ok(event)
    }

    async fn can_modify(
        &self,
        sound_id: PrimaryKey,
        actor: &UserData,
    ) -> Result<(SoundData, BoardData), SoundError> {
        let sound = self.context.database.sound_by_id(sound_id).await?;
        let board = self.context.database.board_by_id(sound.board_id).await?;

        let is_admin = board
            .members
            .iter()
            .any(|m| m.user.id == actor.id && m.admin);

        if sound.uploaded_by.id != actor.id && !is_admin {
            return Err(SoundError::NotAllowed);
        }

        Ok((sound, board))
    }
}
