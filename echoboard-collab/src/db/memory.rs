use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    BoardData, BoardMemberData, BoardSettings, Database, DatabaseError, NewBoard, NewBoardMember,
    NewPendingRequest, NewSession, NewSound, NewUser, PendingRequestData, PreferencePatch,
    PrimaryKey, Result, SessionData, SettingsPatch, SoundData, SoundPreferenceData, UpdatedSound,
    UserData,
};

/// An in-memory database implementation, used by the test suites
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    next_id: PrimaryKey,
    users: Vec<UserRow>,
    sessions: Vec<SessionRow>,
    boards: Vec<BoardRow>,
    members: Vec<MemberRow>,
    pending: Vec<PendingRow>,
    sounds: Vec<SoundRow>,
    preferences: Vec<PreferenceRow>,
}

#[derive(Debug)]
struct UserRow {
    id: PrimaryKey,
    username: String,
    board_slugs: Vec<String>,
}

#[derive(Debug)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    user_id: PrimaryKey,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct BoardRow {
    id: PrimaryKey,
    slug: String,
    invite_code: String,
    name: String,
    created_by: PrimaryKey,
    settings: BoardSettings,
    last_activity: DateTime<Utc>,
}

#[derive(Debug)]
struct MemberRow {
    id: PrimaryKey,
    board_id: PrimaryKey,
    user_id: PrimaryKey,
    admin: bool,
}

#[derive(Debug)]
struct PendingRow {
    board_id: PrimaryKey,
    user_id: PrimaryKey,
    message: Option<String>,
    requested_at: DateTime<Utc>,
}

#[derive(Debug)]
struct SoundRow {
    id: PrimaryKey,
    board_id: PrimaryKey,
    name: String,
    blob_id: String,
    filename: String,
    mime_type: String,
    file_size: i64,
    duration: f32,
    uploaded_by: PrimaryKey,
    play_count: i64,
    emoji: Option<String>,
    image_blob_id: Option<String>,
    global_volume: f32,
    created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct PreferenceRow {
    user_id: PrimaryKey,
    board_id: PrimaryKey,
    sound_id: PrimaryKey,
    volume: f32,
    favorite: bool,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Default::default()
    }
}

impl State {
    fn next_id(&mut self) -> PrimaryKey {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| UserData {
                id: u.id,
                username: u.username.clone(),
                board_slugs: u.board_slugs.clone(),
            })
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    fn board(&self, board_id: PrimaryKey) -> Result<BoardData> {
        let row = self
            .boards
            .iter()
            .find(|b| b.id == board_id)
            .ok_or(DatabaseError::NotFound {
                resource: "board",
                identifier: "id",
            })?;

        let members = self
            .members
            .iter()
            .filter(|m| m.board_id == board_id)
            .map(|m| {
                Ok(BoardMemberData {
                    id: m.id,
                    admin: m.admin,
                    user: self.user(m.user_id)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut pending: Vec<_> = self
            .pending
            .iter()
            .filter(|p| p.board_id == board_id)
            .collect();

        pending.sort_by_key(|p| p.requested_at);

        let pending_requests = pending
            .into_iter()
            .map(|p| {
                Ok(PendingRequestData {
                    user: self.user(p.user_id)?,
                    requested_at: p.requested_at,
                    message: p.message.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BoardData {
            id: row.id,
            slug: row.slug.clone(),
            invite_code: row.invite_code.clone(),
            name: row.name.clone(),
            created_by: self.user(row.created_by)?,
            members,
            pending_requests,
            settings: row.settings.clone(),
            last_activity: row.last_activity,
        })
    }

    fn sound(&self, sound_id: PrimaryKey) -> Result<SoundData> {
        let row = self
            .sounds
            .iter()
            .find(|s| s.id == sound_id)
            .ok_or(DatabaseError::NotFound {
                resource: "sound",
                identifier: "id",
            })?;

        Ok(SoundData {
            id: row.id,
            board_id: row.board_id,
            name: row.name.clone(),
            blob_id: row.blob_id.clone(),
            filename: row.filename.clone(),
            mime_type: row.mime_type.clone(),
            file_size: row.file_size,
            duration: row.duration,
            uploaded_by: self.user(row.uploaded_by)?,
            play_count: row.play_count,
            emoji: row.emoji.clone(),
            image_blob_id: row.image_blob_id.clone(),
            global_volume: row.global_volume,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.state.lock().user(user_id)
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        let state = self.state.lock();

        let user = state
            .users
            .iter()
            .find(|u| u.username == username)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "username",
            })?;

        state.user(user.id)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let mut state = self.state.lock();

        if state.users.iter().any(|u| u.username == new_user.username) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "username",
                value: new_user.username,
            });
        }

        let id = state.next_id();

        state.users.push(UserRow {
            id,
            username: new_user.username,
            board_slugs: vec![],
        });

        state.user(id)
    }

    async fn add_board_slug_to_user(&self, user_id: PrimaryKey, slug: &str) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            if !user.board_slugs.iter().any(|s| s == slug) {
                user.board_slugs.push(slug.to_string());
            }
        }

        Ok(())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let state = self.state.lock();

        let session = state
            .sessions
            .iter()
            .find(|s| s.token == token && s.expires_at > Utc::now())
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })?;

        Ok(SessionData {
            id: session.id,
            token: session.token.clone(),
            expires_at: session.expires_at,
            user: state.user(session.user_id)?,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let mut state = self.state.lock();

        if state.sessions.iter().any(|s| s.token == new_session.token) {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "token",
                value: new_session.token,
            });
        }

        // Ensure the user exists
        let user = state.user(new_session.user_id)?;
        let id = state.next_id();

        state.sessions.push(SessionRow {
            id,
            token: new_session.token.clone(),
            user_id: new_session.user_id,
            expires_at: new_session.expires_at,
        });

        Ok(SessionData {
            id,
            token: new_session.token,
            expires_at: new_session.expires_at,
            user,
        })
    }

    async fn board_by_id(&self, board_id: PrimaryKey) -> Result<BoardData> {
        self.state.lock().board(board_id)
    }

    async fn board_by_slug(&self, slug: &str) -> Result<BoardData> {
        let state = self.state.lock();

        let board = state
            .boards
            .iter()
            .find(|b| b.slug == slug)
            .ok_or(DatabaseError::NotFound {
                resource: "board",
                identifier: "slug",
            })?;

        state.board(board.id)
    }

    async fn board_by_invite_code(&self, code: &str) -> Result<BoardData> {
        let state = self.state.lock();

        let board = state
            .boards
            .iter()
            .find(|b| b.invite_code == code)
            .ok_or(DatabaseError::NotFound {
                resource: "board",
                identifier: "invite_code",
            })?;

        state.board(board.id)
    }

    async fn boards_for_user(&self, user_id: PrimaryKey) -> Result<Vec<BoardData>> {
        let state = self.state.lock();

        let mut boards = state
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| state.board(m.board_id))
            .collect::<Result<Vec<_>>>()?;

        boards.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));

        Ok(boards)
    }

    async fn create_board(&self, new_board: NewBoard) -> Result<BoardData> {
        let mut state = self.state.lock();

        if state.boards.iter().any(|b| b.slug == new_board.slug) {
            return Err(DatabaseError::Conflict {
                resource: "board",
                field: "slug",
                value: new_board.slug,
            });
        }

        if state
            .boards
            .iter()
            .any(|b| b.invite_code == new_board.invite_code)
        {
            return Err(DatabaseError::Conflict {
                resource: "board",
                field: "invite_code",
                value: new_board.invite_code,
            });
        }

        // Ensure the creator exists
        let _ = state.user(new_board.created_by)?;

        let board_id = state.next_id();
        let member_id = state.next_id();

        state.boards.push(BoardRow {
            id: board_id,
            slug: new_board.slug,
            invite_code: new_board.invite_code,
            name: new_board.name,
            created_by: new_board.created_by,
            settings: new_board.settings,
            last_activity: Utc::now(),
        });

        // The creator is always the first admin member
        state.members.push(MemberRow {
            id: member_id,
            board_id,
            user_id: new_board.created_by,
            admin: true,
        });

        state.board(board_id)
    }

    async fn update_board_settings(
        &self,
        board_id: PrimaryKey,
        patch: SettingsPatch,
    ) -> Result<BoardData> {
        let mut state = self.state.lock();

        let row = state
            .boards
            .iter_mut()
            .find(|b| b.id == board_id)
            .ok_or(DatabaseError::NotFound {
                resource: "board",
                identifier: "id",
            })?;

        row.settings = patch.apply(&row.settings);
        row.last_activity = Utc::now();

        state.board(board_id)
    }

    async fn touch_board(&self, board_id: PrimaryKey) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(row) = state.boards.iter_mut().find(|b| b.id == board_id) {
            row.last_activity = Utc::now();
        }

        Ok(())
    }

    async fn create_board_member(&self, new_member: NewBoardMember) -> Result<BoardMemberData> {
        let mut state = self.state.lock();

        if state
            .members
            .iter()
            .any(|m| m.board_id == new_member.board_id && m.user_id == new_member.user_id)
        {
            return Err(DatabaseError::Conflict {
                resource: "board member",
                field: "board:user",
                value: format!("{}:{}", new_member.board_id, new_member.user_id),
            });
        }

        let user = state.user(new_member.user_id)?;
        let id = state.next_id();

        state.members.push(MemberRow {
            id,
            board_id: new_member.board_id,
            user_id: new_member.user_id,
            admin: new_member.admin,
        });

        Ok(BoardMemberData {
            id,
            admin: new_member.admin,
            user,
        })
    }

    async fn create_pending_request(
        &self,
        new_request: NewPendingRequest,
    ) -> Result<PendingRequestData> {
        let mut state = self.state.lock();

        if state
            .pending
            .iter()
            .any(|p| p.board_id == new_request.board_id && p.user_id == new_request.user_id)
        {
            return Err(DatabaseError::Conflict {
                resource: "access request",
                field: "board:user",
                value: format!("{}:{}", new_request.board_id, new_request.user_id),
            });
        }

        let user = state.user(new_request.user_id)?;
        let requested_at = Utc::now();

        state.pending.push(PendingRow {
            board_id: new_request.board_id,
            user_id: new_request.user_id,
            message: new_request.message.clone(),
            requested_at,
        });

        Ok(PendingRequestData {
            user,
            requested_at,
            message: new_request.message,
        })
    }

    async fn resolve_pending_request(
        &self,
        board_id: PrimaryKey,
        user_id: PrimaryKey,
        promote: bool,
    ) -> Result<()> {
        let mut state = self.state.lock();

        let before = state.pending.len();
        state
            .pending
            .retain(|p| !(p.board_id == board_id && p.user_id == user_id));

        if state.pending.len() == before {
            return Err(DatabaseError::NotFound {
                resource: "access request",
                identifier: "board:user",
            });
        }

        if promote {
            if state
                .members
                .iter()
                .any(|m| m.board_id == board_id && m.user_id == user_id)
            {
                return Err(DatabaseError::Conflict {
                    resource: "board member",
                    field: "board:user",
                    value: format!("{}:{}", board_id, user_id),
                });
            }

            let id = state.next_id();
            state.members.push(MemberRow {
                id,
                board_id,
                user_id,
                admin: false,
            });
        }

        Ok(())
    }

    async fn sound_by_id(&self, sound_id: PrimaryKey) -> Result<SoundData> {
        self.state.lock().sound(sound_id)
    }

    async fn sounds_by_board(&self, board_id: PrimaryKey) -> Result<Vec<SoundData>> {
        let state = self.state.lock();

        let mut sounds = state
            .sounds
            .iter()
            .filter(|s| s.board_id == board_id)
            .map(|s| state.sound(s.id))
            .collect::<Result<Vec<_>>>()?;

        sounds.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(sounds)
    }

    async fn count_sounds(&self, board_id: PrimaryKey) -> Result<i64> {
        let state = self.state.lock();

        Ok(state.sounds.iter().filter(|s| s.board_id == board_id).count() as i64)
    }

    async fn create_sound(&self, new_sound: NewSound) -> Result<SoundData> {
        let mut state = self.state.lock();

        // Ensure the uploader exists
        let _ = state.user(new_sound.uploaded_by)?;
        let id = state.next_id();

        state.sounds.push(SoundRow {
            id,
            board_id: new_sound.board_id,
            name: new_sound.name,
            blob_id: new_sound.blob_id,
            filename: new_sound.filename,
            mime_type: new_sound.mime_type,
            file_size: new_sound.file_size,
            duration: new_sound.duration,
            uploaded_by: new_sound.uploaded_by,
            play_count: 0,
            emoji: new_sound.emoji,
            image_blob_id: new_sound.image_blob_id,
            global_volume: new_sound.global_volume,
            created_at: Utc::now(),
        });

        state.sound(id)
    }

    async fn update_sound(&self, updated_sound: UpdatedSound) -> Result<SoundData> {
        let mut state = self.state.lock();

        let row = state
            .sounds
            .iter_mut()
            .find(|s| s.id == updated_sound.id)
            .ok_or(DatabaseError::NotFound {
                resource: "sound",
                identifier: "id",
            })?;

        if let Some(name) = updated_sound.name {
            row.name = name;
        }

        if let Some(emoji) = updated_sound.emoji {
            row.emoji = Some(emoji);
        }

        if let Some(global_volume) = updated_sound.global_volume {
            row.global_volume = global_volume;
        }

        state.sound(updated_sound.id)
    }

    async fn delete_sound(&self, sound_id: PrimaryKey) -> Result<()> {
        let mut state = self.state.lock();

        let before = state.sounds.len();
        state.sounds.retain(|s| s.id != sound_id);

        if state.sounds.len() == before {
            return Err(DatabaseError::NotFound {
                resource: "sound",
                identifier: "id",
            });
        }

        state.preferences.retain(|p| p.sound_id != sound_id);

        Ok(())
    }

    async fn increment_play_count(&self, sound_id: PrimaryKey) -> Result<i64> {
        let mut state = self.state.lock();

        let row = state
            .sounds
            .iter_mut()
            .find(|s| s.id == sound_id)
            .ok_or(DatabaseError::NotFound {
                resource: "sound",
                identifier: "id",
            })?;

        row.play_count += 1;

        Ok(row.play_count)
    }

    async fn preferences_for_board(
        &self,
        user_id: PrimaryKey,
        board_id: PrimaryKey,
    ) -> Result<Vec<SoundPreferenceData>> {
        let state = self.state.lock();

        let preferences = state
            .preferences
            .iter()
            .filter(|p| p.user_id == user_id && p.board_id == board_id)
            .map(|p| SoundPreferenceData {
                sound_id: p.sound_id,
                volume: p.volume,
                favorite: p.favorite,
            })
            .collect();

        Ok(preferences)
    }

    async fn upsert_sound_preference(
        &self,
        user_id: PrimaryKey,
        board_id: PrimaryKey,
        sound_id: PrimaryKey,
        patch: PreferencePatch,
    ) -> Result<SoundPreferenceData> {
        let mut state = self.state.lock();

        let row = match state
            .preferences
            .iter_mut()
            .find(|p| p.user_id == user_id && p.sound_id == sound_id)
        {
            Some(row) => {
                if let Some(volume) = patch.volume {
                    row.volume = volume;
                }

                if let Some(favorite) = patch.favorite {
                    row.favorite = favorite;
                }

                row
            }
            None => {
                state.preferences.push(PreferenceRow {
                    user_id,
                    board_id,
                    sound_id,
                    volume: patch.volume.unwrap_or(1.0),
                    favorite: patch.favorite.unwrap_or(false),
                });

                state.preferences.last_mut().expect("row was just pushed")
            }
        };

        Ok(SoundPreferenceData {
            sound_id: row.sound_id,
            volume: row.volume,
            favorite: row.favorite,
        })
    }
}
