use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, Error as SqlxError, PgPool, Row};

use crate::{
    BlobError, BlobStore, BoardData, BoardMemberData, BoardSettings, Database, DatabaseError,
    IntoDatabaseError, NewBoard, NewBoardMember, NewPendingRequest, NewSession, NewSound, NewUser,
    PendingRequestData, PreferencePatch, PrimaryKey, Result, SessionData, SettingsPatch,
    SoundData, SoundPreferenceData, UpdatedSound, UserData,
};

use crate::util::random_string;

/// A postgres database implementation for echoboard
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }

    /// The underlying connection pool, shared with [PgBlobStore]
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    async fn board_members(&self, board_id: PrimaryKey) -> Result<Vec<BoardMemberData>> {
        let rows = sqlx::query(
            "
            SELECT
                board_members.id AS member_id,
                board_members.admin,
                users.id AS user_id,
                users.username,
                users.board_slugs
            FROM board_members
                INNER JOIN users ON board_members.user_id = users.id
            WHERE board_id = $1",
        )
        .bind(board_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let members = rows
            .into_iter()
            .map(|r| BoardMemberData {
                id: r.get("member_id"),
                admin: r.get("admin"),
                user: UserData {
                    id: r.get("user_id"),
                    username: r.get("username"),
                    board_slugs: r.get("board_slugs"),
                },
            })
            .collect();

        Ok(members)
    }

    async fn pending_requests(&self, board_id: PrimaryKey) -> Result<Vec<PendingRequestData>> {
        let rows = sqlx::query(
            "
            SELECT
                requests.requested_at,
                requests.message,
                users.id AS user_id,
                users.username,
                users.board_slugs
            FROM board_pending_requests AS requests
                INNER JOIN users ON requests.user_id = users.id
            WHERE board_id = $1
            ORDER BY requested_at ASC",
        )
        .bind(board_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let requests = rows
            .into_iter()
            .map(|r| PendingRequestData {
                requested_at: r.get("requested_at"),
                message: r.get("message"),
                user: UserData {
                    id: r.get("user_id"),
                    username: r.get("username"),
                    board_slugs: r.get("board_slugs"),
                },
            })
            .collect();

        Ok(requests)
    }

    async fn assemble_board(&self, row: PgRow) -> Result<BoardData> {
        let board_id: PrimaryKey = row.get("id");

        let created_by = self.user_by_id(row.get("created_by")).await?;
        let members = self.board_members(board_id).await?;
        let pending_requests = self.pending_requests(board_id).await?;

        Ok(BoardData {
            id: board_id,
            slug: row.get("slug"),
            invite_code: row.get("invite_code"),
            name: row.get("name"),
            created_by,
            members,
            pending_requests,
            settings: BoardSettings {
                max_sounds: row.get("max_sounds"),
                max_file_size_bytes: row.get("max_file_size_bytes"),
                allow_uploads: row.get("allow_uploads"),
            },
            last_activity: row.get("last_activity"),
        })
    }
}

fn map_user(row: &PgRow) -> UserData {
    UserData {
        id: row.get("id"),
        username: row.get("username"),
        board_slugs: row.get("board_slugs"),
    }
}

fn map_sound(row: &PgRow) -> SoundData {
    SoundData {
        id: row.get("id"),
        board_id: row.get("board_id"),
        name: row.get("name"),
        blob_id: row.get("blob_id"),
        filename: row.get("filename"),
        mime_type: row.get("mime_type"),
        file_size: row.get("file_size"),
        duration: row.get("duration"),
        uploaded_by: UserData {
            id: row.get("uploader_id"),
            username: row.get("uploader_name"),
            board_slugs: row.get("uploader_slugs"),
        },
        play_count: row.get("play_count"),
        emoji: row.get("emoji"),
        image_blob_id: row.get("image_blob_id"),
        global_volume: row.get("global_volume"),
        created_at: row.get("created_at"),
    }
}

const SOUND_QUERY: &str = "
    SELECT
        sounds.*,
        users.id AS uploader_id,
        users.username AS uploader_name,
        users.board_slugs AS uploader_slugs
    FROM sounds
        INNER JOIN users ON sounds.uploaded_by = users.id";

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map(|r| map_user(&r))
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map(|r| map_user(&r))
            .map_err(|e| e.not_found_or("user", "username"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        sqlx::query("INSERT INTO users (username) VALUES ($1) RETURNING *")
            .bind(&new_user.username)
            .fetch_one(&self.pool)
            .await
            .map(|r| map_user(&r))
            .map_err(|e| unique_conflict(e, "user", "username", &new_user.username))
    }

    async fn add_board_slug_to_user(&self, user_id: PrimaryKey, slug: &str) -> Result<()> {
        sqlx::query(
            "UPDATE users SET board_slugs = array_append(board_slugs, $2)
             WHERE id = $1 AND NOT ($2 = ANY(board_slugs))",
        )
        .bind(user_id)
        .bind(slug)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let row = sqlx::query(
            "
            SELECT
                sessions.id AS session_id,
                sessions.token,
                sessions.expires_at,
                users.id,
                users.username,
                users.board_slugs
            FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
            WHERE token = $1 AND expires_at > now()",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("session", "token"))?;

        Ok(SessionData {
            id: row.get("session_id"),
            token: row.get("token"),
            expires_at: row.get("expires_at"),
            user: map_user(&row),
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let token: String = sqlx::query(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)
             RETURNING token",
        )
        .bind(&new_session.token)
        .bind(new_session.user_id)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "session", "token", &new_session.token))?
        .get("token");

        self.session_by_token(&token).await
    }

    async fn board_by_id(&self, board_id: PrimaryKey) -> Result<BoardData> {
        let row = sqlx::query("SELECT * FROM boards WHERE id = $1")
            .bind(board_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("board", "id"))?;

        self.assemble_board(row).await
    }

    async fn board_by_slug(&self, slug: &str) -> Result<BoardData> {
        let row = sqlx::query("SELECT * FROM boards WHERE slug = $1")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("board", "slug"))?;

        self.assemble_board(row).await
    }

    async fn board_by_invite_code(&self, code: &str) -> Result<BoardData> {
        let row = sqlx::query("SELECT * FROM boards WHERE invite_code = $1")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("board", "invite_code"))?;

        self.assemble_board(row).await
    }

    async fn boards_for_user(&self, user_id: PrimaryKey) -> Result<Vec<BoardData>> {
        let rows = sqlx::query(
            "
            SELECT boards.id FROM boards
                INNER JOIN board_members ON board_members.board_id = boards.id
            WHERE board_members.user_id = $1
            ORDER BY boards.last_activity DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let mut boards = Vec::with_capacity(rows.len());

        for row in rows {
            boards.push(self.board_by_id(row.get("id")).await?)
        }

        Ok(boards)
    }

    async fn create_board(&self, new_board: NewBoard) -> Result<BoardData> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let board_id: PrimaryKey = sqlx::query(
            "
            INSERT INTO boards (slug, invite_code, name, created_by,
                max_sounds, max_file_size_bytes, allow_uploads)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id",
        )
        .bind(&new_board.slug)
        .bind(&new_board.invite_code)
        .bind(&new_board.name)
        .bind(new_board.created_by)
        .bind(new_board.settings.max_sounds)
        .bind(new_board.settings.max_file_size_bytes)
        .bind(new_board.settings.allow_uploads)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| board_conflict(e, &new_board))?
        .get("id");

        // The creator is always the first admin member
        sqlx::query("INSERT INTO board_members (board_id, user_id, admin) VALUES ($1, $2, true)")
            .bind(board_id)
            .bind(new_board.created_by)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        self.board_by_id(board_id).await
    }

    async fn update_board_settings(
        &self,
        board_id: PrimaryKey,
        patch: SettingsPatch,
    ) -> Result<BoardData> {
        let board = self.board_by_id(board_id).await?;
        let settings = patch.apply(&board.settings);

        sqlx::query(
            "UPDATE boards SET
                max_sounds = $1,
                max_file_size_bytes = $2,
                allow_uploads = $3,
                last_activity = now()
            WHERE id = $4",
        )
        .bind(settings.max_sounds)
        .bind(settings.max_file_size_bytes)
        .bind(settings.allow_uploads)
        .bind(board_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.board_by_id(board_id).await
    }

    async fn touch_board(&self, board_id: PrimaryKey) -> Result<()> {
        sqlx::query("UPDATE boards SET last_activity = now() WHERE id = $1")
            .bind(board_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn create_board_member(&self, new_member: NewBoardMember) -> Result<BoardMemberData> {
        let member_id: PrimaryKey = sqlx::query(
            "INSERT INTO board_members (board_id, user_id, admin) VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(new_member.board_id)
        .bind(new_member.user_id)
        .bind(new_member.admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            unique_conflict(
                e,
                "board member",
                "board:user",
                &format!("{}:{}", new_member.board_id, new_member.user_id),
            )
        })?
        .get("id");

        let user = self.user_by_id(new_member.user_id).await?;

        Ok(BoardMemberData {
            id: member_id,
            admin: new_member.admin,
            user,
        })
    }

    async fn create_pending_request(
        &self,
        new_request: NewPendingRequest,
    ) -> Result<PendingRequestData> {
        let row = sqlx::query(
            "INSERT INTO board_pending_requests (board_id, user_id, message)
             VALUES ($1, $2, $3)
             RETURNING requested_at, message",
        )
        .bind(new_request.board_id)
        .bind(new_request.user_id)
        .bind(&new_request.message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            unique_conflict(
                e,
                "access request",
                "board:user",
                &format!("{}:{}", new_request.board_id, new_request.user_id),
            )
        })?;

        let user = self.user_by_id(new_request.user_id).await?;

        Ok(PendingRequestData {
            user,
            requested_at: row.get("requested_at"),
            message: row.get("message"),
        })
    }

    async fn resolve_pending_request(
        &self,
        board_id: PrimaryKey,
        user_id: PrimaryKey,
        promote: bool,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let removed = sqlx::query(
            "DELETE FROM board_pending_requests WHERE board_id = $1 AND user_id = $2",
        )
        .bind(board_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        if removed.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "access request",
                identifier: "board:user",
            });
        }

        if promote {
            sqlx::query("INSERT INTO board_members (board_id, user_id, admin) VALUES ($1, $2, false)")
                .bind(board_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    unique_conflict(
                        e,
                        "board member",
                        "board:user",
                        &format!("{}:{}", board_id, user_id),
                    )
                })?;
        }

        tx.commit().await.map_err(|e| e.any())
    }

    async fn sound_by_id(&self, sound_id: PrimaryKey) -> Result<SoundData> {
        sqlx::query(&format!("{} WHERE sounds.id = $1", SOUND_QUERY))
            .bind(sound_id)
            .fetch_one(&self.pool)
            .await
            .map(|r| map_sound(&r))
            .map_err(|e| e.not_found_or("sound", "id"))
    }

    async fn sounds_by_board(&self, board_id: PrimaryKey) -> Result<Vec<SoundData>> {
        sqlx::query(&format!(
            "{} WHERE sounds.board_id = $1 ORDER BY sounds.created_at DESC",
            SOUND_QUERY
        ))
        .bind(board_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.iter().map(map_sound).collect())
        .map_err(|e| e.any())
    }

    async fn count_sounds(&self, board_id: PrimaryKey) -> Result<i64> {
        sqlx::query("SELECT count(*) AS amount FROM sounds WHERE board_id = $1")
            .bind(board_id)
            .fetch_one(&self.pool)
            .await
            .map(|r| r.get("amount"))
            .map_err(|e| e.any())
    }

    async fn create_sound(&self, new_sound: NewSound) -> Result<SoundData> {
        let sound_id: PrimaryKey = sqlx::query(
            "
            INSERT INTO sounds (board_id, name, blob_id, filename, mime_type,
                file_size, duration, uploaded_by, emoji, image_blob_id, global_volume)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id",
        )
        .bind(new_sound.board_id)
        .bind(&new_sound.name)
        .bind(&new_sound.blob_id)
        .bind(&new_sound.filename)
        .bind(&new_sound.mime_type)
        .bind(new_sound.file_size)
        .bind(new_sound.duration)
        .bind(new_sound.uploaded_by)
        .bind(&new_sound.emoji)
        .bind(&new_sound.image_blob_id)
        .bind(new_sound.global_volume)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .get("id");

        self.sound_by_id(sound_id).await
    }

    async fn update_sound(&self, updated_sound: UpdatedSound) -> Result<SoundData> {
        let sound = self.sound_by_id(updated_sound.id).await?;

        sqlx::query(
            "UPDATE sounds SET
                name = $1,
                emoji = $2,
                global_volume = $3
            WHERE id = $4",
        )
        .bind(updated_sound.name.unwrap_or(sound.name))
        .bind(updated_sound.emoji.or(sound.emoji))
        .bind(updated_sound.global_volume.unwrap_or(sound.global_volume))
        .bind(updated_sound.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.sound_by_id(updated_sound.id).await
    }

    async fn delete_sound(&self, sound_id: PrimaryKey) -> Result<()> {
        // Ensure the sound exists
        let _ = self.sound_by_id(sound_id).await?;

        sqlx::query("DELETE FROM sounds WHERE id = $1")
            .bind(sound_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn increment_play_count(&self, sound_id: PrimaryKey) -> Result<i64> {
        sqlx::query("UPDATE sounds SET play_count = play_count + 1 WHERE id = $1 RETURNING play_count")
            .bind(sound_id)
            .fetch_one(&self.pool)
            .await
            .map(|r| r.get("play_count"))
            .map_err(|e| e.not_found_or("sound", "id"))
    }

    async fn preferences_for_board(
        &self,
        user_id: PrimaryKey,
        board_id: PrimaryKey,
    ) -> Result<Vec<SoundPreferenceData>> {
        let rows = sqlx::query(
            "SELECT sound_id, volume, favorite FROM sound_preferences
             WHERE user_id = $1 AND board_id = $2",
        )
        .bind(user_id)
        .bind(board_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let preferences = rows
            .into_iter()
            .map(|r| SoundPreferenceData {
                sound_id: r.get("sound_id"),
                volume: r.get("volume"),
                favorite: r.get("favorite"),
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
        let row = sqlx::query(
            "
            INSERT INTO sound_preferences (user_id, board_id, sound_id, volume, favorite)
            VALUES ($1, $2, $3, COALESCE($4, 1.0), COALESCE($5, false))
            ON CONFLICT (user_id, sound_id) DO UPDATE SET
                volume = COALESCE($4, sound_preferences.volume),
                favorite = COALESCE($5, sound_preferences.favorite)
            RETURNING sound_id, volume, favorite",
        )
        .bind(user_id)
        .bind(board_id)
        .bind(sound_id)
        .bind(patch.volume)
        .bind(patch.favorite)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(SoundPreferenceData {
            sound_id: row.get("sound_id"),
            volume: row.get("volume"),
            favorite: row.get("favorite"),
        })
    }
}

/// Blob storage backed by the same postgres database as [PgDatabase]
pub struct PgBlobStore {
    pool: PgPool,
}

impl PgBlobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlobStore for PgBlobStore {
    async fn put(&self, bytes: Vec<u8>) -> std::result::Result<String, BlobError> {
        let blob_id = random_string(24);

        sqlx::query("INSERT INTO blobs (id, bytes) VALUES ($1, $2)")
            .bind(&blob_id)
            .bind(&bytes)
            .execute(&self.pool)
            .await
            .map_err(|e| BlobError::Internal(Box::new(e)))?;

        Ok(blob_id)
    }

    async fn get(&self, blob_id: &str) -> std::result::Result<Vec<u8>, BlobError> {
        let row = sqlx::query("SELECT bytes FROM blobs WHERE id = $1")
            .bind(blob_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                SqlxError::RowNotFound => BlobError::NotFound(blob_id.to_string()),
                e => BlobError::Internal(Box::new(e)),
            })?;

        Ok(row.get("bytes"))
    }

    async fn delete(&self, blob_id: &str) -> std::result::Result<(), BlobError> {
        let result = sqlx::query("DELETE FROM blobs WHERE id = $1")
            .bind(blob_id)
            .execute(&self.pool)
            .await
            .map_err(|e| BlobError::Internal(Box::new(e)))?;

        if result.rows_affected() == 0 {
            return Err(BlobError::NotFound(blob_id.to_string()));
        }

        Ok(())
    }
}

fn unique_conflict(
    e: SqlxError,
    resource: &'static str,
    field: &'static str,
    value: &str,
) -> DatabaseError {
    match &e {
        SqlxError::Database(db) if db.code().as_deref() == Some("23505") => {
            DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }
        }
        _ => e.any(),
    }
}

fn board_conflict(e: SqlxError, new_board: &NewBoard) -> DatabaseError {
    if let SqlxError::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return match db.constraint() {
                Some("boards_invite_code_key") => DatabaseError::Conflict {
                    resource: "board",
                    field: "invite_code",
                    value: new_board.invite_code.clone(),
                },
                _ => DatabaseError::Conflict {
                    resource: "board",
                    field: "slug",
                    value: new_board.slug.clone(),
                },
            };
        }
    }

    e.any()
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
