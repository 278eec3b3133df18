mod auth;
mod boards;
mod db;
mod events;
mod ids;
mod playback;
mod preferences;
mod rooms;
mod sounds;
mod storage;
mod util;

use std::sync::Arc;

use dashmap::DashMap;

pub use auth::*;
pub use boards::*;
pub use db::*;
pub use events::*;
pub use ids::*;
pub use playback::*;
pub use preferences::*;
pub use rooms::*;
pub use sounds::*;
pub use storage::*;

/// The echoboard collab system, facilitating boards, membership, rooms,
/// sounds, and synchronized playback.
pub struct Collab {
    pub auth: Auth,
    pub boards: BoardManager,
    pub rooms: RoomManager,
    pub sounds: SoundManager,
    pub preferences: PreferenceManager,
}

#[derive(Debug, Clone)]
pub struct CollabConfig {
    /// Base URL invite links are built from
    pub invite_base_url: String,
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            invite_base_url: "http://localhost:5173".to_string(),
        }
    }
}

/// A type passed to the components of the collab system, to access shared
/// state and collaborators.
#[derive(Clone)]
pub struct CollabContext {
    pub config: CollabConfig,

    pub database: Arc<dyn Database>,
    pub blobs: Arc<dyn BlobStore>,
    pub trimmer: Option<Arc<dyn AudioTrimmer>>,

    /// The registry of active rooms, keyed by board id. Owned by the collab
    /// system and only accessed through [RoomManager] and [RoomHandle].
    pub rooms: Arc<DashMap<PrimaryKey, Arc<Room>>>,
}

impl CollabContext {
    /// Delivers an event to everyone in the board's room, if it has one
    pub fn broadcast(&self, board_id: PrimaryKey, event: RoomEvent) {
        if let Some(room) = self.rooms.get(&board_id) {
            room.broadcast(event)
        }
    }
}

impl Collab {
    pub fn new(
        database: Arc<dyn Database>,
        blobs: Arc<dyn BlobStore>,
        trimmer: Option<Arc<dyn AudioTrimmer>>,
        config: CollabConfig,
    ) -> Self {
        let context = CollabContext {
            config,
            database,
            blobs,
            trimmer,
            rooms: Default::default(),
        };

        Self {
            auth: Auth::new(&context),
            boards: BoardManager::new(&context),
            rooms: RoomManager::new(&context),
            sounds: SoundManager::new(&context),
            preferences: PreferenceManager::new(&context),
        }
    }
}
