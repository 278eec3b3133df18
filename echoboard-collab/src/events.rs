use chrono::Utc;
use serde::Serialize;

use crate::{PrimaryKey, SoundData};

/// Events delivered to the occupants of a board room
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum RoomEvent {
    /// A user joined the board's room
    UserJoined {
        board_id: PrimaryKey,
        username: String,
        timestamp: i64,
    },
    /// A user left the board's room
    UserLeft {
        board_id: PrimaryKey,
        username: String,
        timestamp: i64,
    },
    /// A sound should start playing for everyone in the room.
    /// `timestamp` is the server's wall clock at broadcast, in milliseconds.
    SoundPlaying {
        sound_id: PrimaryKey,
        played_by: String,
        timestamp: i64,
    },
    /// A new sound was uploaded to the board
    SoundUploaded {
        board_id: PrimaryKey,
        sound: SoundData,
        timestamp: i64,
    },
    /// A sound was removed from the board
    SoundDeleted {
        board_id: PrimaryKey,
        sound_id: PrimaryKey,
        timestamp: i64,
    },
}

/// The server's wall clock in milliseconds, as carried by [RoomEvent]s
pub fn timestamp_now() -> i64 {
    Utc::now().timestamp_millis()
}
