use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use echoboard_collab::{Collab, PrimaryKey, RoomEvent, RoomHandle, UserData};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use log::info;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    context::ServerContext,
    serialized::{Sound, ToSerialized, User},
    Router,
};

/// What a connected client may ask the gateway to do
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
enum ClientCommand {
    /// Enter the board's room. Membership is re-validated by the server,
    /// the client's claims are never trusted.
    JoinBoard { board_id: PrimaryKey },
    /// Leave the current room, notifying the remaining occupants
    LeaveBoard,
    /// Play a sound for everyone in the current room. The server stamps the
    /// player and the timestamp.
    PlaySound { sound_id: PrimaryKey },
}

/// Everything the gateway can push to a connected client
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ServerEvent {
    /// The connection is now in the board's room
    JoinedBoard {
        board_id: i32,
        occupants: Vec<User>,
    },
    /// A user joined the board's room
    UserJoined {
        board_id: i32,
        username: String,
        timestamp: i64,
    },
    /// A user left the board's room
    UserLeft {
        board_id: i32,
        username: String,
        timestamp: i64,
    },
    /// A sound should start playing. `timestamp` is the server's wall clock
    /// at broadcast, receivers seek by however much time has passed.
    SoundPlaying {
        sound_id: i32,
        played_by: String,
        timestamp: i64,
    },
    /// A new sound was uploaded to the board
    SoundUploaded {
        board_id: i32,
        sound: Sound,
        timestamp: i64,
    },
    /// A sound was removed from the board
    SoundDeleted {
        board_id: i32,
        sound_id: i32,
        timestamp: i64,
    },
    /// Something went wrong. Always scoped to this connection only.
    Error { message: String },
}

impl From<RoomEvent> for ServerEvent {
    fn from(value: RoomEvent) -> Self {
        match value {
            RoomEvent::UserJoined {
                board_id,
                username,
                timestamp,
            } => Self::UserJoined {
                board_id,
                username,
                timestamp,
            },
            RoomEvent::UserLeft {
                board_id,
                username,
                timestamp,
            } => Self::UserLeft {
                board_id,
                username,
                timestamp,
            },
            RoomEvent::SoundPlaying {
                sound_id,
                played_by,
                timestamp,
            } => Self::SoundPlaying {
                sound_id,
                played_by,
                timestamp,
            },
            RoomEvent::SoundUploaded {
                board_id,
                sound,
                timestamp,
            } => Self::SoundUploaded {
                board_id,
                sound: sound.to_serialized(),
                timestamp,
            },
            RoomEvent::SoundDeleted {
                board_id,
                sound_id,
                timestamp,
            } => Self::SoundDeleted {
                board_id,
                sound_id,
                timestamp,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GatewayParams {
    token: String,
}

#[utoipa::path(
    get,
    path = "/v1/gateway",
    tag = "gateway",
    responses(
        (
            status = 101,
            description = "A websocket connection carrying kebab-case tagged \
                JSON messages in both directions",
            body = ServerEvent
        )
    )
)]
async fn gateway(
    State(context): State<ServerContext>,
    Query(params): Query<GatewayParams>,
    ws: WebSocketUpgrade,
) -> Response {
    // The upgrade request can't carry an Authorization header from a
    // browser, so the token travels in the query string instead
    let session = match context.collab.auth.session(&params.token).await {
        Ok(session) => session,
        Err(_) => return (StatusCode::UNAUTHORIZED, "Session does not exist").into_response(),
    };

    ws.on_upgrade(move |socket| handle_connection(socket, context.collab.clone(), session.user))
}

/// Drives one client's gateway connection until it closes. The connection
/// is in zero or one room at a time, and dropping the room handle is what
/// leaves the room and notifies the remaining occupants.
async fn handle_connection(socket: WebSocket, collab: Arc<Collab>, user: UserData) {
    let (mut sender, mut receiver) = socket.split();
    let mut room: Option<RoomHandle> = None;

    info!("{} connected to the gateway", user.username);

    loop {
        tokio::select! {
            event = next_room_event(&mut room) => {
                if send_event(&mut sender, event.into()).await.is_err() {
                    break;
                }
            }
            message = receiver.next() => {
                let Some(Ok(message)) = message else { break };

                let text = match message {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };

                let command = match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(command) => command,
                    Err(_) => {
                        let error = ServerEvent::Error {
                            message: "Unrecognized message".to_string(),
                        };

                        if send_event(&mut sender, error).await.is_err() {
                            break;
                        }

                        continue;
                    }
                };

                let response = handle_command(command, &collab, &user, &mut room).await;

                if let Some(event) = response {
                    if send_event(&mut sender, event).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    info!("{} disconnected from the gateway", user.username);

    // An implicit disconnect leaves the room just like an explicit one
    drop(room);
}

/// Applies a client command, returning an event to send back to the caller
/// only. Room-wide effects arrive through the room handle.
async fn handle_command(
    command: ClientCommand,
    collab: &Arc<Collab>,
    user: &UserData,
    room: &mut Option<RoomHandle>,
) -> Option<ServerEvent> {
    match command {
        ClientCommand::JoinBoard { board_id } => {
            // Joining another board implicitly leaves the current room
            *room = None;

            match collab.rooms.join(board_id, user).await {
                Ok(handle) => {
                    let occupants = collab.rooms.occupants(board_id).to_serialized();

                    *room = Some(handle);

                    Some(ServerEvent::JoinedBoard {
                        board_id,
                        occupants,
                    })
                }
                Err(e) => Some(ServerEvent::Error {
                    message: e.to_string(),
                }),
            }
        }
        ClientCommand::LeaveBoard => {
            *room = None;
            None
        }
        ClientCommand::PlaySound { sound_id } => {
            let Some(handle) = room else {
                return Some(ServerEvent::Error {
                    message: "Join a board before playing sounds".to_string(),
                });
            };

            // The play event itself comes back through the room broadcast,
            // so a success needs no direct response
            match collab.sounds.play(sound_id, user, handle.board_id()).await {
                Ok(_) => None,
                Err(e) => Some(ServerEvent::Error {
                    message: e.to_string(),
                }),
            }
        }
    }
}

async fn next_room_event(room: &mut Option<RoomHandle>) -> RoomEvent {
    match room {
        Some(handle) => match handle.next().await {
            Some(event) => event,
            None => std::future::pending().await,
        },
        None => std::future::pending().await,
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: ServerEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(&event).expect("serializes properly");

    sender.send(Message::Text(json)).await
}

pub fn router() -> Router {
    Router::new().route("/", get(gateway))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_client_commands() {
        let join: ClientCommand =
            serde_json::from_str(r#"{"type": "join-board", "board_id": 4}"#).expect("parses");

        assert!(matches!(join, ClientCommand::JoinBoard { board_id: 4 }));

        let play: ClientCommand =
            serde_json::from_str(r#"{"type": "play-sound", "sound_id": 7}"#).expect("parses");

        assert!(matches!(play, ClientCommand::PlaySound { sound_id: 7 }));
    }

    #[test]
    fn play_events_serialize_with_timing() {
        let event = ServerEvent::SoundPlaying {
            sound_id: 7,
            played_by: "ada".to_string(),
            timestamp: 1_700_000_000_000,
        };

        let json = serde_json::to_value(&event).expect("serializes");

        assert_eq!(json["type"], "sound-playing");
        assert_eq!(json["sound_id"], 7);
        assert_eq!(json["played_by"], "ada");
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
    }

    #[test]
    fn errors_are_tagged() {
        let event = ServerEvent::Error {
            message: "nope".to_string(),
        };

        let json = serde_json::to_value(&event).expect("serializes");

        assert_eq!(json["type"], "error");
    }
}
