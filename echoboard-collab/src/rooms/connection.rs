use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::Stream;
use log::info;
use tokio::sync::mpsc;

use crate::{events::timestamp_now, CollabContext, PrimaryKey, RoomEvent, UserData};

use super::RoomConnectionId;

/// A handle to a user's presence in a room, yielding the events broadcast to
/// it. Dropping the handle leaves the room and notifies the remaining
/// occupants.
pub struct RoomHandle {
    board_id: PrimaryKey,
    connection_id: RoomConnectionId,
    user: UserData,
    receiver: mpsc::UnboundedReceiver<RoomEvent>,
    context: CollabContext,
}

impl RoomHandle {
    pub(crate) fn new(
        context: &CollabContext,
        board_id: PrimaryKey,
        connection_id: RoomConnectionId,
        user: UserData,
        receiver: mpsc::UnboundedReceiver<RoomEvent>,
    ) -> Self {
        Self {
            board_id,
            connection_id,
            user,
            receiver,
            context: context.clone(),
        }
    }

    pub fn board_id(&self) -> PrimaryKey {
        self.board_id
    }

    pub fn user(&self) -> &UserData {
        &self.user
    }
}

impl Stream for RoomHandle {
    type Item = RoomEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for RoomHandle {
    fn drop(&mut self) {
        let room = self
            .context
            .rooms
            .get(&self.board_id)
            .map(|r| r.value().clone());

        let Some(room) = room else { return };

        if let Some(user) = room.remove_connection(self.connection_id) {
            room.broadcast(RoomEvent::UserLeft {
                board_id: self.board_id,
                username: user.username.clone(),
                timestamp: timestamp_now(),
            });

            info!("{} left the room for board {}", user.username, self.board_id);
        }

        // Empty rooms are dropped from the registry
        self.context
            .rooms
            .remove_if(&self.board_id, |_, room| room.is_empty());
    }
}
