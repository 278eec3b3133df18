//! All schemas that are exposed from endpoints are defined here
//! along with the From<T> impls

use chrono::{DateTime, Utc};
use echoboard_collab::{
    BoardData, BoardMemberData, BoardSettings as CollabBoardSettings, PendingRequestData,
    SoundData, SoundPreferenceData, UserData,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    id: i32,
    username: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    id: i32,
    slug: String,
    name: String,
    created_by: User,
    members: Vec<BoardMember>,
    settings: BoardSettings,
    last_activity: DateTime<Utc>,
    /// Only present when the viewer is an admin of the board
    #[serde(skip_serializing_if = "Option::is_none")]
    invite_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    invite_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_requests: Option<Vec<PendingRequest>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BoardMember {
    id: i32,
    admin: bool,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    user: User,
    requested_at: DateTime<Utc>,
    message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardSettings {
    max_sounds: i32,
    max_file_size_bytes: i64,
    allow_uploads: bool,
}

/// What someone opening an invite link sees before they are a member
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitePreview {
    name: String,
    slug: String,
    member_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
    id: i32,
    board_id: i32,
    name: String,
    filename: String,
    mime_type: String,
    file_size: i64,
    /// Clip length in seconds
    duration: f32,
    uploaded_by: User,
    play_count: i64,
    emoji: Option<String>,
    has_image: bool,
    global_volume: f32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SoundPreference {
    sound_id: i32,
    volume: f32,
    favorite: bool,
}

impl Board {
    /// Serializes a board for a specific viewer. The invite code, invite
    /// link, and pending requests are admin-only.
    pub fn for_viewer(data: &BoardData, viewer_is_admin: bool, invite_link: String) -> Self {
        let (invite_code, invite_link, pending_requests) = if viewer_is_admin {
            (
                Some(data.invite_code.clone()),
                Some(invite_link),
                Some(data.pending_requests.to_serialized()),
            )
        } else {
            (None, None, None)
        };

        Self {
            id: data.id,
            slug: data.slug.clone(),
            name: data.name.clone(),
            created_by: data.created_by.to_serialized(),
            members: data.members.to_serialized(),
            settings: data.settings.to_serialized(),
            last_activity: data.last_activity,
            invite_code,
            invite_link,
            pending_requests,
        }
    }
}

impl InvitePreview {
    pub fn from_board(data: &BoardData) -> Self {
        Self {
            name: data.name.clone(),
            slug: data.slug.clone(),
            member_count: data.members.len(),
        }
    }
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

impl ToSerialized<BoardMember> for BoardMemberData {
    fn to_serialized(&self) -> BoardMember {
        BoardMember {
            id: self.id,
            admin: self.admin,
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<PendingRequest> for PendingRequestData {
    fn to_serialized(&self) -> PendingRequest {
        PendingRequest {
            user: self.user.to_serialized(),
            requested_at: self.requested_at,
            message: self.message.clone(),
        }
    }
}

impl ToSerialized<BoardSettings> for CollabBoardSettings {
    fn to_serialized(&self) -> BoardSettings {
        BoardSettings {
            max_sounds: self.max_sounds,
            max_file_size_bytes: self.max_file_size_bytes,
            allow_uploads: self.allow_uploads,
        }
    }
}

impl ToSerialized<Sound> for SoundData {
    fn to_serialized(&self) -> Sound {
        Sound {
            id: self.id,
            board_id: self.board_id,
            name: self.name.clone(),
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            file_size: self.file_size,
            duration: self.duration,
            uploaded_by: self.uploaded_by.to_serialized(),
            play_count: self.play_count,
            emoji: self.emoji.clone(),
            has_image: self.image_blob_id.is_some(),
            global_volume: self.global_volume,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<SoundPreference> for SoundPreferenceData {
    fn to_serialized(&self) -> SoundPreference {
        SoundPreference {
            sound_id: self.sound_id,
            volume: self.volume,
            favorite: self.favorite,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use echoboard_collab::{BoardSettings, PendingRequestData};

    use super::*;

    fn user(id: i32, username: &str) -> UserData {
        UserData {
            id,
            username: username.to_string(),
            board_slugs: vec![],
        }
    }

    fn board_data() -> BoardData {
        BoardData {
            id: 1,
            slug: "effects".to_string(),
            invite_code: "s3cr3tc0".to_string(),
            name: "Effects".to_string(),
            created_by: user(1, "ada"),
            members: vec![BoardMemberData {
                id: 1,
                admin: true,
                user: user(1, "ada"),
            }],
            pending_requests: vec![PendingRequestData {
                user: user(2, "grace"),
                requested_at: Utc::now(),
                message: None,
            }],
            settings: BoardSettings::default(),
            last_activity: Utc::now(),
        }
    }

    #[test]
    fn invite_and_pending_are_admin_only() {
        let data = board_data();
        let link = "http://localhost/invite/s3cr3tc0".to_string();

        let for_admin =
            serde_json::to_value(Board::for_viewer(&data, true, link.clone())).expect("serializes");
        let for_member =
            serde_json::to_value(Board::for_viewer(&data, false, link)).expect("serializes");

        assert_eq!(for_admin["inviteCode"], "s3cr3tc0");
        assert_eq!(for_admin["pendingRequests"].as_array().map(|x| x.len()), Some(1));

        assert!(for_member.get("inviteCode").is_none());
        assert!(for_member.get("inviteLink").is_none());
        assert!(for_member.get("pendingRequests").is_none());
        assert_eq!(for_member["slug"], "effects");
    }
}
