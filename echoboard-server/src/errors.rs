use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use echoboard_collab::{
    BlobError, BoardError, DatabaseError, PreferenceError, RoomError, SoundError,
};
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotAuthorized(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotAuthorized(_) => StatusCode::FORBIDDEN,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            e @ DatabaseError::Conflict { .. } => Self::Conflict(e.to_string()),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<BoardError> for ServerError {
    fn from(value: BoardError) -> Self {
        match value {
            e @ BoardError::AlreadyMember => Self::Conflict(e.to_string()),
            e @ BoardError::DuplicateRequest => Self::Conflict(e.to_string()),
            e @ BoardError::NotAuthorized => Self::NotAuthorized(e.to_string()),
            BoardError::RequestNotFound => Self::NotFound {
                resource: "pending request",
                identifier: "user",
            },
            BoardError::Allocation(e) => Self::Unknown(e.to_string()),
            BoardError::Db(e) => e.into(),
        }
    }
}

impl From<RoomError> for ServerError {
    fn from(value: RoomError) -> Self {
        match value {
            e @ RoomError::JoinDenied => Self::NotAuthorized(e.to_string()),
            RoomError::Db(e) => e.into(),
        }
    }
}

impl From<SoundError> for ServerError {
    fn from(value: SoundError) -> Self {
        match value {
            e @ SoundError::NotMember => Self::NotAuthorized(e.to_string()),
            e @ SoundError::NotAllowed => Self::NotAuthorized(e.to_string()),
            e @ SoundError::UploadsDisabled => Self::NotAuthorized(e.to_string()),
            e @ SoundError::FileTooLarge { .. } => Self::InvalidInput(e.to_string()),
            e @ SoundError::TooManySounds { .. } => Self::Conflict(e.to_string()),
            e @ SoundError::InvalidTrimRange => Self::InvalidInput(e.to_string()),
            e @ SoundError::TrimUnavailable => Self::InvalidInput(e.to_string()),
            e @ SoundError::WrongBoard => Self::InvalidInput(e.to_string()),
            SoundError::NoImage => Self::NotFound {
                resource: "image",
                identifier: "sound",
            },
            e @ SoundError::Trim(_) => Self::Unknown(e.to_string()),
            SoundError::Blob(e) => e.into(),
            SoundError::Db(e) => e.into(),
        }
    }
}

impl From<PreferenceError> for ServerError {
    fn from(value: PreferenceError) -> Self {
        match value {
            e @ PreferenceError::NotMember => Self::NotAuthorized(e.to_string()),
            PreferenceError::Db(e) => e.into(),
        }
    }
}

impl From<BlobError> for ServerError {
    fn from(value: BlobError) -> Self {
        match value {
            BlobError::NotFound(_) => Self::NotFound {
                resource: "blob",
                identifier: "id",
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}
