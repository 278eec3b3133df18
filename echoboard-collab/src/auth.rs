use std::sync::Arc;

use crate::{CollabContext, Database, DatabaseError, SessionData, UserData};

/// Resolves identities handed over by the external credential system.
///
/// Registration, password storage, and token issuance live outside of this
/// crate. All this does is turn a token into the user it belongs to.
pub struct Auth {
    database: Arc<dyn Database>,
}

impl Auth {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            database: context.database.clone(),
        }
    }

    /// Returns the session for a token, if it exists and hasn't expired
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        self.database.session_by_token(token).await
    }

    pub async fn user_by_username(&self, username: &str) -> Result<UserData, DatabaseError> {
        self.database.user_by_username(username).await
    }
}
