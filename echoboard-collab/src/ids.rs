use std::sync::Arc;

use thiserror::Error;

use crate::{util::random_string, Database, DatabaseError};

pub const INVITE_CODE_LENGTH: usize = 8;

/// How often invite code generation may collide before giving up
const MAX_INVITE_ATTEMPTS: usize = 100;

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("No free identifier after {0} attempts")]
    Exhausted(usize),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// Turns a board name into a URL-safe slug candidate.
///
/// Lowercases and trims the name, strips anything that isn't a word
/// character, whitespace, or a hyphen, and collapses separator runs into
/// single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }

            pending_hyphen = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_hyphen = true;
        }
    }

    slug
}

/// Produces collision-free slugs and invite codes for boards.
///
/// The checks here are not transactional, so two concurrent creations can
/// still race for the same candidate. [crate::BoardManager] relies on the
/// database's uniqueness constraints and retries with fresh candidates when
/// an insert reports a conflict.
pub struct IdAllocator {
    database: Arc<dyn Database>,
}

impl IdAllocator {
    pub fn new(database: &Arc<dyn Database>) -> Self {
        Self {
            database: database.clone(),
        }
    }

    /// Returns the first free slug derived from the name: `base`, `base-2`,
    /// `base-3`, and so on.
    pub async fn unique_slug(&self, name: &str) -> Result<String, DatabaseError> {
        let base = slugify(name);

        // Names with no usable characters still need a slug
        let base = if base.is_empty() {
            "board".to_string()
        } else {
            base
        };

        let mut candidate = base.clone();
        let mut counter = 2;

        loop {
            match self.database.board_by_slug(&candidate).await {
                Ok(_) => {
                    candidate = format!("{}-{}", base, counter);
                    counter += 1;
                }
                Err(e) if e.is_not_found() => return Ok(candidate),
                Err(e) => return Err(e),
            }
        }
    }

    /// Returns an invite code no existing board is using
    pub async fn unique_invite_code(&self) -> Result<String, AllocationError> {
        for _ in 0..MAX_INVITE_ATTEMPTS {
            let code = random_string(INVITE_CODE_LENGTH);

            match self.database.board_by_invite_code(&code).await {
                Ok(_) => continue,
                Err(e) if e.is_not_found() => return Ok(code),
                Err(e) => return Err(e.into()),
            }
        }

        Err(AllocationError::Exhausted(MAX_INVITE_ATTEMPTS))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::slugify;

    #[test]
    fn slugifies_plain_names() {
        assert_eq!(slugify("My Awesome Board"), "my-awesome-board");
    }

    #[test]
    fn strips_special_characters() {
        assert_eq!(slugify("Sound! Effects? (2024)"), "sound-effects-2024");
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(slugify("  lots __ of --- space  "), "lots-of-space");
    }

    #[test]
    fn drops_leading_and_trailing_hyphens() {
        assert_eq!(slugify("--edgy name--"), "edgy-name");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(slugify("!!!"), "");
    }
}
