//! Current-user lookup used to sign saved notes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NoteError, Result};

/// The signed-in user, as far as note authorship is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }

    /// Identity written into a note's `author` field
    pub fn display_identity(&self) -> &str {
        &self.email
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Result<User>;
}

/// Provider that always answers with the same user
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user: User,
}

impl StaticIdentity {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    /// Identity from an author string such as a CLI flag
    pub fn from_author(author: &str) -> Result<Self> {
        let author = author.trim();
        if author.is_empty() {
            return Err(NoteError::Identity("author must not be empty".to_string()));
        }
        Ok(Self::new(User::new(author, author)))
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<User> {
        Ok(self.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_identity() {
        let provider = StaticIdentity::new(User::new("42", "jane@example.com"));
        let user = provider.current_user().await.unwrap();
        assert_eq!(user.display_identity(), "jane@example.com");
    }

    #[test]
    fn test_from_author_rejects_blank() {
        assert!(matches!(
            StaticIdentity::from_author("   "),
            Err(NoteError::Identity(_))
        ));
        assert!(StaticIdentity::from_author("ops@example.com").is_ok());
    }
}
