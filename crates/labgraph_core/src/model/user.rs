//! Users and teams referenced by projects.
//!
//! Identity is verified outside the core; `ActingUser` is what the identity
//! provider hands to every entry point. `UserRecord` and `TeamRecord` are the
//! document-side directory used to project ids back into summaries.

use crate::repo::document_store::DocumentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable user identifier issued by the identity provider.
pub type UserId = Uuid;

/// Verified identity of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: UserId,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl ActingUser {
    /// Active, non-privileged user.
    pub fn regular(id: UserId) -> Self {
        Self {
            id,
            is_superuser: false,
            is_active: true,
        }
    }

    pub fn superuser(id: UserId) -> Self {
        Self {
            id,
            is_superuser: true,
            is_active: true,
        }
    }
}

/// Directory record for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl UserRecord {
    pub fn new(username: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            full_name: full_name.into(),
            is_superuser: false,
            is_active: true,
        }
    }

    /// Identity the provider would issue for this record.
    pub fn acting(&self) -> ActingUser {
        ActingUser {
            id: self.id,
            is_superuser: self.is_superuser,
            is_active: self.is_active,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// User reference as shown in read models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
}

/// Directory record for one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: DocumentId,
    pub name: String,
    #[serde(default)]
    pub members: Vec<UserId>,
}

impl TeamRecord {
    pub fn new(name: impl Into<String>, members: Vec<UserId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            members,
        }
    }

    pub fn summary(&self) -> TeamSummary {
        TeamSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Team reference as shown in read models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub id: DocumentId,
    pub name: String,
}
