//! Document-side user and team directory.
//!
//! The identity provider stays external; these records exist so that ids
//! stored on projects and tasks can be projected back into summaries.

use crate::model::user::{TeamRecord, UserId, UserRecord};
use crate::repo::collection::Collection;
use crate::repo::document_store::{from_document, to_document, DocumentId, Filter};
use crate::repo::{StoreError, Stores};
use crate::service::error::{CoreError, CoreResult};
use log::info;

/// Registers and looks up users.
pub struct UserDirectory {
    stores: Stores,
}

impl UserDirectory {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Stores one user; usernames are unique.
    pub async fn register(&self, user: UserRecord) -> CoreResult<UserRecord> {
        let document = to_document(&user)?;
        match self
            .stores
            .documents()
            .insert(Collection::Users, document)
            .await
        {
            Ok(_) => {}
            Err(StoreError::UniqueConflict { .. }) => {
                return Err(CoreError::AlreadyExists {
                    entity: Collection::Users.entity_name(),
                    name: user.username,
                })
            }
            Err(err) => return Err(err.into()),
        }
        info!(
            "event=user_register module=directory status=ok id={} username={}",
            user.id, user.username
        );
        Ok(user)
    }

    pub async fn get(&self, id: UserId) -> CoreResult<Option<UserRecord>> {
        self.stores
            .documents()
            .get_by_id(Collection::Users, id)
            .await?
            .map(|document| from_document(document).map_err(CoreError::from))
            .transpose()
    }

    pub async fn find_by_username(&self, username: &str) -> CoreResult<Option<UserRecord>> {
        self.stores
            .documents()
            .find_one(Collection::Users, &Filter::new().eq("username", username))
            .await?
            .map(|document| from_document(document).map_err(CoreError::from))
            .transpose()
    }
}

/// Registers and looks up teams.
pub struct TeamDirectory {
    stores: Stores,
}

impl TeamDirectory {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Stores one team; team names are unique.
    pub async fn register(&self, team: TeamRecord) -> CoreResult<TeamRecord> {
        let document = to_document(&team)?;
        match self
            .stores
            .documents()
            .insert(Collection::Teams, document)
            .await
        {
            Ok(_) => {}
            Err(StoreError::UniqueConflict { .. }) => {
                return Err(CoreError::AlreadyExists {
                    entity: Collection::Teams.entity_name(),
                    name: team.name,
                })
            }
            Err(err) => return Err(err.into()),
        }
        info!(
            "event=team_register module=directory status=ok id={} name={}",
            team.id, team.name
        );
        Ok(team)
    }

    pub async fn get(&self, id: DocumentId) -> CoreResult<Option<TeamRecord>> {
        self.stores
            .documents()
            .get_by_id(Collection::Teams, id)
            .await?
            .map(|document| from_document(document).map_err(CoreError::from))
            .transpose()
    }
}
