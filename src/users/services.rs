use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    error::UserError,
    pagination::PageRequest,
    repo::UserStore,
    repo_types::{now_millis, NewUser, User, UserChanges, UserPage, UserStatus},
};
use crate::{auth::password::hash_password, deadline::guarded};

const MAX_ID_ATTEMPTS: usize = 8;

/// Validated input of the create flow.
#[derive(Debug, Clone)]
pub struct NewUserInput {
    pub name: String,
    pub email: String,
    pub phonenumber: String,
    pub password: String,
    pub role: String,
}

/// User operations; every store call is raced against `timeout`.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    timeout: Duration,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn create(&self, input: NewUserInput) -> Result<User, UserError> {
        let existing = guarded(
            self.timeout,
            "find_by_email_or_phone",
            self.store
                .find_by_email_or_phone(&input.email, &input.phonenumber),
        )
        .await?;

        if let Some(found) = existing {
            if found.email == input.email {
                warn!(email = %input.email, "email already registered");
                return Err(UserError::EmailExists);
            }
            warn!(phonenumber = %input.phonenumber, "phonenumber already registered");
            return Err(UserError::PhoneExists);
        }

        let password_hash = hash_password(&input.password)?;
        let id = self.fresh_id().await?;
        let new_user = NewUser {
            id,
            name: input.name,
            email: input.email,
            phonenumber: input.phonenumber,
            password_hash,
            role: input.role,
            status: UserStatus::Active,
            created_at: now_millis(),
        };

        // The unique constraints still decide if a concurrent insert won the race.
        let user = guarded(self.timeout, "create", self.store.create(new_user)).await?;
        info!(user_id = %user.id, email = %user.email, "user created");
        Ok(user)
    }

    pub async fn list(&self, page: PageRequest) -> Result<UserPage, UserError> {
        guarded(
            self.timeout,
            "list",
            self.store.list(page.limit, page.offset()),
        )
        .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<User>, UserError> {
        guarded(self.timeout, "find_by_id", self.store.find_by_id(id)).await
    }

    pub async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, UserError> {
        let current = self.require(id).await?;
        if changes.is_empty() {
            return Ok(current);
        }
        let updated = guarded(
            self.timeout,
            "update",
            self.store.update(id, &changes, now_millis()),
        )
        .await?
        .ok_or(UserError::NotFound)?;
        info!(user_id = %id, "user updated");
        Ok(updated)
    }

    pub async fn change_password(&self, id: Uuid, new_password: &str) -> Result<String, UserError> {
        self.require(id).await?;
        let password_hash = hash_password(new_password)?;
        let changed = guarded(
            self.timeout,
            "update_password",
            self.store.update_password(id, &password_hash, now_millis()),
        )
        .await?;
        if !changed {
            return Err(UserError::NotFound);
        }
        info!(user_id = %id, "password updated");
        Ok(format!("Password updated for user {id}"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<String, UserError> {
        self.require(id).await?;
        let removed = guarded(self.timeout, "delete", self.store.delete(id)).await?;
        if !removed {
            return Err(UserError::NotFound);
        }
        info!(user_id = %id, "user deleted");
        Ok(format!("Success delete user with {id}"))
    }

    async fn require(&self, id: Uuid) -> Result<User, UserError> {
        self.get(id).await?.ok_or(UserError::NotFound)
    }

    async fn fresh_id(&self) -> Result<Uuid, UserError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = Uuid::new_v4();
            if !guarded(self.timeout, "id_exists", self.store.id_exists(id)).await? {
                return Ok(id);
            }
            debug!(%id, "generated id already taken");
        }
        Err(UserError::Internal(anyhow!(
            "no unused user id after {MAX_ID_ATTEMPTS} attempts"
        )))
    }
}
