//! In-process `UserStore` used by the unit and router tests.

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    error::StoreError,
    repo::UserStore,
    repo_types::{NewUser, UniqueField, User, UserChanges, UserPage},
};

#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
    latency: Option<Duration>,
    write_latency: Option<Duration>,
    blind_lookup: bool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before touching the rows.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Only `update`, `update_password` and `delete` sleep this long, so the
    /// id lookup in front of them answers promptly.
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = Some(latency);
        self
    }

    /// The email/phone lookup never finds anything, as if a concurrent insert
    /// landed between lookup and insert. Only the constraint check remains.
    pub fn with_blind_lookup(mut self) -> Self {
        self.blind_lookup = true;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn pause_write(&self) {
        self.pause().await;
        if let Some(latency) = self.write_latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_unique(
        rows: &[User],
        skip: Option<Uuid>,
        email: &str,
        phonenumber: &str,
    ) -> Result<(), StoreError> {
        let mut others = rows.iter().filter(|u| Some(u.id) != skip);
        if others.clone().any(|u| u.email == email) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        if others.any(|u| u.phonenumber == phonenumber) {
            return Err(StoreError::Duplicate(UniqueField::Phone));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email_or_phone(
        &self,
        email: &str,
        phonenumber: &str,
    ) -> Result<Option<User>, StoreError> {
        self.pause().await;
        if self.blind_lookup {
            return Ok(None);
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|u| u.email == email)
            .or_else(|| rows.iter().find(|u| u.phonenumber == phonenumber))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.pause().await;
        Ok(self.get(id))
    }

    async fn id_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        self.pause().await;
        Ok(self.get(id).is_some())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<UserPage, StoreError> {
        self.pause().await;
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = rows.len() as i64;
        let rows = rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok(UserPage { total, rows })
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        self.pause().await;
        let mut rows = self.rows.lock().unwrap();
        Self::check_unique(&rows, None, &user.email, &user.phonenumber)?;
        let row = User {
            id: user.id,
            name: user.name,
            email: user.email,
            phonenumber: user.phonenumber,
            password: user.password_hash,
            role: user.role,
            status: user.status.as_str().to_string(),
            created_at: user.created_at,
            updated_at: user.created_at,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &UserChanges,
        updated_at: i64,
    ) -> Result<Option<User>, StoreError> {
        self.pause_write().await;
        let mut rows = self.rows.lock().unwrap();
        let Some(current) = rows.iter().find(|u| u.id == id).cloned() else {
            return Ok(None);
        };
        let email = changes.email.clone().unwrap_or(current.email);
        let phonenumber = changes.phonenumber.clone().unwrap_or(current.phonenumber);
        Self::check_unique(&rows, Some(id), &email, &phonenumber)?;

        let Some(row) = rows.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            row.name = name.clone();
        }
        if let Some(role) = &changes.role {
            row.role = role.clone();
        }
        row.email = email;
        row.phonenumber = phonenumber;
        row.updated_at = updated_at;
        Ok(Some(row.clone()))
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: i64,
    ) -> Result<bool, StoreError> {
        self.pause_write().await;
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|u| u.id == id) {
            Some(row) => {
                row.password = password_hash.to_string();
                row.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.pause_write().await;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(rows.len() < before)
    }
}
