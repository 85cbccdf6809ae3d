//! In-process [`UserStore`] used by tests.
//!
//! A transaction holds the table lock for its whole life and works on a
//! copy; commit swaps the copy in, drop throws it away.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repo::{StoreError, UserStore, UserTx};
use super::repo_types::{BannedRelation, NewUser, User};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    bans: Vec<BannedRelation>,
    last_user_id: i64,
    last_ban_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    broken: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent store call fail with a backend error.
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    /// Snapshot of a row regardless of its soft-delete state.
    pub async fn raw_user(&self, id: i64) -> Option<User> {
        self.tables.lock().await.users.get(&id).cloned()
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
    broken: Arc<AtomicBool>,
}

impl MemoryTx {
    fn check(&self) -> Result<(), StoreError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!("injected store failure")));
        }
        Ok(())
    }

    fn active(&self, id: i64) -> Option<&User> {
        self.work.users.get(&id).filter(|u| u.deleted_at.is_none())
    }

    fn active_mut(&mut self, id: i64) -> Option<&mut User> {
        self.work
            .users
            .get_mut(&id)
            .filter(|u| u.deleted_at.is_none())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UserTx>, StoreError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!("injected store failure")));
        }
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            work,
            broken: self.broken.clone(),
        }))
    }
}

#[async_trait]
impl UserTx for MemoryTx {
    async fn insert_user(&mut self, user: NewUser) -> Result<User, StoreError> {
        self.check()?;
        if self.work.users.values().any(|u| u.login == user.login) {
            return Err(StoreError::Conflict("login already taken".into()));
        }
        self.work.last_user_id += 1;
        let row = User {
            id: self.work.last_user_id,
            login: user.login,
            email: user.email,
            password_hash: user.password_hash,
            secret_word_hash: user.secret_word_hash,
            role: user.role,
            find_vision: true,
            add_friend: true,
            friends: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
            deleted_at: None,
        };
        self.work.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_active(&mut self, id: i64) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.active(id).cloned())
    }

    async fn find_active_by_login(&mut self, login: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self
            .work
            .users
            .values()
            .find(|u| u.deleted_at.is_none() && u.login == login)
            .cloned())
    }

    async fn search_login(
        &mut self,
        fragment: &str,
        visible_only: bool,
    ) -> Result<Vec<User>, StoreError> {
        self.check()?;
        Ok(self
            .work
            .users
            .values()
            .filter(|u| u.deleted_at.is_none())
            .filter(|u| u.login.contains(fragment))
            .filter(|u| !visible_only || u.find_vision)
            .cloned()
            .collect())
    }

    async fn list_active(&mut self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        self.check()?;
        Ok(self
            .work
            .users
            .values()
            .filter(|u| u.deleted_at.is_none())
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_active(&mut self) -> Result<i64, StoreError> {
        self.check()?;
        Ok(self
            .work
            .users
            .values()
            .filter(|u| u.deleted_at.is_none())
            .count() as i64)
    }

    async fn update_flags(
        &mut self,
        id: i64,
        find_vision: bool,
        add_friend: bool,
    ) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.active_mut(id).map(|u| {
            u.find_vision = find_vision;
            u.add_friend = add_friend;
            u.clone()
        }))
    }

    async fn soft_delete(&mut self, id: i64) -> Result<bool, StoreError> {
        self.check()?;
        Ok(match self.active_mut(id) {
            Some(u) => {
                u.deleted_at = Some(OffsetDateTime::now_utc());
                true
            }
            None => false,
        })
    }

    async fn add_friend(&mut self, user_id: i64, friend_id: i64) -> Result<(), StoreError> {
        self.check()?;
        if let Some(u) = self.active_mut(user_id) {
            if !u.friends.contains(&friend_id) {
                u.friends.push(friend_id);
            }
        }
        Ok(())
    }

    async fn remove_friend(&mut self, user_id: i64, friend_id: i64) -> Result<(), StoreError> {
        self.check()?;
        if let Some(u) = self.work.users.get_mut(&user_id) {
            u.friends.retain(|f| *f != friend_id);
        }
        Ok(())
    }

    async fn find_ban(
        &mut self,
        user_id: i64,
        banned_user_id: i64,
    ) -> Result<Option<BannedRelation>, StoreError> {
        self.check()?;
        Ok(self
            .work
            .bans
            .iter()
            .find(|b| {
                b.user_id == user_id && b.banned_user_id == banned_user_id && b.deleted_at.is_none()
            })
            .cloned())
    }

    async fn upsert_ban(&mut self, user_id: i64, banned_user_id: i64) -> Result<(), StoreError> {
        self.check()?;
        if let Some(b) = self
            .work
            .bans
            .iter_mut()
            .find(|b| b.user_id == user_id && b.banned_user_id == banned_user_id)
        {
            b.deleted_at = None;
            return Ok(());
        }
        self.work.last_ban_id += 1;
        self.work.bans.push(BannedRelation {
            id: self.work.last_ban_id,
            user_id,
            banned_user_id,
            created_at: OffsetDateTime::now_utc(),
            deleted_at: None,
        });
        Ok(())
    }

    async fn lift_ban(&mut self, user_id: i64, banned_user_id: i64) -> Result<(), StoreError> {
        self.check()?;
        for b in self.work.bans.iter_mut().filter(|b| {
            b.user_id == user_id && b.banned_user_id == banned_user_id && b.deleted_at.is_none()
        }) {
            b.deleted_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.check()?;
        let MemoryTx {
            mut guard, work, ..
        } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::role::Role;

    fn new_user(login: &str) -> NewUser {
        NewUser {
            login: login.into(),
            email: format!("{login}@example.com"),
            password_hash: "h".into(),
            secret_word_hash: "s".into(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn dropped_tx_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_user(new_user("ghost")).await.unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_active_by_login("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_tx_is_visible() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let u = tx.insert_user(new_user("alice")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.find_active(u.id).await.unwrap().unwrap().login, "alice");
    }

    #[tokio::test]
    async fn broken_store_fails_begin() {
        let store = MemoryStore::new();
        store.set_broken(true);
        assert!(matches!(store.begin().await, Err(StoreError::Backend(_))));
    }
}
