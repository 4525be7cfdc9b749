//! In-memory stores backing `AppState::fake()`. They enforce the same unique
//! constraints and ordering as the Postgres stores.
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, ProfileChanges, User},
    },
    db::{StoreError, UniqueField},
    karma::{
        repo::KarmaStore,
        repo_types::{KarmaEntry, NewKarmaEntry},
    },
};

#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<Vec<User>>,
    entries: Mutex<Vec<KarmaEntry>>,
}

fn in_range(t: OffsetDateTime, from: OffsetDateTime, until: OffsetDateTime) -> bool {
    t >= from && t < until
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.username.as_deref() == Some(username))
            .cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        if new.username.is_some() && users.iter().any(|u| u.username == new.username) {
            return Err(StoreError::Duplicate(UniqueField::Username));
        }
        let user = User {
            id: new.id,
            email: new.email,
            username: new.username,
            name: new.name,
            password_hash: new.password_hash,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        if changes.username.is_some()
            && users
                .iter()
                .any(|u| u.id != id && u.username == changes.username)
        {
            return Err(StoreError::Duplicate(UniqueField::Username));
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = Some(name);
        }
        if let Some(username) = changes.username {
            user.username = Some(username);
        }
        user.updated_at = changes.updated_at;
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl KarmaStore for InMemoryStore {
    async fn insert(&self, entry: NewKarmaEntry) -> Result<KarmaEntry, StoreError> {
        let entry = KarmaEntry {
            id: entry.id,
            user_id: entry.user_id,
            kind: entry.kind,
            points: entry.points,
            created_at: entry.created_at,
        };
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<KarmaEntry>, StoreError> {
        let entries = self.entries.lock().unwrap();
        let mut out: Vec<KarmaEntry> = entries
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn list_between(
        &self,
        user_id: Uuid,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<Vec<KarmaEntry>, StoreError> {
        let mut out = self.list_by_user(user_id).await?;
        out.retain(|e| in_range(e.created_at, from, until));
        Ok(out)
    }

    async fn delete_between(
        &self,
        user_id: Uuid,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.user_id == user_id && in_range(e.created_at, from, until)));
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, username: Option<&str>) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            email: email.into(),
            username: username.map(Into::into),
            name: None,
            password_hash: "hash".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn enforces_unique_email_and_username() {
        let store = InMemoryStore::default();
        store.create(new_user("a@x.io", Some("alpha"))).await.unwrap();
        store.create(new_user("b@x.io", None)).await.unwrap();
        store.create(new_user("c@x.io", None)).await.unwrap();

        assert!(matches!(
            store.create(new_user("a@x.io", None)).await,
            Err(StoreError::Duplicate(UniqueField::Email))
        ));
        assert!(matches!(
            store.create(new_user("d@x.io", Some("alpha"))).await,
            Err(StoreError::Duplicate(UniqueField::Username))
        ));
    }

    #[tokio::test]
    async fn update_profile_respects_username_owner() {
        let store = InMemoryStore::default();
        let a = store.create(new_user("a@x.io", Some("alpha"))).await.unwrap();
        let b = store.create(new_user("b@x.io", None)).await.unwrap();

        let clash = ProfileChanges {
            name: None,
            username: Some("alpha".into()),
            updated_at: OffsetDateTime::now_utc(),
        };
        assert!(matches!(
            store.update_profile(b.id, clash.clone()).await,
            Err(StoreError::Duplicate(UniqueField::Username))
        ));
        let same = store.update_profile(a.id, clash).await.unwrap().unwrap();
        assert_eq!(same.username.as_deref(), Some("alpha"));
    }

    #[tokio::test]
    async fn ranges_are_half_open() {
        use crate::karma::repo_types::KarmaType;
        use time::macros::datetime;

        let store = InMemoryStore::default();
        let user_id = Uuid::new_v4();
        let from = datetime!(2026-05-10 00:00:00 UTC);
        let until = datetime!(2026-05-10 12:00:00 UTC);
        for at in [from, until, from - time::Duration::nanoseconds(1)] {
            store
                .insert(NewKarmaEntry::new(user_id, KarmaType::Good, at))
                .await
                .unwrap();
        }

        let inside = store.list_between(user_id, from, until).await.unwrap();
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].created_at, from);

        assert_eq!(store.delete_between(user_id, from, until).await.unwrap(), 1);
        assert_eq!(store.list_by_user(user_id).await.unwrap().len(), 2);
    }
}
