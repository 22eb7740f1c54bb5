use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::users::repo::{RepoResult, RepositoryError, UserRepository};
use crate::users::repo_types::{User, UserUpdate};

/// In-memory implementation of UserRepository (for development/testing).
/// Records are kept in insertion order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<Vec<User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_all(&self) -> RepoResult<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn insert(&self, user: &User) -> RepoResult<()> {
        // Check and push under one write lock.
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::DuplicateKey(user.email.clone()));
        }
        users.push(user.clone());
        tracing::debug!(email = %user.email, "inserted user");
        Ok(())
    }

    async fn update_existing(&self, email: &str, update: &UserUpdate) -> RepoResult<User> {
        let mut users = self.users.write().await;
        let slot = users
            .iter_mut()
            .find(|u| u.email == email)
            .ok_or_else(|| RepositoryError::NotFound(email.to_string()))?;
        update.apply_to(slot);
        Ok(slot.clone())
    }

    async fn delete_by_email(&self, email: &str) -> RepoResult<()> {
        let mut users = self.users.write().await;
        let idx = users
            .iter()
            .position(|u| u.email == email)
            .ok_or_else(|| RepositoryError::NotFound(email.to_string()))?;
        users.remove(idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str) -> User {
        User::new(name.into(), email.into(), "$argon2id$hash".into())
    }

    #[tokio::test]
    async fn insert_then_find() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&user("Jane", "jane@uni.edu")).await.unwrap();

        let found = repo.find_by_email("jane@uni.edu").await.unwrap().unwrap();
        assert_eq!(found.name, "Jane");
        assert!(repo.find_by_email("JANE@uni.edu").await.unwrap().is_none());
        assert!(repo.find_by_email("nobody@uni.edu").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_keeps_original() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&user("Jane", "jane@uni.edu")).await.unwrap();

        let err = repo.insert(&user("Impostor", "jane@uni.edu")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey(ref e) if e == "jane@uni.edu"));

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Jane");
    }

    #[tokio::test]
    async fn concurrent_inserts_first_writer_wins() {
        let repo = InMemoryUserRepository::new();
        let (first, second) = (user("A", "race@uni.edu"), user("B", "race@uni.edu"));
        let (a, b) = tokio::join!(repo.insert(&first), repo.insert(&second));
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_all_preserves_insertion_order() {
        let repo = InMemoryUserRepository::new();
        for (n, e) in [("C", "c@u.edu"), ("A", "a@u.edu"), ("B", "b@u.edu")] {
            repo.insert(&user(n, e)).await.unwrap();
        }
        let names: Vec<_> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, ["C", "A", "B"]);
    }

    #[tokio::test]
    async fn update_requires_existing() {
        let repo = InMemoryUserRepository::new();
        let rename = UserUpdate {
            name: Some("Y".into()),
            ..Default::default()
        };
        let err = repo.update_existing("x@u.edu", &rename).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
        assert!(repo.find_all().await.unwrap().is_empty());

        repo.insert(&user("X", "x@u.edu")).await.unwrap();
        let stored = repo.update_existing("x@u.edu", &rename).await.unwrap();
        assert_eq!(stored.name, "Y");
        assert_eq!(repo.find_by_email("x@u.edu").await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn disjoint_field_updates_both_persist() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&user("X", "x@u.edu")).await.unwrap();

        let password = UserUpdate {
            password_hash: Some("rehashed".into()),
            ..Default::default()
        };
        let image = UserUpdate {
            image_path: Some("images/1.gif".into()),
            ..Default::default()
        };
        let a = repo.update_existing("x@u.edu", &password);
        let b = repo.update_existing("x@u.edu", &image);
        let (a, b) = tokio::join!(a, b);
        a.unwrap();
        b.unwrap();

        let stored = repo.find_by_email("x@u.edu").await.unwrap().unwrap();
        assert_eq!(stored.name, "X");
        assert_eq!(stored.password_hash, "rehashed");
        assert_eq!(stored.image_path, "images/1.gif");
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&user("A", "a@u.edu")).await.unwrap();
        repo.insert(&user("B", "b@u.edu")).await.unwrap();

        repo.delete_by_email("a@u.edu").await.unwrap();
        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].email, "b@u.edu");

        let err = repo.delete_by_email("a@u.edu").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
