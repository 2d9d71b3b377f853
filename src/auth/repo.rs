use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, Role, User};

/// Errors surfaced by a [`UserRepo`].
#[derive(Debug, Error)]
pub enum RepoError {
    /// Username or email collides with an existing row.
    #[error("username or email already registered")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Credential store used by the auth flows and the access guard.
///
/// Implementations must enforce username and email uniqueness atomically:
/// two racing `insert` calls for the same username yield one row and one
/// [`RepoError::Conflict`].
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> RepoResult<Option<User>>;

    async fn insert(&self, user: NewUser) -> RepoResult<User>;

    /// Returns `false` when no row has this id.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> RepoResult<bool>;

    async fn update_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>>;

    /// Hard delete. Returns the removed row, if there was one.
    async fn delete(&self, id: Uuid) -> RepoResult<Option<User>>;

    async fn list(&self) -> RepoResult<Vec<User>>;
}

/// PostgreSQL-backed store over the `users` table.
#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_write_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict,
        _ => RepoError::Database(e),
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, created_at
            FROM users
            WHERE username = $1 OR email = $2
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, role, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.db)
        .await
        .map_err(map_write_err)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> RepoResult<bool> {
        let res = sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE id = $1"#)
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET role = $2
            WHERE id = $1
            RETURNING id, username, email, password_hash, role, created_at
            "#,
        )
        .bind(id)
        .bind(role)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, username, email, password_hash, role, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, created_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use time::OffsetDateTime;

    use super::*;

    /// In-process store for tests. Uniqueness is checked and the row inserted
    /// under one lock.
    #[derive(Default)]
    pub struct MemoryUserRepo {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserRepo for MemoryUserRepo {
        async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.username == username).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.id == id).cloned())
        }

        async fn find_by_username_or_email(
            &self,
            username: &str,
            email: &str,
        ) -> RepoResult<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .find(|u| u.username == username || u.email == email)
                .cloned())
        }

        async fn insert(&self, user: NewUser) -> RepoResult<User> {
            let mut users = self.users.lock().unwrap();
            if users
                .iter()
                .any(|u| u.username == user.username || u.email == user.email)
            {
                return Err(RepoError::Conflict);
            }
            let row = User {
                id: Uuid::new_v4(),
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                role: user.role,
                created_at: OffsetDateTime::now_utc(),
            };
            users.push(row.clone());
            Ok(row)
        }

        async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> RepoResult<bool> {
            let mut users = self.users.lock().unwrap();
            match users.iter_mut().find(|u| u.id == id) {
                Some(u) => {
                    u.password_hash = password_hash.to_string();
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn update_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
            let mut users = self.users.lock().unwrap();
            Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
                u.role = role;
                u.clone()
            }))
        }

        async fn delete(&self, id: Uuid) -> RepoResult<Option<User>> {
            let mut users = self.users.lock().unwrap();
            let pos = users.iter().position(|u| u.id == id);
            Ok(pos.map(|i| users.remove(i)))
        }

        async fn list(&self) -> RepoResult<Vec<User>> {
            Ok(self.users.lock().unwrap().clone())
        }
    }

    mod tests {
        use super::*;

        fn new_user(username: &str, email: &str) -> NewUser {
            NewUser {
                username: username.into(),
                email: email.into(),
                password_hash: "$argon2id$stub".into(),
                role: Role::Member,
            }
        }

        #[tokio::test]
        async fn insert_rejects_duplicate_username_and_email() {
            let repo = MemoryUserRepo::default();
            repo.insert(new_user("alice", "alice@x.com")).await.unwrap();

            let dup_name = repo.insert(new_user("alice", "other@x.com")).await;
            assert!(matches!(dup_name, Err(RepoError::Conflict)));

            let dup_email = repo.insert(new_user("bob", "alice@x.com")).await;
            assert!(matches!(dup_email, Err(RepoError::Conflict)));

            assert_eq!(repo.list().await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn username_lookup_is_case_sensitive() {
            let repo = MemoryUserRepo::default();
            repo.insert(new_user("Alice", "alice@x.com")).await.unwrap();
            assert!(repo.find_by_username("alice").await.unwrap().is_none());
            assert!(repo.find_by_username("Alice").await.unwrap().is_some());
        }

        #[tokio::test]
        async fn update_and_delete_report_missing_rows() {
            let repo = MemoryUserRepo::default();
            let missing = Uuid::new_v4();
            assert!(!repo.update_password_hash(missing, "h").await.unwrap());
            assert!(repo.update_role(missing, Role::Admin).await.unwrap().is_none());
            assert!(repo.delete(missing).await.unwrap().is_none());

            let user = repo.insert(new_user("carol", "carol@x.com")).await.unwrap();
            let promoted = repo.update_role(user.id, Role::Admin).await.unwrap().unwrap();
            assert_eq!(promoted.role, Role::Admin);
            assert_eq!(promoted.password_hash, user.password_hash);

            let removed = repo.delete(user.id).await.unwrap().unwrap();
            assert_eq!(removed.username, "carol");
            assert!(repo.find_by_id(user.id).await.unwrap().is_none());
        }
    }
}

/// Run with `DATABASE_URL` pointing at a disposable PostgreSQL server and
/// `cargo test -- --ignored`.
#[cfg(test)]
mod pg_tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            role: Role::Member,
        }
    }

    #[sqlx::test]
    #[ignore]
    async fn unique_violations_become_conflict(pool: PgPool) {
        let repo = PgUserRepo::new(pool);
        let alice = repo.insert(new_user("alice", "alice@x.com")).await.unwrap();
        assert_eq!(alice.role, Role::Member);

        let same_name = repo.insert(new_user("alice", "other@x.com")).await;
        assert!(matches!(same_name, Err(RepoError::Conflict)));

        let same_email = repo.insert(new_user("bob", "alice@x.com")).await;
        assert!(matches!(same_email, Err(RepoError::Conflict)));

        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[sqlx::test]
    #[ignore]
    async fn racing_inserts_yield_one_row(pool: PgPool) {
        let repo = PgUserRepo::new(pool);
        let (a, b) = tokio::join!(
            repo.insert(new_user("carol", "carol@x.com")),
            repo.insert(new_user("carol", "carol2@x.com")),
        );
        let conflicts = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(RepoError::Conflict)))
            .count();
        assert_eq!(conflicts, 1);
        assert!(a.is_ok() || b.is_ok());
    }

    #[sqlx::test]
    #[ignore]
    async fn role_and_delete_roundtrip(pool: PgPool) {
        let repo = PgUserRepo::new(pool);
        let user = repo.insert(new_user("dave", "dave@x.com")).await.unwrap();

        let promoted = repo.update_role(user.id, Role::Admin).await.unwrap().unwrap();
        assert_eq!(promoted.role, Role::Admin);

        let removed = repo.delete(user.id).await.unwrap().unwrap();
        assert_eq!(removed.username, "dave");
        assert!(repo.find_by_id(user.id).await.unwrap().is_none());
        assert!(repo.delete(user.id).await.unwrap().is_none());
    }
}
