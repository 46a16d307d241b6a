use super::DBClient;
use crate::models::{User, UserRole};
use chrono::Utc;
use sqlx::{Executor, Sqlite};

/// User database operations trait
pub trait UserExt {
    /// Get single user by ID, username or email
    /// Returns Option - Some(user) if found, None if not found
    async fn get_user(
        &self,
        user_id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    /// All accounts in creation order
    async fn get_users(&self) -> Result<Vec<User>, sqlx::Error>;

    async fn count_users_by_role(&self, role: UserRole) -> Result<i64, sqlx::Error>;

    /// Create an account together with the profile its role needs.
    ///
    /// Students and teachers get a profile named `full_name`; admins get none.
    /// Both rows are written in one transaction, so a unique violation on
    /// username or email leaves nothing behind.
    async fn create_user_with_profile(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
        full_name: &str,
    ) -> Result<User, sqlx::Error>;

    async fn update_user_avatar(&self, user_id: i64, avatar: &str) -> Result<User, sqlx::Error>;
}

pub(crate) async fn insert_user<'e, E>(
    executor: E,
    username: &str,
    email: &str,
    password_hash: &str,
    role: UserRole,
) -> Result<User, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash, role, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, username, email, password_hash, role, avatar, created_at
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(Utc::now())
    .fetch_one(executor)
    .await
}

impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(
                r#"SELECT id, username, email, password_hash, role, avatar, created_at FROM users WHERE id = ?"#,
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(username) = username {
            user = sqlx::query_as::<_, User>(
                r#"SELECT id, username, email, password_hash, role, avatar, created_at FROM users WHERE username = ?"#,
            )
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(
                r#"SELECT id, username, email, password_hash, role, avatar, created_at FROM users WHERE email = ?"#,
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn get_users(&self) -> Result<Vec<User>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"SELECT id, username, email, password_hash, role, avatar, created_at FROM users ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn count_users_by_role(&self, role: UserRole) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users WHERE role = ?"#)
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn create_user_with_profile(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
        full_name: &str,
    ) -> Result<User, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let user = insert_user(&mut *tx, username, email, password_hash, role).await?;

        match role {
            UserRole::Student => {
                sqlx::query(r#"INSERT INTO student_profiles (user_id, full_name) VALUES (?, ?)"#)
                    .bind(user.id)
                    .bind(full_name)
                    .execute(&mut *tx)
                    .await?;
            }
            UserRole::Teacher => {
                sqlx::query(r#"INSERT INTO teacher_profiles (user_id, full_name) VALUES (?, ?)"#)
                    .bind(user.id)
                    .bind(full_name)
                    .execute(&mut *tx)
                    .await?;
            }
            UserRole::Admin => {}
        }

        tx.commit().await?;
        Ok(user)
    }

    async fn update_user_avatar(&self, user_id: i64, avatar: &str) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET avatar = ?
            WHERE id = ?
            RETURNING id, username, email, password_hash, role, avatar, created_at
            "#,
        )
        .bind(avatar)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProfileExt;

    #[tokio::test]
    async fn create_user_with_profile_writes_both_rows() {
        let db = DBClient::in_memory().await;
        let user = db
            .create_user_with_profile("mai", "mai@example.com", "hash", UserRole::Student, "Tran Mai")
            .await
            .unwrap();

        assert_eq!(user.role, UserRole::Student);
        assert_eq!(user.avatar, "default-avatar.png");
        let profile = db.get_student_profile_by_user(user.id).await.unwrap().unwrap();
        assert_eq!(profile.full_name, "Tran Mai");
        assert_eq!(profile.chinese_level, "HSK1");
        assert!(db.get_teacher_profile_by_user(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_leaves_no_rows() {
        let db = DBClient::in_memory().await;
        db.create_user_with_profile("a", "same@example.com", "hash", UserRole::Teacher, "A")
            .await
            .unwrap();

        let err = db
            .create_user_with_profile("b", "same@example.com", "hash", UserRole::Teacher, "B")
            .await
            .unwrap_err();
        match err {
            sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(db.get_user(None, Some("b"), None).await.unwrap().is_none());
        assert_eq!(db.count_users_by_role(UserRole::Teacher).await.unwrap(), 1);
        assert_eq!(db.get_teachers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lookup_by_each_key() {
        let db = DBClient::in_memory().await;
        let user = db
            .create_user_with_profile("root", "root@example.com", "hash", UserRole::Admin, "")
            .await
            .unwrap();

        let by_id = db.get_user(Some(user.id), None, None).await.unwrap().unwrap();
        let by_name = db.get_user(None, Some("root"), None).await.unwrap().unwrap();
        let by_email = db.get_user(None, None, Some("root@example.com")).await.unwrap().unwrap();
        assert_eq!(by_id.id, by_name.id);
        assert_eq!(by_name.id, by_email.id);
        assert!(db.get_user(None, None, None).await.unwrap().is_none());

        let updated = db.update_user_avatar(user.id, "/static/uploads/avatars/x.png").await.unwrap();
        assert_eq!(updated.avatar, "/static/uploads/avatars/x.png");
    }
}
