use std::str::FromStr;

use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub mod seed;

mod user;
pub use user::UserExt;

mod profile;
pub use profile::ProfileExt;

mod course;
pub use course::{CourseExt, NewLesson, NewMaterial};
#[cfg(test)]
pub use course::NewCourse;

mod enrollment;
pub use enrollment::{EnrollOutcome, EnrollmentExt};

mod leave;
pub use leave::{DecisionOutcome, LeaveDecision, LeaveExt};

mod speech;
pub use speech::{NewSpeechRecord, SpeechExt};

mod showcase;
pub use showcase::ShowcaseExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pub(crate) pool: Pool<Sqlite>,
}

impl DBClient {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        DBClient { pool }
    }

    /// Open (creating if needed) the database file named by `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        Ok(DBClient::new(pool))
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Private in-memory database with the schema applied.
    ///
    /// An in-memory SQLite database lives as long as its connection, so the
    /// pool is pinned to a single connection that is never recycled.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        let db = DBClient::new(pool);
        db.migrate().await.unwrap();
        db
    }
}
