use super::DBClient;
use crate::models::{StudentProfile, TeacherProfile};

/// Role profile lookups
pub trait ProfileExt {
    async fn get_student_profile_by_user(
        &self,
        user_id: i64,
    ) -> Result<Option<StudentProfile>, sqlx::Error>;

    async fn get_teacher_profile_by_user(
        &self,
        user_id: i64,
    ) -> Result<Option<TeacherProfile>, sqlx::Error>;

    async fn get_teachers(&self) -> Result<Vec<TeacherProfile>, sqlx::Error>;
}

impl ProfileExt for DBClient {
    async fn get_student_profile_by_user(
        &self,
        user_id: i64,
    ) -> Result<Option<StudentProfile>, sqlx::Error> {
        sqlx::query_as::<_, StudentProfile>(
            r#"
            SELECT id, user_id, full_name, phone, date_of_birth, native_language, chinese_level, emergency_contact
            FROM student_profiles WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_teacher_profile_by_user(
        &self,
        user_id: i64,
    ) -> Result<Option<TeacherProfile>, sqlx::Error> {
        sqlx::query_as::<_, TeacherProfile>(
            r#"
            SELECT id, user_id, full_name, phone, specialization, bio, experience_years, qualifications
            FROM teacher_profiles WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_teachers(&self) -> Result<Vec<TeacherProfile>, sqlx::Error> {
        sqlx::query_as::<_, TeacherProfile>(
            r#"
            SELECT id, user_id, full_name, phone, specialization, bio, experience_years, qualifications
            FROM teacher_profiles ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
