use super::DBClient;
use crate::models::{CampProgram, StudyAbroadCase};

/// Read side of the marketing pages.
pub trait ShowcaseExt {
    /// Study-abroad cases, newest first.
    async fn get_study_abroad_cases(
        &self,
        featured_only: bool,
        limit: Option<i64>,
    ) -> Result<Vec<StudyAbroadCase>, sqlx::Error>;

    async fn get_active_camp_programs(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<CampProgram>, sqlx::Error>;
}

impl ShowcaseExt for DBClient {
    async fn get_study_abroad_cases(
        &self,
        featured_only: bool,
        limit: Option<i64>,
    ) -> Result<Vec<StudyAbroadCase>, sqlx::Error> {
        sqlx::query_as::<_, StudyAbroadCase>(
            r#"
            SELECT id, student_name, student_country, original_background, target_university,
                   target_major, scholarship_amount, success_story, student_photo, testimonial,
                   created_at, is_featured
            FROM study_abroad_cases
            WHERE (? = 0 OR is_featured = 1)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(featured_only)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
    }

    async fn get_active_camp_programs(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<CampProgram>, sqlx::Error> {
        sqlx::query_as::<_, CampProgram>(
            r#"
            SELECT id, name, description, theme, duration, start_date, end_date, price,
                   max_participants, min_age, max_age, itinerary, includes, excludes, status,
                   featured_image
            FROM camp_programs
            WHERE status = 'active'
            ORDER BY start_date, id
            LIMIT ?
            "#,
        )
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
    }
}
