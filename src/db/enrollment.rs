use chrono::Utc;

use super::{CourseExt, DBClient};
use crate::models::{CourseEnrollment, EnrolledCourse, EnrolledStudent};

#[derive(Debug)]
pub enum EnrollOutcome {
    Enrolled(CourseEnrollment),
    CourseNotFound,
    AlreadyEnrolled,
    CourseFull,
}

pub trait EnrollmentExt {
    /// Active enrollments of a student with their course, in enrollment order.
    async fn get_student_enrollments(
        &self,
        student_id: i64,
    ) -> Result<Vec<EnrolledCourse>, sqlx::Error>;

    /// Active students of a course.
    async fn get_course_students(
        &self,
        course_id: i64,
    ) -> Result<Vec<EnrolledStudent>, sqlx::Error>;

    async fn count_active_enrollments(&self, course_id: i64) -> Result<i64, sqlx::Error>;

    async fn get_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<CourseEnrollment>, sqlx::Error>;

    async fn is_enrolled(&self, student_id: i64, course_id: i64) -> Result<bool, sqlx::Error>;

    /// Enroll a student into an active course with free capacity.
    ///
    /// A concurrent duplicate is caught by the unique (student, course) index
    /// and reported as `AlreadyEnrolled`.
    async fn enroll_student(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<EnrollOutcome, sqlx::Error>;
}

impl EnrollmentExt for DBClient {
    async fn get_student_enrollments(
        &self,
        student_id: i64,
    ) -> Result<Vec<EnrolledCourse>, sqlx::Error> {
        sqlx::query_as::<_, EnrolledCourse>(
            r#"
            SELECT c.id, c.name, c.description, c.level, c.teacher_id, c.start_date, c.end_date,
                   c.schedule, c.max_students, c.price, c.status,
                   e.id AS enrollment_id, e.enrolled_at, e.progress
            FROM course_enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.student_id = ? AND e.status = 'active'
            ORDER BY e.id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_course_students(
        &self,
        course_id: i64,
    ) -> Result<Vec<EnrolledStudent>, sqlx::Error> {
        sqlx::query_as::<_, EnrolledStudent>(
            r#"
            SELECT s.id, s.user_id, s.full_name, s.phone, s.date_of_birth, s.native_language,
                   s.chinese_level, s.emergency_contact, e.enrolled_at, e.progress
            FROM course_enrollments e
            JOIN student_profiles s ON s.id = e.student_id
            WHERE e.course_id = ? AND e.status = 'active'
            ORDER BY e.id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_active_enrollments(&self, course_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM course_enrollments WHERE course_id = ? AND status = 'active'"#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Option<CourseEnrollment>, sqlx::Error> {
        sqlx::query_as::<_, CourseEnrollment>(
            r#"
            SELECT id, student_id, course_id, enrolled_at, status, progress
            FROM course_enrollments WHERE student_id = ? AND course_id = ?
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn is_enrolled(&self, student_id: i64, course_id: i64) -> Result<bool, sqlx::Error> {
        Ok(self
            .get_enrollment(student_id, course_id)
            .await?
            .is_some_and(|enrollment| enrollment.status == "active"))
    }

    async fn enroll_student(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<EnrollOutcome, sqlx::Error> {
        let course = match self.get_course(course_id).await? {
            Some(course) if course.status == "active" => course,
            _ => return Ok(EnrollOutcome::CourseNotFound),
        };

        if self.get_enrollment(student_id, course_id).await?.is_some() {
            return Ok(EnrollOutcome::AlreadyEnrolled);
        }

        if self.count_active_enrollments(course_id).await? >= i64::from(course.max_students) {
            return Ok(EnrollOutcome::CourseFull);
        }

        let inserted = sqlx::query_as::<_, CourseEnrollment>(
            r#"
            INSERT INTO course_enrollments (student_id, course_id, enrolled_at)
            VALUES (?, ?, ?)
            RETURNING id, student_id, course_id, enrolled_at, status, progress
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(enrollment) => Ok(EnrollOutcome::Enrolled(enrollment)),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Ok(EnrollOutcome::AlreadyEnrolled)
            }
            Err(e) => Err(e),
        }
    }
}
