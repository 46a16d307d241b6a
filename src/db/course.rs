use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite};

use super::DBClient;
use crate::models::{Course, CourseMaterial, CourseWithTeacher, Lesson};

pub struct NewCourse<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub level: &'a str,
    pub teacher_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub schedule: Option<&'a str>,
    pub max_students: i32,
    pub price: Option<f64>,
}

pub struct NewLesson<'a> {
    pub course_id: i64,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub lesson_date: DateTime<Utc>,
    pub duration: i32,
    pub classroom: Option<&'a str>,
    pub online_link: Option<&'a str>,
}

pub struct NewMaterial<'a> {
    pub course_id: i64,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub file_path: &'a str,
    pub file_type: &'a str,
    pub is_public: bool,
}

/// Courses and everything hanging off them: lessons and materials.
pub trait CourseExt {
    /// Active courses with the teacher's name, oldest first.
    /// `limit = None` returns all of them.
    async fn get_active_courses(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<CourseWithTeacher>, sqlx::Error>;

    async fn get_course(&self, course_id: i64) -> Result<Option<Course>, sqlx::Error>;

    async fn get_teacher_courses(
        &self,
        teacher_id: i64,
        active_only: bool,
    ) -> Result<Vec<Course>, sqlx::Error>;

    async fn count_courses(&self, active_only: bool) -> Result<i64, sqlx::Error>;

    #[cfg(test)]
    async fn create_course(&self, course: &NewCourse<'_>) -> Result<Course, sqlx::Error>;

    async fn get_course_lessons(&self, course_id: i64) -> Result<Vec<Lesson>, sqlx::Error>;

    /// Every lesson of every course the student is actively enrolled in.
    async fn get_student_lessons(&self, student_id: i64) -> Result<Vec<Lesson>, sqlx::Error>;

    /// Scheduled lessons of one course at or after `from`, soonest first.
    async fn get_upcoming_lessons(
        &self,
        course_id: i64,
        from: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Lesson>, sqlx::Error>;

    /// Scheduled lessons of the teacher's active courses in `[start, end)`.
    async fn get_teacher_lessons_between(
        &self,
        teacher_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Lesson>, sqlx::Error>;

    async fn create_lesson(&self, lesson: &NewLesson<'_>) -> Result<Lesson, sqlx::Error>;

    async fn get_course_materials(
        &self,
        course_id: i64,
    ) -> Result<Vec<CourseMaterial>, sqlx::Error>;

    /// Public materials of the courses the student is actively enrolled in.
    async fn get_student_materials(
        &self,
        student_id: i64,
    ) -> Result<Vec<CourseMaterial>, sqlx::Error>;

    async fn create_material(
        &self,
        material: &NewMaterial<'_>,
    ) -> Result<CourseMaterial, sqlx::Error>;
}

pub(crate) async fn insert_course<'e, E>(
    executor: E,
    course: &NewCourse<'_>,
) -> Result<Course, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses (name, description, level, teacher_id, start_date, end_date, schedule, max_students, price)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, name, description, level, teacher_id, start_date, end_date, schedule, max_students, price, status
        "#,
    )
    .bind(course.name)
    .bind(course.description)
    .bind(course.level)
    .bind(course.teacher_id)
    .bind(course.start_date)
    .bind(course.end_date)
    .bind(course.schedule)
    .bind(course.max_students)
    .bind(course.price)
    .fetch_one(executor)
    .await
}

pub(crate) async fn insert_lesson<'e, E>(
    executor: E,
    lesson: &NewLesson<'_>,
) -> Result<Lesson, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Lesson>(
        r#"
        INSERT INTO lessons (course_id, title, description, lesson_date, duration, classroom, online_link)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id, course_id, title, description, lesson_date, duration, classroom, online_link, status
        "#,
    )
    .bind(lesson.course_id)
    .bind(lesson.title)
    .bind(lesson.description)
    .bind(lesson.lesson_date)
    .bind(lesson.duration)
    .bind(lesson.classroom)
    .bind(lesson.online_link)
    .fetch_one(executor)
    .await
}

pub(crate) async fn insert_material<'e, E>(
    executor: E,
    material: &NewMaterial<'_>,
) -> Result<CourseMaterial, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, CourseMaterial>(
        r#"
        INSERT INTO course_materials (course_id, title, description, file_path, file_type, uploaded_at, is_public)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id, course_id, title, description, file_path, file_type, uploaded_at, is_public
        "#,
    )
    .bind(material.course_id)
    .bind(material.title)
    .bind(material.description)
    .bind(material.file_path)
    .bind(material.file_type)
    .bind(Utc::now())
    .bind(material.is_public)
    .fetch_one(executor)
    .await
}

impl CourseExt for DBClient {
    async fn get_active_courses(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<CourseWithTeacher>, sqlx::Error> {
        sqlx::query_as::<_, CourseWithTeacher>(
            r#"
            SELECT c.id, c.name, c.description, c.level, c.teacher_id, c.start_date, c.end_date,
                   c.schedule, c.max_students, c.price, c.status, t.full_name AS teacher_name
            FROM courses c
            JOIN teacher_profiles t ON t.id = c.teacher_id
            WHERE c.status = 'active'
            ORDER BY c.id
            LIMIT ?
            "#,
        )
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
    }

    async fn get_course(&self, course_id: i64) -> Result<Option<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(
            r#"
            SELECT id, name, description, level, teacher_id, start_date, end_date, schedule, max_students, price, status
            FROM courses WHERE id = ?
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_teacher_courses(
        &self,
        teacher_id: i64,
        active_only: bool,
    ) -> Result<Vec<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(
            r#"
            SELECT id, name, description, level, teacher_id, start_date, end_date, schedule, max_students, price, status
            FROM courses
            WHERE teacher_id = ? AND (? = 0 OR status = 'active')
            ORDER BY id
            "#,
        )
        .bind(teacher_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_courses(&self, active_only: bool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM courses WHERE (? = 0 OR status = 'active')"#)
            .bind(active_only)
            .fetch_one(&self.pool)
            .await
    }

    #[cfg(test)]
    async fn create_course(&self, course: &NewCourse<'_>) -> Result<Course, sqlx::Error> {
        insert_course(&self.pool, course).await
    }

    async fn get_course_lessons(&self, course_id: i64) -> Result<Vec<Lesson>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(
            r#"
            SELECT id, course_id, title, description, lesson_date, duration, classroom, online_link, status
            FROM lessons WHERE course_id = ?
            ORDER BY lesson_date, id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_student_lessons(&self, student_id: i64) -> Result<Vec<Lesson>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(
            r#"
            SELECT l.id, l.course_id, l.title, l.description, l.lesson_date, l.duration,
                   l.classroom, l.online_link, l.status
            FROM lessons l
            JOIN course_enrollments e ON e.course_id = l.course_id
            WHERE e.student_id = ? AND e.status = 'active'
            ORDER BY l.lesson_date, l.id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_upcoming_lessons(
        &self,
        course_id: i64,
        from: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Lesson>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(
            r#"
            SELECT id, course_id, title, description, lesson_date, duration, classroom, online_link, status
            FROM lessons
            WHERE course_id = ? AND lesson_date >= ? AND status = 'scheduled'
            ORDER BY lesson_date, id
            LIMIT ?
            "#,
        )
        .bind(course_id)
        .bind(from)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_teacher_lessons_between(
        &self,
        teacher_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Lesson>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(
            r#"
            SELECT l.id, l.course_id, l.title, l.description, l.lesson_date, l.duration,
                   l.classroom, l.online_link, l.status
            FROM lessons l
            JOIN courses c ON c.id = l.course_id
            WHERE c.teacher_id = ? AND c.status = 'active'
              AND l.status = 'scheduled'
              AND l.lesson_date >= ? AND l.lesson_date < ?
            ORDER BY l.lesson_date, l.id
            "#,
        )
        .bind(teacher_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_lesson(&self, lesson: &NewLesson<'_>) -> Result<Lesson, sqlx::Error> {
        insert_lesson(&self.pool, lesson).await
    }

    async fn get_course_materials(
        &self,
        course_id: i64,
    ) -> Result<Vec<CourseMaterial>, sqlx::Error> {
        sqlx::query_as::<_, CourseMaterial>(
            r#"
            SELECT id, course_id, title, description, file_path, file_type, uploaded_at, is_public
            FROM course_materials WHERE course_id = ?
            ORDER BY uploaded_at DESC, id DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_student_materials(
        &self,
        student_id: i64,
    ) -> Result<Vec<CourseMaterial>, sqlx::Error> {
        sqlx::query_as::<_, CourseMaterial>(
            r#"
            SELECT m.id, m.course_id, m.title, m.description, m.file_path, m.file_type,
                   m.uploaded_at, m.is_public
            FROM course_materials m
            JOIN course_enrollments e ON e.course_id = m.course_id
            WHERE e.student_id = ? AND e.status = 'active' AND m.is_public = 1
            ORDER BY m.course_id, m.id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_material(
        &self,
        material: &NewMaterial<'_>,
    ) -> Result<CourseMaterial, sqlx::Error> {
        insert_material(&self.pool, material).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::EnrollmentExt;
    use crate::test_utils::{new_course, student, teacher};
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn active_courses_respect_limit_and_status() {
        let db = DBClient::in_memory().await;
        let (_, teacher) = teacher(&db, "wang").await;
        for _ in 0..4 {
            db.create_course(&new_course(teacher.id)).await.unwrap();
        }
        sqlx::query("UPDATE courses SET status = 'archived' WHERE id = 1")
            .execute(&db.pool)
            .await
            .unwrap();

        assert_eq!(db.get_active_courses(None).await.unwrap().len(), 3);
        let limited = db.get_active_courses(Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].teacher_name, teacher.full_name);
        assert_eq!(db.count_courses(false).await.unwrap(), 4);
        assert_eq!(db.count_courses(true).await.unwrap(), 3);
        assert_eq!(db.get_teacher_courses(teacher.id, true).await.unwrap().len(), 3);
        assert_eq!(db.get_teacher_courses(teacher.id, false).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn lessons_are_filtered_by_window() {
        let db = DBClient::in_memory().await;
        let (_, teacher) = teacher(&db, "li").await;
        let course = db.create_course(&new_course(teacher.id)).await.unwrap();
        let base = Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap();

        for offset in [0, 1, 2] {
            db.create_lesson(&NewLesson {
                course_id: course.id,
                title: "Lesson",
                description: None,
                lesson_date: base + Duration::days(offset),
                duration: 90,
                classroom: Some("B2"),
                online_link: None,
            })
            .await
            .unwrap();
        }

        let upcoming = db
            .get_upcoming_lessons(course.id, base + Duration::hours(1), 5)
            .await
            .unwrap();
        assert_eq!(upcoming.len(), 2);
        assert!(upcoming[0].lesson_date < upcoming[1].lesson_date);

        let day = db
            .get_teacher_lessons_between(teacher.id, base, base + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].lesson_date, base);
        assert_eq!(db.get_course_lessons(course.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn students_only_see_public_materials_of_their_courses() {
        let db = DBClient::in_memory().await;
        let (_, teacher) = teacher(&db, "zhao").await;
        let mine = db.create_course(&new_course(teacher.id)).await.unwrap();
        let other = db.create_course(&new_course(teacher.id)).await.unwrap();

        for (course_id, is_public) in [(mine.id, true), (mine.id, false), (other.id, true)] {
            db.create_material(&NewMaterial {
                course_id,
                title: "Handout",
                description: None,
                file_path: "/static/uploads/materials/a.pdf",
                file_type: "pdf",
                is_public,
            })
            .await
            .unwrap();
        }

        let (_, student) = student(&db, "lan").await;
        db.enroll_student(student.id, mine.id).await.unwrap();

        let materials = db.get_student_materials(student.id).await.unwrap();
        assert_eq!(materials.len(), 1);
        assert!(materials[0].is_public);
        assert_eq!(materials[0].course_id, mine.id);
        assert_eq!(db.get_course_materials(mine.id).await.unwrap().len(), 2);
    }
}
