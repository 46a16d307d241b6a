//! First-run data: the admin account plus a small demo school.
//!
//! Every step checks for existing rows first, so running [`DBClient::bootstrap`]
//! on every start never duplicates anything.

use chrono::{NaiveDate, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

use super::DBClient;
use super::course::{NewCourse, NewLesson, NewMaterial, insert_course, insert_lesson, insert_material};
use super::user::insert_user;
use crate::models::UserRole;
use crate::utils::password;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to hash seed password: {0}")]
    Password(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// What a bootstrap run actually inserted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub admin_created: bool,
    pub sample_teacher_created: bool,
    pub sample_student_created: bool,
    pub cases_created: usize,
    pub camps_created: usize,
}

fn hash_seed_password(raw: &str) -> Result<String, BootstrapError> {
    password::hash(raw).map_err(|e| BootstrapError::Password(e.to_string()))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

impl DBClient {
    pub async fn bootstrap(&self) -> Result<SeedReport, BootstrapError> {
        let mut report = SeedReport::default();
        let mut tx = self.pool.begin().await?;

        let admin_exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM users WHERE username = 'admin')"#)
                .fetch_one(&mut *tx)
                .await?;
        if !admin_exists {
            let hash = hash_seed_password("admin123")?;
            insert_user(&mut *tx, "admin", "admin@qimeng.edu", &hash, UserRole::Admin).await?;
            report.admin_created = true;
        }

        let has_teacher: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM teacher_profiles)"#)
                .fetch_one(&mut *tx)
                .await?;
        if !has_teacher {
            let hash = hash_seed_password("teacher123")?;
            let user = insert_user(
                &mut *tx,
                "teacher1",
                "teacher1@qimeng.edu",
                &hash,
                UserRole::Teacher,
            )
            .await?;

            let teacher_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO teacher_profiles (user_id, full_name, specialization, bio, experience_years)
                VALUES (?, ?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(user.id)
            .bind("Teacher Li")
            .bind("HSK teaching")
            .bind("Ten years of Chinese teaching, focused on HSK exam preparation")
            .bind(10)
            .fetch_one(&mut *tx)
            .await?;

            let course = insert_course(
                &mut *tx,
                &NewCourse {
                    name: "HSK1 Foundation Class",
                    description: Some("HSK1 course for complete beginners"),
                    level: "HSK1",
                    teacher_id,
                    start_date: date(2025, 2, 1),
                    end_date: date(2025, 5, 31),
                    schedule: None,
                    max_students: 20,
                    price: Some(1500.0),
                },
            )
            .await?;

            let lessons = [
                ("Lesson 1: Hello", "Basic greetings", 3),
                ("Lesson 2: Introducing yourself", "How to introduce yourself", 5),
            ];
            for (title, description, day) in lessons {
                let lesson_date = Utc
                    .with_ymd_and_hms(2025, 2, day, 10, 0, 0)
                    .single()
                    .unwrap_or_default();
                insert_lesson(
                    &mut *tx,
                    &NewLesson {
                        course_id: course.id,
                        title,
                        description: Some(description),
                        lesson_date,
                        duration: 90,
                        classroom: Some("A101"),
                        online_link: None,
                    },
                )
                .await?;
            }

            let materials = [
                (
                    "HSK1 vocabulary list",
                    "Essential HSK1 vocabulary",
                    "/static/materials/hsk1_vocab.pdf",
                    "pdf",
                ),
                (
                    "Pronunciation practice audio",
                    "Standard pronunciation examples",
                    "/static/materials/pronunciation.mp3",
                    "audio",
                ),
            ];
            for (title, description, file_path, file_type) in materials {
                insert_material(
                    &mut *tx,
                    &NewMaterial {
                        course_id: course.id,
                        title,
                        description: Some(description),
                        file_path,
                        file_type,
                        is_public: true,
                    },
                )
                .await?;
            }

            report.sample_teacher_created = true;
        }

        let has_student: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM student_profiles)"#)
                .fetch_one(&mut *tx)
                .await?;
        if !has_student {
            let hash = hash_seed_password("student123")?;
            let user = insert_user(
                &mut *tx,
                "student1",
                "student1@example.com",
                &hash,
                UserRole::Student,
            )
            .await?;

            let student_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO student_profiles (user_id, full_name, native_language, chinese_level)
                VALUES (?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(user.id)
            .bind("Nguyen Van A")
            .bind("Vietnamese")
            .bind("HSK1")
            .fetch_one(&mut *tx)
            .await?;

            let first_course: Option<i64> =
                sqlx::query_scalar(r#"SELECT id FROM courses ORDER BY id LIMIT 1"#)
                    .fetch_optional(&mut *tx)
                    .await?;
            if let Some(course_id) = first_course {
                sqlx::query(
                    r#"INSERT INTO course_enrollments (student_id, course_id, enrolled_at) VALUES (?, ?, ?)"#,
                )
                .bind(student_id)
                .bind(course_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
            }

            report.sample_student_created = true;
        }

        let has_cases: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM study_abroad_cases)"#)
                .fetch_one(&mut *tx)
                .await?;
        if !has_cases {
            let cases = [
                (
                    "Tran Thi B",
                    "High school graduate, HSK4",
                    "Peking University",
                    "International Relations",
                    50000.0,
                    "Admitted to Peking University's International Relations program with a full scholarship.",
                    "Thanks to Qimeng's guidance my dream of studying abroad came true!",
                ),
                (
                    "Le Van C",
                    "College graduate, HSK5",
                    "Tsinghua University",
                    "Computer Science",
                    30000.0,
                    "Admitted to Tsinghua University's master's program in Computer Science.",
                    "The professional service made my application smooth!",
                ),
            ];
            for (name, background, university, major, scholarship, story, testimonial) in cases {
                sqlx::query(
                    r#"
                    INSERT INTO study_abroad_cases
                        (student_name, student_country, original_background, target_university, target_major,
                         scholarship_amount, success_story, testimonial, created_at, is_featured)
                    VALUES (?, 'Vietnam', ?, ?, ?, ?, ?, ?, ?, 1)
                    "#,
                )
                .bind(name)
                .bind(background)
                .bind(university)
                .bind(major)
                .bind(scholarship)
                .bind(story)
                .bind(testimonial)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
                report.cases_created += 1;
            }
        }

        let has_camps: bool = sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM camp_programs)"#)
            .fetch_one(&mut *tx)
            .await?;
        if !has_camps {
            let camps = [
                (
                    "Beijing University Discovery Camp",
                    "Visit Beijing's top universities and experience Chinese culture",
                    "university",
                    14,
                    date(2025, 7, 1),
                    date(2025, 7, 14),
                    3500.0,
                    "Days 1-3: Peking University; days 4-6: Tsinghua University; days 7-10: cultural activities; days 11-14: language practice",
                ),
                (
                    "Shanghai Tech Experience Camp",
                    "Explore China's technology scene and visit well-known tech companies",
                    "tech",
                    10,
                    date(2025, 8, 1),
                    date(2025, 8, 10),
                    2800.0,
                    "Days 1-2: Fudan University; days 3-5: company visits; days 6-8: innovation labs; days 9-10: showcase",
                ),
            ];
            for (name, description, theme, duration, start, end, price, itinerary) in camps {
                sqlx::query(
                    r#"
                    INSERT INTO camp_programs (name, description, theme, duration, start_date, end_date, price, itinerary)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(name)
                .bind(description)
                .bind(theme)
                .bind(duration)
                .bind(start)
                .bind(end)
                .bind(price)
                .bind(itinerary)
                .execute(&mut *tx)
                .await?;
                report.camps_created += 1;
            }
        }

        tx.commit().await?;
        Ok(report)
    }
}
