use chrono::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of an account, stored as lowercase text in `users.role`.
///
/// A role decides which area of the portal a user may enter and which
/// profile table (if any) holds the rest of their data.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Teacher,
    Admin,
}

impl UserRole {
    pub fn to_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(UserRole::Student),
            "teacher" => Some(UserRole::Teacher),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Landing page after a successful login
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            UserRole::Student => "/student/dashboard",
            UserRole::Teacher => "/teacher/dashboard",
            UserRole::Admin => "/admin/dashboard",
        }
    }
}

/// Account row. `password_hash` is an argon2 PHC string and never leaves the server.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// Student-specific data attached 1:1 to a `User` with role `student`.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct StudentProfile {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub native_language: String,
    pub chinese_level: String,
    pub emergency_contact: Option<String>,
}

/// Teacher-specific data attached 1:1 to a `User` with role `teacher`.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct TeacherProfile {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub experience_years: i32,
    pub qualifications: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub level: String, // HSK1..HSK6 or "oral"
    pub teacher_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub schedule: Option<String>,
    pub max_students: i32,
    pub price: Option<f64>,
    pub status: String,
}

/// Join row between a student and a course. (student_id, course_id) is unique.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct CourseEnrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub enrolled_at: DateTime<Utc>,
    pub status: String,
    pub progress: i32,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Lesson {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub lesson_date: DateTime<Utc>,
    pub duration: i32, // minutes
    pub classroom: Option<String>,
    pub online_link: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct CourseMaterial {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub file_path: String,
    pub file_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub is_public: bool,
}

/// Leave request lifecycle: `Pending` is the only non-terminal state.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn to_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct LeaveRequest {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub lesson_date: NaiveDate,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
    pub status: LeaveStatus,
    pub teacher_comment: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// One scored speaking exercise. Rows are append-only.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct SpeechPracticeRecord {
    pub id: i64,
    pub student_id: i64,
    pub topic: String,
    pub text_content: String,
    pub audio_file: Option<String>,
    pub score: i32,
    pub pronunciation_score: i32,
    pub fluency_score: i32,
    pub feedback: String,
    pub practiced_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct StudyAbroadCase {
    pub id: i64,
    pub student_name: String,
    pub student_country: String,
    pub original_background: String,
    pub target_university: String,
    pub target_major: String,
    pub scholarship_amount: Option<f64>,
    pub success_story: String,
    pub student_photo: Option<String>,
    pub testimonial: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_featured: bool,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct CampProgram {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub theme: String,
    pub duration: i32, // days
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price: f64,
    pub max_participants: i32,
    pub min_age: i32,
    pub max_age: i32,
    pub itinerary: Option<String>,
    pub includes: Option<String>,
    pub excludes: Option<String>,
    pub status: String,
    pub featured_image: Option<String>,
}

/// Active course joined with its teacher's display name.
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct CourseWithTeacher {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub course: Course,
    pub teacher_name: String,
}

/// A student's active enrollment, carrying the course it points at.
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct EnrolledCourse {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub course: Course,
    pub enrollment_id: i64,
    pub enrolled_at: DateTime<Utc>,
    pub progress: i32,
}

/// A student on a course roster.
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct EnrolledStudent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub profile: StudentProfile,
    pub enrolled_at: DateTime<Utc>,
    pub progress: i32,
}

#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct LeaveRequestView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub request: LeaveRequest,
    pub course_name: String,
    pub student_name: String,
}
