use crate::models::{
    CampProgram, Course, CourseMaterial, CourseWithTeacher, EnrolledCourse, EnrolledStudent,
    Lesson, LeaveRequestView, SpeechPracticeRecord, StudentProfile, StudyAbroadCase,
    TeacherProfile, User, UserRole,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// Form and JSON inputs are kept apart from the database models. Every string
// field has a serde default so a missing field turns into a validation
// failure (and a flash message) instead of an extractor rejection.

// ============================================================================
// Authentication forms
// ============================================================================

/// Login form. `username` may also hold an email address.
#[derive(Validate, Debug, Default, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username or email is required"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

fn default_role() -> String {
    UserRole::Student.to_str().to_string()
}

#[derive(Validate, Debug, Clone, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 80, message = "Username must be 1-80 characters"))]
    pub username: String,

    #[serde(default)]
    #[validate(
        length(min = 1, max = 120, message = "Email must be 1-120 characters"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    /// `student` or `teacher`; admins are never self-registered.
    #[serde(default = "default_role")]
    pub role: String,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
}

impl RegisterForm {
    /// Display name for the new profile, falling back to the username.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

// ============================================================================
// Student forms
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Deserialize)]
pub struct LeaveRequestForm {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub course_id: String,

    /// `YYYY-MM-DD`
    #[serde(default)]
    #[validate(length(min = 1))]
    pub lesson_date: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

impl LeaveRequestForm {
    /// Course id, lesson date and trimmed reason, if all three are usable.
    pub fn parsed(&self) -> Option<(i64, NaiveDate, &str)> {
        let course_id = self.course_id.trim().parse::<i64>().ok()?;
        let lesson_date = NaiveDate::parse_from_str(self.lesson_date.trim(), "%Y-%m-%d").ok()?;
        let reason = self.reason.trim();
        if reason.is_empty() {
            return None;
        }
        Some((course_id, lesson_date, reason))
    }
}

// ============================================================================
// Teacher forms
// ============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LeaveDecisionForm {
    #[serde(default)]
    pub comment: Option<String>,
}

impl LeaveDecisionForm {
    pub fn comment(&self) -> Option<&str> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|comment| !comment.is_empty())
    }
}

const DEFAULT_LESSON_MINUTES: i32 = 90;

#[derive(Validate, Debug, Clone, Deserialize)]
pub struct LessonForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// `YYYY-MM-DDTHH:MM` (HTML datetime-local), read as UTC
    #[serde(default)]
    pub lesson_date: String,

    /// Minutes; empty means 90.
    #[serde(default)]
    pub duration: String,

    #[serde(default)]
    pub classroom: Option<String>,

    #[serde(default)]
    pub online_link: Option<String>,
}

impl LessonForm {
    /// Trimmed title, `None` when blank.
    pub fn title(&self) -> Option<&str> {
        Some(self.title.trim()).filter(|title| !title.is_empty())
    }

    /// Duration in minutes, between 1 and 600.
    pub fn duration(&self) -> Option<i32> {
        let raw = self.duration.trim();
        if raw.is_empty() {
            return Some(DEFAULT_LESSON_MINUTES);
        }
        raw.parse::<i32>()
            .ok()
            .filter(|minutes| (1..=600).contains(minutes))
    }

    pub fn lesson_date(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(self.lesson_date.trim(), "%Y-%m-%dT%H:%M")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Empty form values count as absent.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

// ============================================================================
// Speech API
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SpeechEvaluateDto {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    #[validate(length(max = 100, message = "Topic must not be more than 100 characters"))]
    pub topic: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpeechEvaluateResponse {
    pub success: bool,
    pub score: i32,
    pub pronunciation_score: i32,
    pub fluency_score: i32,
    pub feedback: String,
}

// ============================================================================
// User Response DTOs (filtered data for client)
// ============================================================================

/// User data safe to send to clients (no password hash)
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id,
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
            avatar: user.avatar.to_owned(),
            created_at: user.created_at,
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

// ============================================================================
// Public pages
// ============================================================================

/// Course with its level color for the course cards.
#[derive(Debug, Serialize)]
pub struct CourseCard {
    #[serde(flatten)]
    pub course: CourseWithTeacher,
    pub color: &'static str,
}

impl CourseCard {
    pub fn from_courses(courses: Vec<CourseWithTeacher>) -> Vec<CourseCard> {
        courses
            .into_iter()
            .map(|course| CourseCard {
                color: crate::i18n::course_color(&course.course.level),
                course,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct HomePageData {
    pub featured_courses: Vec<CourseCard>,
    pub featured_cases: Vec<StudyAbroadCase>,
    pub camp_programs: Vec<CampProgram>,
}

#[derive(Debug, Serialize)]
pub struct CoursesPageData {
    pub courses: Vec<CourseCard>,
}

#[derive(Debug, Serialize)]
pub struct ChineseCoursesPageData {
    pub courses: Vec<CourseCard>,
    pub teachers: Vec<TeacherProfile>,
}

#[derive(Debug, Serialize)]
pub struct StudyAbroadPageData {
    pub cases: Vec<StudyAbroadCase>,
}

#[derive(Debug, Serialize)]
pub struct CampPageData {
    pub programs: Vec<CampProgram>,
}

#[derive(Debug, Serialize)]
pub struct RegisterPageData {
    pub roles: [UserRole; 2],
}

// ============================================================================
// Student pages
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StudentDashboardData {
    pub profile: StudentProfile,
    pub enrollments: Vec<EnrolledCourse>,
    pub upcoming_lessons: Vec<Lesson>,
    pub pending_requests: i64,
}

#[derive(Debug, Serialize)]
pub struct MaterialsPageData {
    pub materials: Vec<CourseMaterial>,
}

#[derive(Debug, Serialize)]
pub struct LeaveRequestPageData {
    pub enrollments: Vec<EnrolledCourse>,
    pub leave_requests: Vec<LeaveRequestView>,
}

#[derive(Debug, Serialize)]
pub struct SpeechPracticePageData {
    pub records: Vec<SpeechPracticeRecord>,
    pub total_records: i64,
}

#[derive(Debug, Serialize)]
pub struct StudentProfilePageData {
    pub user: FilterUserDto,
    pub profile: StudentProfile,
}

// ============================================================================
// Teacher pages
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TeacherDashboardData {
    pub profile: TeacherProfile,
    pub courses: Vec<Course>,
    pub today_lessons: Vec<Lesson>,
    pub pending_requests: i64,
}

/// One course seen as a class group.
#[derive(Debug, Serialize)]
pub struct ClassInfo {
    pub id: i64,
    pub name: String,
    pub course: Course,
    pub students: Vec<EnrolledStudent>,
    pub capacity: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub lessons: Vec<Lesson>,
    pub materials: Vec<CourseMaterial>,
}

#[derive(Debug, Serialize)]
pub struct TeacherClassesData {
    pub classes: Vec<ClassInfo>,
}

#[derive(Debug, Serialize)]
pub struct LeaveApprovalData {
    pub leave_requests: Vec<LeaveRequestView>,
}

// ============================================================================
// Admin pages
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AdminDashboardData {
    pub total_students: i64,
    pub total_teachers: i64,
    pub total_courses: i64,
    pub active_courses: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminUsersData {
    pub users: Vec<FilterUserDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_form_defaults() {
        let form: RegisterForm = serde_json::from_value(serde_json::json!({
            "username": "mai",
            "email": "mai@example.com",
            "password": "secret1",
        }))
        .unwrap();
        assert_eq!(form.role, "student");
        assert_eq!(form.display_name(), "mai");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn short_password_fails_validation() {
        let form: RegisterForm = serde_json::from_value(serde_json::json!({
            "username": "mai",
            "email": "mai@example.com",
            "password": "123",
        }))
        .unwrap();
        assert!(form.validate().is_err());
    }

    #[test]
    fn leave_form_parsing() {
        let form = LeaveRequestForm {
            course_id: "3".into(),
            lesson_date: "2025-03-10".into(),
            reason: "sick".into(),
        };
        assert_eq!(
            form.parsed(),
            Some((3, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), "sick"))
        );

        let bad_date = LeaveRequestForm {
            lesson_date: "10/03/2025".into(),
            ..form.clone()
        };
        assert_eq!(bad_date.parsed(), None);

        let blank_reason = LeaveRequestForm {
            reason: "   ".into(),
            ..form
        };
        assert!(blank_reason.validate().is_ok());
        assert_eq!(blank_reason.parsed(), None);
    }

    #[test]
    fn lesson_form_reads_datetime_local() {
        let form: LessonForm = serde_json::from_value(serde_json::json!({
            "title": "Tones",
            "lesson_date": "2025-03-04T09:30",
        }))
        .unwrap();
        assert_eq!(form.duration(), Some(90));
        assert_eq!(form.title(), Some("Tones"));
        assert_eq!(
            form.lesson_date().map(|d| d.to_rfc3339()),
            Some("2025-03-04T09:30:00+00:00".to_string())
        );
    }

    #[test]
    fn lesson_form_rejects_blank_title_and_bad_duration() {
        let form: LessonForm = serde_json::from_value(serde_json::json!({
            "title": "  ",
            "lesson_date": "2025-03-04T09:30",
            "duration": "ninety",
        }))
        .unwrap();
        assert_eq!(form.title(), None);
        assert_eq!(form.duration(), None);

        let zero = LessonForm {
            duration: "0".into(),
            ..form
        };
        assert_eq!(zero.duration(), None);
    }
}
