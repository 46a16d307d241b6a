use axum::{
    Extension, Form, Router,
    extract::{Multipart, Path, State, rejection::FormRejection},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Duration, NaiveTime, Utc};
use tracing::instrument;
use validator::Validate;

use crate::{
    AppState,
    db::{
        CourseExt, DecisionOutcome, EnrollmentExt, LeaveDecision, LeaveExt, NewLesson,
        NewMaterial,
    },
    dtos::{
        ClassInfo, LeaveApprovalData, LeaveDecisionForm, LessonForm, TeacherClassesData,
        TeacherDashboardData, non_empty,
    },
    handler::or_empty,
    i18n::{self, FlashMessage},
    middleware::{Session, TeacherPrincipal},
    models::Course,
    uploads::{UploadKind, material_file_type},
    view::{FlashRedirect, Page},
};

pub fn teacher_handler() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/classes", get(classes))
        .route("/leave_approval", get(leave_approval))
        .route(
            "/approve_leave/{request_id}",
            get(approve_leave).post(approve_leave),
        )
        .route(
            "/reject_leave/{request_id}",
            get(reject_leave).post(reject_leave),
        )
        .route("/courses/{course_id}/materials", post(upload_material))
        .route("/courses/{course_id}/lessons", post(schedule_lesson))
}

#[instrument(skip_all, fields(user_id = %teacher.user.id, teacher_id = %teacher.profile.id))]
pub async fn dashboard(
    State(app_state): State<AppState>,
    Extension(teacher): Extension<TeacherPrincipal>,
    session: Session,
) -> impl IntoResponse {
    let db = &app_state.db_client;
    let teacher_id = teacher.profile.id;

    let courses = or_empty(
        db.get_teacher_courses(teacher_id, true).await,
        "teacher dashboard courses",
    );

    // Today is the UTC calendar day.
    let start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    let today_lessons = or_empty(
        db.get_teacher_lessons_between(teacher_id, start, start + Duration::days(1))
            .await,
        "teacher dashboard lessons",
    );

    let pending_requests = or_empty(
        db.count_teacher_pending_leaves(teacher_id).await,
        "teacher dashboard pending leaves",
    );

    Page::new(
        &session,
        TeacherDashboardData {
            profile: teacher.profile,
            courses,
            today_lessons,
            pending_requests,
        },
    )
}

/// Each active course as a class group with its roster and materials.
#[instrument(skip_all, fields(teacher_id = %teacher.profile.id))]
pub async fn classes(
    State(app_state): State<AppState>,
    Extension(teacher): Extension<TeacherPrincipal>,
    session: Session,
) -> impl IntoResponse {
    let db = &app_state.db_client;
    let courses = or_empty(
        db.get_teacher_courses(teacher.profile.id, true).await,
        "teacher classes",
    );

    let mut classes = Vec::with_capacity(courses.len());
    for course in courses {
        let students = or_empty(db.get_course_students(course.id).await, "class roster");
        let lessons = or_empty(db.get_course_lessons(course.id).await, "class lessons");
        let materials = or_empty(db.get_course_materials(course.id).await, "class materials");
        classes.push(ClassInfo {
            id: course.id,
            name: i18n::class_name(session.lang, &course.name),
            capacity: course.max_students,
            start_date: course.start_date,
            end_date: course.end_date,
            course,
            students,
            lessons,
            materials,
        });
    }

    Page::new(&session, TeacherClassesData { classes })
}

#[instrument(skip_all, fields(teacher_id = %teacher.profile.id))]
pub async fn leave_approval(
    State(app_state): State<AppState>,
    Extension(teacher): Extension<TeacherPrincipal>,
    session: Session,
) -> impl IntoResponse {
    let leave_requests = or_empty(
        app_state
            .db_client
            .get_teacher_leave_requests(teacher.profile.id)
            .await,
        "leave approval list",
    );

    Page::new(&session, LeaveApprovalData { leave_requests })
}

pub async fn approve_leave(
    State(app_state): State<AppState>,
    Extension(teacher): Extension<TeacherPrincipal>,
    Path(request_id): Path<i64>,
    form: Result<Form<LeaveDecisionForm>, FormRejection>,
) -> FlashRedirect {
    decide(&app_state, &teacher, request_id, LeaveDecision::Approve, form).await
}

pub async fn reject_leave(
    State(app_state): State<AppState>,
    Extension(teacher): Extension<TeacherPrincipal>,
    Path(request_id): Path<i64>,
    form: Result<Form<LeaveDecisionForm>, FormRejection>,
) -> FlashRedirect {
    decide(&app_state, &teacher, request_id, LeaveDecision::Reject, form).await
}

/// Shared body of approve/reject. The comment is optional, so an absent or
/// unreadable form body just means "no comment".
#[instrument(skip(app_state, teacher, form), fields(teacher_id = %teacher.profile.id))]
async fn decide(
    app_state: &AppState,
    teacher: &TeacherPrincipal,
    request_id: i64,
    decision: LeaveDecision,
    form: Result<Form<LeaveDecisionForm>, FormRejection>,
) -> FlashRedirect {
    const BACK: &str = "/teacher/leave_approval";

    let form = form.map(|Form(form)| form).unwrap_or_default();

    let result = app_state
        .db_client
        .decide_leave_request(request_id, teacher.profile.id, decision, form.comment())
        .await;

    match result {
        Ok(DecisionOutcome::Applied(request)) => {
            tracing::info!(request_id, status = request.status.to_str(), "Leave request decided");
            let message = match decision {
                LeaveDecision::Approve => FlashMessage::LeaveApproved,
                LeaveDecision::Reject => FlashMessage::LeaveRejected,
            };
            FlashRedirect::success(BACK, message)
        }
        Ok(DecisionOutcome::NotFound) => FlashRedirect::error(BACK, FlashMessage::LeaveNotFound),
        Ok(DecisionOutcome::NotOwner) => {
            tracing::info!(request_id, "Leave decision on another teacher's course");
            FlashRedirect::error(BACK, FlashMessage::PermissionDenied)
        }
        Ok(DecisionOutcome::AlreadyDecided(status)) => {
            tracing::info!(request_id, status = status.to_str(), "Leave request already decided");
            FlashRedirect::error(BACK, FlashMessage::LeaveAlreadyProcessed)
        }
        Err(e) => {
            tracing::error!("DB error, deciding leave request: {}", e);
            FlashRedirect::error(BACK, FlashMessage::OperationFailed)
        }
    }
}

/// The course, if it exists and the teacher teaches it.
async fn owned_course(
    app_state: &AppState,
    teacher: &TeacherPrincipal,
    course_id: i64,
) -> Result<Course, FlashMessage> {
    match app_state.db_client.get_course(course_id).await {
        Ok(Some(course)) if course.teacher_id == teacher.profile.id => Ok(course),
        Ok(Some(_)) => Err(FlashMessage::PermissionDenied),
        Ok(None) => Err(FlashMessage::CourseNotFound),
        Err(e) => {
            tracing::error!("DB error, getting course: {}", e);
            Err(FlashMessage::OperationFailed)
        }
    }
}

#[derive(Default)]
struct MaterialUpload {
    title: String,
    description: Option<String>,
    is_public: Option<bool>,
    file: Option<(String, Vec<u8>)>,
}

async fn read_material_upload(mut multipart: Multipart) -> Option<MaterialUpload> {
    let mut upload = MaterialUpload::default();

    while let Some(field) = multipart.next_field().await.ok()? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => upload.title = field.text().await.ok()?,
            "description" => upload.description = Some(field.text().await.ok()?),
            "is_public" => {
                let raw = field.text().await.ok()?;
                upload.is_public = Some(matches!(raw.trim(), "1" | "true" | "on"));
            }
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                upload.file = Some((file_name, field.bytes().await.ok()?.to_vec()));
            }
            _ => {}
        }
    }

    Some(upload)
}

/// Attach a file to one of the teacher's courses.
///
/// Multipart fields: `title`, `description`, `is_public` (defaults to
/// public) and `file`.
#[instrument(skip_all, fields(teacher_id = %teacher.profile.id, course_id))]
pub async fn upload_material(
    State(app_state): State<AppState>,
    Extension(teacher): Extension<TeacherPrincipal>,
    Path(course_id): Path<i64>,
    multipart: Multipart,
) -> FlashRedirect {
    const BACK: &str = "/teacher/classes";

    let course = match owned_course(&app_state, &teacher, course_id).await {
        Ok(course) => course,
        Err(message) => return FlashRedirect::error(BACK, message),
    };

    let Some(upload) = read_material_upload(multipart).await else {
        return FlashRedirect::error(BACK, FlashMessage::UploadFailed);
    };
    let title = upload.title.trim();
    let Some((file_name, data)) = upload.file.as_ref().filter(|_| !title.is_empty()) else {
        return FlashRedirect::error(BACK, FlashMessage::InvalidForm);
    };

    let stored = match app_state
        .uploads
        .store(UploadKind::Material, file_name, data)
        .await
    {
        Ok(stored) => stored,
        Err(e) => {
            tracing::info!("Rejected material upload: {}", e);
            return FlashRedirect::error(BACK, FlashMessage::UploadFailed);
        }
    };

    let material = NewMaterial {
        course_id: course.id,
        title,
        description: non_empty(&upload.description),
        file_path: &stored.url,
        file_type: material_file_type(&stored.extension),
        is_public: upload.is_public.unwrap_or(true),
    };

    match app_state.db_client.create_material(&material).await {
        Ok(material) => {
            tracing::info!(material_id = material.id, "Material uploaded");
            FlashRedirect::success(BACK, FlashMessage::MaterialUploaded)
        }
        Err(e) => {
            tracing::error!("DB error, saving material: {}", e);
            if let Err(e) = tokio::fs::remove_file(&stored.path).await {
                tracing::error!("Failed to remove orphaned upload: {}", e);
            }
            FlashRedirect::error(BACK, FlashMessage::OperationFailed)
        }
    }
}

#[instrument(skip_all, fields(teacher_id = %teacher.profile.id, course_id))]
pub async fn schedule_lesson(
    State(app_state): State<AppState>,
    Extension(teacher): Extension<TeacherPrincipal>,
    Path(course_id): Path<i64>,
    Form(body): Form<LessonForm>,
) -> FlashRedirect {
    const BACK: &str = "/teacher/classes";

    let course = match owned_course(&app_state, &teacher, course_id).await {
        Ok(course) => course,
        Err(message) => return FlashRedirect::error(BACK, message),
    };

    let parsed = body
        .validate()
        .ok()
        .and_then(|_| Some((body.title()?, body.lesson_date()?, body.duration()?)));
    let Some((title, lesson_date, duration)) = parsed else {
        return FlashRedirect::error(BACK, FlashMessage::InvalidForm);
    };

    let lesson = NewLesson {
        course_id: course.id,
        title,
        description: non_empty(&body.description),
        lesson_date,
        duration,
        classroom: non_empty(&body.classroom),
        online_link: non_empty(&body.online_link),
    };

    match app_state.db_client.create_lesson(&lesson).await {
        Ok(lesson) => {
            tracing::info!(lesson_id = lesson.id, "Lesson scheduled");
            FlashRedirect::success(BACK, FlashMessage::LessonScheduled)
        }
        Err(e) => {
            tracing::error!("DB error, saving lesson: {}", e);
            FlashRedirect::error(BACK, FlashMessage::OperationFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{CourseExt, EnrollOutcome, EnrollmentExt, LeaveExt, UserExt};
    use crate::models::LeaveStatus;
    use crate::test_utils::{TestApp, body_json, multipart_body, new_course, set_cookies, student, teacher};
    use axum::http::{StatusCode, header};
    use chrono::NaiveDate;

    struct Fixture {
        app: TestApp,
        owner_cookie: String,
        other_cookie: String,
        request_id: i64,
        course_id: i64,
    }

    async fn fixture() -> Fixture {
        let app = TestApp::new().await;
        let (owner_user, owner) = teacher(app.db(), "owner").await;
        let (other_user, _) = teacher(app.db(), "other").await;
        let (_, pupil) = student(app.db(), "pupil").await;

        let course = app.db().create_course(&new_course(owner.id)).await.unwrap();
        assert!(matches!(
            app.db().enroll_student(pupil.id, course.id).await.unwrap(),
            EnrollOutcome::Enrolled(_)
        ));
        let request = app
            .db()
            .create_leave_request(
                pupil.id,
                course.id,
                NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
                "family trip",
            )
            .await
            .unwrap();

        Fixture {
            owner_cookie: app.session_cookie(owner_user.id),
            other_cookie: app.session_cookie(other_user.id),
            request_id: request.id,
            course_id: course.id,
            app,
        }
    }

    fn flash_of(response: &axum::response::Response) -> Option<String> {
        set_cookies(response)
            .into_iter()
            .find(|c| c.starts_with("flash="))
            .map(|c| c.split(';').next().unwrap_or_default().to_string())
    }

    #[tokio::test]
    async fn owner_approves_with_comment() {
        let f = fixture().await;
        let response = f
            .app
            .post_form(
                &format!("/teacher/approve_leave/{}", f.request_id),
                "comment=get+well",
                Some(&f.owner_cookie),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/teacher/leave_approval");
        assert_eq!(flash_of(&response).as_deref(), Some("flash=success.leave_approved"));

        let stored = f.app.db().get_leave_request(f.request_id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeaveStatus::Approved);
        assert_eq!(stored.teacher_comment.as_deref(), Some("get well"));
        assert!(stored.processed_at.is_some());
    }

    #[tokio::test]
    async fn other_teacher_cannot_decide() {
        let f = fixture().await;
        let response = f
            .app
            .get(
                &format!("/teacher/reject_leave/{}", f.request_id),
                Some(&f.other_cookie),
            )
            .await;
        assert_eq!(flash_of(&response).as_deref(), Some("flash=error.permission_denied"));

        let stored = f.app.db().get_leave_request(f.request_id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeaveStatus::Pending);
        assert!(stored.processed_at.is_none());
    }

    #[tokio::test]
    async fn second_decision_is_refused() {
        let f = fixture().await;
        let reject = format!("/teacher/reject_leave/{}", f.request_id);
        let approve = format!("/teacher/approve_leave/{}", f.request_id);

        let first = f.app.get(&reject, Some(&f.owner_cookie)).await;
        assert_eq!(flash_of(&first).as_deref(), Some("flash=success.leave_rejected"));
        let processed_at = f
            .app
            .db()
            .get_leave_request(f.request_id)
            .await
            .unwrap()
            .unwrap()
            .processed_at;

        let second = f.app.get(&approve, Some(&f.owner_cookie)).await;
        assert_eq!(
            flash_of(&second).as_deref(),
            Some("flash=error.leave_already_processed")
        );

        let stored = f.app.db().get_leave_request(f.request_id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeaveStatus::Rejected);
        assert_eq!(stored.processed_at, processed_at);
    }

    #[tokio::test]
    async fn unknown_request_is_flashed() {
        let f = fixture().await;
        let response = f.app.get("/teacher/approve_leave/9999", Some(&f.owner_cookie)).await;
        assert_eq!(flash_of(&response).as_deref(), Some("flash=error.leave_not_found"));
    }

    #[tokio::test]
    async fn student_cannot_open_teacher_pages() {
        let f = fixture().await;
        let pupil = f.app.db().get_user(None, Some("pupil"), None).await.unwrap().unwrap();
        let cookie = f.app.session_cookie(pupil.id);

        let response = f
            .app
            .get(&format!("/teacher/approve_leave/{}", f.request_id), Some(&cookie))
            .await;
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert_eq!(flash_of(&response).as_deref(), Some("flash=error.permission_denied"));
        let stored = f.app.db().get_leave_request(f.request_id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeaveStatus::Pending);
    }

    #[tokio::test]
    async fn pages_show_roster_and_requests() {
        let f = fixture().await;

        let body = body_json(f.app.get("/teacher/classes", Some(&f.owner_cookie)).await).await;
        let classes = body["data"]["classes"].as_array().unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0]["name"], "HSK2 Evening班");
        assert_eq!(classes[0]["capacity"], 2);
        assert_eq!(classes[0]["students"][0]["full_name"], "pupil full name");
        assert!(classes[0]["lessons"].as_array().unwrap().is_empty());

        let body = body_json(f.app.get("/teacher/dashboard", Some(&f.owner_cookie)).await).await;
        assert_eq!(body["data"]["pending_requests"], 1);
        assert_eq!(body["data"]["courses"].as_array().unwrap().len(), 1);

        let body =
            body_json(f.app.get("/teacher/leave_approval", Some(&f.owner_cookie)).await).await;
        assert_eq!(body["data"]["leave_requests"][0]["student_name"], "pupil full name");

        let body =
            body_json(f.app.get("/teacher/leave_approval", Some(&f.other_cookie)).await).await;
        assert!(body["data"]["leave_requests"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn material_upload_is_owner_only() {
        let f = fixture().await;
        let path = format!("/teacher/courses/{}/materials", f.course_id);
        let upload = || {
            multipart_body(
                &[("title", "Tone drills"), ("is_public", "false")],
                Some(("file", "drills.mp3", b"ID3....".as_slice())),
            )
        };

        let (content_type, body) = upload();
        let response = f
            .app
            .post_multipart(&path, content_type, body, Some(&f.other_cookie))
            .await;
        assert_eq!(flash_of(&response).as_deref(), Some("flash=error.permission_denied"));

        let (content_type, body) = upload();
        let response = f
            .app
            .post_multipart(&path, content_type, body, Some(&f.owner_cookie))
            .await;
        assert_eq!(flash_of(&response).as_deref(), Some("flash=success.material_uploaded"));

        let materials = f.app.db().get_course_materials(f.course_id).await.unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].file_type, "audio");
        assert!(!materials[0].is_public);
        assert!(materials[0].file_path.starts_with("/static/uploads/materials/"));
    }

    #[tokio::test]
    async fn owner_schedules_lesson() {
        let f = fixture().await;
        let path = format!("/teacher/courses/{}/lessons", f.course_id);

        for bad in [
            "title=Tones&lesson_date=bad",
            "title=+++&lesson_date=2025-03-04T09%3A30",
            "title=Tones&lesson_date=2025-03-04T09%3A30&duration=long",
        ] {
            let response = f.app.post_form(&path, bad, Some(&f.owner_cookie)).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(flash_of(&response).as_deref(), Some("flash=error.invalid_form"));
        }
        assert!(f.app.db().get_course_lessons(f.course_id).await.unwrap().is_empty());

        let response = f
            .app
            .post_form(
                &path,
                "title=Tones&lesson_date=2025-03-04T09%3A30&duration=60&classroom=B2",
                Some(&f.owner_cookie),
            )
            .await;
        assert_eq!(flash_of(&response).as_deref(), Some("flash=success.lesson_scheduled"));

        let lessons = f.app.db().get_course_lessons(f.course_id).await.unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].duration, 60);
        assert_eq!(lessons[0].classroom.as_deref(), Some("B2"));
        assert!(lessons[0].online_link.is_none());
    }
}
