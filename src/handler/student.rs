use axum::{
    Extension, Form, Router,
    extract::{Multipart, Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use tracing::instrument;
use validator::Validate;

use crate::{
    AppState,
    db::{CourseExt, EnrollOutcome, EnrollmentExt, LeaveExt, SpeechExt, UserExt},
    dtos::{
        FilterUserDto, LeaveRequestForm, LeaveRequestPageData, MaterialsPageData,
        SpeechPracticePageData, StudentDashboardData, StudentProfilePageData,
    },
    handler::or_empty,
    i18n::FlashMessage,
    middleware::{Session, StudentPrincipal},
    schedule,
    uploads::{UploadError, UploadKind},
    view::{FlashRedirect, Page},
};

const UPCOMING_PER_COURSE: i64 = 5;
const RECENT_SPEECH_RECORDS: i64 = 10;

/// Student area. The `student_area` guard (routes.rs) has already put a
/// `StudentPrincipal` into the request extensions.
pub fn student_handler() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/materials", get(materials))
        .route("/schedule", get(schedule_page))
        .route("/leave_request", get(leave_request_page).post(submit_leave_request))
        .route("/speech_practice", get(speech_practice))
        .route("/profile", get(profile))
        .route("/profile/avatar", post(upload_avatar))
        .route("/courses/{course_id}/enroll", post(enroll))
}

#[instrument(skip_all, fields(student_id = %student.profile.id))]
pub async fn dashboard(
    State(app_state): State<AppState>,
    Extension(student): Extension<StudentPrincipal>,
    session: Session,
) -> impl IntoResponse {
    let db = &app_state.db_client;
    let student_id = student.profile.id;

    let enrollments = or_empty(
        db.get_student_enrollments(student_id).await,
        "student dashboard enrollments",
    );

    let now = Utc::now();
    let mut upcoming_lessons = Vec::new();
    for enrollment in &enrollments {
        upcoming_lessons.extend(or_empty(
            db.get_upcoming_lessons(enrollment.course.id, now, UPCOMING_PER_COURSE)
                .await,
            "student dashboard lessons",
        ));
    }

    let pending_requests = or_empty(
        db.count_student_pending_leaves(student_id).await,
        "student dashboard pending leaves",
    );

    Page::new(
        &session,
        StudentDashboardData {
            profile: student.profile,
            enrollments,
            upcoming_lessons,
            pending_requests,
        },
    )
}

#[instrument(skip_all, fields(student_id = %student.profile.id))]
pub async fn materials(
    State(app_state): State<AppState>,
    Extension(student): Extension<StudentPrincipal>,
    session: Session,
) -> impl IntoResponse {
    let materials = or_empty(
        app_state
            .db_client
            .get_student_materials(student.profile.id)
            .await,
        "student materials",
    );

    Page::new(&session, MaterialsPageData { materials })
}

#[instrument(skip_all, fields(student_id = %student.profile.id))]
pub async fn schedule_page(
    State(app_state): State<AppState>,
    Extension(student): Extension<StudentPrincipal>,
    session: Session,
) -> impl IntoResponse {
    let lessons = or_empty(
        app_state
            .db_client
            .get_student_lessons(student.profile.id)
            .await,
        "student schedule",
    );

    Page::new(&session, schedule::summarize(lessons, Utc::now()))
}

#[instrument(skip_all, fields(student_id = %student.profile.id))]
pub async fn leave_request_page(
    State(app_state): State<AppState>,
    Extension(student): Extension<StudentPrincipal>,
    session: Session,
) -> impl IntoResponse {
    let db = &app_state.db_client;
    let enrollments = or_empty(
        db.get_student_enrollments(student.profile.id).await,
        "leave page enrollments",
    );
    let leave_requests = or_empty(
        db.get_student_leave_requests(student.profile.id).await,
        "leave page requests",
    );

    Page::new(
        &session,
        LeaveRequestPageData {
            enrollments,
            leave_requests,
        },
    )
}

/// File a leave request for a course the student actively attends.
#[instrument(skip_all, fields(student_id = %student.profile.id))]
pub async fn submit_leave_request(
    State(app_state): State<AppState>,
    Extension(student): Extension<StudentPrincipal>,
    Form(body): Form<LeaveRequestForm>,
) -> FlashRedirect {
    const BACK: &str = "/student/leave_request";

    let parsed = body.validate().ok().and_then(|_| body.parsed());
    let Some((course_id, lesson_date, reason)) = parsed else {
        tracing::info!("Invalid leave request form");
        return FlashRedirect::error(BACK, FlashMessage::InvalidForm);
    };

    let db = &app_state.db_client;
    match db.is_enrolled(student.profile.id, course_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(course_id, "Leave request for a course without enrollment");
            return FlashRedirect::error(BACK, FlashMessage::NotEnrolled);
        }
        Err(e) => {
            tracing::error!("DB error, checking enrollment: {}", e);
            return FlashRedirect::error(BACK, FlashMessage::LeaveSubmitFailed);
        }
    }

    match db
        .create_leave_request(student.profile.id, course_id, lesson_date, reason)
        .await
    {
        Ok(request) => {
            tracing::info!(request_id = request.id, "Leave request submitted");
            FlashRedirect::success(BACK, FlashMessage::LeaveSubmitted)
        }
        Err(e) => {
            tracing::error!("DB error, saving leave request: {}", e);
            FlashRedirect::error(BACK, FlashMessage::LeaveSubmitFailed)
        }
    }
}

#[instrument(skip_all, fields(student_id = %student.profile.id))]
pub async fn speech_practice(
    State(app_state): State<AppState>,
    Extension(student): Extension<StudentPrincipal>,
    session: Session,
) -> impl IntoResponse {
    let db = &app_state.db_client;
    let records = or_empty(
        db.get_recent_speech_records(student.profile.id, RECENT_SPEECH_RECORDS)
            .await,
        "speech practice records",
    );
    let total_records = or_empty(
        db.count_speech_records(student.profile.id).await,
        "speech practice count",
    );

    Page::new(
        &session,
        SpeechPracticePageData {
            records,
            total_records,
        },
    )
}

pub async fn profile(
    Extension(student): Extension<StudentPrincipal>,
    session: Session,
) -> impl IntoResponse {
    Page::new(
        &session,
        StudentProfilePageData {
            user: FilterUserDto::filter_user(&student.user),
            profile: student.profile,
        },
    )
}

#[instrument(skip_all, fields(student_id = %student.profile.id, course_id))]
pub async fn enroll(
    State(app_state): State<AppState>,
    Extension(student): Extension<StudentPrincipal>,
    Path(course_id): Path<i64>,
) -> FlashRedirect {
    const BACK: &str = "/student/dashboard";

    match app_state
        .db_client
        .enroll_student(student.profile.id, course_id)
        .await
    {
        Ok(EnrollOutcome::Enrolled(enrollment)) => {
            tracing::info!(enrollment_id = enrollment.id, "Enrolled");
            FlashRedirect::success(BACK, FlashMessage::Enrolled)
        }
        Ok(EnrollOutcome::AlreadyEnrolled) => {
            FlashRedirect::error(BACK, FlashMessage::AlreadyEnrolled)
        }
        Ok(EnrollOutcome::CourseFull) => FlashRedirect::error(BACK, FlashMessage::CourseFull),
        Ok(EnrollOutcome::CourseNotFound) => {
            FlashRedirect::error(BACK, FlashMessage::CourseNotFound)
        }
        Err(e) => {
            tracing::error!("DB error, enrolling: {}", e);
            FlashRedirect::error(BACK, FlashMessage::OperationFailed)
        }
    }
}

/// Replace the avatar with an uploaded image (multipart field `file`).
#[instrument(skip_all, fields(user_id = %student.user.id))]
pub async fn upload_avatar(
    State(app_state): State<AppState>,
    Extension(student): Extension<StudentPrincipal>,
    mut multipart: Multipart,
) -> FlashRedirect {
    const BACK: &str = "/student/profile";

    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::info!("Malformed avatar upload: {}", e);
                return FlashRedirect::error(BACK, FlashMessage::UploadFailed);
            }
        };
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(data) => upload = Some((file_name, data.to_vec())),
            Err(e) => {
                tracing::info!("Failed to read avatar upload: {}", e);
                return FlashRedirect::error(BACK, FlashMessage::UploadFailed);
            }
        }
    }

    let Some((file_name, data)) = upload else {
        return FlashRedirect::error(BACK, FlashMessage::UploadFailed);
    };

    let stored = match app_state
        .uploads
        .store(UploadKind::Avatar, &file_name, &data)
        .await
    {
        Ok(stored) => stored,
        Err(UploadError::Io(e)) => {
            tracing::error!("Avatar storage error: {}", e);
            return FlashRedirect::error(BACK, FlashMessage::UploadFailed);
        }
        Err(e) => {
            tracing::info!("Rejected avatar: {}", e);
            return FlashRedirect::error(BACK, FlashMessage::UploadFailed);
        }
    };

    match app_state
        .db_client
        .update_user_avatar(student.user.id, &stored.url)
        .await
    {
        Ok(_) => FlashRedirect::success(BACK, FlashMessage::AvatarUpdated),
        Err(e) => {
            tracing::error!("DB error, updating avatar: {}", e);
            FlashRedirect::error(BACK, FlashMessage::OperationFailed)
        }
    }
}
