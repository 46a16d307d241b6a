use axum::{
    Extension, Json, Router,
    extract::State,
    response::IntoResponse,
    routing::post,
};
use tracing::instrument;
use validator::Validate;

use crate::{
    AppState,
    db::{NewSpeechRecord, SpeechExt},
    dtos::{SpeechEvaluateDto, SpeechEvaluateResponse},
    error::{ErrorMessage, HttpError},
    middleware::{Session, StudentPrincipal},
};

/// JSON endpoints for signed-in students (guarded by `student_api`).
pub fn api_handler() -> Router<AppState> {
    Router::new().route("/speech_evaluate", post(speech_evaluate))
}

/// Score a practice attempt and keep it in the student's history.
///
/// Every successful call appends exactly one record. If the record cannot be
/// stored, the caller gets a 500 rather than an unsaved score.
#[instrument(skip_all, fields(student_id = %student.profile.id))]
pub async fn speech_evaluate(
    State(app_state): State<AppState>,
    Extension(student): Extension<StudentPrincipal>,
    session: Session,
    Json(body): Json<SpeechEvaluateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let evaluation = app_state
        .scorer
        .evaluate(&body.topic, &body.text, session.lang);

    let record = NewSpeechRecord {
        student_id: student.profile.id,
        topic: &body.topic,
        text_content: &body.text,
        score: evaluation.score,
        pronunciation_score: evaluation.pronunciation_score,
        fluency_score: evaluation.fluency_score,
        feedback: &evaluation.feedback,
    };

    let saved = app_state
        .db_client
        .create_speech_record(&record)
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving speech record: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(record_id = saved.id, score = saved.score, "Speech evaluated");

    Ok(Json(SpeechEvaluateResponse {
        success: true,
        score: saved.score,
        pronunciation_score: saved.pronunciation_score,
        fluency_score: saved.fluency_score,
        feedback: saved.feedback,
    }))
}
