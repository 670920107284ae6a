use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::public_dto::{
    NavigateBackRequest, NavigateBackResponse, PublicFormSummary, PublicQuestion,
    ResumeSessionResponse, StartSessionResponse, SubmitAnswerRequest, SubmitAnswerResponse,
};
use crate::AppState;

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let started = state.session_service.start(form_id).await?;
    let response = StartSessionResponse {
        session_token: started.response.session_token.clone(),
        response_id: started.response.id,
        form: PublicFormSummary::from(&started.form),
        question: PublicQuestion::from(&started.question),
        total_questions: started.total_questions,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[axum::debug_handler]
pub async fn resume_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let resumed = state.session_service.resume(&token).await?;
    let response = ResumeSessionResponse {
        session_token: resumed.response.session_token.clone(),
        response_id: resumed.response.id,
        form: PublicFormSummary::from(&resumed.form),
        question: resumed.question.as_ref().map(PublicQuestion::from),
        total_questions: resumed.total_questions,
        is_complete: resumed.is_complete,
    };
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<SubmitAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let outcome = state
        .session_service
        .submit_answer(&token, req.question_id, req.answer)
        .await?;
    let response = SubmitAnswerResponse {
        success: true,
        is_complete: outcome.is_complete,
        next_question: outcome.next_question.as_ref().map(PublicQuestion::from),
        total_questions: outcome.total_questions,
    };
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn navigate_back(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<NavigateBackRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let outcome = state
        .session_service
        .navigate_back(&token, req.current_question_id)
        .await?;
    let response = NavigateBackResponse {
        success: true,
        question: PublicQuestion::from(&outcome.question),
        previous_value: outcome.previous_value,
        total_questions: outcome.total_questions,
    };
    Ok(Json(response).into_response())
}
