use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::integration_dto::{
    AnswerEntry, CreateFormPayload, FormDetailResponse, FormListItem, FormListResponse,
    FormResponsesResponse, ResponseDetailResponse, ResponseSummary, ResponseWithAnswersDto,
};
use crate::error::Result;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/integration/forms",
    request_body = CreateFormPayload,
    responses(
        (status = 201, description = "Form created successfully", body = Json<FormDetailResponse>),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_form(
    State(state): State<AppState>,
    Json(payload): Json<CreateFormPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (form, questions) = state.form_service.create_form(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(FormDetailResponse::from_parts(form, questions)),
    ))
}

#[axum::debug_handler]
pub async fn get_form(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let (form, questions) = state.form_service.get_form(form_id).await?;
    Ok(Json(FormDetailResponse::from_parts(form, questions)))
}

#[axum::debug_handler]
pub async fn list_forms(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let overviews = state.form_service.list_forms().await?;
    let items: Vec<FormListItem> = overviews
        .into_iter()
        .map(|o| FormListItem {
            id: o.form.id,
            title: o.form.title,
            is_active: o.form.is_active,
            question_count: o.question_count,
            response_count: o.response_count,
            created_at: o.form.created_at,
        })
        .collect();
    let total = items.len();
    Ok(Json(FormListResponse { items, total }))
}

#[utoipa::path(
    get,
    path = "/api/integration/forms/{id}/responses",
    params(
        ("id" = Uuid, Path, description = "Form ID")
    ),
    responses(
        (status = 200, description = "Sessions with their answer logs", body = Json<FormResponsesResponse>),
        (status = 404, description = "Form not found")
    )
)]
#[axum::debug_handler]
pub async fn list_form_responses(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let rows = state.response_service.responses_for_form(form_id).await?;
    let items: Vec<ResponseWithAnswersDto> = rows
        .iter()
        .map(|row| ResponseWithAnswersDto {
            response: ResponseSummary::from(&row.response),
            answers: row.answers.iter().map(AnswerEntry::from).collect(),
        })
        .collect();
    let total = items.len();
    Ok(Json(FormResponsesResponse {
        form_id,
        total,
        items,
    }))
}

#[axum::debug_handler]
pub async fn get_response(
    State(state): State<AppState>,
    Path(response_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state.response_service.response_detail(response_id).await?;
    Ok(Json(ResponseDetailResponse {
        response: ResponseSummary::from(&detail.response),
        answers: detail.answers.iter().map(AnswerEntry::from).collect(),
        questions: detail.questions,
    }))
}
