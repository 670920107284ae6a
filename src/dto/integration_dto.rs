use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::answer::{AnswerRecord, AnswerValue};
use crate::models::form::Form;
use crate::models::logic::QuestionLogic;
use crate::models::question::{Question, QuestionSettings, QuestionType};
use crate::models::response::{Response, ResponseStatus};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFormPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    #[validate(nested)]
    #[serde(default)]
    pub questions: Vec<CreateQuestionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    /// Builders may supply their own ids so logic rules can reference
    /// jump targets within the same payload.
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(length(min = 1, max = 500))]
    pub label: String,
    pub required: Option<bool>,
    pub settings: Option<QuestionSettings>,
    pub logic: Option<QuestionLogic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub questions: Vec<Question>,
}

impl FormDetailResponse {
    pub fn from_parts(form: Form, questions: Vec<Question>) -> Self {
        Self {
            id: form.id,
            title: form.title,
            description: form.description,
            is_active: form.is_active,
            created_at: form.created_at,
            updated_at: form.updated_at,
            questions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormListItem {
    pub id: Uuid,
    pub title: String,
    pub is_active: bool,
    pub question_count: usize,
    pub response_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormListResponse {
    pub items: Vec<FormListItem>,
    pub total: usize,
}

/// Session projection for consumers. The session token never leaves the
/// respondent-facing API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSummary {
    pub id: Uuid,
    pub form_id: Uuid,
    pub status: ResponseStatus,
    pub current_question_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Response> for ResponseSummary {
    fn from(response: &Response) -> Self {
        Self {
            id: response.id,
            form_id: response.form_id,
            status: response.status,
            current_question_id: response.current_question_id,
            started_at: response.started_at,
            completed_at: response.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_id: Uuid,
    pub value: AnswerValue,
    pub answered_at: DateTime<Utc>,
    pub is_current: bool,
}

impl From<&AnswerRecord> for AnswerEntry {
    fn from(record: &AnswerRecord) -> Self {
        Self {
            question_id: record.question_id,
            value: record.value.clone(),
            answered_at: record.answered_at,
            is_current: record.is_current,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseWithAnswersDto {
    pub response: ResponseSummary,
    pub answers: Vec<AnswerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormResponsesResponse {
    pub form_id: Uuid,
    pub total: usize,
    pub items: Vec<ResponseWithAnswersDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDetailResponse {
    pub response: ResponseSummary,
    pub answers: Vec<AnswerEntry>,
    pub questions: Vec<Question>,
}
