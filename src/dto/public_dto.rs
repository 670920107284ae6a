use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::answer::AnswerValue;
use crate::models::form::Form;
use crate::models::question::{Question, QuestionSettings, QuestionType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicFormSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

impl From<&Form> for PublicFormSummary {
    fn from(form: &Form) -> Self {
        Self {
            id: form.id,
            title: form.title.clone(),
            description: form.description.clone(),
        }
    }
}

/// What a respondent sees of a question. Branching configuration stays
/// server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub position: i32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub label: String,
    pub required: bool,
    pub settings: QuestionSettings,
}

impl From<&Question> for PublicQuestion {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            position: question.position,
            question_type: question.question_type,
            label: question.label.clone(),
            required: question.required,
            settings: question.settings.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_token: String,
    pub response_id: Uuid,
    pub form: PublicFormSummary,
    pub question: PublicQuestion,
    pub total_questions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeSessionResponse {
    pub session_token: String,
    pub response_id: Uuid,
    pub form: PublicFormSummary,
    pub question: Option<PublicQuestion>,
    pub total_questions: usize,
    pub is_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: Uuid,
    pub answer: AnswerValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub success: bool,
    pub is_complete: bool,
    pub next_question: Option<PublicQuestion>,
    pub total_questions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NavigateBackRequest {
    pub current_question_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigateBackResponse {
    pub success: bool,
    pub question: PublicQuestion,
    pub previous_value: Option<AnswerValue>,
    pub total_questions: usize,
}
