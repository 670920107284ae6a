use std::sync::Arc;

use uuid::Uuid;

use crate::error::Result;
use crate::models::answer::AnswerRecord;
use crate::models::question::Question;
use crate::models::response::Response;
use crate::storage::{AnswerStore, FormStore, ResponseStore};

/// Read side for the collaborators that sit on top of collected sessions
/// (aggregation, export, draws). Everything here is a projection of the
/// stored state; nothing mutates answer currency.
#[derive(Clone)]
pub struct ResponseService {
    forms: Arc<dyn FormStore>,
    responses: Arc<dyn ResponseStore>,
    answers: Arc<dyn AnswerStore>,
}

#[derive(Debug, Clone)]
pub struct ResponseWithAnswers {
    pub response: Response,
    pub answers: Vec<AnswerRecord>,
}

#[derive(Debug, Clone)]
pub struct ResponseDetail {
    pub response: Response,
    pub answers: Vec<AnswerRecord>,
    pub questions: Vec<Question>,
}

impl ResponseService {
    pub fn new(
        forms: Arc<dyn FormStore>,
        responses: Arc<dyn ResponseStore>,
        answers: Arc<dyn AnswerStore>,
    ) -> Self {
        Self {
            forms,
            responses,
            answers,
        }
    }

    /// Every session of a form with its full answer log, newest first.
    pub async fn responses_for_form(&self, form_id: Uuid) -> Result<Vec<ResponseWithAnswers>> {
        self.forms.form_by_id(form_id).await?;
        let responses = self.responses.responses_for_form(form_id).await?;
        let mut rows = Vec::with_capacity(responses.len());
        for response in responses {
            let answers = self.answers.answers_for_response(response.id).await?;
            rows.push(ResponseWithAnswers { response, answers });
        }
        Ok(rows)
    }

    /// One session's `(response, answers, questions)` document.
    pub async fn response_detail(&self, response_id: Uuid) -> Result<ResponseDetail> {
        let response = self.responses.response_by_id(response_id).await?;
        let answers = self.answers.answers_for_response(response.id).await?;
        let questions = self.forms.questions_for_form(response.form_id).await?;
        Ok(ResponseDetail {
            response,
            answers,
            questions,
        })
    }
}
