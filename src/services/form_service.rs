use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::dto::integration_dto::CreateFormPayload;
use crate::error::Result;
use crate::models::form::Form;
use crate::models::question::Question;
use crate::storage::{FormStore, ResponseStore};

#[derive(Clone)]
pub struct FormService {
    forms: Arc<dyn FormStore>,
    responses: Arc<dyn ResponseStore>,
}

#[derive(Debug, Clone)]
pub struct FormOverview {
    pub form: Form,
    pub question_count: usize,
    pub response_count: usize,
}

impl FormService {
    pub fn new(forms: Arc<dyn FormStore>, responses: Arc<dyn ResponseStore>) -> Self {
        Self { forms, responses }
    }

    /// Persist a form together with its questions. Positions come from
    /// payload order; question ids may be supplied by the builder (logic
    /// jump targets reference them) or are generated here.
    pub async fn create_form(&self, payload: CreateFormPayload) -> Result<(Form, Vec<Question>)> {
        let now = Utc::now();
        let form = Form {
            id: Uuid::new_v4(),
            title: payload.title,
            description: payload.description,
            is_active: payload.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let questions: Vec<Question> = payload
            .questions
            .into_iter()
            .enumerate()
            .map(|(idx, q)| Question {
                id: q.id.unwrap_or_else(Uuid::new_v4),
                form_id: form.id,
                position: idx as i32 + 1,
                question_type: q.question_type,
                label: q.label,
                required: q.required.unwrap_or(false),
                settings: q.settings.unwrap_or_default(),
                logic: q.logic,
            })
            .collect();

        self.forms.insert_form(&form, &questions).await?;
        tracing::info!(form_id = %form.id, questions = questions.len(), "Form created");
        Ok((form, questions))
    }

    pub async fn get_form(&self, form_id: Uuid) -> Result<(Form, Vec<Question>)> {
        let form = self.forms.form_by_id(form_id).await?;
        let questions = self.forms.questions_for_form(form_id).await?;
        Ok((form, questions))
    }

    pub async fn list_forms(&self) -> Result<Vec<FormOverview>> {
        let forms = self.forms.list_forms().await?;
        let mut overviews = Vec::with_capacity(forms.len());
        for form in forms {
            let question_count = self.forms.questions_for_form(form.id).await?.len();
            let response_count = self.responses.responses_for_form(form.id).await?.len();
            overviews.push(FormOverview {
                form,
                question_count,
                response_count,
            });
        }
        Ok(overviews)
    }
}
