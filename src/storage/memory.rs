use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::{AnswerRecord, AnswerValue};
use crate::models::form::Form;
use crate::models::question::Question;
use crate::models::response::{Response, ResponseStatus};

use super::{AnswerStore, FormStore, ResponseStore};

/// In-process store backing the test suites. Implements the same
/// contracts as [`super::PgStore`] over hash maps and an answer vector;
/// a single mutex stands in for the per-session serialization the
/// database gives the production store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    forms: HashMap<Uuid, Form>,
    questions: HashMap<Uuid, Vec<Question>>,
    responses: HashMap<Uuid, Response>,
    tokens: HashMap<String, Uuid>,
    answers: Vec<AnswerRecord>,
    next_seq: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn insert_form(&self, form: &Form, questions: &[Question]) -> Result<()> {
        let mut inner = self.lock();
        inner.forms.insert(form.id, form.clone());
        let mut sorted = questions.to_vec();
        sorted.sort_by_key(|q| q.position);
        inner.questions.insert(form.id, sorted);
        Ok(())
    }

    async fn form_by_id(&self, form_id: Uuid) -> Result<Form> {
        self.lock()
            .forms
            .get(&form_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Form not found".to_string()))
    }

    async fn list_forms(&self) -> Result<Vec<Form>> {
        let mut forms: Vec<Form> = self.lock().forms.values().cloned().collect();
        forms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(forms)
    }

    async fn questions_for_form(&self, form_id: Uuid) -> Result<Vec<Question>> {
        Ok(self
            .lock()
            .questions
            .get(&form_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    async fn insert_response(&self, response: &Response) -> Result<()> {
        let mut inner = self.lock();
        inner
            .tokens
            .insert(response.session_token.clone(), response.id);
        inner.responses.insert(response.id, response.clone());
        Ok(())
    }

    async fn response_by_token(&self, token: &str) -> Result<Response> {
        let inner = self.lock();
        inner
            .tokens
            .get(token)
            .and_then(|id| inner.responses.get(id))
            .cloned()
            .ok_or_else(|| Error::NotFound("Session not found".to_string()))
    }

    async fn response_by_id(&self, response_id: Uuid) -> Result<Response> {
        self.lock()
            .responses
            .get(&response_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Response not found".to_string()))
    }

    async fn responses_for_form(&self, form_id: Uuid) -> Result<Vec<Response>> {
        let mut responses: Vec<Response> = self
            .lock()
            .responses
            .values()
            .filter(|r| r.form_id == form_id)
            .cloned()
            .collect();
        responses.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(responses)
    }

    async fn advance(
        &self,
        response_id: Uuid,
        expected_question_id: Uuid,
        next_question_id: Uuid,
    ) -> Result<bool> {
        let mut inner = self.lock();
        let Some(response) = inner.responses.get_mut(&response_id) else {
            return Ok(false);
        };
        if response.status != ResponseStatus::InProgress
            || response.current_question_id != Some(expected_question_id)
        {
            return Ok(false);
        }
        response.current_question_id = Some(next_question_id);
        response.updated_at = Utc::now();
        Ok(true)
    }

    async fn complete(
        &self,
        response_id: Uuid,
        expected_question_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.lock();
        let Some(response) = inner.responses.get_mut(&response_id) else {
            return Ok(false);
        };
        if response.status != ResponseStatus::InProgress
            || response.current_question_id != Some(expected_question_id)
        {
            return Ok(false);
        }
        response.status = ResponseStatus::Completed;
        response.completed_at = Some(completed_at);
        response.current_question_id = None;
        response.updated_at = Utc::now();
        Ok(true)
    }

    async fn reopen_at(&self, response_id: Uuid, question_id: Uuid) -> Result<()> {
        let mut inner = self.lock();
        let response = inner
            .responses
            .get_mut(&response_id)
            .ok_or_else(|| Error::NotFound("Response not found".to_string()))?;
        response.status = ResponseStatus::InProgress;
        response.completed_at = None;
        response.current_question_id = Some(question_id);
        response.updated_at = Utc::now();
        Ok(())
    }

    async fn set_current_question(&self, response_id: Uuid, question_id: Uuid) -> Result<()> {
        let mut inner = self.lock();
        let response = inner
            .responses
            .get_mut(&response_id)
            .ok_or_else(|| Error::NotFound("Response not found".to_string()))?;
        response.current_question_id = Some(question_id);
        response.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl AnswerStore for MemoryStore {
    async fn record_answer(
        &self,
        response_id: Uuid,
        question_id: Uuid,
        value: &AnswerValue,
        answered_at: DateTime<Utc>,
    ) -> Result<AnswerRecord> {
        let mut inner = self.lock();
        for answer in inner
            .answers
            .iter_mut()
            .filter(|a| a.response_id == response_id && a.question_id == question_id)
        {
            answer.is_current = false;
        }
        inner.next_seq += 1;
        let record = AnswerRecord {
            id: Uuid::new_v4(),
            response_id,
            question_id,
            value: value.clone(),
            answered_at,
            is_current: true,
            seq: inner.next_seq,
        };
        inner.answers.push(record.clone());
        Ok(record)
    }

    async fn current_answers(&self, response_id: Uuid) -> Result<Vec<AnswerRecord>> {
        let mut answers: Vec<AnswerRecord> = self
            .lock()
            .answers
            .iter()
            .filter(|a| a.response_id == response_id && a.is_current)
            .cloned()
            .collect();
        answers.sort_by_key(|a| (a.answered_at, a.seq));
        Ok(answers)
    }

    async fn retire_latest(&self, response_id: Uuid) -> Result<Option<AnswerRecord>> {
        let mut inner = self.lock();
        let latest = inner
            .answers
            .iter_mut()
            .filter(|a| a.response_id == response_id && a.is_current)
            .max_by_key(|a| (a.answered_at, a.seq));
        Ok(latest.map(|answer| {
            answer.is_current = false;
            answer.clone()
        }))
    }

    async fn latest_answer(
        &self,
        response_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<AnswerRecord>> {
        Ok(self
            .lock()
            .answers
            .iter()
            .filter(|a| a.response_id == response_id && a.question_id == question_id)
            .max_by_key(|a| (a.answered_at, a.seq))
            .cloned())
    }

    async fn answers_for_response(&self, response_id: Uuid) -> Result<Vec<AnswerRecord>> {
        let mut answers: Vec<AnswerRecord> = self
            .lock()
            .answers
            .iter()
            .filter(|a| a.response_id == response_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| (a.answered_at, a.seq));
        Ok(answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_twice_leaves_one_current_row_with_later_stamp() {
        let store = MemoryStore::new();
        let response_id = Uuid::new_v4();
        let question_id = Uuid::new_v4();

        let first = store
            .record_answer(
                response_id,
                question_id,
                &AnswerValue::Text("draft".into()),
                Utc::now(),
            )
            .await
            .unwrap();
        let second = store
            .record_answer(
                response_id,
                question_id,
                &AnswerValue::Text("final".into()),
                Utc::now(),
            )
            .await
            .unwrap();

        let current = store.current_answers(response_id).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, second.id);
        assert_eq!(current[0].value, AnswerValue::Text("final".into()));
        assert!(current[0].seq > first.seq);

        // history keeps the superseded row
        let log = store.answers_for_response(response_id).await.unwrap();
        assert_eq!(log.len(), 2);
        assert!(!log[0].is_current);
    }

    #[tokio::test]
    async fn retire_latest_follows_path_order_not_position() {
        let store = MemoryStore::new();
        let response_id = Uuid::new_v4();
        let (q1, q3) = (Uuid::new_v4(), Uuid::new_v4());

        store
            .record_answer(response_id, q1, &AnswerValue::Text("a".into()), Utc::now())
            .await
            .unwrap();
        store
            .record_answer(response_id, q3, &AnswerValue::Text("c".into()), Utc::now())
            .await
            .unwrap();

        let retired = store.retire_latest(response_id).await.unwrap().unwrap();
        assert_eq!(retired.question_id, q3);
        let retired = store.retire_latest(response_id).await.unwrap().unwrap();
        assert_eq!(retired.question_id, q1);
        assert!(store.retire_latest(response_id).await.unwrap().is_none());
    }
}
