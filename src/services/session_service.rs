use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::AnswerValue;
use crate::models::form::Form;
use crate::models::question::Question;
use crate::models::response::{Response, ResponseStatus};
use crate::services::logic_service::{LogicService, NextStep};
use crate::storage::{AnswerStore, FormStore, ResponseStore};
use crate::utils::token::generate_session_token;

/// Owns the response lifecycle: start, resume, advance on a submitted
/// answer, and retreat one step of the recorded path.
///
/// Every mutation follows read current state -> decide -> write, with the
/// write compare-and-set on the session's current question so concurrent
/// duplicate requests for the same session cannot fork the answer history.
#[derive(Clone)]
pub struct SessionService {
    forms: Arc<dyn FormStore>,
    responses: Arc<dyn ResponseStore>,
    answers: Arc<dyn AnswerStore>,
    token_length: usize,
}

#[derive(Debug, Clone)]
pub struct StartedSession {
    pub response: Response,
    pub form: Form,
    pub question: Question,
    pub total_questions: usize,
}

#[derive(Debug, Clone)]
pub struct ResumedSession {
    pub response: Response,
    pub form: Form,
    pub question: Option<Question>,
    pub total_questions: usize,
    pub is_complete: bool,
}

#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    pub is_complete: bool,
    pub next_question: Option<Question>,
    pub total_questions: usize,
}

#[derive(Debug, Clone)]
pub struct RetreatOutcome {
    pub question: Question,
    pub previous_value: Option<AnswerValue>,
    pub total_questions: usize,
}

impl SessionService {
    pub fn new(
        forms: Arc<dyn FormStore>,
        responses: Arc<dyn ResponseStore>,
        answers: Arc<dyn AnswerStore>,
        token_length: usize,
    ) -> Self {
        Self {
            forms,
            responses,
            answers,
            token_length,
        }
    }

    /// Open a new session against a form, positioned at the first question
    /// by declared order.
    pub async fn start(&self, form_id: Uuid) -> Result<StartedSession> {
        let form = self.forms.form_by_id(form_id).await?;
        if !form.is_active {
            return Err(Error::NotFound("Form not found".to_string()));
        }
        let questions = self.forms.questions_for_form(form_id).await?;
        let first = questions
            .first()
            .ok_or_else(|| Error::BadRequest("Form has no questions to answer".to_string()))?
            .clone();

        let now = Utc::now();
        let response = Response {
            id: Uuid::new_v4(),
            form_id,
            session_token: generate_session_token(self.token_length),
            status: ResponseStatus::InProgress,
            current_question_id: Some(first.id),
            started_at: now,
            completed_at: None,
            updated_at: now,
        };
        self.responses.insert_response(&response).await?;

        tracing::info!(response_id = %response.id, form_id = %form_id, "Session started");

        Ok(StartedSession {
            response,
            form,
            question: first,
            total_questions: questions.len(),
        })
    }

    /// Rehydrate a session for a returning respondent. Read-only apart
    /// from repairing a missing current-question pointer.
    pub async fn resume(&self, token: &str) -> Result<ResumedSession> {
        let response = self.responses.response_by_token(token).await?;
        let form = self.forms.form_by_id(response.form_id).await?;
        let questions = self.forms.questions_for_form(response.form_id).await?;
        let total_questions = questions.len();

        if response.status == ResponseStatus::Completed {
            return Ok(ResumedSession {
                response,
                form,
                question: None,
                total_questions,
                is_complete: true,
            });
        }

        let question = match response
            .current_question_id
            .and_then(|id| questions.iter().find(|q| q.id == id))
        {
            Some(q) => q.clone(),
            None => {
                let first = questions
                    .first()
                    .ok_or_else(|| {
                        Error::BadRequest("Form has no questions to answer".to_string())
                    })?
                    .clone();
                tracing::warn!(
                    response_id = %response.id,
                    "Session has no usable current question, repairing to first"
                );
                self.responses
                    .set_current_question(response.id, first.id)
                    .await?;
                first
            }
        };

        Ok(ResumedSession {
            response,
            form,
            question: Some(question),
            total_questions,
            is_complete: false,
        })
    }

    /// Accept an answer for the session's current question, persist it,
    /// and move the session to whatever the branching logic resolves.
    pub async fn submit_answer(
        &self,
        token: &str,
        question_id: Uuid,
        value: AnswerValue,
    ) -> Result<AdvanceOutcome> {
        let response = self.responses.response_by_token(token).await?;
        if response.current_question_id != Some(question_id) {
            return Err(Error::SequenceViolation(
                "Answer submitted for a question that is not the session's current question"
                    .to_string(),
            ));
        }

        let questions = self.forms.questions_for_form(response.form_id).await?;
        let question = questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| Error::NotFound("Question not found".to_string()))?
            .clone();

        let now = Utc::now();
        self.answers
            .record_answer(response.id, question_id, &value, now)
            .await?;

        let outcome = match LogicService::resolve_next(&question, &value, &questions) {
            NextStep::Complete => {
                if !self.responses.complete(response.id, question_id, now).await? {
                    return Err(Error::SequenceViolation(
                        "Session was advanced by a concurrent request".to_string(),
                    ));
                }
                tracing::info!(response_id = %response.id, "Session completed");
                AdvanceOutcome {
                    is_complete: true,
                    next_question: None,
                    total_questions: questions.len(),
                }
            }
            NextStep::Question(target_id) => {
                if !self
                    .responses
                    .advance(response.id, question_id, target_id)
                    .await?
                {
                    return Err(Error::SequenceViolation(
                        "Session was advanced by a concurrent request".to_string(),
                    ));
                }
                let next_question = questions
                    .iter()
                    .find(|q| q.id == target_id)
                    .cloned()
                    .ok_or_else(|| {
                        Error::Internal("Resolved next question is not in the form".to_string())
                    })?;
                tracing::info!(
                    response_id = %response.id,
                    from = %question_id,
                    to = %target_id,
                    "Session advanced"
                );
                AdvanceOutcome {
                    is_complete: false,
                    next_question: Some(next_question),
                    total_questions: questions.len(),
                }
            }
        };

        Ok(outcome)
    }

    /// Reverse exactly one step of the recorded path: retire the most
    /// recently answered question's current answer and point the session
    /// back at that question. Retreating from a completed session reopens
    /// it.
    pub async fn navigate_back(&self, token: &str, shown_question_id: Uuid) -> Result<RetreatOutcome> {
        let response = self.responses.response_by_token(token).await?;

        if response.current_question_id != Some(shown_question_id) {
            // The client's idea of "current" is informational only; the
            // stored path decides where back goes.
            tracing::debug!(
                response_id = %response.id,
                shown = %shown_question_id,
                "Back navigation from a stale question pointer"
            );
        }

        let retired = self
            .answers
            .retire_latest(response.id)
            .await?
            .ok_or(Error::NoPriorAnswer)?;

        self.responses
            .reopen_at(response.id, retired.question_id)
            .await?;

        let questions = self.forms.questions_for_form(response.form_id).await?;
        let question = questions
            .iter()
            .find(|q| q.id == retired.question_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Question is no longer part of the form".to_string()))?;

        // The retired row stays in the log; it is what pre-fills the
        // question when it is shown again.
        let previous_value = self
            .answers
            .latest_answer(response.id, retired.question_id)
            .await?
            .map(|record| record.value);

        tracing::info!(
            response_id = %response.id,
            to = %retired.question_id,
            "Session navigated back"
        );

        Ok(RetreatOutcome {
            question,
            previous_value,
            total_questions: questions.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::logic::{
        ConditionCombinator, ConditionOperator, DefaultAction, LogicCondition, LogicRule,
        QuestionLogic, RuleAction,
    };
    use crate::models::question::{QuestionSettings, QuestionType};
    use crate::storage::{MemoryStore, MockResponseStore};
    use serde_json::json;

    fn service(store: Arc<MemoryStore>) -> SessionService {
        SessionService::new(store.clone(), store.clone(), store, 32)
    }

    fn form() -> Form {
        let now = Utc::now();
        Form {
            id: Uuid::new_v4(),
            title: "Onboarding survey".into(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn question(form_id: Uuid, position: i32, logic: Option<QuestionLogic>) -> Question {
        Question {
            id: Uuid::new_v4(),
            form_id,
            position,
            question_type: QuestionType::ShortText,
            label: format!("Question {}", position),
            required: false,
            settings: QuestionSettings::default(),
            logic,
        }
    }

    fn jump_logic(on_value: &str, target: Uuid) -> QuestionLogic {
        QuestionLogic {
            rules: vec![LogicRule {
                conditions: vec![LogicCondition {
                    operator: ConditionOperator::Equals,
                    value: json!(on_value),
                }],
                condition_operator: ConditionCombinator::And,
                action: RuleAction::Jump {
                    target_question_id: target,
                },
            }],
            default_action: DefaultAction::Next,
            default_target: None,
        }
    }

    /// Three questions in positional order; Q1 jumps to Q3 when answered
    /// with "skip".
    async fn seed_branching_form(store: &Arc<MemoryStore>) -> (Form, Vec<Question>) {
        let form = form();
        let q2 = question(form.id, 2, None);
        let q3 = question(form.id, 3, None);
        let mut q1 = question(form.id, 1, None);
        q1.logic = Some(jump_logic("skip", q3.id));
        let questions = vec![q1, q2, q3];
        store.insert_form(&form, &questions).await.unwrap();
        (form, questions)
    }

    fn text(s: &str) -> AnswerValue {
        AnswerValue::Text(s.to_string())
    }

    #[tokio::test]
    async fn start_positions_session_at_first_question() {
        let store = Arc::new(MemoryStore::new());
        let (form, questions) = seed_branching_form(&store).await;
        let svc = service(store);

        let started = svc.start(form.id).await.unwrap();
        assert_eq!(started.question.id, questions[0].id);
        assert_eq!(started.total_questions, 3);
        assert_eq!(started.response.status, ResponseStatus::InProgress);
        assert_eq!(started.response.session_token.len(), 32);
    }

    #[tokio::test]
    async fn start_fails_when_form_has_no_questions() {
        let store = Arc::new(MemoryStore::new());
        let f = form();
        store.insert_form(&f, &[]).await.unwrap();
        let svc = service(store);

        let err = svc.start(f.id).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn start_hides_inactive_forms() {
        let store = Arc::new(MemoryStore::new());
        let mut f = form();
        f.is_active = false;
        let q = question(f.id, 1, None);
        store.insert_form(&f, &[q]).await.unwrap();
        let svc = service(store);

        let err = svc.start(f.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn jump_then_back_returns_last_answered_not_positional_previous() {
        let store = Arc::new(MemoryStore::new());
        let (form, questions) = seed_branching_form(&store).await;
        let svc = service(store);

        let started = svc.start(form.id).await.unwrap();
        let token = started.response.session_token.clone();

        // "skip" fires the jump rule: Q1 -> Q3, over Q2
        let advanced = svc
            .submit_answer(&token, questions[0].id, text("skip"))
            .await
            .unwrap();
        assert_eq!(advanced.next_question.as_ref().unwrap().id, questions[2].id);

        // back from Q3 must return Q1 (the question actually answered
        // last), not Q2 (the positional neighbour)
        let retreat = svc.navigate_back(&token, questions[2].id).await.unwrap();
        assert_eq!(retreat.question.id, questions[0].id);
        assert_eq!(retreat.previous_value, Some(text("skip")));
    }

    #[tokio::test]
    async fn non_matching_answer_advances_positionally() {
        let store = Arc::new(MemoryStore::new());
        let (form, questions) = seed_branching_form(&store).await;
        let svc = service(store);

        let started = svc.start(form.id).await.unwrap();
        let advanced = svc
            .submit_answer(
                &started.response.session_token,
                questions[0].id,
                text("something else"),
            )
            .await
            .unwrap();
        assert_eq!(advanced.next_question.as_ref().unwrap().id, questions[1].id);
    }

    #[tokio::test]
    async fn completing_then_back_reopens_the_response() {
        let store = Arc::new(MemoryStore::new());
        let (form, questions) = seed_branching_form(&store).await;
        let svc = service(store.clone());

        let started = svc.start(form.id).await.unwrap();
        let token = started.response.session_token.clone();

        svc.submit_answer(&token, questions[0].id, text("skip"))
            .await
            .unwrap();
        let done = svc
            .submit_answer(&token, questions[2].id, text("bye"))
            .await
            .unwrap();
        assert!(done.is_complete);

        let completed = store.response_by_token(&token).await.unwrap();
        assert_eq!(completed.status, ResponseStatus::Completed);
        assert!(completed.completed_at.is_some());

        let retreat = svc.navigate_back(&token, questions[2].id).await.unwrap();
        assert_eq!(retreat.question.id, questions[2].id);

        let reopened = store.response_by_token(&token).await.unwrap();
        assert_eq!(reopened.status, ResponseStatus::InProgress);
        assert!(reopened.completed_at.is_none());
        assert_eq!(reopened.current_question_id, Some(questions[2].id));
    }

    #[tokio::test]
    async fn out_of_order_submission_is_rejected_without_mutation() {
        let store = Arc::new(MemoryStore::new());
        let (form, questions) = seed_branching_form(&store).await;
        let svc = service(store.clone());

        let started = svc.start(form.id).await.unwrap();
        let token = started.response.session_token.clone();

        let err = svc
            .submit_answer(&token, questions[1].id, text("early"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SequenceViolation(_)));
        assert!(store
            .answers_for_response(started.response.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn duplicate_submit_after_advance_is_a_sequence_violation() {
        let store = Arc::new(MemoryStore::new());
        let (form, questions) = seed_branching_form(&store).await;
        let svc = service(store.clone());

        let started = svc.start(form.id).await.unwrap();
        let token = started.response.session_token.clone();

        svc.submit_answer(&token, questions[0].id, text("first"))
            .await
            .unwrap();
        let err = svc
            .submit_answer(&token, questions[0].id, text("again"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SequenceViolation(_)));

        let log = store
            .answers_for_response(started.response.id)
            .await
            .unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].value, text("first"));
    }

    #[tokio::test]
    async fn resubmission_after_back_overwrites_the_current_answer() {
        let store = Arc::new(MemoryStore::new());
        let (form, questions) = seed_branching_form(&store).await;
        let svc = service(store.clone());

        let started = svc.start(form.id).await.unwrap();
        let token = started.response.session_token.clone();

        svc.submit_answer(&token, questions[0].id, text("draft"))
            .await
            .unwrap();
        let retreat = svc.navigate_back(&token, questions[1].id).await.unwrap();
        assert_eq!(retreat.previous_value, Some(text("draft")));

        svc.submit_answer(&token, questions[0].id, text("final"))
            .await
            .unwrap();

        let current = store
            .current_answers(started.response.id)
            .await
            .unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].question_id, questions[0].id);
        assert_eq!(current[0].value, text("final"));
        // the superseded draft stays in the log
        assert_eq!(
            store
                .answers_for_response(started.response.id)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn back_at_the_first_question_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (form, questions) = seed_branching_form(&store).await;
        let svc = service(store);

        let started = svc.start(form.id).await.unwrap();
        let err = svc
            .navigate_back(&started.response.session_token, questions[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoPriorAnswer));
    }

    #[tokio::test]
    async fn resume_repairs_a_missing_pointer() {
        let store = Arc::new(MemoryStore::new());
        let (form, questions) = seed_branching_form(&store).await;
        let svc = service(store.clone());

        let now = Utc::now();
        let response = Response {
            id: Uuid::new_v4(),
            form_id: form.id,
            session_token: "damaged-session".into(),
            status: ResponseStatus::InProgress,
            current_question_id: None,
            started_at: now,
            completed_at: None,
            updated_at: now,
        };
        store.insert_response(&response).await.unwrap();

        let resumed = svc.resume("damaged-session").await.unwrap();
        assert!(!resumed.is_complete);
        assert_eq!(resumed.question.as_ref().unwrap().id, questions[0].id);

        // the repair is persisted
        let repaired = store.response_by_token("damaged-session").await.unwrap();
        assert_eq!(repaired.current_question_id, Some(questions[0].id));
    }

    #[tokio::test]
    async fn resume_of_a_completed_session_reports_completion() {
        let store = Arc::new(MemoryStore::new());
        let (form, questions) = seed_branching_form(&store).await;
        let svc = service(store);

        let started = svc.start(form.id).await.unwrap();
        let token = started.response.session_token.clone();
        svc.submit_answer(&token, questions[0].id, text("skip"))
            .await
            .unwrap();
        svc.submit_answer(&token, questions[2].id, text("done"))
            .await
            .unwrap();

        let resumed = svc.resume(&token).await.unwrap();
        assert!(resumed.is_complete);
        assert!(resumed.question.is_none());
        assert_eq!(resumed.total_questions, 3);
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store);
        let err = svc.resume("no-such-session").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn losing_the_advance_race_surfaces_as_sequence_violation() {
        let store = Arc::new(MemoryStore::new());
        let (form, questions) = seed_branching_form(&store).await;

        let now = Utc::now();
        let response = Response {
            id: Uuid::new_v4(),
            form_id: form.id,
            session_token: "racy-session".into(),
            status: ResponseStatus::InProgress,
            current_question_id: Some(questions[0].id),
            started_at: now,
            completed_at: None,
            updated_at: now,
        };

        let mut responses = MockResponseStore::new();
        let returned = response.clone();
        responses
            .expect_response_by_token()
            .returning(move |_| Ok(returned.clone()));
        // another request already moved the session on
        responses.expect_advance().returning(|_, _, _| Ok(false));

        let svc = SessionService::new(
            store.clone(),
            Arc::new(responses),
            store.clone(),
            32,
        );
        let err = svc
            .submit_answer("racy-session", questions[0].id, text("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SequenceViolation(_)));
    }
}
