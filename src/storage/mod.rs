pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::answer::{AnswerRecord, AnswerValue};
use crate::models::form::Form;
use crate::models::question::Question;
use crate::models::response::Response;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Form and question lookup, ordered by declared position.
#[async_trait]
pub trait FormStore: Send + Sync {
    async fn insert_form(&self, form: &Form, questions: &[Question]) -> Result<()>;
    async fn form_by_id(&self, form_id: Uuid) -> Result<Form>;
    async fn list_forms(&self) -> Result<Vec<Form>>;
    /// All questions of a form, sorted ascending by `position`.
    async fn questions_for_form(&self, form_id: Uuid) -> Result<Vec<Question>>;
}

/// Response records addressed by id or session token.
///
/// `advance` and `complete` are compare-and-set: they only apply when the
/// stored `current_question_id` still equals `expected_question_id` and the
/// response is in progress, and report whether they did. Racing duplicate
/// submissions lose the race instead of corrupting the recorded path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResponseStore: Send + Sync {
    async fn insert_response(&self, response: &Response) -> Result<()>;
    async fn response_by_token(&self, token: &str) -> Result<Response>;
    async fn response_by_id(&self, response_id: Uuid) -> Result<Response>;
    async fn responses_for_form(&self, form_id: Uuid) -> Result<Vec<Response>>;
    async fn advance(
        &self,
        response_id: Uuid,
        expected_question_id: Uuid,
        next_question_id: Uuid,
    ) -> Result<bool>;
    async fn complete(
        &self,
        response_id: Uuid,
        expected_question_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<bool>;
    /// Point the session back at `question_id` and un-complete it.
    async fn reopen_at(&self, response_id: Uuid, question_id: Uuid) -> Result<()>;
    async fn set_current_question(&self, response_id: Uuid, question_id: Uuid) -> Result<()>;
}

/// Append-only answer log with a derived "current" projection.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Record a value for (response, question): retires any previous
    /// current row for the pair and appends a fresh current one.
    async fn record_answer(
        &self,
        response_id: Uuid,
        question_id: Uuid,
        value: &AnswerValue,
        answered_at: DateTime<Utc>,
    ) -> Result<AnswerRecord>;
    /// Current rows ordered by `(answered_at, seq)` ascending: the
    /// respondent's actual path through the form.
    async fn current_answers(&self, response_id: Uuid) -> Result<Vec<AnswerRecord>>;
    /// Retire the most recent current row and return it, if any.
    async fn retire_latest(&self, response_id: Uuid) -> Result<Option<AnswerRecord>>;
    /// Most recent row for the pair, retired rows included (pre-fill).
    async fn latest_answer(
        &self,
        response_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<AnswerRecord>>;
    /// The full log, oldest first.
    async fn answers_for_response(&self, response_id: Uuid) -> Result<Vec<AnswerRecord>>;
}
