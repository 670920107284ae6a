use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::{AnswerRecord, AnswerValue};
use crate::models::form::Form;
use crate::models::question::{Question, QuestionType};
use crate::models::response::{Response, ResponseStatus};

use super::{AnswerStore, FormStore, ResponseStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct FormRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FormRow> for Form {
    fn from(r: FormRow) -> Self {
        Form {
            id: r.id,
            title: r.title,
            description: r.description,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    form_id: Uuid,
    position: i32,
    question_type: String,
    label: String,
    required: bool,
    settings: JsonValue,
    logic: Option<JsonValue>,
}

impl QuestionRow {
    fn into_question(self) -> Result<Question> {
        let question_type = QuestionType::parse(&self.question_type).ok_or_else(|| {
            Error::Internal(format!("Unknown question type: {}", self.question_type))
        })?;
        // A settings or logic blob this server cannot read degrades to
        // "no settings / no branching" instead of failing the request.
        let question_id = self.id;
        let settings = serde_json::from_value(self.settings).unwrap_or_default();
        let logic = self.logic.and_then(|raw| match serde_json::from_value(raw) {
            Ok(logic) => Some(logic),
            Err(err) => {
                tracing::warn!(question_id = %question_id, error = %err, "Unreadable logic configuration, treating as sequential");
                None
            }
        });
        Ok(Question {
            id: self.id,
            form_id: self.form_id,
            position: self.position,
            question_type,
            label: self.label,
            required: self.required,
            settings,
            logic,
        })
    }
}

#[derive(FromRow)]
struct ResponseRow {
    id: Uuid,
    form_id: Uuid,
    session_token: String,
    status: String,
    current_question_id: Option<Uuid>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl ResponseRow {
    fn into_response(self) -> Result<Response> {
        let status = ResponseStatus::parse(&self.status)
            .ok_or_else(|| Error::Internal(format!("Unknown response status: {}", self.status)))?;
        Ok(Response {
            id: self.id,
            form_id: self.form_id,
            session_token: self.session_token,
            status,
            current_question_id: self.current_question_id,
            started_at: self.started_at,
            completed_at: self.completed_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AnswerRow {
    id: Uuid,
    seq: i64,
    response_id: Uuid,
    question_id: Uuid,
    answer_value: JsonValue,
    answered_at: DateTime<Utc>,
    is_current: bool,
}

impl AnswerRow {
    fn into_record(self) -> Result<AnswerRecord> {
        let value: AnswerValue = serde_json::from_value(self.answer_value)?;
        Ok(AnswerRecord {
            id: self.id,
            response_id: self.response_id,
            question_id: self.question_id,
            value,
            answered_at: self.answered_at,
            is_current: self.is_current,
            seq: self.seq,
        })
    }
}

#[async_trait]
impl FormStore for PgStore {
    async fn insert_form(&self, form: &Form, questions: &[Question]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO forms (id, title, description, is_active, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(form.id)
        .bind(&form.title)
        .bind(&form.description)
        .bind(form.is_active)
        .bind(form.created_at)
        .bind(form.updated_at)
        .execute(&mut *tx)
        .await?;

        for question in questions {
            let logic_json = question
                .logic
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?;
            sqlx::query(
                r#"INSERT INTO questions (id, form_id, position, question_type, label, required, settings, logic)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
            )
            .bind(question.id)
            .bind(question.form_id)
            .bind(question.position)
            .bind(question.question_type.as_str())
            .bind(&question.label)
            .bind(question.required)
            .bind(serde_json::to_value(&question.settings)?)
            .bind(logic_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn form_by_id(&self, form_id: Uuid) -> Result<Form> {
        let row = sqlx::query_as::<_, FormRow>(
            r#"SELECT id, title, description, is_active, created_at, updated_at
               FROM forms WHERE id = $1"#,
        )
        .bind(form_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_forms(&self) -> Result<Vec<Form>> {
        let rows = sqlx::query_as::<_, FormRow>(
            r#"SELECT id, title, description, is_active, created_at, updated_at
               FROM forms ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Form::from).collect())
    }

    async fn questions_for_form(&self, form_id: Uuid) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"SELECT id, form_id, position, question_type, label, required, settings, logic
               FROM questions WHERE form_id = $1 ORDER BY position ASC"#,
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(QuestionRow::into_question).collect()
    }
}

#[async_trait]
impl ResponseStore for PgStore {
    async fn insert_response(&self, response: &Response) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO responses
               (id, form_id, session_token, status, current_question_id, started_at, completed_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(response.id)
        .bind(response.form_id)
        .bind(&response.session_token)
        .bind(response.status.as_str())
        .bind(response.current_question_id)
        .bind(response.started_at)
        .bind(response.completed_at)
        .bind(response.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn response_by_token(&self, token: &str) -> Result<Response> {
        let row = sqlx::query_as::<_, ResponseRow>(
            r#"SELECT id, form_id, session_token, status, current_question_id,
                      started_at, completed_at, updated_at
               FROM responses WHERE session_token = $1"#,
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        row.into_response()
    }

    async fn response_by_id(&self, response_id: Uuid) -> Result<Response> {
        let row = sqlx::query_as::<_, ResponseRow>(
            r#"SELECT id, form_id, session_token, status, current_question_id,
                      started_at, completed_at, updated_at
               FROM responses WHERE id = $1"#,
        )
        .bind(response_id)
        .fetch_one(&self.pool)
        .await?;
        row.into_response()
    }

    async fn responses_for_form(&self, form_id: Uuid) -> Result<Vec<Response>> {
        let rows = sqlx::query_as::<_, ResponseRow>(
            r#"SELECT id, form_id, session_token, status, current_question_id,
                      started_at, completed_at, updated_at
               FROM responses WHERE form_id = $1 ORDER BY started_at DESC"#,
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ResponseRow::into_response).collect()
    }

    async fn advance(
        &self,
        response_id: Uuid,
        expected_question_id: Uuid,
        next_question_id: Uuid,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE responses
               SET current_question_id = $3, updated_at = NOW()
               WHERE id = $1 AND current_question_id = $2 AND status = 'in_progress'"#,
        )
        .bind(response_id)
        .bind(expected_question_id)
        .bind(next_question_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete(
        &self,
        response_id: Uuid,
        expected_question_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE responses
               SET status = 'completed', completed_at = $3,
                   current_question_id = NULL, updated_at = NOW()
               WHERE id = $1 AND current_question_id = $2 AND status = 'in_progress'"#,
        )
        .bind(response_id)
        .bind(expected_question_id)
        .bind(completed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn reopen_at(&self, response_id: Uuid, question_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"UPDATE responses
               SET status = 'in_progress', completed_at = NULL,
                   current_question_id = $2, updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(response_id)
        .bind(question_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_current_question(&self, response_id: Uuid, question_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"UPDATE responses SET current_question_id = $2, updated_at = NOW() WHERE id = $1"#,
        )
        .bind(response_id)
        .bind(question_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AnswerStore for PgStore {
    async fn record_answer(
        &self,
        response_id: Uuid,
        question_id: Uuid,
        value: &AnswerValue,
        answered_at: DateTime<Utc>,
    ) -> Result<AnswerRecord> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"UPDATE answers SET is_current = FALSE
               WHERE response_id = $1 AND question_id = $2 AND is_current"#,
        )
        .bind(response_id)
        .bind(question_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, AnswerRow>(
            r#"INSERT INTO answers (id, response_id, question_id, answer_value, answered_at, is_current)
               VALUES ($1, $2, $3, $4, $5, TRUE)
               RETURNING id, seq, response_id, question_id, answer_value, answered_at, is_current"#,
        )
        .bind(Uuid::new_v4())
        .bind(response_id)
        .bind(question_id)
        .bind(serde_json::to_value(value)?)
        .bind(answered_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_record()
    }

    async fn current_answers(&self, response_id: Uuid) -> Result<Vec<AnswerRecord>> {
        let rows = sqlx::query_as::<_, AnswerRow>(
            r#"SELECT id, seq, response_id, question_id, answer_value, answered_at, is_current
               FROM answers WHERE response_id = $1 AND is_current
               ORDER BY answered_at ASC, seq ASC"#,
        )
        .bind(response_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AnswerRow::into_record).collect()
    }

    async fn retire_latest(&self, response_id: Uuid) -> Result<Option<AnswerRecord>> {
        let row = sqlx::query_as::<_, AnswerRow>(
            r#"UPDATE answers SET is_current = FALSE
               WHERE id = (
                   SELECT id FROM answers
                   WHERE response_id = $1 AND is_current
                   ORDER BY answered_at DESC, seq DESC
                   LIMIT 1
               )
               RETURNING id, seq, response_id, question_id, answer_value, answered_at, is_current"#,
        )
        .bind(response_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AnswerRow::into_record).transpose()
    }

    async fn latest_answer(
        &self,
        response_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<AnswerRecord>> {
        let row = sqlx::query_as::<_, AnswerRow>(
            r#"SELECT id, seq, response_id, question_id, answer_value, answered_at, is_current
               FROM answers WHERE response_id = $1 AND question_id = $2
               ORDER BY answered_at DESC, seq DESC
               LIMIT 1"#,
        )
        .bind(response_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AnswerRow::into_record).transpose()
    }

    async fn answers_for_response(&self, response_id: Uuid) -> Result<Vec<AnswerRecord>> {
        let rows = sqlx::query_as::<_, AnswerRow>(
            r#"SELECT id, seq, response_id, question_id, answer_value, answered_at, is_current
               FROM answers WHERE response_id = $1
               ORDER BY answered_at ASC, seq ASC"#,
        )
        .bind(response_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AnswerRow::into_record).collect()
    }
}
