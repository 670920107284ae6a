use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Typed answer payload. Each question type maps onto one of these shapes;
/// `Skipped` is the explicit marker an optional question records when the
/// respondent moves on without answering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Choice(String),
    Choices(Vec<String>),
    Date(NaiveDate),
    Skipped,
}

/// One entry in a response's answer log. The log is append-only: a
/// re-answered or retracted question retires its old row (`is_current`
/// drops to false) instead of deleting it, so the full history stays
/// available for audit and pre-fill.
///
/// `seq` is the insertion counter; ordering current rows by
/// `(answered_at, seq)` reconstructs the exact path the respondent took,
/// jumps included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: Uuid,
    pub response_id: Uuid,
    pub question_id: Uuid,
    pub value: AnswerValue,
    pub answered_at: DateTime<Utc>,
    pub is_current: bool,
    pub seq: i64,
}
