use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::logic::QuestionLogic;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub form_id: Uuid,
    /// Declared order within the form; drives the sequential fallback when
    /// no branching rule applies.
    pub position: i32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub settings: QuestionSettings,
    pub logic: Option<QuestionLogic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    ShortText,
    LongText,
    MultipleChoice,
    Checkboxes,
    Number,
    Date,
    Rating,
    YesNo,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::ShortText => "short_text",
            QuestionType::LongText => "long_text",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Checkboxes => "checkboxes",
            QuestionType::Number => "number",
            QuestionType::Date => "date",
            QuestionType::Rating => "rating",
            QuestionType::YesNo => "yes_no",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "short_text" => Some(QuestionType::ShortText),
            "long_text" => Some(QuestionType::LongText),
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "checkboxes" => Some(QuestionType::Checkboxes),
            "number" => Some(QuestionType::Number),
            "date" => Some(QuestionType::Date),
            "rating" => Some(QuestionType::Rating),
            "yes_no" => Some(QuestionType::YesNo),
            _ => None,
        }
    }
}

/// Loose per-type configuration. Builders only send the fields that apply
/// to the question type; everything else stays `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}
