use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::answer::AnswerValue;
use crate::models::logic::{
    ConditionCombinator, ConditionOperator, DefaultAction, LogicCondition, LogicRule, RuleAction,
};
use crate::models::question::Question;

/// Where the session goes after an answer is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    Question(Uuid),
    Complete,
}

pub struct LogicService;

impl LogicService {
    /// Evaluate one predicate against the submitted answer.
    ///
    /// Comparisons are deliberately permissive: a type mismatch, an
    /// unparseable number or date, or an operator this server does not know
    /// all evaluate to `false` rather than erroring, so a broken logic
    /// configuration degrades to sequential flow instead of taking the
    /// respondent's session down.
    pub fn evaluate_condition(condition: &LogicCondition, answer: &AnswerValue) -> bool {
        let operand = &condition.value;
        match condition.operator {
            ConditionOperator::Equals => Self::values_equal(answer, operand),
            ConditionOperator::NotEquals => !Self::values_equal(answer, operand),
            ConditionOperator::Contains => {
                Self::answer_as_string(answer).contains(&Self::operand_as_string(operand))
            }
            ConditionOperator::NotContains => {
                !Self::answer_as_string(answer).contains(&Self::operand_as_string(operand))
            }
            ConditionOperator::GreaterThan => {
                Self::numeric_pair(answer, operand).map_or(false, |(a, b)| a > b)
            }
            ConditionOperator::LessThan => {
                Self::numeric_pair(answer, operand).map_or(false, |(a, b)| a < b)
            }
            ConditionOperator::GreaterThanOrEqual => {
                Self::numeric_pair(answer, operand).map_or(false, |(a, b)| a >= b)
            }
            ConditionOperator::LessThanOrEqual => {
                Self::numeric_pair(answer, operand).map_or(false, |(a, b)| a <= b)
            }
            ConditionOperator::IsEmpty => Self::is_empty(answer),
            ConditionOperator::IsNotEmpty => !Self::is_empty(answer),
            ConditionOperator::Before => {
                Self::date_pair(answer, operand).map_or(false, |(a, b)| a < b)
            }
            ConditionOperator::After => {
                Self::date_pair(answer, operand).map_or(false, |(a, b)| a > b)
            }
            ConditionOperator::Unknown => false,
        }
    }

    /// Combine a rule's conditions. AND over an empty list is vacuously
    /// true, OR over an empty list is vacuously false.
    pub fn rule_matches(rule: &LogicRule, answer: &AnswerValue) -> bool {
        match rule.condition_operator {
            ConditionCombinator::And => rule
                .conditions
                .iter()
                .all(|c| Self::evaluate_condition(c, answer)),
            ConditionCombinator::Or => rule
                .conditions
                .iter()
                .any(|c| Self::evaluate_condition(c, answer)),
        }
    }

    /// Resolve the next step after `current` was answered with `answer`.
    ///
    /// Precedence: first matching rule, then the configured default, then
    /// the positional order of `questions` (which must be sorted by
    /// position). A jump whose target is not in the form is treated as
    /// unresolved and falls through the same chain.
    pub fn resolve_next(
        current: &Question,
        answer: &AnswerValue,
        questions: &[Question],
    ) -> NextStep {
        if let Some(logic) = &current.logic {
            for rule in &logic.rules {
                if !Self::rule_matches(rule, answer) {
                    continue;
                }
                match rule.action {
                    RuleAction::End => return NextStep::Complete,
                    RuleAction::Jump { target_question_id } => {
                        if questions.iter().any(|q| q.id == target_question_id) {
                            return NextStep::Question(target_question_id);
                        }
                        tracing::warn!(
                            question_id = %current.id,
                            target = %target_question_id,
                            "logic jump targets a question not in the form, ignoring"
                        );
                    }
                }
                // First match wins even when its target is dangling.
                break;
            }

            match logic.default_action {
                DefaultAction::End => return NextStep::Complete,
                DefaultAction::Next => {
                    if let Some(target) = logic.default_target {
                        if questions.iter().any(|q| q.id == target) {
                            return NextStep::Question(target);
                        }
                    }
                }
            }
        }

        match questions.iter().position(|q| q.id == current.id) {
            Some(idx) if idx + 1 < questions.len() => NextStep::Question(questions[idx + 1].id),
            _ => NextStep::Complete,
        }
    }

    /// Strict, type-sensitive equality between an answer and a raw operand.
    fn values_equal(answer: &AnswerValue, operand: &JsonValue) -> bool {
        match (answer, operand) {
            (AnswerValue::Text(s), JsonValue::String(o)) => s == o,
            (AnswerValue::Choice(s), JsonValue::String(o)) => s == o,
            (AnswerValue::Number(n), JsonValue::Number(o)) => {
                o.as_f64().map_or(false, |o| *n == o)
            }
            (AnswerValue::Bool(b), JsonValue::Bool(o)) => b == o,
            (AnswerValue::Date(d), JsonValue::String(o)) => d.to_string() == *o,
            (AnswerValue::Choices(items), JsonValue::Array(os)) => {
                items.len() == os.len()
                    && items
                        .iter()
                        .zip(os)
                        .all(|(item, o)| o.as_str() == Some(item.as_str()))
            }
            (AnswerValue::Skipped, JsonValue::Null) => true,
            _ => false,
        }
    }

    fn answer_as_string(answer: &AnswerValue) -> String {
        match answer {
            AnswerValue::Text(s) | AnswerValue::Choice(s) => s.clone(),
            AnswerValue::Number(n) => n.to_string(),
            AnswerValue::Bool(b) => b.to_string(),
            AnswerValue::Date(d) => d.to_string(),
            AnswerValue::Choices(items) => items.join(","),
            AnswerValue::Skipped => String::new(),
        }
    }

    fn operand_as_string(operand: &JsonValue) -> String {
        match operand {
            JsonValue::String(s) => s.clone(),
            JsonValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn numeric_pair(answer: &AnswerValue, operand: &JsonValue) -> Option<(f64, f64)> {
        Some((Self::answer_as_number(answer)?, Self::operand_as_number(operand)?))
    }

    fn answer_as_number(answer: &AnswerValue) -> Option<f64> {
        match answer {
            AnswerValue::Number(n) => Some(*n),
            AnswerValue::Text(s) | AnswerValue::Choice(s) => s.trim().parse().ok(),
            AnswerValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn operand_as_number(operand: &JsonValue) -> Option<f64> {
        match operand {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            JsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn is_empty(answer: &AnswerValue) -> bool {
        match answer {
            AnswerValue::Skipped => true,
            AnswerValue::Text(s) | AnswerValue::Choice(s) => s.is_empty(),
            AnswerValue::Choices(items) => items.is_empty(),
            _ => false,
        }
    }

    fn date_pair(answer: &AnswerValue, operand: &JsonValue) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((Self::answer_as_date(answer)?, Self::operand_as_date(operand)?))
    }

    fn answer_as_date(answer: &AnswerValue) -> Option<DateTime<Utc>> {
        match answer {
            AnswerValue::Date(d) => Some(d.and_hms_opt(0, 0, 0)?.and_utc()),
            AnswerValue::Text(s) | AnswerValue::Choice(s) => Self::parse_date(s),
            _ => None,
        }
    }

    fn operand_as_date(operand: &JsonValue) -> Option<DateTime<Utc>> {
        match operand {
            JsonValue::String(s) => Self::parse_date(s),
            // Builders occasionally store epoch milliseconds.
            JsonValue::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
            _ => None,
        }
    }

    fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}
