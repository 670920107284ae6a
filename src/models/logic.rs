use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Branching configuration attached to a question. Rules are evaluated in
/// declared order against the answer just submitted for that question;
/// the first matching rule wins. When nothing matches, `default_action`
/// (and `default_target`, if set) applies, and failing that the form's
/// positional order does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionLogic {
    #[serde(default)]
    pub rules: Vec<LogicRule>,
    #[serde(default)]
    pub default_action: DefaultAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicRule {
    #[serde(default)]
    pub conditions: Vec<LogicCondition>,
    pub condition_operator: ConditionCombinator,
    pub action: RuleAction,
}

/// A single predicate over the current question's answer. The operand is
/// kept as raw JSON; builders save whatever the operator calls for and the
/// evaluator coerces at comparison time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicCondition {
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: JsonValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionCombinator {
    And,
    Or,
}

/// Operators a condition may carry. Configurations written by newer builder
/// versions can contain operators this server does not know; those land on
/// `Unknown` and never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    IsEmpty,
    IsNotEmpty,
    Before,
    After,
    Unknown,
}

impl<'de> Deserialize<'de> for ConditionOperator {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "equals" => ConditionOperator::Equals,
            "not_equals" => ConditionOperator::NotEquals,
            "contains" => ConditionOperator::Contains,
            "not_contains" => ConditionOperator::NotContains,
            "greater_than" => ConditionOperator::GreaterThan,
            "less_than" => ConditionOperator::LessThan,
            "greater_than_or_equal" => ConditionOperator::GreaterThanOrEqual,
            "less_than_or_equal" => ConditionOperator::LessThanOrEqual,
            "is_empty" => ConditionOperator::IsEmpty,
            "is_not_empty" => ConditionOperator::IsNotEmpty,
            "before" => ConditionOperator::Before,
            "after" => ConditionOperator::After,
            _ => ConditionOperator::Unknown,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    Jump { target_question_id: Uuid },
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultAction {
    #[default]
    Next,
    End,
}
