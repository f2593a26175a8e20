//! Wire form of reaction conditions.
//!
//! The realtime evaluator on the server consumes these directly; the native
//! condition algebra in the client crate converts to and from them. The
//! `Unspecified` enum values model the proto default and are rejected when
//! converting to the native form.

use serde::{Deserialize, Serialize};

/// Comparison operators. Numbering matches the wire enum; boolean
/// comparisons only use 1 and 2, floating point comparisons skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ComparisonOp {
    Unspecified = 0,
    Equal = 1,
    NotEqual = 2,
    ApproxEqual = 3,
    ApproxNotEqual = 4,
    LessThanOrEqual = 5,
    LessThan = 6,
    GreaterThanOrEqual = 7,
    GreaterThan = 8,
}

/// The `value` oneof of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComparisonValue {
    BoolValue(bool),
    DoubleValue(f64),
    Int64Value(i64),
}

/// Compares a state variable against a fixed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub state_variable_name: String,
    pub operation: ComparisonOp,
    /// Exactly one value must be set; `None` is malformed.
    pub value: Option<ComparisonValue>,
    pub max_abs_error: f64,
}

/// Aggregation operators for [`ConjunctionCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ConjunctionOp {
    Unspecified = 0,
    AllOf = 1,
    AnyOf = 2,
}

/// A condition composed of child conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConjunctionCondition {
    pub operation: ConjunctionOp,
    pub conditions: Vec<Condition>,
}

/// Negation of a single child condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegatedCondition {
    pub condition: Condition,
}

/// The condition oneof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Comparison(Comparison),
    ConjunctionCondition(ConjunctionCondition),
    NegatedCondition(Box<NegatedCondition>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_condition_serde_roundtrip() {
        let condition = Condition::ConjunctionCondition(ConjunctionCondition {
            operation: ConjunctionOp::AllOf,
            conditions: vec![
                Condition::Comparison(Comparison {
                    state_variable_name: "xfa.is_done".to_string(),
                    operation: ComparisonOp::Equal,
                    value: Some(ComparisonValue::BoolValue(true)),
                    max_abs_error: 0.0,
                }),
                Condition::NegatedCondition(Box::new(NegatedCondition {
                    condition: Condition::Comparison(Comparison {
                        state_variable_name: "error_norm".to_string(),
                        operation: ComparisonOp::GreaterThan,
                        value: Some(ComparisonValue::DoubleValue(1e-3)),
                        max_abs_error: 0.0,
                    }),
                })),
            ],
        });
        let json = serde_json::to_string(&condition).unwrap();
        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, condition);
    }
}
