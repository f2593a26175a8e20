//! Condition algebra for reactions.
//!
//! Conditions compare action state variables or robot system state against
//! fixed values, and compose through all-of / any-of conjunctions and
//! negation. They are evaluated inside the realtime loop on the server;
//! this module only builds and validates them and maps them to the wire
//! form. Path helpers for the comparable robot state fields live in
//! `icon_common::state_variable_path`.

use std::hash::{Hash, Hasher};

use icon_common::{IconError, IconResult};
use icon_wire::condition as wire;

/// Default tolerance of approximate comparisons (2^-10).
pub const DEFAULT_MAX_ABS_ERROR: f64 = 1.0 / 1024.0;

/// Mixed into the hash of a negated condition so it cannot collide with
/// the hash of its child.
const NEGATED_CONDITION_HASH_ID: i64 = 0x0AED_F098;

/// Comparison operators, at their wire numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    ApproxEqual,
    ApproxNotEqual,
    LessThanOrEqual,
    LessThan,
    GreaterThanOrEqual,
    GreaterThan,
}

impl ComparisonOp {
    pub fn to_wire(self) -> wire::ComparisonOp {
        match self {
            Self::Equal => wire::ComparisonOp::Equal,
            Self::NotEqual => wire::ComparisonOp::NotEqual,
            Self::ApproxEqual => wire::ComparisonOp::ApproxEqual,
            Self::ApproxNotEqual => wire::ComparisonOp::ApproxNotEqual,
            Self::LessThanOrEqual => wire::ComparisonOp::LessThanOrEqual,
            Self::LessThan => wire::ComparisonOp::LessThan,
            Self::GreaterThanOrEqual => wire::ComparisonOp::GreaterThanOrEqual,
            Self::GreaterThan => wire::ComparisonOp::GreaterThan,
        }
    }

    pub fn from_wire(op: wire::ComparisonOp) -> IconResult<Self> {
        match op {
            wire::ComparisonOp::Equal => Ok(Self::Equal),
            wire::ComparisonOp::NotEqual => Ok(Self::NotEqual),
            wire::ComparisonOp::ApproxEqual => Ok(Self::ApproxEqual),
            wire::ComparisonOp::ApproxNotEqual => Ok(Self::ApproxNotEqual),
            wire::ComparisonOp::LessThanOrEqual => Ok(Self::LessThanOrEqual),
            wire::ComparisonOp::LessThan => Ok(Self::LessThan),
            wire::ComparisonOp::GreaterThanOrEqual => Ok(Self::GreaterThanOrEqual),
            wire::ComparisonOp::GreaterThan => Ok(Self::GreaterThan),
            wire::ComparisonOp::Unspecified => Err(IconError::invalid_argument(
                "Cannot create Condition from wire form: comparison operation is unspecified",
            )),
        }
    }
}

/// The second operand of a comparison.
#[derive(Debug, Clone, Copy)]
pub enum ComparisonValue {
    Bool(bool),
    Double(f64),
    Int64(i64),
}

impl From<bool> for ComparisonValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ComparisonValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<i64> for ComparisonValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

// Structural equality: doubles compare by bit pattern so equality stays
// consistent with hashing.
impl PartialEq for ComparisonValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Int64(a), Self::Int64(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ComparisonValue {}

impl Hash for ComparisonValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Bool(v) => (0u8, v).hash(state),
            Self::Double(v) => (1u8, v.to_bits()).hash(state),
            Self::Int64(v) => (2u8, v).hash(state),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
}

/// Operand types valid for the ordered comparison helpers.
pub trait OrderedOperand: Into<ComparisonValue> + sealed::Sealed {}
impl OrderedOperand for i64 {}
impl OrderedOperand for f64 {}

/// Compares a state variable against a fixed value.
///
/// State variable names for action state are limited in length; overly
/// long names fail when the server converts the comparison into its
/// realtime form.
#[derive(Debug, Clone)]
pub struct Comparison {
    state_variable_name: String,
    operation: ComparisonOp,
    value: ComparisonValue,
    max_abs_error: f64,
}

impl Comparison {
    /// Creates a comparison between `state_variable_name` and `value`.
    ///
    /// `max_abs_error` only applies to the approximate operators.
    ///
    /// Returns `InvalidArgument` when the operator does not fit the value
    /// type: booleans pair only with equality, doubles only with the
    /// approximate and ordered operators, integers with everything but the
    /// approximate operators.
    pub fn create(
        state_variable_name: impl Into<String>,
        operation: ComparisonOp,
        value: impl Into<ComparisonValue>,
        max_abs_error: f64,
    ) -> IconResult<Self> {
        let state_variable_name = state_variable_name.into();
        let value = value.into();
        match value {
            ComparisonValue::Bool(_) => {
                if !matches!(operation, ComparisonOp::Equal | ComparisonOp::NotEqual) {
                    return Err(IconError::invalid_argument(format!(
                        "Cannot create Condition for state variable \"{state_variable_name}\": \
                         boolean value is incompatible with operation \"{operation:?}\""
                    )));
                }
            }
            ComparisonValue::Double(_) => {
                if matches!(operation, ComparisonOp::Equal | ComparisonOp::NotEqual) {
                    return Err(IconError::invalid_argument(format!(
                        "Cannot create Condition for state variable \"{state_variable_name}\": \
                         double value is incompatible with operation \"{operation:?}\". \
                         Use Approx-Comparison."
                    )));
                }
            }
            ComparisonValue::Int64(_) => {
                if matches!(
                    operation,
                    ComparisonOp::ApproxEqual | ComparisonOp::ApproxNotEqual
                ) {
                    return Err(IconError::invalid_argument(format!(
                        "Cannot create Condition for state variable \"{state_variable_name}\": \
                         integer value is incompatible with operation \"{operation:?}\". \
                         Use Equal-Comparison."
                    )));
                }
            }
        }
        Ok(Self {
            state_variable_name,
            operation,
            value,
            max_abs_error,
        })
    }

    pub fn state_variable_name(&self) -> &str {
        &self.state_variable_name
    }

    pub fn operation(&self) -> ComparisonOp {
        self.operation
    }

    pub fn value(&self) -> &ComparisonValue {
        &self.value
    }

    /// Tolerance used by the approximate operators; ignored otherwise.
    pub fn max_abs_error(&self) -> f64 {
        self.max_abs_error
    }

    pub fn to_wire(&self) -> wire::Comparison {
        let value = match self.value {
            ComparisonValue::Bool(v) => wire::ComparisonValue::BoolValue(v),
            ComparisonValue::Double(v) => wire::ComparisonValue::DoubleValue(v),
            ComparisonValue::Int64(v) => wire::ComparisonValue::Int64Value(v),
        };
        wire::Comparison {
            state_variable_name: self.state_variable_name.clone(),
            operation: self.operation.to_wire(),
            value: Some(value),
            max_abs_error: self.max_abs_error,
        }
    }

    pub fn from_wire(proto: &wire::Comparison) -> IconResult<Self> {
        let value = match &proto.value {
            Some(wire::ComparisonValue::BoolValue(v)) => ComparisonValue::Bool(*v),
            Some(wire::ComparisonValue::DoubleValue(v)) => ComparisonValue::Double(*v),
            Some(wire::ComparisonValue::Int64Value(v)) => ComparisonValue::Int64(*v),
            None => {
                return Err(IconError::invalid_argument(format!(
                    "Cannot create Condition from wire form: value not set: {proto:?}"
                )));
            }
        };
        Self::create(
            proto.state_variable_name.clone(),
            ComparisonOp::from_wire(proto.operation)?,
            value,
            proto.max_abs_error,
        )
    }
}

impl PartialEq for Comparison {
    fn eq(&self, other: &Self) -> bool {
        self.state_variable_name == other.state_variable_name
            && self.operation == other.operation
            && self.value == other.value
            && self.max_abs_error.to_bits() == other.max_abs_error.to_bits()
    }
}

impl Eq for Comparison {}

impl Hash for Comparison {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.state_variable_name.hash(state);
        self.operation.hash(state);
        self.value.hash(state);
        self.max_abs_error.to_bits().hash(state);
    }
}

/// Aggregation operators of a [`ConjunctionCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConjunctionOp {
    AllOf,
    AnyOf,
}

/// A condition composed of child conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConjunctionCondition {
    operation: ConjunctionOp,
    conditions: Vec<Condition>,
}

impl ConjunctionCondition {
    pub fn new(operation: ConjunctionOp, conditions: Vec<Condition>) -> Self {
        Self {
            operation,
            conditions,
        }
    }

    pub fn operation(&self) -> ConjunctionOp {
        self.operation
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn to_wire(&self) -> wire::ConjunctionCondition {
        wire::ConjunctionCondition {
            operation: match self.operation {
                ConjunctionOp::AllOf => wire::ConjunctionOp::AllOf,
                ConjunctionOp::AnyOf => wire::ConjunctionOp::AnyOf,
            },
            conditions: self.conditions.iter().map(Condition::to_wire).collect(),
        }
    }

    pub fn from_wire(proto: &wire::ConjunctionCondition) -> IconResult<Self> {
        let operation = match proto.operation {
            wire::ConjunctionOp::AllOf => ConjunctionOp::AllOf,
            wire::ConjunctionOp::AnyOf => ConjunctionOp::AnyOf,
            wire::ConjunctionOp::Unspecified => {
                return Err(IconError::invalid_argument(
                    "Cannot create Condition from wire form: conjunction operation is unspecified",
                ));
            }
        };
        let conditions = proto
            .conditions
            .iter()
            .map(Condition::from_wire)
            .collect::<IconResult<Vec<_>>>()?;
        Ok(Self {
            operation,
            conditions,
        })
    }
}

/// Negation of a single child condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegatedCondition {
    condition: Box<Condition>,
}

impl NegatedCondition {
    pub fn new(condition: Condition) -> Self {
        Self {
            condition: Box::new(condition),
        }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn to_wire(&self) -> wire::NegatedCondition {
        wire::NegatedCondition {
            condition: self.condition.to_wire(),
        }
    }

    pub fn from_wire(proto: &wire::NegatedCondition) -> IconResult<Self> {
        Ok(Self::new(Condition::from_wire(&proto.condition)?))
    }
}

impl Hash for NegatedCondition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        NEGATED_CONDITION_HASH_ID.hash(state);
        self.condition.hash(state);
    }
}

/// A condition: a comparison leaf, a conjunction or a negation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    Comparison(Comparison),
    Conjunction(ConjunctionCondition),
    Negated(NegatedCondition),
}

impl Condition {
    pub fn to_wire(&self) -> wire::Condition {
        match self {
            Self::Comparison(c) => wire::Condition::Comparison(c.to_wire()),
            Self::Conjunction(c) => wire::Condition::ConjunctionCondition(c.to_wire()),
            Self::Negated(c) => wire::Condition::NegatedCondition(Box::new(c.to_wire())),
        }
    }

    pub fn from_wire(proto: &wire::Condition) -> IconResult<Self> {
        match proto {
            wire::Condition::Comparison(c) => Ok(Self::Comparison(Comparison::from_wire(c)?)),
            wire::Condition::ConjunctionCondition(c) => {
                Ok(Self::Conjunction(ConjunctionCondition::from_wire(c)?))
            }
            wire::Condition::NegatedCondition(c) => {
                Ok(Self::Negated(NegatedCondition::from_wire(c)?))
            }
        }
    }
}

impl From<Comparison> for Condition {
    fn from(comparison: Comparison) -> Self {
        Self::Comparison(comparison)
    }
}

impl From<ConjunctionCondition> for Condition {
    fn from(conjunction: ConjunctionCondition) -> Self {
        Self::Conjunction(conjunction)
    }
}

impl From<NegatedCondition> for Condition {
    fn from(negated: NegatedCondition) -> Self {
        Self::Negated(negated)
    }
}

/// Satisfied when `state_variable_name` is `true`.
pub fn is_true(state_variable_name: impl Into<String>) -> Comparison {
    Comparison {
        state_variable_name: state_variable_name.into(),
        operation: ComparisonOp::Equal,
        value: ComparisonValue::Bool(true),
        max_abs_error: DEFAULT_MAX_ABS_ERROR,
    }
}

/// Satisfied when `state_variable_name` is `false`.
pub fn is_false(state_variable_name: impl Into<String>) -> Comparison {
    Comparison {
        state_variable_name: state_variable_name.into(),
        operation: ComparisonOp::Equal,
        value: ComparisonValue::Bool(false),
        max_abs_error: DEFAULT_MAX_ABS_ERROR,
    }
}

/// Satisfied when `state_variable_name` equals `value`.
pub fn is_equal(state_variable_name: impl Into<String>, value: i64) -> Comparison {
    Comparison {
        state_variable_name: state_variable_name.into(),
        operation: ComparisonOp::Equal,
        value: ComparisonValue::Int64(value),
        max_abs_error: DEFAULT_MAX_ABS_ERROR,
    }
}

/// Satisfied when `state_variable_name` does not equal `value`.
pub fn is_not_equal(state_variable_name: impl Into<String>, value: i64) -> Comparison {
    Comparison {
        state_variable_name: state_variable_name.into(),
        operation: ComparisonOp::NotEqual,
        value: ComparisonValue::Int64(value),
        max_abs_error: DEFAULT_MAX_ABS_ERROR,
    }
}

/// Satisfied when `state_variable_name` is approximately `value`, within
/// [`DEFAULT_MAX_ABS_ERROR`].
pub fn is_approx(state_variable_name: impl Into<String>, value: f64) -> Comparison {
    is_approx_within(state_variable_name, value, DEFAULT_MAX_ABS_ERROR)
}

/// Satisfied when `state_variable_name` is approximately `value`, within
/// `max_abs_error`.
pub fn is_approx_within(
    state_variable_name: impl Into<String>,
    value: f64,
    max_abs_error: f64,
) -> Comparison {
    Comparison {
        state_variable_name: state_variable_name.into(),
        operation: ComparisonOp::ApproxEqual,
        value: ComparisonValue::Double(value),
        max_abs_error,
    }
}

/// Satisfied when `state_variable_name` is not approximately `value`,
/// within [`DEFAULT_MAX_ABS_ERROR`].
pub fn is_not_approx(state_variable_name: impl Into<String>, value: f64) -> Comparison {
    is_not_approx_within(state_variable_name, value, DEFAULT_MAX_ABS_ERROR)
}

/// Satisfied when `state_variable_name` is not approximately `value`,
/// within `max_abs_error`.
pub fn is_not_approx_within(
    state_variable_name: impl Into<String>,
    value: f64,
    max_abs_error: f64,
) -> Comparison {
    Comparison {
        state_variable_name: state_variable_name.into(),
        operation: ComparisonOp::ApproxNotEqual,
        value: ComparisonValue::Double(value),
        max_abs_error,
    }
}

fn ordered(
    state_variable_name: impl Into<String>,
    operation: ComparisonOp,
    value: impl OrderedOperand,
) -> Comparison {
    Comparison {
        state_variable_name: state_variable_name.into(),
        operation,
        value: value.into(),
        max_abs_error: DEFAULT_MAX_ABS_ERROR,
    }
}

/// Satisfied when `state_variable_name` is less than or equal to `value`.
pub fn is_less_than_or_equal(
    state_variable_name: impl Into<String>,
    value: impl OrderedOperand,
) -> Comparison {
    ordered(state_variable_name, ComparisonOp::LessThanOrEqual, value)
}

/// Satisfied when `state_variable_name` is less than `value`.
pub fn is_less_than(
    state_variable_name: impl Into<String>,
    value: impl OrderedOperand,
) -> Comparison {
    ordered(state_variable_name, ComparisonOp::LessThan, value)
}

/// Satisfied when `state_variable_name` is greater than or equal to
/// `value`.
pub fn is_greater_than_or_equal(
    state_variable_name: impl Into<String>,
    value: impl OrderedOperand,
) -> Comparison {
    ordered(state_variable_name, ComparisonOp::GreaterThanOrEqual, value)
}

/// Satisfied when `state_variable_name` is greater than `value`.
pub fn is_greater_than(
    state_variable_name: impl Into<String>,
    value: impl OrderedOperand,
) -> Comparison {
    ordered(state_variable_name, ComparisonOp::GreaterThan, value)
}

/// An all-of condition over `conditions`.
pub fn all_of(conditions: Vec<Condition>) -> ConjunctionCondition {
    ConjunctionCondition::new(ConjunctionOp::AllOf, conditions)
}

/// An any-of condition over `conditions`.
pub fn any_of(conditions: Vec<Condition>) -> ConjunctionCondition {
    ConjunctionCondition::new(ConjunctionOp::AnyOf, conditions)
}

/// The negation of `condition`.
pub fn negate(condition: impl Into<Condition>) -> NegatedCondition {
    NegatedCondition::new(condition.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn bool_pairs_only_with_equality() {
        assert!(Comparison::create("v", ComparisonOp::Equal, true, 0.0).is_ok());
        assert!(Comparison::create("v", ComparisonOp::NotEqual, false, 0.0).is_ok());
        let err = Comparison::create("v", ComparisonOp::LessThan, true, 0.0).unwrap_err();
        assert!(err.to_string().contains("boolean value is incompatible"));
        let err = Comparison::create("v", ComparisonOp::ApproxEqual, true, 0.0).unwrap_err();
        assert!(err.to_string().contains("boolean value is incompatible"));
    }

    #[test]
    fn double_rejects_exact_equality() {
        // Literal scenario: EQUAL with 1.5 must fail.
        let err = Comparison::create("v", ComparisonOp::Equal, 1.5, 0.0).unwrap_err();
        assert!(err.to_string().contains("double value is incompatible"));
        assert!(Comparison::create("v", ComparisonOp::ApproxEqual, 1.5, 1e-6).is_ok());
        assert!(Comparison::create("v", ComparisonOp::GreaterThan, 1.5, 0.0).is_ok());
    }

    #[test]
    fn int_rejects_approx_operators() {
        let err = Comparison::create("v", ComparisonOp::ApproxEqual, 3i64, 0.0).unwrap_err();
        assert!(err.to_string().contains("integer value is incompatible"));
        assert!(Comparison::create("v", ComparisonOp::LessThanOrEqual, 3i64, 0.0).is_ok());
    }

    #[test]
    fn convenience_constructors_use_expected_operators() {
        assert_eq!(is_true("done").operation(), ComparisonOp::Equal);
        assert_eq!(*is_true("done").value(), ComparisonValue::Bool(true));
        assert_eq!(is_false("done").value(), &ComparisonValue::Bool(false));
        assert_eq!(is_equal("n", 4).operation(), ComparisonOp::Equal);
        assert_eq!(is_not_equal("n", 4).operation(), ComparisonOp::NotEqual);
        assert_eq!(is_approx("x", 0.5).max_abs_error(), DEFAULT_MAX_ABS_ERROR);
        assert_eq!(is_less_than("x", 1e-3).operation(), ComparisonOp::LessThan);
        assert_eq!(is_less_than("n", 10i64).operation(), ComparisonOp::LessThan);
        assert_eq!(
            is_greater_than_or_equal("x", 2.0).operation(),
            ComparisonOp::GreaterThanOrEqual
        );
    }

    #[test]
    fn all_of_wire_form() {
        // Literal scenario: AllOf([IsTrue("done"), IsLessThan("err", 1e-3)]).
        let condition = all_of(vec![
            is_true("done").into(),
            is_less_than("err", 1e-3).into(),
        ]);
        let proto = condition.to_wire();
        assert_eq!(proto.operation, wire::ConjunctionOp::AllOf);
        assert_eq!(proto.conditions.len(), 2);
        match &proto.conditions[0] {
            wire::Condition::Comparison(c) => {
                assert_eq!(c.state_variable_name, "done");
                assert_eq!(c.operation, wire::ComparisonOp::Equal);
                assert_eq!(c.value, Some(wire::ComparisonValue::BoolValue(true)));
            }
            other => panic!("expected comparison, got {other:?}"),
        }
        match &proto.conditions[1] {
            wire::Condition::Comparison(c) => {
                assert_eq!(c.state_variable_name, "err");
                assert_eq!(c.operation, wire::ComparisonOp::LessThan);
                assert_eq!(c.value, Some(wire::ComparisonValue::DoubleValue(1e-3)));
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn wire_roundtrip_preserves_structure() {
        let condition: Condition = all_of(vec![
            is_true("xfa.is_done").into(),
            any_of(vec![
                is_equal("mode", 2).into(),
                negate(is_approx("err", 0.0)).into(),
            ])
            .into(),
        ])
        .into();
        let back = Condition::from_wire(&condition.to_wire()).unwrap();
        assert_eq!(back, condition);
    }

    #[test]
    fn unset_value_is_rejected() {
        let proto = wire::Comparison {
            state_variable_name: "v".to_string(),
            operation: wire::ComparisonOp::Equal,
            value: None,
            max_abs_error: 0.0,
        };
        let err = Comparison::from_wire(&proto).unwrap_err();
        assert!(err.to_string().contains("value not set"));
    }

    #[test]
    fn unspecified_operators_are_rejected() {
        let proto = wire::Comparison {
            state_variable_name: "v".to_string(),
            operation: wire::ComparisonOp::Unspecified,
            value: Some(wire::ComparisonValue::BoolValue(true)),
            max_abs_error: 0.0,
        };
        assert!(Comparison::from_wire(&proto).is_err());

        let proto = wire::ConjunctionCondition {
            operation: wire::ConjunctionOp::Unspecified,
            conditions: vec![],
        };
        assert!(ConjunctionCondition::from_wire(&proto).is_err());
    }

    #[test]
    fn negated_hash_differs_from_child() {
        let child: Condition = is_true("done").into();
        let negated: Condition = negate(is_true("done")).into();
        assert_ne!(hash_of(&child), hash_of(&negated));

        let ordered_child: Condition = is_less_than("err", 1e-3).into();
        let ordered_negated: Condition = negate(is_less_than("err", 1e-3)).into();
        assert_ne!(hash_of(&ordered_child), hash_of(&ordered_negated));
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(is_true("done"), is_true("done"));
        assert_ne!(is_true("done"), is_false("done"));
        assert_ne!(is_approx("x", 0.5), is_approx_within("x", 0.5, 1e-2));

        let a: Condition = all_of(vec![is_true("a").into()]).into();
        let b: Condition = any_of(vec![is_true("a").into()]).into();
        assert_ne!(a, b);
    }
}
