//! Operator catalog.
//!
//! The closed set of filter operators a request may name, and the semantic
//! class each one belongs to. The class decides how the compiler coerces the
//! raw value and which predicate it emits.

use serde::Serialize;

/// A filter operator, as named in `filter[<field>][<operator>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Like,
    NotLike,
    Null,
    NotNull,
    Between,
    NotBetween,
    In,
    NotIn,
    DateEqual,
    DateNotEqual,
    After,
    AfterOrEqual,
    Before,
    BeforeOrEqual,
}

/// SQL comparison used by comparison-class and date-class operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

/// Semantic class of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSpec {
    /// `column <op> value`
    Comparison(ComparisonOp),
    /// `column IS [NOT] NULL`; the value is ignored.
    NullCheck { is_null: bool },
    /// `column [NOT] BETWEEN a AND b`; the value is a two-item list.
    Range { negated: bool },
    /// `column [NOT] IN (...)`; the value is a list.
    ListMembership { negated: bool },
    /// `DATE(column) <op> date`; the value is a calendar date.
    DateComparison(ComparisonOp),
}

impl Operator {
    /// Every operator, in catalog order.
    pub const ALL: [Operator; 20] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::Greater,
        Operator::GreaterOrEqual,
        Operator::Less,
        Operator::LessOrEqual,
        Operator::Like,
        Operator::NotLike,
        Operator::Null,
        Operator::NotNull,
        Operator::Between,
        Operator::NotBetween,
        Operator::In,
        Operator::NotIn,
        Operator::DateEqual,
        Operator::DateNotEqual,
        Operator::After,
        Operator::AfterOrEqual,
        Operator::Before,
        Operator::BeforeOrEqual,
    ];

    /// The request token for this operator.
    pub fn token(self) -> &'static str {
        match self {
            Operator::Equal => "equal",
            Operator::NotEqual => "notEqual",
            Operator::Greater => "greater",
            Operator::GreaterOrEqual => "greaterOrEqual",
            Operator::Less => "less",
            Operator::LessOrEqual => "lessOrEqual",
            Operator::Like => "like",
            Operator::NotLike => "notLike",
            Operator::Null => "null",
            Operator::NotNull => "notNull",
            Operator::Between => "between",
            Operator::NotBetween => "notBetween",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::DateEqual => "dateEqual",
            Operator::DateNotEqual => "dateNotEqual",
            Operator::After => "after",
            Operator::AfterOrEqual => "afterOrEqual",
            Operator::Before => "before",
            Operator::BeforeOrEqual => "beforeOrEqual",
        }
    }

    /// Look up an operator by its request token. Tokens are case-sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.token() == token)
    }

    /// The semantic class of this operator.
    pub fn spec(self) -> OperatorSpec {
        use ComparisonOp as C;
        match self {
            Operator::Equal => OperatorSpec::Comparison(C::Eq),
            Operator::NotEqual => OperatorSpec::Comparison(C::Ne),
            Operator::Greater => OperatorSpec::Comparison(C::Gt),
            Operator::GreaterOrEqual => OperatorSpec::Comparison(C::Gte),
            Operator::Less => OperatorSpec::Comparison(C::Lt),
            Operator::LessOrEqual => OperatorSpec::Comparison(C::Lte),
            Operator::Like => OperatorSpec::Comparison(C::Like),
            Operator::NotLike => OperatorSpec::Comparison(C::NotLike),
            Operator::Null => OperatorSpec::NullCheck { is_null: true },
            Operator::NotNull => OperatorSpec::NullCheck { is_null: false },
            Operator::Between => OperatorSpec::Range { negated: false },
            Operator::NotBetween => OperatorSpec::Range { negated: true },
            Operator::In => OperatorSpec::ListMembership { negated: false },
            Operator::NotIn => OperatorSpec::ListMembership { negated: true },
            // The column is always the left operand: `after` keeps rows dated
            // strictly later than the given date.
            Operator::DateEqual => OperatorSpec::DateComparison(C::Eq),
            Operator::DateNotEqual => OperatorSpec::DateComparison(C::Ne),
            Operator::After => OperatorSpec::DateComparison(C::Gt),
            Operator::AfterOrEqual => OperatorSpec::DateComparison(C::Gte),
            Operator::Before => OperatorSpec::DateComparison(C::Lt),
            Operator::BeforeOrEqual => OperatorSpec::DateComparison(C::Lte),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip_covers_catalog() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_token(op.token()), Some(op));
        }
    }

    #[test]
    fn test_unknown_and_case_sensitive_tokens() {
        assert_eq!(Operator::from_token("contains"), None);
        assert_eq!(Operator::from_token("Like"), None);
        assert_eq!(Operator::from_token(""), None);
    }

    #[test]
    fn test_classes() {
        assert_eq!(
            Operator::Like.spec(),
            OperatorSpec::Comparison(ComparisonOp::Like)
        );
        assert_eq!(
            Operator::NotNull.spec(),
            OperatorSpec::NullCheck { is_null: false }
        );
        assert_eq!(
            Operator::NotBetween.spec(),
            OperatorSpec::Range { negated: true }
        );
        assert_eq!(
            Operator::In.spec(),
            OperatorSpec::ListMembership { negated: false }
        );
    }

    #[test]
    fn test_date_direction_is_column_relative() {
        assert_eq!(
            Operator::After.spec(),
            OperatorSpec::DateComparison(ComparisonOp::Gt)
        );
        assert_eq!(
            Operator::BeforeOrEqual.spec(),
            OperatorSpec::DateComparison(ComparisonOp::Lte)
        );
    }

    #[test]
    fn test_serializes_as_token() {
        let json = serde_json::to_string(&Operator::GreaterOrEqual).unwrap();
        assert_eq!(json, "\"greaterOrEqual\"");
    }
}
