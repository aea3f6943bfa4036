//! FILENAME: grid-model/src/filter.rs
//! Filter operator vocabulary and per-column filter configuration.
//!
//! Columns declare their filter configuration here so the layout engine
//! can carry it without depending on the filter grammar translator.

use serde::{Deserialize, Serialize};
use crate::value::ScalarKind;

// ============================================================================
// OPERATORS
// ============================================================================

/// The closed set of filter operators. Serialized by their short tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "eq")]
    Equals,
    /// Case-insensitive equality.
    #[serde(rename = "ieq")]
    EqualsIgnoreCase,
    #[serde(rename = "neq")]
    NotEquals,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "gte")]
    GreaterThanOrEqual,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "lte")]
    LessThanOrEqual,
    #[serde(rename = "bet")]
    Between,
    #[serde(rename = "nbet")]
    NotBetween,
    #[serde(rename = "con")]
    Contains,
    #[serde(rename = "ncon")]
    NotContains,
    #[serde(rename = "beg")]
    BeginsWith,
    #[serde(rename = "end")]
    EndsWith,
    #[serde(rename = "nul")]
    IsNull,
    #[serde(rename = "nnul")]
    IsNotNull,
    #[serde(rename = "any")]
    AnyOf,
    #[serde(rename = "none")]
    NoneOf,
}

/// The value an operator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// `nul`/`nnul`: no value.
    Empty,
    /// A single scalar.
    Scalar,
    /// `bet`/`nbet`: a 2-tuple.
    Range,
    /// `any`/`none`: an array of one or more values.
    List,
}

impl Operator {
    pub const ALL: [Operator; 17] = [
        Operator::Equals,
        Operator::EqualsIgnoreCase,
        Operator::NotEquals,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::Between,
        Operator::NotBetween,
        Operator::Contains,
        Operator::NotContains,
        Operator::BeginsWith,
        Operator::EndsWith,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::AnyOf,
        Operator::NoneOf,
    ];

    /// Short wire tag ("eq", "bet", ...).
    pub fn tag(&self) -> &'static str {
        match self {
            Operator::Equals => "eq",
            Operator::EqualsIgnoreCase => "ieq",
            Operator::NotEquals => "neq",
            Operator::GreaterThan => "gt",
            Operator::GreaterThanOrEqual => "gte",
            Operator::LessThan => "lt",
            Operator::LessThanOrEqual => "lte",
            Operator::Between => "bet",
            Operator::NotBetween => "nbet",
            Operator::Contains => "con",
            Operator::NotContains => "ncon",
            Operator::BeginsWith => "beg",
            Operator::EndsWith => "end",
            Operator::IsNull => "nul",
            Operator::IsNotNull => "nnul",
            Operator::AnyOf => "any",
            Operator::NoneOf => "none",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Operator> {
        Operator::ALL.iter().copied().find(|op| op.tag() == tag)
    }

    pub fn value_shape(&self) -> ValueShape {
        match self {
            Operator::IsNull | Operator::IsNotNull => ValueShape::Empty,
            Operator::Between | Operator::NotBetween => ValueShape::Range,
            Operator::AnyOf | Operator::NoneOf => ValueShape::List,
            _ => ValueShape::Scalar,
        }
    }

    /// `nul` and `nnul`.
    pub fn is_presence(&self) -> bool {
        self.value_shape() == ValueShape::Empty
    }
}

// ============================================================================
// FILTER KINDS
// ============================================================================

/// The data type a column filters on. Drives default operators and the
/// re-typing of decoded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterKind {
    #[default]
    String,
    Number,
    Date,
    Boolean,
    /// A fixed set of options; multi-select by default.
    Enum,
    /// Only null / not-null checks.
    Presence,
}

const STRING_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::EqualsIgnoreCase,
    Operator::NotEquals,
    Operator::Contains,
    Operator::NotContains,
    Operator::BeginsWith,
    Operator::EndsWith,
    Operator::IsNull,
    Operator::IsNotNull,
    Operator::AnyOf,
    Operator::NoneOf,
];

const ORDERED_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::GreaterThan,
    Operator::GreaterThanOrEqual,
    Operator::LessThan,
    Operator::LessThanOrEqual,
    Operator::Between,
    Operator::NotBetween,
    Operator::IsNull,
    Operator::IsNotNull,
    Operator::AnyOf,
    Operator::NoneOf,
];

const BOOLEAN_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::IsNull,
    Operator::IsNotNull,
];

const ENUM_OPERATORS: &[Operator] = &[
    Operator::AnyOf,
    Operator::NoneOf,
    Operator::Equals,
    Operator::NotEquals,
    Operator::IsNull,
    Operator::IsNotNull,
];

const PRESENCE_OPERATORS: &[Operator] = &[Operator::IsNull, Operator::IsNotNull];

impl FilterKind {
    pub fn operators(&self) -> &'static [Operator] {
        match self {
            FilterKind::String => STRING_OPERATORS,
            FilterKind::Number | FilterKind::Date => ORDERED_OPERATORS,
            FilterKind::Boolean => BOOLEAN_OPERATORS,
            FilterKind::Enum => ENUM_OPERATORS,
            FilterKind::Presence => PRESENCE_OPERATORS,
        }
    }

    pub fn default_operator(&self) -> Operator {
        match self {
            FilterKind::String
            | FilterKind::Number
            | FilterKind::Date
            | FilterKind::Boolean => Operator::Equals,
            FilterKind::Enum => Operator::AnyOf,
            FilterKind::Presence => Operator::IsNull,
        }
    }

    pub fn scalar_kind(&self) -> ScalarKind {
        match self {
            FilterKind::Number => ScalarKind::Number,
            FilterKind::Boolean => ScalarKind::Boolean,
            _ => ScalarKind::String,
        }
    }
}

// ============================================================================
// COLUMN FILTER CONFIG
// ============================================================================

/// Filter configuration declared on a column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnFilter {
    #[serde(default)]
    pub kind: FilterKind,

    /// Allow-list replacing the kind's operator table.
    #[serde(default)]
    pub operators: Option<Vec<Operator>>,

    #[serde(default)]
    pub default_operator: Option<Operator>,

    /// Option values for `Enum` filters.
    #[serde(default)]
    pub options: Vec<String>,
}

impl ColumnFilter {
    pub fn new(kind: FilterKind) -> Self {
        ColumnFilter {
            kind,
            ..ColumnFilter::default()
        }
    }

    pub fn with_operators(mut self, operators: Vec<Operator>) -> Self {
        self.operators = Some(operators);
        self
    }

    pub fn with_default_operator(mut self, operator: Operator) -> Self {
        self.default_operator = Some(operator);
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_operators(&self) -> &[Operator] {
        match &self.operators {
            Some(ops) if !ops.is_empty() => ops,
            _ => self.kind.operators(),
        }
    }

    pub fn allows(&self, operator: Operator) -> bool {
        self.allowed_operators().contains(&operator)
    }

    /// Explicit default if allowed, else the kind's default if allowed,
    /// else the first allowed operator.
    pub fn default_operator(&self) -> Operator {
        let allowed = self.allowed_operators();
        if let Some(op) = self.default_operator {
            if allowed.contains(&op) {
                return op;
            }
        }
        let kind_default = self.kind.default_operator();
        if allowed.contains(&kind_default) {
            return kind_default;
        }
        allowed.first().copied().unwrap_or(kind_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_tag(op.tag()), Some(op));
        }
        assert_eq!(Operator::from_tag("nope"), None);
    }

    #[test]
    fn test_serde_uses_tags() {
        let json = serde_json::to_string(&Operator::NotBetween).unwrap();
        assert_eq!(json, "\"nbet\"");
    }

    #[test]
    fn test_default_operator_resolution() {
        assert_eq!(ColumnFilter::new(FilterKind::String).default_operator(), Operator::Equals);
        assert_eq!(ColumnFilter::new(FilterKind::Enum).default_operator(), Operator::AnyOf);

        let custom = ColumnFilter::new(FilterKind::String)
            .with_operators(vec![Operator::Contains, Operator::BeginsWith]);
        assert_eq!(custom.default_operator(), Operator::Contains);

        // An explicit default outside the allow-list is ignored
        let invalid = ColumnFilter::new(FilterKind::Boolean)
            .with_default_operator(Operator::Contains);
        assert_eq!(invalid.default_operator(), Operator::Equals);
    }

    #[test]
    fn test_value_shapes() {
        assert_eq!(Operator::Between.value_shape(), ValueShape::Range);
        assert_eq!(Operator::NoneOf.value_shape(), ValueShape::List);
        assert_eq!(Operator::IsNotNull.value_shape(), ValueShape::Empty);
        assert_eq!(Operator::BeginsWith.value_shape(), ValueShape::Scalar);
    }
}
