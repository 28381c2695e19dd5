//! Metadata filtering for vector index searches

use serde::{Deserialize, Serialize};

use super::chunk::{META_DOCUMENT_ID, META_SCOPE_IDS};

/// Comparison operators for metadata filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Ne,
    /// Field value is one of the listed values
    In,
    NotIn,
    /// List field shares at least one element with the value list
    ContainsAny,
    /// List field is a superset of the value list
    ContainsAll,
    Exists,
    NotExists,
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::In => write!(f, "in"),
            Self::NotIn => write!(f, "not_in"),
            Self::ContainsAny => write!(f, "contains_any"),
            Self::ContainsAll => write!(f, "contains_all"),
            Self::Exists => write!(f, "exists"),
            Self::NotExists => write!(f, "not_exists"),
        }
    }
}

/// Logical connectors for combining filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterConnector {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<FilterValue>),
    Null,
}

impl FilterValue {
    /// View the value as a list; scalars become a one-element slice
    pub fn as_list(&self) -> Vec<&FilterValue> {
        match self {
            Self::List(values) => values.iter().collect(),
            other => vec![other],
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<u32> for FilterValue {
    fn from(n: u32) -> Self {
        Self::Integer(n as i64)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(list: Vec<T>) -> Self {
        Self::List(list.into_iter().map(|v| v.into()).collect())
    }
}

/// A single filter condition on one metadata key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub key: String,
    pub operator: FilterOperator,
    /// Absent for Exists/NotExists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl FilterCondition {
    pub fn new(key: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            key: key.into(),
            operator,
            value: Some(value),
        }
    }

    pub fn exists(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: FilterOperator::Exists,
            value: None,
        }
    }

    pub fn not_exists(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: FilterOperator::NotExists,
            value: None,
        }
    }

    pub fn eq(key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(key, FilterOperator::Eq, value.into())
    }

    pub fn ne(key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(key, FilterOperator::Ne, value.into())
    }

    pub fn in_list(key: impl Into<String>, values: Vec<FilterValue>) -> Self {
        Self::new(key, FilterOperator::In, FilterValue::List(values))
    }

    pub fn not_in_list(key: impl Into<String>, values: Vec<FilterValue>) -> Self {
        Self::new(key, FilterOperator::NotIn, FilterValue::List(values))
    }

    pub fn contains_any(key: impl Into<String>, values: Vec<FilterValue>) -> Self {
        Self::new(key, FilterOperator::ContainsAny, FilterValue::List(values))
    }

    pub fn contains_all(key: impl Into<String>, values: Vec<FilterValue>) -> Self {
        Self::new(key, FilterOperator::ContainsAll, FilterValue::List(values))
    }
}

/// A metadata predicate: a single condition or a group of predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataFilter {
    Condition(FilterCondition),
    Group {
        connector: FilterConnector,
        filters: Vec<MetadataFilter>,
    },
}

impl MetadataFilter {
    pub fn condition(condition: FilterCondition) -> Self {
        Self::Condition(condition)
    }

    pub fn and(filters: Vec<MetadataFilter>) -> Self {
        Self::Group {
            connector: FilterConnector::And,
            filters,
        }
    }

    pub fn or(filters: Vec<MetadataFilter>) -> Self {
        Self::Group {
            connector: FilterConnector::Or,
            filters,
        }
    }

    /// Chunks whose scope set contains `scope_id`
    pub fn scope(scope_id: impl Into<String>) -> Self {
        Self::Condition(FilterCondition::contains_all(
            META_SCOPE_IDS,
            vec![FilterValue::String(scope_id.into())],
        ))
    }

    /// Chunks belonging to at least one of the given scopes
    pub fn any_scope<I, S>(scope_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Condition(FilterCondition::contains_any(
            META_SCOPE_IDS,
            scope_ids
                .into_iter()
                .map(|s| FilterValue::String(s.into()))
                .collect(),
        ))
    }

    /// Chunks of one source document
    pub fn document(document_id: impl Into<String>) -> Self {
        Self::Condition(FilterCondition::eq(META_DOCUMENT_ID, document_id.into()))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Condition(_) => false,
            Self::Group { filters, .. } => filters.is_empty(),
        }
    }
}
