//! Structured metadata filters applied by retrievers and vector stores

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Metadata;

/// Comparison operators for metadata filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring for strings, membership for arrays
    Contains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    Exists,
    NotExists,
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Exists => "exists",
            Self::NotExists => "not_exists",
        };
        write!(f, "{}", symbol)
    }
}

/// Logical connectors for combining filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterConnector {
    #[default]
    And,
    Or,
}

/// A single filter condition. `value` is absent for existence checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub key: String,
    pub operator: FilterOperator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FilterCondition {
    pub fn new(key: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            operator,
            value: Some(value.into()),
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

    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, FilterOperator::Eq, value)
    }

    pub fn ne(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, FilterOperator::Ne, value)
    }

    pub fn gt(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, FilterOperator::Gt, value)
    }

    pub fn gte(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, FilterOperator::Gte, value)
    }

    pub fn lt(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, FilterOperator::Lt, value)
    }

    pub fn lte(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, FilterOperator::Lte, value)
    }

    pub fn contains(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, FilterOperator::Contains, value)
    }

    pub fn starts_with(key: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::new(key, FilterOperator::StartsWith, prefix.into())
    }

    pub fn ends_with(key: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::new(key, FilterOperator::EndsWith, suffix.into())
    }

    pub fn in_list(key: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(key, FilterOperator::In, Value::Array(values))
    }

    pub fn not_in_list(key: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(key, FilterOperator::NotIn, Value::Array(values))
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        let actual = metadata.get(&self.key);

        let expected = match (self.operator, self.value.as_ref()) {
            (FilterOperator::Exists, _) => return actual.is_some(),
            (FilterOperator::NotExists, _) => return actual.is_none(),
            (_, None) => return false,
            (_, Some(expected)) => expected,
        };

        match self.operator {
            FilterOperator::Eq => actual.is_some_and(|a| values_equal(a, expected)),
            FilterOperator::Ne => !actual.is_some_and(|a| values_equal(a, expected)),
            FilterOperator::Gt => compare_numbers(actual, expected, |a, b| a > b),
            FilterOperator::Gte => compare_numbers(actual, expected, |a, b| a >= b),
            FilterOperator::Lt => compare_numbers(actual, expected, |a, b| a < b),
            FilterOperator::Lte => compare_numbers(actual, expected, |a, b| a <= b),
            FilterOperator::Contains => match (actual, expected) {
                (Some(Value::String(s)), Value::String(needle)) => s.contains(needle.as_str()),
                (Some(Value::Array(items)), needle) => {
                    items.iter().any(|item| values_equal(item, needle))
                }
                _ => false,
            },
            FilterOperator::StartsWith => match (actual, expected) {
                (Some(Value::String(s)), Value::String(prefix)) => s.starts_with(prefix.as_str()),
                _ => false,
            },
            FilterOperator::EndsWith => match (actual, expected) {
                (Some(Value::String(s)), Value::String(suffix)) => s.ends_with(suffix.as_str()),
                _ => false,
            },
            FilterOperator::In => match expected {
                Value::Array(options) => {
                    actual.is_some_and(|a| options.iter().any(|o| values_equal(a, o)))
                }
                _ => false,
            },
            FilterOperator::NotIn => match expected {
                Value::Array(options) => {
                    !actual.is_some_and(|a| options.iter().any(|o| values_equal(a, o)))
                }
                _ => true,
            },
            FilterOperator::Exists => actual.is_some(),
            FilterOperator::NotExists => actual.is_none(),
        }
    }
}

/// Numbers compare by value so that `1` and `1.0` are equal
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => a == b,
    }
}

fn compare_numbers<F>(actual: Option<&Value>, expected: &Value, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (actual.and_then(Value::as_f64), expected.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => match (actual.and_then(Value::as_str), expected.as_str()) {
            // Lexicographic fallback keeps RFC 3339 timestamps comparable
            (Some(a), Some(b)) => cmp_str(a, b, &cmp),
            _ => false,
        },
    }
}

fn cmp_str<F>(a: &str, b: &str, cmp: &F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    let ordering = a.cmp(b) as i8 as f64;
    cmp(ordering, 0.0)
}

/// A metadata filter that can be a single condition or a group of conditions
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

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Condition(_) => false,
            Self::Group { filters, .. } => filters.is_empty(),
        }
    }

    /// An empty group matches everything
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Self::Condition(condition) => condition.matches(metadata),
            Self::Group { connector, filters } => {
                if filters.is_empty() {
                    return true;
                }
                match connector {
                    FilterConnector::And => filters.iter().all(|f| f.matches(metadata)),
                    FilterConnector::Or => filters.iter().any(|f| f.matches(metadata)),
                }
            }
        }
    }
}

/// Builder for creating complex metadata filters
#[derive(Debug, Default)]
pub struct FilterBuilder {
    filters: Vec<MetadataFilter>,
    connector: FilterConnector,
}

impl FilterBuilder {
    /// Create a new filter builder (defaults to AND connector)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder that uses OR connector
    pub fn or() -> Self {
        Self {
            filters: Vec::new(),
            connector: FilterConnector::Or,
        }
    }

    pub fn eq(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(FilterCondition::eq(key, value))
    }

    pub fn ne(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(FilterCondition::ne(key, value))
    }

    pub fn gt(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(FilterCondition::gt(key, value))
    }

    pub fn gte(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(FilterCondition::gte(key, value))
    }

    pub fn lt(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(FilterCondition::lt(key, value))
    }

    pub fn lte(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(FilterCondition::lte(key, value))
    }

    pub fn contains(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(FilterCondition::contains(key, value))
    }

    pub fn starts_with(self, key: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.condition(FilterCondition::starts_with(key, prefix))
    }

    pub fn ends_with(self, key: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.condition(FilterCondition::ends_with(key, suffix))
    }

    pub fn in_list(self, key: impl Into<String>, values: Vec<Value>) -> Self {
        self.condition(FilterCondition::in_list(key, values))
    }

    pub fn exists(self, key: impl Into<String>) -> Self {
        self.condition(FilterCondition::exists(key))
    }

    pub fn not_exists(self, key: impl Into<String>) -> Self {
        self.condition(FilterCondition::not_exists(key))
    }

    /// Add a nested filter group
    pub fn group(mut self, filter: MetadataFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn condition(mut self, condition: FilterCondition) -> Self {
        self.filters.push(MetadataFilter::Condition(condition));
        self
    }

    /// Build the final filter; `None` when nothing was added
    pub fn build(mut self) -> Option<MetadataFilter> {
        match self.filters.len() {
            0 => None,
            1 => self.filters.pop(),
            _ => Some(MetadataFilter::Group {
                connector: self.connector,
                filters: self.filters,
            }),
        }
    }
}
