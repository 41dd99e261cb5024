//! Document store types
//!
//! Documents, paths, and the structured query the store executes.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, SortDirection};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Paths
// ============================================================================

/// Slash-separated document path, alternating collection and document ids.
///
/// `sellers/s1/products/p9` is document `p9` in collection `products`,
/// whose parent document is `s1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Parse a document path
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path
            .trim_matches('/')
            .split('/')
            .map(str::to_string)
            .collect();

        if segments.iter().any(String::is_empty) {
            return Err(Error::store(format!("empty segment in path '{path}'")));
        }
        if segments.len() % 2 != 0 {
            return Err(Error::store(format!(
                "'{path}' is a collection path, not a document path"
            )));
        }

        Ok(Self { segments })
    }

    /// All segments in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segment counted from the end, `-1` being the document id.
    ///
    /// Positive indexes count from the start.
    pub fn segment(&self, index: isize) -> Option<&str> {
        let len = self.segments.len() as isize;
        let idx = if index < 0 { len + index } else { index };
        if idx < 0 || idx >= len {
            return None;
        }
        self.segments.get(idx as usize).map(String::as_str)
    }

    /// Document id
    pub fn id(&self) -> &str {
        self.segment(-1).unwrap_or_default()
    }

    /// Id of the collection holding the document
    pub fn collection_id(&self) -> &str {
        self.segment(-2).unwrap_or_default()
    }

    /// Id of the parent document, for subcollection documents
    pub fn parent_id(&self) -> Option<&str> {
        self.segment(-3)
    }

    /// Full path of the collection holding the document
    pub fn collection_path(&self) -> String {
        self.segments[..self.segments.len() - 1].join("/")
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl TryFrom<String> for DocumentPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DocumentPath> for String {
    fn from(path: DocumentPath) -> Self {
        path.to_string()
    }
}

// ============================================================================
// Documents
// ============================================================================

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Location of the document
    pub path: DocumentPath,
    /// Document fields
    pub fields: JsonObject,
}

impl Document {
    /// Create a document from a path string and a JSON object
    pub fn new(path: &str, fields: JsonValue) -> Result<Self> {
        let fields = match fields {
            JsonValue::Object(map) => map,
            other => {
                return Err(Error::store(format!(
                    "document '{path}' must be a JSON object, got {other}"
                )))
            }
        };
        Ok(Self {
            path: DocumentPath::parse(path)?,
            fields,
        })
    }

    /// Document id
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Look up a field, following dots into nested maps
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        let mut parts = field.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

// ============================================================================
// Structured Query
// ============================================================================

/// Comparison operator of a field predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOp {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl FieldOp {
    /// Whether the operator is an inequality (range) operator
    pub fn is_inequality(self) -> bool {
        !matches!(self, FieldOp::Equal)
    }
}

impl fmt::Display for FieldOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            FieldOp::Equal => "==",
            FieldOp::LessThan => "<",
            FieldOp::LessThanOrEqual => "<=",
            FieldOp::GreaterThan => ">",
            FieldOp::GreaterThanOrEqual => ">=",
        };
        f.write_str(symbol)
    }
}

/// `field op value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: FieldOp,
    pub value: JsonValue,
}

/// One order-by clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Query as executed by a `DocumentStore`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    /// Collection id (group queries) or full collection path
    pub collection: String,
    /// Match every collection with this id, across all parents
    pub all_descendants: bool,
    pub predicates: Vec<Predicate>,
    pub order_by: Vec<OrderBy>,
    /// Values of the order-by fields to start strictly after
    pub start_after: Option<Vec<JsonValue>>,
    pub limit: Option<u32>,
}

impl StructuredQuery {
    /// Query every collection named `collection_id`, regardless of parent
    pub fn collection_group(collection_id: impl Into<String>) -> Self {
        Self {
            collection: collection_id.into(),
            all_descendants: true,
            predicates: Vec::new(),
            order_by: Vec::new(),
            start_after: None,
            limit: None,
        }
    }

    /// Query a single collection by full path
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            all_descendants: false,
            ..Self::collection_group(path)
        }
    }

    /// Add a field predicate
    #[must_use]
    pub fn where_field(
        mut self,
        field: impl Into<String>,
        op: FieldOp,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.predicates.push(Predicate {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Add an order-by clause
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Start strictly after these order-by values
    #[must_use]
    pub fn start_after(mut self, values: Vec<JsonValue>) -> Self {
        self.start_after = Some(values);
        self
    }

    /// Cap the number of returned documents
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Same query without the limit
    #[must_use]
    pub fn without_limit(mut self) -> Self {
        self.limit = None;
        self
    }

    /// Field of the first inequality predicate, if any
    pub fn inequality_field(&self) -> Option<&str> {
        self.predicates
            .iter()
            .find(|p| p.op.is_inequality())
            .map(|p| p.field.as_str())
    }

    /// Check the store's query-shape rules.
    ///
    /// All inequality predicates must share one field, and when an order-by
    /// is present the first one must be on that field.
    pub fn validate(&self) -> Result<()> {
        if let Some(field) = self.inequality_field() {
            if let Some(other) = self
                .predicates
                .iter()
                .find(|p| p.op.is_inequality() && p.field != field)
            {
                return Err(Error::query(format!(
                    "inequality filters on different fields '{field}' and '{}'",
                    other.field
                )));
            }
            if let Some(first) = self.order_by.first() {
                if first.field != field {
                    return Err(Error::query(format!(
                        "first orderBy '{}' must match inequality field '{field}'",
                        first.field
                    )));
                }
            }
        }

        if let Some(values) = &self.start_after {
            if values.is_empty() || values.len() > self.order_by.len() {
                return Err(Error::query(
                    "startAfter needs one value per orderBy clause",
                ));
            }
        }

        if self.limit == Some(0) {
            return Err(Error::query("limit must be > 0"));
        }

        Ok(())
    }
}
