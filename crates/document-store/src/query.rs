use std::cmp::Ordering;

use serde_json::Value;

use crate::Document;
use crate::document::lookup_field;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// A single field condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    /// Field equals the value.
    Eq(String, Value),
    /// Field is greater than or equal to the value.
    Gte(String, Value),
    /// Field is less than or equal to the value.
    Lte(String, Value),
}

impl FieldFilter {
    /// Returns the dotted field path this filter applies to.
    pub fn field(&self) -> &str {
        match self {
            FieldFilter::Eq(f, _) | FieldFilter::Gte(f, _) | FieldFilter::Lte(f, _) => f,
        }
    }

    /// Returns true if the document satisfies this filter.
    ///
    /// Values of different JSON types never match, mirroring how the
    /// server evaluates range filters.
    pub fn matches(&self, data: &Value) -> bool {
        let (field, expected) = match self {
            FieldFilter::Eq(f, v) | FieldFilter::Gte(f, v) | FieldFilter::Lte(f, v) => (f, v),
        };
        let Some(actual) = lookup_field(data, field) else {
            return false;
        };
        if type_rank(actual) != type_rank(expected) {
            return false;
        }
        let ordering = compare_values(actual, expected);
        match self {
            FieldFilter::Eq(..) => ordering == Ordering::Equal,
            FieldFilter::Gte(..) => ordering != Ordering::Less,
            FieldFilter::Lte(..) => ordering != Ordering::Greater,
        }
    }
}

/// Position to resume a paginated query from.
///
/// Holds the order-by value and the id of the last document of the
/// previous page; ties on the value are broken by document id.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub value: Value,
    pub id: String,
}

impl Cursor {
    /// Builds the cursor positioned after `doc` for the given order-by field.
    pub fn after(doc: &Document, order_field: Option<&str>) -> Self {
        let value = order_field
            .and_then(|field| doc.field(field))
            .cloned()
            .unwrap_or(Value::Null);
        Self {
            value,
            id: doc.id().to_string(),
        }
    }
}

/// Builder for collection queries.
///
/// Supports equality and range filters, server-side ordering on one field,
/// a page size limit and cursor-based pagination.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Collection to query.
    pub collection: String,

    /// Conditions every returned document satisfies.
    pub filters: Vec<FieldFilter>,

    /// Field and direction to order by. Documents are ordered by id when unset.
    pub order_by: Option<(String, Direction)>,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,

    /// Resume after this position.
    pub start_after: Option<Cursor>,
}

impl DocumentQuery {
    /// Creates a query over every document of a collection.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Filters to documents whose field equals the value.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter::Eq(field.into(), value.into()));
        self
    }

    /// Filters to documents whose field is at least the value (inclusive).
    pub fn where_gte(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters
            .push(FieldFilter::Gte(field.into(), value.into()));
        self
    }

    /// Filters to documents whose field is at most the value (inclusive).
    pub fn where_lte(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters
            .push(FieldFilter::Lte(field.into(), value.into()));
        self
    }

    /// Orders results by a field.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Limits the number of documents returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resumes after the given cursor.
    pub fn start_after(mut self, cursor: Cursor) -> Self {
        self.start_after = Some(cursor);
        self
    }

    /// Returns the order-by field, if any.
    pub fn order_field(&self) -> Option<&str> {
        self.order_by.as_ref().map(|(field, _)| field.as_str())
    }

    /// Returns the effective sort direction.
    pub fn direction(&self) -> Direction {
        self.order_by
            .as_ref()
            .map(|(_, direction)| *direction)
            .unwrap_or_default()
    }

    /// Compares two documents in this query's result order.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = match self.order_field() {
            Some(field) => compare_optional(a.field(field), b.field(field))
                .then_with(|| a.id().cmp(b.id())),
            None => a.id().cmp(b.id()),
        };
        match self.direction() {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }

    /// Returns true if the document sorts strictly after the cursor.
    pub fn is_after_cursor(&self, doc: &Document, cursor: &Cursor) -> bool {
        let ordering = match self.order_field() {
            Some(field) => compare_optional(doc.field(field), Some(&cursor.value))
                .then_with(|| doc.id().cmp(cursor.id.as_str())),
            None => doc.id().cmp(cursor.id.as_str()),
        };
        match self.direction() {
            Direction::Ascending => ordering == Ordering::Greater,
            Direction::Descending => ordering == Ordering::Less,
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub documents: Vec<Document>,

    /// Cursor for the next page; `None` when this page was the last one.
    pub next_cursor: Option<Cursor>,
}

impl QueryPage {
    /// Builds a page, emitting a cursor only when the page is full.
    pub fn new(documents: Vec<Document>, query: &DocumentQuery) -> Self {
        let next_cursor = match (query.limit, documents.last()) {
            (Some(limit), Some(last)) if documents.len() >= limit => {
                Some(Cursor::after(last, query.order_field()))
            }
            _ => None,
        };
        Self {
            documents,
            next_cursor,
        }
    }

    /// Returns the number of documents on this page.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if the page holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

// null < bool < number < string < array < object
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: by type first, then by value.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    compare_values(a.unwrap_or(&Value::Null), b.unwrap_or(&Value::Null))
}
