//! Ordered collection queries
//!
//! A query selects every document of one collection that carries the order
//! field, sorted by that field. Documents without the field are left out of
//! the result set.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use super::error::{StoreError, StoreResult};
use super::types::Document;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// An ordered query over one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub collection: String,
    pub order_by: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Query {
    /// Ascending query on `order_by`
    pub fn new(collection: impl Into<String>, order_by: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_by: order_by.into(),
            direction: Direction::Ascending,
        }
    }

    /// Builder method: sort descending
    pub fn descending(mut self) -> Self {
        self.direction = Direction::Descending;
        self
    }

    /// Reject malformed queries
    pub fn validate(&self) -> StoreResult<()> {
        validate_collection(&self.collection)?;
        if self.order_by.trim().is_empty() {
            return Err(StoreError::InvalidQuery(
                "order_by field must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Evaluate against a collection's documents (in insertion order)
    ///
    /// The sort is stable, so documents with equal keys keep insertion order.
    pub fn apply(&self, documents: &[Document]) -> Vec<Document> {
        let mut selected: Vec<Document> = documents
            .iter()
            .filter(|d| d.get(&self.order_by).is_some())
            .cloned()
            .collect();

        selected.sort_by(|a, b| {
            let ord = compare_values(
                a.get(&self.order_by).unwrap_or(&Value::Null),
                b.get(&self.order_by).unwrap_or(&Value::Null),
            );
            match self.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });

        selected
    }
}

/// Check a collection name
pub fn validate_collection(collection: &str) -> StoreResult<()> {
    if collection.is_empty() {
        return Err(StoreError::InvalidQuery(
            "collection name must not be empty".to_string(),
        ));
    }
    if collection.contains('/') || collection.chars().any(char::is_whitespace) {
        return Err(StoreError::InvalidQuery(format!(
            "invalid collection name '{}'",
            collection
        )));
    }
    Ok(())
}

/// Rank of a JSON type in the cross-type ordering
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

/// Total order over JSON values: by type first, then by value
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
