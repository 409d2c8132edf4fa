//! The property-bag value type shared by memories, vector records, and graph
//! nodes.
//!
//! Spec note: provider-specific tags are free-form key/value data, but an
//! untyped `any` does not play well with Rust's type system or with
//! `schemars`-derived JSON schemas. [`Scalar`] is the tagged variant the
//! design calls for; serialization to a concrete backend (a JSON column, a
//! graph database's native property types, ...) is that backend's
//! responsibility, not this crate's.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single property value: either a scalar or a (non-nested) list of
/// scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    /// Absence of a value.
    Null,
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// A homogeneous-or-not list of scalars.
    List(Vec<Scalar>),
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Free-form properties attached to a memory, vector record, or graph node.
///
/// Keys are sorted (`BTreeMap`) so that two equal property sets always
/// serialize identically, matching the teacher's `Metadata` convention.
pub type Properties = BTreeMap<String, Scalar>;
