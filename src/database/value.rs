//! Value classification shared by schema inference and result rendering.

use mongodb::bson::{Bson, Document};
use serde::Serialize;
use std::fmt;

/// Closed taxonomy of document value kinds.
///
/// Declaration order is the order kinds are listed when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ValueKind {
    Null,
    Undefined,
    ObjectId,
    Date,
    RegExp,
    Binary,
    Array,
    Object,
    Int,
    Double,
    Boolean,
    String,
    Unknown,
}

impl ValueKind {
    /// Classify a single value. Whole-valued doubles count as `Int`.
    pub fn of(value: &Bson) -> Self {
        match value {
            Bson::Null => Self::Null,
            Bson::Undefined => Self::Undefined,
            Bson::ObjectId(_) => Self::ObjectId,
            Bson::DateTime(_) | Bson::Timestamp(_) => Self::Date,
            Bson::RegularExpression(_) => Self::RegExp,
            Bson::Binary(_) => Self::Binary,
            Bson::Array(_) => Self::Array,
            Bson::Document(_) => Self::Object,
            Bson::Int32(_) | Bson::Int64(_) => Self::Int,
            Bson::Double(d) if d.is_finite() && d.fract() == 0.0 => Self::Int,
            Bson::Double(_) => Self::Double,
            Bson::Boolean(_) => Self::Boolean,
            Bson::String(_) | Bson::Symbol(_) => Self::String,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::ObjectId => "ObjectId",
            Self::Date => "Date",
            Self::RegExp => "RegExp",
            Self::Binary => "Binary",
            Self::Array => "Array",
            Self::Object => "Object",
            Self::Int => "Int",
            Self::Double => "Double",
            Self::Boolean => "Boolean",
            Self::String => "String",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural view of a caller-supplied query value.
///
/// Traversals dispatch on this tag instead of inspecting every BSON variant.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Mapping(&'a Document),
    Sequence(&'a [Bson]),
    Scalar(&'a Bson),
}

impl<'a> Node<'a> {
    pub fn of(value: &'a Bson) -> Self {
        match value {
            Bson::Document(doc) => Self::Mapping(doc),
            Bson::Array(items) => Self::Sequence(items),
            other => Self::Scalar(other),
        }
    }
}
