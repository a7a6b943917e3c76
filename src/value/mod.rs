//! # Scalar Value Type
//!
//! `Scalar` is the sum type backing every attribute value stored on a node
//! or relationship, and every literal that can appear in a query. It is
//! also the type returned for bound variables and computed projections.
//!
//! Equality is structural. Ordering is defined only within a single
//! variant — comparing across variants is a type error at the evaluator
//! level (§4.6), not a panic here.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A scalar value: null, boolean, signed 64-bit integer, 64-bit float,
/// UTF-8 string, or a homogeneous list of scalars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Scalar>),
}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "string",
            Scalar::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Coerce to `f64` for arithmetic, allowing `Int` to widen to `Float`.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// True if both operands are integers — used to decide whether an
    /// arithmetic result stays `Int` or widens to `Float`.
    pub fn both_int(a: &Scalar, b: &Scalar) -> bool {
        matches!((a, b), (Scalar::Int(_), Scalar::Int(_)))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Str(s) => write!(f, "{s}"),
            Scalar::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Structural equality. `Null == Null` is `true` here — three-valued
/// `NULL`-propagation for comparisons lives in the evaluator (§4.6), not
/// in this type's `PartialEq`.
impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a == b,
            (Scalar::Int(a), Scalar::Float(b)) | (Scalar::Float(b), Scalar::Int(a)) => {
                (*a as f64) == *b
            }
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            (Scalar::List(a), Scalar::List(b)) => a == b,
            _ => false,
        }
    }
}

/// Ordering is defined only within a type (§3); cross-type comparisons
/// return `None`.
impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a.partial_cmp(b),
            (Scalar::Int(a), Scalar::Int(b)) => a.partial_cmp(b),
            (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b),
            (Scalar::Int(a), Scalar::Float(b)) => (*a as f64).partial_cmp(b),
            (Scalar::Float(a), Scalar::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Scalar::Str(a), Scalar::Str(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_float_equality_is_numeric() {
        assert_eq!(Scalar::Int(2), Scalar::Float(2.0));
    }

    #[test]
    fn cross_type_ordering_is_none() {
        assert_eq!(Scalar::Int(1).partial_cmp(&Scalar::Str("a".into())), None);
    }

    #[test]
    fn display_list() {
        let l = Scalar::List(vec![Scalar::Bool(true), Scalar::Bool(false)]);
        assert_eq!(l.to_string(), "[true, false]");
    }
}
