//! The concrete value domain of the native backend.

use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;

use crate::{bitvector::Bitvector, env::IdMap};

/// A fully determined runtime value.
///
/// Tuples and arrays share the `Vector` representation; the type checker
/// keeps their uses apart, so the evaluator never confuses one for the
/// other.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    Int(BigInt),
    Real(BigRational),
    String(String),
    BitVector(Bitvector),
    Vector(Vec<NativeValue>),
    Record(IdMap<NativeValue>),
}

impl NativeValue {
    /// A short name of the value's kind, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Real(_) => "real",
            Self::String(_) => "string",
            Self::BitVector(_) => "bitvector",
            Self::Vector(_) => "vector",
            Self::Record(_) => "record",
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bitvector(&self) -> Option<&Bitvector> {
        match self {
            Self::BitVector(bv) => Some(bv),
            _ => None,
        }
    }
}

impl From<bool> for NativeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<BigInt> for NativeValue {
    fn from(i: BigInt) -> Self {
        Self::Int(i)
    }
}

impl From<i64> for NativeValue {
    fn from(i: i64) -> Self {
        Self::Int(BigInt::from(i))
    }
}

impl From<Bitvector> for NativeValue {
    fn from(bv: Bitvector) -> Self {
        Self::BitVector(bv)
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::String(s) => f.write_str(s),
            Self::BitVector(bv) => write!(f, "{bv}"),
            Self::Vector(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Record(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}
