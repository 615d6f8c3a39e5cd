//! Value types and literals.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The type of an IR value.
///
/// In JSON, scalar types are plain strings (`"int"`) and pointers are objects
/// (`{"ptr": "int"}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawType", into = "RawType")]
pub enum Type {
    /// 64-bit signed integer
    Int,
    /// Boolean
    Bool,
    /// 64-bit IEEE float
    Float,
    /// Unicode scalar value
    Char,
    /// Pointer to a value of the inner type
    Ptr(Box<Type>),
}

impl Type {
    /// Creates a pointer type to `inner`.
    #[must_use]
    pub fn ptr(inner: Type) -> Self {
        Type::Ptr(Box::new(inner))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Float => write!(f, "float"),
            Type::Char => write!(f, "char"),
            Type::Ptr(inner) => write!(f, "ptr<{inner}>"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawType {
    Name(String),
    Ptr { ptr: Box<RawType> },
}

impl TryFrom<RawType> for Type {
    type Error = Error;

    fn try_from(raw: RawType) -> Result<Self> {
        match raw {
            RawType::Name(name) => match name.as_str() {
                "int" => Ok(Type::Int),
                "bool" => Ok(Type::Bool),
                "float" => Ok(Type::Float),
                "char" => Ok(Type::Char),
                other => Err(malformed_error!("Unknown type '{}'", other)),
            },
            RawType::Ptr { ptr } => Ok(Type::ptr(Type::try_from(*ptr)?)),
        }
    }
}

impl From<Type> for RawType {
    fn from(ty: Type) -> Self {
        match ty {
            Type::Ptr(inner) => RawType::Ptr {
                ptr: Box::new(RawType::from(*inner)),
            },
            scalar => RawType::Name(scalar.to_string()),
        }
    }
}

/// A compile-time constant.
///
/// Floats compare and hash by bit pattern, so `NaN == NaN` and `0.0 != -0.0`. That is
/// the identity value numbering needs: two `const` instructions are interchangeable
/// exactly when they produce the same bits.
#[derive(Debug, Clone, Copy)]
pub enum Literal {
    /// Integer literal
    Int(i64),
    /// Boolean literal
    Bool(bool),
    /// Float literal
    Float(f64),
    /// Character literal
    Char(char),
}

impl Literal {
    /// Returns the natural type of this literal.
    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Literal::Int(_) => Type::Int,
            Literal::Bool(_) => Type::Bool,
            Literal::Float(_) => Type::Float,
            Literal::Char(_) => Type::Char,
        }
    }

    /// Returns the integer value, if this is an integer literal.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean literal.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Interprets a JSON value as a literal of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the value does not fit the type.
    pub fn from_json(value: &serde_json::Value, ty: &Type) -> Result<Self> {
        use serde_json::Value;

        let literal = match (ty, value) {
            (Type::Int, Value::Number(n)) => n.as_i64().map(Literal::Int),
            (Type::Bool, Value::Bool(b)) => Some(Literal::Bool(*b)),
            (Type::Float, Value::Number(n)) => n.as_f64().map(Literal::Float),
            (Type::Char, Value::String(s)) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Literal::Char(c)),
                    _ => None,
                }
            }
            _ => None,
        };
        literal.ok_or_else(|| malformed_error!("Constant {} is not a valid {}", value, ty))
    }

    /// Converts the literal to its JSON representation.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Literal::Int(v) => Value::from(*v),
            Literal::Bool(v) => Value::Bool(*v),
            Literal::Float(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
            Literal::Char(c) => Value::String(c.to_string()),
        }
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<char> for Literal {
    fn from(v: char) -> Self {
        Literal::Char(v)
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => a == b,
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            (Literal::Char(a), Literal::Char(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Literal::Int(v) => v.hash(state),
            Literal::Bool(v) => v.hash(state),
            Literal::Float(v) => v.to_bits().hash(state),
            Literal::Char(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Bool(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v:?}"),
            Literal::Char(c) => write!(f, "'{c}'"),
        }
    }
}
