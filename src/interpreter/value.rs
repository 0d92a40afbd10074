// File: src/interpreter/value.rs
//
// Runtime values of the reference interpreter. Integers wrap at their IR
// width, arrays are shared by reference the way every target passes them.

use crate::ir::Type;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Char(char),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Void,
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    /// Default value of a declaration without an initializer
    pub fn zero(ty: &Type) -> Self {
        match ty {
            Type::Int => Value::Int(0),
            Type::Long => Value::Long(0),
            Type::Float => Value::Float(0.0),
            Type::Double => Value::Double(0.0),
            Type::Bool => Value::Bool(false),
            Type::Char => Value::Char('\0'),
            Type::String => Value::str(""),
            Type::Array(_) => Value::array(Vec::new()),
            Type::Void => Value::Void,
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Long(_) => Type::Long,
            Value::Float(_) => Type::Float,
            Value::Double(_) => Type::Double,
            Value::Bool(_) => Type::Bool,
            Value::Char(_) => Type::Char,
            Value::Str(_) => Type::String,
            Value::Array(items) => {
                let elem = items.borrow().first().map_or(Type::Int, Value::ty);
                Type::array_of(elem)
            }
            Value::Void => Type::Void,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_))
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Value::Int(n) => *n as i64,
            Value::Long(n) => *n,
            Value::Float(n) => *n as i64,
            Value::Double(n) => *n as i64,
            Value::Char(c) => *c as i64,
            Value::Bool(b) => *b as i64,
            _ => 0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Float(n) => *n as f64,
            Value::Double(n) => *n,
            other => other.as_i64() as f64,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            other => other.as_i64() != 0,
        }
    }

    /// Cast semantics shared by explicit casts and implicit conversions:
    /// integers wrap, floating values truncate toward zero and saturate.
    pub fn convert(self, ty: &Type) -> Value {
        match (ty, &self) {
            (Type::Int, Value::Int(_)) | (Type::Long, Value::Long(_)) => self,
            (Type::Int, Value::Float(_) | Value::Double(_)) => Value::Int(self.as_f64() as i32),
            (Type::Int, _) => Value::Int(self.as_i64() as i32),
            (Type::Long, Value::Float(_) | Value::Double(_)) => Value::Long(self.as_f64() as i64),
            (Type::Long, _) => Value::Long(self.as_i64()),
            (Type::Float, _) => Value::Float(self.as_f64() as f32),
            (Type::Double, Value::Float(n)) => Value::Double(*n as f64),
            (Type::Double, _) => Value::Double(self.as_f64()),
            (Type::Char, Value::Int(_) | Value::Long(_)) => {
                Value::Char(char::from_u32(self.as_i64() as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            _ => self,
        }
    }
}

/// Number text the way a JavaScript console prints it, so integral doubles
/// drop their fraction
fn format_double(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Long(n) => write!(f, "{}", n),
            Value::Float(n) if n.is_finite() && n.fract() != 0.0 => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_double(*n as f64)),
            Value::Double(n) => write!(f, "{}", format_double(*n)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{}", c),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(items) => {
                let parts: Vec<String> = items.borrow().iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            Value::Void => Ok(()),
        }
    }
}
