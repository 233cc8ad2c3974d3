// src/model/value.rs
//! Dynamic values and the type language used by member signatures

use crate::model::object::Target;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Type reference used in signatures
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeRef {
    Unit,
    Bool,
    Int,
    Float,
    Str,
    List(Box<TypeRef>),
    /// Accepts every value
    Any,
    /// Object assignable to the named contract
    Object(String),
    /// Generic parameter, bound per call
    Param(String),
}

impl TypeRef {
    pub fn list(element: TypeRef) -> Self {
        TypeRef::List(Box::new(element))
    }

    pub fn object(name: impl Into<String>) -> Self {
        TypeRef::Object(name.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        TypeRef::Param(name.into())
    }

    /// True if this type mentions a generic parameter
    pub fn is_open(&self) -> bool {
        match self {
            TypeRef::Param(_) => true,
            TypeRef::List(inner) => inner.is_open(),
            _ => false,
        }
    }

    /// Replace generic parameters with the bound arguments.
    ///
    /// Parameters without a binding are left open.
    pub fn substitute(&self, params: &[String], arguments: &[TypeRef]) -> TypeRef {
        match self {
            TypeRef::Param(name) => params
                .iter()
                .position(|p| p == name)
                .and_then(|i| arguments.get(i))
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeRef::List(inner) => TypeRef::list(inner.substitute(params, arguments)),
            other => other.clone(),
        }
    }

    /// Check whether a value fits this type
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeRef::Any, _) | (TypeRef::Param(_), _) => true,
            (TypeRef::Unit, Value::Unit)
            | (TypeRef::Bool, Value::Bool(_))
            | (TypeRef::Int, Value::Int(_))
            | (TypeRef::Float, Value::Float(_))
            | (TypeRef::Str, Value::Str(_)) => true,
            (TypeRef::List(inner), Value::List(items)) => items.iter().all(|v| inner.admits(v)),
            (TypeRef::Object(name), Value::Object(target)) => {
                target.type_info().is_assignable_to_name(name)
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Unit => write!(f, "Unit"),
            TypeRef::Bool => write!(f, "Bool"),
            TypeRef::Int => write!(f, "Int"),
            TypeRef::Float => write!(f, "Float"),
            TypeRef::Str => write!(f, "Str"),
            TypeRef::List(inner) => write!(f, "List<{}>", inner),
            TypeRef::Any => write!(f, "Any"),
            TypeRef::Object(name) => write!(f, "{}", name),
            TypeRef::Param(name) => write!(f, "{}", name),
        }
    }
}

/// Dynamic value passed through argument and return slots
#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(Arc<dyn Target>),
}

impl Value {
    /// Runtime type of this value
    pub fn type_ref(&self) -> TypeRef {
        match self {
            Value::Unit => TypeRef::Unit,
            Value::Bool(_) => TypeRef::Bool,
            Value::Int(_) => TypeRef::Int,
            Value::Float(_) => TypeRef::Float,
            Value::Str(_) => TypeRef::Str,
            Value::List(items) => match items.first() {
                Some(first) => TypeRef::list(first.type_ref()),
                None => TypeRef::list(TypeRef::Any),
            },
            Value::Object(target) => TypeRef::Object(target.type_info().name().to_string()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn Target>> {
        match self {
            Value::Object(target) => Some(target),
            _ => None,
        }
    }

    pub fn object(target: Arc<dyn Target>) -> Self {
        Value::Object(target)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "Unit"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Object(target) => write!(f, "Object({})", target.type_info().name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(target) => write!(f, "<{}>", target.type_info().name()),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Render argument types for diagnostics
pub fn describe_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.type_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_primitives() {
        assert!(TypeRef::Int.admits(&Value::Int(3)));
        assert!(!TypeRef::Int.admits(&Value::Str("3".into())));
        assert!(TypeRef::Any.admits(&Value::Float(1.5)));
        assert!(TypeRef::list(TypeRef::Int).admits(&Value::List(vec![1.into(), 2.into()])));
        assert!(!TypeRef::list(TypeRef::Int).admits(&Value::List(vec!["x".into()])));
    }

    #[test]
    fn test_substitute_generic_parameters() {
        let params = vec!["T".to_string(), "U".to_string()];
        let args = vec![TypeRef::Str, TypeRef::Int];

        assert_eq!(TypeRef::param("U").substitute(&params, &args), TypeRef::Int);
        assert_eq!(
            TypeRef::list(TypeRef::param("T")).substitute(&params, &args),
            TypeRef::list(TypeRef::Str)
        );
        assert_eq!(
            TypeRef::param("V").substitute(&params, &args),
            TypeRef::param("V")
        );
    }

    #[test]
    fn test_open_types() {
        assert!(TypeRef::list(TypeRef::param("T")).is_open());
        assert!(!TypeRef::list(TypeRef::Int).is_open());
    }

    #[test]
    fn test_value_display() {
        let v = Value::List(vec![1.into(), "a".into()]);
        assert_eq!(v.to_string(), "[1, \"a\"]");
        assert_eq!(describe_values(&[Value::Int(1), Value::Bool(true)]), "Int, Bool");
    }
}
