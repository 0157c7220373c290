//! Parameter values passed to drivers.

use chrono::{DateTime, Utc};

/// A value a driver can bind or return.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

/// A parameter as handed to a driver: optional name, 1-based position, value.
///
/// An empty `name` means the parameter is positional.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    pub name: String,
    pub ordinal: usize,
    pub value: Value,
}

impl NamedValue {
    pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: String::new(),
            ordinal,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            ordinal,
            value: value.into(),
        }
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}

/// An argument supplied by application code to the [`Database`](crate::Database) handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Positional(Value),
    Named(String, Value),
}

/// Bind `value` to the parameter called `name`.
pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Arg {
    Arg::Named(name.into(), value.into())
}

/// Number arguments the way drivers expect them.
pub(crate) fn to_named_values(args: &[Arg]) -> Vec<NamedValue> {
    args.iter()
        .enumerate()
        .map(|(idx, arg)| match arg {
            Arg::Positional(value) => NamedValue::positional(idx + 1, value.clone()),
            Arg::Named(name, value) => NamedValue::named(name.clone(), idx + 1, value.clone()),
        })
        .collect()
}

/// Build an argument list from anything convertible into [`Arg`].
///
/// ```rust
/// use sqllog::{args, named, Arg};
///
/// let list: Vec<Arg> = args![2, "abc", named("id", 7)];
/// assert_eq!(list.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::Arg>::new() };
    ($($arg:expr),+ $(,)?) => { vec![$($crate::Arg::from($arg)),+] };
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }

            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::Positional(Value::from(v))
                }
            }
        )*
    };
}

impl_value_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    DateTime<Utc> => Timestamp,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Self {
        Arg::Positional(v.into())
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Positional(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_macro_numbers_from_one() {
        let list = to_named_values(&args![123, 2.5, true, "abc", named("id", 1)]);

        assert_eq!(list.len(), 5);
        assert_eq!(list[0], NamedValue::positional(1, 123));
        assert_eq!(list[2].value, Value::Bool(true));
        assert_eq!(list[4].name, "id");
        assert_eq!(list[4].ordinal, 5);
        assert!(list[4].is_named());
        assert!(!list[3].is_named());
    }

    #[test]
    fn test_option_maps_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::from("abc").to_string(), "\"abc\"");
        assert_eq!(Value::from(vec![1u8, 2, 3]).to_string(), "<3 bytes>");
    }
}
