//! Fallback conversion for drivers that only bind by position.

use crate::error::{Error, Result};
use crate::value::{NamedValue, Value};

/// Strip names and ordinals, keeping values in order.
///
/// Fails with [`Error::UnsupportedNamedParameters`] if any parameter carries a
/// name; in that case none of the values are returned.
pub fn named_values_to_values(named: &[NamedValue]) -> Result<Vec<Value>> {
    named
        .iter()
        .map(|param| {
            if param.is_named() {
                Err(Error::UnsupportedNamedParameters)
            } else {
                Ok(param.value.clone())
            }
        })
        .collect()
}

/// Positional parameters for a plain value list, numbered from one.
pub fn values_to_named_values(values: Vec<Value>) -> Vec<NamedValue> {
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| NamedValue::positional(idx + 1, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_values_keep_order() {
        let params = vec![
            NamedValue::positional(1, 123),
            NamedValue::positional(2, "abc"),
            NamedValue::positional(3, Value::Null),
        ];

        let values = named_values_to_values(&params).unwrap();
        assert_eq!(
            values,
            vec![Value::Int(123), Value::Text("abc".into()), Value::Null]
        );
    }

    #[test]
    fn test_any_name_rejects_whole_list() {
        let params = vec![
            NamedValue::positional(1, 1),
            NamedValue::named("id", 2, 2),
        ];

        let err = named_values_to_values(&params).unwrap_err();
        assert!(matches!(err, Error::UnsupportedNamedParameters));
    }

    #[test]
    fn test_empty_list() {
        assert!(named_values_to_values(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_values_to_named_values() {
        let named = values_to_named_values(vec![Value::Int(2), Value::Bool(false)]);
        assert_eq!(named[0], NamedValue::positional(1, 2));
        assert_eq!(named[1].ordinal, 2);
        assert!(named.iter().all(|p| !p.is_named()));
    }
}
