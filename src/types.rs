//! Builtin types and keyword fragments
//!
//! Builtins map the JSON types onto traits: [`integer`], [`float`], [`string`],
//! [`boolean`], [`null`], [`dict`], [`list`], [`tuple`] and [`unique`].
//!
//! Keyword fragments carry a single schema keyword. They are merged into a
//! type with `+` and cannot produce values on their own:
//!
//! ```
//! use wtypes::types::{default, integer};
//!
//! let nine = &integer() + &default(9);
//! assert_eq!(nine.instantiate(None).unwrap(), serde_json::json!(9));
//! ```

use std::borrow::Borrow;

use serde_json::{json, Value};

use crate::error::Result;
use crate::schema::Trait;

/// Encodings accepted by `contentEncoding`
pub const CONTENT_ENCODINGS: [&str; 5] = ["7bit", "8bit", "binary", "quoted-printable", "base64"];

pub fn boolean() -> Trait {
    Trait::builtin("Bool", json!({"type": "boolean"}))
}

pub fn null() -> Trait {
    Trait::builtin("Null", json!({"type": "null"}))
}

pub fn integer() -> Trait {
    Trait::builtin("Integer", json!({"type": "integer"}))
}

/// JSON `number`
pub fn float() -> Trait {
    Trait::builtin("Float", json!({"type": "number"}))
}

pub fn string() -> Trait {
    Trait::builtin("String", json!({"type": "string"}))
}

/// JSON `object`
pub fn dict() -> Trait {
    Trait::builtin("Dict", json!({"type": "object"}))
}

/// JSON `array`
pub fn list() -> Trait {
    Trait::builtin("List", json!({"type": "array"}))
}

/// There are no tuples in JSON; a tuple is an array, typed positionally with [`Trait::tuple_of`]
pub fn tuple() -> Trait {
    Trait::builtin("Tuple", json!({"type": "array"}))
}

/// An array without repeated items
pub fn unique() -> Trait {
    Trait::builtin("Unique", json!({"type": "array", "uniqueItems": true}))
}

/// The empty schema; everything is valid
pub fn any() -> Trait {
    Trait::builtin("Trait", json!({}))
}

/// A string-keyed object whose values are all of the given types
pub fn dict_of<I, T>(values: I) -> Result<Trait>
where
    I: IntoIterator<Item = T>,
    T: Borrow<Trait>,
{
    dict().of(values)
}

/// An array whose items are all of the given types
pub fn list_of<I, T>(items: I) -> Result<Trait>
where
    I: IntoIterator<Item = T>,
    T: Borrow<Trait>,
{
    list().of(items)
}

/// An array typed position by position
pub fn tuple_of<I, T>(items: I) -> Result<Trait>
where
    I: IntoIterator<Item = T>,
    T: Borrow<Trait>,
{
    tuple().tuple_of(items)
}

/// Only `value` is valid
pub fn constant(value: impl Into<Value>) -> Trait {
    let value: Value = value.into();
    Trait::builtin("Const", json!({ "const": value }))
}

/// Only the listed values are valid
pub fn enumeration<I, V>(values: I) -> Trait
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    Trait::builtin("Enum", json!({ "enum": values }))
}

/// One of [`CONTENT_ENCODINGS`]
pub fn content_encoding() -> Trait {
    enumeration(CONTENT_ENCODINGS).keyword_only()
}

pub fn title(title: &str) -> Trait {
    Trait::builtin("Title", json!({ "title": title })).keyword_only()
}

pub fn description(description: &str) -> Trait {
    Trait::builtin("Description", json!({ "description": description })).keyword_only()
}

pub fn default(value: impl Into<Value>) -> Trait {
    let value: Value = value.into();
    Trait::builtin("Default", json!({ "default": value })).keyword_only()
}

pub fn examples<I, V>(values: I) -> Trait
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    Trait::builtin("Examples", json!({ "examples": values })).keyword_only()
}

/// A single keyword, checked against the meta-schema
pub fn keyword(key: &str, value: impl Into<Value>) -> Result<Trait> {
    Ok(Trait::builtin("", json!({})).refine(key, value)?.keyword_only())
}

pub fn minimum(value: impl Into<Value>) -> Result<Trait> {
    keyword("minimum", value)
}

pub fn maximum(value: impl Into<Value>) -> Result<Trait> {
    keyword("maximum", value)
}

pub fn exclusive_minimum(value: impl Into<Value>) -> Result<Trait> {
    keyword("exclusiveMinimum", value)
}

pub fn exclusive_maximum(value: impl Into<Value>) -> Result<Trait> {
    keyword("exclusiveMaximum", value)
}

pub fn multiple_of(value: impl Into<Value>) -> Result<Trait> {
    keyword("multipleOf", value)
}

pub fn min_length(value: u64) -> Result<Trait> {
    keyword("minLength", value)
}

pub fn max_length(value: u64) -> Result<Trait> {
    keyword("maxLength", value)
}

pub fn pattern(pattern: &str) -> Result<Trait> {
    keyword("pattern", pattern)
}

pub fn format(format: &str) -> Result<Trait> {
    keyword("format", format)
}

pub fn min_items(value: u64) -> Result<Trait> {
    keyword("minItems", value)
}

pub fn max_items(value: u64) -> Result<Trait> {
    keyword("maxItems", value)
}

pub fn unique_items(unique: bool) -> Result<Trait> {
    keyword("uniqueItems", unique)
}

pub fn required<I, S>(keys: I) -> Result<Trait>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let keys: Vec<Value> = keys.into_iter().map(|k| Value::String(k.into())).collect();
    keyword("required", keys)
}

pub fn min_properties(value: u64) -> Result<Trait> {
    keyword("minProperties", value)
}

pub fn max_properties(value: u64) -> Result<Trait> {
    keyword("maxProperties", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TraitError;

    #[test]
    fn test_keyword_fragments() {
        assert_eq!(description("yo").to_value(), json!({"description": "yo"}));
        assert_eq!(title("holla").to_value(), json!({"title": "holla"}));
        assert_eq!(constant(10).to_value(), json!({"const": 10}));
        assert!(matches!(
            description("yo").instantiate(None),
            Err(TraitError::CannotInstantiate(_))
        ));
    }

    #[test]
    fn test_const_and_enum() {
        assert!(constant("thing").is_instance(&json!("thing")));
        assert!(!constant("thing").is_instance(&json!("jawn")));

        let pets = enumeration(["cat", "dog"]);
        assert_eq!(pets.instantiate(Some(json!("cat"))).unwrap(), json!("cat"));
        assert!(!pets.is_instance(&json!("turtle")));
    }

    #[test]
    fn test_keyword_checks_meta_schema() {
        assert!(min_length(2).is_ok());
        assert!(keyword("maxItems", -1).is_err());
        assert!(keyword("type", "integr").is_err());
    }

    #[test]
    fn test_string_length_bounds() {
        let short = &(&string() + &min_length(2).unwrap()) + &max_length(10).unwrap();
        assert!(short.is_instance(&json!("abc")));
        assert!(!short.is_instance(&json!("a")));
        assert!(!short.is_instance(&json!("a".repeat(100))));
    }

    #[test]
    fn test_dict_types() {
        assert!(dict().is_instance(&json!({})));
        assert!(!dict().is_instance(&json!([])));
        assert_eq!(dict().instantiate(None).unwrap(), json!({}));

        let numbers = dict_of([integer(), float()]).unwrap();
        assert!(!numbers.is_instance(&json!({"a": "b"})));
        assert!(dict_of([integer()]).unwrap().is_instance(&json!({"a": 1})));

        let with_a = dict().with_properties([("a", integer())]).unwrap();
        assert_eq!(
            with_a.to_value(),
            json!({"type": "object", "properties": {"a": {"type": "integer"}}})
        );
    }

    #[test]
    fn test_dict_defaults() {
        let defaulted = &dict() + &default(json!({"b": "foo"}));
        assert_eq!(defaulted.instantiate(None).unwrap(), json!({"b": "foo"}));
        assert_eq!(
            defaulted.instantiate(Some(json!({"a": "bar"}))).unwrap(),
            json!({"a": "bar"})
        );
    }

    #[test]
    fn test_list_types() {
        assert!(list().is_instance(&json!([])));
        assert!(!list().is_instance(&json!({})));

        let ints = list_of([integer()]).unwrap();
        assert!(ints.is_instance(&json!([1, 2, 3])));
        assert!(!ints.is_instance(&json!([1.1])));

        let mixed = list_of([integer(), string()]).unwrap();
        assert_eq!(
            mixed.to_value(),
            json!({"type": "array", "items": {"anyOf": [{"type": "integer"}, {"type": "string"}]}})
        );
        assert!(mixed.is_instance(&json!([1, "abc", 2])));
        assert!(!mixed.is_instance(&json!([1, {}])));
    }

    #[test]
    fn test_tuple_and_unique() {
        let pair = tuple_of([integer(), string()]).unwrap();
        assert_eq!(
            pair.to_value(),
            json!({"type": "array", "items": [{"type": "integer"}, {"type": "string"}]})
        );
        assert!(pair.is_instance(&json!([1, "1"])));
        assert!(!pair.is_instance(&json!([1, 1])));
        assert_eq!(tuple().to_value(), list().to_value());

        assert!(unique().is_instance(&json!([1, 2])));
        assert!(!unique().is_instance(&json!([1, 1])));
    }

    #[test]
    fn test_boolean_and_null() {
        assert_eq!(boolean().instantiate(None).unwrap(), json!(false));
        assert_eq!(boolean().instantiate(Some(json!(true))).unwrap(), json!(true));
        assert!((&boolean() + &default(true)).instantiate(None).unwrap().as_bool().unwrap());
        assert_eq!(null().instantiate(None).unwrap(), Value::Null);
    }

    #[test]
    fn test_content_encoding() {
        assert!(content_encoding().is_instance(&json!("base64")));
        assert!(!content_encoding().is_instance(&json!("rot13")));
    }
}
