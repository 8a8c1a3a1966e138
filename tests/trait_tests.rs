//! Integration tests for trait composition, validation and typed containers

use std::sync::Arc;

use serde_json::{json, Value};
use wtypes::formats::{color, email, uri};
use wtypes::types::{self, dict, float, integer, list_of, string};
use wtypes::{HookManager, JsonSchemaBackend, Trait, TraitError, TypedList, TypedMap, ValidationBackend};

fn fixture(name: &str) -> Value {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn person() -> Trait {
    Trait::create("Person", fixture("person.schema.json")).unwrap()
}

// =============================================================================
// Schema creation
// =============================================================================

#[test]
fn test_create_from_file() {
    let person = person();
    assert_eq!(person.title(), "Person");
    assert!(person.is_instance(&json!({"name": "Ada", "age": 36})));
    assert!(!person.is_instance(&json!({"age": 36})));
    assert!(!person.is_instance(&json!({"name": "Ada", "email": "not an address"})));
}

#[test]
fn test_broken_schema_is_rejected() {
    match Trait::create("Broken", fixture("broken.schema.json")) {
        Err(TraitError::InvalidSchema { name, .. }) => assert_eq!(name, "Broken"),
        other => panic!("Expected InvalidSchema, got {:?}", other),
    }
}

#[test]
fn test_derive_extends_schema() {
    let adult = person().derive("Adult", json!({"properties": {"age": {"type": "integer", "minimum": 18}}}));
    let adult = adult.unwrap();
    assert_eq!(adult.name(), "Adult");
    // `properties` is replaced wholesale, `required` is inherited.
    assert!(adult.is_instance(&json!({"name": "Ada", "age": 18})));
    assert!(!adult.is_instance(&json!({"name": "Ada", "age": 17})));
    assert!(!adult.is_instance(&json!({"age": 40})));
}

// =============================================================================
// Algebra
// =============================================================================

#[test]
fn test_merge_names_and_keywords() {
    let bounded = &integer() + &types::minimum(0).unwrap();
    assert_eq!(bounded.name(), "Integer");
    assert_eq!(bounded.to_value(), json!({"type": "integer", "minimum": 0}));

    let named = &string() + &email();
    assert_eq!(named.name(), "StringEmail");
}

#[test]
fn test_operators() {
    let number = &integer() - &float();
    assert!(number.is_instance(&json!(1)));
    assert!(number.is_instance(&json!(1.5)));

    // 1 is both an integer and a number: oneOf rejects it.
    let exactly_one = &integer() | &float();
    assert!(!exactly_one.is_instance(&json!(1)));
    assert!(exactly_one.is_instance(&json!(1.5)));

    let short_email = &email() & &string().max_length(12).unwrap();
    assert!(short_email.is_instance(&json!("a@b.co")));
    assert!(!short_email.is_instance(&json!("someone@example.org")));

    let not_string = -&string();
    assert!(not_string.is_instance(&json!(3)));
    assert!(!not_string.is_instance(&json!("3")));
}

#[test]
fn test_if_then_else() {
    let kind = dict()
        .with_properties([("kind", string()), ("value", types::any())])
        .unwrap()
        .if_then_else(
            &Trait::create("", json!({"properties": {"kind": {"const": "color"}}})).unwrap(),
            &Trait::create("", json!({"properties": {"value": {"type": "string", "format": "color"}}})).unwrap(),
            None,
        )
        .unwrap();
    assert!(kind.is_instance(&json!({"kind": "color", "value": "#fff"})));
    assert!(!kind.is_instance(&json!({"kind": "color", "value": "sky"})));
    assert!(kind.is_instance(&json!({"kind": "other", "value": "sky"})));
}

#[test]
fn test_formats() {
    assert!(color().is_instance(&json!("teal")));
    assert!(!color().is_instance(&json!("#12345")));
    assert!(uri().is_instance(&json!("https://example.org/")));
    assert!(!uri().is_instance(&json!("not a uri")));
}

// =============================================================================
// Instantiation and containers
// =============================================================================

#[test]
fn test_instantiate() {
    assert_eq!(integer().instantiate(None).unwrap(), json!(0));
    assert_eq!(string().instantiate(None).unwrap(), json!(""));
    // Property defaults alone do not satisfy `required`.
    assert!(person().instantiate(None).is_err());
    assert!(matches!(
        types::default(1).instantiate(None),
        Err(TraitError::CannotInstantiate(_))
    ));
}

#[test]
fn test_typed_map_lifecycle() {
    let mut ada = TypedMap::new(person(), Some(json!({"name": "Ada"}))).unwrap();
    ada.insert("age", json!(36)).unwrap();
    assert!(ada.insert("age", json!(-1)).is_err());
    assert!(ada.insert("tags", json!(["math", "math"])).is_err());
    ada.extend([("email", json!("ada@example.org"))]).unwrap();
    assert!(ada.remove("name").is_err());
    assert_eq!(
        ada.into_value(),
        json!({"name": "Ada", "age": 36, "email": "ada@example.org"})
    );
}

#[test]
fn test_typed_list_lifecycle() {
    let names = list_of([string().min_length(1).unwrap()]).unwrap().max_items(2).unwrap();
    let mut list = TypedList::new(names, None).unwrap();
    assert!(list.is_empty());
    list.push(json!("a")).unwrap();
    assert!(list.push(json!("")).is_err());
    list.push(json!("b")).unwrap();
    assert!(list.push(json!("c")).is_err());
    assert_eq!(list.len(), 2);
}

// =============================================================================
// Hooks
// =============================================================================

struct NoNegatives;

impl ValidationBackend for NoNegatives {
    fn name(&self) -> &str {
        "no-negatives"
    }

    fn validate_object(&self, instance: &Value, _schema: &Value) -> Option<wtypes::Result<()>> {
        match instance.as_i64() {
            Some(n) if n < 0 => Some(Err(TraitError::CannotInstantiate("negative".to_string()))),
            Some(_) => Some(Ok(())),
            None => None,
        }
    }
}

#[test]
fn test_custom_backend_runs_first() {
    let hooks = HookManager::new();
    hooks.register(Arc::new(JsonSchemaBackend::default()));
    hooks.register(Arc::new(NoNegatives));

    // Integers are answered by the custom backend, even when the schema disagrees.
    assert!(string().validate_with(&hooks, &json!(3)).is_ok());
    assert!(integer().validate_with(&hooks, &json!(-3)).is_err());
    // Everything else falls through to jsonschema.
    assert!(string().validate_with(&hooks, &json!("x")).is_ok());
    assert!(string().validate_with(&hooks, &json!(true)).is_err());

    assert!(hooks.unregister("no-negatives"));
    assert!(string().validate_with(&hooks, &json!(3)).is_err());
}
