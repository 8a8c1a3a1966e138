//! The base [`Trait`] type
//!
//! A trait is a named JSON-Schema fragment. Traits are composed rather than
//! subclassed: `+` merges two schemas, `&`, `-` and `|` build `allOf`, `anyOf`
//! and `oneOf` combinations and unary `-` negates.
//!
//! Every trait's schema is valid against the Draft 7 meta-schema. Entry points
//! that accept raw JSON ([`Trait::create`], [`Trait::derive`], the keyword
//! builders) check the proposed schema before returning, so a broken type
//! can never be constructed.

use std::borrow::Borrow;
use std::fmt;
use std::ops::{Add, BitAnd, BitOr, Neg, Sub};

use serde_json::{json, Map, Value};

use crate::backend::{manager, HookManager};
use crate::context::Context;
use crate::error::{Result, TraitError};

/// A named, validated JSON-Schema fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Trait {
    pub(crate) name: String,
    pub(crate) schema: Map<String, Value>,
    pub(crate) context: Context,
    pub(crate) rdf_type: Option<String>,
    pub(crate) no_title: bool,
    pub(crate) no_init: bool,
}

impl Trait {
    /// Create a trait from a raw schema, checking it against the meta-schema
    pub fn create(name: impl Into<String>, schema: Value) -> Result<Self> {
        Self::create_with(manager(), name, schema)
    }

    /// Create a trait, checking its schema through a specific hook manager
    pub fn create_with(hooks: &HookManager, name: impl Into<String>, schema: Value) -> Result<Self> {
        let name = name.into();
        let schema = match schema {
            Value::Object(map) => map,
            other => {
                return Err(TraitError::InvalidSchema {
                    name,
                    reason: format!("expected a schema object, got {}", other),
                })
            }
        };
        let created = Self::unchecked(name, schema);
        created.check_with(hooks)?;
        Ok(created)
    }

    /// A new trait whose schema is this one updated with `extra`
    pub fn derive(&self, name: impl Into<String>, extra: Value) -> Result<Self> {
        let extension = Self::create(name, extra)?;
        let mut derived = self.clone();
        derived.name = extension.name;
        derived.schema.extend(extension.schema);
        Ok(derived)
    }

    pub(crate) fn unchecked(name: impl Into<String>, schema: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            schema,
            context: Context::default(),
            rdf_type: None,
            no_title: false,
            no_init: false,
        }
    }

    /// Build a trait from a literal schema that is known to be valid
    pub(crate) fn builtin(name: &str, schema: Value) -> Self {
        match schema {
            Value::Object(map) => Self::unchecked(name, map),
            _ => Self::unchecked(name, Map::new()),
        }
    }

    /// Mark as a keyword fragment: contributes no title and cannot produce values
    pub(crate) fn keyword_only(mut self) -> Self {
        self.no_title = true;
        self.no_init = true;
        self
    }

    /// Validate this trait's schema against the meta-schema
    pub fn check(&self) -> Result<()> {
        self.check_with(manager())
    }

    pub fn check_with(&self, hooks: &HookManager) -> Result<()> {
        hooks
            .validate_type(&self.to_value())
            .map_err(|e| self.rename(e))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Map<String, Value> {
        &self.schema
    }

    /// The schema as a JSON value
    pub fn to_value(&self) -> Value {
        Value::Object(self.schema.clone())
    }

    /// The title this trait contributes when merged: empty for keyword fragments
    pub fn title(&self) -> String {
        if self.no_title {
            return String::new();
        }
        self.schema
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.name.clone())
    }

    /// Whether [`Trait::instantiate`] can produce values
    pub fn is_instantiable(&self) -> bool {
        !self.no_init
    }

    /// Merge two traits. Keys of `other` win; names concatenate.
    pub fn merge(&self, other: &Trait) -> Trait {
        let mut schema = self.schema.clone();
        schema.extend(other.schema.clone());
        Trait {
            name: format!("{}{}", self.title(), other.title()),
            schema,
            context: self.context.merge(&other.context),
            rdf_type: other.rdf_type.clone().or_else(|| self.rdf_type.clone()),
            no_title: self.no_title && other.no_title,
            no_init: self.no_init && other.no_init,
        }
    }

    /// `{"not": self}`
    pub fn negate(&self) -> Trait {
        Trait::builtin("Not", json!({ "not": self.to_value() }))
    }

    /// Validate an instance through the process-wide hook manager
    pub fn validate(&self, instance: &Value) -> Result<()> {
        self.validate_with(manager(), instance)
    }

    /// Validate an instance through a specific hook manager
    pub fn validate_with(&self, hooks: &HookManager, instance: &Value) -> Result<()> {
        hooks
            .validate_object(instance, &self.to_value())
            .map_err(|e| self.rename(e))
    }

    /// Validation as a predicate
    pub fn is_instance(&self, instance: &Value) -> bool {
        self.validate(instance).is_ok()
    }

    /// Validate a single entry of an object without requiring the rest of it.
    ///
    /// A declared property is checked against its own schema; anything else is
    /// checked as `{key: value}` against this schema with `required` cleared.
    pub fn validate_entry(&self, key: &str, value: &Value) -> Result<()> {
        let declared = self
            .schema
            .get("properties")
            .and_then(Value::as_object)
            .and_then(|properties| properties.get(key));

        let result = match declared {
            Some(property) => manager().validate_object(value, property),
            None => {
                let mut entry = Map::new();
                entry.insert(key.to_string(), value.clone());
                self.validate_partial(&Value::Object(entry))
            }
        };
        result.map_err(|e| self.rename(e))
    }

    /// Validate an object against this schema with `required` cleared
    pub fn validate_partial(&self, instance: &Value) -> Result<()> {
        let mut partial = self.schema.clone();
        partial.insert("required".to_string(), Value::Array(Vec::new()));
        manager()
            .validate_object(instance, &Value::Object(partial))
            .map_err(|e| self.rename(e))
    }

    /// Produce a validated value of this type.
    ///
    /// Without a value the schema `default` is used, then the defaults of the
    /// declared properties, then the zero value of the schema `type`.
    pub fn instantiate(&self, value: Option<Value>) -> Result<Value> {
        if self.no_init {
            return Err(TraitError::CannotInstantiate(self.name.clone()));
        }
        let value = match value {
            Some(value) => value,
            None => self.resolve_default(),
        };
        self.validate(&value)?;
        Ok(value)
    }

    /// The `default` of every declared property that has one
    pub fn property_defaults(&self) -> Map<String, Value> {
        self.schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .iter()
                    .filter_map(|(key, property)| property.get("default").map(|d| (key.clone(), d.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn resolve_default(&self) -> Value {
        if let Some(default) = self.schema.get("default") {
            return default.clone();
        }
        let defaults = self.property_defaults();
        if !defaults.is_empty() {
            return Value::Object(defaults);
        }
        let ty = match self.schema.get("type") {
            Some(Value::String(ty)) => Some(ty.as_str()),
            Some(Value::Array(types)) => types.first().and_then(Value::as_str),
            _ => None,
        };
        match ty {
            Some("boolean") => Value::Bool(false),
            Some("integer") => json!(0),
            Some("number") => json!(0.0),
            Some("string") => Value::String(String::new()),
            Some("array") => Value::Array(Vec::new()),
            Some("object") => Value::Object(Map::new()),
            _ => Value::Null,
        }
    }

    fn rename(&self, err: TraitError) -> TraitError {
        match err {
            TraitError::Validation { violations, .. } => TraitError::Validation {
                name: self.display_name(),
                violations,
            },
            TraitError::InvalidSchema { reason, .. } => TraitError::InvalidSchema {
                name: self.display_name(),
                reason,
            },
            other => other,
        }
    }

    fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.title()
        } else {
            self.name.clone()
        }
    }

    /// Add a single keyword, checking the fragment against the meta-schema
    pub fn refine(&self, key: &str, value: impl Into<Value>) -> Result<Trait> {
        let mut fragment = Map::new();
        fragment.insert(key.to_string(), value.into());
        let fragment = Trait::create(self.name.clone(), Value::Object(fragment))?;
        let mut refined = self.clone();
        refined.schema.extend(fragment.schema);
        Ok(refined)
    }

    // Numeric constraints

    pub fn minimum(&self, value: impl Into<Value>) -> Result<Trait> {
        self.refine("minimum", value)
    }

    pub fn maximum(&self, value: impl Into<Value>) -> Result<Trait> {
        self.refine("maximum", value)
    }

    pub fn exclusive_minimum(&self, value: impl Into<Value>) -> Result<Trait> {
        self.refine("exclusiveMinimum", value)
    }

    pub fn exclusive_maximum(&self, value: impl Into<Value>) -> Result<Trait> {
        self.refine("exclusiveMaximum", value)
    }

    pub fn multiple_of(&self, value: impl Into<Value>) -> Result<Trait> {
        self.refine("multipleOf", value)
    }

    // String constraints

    pub fn min_length(&self, value: u64) -> Result<Trait> {
        self.refine("minLength", value)
    }

    pub fn max_length(&self, value: u64) -> Result<Trait> {
        self.refine("maxLength", value)
    }

    /// A regular expression the string must match
    pub fn pattern(&self, pattern: &str) -> Result<Trait> {
        self.refine("pattern", pattern)
    }

    pub fn format(&self, format: &str) -> Result<Trait> {
        self.refine("format", format)
    }

    pub fn content_media_type(&self, media_type: &str) -> Result<Trait> {
        self.refine("contentMediaType", media_type)
    }

    // Array constraints

    pub fn min_items(&self, value: u64) -> Result<Trait> {
        self.refine("minItems", value)
    }

    pub fn max_items(&self, value: u64) -> Result<Trait> {
        self.refine("maxItems", value)
    }

    pub fn unique_items(&self, unique: bool) -> Result<Trait> {
        self.refine("uniqueItems", unique)
    }

    pub fn contains<T: Borrow<Trait>>(&self, item: T) -> Result<Trait> {
        self.refine("contains", item.borrow().to_value())
    }

    pub fn additional_items<T: Borrow<Trait>>(&self, item: T) -> Result<Trait> {
        self.refine("additionalItems", item.borrow().to_value())
    }

    // Object constraints

    /// Append keys to `required`, keeping those already listed
    pub fn required<I, S>(&self, keys: I) -> Result<Trait>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut required: Vec<Value> = self
            .schema
            .get("required")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for key in keys {
            let key = Value::String(key.into());
            if !required.contains(&key) {
                required.push(key);
            }
        }
        self.refine("required", required)
    }

    pub fn min_properties(&self, value: u64) -> Result<Trait> {
        self.refine("minProperties", value)
    }

    pub fn max_properties(&self, value: u64) -> Result<Trait> {
        self.refine("maxProperties", value)
    }

    pub fn property_names<T: Borrow<Trait>>(&self, names: T) -> Result<Trait> {
        self.refine("propertyNames", names.borrow().to_value())
    }

    pub fn additional_properties<T: Borrow<Trait>>(&self, values: T) -> Result<Trait> {
        self.refine("additionalProperties", values.borrow().to_value())
    }

    /// Forbid (`false`) or allow (`true`) undeclared properties
    pub fn closed(&self, closed: bool) -> Result<Trait> {
        self.refine("additionalProperties", !closed)
    }

    pub fn pattern_properties<I, K, T>(&self, patterns: I) -> Result<Trait>
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Borrow<Trait>,
    {
        let mut merged = self
            .schema
            .get("patternProperties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for (pattern, ty) in patterns {
            merged.insert(pattern.into(), ty.borrow().to_value());
        }
        self.refine("patternProperties", merged)
    }

    /// Property dependencies, either lists of keys or schemas
    pub fn dependencies(&self, dependencies: Value) -> Result<Trait> {
        self.refine("dependencies", dependencies)
    }

    /// Merge into `properties`, keeping those already declared
    pub fn with_properties<I, K, T>(&self, properties: I) -> Result<Trait>
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Borrow<Trait>,
    {
        let mut merged = self
            .schema
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for (key, ty) in properties {
            merged.insert(key.into(), ty.borrow().to_value());
        }
        self.refine("properties", merged)
    }

    /// Parameterize a container.
    ///
    /// On an object type the given traits constrain every property value
    /// (`additionalProperties: {anyOf: [...]}`); on an array type they
    /// constrain every item, combined with `anyOf` when more than one is given.
    pub fn of<I, T>(&self, items: I) -> Result<Trait>
    where
        I: IntoIterator<Item = T>,
        T: Borrow<Trait>,
    {
        let mut schemas: Vec<Value> = items.into_iter().map(|t| t.borrow().to_value()).collect();
        match self.schema.get("type").and_then(Value::as_str) {
            Some("object") => self.refine("additionalProperties", json!({ "anyOf": schemas })),
            Some("array") if schemas.len() == 1 => self.refine("items", schemas.remove(0)),
            Some("array") => self.refine("items", json!({ "anyOf": schemas })),
            _ => Err(TraitError::InvalidSchema {
                name: self.display_name(),
                reason: "only object and array types take item types".to_string(),
            }),
        }
    }

    /// Positional item types (a typed tuple)
    pub fn tuple_of<I, T>(&self, items: I) -> Result<Trait>
    where
        I: IntoIterator<Item = T>,
        T: Borrow<Trait>,
    {
        let schemas: Vec<Value> = items.into_iter().map(|t| t.borrow().to_value()).collect();
        self.refine("items", schemas)
    }

    // Annotations

    pub fn with_title(&self, title: &str) -> Result<Trait> {
        self.refine("title", title)
    }

    pub fn with_description(&self, description: &str) -> Result<Trait> {
        self.refine("description", description)
    }

    pub fn with_default(&self, default: impl Into<Value>) -> Result<Trait> {
        self.refine("default", default)
    }

    pub fn with_examples<I, V>(&self, examples: I) -> Result<Trait>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.refine("examples", examples.into_iter().map(Into::into).collect::<Vec<Value>>())
    }

    /// `if`/`then`/`else` conditional; `otherwise` is optional
    pub fn if_then_else(&self, condition: &Trait, then: &Trait, otherwise: Option<&Trait>) -> Result<Trait> {
        let refined = self.refine("if", condition.to_value())?.refine("then", then.to_value())?;
        match otherwise {
            Some(otherwise) => refined.refine("else", otherwise.to_value()),
            None => Ok(refined),
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

fn combine<I, T>(name: &str, keyword: &str, traits: I) -> Trait
where
    I: IntoIterator<Item = T>,
    T: Borrow<Trait>,
{
    let mut context = Context::default();
    let schemas: Vec<Value> = traits
        .into_iter()
        .map(|t| {
            let t = t.borrow();
            context = context.merge(&t.context);
            t.to_value()
        })
        .collect();
    // Combinations validate; they produce values only once merged into a concrete type.
    let mut combined = Trait::builtin(name, json!({ keyword: schemas }));
    combined.context = context;
    combined.no_init = true;
    combined
}

/// Valid against every trait
pub fn all_of<I, T>(traits: I) -> Trait
where
    I: IntoIterator<Item = T>,
    T: Borrow<Trait>,
{
    combine("AllOf", "allOf", traits)
}

/// Valid against at least one trait
pub fn any_of<I, T>(traits: I) -> Trait
where
    I: IntoIterator<Item = T>,
    T: Borrow<Trait>,
{
    combine("AnyOf", "anyOf", traits)
}

/// Valid against exactly one trait
pub fn one_of<I, T>(traits: I) -> Trait
where
    I: IntoIterator<Item = T>,
    T: Borrow<Trait>,
{
    combine("OneOf", "oneOf", traits)
}

impl Add<&Trait> for &Trait {
    type Output = Trait;

    fn add(self, rhs: &Trait) -> Trait {
        self.merge(rhs)
    }
}

impl Add for Trait {
    type Output = Trait;

    fn add(self, rhs: Trait) -> Trait {
        self.merge(&rhs)
    }
}

impl BitAnd<&Trait> for &Trait {
    type Output = Trait;

    fn bitand(self, rhs: &Trait) -> Trait {
        all_of([self, rhs])
    }
}

impl BitAnd for Trait {
    type Output = Trait;

    fn bitand(self, rhs: Trait) -> Trait {
        all_of([self, rhs])
    }
}

impl Sub<&Trait> for &Trait {
    type Output = Trait;

    fn sub(self, rhs: &Trait) -> Trait {
        any_of([self, rhs])
    }
}

impl Sub for Trait {
    type Output = Trait;

    fn sub(self, rhs: Trait) -> Trait {
        any_of([self, rhs])
    }
}

impl BitOr<&Trait> for &Trait {
    type Output = Trait;

    fn bitor(self, rhs: &Trait) -> Trait {
        one_of([self, rhs])
    }
}

impl BitOr for Trait {
    type Output = Trait;

    fn bitor(self, rhs: Trait) -> Trait {
        one_of([self, rhs])
    }
}

impl Neg for &Trait {
    type Output = Trait;

    fn neg(self) -> Trait {
        self.negate()
    }
}

impl Neg for Trait {
    type Output = Trait;

    fn neg(self) -> Trait {
        self.negate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{description, float, integer, string, title};

    #[test]
    fn test_create_rejects_invalid_schema() {
        assert!(Trait::create("Ok", json!({"type": "integer"})).is_ok());
        let err = Trait::create("Bad", json!({"type": "integr"})).unwrap_err();
        assert!(matches!(err, TraitError::InvalidSchema { ref name, .. } if name == "Bad"));
        assert!(Trait::create("NotAnObject", json!(3)).is_err());
    }

    #[test]
    fn test_create_with_follows_hook_settings() {
        use crate::backend::JsonSchemaBackend;
        use crate::config::ValidationConfig;
        use std::sync::Arc;

        let lenient = HookManager::new();
        lenient.register(Arc::new(JsonSchemaBackend::new(ValidationConfig {
            meta_validate: false,
            ..ValidationConfig::default()
        })));
        let schema = json!({"minProperties": -1});
        assert!(Trait::create("X", schema.clone()).is_err());
        assert!(Trait::create_with(&lenient, "X", schema.clone()).is_ok());
        assert!(Trait::create_with(&HookManager::with_default(), "X", schema).is_err());
    }

    #[test]
    fn test_merge_names_and_flags() {
        let merged = &integer() + &title("Age");
        assert_eq!(merged.name(), "Integer");
        assert_eq!(merged.to_value(), json!({"type": "integer", "title": "Age"}));
        assert!(merged.is_instantiable());

        let fragments = &title("holla") + &description("yo");
        assert!(!fragments.is_instantiable());
        assert_eq!(fragments.title(), "");
    }

    #[test]
    fn test_combinations_cannot_instantiate() {
        let either = any_of([integer(), string()]);
        assert!(matches!(either.instantiate(None), Err(TraitError::CannotInstantiate(_))));
        assert!(matches!(
            (&integer() | &float()).instantiate(Some(json!(1.5))),
            Err(TraitError::CannotInstantiate(_))
        ));
        assert!(either.is_instance(&json!("abc")));

        let non_negative = &integer() + &all_of([integer().minimum(0).unwrap()]);
        assert_eq!(non_negative.instantiate(None).unwrap(), json!(0));
    }

    #[test]
    fn test_bounded_integer() {
        let bounded = integer().exclusive_minimum(10).unwrap().exclusive_maximum(100).unwrap();
        assert_eq!(
            bounded.to_value(),
            json!({"type": "integer", "exclusiveMinimum": 10, "exclusiveMaximum": 100})
        );
        assert!(bounded.is_instance(&json!(12)));
        assert!(!bounded.is_instance(&json!(0)));
        assert!(!bounded.is_instance(&json!(12.5)));
    }

    #[test]
    fn test_multiple_of_must_be_positive() {
        assert!(integer().multiple_of(3).unwrap().is_instance(&json!(9)));
        assert!(integer().multiple_of(0).is_err());
    }

    #[test]
    fn test_pattern_must_be_a_regex() {
        let abc = string().pattern("^a").unwrap();
        assert!(abc.is_instance(&json!("abc")));
        assert!(!abc.is_instance(&json!("bcd")));
        assert!(string().pattern("(unclosed").is_err());
    }

    #[test]
    fn test_combinators() {
        let positive = float().exclusive_minimum(0).unwrap();
        let threes = integer().multiple_of(3).unwrap();

        let both = &positive & &threes;
        assert!(both.is_instance(&json!(9)));
        assert!(!both.is_instance(&json!(-9)));

        let exactly_one = &positive | &threes;
        assert!(exactly_one.is_instance(&json!(-9)));
        assert!(!exactly_one.is_instance(&json!(9)));

        let either = integer() - string();
        assert!(either.is_instance(&json!(10)));
        assert!(either.is_instance(&json!("abc")));
        assert!(!either.is_instance(&json!([])));

        let not_string = -string();
        assert!(not_string.is_instance(&json!(100)));
        assert!(!not_string.is_instance(&json!("abc")));
    }

    #[test]
    fn test_instantiate_defaults() {
        assert_eq!(integer().with_default(9).unwrap().instantiate(None).unwrap(), json!(9));
        assert_eq!(integer().instantiate(None).unwrap(), json!(0));
        assert_eq!(string().instantiate(None).unwrap(), json!(""));
        assert!(integer().instantiate(Some(json!(1.5))).is_err());
        assert!(matches!(
            title("x").instantiate(None),
            Err(TraitError::CannotInstantiate(_))
        ));
    }

    #[test]
    fn test_validation_error_names_the_trait() {
        let err = integer().validate(&json!("nope")).unwrap_err();
        match err {
            TraitError::Validation { name, violations } => {
                assert_eq!(name, "Integer");
                assert_eq!(violations.len(), 1);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_required_appends() {
        let dict = crate::types::dict().required(["a"]).unwrap().required(["b", "a"]).unwrap();
        assert_eq!(dict.schema()["required"], json!(["a", "b"]));
        assert!(dict.is_instance(&json!({"a": 1, "b": 2})));
        assert!(!dict.is_instance(&json!({"a": 1})));
    }
}
