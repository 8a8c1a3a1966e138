//! Declarative records
//!
//! A record is an object type described field by field. Fields without a
//! default are required; defaults live in the property schema so they are
//! filled in on instantiation.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use wtypes::formats::email;
//! use wtypes::record::{DataClass, RecordBuilder};
//! use wtypes::types::integer;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Account {
//!     a: i64,
//!     b: String,
//! }
//!
//! impl DataClass for Account {
//!     fn describe() -> wtypes::Result<wtypes::Trait> {
//!         RecordBuilder::new("Account")
//!             .field_default("a", integer(), 1)
//!             .field("b", email())
//!             .build()
//!     }
//! }
//!
//! let account = Account::build(serde_json::json!({"b": "x@example.com"})).unwrap();
//! assert_eq!(account.a, 1);
//! assert!(Account::build(serde_json::json!({"b": "nope"})).is_err());
//! ```

use std::borrow::Borrow;
use std::path::{Path, PathBuf};

use config_crate::{Config, Environment, File};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::backend::manager;
use crate::context::Context;
use crate::error::{Result, TraitError};
use crate::schema::Trait;

/// Builds an object trait from typed fields
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    name: String,
    properties: Map<String, Value>,
    required: Vec<String>,
    context: Context,
    closed: bool,
}

impl RecordBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Map::new(),
            required: Vec::new(),
            context: Context::default(),
            closed: false,
        }
    }

    /// Inherit the fields of an existing record type
    pub fn extend(mut self, parent: &Trait) -> Self {
        if let Some(properties) = parent.schema().get("properties").and_then(Value::as_object) {
            self.properties.extend(properties.clone());
        }
        if let Some(required) = parent.schema().get("required").and_then(Value::as_array) {
            for key in required.iter().filter_map(Value::as_str) {
                if !self.required.iter().any(|r| r == key) {
                    self.required.push(key.to_string());
                }
            }
        }
        self.context = self.context.merge(parent.context());
        self
    }

    /// A required field
    pub fn field<T: Borrow<Trait>>(mut self, name: impl Into<String>, ty: T) -> Self {
        let name = name.into();
        let ty = ty.borrow();
        self.context = self.context.merge(ty.context());
        self.properties.insert(name.clone(), ty.to_value());
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// An optional field filled with `default` when absent
    pub fn field_default<T: Borrow<Trait>>(mut self, name: impl Into<String>, ty: T, default: impl Into<Value>) -> Self {
        let name = name.into();
        let ty = ty.borrow();
        self.context = self.context.merge(ty.context());
        let mut property = ty.schema().clone();
        property.insert("default".to_string(), default.into());
        self.properties.insert(name.clone(), Value::Object(property));
        self.required.retain(|r| r != &name);
        self
    }

    /// Reject undeclared fields
    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = self.context.merge(&context);
        self
    }

    /// The record trait. Every field default must be valid for its own field type.
    pub fn build(self) -> Result<Trait> {
        for (field, property) in &self.properties {
            let Some(default) = property.get("default") else {
                continue;
            };
            if let Err(e) = manager().validate_object(default, property) {
                return Err(TraitError::InvalidSchema {
                    name: self.name.clone(),
                    reason: format!("default of field '{}' is invalid: {}", field, e),
                });
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(self.properties));
        if !self.required.is_empty() {
            schema.insert("required".to_string(), json!(self.required));
        }
        if self.closed {
            schema.insert("additionalProperties".to_string(), Value::Bool(false));
        }
        Ok(Trait::create(self.name, Value::Object(schema))?.with_context(self.context))
    }
}

/// Fill in property defaults missing from `value`
pub fn with_defaults(kind: &Trait, value: Value) -> Value {
    let mut data = match value {
        Value::Object(data) => data,
        Value::Null => Map::new(),
        other => return other,
    };
    for (key, default) in kind.property_defaults() {
        data.entry(key).or_insert(default);
    }
    Value::Object(data)
}

/// A serde type whose values are checked against a record trait
pub trait DataClass: Serialize + DeserializeOwned {
    /// The record trait for this type
    fn describe() -> Result<Trait>;

    /// Fill defaults, validate, then deserialize
    fn build(value: Value) -> Result<Self> {
        let kind = Self::describe()?;
        let value = with_defaults(&kind, value);
        kind.validate(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Validate the current field values
    fn check(&self) -> Result<()> {
        Self::describe()?.validate(&serde_json::to_value(self)?)
    }

    /// Set one field. Only that field is validated and `self` is unchanged on error.
    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        let kind = Self::describe()?;
        kind.validate_entry(name, &value)?;
        let mut current = serde_json::to_value(&*self)?;
        if let Value::Object(fields) = &mut current {
            fields.insert(name.to_string(), value);
        }
        *self = serde_json::from_value(current)?;
        Ok(())
    }

    /// The current field values as JSON
    fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A record that can be loaded from configuration files and the environment
pub trait Configurable: DataClass {
    /// Load from one file; the format follows the extension (toml, json, yaml, ...)
    fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "loading configurable");
        let config = Config::builder().add_source(File::from(path)).build()?;
        Self::build(config.try_deserialize::<Value>()?)
    }

    /// Layer optional files, then `PREFIX__FIELD` environment variables
    fn load(files: &[&str], env_prefix: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        for file in files {
            builder = builder.add_source(File::with_name(file).required(false));
        }
        if let Some(prefix) = env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            );
        }
        let value = builder.build()?.try_deserialize::<Value>()?;
        Self::build(value)
    }
}
