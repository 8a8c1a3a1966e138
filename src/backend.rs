//! Validation hooks
//!
//! Every schema check in the crate goes through a [`HookManager`]. A manager holds
//! an ordered list of [`ValidationBackend`]s and exposes two hooks:
//!
//! - `validate_type`: is a proposed schema valid against the Draft 7 meta-schema?
//! - `validate_object`: does an instance satisfy a schema?
//!
//! Backends are consulted most-recently-registered first and the first backend
//! that answers (returns `Some`) decides. A backend that returns `None` passes the
//! call on to the next one, which lets a backend specialize a subset of schemas.
//!
//! The process-wide manager returned by [`manager`] is seeded with
//! [`JsonSchemaBackend`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use tracing::{debug, trace};

use crate::checksum::Checksum;
use crate::config::ValidationConfig;
use crate::error::{Result, TraitError, Violation, Violations};
use crate::formats;

const DRAFT7_META_SCHEMA: &str = include_str!("meta/draft-07.json");

/// A pluggable validation implementation
pub trait ValidationBackend: Send + Sync {
    /// Name used for registration and logging
    fn name(&self) -> &str;

    /// Check a schema against the meta-schema. `None` defers to the next backend.
    fn validate_type(&self, _schema: &Value) -> Option<Result<()>> {
        None
    }

    /// Check an instance against a schema. `None` defers to the next backend.
    fn validate_object(&self, instance: &Value, schema: &Value) -> Option<Result<()>>;
}

/// Ordered registry of validation backends with first-result semantics
pub struct HookManager {
    backends: RwLock<Vec<Arc<dyn ValidationBackend>>>,
}

impl Default for HookManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HookManager {
    /// An empty manager; every hook fails with [`TraitError::NoBackend`] until a backend is registered
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(Vec::new()),
        }
    }

    /// A manager holding the default [`JsonSchemaBackend`]
    pub fn with_default() -> Self {
        let manager = Self::new();
        manager.register(Arc::new(JsonSchemaBackend::default()));
        manager
    }

    /// Register a backend. It takes precedence over everything registered before it.
    pub fn register(&self, backend: Arc<dyn ValidationBackend>) {
        debug!(backend = backend.name(), "registering validation backend");
        let mut backends = self.backends.write().unwrap_or_else(|e| e.into_inner());
        backends.push(backend);
    }

    /// Remove every backend registered under `name`. Returns whether any was removed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut backends = self.backends.write().unwrap_or_else(|e| e.into_inner());
        let before = backends.len();
        backends.retain(|b| b.name() != name);
        before != backends.len()
    }

    /// Names of registered backends, in call order
    pub fn backends(&self) -> Vec<String> {
        self.snapshot().iter().map(|b| b.name().to_string()).collect()
    }

    pub fn validate_type(&self, schema: &Value) -> Result<()> {
        for backend in self.snapshot() {
            if let Some(result) = backend.validate_type(schema) {
                trace!(backend = backend.name(), "validate_type answered");
                return result;
            }
        }
        Err(TraitError::NoBackend("validate_type"))
    }

    pub fn validate_object(&self, instance: &Value, schema: &Value) -> Result<()> {
        for backend in self.snapshot() {
            if let Some(result) = backend.validate_object(instance, schema) {
                trace!(backend = backend.name(), "validate_object answered");
                return result;
            }
        }
        Err(TraitError::NoBackend("validate_object"))
    }

    // Backends may call back into the manager, so the lock is never held across a hook.
    fn snapshot(&self) -> Vec<Arc<dyn ValidationBackend>> {
        let backends = self.backends.read().unwrap_or_else(|e| e.into_inner());
        backends.iter().rev().cloned().collect()
    }
}

/// The process-wide hook manager
pub fn manager() -> &'static HookManager {
    static MANAGER: OnceLock<HookManager> = OnceLock::new();
    MANAGER.get_or_init(HookManager::with_default)
}

/// Draft 7 validation backed by the `jsonschema` crate
pub struct JsonSchemaBackend {
    settings: ValidationConfig,
    meta: OnceLock<std::result::Result<Arc<JSONSchema>, String>>,
    cache: Mutex<HashMap<Checksum, Arc<JSONSchema>>>,
}

impl Default for JsonSchemaBackend {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl JsonSchemaBackend {
    pub fn new(settings: ValidationConfig) -> Self {
        Self {
            settings,
            meta: OnceLock::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of compiled schemas held in the cache
    pub fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Drop every compiled schema
    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn compile(schema: &Value) -> std::result::Result<JSONSchema, String> {
        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .with_format("color", formats::is_color)
            .compile(schema)
            .map_err(|e| e.to_string())
    }

    fn meta_schema(&self) -> Result<Arc<JSONSchema>> {
        let compiled = self.meta.get_or_init(|| {
            debug!("compiling draft-07 meta-schema");
            let meta: Value = serde_json::from_str(DRAFT7_META_SCHEMA).map_err(|e| e.to_string())?;
            Self::compile(&meta).map(Arc::new)
        });
        compiled.clone().map_err(|reason| TraitError::InvalidSchema {
            name: "draft-07 meta-schema".to_string(),
            reason,
        })
    }

    fn compiled(&self, schema: &Value) -> Result<Arc<JSONSchema>> {
        if !self.settings.cache_compiled {
            return Self::compile_checked(schema).map(Arc::new);
        }

        let key = Checksum::from_json(schema);
        if let Some(hit) = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return Ok(hit.clone());
        }

        debug!(checksum = %key, "compiling schema");
        let compiled = Arc::new(Self::compile_checked(schema)?);
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if cache.len() >= self.settings.cache_limit {
            debug!(limit = self.settings.cache_limit, "compiled schema cache full, clearing");
            cache.clear();
        }
        cache.insert(key, compiled.clone());
        Ok(compiled)
    }

    fn compile_checked(schema: &Value) -> Result<JSONSchema> {
        Self::compile(schema).map_err(|reason| TraitError::InvalidSchema {
            name: schema_name(schema),
            reason,
        })
    }
}

impl ValidationBackend for JsonSchemaBackend {
    fn name(&self) -> &str {
        "jsonschema"
    }

    fn validate_type(&self, schema: &Value) -> Option<Result<()>> {
        if !self.settings.meta_validate {
            return Some(Ok(()));
        }
        let result = self.meta_schema().and_then(|meta| {
            collect(&meta, schema).map_err(|violations| TraitError::InvalidSchema {
                name: schema_name(schema),
                reason: violations.to_string(),
            })
        });
        Some(result)
    }

    fn validate_object(&self, instance: &Value, schema: &Value) -> Option<Result<()>> {
        let result = self.compiled(schema).and_then(|compiled| {
            collect(&compiled, instance).map_err(|violations| TraitError::invalid(schema_name(schema), violations))
        });
        Some(result)
    }
}

fn collect(compiled: &JSONSchema, instance: &Value) -> std::result::Result<(), Violations> {
    match compiled.validate(instance) {
        Ok(()) => Ok(()),
        Err(errors) => Err(Violations(
            errors
                .map(|e| Violation {
                    path: e.instance_path.to_string(),
                    message: e.to_string(),
                })
                .collect(),
        )),
    }
}

fn schema_name(schema: &Value) -> String {
    schema
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("schema")
        .to_string()
}
