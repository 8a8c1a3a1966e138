//! wtypes
//!
//! Extended types for JSON data, backed by JSON Schema (Draft 7).
//!
//! ## Features
//!
//! - **Composable traits**: builtin types refined with keyword constraints and
//!   combined with `+` (merge), `&` (allOf), `-` (anyOf), `|` (oneOf) and unary `-` (not)
//! - **Meta-validation**: every trait's schema is checked against the Draft 7 meta-schema
//! - **Typed containers**: maps and lists that re-validate on every mutation
//! - **Records**: declarative field typing for serde structs, loadable from config files
//! - **Evented maps**: observers and links between keys
//! - **Semantic typing**: JSON-LD contexts and RDF classes on traits
//! - **Pluggable validation**: backends registered with a hook manager
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use wtypes::prelude::*;
//! use wtypes::types::{dict, integer, string};
//!
//! let positive = integer().exclusive_minimum(0).unwrap();
//! assert!(positive.is_instance(&json!(3)));
//! assert!(!positive.is_instance(&json!(0)));
//!
//! let id = &integer() | &string();
//! assert!(id.is_instance(&json!("abc")));
//!
//! let point = dict()
//!     .with_properties([("x", integer()), ("y", integer())])
//!     .unwrap()
//!     .required(["x", "y"])
//!     .unwrap();
//! let mut map = TypedMap::new(point, Some(json!({"x": 1, "y": 2}))).unwrap();
//! assert!(map.insert("x", json!("one")).is_err());
//! ```

pub mod backend;
pub mod checksum;
pub mod config;
pub mod context;
pub mod error;
pub mod evented;
pub mod formats;
pub mod instance;
pub mod record;
pub mod schema;
pub mod types;

pub use backend::{manager, HookManager, JsonSchemaBackend, ValidationBackend};
pub use checksum::Checksum;
pub use config::WtypesConfig;
pub use context::Context;
pub use error::{Result, TraitError, Violation, Violations};
pub use evented::{Change, EventedMap};
pub use formats::StringFormat;
pub use instance::{TypedList, TypedMap};
pub use record::{Configurable, DataClass, RecordBuilder};
pub use schema::{all_of, any_of, one_of, Trait};

/// The types most code needs
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::error::{Result, TraitError};
    pub use crate::evented::EventedMap;
    pub use crate::instance::{TypedList, TypedMap};
    pub use crate::record::{Configurable, DataClass, RecordBuilder};
    pub use crate::schema::{all_of, any_of, one_of, Trait};
}
