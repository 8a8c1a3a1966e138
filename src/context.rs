//! Semantic (RDF) typing
//!
//! A trait can carry a JSON-LD context mapping its property names to vocabulary
//! IRIs, and an RDF class for the values it describes. Typed properties get an
//! `xsd` datatype derived from their schema, so a validated object can be
//! emitted as JSON-LD without further annotation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::schema::Trait;

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const SCHEMA_ORG: &str = "https://schema.org/";

/// The class of anything without a more specific RDF type
pub const RDFS_RESOURCE: &str = "http://www.w3.org/2000/01/rdf-schema#Resource";

/// A JSON-LD context: term → IRI or term definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// `rdf`, `rdfs`, `xsd` and `schema` prefixes
    pub fn well_known() -> Self {
        Self::new()
            .term("rdf", RDF)
            .term("rdfs", RDFS)
            .term("xsd", XSD)
            .term("schema", SCHEMA_ORG)
    }

    /// Map a term to an IRI
    pub fn term(mut self, term: impl Into<String>, iri: impl Into<String>) -> Self {
        self.0.insert(term.into(), Value::String(iri.into()));
        self
    }

    /// Map a term to an IRI with a datatype
    pub fn typed_term(mut self, term: impl Into<String>, iri: impl Into<String>, datatype: impl Into<String>) -> Self {
        self.0.insert(
            term.into(),
            json!({ "@id": iri.into(), "@type": datatype.into() }),
        );
        self
    }

    /// Default vocabulary for terms without their own mapping
    pub fn vocab(mut self, iri: impl Into<String>) -> Self {
        self.0.insert("@vocab".to_string(), Value::String(iri.into()));
        self
    }

    /// A new context with `other`'s terms overriding ours
    pub fn merge(&self, other: &Context) -> Context {
        let mut merged = self.0.clone();
        merged.extend(other.0.clone());
        Context(merged)
    }

    pub fn get(&self, term: &str) -> Option<&Value> {
        self.0.get(term)
    }

    /// The IRI a term maps to, through either form of definition
    pub fn iri(&self, term: &str) -> Option<&str> {
        match self.0.get(term)? {
            Value::String(iri) => Some(iri),
            Value::Object(definition) => definition.get("@id").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Expand a compact IRI (`xsd:integer`) using this context's prefixes and the well-known ones
    pub fn expand(&self, compact: &str) -> Option<String> {
        let (prefix, suffix) = compact.split_once(':')?;
        if suffix.starts_with("//") {
            return Some(compact.to_string());
        }
        let base = match self.iri(prefix) {
            Some(base) => base.to_string(),
            None => Context::well_known().iri(prefix)?.to_string(),
        };
        Some(format!("{}{}", base, suffix))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Context(map)
    }
}

/// The `xsd` datatype for values of a schema, when it has a single scalar type
pub fn xsd_datatype(schema: &Value) -> Option<&'static str> {
    let format = schema.get("format").and_then(Value::as_str);
    match (schema.get("type").and_then(Value::as_str)?, format) {
        ("integer", _) => Some("xsd:integer"),
        ("number", _) => Some("xsd:double"),
        ("boolean", _) => Some("xsd:boolean"),
        ("string", Some("date-time")) => Some("xsd:dateTime"),
        ("string", Some("date")) => Some("xsd:date"),
        ("string", Some("time")) => Some("xsd:time"),
        ("string", Some("uri" | "iri")) => Some("@id"),
        ("string", _) => Some("xsd:string"),
        _ => None,
    }
}

impl Trait {
    /// Attach (merge) a JSON-LD context
    pub fn with_context(&self, context: Context) -> Trait {
        let mut annotated = self.clone();
        annotated.context = self.context.merge(&context);
        annotated
    }

    /// Set the RDF class of values of this type
    pub fn with_rdf_type(&self, iri: impl Into<String>) -> Trait {
        let mut annotated = self.clone();
        annotated.rdf_type = Some(iri.into());
        annotated
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The RDF class of values of this type, `rdfs:Resource` unless set
    pub fn rdf_type(&self) -> &str {
        self.rdf_type.as_deref().unwrap_or(RDFS_RESOURCE)
    }

    /// The explicit context plus datatype coercions for typed properties
    pub fn jsonld_context(&self) -> Context {
        let mut derived = Map::new();
        let mut uses_xsd = false;

        if let Some(properties) = self.schema.get("properties").and_then(Value::as_object) {
            for (term, property) in properties {
                let Some(datatype) = xsd_datatype(property) else {
                    continue;
                };
                uses_xsd |= datatype.starts_with("xsd:");
                let mut definition = Map::new();
                if let Some(iri) = self.context.iri(term) {
                    definition.insert("@id".to_string(), Value::String(iri.to_string()));
                }
                definition.insert("@type".to_string(), Value::String(datatype.to_string()));
                derived.insert(term.clone(), Value::Object(definition));
            }
        }

        let mut context = Context::new();
        if uses_xsd && self.context.get("xsd").is_none() {
            context = context.term("xsd", XSD);
        }
        // Plain IRIs of typed properties are already folded into their definitions.
        for (term, value) in self.context.iter() {
            if derived.contains_key(term) && value.is_string() {
                continue;
            }
            derived.insert(term.clone(), value.clone());
        }
        context.merge(&Context(derived))
    }
}
