//! Typed containers
//!
//! [`TypedMap`] and [`TypedList`] hold JSON data bound to a [`Trait`] and check
//! every mutation before applying it. A rejected mutation leaves the container
//! unchanged.
//!
//! The scope of the check differs. A list validates the whole candidate list,
//! so it always satisfies its schema. A map validates construction and removals
//! as a whole, but `insert` and `extend` only check the entries being written
//! (with `required` cleared). Whole-object keywords such as `maxProperties` or
//! `dependencies` can therefore be broken by inserts; use
//! [`Trait::validate`] on [`TypedMap::to_value`] to check the full object.

use serde_json::{Map, Value};
use tracing::warn;

use crate::context::Context;
use crate::error::{Result, TraitError, Violations};
use crate::schema::Trait;

/// A JSON object that stays valid against its trait
#[derive(Debug, Clone, PartialEq)]
pub struct TypedMap {
    kind: Trait,
    data: Map<String, Value>,
}

impl TypedMap {
    /// Instantiate `kind` (resolving defaults when `value` is `None`) and bind the result
    pub fn new(kind: Trait, value: Option<Value>) -> Result<Self> {
        match kind.instantiate(value)? {
            Value::Object(data) => Ok(Self { kind, data }),
            other => Err(TraitError::invalid(
                kind.name(),
                Violations::single(format!("{} is not an object", other)),
            )),
        }
    }

    pub fn kind(&self) -> &Trait {
        &self.kind
    }

    /// Set one entry; only that entry is validated
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Result<Option<Value>> {
        let key = key.into();
        self.kind.validate_entry(&key, &value)?;
        Ok(self.data.insert(key, value))
    }

    /// Set several entries; the update is validated as a partial object
    pub fn extend<I, K>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let update: Map<String, Value> = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.kind.validate_partial(&Value::Object(update.clone()))?;
        self.data.extend(update);
        Ok(())
    }

    /// Remove an entry unless the remaining object would be invalid
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>> {
        let mut candidate = self.data.clone();
        let removed = candidate.remove(key);
        if removed.is_some() {
            let candidate = Value::Object(candidate);
            if let Err(e) = self.kind.validate(&candidate) {
                warn!(key, "refusing removal that would invalidate {}", self.kind);
                return Err(e);
            }
            if let Value::Object(candidate) = candidate {
                self.data = candidate;
            }
        }
        Ok(removed)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }

    /// The data as a JSON-LD node: `@context`, `@type`, then the entries
    pub fn to_jsonld(&self) -> Value {
        let mut node = Map::new();
        let context: Context = self.kind.jsonld_context();
        if !context.is_empty() {
            node.insert("@context".to_string(), context.to_value());
        }
        node.insert("@type".to_string(), Value::String(self.kind.rdf_type().to_string()));
        node.extend(self.data.clone());
        Value::Object(node)
    }
}

/// A JSON array that stays valid against its trait
#[derive(Debug, Clone, PartialEq)]
pub struct TypedList {
    kind: Trait,
    items: Vec<Value>,
}

impl TypedList {
    pub fn new(kind: Trait, value: Option<Value>) -> Result<Self> {
        match kind.instantiate(value)? {
            Value::Array(items) => Ok(Self { kind, items }),
            other => Err(TraitError::invalid(
                kind.name(),
                Violations::single(format!("{} is not an array", other)),
            )),
        }
    }

    pub fn kind(&self) -> &Trait {
        &self.kind
    }

    pub fn push(&mut self, item: Value) -> Result<()> {
        self.apply(|items| items.push(item))
    }

    /// Insert at `index`, clamped to the end of the list
    pub fn insert(&mut self, index: usize, item: Value) -> Result<()> {
        let index = index.min(self.items.len());
        self.apply(|items| items.insert(index, item))
    }

    /// Replace the item at `index`, returning the previous one
    pub fn set(&mut self, index: usize, item: Value) -> Result<Value> {
        self.check_index(index)?;
        self.apply(|items| std::mem::replace(&mut items[index], item))
    }

    pub fn extend<I>(&mut self, new_items: I) -> Result<()>
    where
        I: IntoIterator<Item = Value>,
    {
        self.apply(|items| items.extend(new_items))
    }

    /// Remove the last item unless the shorter list would be invalid
    pub fn pop(&mut self) -> Result<Option<Value>> {
        self.apply(|items| items.pop())
    }

    pub fn remove(&mut self, index: usize) -> Result<Value> {
        self.check_index(index)?;
        self.apply(|items| items.remove(index))
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.items.len() {
            return Err(TraitError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    pub fn into_value(self) -> Value {
        Value::Array(self.items)
    }

    // Mutations run on a copy; the copy replaces the items only if it validates.
    fn apply<R>(&mut self, mutate: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R> {
        let mut candidate = self.items.clone();
        let outcome = mutate(&mut candidate);
        let candidate = Value::Array(candidate);
        self.kind.validate(&candidate)?;
        if let Value::Array(items) = candidate {
            self.items = items;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{default, dict, integer, list_of, string, tuple_of, unique};
    use serde_json::json;

    fn point() -> Trait {
        dict()
            .with_properties([("x", integer()), ("y", integer())])
            .unwrap()
            .required(["x"])
            .unwrap()
    }

    #[test]
    fn test_map_validates_on_construction() {
        assert!(TypedMap::new(point(), Some(json!({"x": 1}))).is_ok());
        assert!(TypedMap::new(point(), Some(json!({"y": 1}))).is_err());
        assert!(TypedMap::new(point(), Some(json!([1]))).is_err());
    }

    #[test]
    fn test_map_defaults() {
        let with_default = &dict() + &default(json!({"b": "foo"}));
        let map = TypedMap::new(with_default, None).unwrap();
        assert_eq!(map.get("b"), Some(&json!("foo")));
    }

    #[test]
    fn test_map_insert_checks_only_the_key() {
        let mut map = TypedMap::new(point(), Some(json!({"x": 1}))).unwrap();
        assert_eq!(map.insert("y", json!(2)).unwrap(), None);
        assert!(map.insert("y", json!("two")).is_err());
        assert_eq!(map.get("y"), Some(&json!(2)));

        // Undeclared keys are checked against the rest of the schema.
        let strict = point().closed(true).unwrap();
        let mut map = TypedMap::new(strict, Some(json!({"x": 1}))).unwrap();
        assert!(map.insert("z", json!(0)).is_err());
        assert!(!map.contains_key("z"));
    }

    #[test]
    fn test_map_insert_is_entry_scoped() {
        let small = dict().max_properties(1).unwrap();
        let mut map = TypedMap::new(small.clone(), Some(json!({"a": 1}))).unwrap();
        map.insert("b", json!(2)).unwrap();
        assert!(small.validate(&map.to_value()).is_err());
        // Removal checks the whole object again.
        assert_eq!(map.remove("b").unwrap(), Some(json!(2)));
        assert!(small.validate(&map.to_value()).is_ok());
    }

    #[test]
    fn test_map_extend() {
        let mut map = TypedMap::new(point(), Some(json!({"x": 1}))).unwrap();
        map.extend([("y", json!(5))]).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.extend([("x", json!(1.5))]).is_err());
        assert_eq!(map.get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_map_remove_keeps_required() {
        let mut map = TypedMap::new(point(), Some(json!({"x": 1, "y": 2}))).unwrap();
        assert_eq!(map.remove("y").unwrap(), Some(json!(2)));
        assert!(map.remove("x").is_err());
        assert_eq!(map.get("x"), Some(&json!(1)));
        assert_eq!(map.remove("missing").unwrap(), None);
    }

    #[test]
    fn test_list_item_types() {
        let mut ints = TypedList::new(list_of([integer()]).unwrap(), Some(json!([1, 2, 3]))).unwrap();
        ints.push(json!(4)).unwrap();
        assert!(ints.push(json!("five")).is_err());
        assert!(ints.insert(0, json!(1.5)).is_err());
        assert!(ints.set(1, json!(null)).is_err());
        assert_eq!(ints.set(1, json!(20)).unwrap(), json!(2));
        assert!(ints.extend([json!(5), json!("six")]).is_err());
        assert_eq!(ints.clone().into_value(), json!([1, 20, 3, 4]));
    }

    #[test]
    fn test_list_index_out_of_range() {
        let mut ints = TypedList::new(list_of([integer()]).unwrap(), Some(json!([1]))).unwrap();
        assert!(matches!(
            ints.set(3, json!(4)),
            Err(TraitError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert!(matches!(ints.remove(1), Err(TraitError::IndexOutOfRange { .. })));
        assert_eq!(ints.remove(0).unwrap(), json!(1));
        assert!(ints.is_empty());
    }

    #[test]
    fn test_tuple_positions() {
        let pair = tuple_of([integer(), string()]).unwrap();
        let mut list = TypedList::new(pair, Some(json!([1]))).unwrap();
        assert!(list.push(json!(2)).is_err());
        list.push(json!("two")).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_unique_list() {
        let mut letters = TypedList::new(unique(), Some(json!(["a", "b"]))).unwrap();
        assert!(letters.push(json!("a")).is_err());
        letters.push(json!("c")).unwrap();
    }

    #[test]
    fn test_pop_restores_on_failure() {
        let at_least_two = list_of([integer()]).unwrap().min_items(2).unwrap();
        let mut list = TypedList::new(at_least_two, Some(json!([1, 2, 3]))).unwrap();
        assert_eq!(list.pop().unwrap(), Some(json!(3)));
        assert!(list.pop().is_err());
        assert_eq!(list.len(), 2);
        assert!(list.remove(0).is_err());
    }

    #[test]
    fn test_to_jsonld() {
        let person = dict()
            .with_properties([("name", string())])
            .unwrap()
            .with_context(Context::new().term("name", "https://schema.org/name"))
            .with_rdf_type("https://schema.org/Person");
        let map = TypedMap::new(person, Some(json!({"name": "Ada"}))).unwrap();
        let node = map.to_jsonld();
        assert_eq!(node["@type"], json!("https://schema.org/Person"));
        assert_eq!(node["name"], json!("Ada"));
        assert_eq!(node["@context"]["name"]["@id"], json!("https://schema.org/name"));
    }
}
