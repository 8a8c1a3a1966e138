//! Evented maps: the observable pattern over typed data
//!
//! An [`EventedMap`] is a shared handle to a [`TypedMap`]. Observers registered
//! with [`EventedMap::observe`] are called with a [`Change`] whenever a key takes
//! a new value, and links created with [`EventedMap::dlink`] / [`EventedMap::link`]
//! copy values into other maps.
//!
//! Changes made while a [`Hold`] guard is alive are queued and delivered once,
//! when the outermost guard is released. Observers and links never run while
//! the map's lock is held, so they are free to write back into any map.
//!
//! ```
//! use wtypes::evented::EventedMap;
//! use wtypes::types::dict;
//! use serde_json::json;
//!
//! let e = EventedMap::new(dict(), None).unwrap();
//! let f = EventedMap::new(dict(), None).unwrap();
//! e.link("a", &f, "b").unwrap();
//!
//! e.insert("a", json!(1)).unwrap();
//! assert_eq!(f.get("b"), Some(json!(1)));
//!
//! f.insert("b", json!(2)).unwrap();
//! assert_eq!(e.get("a"), Some(json!(2)));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{Result, TraitError};
use crate::instance::TypedMap;
use crate::schema::Trait;

/// A key taking a new value
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub name: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

type Observer = Arc<dyn Fn(&Change) + Send + Sync>;
type Transform = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

struct Link {
    target: Weak<Mutex<Inner>>,
    key: String,
    transform: Option<Transform>,
}

struct Inner {
    map: TypedMap,
    observers: HashMap<String, Vec<Observer>>,
    links: HashMap<String, Vec<Link>>,
    depth: usize,
    flushing: bool,
    pending: Vec<(String, Option<Value>)>,
}

impl Inner {
    // The first recorded prior value of a key wins until it is delivered.
    fn record(&mut self, key: String, old: Option<Value>) {
        if !self.pending.iter().any(|(pending, _)| *pending == key) {
            self.pending.push((key, old));
        }
    }
}

/// Shared, observable, typed map
#[derive(Clone)]
pub struct EventedMap {
    inner: Arc<Mutex<Inner>>,
}

impl fmt::Debug for EventedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventedMap").field(&self.to_value()).finish()
    }
}

impl EventedMap {
    pub fn new(kind: Trait, value: Option<Value>) -> Result<Self> {
        Ok(Self::from_map(TypedMap::new(kind, value)?))
    }

    pub fn from_map(map: TypedMap) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                map,
                observers: HashMap::new(),
                links: HashMap::new(),
                depth: 0,
                flushing: false,
                pending: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().map.get(key).cloned()
    }

    pub fn to_value(&self) -> Value {
        self.lock().map.to_value()
    }

    /// A snapshot of the underlying typed map
    pub fn snapshot(&self) -> TypedMap {
        self.lock().map.clone()
    }

    /// Whether both handles refer to the same map
    pub fn same(&self, other: &EventedMap) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Call `callback` whenever `key` changes
    pub fn observe<F>(&self, key: impl Into<String>, callback: F) -> &Self
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        self.lock()
            .observers
            .entry(key.into())
            .or_default()
            .push(Arc::new(callback));
        self
    }

    /// Copy changes of `source` into `other[target]`
    pub fn dlink(&self, source: &str, other: &EventedMap, target: &str) -> Result<&Self> {
        self.add_link(source, other, target, None)
    }

    /// Copy `transform(value)` of changes of `source` into `other[target]`
    pub fn dlink_with<F>(&self, source: &str, other: &EventedMap, target: &str, transform: F) -> Result<&Self>
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.add_link(source, other, target, Some(Arc::new(transform)))
    }

    /// Keep `self[source]` and `other[target]` equal in both directions
    pub fn link(&self, source: &str, other: &EventedMap, target: &str) -> Result<&Self> {
        self.dlink(source, other, target)?;
        other.dlink(target, self, source)?;
        Ok(self)
    }

    fn add_link(&self, source: &str, other: &EventedMap, target: &str, transform: Option<Transform>) -> Result<&Self> {
        if self.same(other) && source == target {
            return Err(TraitError::RecursiveLink {
                key: source.to_string(),
            });
        }
        let mut inner = self.lock();
        let links = inner.links.entry(source.to_string()).or_default();
        // Re-linking the same pair replaces the transform.
        links.retain(|link| !(link.key == target && link.target.ptr_eq(&Arc::downgrade(&other.inner))));
        links.push(Link {
            target: Arc::downgrade(&other.inner),
            key: target.to_string(),
            transform,
        });
        Ok(self)
    }

    /// Set a key, notifying observers and links if the value changed
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        {
            let mut inner = self.lock();
            let prior = inner.map.insert(key.clone(), value.clone())?;
            if prior.as_ref() != Some(&value) {
                inner.record(key, prior);
            }
        }
        self.flush()
    }

    /// Set several keys; each changed key is delivered once
    pub fn extend<I, K>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let entries: Vec<(String, Value)> = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        {
            let mut inner = self.lock();
            let prior: Vec<(String, Option<Value>)> = entries
                .iter()
                .map(|(key, _)| (key.clone(), inner.map.get(key).cloned()))
                .collect();
            inner.map.extend(entries.iter().cloned())?;
            for (key, old) in prior {
                if inner.map.get(&key) != old.as_ref() {
                    inner.record(key, old);
                }
            }
        }
        self.flush()
    }

    /// Remove a key; observers see the change with `new: None`
    pub fn remove(&self, key: &str) -> Result<Option<Value>> {
        let removed = {
            let mut inner = self.lock();
            let removed = inner.map.remove(key)?;
            if removed.is_some() {
                inner.record(key.to_string(), removed.clone());
            }
            removed
        };
        self.flush()?;
        Ok(removed)
    }

    /// Defer notifications until the returned guard (and any outer guard) is dropped
    pub fn hold(&self) -> Hold {
        self.lock().depth += 1;
        Hold { map: self.clone() }
    }

    /// Run `body` with notifications deferred, then deliver them
    pub fn batch<F>(&self, body: F) -> Result<()>
    where
        F: FnOnce(&EventedMap) -> Result<()>,
    {
        self.lock().depth += 1;
        let outcome = body(self);
        self.lock().depth -= 1;
        let delivered = self.flush();
        outcome.and(delivered)
    }

    fn flush(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            if inner.depth > 0 || inner.flushing {
                return Ok(());
            }
            inner.flushing = true;
        }
        let delivered = self.deliver();
        self.lock().flushing = false;
        delivered
    }

    // Every pending change is delivered even when a link fails; the first failure is returned.
    fn deliver(&self) -> Result<()> {
        let mut first_error = None;
        loop {
            let (change, observers, links) = {
                let mut inner = self.lock();
                if inner.pending.is_empty() {
                    return first_error.map_or(Ok(()), Err);
                }
                let (name, old) = inner.pending.remove(0);
                let new = inner.map.get(&name).cloned();
                let observers = inner.observers.get(&name).cloned().unwrap_or_default();
                let links: Vec<(Weak<Mutex<Inner>>, String, Option<Transform>)> = inner
                    .links
                    .get(&name)
                    .map(|links| {
                        links
                            .iter()
                            .map(|l| (l.target.clone(), l.key.clone(), l.transform.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                (Change { name, old, new }, observers, links)
            };

            trace!(key = %change.name, observers = observers.len(), links = links.len(), "delivering change");
            for observer in &observers {
                observer(&change);
            }

            let Some(new) = &change.new else {
                continue;
            };
            for (target, key, transform) in links {
                let Some(inner) = target.upgrade() else {
                    continue;
                };
                let other = EventedMap { inner };
                let value = match &transform {
                    Some(transform) => transform(new),
                    None => new.clone(),
                };
                if other.get(&key).as_ref() == Some(&value) {
                    continue;
                }
                if let Err(e) = other.insert(key.clone(), value) {
                    debug!(key = %change.name, target = %key, error = %e, "linked map refused change");
                    first_error.get_or_insert(e);
                }
            }
        }
    }
}

/// Guard returned by [`EventedMap::hold`]
pub struct Hold {
    map: EventedMap,
}

impl Drop for Hold {
    fn drop(&mut self) {
        self.map.lock().depth -= 1;
        if let Err(e) = self.map.flush() {
            warn!(error = %e, "deferred change could not be propagated");
        }
    }
}
