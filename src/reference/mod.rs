//! References
//!
//! A reference outlives handle scopes. While its count is positive it keeps
//! its value alive; at count 0 it is weak and only observes the object,
//! reporting `None` once the object has been reclaimed. Primitive values
//! are never reclaimed, so a weak reference to one keeps resolving.

use crate::error::{Error, Result};
use crate::runtime::{Env, JsValue, Object, ObjectRef};
use crate::scope::Value;
use rustc_hash::FxHashMap as HashMap;
use std::cell::RefCell;
use std::rc::Weak;
use tracing::trace;

/// Handle to an entry in the environment's reference table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference(u64);

enum Target {
    Strong(JsValue),
    Weak(Weak<RefCell<Object>>),
}

struct Entry {
    count: u32,
    target: Target,
}

impl Entry {
    fn value(&self) -> Option<JsValue> {
        match &self.target {
            Target::Strong(value) => Some(value.clone()),
            Target::Weak(weak) => weak.upgrade().map(JsValue::Object),
        }
    }

    /// Re-point the entry to match its count
    fn retarget(&mut self) {
        let value = self.value();
        self.target = match (self.count, value) {
            (0, Some(JsValue::Object(obj))) => Target::Weak(std::rc::Rc::downgrade(&obj)),
            (_, Some(value)) => Target::Strong(value),
            // collected: stays weak and empty
            (_, None) => return,
        };
    }
}

#[derive(Default)]
pub(crate) struct ReferenceTable {
    entries: HashMap<u64, Entry>,
    next_id: u64,
}

impl ReferenceTable {
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Objects kept alive by a positive count
    pub fn strong_objects(&self) -> impl Iterator<Item = &ObjectRef> {
        self.entries.values().filter_map(|entry| match &entry.target {
            Target::Strong(JsValue::Object(obj)) => Some(obj),
            _ => None,
        })
    }

    fn get_mut(&mut self, reference: Reference) -> Result<&mut Entry> {
        self.entries
            .get_mut(&reference.0)
            .ok_or_else(|| Error::invalid_argument("unknown reference"))
    }
}

impl Env {
    /// Create a reference with the given initial count
    pub fn create_reference(&mut self, value: Value, initial_count: u32) -> Result<Reference> {
        let value = self.datum(value)?;
        let table = &mut self.references;
        let id = table.next_id;
        table.next_id += 1;
        let mut entry = Entry {
            count: initial_count,
            target: Target::Strong(value),
        };
        entry.retarget();
        table.entries.insert(id, entry);
        trace!(reference = id, count = initial_count, "created reference");
        Ok(Reference(id))
    }

    /// Increment the count, returning the new count
    pub fn reference_ref(&mut self, reference: Reference) -> Result<u32> {
        let entry = self.references.get_mut(reference)?;
        entry.count = entry.count.checked_add(1).ok_or(Error::EngineLimitExceeded {
            what: "reference count",
            limit: u32::MAX as u64,
        })?;
        if entry.count == 1 {
            entry.retarget();
        }
        Ok(entry.count)
    }

    /// Decrement the count, returning the new count. At 0 the reference
    /// turns weak.
    pub fn reference_unref(&mut self, reference: Reference) -> Result<u32> {
        let entry = self.references.get_mut(reference)?;
        if entry.count == 0 {
            return Err(Error::invalid_argument("reference count is already 0"));
        }
        entry.count -= 1;
        if entry.count == 0 {
            entry.retarget();
        }
        Ok(entry.count)
    }

    /// The referenced value, or `None` if a weakly referenced object has
    /// been reclaimed
    pub fn get_reference_value(&mut self, reference: Reference) -> Result<Option<Value>> {
        let value = self.references.get_mut(reference)?.value();
        Ok(value.map(|value| self.handle(value)))
    }

    pub fn delete_reference(&mut self, reference: Reference) -> Result<()> {
        self.references
            .entries
            .remove(&reference.0)
            .map(|_| ())
            .ok_or_else(|| Error::invalid_argument("unknown reference"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_reference_survives_scope() {
        let mut env = Env::new();
        let reference = env
            .with_scope(|env| {
                let obj = env.object();
                let v = env.int32(9);
                env.set_named_property(obj, "n", v)?;
                env.create_reference(obj, 1)
            })
            .unwrap();
        let obj = env.get_reference_value(reference).unwrap().unwrap();
        let n = env.get_named_property(obj, "n").unwrap();
        assert_eq!(env.as_int32(n).unwrap(), 9);
    }

    #[test]
    fn test_weak_reference_clears_after_collection() {
        let mut env = Env::new();
        let reference = env
            .with_scope(|env| {
                let obj = env.object();
                let reference = env.create_reference(obj, 0)?;
                assert!(env.get_reference_value(reference)?.is_some());
                Ok(reference)
            })
            .unwrap();
        assert_eq!(env.get_reference_value(reference).unwrap(), None);
    }

    #[test]
    fn test_unref_to_zero_releases() {
        let mut env = Env::new();
        let reference = env
            .with_scope(|env| {
                let obj = env.object();
                env.create_reference(obj, 1)
            })
            .unwrap();
        assert_eq!(env.reference_ref(reference).unwrap(), 2);
        assert_eq!(env.reference_unref(reference).unwrap(), 1);
        assert!(env.get_reference_value(reference).unwrap().is_some());
        assert_eq!(env.reference_unref(reference).unwrap(), 0);
        assert_eq!(env.get_reference_value(reference).unwrap(), None);
        assert!(env.reference_unref(reference).is_err());
    }

    #[test]
    fn test_weak_primitive_keeps_resolving() {
        let mut env = Env::new();
        let v = env.string_utf8("kept").unwrap();
        let reference = env.create_reference(v, 0).unwrap();
        let back = env.get_reference_value(reference).unwrap().unwrap();
        assert_eq!(env.as_string(back).unwrap(), "kept");
    }

    #[test]
    fn test_delete_reference() {
        let mut env = Env::new();
        let obj = env.object();
        let reference = env.create_reference(obj, 1).unwrap();
        env.delete_reference(reference).unwrap();
        assert!(env.delete_reference(reference).is_err());
        assert!(env.get_reference_value(reference).is_err());
    }
}
