//! Engine-resident datum types
//!
//! This module defines the representation of the values the engine owns.
//! Native code never touches these directly; it holds scope-owned
//! [`Value`](crate::Value) handles that resolve to a [`JsValue`].

use super::property::{Property, PropertyKey, PropertyMap, PropertySlot, PropertyAttributes};
use crate::callable::Callable;
use crate::error::ErrorKind;
use crate::gc::ArmedFinalizer;
use crate::promise::PromiseInner;
use crate::wrap::{NativeData, TypeTag, WrapSlot};
use num_bigint::BigInt;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Shared, mutable reference to an engine object
pub type ObjectRef = Rc<RefCell<Object>>;

/// A symbol: identity is its id, the description is informational only
#[derive(Debug)]
pub struct Symbol {
    pub(crate) id: u64,
    pub(crate) description: Option<Rc<str>>,
}

impl Symbol {
    /// The description the symbol was created with
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// An engine value
#[derive(Clone)]
pub enum JsValue {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// BigInt (arbitrary precision integer)
    BigInt(Rc<BigInt>),
    /// String
    String(Rc<str>),
    /// Symbol
    Symbol(Rc<Symbol>),
    /// Object (includes arrays, functions, errors, promises and externals)
    Object(ObjectRef),
}

/// Result of the `typeof`-style classification the bridge reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Symbol,
    Object,
    Function,
    External,
    BigInt,
}

impl ValueType {
    /// The string the script `typeof` operator yields (`null` reports "object")
    pub fn type_of(self) -> &'static str {
        match self {
            ValueType::Undefined => "undefined",
            ValueType::Null | ValueType::Object | ValueType::External => "object",
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Symbol => "symbol",
            ValueType::Function => "function",
            ValueType::BigInt => "bigint",
        }
    }
}

impl JsValue {
    /// Create a string value
    pub fn string(s: &str) -> JsValue {
        JsValue::String(Rc::from(s))
    }

    /// Check if value is undefined or null
    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    /// Borrow the object reference, if this is an object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            JsValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Check if this is a callable object
    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(obj) => obj.borrow().callable().is_some(),
            _ => false,
        }
    }

    /// Classify the value
    pub fn value_type(&self) -> ValueType {
        match self {
            JsValue::Undefined => ValueType::Undefined,
            JsValue::Null => ValueType::Null,
            JsValue::Boolean(_) => ValueType::Boolean,
            JsValue::Number(_) => ValueType::Number,
            JsValue::BigInt(_) => ValueType::BigInt,
            JsValue::String(_) => ValueType::String,
            JsValue::Symbol(_) => ValueType::Symbol,
            JsValue::Object(obj) => match obj.borrow().class {
                ObjectClass::Function(_) => ValueType::Function,
                ObjectClass::External(_) => ValueType::External,
                _ => ValueType::Object,
            },
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            // NaN compares unequal, +0 and -0 compare equal
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::BigInt(a), JsValue::BigInt(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Symbol(a), JsValue::Symbol(b)) => a.id == b.id,
            (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// SameValue (`Object.is`): like strict equality, but NaN equals NaN and
    /// +0 differs from -0
    pub fn same_value(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a.to_bits() == b.to_bits()
                }
            }
            _ => self.strict_equals(other),
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", crate::coerce::number_to_string(*n)),
            JsValue::BigInt(n) => write!(f, "{}n", n),
            JsValue::String(s) => write!(f, "{:?}", s),
            JsValue::Symbol(sym) => match sym.description() {
                Some(desc) => write!(f, "Symbol({})", desc),
                None => write!(f, "Symbol()"),
            },
            JsValue::Object(obj) => match obj.try_borrow() {
                Ok(obj) => write!(f, "[object {}]", obj.class_name()),
                Err(_) => write!(f, "[object <borrowed>]"),
            },
        }
    }
}

/// The internal slots that make an object more than a property bag
pub enum ObjectClass {
    /// Plain object
    Ordinary,
    /// Array exotic object; `length` lives here, not in the property table
    Array { length: u32, length_writable: bool },
    /// Function object
    Function(Callable),
    /// Error instance of the given kind
    Error(ErrorKind),
    /// Boxed primitive produced by ToObject
    Boxed(JsValue),
    /// Promise
    Promise(PromiseInner),
    /// Opaque native payload
    External(NativeData),
}

/// An engine object
pub struct Object {
    /// Internal slots
    pub(crate) class: ObjectClass,
    /// Own properties, insertion ordered
    pub(crate) properties: PropertyMap,
    /// Prototype link (a chain, never a cycle)
    pub(crate) prototype: Option<ObjectRef>,
    /// Whether new properties may be added
    pub(crate) extensible: bool,
    /// Native wrap slot
    pub(crate) wrap: Option<WrapSlot>,
    /// Finalizers attached with `add_finalizer`
    pub(crate) finalizers: Vec<ArmedFinalizer>,
    /// Type tag attached with `type_tag_object`
    pub(crate) type_tag: Option<TypeTag>,
}

impl Object {
    /// Create an object with the given class and prototype
    pub fn new(class: ObjectClass, prototype: Option<ObjectRef>) -> Self {
        Self {
            class,
            properties: PropertyMap::default(),
            prototype,
            extensible: true,
            wrap: None,
            finalizers: Vec::new(),
            type_tag: None,
        }
    }

    /// Allocate an object and return a shared reference to it
    pub fn alloc(class: ObjectClass, prototype: Option<ObjectRef>) -> ObjectRef {
        Rc::new(RefCell::new(Self::new(class, prototype)))
    }

    /// Name used by the default string conversion (`[object Name]`)
    pub fn class_name(&self) -> &'static str {
        match &self.class {
            ObjectClass::Ordinary | ObjectClass::Promise(_) | ObjectClass::External(_) => "Object",
            ObjectClass::Array { .. } => "Array",
            ObjectClass::Function(_) => "Function",
            ObjectClass::Error(_) => "Error",
            ObjectClass::Boxed(JsValue::Boolean(_)) => "Boolean",
            ObjectClass::Boxed(JsValue::Number(_)) => "Number",
            ObjectClass::Boxed(JsValue::String(_)) => "String",
            ObjectClass::Boxed(JsValue::Symbol(_)) => "Symbol",
            ObjectClass::Boxed(JsValue::BigInt(_)) => "BigInt",
            ObjectClass::Boxed(_) => "Object",
        }
    }

    /// The callable slot, if this is a function
    pub fn callable(&self) -> Option<&Callable> {
        match &self.class {
            ObjectClass::Function(callable) => Some(callable),
            _ => None,
        }
    }

    /// Array length, if this is an array
    pub fn array_length(&self) -> Option<u32> {
        match self.class {
            ObjectClass::Array { length, .. } => Some(length),
            _ => None,
        }
    }

    /// Look up an own property, synthesizing the array `length` slot
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<Property> {
        if let ObjectClass::Array { length, length_writable } = self.class {
            if key.is_length() {
                let mut attributes = PropertyAttributes::empty();
                attributes.set(PropertyAttributes::WRITABLE, length_writable);
                return Some(Property::data(JsValue::Number(length as f64), attributes));
            }
        }
        self.properties.get(key).cloned()
    }

    /// Check for an own property without cloning it
    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        (self.array_length().is_some() && key.is_length()) || self.properties.contains_key(key)
    }

    /// Insert or replace an own property as-is. Array `length` and index
    /// bookkeeping is the caller's job.
    pub fn insert_property(&mut self, key: PropertyKey, property: Property) {
        if let (ObjectClass::Array { length, .. }, Some(index)) = (&mut self.class, key.array_index()) {
            if index >= *length {
                *length = index + 1;
            }
        }
        self.properties.insert(key, property);
    }

    /// Remove an own property, preserving the order of the rest
    pub fn remove_property(&mut self, key: &PropertyKey) -> Option<Property> {
        self.properties.shift_remove(key)
    }

    /// Own keys in canonical order: integer indices ascending, then string
    /// keys in insertion order, then symbols in insertion order
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<(u32, &PropertyKey)> = Vec::new();
        let mut strings = Vec::new();
        let mut symbols = Vec::new();
        for key in self.properties.keys() {
            match key.array_index() {
                Some(index) => indices.push((index, key)),
                None if key.is_symbol() => symbols.push(key.clone()),
                None => strings.push(key.clone()),
            }
        }
        indices.sort_unstable_by_key(|(index, _)| *index);
        let mut keys: Vec<PropertyKey> = indices.into_iter().map(|(_, key)| key.clone()).collect();
        if self.array_length().is_some() {
            keys.push(PropertyKey::length());
        }
        keys.extend(strings);
        keys.extend(symbols);
        keys
    }

    /// Make every own property non-configurable (and, when `freeze`,
    /// every data property read-only) and stop further extension
    pub fn seal(&mut self, freeze: bool) {
        self.extensible = false;
        for property in self.properties.values_mut() {
            property.attributes.remove(PropertyAttributes::CONFIGURABLE);
            if freeze {
                if let PropertySlot::Data(_) = property.slot {
                    property.attributes.remove(PropertyAttributes::WRITABLE);
                }
            }
        }
        if freeze {
            if let ObjectClass::Array { length_writable, .. } = &mut self.class {
                *length_writable = false;
            }
        }
    }
}

/// Walk a prototype chain starting at (and including) `start`
pub fn prototype_chain(start: &ObjectRef) -> impl Iterator<Item = ObjectRef> {
    let mut next = Some(start.clone());
    std::iter::from_fn(move || {
        let current = next.take()?;
        next = current.borrow().prototype.clone();
        Some(current)
    })
}
