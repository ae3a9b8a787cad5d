//! Property model
//!
//! Get/set/has/delete/define over an object's own-property table and its
//! prototype chain. `get` and `has` walk the chain; `has_own_property` does
//! not. Enumeration follows the engine's canonical order: integer indices
//! ascending, then string keys in insertion order, then symbols.

use crate::callable::{Callback, CallbackInfo};
use crate::error::{messages, Error, ErrorKind, ExpectedType, Result};
use crate::runtime::value::prototype_chain;
use crate::runtime::{
    Env, JsValue, ObjectClass, ObjectRef, Property, PropertyAttributes, PropertyKey, PropertySlot,
};
use crate::scope::Value;
use crate::wrap::NativeData;
use bitflags::bitflags;
use rustc_hash::FxHashSet as HashSet;
use std::rc::Rc;

/// Key of a property being defined
#[derive(Debug, Clone)]
pub enum PropertyName {
    /// A UTF-8 name
    Name(String),
    /// A string or symbol value
    Key(Value),
}

impl From<&str> for PropertyName {
    fn from(name: &str) -> Self {
        PropertyName::Name(name.to_string())
    }
}

impl From<String> for PropertyName {
    fn from(name: String) -> Self {
        PropertyName::Name(name)
    }
}

impl From<Value> for PropertyName {
    fn from(key: Value) -> Self {
        PropertyName::Key(key)
    }
}

/// Description of a property for [`Env::define_properties`] and
/// [`Env::define_class`].
///
/// At most one of `method`, the getter/setter pair, and `value` is used, in
/// that order of precedence. The default attributes are empty: read-only,
/// hidden from enumeration and non-configurable.
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub name: PropertyName,
    pub method: Option<Callback>,
    pub getter: Option<Callback>,
    pub setter: Option<Callback>,
    pub value: Option<Value>,
    pub attributes: PropertyAttributes,
    pub data: Option<NativeData>,
}

impl PropertyDescriptor {
    fn empty(name: PropertyName) -> Self {
        Self {
            name,
            method: None,
            getter: None,
            setter: None,
            value: None,
            attributes: PropertyAttributes::empty(),
            data: None,
        }
    }

    /// A data property holding `value`
    pub fn value(name: impl Into<PropertyName>, value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::empty(name.into())
        }
    }

    /// A data property holding a native function
    pub fn method(
        name: impl Into<PropertyName>,
        f: impl Fn(&mut Env, &CallbackInfo) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            method: Some(Rc::new(f)),
            ..Self::empty(name.into())
        }
    }

    /// An accessor property with a native getter
    pub fn getter(
        name: impl Into<PropertyName>,
        f: impl Fn(&mut Env, &CallbackInfo) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            getter: Some(Rc::new(f)),
            ..Self::empty(name.into())
        }
    }

    /// An accessor property with a native setter only
    pub fn setter(
        name: impl Into<PropertyName>,
        f: impl Fn(&mut Env, &CallbackInfo) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            setter: Some(Rc::new(f)),
            ..Self::empty(name.into())
        }
    }

    /// Add a native setter to an accessor property
    pub fn with_setter(mut self, f: impl Fn(&mut Env, &CallbackInfo) -> Result<Value> + 'static) -> Self {
        self.setter = Some(Rc::new(f));
        self
    }

    pub fn with_attributes(mut self, attributes: PropertyAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Data handed to the method/getter/setter through [`CallbackInfo::data`]
    pub fn with_data(mut self, data: NativeData) -> Self {
        self.data = Some(data);
        self
    }

    pub(crate) fn is_static(&self) -> bool {
        self.attributes.contains(PropertyAttributes::STATIC)
    }
}

/// An own property as reported back to native code
#[derive(Debug, Clone, PartialEq)]
pub struct OwnPropertyDescriptor {
    pub value: Option<Value>,
    pub getter: Option<Value>,
    pub setter: Option<Value>,
    pub attributes: PropertyAttributes,
}

/// Whether key collection walks the prototype chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCollectionMode {
    IncludePrototypes,
    OwnOnly,
}

bitflags! {
    /// Restricts which keys `get_all_property_names` reports
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyFilter: u32 {
        const ALL_PROPERTIES = 0;
        const WRITABLE = 1 << 0;
        const ENUMERABLE = 1 << 1;
        const CONFIGURABLE = 1 << 2;
        const SKIP_STRINGS = 1 << 3;
        const SKIP_SYMBOLS = 1 << 4;
    }
}

/// How integer-index keys are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyConversion {
    KeepNumbers,
    NumbersToStrings,
}

const ATTRIBUTE_MASK: PropertyAttributes = PropertyAttributes::DEFAULT_JS_PROPERTY;

impl Env {
    // === Keyed access ===

    /// `object[key]`, walking the prototype chain and running getters
    pub fn get_property(&mut self, object: Value, key: Value) -> Result<Value> {
        let obj = self.access_target(object)?;
        let key = self.key_from_value(key)?;
        let value = self.get_datum(&obj, &key, &JsValue::Object(obj.clone()))?;
        Ok(self.handle(value))
    }

    /// `object[key] = value` with ordinary assignment semantics: writes to a
    /// read-only property or a getter-only accessor are ignored
    pub fn set_property(&mut self, object: Value, key: Value, value: Value) -> Result<()> {
        let obj = self.access_target(object)?;
        let key = self.key_from_value(key)?;
        let value = self.datum(value)?;
        self.set_datum(&obj, &key, value)?;
        Ok(())
    }

    /// `key in object`
    pub fn has_property(&mut self, object: Value, key: Value) -> Result<bool> {
        let obj = self.access_target(object)?;
        let key = self.key_from_value(key)?;
        Ok(has_datum(&obj, &key))
    }

    /// Own-property check; the key must already be a string or symbol
    pub fn has_own_property(&mut self, object: Value, key: Value) -> Result<bool> {
        let obj = self.object_arg(object)?;
        let key = match self.datum(key)? {
            JsValue::String(s) => PropertyKey::String(s),
            JsValue::Symbol(sym) => PropertyKey::Symbol(sym),
            _ => return Err(Error::WrongKeyType),
        };
        let has = obj.borrow().has_own_property(&key);
        Ok(has)
    }

    /// `delete object[key]`: `false` if the own property is
    /// non-configurable, `true` otherwise (including when there was nothing
    /// to delete)
    pub fn delete_property(&mut self, object: Value, key: Value) -> Result<bool> {
        let obj = self.object_arg(object)?;
        let key = self.key_from_value(key)?;
        Ok(delete_datum(&obj, &key))
    }

    /// Define an own data property with explicit attributes
    pub fn define_property(
        &mut self,
        object: Value,
        key: Value,
        value: Value,
        attributes: PropertyAttributes,
    ) -> Result<()> {
        let obj = self.object_arg(object)?;
        let key = self.key_from_value(key)?;
        let value = self.datum(value)?;
        self.define_datum(&obj, key, Property::data(value, attributes & ATTRIBUTE_MASK))
    }

    pub fn set_named_property(&mut self, object: Value, name: &str, value: Value) -> Result<()> {
        let obj = self.access_target(object)?;
        let value = self.datum(value)?;
        self.set_datum(&obj, &PropertyKey::from(name), value)?;
        Ok(())
    }

    pub fn get_named_property(&mut self, object: Value, name: &str) -> Result<Value> {
        let obj = self.access_target(object)?;
        let value = self.get_datum(&obj, &PropertyKey::from(name), &JsValue::Object(obj.clone()))?;
        Ok(self.handle(value))
    }

    pub fn has_named_property(&mut self, object: Value, name: &str) -> Result<bool> {
        let obj = self.access_target(object)?;
        Ok(has_datum(&obj, &PropertyKey::from(name)))
    }

    // === Indexed access ===

    pub fn set_element(&mut self, object: Value, index: u32, value: Value) -> Result<()> {
        let obj = self.object_arg(object)?;
        let value = self.datum(value)?;
        self.set_datum(&obj, &PropertyKey::from_index(index), value)?;
        Ok(())
    }

    /// Read an element. Negative indices, indices past 2^32-2 and, on
    /// arrays, indices at or past `length` fail with
    /// [`Error::IndexOutOfRange`].
    pub fn get_element(&mut self, object: Value, index: i64) -> Result<Value> {
        let obj = self.object_arg(object)?;
        let length = obj.borrow().array_length();
        let limit = length.map(|len| len as i64).unwrap_or(u32::MAX as i64);
        if index < 0 || index >= limit {
            return Err(Error::IndexOutOfRange {
                index,
                length: length.unwrap_or(0),
            });
        }
        let key = PropertyKey::from_index(index as u32);
        let value = self.get_datum(&obj, &key, &JsValue::Object(obj.clone()))?;
        Ok(self.handle(value))
    }

    /// Element membership; out-of-range indices report `false`
    pub fn has_element(&mut self, object: Value, index: i64) -> Result<bool> {
        let obj = self.object_arg(object)?;
        if !(0..u32::MAX as i64).contains(&index) {
            return Ok(false);
        }
        Ok(has_datum(&obj, &PropertyKey::from_index(index as u32)))
    }

    /// Delete an element, leaving a hole; array `length` is unchanged
    pub fn delete_element(&mut self, object: Value, index: i64) -> Result<bool> {
        let obj = self.object_arg(object)?;
        if !(0..u32::MAX as i64).contains(&index) {
            return Ok(true);
        }
        Ok(delete_datum(&obj, &PropertyKey::from_index(index as u32)))
    }

    pub fn is_array(&self, value: Value) -> Result<bool> {
        Ok(match self.datum(value)? {
            JsValue::Object(obj) => obj.borrow().array_length().is_some(),
            _ => false,
        })
    }

    pub fn get_array_length(&self, value: Value) -> Result<u32> {
        match self.datum(value)? {
            JsValue::Object(obj) => obj
                .borrow()
                .array_length()
                .ok_or(Error::wrong_type(ExpectedType::Array)),
            _ => Err(Error::wrong_type(ExpectedType::Array)),
        }
    }

    // === Definition ===

    /// Define several properties at once
    pub fn define_properties(&mut self, object: Value, descriptors: &[PropertyDescriptor]) -> Result<()> {
        let obj = self.object_arg(object)?;
        for descriptor in descriptors {
            let key = self.descriptor_key(&descriptor.name)?;
            let property = self.materialize_descriptor(&key, descriptor)?;
            self.define_datum(&obj, key, property)?;
        }
        Ok(())
    }

    /// Inspect an own property
    pub fn get_own_property_descriptor(
        &mut self,
        object: Value,
        key: Value,
    ) -> Result<Option<OwnPropertyDescriptor>> {
        let obj = self.object_arg(object)?;
        let key = self.key_from_value(key)?;
        let property = obj.borrow().get_own_property(&key);
        Ok(property.map(|property| match property.slot {
            PropertySlot::Data(value) => OwnPropertyDescriptor {
                value: Some(self.handle(value)),
                getter: None,
                setter: None,
                attributes: property.attributes,
            },
            PropertySlot::Accessor { get, set } => OwnPropertyDescriptor {
                value: None,
                getter: get.map(|g| self.handle(JsValue::Object(g))),
                setter: set.map(|s| self.handle(JsValue::Object(s))),
                attributes: property.attributes,
            },
        }))
    }

    // === Enumeration ===

    /// Own enumerable string keys in canonical order
    pub fn own_keys(&mut self, object: Value) -> Result<Vec<String>> {
        let obj = self.object_arg(object)?;
        let obj = obj.borrow();
        Ok(obj
            .own_keys()
            .into_iter()
            .filter(|key| !key.is_symbol())
            .filter(|key| {
                obj.get_own_property(key)
                    .is_some_and(|p| p.attributes.enumerable())
            })
            .map(|key| key.to_string())
            .collect())
    }

    /// The keys a `for…in` walk visits, as an array of strings: enumerable
    /// string keys of the object and its prototypes, shadowed keys once
    pub fn get_property_names(&mut self, object: Value) -> Result<Value> {
        self.get_all_property_names(
            object,
            KeyCollectionMode::IncludePrototypes,
            KeyFilter::ENUMERABLE | KeyFilter::SKIP_SYMBOLS,
            KeyConversion::NumbersToStrings,
        )
    }

    /// Collect property keys as an array
    pub fn get_all_property_names(
        &mut self,
        object: Value,
        mode: KeyCollectionMode,
        filter: KeyFilter,
        conversion: KeyConversion,
    ) -> Result<Value> {
        let obj = self.object_arg(object)?;
        let mut seen: HashSet<PropertyKey> = HashSet::default();
        let mut keys = Vec::new();
        for current in prototype_chain(&obj) {
            let current = current.borrow();
            for key in current.own_keys() {
                if !seen.insert(key.clone()) {
                    continue;
                }
                let Some(property) = current.get_own_property(&key) else {
                    continue;
                };
                if key_passes_filter(&key, &property, filter) {
                    keys.push(match (conversion, key.array_index()) {
                        (KeyConversion::KeepNumbers, Some(index)) => JsValue::Number(index as f64),
                        _ => key.to_value(),
                    });
                }
            }
            if mode == KeyCollectionMode::OwnOnly {
                break;
            }
        }
        let array = self.new_array_object(0);
        {
            let mut arr = array.borrow_mut();
            for (index, key) in keys.into_iter().enumerate() {
                arr.insert_property(
                    PropertyKey::from_index(index as u32),
                    Property::data(key, PropertyAttributes::DEFAULT_JS_PROPERTY),
                );
            }
        }
        Ok(self.handle(JsValue::Object(array)))
    }

    // === Prototype and integrity ===

    /// The object's prototype, or null
    pub fn get_prototype(&mut self, object: Value) -> Result<Value> {
        let obj = self.access_target(object)?;
        let proto = obj.borrow().prototype.clone();
        Ok(self.handle(proto.map(JsValue::Object).unwrap_or(JsValue::Null)))
    }

    /// Replace the object's prototype. Rejects assignments that would close
    /// a cycle, and changes to non-extensible objects.
    pub fn set_prototype(&mut self, object: Value, prototype: Value) -> Result<()> {
        let obj = self.object_arg(object)?;
        let proto = match self.datum(prototype)? {
            JsValue::Object(proto) => Some(proto),
            JsValue::Null => None,
            _ => return Err(Error::wrong_type(ExpectedType::Object)),
        };
        let unchanged = match (&obj.borrow().prototype, &proto) {
            (Some(current), Some(new)) => Rc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return Ok(());
        }
        if !obj.borrow().extensible {
            return Err(Error::invalid_argument("cannot change the prototype of a non-extensible object"));
        }
        if let Some(proto) = &proto {
            if prototype_chain(proto).any(|link| Rc::ptr_eq(&link, &obj)) {
                return Err(Error::invalid_argument(messages::CYCLIC_PROTOTYPE));
            }
        }
        obj.borrow_mut().prototype = proto;
        Ok(())
    }

    /// Make the object non-extensible and all its properties read-only and
    /// non-configurable
    pub fn object_freeze(&mut self, object: Value) -> Result<()> {
        let obj = self.object_arg(object)?;
        obj.borrow_mut().seal(true);
        Ok(())
    }

    /// Make the object non-extensible and all its properties non-configurable
    pub fn object_seal(&mut self, object: Value) -> Result<()> {
        let obj = self.object_arg(object)?;
        obj.borrow_mut().seal(false);
        Ok(())
    }

    // === Helpers ===

    /// The object a handle refers to; anything else is a type failure
    pub(crate) fn object_arg(&self, value: Value) -> Result<ObjectRef> {
        match self.datum(value)? {
            JsValue::Object(obj) => Ok(obj),
            _ => Err(Error::wrong_type(ExpectedType::Object)),
        }
    }

    /// Like `object_arg`, but primitives other than null/undefined are boxed
    fn access_target(&mut self, value: Value) -> Result<ObjectRef> {
        match self.datum(value)? {
            JsValue::Object(obj) => Ok(obj),
            JsValue::Undefined | JsValue::Null => Err(Error::wrong_type(ExpectedType::Object)),
            primitive => self.datum_to_object(&primitive),
        }
    }

    fn key_from_value(&mut self, key: Value) -> Result<PropertyKey> {
        let key = self.datum(key)?;
        self.to_property_key(&key)
    }

    pub(crate) fn descriptor_key(&mut self, name: &PropertyName) -> Result<PropertyKey> {
        match name {
            PropertyName::Name(name) => Ok(PropertyKey::from(name.as_str())),
            PropertyName::Key(key) => match self.datum(*key)? {
                JsValue::String(s) => Ok(PropertyKey::String(s)),
                JsValue::Symbol(sym) => Ok(PropertyKey::Symbol(sym)),
                _ => Err(Error::WrongKeyType),
            },
        }
    }

    pub(crate) fn materialize_descriptor(
        &mut self,
        key: &PropertyKey,
        descriptor: &PropertyDescriptor,
    ) -> Result<Property> {
        let attributes = descriptor.attributes & ATTRIBUTE_MASK;
        let name = match key {
            PropertyKey::String(s) => s.to_string(),
            PropertyKey::Symbol(sym) => format!("[{}]", sym.description().unwrap_or("")),
        };
        if let Some(method) = &descriptor.method {
            let func = self.new_native_function(&name, method.clone(), descriptor.data.clone());
            return Ok(Property::data(JsValue::Object(func), attributes));
        }
        if descriptor.getter.is_some() || descriptor.setter.is_some() {
            let get = descriptor
                .getter
                .as_ref()
                .map(|g| self.new_native_function(&name, g.clone(), descriptor.data.clone()));
            let set = descriptor
                .setter
                .as_ref()
                .map(|s| self.new_native_function(&name, s.clone(), descriptor.data.clone()));
            return Ok(Property::accessor(get, set, attributes));
        }
        let value = match descriptor.value {
            Some(value) => self.datum(value)?,
            None => JsValue::Undefined,
        };
        Ok(Property::data(value, attributes))
    }

    // === Datum-level operations ===

    /// [[Get]]
    pub(crate) fn get_datum(&mut self, obj: &ObjectRef, key: &PropertyKey, receiver: &JsValue) -> Result<JsValue> {
        for current in prototype_chain(obj) {
            let property = current.borrow().get_own_property(key);
            if let Some(property) = property {
                return match property.slot {
                    PropertySlot::Data(value) => Ok(value),
                    PropertySlot::Accessor { get: Some(getter), .. } => {
                        self.invoke(&getter, receiver.clone(), Vec::new(), None)
                    }
                    PropertySlot::Accessor { get: None, .. } => Ok(JsValue::Undefined),
                };
            }
        }
        Ok(JsValue::Undefined)
    }

    /// [[Set]] with the object as receiver; `Ok(false)` when the write was
    /// silently rejected
    pub(crate) fn set_datum(&mut self, obj: &ObjectRef, key: &PropertyKey, value: JsValue) -> Result<bool> {
        if key.is_length() && obj.borrow().array_length().is_some() {
            return self.set_array_length(obj, &value);
        }

        let mut inherited = None;
        for current in prototype_chain(obj) {
            let property = current.borrow().get_own_property(key);
            if let Some(property) = property {
                inherited = Some((Rc::ptr_eq(&current, obj), property));
                break;
            }
        }

        match inherited {
            Some((_, Property { slot: PropertySlot::Accessor { set: Some(setter), .. }, .. })) => {
                self.invoke(&setter, JsValue::Object(obj.clone()), vec![value], None)?;
                Ok(true)
            }
            Some((_, Property { slot: PropertySlot::Accessor { set: None, .. }, .. })) => Ok(false),
            Some((_, property)) if !property.attributes.writable() => Ok(false),
            Some((true, _)) => {
                if let Some(own) = obj.borrow_mut().properties.get_mut(key) {
                    own.slot = PropertySlot::Data(value);
                }
                Ok(true)
            }
            _ => {
                let mut target = obj.borrow_mut();
                if !target.extensible {
                    return Ok(false);
                }
                if let (Some(index), ObjectClass::Array { length, length_writable: false }) =
                    (key.array_index(), &target.class)
                {
                    if index >= *length {
                        return Ok(false);
                    }
                }
                target.insert_property(key.clone(), Property::data(value, PropertyAttributes::DEFAULT_JS_PROPERTY));
                Ok(true)
            }
        }
    }

    /// [[DefineOwnProperty]]; redefining a non-configurable property throws
    /// a TypeError unless it only updates a writable data value
    pub(crate) fn define_datum(&mut self, obj: &ObjectRef, key: PropertyKey, property: Property) -> Result<()> {
        if key.is_length() && obj.borrow().array_length().is_some() {
            let PropertySlot::Data(value) = &property.slot else {
                return Err(self.raise(ErrorKind::TypeError, "Cannot redefine property: length"));
            };
            self.set_array_length(obj, value)?;
            if !property.attributes.writable() {
                if let ObjectClass::Array { length_writable, .. } = &mut obj.borrow_mut().class {
                    *length_writable = false;
                }
            }
            return Ok(());
        }

        let (existing, extensible) = {
            let target = obj.borrow();
            (target.get_own_property(&key), target.extensible)
        };
        match existing {
            Some(current) if !current.attributes.configurable() => {
                let compatible = redefines_nothing(&current, &property)
                    || matches!(
                    (&current.slot, &property.slot),
                    (PropertySlot::Data(_), PropertySlot::Data(_))
                ) && current.attributes.writable()
                    && !property.attributes.configurable()
                    && current.attributes.enumerable() == property.attributes.enumerable();
                if !compatible {
                    return Err(self.raise(ErrorKind::TypeError, format!("Cannot redefine property: {}", key)));
                }
            }
            None if !extensible => {
                return Err(self.raise(
                    ErrorKind::TypeError,
                    format!("Cannot define property {}, object is not extensible", key),
                ));
            }
            _ => {}
        }
        obj.borrow_mut().insert_property(key, property);
        Ok(())
    }

    /// Assign an array's `length`, truncating elements past the new length
    fn set_array_length(&mut self, obj: &ObjectRef, value: &JsValue) -> Result<bool> {
        let n = self.datum_to_number(value)?;
        let new_length = crate::coerce::to_uint32(n);
        if new_length as f64 != n {
            return Err(self.raise(ErrorKind::RangeError, messages::INVALID_ARRAY_LENGTH));
        }
        let mut target = obj.borrow_mut();
        let ObjectClass::Array { length, length_writable } = &mut target.class else {
            return Ok(false);
        };
        if !*length_writable {
            return Ok(false);
        }
        let old_length = *length;
        *length = new_length;
        if new_length < old_length {
            target
                .properties
                .retain(|key, _| key.array_index().map_or(true, |index| index < new_length));
        }
        Ok(true)
    }
}

/// Whether defining `property` over `current` leaves it exactly as it was
fn redefines_nothing(current: &Property, property: &Property) -> bool {
    let (a, b) = (current.attributes, property.attributes);
    let same_flags =
        a.writable() == b.writable() && a.enumerable() == b.enumerable() && a.configurable() == b.configurable();
    let same_ref = |x: &Option<ObjectRef>, y: &Option<ObjectRef>| match (x, y) {
        (Some(x), Some(y)) => Rc::ptr_eq(x, y),
        (None, None) => true,
        _ => false,
    };
    same_flags
        && match (&current.slot, &property.slot) {
            (PropertySlot::Data(x), PropertySlot::Data(y)) => x.same_value(y),
            (PropertySlot::Accessor { get: g1, set: s1 }, PropertySlot::Accessor { get: g2, set: s2 }) => {
                same_ref(g1, g2) && same_ref(s1, s2)
            }
            _ => false,
        }
}

/// [[HasProperty]]
pub(crate) fn has_datum(obj: &ObjectRef, key: &PropertyKey) -> bool {
    prototype_chain(obj).any(|current| current.borrow().has_own_property(key))
}

/// [[Delete]]
pub(crate) fn delete_datum(obj: &ObjectRef, key: &PropertyKey) -> bool {
    let mut target = obj.borrow_mut();
    if key.is_length() && target.array_length().is_some() {
        return false;
    }
    match target.properties.get(key) {
        None => true,
        Some(property) if !property.attributes.configurable() => false,
        Some(_) => {
            target.remove_property(key);
            true
        }
    }
}

fn key_passes_filter(key: &PropertyKey, property: &Property, filter: KeyFilter) -> bool {
    if key.is_symbol() && filter.contains(KeyFilter::SKIP_SYMBOLS) {
        return false;
    }
    if !key.is_symbol() && filter.contains(KeyFilter::SKIP_STRINGS) {
        return false;
    }
    let attrs = property.attributes;
    !(filter.contains(KeyFilter::WRITABLE) && !attrs.writable()
        || filter.contains(KeyFilter::ENUMERABLE) && !attrs.enumerable()
        || filter.contains(KeyFilter::CONFIGURABLE) && !attrs.configurable())
}
