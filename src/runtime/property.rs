//! Property keys, slots and attribute flags

use super::value::{JsValue, ObjectRef, Symbol};
use bitflags::bitflags;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::rc::Rc;

bitflags! {
    /// Property attribute flags, numbered as the native API numbers them
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyAttributes: u32 {
        const WRITABLE = 1 << 0;
        const ENUMERABLE = 1 << 1;
        const CONFIGURABLE = 1 << 2;
        /// Only meaningful in `define_class`: put the property on the
        /// constructor instead of the prototype
        const STATIC = 1 << 10;

        /// Attributes of a class method
        const DEFAULT_METHOD = Self::WRITABLE.bits() | Self::CONFIGURABLE.bits();
        /// Attributes of a property created by plain assignment
        const DEFAULT_JS_PROPERTY = Self::WRITABLE.bits() | Self::ENUMERABLE.bits() | Self::CONFIGURABLE.bits();
    }
}

impl PropertyAttributes {
    pub fn writable(self) -> bool {
        self.contains(Self::WRITABLE)
    }

    pub fn enumerable(self) -> bool {
        self.contains(Self::ENUMERABLE)
    }

    pub fn configurable(self) -> bool {
        self.contains(Self::CONFIGURABLE)
    }
}

/// A property key: a string or a symbol
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(Rc<str>),
    Symbol(Rc<Symbol>),
}

impl PropertyKey {
    /// The key for an integer index
    pub fn from_index(index: u32) -> Self {
        PropertyKey::String(Rc::from(index.to_string()))
    }

    /// The `length` key
    pub fn length() -> Self {
        PropertyKey::from("length")
    }

    /// The canonical array index this key denotes, if any.
    ///
    /// Only the canonical decimal form counts: "1" is an index, "01" and
    /// "1.0" are plain string keys. 2^32-1 is not a valid index.
    pub fn array_index(&self) -> Option<u32> {
        let PropertyKey::String(s) = self else {
            return None;
        };
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 10 || (bytes.len() > 1 && bytes[0] == b'0') {
            return None;
        }
        if !bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }
        match s.parse::<u64>() {
            Ok(n) if n < u32::MAX as u64 => Some(n as u32),
            _ => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }

    pub fn is_length(&self) -> bool {
        matches!(self, PropertyKey::String(s) if &**s == "length")
    }

    /// The key as an engine value
    pub fn to_value(&self) -> JsValue {
        match self {
            PropertyKey::String(s) => JsValue::String(s.clone()),
            PropertyKey::Symbol(sym) => JsValue::Symbol(sym.clone()),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(Rc::from(s))
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => f.write_str(s),
            PropertyKey::Symbol(sym) => write!(f, "Symbol({})", sym.description().unwrap_or("")),
        }
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Where a property's value comes from
#[derive(Clone)]
pub enum PropertySlot {
    /// Stored value
    Data(JsValue),
    /// Getter/setter pair; the writable flag has no meaning here
    Accessor {
        get: Option<ObjectRef>,
        set: Option<ObjectRef>,
    },
}

/// An own property
#[derive(Clone)]
pub struct Property {
    pub slot: PropertySlot,
    pub attributes: PropertyAttributes,
}

impl Property {
    /// A data property
    pub fn data(value: JsValue, attributes: PropertyAttributes) -> Self {
        Self {
            slot: PropertySlot::Data(value),
            attributes,
        }
    }

    /// An accessor property; `WRITABLE` is dropped from the attributes
    pub fn accessor(get: Option<ObjectRef>, set: Option<ObjectRef>, attributes: PropertyAttributes) -> Self {
        Self {
            slot: PropertySlot::Accessor { get, set },
            attributes: attributes - PropertyAttributes::WRITABLE,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self.slot, PropertySlot::Accessor { .. })
    }
}

/// Own-property table
pub type PropertyMap = IndexMap<PropertyKey, Property, FxBuildHasher>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_index_canonical_only() {
        assert_eq!(PropertyKey::from("0").array_index(), Some(0));
        assert_eq!(PropertyKey::from("42").array_index(), Some(42));
        assert_eq!(PropertyKey::from("4294967294").array_index(), Some(4_294_967_294));
        assert_eq!(PropertyKey::from("4294967295").array_index(), None);
        assert_eq!(PropertyKey::from("01").array_index(), None);
        assert_eq!(PropertyKey::from("1.0").array_index(), None);
        assert_eq!(PropertyKey::from("-1").array_index(), None);
        assert_eq!(PropertyKey::from("").array_index(), None);
    }

    #[test]
    fn test_accessor_ignores_writable() {
        let prop = Property::accessor(None, None, PropertyAttributes::DEFAULT_JS_PROPERTY);
        assert!(!prop.attributes.writable());
        assert!(prop.attributes.enumerable());
    }

    #[test]
    fn test_default_presets() {
        assert_eq!(PropertyAttributes::DEFAULT_METHOD.bits(), 5);
        assert_eq!(PropertyAttributes::DEFAULT_JS_PROPERTY.bits(), 7);
    }
}
