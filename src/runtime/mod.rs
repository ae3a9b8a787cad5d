//! The bridge environment
//!
//! [`Env`] owns everything a native caller interacts with: the engine's
//! intrinsic objects, the handle scope stack, the finalizer queue, the
//! reference table and the microtask queue. Component verbs are implemented
//! as `impl Env` blocks in their own modules.

pub(crate) mod intrinsics;
pub mod property;
pub mod value;

pub use property::{Property, PropertyAttributes, PropertyKey, PropertySlot};
pub use value::{JsValue, Object, ObjectClass, ObjectRef, Symbol, ValueType};

use crate::config::{BridgeConfig, Capabilities};
use crate::error::{Error, Result};
use crate::gc::FinalizerQueue;
use crate::promise::Microtask;
use crate::reference::ReferenceTable;
use crate::scope::{ScopeStack, Value};
use crate::wrap::WrapSlot;
use intrinsics::Intrinsics;
use num_bigint::{BigInt, Sign};
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

/// Native API version the bridge surface corresponds to
pub const API_VERSION: u32 = 8;

/// A bridge environment: one engine realm plus the native-side bookkeeping
/// that fronts it
pub struct Env {
    pub(crate) config: BridgeConfig,
    pub(crate) scopes: ScopeStack,
    pub(crate) intrinsics: Intrinsics,
    pub(crate) finalizers: FinalizerQueue,
    pub(crate) microtasks: VecDeque<Microtask>,
    pub(crate) references: ReferenceTable,
    pub(crate) instance_data: Option<WrapSlot>,
    pub(crate) next_symbol_id: u64,
    pub(crate) external_memory: i64,
}

impl Env {
    /// Create an environment with the default configuration
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    /// Create an environment with the given configuration
    pub fn with_config(config: BridgeConfig) -> Self {
        debug!(this_coercion = ?config.this_coercion, "creating bridge environment");
        Self {
            config,
            scopes: ScopeStack::new(),
            intrinsics: Intrinsics::new(),
            finalizers: FinalizerQueue::new(),
            microtasks: VecDeque::new(),
            references: ReferenceTable::default(),
            instance_data: None,
            next_symbol_id: 1,
            external_memory: 0,
        }
    }

    /// The configuration this environment was created with
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Engine capabilities, including the receiver binding rule
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            this_coercion: self.config.this_coercion,
            api_version: API_VERSION,
        }
    }

    /// Native API version
    pub fn get_version(&self) -> u32 {
        API_VERSION
    }

    /// Record externally held memory attributed to engine objects and return
    /// the new total
    pub fn adjust_external_memory(&mut self, change_in_bytes: i64) -> i64 {
        self.external_memory = self.external_memory.saturating_add(change_in_bytes).max(0);
        self.external_memory
    }

    // === Value creation ===

    pub fn undefined(&mut self) -> Value {
        self.handle(JsValue::Undefined)
    }

    pub fn null(&mut self) -> Value {
        self.handle(JsValue::Null)
    }

    /// The global object
    pub fn global(&mut self) -> Value {
        let global = self.intrinsics.global.clone();
        self.handle(JsValue::Object(global))
    }

    pub fn boolean(&mut self, value: bool) -> Value {
        self.handle(JsValue::Boolean(value))
    }

    /// A Number; ±0, ±Infinity and NaN are stored bit-exactly
    pub fn double(&mut self, value: f64) -> Value {
        self.handle(JsValue::Number(value))
    }

    pub fn int32(&mut self, value: i32) -> Value {
        self.double(value as f64)
    }

    pub fn uint32(&mut self, value: u32) -> Value {
        self.double(value as f64)
    }

    /// A Number from an i64. Magnitudes beyond 2^53 lose precision; use
    /// [`Env::bigint_i64`] to keep them exact.
    pub fn int64(&mut self, value: i64) -> Value {
        self.double(value as f64)
    }

    /// A new plain object whose prototype is `Object.prototype`
    pub fn object(&mut self) -> Value {
        let obj = self.new_ordinary_object();
        self.handle(JsValue::Object(obj))
    }

    /// A new empty array
    pub fn array(&mut self) -> Value {
        let arr = self.new_array_object(0);
        self.handle(JsValue::Object(arr))
    }

    /// A new array with `length` holes
    pub fn array_with_length(&mut self, length: u64) -> Result<Value> {
        let limit = self.config.max_array_length.min(u32::MAX as u64);
        if length > limit {
            return Err(Error::EngineLimitExceeded {
                what: "array length",
                limit,
            });
        }
        let arr = self.new_array_object(length as u32);
        Ok(self.handle(JsValue::Object(arr)))
    }

    pub fn bigint_i64(&mut self, value: i64) -> Value {
        self.handle(JsValue::BigInt(Rc::new(BigInt::from(value))))
    }

    pub fn bigint_u64(&mut self, value: u64) -> Value {
        self.handle(JsValue::BigInt(Rc::new(BigInt::from(value))))
    }

    /// A BigInt from little-endian 64-bit words
    pub fn bigint_words(&mut self, negative: bool, words: &[u64]) -> Result<Value> {
        if words.len() > i32::MAX as usize {
            return Err(Error::EngineLimitExceeded {
                what: "bigint word count",
                limit: i32::MAX as u64,
            });
        }
        let digits: Vec<u32> = words
            .iter()
            .flat_map(|word| [*word as u32, (*word >> 32) as u32])
            .collect();
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        let value = BigInt::from_slice(sign, &digits);
        Ok(self.handle(JsValue::BigInt(Rc::new(value))))
    }

    // === Allocation helpers ===

    pub(crate) fn new_ordinary_object(&self) -> ObjectRef {
        Object::alloc(ObjectClass::Ordinary, Some(self.intrinsics.object_prototype.clone()))
    }

    pub(crate) fn new_array_object(&self, length: u32) -> ObjectRef {
        Object::alloc(
            ObjectClass::Array {
                length,
                length_writable: true,
            },
            Some(self.intrinsics.array_prototype.clone()),
        )
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Env {
    fn drop(&mut self) {
        let released = self.release_realm();
        self.scopes.unwind_all();
        self.microtasks.clear();
        self.references.clear();
        self.instance_data.take();
        if self.config.finalize_on_drop {
            let ran = self.run_finalizers();
            debug!(objects = released, finalizers = ran, "environment torn down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        let env = Env::new();
        let caps = env.capabilities();
        assert_eq!(caps.api_version, 8);
        assert_eq!(caps.this_coercion, crate::ThisCoercion::Sloppy);
    }

    #[test]
    fn test_array_with_max_length() {
        let mut env = Env::new();
        let arr = env.array_with_length(4_294_967_295).unwrap();
        assert_eq!(env.get_array_length(arr).unwrap(), 4_294_967_295);
    }

    #[test]
    fn test_array_length_limit() {
        let mut env = Env::new();
        let err = env.array_with_length(1 << 32).unwrap_err();
        assert!(matches!(err, Error::EngineLimitExceeded { what: "array length", .. }));
    }

    #[test]
    fn test_int64_is_lossy_number() {
        let mut env = Env::new();
        let v = env.int64(i64::MAX);
        assert_eq!(env.type_of(v).unwrap(), ValueType::Number);
    }

    #[test]
    fn test_bigint_words() {
        let mut env = Env::new();
        let v = env.bigint_words(true, &[0, 1]).unwrap();
        let (negative, words) = env.get_value_bigint_words(v).unwrap();
        assert!(negative);
        assert_eq!(words, vec![0, 1]);
    }

    #[test]
    fn test_adjust_external_memory() {
        let mut env = Env::new();
        assert_eq!(env.adjust_external_memory(1024), 1024);
        assert_eq!(env.adjust_external_memory(-24), 1000);
        assert_eq!(env.adjust_external_memory(-5000), 0);
    }
}
