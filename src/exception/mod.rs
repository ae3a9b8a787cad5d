//! Error taxonomy and the exception channel
//!
//! A thrown value of any type (not only error objects) is held as the
//! pending exception of the scope that was innermost when it was thrown.
//! Bridge calls that fail because of it return [`Error::Thrown`]; the value
//! itself is retrieved with [`Env::get_and_clear_last_exception`]. A pending
//! exception that is still uncleared when its scope closes moves to the
//! parent scope, so it is never silently lost.

use crate::error::{Error, ErrorKind, ExpectedType, Result};
use crate::runtime::value::prototype_chain;
use crate::runtime::{Env, JsValue, Object, ObjectClass, ObjectRef, Property, PropertyAttributes, PropertyKey};
use crate::scope::Value;
use std::rc::Rc;
use tracing::{debug, trace};

impl Env {
    // === Throwing ===

    /// Throw `value` as-is. The value is not copied, wrapped or converted.
    pub fn throw(&mut self, value: Value) -> Result<()> {
        let value = self.datum(value)?;
        self.ensure_no_pending()?;
        self.set_pending(value);
        Ok(())
    }

    /// Throw a new `Error`, with an own `code` property when `code` is given
    pub fn throw_error(&mut self, code: Option<&str>, message: &str) -> Result<()> {
        self.throw_kind(ErrorKind::GenericError, code, message)
    }

    pub fn throw_type_error(&mut self, code: Option<&str>, message: &str) -> Result<()> {
        self.throw_kind(ErrorKind::TypeError, code, message)
    }

    pub fn throw_range_error(&mut self, code: Option<&str>, message: &str) -> Result<()> {
        self.throw_kind(ErrorKind::RangeError, code, message)
    }

    fn throw_kind(&mut self, kind: ErrorKind, code: Option<&str>, message: &str) -> Result<()> {
        self.ensure_no_pending()?;
        let error = self.new_error_object(kind, code.map(JsValue::string), JsValue::string(message));
        self.set_pending(JsValue::Object(error));
        Ok(())
    }

    pub fn is_exception_pending(&self) -> bool {
        self.scopes.pending_exception().is_some()
    }

    /// Take the pending exception, leaving none pending
    pub fn get_and_clear_last_exception(&mut self) -> Option<Value> {
        let exception = self.scopes.take_pending_exception()?;
        trace!(exception = ?exception, "cleared pending exception");
        Some(self.handle(exception))
    }

    // === Creating ===

    /// A new `Error`. `message` must be a string and `code`, when given,
    /// a string.
    pub fn create_error(&mut self, code: Option<Value>, message: Value) -> Result<Value> {
        self.create_error_from_values(ErrorKind::GenericError, code, message)
    }

    pub fn create_type_error(&mut self, code: Option<Value>, message: Value) -> Result<Value> {
        self.create_error_from_values(ErrorKind::TypeError, code, message)
    }

    pub fn create_range_error(&mut self, code: Option<Value>, message: Value) -> Result<Value> {
        self.create_error_from_values(ErrorKind::RangeError, code, message)
    }

    /// A new error of any of the built-in kinds
    pub fn create_error_of_kind(&mut self, kind: ErrorKind, code: Option<&str>, message: &str) -> Value {
        let error = self.new_error_object(kind, code.map(JsValue::string), JsValue::string(message));
        self.handle(JsValue::Object(error))
    }

    fn create_error_from_values(&mut self, kind: ErrorKind, code: Option<Value>, message: Value) -> Result<Value> {
        let message = match self.datum(message)? {
            message @ JsValue::String(_) => message,
            _ => return Err(Error::wrong_type(ExpectedType::String)),
        };
        let code = match code {
            Some(code) => match self.datum(code)? {
                code @ JsValue::String(_) => Some(code),
                _ => return Err(Error::wrong_type(ExpectedType::String)),
            },
            None => None,
        };
        let error = self.new_error_object(kind, code, message);
        Ok(self.handle(JsValue::Object(error)))
    }

    // === Classifying ===

    /// The nearest built-in error kind on the value's prototype chain, or
    /// `None` for anything that is not an error. Instances of subclasses of
    /// `Error` report the kind of the built-in they extend.
    pub fn classify_error(&self, value: Value) -> Result<Option<ErrorKind>> {
        Ok(match self.datum(value)? {
            JsValue::Object(obj) => self.error_kind_of(&obj),
            _ => None,
        })
    }

    pub fn is_error(&self, value: Value) -> Result<bool> {
        Ok(self.classify_error(value)?.is_some())
    }

    // === Internal channel ===

    /// Throw a new error of `kind` into script space; returns the
    /// [`Error::Thrown`] to propagate
    pub(crate) fn raise(&mut self, kind: ErrorKind, message: impl Into<String>) -> Error {
        let message = message.into();
        debug!(%kind, %message, "raising script error");
        let error = self.new_error_object(kind, None, JsValue::string(&message));
        self.set_pending(JsValue::Object(error));
        Error::Thrown
    }

    /// Raise a bridge failure from a native callback as a script error.
    /// `Thrown` already has its value pending and passes through.
    pub(crate) fn raise_bridge_error(&mut self, err: Error) -> Error {
        match err {
            Error::Thrown => Error::Thrown,
            other => {
                if self.is_exception_pending() {
                    return Error::Thrown;
                }
                self.raise(other.script_kind(), other.to_string())
            }
        }
    }

    pub(crate) fn set_pending(&mut self, value: JsValue) {
        trace!(exception = ?value, "exception pending");
        self.scopes.current_mut().pending_exception = Some(value);
    }

    pub(crate) fn ensure_no_pending(&self) -> Result<()> {
        if self.is_exception_pending() {
            Err(Error::PendingException)
        } else {
            Ok(())
        }
    }

    pub(crate) fn new_error_object(&self, kind: ErrorKind, code: Option<JsValue>, message: JsValue) -> ObjectRef {
        let mut error = Object::new(ObjectClass::Error(kind), Some(self.intrinsics.error_prototype(kind)));
        error.insert_property(
            PropertyKey::from("message"),
            Property::data(message, PropertyAttributes::DEFAULT_METHOD),
        );
        if let Some(code) = code {
            error.insert_property(
                PropertyKey::from("code"),
                Property::data(code, PropertyAttributes::DEFAULT_JS_PROPERTY),
            );
        }
        Rc::new(std::cell::RefCell::new(error))
    }

    pub(crate) fn error_kind_of(&self, obj: &ObjectRef) -> Option<ErrorKind> {
        for link in prototype_chain(obj) {
            for kind in ErrorKind::ALL {
                if Rc::ptr_eq(&link, &self.intrinsics.error_prototype(kind)) {
                    return Some(kind);
                }
            }
        }
        match obj.borrow().class {
            ObjectClass::Error(kind) => Some(kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_throw_any_value() {
        let mut env = Env::new();
        let thrown = env.string_utf8("Error").unwrap();
        env.throw(thrown).unwrap();
        assert!(env.is_exception_pending());
        let caught = env.get_and_clear_last_exception().unwrap();
        assert!(env.strict_equals(caught, thrown).unwrap());
        assert!(!env.is_exception_pending());
        assert_eq!(env.get_and_clear_last_exception(), None);
    }

    #[test]
    fn test_throw_while_pending_fails() {
        let mut env = Env::new();
        env.throw_error(None, "first").unwrap();
        assert_eq!(env.throw_error(None, "second"), Err(Error::PendingException));
        let e = env.get_and_clear_last_exception().unwrap();
        let message = env.get_named_property(e, "message").unwrap();
        assert_eq!(env.as_string(message).unwrap(), "first");
    }

    #[test]
    fn test_error_with_code() {
        let mut env = Env::new();
        let code = env.string_utf8("ERR_TEST_CODE").unwrap();
        let message = env.string_utf8("range went wrong").unwrap();
        let error = env.create_range_error(Some(code), message).unwrap();
        assert_eq!(env.classify_error(error).unwrap(), Some(ErrorKind::RangeError));
        let code = env.get_named_property(error, "code").unwrap();
        assert_eq!(env.as_string(code).unwrap(), "ERR_TEST_CODE");
        let name = env.get_named_property(error, "name").unwrap();
        assert_eq!(env.as_string(name).unwrap(), "RangeError");
        let key = env.string_utf8("message").unwrap();
        assert!(env.has_own_property(error, key).unwrap());
    }

    #[test]
    fn test_error_without_code_has_no_code_property() {
        let mut env = Env::new();
        let message = env.string_utf8("boom").unwrap();
        let error = env.create_error(None, message).unwrap();
        let key = env.string_utf8("code").unwrap();
        assert!(!env.has_property(error, key).unwrap());
    }

    #[test]
    fn test_create_error_rejects_non_string_message() {
        let mut env = Env::new();
        let message = env.int32(1);
        assert_eq!(env.create_error(None, message), Err(Error::wrong_type(ExpectedType::String)));
    }

    #[test]
    fn test_classify_all_kinds() {
        let mut env = Env::new();
        for kind in ErrorKind::ALL {
            let error = env.create_error_of_kind(kind, None, "m");
            assert_eq!(env.classify_error(error).unwrap(), Some(kind));
            let name = env.get_named_property(error, "name").unwrap();
            assert_eq!(env.as_string(name).unwrap(), kind.name());
        }
        let obj = env.object();
        assert_eq!(env.classify_error(obj).unwrap(), None);
        let s = env.string_utf8("Error").unwrap();
        assert!(!env.is_error(s).unwrap());
    }

    #[test]
    fn test_subclass_instance_is_error() {
        let mut env = Env::new();
        let base = env.create_error_of_kind(ErrorKind::TypeError, None, "m");
        let type_error_proto = env.get_prototype(base).unwrap();
        let sub_proto = env.object();
        env.set_prototype(sub_proto, type_error_proto).unwrap();
        let instance = env.object();
        env.set_prototype(instance, sub_proto).unwrap();
        assert!(env.is_error(instance).unwrap());
        assert_eq!(env.classify_error(instance).unwrap(), Some(ErrorKind::TypeError));
    }

    #[test]
    fn test_pending_moves_to_parent_scope() {
        let mut env = Env::new();
        let scope = env.open_handle_scope().unwrap();
        env.throw_type_error(None, "inner").unwrap();
        env.close_handle_scope(scope);
        assert!(env.is_exception_pending());
        let e = env.get_and_clear_last_exception().unwrap();
        assert_eq!(env.classify_error(e).unwrap(), Some(ErrorKind::TypeError));
    }

    #[test]
    fn test_cleared_inside_scope_stays_cleared() {
        let mut env = Env::new();
        env.with_scope(|env| {
            env.throw_error(None, "handled")?;
            env.get_and_clear_last_exception();
            Ok(())
        })
        .unwrap();
        assert!(!env.is_exception_pending());
    }
}
