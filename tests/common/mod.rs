//! Shared test helpers for integration tests

use quickbridge::{BridgeConfig, CallbackInfo, Env, Result, ThisCoercion, Value};

/// Signature of the native functions an add-on exports
pub type NativeFn = fn(&mut Env, &CallbackInfo) -> Result<Value>;

/// An environment using the given receiver binding rule
#[allow(dead_code)]
pub fn env_with(mode: ThisCoercion) -> Env {
    Env::with_config(BridgeConfig::default().with_this_coercion(mode))
}

/// Register `exports` as methods of a fresh object, the way an add-on's
/// init function fills in its exports
#[allow(dead_code)]
pub fn addon(env: &mut Env, exports: &[(&str, NativeFn)]) -> Value {
    let object = env.object();
    for (name, f) in exports {
        let function = env.create_function(Some(*name), *f);
        env.set_named_property(object, *name, function).unwrap();
    }
    object
}

/// Call `object.name(...args)`
#[allow(dead_code)]
pub fn call_method(env: &mut Env, object: Value, name: &str, args: &[Value]) -> Result<Value> {
    let method = env.get_named_property(object, name)?;
    env.call(method, object, args)
}

/// `{ key: value, ... }` with string values
#[allow(dead_code)]
pub fn object_of(env: &mut Env, entries: &[(&str, &str)]) -> Value {
    let object = env.object();
    for (key, value) in entries {
        let value = env.string_utf8(value).unwrap();
        env.set_named_property(object, *key, value).unwrap();
    }
    object
}

/// Take the pending exception and render it as a string
#[allow(dead_code)]
pub fn take_exception_string(env: &mut Env) -> String {
    let exception = env.get_and_clear_last_exception().expect("no exception pending");
    env.to_js_string(exception).unwrap()
}
