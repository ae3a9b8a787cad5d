//! Callable bridge
//!
//! Native functions and script functions share one representation: a
//! [`Callable`] whose body is a closure over the environment. They differ
//! only in their [`CallableKind`], which decides whether the function may be
//! constructed and whether it must be.
//!
//! ## Invocation
//!
//! Every invocation runs inside its own handle scope. The receiver, the
//! arguments and `new.target` are minted as handles in that scope and handed
//! to the body through [`CallbackInfo`]. When the body returns, either:
//! - an exception is pending: the call fails with [`Error::Thrown`] and the
//!   thrown value moves to the caller's scope untouched; or
//! - the body failed with a bridge error: it is raised as a script error
//!   of the matching kind; or
//! - the returned value is handed back to the caller.

use crate::config::ThisCoercion;
use crate::error::{messages, Error, ErrorKind, ExpectedType, Result};
use crate::object::PropertyDescriptor;
use crate::runtime::value::prototype_chain;
use crate::runtime::{Env, JsValue, Object, ObjectClass, ObjectRef, Property, PropertyAttributes, PropertyKey};
use crate::scope::Value;
use crate::wrap::NativeData;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

/// Body of a callable
pub type Callback = Rc<dyn Fn(&mut Env, &CallbackInfo) -> Result<Value>>;

/// Flavours of script-side functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFnKind {
    /// `function` declaration: callable and constructible
    Function,
    /// Arrow function: not constructible
    Arrow,
    /// Method shorthand: not constructible
    Method,
    /// `class` constructor: only constructible
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    /// Native function; `class` marks constructors made by `define_class`
    Native { class: bool },
    /// Script function
    Script(ScriptFnKind),
}

impl CallableKind {
    pub fn is_constructor(self) -> bool {
        match self {
            CallableKind::Native { .. } => true,
            CallableKind::Script(kind) => matches!(kind, ScriptFnKind::Function | ScriptFnKind::Class),
        }
    }

    pub fn requires_new(self) -> bool {
        matches!(
            self,
            CallableKind::Native { class: true } | CallableKind::Script(ScriptFnKind::Class)
        )
    }
}

/// Internal call slot of a function object
pub struct Callable {
    pub(crate) kind: CallableKind,
    pub(crate) name: Rc<str>,
    pub(crate) body: Callback,
    pub(crate) data: Option<NativeData>,
}

impl Callable {
    pub(crate) fn new(kind: CallableKind, name: &str, body: Callback, data: Option<NativeData>) -> Self {
        Self {
            kind,
            name: Rc::from(name),
            body,
            data,
        }
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// What a callable body receives: receiver, arguments, `new.target` and the
/// data the function was created with
pub struct CallbackInfo {
    this: Value,
    args: Vec<Value>,
    new_target: Option<Value>,
    data: Option<NativeData>,
    undefined: Value,
}

impl CallbackInfo {
    pub fn this(&self) -> Value {
        self.this
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Argument `index`, or `undefined` when fewer were passed
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).copied().unwrap_or(self.undefined)
    }

    pub fn argc(&self) -> usize {
        self.args.len()
    }

    /// The constructor `new` was applied to, `None` for plain calls
    pub fn new_target(&self) -> Option<Value> {
        self.new_target
    }

    pub fn data(&self) -> Option<&NativeData> {
        self.data.as_ref()
    }

    /// The function's data, downcast to its native type
    pub fn data_as<T: 'static>(&self) -> Option<&T> {
        self.data.as_ref().and_then(|data| data.downcast_ref::<T>())
    }
}

/// Allocate a function object with its `name` and `length` properties
pub(crate) fn function_object(callable: Callable, length: u32, function_prototype: &ObjectRef) -> ObjectRef {
    let name = callable.name.clone();
    let mut function = Object::new(ObjectClass::Function(callable), Some(function_prototype.clone()));
    function.insert_property(
        PropertyKey::from("length"),
        Property::data(JsValue::Number(length as f64), PropertyAttributes::CONFIGURABLE),
    );
    function.insert_property(
        PropertyKey::from("name"),
        Property::data(JsValue::String(name), PropertyAttributes::CONFIGURABLE),
    );
    Rc::new(RefCell::new(function))
}

/// Link `constructor.prototype` and `prototype.constructor`
pub(crate) fn link_prototype(constructor: &ObjectRef, prototype: &ObjectRef, prototype_attributes: PropertyAttributes) {
    constructor.borrow_mut().insert_property(
        PropertyKey::from("prototype"),
        Property::data(JsValue::Object(prototype.clone()), prototype_attributes),
    );
    prototype.borrow_mut().insert_property(
        PropertyKey::from("constructor"),
        Property::data(JsValue::Object(constructor.clone()), PropertyAttributes::DEFAULT_METHOD),
    );
}

impl Env {
    // === Creating functions ===

    /// A native function. Without a name it reports the empty string.
    pub fn create_function(
        &mut self,
        name: Option<&str>,
        f: impl Fn(&mut Env, &CallbackInfo) -> Result<Value> + 'static,
    ) -> Value {
        let function = self.new_native_function(name.unwrap_or(""), Rc::new(f), None);
        self.handle(JsValue::Object(function))
    }

    /// A native function whose body can reach `data` through
    /// [`CallbackInfo::data`]
    pub fn create_function_with_data(
        &mut self,
        name: Option<&str>,
        data: NativeData,
        f: impl Fn(&mut Env, &CallbackInfo) -> Result<Value> + 'static,
    ) -> Value {
        let function = self.new_native_function(name.unwrap_or(""), Rc::new(f), Some(data));
        self.handle(JsValue::Object(function))
    }

    /// A script-side function of the given kind. Constructible kinds get a
    /// fresh `prototype` object.
    pub fn create_script_function(
        &mut self,
        name: &str,
        kind: ScriptFnKind,
        f: impl Fn(&mut Env, &CallbackInfo) -> Result<Value> + 'static,
    ) -> Value {
        let callable = Callable::new(CallableKind::Script(kind), name, Rc::new(f), None);
        let function = function_object(callable, 0, &self.intrinsics.function_prototype);
        match kind {
            ScriptFnKind::Function => {
                let prototype = self.new_ordinary_object();
                link_prototype(&function, &prototype, PropertyAttributes::WRITABLE);
            }
            ScriptFnKind::Class => {
                let prototype = self.new_ordinary_object();
                link_prototype(&function, &prototype, PropertyAttributes::empty());
            }
            ScriptFnKind::Arrow | ScriptFnKind::Method => {}
        }
        self.handle(JsValue::Object(function))
    }

    /// Define a class backed by a native constructor. Descriptors go on the
    /// prototype, or on the constructor itself when marked `STATIC`.
    pub fn define_class(
        &mut self,
        name: &str,
        constructor: impl Fn(&mut Env, &CallbackInfo) -> Result<Value> + 'static,
        properties: &[PropertyDescriptor],
    ) -> Result<Value> {
        let callable = Callable::new(CallableKind::Native { class: true }, name, Rc::new(constructor), None);
        let class = function_object(callable, 0, &self.intrinsics.function_prototype);
        let prototype = self.new_ordinary_object();
        link_prototype(&class, &prototype, PropertyAttributes::empty());

        for descriptor in properties {
            let key = self.descriptor_key(&descriptor.name)?;
            let property = self.materialize_descriptor(&key, descriptor)?;
            let target = if descriptor.is_static() { &class } else { &prototype };
            self.define_datum(target, key, property)?;
        }
        trace!(class = name, properties = properties.len(), "defined class");
        Ok(self.handle(JsValue::Object(class)))
    }

    pub(crate) fn new_native_function(&self, name: &str, body: Callback, data: Option<NativeData>) -> ObjectRef {
        let callable = Callable::new(CallableKind::Native { class: false }, name, body, data);
        function_object(callable, 0, &self.intrinsics.function_prototype)
    }

    // === Calling ===

    /// Call `function` with the given receiver and arguments. How a
    /// receiver that is not an object is bound is decided by the
    /// environment's [`ThisCoercion`] capability.
    pub fn call(&mut self, function: Value, this: Value, args: &[Value]) -> Result<Value> {
        self.ensure_no_pending()?;
        let function = self.function_arg(function)?;
        let this = self.datum(this)?;
        let this = self.bind_this(this)?;
        let args = self.data_of(args)?;
        let result = self.invoke(&function, this, args, None)?;
        Ok(self.handle(result))
    }

    /// `new constructor(...args)`. The new object's prototype is
    /// `constructor.prototype`; an object returned by the constructor
    /// replaces it.
    pub fn construct(&mut self, constructor: Value, args: &[Value]) -> Result<Value> {
        self.ensure_no_pending()?;
        let constructor = self.function_arg(constructor)?;
        let args = self.data_of(args)?;
        let result = self.construct_datum(&constructor, args)?;
        Ok(self.handle(result))
    }

    /// `object instanceof constructor`
    pub fn instance_of(&mut self, object: Value, constructor: Value) -> Result<bool> {
        let constructor = self.function_arg(constructor)?;
        let JsValue::Object(obj) = self.datum(object)? else {
            return Ok(false);
        };
        let receiver = JsValue::Object(constructor.clone());
        let JsValue::Object(prototype) = self.get_datum(&constructor, &PropertyKey::from("prototype"), &receiver)?
        else {
            return Err(self.raise(
                ErrorKind::TypeError,
                "Function has non-object prototype in instanceof check",
            ));
        };
        let parent = obj.borrow().prototype.clone();
        Ok(parent.is_some_and(|parent| prototype_chain(&parent).any(|link| Rc::ptr_eq(&link, &prototype))))
    }

    pub(crate) fn construct_datum(&mut self, constructor: &ObjectRef, args: Vec<JsValue>) -> Result<JsValue> {
        let (constructible, name) = {
            let function = constructor.borrow();
            match function.callable() {
                Some(callable) => (callable.kind.is_constructor(), callable.name.clone()),
                None => (false, Rc::from("")),
            }
        };
        if !constructible {
            return Err(self.raise(ErrorKind::TypeError, messages::not_a_constructor(&name)));
        }
        let receiver = JsValue::Object(constructor.clone());
        let prototype = match self.get_datum(constructor, &PropertyKey::from("prototype"), &receiver)? {
            JsValue::Object(prototype) => prototype,
            _ => self.intrinsics.object_prototype.clone(),
        };
        let instance = Object::alloc(ObjectClass::Ordinary, Some(prototype));
        let result = self.invoke(
            constructor,
            JsValue::Object(instance.clone()),
            args,
            Some(constructor.clone()),
        )?;
        Ok(match result {
            JsValue::Object(_) => result,
            _ => JsValue::Object(instance),
        })
    }

    /// Run a callable's body under its own handle scope
    pub(crate) fn invoke(
        &mut self,
        function: &ObjectRef,
        this: JsValue,
        args: Vec<JsValue>,
        new_target: Option<ObjectRef>,
    ) -> Result<JsValue> {
        let (kind, name, body, data) = {
            let function = function.borrow();
            match function.callable() {
                Some(callable) => (
                    callable.kind,
                    callable.name.clone(),
                    callable.body.clone(),
                    callable.data.clone(),
                ),
                None => return Err(self.raise(ErrorKind::TypeError, messages::not_a_function("object"))),
            }
        };
        if kind.requires_new() && new_target.is_none() {
            return Err(self.raise(ErrorKind::TypeError, messages::class_without_new(&name)));
        }

        let scope = match self.open_handle_scope() {
            Ok(scope) => scope,
            Err(_) => return Err(self.raise(ErrorKind::RangeError, "Maximum call stack size exceeded")),
        };
        trace!(function = %name, argc = args.len(), construct = new_target.is_some(), "invoke");
        let info = CallbackInfo {
            this: self.handle(this),
            args: args.into_iter().map(|arg| self.handle(arg)).collect(),
            new_target: new_target.map(|target| self.handle(JsValue::Object(target))),
            data,
            undefined: self.handle(JsValue::Undefined),
        };
        let outcome = body(self, &info).and_then(|value| {
            if self.scopes.current().pending_exception.is_some() {
                Err(Error::Thrown)
            } else {
                self.datum(value)
            }
        });
        let result = outcome.map_err(|err| self.raise_bridge_error(err));
        self.close_handle_scope(scope);
        result
    }

    // === Helpers ===

    fn function_arg(&self, value: Value) -> Result<ObjectRef> {
        match self.datum(value)? {
            JsValue::Object(obj) if obj.borrow().callable().is_some() => Ok(obj),
            _ => Err(Error::wrong_type(ExpectedType::Function)),
        }
    }

    fn data_of(&self, values: &[Value]) -> Result<Vec<JsValue>> {
        values.iter().map(|value| self.datum(*value)).collect()
    }

    fn bind_this(&mut self, this: JsValue) -> Result<JsValue> {
        match (self.config.this_coercion, this) {
            (ThisCoercion::Passthrough, this) => Ok(this),
            (_, JsValue::Undefined | JsValue::Null) => Ok(JsValue::Object(self.intrinsics.global.clone())),
            (_, this @ JsValue::Object(_)) => Ok(this),
            (ThisCoercion::ObjectRequired, _) => Err(Error::wrong_type(ExpectedType::Object)),
            (ThisCoercion::Sloppy, primitive) => Ok(JsValue::Object(self.datum_to_object(&primitive)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BridgeConfig, ValueType};

    fn sum(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
        let mut total = 0.0;
        for arg in info.args() {
            total += env.as_double(*arg)?;
        }
        Ok(env.double(total))
    }

    #[test]
    fn test_call_native_variadic() {
        let mut env = Env::new();
        let f = env.create_function(Some("sum"), sum);
        let undefined = env.undefined();
        let args: Vec<Value> = (1..=4).map(|i| env.int32(i)).collect();
        let result = env.call(f, undefined, &args).unwrap();
        assert_eq!(env.as_double(result).unwrap(), 10.0);
    }

    #[test]
    fn test_default_name_is_empty() {
        let mut env = Env::new();
        let f = env.create_function(None, sum);
        let name = env.get_named_property(f, "name").unwrap();
        assert_eq!(env.as_string(name).unwrap(), "");
        let long = "a".repeat(300);
        let g = env.create_function(Some(&long), sum);
        let name = env.get_named_property(g, "name").unwrap();
        assert_eq!(env.as_string(name).unwrap(), long);
    }

    #[test]
    fn test_missing_args_read_undefined() {
        let mut env = Env::new();
        let f = env.create_function(None, |env, info| {
            assert_eq!(info.argc(), 0);
            let t = env.type_of(info.arg(3))?;
            Ok(env.string_utf8(t.type_of())?)
        });
        let undefined = env.undefined();
        let r = env.call(f, undefined, &[]).unwrap();
        assert_eq!(env.as_string(r).unwrap(), "undefined");
    }

    fn receiver_type(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
        let t = env.type_of(info.this())?;
        env.string_utf8(t.type_of())
    }

    #[test]
    fn test_this_sloppy_binds_global_and_boxes() {
        let mut env = Env::new();
        let f = env.create_function(None, |env, info| {
            let global = env.global();
            let bound_to_global = env.strict_equals(info.this(), global)?;
            Ok(env.boolean(bound_to_global))
        });
        let null = env.null();
        let r = env.call(f, null, &[]).unwrap();
        assert!(env.as_bool(r).unwrap());

        let g = env.create_function(None, receiver_type);
        let n = env.int32(1);
        let r = env.call(g, n, &[]).unwrap();
        assert_eq!(env.as_string(r).unwrap(), "object");
    }

    #[test]
    fn test_this_object_required_rejects_primitives() {
        let mut env = Env::with_config(BridgeConfig::default().with_this_coercion(ThisCoercion::ObjectRequired));
        let g = env.create_function(None, receiver_type);
        let n = env.int32(1);
        assert_eq!(env.call(g, n, &[]), Err(Error::wrong_type(ExpectedType::Object)));
        let undefined = env.undefined();
        let r = env.call(g, undefined, &[]).unwrap();
        assert_eq!(env.as_string(r).unwrap(), "object");
    }

    #[test]
    fn test_this_passthrough() {
        let mut env = Env::with_config(BridgeConfig::default().with_this_coercion(ThisCoercion::Passthrough));
        let g = env.create_function(None, receiver_type);
        let undefined = env.undefined();
        let r = env.call(g, undefined, &[]).unwrap();
        assert_eq!(env.as_string(r).unwrap(), "undefined");
    }

    #[test]
    fn test_thrown_value_keeps_identity() {
        let mut env = Env::new();
        let payload = env.object();
        let f = env.create_function_with_data(None, Rc::new(()), move |env, _| {
            env.throw(payload)?;
            Ok(env.undefined())
        });
        let undefined = env.undefined();
        assert_eq!(env.call(f, undefined, &[]), Err(Error::Thrown));
        let caught = env.get_and_clear_last_exception().unwrap();
        assert!(env.strict_equals(caught, payload).unwrap());
    }

    #[test]
    fn test_bridge_error_becomes_script_error() {
        let mut env = Env::new();
        let f = env.create_function(None, |env, info| {
            let n = env.as_double(info.arg(0))?;
            Ok(env.double(n))
        });
        let undefined = env.undefined();
        let s = env.string_utf8("x").unwrap();
        assert_eq!(env.call(f, undefined, &[s]), Err(Error::Thrown));
        let e = env.get_and_clear_last_exception().unwrap();
        assert_eq!(env.classify_error(e).unwrap(), Some(ErrorKind::TypeError));
        let message = env.get_named_property(e, "message").unwrap();
        assert_eq!(env.as_string(message).unwrap(), "A number was expected");
    }

    #[test]
    fn test_call_with_pending_exception_fails() {
        let mut env = Env::new();
        let f = env.create_function(None, sum);
        env.throw_error(None, "pending").unwrap();
        let undefined = env.undefined();
        assert_eq!(env.call(f, undefined, &[]), Err(Error::PendingException));
        env.get_and_clear_last_exception();
    }

    #[test]
    fn test_construct_uses_prototype_and_new_target() {
        let mut env = Env::new();
        let ctor = env.create_script_function("Point", ScriptFnKind::Function, |env, info| {
            assert!(info.new_target().is_some());
            let x = info.arg(0);
            env.set_named_property(info.this(), "x", x)?;
            Ok(env.undefined())
        });
        let three = env.int32(3);
        let instance = env.construct(ctor, &[three]).unwrap();
        let x = env.get_named_property(instance, "x").unwrap();
        assert_eq!(env.as_int32(x).unwrap(), 3);
        assert!(env.instance_of(instance, ctor).unwrap());
        let plain = env.object();
        assert!(!env.instance_of(plain, ctor).unwrap());
    }

    #[test]
    fn test_construct_returned_object_wins() {
        let mut env = Env::new();
        let replacement = env.object();
        let ctor = env.create_script_function("Factory", ScriptFnKind::Function, move |_, _| Ok(replacement));
        let instance = env.construct(ctor, &[]).unwrap();
        assert!(env.strict_equals(instance, replacement).unwrap());
    }

    #[test]
    fn test_arrow_is_not_constructor() {
        let mut env = Env::new();
        let arrow = env.create_script_function("arrow", ScriptFnKind::Arrow, |env, _| Ok(env.undefined()));
        assert_eq!(env.construct(arrow, &[]), Err(Error::Thrown));
        let e = env.get_and_clear_last_exception().unwrap();
        assert_eq!(env.classify_error(e).unwrap(), Some(ErrorKind::TypeError));
    }

    #[test]
    fn test_class_requires_new() {
        let mut env = Env::new();
        let class = env.define_class("Thing", |_, info| Ok(info.this()), &[]).unwrap();
        let undefined = env.undefined();
        assert_eq!(env.call(class, undefined, &[]), Err(Error::Thrown));
        let e = env.get_and_clear_last_exception().unwrap();
        let message = env.get_named_property(e, "message").unwrap();
        assert_eq!(
            env.as_string(message).unwrap(),
            "Class constructor Thing cannot be invoked without 'new'"
        );
    }

    #[test]
    fn test_define_class_static_and_instance() {
        let mut env = Env::new();
        let class = env
            .define_class(
                "Counter",
                |env, info| {
                    let zero = env.int32(0);
                    env.set_named_property(info.this(), "count", zero)?;
                    Ok(info.this())
                },
                &[
                    PropertyDescriptor::method("increment", |env, info| {
                        let current = env.get_named_property(info.this(), "count")?;
                        let next = env.as_int32(current)? + 1;
                        let next = env.int32(next);
                        env.set_named_property(info.this(), "count", next)?;
                        Ok(next)
                    })
                    .with_attributes(PropertyAttributes::DEFAULT_METHOD),
                    PropertyDescriptor::method("create", |env, _| Ok(env.object()))
                        .with_attributes(PropertyAttributes::STATIC),
                ],
            )
            .unwrap();
        let instance = env.construct(class, &[]).unwrap();
        let increment = env.get_named_property(instance, "increment").unwrap();
        env.call(increment, instance, &[]).unwrap();
        let count = env.call(increment, instance, &[]).unwrap();
        assert_eq!(env.as_int32(count).unwrap(), 2);

        let create = env.get_named_property(class, "create").unwrap();
        assert_eq!(env.type_of(create).unwrap(), ValueType::Function);
        let missing = env.get_named_property(instance, "create").unwrap();
        assert_eq!(env.type_of(missing).unwrap(), ValueType::Undefined);

        let prototype = env.get_named_property(class, "prototype").unwrap();
        assert_eq!(env.own_keys(prototype).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_reentrant_calls() {
        let mut env = Env::new();
        let inner = env.create_function(Some("inner"), |env, info| {
            let n = env.as_int32(info.arg(0))?;
            Ok(env.int32(n * 2))
        });
        let outer = env.create_function_with_data(Some("outer"), Rc::new(()), move |env, info| {
            let this = info.this();
            env.call(inner, this, info.args())
        });
        let undefined = env.undefined();
        let five = env.int32(5);
        let depth = env.scope_depth();
        let r = env.call(outer, undefined, &[five]).unwrap();
        assert_eq!(env.as_int32(r).unwrap(), 10);
        assert_eq!(env.scope_depth(), depth);
    }

    #[test]
    fn test_call_requires_function() {
        let mut env = Env::new();
        let obj = env.object();
        let undefined = env.undefined();
        assert_eq!(env.call(obj, undefined, &[]), Err(Error::wrong_type(ExpectedType::Function)));
    }
}
