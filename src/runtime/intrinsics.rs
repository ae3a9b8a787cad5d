//! Intrinsic objects
//!
//! The minimal realm the bridge needs: `Object`, `Function`, `Array`, the
//! `Error` family, the primitive wrappers, `Symbol`, `Promise` and the
//! global object that exposes them.

use super::property::{Property, PropertyAttributes, PropertyKey};
use super::value::{JsValue, Object, ObjectClass, ObjectRef};
use super::Env;
use crate::callable::{function_object, link_prototype, Callable, CallableKind, Callback, CallbackInfo};
use crate::coerce::number_to_string;
use crate::error::{messages, ErrorKind, Result};
use crate::scope::Value;
use std::rc::Rc;

/// The realm's built-in objects
pub(crate) struct Intrinsics {
    pub global: ObjectRef,
    pub object_prototype: ObjectRef,
    pub function_prototype: ObjectRef,
    pub array_prototype: ObjectRef,
    /// Indexed by `ErrorKind as usize`
    error_prototypes: [ObjectRef; 7],
    pub boolean_prototype: ObjectRef,
    pub number_prototype: ObjectRef,
    pub string_prototype: ObjectRef,
    pub symbol_prototype: ObjectRef,
    pub bigint_prototype: ObjectRef,
    pub promise_prototype: ObjectRef,
}

impl Intrinsics {
    pub fn new() -> Self {
        let object_prototype = Object::alloc(ObjectClass::Ordinary, None);
        let ordinary = || Object::alloc(ObjectClass::Ordinary, Some(object_prototype.clone()));

        let function_prototype = ordinary();
        let array_prototype = Object::alloc(
            ObjectClass::Array { length: 0, length_writable: true },
            Some(object_prototype.clone()),
        );
        let error_base = ordinary();
        let error_prototypes = ErrorKind::ALL.map(|kind| match kind {
            ErrorKind::GenericError => error_base.clone(),
            _ => Object::alloc(ObjectClass::Ordinary, Some(error_base.clone())),
        });

        let intrinsics = Self {
            global: ordinary(),
            function_prototype,
            array_prototype,
            error_prototypes,
            boolean_prototype: ordinary(),
            number_prototype: ordinary(),
            string_prototype: ordinary(),
            symbol_prototype: ordinary(),
            bigint_prototype: ordinary(),
            promise_prototype: ordinary(),
            object_prototype,
        };
        intrinsics.register_object();
        intrinsics.register_function();
        intrinsics.register_array();
        intrinsics.register_errors();
        intrinsics.register_primitive_wrappers();
        intrinsics.register_symbol();
        intrinsics.register_promise();
        intrinsics.register_global_values();
        intrinsics
    }

    pub fn error_prototype(&self, kind: ErrorKind) -> ObjectRef {
        self.error_prototypes[kind as usize].clone()
    }

    /// Every intrinsic object; the error base prototype appears twice
    pub fn objects(&self) -> impl Iterator<Item = &ObjectRef> {
        [
            &self.global,
            &self.object_prototype,
            &self.function_prototype,
            &self.array_prototype,
            &self.boolean_prototype,
            &self.number_prototype,
            &self.string_prototype,
            &self.symbol_prototype,
            &self.bigint_prototype,
            &self.promise_prototype,
        ]
        .into_iter()
        .chain(self.error_prototypes.iter())
    }

    // === Registration helpers ===

    fn native(&self, name: &str, length: u32, kind: CallableKind, body: Callback) -> ObjectRef {
        function_object(Callable::new(kind, name, body, None), length, &self.function_prototype)
    }

    fn method(&self, target: &ObjectRef, name: &str, length: u32, body: Callback) {
        let function = self.native(name, length, CallableKind::Native { class: false }, body);
        define(target, name, JsValue::Object(function), PropertyAttributes::DEFAULT_METHOD);
    }

    fn getter(&self, target: &ObjectRef, name: &str, body: Callback) {
        let getter = self.native(name, 0, CallableKind::Native { class: false }, body);
        target.borrow_mut().insert_property(
            PropertyKey::from(name),
            Property::accessor(Some(getter), None, PropertyAttributes::CONFIGURABLE),
        );
    }

    /// Create a constructor, link it with `prototype` and expose it on the
    /// global object
    fn constructor(&self, name: &str, length: u32, kind: CallableKind, prototype: &ObjectRef, body: Callback) -> ObjectRef {
        let constructor = self.native(name, length, kind, body);
        link_prototype(&constructor, prototype, PropertyAttributes::empty());
        define(
            &self.global,
            name,
            JsValue::Object(constructor.clone()),
            PropertyAttributes::DEFAULT_METHOD,
        );
        constructor
    }

    // === Realm ===

    fn register_object(&self) {
        let proto = &self.object_prototype;
        self.method(proto, "toString", 0, Rc::new(object_to_string));
        self.method(proto, "valueOf", 0, Rc::new(object_value_of));
        self.method(proto, "hasOwnProperty", 1, Rc::new(object_has_own_property));
        self.constructor(
            "Object",
            1,
            CallableKind::Native { class: false },
            proto,
            Rc::new(object_constructor),
        );
    }

    fn register_function(&self) {
        self.method(&self.function_prototype, "toString", 0, Rc::new(function_to_string));
        self.constructor(
            "Function",
            1,
            CallableKind::Native { class: false },
            &self.function_prototype,
            Rc::new(|env: &mut Env, _: &CallbackInfo| -> Result<Value> {
                Err(env.raise(ErrorKind::EvalError, "Code generation from strings disallowed for this context"))
            }),
        );
    }

    fn register_array(&self) {
        let proto = &self.array_prototype;
        self.method(proto, "join", 1, Rc::new(array_join));
        self.method(proto, "toString", 0, Rc::new(array_to_string));
        self.method(proto, "push", 1, Rc::new(array_push));
        self.constructor(
            "Array",
            1,
            CallableKind::Native { class: false },
            proto,
            Rc::new(array_constructor),
        );
    }

    fn register_errors(&self) {
        for kind in ErrorKind::ALL {
            let proto = self.error_prototype(kind);
            define(&proto, "name", JsValue::string(kind.name()), PropertyAttributes::DEFAULT_METHOD);
            define(&proto, "message", JsValue::string(""), PropertyAttributes::DEFAULT_METHOD);
            if kind == ErrorKind::GenericError {
                self.method(&proto, "toString", 0, Rc::new(error_to_string));
            }
            self.constructor(
                kind.name(),
                1,
                CallableKind::Native { class: false },
                &proto,
                Rc::new(move |env: &mut Env, info: &CallbackInfo| error_constructor(env, info, kind)),
            );
        }
    }

    fn register_primitive_wrappers(&self) {
        let wrappers: [(&str, &ObjectRef, fn(&mut Env, &JsValue) -> Result<JsValue>); 3] = [
            ("Boolean", &self.boolean_prototype, |_, v| Ok(JsValue::Boolean(crate::coerce::to_boolean(v)))),
            ("Number", &self.number_prototype, |env, v| Ok(JsValue::Number(env.datum_to_number(v)?))),
            ("String", &self.string_prototype, |env, v| Ok(JsValue::String(env.datum_to_string(v)?))),
        ];
        for (name, proto, convert) in wrappers {
            self.method(proto, "valueOf", 0, Rc::new(primitive_value_of));
            self.method(proto, "toString", 0, Rc::new(primitive_to_string));
            self.constructor(
                name,
                1,
                CallableKind::Native { class: false },
                proto,
                Rc::new(move |env: &mut Env, info: &CallbackInfo| -> Result<Value> {
                    let argument = env.datum(info.arg(0))?;
                    let primitive = match (name, info.argc()) {
                        ("Number", 0) => JsValue::Number(0.0),
                        ("String", 0) => JsValue::string(""),
                        _ => convert(env, &argument)?,
                    };
                    if info.new_target().is_some() {
                        let boxed = env.datum_to_object(&primitive)?;
                        return Ok(env.handle(JsValue::Object(boxed)));
                    }
                    Ok(env.handle(primitive))
                }),
            );
        }
        self.method(&self.bigint_prototype, "valueOf", 0, Rc::new(primitive_value_of));
        self.method(&self.bigint_prototype, "toString", 0, Rc::new(primitive_to_string));
    }

    fn register_symbol(&self) {
        let proto = &self.symbol_prototype;
        self.method(proto, "valueOf", 0, Rc::new(primitive_value_of));
        self.method(proto, "toString", 0, Rc::new(symbol_to_string));
        self.getter(proto, "description", Rc::new(symbol_description));
        self.constructor(
            "Symbol",
            0,
            CallableKind::Native { class: false },
            proto,
            Rc::new(symbol_constructor),
        );
    }

    fn register_promise(&self) {
        self.method(&self.promise_prototype, "then", 2, Rc::new(crate::promise::then_native));
        self.constructor(
            "Promise",
            1,
            CallableKind::Native { class: true },
            &self.promise_prototype,
            Rc::new(crate::promise::constructor_native),
        );
    }

    fn register_global_values(&self) {
        let global = &self.global;
        define(global, "globalThis", JsValue::Object(global.clone()), PropertyAttributes::DEFAULT_METHOD);
        define(global, "undefined", JsValue::Undefined, PropertyAttributes::empty());
        define(global, "NaN", JsValue::Number(f64::NAN), PropertyAttributes::empty());
        define(global, "Infinity", JsValue::Number(f64::INFINITY), PropertyAttributes::empty());
    }
}

fn define(target: &ObjectRef, name: &str, value: JsValue, attributes: PropertyAttributes) {
    target
        .borrow_mut()
        .insert_property(PropertyKey::from(name), Property::data(value, attributes));
}

// === Object ===

fn object_to_string(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    let tag = match env.datum(info.this())? {
        JsValue::Undefined => "Undefined",
        JsValue::Null => "Null",
        this => {
            let obj = env.datum_to_object(&this)?;
            let tag = obj.borrow().class_name();
            tag
        }
    };
    Ok(env.handle(JsValue::string(&format!("[object {}]", tag))))
}

fn object_value_of(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    env.to_object(info.this())
}

fn object_has_own_property(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    let key = env.datum(info.arg(0))?;
    let key = env.to_property_key(&key)?;
    let this = env.datum(info.this())?;
    let obj = env.datum_to_object(&this)?;
    let has = obj.borrow().has_own_property(&key);
    Ok(env.boolean(has))
}

fn object_constructor(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    match env.datum(info.arg(0))? {
        JsValue::Undefined | JsValue::Null => Ok(env.object()),
        value => {
            let obj = env.datum_to_object(&value)?;
            Ok(env.handle(JsValue::Object(obj)))
        }
    }
}

// === Function ===

fn function_to_string(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    let name = match env.datum(info.this())? {
        JsValue::Object(obj) => obj.borrow().callable().map(|callable| callable.name().to_string()),
        _ => None,
    };
    match name {
        Some(name) => env.string_utf8(&format!("function {}() {{ [native code] }}", name)),
        None => Err(env.raise(
            ErrorKind::TypeError,
            "Function.prototype.toString requires that 'this' be a Function",
        )),
    }
}

// === Array ===

fn array_join(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    let separator = match env.datum(info.arg(0))? {
        JsValue::Undefined => Rc::from(","),
        separator => env.datum_to_string(&separator)?,
    };
    let joined = join_elements(env, info.this(), &separator)?;
    Ok(env.handle(JsValue::String(Rc::from(joined))))
}

fn array_to_string(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    let joined = join_elements(env, info.this(), ",")?;
    Ok(env.handle(JsValue::String(Rc::from(joined))))
}

fn join_elements(env: &mut Env, this: Value, separator: &str) -> Result<String> {
    let this = env.datum(this)?;
    let obj = env.datum_to_object(&this)?;
    let receiver = JsValue::Object(obj.clone());
    let length = env.get_datum(&obj, &PropertyKey::length(), &receiver)?;
    let length = crate::coerce::to_uint32(env.datum_to_number(&length)?);
    let mut joined = String::new();
    for index in 0..length {
        if index > 0 {
            joined.push_str(separator);
        }
        let element = env.get_datum(&obj, &PropertyKey::from_index(index), &receiver)?;
        if !element.is_nullish() {
            joined.push_str(&env.datum_to_string(&element)?);
        }
    }
    Ok(joined)
}

fn array_push(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    let obj = env.object_arg(info.this())?;
    let receiver = JsValue::Object(obj.clone());
    let length = env.get_datum(&obj, &PropertyKey::length(), &receiver)?;
    let mut length = crate::coerce::to_uint32(env.datum_to_number(&length)?);
    for arg in info.args() {
        let value = env.datum(*arg)?;
        env.set_datum(&obj, &PropertyKey::from_index(length), value)?;
        length += 1;
    }
    Ok(env.uint32(length))
}

fn array_constructor(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    if let [only] = info.args() {
        if let JsValue::Number(n) = env.datum(*only)? {
            let length = crate::coerce::to_uint32(n);
            if length as f64 != n {
                return Err(env.raise(ErrorKind::RangeError, messages::INVALID_ARRAY_LENGTH));
            }
            return env.array_with_length(length as u64);
        }
    }
    let array = env.new_array_object(0);
    for (index, arg) in info.args().iter().enumerate() {
        let value = env.datum(*arg)?;
        array.borrow_mut().insert_property(
            PropertyKey::from_index(index as u32),
            Property::data(value, PropertyAttributes::DEFAULT_JS_PROPERTY),
        );
    }
    Ok(env.handle(JsValue::Object(array)))
}

// === Errors ===

fn error_to_string(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    let obj = env.object_arg(info.this())?;
    let receiver = JsValue::Object(obj.clone());
    let name = match env.get_datum(&obj, &PropertyKey::from("name"), &receiver)? {
        JsValue::Undefined => Rc::from("Error"),
        name => env.datum_to_string(&name)?,
    };
    let message = match env.get_datum(&obj, &PropertyKey::from("message"), &receiver)? {
        JsValue::Undefined => Rc::from(""),
        message => env.datum_to_string(&message)?,
    };
    let text = match (name.is_empty(), message.is_empty()) {
        (true, _) => message.to_string(),
        (false, true) => name.to_string(),
        (false, false) => format!("{}: {}", name, message),
    };
    env.string_utf8(&text)
}

fn error_constructor(env: &mut Env, info: &CallbackInfo, kind: ErrorKind) -> Result<Value> {
    let message = match env.datum(info.arg(0))? {
        JsValue::Undefined => None,
        message => Some(JsValue::String(env.datum_to_string(&message)?)),
    };
    let has_message = message.is_some();
    let error = env.new_error_object(kind, None, message.unwrap_or(JsValue::Undefined));
    if !has_message {
        error.borrow_mut().remove_property(&PropertyKey::from("message"));
    }
    Ok(env.handle(JsValue::Object(error)))
}

// === Primitive wrappers ===

/// The primitive behind `this`: the value itself or a boxed primitive's
/// contents
fn this_primitive(env: &mut Env, info: &CallbackInfo) -> Result<JsValue> {
    match env.datum(info.this())? {
        JsValue::Object(obj) => {
            let boxed = match &obj.borrow().class {
                ObjectClass::Boxed(primitive) => Some(primitive.clone()),
                _ => None,
            };
            match boxed {
                Some(primitive) => Ok(primitive),
                None => Err(env.raise(ErrorKind::TypeError, "valueOf called on incompatible receiver")),
            }
        }
        primitive => Ok(primitive),
    }
}

fn primitive_value_of(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    let primitive = this_primitive(env, info)?;
    Ok(env.handle(primitive))
}

fn primitive_to_string(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    let text = match this_primitive(env, info)? {
        JsValue::Number(n) => number_to_string(n),
        JsValue::Symbol(sym) => format!("Symbol({})", sym.description().unwrap_or("")),
        primitive => env.datum_to_string(&primitive)?.to_string(),
    };
    env.string_utf8(&text)
}

// === Symbol ===

fn symbol_to_string(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    primitive_to_string(env, info)
}

fn symbol_description(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    match this_primitive(env, info)? {
        JsValue::Symbol(sym) => match sym.description() {
            Some(description) => env.string_utf8(description),
            None => Ok(env.undefined()),
        },
        _ => Err(env.raise(ErrorKind::TypeError, "Symbol.prototype.description requires a Symbol")),
    }
}

fn symbol_constructor(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    if info.new_target().is_some() {
        return Err(env.raise(ErrorKind::TypeError, messages::not_a_constructor("Symbol")));
    }
    let description = match env.datum(info.arg(0))? {
        JsValue::Undefined => None,
        description => Some(env.datum_to_string(&description)?),
    };
    Ok(env.new_symbol(description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValueType;

    fn global_function(env: &mut Env, name: &str) -> Value {
        let global = env.global();
        env.get_named_property(global, name).unwrap()
    }

    #[test]
    fn test_error_prototype_chain() {
        let intrinsics = Intrinsics::new();
        let type_error = intrinsics.error_prototype(ErrorKind::TypeError);
        let base = intrinsics.error_prototype(ErrorKind::GenericError);
        let parent = type_error.borrow().prototype.clone().unwrap();
        assert!(Rc::ptr_eq(&parent, &base));
    }

    #[test]
    fn test_global_exposes_constructors() {
        let mut env = Env::new();
        for name in ["Object", "Array", "Error", "TypeError", "RangeError", "Symbol", "Promise", "Number"] {
            let f = global_function(&mut env, name);
            assert_eq!(env.type_of(f).unwrap(), ValueType::Function, "{}", name);
        }
        let global = env.global();
        let global_this = env.get_named_property(global, "globalThis").unwrap();
        assert!(env.strict_equals(global, global_this).unwrap());
        assert!(env.own_keys(global).unwrap().is_empty());
    }

    #[test]
    fn test_error_constructor_without_new() {
        let mut env = Env::new();
        let range_error = global_function(&mut env, "RangeError");
        let undefined = env.undefined();
        let message = env.string_utf8("out of bounds").unwrap();
        let error = env.call(range_error, undefined, &[message]).unwrap();
        assert_eq!(env.classify_error(error).unwrap(), Some(ErrorKind::RangeError));
        let text = env.to_js_string(error).unwrap();
        assert_eq!(text, "RangeError: out of bounds");
    }

    #[test]
    fn test_array_constructor() {
        let mut env = Env::new();
        let array = global_function(&mut env, "Array");
        let three = env.int32(3);
        let holes = env.construct(array, &[three]).unwrap();
        assert_eq!(env.get_array_length(holes).unwrap(), 3);
        assert!(!env.has_element(holes, 0).unwrap());

        let a = env.string_utf8("a").unwrap();
        let b = env.string_utf8("b").unwrap();
        let items = env.construct(array, &[a, b]).unwrap();
        assert_eq!(env.to_js_string(items).unwrap(), "a,b");
    }

    #[test]
    fn test_boxed_wrappers() {
        let mut env = Env::new();
        let number = global_function(&mut env, "Number");
        let s = env.string_utf8("12").unwrap();
        let undefined = env.undefined();
        let converted = env.call(number, undefined, &[s]).unwrap();
        assert_eq!(env.as_double(converted).unwrap(), 12.0);
        let boxed = env.construct(number, &[s]).unwrap();
        assert_eq!(env.type_of(boxed).unwrap(), ValueType::Object);
        assert_eq!(env.to_number(boxed).unwrap(), 12.0);
    }

    #[test]
    fn test_symbol_not_constructible() {
        let mut env = Env::new();
        let symbol = global_function(&mut env, "Symbol");
        assert!(env.construct(symbol, &[]).is_err());
        env.get_and_clear_last_exception();
        let undefined = env.undefined();
        let description = env.string_utf8("tag").unwrap();
        let sym = env.call(symbol, undefined, &[description]).unwrap();
        assert_eq!(env.type_of(sym).unwrap(), ValueType::Symbol);
        let text = env.get_named_property(sym, "description").unwrap();
        assert_eq!(env.as_string(text).unwrap(), "tag");
    }

    #[test]
    fn test_function_to_string() {
        let mut env = Env::new();
        let f = env.create_function(Some("answer"), |env, _| Ok(env.int32(42)));
        assert_eq!(
            env.to_js_string(f).unwrap(),
            "function answer() { [native code] }"
        );
    }
}
