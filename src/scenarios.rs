//! Built-in conformance scenarios
//!
//! Each scenario drives the bridge the way a native add-on would and checks
//! the observable behavior. A scenario fails by returning an error or by
//! leaving an exception pending.

use anyhow::{bail, ensure, Context, Result};
use quickbridge::{finalizer, Env, Error, ErrorKind, PropertyAttributes, ScriptFnKind, StringCopy, ThisCoercion, Value, ValueType};
use std::cell::Cell;
use std::rc::Rc;

pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub run: fn(&mut Env) -> Result<()>,
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "number-identity",
        description: "Numbers keep Object.is identity across the boundary",
        run: number_identity,
    },
    Scenario {
        name: "integer-truncation",
        description: "Strict integer accessors truncate toward zero",
        run: integer_truncation,
    },
    Scenario {
        name: "truthiness",
        description: "Boolean coercion follows the falsy table exactly",
        run: truthiness,
    },
    Scenario {
        name: "property-deletion",
        description: "Non-configurable properties survive delete; shadowing falls through",
        run: property_deletion,
    },
    Scenario {
        name: "wrap-lifecycle",
        description: "Wrap slots are exclusive, removable and leave the prototype alone",
        run: wrap_lifecycle,
    },
    Scenario {
        name: "string-truncation",
        description: "Insufficient buffers never receive a partial character",
        run: string_truncation,
    },
    Scenario {
        name: "symbol-identity",
        description: "Symbols are unique keys excluded from enumeration",
        run: symbol_identity,
    },
    Scenario {
        name: "object-properties",
        description: "Own and inherited property lookups",
        run: object_properties,
    },
    Scenario {
        name: "thrown-values",
        description: "Values thrown by constructors propagate unmodified",
        run: thrown_values,
    },
    Scenario {
        name: "error-taxonomy",
        description: "Error kinds, codes and subclass classification",
        run: error_taxonomy,
    },
    Scenario {
        name: "this-coercion",
        description: "Receiver binding follows the configured capability",
        run: this_coercion,
    },
    Scenario {
        name: "promise-settlement",
        description: "Deferred resolution runs reactions on the next turn",
        run: promise_settlement,
    },
];

fn number_identity(env: &mut Env) -> Result<()> {
    for n in [0.0, -0.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 9_007_199_254_740_993.0, 1e300] {
        let value = env.double(n);
        let back = env.to_number(value)?;
        let again = env.double(back);
        ensure!(env.same_value(value, again)?, "{} lost its identity", n);
    }
    let big = env.bigint_i64(i64::MAX);
    let (value, lossless) = env.get_value_bigint_i64(big)?;
    ensure!(value == i64::MAX && lossless, "BigInt lost precision");
    Ok(())
}

fn integer_truncation(env: &mut Env) -> Result<()> {
    let v = env.double(1.9);
    ensure!(env.as_int32(v)? == 1, "as_int32(1.9) != 1");
    let v = env.double(-1.0);
    ensure!(env.as_int32(v)? == -1, "as_int32(-1) != -1");
    ensure!(env.as_uint32(v)? == u32::MAX, "as_uint32(-1) != 2^32 - 1");
    let v = env.double(999.9);
    ensure!(env.as_int64(v)? == 999, "as_int64(999.9) != 999");
    let s = env.string_utf8("1")?;
    ensure!(
        env.as_int32(s).is_err(),
        "strict accessor accepted a string"
    );
    Ok(())
}

fn truthiness(env: &mut Env) -> Result<()> {
    let truthy = [env.object(), env.array(), env.string_utf8("false")?, env.symbol(None)];
    for value in truthy {
        ensure!(env.to_bool(value)?, "expected a truthy value");
    }
    let falsy = [
        env.boolean(false),
        env.undefined(),
        env.null(),
        env.double(0.0),
        env.double(f64::NAN),
        env.string_utf8("")?,
    ];
    for value in falsy {
        ensure!(!env.to_bool(value)?, "expected a falsy value");
    }
    Ok(())
}

fn property_deletion(env: &mut Env) -> Result<()> {
    let obj = env.object();
    let key = env.string_utf8("fixed")?;
    let value = env.int32(1);
    env.define_property(obj, key, value, PropertyAttributes::WRITABLE | PropertyAttributes::ENUMERABLE)?;
    ensure!(!env.delete_property(obj, key)?, "deleted a non-configurable property");
    ensure!(env.has_own_property(obj, key)?, "non-configurable property vanished");

    let proto = env.object();
    let from_proto = env.string_utf8("proto")?;
    env.set_named_property(proto, "shadowed", from_proto)?;
    let instance = env.object();
    env.set_prototype(instance, proto)?;
    let own = env.string_utf8("own")?;
    env.set_named_property(instance, "shadowed", own)?;
    let key = env.string_utf8("shadowed")?;
    ensure!(env.delete_property(instance, key)?, "delete of shadowing property failed");
    let read = env.get_named_property(instance, "shadowed")?;
    ensure!(env.as_string(read)? == "proto", "read did not fall through");
    Ok(())
}

fn wrap_lifecycle(env: &mut Env) -> Result<()> {
    let proto = env.object();
    let obj = env.object();
    env.set_prototype(obj, proto)?;
    let finalized = Rc::new(Cell::new(false));
    let flag = finalized.clone();
    env.wrap(obj, Rc::new(7u32), Some(finalizer(move |_, _| flag.set(true))))?;
    ensure!(
        env.wrap(obj, Rc::new(8u32), None) == Err(Error::AlreadyWrapped),
        "double wrap was accepted"
    );
    let data = env.remove_wrap(obj)?;
    ensure!(data.downcast_ref::<u32>() == Some(&7), "wrong data came back");
    env.wrap(obj, Rc::new(9u32), None)?;
    env.remove_wrap(obj)?;
    let actual = env.get_prototype(obj)?;
    ensure!(env.strict_equals(actual, proto)?, "wrapping changed the prototype");
    env.run_finalizers();
    ensure!(!finalized.get(), "removed wrap was finalized");
    Ok(())
}

fn string_truncation(env: &mut Env) -> Result<()> {
    let value = env.string_utf8("😀")?;
    let mut buf = [0u8; 4];
    let copy = env.get_value_string_utf8(value, &mut buf)?;
    ensure!(
        copy == StringCopy { written: 0, truncated: true },
        "partial character emitted: {:?}",
        copy
    );
    let value = env.string_utf8("hello world")?;
    let copy = env.get_value_string_utf8(value, &mut buf)?;
    ensure!(&buf[..copy.written] == b"hel", "expected three characters");
    ensure!(env.utf16_length(value)? == 11, "utf16 length");
    Ok(())
}

fn symbol_identity(env: &mut Env) -> Result<()> {
    let a = env.symbol(Some("foo"));
    let b = env.symbol(Some("foo"));
    ensure!(!env.strict_equals(a, b)?, "symbols with equal descriptions are equal");
    let obj = env.object();
    let value = env.int32(42);
    env.set_property(obj, a, value)?;
    ensure!(env.own_keys(obj)?.is_empty(), "symbol key was enumerated");
    let read = env.get_property(obj, a)?;
    ensure!(env.as_int32(read)? == 42, "symbol lookup failed");
    let missing = env.get_property(obj, b)?;
    ensure!(env.type_of(missing)? == ValueType::Undefined, "distinct symbol matched");
    Ok(())
}

fn object_properties(env: &mut Env) -> Result<()> {
    let obj = env.object();
    let world = env.string_utf8("world")?;
    env.set_named_property(obj, "hello", world)?;
    let read = env.get_named_property(obj, "hello")?;
    ensure!(env.as_string(read)? == "world", "get returned the wrong value");

    let proto = env.object();
    let answer = env.int32(42);
    env.set_named_property(proto, "bar", answer)?;
    let child = env.object();
    env.set_prototype(child, proto)?;
    let key = env.string_utf8("bar")?;
    ensure!(!env.has_own_property(child, key)?, "inherited key reported as own");
    ensure!(env.has_property(child, key)?, "inherited key not found");
    Ok(())
}

fn thrown_values(env: &mut Env) -> Result<()> {
    let candidates = [env.null(), env.string_utf8("Error")?, env.object()];
    for thrown in candidates {
        let class = env.create_script_function("Thrower", ScriptFnKind::Class, move |env, _| {
            env.throw(thrown)?;
            Err(Error::Thrown)
        });
        match env.construct(class, &[]) {
            Err(Error::Thrown) => {}
            other => bail!("construct did not throw: {:?}", other),
        }
        let caught = env
            .get_and_clear_last_exception()
            .context("no exception pending after a throwing construct")?;
        ensure!(env.strict_equals(caught, thrown)?, "thrown value changed identity");
    }
    Ok(())
}

fn error_taxonomy(env: &mut Env) -> Result<()> {
    for kind in ErrorKind::ALL {
        let error = env.create_error_of_kind(kind, Some("ERR_CODE"), "message");
        ensure!(env.classify_error(error)? == Some(kind), "{} misclassified", kind);
        let code = env.get_named_property(error, "code")?;
        ensure!(env.as_string(code)? == "ERR_CODE", "code property missing");
    }
    let base = env.create_error_of_kind(ErrorKind::GenericError, None, "base");
    let error_proto = env.get_prototype(base)?;
    let sub_proto = env.object();
    env.set_prototype(sub_proto, error_proto)?;
    let instance = env.object();
    env.set_prototype(instance, sub_proto)?;
    ensure!(env.is_error(instance)?, "subclass instance is not an error");
    Ok(())
}

fn this_coercion(env: &mut Env) -> Result<()> {
    let receiver = env.create_function(Some("receiver"), |_, info| Ok(info.this()));
    let undefined = env.undefined();
    let bound = env.call(receiver, undefined, &[])?;
    let global = env.global();
    let primitive = env.int32(5);
    match env.capabilities().this_coercion {
        ThisCoercion::Passthrough => {
            ensure!(env.type_of(bound)? == ValueType::Undefined, "undefined receiver was rebound");
            let bound = env.call(receiver, primitive, &[])?;
            ensure!(env.type_of(bound)? == ValueType::Number, "primitive receiver was boxed");
        }
        ThisCoercion::Sloppy => {
            ensure!(env.strict_equals(bound, global)?, "undefined receiver did not bind the global");
            let bound = env.call(receiver, primitive, &[])?;
            ensure!(env.type_of(bound)? == ValueType::Object, "primitive receiver was not boxed");
        }
        ThisCoercion::ObjectRequired => {
            ensure!(env.strict_equals(bound, global)?, "undefined receiver did not bind the global");
            ensure!(
                env.call(receiver, primitive, &[]).is_err(),
                "primitive receiver was accepted"
            );
        }
    }
    Ok(())
}

fn promise_settlement(env: &mut Env) -> Result<()> {
    let seen = Rc::new(Cell::new(0));
    let sink = seen.clone();
    let on_fulfilled = env.create_function(Some("onFulfilled"), move |env, info| {
        sink.set(env.as_int32(info.arg(0))?);
        Ok(info.arg(0))
    });
    let (deferred, promise) = env.create_promise();
    let derived = env.then(promise, Some(on_fulfilled), None)?;
    let value = env.int32(42);
    env.resolve_deferred(deferred, value)?;
    ensure!(seen.get() == 0, "reaction ran synchronously");
    env.run_microtasks();
    ensure!(seen.get() == 42, "reaction did not run");
    let result = env.promise_result(derived)?.context("derived promise is pending")?;
    ensure!(env.as_int32(result)? == 42, "derived promise has the wrong value");
    Ok(())
}

/// Render a pending exception for the failure report
pub fn describe_exception(env: &mut Env, exception: Value) -> String {
    match env.to_js_string(exception) {
        Ok(text) => text,
        Err(_) => {
            env.get_and_clear_last_exception();
            format!("<{}>", env.type_of(exception).map(ValueType::type_of).unwrap_or("value"))
        }
    }
}
