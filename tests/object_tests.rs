//! Property model: lookups, deletion, definition, enumeration, prototypes

mod common;
use common::object_of;
use pretty_assertions::assert_eq;
use quickbridge::{
    Env, Error, ExpectedType, KeyCollectionMode, KeyConversion, KeyFilter, PropertyAttributes, PropertyDescriptor,
    ValueType,
};

mod lookups {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_own_value() {
        let mut env = Env::new();
        let obj = object_of(&mut env, &[("hello", "world")]);
        let value = env.get_named_property(obj, "hello").unwrap();
        assert_eq!(env.as_string(value).unwrap(), "world");
    }

    #[test]
    fn test_has_walks_the_chain_has_own_does_not() {
        let mut env = Env::new();
        let proto = env.object();
        let answer = env.int32(42);
        env.set_named_property(proto, "foo", answer).unwrap();
        let obj = env.object();
        env.set_prototype(obj, proto).unwrap();

        let key = env.string_utf8("foo").unwrap();
        assert!(env.has_property(obj, key).unwrap());
        assert!(!env.has_own_property(obj, key).unwrap());
        let bar = env.string_utf8("bar").unwrap();
        assert!(!env.has_property(obj, bar).unwrap());
        let inherited = env.get_property(obj, key).unwrap();
        assert_eq!(env.as_int32(inherited).unwrap(), 42);
    }

    #[test]
    fn test_named_verbs_agree_on_primitive_receivers() {
        let mut env = Env::new();
        let s = env.string_utf8("abc").unwrap();
        let method = env.get_named_property(s, "toString").unwrap();
        assert_eq!(env.type_of(method).unwrap(), ValueType::Function);
        assert!(env.has_named_property(s, "toString").unwrap());
        assert!(!env.has_named_property(s, "missing").unwrap());
        let key = env.string_utf8("valueOf").unwrap();
        assert!(env.has_property(s, key).unwrap());

        let undefined = env.undefined();
        assert_eq!(
            env.has_named_property(undefined, "toString"),
            Err(Error::wrong_type(ExpectedType::Object))
        );
        assert_eq!(
            env.get_named_property(undefined, "toString"),
            Err(Error::wrong_type(ExpectedType::Object))
        );
    }

    #[test]
    fn test_has_own_requires_name_key() {
        let mut env = Env::new();
        let obj = env.object();
        let key = env.int32(1);
        assert_eq!(env.has_own_property(obj, key), Err(Error::WrongKeyType));
    }

    #[test]
    fn test_numeric_keys_are_normalized() {
        let mut env = Env::new();
        let array = env.array();
        let value = env.string_utf8("x").unwrap();
        let key = env.double(2.0);
        env.set_property(array, key, value).unwrap();
        assert_eq!(env.get_array_length(array).unwrap(), 3);
        let element = env.get_element(array, 2).unwrap();
        assert_eq!(env.as_string(element).unwrap(), "x");
    }
}

mod deletion {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_non_configurable_property_survives() {
        let mut env = Env::new();
        let obj = env.object();
        let key = env.string_utf8("pinned").unwrap();
        let value = env.int32(1);
        env.define_property(obj, key, value, PropertyAttributes::WRITABLE | PropertyAttributes::ENUMERABLE)
            .unwrap();
        assert!(!env.delete_property(obj, key).unwrap());
        assert!(env.has_own_property(obj, key).unwrap());
    }

    #[test]
    fn test_deleting_shadow_falls_through_to_prototype() {
        let mut env = Env::new();
        let proto = object_of(&mut env, &[("name", "proto")]);
        let obj = env.object();
        env.set_prototype(obj, proto).unwrap();
        let own = env.string_utf8("own").unwrap();
        env.set_named_property(obj, "name", own).unwrap();

        let key = env.string_utf8("name").unwrap();
        assert!(env.delete_property(obj, key).unwrap());
        let read = env.get_named_property(obj, "name").unwrap();
        assert_eq!(env.as_string(read).unwrap(), "proto");
        // nothing own left to delete
        assert!(env.delete_property(obj, key).unwrap());
        let read = env.get_named_property(obj, "name").unwrap();
        assert_eq!(env.as_string(read).unwrap(), "proto");
    }

    #[test]
    fn test_delete_element_leaves_hole() {
        let mut env = Env::new();
        let array = env.array();
        for index in 0..3 {
            let value = env.uint32(index);
            env.set_element(array, index, value).unwrap();
        }
        assert!(env.delete_element(array, 1).unwrap());
        assert_eq!(env.get_array_length(array).unwrap(), 3);
        assert!(!env.has_element(array, 1).unwrap());
        let hole = env.get_element(array, 1).unwrap();
        assert_eq!(env.type_of(hole).unwrap(), ValueType::Undefined);
    }
}

mod elements {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_element_bounds() {
        let mut env = Env::new();
        let array = env.array_with_length(2).unwrap();
        assert_eq!(
            env.get_element(array, 2),
            Err(Error::IndexOutOfRange { index: 2, length: 2 })
        );
        assert_eq!(
            env.get_element(array, -1),
            Err(Error::IndexOutOfRange { index: -1, length: 2 })
        );
        assert!(!env.has_element(array, -1).unwrap());
        assert!(!env.has_element(array, 1 << 40).unwrap());
    }

    #[test]
    fn test_array_length_requires_array() {
        let mut env = Env::new();
        let obj = env.object();
        assert!(env.get_array_length(obj).is_err());
        assert!(!env.is_array(obj).unwrap());
        let array = env.array();
        assert!(env.is_array(array).unwrap());
    }
}

mod definition {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    #[test]
    fn test_plain_set_is_enumerable_writable_configurable() {
        let mut env = Env::new();
        let obj = object_of(&mut env, &[("a", "1")]);
        let key = env.string_utf8("a").unwrap();
        let descriptor = env.get_own_property_descriptor(obj, key).unwrap().unwrap();
        assert_eq!(descriptor.attributes, PropertyAttributes::DEFAULT_JS_PROPERTY);
    }

    #[test]
    fn test_read_only_assignment_is_ignored() {
        let mut env = Env::new();
        let obj = env.object();
        let value = env.int32(1);
        env.define_properties(obj, &[PropertyDescriptor::value("fixed", value)]).unwrap();
        let other = env.int32(2);
        env.set_named_property(obj, "fixed", other).unwrap();
        let read = env.get_named_property(obj, "fixed").unwrap();
        assert_eq!(env.as_int32(read).unwrap(), 1);
    }

    #[test]
    fn test_accessors_and_methods() {
        let mut env = Env::new();
        let obj = env.object();
        let store = Rc::new(std::cell::Cell::new(0));
        let (get_store, set_store) = (store.clone(), store.clone());
        env.define_properties(
            obj,
            &[
                PropertyDescriptor::getter("value", move |env, _| Ok(env.int32(get_store.get())))
                    .with_setter(move |env, info| {
                        set_store.set(env.as_int32(info.arg(0))?);
                        Ok(env.undefined())
                    })
                    .with_attributes(PropertyAttributes::ENUMERABLE),
                PropertyDescriptor::method("double", |env, info| {
                    let this = info.this();
                    let n = env.get_named_property(this, "value")?;
                    let n = env.as_int32(n)?;
                    Ok(env.int32(n * 2))
                }),
            ],
        )
        .unwrap();

        let seven = env.int32(7);
        env.set_named_property(obj, "value", seven).unwrap();
        assert_eq!(store.get(), 7);
        let doubled = common::call_method(&mut env, obj, "double", &[]).unwrap();
        assert_eq!(env.as_int32(doubled).unwrap(), 14);
        assert_eq!(env.own_keys(obj).unwrap(), vec!["value".to_string()]);
    }

    #[test]
    fn test_writable_flag_ignored_for_accessors() {
        let mut env = Env::new();
        let obj = env.object();
        env.define_properties(
            obj,
            &[PropertyDescriptor::getter("constant", |env, _| Ok(env.int32(5)))
                .with_attributes(PropertyAttributes::WRITABLE | PropertyAttributes::ENUMERABLE)],
        )
        .unwrap();
        let other = env.int32(6);
        env.set_named_property(obj, "constant", other).unwrap();
        let read = env.get_named_property(obj, "constant").unwrap();
        assert_eq!(env.as_int32(read).unwrap(), 5);
        let key = env.string_utf8("constant").unwrap();
        let descriptor = env.get_own_property_descriptor(obj, key).unwrap().unwrap();
        assert!(descriptor.getter.is_some());
        assert!(descriptor.value.is_none());
        assert!(!descriptor.attributes.writable());
    }

    #[test]
    fn test_freeze_and_seal() {
        let mut env = Env::new();
        let frozen = object_of(&mut env, &[("a", "1")]);
        env.object_freeze(frozen).unwrap();
        let changed = env.string_utf8("2").unwrap();
        env.set_named_property(frozen, "a", changed).unwrap();
        env.set_named_property(frozen, "b", changed).unwrap();
        let read = env.get_named_property(frozen, "a").unwrap();
        assert_eq!(env.as_string(read).unwrap(), "1");
        assert!(!env.has_named_property(frozen, "b").unwrap());

        let sealed = object_of(&mut env, &[("a", "1")]);
        env.object_seal(sealed).unwrap();
        env.set_named_property(sealed, "a", changed).unwrap();
        let read = env.get_named_property(sealed, "a").unwrap();
        assert_eq!(env.as_string(read).unwrap(), "2");
        let key = env.string_utf8("a").unwrap();
        assert!(!env.delete_property(sealed, key).unwrap());
    }

    #[test]
    fn test_identical_redefinition_of_frozen_property() {
        let mut env = Env::new();
        let frozen = object_of(&mut env, &[("a", "1")]);
        env.object_freeze(frozen).unwrap();

        let same = env.string_utf8("1").unwrap();
        let unchanged = PropertyDescriptor::value("a", same).with_attributes(PropertyAttributes::ENUMERABLE);
        env.define_properties(frozen, &[unchanged.clone()]).unwrap();
        env.define_properties(frozen, &[unchanged]).unwrap();

        let different = env.string_utf8("2").unwrap();
        let changed = PropertyDescriptor::value("a", different).with_attributes(PropertyAttributes::ENUMERABLE);
        assert_eq!(env.define_properties(frozen, &[changed]), Err(Error::Thrown));
        assert_eq!(
            common::take_exception_string(&mut env),
            "TypeError: Cannot redefine property: a"
        );
        let read = env.get_named_property(frozen, "a").unwrap();
        assert_eq!(env.as_string(read).unwrap(), "1");
    }
}

mod enumeration {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canonical_order() {
        let mut env = Env::new();
        let obj = env.object();
        for key in ["b", "2", "a", "0", "10"] {
            let value = env.null();
            env.set_named_property(obj, key, value).unwrap();
        }
        assert_eq!(env.own_keys(obj).unwrap(), vec!["0", "2", "10", "b", "a"]);
    }

    #[test]
    fn test_property_names_include_inherited_enumerables() {
        let mut env = Env::new();
        let proto = object_of(&mut env, &[("inherited", "1"), ("shadowed", "1")]);
        let obj = object_of(&mut env, &[("own", "1"), ("shadowed", "2")]);
        env.set_prototype(obj, proto).unwrap();
        let names = env.get_property_names(obj).unwrap();
        let length = env.get_array_length(names).unwrap();
        let mut collected = Vec::new();
        for index in 0..length {
            let name = env.get_element(names, index as i64).unwrap();
            collected.push(env.as_string(name).unwrap());
        }
        assert_eq!(collected, vec!["own", "shadowed", "inherited"]);
    }

    #[test]
    fn test_all_property_names_filters() {
        let mut env = Env::new();
        let obj = env.object();
        let value = env.int32(0);
        env.set_element(obj, 3, value).unwrap();
        env.set_named_property(obj, "visible", value).unwrap();
        let hidden = env.string_utf8("hidden").unwrap();
        env.define_property(obj, hidden, value, PropertyAttributes::empty()).unwrap();
        let sym = env.symbol(Some("s"));
        env.set_property(obj, sym, value).unwrap();

        let keys = env
            .get_all_property_names(obj, KeyCollectionMode::OwnOnly, KeyFilter::ENUMERABLE, KeyConversion::KeepNumbers)
            .unwrap();
        assert_eq!(env.get_array_length(keys).unwrap(), 3);
        let first = env.get_element(keys, 0).unwrap();
        assert_eq!(env.type_of(first).unwrap(), ValueType::Number);

        let keys = env
            .get_all_property_names(
                obj,
                KeyCollectionMode::OwnOnly,
                KeyFilter::ENUMERABLE | KeyFilter::SKIP_SYMBOLS,
                KeyConversion::NumbersToStrings,
            )
            .unwrap();
        assert_eq!(env.get_array_length(keys).unwrap(), 2);
        let first = env.get_element(keys, 0).unwrap();
        assert_eq!(env.as_string(first).unwrap(), "3");

        let everything = env
            .get_all_property_names(
                obj,
                KeyCollectionMode::OwnOnly,
                KeyFilter::ALL_PROPERTIES,
                KeyConversion::NumbersToStrings,
            )
            .unwrap();
        assert_eq!(env.get_array_length(everything).unwrap(), 4);
    }
}

mod prototypes {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cycle_rejected() {
        let mut env = Env::new();
        let a = env.object();
        let b = env.object();
        env.set_prototype(b, a).unwrap();
        assert!(matches!(env.set_prototype(a, b), Err(Error::InvalidArgument(_))));
        assert!(matches!(env.set_prototype(a, a), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_null_prototype() {
        let mut env = Env::new();
        let obj = env.object();
        let null = env.null();
        env.set_prototype(obj, null).unwrap();
        let proto = env.get_prototype(obj).unwrap();
        assert_eq!(env.type_of(proto).unwrap(), ValueType::Null);
        assert_eq!(env.to_js_string(obj), Err(Error::Thrown));
        env.get_and_clear_last_exception();
    }
}
