//! Coercion engine
//!
//! Two families of accessors:
//!
//! - **Strict** (`as_*`): succeed only when the value already has the target
//!   type. Numbers are narrowed to integers by truncation toward zero, but a
//!   string, boolean or object is never silently converted into native
//!   storage.
//! - **Coercing** (`to_*`, `coerce_to_*`): the script language's abstract
//!   conversion operations, run unconditionally. These may call back into
//!   script (`valueOf`/`toString` hooks) and therefore may throw.

use crate::error::{messages, Error, ErrorKind, ExpectedType, Result};
use crate::runtime::{Env, JsValue, Object, ObjectClass, ObjectRef, PropertyKey, ValueType};
use crate::scope::Value;
use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};
use std::rc::Rc;

/// Preferred type for ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrimitiveHint {
    Number,
    String,
}

/// ToInt32: truncate toward zero, then wrap modulo 2^32 into the signed range.
/// Non-finite inputs yield 0.
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ToUint32: truncate toward zero, then wrap modulo 2^32. Non-finite inputs
/// yield 0.
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// Integer conversion to i64: truncate toward zero, saturate at the bounds,
/// NaN yields 0
pub fn to_int64(n: f64) -> i64 {
    if n.is_finite() {
        n as i64
    } else {
        0
    }
}

/// Number::toString(10)
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }

    // `{:e}` yields the shortest round-tripping digits, e.g. "1.2345e3"
    let sci = format!("{:e}", n);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((&sci, "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exponent + 1;

    if k <= point && point <= 21 {
        let mut out = digits;
        out.extend(std::iter::repeat('0').take((point - k) as usize));
        out
    } else if 0 < point && point <= 21 {
        let (int_part, frac_part) = digits.split_at(point as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let sign = if point - 1 < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, (point - 1).abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, (point - 1).abs())
        }
    }
}

fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}' | '\u{000A}' | '\u{000B}' | '\u{000C}' | '\u{000D}' | '\u{0020}' | '\u{00A0}'
            | '\u{1680}' | '\u{2000}'..='\u{200A}' | '\u{2028}' | '\u{2029}' | '\u{202F}'
            | '\u{205F}' | '\u{3000}' | '\u{FEFF}'
    )
}

/// StringToNumber: the numeric-literal grammar the engine accepts for
/// string-to-number conversion. Anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim_matches(is_js_whitespace);
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let bytes = s.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'0' {
        let radix = match bytes[1] {
            b'x' | b'X' => Some(16),
            b'o' | b'O' => Some(8),
            b'b' | b'B' => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return parse_radix(&s[2..], radix);
        }
    }

    if !is_decimal_literal(bytes) {
        return f64::NAN;
    }
    lexical_core::parse::<f64>(bytes).unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    let mut value = 0.0f64;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => value = value * radix as f64 + d as f64,
            None => return f64::NAN,
        }
    }
    value
}

/// `[+-]? (digits ('.' digits?)? | '.' digits) ([eE] [+-]? digits)?`
fn is_decimal_literal(bytes: &[u8]) -> bool {
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut mantissa_digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        mantissa_digits += i - frac_start;
    }
    if mantissa_digits == 0 {
        return false;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len()
}

/// ToBoolean
pub fn to_boolean(value: &JsValue) -> bool {
    match value {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::BigInt(n) => !n.is_zero(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Symbol(_) | JsValue::Object(_) => true,
    }
}

impl Env {
    // === Strict accessors ===

    /// The boolean, if the value is a Boolean
    pub fn as_bool(&self, value: Value) -> Result<bool> {
        match self.datum(value)? {
            JsValue::Boolean(b) => Ok(b),
            _ => Err(Error::wrong_type(ExpectedType::Boolean)),
        }
    }

    /// The double, if the value is a Number
    pub fn as_double(&self, value: Value) -> Result<f64> {
        match self.datum(value)? {
            JsValue::Number(n) => Ok(n),
            _ => Err(Error::wrong_type(ExpectedType::Number)),
        }
    }

    /// ToInt32 of the value, if it is a Number
    pub fn as_int32(&self, value: Value) -> Result<i32> {
        self.as_double(value).map(to_int32)
    }

    /// ToUint32 of the value, if it is a Number
    pub fn as_uint32(&self, value: Value) -> Result<u32> {
        self.as_double(value).map(to_uint32)
    }

    /// The value truncated to i64, if it is a Number
    pub fn as_int64(&self, value: Value) -> Result<i64> {
        self.as_double(value).map(to_int64)
    }

    /// The string contents, if the value is a String
    pub fn as_string(&self, value: Value) -> Result<String> {
        match self.datum(value)? {
            JsValue::String(s) => Ok(s.to_string()),
            _ => Err(Error::wrong_type(ExpectedType::String)),
        }
    }

    /// The BigInt as i64, and whether the conversion was lossless
    pub fn get_value_bigint_i64(&self, value: Value) -> Result<(i64, bool)> {
        let n = self.bigint_datum(value)?;
        match n.to_i64() {
            Some(v) => Ok((v, true)),
            None => {
                let (_, words) = bigint_to_words(&n);
                let low = words.first().copied().unwrap_or(0);
                let wrapped = if n.sign() == Sign::Minus { (low as i64).wrapping_neg() } else { low as i64 };
                Ok((wrapped, false))
            }
        }
    }

    /// The BigInt as u64, and whether the conversion was lossless
    pub fn get_value_bigint_u64(&self, value: Value) -> Result<(u64, bool)> {
        let n = self.bigint_datum(value)?;
        match n.to_u64() {
            Some(v) => Ok((v, true)),
            None => {
                let (_, words) = bigint_to_words(&n);
                let low = words.first().copied().unwrap_or(0);
                let wrapped = if n.sign() == Sign::Minus { low.wrapping_neg() } else { low };
                Ok((wrapped, false))
            }
        }
    }

    /// The BigInt's sign and little-endian 64-bit magnitude words
    pub fn get_value_bigint_words(&self, value: Value) -> Result<(bool, Vec<u64>)> {
        let n = self.bigint_datum(value)?;
        Ok(bigint_to_words(&n))
    }

    fn bigint_datum(&self, value: Value) -> Result<Rc<BigInt>> {
        match self.datum(value)? {
            JsValue::BigInt(n) => Ok(n),
            _ => Err(Error::wrong_type(ExpectedType::BigInt)),
        }
    }

    // === Coercing accessors ===

    /// ToBoolean
    pub fn to_bool(&self, value: Value) -> Result<bool> {
        Ok(to_boolean(&self.datum(value)?))
    }

    /// ToNumber; throws a TypeError for symbols and bigints
    pub fn to_number(&mut self, value: Value) -> Result<f64> {
        let datum = self.datum(value)?;
        self.datum_to_number(&datum)
    }

    /// ToString as a Rust string; throws a TypeError for symbols
    pub fn to_js_string(&mut self, value: Value) -> Result<String> {
        let datum = self.datum(value)?;
        Ok(self.datum_to_string(&datum)?.to_string())
    }

    /// ToObject; throws a TypeError for null and undefined
    pub fn to_object(&mut self, value: Value) -> Result<Value> {
        let datum = self.datum(value)?;
        let obj = self.datum_to_object(&datum)?;
        Ok(self.handle(JsValue::Object(obj)))
    }

    pub fn coerce_to_bool(&mut self, value: Value) -> Result<Value> {
        let b = self.to_bool(value)?;
        Ok(self.boolean(b))
    }

    pub fn coerce_to_number(&mut self, value: Value) -> Result<Value> {
        let n = self.to_number(value)?;
        Ok(self.double(n))
    }

    pub fn coerce_to_string(&mut self, value: Value) -> Result<Value> {
        let datum = self.datum(value)?;
        let s = self.datum_to_string(&datum)?;
        Ok(self.handle(JsValue::String(s)))
    }

    pub fn coerce_to_object(&mut self, value: Value) -> Result<Value> {
        self.to_object(value)
    }

    // === Classification ===

    /// Type classification; `null` reports [`ValueType::Null`]
    pub fn type_of(&self, value: Value) -> Result<ValueType> {
        Ok(self.datum(value)?.value_type())
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, a: Value, b: Value) -> Result<bool> {
        Ok(self.datum(a)?.strict_equals(&self.datum(b)?))
    }

    /// SameValue (`Object.is`)
    pub fn same_value(&self, a: Value, b: Value) -> Result<bool> {
        Ok(self.datum(a)?.same_value(&self.datum(b)?))
    }

    // === Abstract operations on data ===

    pub(crate) fn datum_to_number(&mut self, value: &JsValue) -> Result<f64> {
        match value {
            JsValue::Undefined => Ok(f64::NAN),
            JsValue::Null => Ok(0.0),
            JsValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            JsValue::Number(n) => Ok(*n),
            JsValue::String(s) => Ok(string_to_number(s)),
            JsValue::Symbol(_) => Err(self.raise(ErrorKind::TypeError, messages::cannot_convert_symbol("number"))),
            JsValue::BigInt(_) => {
                Err(self.raise(ErrorKind::TypeError, "Cannot convert a BigInt value to a number"))
            }
            JsValue::Object(obj) => {
                let primitive = self.to_primitive(obj, PrimitiveHint::Number)?;
                self.datum_to_number(&primitive)
            }
        }
    }

    pub(crate) fn datum_to_string(&mut self, value: &JsValue) -> Result<Rc<str>> {
        match value {
            JsValue::Undefined => Ok(Rc::from("undefined")),
            JsValue::Null => Ok(Rc::from("null")),
            JsValue::Boolean(b) => Ok(Rc::from(if *b { "true" } else { "false" })),
            JsValue::Number(n) => Ok(Rc::from(number_to_string(*n))),
            JsValue::BigInt(n) => Ok(Rc::from(n.to_string())),
            JsValue::String(s) => Ok(s.clone()),
            JsValue::Symbol(_) => Err(self.raise(ErrorKind::TypeError, messages::cannot_convert_symbol("string"))),
            JsValue::Object(obj) => {
                let primitive = self.to_primitive(obj, PrimitiveHint::String)?;
                self.datum_to_string(&primitive)
            }
        }
    }

    pub(crate) fn datum_to_object(&mut self, value: &JsValue) -> Result<ObjectRef> {
        let proto = match value {
            JsValue::Object(obj) => return Ok(obj.clone()),
            JsValue::Undefined | JsValue::Null => {
                return Err(self.raise(ErrorKind::TypeError, messages::CANNOT_CONVERT_NULLISH))
            }
            JsValue::Boolean(_) => self.intrinsics.boolean_prototype.clone(),
            JsValue::Number(_) => self.intrinsics.number_prototype.clone(),
            JsValue::String(_) => self.intrinsics.string_prototype.clone(),
            JsValue::Symbol(_) => self.intrinsics.symbol_prototype.clone(),
            JsValue::BigInt(_) => self.intrinsics.bigint_prototype.clone(),
        };
        Ok(Object::alloc(ObjectClass::Boxed(value.clone()), Some(proto)))
    }

    /// OrdinaryToPrimitive: try `valueOf`/`toString` in hint order
    pub(crate) fn to_primitive(&mut self, obj: &ObjectRef, hint: PrimitiveHint) -> Result<JsValue> {
        let order = match hint {
            PrimitiveHint::String => ["toString", "valueOf"],
            PrimitiveHint::Number => ["valueOf", "toString"],
        };
        let receiver = JsValue::Object(obj.clone());
        for name in order {
            let method = self.get_datum(obj, &PropertyKey::from(name), &receiver)?;
            if let JsValue::Object(func) = &method {
                if func.borrow().callable().is_some() {
                    let result = self.invoke(func, receiver.clone(), Vec::new(), None)?;
                    if !matches!(result, JsValue::Object(_)) {
                        return Ok(result);
                    }
                }
            }
        }
        Err(self.raise(ErrorKind::TypeError, messages::CANNOT_CONVERT_TO_PRIMITIVE))
    }

    /// ToPropertyKey
    pub(crate) fn to_property_key(&mut self, value: &JsValue) -> Result<PropertyKey> {
        match value {
            JsValue::String(s) => Ok(PropertyKey::String(s.clone())),
            JsValue::Symbol(sym) => Ok(PropertyKey::Symbol(sym.clone())),
            JsValue::Object(obj) => {
                let primitive = self.to_primitive(obj, PrimitiveHint::String)?;
                self.to_property_key(&primitive)
            }
            other => Ok(PropertyKey::String(self.datum_to_string(other)?)),
        }
    }
}

fn bigint_to_words(n: &BigInt) -> (bool, Vec<u64>) {
    let (sign, mut words) = n.to_u64_digits();
    if words.is_empty() {
        words.push(0);
    }
    (sign == Sign::Minus, words)
}
