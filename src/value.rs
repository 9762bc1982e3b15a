//! Attribute values and node keys.

use crate::{options::KeyPolicy, Error, Result};
use core::fmt::{self, Debug, Display};
use std::rc::Rc;

/// A property value or loosely typed parameter, as handed over by a tree builder.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	Str(String),
	Object(Opaque),
}

impl Value {
	#[must_use]
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Converts this value to the text a text node built from it would display.
	///
	/// Integral numbers are printed without a fractional part (`123.0` → `"123"`)
	/// and objects are printed through their [`Debug`] implementation.
	#[must_use]
	pub fn to_text(&self) -> String {
		match self {
			Value::Null => "null".to_owned(),
			Value::Bool(b) => b.to_string(),
			Value::Number(n) => number_to_text(*n),
			Value::Str(s) => s.clone(),
			Value::Object(o) => format!("{:?}", o),
		}
	}

	pub(crate) fn type_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Number(_) => "number",
			Value::Str(_) => "string",
			Value::Object(_) => "object",
		}
	}
}

/// Formats `n` the way JavaScript's `String(n)` does.
fn number_to_text(n: f64) -> String {
	if n.is_nan() {
		return "NaN".to_owned();
	}
	if n.is_infinite() {
		return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
	}
	if n == 0.0 {
		// Includes `-0`.
		return "0".to_owned();
	}
	let magnitude = n.abs();
	if (1e-6..1e21).contains(&magnitude) {
		return n.to_string();
	}
	let scientific = format!("{:e}", n);
	match scientific.split_once('e') {
		Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{}e+{}", mantissa, exponent),
		_ => scientific,
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_text())
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Str(value.to_owned())
	}
}
impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Str(value)
	}
}
impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}
impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Number(f64::from(value))
	}
}
impl From<u32> for Value {
	fn from(value: u32) -> Self {
		Value::Number(f64::from(value))
	}
}
impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Number(value)
	}
}
impl From<Opaque> for Value {
	fn from(value: Opaque) -> Self {
		Value::Object(value)
	}
}
impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

/// An arbitrary value that is compared by identity.
///
/// Clones compare equal to each other, but two separately created instances never do,
/// even if their contents are equal.
#[derive(Clone)]
pub struct Opaque(Rc<dyn Debug>);

impl Opaque {
	pub fn new(value: impl 'static + Debug) -> Self {
		Self(Rc::new(value))
	}

	fn addr(&self) -> *const () {
		Rc::as_ptr(&self.0).cast::<()>()
	}
}

impl PartialEq for Opaque {
	fn eq(&self, other: &Self) -> bool {
		self.addr() == other.addr()
	}
}

impl Debug for Opaque {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// An explicit identity token of an element node. Keys are never null.
#[derive(Clone, Debug, PartialEq)]
pub enum Key {
	Str(String),
	Number(f64),
	Bool(bool),
	Object(Opaque),
}

impl Key {
	/// Validates a loosely typed key parameter.
	///
	/// # Errors
	///
	/// [`Error::InvalidKey`] for [`Value::Null`], and under [`KeyPolicy::Primitive`] also for
	/// anything that isn't a string or number.
	pub fn from_value(value: Value, policy: KeyPolicy) -> Result<Self> {
		match (value, policy) {
			(Value::Str(s), _) => Ok(Key::Str(s)),
			(Value::Number(n), _) => Ok(Key::Number(n)),
			(Value::Bool(b), KeyPolicy::Any) => Ok(Key::Bool(b)),
			(Value::Object(o), KeyPolicy::Any) => Ok(Key::Object(o)),
			(other, _) => Err(Error::InvalidKey { found: other.type_name() }),
		}
	}
}

impl From<&str> for Key {
	fn from(key: &str) -> Self {
		Key::Str(key.to_owned())
	}
}
impl From<String> for Key {
	fn from(key: String) -> Self {
		Key::Str(key)
	}
}
impl From<i32> for Key {
	fn from(key: i32) -> Self {
		Key::Number(f64::from(key))
	}
}
impl From<u32> for Key {
	fn from(key: u32) -> Self {
		Key::Number(f64::from(key))
	}
}
impl From<Opaque> for Key {
	fn from(key: Opaque) -> Self {
		Key::Object(key)
	}
}
