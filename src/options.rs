//! Construction-time validation policies.

/// Validation policies applied by [`make_node_with`](`crate::make_node_with`).
///
/// The [`Default`] accepts any non-null key and rejects non-node object children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Options {
	pub keys: KeyPolicy,
	pub object_children: ObjectChildren,
}

impl Options {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn keys(mut self, keys: KeyPolicy) -> Self {
		self.keys = keys;
		self
	}

	#[must_use]
	pub fn object_children(mut self, object_children: ObjectChildren) -> Self {
		self.object_children = object_children;
		self
	}
}

/// Which values are accepted as [`Key`](`crate::Key`)s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyPolicy {
	/// Any value except [`Value::Null`](`crate::Value::Null`).
	#[default]
	Any,
	/// Only strings and numbers.
	Primitive,
}

/// How [`Value::Object`](`crate::Value::Object`) children are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ObjectChildren {
	/// Fail with [`Error::InvalidChildType`](`crate::Error::InvalidChildType`).
	#[default]
	Reject,
	/// Convert to a text node containing the object's [`Debug`] representation.
	Stringify,
}
