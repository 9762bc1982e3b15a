use crate::{dom::EventHandler, Dom, Value};
use core::fmt::{self, Debug};
use indexmap::IndexMap;

/// An insertion-ordered attribute map. Inserting an existing name replaces its value in place.
#[derive(Clone, PartialEq)]
pub struct AttrMap<V>(IndexMap<String, V>);

impl<V> AttrMap<V> {
	#[must_use]
	pub fn new() -> Self {
		Self(IndexMap::new())
	}

	pub fn insert(&mut self, name: impl Into<String>, value: V) {
		self.0.insert(name.into(), value);
	}

	/// Removes `name`, keeping the order of the remaining entries.
	pub fn remove(&mut self, name: &str) -> Option<V> {
		self.0.shift_remove(name)
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&V> {
		self.0.get(name)
	}

	#[must_use]
	pub fn contains(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
		self.0.iter().map(|(n, v)| (n.as_str(), v))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl<V> Default for AttrMap<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V: Debug> Debug for AttrMap<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.0.iter()).finish()
	}
}

impl<N: Into<String>, V> FromIterator<(N, V)> for AttrMap<V> {
	fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
		Self(iter.into_iter().map(|(name, value)| (name.into(), value)).collect())
	}
}

/// The classified attributes of an element node.
pub struct Attributes<D: Dom> {
	/// Plain properties, reset to their declared default when dropped.
	pub properties: AttrMap<Value>,
	/// Class toggles. A class mapped to `false` is switched off.
	pub classes: AttrMap<bool>,
	/// Inline style declarations, keyed by camelCase or CSS property name.
	pub style: AttrMap<String>,
	/// Event listeners by event name.
	pub on: AttrMap<EventHandler<D::Event>>,
}

impl<D: Dom> Attributes<D> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			properties: AttrMap::new(),
			classes: AttrMap::new(),
			style: AttrMap::new(),
			on: AttrMap::new(),
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.properties.is_empty() && self.classes.is_empty() && self.style.is_empty() && self.on.is_empty()
	}
}

impl<D: Dom> Default for Attributes<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D: Dom> Clone for Attributes<D> {
	fn clone(&self) -> Self {
		Self {
			properties: self.properties.clone(),
			classes: self.classes.clone(),
			style: self.style.clone(),
			on: self.on.clone(),
		}
	}
}

impl<D: Dom> Debug for Attributes<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Attributes")
			.field("properties", &self.properties)
			.field("classes", &self.classes)
			.field("style", &self.style)
			.field("on", &self.on)
			.finish()
	}
}

/// Calls `apply` for each name whose value differs between `old` and `new`:
/// First for names present in `new` (in `new`'s order), then for names only present in `old`.
pub(crate) fn diff_map<V: PartialEq>(old: &AttrMap<V>, new: &AttrMap<V>, mut apply: impl FnMut(&str, Option<&V>, Option<&V>)) {
	for (name, value) in new.iter() {
		let previous = old.get(name);
		if previous != Some(value) {
			apply(name, previous, Some(value));
		}
	}
	for (name, value) in old.iter() {
		if !new.contains(name) {
			apply(name, Some(value), None);
		}
	}
}
