//! The live document a [`Differ`](`crate::Differ`) reconciles against.

use crate::Value;
use core::fmt::{self, Debug};
use std::{borrow::Cow, rc::Rc};

/// A host document.
///
/// Handles are references to live nodes. Two handles compare equal iff they refer to the same node.
///
/// Mutations are infallible from the reconciler's point of view:
/// Implementations report host failures through [`tracing`] and carry on.
pub trait Dom {
	type Handle: Clone + PartialEq + Debug;
	type Event;

	fn create_element(&mut self, tag: &str) -> Self::Handle;
	fn create_text(&mut self, text: &str) -> Self::Handle;

	fn host_node(&self, node: &Self::Handle) -> HostNode;
	fn parent(&self, node: &Self::Handle) -> Option<Self::Handle>;
	fn first_child(&self, parent: &Self::Handle) -> Option<Self::Handle>;
	fn next_sibling(&self, node: &Self::Handle) -> Option<Self::Handle>;

	/// Inserts `node` into `parent` before `reference`, or appends it if `reference` is [`None`].
	///
	/// If `node` is already placed somewhere, it is moved.
	fn insert_before(&mut self, parent: &Self::Handle, node: &Self::Handle, reference: Option<&Self::Handle>);
	fn remove(&mut self, node: &Self::Handle);
	/// Puts `new` into the position of `old`, which is removed from its parent.
	fn replace(&mut self, old: &Self::Handle, new: &Self::Handle);

	fn set_text(&mut self, node: &Self::Handle, text: &str);
	fn set_property(&mut self, element: &Self::Handle, name: &str, value: &Value);
	/// Restores the declared default of a property, which isn't necessarily the same as removing it.
	fn reset_property(&mut self, element: &Self::Handle, name: &str);
	fn toggle_class(&mut self, element: &Self::Handle, name: &str, on: bool);
	fn set_style(&mut self, element: &Self::Handle, name: &str, value: &str);
	fn clear_style(&mut self, element: &Self::Handle, name: &str);
	fn add_listener(&mut self, element: &Self::Handle, event: &str, handler: &EventHandler<Self::Event>);
	fn remove_listener(&mut self, element: &Self::Handle, event: &str, handler: &EventHandler<Self::Event>);

	/// Called once after each top-level pass.
	fn flush(&mut self) {}
}

/// What a live node looks like, as far as adoption is concerned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostNode {
	Element { tag: String },
	Text { text: String },
	/// Comments, processing instructions and the like.
	Other,
}

/// An event callback. Handlers are compared by identity, so keep and reuse the instance
/// to avoid rebinding a listener on each update.
pub struct EventHandler<E>(Rc<dyn Fn(&E)>);

impl<E> EventHandler<E> {
	pub fn new(handler: impl 'static + Fn(&E)) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &E) {
		(self.0)(event)
	}

	/// Identity of the callback, stable for as long as any clone of it is alive.
	#[must_use]
	pub fn addr(&self) -> usize {
		Rc::as_ptr(&self.0).cast::<()>() as usize
	}
}

impl<E> Clone for EventHandler<E> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<E> PartialEq for EventHandler<E> {
	fn eq(&self, other: &Self) -> bool {
		self.addr() == other.addr()
	}
}

impl<E> Debug for EventHandler<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("EventHandler").field(&format_args!("{:#x}", self.addr())).finish()
	}
}

/// Converts a camelCase style name like `minHeight` into its CSS property name (`min-height`).
///
/// Names that already are CSS property names are returned unchanged.
#[must_use]
pub fn css_property_name(name: &str) -> Cow<'_, str> {
	if !name.bytes().any(|b| b.is_ascii_uppercase()) {
		return Cow::Borrowed(name);
	}

	let mut css = String::with_capacity(name.len() + 4);
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			css.push('-');
			css.push(c.to_ascii_lowercase());
		} else {
			css.push(c);
		}
	}
	Cow::Owned(css)
}
