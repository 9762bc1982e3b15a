//! Lifecycle hooks and their delivery.
//!
//! `update` fires for each in-place update. `attach` and `detach` fire for the node whose element is
//! physically inserted into or removed from a parent, and are propagated into descendants that registered
//! them, since those move along with their ancestor without transitioning individually.
//! Each node receives at most one `attach` and one `detach` per pass.

use crate::{Dom, Node, Pass};
use bitflags::bitflags;
use core::fmt::{self, Debug};
use std::rc::Rc;
use tracing::{trace, trace_span};

bitflags! {
	/// Kinds of hooks registered on a node (or, for [`Node::nested_hooks`], anywhere in its subtree).
	#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
	pub struct HookKinds: u8 {
		const UPDATE = 1;
		const ATTACH = 1 << 1;
		const DETACH = 1 << 2;
	}
}

type UpdateHook<D> = Rc<dyn Fn(&Node<D>, &Node<D>)>;
type AttachHook<D> = Rc<dyn Fn(&<D as Dom>::Handle)>;
type DetachHook<D> = Rc<dyn Fn(&<D as Dom>::Handle, Option<&<D as Dom>::Handle>)>;

/// Lifecycle callbacks of an element node.
pub struct Hooks<D: Dom> {
	update: Option<UpdateHook<D>>,
	attach: Option<AttachHook<D>>,
	detach: Option<DetachHook<D>>,
}

impl<D: Dom> Hooks<D> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			update: None,
			attach: None,
			detach: None,
		}
	}

	/// Called with `(old, new)` after `new` took over `old`'s element and the element was updated.
	///
	/// On the first render, `old` is an empty stand-in with the same tag and key as `new`.
	#[must_use]
	pub fn on_update(mut self, hook: impl 'static + Fn(&Node<D>, &Node<D>)) -> Self {
		self.update = Some(Rc::new(hook));
		self
	}

	/// Called with the element after it was inserted into a (new) parent.
	#[must_use]
	pub fn on_attach(mut self, hook: impl 'static + Fn(&D::Handle)) -> Self {
		self.attach = Some(Rc::new(hook));
		self
	}

	/// Called with the element and, if it is being replaced, its replacement, before it's removed from its parent.
	#[must_use]
	pub fn on_detach(mut self, hook: impl 'static + Fn(&D::Handle, Option<&D::Handle>)) -> Self {
		self.detach = Some(Rc::new(hook));
		self
	}

	#[must_use]
	pub fn kinds(&self) -> HookKinds {
		let mut kinds = HookKinds::empty();
		kinds.set(HookKinds::UPDATE, self.update.is_some());
		kinds.set(HookKinds::ATTACH, self.attach.is_some());
		kinds.set(HookKinds::DETACH, self.detach.is_some());
		kinds
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.kinds().is_empty()
	}
}

impl<D: Dom> Default for Hooks<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D: Dom> Clone for Hooks<D> {
	fn clone(&self) -> Self {
		Self {
			update: self.update.clone(),
			attach: self.attach.clone(),
			detach: self.detach.clone(),
		}
	}
}

impl<D: Dom> Debug for Hooks<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Hooks").field(&self.kinds()).finish()
	}
}

pub(crate) fn updated<D: Dom>(old: &Node<D>, new: &Node<D>) {
	if let Some(hook) = new.as_element().and_then(|element| element.hooks().update.as_ref()) {
		let span = trace_span!("Calling update hook", old = %old.id(), new = %new.id());
		let _enter = span.enter();
		hook(old, new);
	}
}

/// Delivers `attach` to `node` and, where registered, its descendants.
pub(crate) fn attached<D: Dom>(node: &Node<D>, pass: Pass) {
	if node.guard().attach(pass) {
		if let (Some(hook), Some(element)) = (node.as_element().and_then(|element| element.hooks().attach.as_ref()), node.binding()) {
			let span = trace_span!("Calling attach hook", node = %node.id());
			let _enter = span.enter();
			hook(element);
		}
	} else {
		trace!(node = %node.id(), "Attach already delivered in this pass.");
	}

	for child in interested_children(node, HookKinds::ATTACH) {
		attached(child, pass);
	}
}

/// Delivers `detach` to `node` and, where registered, its descendants.
///
/// Only `node` itself is told about its `replacement`.
pub(crate) fn detached<D: Dom>(node: &Node<D>, replacement: Option<&D::Handle>, pass: Pass) {
	let guard = node.guard();
	if guard.was_attached_in(pass) {
		trace!(node = %node.id(), "Attached in this pass; not detaching.");
	} else if guard.detach(pass) {
		if let (Some(hook), Some(element)) = (node.as_element().and_then(|element| element.hooks().detach.as_ref()), node.binding()) {
			let span = trace_span!("Calling detach hook", node = %node.id(), replaced = replacement.is_some());
			let _enter = span.enter();
			hook(element, replacement);
		}
	} else {
		trace!(node = %node.id(), "Detach already delivered in this pass.");
	}

	for child in interested_children(node, HookKinds::DETACH) {
		detached(child, None, pass);
	}
}

fn interested_children<D: Dom>(node: &Node<D>, kind: HookKinds) -> impl Iterator<Item = &Node<D>> {
	node.children().iter().filter(move |child| child.nested_hooks().contains(kind))
}
