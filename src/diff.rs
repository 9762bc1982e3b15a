use crate::{
	attributes::{diff_map, Attributes},
	hooks,
	load::from_existing,
	node::{ElementNode, NodeKind, TextNode},
	pass::PassCounter,
	Dom, Node, Pass, Result,
};
use core::cmp::max;
use tracing::{instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// The old side of a top-level [`Differ::patch`].
pub enum Old<D: Dom> {
	/// Nothing was rendered yet. A new live node is created.
	Absent,
	/// A live node that wasn't rendered by this crate, e.g. server-rendered markup. It's adopted via [`from_existing`].
	Existing(D::Handle),
	/// The node tree passed as `new` to the previous patch.
	Node(Node<D>),
}

impl<D: Dom> From<Node<D>> for Old<D> {
	fn from(node: Node<D>) -> Self {
		Old::Node(node)
	}
}
impl<D: Dom> From<&Node<D>> for Old<D> {
	fn from(node: &Node<D>) -> Self {
		Old::Node(node.clone())
	}
}
impl<D: Dom> From<Option<Node<D>>> for Old<D> {
	fn from(node: Option<Node<D>>) -> Self {
		node.map_or(Old::Absent, Old::Node)
	}
}

/// Owns a live document and reconciles node trees against it.
///
/// # Correct Use
///
/// Keep the node tree passed as `new` and pass it as `old` to the next [`Differ::patch`] of the same region.
/// Unchanged subtrees can be reused by passing the very same [`Node`] instance again, which skips them entirely.
///
/// A node that was updated in place (that is: handed its element to a compatible successor) must not be used again.
///
/// Children are matched by position unless they are retained instances.
/// Wrapping an unkeyed child in a new unkeyed element with the same tag therefore makes the wrapper take over the child's element,
/// and the child then fails with [`ReuseWithinPass`](`crate::Error::ReuseWithinPass`) where it's placed inside the wrapper.
/// Give such wrappers a key.
#[derive(Debug)]
pub struct Differ<D: Dom> {
	dom: D,
	passes: PassCounter,
}

impl<D: Dom> Differ<D> {
	#[must_use]
	pub fn new(dom: D) -> Self {
		Self { dom, passes: PassCounter::new() }
	}

	#[must_use]
	pub fn dom(&self) -> &D {
		&self.dom
	}

	pub fn dom_mut(&mut self) -> &mut D {
		&mut self.dom
	}

	#[must_use]
	pub fn into_dom(self) -> D {
		self.dom
	}

	/// The most recently started pass.
	#[must_use]
	pub fn last_pass(&self) -> Option<Pass> {
		self.passes.last()
	}

	/// Makes the live document match `new` and returns the live node corresponding to it.
	///
	/// `new` is bound to live nodes afterwards and should be kept as the next `old`.
	///
	/// # Errors
	///
	/// Iff the node identity contract is violated, in which case the traversal stops at that point.
	/// See [`Error`](`crate::Error`).
	#[instrument(skip_all, fields(new = %new.id()))]
	pub fn patch(&mut self, old: impl Into<Old<D>>, new: &Node<D>) -> Result<D::Handle> {
		let pass = self.passes.next();
		let old = match old.into() {
			Old::Absent => None,
			Old::Existing(handle) => {
				let adopted = from_existing(&self.dom, handle);
				if adopted.is_none() {
					warn!("Could not adopt the existing node. Creating a new one instead.");
				}
				adopted
			}
			Old::Node(node) => Some(node),
		};

		let result = patch(&mut self.dom, old.as_ref(), new, pass);
		self.dom.flush();
		result
	}
}

/// Why a [`Compatibility`] test requires replacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplaceReason {
	/// The old node was already claimed in this pass, typically by moving it elsewhere.
	OldConsumed,
	/// The new node already has an element of its own.
	NewBound,
	Kind,
	Tag,
	Key,
}

/// Whether an old node can be updated in place by a new one.
pub enum Compatibility<'a, D: Dom> {
	Elements(&'a ElementNode<D>, &'a ElementNode<D>),
	Texts(&'a TextNode, &'a TextNode),
	Replace(ReplaceReason),
}

/// Tests whether `new` can take over `old`'s element in `pass`.
#[must_use]
pub fn compatibility<'a, D: Dom>(old: &'a Node<D>, new: &'a Node<D>, pass: Pass) -> Compatibility<'a, D> {
	if old.guard().is_touched_in(pass) {
		return Compatibility::Replace(ReplaceReason::OldConsumed);
	}
	if new.is_bound() {
		return Compatibility::Replace(ReplaceReason::NewBound);
	}

	match (old.kind(), new.kind()) {
		(NodeKind::Element(o), NodeKind::Element(n)) => {
			if o.tag() != n.tag() {
				Compatibility::Replace(ReplaceReason::Tag)
			} else if o.key() != n.key() {
				Compatibility::Replace(ReplaceReason::Key)
			} else {
				Compatibility::Elements(o, n)
			}
		}
		(NodeKind::Text(o), NodeKind::Text(n)) => Compatibility::Texts(o, n),
		_ => Compatibility::Replace(ReplaceReason::Kind),
	}
}

/// Reconciles `old` into `new` during `pass` and returns `new`'s live node.
///
/// This is the step [`Differ::patch`] performs for each top-level call, after adopting existing nodes.
/// `pass` must be new to both trees, i.e. greater than any pass used with them before.
///
/// # Errors
///
/// See [`Error`](`crate::Error`).
pub fn patch<D: Dom>(dom: &mut D, old: Option<&Node<D>>, new: &Node<D>, pass: Pass) -> Result<D::Handle> {
	let mut discarded = Vec::new();
	let result = reconcile(dom, old, new, pass, &mut discarded);
	if !discarded.is_empty() {
		trace!(count = discarded.len(), "Releasing listeners of discarded subtrees.");
	}
	for node in &discarded {
		release_listeners(dom, node, pass);
	}
	result
}

/// `discarded` collects removed and replaced nodes. Their listeners are released once the whole pass is through,
/// since a removed node may still be placed elsewhere later in the same pass.
#[instrument(skip_all, fields(old = ?old.map(Node::id), new = %new.id(), %pass))]
fn reconcile<D: Dom>(dom: &mut D, old: Option<&Node<D>>, new: &Node<D>, pass: Pass, discarded: &mut Vec<Node<D>>) -> Result<D::Handle> {
	if let Some(handle) = new.binding() {
		// A never rendered `old` has nothing to hand over, so it's treated as absent.
		if old.map_or(true, |old| old.ptr_eq(new) || !old.is_bound()) {
			trace!("Reusing bound node.");
			new.guard().check(new.id(), pass)?;
			new.guard().touch(pass);
			return Ok(handle.clone());
		}
	}

	if let Some(old) = old {
		if old.guard().is_stale() {
			// `ReuseWithinPass` if it was retired earlier in this pass, `ReuseAfterUpdate` otherwise.
			old.guard().check(old.id(), pass)?;
		}
	}

	let placeholder;
	let (old, old_handle, fresh) = match old.and_then(|old| old.binding().map(|handle| (old, handle.clone()))) {
		Some((old, old_handle)) => (old, old_handle, false),
		None => {
			if let Some(old) = old {
				trace!(old = %old.id(), "Old node was never rendered. Treating it as absent.");
			}
			placeholder = new.empty_copy();
			let handle = match new.kind() {
				NodeKind::Element(element) => dom.create_element(element.tag()),
				NodeKind::Text(_) => dom.create_text(""),
			};
			placeholder.bind(handle.clone())?;
			(&placeholder, handle, true)
		}
	};

	match compatibility(old, new, pass) {
		Compatibility::Elements(o, n) => {
			let span = trace_span!("Updating element", tag = n.tag(), fresh);
			let _enter = span.enter();
			let handle = take_over(old, old_handle, new, pass)?;
			update_children(dom, o, n, &handle, pass, discarded)?;
			update_attributes(dom, &handle, o.attributes(), n.attributes());
			// On fresh builds, `old` is the empty placeholder.
			hooks::updated(old, new);
			Ok(handle)
		}
		Compatibility::Texts(o, n) => {
			let span = trace_span!("Updating text node", fresh);
			let _enter = span.enter();
			let handle = take_over(old, old_handle, new, pass)?;
			if o.text() != n.text() {
				if cfg!(feature = "dangerous-logging") {
					trace!(old = o.text(), new = n.text(), "Setting text.");
				}
				dom.set_text(&handle, n.text());
			}
			Ok(handle)
		}
		Compatibility::Replace(reason) => {
			let span = trace_span!("Replacing", ?reason, old = %old.id());
			let _enter = span.enter();
			replace(dom, old, new, pass, discarded)
		}
	}
}

/// Moves `old`'s element over to `new`.
fn take_over<D: Dom>(old: &Node<D>, handle: D::Handle, new: &Node<D>, pass: Pass) -> Result<D::Handle> {
	new.bind(handle.clone())?;
	old.guard().retire(pass);
	new.guard().touch(pass);
	Ok(handle)
}

fn replace<D: Dom>(dom: &mut D, old: &Node<D>, new: &Node<D>, pass: Pass, discarded: &mut Vec<Node<D>>) -> Result<D::Handle> {
	let handle = reconcile(dom, None, new, pass, discarded)?;

	if old.guard().is_touched_in(pass) {
		trace!("The old element was claimed elsewhere in this pass. Leaving it alone.");
		return Ok(handle);
	}

	let old_handle = match old.binding() {
		Some(old_handle) => old_handle.clone(),
		None => return Ok(handle),
	};

	match dom.parent(&old_handle) {
		Some(parent) => {
			let previous_parent = dom.parent(&handle);
			let crossing = previous_parent.as_ref() != Some(&parent);
			hooks::detached(old, Some(&handle), pass);
			if crossing && previous_parent.is_some() {
				hooks::detached(new, None, pass);
			}
			dom.replace(&old_handle, &handle);
			if crossing {
				hooks::attached(new, pass);
			}
		}
		None => {
			trace!("The old element has no parent. Not splicing in its replacement.");
			hooks::detached(old, Some(&handle), pass);
		}
	}
	discarded.push(old.clone());

	Ok(handle)
}

/// Matches children by identity: A child instance present on both sides keeps its element and is only moved.
/// Otherwise, children at the same index are patched against each other, and surplus ones are removed or built.
#[instrument(skip_all, fields(old = old.children().len(), new = new.children().len()))]
fn update_children<D: Dom>(
	dom: &mut D,
	old: &ElementNode<D>,
	new: &ElementNode<D>,
	parent: &D::Handle,
	pass: Pass,
	discarded: &mut Vec<Node<D>>,
) -> Result<()> {
	let (old_children, new_children) = (old.children(), new.children());

	let mut previous: Option<D::Handle> = None;
	for i in 0..max(old_children.len(), new_children.len()) {
		let old_child = old_children.get(i).filter(|old_child| !new.has_child(old_child));
		let new_child = new_children.get(i);
		let fresh_child = new_child.filter(|new_child| !old.has_child(new_child));

		let handle = match (old_child, new_child, fresh_child) {
			(Some(old_child), Some(new_child), Some(_)) => Some(reconcile(dom, Some(old_child), new_child, pass, discarded)?),
			(old_child, new_child, fresh_child) => {
				if let Some(old_child) = old_child {
					remove(dom, old_child, pass, discarded);
				}
				match (new_child, fresh_child) {
					(Some(new_child), Some(_)) => Some(reconcile(dom, None, new_child, pass, discarded)?),
					// Retained instance.
					(Some(new_child), None) => Some(reconcile(dom, Some(new_child), new_child, pass, discarded)?),
					(None, _) => None,
				}
			}
		};

		if let (Some(new_child), Some(handle)) = (new_child, handle) {
			place(dom, new_child, &handle, parent, previous.as_ref(), pass);
			previous = Some(handle);
		}
	}
	Ok(())
}

fn remove<D: Dom>(dom: &mut D, node: &Node<D>, pass: Pass, discarded: &mut Vec<Node<D>>) {
	if node.guard().is_touched_in(pass) {
		trace!(node = %node.id(), "Already claimed elsewhere in this pass. Not removing.");
		return;
	}
	let handle = match node.binding() {
		Some(handle) => handle.clone(),
		None => {
			if STATIC_MAX_LEVEL >= Level::WARN {
				warn!(node = %node.id(), "Expected to remove a node that was never rendered. Ignoring it.");
			}
			return;
		}
	};

	let span = trace_span!("Removing", node = %node.id());
	let _enter = span.enter();
	hooks::detached(node, None, pass);
	dom.remove(&handle);
	discarded.push(node.clone());
}

/// Unregisters the event listeners of a discarded subtree.
/// Nodes claimed in this pass were moved or taken over, so they and their descendants keep theirs.
fn release_listeners<D: Dom>(dom: &mut D, node: &Node<D>, pass: Pass) {
	if node.guard().is_touched_in(pass) {
		return;
	}
	if let (NodeKind::Element(element), Some(handle)) = (node.kind(), node.binding()) {
		for (event, handler) in element.attributes().on.iter() {
			dom.remove_listener(handle, event, handler);
		}
		for child in element.children() {
			release_listeners(dom, child, pass);
		}
	}
}

/// Puts `handle` right after `previous` in `parent`, or first if `previous` is [`None`], unless it's there already.
fn place<D: Dom>(dom: &mut D, node: &Node<D>, handle: &D::Handle, parent: &D::Handle, previous: Option<&D::Handle>, pass: Pass) {
	let reference = match previous {
		Some(previous) => dom.next_sibling(previous),
		None => dom.first_child(parent),
	};
	if reference.as_ref() == Some(handle) {
		return;
	}

	let current_parent = dom.parent(handle);
	let crossing = current_parent.as_ref() != Some(parent);
	trace!(node = %node.id(), crossing, "Moving into place.");

	if crossing && current_parent.is_some() {
		hooks::detached(node, None, pass);
	}
	dom.insert_before(parent, handle, reference.as_ref());
	if crossing {
		hooks::attached(node, pass);
	}
}

/// Applies the difference between two attribute sets: classes, then properties, then listeners, then style.
fn update_attributes<D: Dom>(dom: &mut D, element: &D::Handle, old: &Attributes<D>, new: &Attributes<D>) {
	diff_map(&old.classes, &new.classes, |name, _, on| {
		dom.toggle_class(element, name, on.copied().unwrap_or(false));
	});

	diff_map(&old.properties, &new.properties, |name, _, value| {
		if cfg!(feature = "dangerous-logging") {
			trace!(name, ?value, "Updating property.");
		}
		match value {
			Some(value) => dom.set_property(element, name, value),
			None => dom.reset_property(element, name),
		}
	});

	diff_map(&old.on, &new.on, |event, previous, next| {
		if let Some(previous) = previous {
			dom.remove_listener(element, event, previous);
		}
		if let Some(next) = next {
			dom.add_listener(element, event, next);
		}
	});

	diff_map(&old.style, &new.style, |name, _, value| match value {
		Some(value) => dom.set_style(element, name, value),
		None => dom.clear_style(element, name),
	});
}
