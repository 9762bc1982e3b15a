//! The node model: immutable element and text nodes with identity.

use crate::{
	attributes::{AttrMap, Attributes},
	dom::EventHandler,
	hooks::{HookKinds, Hooks},
	options::{ObjectChildren, Options},
	pass::PassGuard,
	Dom, Error, Key, Result, Value,
};
use core::{
	cell::OnceCell,
	fmt::{self, Debug, Display},
	num::NonZeroU64,
	sync::atomic::{AtomicU64, Ordering},
};
use hashbrown::HashSet;
use std::rc::Rc;

/// Identity of a [`Node`] instance. Never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(NonZeroU64);

impl NodeId {
	pub(crate) fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		let id = NEXT.fetch_add(1, Ordering::Relaxed);
		Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MAX))
	}

	#[must_use]
	pub fn get(self) -> u64 {
		self.0.get()
	}
}

impl Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "node #{}", self.0)
	}
}

/// A reference to an immutable element or text node.
///
/// Cloning a [`Node`] yields the *same* instance: Clones share identity, binding and pass state.
/// Keep and pass the same instance into a later render to reuse an unchanged subtree for free.
pub struct Node<D: Dom>(Rc<NodeData<D>>);

struct NodeData<D: Dom> {
	id: NodeId,
	kind: NodeKind<D>,
	binding: OnceCell<D::Handle>,
	guard: PassGuard,
}

pub enum NodeKind<D: Dom> {
	Element(ElementNode<D>),
	Text(TextNode),
}

pub struct ElementNode<D: Dom> {
	tag: String,
	key: Option<Key>,
	attributes: Attributes<D>,
	children: Vec<Node<D>>,
	child_ids: HashSet<NodeId>,
	hooks: Hooks<D>,
	nested_hooks: HookKinds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
	text: String,
}

impl<D: Dom> ElementNode<D> {
	/// The lowercase tag name.
	#[must_use]
	pub fn tag(&self) -> &str {
		&self.tag
	}

	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		self.key.as_ref()
	}

	#[must_use]
	pub fn attributes(&self) -> &Attributes<D> {
		&self.attributes
	}

	#[must_use]
	pub fn children(&self) -> &[Node<D>] {
		&self.children
	}

	/// Whether `child` (by identity) is one of this element's children.
	#[must_use]
	pub fn has_child(&self, child: &Node<D>) -> bool {
		self.child_ids.contains(&child.id())
	}

	#[must_use]
	pub fn hooks(&self) -> &Hooks<D> {
		&self.hooks
	}
}

impl TextNode {
	#[must_use]
	pub fn text(&self) -> &str {
		&self.text
	}
}

impl<D: Dom> Node<D> {
	fn from_kind(kind: NodeKind<D>) -> Self {
		Self(Rc::new(NodeData {
			id: NodeId::next(),
			kind,
			binding: OnceCell::new(),
			guard: PassGuard::default(),
		}))
	}

	pub(crate) fn new_text(text: String) -> Self {
		Self::from_kind(NodeKind::Text(TextNode { text }))
	}

	/// Assembles an element node from already validated parts.
	pub(crate) fn new_element(tag: String, key: Option<Key>, attributes: Attributes<D>, children: Vec<Node<D>>, hooks: Hooks<D>) -> Result<Self> {
		let mut child_ids = HashSet::with_capacity(children.len());
		let mut nested_hooks = hooks.kinds();
		for child in &children {
			if !child_ids.insert(child.id()) {
				return Err(Error::DuplicateChild { tag, child: child.id() });
			}
			nested_hooks |= child.nested_hooks();
		}

		Ok(Self::from_kind(NodeKind::Element(ElementNode {
			tag,
			key,
			attributes,
			children,
			child_ids,
			hooks,
			nested_hooks,
		})))
	}

	#[must_use]
	pub fn id(&self) -> NodeId {
		self.0.id
	}

	#[must_use]
	pub fn kind(&self) -> &NodeKind<D> {
		&self.0.kind
	}

	#[must_use]
	pub fn as_element(&self) -> Option<&ElementNode<D>> {
		match self.kind() {
			NodeKind::Element(element) => Some(element),
			NodeKind::Text(_) => None,
		}
	}

	#[must_use]
	pub fn as_text(&self) -> Option<&TextNode> {
		match self.kind() {
			NodeKind::Element(_) => None,
			NodeKind::Text(text) => Some(text),
		}
	}

	#[must_use]
	pub fn is_element(&self) -> bool {
		self.as_element().is_some()
	}

	#[must_use]
	pub fn tag(&self) -> Option<&str> {
		self.as_element().map(ElementNode::tag)
	}

	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		self.as_element().and_then(ElementNode::key)
	}

	/// The children of an element, or nothing for a text node.
	#[must_use]
	pub fn children(&self) -> &[Node<D>] {
		match self.kind() {
			NodeKind::Element(element) => &element.children,
			NodeKind::Text(_) => &[],
		}
	}

	/// Hook kinds registered by this node or any of its descendants.
	#[must_use]
	pub fn nested_hooks(&self) -> HookKinds {
		self.as_element().map_or_else(HookKinds::empty, |element| element.nested_hooks)
	}

	/// The live node this node is bound to, if it was rendered (or adopted) already.
	#[must_use]
	pub fn binding(&self) -> Option<&D::Handle> {
		self.0.binding.get()
	}

	#[must_use]
	pub fn is_bound(&self) -> bool {
		self.binding().is_some()
	}

	/// Whether `self` and `other` are the same instance.
	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub(crate) fn bind(&self, handle: D::Handle) -> Result<()> {
		self.0.binding.set(handle).map_err(|_| Error::OverwriteBinding { node: self.id() })
	}

	pub(crate) fn guard(&self) -> &PassGuard {
		&self.0.guard
	}

	/// An unbound node of the same shape but without attributes, children or hooks.
	pub(crate) fn empty_copy(&self) -> Self {
		match self.kind() {
			NodeKind::Element(element) => Self::from_kind(NodeKind::Element(ElementNode {
				tag: element.tag.clone(),
				key: element.key.clone(),
				attributes: Attributes::new(),
				children: Vec::new(),
				child_ids: HashSet::new(),
				hooks: Hooks::new(),
				nested_hooks: HookKinds::empty(),
			})),
			NodeKind::Text(_) => Self::new_text(String::new()),
		}
	}

	/// Returns `self` if it is keyed (or a text node), otherwise an unbound copy with `key`.
	///
	/// The copy shares this node's children.
	#[must_use]
	pub fn ensure_key(&self, key: impl Into<Key>) -> Self {
		match self.kind() {
			NodeKind::Element(element) if element.key.is_none() => Self::from_kind(NodeKind::Element(ElementNode {
				tag: element.tag.clone(),
				key: Some(key.into()),
				attributes: element.attributes.clone(),
				children: element.children.clone(),
				child_ids: element.child_ids.clone(),
				hooks: element.hooks.clone(),
				nested_hooks: element.nested_hooks,
			})),
			_ => self.clone(),
		}
	}

	/// A plain snapshot of the described tree, without binding or pass state.
	#[must_use]
	pub fn to_debug_tree(&self) -> DebugTree {
		match self.kind() {
			NodeKind::Element(element) => DebugTree::Element {
				tag: element.tag.clone(),
				key: element.key.clone(),
				properties: pairs(&element.attributes.properties),
				classes: pairs(&element.attributes.classes),
				style: pairs(&element.attributes.style),
				on: element.attributes.on.iter().map(|(name, _)| name.to_owned()).collect(),
				children: element.children.iter().map(Node::to_debug_tree).collect(),
			},
			NodeKind::Text(text) => DebugTree::Text { text: text.text.clone() },
		}
	}
}

fn pairs<V: Clone>(map: &AttrMap<V>) -> Vec<(String, V)> {
	map.iter().map(|(name, value)| (name.to_owned(), value.clone())).collect()
}

impl<D: Dom> Clone for Node<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Dom> Debug for Node<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("Node");
		debug.field("id", &self.id());
		match self.kind() {
			NodeKind::Element(element) => debug
				.field("tag", &element.tag)
				.field("key", &element.key)
				.field("attributes", &element.attributes)
				.field("hooks", &element.hooks)
				.field("children", &element.children),
			NodeKind::Text(text) => debug.field("text", &text.text),
		};
		debug.field("binding", &self.binding()).finish()
	}
}

/// See [`Node::to_debug_tree`].
#[derive(Clone, Debug, PartialEq)]
pub enum DebugTree {
	Element {
		tag: String,
		key: Option<Key>,
		properties: Vec<(String, Value)>,
		classes: Vec<(String, bool)>,
		style: Vec<(String, String)>,
		on: Vec<String>,
		children: Vec<DebugTree>,
	},
	Text {
		text: String,
	},
}

impl DebugTree {
	/// A bare element snapshot, for comparisons.
	#[must_use]
	pub fn element(tag: &str, children: Vec<DebugTree>) -> Self {
		DebugTree::Element {
			tag: tag.to_owned(),
			key: None,
			properties: Vec::new(),
			classes: Vec::new(),
			style: Vec::new(),
			on: Vec::new(),
			children,
		}
	}

	#[must_use]
	pub fn text(text: &str) -> Self {
		DebugTree::Text { text: text.to_owned() }
	}
}

/// A child parameter before normalization.
pub enum Child<D: Dom> {
	Node(Node<D>),
	Value(Value),
	List(Vec<Child<D>>),
}

impl<D: Dom> From<Node<D>> for Child<D> {
	fn from(node: Node<D>) -> Self {
		Child::Node(node)
	}
}
impl<D: Dom> From<&Node<D>> for Child<D> {
	fn from(node: &Node<D>) -> Self {
		Child::Node(node.clone())
	}
}
impl<D: Dom> From<Value> for Child<D> {
	fn from(value: Value) -> Self {
		Child::Value(value)
	}
}
impl<D: Dom> From<&str> for Child<D> {
	fn from(text: &str) -> Self {
		Child::Value(text.into())
	}
}
impl<D: Dom> From<String> for Child<D> {
	fn from(text: String) -> Self {
		Child::Value(text.into())
	}
}
impl<D: Dom> From<bool> for Child<D> {
	fn from(value: bool) -> Self {
		Child::Value(value.into())
	}
}
impl<D: Dom> From<i32> for Child<D> {
	fn from(value: i32) -> Self {
		Child::Value(value.into())
	}
}
impl<D: Dom> From<f64> for Child<D> {
	fn from(value: f64) -> Self {
		Child::Value(value.into())
	}
}
impl<D: Dom, C: Into<Child<D>>> From<Option<C>> for Child<D> {
	fn from(child: Option<C>) -> Self {
		child.map_or(Child::Value(Value::Null), Into::into)
	}
}
impl<D: Dom, C: Into<Child<D>>> From<Vec<C>> for Child<D> {
	fn from(children: Vec<C>) -> Self {
		Child::List(children.into_iter().map(Into::into).collect())
	}
}

/// The plain option structure a tree builder hands over. The presence of a tag selects an element node.
pub struct Params<D: Dom> {
	pub tag: Option<String>,
	pub text: Value,
	pub key: Option<Value>,
	pub attributes: Attributes<D>,
	pub hooks: Hooks<D>,
	pub children: Vec<Child<D>>,
}

impl<D: Dom> Params<D> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			tag: None,
			text: Value::Str(String::new()),
			key: None,
			attributes: Attributes::new(),
			hooks: Hooks::new(),
			children: Vec::new(),
		}
	}

	#[must_use]
	pub fn element(tag: impl Into<String>) -> Self {
		Self { tag: Some(tag.into()), ..Self::new() }
	}

	#[must_use]
	pub fn text(text: impl Into<Value>) -> Self {
		Self { text: text.into(), ..Self::new() }
	}

	#[must_use]
	pub fn key(mut self, key: impl Into<Value>) -> Self {
		self.key = Some(key.into());
		self
	}

	#[must_use]
	pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes.properties.insert(name, value.into());
		self
	}

	#[must_use]
	pub fn class(mut self, name: impl Into<String>, on: bool) -> Self {
		self.attributes.classes.insert(name, on);
		self
	}

	#[must_use]
	pub fn style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.style.insert(name, value.into());
		self
	}

	#[must_use]
	pub fn on(mut self, event: impl Into<String>, handler: EventHandler<D::Event>) -> Self {
		self.attributes.on.insert(event, handler);
		self
	}

	#[must_use]
	pub fn hooks(mut self, hooks: Hooks<D>) -> Self {
		self.hooks = hooks;
		self
	}

	#[must_use]
	pub fn child(mut self, child: impl Into<Child<D>>) -> Self {
		self.children.push(child.into());
		self
	}

	#[must_use]
	pub fn children<C: Into<Child<D>>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
		self.children.extend(children.into_iter().map(Into::into));
		self
	}

	/// Shorthand for [`make_node`].
	///
	/// # Errors
	///
	/// See [`make_node_with`].
	pub fn build(self) -> Result<Node<D>> {
		make_node(self)
	}

	/// Shorthand for [`make_node_with`].
	///
	/// # Errors
	///
	/// See [`make_node_with`].
	pub fn build_with(self, options: &Options) -> Result<Node<D>> {
		make_node_with(self, options)
	}
}

impl<D: Dom> Default for Params<D> {
	fn default() -> Self {
		Self::new()
	}
}

/// [`make_node_with`] using the default [`Options`].
///
/// # Errors
///
/// See [`make_node_with`].
pub fn make_node<D: Dom>(params: Params<D>) -> Result<Node<D>> {
	make_node_with(params, &Options::default())
}

/// Creates an element node if `params.tag` is set, otherwise a text node from `params.text`.
///
/// Children are flattened, [`Value::Null`] children are dropped and primitive ones become text nodes.
/// Construction never touches a live document.
///
/// # Errors
///
/// - [`Error::InvalidKey`] for a null key, or a key not permitted by [`Options::keys`].
/// - [`Error::InvalidChildType`] for object children if [`Options::object_children`] rejects them.
/// - [`Error::DuplicateChild`] if the same node instance is among the children more than once.
pub fn make_node_with<D: Dom>(params: Params<D>, options: &Options) -> Result<Node<D>> {
	let Params {
		tag,
		text,
		key,
		attributes,
		hooks,
		children,
	} = params;

	let tag = match tag {
		Some(tag) => tag.to_lowercase(),
		None => return Ok(Node::new_text(text.to_text())),
	};

	let key = key.map(|key| Key::from_value(key, options.keys)).transpose()?;

	let mut normalized = Vec::with_capacity(children.len());
	normalize_children(children, options, &mut normalized)?;

	Node::new_element(tag, key, attributes, normalized, hooks)
}

fn normalize_children<D: Dom>(children: Vec<Child<D>>, options: &Options, normalized: &mut Vec<Node<D>>) -> Result<()> {
	for child in children {
		match child {
			Child::Node(node) => normalized.push(node),
			Child::List(list) => normalize_children(list, options, normalized)?,
			Child::Value(Value::Null) => (),
			Child::Value(Value::Object(object)) => match options.object_children {
				ObjectChildren::Reject => return Err(Error::InvalidChildType { found: format!("{:?}", object) }),
				ObjectChildren::Stringify => normalized.push(Node::new_text(format!("{:?}", object))),
			},
			Child::Value(primitive) => normalized.push(Node::new_text(primitive.to_text())),
		}
	}
	Ok(())
}
