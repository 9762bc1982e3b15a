//! A document that lives entirely in memory.
//!
//! [`Document`] is useful outside of browsers and records each mutation applied to it,
//! which makes it straightforward to assert exactly what a patch did.

use crate::{
	dom::{css_property_name, EventHandler, HostNode},
	Dom, Value,
};
use core::fmt::{self, Display, Write as _};
use hashbrown::HashMap;
use indexmap::IndexMap;
use tracing::{error, level_filters::STATIC_MAX_LEVEL, warn, Level};

/// Index of a live node in a [`Document`]. Only valid for the document that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(usize);

impl Display for NodeHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "@{}", self.0)
	}
}

/// Passed to listeners by [`Document::dispatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
	pub name: String,
	pub target: NodeHandle,
}

/// A recorded document mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
	CreateElement { node: NodeHandle, tag: String },
	CreateText { node: NodeHandle },
	CreateComment { node: NodeHandle },
	SetText { node: NodeHandle, text: String },
	Insert { parent: NodeHandle, node: NodeHandle },
	Remove { node: NodeHandle },
	Replace { old: NodeHandle, new: NodeHandle },
	SetProperty { node: NodeHandle, name: String, value: Value },
	ResetProperty { node: NodeHandle, name: String },
	ToggleClass { node: NodeHandle, name: String, on: bool },
	SetStyle { node: NodeHandle, name: String, value: String },
	ClearStyle { node: NodeHandle, name: String },
	AddListener { node: NodeHandle, event: String },
	RemoveListener { node: NodeHandle, event: String },
}

impl Mutation {
	/// Whether this mutation changes the document tree itself rather than content or attributes.
	#[must_use]
	pub fn is_structural(&self) -> bool {
		matches!(self, Mutation::Insert { .. } | Mutation::Remove { .. } | Mutation::Replace { .. })
	}
}

#[derive(Debug)]
struct Slot {
	parent: Option<NodeHandle>,
	children: Vec<NodeHandle>,
	data: Data,
}

#[derive(Debug)]
enum Data {
	Element(ElementData),
	Text(String),
	Comment(String),
}

#[derive(Debug, Default)]
struct ElementData {
	tag: String,
	properties: IndexMap<String, Value>,
	classes: Vec<String>,
	style: IndexMap<String, String>,
	listeners: Vec<(String, EventHandler<Event>)>,
}

/// An arena of live nodes.
#[derive(Debug, Default)]
pub struct Document {
	slots: Vec<Slot>,
	defaults: HashMap<(String, String), Value>,
	mutations: Vec<Mutation>,
}

impl Document {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Declares the value [`Dom::reset_property`] restores for property `name` of `tag` elements.
	///
	/// Properties without declared default are removed entirely when reset.
	pub fn declare_default(&mut self, tag: &str, name: &str, value: impl Into<Value>) {
		self.defaults.insert((tag.to_lowercase(), name.to_owned()), value.into());
	}

	/// All mutations applied so far, in order.
	#[must_use]
	pub fn mutations(&self) -> &[Mutation] {
		&self.mutations
	}

	pub fn take_mutations(&mut self) -> Vec<Mutation> {
		core::mem::take(&mut self.mutations)
	}

	pub fn create_comment(&mut self, text: &str) -> NodeHandle {
		let node = self.alloc(Data::Comment(text.to_owned()));
		self.mutations.push(Mutation::CreateComment { node });
		node
	}

	pub fn append_child(&mut self, parent: NodeHandle, node: NodeHandle) {
		self.insert_before(&parent, &node, None);
	}

	#[must_use]
	pub fn parent_of(&self, node: NodeHandle) -> Option<NodeHandle> {
		self.slots[node.0].parent
	}

	#[must_use]
	pub fn children(&self, node: NodeHandle) -> &[NodeHandle] {
		&self.slots[node.0].children
	}

	#[must_use]
	pub fn tag(&self, node: NodeHandle) -> Option<&str> {
		self.element(node).map(|element| element.tag.as_str())
	}

	#[must_use]
	pub fn text(&self, node: NodeHandle) -> Option<&str> {
		match &self.slots[node.0].data {
			Data::Text(text) => Some(text),
			Data::Element(_) | Data::Comment(_) => None,
		}
	}

	#[must_use]
	pub fn property(&self, node: NodeHandle, name: &str) -> Option<&Value> {
		self.element(node)?.properties.get(name)
	}

	#[must_use]
	pub fn classes(&self, node: NodeHandle) -> &[String] {
		self.element(node).map_or(&[], |element| &element.classes)
	}

	#[must_use]
	pub fn has_class(&self, node: NodeHandle, name: &str) -> bool {
		self.classes(node).iter().any(|class| class == name)
	}

	/// Looks up a style declaration by camelCase or CSS property name.
	#[must_use]
	pub fn style(&self, node: NodeHandle, name: &str) -> Option<&str> {
		let name = css_property_name(name);
		self.element(node)?.style.get(&*name).map(String::as_str)
	}

	#[must_use]
	pub fn listener_count(&self, node: NodeHandle, event: &str) -> usize {
		self.element(node).map_or(0, |element| element.listeners.iter().filter(|(e, _)| e == event).count())
	}

	/// Calls each listener for `event` on `node`, in the order they were added, and returns how many there were.
	///
	/// There is no propagation to ancestors.
	pub fn dispatch(&self, node: NodeHandle, event: &str) -> usize {
		let listeners: Vec<EventHandler<Event>> = match self.element(node) {
			Some(element) => element.listeners.iter().filter(|(e, _)| e == event).map(|(_, handler)| handler.clone()).collect(),
			None => return 0,
		};
		let payload = Event {
			name: event.to_owned(),
			target: node,
		};
		for listener in &listeners {
			listener.call(&payload);
		}
		listeners.len()
	}

	/// The concatenated text of `node` and its descendants.
	#[must_use]
	pub fn text_content(&self, node: NodeHandle) -> String {
		let mut text = String::new();
		self.collect_text(node, &mut text);
		text
	}

	fn collect_text(&self, node: NodeHandle, text: &mut String) {
		match &self.slots[node.0].data {
			Data::Text(t) => text.push_str(t),
			Data::Comment(_) => (),
			Data::Element(_) => {
				for &child in &self.slots[node.0].children {
					self.collect_text(child, text);
				}
			}
		}
	}

	/// Serializes `node` as HTML.
	///
	/// The class attribute comes first, followed by properties in the order they were first set, then the style attribute.
	/// `true` properties are written as bare attributes. `false`, null and object properties are omitted.
	#[must_use]
	pub fn to_html(&self, node: NodeHandle) -> String {
		let mut html = String::new();
		self.write_html(node, &mut html);
		html
	}

	fn write_html(&self, node: NodeHandle, html: &mut String) {
		match &self.slots[node.0].data {
			Data::Text(text) => escape(text, html),
			Data::Comment(comment) => {
				html.push_str("<!--");
				html.push_str(comment);
				html.push_str("-->");
			}
			Data::Element(element) => {
				html.push('<');
				html.push_str(&element.tag);
				if !element.classes.is_empty() {
					html.push_str(" class=\"");
					escape(&element.classes.join(" "), html);
					html.push('"');
				}
				for (name, value) in &element.properties {
					match value {
						Value::Bool(true) => {
							html.push(' ');
							html.push_str(name);
						}
						Value::Str(_) | Value::Number(_) => {
							html.push(' ');
							html.push_str(name);
							html.push_str("=\"");
							escape(&value.to_text(), html);
							html.push('"');
						}
						Value::Bool(false) | Value::Null | Value::Object(_) => (),
					}
				}
				if !element.style.is_empty() {
					html.push_str(" style=\"");
					let declarations = element.style.iter().map(|(name, value)| format!("{}: {};", name, value)).collect::<Vec<_>>();
					escape(&declarations.join(" "), html);
					html.push('"');
				}
				html.push('>');
				for &child in &self.slots[node.0].children {
					self.write_html(child, html);
				}
				let _ = write!(html, "</{}>", element.tag);
			}
		}
	}

	fn alloc(&mut self, data: Data) -> NodeHandle {
		self.slots.push(Slot {
			parent: None,
			children: Vec::new(),
			data,
		});
		NodeHandle(self.slots.len() - 1)
	}

	fn element(&self, node: NodeHandle) -> Option<&ElementData> {
		match &self.slots[node.0].data {
			Data::Element(element) => Some(element),
			Data::Text(_) | Data::Comment(_) => None,
		}
	}

	fn element_mut(&mut self, node: NodeHandle) -> Option<&mut ElementData> {
		match &mut self.slots[node.0].data {
			Data::Element(element) => Some(element),
			Data::Text(_) | Data::Comment(_) => {
				error!("Expected {} to be an element.", node);
				None
			}
		}
	}

	/// Removes `node` from its parent's children without recording anything.
	fn unlink(&mut self, node: NodeHandle) -> Option<(NodeHandle, usize)> {
		let parent = self.slots[node.0].parent.take()?;
		let siblings = &mut self.slots[parent.0].children;
		let index = siblings.iter().position(|&sibling| sibling == node)?;
		siblings.remove(index);
		Some((parent, index))
	}

	fn is_inclusive_ancestor(&self, ancestor: NodeHandle, mut node: NodeHandle) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.slots[node.0].parent {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}
}

fn escape(text: &str, html: &mut String) {
	for c in text.chars() {
		match c {
			'&' => html.push_str("&amp;"),
			'<' => html.push_str("&lt;"),
			'>' => html.push_str("&gt;"),
			'"' => html.push_str("&quot;"),
			c => html.push(c),
		}
	}
}

impl Dom for Document {
	type Handle = NodeHandle;
	type Event = Event;

	fn create_element(&mut self, tag: &str) -> NodeHandle {
		let node = self.alloc(Data::Element(ElementData {
			tag: tag.to_owned(),
			..ElementData::default()
		}));
		self.mutations.push(Mutation::CreateElement { node, tag: tag.to_owned() });
		node
	}

	fn create_text(&mut self, text: &str) -> NodeHandle {
		let node = self.alloc(Data::Text(text.to_owned()));
		self.mutations.push(Mutation::CreateText { node });
		node
	}

	fn host_node(&self, node: &NodeHandle) -> HostNode {
		match &self.slots[node.0].data {
			Data::Element(element) => HostNode::Element { tag: element.tag.clone() },
			Data::Text(text) => HostNode::Text { text: text.clone() },
			Data::Comment(_) => HostNode::Other,
		}
	}

	fn parent(&self, node: &NodeHandle) -> Option<NodeHandle> {
		self.slots[node.0].parent
	}

	fn first_child(&self, parent: &NodeHandle) -> Option<NodeHandle> {
		self.slots[parent.0].children.first().copied()
	}

	fn next_sibling(&self, node: &NodeHandle) -> Option<NodeHandle> {
		let parent = self.slots[node.0].parent?;
		let siblings = &self.slots[parent.0].children;
		let index = siblings.iter().position(|sibling| sibling == node)?;
		siblings.get(index + 1).copied()
	}

	fn insert_before(&mut self, parent: &NodeHandle, node: &NodeHandle, reference: Option<&NodeHandle>) {
		if self.is_inclusive_ancestor(*node, *parent) {
			return error!("Can't insert {} into its own descendant {}.", node, parent);
		}
		if let Some(reference) = reference {
			if self.slots[reference.0].parent != Some(*parent) {
				return error!("Reference node {} is not a child of {}.", reference, parent);
			}
		}

		self.unlink(*node);
		let siblings = &mut self.slots[parent.0].children;
		let index = reference.and_then(|reference| siblings.iter().position(|sibling| sibling == reference)).unwrap_or(siblings.len());
		siblings.insert(index, *node);
		self.slots[node.0].parent = Some(*parent);
		self.mutations.push(Mutation::Insert { parent: *parent, node: *node });
	}

	fn remove(&mut self, node: &NodeHandle) {
		if self.unlink(*node).is_none() {
			if STATIC_MAX_LEVEL >= Level::WARN {
				warn!("Removed {}, which had no parent.", node);
			}
			return;
		}
		self.mutations.push(Mutation::Remove { node: *node });
	}

	fn replace(&mut self, old: &NodeHandle, new: &NodeHandle) {
		let parent = match self.slots[old.0].parent {
			Some(parent) => parent,
			None => return error!("Can't replace {}, which has no parent.", old),
		};
		if old == new {
			return;
		}
		if self.is_inclusive_ancestor(*new, parent) {
			return error!("Can't move {} into its own descendant {}.", new, parent);
		}

		self.unlink(*new);
		let siblings = &mut self.slots[parent.0].children;
		match siblings.iter().position(|sibling| sibling == old) {
			Some(index) => siblings[index] = *new,
			None => return error!("Corrupted document: {} is missing from its parent {}.", old, parent),
		}
		self.slots[old.0].parent = None;
		self.slots[new.0].parent = Some(parent);
		self.mutations.push(Mutation::Replace { old: *old, new: *new });
	}

	fn set_text(&mut self, node: &NodeHandle, text: &str) {
		match &mut self.slots[node.0].data {
			Data::Text(t) | Data::Comment(t) => *t = text.to_owned(),
			Data::Element(_) => return error!("Can't set text of element {}.", node),
		}
		self.mutations.push(Mutation::SetText {
			node: *node,
			text: text.to_owned(),
		});
	}

	fn set_property(&mut self, element: &NodeHandle, name: &str, value: &Value) {
		let data = match self.element_mut(*element) {
			Some(data) => data,
			None => return,
		};
		data.properties.insert(name.to_owned(), value.clone());
		self.mutations.push(Mutation::SetProperty {
			node: *element,
			name: name.to_owned(),
			value: value.clone(),
		});
	}

	fn reset_property(&mut self, element: &NodeHandle, name: &str) {
		let default = match self.element(*element) {
			Some(data) => self.defaults.get(&(data.tag.clone(), name.to_owned())).cloned(),
			None => return error!("Expected {} to be an element.", element),
		};
		if let Some(data) = self.element_mut(*element) {
			match default {
				Some(default) => {
					data.properties.insert(name.to_owned(), default);
				}
				None => {
					data.properties.shift_remove(name);
				}
			}
		}
		self.mutations.push(Mutation::ResetProperty {
			node: *element,
			name: name.to_owned(),
		});
	}

	fn toggle_class(&mut self, element: &NodeHandle, name: &str, on: bool) {
		let data = match self.element_mut(*element) {
			Some(data) => data,
			None => return,
		};
		let present = data.classes.iter().any(|class| class == name);
		if on && !present {
			data.classes.push(name.to_owned());
		} else if !on {
			data.classes.retain(|class| class != name);
		}
		self.mutations.push(Mutation::ToggleClass {
			node: *element,
			name: name.to_owned(),
			on,
		});
	}

	fn set_style(&mut self, element: &NodeHandle, name: &str, value: &str) {
		let data = match self.element_mut(*element) {
			Some(data) => data,
			None => return,
		};
		let css_name = css_property_name(name);
		data.style.insert(css_name.into_owned(), value.to_owned());
		self.mutations.push(Mutation::SetStyle {
			node: *element,
			name: name.to_owned(),
			value: value.to_owned(),
		});
	}

	fn clear_style(&mut self, element: &NodeHandle, name: &str) {
		let data = match self.element_mut(*element) {
			Some(data) => data,
			None => return,
		};
		let css_name = css_property_name(name);
		data.style.shift_remove(&*css_name);
		self.mutations.push(Mutation::ClearStyle {
			node: *element,
			name: name.to_owned(),
		});
	}

	fn add_listener(&mut self, element: &NodeHandle, event: &str, handler: &EventHandler<Event>) {
		let data = match self.element_mut(*element) {
			Some(data) => data,
			None => return,
		};
		data.listeners.push((event.to_owned(), handler.clone()));
		self.mutations.push(Mutation::AddListener {
			node: *element,
			event: event.to_owned(),
		});
	}

	fn remove_listener(&mut self, element: &NodeHandle, event: &str, handler: &EventHandler<Event>) {
		let data = match self.element_mut(*element) {
			Some(data) => data,
			None => return,
		};
		match data.listeners.iter().position(|(e, h)| e == event && h == handler) {
			Some(index) => {
				data.listeners.remove(index);
			}
			None => return warn!("No {:?} listener {:?} on {} to remove.", event, handler, element),
		}
		self.mutations.push(Mutation::RemoveListener {
			node: *element,
			event: event.to_owned(),
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_moves_and_orders() {
		let mut doc = Document::new();
		let root = doc.create_element("div");
		let a = doc.create_text("a");
		let b = doc.create_text("b");
		doc.append_child(root, a);
		doc.insert_before(&root, &b, Some(&a));
		assert_eq!(doc.children(root), [b, a]);
		assert_eq!(doc.next_sibling(&b), Some(a));
		assert_eq!(doc.next_sibling(&a), None);

		doc.append_child(root, b);
		assert_eq!(doc.children(root), [a, b]);
		assert_eq!(doc.text_content(root), "ab");
	}

	#[test]
	fn replace_takes_position() {
		let mut doc = Document::new();
		let root = doc.create_element("div");
		let a = doc.create_text("a");
		let b = doc.create_text("b");
		let c = doc.create_element("span");
		doc.append_child(root, a);
		doc.append_child(root, b);
		doc.replace(&a, &c);
		assert_eq!(doc.children(root), [c, b]);
		assert_eq!(doc.parent_of(a), None);
		assert_eq!(doc.to_html(root), "<div><span></span>b</div>");
	}

	#[test]
	fn refuses_cycles() {
		let mut doc = Document::new();
		let outer = doc.create_element("div");
		let inner = doc.create_element("div");
		doc.append_child(outer, inner);
		doc.append_child(inner, outer);
		assert_eq!(doc.parent_of(outer), None);
		assert_eq!(doc.to_html(outer), "<div><div></div></div>");
	}

	#[test]
	fn html_serialization() {
		let mut doc = Document::new();
		let div = doc.create_element("div");
		doc.set_property(&div, "id", &"x".into());
		doc.set_property(&div, "hidden", &true.into());
		doc.set_property(&div, "draggable", &false.into());
		doc.toggle_class(&div, "a", true);
		doc.toggle_class(&div, "b", true);
		doc.set_style(&div, "minHeight", "100%");
		let text = doc.create_text("<&>");
		doc.append_child(div, text);
		assert_eq!(doc.to_html(div), r#"<div class="a b" id="x" hidden style="min-height: 100%;">&lt;&amp;&gt;</div>"#);
	}

	#[test]
	fn reset_restores_declared_default() {
		let mut doc = Document::new();
		doc.declare_default("input", "value", "");
		let input = doc.create_element("input");
		doc.set_property(&input, "value", &"typed".into());
		doc.set_property(&input, "title", &"t".into());
		doc.reset_property(&input, "value");
		doc.reset_property(&input, "title");
		assert_eq!(doc.property(input, "value"), Some(&Value::from("")));
		assert_eq!(doc.property(input, "title"), None);
	}

	#[test]
	fn properties_and_style_keep_first_set_order() {
		let mut doc = Document::new();
		let div = doc.create_element("div");
		doc.set_property(&div, "id", &"x".into());
		doc.set_property(&div, "title", &"t".into());
		doc.set_property(&div, "lang", &"en".into());
		doc.set_property(&div, "id", &"y".into());
		doc.reset_property(&div, "title");
		doc.set_style(&div, "color", "red");
		doc.set_style(&div, "minHeight", "1px");
		doc.set_style(&div, "color", "blue");
		doc.set_style(&div, "fontSize", "2em");
		doc.clear_style(&div, "minHeight");
		assert_eq!(doc.style(div, "min-height"), None);
		assert_eq!(doc.style(div, "fontSize"), Some("2em"));
		assert_eq!(doc.to_html(div), r#"<div id="y" lang="en" style="color: blue; font-size: 2em;"></div>"#);
	}
}
