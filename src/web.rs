//! Browser DOM backend.
//!
//! Each distinct [`EventHandler`] is wrapped into a single JavaScript closure, which is reference-counted across the elements it's bound to.
//! Closures that become unused are released in [`Dom::flush`], which means a handler moved between elements within one pass keeps its closure.

use crate::{
	dom::{css_property_name, EventHandler, HostNode},
	rc_hash_map::{CountSaturatedError, RcHashMap},
	Dom, Value,
};
use hashbrown::HashMap;
use js_sys::Reflect;
use tracing::{error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, warn, Level};
use wasm_bindgen::{closure::Closure, throw_val, JsCast, JsValue};
use web_sys::{CssStyleDeclaration, Element, HtmlElement, SvgElement};

type Listener = Closure<dyn Fn(web_sys::Event)>;

/// Reconciles against a [`web_sys::Document`].
///
/// # Safety
///
/// Listeners bound through this instance start throwing errors into JavaScript once it is dropped.
#[derive(Debug)]
pub struct WebDom {
	document: web_sys::Document,
	listeners: RcHashMap<usize, u16, Listener>,
	/// Unmodified elements per tag, to look up declared property defaults.
	pristine: HashMap<String, Element>,
}

impl WebDom {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			listeners: RcHashMap::new(),
			pristine: HashMap::new(),
		}
	}

	/// The document of the current global `window`, if there is one.
	#[must_use]
	pub fn for_window() -> Option<Self> {
		web_sys::window().and_then(|window| window.document()).map(Self::new)
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// The number of distinct listener closures currently kept alive.
	/// Closures released during a patch are only freed when it completes.
	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	fn element(&mut self, tag: &str) -> Element {
		self.document.create_element(tag).unwrap_or_else(|error| {
			error!("Failed to create element {:?}: {:?}", tag, error);
			throw_val(error)
		})
	}

	fn default_of(&mut self, element: &Element, name: &str) -> JsValue {
		let tag = element.local_name();
		let pristine = match self.pristine.get(&tag) {
			Some(pristine) => pristine.clone(),
			None => {
				let pristine = self.element(&tag);
				self.pristine.insert(tag, pristine.clone());
				pristine
			}
		};
		Reflect::get(&pristine, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED)
	}
}

fn to_js(value: &Value) -> JsValue {
	match value {
		Value::Null => JsValue::NULL,
		Value::Bool(b) => JsValue::from_bool(*b),
		Value::Number(n) => JsValue::from_f64(*n),
		Value::Str(s) => JsValue::from_str(s),
		Value::Object(_) => {
			if STATIC_MAX_LEVEL >= Level::WARN {
				warn!("Object values can't be passed to JavaScript. Using their debug representation instead.");
			}
			JsValue::from_str(&value.to_text())
		}
	}
}

fn style_of(node: &web_sys::Node) -> Option<CssStyleDeclaration> {
	if let Some(html) = node.dyn_ref::<HtmlElement>() {
		Some(html.style())
	} else if let Some(svg) = node.dyn_ref::<SvgElement>() {
		Some(svg.style())
	} else {
		error!("Expected {:?} to be an HTML or SVG element.", node);
		None
	}
}

impl Dom for WebDom {
	type Handle = web_sys::Node;
	type Event = web_sys::Event;

	fn create_element(&mut self, tag: &str) -> web_sys::Node {
		self.element(tag).into()
	}

	fn create_text(&mut self, text: &str) -> web_sys::Node {
		self.document.create_text_node(text).into()
	}

	fn host_node(&self, node: &web_sys::Node) -> HostNode {
		match node.node_type() {
			web_sys::Node::ELEMENT_NODE => HostNode::Element {
				tag: node.unchecked_ref::<Element>().local_name(),
			},
			web_sys::Node::TEXT_NODE => HostNode::Text {
				text: node.node_value().unwrap_or_default(),
			},
			_ => HostNode::Other,
		}
	}

	fn parent(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.parent_node()
	}

	fn first_child(&self, parent: &web_sys::Node) -> Option<web_sys::Node> {
		parent.first_child()
	}

	fn next_sibling(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.next_sibling()
	}

	fn insert_before(&mut self, parent: &web_sys::Node, node: &web_sys::Node, reference: Option<&web_sys::Node>) {
		if let Err(error) = parent.insert_before(node, reference) {
			error!("Failed to insert node: {:?}", error);
		}
	}

	fn remove(&mut self, node: &web_sys::Node) {
		match node.parent_node() {
			Some(parent) => {
				if let Err(error) = parent.remove_child(node) {
					error!("Failed to remove node: {:?}", error);
				}
			}
			None => {
				if STATIC_MAX_LEVEL >= Level::WARN {
					warn!("Removed {:?}, which had no parent.", node);
				}
			}
		}
	}

	fn replace(&mut self, old: &web_sys::Node, new: &web_sys::Node) {
		match old.parent_node() {
			Some(parent) => {
				if let Err(error) = parent.replace_child(new, old) {
					error!("Failed to replace node: {:?}", error);
				}
			}
			None => error!("Can't replace {:?}, which has no parent.", old),
		}
	}

	fn set_text(&mut self, node: &web_sys::Node, text: &str) {
		node.set_node_value(Some(text));
	}

	#[instrument(skip(self, value))]
	fn set_property(&mut self, element: &web_sys::Node, name: &str, value: &Value) {
		if let Err(error) = Reflect::set(element, &JsValue::from_str(name), &to_js(value)) {
			error!("Failed to set property: {:?}", error);
		}
	}

	#[instrument(skip(self))]
	fn reset_property(&mut self, element: &web_sys::Node, name: &str) {
		let default = match element.dyn_ref::<Element>() {
			Some(element) => self.default_of(element, name),
			None => return error!("Expected {:?} to be an element.", element),
		};
		if let Err(error) = Reflect::set(element, &JsValue::from_str(name), &default) {
			error!("Failed to reset property: {:?}", error);
		}
	}

	fn toggle_class(&mut self, element: &web_sys::Node, name: &str, on: bool) {
		match element.dyn_ref::<Element>() {
			Some(element) => {
				if let Err(error) = element.class_list().toggle_with_force(name, on) {
					error!("Failed to toggle class {:?}: {:?}", name, error);
				}
			}
			None => error!("Expected {:?} to be an element.", element),
		}
	}

	fn set_style(&mut self, element: &web_sys::Node, name: &str, value: &str) {
		if let Some(style) = style_of(element) {
			if let Err(error) = style.set_property(&css_property_name(name), value) {
				error!("Failed to set style {:?}: {:?}", name, error);
			}
		}
	}

	fn clear_style(&mut self, element: &web_sys::Node, name: &str) {
		if let Some(style) = style_of(element) {
			if let Err(error) = style.remove_property(&css_property_name(name)) {
				error!("Failed to clear style {:?}: {:?}", name, error);
			}
		}
	}

	#[instrument(skip(self, handler))]
	fn add_listener(&mut self, element: &web_sys::Node, event: &str, handler: &EventHandler<web_sys::Event>) {
		let listener = self.listeners.increment_or_insert_with(handler.addr(), |_| {
			let handler = handler.clone();
			Closure::wrap(Box::new(move |event: web_sys::Event| handler.call(&event)) as Box<dyn Fn(web_sys::Event)>)
		});
		let listener = match listener {
			Ok(listener) => listener,
			Err(CountSaturatedError) => return error!("Too many (more than 65k) active bindings of the same handler."),
		};
		if let Err(error) = element.add_event_listener_with_callback(event, listener.as_ref().unchecked_ref()) {
			error!("Failed to add event listener {:?}: {:?}", event, error);
		}
	}

	#[instrument(skip(self, handler))]
	fn remove_listener(&mut self, element: &web_sys::Node, event: &str, handler: &EventHandler<web_sys::Event>) {
		let listener = match self.listeners.weak_decrement(&handler.addr()) {
			Ok(Some(listener)) => listener,
			Ok(None) => return error!("Tried to remove a listener that was never added."),
			Err(CountSaturatedError) => return error!("Tried to remove a listener more often than it was added."),
		};
		if let Err(error) = element.remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref()) {
			error!("Failed to remove event listener {:?}: {:?}", event, error);
		}
	}

	fn flush(&mut self) {
		let freed = self.listeners.drain_weak().count();
		trace!("Freed {} event listener(s).", freed);
		info!("Event listener count/cached capacity: {}/{}", self.listeners.len(), self.listeners.capacity());
	}
}
