//! Adoption of live nodes that weren't rendered by this crate, like server-rendered markup.

use crate::{attributes::Attributes, dom::HostNode, hooks::Hooks, Dom, Node};
use tracing::{trace, warn};

/// Wraps an existing element or text node in a node bound to it, so that it can serve as the old side of a first patch.
///
/// Element and text children are adopted recursively. Other child nodes, like comments, are skipped and left alone.
/// Attributes aren't read back, so those already present on the element are only overwritten, never removed.
///
/// Returns [`None`] if `handle` is neither an element nor a text node.
pub fn from_existing<D: Dom>(dom: &D, handle: D::Handle) -> Option<Node<D>> {
	let node = match dom.host_node(&handle) {
		HostNode::Element { tag } => {
			let children = load_child_nodes(dom, &handle);
			trace!(%tag, children = children.len(), "Adopting element.");
			match Node::new_element(tag.to_lowercase(), None, Attributes::new(), children, Hooks::new()) {
				Ok(node) => node,
				Err(error) => {
					warn!("Could not adopt element: {}", error);
					return None;
				}
			}
		}
		HostNode::Text { text } => Node::new_text(text),
		HostNode::Other => {
			warn!("Can't adopt {:?}, which is neither an element nor text.", handle);
			return None;
		}
	};

	// A freshly created node is never bound yet.
	node.bind(handle).ok()?;
	Some(node)
}

fn load_child_nodes<D: Dom>(dom: &D, parent: &D::Handle) -> Vec<Node<D>> {
	let mut children = Vec::new();
	let mut next = dom.first_child(parent);
	while let Some(child) = next {
		next = dom.next_sibling(&child);
		match dom.host_node(&child) {
			HostNode::Other => trace!("Skipping unrecognised child node {:?}.", child),
			HostNode::Element { .. } | HostNode::Text { .. } => children.extend(from_existing(dom, child)),
		}
	}
	children
}
