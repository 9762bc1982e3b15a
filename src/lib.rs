#![doc(html_root_url = "https://docs.rs/vnode-patch/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod attributes;
pub mod diff;
pub mod dom;
mod error;
mod hooks;
pub mod load;
pub mod memory;
mod node;
mod options;
mod pass;
mod rc_hash_map;
mod value;
pub mod web;

pub use attributes::{AttrMap, Attributes};
pub use diff::{compatibility, patch, Compatibility, Differ, Old, ReplaceReason};
pub use dom::{css_property_name, Dom, EventHandler, HostNode};
pub use error::{Error, Result};
pub use hooks::{HookKinds, Hooks};
pub use load::from_existing;
pub use node::{make_node, make_node_with, Child, DebugTree, ElementNode, Node, NodeId, NodeKind, Params, TextNode};
pub use options::{KeyPolicy, ObjectChildren, Options};
pub use pass::{Pass, PassCounter};
pub use value::{Key, Opaque, Value};
