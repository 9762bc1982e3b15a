use crate::{NodeId, Pass};
use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Misuse of the node identity contract.
///
/// None of these are transient. They point to a defect in the calling code, usually a node
/// instance that was cached or shared in a way the reconciler can't honour.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	#[error("can't use {found} as key")]
	InvalidKey { found: &'static str },

	#[error("child {child} used more than once in <{tag}>")]
	DuplicateChild { tag: String, child: NodeId },

	#[error("can't overwrite the element bound to {node}")]
	OverwriteBinding { node: NodeId },

	#[error("{node} already handed its element to a successor and can't be used again")]
	ReuseAfterUpdate { node: NodeId },

	#[error("{node} was already used in {pass}")]
	ReuseWithinPass { node: NodeId, pass: Pass },

	#[error("invalid child: expected a node or primitive but found {found}")]
	InvalidChildType { found: String },
}
