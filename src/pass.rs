//! Pass identifiers and the per-node guard that detects illegal reuse.

use crate::{Error, NodeId, Result};
use core::{
	cell::Cell,
	fmt::{self, Display},
	num::NonZeroU64,
};

/// Identifies one top-level reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pass(NonZeroU64);

impl Pass {
	pub const FIRST: Self = Self(NonZeroU64::MIN);

	#[must_use]
	pub fn get(self) -> u64 {
		self.0.get()
	}

	#[must_use]
	pub fn succ(self) -> Self {
		Self(self.0.saturating_add(1))
	}
}

impl Display for Pass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "pass {}", self.0)
	}
}

/// Hands out strictly increasing [`Pass`]es. Owned by whoever drives reconciliation.
#[derive(Debug, Default)]
pub struct PassCounter {
	last: Option<Pass>,
}

impl PassCounter {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn next(&mut self) -> Pass {
		let pass = self.last.map_or(Pass::FIRST, Pass::succ);
		self.last = Some(pass);
		pass
	}

	#[must_use]
	pub fn last(&self) -> Option<Pass> {
		self.last
	}
}

/// Per-node reconciliation state.
///
/// A node is *touched* when it is reused, updated or built during a pass.
/// It becomes *stale* once it donated its element to a successor.
#[derive(Debug, Default)]
pub(crate) struct PassGuard {
	touched: Cell<Option<Pass>>,
	stale: Cell<bool>,
	attached: Cell<Option<Pass>>,
	detached: Cell<Option<Pass>>,
}

impl PassGuard {
	pub(crate) fn is_touched_in(&self, pass: Pass) -> bool {
		self.touched.get() == Some(pass)
	}

	pub(crate) fn is_stale(&self) -> bool {
		self.stale.get()
	}

	/// Fails if the node may not be touched (again) in `pass`.
	pub(crate) fn check(&self, node: NodeId, pass: Pass) -> Result<()> {
		if self.is_touched_in(pass) {
			Err(Error::ReuseWithinPass { node, pass })
		} else if self.is_stale() {
			Err(Error::ReuseAfterUpdate { node })
		} else {
			Ok(())
		}
	}

	pub(crate) fn touch(&self, pass: Pass) {
		self.touched.set(Some(pass));
	}

	pub(crate) fn retire(&self, pass: Pass) {
		self.touch(pass);
		self.stale.set(true);
	}

	pub(crate) fn was_attached_in(&self, pass: Pass) -> bool {
		self.attached.get() == Some(pass)
	}

	/// Records an attach notification. `false` if one was already recorded in `pass`.
	pub(crate) fn attach(&self, pass: Pass) -> bool {
		self.attached.replace(Some(pass)) != Some(pass)
	}

	/// Records a detach notification. `false` if one was already recorded in `pass`.
	pub(crate) fn detach(&self, pass: Pass) -> bool {
		self.detached.replace(Some(pass)) != Some(pass)
	}
}
