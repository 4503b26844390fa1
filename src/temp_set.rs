use crate::node::Key;
use hashbrown::HashMap;

/// Scratch map from child keys to old child indices, reused across sibling lists.
pub struct TempKeyMap(HashMap<Key, usize>);
impl TempKeyMap {
	pub fn new() -> Self {
		Self(HashMap::new())
	}

	/// Clears the map before handing it out, so no keys leak from one sibling list into the next.
	pub fn temp(&mut self) -> &mut HashMap<Key, usize> {
		self.0.clear();
		&mut self.0
	}

	/// Retrieves the scratch map's capacity without clearing it first.
	pub fn capacity(&self) -> usize {
		self.0.capacity()
	}
}
impl core::fmt::Debug for TempKeyMap {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("TempKeyMap").field("capacity", &self.capacity()).finish()
	}
}
