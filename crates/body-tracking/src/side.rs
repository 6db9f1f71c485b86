use std::ops::{Index, IndexMut};

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A side of the body.
#[derive(
	Debug, Display, Eq, PartialEq, Copy, Clone, Hash, Serialize, Deserialize,
)]
pub enum Side {
	#[display("left")]
	Left,
	#[display("right")]
	Right,
}

impl Side {
	pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

/// One value per side of the body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sided<T> {
	pub left: T,
	pub right: T,
}

impl<T> Sided<T> {
	pub const fn new(left: T, right: T) -> Self {
		Self { left, right }
	}

	pub fn from_fn(mut f: impl FnMut(Side) -> T) -> Self {
		Self {
			left: f(Side::Left),
			right: f(Side::Right),
		}
	}
}

impl<T> Index<Side> for Sided<T> {
	type Output = T;

	fn index(&self, side: Side) -> &T {
		match side {
			Side::Left => &self.left,
			Side::Right => &self.right,
		}
	}
}

impl<T> IndexMut<Side> for Sided<T> {
	fn index_mut(&mut self, side: Side) -> &mut T {
		match side {
			Side::Left => &mut self.left,
			Side::Right => &mut self.right,
		}
	}
}
