//! Utilities

// Modules
pub mod logger;

// Imports
use std::{cell::RefCell, fmt};

/// Extension trait for raw element bits stored in a `u64`
#[extend::ext(name = BitsExt)]
pub impl u64 {
	/// Keeps only the lowest `width` bits.
	fn truncate_bits(self, width: u32) -> u64 {
		match width {
			0 => 0,
			64.. => self,
			_ => self & ((1 << width) - 1),
		}
	}

	/// Interprets the lowest `width` bits as a two's complement value.
	fn sign_extend_bits(self, width: u32) -> i64 {
		match width {
			0 => 0,
			64.. => self as i64,
			_ => {
				let shift = 64 - width;
				((self << shift) as i64) >> shift
			},
		}
	}

	/// Returns bit `idx`
	fn bit(self, idx: u32) -> bool {
		idx < 64 && (self >> idx) & 1 == 1
	}

	/// Returns a copy with bit `idx` set to `value`
	fn with_bit(self, idx: u32, value: bool) -> u64 {
		if idx >= 64 {
			return self;
		}
		match value {
			true => self | (1 << idx),
			false => self & !(1 << idx),
		}
	}
}

/// [`fmt::Display`] helper to display using a `FnMut(&mut fmt::Formatter)`
pub struct DisplayWrapper<F: FnMut(&mut fmt::Formatter) -> fmt::Result>(RefCell<F>);

impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> DisplayWrapper<F> {
	/// Creates a new display wrapper
	#[must_use]
	pub const fn new(func: F) -> Self {
		Self(RefCell::new(func))
	}
}

impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> fmt::Display for DisplayWrapper<F> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		// Note: `f` cannot be re-entrant, so this cannot fail
		self.0.borrow_mut()(f)
	}
}
