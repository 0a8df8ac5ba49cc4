//! PIM cores

// Imports
use std::{collections::BTreeMap, fmt};

/// PIM cores.
///
/// Tracks which rows of each core are reserved by objects.
#[derive(Clone, Debug)]
pub struct Cores {
	/// All cores
	cores: Vec<Core>,

	/// Rows per core
	rows_per_core: u32,
}

impl Cores {
	/// Creates `num_cores` empty cores with `rows_per_core` rows each
	pub fn new(num_cores: u32, rows_per_core: u32) -> Self {
		Self {
			cores: vec![Core::default(); num_cores as usize],
			rows_per_core,
		}
	}

	/// Reserves `num_rows` contiguous rows in `core_idx`, returning the first row.
	///
	/// # Errors
	/// Returns an error if no large enough gap exists.
	///
	/// # Panics
	/// Panics if `core_idx` is an invalid core index.
	pub fn reserve_rows(&mut self, core_idx: CoreIdx, num_rows: u32) -> Result<u32, anyhow::Error> {
		let rows_per_core = self.rows_per_core;
		self.cores[core_idx.to_usize()].reserve_rows(rows_per_core, num_rows)
	}

	/// Releases rows reserved at `row` in `core_idx`.
	///
	/// # Panics
	/// Panics if `core_idx` is an invalid core index.
	pub fn release_rows(&mut self, core_idx: CoreIdx, row: u32) -> Result<(), anyhow::Error> {
		self.cores[core_idx.to_usize()].release_rows(row)
	}

	/// Returns the number of rows in use across all cores
	pub fn rows_used(&self) -> u64 {
		self.cores.iter().map(|core| u64::from(core.rows_used)).sum()
	}
}

/// Core index
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug)]
pub struct CoreIdx(u32);

impl CoreIdx {
	/// Creates a core index
	pub const fn new(idx: u32) -> Self {
		Self(idx)
	}

	/// Returns the index as a `usize`
	pub const fn to_usize(self) -> usize {
		self.0 as usize
	}
}

impl fmt::Display for CoreIdx {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Core
#[derive(Clone, Default, Debug)]
struct Core {
	/// Reserved row ranges, by their first row, with their length
	reserved: BTreeMap<u32, u32>,

	/// Total rows reserved
	rows_used: u32,
}

impl Core {
	/// Reserves `num_rows` rows at the first gap that fits them
	fn reserve_rows(&mut self, rows_per_core: u32, num_rows: u32) -> Result<u32, anyhow::Error> {
		anyhow::ensure!(num_rows > 0, "Cannot reserve zero rows");

		let mut gap_start = 0;
		for (&start, &len) in &self.reserved {
			if start - gap_start >= num_rows {
				break;
			}
			gap_start = start + len;
		}

		anyhow::ensure!(
			rows_per_core.saturating_sub(gap_start) >= num_rows,
			"Core is full: {num_rows} rows requested, {} of {rows_per_core} in use",
			self.rows_used
		);

		self.reserved.insert(gap_start, num_rows);
		self.rows_used += num_rows;
		Ok(gap_start)
	}

	/// Releases the rows reserved at `row`
	fn release_rows(&mut self, row: u32) -> Result<(), anyhow::Error> {
		let len = self
			.reserved
			.remove(&row)
			.ok_or_else(|| anyhow::anyhow!("No rows were reserved at row {row}"))?;
		self.rows_used -= len;
		Ok(())
	}
}
