//! Object placement
//!
//! Decides how many elements of an object each core holds, and how those
//! elements split into regions.

// Imports
use {
	super::{cores::CoreIdx, Orientation},
	crate::{
		data_type::DataType,
		error::{PimError, PimResult},
	},
};

/// Shape of the cores an object is placed onto
#[derive(Clone, Copy, Debug)]
pub struct CoreShape {
	pub num_cores: u32,
	pub num_rows:  u32,
	pub num_cols:  u32,
}

impl CoreShape {
	/// Maximum number of elements in a single region
	pub fn elements_per_region(&self, orientation: Orientation, data_type: DataType) -> u64 {
		match orientation {
			Orientation::V => u64::from(self.num_cols),
			Orientation::H => u64::from(self.num_cols / data_type.bits()),
		}
	}

	/// Number of rows a region of `num_elements` elements occupies
	pub fn region_rows(&self, orientation: Orientation, data_type: DataType, num_elements: u64) -> u32 {
		match orientation {
			Orientation::V => data_type.bits(),
			Orientation::H => {
				let bits = num_elements * u64::from(data_type.bits());
				bits.div_ceil(u64::from(self.num_cols)).max(1) as u32
			},
		}
	}
}

/// Partitions `num_elements` elements over the cores.
///
/// Returns, for each core used, the number of elements it holds, in element order.
pub fn partition(
	shape: &CoreShape,
	orientation: Orientation,
	single_region: bool,
	num_elements: u64,
	data_type: DataType,
) -> PimResult<Vec<(CoreIdx, u64)>> {
	if num_elements == 0 {
		return Err(PimError::InvalidArgument("Cannot allocate zero elements".to_owned()));
	}

	let elements_per_region = shape.elements_per_region(orientation, data_type);
	if elements_per_region == 0 || shape.num_cores == 0 {
		return Err(PimError::OutOfCapacity(format!(
			"A row of {} columns cannot hold a {data_type} element",
			shape.num_cols
		)));
	}

	let num_cores_used = match single_region {
		true => num_elements.min(u64::from(shape.num_cores)),
		false => num_elements
			.div_ceil(elements_per_region)
			.min(u64::from(shape.num_cores)),
	};

	let base = num_elements / num_cores_used;
	let extra = num_elements % num_cores_used;
	if single_region && base + u64::from(extra > 0) > elements_per_region {
		return Err(PimError::OutOfCapacity(format!(
			"{num_elements} elements don't fit in a single region per core ({} cores of {elements_per_region} \
			 elements)",
			shape.num_cores
		)));
	}

	let partition = (0..num_cores_used)
		.map(|core_idx| {
			let count = base + u64::from(core_idx < extra);
			(CoreIdx::new(core_idx as u32), count)
		})
		.collect();

	Ok(partition)
}

/// Splits `num_elements` elements into region sizes of at most `elements_per_region`
pub fn split_regions(num_elements: u64, elements_per_region: u64) -> impl Iterator<Item = u64> {
	let num_regions = num_elements.div_ceil(elements_per_region);
	(0..num_regions).map(move |region_idx| {
		let begin = region_idx * elements_per_region;
		(num_elements - begin).min(elements_per_region)
	})
}
