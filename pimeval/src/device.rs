//! PIM device
//!
//! Owns the simulated topology, the per-core row bookkeeping and every
//! object allocated on the device.

// Modules
pub mod cores;
pub mod objects;
pub mod placement;

// Exports
pub use self::{
	cores::{CoreIdx, Cores},
	objects::{Entry, ObjId, Object, Objects, RefKind, Reference, Region},
	placement::CoreShape,
};

// Imports
use {
	crate::{
		config::Params,
		data_type::DataType,
		dram::{DramParams, Protocol},
		error::{PimError, PimResult},
	},
	anyhow::Context,
	std::{
		collections::BTreeMap,
		fmt,
		ops::Range,
		path::Path,
	},
};

/// Device kind
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum DeviceKind {
	/// Functional simulation only, costs taken from the simulation target
	Functional,

	/// Bit-serial, subarray-level, with row-wide bit registers
	BitsimdV,

	/// Bit-serial, subarray-level, with analog row-wide majority
	BitsimdVAp,

	/// Bit-serial, subarray-level, using triple-row activations
	Simdram,

	/// Bit-parallel, subarray-level word ALUs
	Fulcrum,

	/// Bit-parallel, bank-level SIMD units
	BankLevel,

	/// Bit-parallel, bank-level SIMD units with a global buffer (HBM-PIM style)
	Aquabolt,
}

impl DeviceKind {
	/// All device kinds
	pub const ALL: [Self; 7] = [
		Self::Functional,
		Self::BitsimdV,
		Self::BitsimdVAp,
		Self::Simdram,
		Self::Fulcrum,
		Self::BankLevel,
		Self::Aquabolt,
	];

	/// Default simulation target for functional devices
	pub const DEFAULT_SIM_TARGET: Self = Self::BitsimdV;

	/// Returns this kind's name
	pub const fn name(self) -> &'static str {
		match self {
			Self::Functional => "functional",
			Self::BitsimdV => "bitsimd_v",
			Self::BitsimdVAp => "bitsimd_v_ap",
			Self::Simdram => "simdram",
			Self::Fulcrum => "fulcrum",
			Self::BankLevel => "bank_level",
			Self::Aquabolt => "aquabolt",
		}
	}

	/// Looks up a kind by name
	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|kind| kind.name() == name)
	}

	/// Returns if this kind computes bit-serially on vertical layouts
	pub const fn is_bit_serial(self) -> bool {
		matches!(self, Self::BitsimdV | Self::BitsimdVAp | Self::Simdram)
	}

	/// Returns if objects on this kind default to horizontal layouts
	pub const fn is_h_layout(self) -> bool {
		matches!(self, Self::Fulcrum | Self::BankLevel | Self::Aquabolt)
	}

	/// Returns if a core of this kind spans a whole bank
	pub const fn is_bank_level(self) -> bool {
		matches!(self, Self::BankLevel | Self::Aquabolt)
	}
}

impl fmt::Display for DeviceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.pad(self.name())
	}
}

/// Device topology
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Topology {
	pub num_ranks:             u32,
	pub num_bank_per_rank:     u32,
	pub num_subarray_per_bank: u32,
	pub num_row_per_subarray:  u32,
	pub num_col_per_subarray:  u32,

	/// Global buffer size, in bytes
	pub buffer_size: u32,
}

impl Topology {
	/// Creates a topology with the default buffer size
	pub fn new(
		num_ranks: u32,
		num_bank_per_rank: u32,
		num_subarray_per_bank: u32,
		num_row_per_subarray: u32,
		num_col_per_subarray: u32,
	) -> Self {
		Self {
			num_ranks,
			num_bank_per_rank,
			num_subarray_per_bank,
			num_row_per_subarray,
			num_col_per_subarray,
			buffer_size: Self::default().buffer_size,
		}
	}

	/// Returns the core shape of this topology on a device of kind `kind`
	pub fn core_shape(&self, kind: DeviceKind) -> CoreShape {
		let num_banks = self.num_ranks * self.num_bank_per_rank;
		match kind.is_bank_level() {
			true => CoreShape {
				num_cores: num_banks,
				num_rows:  self.num_subarray_per_bank * self.num_row_per_subarray,
				num_cols:  self.num_col_per_subarray,
			},
			false => CoreShape {
				num_cores: num_banks * self.num_subarray_per_bank,
				num_rows:  self.num_row_per_subarray,
				num_cols:  self.num_col_per_subarray,
			},
		}
	}

	/// Checks that every dimension is non-zero and the core count fits
	fn validate(&self) -> PimResult<()> {
		let dims = [
			self.num_ranks,
			self.num_bank_per_rank,
			self.num_subarray_per_bank,
			self.num_row_per_subarray,
			self.num_col_per_subarray,
		];
		if dims.contains(&0) {
			return Err(PimError::InvalidArgument(format!("Topology has a zero dimension: {self:?}")));
		}

		let num_cores = u64::from(self.num_ranks) * u64::from(self.num_bank_per_rank) *
			u64::from(self.num_subarray_per_bank);
		let num_rows = u64::from(self.num_subarray_per_bank) * u64::from(self.num_row_per_subarray);
		if num_cores > u64::from(u32::MAX) || num_rows > u64::from(u32::MAX) {
			return Err(PimError::InvalidArgument(format!("Topology is too large: {self:?}")));
		}

		Ok(())
	}
}

impl Default for Topology {
	fn default() -> Self {
		// Each rank has 8 chips of 16 banks, each with 32 subarrays
		Self {
			num_ranks:             4,
			num_bank_per_rank:     128,
			num_subarray_per_bank: 32,
			num_row_per_subarray:  1024,
			num_col_per_subarray:  8192,
			buffer_size:           2048,
		}
	}
}

/// Device configuration
#[derive(Clone, Debug)]
pub struct DeviceConfig {
	/// Topology
	pub topology: Topology,

	/// DRAM parameters
	pub dram: DramParams,

	/// Simulation target, for functional devices
	pub sim_target: Option<DeviceKind>,

	/// Whether to skip functional simulation
	pub analysis_mode: bool,
}

impl DeviceConfig {
	/// Creates a configuration with DDR parameters
	pub fn new(topology: Topology) -> Self {
		Self {
			topology,
			dram: DramParams::default(),
			sim_target: None,
			analysis_mode: false,
		}
	}

	/// Replaces the DRAM parameters with the defaults of `protocol`
	#[must_use]
	pub fn with_protocol(self, protocol: Protocol) -> Self {
		Self {
			dram: DramParams::new(protocol),
			..self
		}
	}

	/// Parses a configuration from parameters.
	///
	/// DRAM parameters are read from `memory_config_file` (relative to `base_dir`) when
	/// present, else from `params` itself.
	pub fn from_params(params: &Params, base_dir: &Path) -> Result<Self, anyhow::Error> {
		let default = Topology::default();
		let topology = Topology {
			num_ranks:             params.parse_value("num_ranks")?.unwrap_or(default.num_ranks),
			num_bank_per_rank:     params.parse_value("num_bank_per_rank")?.unwrap_or(default.num_bank_per_rank),
			num_subarray_per_bank: params
				.parse_value("num_subarray_per_bank")?
				.unwrap_or(default.num_subarray_per_bank),
			num_row_per_subarray:  params
				.parse_value("num_row_per_subarray")?
				.unwrap_or(default.num_row_per_subarray),
			num_col_per_subarray:  params
				.parse_value("num_col_per_subarray")?
				.unwrap_or(default.num_col_per_subarray),
			buffer_size:           params.parse_value("buffer_size")?.unwrap_or(default.buffer_size),
		};

		let sim_target = params
			.get("simulation_target")
			.map(|name| DeviceKind::from_name(name).with_context(|| format!("Unknown simulation target: {name:?}")))
			.transpose()?;
		let analysis_mode = params.parse_bool("analysis_mode")?.unwrap_or(false);

		let dram = match params.get("memory_config_file") {
			Some(path) => DramParams::from_config_file(&base_dir.join(path))?,
			None if params.get("protocol").is_some() => DramParams::from_params(params)?,
			None => DramParams::default(),
		};

		Ok(Self {
			topology,
			dram,
			sim_target,
			analysis_mode,
		})
	}

	/// Reads a configuration from a file
	pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
		let params = Params::from_file(path)?;
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
		Self::from_params(&params, base_dir).with_context(|| format!("Invalid device config file {path:?}"))
	}
}

/// Device properties
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct DeviceProperties {
	pub device_kind:           DeviceKind,
	pub sim_target:            DeviceKind,
	pub protocol:              Protocol,
	pub num_ranks:             u32,
	pub num_bank_per_rank:     u32,
	pub num_subarray_per_bank: u32,
	pub num_row_per_subarray:  u32,
	pub num_col_per_subarray:  u32,
	pub num_cores:             u32,
	pub num_row_per_core:      u32,
	pub num_col_per_core:      u32,
	pub buffer_size:           u32,
	pub is_h_layout_device:    bool,
	pub analysis_mode:         bool,
}

/// Allocation layout, as requested
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum AllocLayout {
	/// Vertical or horizontal, depending on the device kind
	Auto,

	/// Vertical, multiple regions per core
	V,

	/// Horizontal, multiple regions per core
	H,

	/// Vertical, at most one region per core
	V1,

	/// Horizontal, at most one region per core
	H1,
}

impl AllocLayout {
	/// Resolves this layout on a device
	pub fn resolve(self, is_h_layout_device: bool) -> Layout {
		let (orientation, single_region) = match self {
			Self::Auto => match is_h_layout_device {
				true => (Orientation::H, false),
				false => (Orientation::V, false),
			},
			Self::V => (Orientation::V, false),
			Self::H => (Orientation::H, false),
			Self::V1 => (Orientation::V, true),
			Self::H1 => (Orientation::H, true),
		};

		Layout {
			orientation,
			single_region,
		}
	}
}

/// Element orientation
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Orientation {
	/// An element's bits run down a column
	V,

	/// Elements run along a row
	H,
}

/// Resolved object layout
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Layout {
	pub orientation:   Orientation,
	pub single_region: bool,
}

/// A resolved view of an object or reference
#[derive(Clone, Debug)]
pub struct ObjView {
	pub id:           ObjId,
	pub data_type:    DataType,
	pub num_elements: u64,
	pub layout:       Layout,
	pub is_buffer:    bool,

	/// Regions backing the view, re-based so the view's first element is 0
	pub regions: Vec<Region>,
}

impl ObjView {
	/// Returns the footprint of the elements in `range`
	pub fn footprint(&self, range: Range<u64>) -> Footprint {
		let mut regions_per_core = BTreeMap::<CoreIdx, u32>::new();
		let mut footprint = Footprint::default();
		for region in &self.regions {
			let elements = region.elements();
			let overlap = elements.end.min(range.end).saturating_sub(elements.start.max(range.start));
			if overlap == 0 {
				continue;
			}

			*regions_per_core.entry(region.core_idx).or_default() += 1;
			footprint.max_region_elements = footprint.max_region_elements.max(overlap);
			footprint.max_region_rows = footprint.max_region_rows.max(region.num_rows);
		}

		footprint.num_cores = regions_per_core.len() as u32;
		footprint.num_passes = regions_per_core.into_values().max().unwrap_or(0);
		footprint
	}

	/// Returns the footprint of all elements
	pub fn full_footprint(&self) -> Footprint {
		self.footprint(0..self.num_elements)
	}
}

/// Physical extent of the elements an operation touches
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub struct Footprint {
	/// Cores holding at least one element
	pub num_cores: u32,

	/// Maximum number of regions any core holds
	pub num_passes: u32,

	/// Maximum number of elements in any region
	pub max_region_elements: u64,

	/// Maximum number of rows of any region
	pub max_region_rows: u32,
}

/// PIM device
#[derive(Debug)]
pub struct Device {
	/// Kind
	kind: DeviceKind,

	/// Kind whose cost model is used
	sim_target: DeviceKind,

	/// Topology
	topology: Topology,

	/// DRAM parameters
	dram: DramParams,

	/// Whether to skip functional simulation
	analysis_mode: bool,

	/// Core shape
	shape: CoreShape,

	/// Cores
	cores: Cores,

	/// Objects
	objects: Objects,

	/// Bytes of the global buffer in use
	buffer_bytes_used: u64,
}

impl Device {
	/// Creates a new device
	pub fn new(kind: DeviceKind, config: DeviceConfig) -> PimResult<Self> {
		config.topology.validate()?;

		let sim_target = match kind {
			DeviceKind::Functional => config.sim_target.unwrap_or(DeviceKind::DEFAULT_SIM_TARGET),
			_ => kind,
		};
		if sim_target == DeviceKind::Functional {
			return Err(PimError::InvalidArgument(
				"A functional device cannot be its own simulation target".to_owned(),
			));
		}

		let shape = config.topology.core_shape(sim_target);
		tracing::debug!(?kind, ?sim_target, ?config, ?shape, "Creating device");

		Ok(Self {
			kind,
			sim_target,
			topology: config.topology,
			dram: config.dram,
			analysis_mode: config.analysis_mode,
			shape,
			cores: Cores::new(shape.num_cores, shape.num_rows),
			objects: Objects::new(),
			buffer_bytes_used: 0,
		})
	}

	/// Returns the device kind
	pub fn kind(&self) -> DeviceKind {
		self.kind
	}

	/// Returns the kind whose cost model is used
	pub fn sim_target(&self) -> DeviceKind {
		self.sim_target
	}

	/// Returns the topology
	pub fn topology(&self) -> &Topology {
		&self.topology
	}

	/// Returns the DRAM parameters
	pub fn dram(&self) -> &DramParams {
		&self.dram
	}

	/// Returns the core shape
	pub fn shape(&self) -> &CoreShape {
		&self.shape
	}

	/// Returns the cores
	pub fn cores(&self) -> &Cores {
		&self.cores
	}

	/// Returns if functional simulation is skipped
	pub fn is_analysis_mode(&self) -> bool {
		self.analysis_mode
	}

	/// Returns if objects default to horizontal layouts
	pub fn is_h_layout_device(&self) -> bool {
		self.sim_target.is_h_layout()
	}

	/// Returns the number of live objects and references
	pub fn num_objects(&self) -> usize {
		self.objects.len()
	}

	/// Returns the device properties
	pub fn properties(&self) -> DeviceProperties {
		DeviceProperties {
			device_kind:           self.kind,
			sim_target:            self.sim_target,
			protocol:              self.dram.protocol(),
			num_ranks:             self.topology.num_ranks,
			num_bank_per_rank:     self.topology.num_bank_per_rank,
			num_subarray_per_bank: self.topology.num_subarray_per_bank,
			num_row_per_subarray:  self.topology.num_row_per_subarray,
			num_col_per_subarray:  self.topology.num_col_per_subarray,
			num_cores:             self.shape.num_cores,
			num_row_per_core:      self.shape.num_rows,
			num_col_per_core:      self.shape.num_cols,
			buffer_size:           self.topology.buffer_size,
			is_h_layout_device:    self.is_h_layout_device(),
			analysis_mode:         self.analysis_mode,
		}
	}

	/// Allocates an object of `num_elements` elements
	pub fn alloc(&mut self, alloc_layout: AllocLayout, num_elements: u64, data_type: DataType) -> PimResult<ObjId> {
		let layout = alloc_layout.resolve(self.is_h_layout_device());
		let partition = placement::partition(
			&self.shape,
			layout.orientation,
			layout.single_region,
			num_elements,
			data_type,
		)?;

		let elements_per_region = self.shape.elements_per_region(layout.orientation, data_type);
		let region_sizes = partition.into_iter().flat_map(|(core_idx, count)| {
			placement::split_regions(count, elements_per_region).map(move |num_elements| (core_idx, num_elements))
		});
		let regions = self.reserve_regions(layout.orientation, data_type, region_sizes)?;

		self.insert_object(Object {
			data_type,
			layout,
			regions,
			is_buffer: false,
			data: vec![0; num_elements as usize],
		})
	}

	/// Allocates an object with the same placement as `assoc_id`
	pub fn alloc_associated(&mut self, assoc_id: ObjId, data_type: DataType) -> PimResult<ObjId> {
		let assoc = self.objects.object(assoc_id)?;
		if assoc.is_buffer {
			return Err(PimError::InvalidArgument(format!(
				"Cannot associate with global buffer {assoc_id}"
			)));
		}

		let layout = assoc.layout;
		let num_elements = assoc.len();
		let region_sizes = assoc
			.regions
			.iter()
			.map(|region| (region.core_idx, region.num_elements))
			.collect::<Vec<_>>();
		let regions = self.reserve_regions(layout.orientation, data_type, region_sizes)?;

		self.insert_object(Object {
			data_type,
			layout,
			regions,
			is_buffer: false,
			data: vec![0; num_elements as usize],
		})
	}

	/// Allocates elements on the global buffer
	pub fn alloc_buffer(&mut self, num_elements: u64, data_type: DataType) -> PimResult<ObjId> {
		if num_elements == 0 {
			return Err(PimError::InvalidArgument("Cannot allocate zero elements".to_owned()));
		}

		let bytes = num_elements.saturating_mul(data_type.host_bytes());
		let capacity = u64::from(self.topology.buffer_size);
		if self.buffer_bytes_used + bytes > capacity {
			return Err(PimError::OutOfCapacity(format!(
				"Global buffer needs {bytes} bytes, {} of {capacity} in use",
				self.buffer_bytes_used
			)));
		}

		let id = self.objects.insert(Entry::Object(Object {
			data_type,
			layout: AllocLayout::H1.resolve(true),
			regions: vec![],
			is_buffer: true,
			data: vec![0; num_elements as usize],
		}))?;
		self.buffer_bytes_used += bytes;
		tracing::debug!(?id, ?num_elements, ?data_type, "Allocated global buffer");

		Ok(id)
	}

	/// Frees an object, or a reference.
	///
	/// Freeing an object also frees every reference to it.
	pub fn free(&mut self, id: ObjId) -> PimResult<()> {
		let (entry, dependents) = self.objects.remove(id)?;
		if let Entry::Object(obj) = entry {
			match obj.is_buffer {
				true => self.buffer_bytes_used -= obj.len() * obj.data_type.host_bytes(),
				false => self.release_regions(&obj.regions),
			}
		}

		tracing::debug!(?id, ?dependents, "Freed object");
		Ok(())
	}

	/// Creates a reference to the negation of `base_id`
	pub fn create_dual_contact_ref(&mut self, base_id: ObjId) -> PimResult<ObjId> {
		self.reference_base(base_id)?;
		self.objects.insert(Entry::Reference(Reference {
			base: base_id,
			kind: RefKind::DualContact,
		}))
	}

	/// Creates a reference to the `begin..end` elements of `base_id`
	pub fn create_ranged_ref(&mut self, base_id: ObjId, begin: u64, end: u64) -> PimResult<ObjId> {
		let base = self.reference_base(base_id)?;
		if begin >= end || end > base.len() {
			return Err(PimError::InvalidRange {
				begin,
				end,
				len: base.len(),
			});
		}

		self.objects.insert(Entry::Reference(Reference {
			base: base_id,
			kind: RefKind::Ranged { begin, end },
		}))
	}

	/// Returns a view of an object or reference
	pub fn view(&self, id: ObjId) -> PimResult<ObjView> {
		let (base_id, kind) = match self.objects.get(id)? {
			Entry::Object(_) => (id, None),
			Entry::Reference(reference) => (reference.base, Some(reference.kind)),
		};
		let base = self.objects.object(base_id)?;

		let view = match kind {
			None | Some(RefKind::DualContact) => ObjView {
				id,
				data_type: base.data_type,
				num_elements: base.len(),
				layout: base.layout,
				is_buffer: base.is_buffer,
				regions: base.regions.clone(),
			},
			Some(RefKind::Ranged { begin, end }) => ObjView {
				id,
				data_type: base.data_type,
				num_elements: end - begin,
				layout: base.layout,
				is_buffer: base.is_buffer,
				regions: base
					.regions
					.iter()
					.filter_map(|region| {
						let elements = region.elements();
						let start = elements.start.max(begin);
						let stop = elements.end.min(end);
						(start < stop).then(|| Region {
							elem_begin: start - begin,
							num_elements: stop - start,
							..*region
						})
					})
					.collect(),
			},
		};

		Ok(view)
	}

	/// Reads all elements of an object or reference
	pub fn read(&self, id: ObjId) -> PimResult<Vec<u64>> {
		let values = match self.objects.get(id)? {
			Entry::Object(obj) => obj.data.clone(),
			Entry::Reference(reference) => {
				let base = self.objects.object(reference.base)?;
				match reference.kind {
					RefKind::DualContact => base.data.iter().map(|&bits| base.data_type.truncate(!bits)).collect(),
					RefKind::Ranged { begin, end } => base.data[begin as usize..end as usize].to_vec(),
				}
			},
		};

		Ok(values)
	}

	/// Writes all elements of an object or reference.
	///
	/// Values are truncated to the data type's width.
	pub fn write(&mut self, id: ObjId, values: Vec<u64>) -> PimResult<()> {
		let (base_id, kind) = match self.objects.get(id)? {
			Entry::Object(_) => (id, None),
			Entry::Reference(reference) => (reference.base, Some(reference.kind)),
		};
		let base = self.objects.object_mut(base_id)?;
		let data_type = base.data_type;

		let expected = match kind {
			Some(RefKind::Ranged { begin, end }) => end - begin,
			None | Some(RefKind::DualContact) => base.len(),
		};
		if values.len() as u64 != expected {
			return Err(PimError::size_mismatch(expected, values.len() as u64));
		}

		match kind {
			None => base.data = values.into_iter().map(|bits| data_type.truncate(bits)).collect(),
			Some(RefKind::DualContact) => base.data = values.into_iter().map(|bits| data_type.truncate(!bits)).collect(),
			Some(RefKind::Ranged { begin, end }) => {
				let values = values.into_iter().map(|bits| data_type.truncate(bits));
				base.data.splice(begin as usize..end as usize, values);
			},
		}

		Ok(())
	}

	/// Returns the base object of a new reference to `base_id`
	fn reference_base(&self, base_id: ObjId) -> PimResult<&Object> {
		match self.objects.get(base_id)? {
			Entry::Object(obj) if obj.is_buffer => Err(PimError::InvalidReference(format!(
				"Cannot reference global buffer {base_id}"
			))),
			Entry::Object(obj) => Ok(obj),
			Entry::Reference(_) => Err(PimError::InvalidReference(format!(
				"Cannot reference reference {base_id}"
			))),
		}
	}

	/// Inserts a new object
	fn insert_object(&mut self, obj: Object) -> PimResult<ObjId> {
		let regions = obj.regions.clone();
		let (num_elements, data_type) = (obj.len(), obj.data_type);
		match self.objects.insert(Entry::Object(obj)) {
			Ok(id) => {
				tracing::debug!(
					?id,
					?num_elements,
					?data_type,
					num_regions = regions.len(),
					"Allocated object"
				);
				Ok(id)
			},
			Err(err) => {
				self.release_regions(&regions);
				Err(err)
			},
		}
	}

	/// Reserves rows for regions of the given sizes, in element order.
	///
	/// On failure, every row reserved so far is released.
	fn reserve_regions(
		&mut self,
		orientation: Orientation,
		data_type: DataType,
		region_sizes: impl IntoIterator<Item = (CoreIdx, u64)>,
	) -> PimResult<Vec<Region>> {
		let mut regions = vec![];
		let mut elem_begin = 0;
		for (core_idx, num_elements) in region_sizes {
			let num_rows = self.shape.region_rows(orientation, data_type, num_elements);
			match self.cores.reserve_rows(core_idx, num_rows) {
				Ok(row) => regions.push(Region {
					core_idx,
					row,
					num_rows,
					elem_begin,
					num_elements,
				}),
				Err(err) => {
					tracing::trace!(?core_idx, ?num_rows, ?err, "Unable to reserve rows");
					self.release_regions(&regions);
					return Err(PimError::OutOfCapacity(format!(
						"Unable to reserve {num_rows} rows on core {core_idx}: {err}"
					)));
				},
			}
			elem_begin += num_elements;
		}

		Ok(regions)
	}

	/// Releases the rows of all `regions`
	fn release_regions(&mut self, regions: &[Region]) {
		for region in regions {
			if let Err(err) = self.cores.release_rows(region.core_idx, region.row) {
				tracing::warn!(?region, ?err, "Unable to release region rows");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn small_device(kind: DeviceKind) -> Device {
		let topology = Topology {
			num_ranks:             1,
			num_bank_per_rank:     2,
			num_subarray_per_bank: 2,
			num_row_per_subarray:  64,
			num_col_per_subarray:  32,
			buffer_size:           64,
		};
		Device::new(kind, DeviceConfig::new(topology)).expect("Unable to create device")
	}

	#[test]
	fn functional_targets() {
		let device = small_device(DeviceKind::Functional);
		assert_eq!(device.sim_target(), DeviceKind::BitsimdV);
		assert_eq!(device.properties().num_cores, 4);
		assert!(!device.properties().is_h_layout_device);

		let device = small_device(DeviceKind::Aquabolt);
		let props = device.properties();
		assert_eq!((props.num_cores, props.num_row_per_core), (2, 128));
		assert!(props.is_h_layout_device);
	}

	#[test]
	fn capacity_bookkeeping() {
		let mut device = small_device(DeviceKind::BitsimdV);

		// 4 cores * 32 columns, 2 regions of 32 rows each per core
		let a = device.alloc(AllocLayout::V, 256, DataType::Int32).expect("Unable to allocate");
		assert_eq!(device.cores().rows_used(), 4 * 64);
		assert!(matches!(
			device.alloc(AllocLayout::V, 1, DataType::Bool),
			Err(PimError::OutOfCapacity(_))
		));

		device.free(a).expect("Unable to free");
		assert_eq!(device.cores().rows_used(), 0);
		assert!(device.alloc(AllocLayout::V, 1, DataType::Bool).is_ok());
	}

	#[test]
	fn failed_allocations_roll_back() {
		let mut device = small_device(DeviceKind::BitsimdV);
		let _a = device.alloc(AllocLayout::V, 32, DataType::Int32).expect("Unable to allocate");

		// Needs 2 regions on core 0, which only has 32 free rows
		assert!(device.alloc(AllocLayout::V, 256, DataType::Int32).is_err());
		assert_eq!(device.cores().rows_used(), 32);
	}

	#[test]
	fn associated_placement() {
		let mut device = small_device(DeviceKind::BitsimdV);
		let a = device.alloc(AllocLayout::Auto, 70, DataType::Int32).expect("Unable to allocate");
		let b = device.alloc_associated(a, DataType::Bool).expect("Unable to allocate");

		let (a, b) = (device.view(a).expect("Missing a"), device.view(b).expect("Missing b"));
		assert_eq!(a.num_elements, b.num_elements);
		let shape = |view: &ObjView| {
			view.regions
				.iter()
				.map(|region| (region.core_idx, region.num_elements))
				.collect::<Vec<_>>()
		};
		assert_eq!(shape(&a), shape(&b));
		assert_eq!(b.regions[0].num_rows, 1);

		assert!(matches!(
			device.alloc_associated(ObjId::INVALID, DataType::Int32),
			Err(PimError::ObjectNotFound(_))
		));
	}

	#[test]
	fn references() {
		let mut device = small_device(DeviceKind::BitsimdV);
		let obj = device.alloc(AllocLayout::V, 8, DataType::UInt8).expect("Unable to allocate");
		device.write(obj, (0..8).collect()).expect("Unable to write");

		let neg = device.create_dual_contact_ref(obj).expect("Unable to create ref");
		assert_eq!(device.read(neg).expect("Unable to read")[..2], [0xff, 0xfe]);

		let range = device.create_ranged_ref(obj, 2, 5).expect("Unable to create ref");
		assert_eq!(device.read(range).expect("Unable to read"), [2, 3, 4]);
		device.write(range, vec![7, 7, 7]).expect("Unable to write");
		assert_eq!(device.read(obj).expect("Unable to read"), [0, 1, 7, 7, 7, 5, 6, 7]);

		assert!(matches!(device.create_ranged_ref(neg, 0, 1), Err(PimError::InvalidReference(_))));
		assert!(matches!(device.create_ranged_ref(obj, 4, 9), Err(PimError::InvalidRange { .. })));

		device.free(obj).expect("Unable to free");
		assert!(matches!(device.read(neg), Err(PimError::ObjectNotFound(_))));
		assert!(matches!(device.read(range), Err(PimError::ObjectNotFound(_))));
	}

	#[test]
	fn global_buffer() {
		let mut device = small_device(DeviceKind::Aquabolt);
		let buffer = device.alloc_buffer(16, DataType::Int32).expect("Unable to allocate");
		assert!(device.alloc_buffer(1, DataType::Int8).is_err());
		device.free(buffer).expect("Unable to free");
		assert!(device.alloc_buffer(64, DataType::Int8).is_ok());
	}
}
