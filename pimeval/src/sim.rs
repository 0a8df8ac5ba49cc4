//! Simulator
//!
//! Owns the (optional) device and the statistics, and exposes every
//! operation as a method. Each operation is turned into a [`Cmd`] and run
//! through [`Simulator::run`]: the command is planned and costed before
//! anything is touched, so a failing operation leaves both the device and
//! the statistics unchanged.

// Imports
use {
	crate::{
		cmd::{BinOp, BroadcastValue, Cmd, CopyType, MoveOp, Output, ReduceOp},
		config,
		data_type::{DataType, Element},
		device::{AllocLayout, Device, DeviceConfig, DeviceKind, DeviceProperties, ObjId, Topology},
		error::{PimError, PimResult},
		perf,
		stats::{Statistics, StatsSnapshot},
	},
	pimeval_util::DisplayWrapper,
	std::{env, fmt, ops::Range, path::Path},
};

/// Environment variable that forces analysis mode
pub const ANALYSIS_MODE_ENV: &str = "PIMEVAL_ANALYSIS_MODE";

/// Extension trait to convert host element slices to raw bits
#[extend::ext(name = ElementsExt)]
impl<T: Element> [T] {
	fn to_bits_vec(&self) -> Vec<u64> {
		self.iter().map(|&value| value.to_bits()).collect()
	}
}

/// PIM simulator
#[derive(Debug, Default)]
pub struct Simulator {
	/// Device, if created
	device: Option<Device>,

	/// Statistics
	stats: Statistics,
}

impl Simulator {
	/// Creates a simulator with no device
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a device with an explicit topology and DDR parameters
	pub fn create_device(&mut self, kind: DeviceKind, topology: Topology) -> PimResult<()> {
		self.create_device_with_config(kind, DeviceConfig::new(topology))
	}

	/// Creates a device from a configuration file
	pub fn create_device_from_config(&mut self, kind: DeviceKind, path: &Path) -> PimResult<()> {
		if self.device.is_some() {
			return Err(PimError::DeviceExists);
		}

		let config = DeviceConfig::from_file(path).map_err(PimError::Config)?;
		self.create_device_with_config(kind, config)
	}

	/// Creates a device from a configuration
	pub fn create_device_with_config(&mut self, kind: DeviceKind, mut config: DeviceConfig) -> PimResult<()> {
		if self.device.is_some() {
			return Err(PimError::DeviceExists);
		}

		if let Ok(value) = env::var(ANALYSIS_MODE_ENV) {
			match config::parse_bool(&value) {
				Ok(analysis_mode) => config.analysis_mode |= analysis_mode,
				Err(err) => tracing::warn!("Ignoring invalid {ANALYSIS_MODE_ENV}={value:?}: {err:?}"),
			}
		}

		let device = Device::new(kind, config)?;
		tracing::debug!(properties = ?device.properties(), "Created device");
		self.device = Some(device);

		Ok(())
	}

	/// Deletes the device, freeing every object
	pub fn delete_device(&mut self) -> PimResult<()> {
		let device = self.device.take().ok_or(PimError::NoDevice)?;
		tracing::debug!(kind = ?device.kind(), num_objects = device.num_objects(), "Deleted device");

		Ok(())
	}

	/// Returns the device properties
	pub fn device_properties(&self) -> PimResult<DeviceProperties> {
		Ok(self.device()?.properties())
	}

	/// Returns if functional simulation is being skipped
	pub fn is_analysis_mode(&self) -> bool {
		self.device.as_ref().is_some_and(Device::is_analysis_mode)
	}

	/// Returns the device
	pub fn device(&self) -> PimResult<&Device> {
		self.device.as_ref().ok_or(PimError::NoDevice)
	}

	/// Returns the device mutably
	fn device_mut(&mut self) -> PimResult<&mut Device> {
		self.device.as_mut().ok_or(PimError::NoDevice)
	}

	/// Allocates an object
	pub fn alloc(&mut self, layout: AllocLayout, num_elements: u64, data_type: DataType) -> PimResult<ObjId> {
		self.device_mut()?.alloc(layout, num_elements, data_type)
	}

	/// Allocates an object placed like `assoc_id`
	pub fn alloc_associated(&mut self, assoc_id: ObjId, data_type: DataType) -> PimResult<ObjId> {
		self.device_mut()?.alloc_associated(assoc_id, data_type)
	}

	/// Allocates an object in the global buffer
	pub fn alloc_buffer(&mut self, num_elements: u64, data_type: DataType) -> PimResult<ObjId> {
		self.device_mut()?.alloc_buffer(num_elements, data_type)
	}

	/// Frees an object, along with all it's references
	pub fn free(&mut self, id: ObjId) -> PimResult<()> {
		self.device_mut()?.free(id)
	}

	/// Creates a reference whose elements are the bitwise negation of `base_id`'s
	pub fn create_dual_contact_ref(&mut self, base_id: ObjId) -> PimResult<ObjId> {
		self.device_mut()?.create_dual_contact_ref(base_id)
	}

	/// Creates a reference to elements `begin..end` of `base_id`
	pub fn create_ranged_ref(&mut self, base_id: ObjId, begin: u64, end: u64) -> PimResult<ObjId> {
		self.device_mut()?.create_ranged_ref(base_id, begin, end)
	}

	/// Copies `src` into elements `range` of `dest`.
	///
	/// `0..0` copies into the whole object.
	pub fn copy_host_to_device<T: Element>(&mut self, src: &[T], dest: ObjId, range: Range<u64>) -> PimResult<()> {
		self.ensure_host_type::<T>(self.data_type(dest)?)?;
		self.run(Cmd::CopyHostToDevice {
			values: src.to_bits_vec(),
			dest,
			range,
			copy_type: None,
		})
		.map(drop)
	}

	/// Copies elements `range` of `src` into `dest`.
	///
	/// `0..0` copies the whole object.
	pub fn copy_device_to_host<T: Element>(&mut self, src: ObjId, dest: &mut [T], range: Range<u64>) -> PimResult<()> {
		self.ensure_host_type::<T>(self.data_type(src)?)?;
		let output = self.run(Cmd::CopyDeviceToHost {
			src,
			range,
			copy_type: None,
			host_len: dest.len() as u64,
		})?;
		self::write_host(output, dest);

		Ok(())
	}

	/// Copies `src`, laid out as `copy_type`, into elements `range` of `dest`.
	///
	/// `0..0` copies into the whole object.
	pub fn copy_host_to_device_with_type<T: Element>(
		&mut self,
		copy_type: CopyType,
		src: &[T],
		dest: ObjId,
		range: Range<u64>,
	) -> PimResult<()> {
		self.ensure_host_type::<T>(self.data_type(dest)?)?;
		self.run(Cmd::CopyHostToDevice {
			values: src.to_bits_vec(),
			dest,
			range,
			copy_type: Some(copy_type),
		})
		.map(drop)
	}

	/// Copies elements `range` of `src` into `dest`, laid out as `copy_type`.
	///
	/// `0..0` copies the whole object.
	pub fn copy_device_to_host_with_type<T: Element>(
		&mut self,
		copy_type: CopyType,
		src: ObjId,
		dest: &mut [T],
		range: Range<u64>,
	) -> PimResult<()> {
		self.ensure_host_type::<T>(self.data_type(src)?)?;
		let output = self.run(Cmd::CopyDeviceToHost {
			src,
			range,
			copy_type: Some(copy_type),
			host_len: dest.len() as u64,
		})?;
		self::write_host(output, dest);

		Ok(())
	}

	/// Copies elements `range` of `src` to the same elements of `dest`
	pub fn copy_device_to_device(&mut self, src: ObjId, dest: ObjId, range: Range<u64>) -> PimResult<()> {
		self.run(Cmd::CopyDeviceToDevice { src, dest, range }).map(drop)
	}

	/// Copies all elements of `src` to `dest`
	pub fn copy_object_to_object(&mut self, src: ObjId, dest: ObjId) -> PimResult<()> {
		self.run(Cmd::CopyObjectToObject { src, dest }).map(drop)
	}

	/// Converts all elements of `src` to the type of `dest`
	pub fn convert_type(&mut self, src: ObjId, dest: ObjId) -> PimResult<()> {
		self.run(Cmd::ConvertType { src, dest }).map(drop)
	}

	pub fn add(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Add, src1, src2, dest)
	}

	pub fn sub(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Sub, src1, src2, dest)
	}

	pub fn mul(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Mul, src1, src2, dest)
	}

	/// Divides elementwise. Integer division by zero fails.
	pub fn div(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Div, src1, src2, dest)
	}

	pub fn and(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::And, src1, src2, dest)
	}

	pub fn or(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Or, src1, src2, dest)
	}

	pub fn xor(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Xor, src1, src2, dest)
	}

	pub fn xnor(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Xnor, src1, src2, dest)
	}

	pub fn min(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Min, src1, src2, dest)
	}

	pub fn max(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Max, src1, src2, dest)
	}

	/// Compares elementwise into a boolean `dest`
	pub fn gt(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Gt, src1, src2, dest)
	}

	pub fn lt(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Lt, src1, src2, dest)
	}

	pub fn eq(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Eq, src1, src2, dest)
	}

	pub fn ne(&mut self, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.binary(BinOp::Ne, src1, src2, dest)
	}

	/// Applies `op` elementwise
	pub fn binary(&mut self, op: BinOp, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.run(Cmd::Binary { op, src1, src2, dest }).map(drop)
	}

	pub fn add_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Add, src, dest, scalar)
	}

	pub fn sub_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Sub, src, dest, scalar)
	}

	pub fn mul_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Mul, src, dest, scalar)
	}

	pub fn div_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Div, src, dest, scalar)
	}

	pub fn and_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::And, src, dest, scalar)
	}

	pub fn or_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Or, src, dest, scalar)
	}

	pub fn xor_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Xor, src, dest, scalar)
	}

	pub fn xnor_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Xnor, src, dest, scalar)
	}

	pub fn min_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Min, src, dest, scalar)
	}

	pub fn max_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Max, src, dest, scalar)
	}

	pub fn gt_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Gt, src, dest, scalar)
	}

	pub fn lt_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Lt, src, dest, scalar)
	}

	pub fn eq_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Eq, src, dest, scalar)
	}

	pub fn ne_scalar(&mut self, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.binary_scalar(BinOp::Ne, src, dest, scalar)
	}

	/// Applies `op` elementwise with `scalar`, given as raw bits of the element type
	pub fn binary_scalar(&mut self, op: BinOp, src: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.run(Cmd::BinaryScalar { op, src, dest, scalar }).map(drop)
	}

	pub fn abs(&mut self, src: ObjId, dest: ObjId) -> PimResult<()> {
		self.run(Cmd::Abs { src, dest }).map(drop)
	}

	pub fn not(&mut self, src: ObjId, dest: ObjId) -> PimResult<()> {
		self.run(Cmd::Not { src, dest }).map(drop)
	}

	/// Counts the set bits of every element
	pub fn popcount(&mut self, src: ObjId, dest: ObjId) -> PimResult<()> {
		self.run(Cmd::PopCount { src, dest }).map(drop)
	}

	/// Computes `dest[i] = src1[i] * scalar + src2[i]`
	pub fn scaled_add(&mut self, src1: ObjId, src2: ObjId, dest: ObjId, scalar: u64) -> PimResult<()> {
		self.run(Cmd::ScaledAdd {
			src1,
			src2,
			dest,
			scalar,
		})
		.map(drop)
	}

	/// Computes the inclusive prefix sum of `src`.
	///
	/// Only modeled on bit-parallel devices. Bit-serial devices, and functional devices
	/// simulating one (the default target), fail with [`PimError::Unmodeled`].
	pub fn prefix_sum(&mut self, src: ObjId, dest: ObjId) -> PimResult<()> {
		self.run(Cmd::PrefixSum { src, dest }).map(drop)
	}

	/// Multiplies-accumulates every core's elements of `src1` with the global buffer `src2`.
	///
	/// `dest` holds one accumulator per core and must be initialized by the caller.
	/// In analysis mode, `dest` is left untouched.
	///
	/// Only modeled on bit-parallel devices. Bit-serial devices, and functional devices
	/// simulating one (the default target), fail with [`PimError::Unmodeled`].
	pub fn mac<T: Element>(&mut self, src1: ObjId, src2: ObjId, dest: &mut [T]) -> PimResult<()> {
		self.ensure_host_type::<T>(self.data_type(src1)?)?;
		let output = self.run(Cmd::Mac {
			src1,
			src2,
			accumulators: dest.to_bits_vec(),
		})?;
		self::write_host(output, dest);

		Ok(())
	}

	/// Sums elements `range` of `src`.
	///
	/// See [`Self::reduce`] for the result in analysis mode.
	pub fn red_sum<T: Element>(&mut self, src: ObjId, range: Range<u64>) -> PimResult<T> {
		self.reduce(ReduceOp::Sum, src, range)
	}

	/// Returns the minimum of elements `range` of `src`
	pub fn red_min<T: Element>(&mut self, src: ObjId, range: Range<u64>) -> PimResult<T> {
		self.reduce(ReduceOp::Min, src, range)
	}

	/// Returns the maximum of elements `range` of `src`
	pub fn red_max<T: Element>(&mut self, src: ObjId, range: Range<u64>) -> PimResult<T> {
		self.reduce(ReduceOp::Max, src, range)
	}

	/// Reduces elements `range` of `src`, where `0..0` is all of them.
	///
	/// The result has the accumulator type of `src`.
	///
	/// In analysis mode nothing is computed, and this returns `T::default()` (zero) for any
	/// input: the result is only a placeholder and must not be used as the reduction.
	pub fn reduce<T: Element>(&mut self, op: ReduceOp, src: ObjId, range: Range<u64>) -> PimResult<T> {
		self.ensure_host_type::<T>(self.data_type(src)?.accumulator())?;
		match self.run(Cmd::Reduce { op, src, range })? {
			Output::Scalar(bits) => Ok(T::from_bits(bits)),
			_ => Ok(T::default()),
		}
	}

	/// Extracts bit `bit_idx` of every element into a boolean `dest`
	pub fn bit_slice_extract(&mut self, src: ObjId, dest: ObjId, bit_idx: u32) -> PimResult<()> {
		self.run(Cmd::BitSliceExtract { src, dest, bit_idx }).map(drop)
	}

	/// Inserts the boolean `src` as bit `bit_idx` of every element of `dest`
	pub fn bit_slice_insert(&mut self, src: ObjId, dest: ObjId, bit_idx: u32) -> PimResult<()> {
		self.run(Cmd::BitSliceInsert { src, dest, bit_idx }).map(drop)
	}

	/// Copies `src` into `dest` where `cond` is set
	pub fn cond_copy(&mut self, cond: ObjId, src: ObjId, dest: ObjId) -> PimResult<()> {
		self.run(Cmd::CondCopy { cond, src, dest }).map(drop)
	}

	/// Sets `dest` to `scalar` where `cond` is set
	pub fn cond_broadcast(&mut self, cond: ObjId, scalar: u64, dest: ObjId) -> PimResult<()> {
		self.run(Cmd::CondBroadcast { cond, scalar, dest }).map(drop)
	}

	/// Sets `dest` to `src1` where `cond` is set, else to `src2`
	pub fn cond_select(&mut self, cond: ObjId, src1: ObjId, src2: ObjId, dest: ObjId) -> PimResult<()> {
		self.run(Cmd::CondSelect { cond, src1, src2, dest }).map(drop)
	}

	/// Sets `dest` to `src1` where `cond` is set, else to `scalar`
	pub fn cond_select_scalar(&mut self, cond: ObjId, src1: ObjId, scalar: u64, dest: ObjId) -> PimResult<()> {
		self.run(Cmd::CondSelectScalar {
			cond,
			src1,
			scalar,
			dest,
		})
		.map(drop)
	}

	/// Sets every element of an integer `dest` to `value`
	pub fn broadcast_int(&mut self, dest: ObjId, value: i64) -> PimResult<()> {
		self.broadcast(dest, BroadcastValue::Int(value))
	}

	/// Sets every element of an integer `dest` to `value`
	pub fn broadcast_uint(&mut self, dest: ObjId, value: u64) -> PimResult<()> {
		self.broadcast(dest, BroadcastValue::UInt(value))
	}

	/// Sets every element of a float `dest` to `value`
	pub fn broadcast_fp(&mut self, dest: ObjId, value: f32) -> PimResult<()> {
		self.broadcast(dest, BroadcastValue::Fp(value))
	}

	fn broadcast(&mut self, dest: ObjId, value: BroadcastValue) -> PimResult<()> {
		self.run(Cmd::Broadcast { dest, value }).map(drop)
	}

	pub fn rotate_elements_right(&mut self, obj: ObjId) -> PimResult<()> {
		self.move_elements(MoveOp::RotateRight, obj)
	}

	pub fn rotate_elements_left(&mut self, obj: ObjId) -> PimResult<()> {
		self.move_elements(MoveOp::RotateLeft, obj)
	}

	pub fn shift_elements_right(&mut self, obj: ObjId) -> PimResult<()> {
		self.move_elements(MoveOp::ShiftRight, obj)
	}

	pub fn shift_elements_left(&mut self, obj: ObjId) -> PimResult<()> {
		self.move_elements(MoveOp::ShiftLeft, obj)
	}

	/// Moves every element of `obj` by one position
	fn move_elements(&mut self, op: MoveOp, obj: ObjId) -> PimResult<()> {
		self.run(Cmd::MoveElements { op, obj }).map(drop)
	}

	pub fn shift_bits_left(&mut self, src: ObjId, dest: ObjId, amount: u32) -> PimResult<()> {
		self.run(Cmd::ShiftBits {
			left: true,
			src,
			dest,
			amount,
		})
		.map(drop)
	}

	/// Shifts the bits of every element right, arithmetically for signed types
	pub fn shift_bits_right(&mut self, src: ObjId, dest: ObjId, amount: u32) -> PimResult<()> {
		self.run(Cmd::ShiftBits {
			left: false,
			src,
			dest,
			amount,
		})
		.map(drop)
	}

	/// Substitutes every byte of `src` through the 256-entry `lut`
	pub fn aes_sbox(&mut self, src: ObjId, dest: ObjId, lut: &[u8]) -> PimResult<()> {
		self.run(Cmd::AesSbox {
			inverse: false,
			src,
			dest,
			lut: lut.to_vec(),
		})
		.map(drop)
	}

	/// Substitutes every byte of `src` through the 256-entry inverse `lut`
	pub fn aes_inverse_sbox(&mut self, src: ObjId, dest: ObjId, lut: &[u8]) -> PimResult<()> {
		self.run(Cmd::AesSbox {
			inverse: true,
			src,
			dest,
			lut: lut.to_vec(),
		})
		.map(drop)
	}

	/// Starts the timer
	pub fn start_timer(&mut self) {
		self.stats.start_timer();
	}

	/// Ends the timer
	pub fn end_timer(&mut self) {
		self.stats.end_timer(self.device.as_ref());
	}

	/// Logs the statistics
	pub fn show_stats(&self) {
		let report = DisplayWrapper::new(|f: &mut fmt::Formatter| {
			if let Some(device) = &self.device {
				let properties = device.properties();
				write!(
					f,
					"\nDevice: {} (simulating {}), {} cores of {}x{}, {}{}",
					properties.device_kind,
					properties.sim_target,
					properties.num_cores,
					properties.num_row_per_core,
					properties.num_col_per_core,
					device.dram().name(),
					match properties.analysis_mode {
						true => ", analysis mode",
						false => "",
					}
				)?;
			}
			write!(f, "{}", self.stats)
		});
		tracing::info!("Statistics: {report}");
	}

	/// Resets the statistics
	pub fn reset_stats(&mut self) {
		self.stats = Statistics::new();
	}

	/// Returns a snapshot of the statistics
	pub fn stats(&self) -> StatsSnapshot {
		self.stats.snapshot()
	}

	/// Records a fused batch
	pub(crate) fn record_fused(&mut self) {
		self.stats.record_fused();
	}

	/// Runs a command.
	///
	/// Nothing is mutated unless planning, costing and execution all succeed.
	fn run(&mut self, cmd: Cmd) -> PimResult<Output> {
		let device = self.device.as_mut().ok_or(PimError::NoDevice)?;
		let kind = cmd.kind();

		let basis = cmd.plan(device)?;
		let cost = perf::estimate(device, &basis)?;
		let effects = match device.is_analysis_mode() {
			true => Default::default(),
			false => cmd.execute(device)?,
		};
		tracing::trace!(%kind, ?basis, ?cost, "Ran command");

		if let Some((id, values)) = effects.write {
			device.write(id, values)?;
		}
		self.stats.record(&basis, cost);

		Ok(effects.output)
	}

	/// Returns the data type of object `id`
	fn data_type(&self, id: ObjId) -> PimResult<DataType> {
		Ok(self.device()?.view(id)?.data_type)
	}

	/// Ensures host elements `T` can hold elements of `data_type`
	fn ensure_host_type<T: Element>(&self, data_type: DataType) -> PimResult<()> {
		match T::is_compatible(data_type) {
			true => Ok(()),
			false => Err(PimError::type_mismatch(std::any::type_name::<T>(), data_type)),
		}
	}
}

/// Writes values output by a command into a host slice
fn write_host<T: Element>(output: Output, dest: &mut [T]) {
	if let Output::Values(values) = output {
		for (dest, bits) in dest.iter_mut().zip(values) {
			*dest = T::from_bits(bits);
		}
	}
}
