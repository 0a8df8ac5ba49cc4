//! Commands
//!
//! Every public operation is turned into a [`Cmd`], which is first planned
//! (validating every operand and deriving the basis of it's cost), then
//! executed, staging any writes without touching the device.

// Modules
pub mod alu;
mod kind;

// Exports
pub use self::{
	alu::{BinOp, ReduceOp},
	kind::CmdKind,
};

// Imports
use {
	crate::{
		data_type::{DataType, NumClass},
		device::{Device, Footprint, ObjId, ObjView, Orientation},
		error::{PimError, PimResult},
	},
	std::ops::Range,
};

/// Layout a host copy is given in
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum CopyType {
	V,
	H,
}

impl CopyType {
	/// Returns the orientation of this copy type
	pub const fn orientation(self) -> Orientation {
		match self {
			Self::V => Orientation::V,
			Self::H => Orientation::H,
		}
	}
}

/// Element movement
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum MoveOp {
	RotateRight,
	RotateLeft,
	ShiftRight,
	ShiftLeft,
}

/// Broadcast value
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum BroadcastValue {
	Int(i64),
	UInt(u64),
	Fp(f32),
}

/// Data transfer direction
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Transfer {
	HostToDevice,
	DeviceToHost,
	DeviceToDevice,
}

/// Basis of a command's cost
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct CostBasis {
	/// Command kind
	pub kind: CmdKind,

	/// Data type the command computes on
	pub data_type: DataType,

	/// Footprint of the elements computed on
	pub footprint: Footprint,

	/// Bytes transferred
	pub bytes: u64,

	/// Direction of the transferred bytes
	pub transfer: Option<Transfer>,

	/// Whether copied data must be transposed into the object's layout
	pub transpose: bool,
}

impl CostBasis {
	/// Creates a basis of a computation with no transfers
	fn compute(kind: CmdKind, data_type: DataType, footprint: Footprint) -> Self {
		Self {
			kind,
			data_type,
			footprint,
			bytes: 0,
			transfer: None,
			transpose: false,
		}
	}

	/// Adds a transfer of `bytes` bytes
	fn with_transfer(self, transfer: Transfer, bytes: u64) -> Self {
		Self {
			bytes,
			transfer: Some(transfer),
			..self
		}
	}
}

/// Output of a command
#[derive(PartialEq, Clone, Debug, Default)]
pub enum Output {
	/// No output, or functional simulation was skipped
	#[default]
	None,

	/// Element bits
	Values(Vec<u64>),

	/// Bits of a single accumulator
	Scalar(u64),
}

/// Effects of executing a command
#[derive(PartialEq, Clone, Debug, Default)]
pub struct Effects {
	/// Full contents to write to an object
	pub write: Option<(ObjId, Vec<u64>)>,

	/// Output to the host
	pub output: Output,
}

impl Effects {
	fn write(id: ObjId, values: Vec<u64>) -> Self {
		Self {
			write:  Some((id, values)),
			output: Output::None,
		}
	}

	fn output(output: Output) -> Self {
		Self { write: None, output }
	}
}

/// Command
#[derive(Clone, Debug)]
pub enum Cmd {
	CopyHostToDevice {
		values:    Vec<u64>,
		dest:      ObjId,
		range:     Range<u64>,
		copy_type: Option<CopyType>,
	},
	CopyDeviceToHost {
		src:       ObjId,
		range:     Range<u64>,
		copy_type: Option<CopyType>,

		/// Number of elements the host expects
		host_len: u64,
	},
	CopyDeviceToDevice {
		src:   ObjId,
		dest:  ObjId,
		range: Range<u64>,
	},
	CopyObjectToObject {
		src:  ObjId,
		dest: ObjId,
	},
	ConvertType {
		src:  ObjId,
		dest: ObjId,
	},
	Binary {
		op:   BinOp,
		src1: ObjId,
		src2: ObjId,
		dest: ObjId,
	},
	BinaryScalar {
		op:     BinOp,
		src:    ObjId,
		dest:   ObjId,
		scalar: u64,
	},
	Abs {
		src:  ObjId,
		dest: ObjId,
	},
	Not {
		src:  ObjId,
		dest: ObjId,
	},
	PopCount {
		src:  ObjId,
		dest: ObjId,
	},
	ScaledAdd {
		src1:   ObjId,
		src2:   ObjId,
		dest:   ObjId,
		scalar: u64,
	},
	PrefixSum {
		src:  ObjId,
		dest: ObjId,
	},
	Mac {
		src1:         ObjId,
		src2:         ObjId,
		accumulators: Vec<u64>,
	},
	Reduce {
		op:    ReduceOp,
		src:   ObjId,
		range: Range<u64>,
	},
	BitSliceExtract {
		src:     ObjId,
		dest:    ObjId,
		bit_idx: u32,
	},
	BitSliceInsert {
		src:     ObjId,
		dest:    ObjId,
		bit_idx: u32,
	},
	CondCopy {
		cond: ObjId,
		src:  ObjId,
		dest: ObjId,
	},
	CondBroadcast {
		cond:   ObjId,
		scalar: u64,
		dest:   ObjId,
	},
	CondSelect {
		cond: ObjId,
		src1: ObjId,
		src2: ObjId,
		dest: ObjId,
	},
	CondSelectScalar {
		cond:   ObjId,
		src1:   ObjId,
		scalar: u64,
		dest:   ObjId,
	},
	Broadcast {
		dest:  ObjId,
		value: BroadcastValue,
	},
	MoveElements {
		op:  MoveOp,
		obj: ObjId,
	},
	ShiftBits {
		left:   bool,
		src:    ObjId,
		dest:   ObjId,
		amount: u32,
	},
	AesSbox {
		inverse: bool,
		src:     ObjId,
		dest:    ObjId,
		lut:     Vec<u8>,
	},
}

impl Cmd {
	/// Returns this command's kind
	pub fn kind(&self) -> CmdKind {
		match *self {
			Self::CopyHostToDevice { .. } => CmdKind::CopyH2D,
			Self::CopyDeviceToHost { .. } => CmdKind::CopyD2H,
			Self::CopyDeviceToDevice { .. } => CmdKind::CopyD2D,
			Self::CopyObjectToObject { .. } => CmdKind::CopyO2O,
			Self::ConvertType { .. } => CmdKind::Convert,
			Self::Binary { op, .. } => self::binary_kind(op),
			Self::BinaryScalar { op, .. } => self::binary_scalar_kind(op),
			Self::Abs { .. } => CmdKind::Abs,
			Self::Not { .. } => CmdKind::Not,
			Self::PopCount { .. } => CmdKind::PopCount,
			Self::ScaledAdd { .. } => CmdKind::ScaledAdd,
			Self::PrefixSum { .. } => CmdKind::PrefixSum,
			Self::Mac { .. } => CmdKind::Mac,
			Self::Reduce { op, .. } => match op {
				ReduceOp::Sum => CmdKind::RedSum,
				ReduceOp::Min => CmdKind::RedMin,
				ReduceOp::Max => CmdKind::RedMax,
			},
			Self::BitSliceExtract { .. } => CmdKind::BitSliceExtract,
			Self::BitSliceInsert { .. } => CmdKind::BitSliceInsert,
			Self::CondCopy { .. } => CmdKind::CondCopy,
			Self::CondBroadcast { .. } => CmdKind::CondBroadcast,
			Self::CondSelect { .. } => CmdKind::CondSelect,
			Self::CondSelectScalar { .. } => CmdKind::CondSelectScalar,
			Self::Broadcast { .. } => CmdKind::Broadcast,
			Self::MoveElements { op, .. } => match op {
				MoveOp::RotateRight => CmdKind::RotateElementsRight,
				MoveOp::RotateLeft => CmdKind::RotateElementsLeft,
				MoveOp::ShiftRight => CmdKind::ShiftElementsRight,
				MoveOp::ShiftLeft => CmdKind::ShiftElementsLeft,
			},
			Self::ShiftBits { left: true, .. } => CmdKind::ShiftBitsLeft,
			Self::ShiftBits { left: false, .. } => CmdKind::ShiftBitsRight,
			Self::AesSbox { inverse: false, .. } => CmdKind::AesSbox,
			Self::AesSbox { inverse: true, .. } => CmdKind::AesInverseSbox,
		}
	}

	/// Validates every operand, returning the basis of this command's cost
	pub fn plan(&self, device: &Device) -> PimResult<CostBasis> {
		let kind = self.kind();
		let basis = match *self {
			Self::CopyHostToDevice {
				ref values,
				dest,
				ref range,
				copy_type,
			} => {
				let dest = device.view(dest)?;
				let range = self::resolve_range(range, dest.num_elements)?;
				let len = range.end - range.start;
				if values.len() as u64 != len {
					return Err(PimError::size_mismatch(len, values.len() as u64));
				}

				self::host_copy_basis(kind, Transfer::HostToDevice, &dest, range, copy_type)
			},
			Self::CopyDeviceToHost {
				src,
				ref range,
				copy_type,
				host_len,
			} => {
				let src = device.view(src)?;
				let range = self::resolve_range(range, src.num_elements)?;
				let len = range.end - range.start;
				if host_len != len {
					return Err(PimError::size_mismatch(len, host_len));
				}

				self::host_copy_basis(kind, Transfer::DeviceToHost, &src, range, copy_type)
			},
			Self::CopyDeviceToDevice { src, dest, ref range } => {
				let (src, dest) = (device.view(src)?, device.view(dest)?);
				self::ensure_computable([&src, &dest])?;
				self::ensure_same_len(&src, &dest)?;
				self::ensure_type(src.data_type, &dest)?;
				let range = self::resolve_range(range, src.num_elements)?;
				let bytes = (range.end - range.start) * src.data_type.host_bytes();
				CostBasis::compute(kind, src.data_type, dest.footprint(range))
					.with_transfer(Transfer::DeviceToDevice, bytes)
			},
			Self::CopyObjectToObject { src, dest } => {
				let (src, dest) = (device.view(src)?, device.view(dest)?);
				self::ensure_computable([&src, &dest])?;
				self::ensure_same_len(&src, &dest)?;
				self::ensure_type(src.data_type, &dest)?;
				let bytes = src.num_elements * src.data_type.host_bytes();
				CostBasis::compute(kind, src.data_type, dest.full_footprint())
					.with_transfer(Transfer::DeviceToDevice, bytes)
			},
			Self::ConvertType { src, dest } => {
				let (src, dest) = (device.view(src)?, device.view(dest)?);
				self::ensure_computable([&src, &dest])?;
				self::ensure_same_len(&src, &dest)?;
				for data_type in [src.data_type, dest.data_type] {
					self::ensure_arithmetic(kind, data_type)?;
				}
				CostBasis::compute(kind, src.data_type, dest.full_footprint())
			},
			Self::Binary { op, src1, src2, dest } => {
				let (src1, src2, dest) = (device.view(src1)?, device.view(src2)?, device.view(dest)?);
				self::ensure_computable([&src1, &src2, &dest])?;
				self::ensure_same_len(&src1, &src2)?;
				self::ensure_same_len(&src1, &dest)?;
				self::ensure_bin_op(op, src1.data_type)?;

				let accumulates_bool = matches!(op, BinOp::Add | BinOp::Sub) &&
					src1.data_type.is_int() &&
					src2.data_type == DataType::Bool;
				if !accumulates_bool {
					self::ensure_type(src1.data_type, &src2)?;
				}
				self::ensure_type(self::result_type(op, src1.data_type), &dest)?;
				CostBasis::compute(kind, src1.data_type, dest.full_footprint())
			},
			Self::BinaryScalar { op, src, dest, .. } => {
				let (src, dest) = (device.view(src)?, device.view(dest)?);
				self::ensure_computable([&src, &dest])?;
				self::ensure_same_len(&src, &dest)?;
				self::ensure_bin_op(op, src.data_type)?;
				self::ensure_type(self::result_type(op, src.data_type), &dest)?;
				CostBasis::compute(kind, src.data_type, dest.full_footprint())
			},
			Self::Abs { src, dest } | Self::Not { src, dest } | Self::PrefixSum { src, dest } => {
				let (src, dest) = (device.view(src)?, device.view(dest)?);
				self::ensure_computable([&src, &dest])?;
				self::ensure_same_len(&src, &dest)?;
				self::ensure_arithmetic(kind, src.data_type)?;
				self::ensure_type(src.data_type, &dest)?;
				CostBasis::compute(kind, src.data_type, dest.full_footprint())
			},
			Self::PopCount { src, dest } => {
				let (src, dest) = (device.view(src)?, device.view(dest)?);
				self::ensure_computable([&src, &dest])?;
				self::ensure_same_len(&src, &dest)?;
				self::ensure_int(src.data_type)?;
				self::ensure_int(dest.data_type)?;
				CostBasis::compute(kind, src.data_type, dest.full_footprint())
			},
			Self::ScaledAdd { src1, src2, dest, .. } => {
				let (src1, src2, dest) = (device.view(src1)?, device.view(src2)?, device.view(dest)?);
				self::ensure_computable([&src1, &src2, &dest])?;
				self::ensure_same_len(&src1, &src2)?;
				self::ensure_same_len(&src1, &dest)?;
				self::ensure_arithmetic(kind, src1.data_type)?;
				self::ensure_type(src1.data_type, &src2)?;
				self::ensure_type(src1.data_type, &dest)?;
				CostBasis::compute(kind, src1.data_type, dest.full_footprint())
			},
			Self::Mac {
				src1,
				src2,
				ref accumulators,
			} => {
				let (src1, src2) = (device.view(src1)?, device.view(src2)?);
				self::ensure_computable([&src1])?;
				self::ensure_arithmetic(kind, src1.data_type)?;
				if !src1.layout.single_region {
					return Err(PimError::InvalidArgument(format!(
						"Multiply-accumulate needs a single-region source, {} isn't",
						src1.id
					)));
				}
				if !src2.is_buffer {
					return Err(PimError::InvalidArgument(format!(
						"Multiply-accumulate needs a global buffer operand, {} isn't",
						src2.id
					)));
				}
				self::ensure_type(src1.data_type, &src2)?;
				if let Some(region) = src1.regions.iter().find(|region| region.num_elements > src2.num_elements) {
					return Err(PimError::size_mismatch(src2.num_elements, region.num_elements));
				}

				let num_cores = u64::from(device.shape().num_cores);
				if accumulators.len() as u64 != num_cores {
					return Err(PimError::size_mismatch(num_cores, accumulators.len() as u64));
				}

				let footprint = src1.full_footprint();
				let bytes = u64::from(footprint.num_cores) * src1.data_type.host_bytes();
				CostBasis::compute(kind, src1.data_type, footprint).with_transfer(Transfer::DeviceToHost, bytes)
			},
			Self::Reduce { op, src, ref range } => {
				let src = device.view(src)?;
				self::ensure_computable([&src])?;
				self::ensure_arithmetic(kind, src.data_type)?;
				let range = self::resolve_range(range, src.num_elements)?;
				if op != ReduceOp::Sum && range.is_empty() {
					return Err(PimError::InvalidRange {
						begin: range.start,
						end:   range.end,
						len:   src.num_elements,
					});
				}

				let footprint = src.footprint(range);
				let basis = CostBasis::compute(kind, src.data_type, footprint);
				match device.sim_target().is_bit_serial() {
					// Note: Per-core partial results are combined on the host
					true => {
						let bytes = u64::from(footprint.num_cores) * src.data_type.accumulator().host_bytes();
						basis.with_transfer(Transfer::DeviceToHost, bytes)
					},
					false => basis,
				}
			},
			Self::BitSliceExtract { src, dest, bit_idx } => {
				let (src, dest) = (device.view(src)?, device.view(dest)?);
				self::ensure_computable([&src, &dest])?;
				self::ensure_same_len(&src, &dest)?;
				self::ensure_bit_idx(bit_idx, src.data_type)?;
				self::ensure_type(DataType::Bool, &dest)?;
				CostBasis::compute(kind, src.data_type, dest.full_footprint())
			},
			Self::BitSliceInsert { src, dest, bit_idx } => {
				let (src, dest) = (device.view(src)?, device.view(dest)?);
				self::ensure_computable([&src, &dest])?;
				self::ensure_same_len(&src, &dest)?;
				self::ensure_type(DataType::Bool, &src)?;
				self::ensure_bit_idx(bit_idx, dest.data_type)?;
				CostBasis::compute(kind, dest.data_type, dest.full_footprint())
			},
			Self::CondCopy { cond, src, dest } | Self::CondSelectScalar { cond, src1: src, dest, .. } => {
				let (cond, src, dest) = (device.view(cond)?, device.view(src)?, device.view(dest)?);
				self::ensure_computable([&cond, &src, &dest])?;
				self::ensure_cond(&cond, &dest)?;
				self::ensure_same_len(&src, &dest)?;
				self::ensure_type(dest.data_type, &src)?;
				CostBasis::compute(kind, dest.data_type, dest.full_footprint())
			},
			Self::CondBroadcast { cond, dest, .. } => {
				let (cond, dest) = (device.view(cond)?, device.view(dest)?);
				self::ensure_computable([&cond, &dest])?;
				self::ensure_cond(&cond, &dest)?;
				CostBasis::compute(kind, dest.data_type, dest.full_footprint())
			},
			Self::CondSelect { cond, src1, src2, dest } => {
				let (cond, src1, src2, dest) = (
					device.view(cond)?,
					device.view(src1)?,
					device.view(src2)?,
					device.view(dest)?,
				);
				self::ensure_computable([&cond, &src1, &src2, &dest])?;
				self::ensure_cond(&cond, &dest)?;
				self::ensure_same_len(&src1, &dest)?;
				self::ensure_same_len(&src2, &dest)?;
				self::ensure_type(dest.data_type, &src1)?;
				self::ensure_type(dest.data_type, &src2)?;
				CostBasis::compute(kind, dest.data_type, dest.full_footprint())
			},
			Self::Broadcast { dest, value } => {
				let dest = device.view(dest)?;
				self::ensure_computable([&dest])?;
				let is_float = dest.data_type.class() == NumClass::Float;
				match value {
					BroadcastValue::Fp(_) if !is_float => {
						return Err(PimError::type_mismatch("a float type", dest.data_type))
					},
					BroadcastValue::Int(_) | BroadcastValue::UInt(_) if is_float => {
						return Err(PimError::type_mismatch("an integer or raw type", dest.data_type))
					},
					_ => (),
				}
				CostBasis::compute(kind, dest.data_type, dest.full_footprint())
			},
			Self::MoveElements { obj, .. } => {
				let obj = device.view(obj)?;
				self::ensure_computable([&obj])?;
				CostBasis::compute(kind, obj.data_type, obj.full_footprint())
			},
			Self::ShiftBits { src, dest, .. } => {
				let (src, dest) = (device.view(src)?, device.view(dest)?);
				self::ensure_computable([&src, &dest])?;
				self::ensure_same_len(&src, &dest)?;
				self::ensure_int(src.data_type)?;
				self::ensure_type(src.data_type, &dest)?;
				CostBasis::compute(kind, src.data_type, dest.full_footprint())
			},
			Self::AesSbox {
				src, dest, ref lut, ..
			} => {
				let (src, dest) = (device.view(src)?, device.view(dest)?);
				self::ensure_computable([&src, &dest])?;
				self::ensure_same_len(&src, &dest)?;
				if !matches!(src.data_type, DataType::Int8 | DataType::UInt8) {
					return Err(PimError::type_mismatch("an 8-bit integer type", src.data_type));
				}
				self::ensure_type(src.data_type, &dest)?;
				if lut.len() != 256 {
					return Err(PimError::InvalidArgument(format!(
						"Lookup table must have 256 entries, found {}",
						lut.len()
					)));
				}
				CostBasis::compute(kind, src.data_type, dest.full_footprint())
			},
		};

		Ok(basis)
	}

	/// Executes this command, staging it's effects.
	///
	/// Expects the command to have been planned successfully.
	pub fn execute(&self, device: &Device) -> PimResult<Effects> {
		let effects = match *self {
			Self::CopyHostToDevice {
				ref values,
				dest,
				ref range,
				..
			} => {
				let mut data = device.read(dest)?;
				let range = self::resolve_range(range, data.len() as u64)?;
				data.splice(range.start as usize..range.end as usize, values.iter().copied());
				Effects::write(dest, data)
			},
			Self::CopyDeviceToHost { src, ref range, .. } => {
				let data = device.read(src)?;
				let range = self::resolve_range(range, data.len() as u64)?;
				Effects::output(Output::Values(data[range.start as usize..range.end as usize].to_vec()))
			},
			Self::CopyDeviceToDevice { src, dest, ref range } => {
				let (src_data, mut data) = (device.read(src)?, device.read(dest)?);
				let range = self::resolve_range(range, data.len() as u64)?;
				let range = range.start as usize..range.end as usize;
				data[range.clone()].copy_from_slice(&src_data[range]);
				Effects::write(dest, data)
			},
			Self::CopyObjectToObject { src, dest } => Effects::write(dest, device.read(src)?),
			Self::ConvertType { src, dest } => {
				let (src_type, dest_type) = (device.view(src)?.data_type, device.view(dest)?.data_type);
				let values = device
					.read(src)?
					.into_iter()
					.map(|bits| {
						src_type.convert(bits, dest_type).ok_or_else(|| {
							PimError::Unsupported(format!("Converting {src_type} to {dest_type}"))
						})
					})
					.collect::<PimResult<Vec<_>>>()?;
				Effects::write(dest, values)
			},
			Self::Binary { op, src1, src2, dest } => {
				let data_type = device.view(src1)?.data_type;
				let values = self::zip_elements(device.read(src1)?, device.read(src2)?, |idx, lhs, rhs| {
					op.apply(data_type, lhs, rhs)
						.map_err(|alu::DivByZero| PimError::DivisionByZero(idx))
				})?;
				Effects::write(dest, values)
			},
			Self::BinaryScalar { op, src, dest, scalar } => {
				let data_type = device.view(src)?.data_type;
				let values = device
					.read(src)?
					.into_iter()
					.enumerate()
					.map(|(idx, bits)| {
						op.apply(data_type, bits, scalar)
							.map_err(|alu::DivByZero| PimError::DivisionByZero(idx as u64))
					})
					.collect::<PimResult<Vec<_>>>()?;
				Effects::write(dest, values)
			},
			Self::Abs { src, dest } => self::map_elements(device, src, dest, alu::abs)?,
			Self::Not { src, dest } => self::map_elements(device, src, dest, alu::not)?,
			Self::PopCount { src, dest } => self::map_elements(device, src, dest, alu::popcount)?,
			Self::ShiftBits {
				left: true,
				src,
				dest,
				amount,
			} => self::map_elements(device, src, dest, |data_type, bits| {
				alu::shift_bits_left(data_type, bits, amount)
			})?,
			Self::ShiftBits {
				left: false,
				src,
				dest,
				amount,
			} => self::map_elements(device, src, dest, |data_type, bits| {
				alu::shift_bits_right(data_type, bits, amount)
			})?,
			Self::BitSliceExtract { src, dest, bit_idx } => {
				self::map_elements(device, src, dest, |_, bits| alu::extract_bit(bits, bit_idx))?
			},
			Self::AesSbox {
				src, dest, ref lut, ..
			} => self::map_elements(device, src, dest, |_, bits| u64::from(lut[bits as usize & 0xff]))?,
			Self::ScaledAdd {
				src1,
				src2,
				dest,
				scalar,
			} => {
				let data_type = device.view(src1)?.data_type;
				let values = self::zip_elements(device.read(src1)?, device.read(src2)?, |_, lhs, rhs| {
					Ok(alu::scaled_add(data_type, lhs, rhs, scalar))
				})?;
				Effects::write(dest, values)
			},
			Self::PrefixSum { src, dest } => {
				let data_type = device.view(src)?.data_type;
				let values = device
					.read(src)?
					.into_iter()
					.scan(None, |sum: &mut Option<u64>, bits| {
						let next = match *sum {
							Some(sum) => alu::add(data_type, sum, bits),
							None => data_type.truncate(bits),
						};
						*sum = Some(next);
						Some(next)
					})
					.collect();
				Effects::write(dest, values)
			},
			Self::Mac {
				src1,
				src2,
				ref accumulators,
			} => {
				let view = device.view(src1)?;
				let data_type = view.data_type;
				let (lhs, rhs) = (device.read(src1)?, device.read(src2)?);

				let mut accumulators = accumulators.clone();
				for region in &view.regions {
					let elements = &lhs[region.elements().start as usize..region.elements().end as usize];
					let dot = elements
						.iter()
						.zip(&rhs)
						.fold(0, |acc, (&lhs, &rhs)| alu::scaled_add(data_type, lhs, acc, rhs));
					let slot = &mut accumulators[region.core_idx.to_usize()];
					*slot = alu::add(data_type, *slot, dot);
				}
				Effects::output(Output::Values(accumulators))
			},
			Self::Reduce { op, src, ref range } => {
				let view = device.view(src)?;
				let data = device.read(src)?;
				let range = self::resolve_range(range, data.len() as u64)?;
				let elements = data[range.start as usize..range.end as usize].iter().copied();
				let result = alu::reduce(op, view.data_type, elements)?.ok_or(PimError::InvalidRange {
					begin: range.start,
					end:   range.end,
					len:   view.num_elements,
				})?;
				Effects::output(Output::Scalar(result))
			},
			Self::BitSliceInsert { src, dest, bit_idx } => {
				let data_type = device.view(dest)?.data_type;
				let values = self::zip_elements(device.read(dest)?, device.read(src)?, |_, bits, value| {
					Ok(alu::insert_bit(data_type, bits, bit_idx, value))
				})?;
				Effects::write(dest, values)
			},
			Self::CondCopy { cond, src, dest } => {
				let (cond, src) = (device.read(cond)?, device.read(src)?);
				let values = self::zip_elements(cond, device.read(dest)?, |idx, cond, bits| {
					Ok(match cond != 0 {
						true => src[idx as usize],
						false => bits,
					})
				})?;
				Effects::write(dest, values)
			},
			Self::CondBroadcast { cond, scalar, dest } => {
				let scalar = device.view(dest)?.data_type.truncate(scalar);
				let values = self::zip_elements(device.read(cond)?, device.read(dest)?, |_, cond, bits| {
					Ok(match cond != 0 {
						true => scalar,
						false => bits,
					})
				})?;
				Effects::write(dest, values)
			},
			Self::CondSelect { cond, src1, src2, dest } => {
				let src1 = device.read(src1)?;
				let values = self::zip_elements(device.read(cond)?, device.read(src2)?, |idx, cond, rhs| {
					Ok(match cond != 0 {
						true => src1[idx as usize],
						false => rhs,
					})
				})?;
				Effects::write(dest, values)
			},
			Self::CondSelectScalar {
				cond,
				src1,
				scalar,
				dest,
			} => {
				let scalar = device.view(dest)?.data_type.truncate(scalar);
				let values = self::zip_elements(device.read(cond)?, device.read(src1)?, |_, cond, lhs| {
					Ok(match cond != 0 {
						true => lhs,
						false => scalar,
					})
				})?;
				Effects::write(dest, values)
			},
			Self::Broadcast { dest, value } => {
				let view = device.view(dest)?;
				let bits = match value {
					BroadcastValue::Int(value) => view.data_type.truncate(value as u64),
					BroadcastValue::UInt(value) => view.data_type.truncate(value),
					BroadcastValue::Fp(value) => view.data_type.from_f32(value),
				};
				Effects::write(dest, vec![bits; view.num_elements as usize])
			},
			Self::MoveElements { op, obj } => {
				let mut data = device.read(obj)?;
				if !data.is_empty() {
					match op {
						MoveOp::RotateRight => data.rotate_right(1),
						MoveOp::RotateLeft => data.rotate_left(1),
						MoveOp::ShiftRight => {
							data.rotate_right(1);
							data[0] = 0;
						},
						MoveOp::ShiftLeft => {
							data.rotate_left(1);
							if let Some(last) = data.last_mut() {
								*last = 0;
							}
						},
					}
				}
				Effects::write(obj, data)
			},
		};

		Ok(effects)
	}
}

/// Returns the command kind of a binary operation
fn binary_kind(op: BinOp) -> CmdKind {
	match op {
		BinOp::Add => CmdKind::Add,
		BinOp::Sub => CmdKind::Sub,
		BinOp::Mul => CmdKind::Mul,
		BinOp::Div => CmdKind::Div,
		BinOp::And => CmdKind::And,
		BinOp::Or => CmdKind::Or,
		BinOp::Xor => CmdKind::Xor,
		BinOp::Xnor => CmdKind::Xnor,
		BinOp::Min => CmdKind::Min,
		BinOp::Max => CmdKind::Max,
		BinOp::Gt => CmdKind::Gt,
		BinOp::Lt => CmdKind::Lt,
		BinOp::Eq => CmdKind::Eq,
		BinOp::Ne => CmdKind::Ne,
	}
}

/// Returns the command kind of a binary operation with a scalar operand
fn binary_scalar_kind(op: BinOp) -> CmdKind {
	match op {
		BinOp::Add => CmdKind::AddScalar,
		BinOp::Sub => CmdKind::SubScalar,
		BinOp::Mul => CmdKind::MulScalar,
		BinOp::Div => CmdKind::DivScalar,
		BinOp::And => CmdKind::AndScalar,
		BinOp::Or => CmdKind::OrScalar,
		BinOp::Xor => CmdKind::XorScalar,
		BinOp::Xnor => CmdKind::XnorScalar,
		BinOp::Min => CmdKind::MinScalar,
		BinOp::Max => CmdKind::MaxScalar,
		BinOp::Gt => CmdKind::GtScalar,
		BinOp::Lt => CmdKind::LtScalar,
		BinOp::Eq => CmdKind::EqScalar,
		BinOp::Ne => CmdKind::NeScalar,
	}
}

/// Returns the type `op` produces from operands of `data_type`
fn result_type(op: BinOp, data_type: DataType) -> DataType {
	match op.is_relational() {
		true => DataType::Bool,
		false => data_type,
	}
}

/// Resolves an index range over `len` elements, where `0..0` is all of them
pub(crate) fn resolve_range(range: &Range<u64>, len: u64) -> PimResult<Range<u64>> {
	if range.start == 0 && range.end == 0 {
		return Ok(0..len);
	}

	match range.start <= range.end && range.end <= len {
		true => Ok(range.clone()),
		false => Err(PimError::InvalidRange {
			begin: range.start,
			end: range.end,
			len,
		}),
	}
}

/// Basis of a host copy over `range` of `view`
fn host_copy_basis(
	kind: CmdKind,
	transfer: Transfer,
	view: &ObjView,
	range: Range<u64>,
	copy_type: Option<CopyType>,
) -> CostBasis {
	let bytes = (range.end - range.start) * view.data_type.host_bytes();
	let transpose = !view.is_buffer &&
		copy_type.is_some_and(|copy_type| copy_type.orientation() != view.layout.orientation);

	CostBasis {
		transpose,
		..CostBasis::compute(kind, view.data_type, view.footprint(range)).with_transfer(transfer, bytes)
	}
}

/// Ensures no operand is a global buffer
fn ensure_computable<const N: usize>(views: [&ObjView; N]) -> PimResult<()> {
	match views.iter().find(|view| view.is_buffer) {
		Some(view) => Err(PimError::InvalidArgument(format!(
			"Global buffer {} can only be copied to or multiply-accumulated",
			view.id
		))),
		None => Ok(()),
	}
}

/// Ensures two operands have the same number of elements
fn ensure_same_len(lhs: &ObjView, rhs: &ObjView) -> PimResult<()> {
	match lhs.num_elements == rhs.num_elements {
		true => Ok(()),
		false => Err(PimError::size_mismatch(lhs.num_elements, rhs.num_elements)),
	}
}

/// Ensures an operand has type `expected`
fn ensure_type(expected: DataType, view: &ObjView) -> PimResult<()> {
	match view.data_type == expected {
		true => Ok(()),
		false => Err(PimError::type_mismatch(expected, view.data_type)),
	}
}

/// Ensures `data_type` supports `kind`, if it's a numeric command
fn ensure_arithmetic(kind: CmdKind, data_type: DataType) -> PimResult<()> {
	match !kind.is_arithmetic() || data_type.is_arithmetic() {
		true => Ok(()),
		false => Err(PimError::Unsupported(format!("{kind} on {data_type}"))),
	}
}

/// Ensures `data_type` is an integer type
fn ensure_int(data_type: DataType) -> PimResult<()> {
	match data_type.is_int() {
		true => Ok(()),
		false => Err(PimError::type_mismatch("an integer type", data_type)),
	}
}

/// Ensures `op` is supported on `data_type`
fn ensure_bin_op(op: BinOp, data_type: DataType) -> PimResult<()> {
	match op.is_bitwise() || data_type.is_arithmetic() {
		true => Ok(()),
		false => Err(PimError::Unsupported(format!("{op:?} on {data_type}"))),
	}
}

/// Ensures `bit_idx` is a bit of `data_type`
fn ensure_bit_idx(bit_idx: u32, data_type: DataType) -> PimResult<()> {
	match bit_idx < data_type.bits() {
		true => Ok(()),
		false => Err(PimError::InvalidArgument(format!(
			"Bit {bit_idx} is out of range for {data_type}"
		))),
	}
}

/// Ensures `cond` is a boolean condition for `dest`
fn ensure_cond(cond: &ObjView, dest: &ObjView) -> PimResult<()> {
	self::ensure_type(DataType::Bool, cond)?;
	self::ensure_same_len(cond, dest)
}

/// Maps every element of `src` into `dest`
fn map_elements(
	device: &Device,
	src: ObjId,
	dest: ObjId,
	mut f: impl FnMut(DataType, u64) -> u64,
) -> PimResult<Effects> {
	let data_type = device.view(src)?.data_type;
	let values = device.read(src)?.into_iter().map(|bits| f(data_type, bits)).collect();
	Ok(Effects::write(dest, values))
}

/// Zips the elements of two operands
fn zip_elements(
	lhs: Vec<u64>,
	rhs: Vec<u64>,
	mut f: impl FnMut(u64, u64, u64) -> PimResult<u64>,
) -> PimResult<Vec<u64>> {
	if lhs.len() != rhs.len() {
		return Err(PimError::size_mismatch(lhs.len() as u64, rhs.len() as u64));
	}

	lhs.into_iter()
		.zip(rhs)
		.enumerate()
		.map(|(idx, (lhs, rhs))| f(idx as u64, lhs, rhs))
		.collect()
}
