//! Baseline cost tables
//!
//! Maps each `(device kind, data type, command kind)` the model covers to the
//! number of row reads, row writes and logic operations one pass of the command
//! takes. Combinations missing from the table are unmodeled.

// Imports
use {
	crate::{
		cmd::CmdKind,
		data_type::{DataType, NumClass},
		device::DeviceKind,
	},
	std::{collections::HashMap, sync::LazyLock},
};

/// Baseline cost of a single pass of a command
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
pub struct BaseCost {
	/// Row reads, driving latency
	pub row_reads: u32,

	/// Row writes, driving latency and energy
	pub row_writes: u32,

	/// Logic operations, driving array utilization
	pub logic_ops: u32,
}

impl BaseCost {
	const fn new(row_reads: u32, row_writes: u32, logic_ops: u32) -> Self {
		Self {
			row_reads,
			row_writes,
			logic_ops,
		}
	}

	/// Scales every count by `factor`
	const fn scaled(self, factor: u32) -> Self {
		Self::new(
			self.row_reads * factor,
			self.row_writes * factor,
			self.logic_ops * factor,
		)
	}
}

/// All modeled costs
static TABLE: LazyLock<HashMap<(DeviceKind, DataType, CmdKind), BaseCost>> = LazyLock::new(|| {
	let table = itertools::iproduct!(DeviceKind::ALL, DataType::ALL, CmdKind::ALL.iter().copied())
		.filter_map(|(device, data_type, cmd)| {
			let cost = match device {
				DeviceKind::Functional => None,
				_ if device.is_bit_serial() => self::bit_serial(device, data_type, cmd),
				_ => self::bit_parallel(device, data_type, cmd),
			}?;
			Some(((device, data_type, cmd), cost))
		})
		.collect::<HashMap<_, _>>();

	tracing::trace!(entries = table.len(), "Built cost table");
	table
});

/// Returns the baseline cost of `cmd` on `data_type` with a device of kind `device`.
///
/// Returns `None` if the combination isn't modeled.
pub fn cost_of(device: DeviceKind, data_type: DataType, cmd: CmdKind) -> Option<BaseCost> {
	TABLE.get(&(device, data_type, cmd)).copied()
}

/// Returns if `cmd` can be modeled on `data_type` at all
fn is_modelable(data_type: DataType, cmd: CmdKind) -> bool {
	if cmd.is_host_copy() {
		return false;
	}
	if cmd.is_arithmetic() && !data_type.is_arithmetic() {
		return false;
	}
	if cmd.is_bitwise_int() && !data_type.is_int() {
		return false;
	}
	if matches!(cmd, CmdKind::AesSbox | CmdKind::AesInverseSbox) && data_type.bits() != 8 {
		return false;
	}

	true
}

/// Costs on bit-serial devices, where every pass walks an element's bits
fn bit_serial(device: DeviceKind, data_type: DataType, cmd: CmdKind) -> Option<BaseCost> {
	use CmdKind::*;

	if !self::is_modelable(data_type, cmd) {
		return None;
	}

	let b = data_type.bits();
	let float = data_type.class() == NumClass::Float;

	// Note: Float multiplication walks the mantissa, plus an exponent add
	let (m, e) = match data_type {
		DataType::Fp32 => (24, 8),
		DataType::Bf16 => (8, 8),
		_ => (b, 0),
	};
	let mul = BaseCost::new(2 * m * m + 2 * e, m * m + e, 4 * m * m + 3 * e);
	let mul_scalar = BaseCost::new(m * m + e, m * m + e, 2 * m * m + 2 * e);
	let div = BaseCost::new(3 * m * m + 2 * e, 2 * m * m + e, 6 * m * m + 3 * e);
	let div_scalar = BaseCost::new(2 * m * m + e, 2 * m * m + e, 5 * m * m + 2 * e);

	// Note: Float addition needs alignment and normalization passes
	let add_factor = match float {
		true => 4,
		false => 1,
	};

	let cost = match cmd {
		CopyD2D | CopyO2O | Convert => BaseCost::new(b, b, 0),
		Not => BaseCost::new(b, b, b),
		And | Or | Xor => BaseCost::new(2 * b, b, b),
		Xnor => BaseCost::new(2 * b, b, 2 * b),
		AndScalar | OrScalar | XorScalar | XnorScalar => BaseCost::new(b, b, b),
		Add | Sub => BaseCost::new(2 * b, b, 3 * b).scaled(add_factor),
		AddScalar | SubScalar => BaseCost::new(b, b, 2 * b).scaled(add_factor),
		Mul => mul,
		MulScalar => mul_scalar,
		Div => div,
		DivScalar => div_scalar,
		Abs if float => BaseCost::new(b, b, 1),
		Abs => BaseCost::new(2 * b, b, 2 * b),
		Min | Max => BaseCost::new(3 * b, b, 4 * b),
		MinScalar | MaxScalar => BaseCost::new(2 * b, b, 3 * b),
		Gt | Lt | Eq | Ne => BaseCost::new(2 * b, 1, 2 * b),
		GtScalar | LtScalar | EqScalar | NeScalar => BaseCost::new(b, 1, b),
		ScaledAdd => BaseCost::new(
			mul_scalar.row_reads + 2 * b * add_factor,
			mul_scalar.row_writes + b * add_factor,
			mul_scalar.logic_ops + 3 * b * add_factor,
		),
		PopCount => BaseCost::new(b, b, 2 * b),
		RedSum => BaseCost::new(b, 0, b),
		RedMin | RedMax => BaseCost::new(b, 0, 2 * b),
		BitSliceExtract | BitSliceInsert => BaseCost::new(1, 1, 0),
		CondCopy => BaseCost::new(b + 1, b, 2 * b),
		CondBroadcast => BaseCost::new(1, b, b),
		CondSelect => BaseCost::new(2 * b + 1, b, 3 * b),
		CondSelectScalar => BaseCost::new(b + 1, b, 2 * b),
		Broadcast => BaseCost::new(0, b, 0),
		RotateElementsRight | RotateElementsLeft | ShiftElementsRight | ShiftElementsLeft => BaseCost::new(b, b, b),
		ShiftBitsRight | ShiftBitsLeft => BaseCost::new(b, b, 0),

		// Note: Evaluates the 256-entry table one entry at a time
		AesSbox | AesInverseSbox => BaseCost::new(256 * b, b, 256 * b),

		// Only modeled on bit-parallel devices
		PrefixSum | Mac => return None,
		CopyH2D | CopyD2H => return None,
	};

	let cost = match device {
		// Analog majority halves the logic, at the cost of extra activations
		DeviceKind::BitsimdVAp => BaseCost::new(
			cost.row_reads + cost.logic_ops.div_ceil(2),
			cost.row_writes,
			cost.logic_ops.div_ceil(2),
		),

		// All logic happens through triple-row activations
		DeviceKind::Simdram => BaseCost::new(
			cost.row_reads + cost.logic_ops,
			cost.row_writes + cost.logic_ops,
			0,
		),

		_ => cost,
	};

	Some(cost)
}

/// Costs on bit-parallel devices, per region row and ALU batch
fn bit_parallel(device: DeviceKind, data_type: DataType, cmd: CmdKind) -> Option<BaseCost> {
	use CmdKind::*;

	if !self::is_modelable(data_type, cmd) {
		return None;
	}

	let cost = match cmd {
		CopyD2D | CopyO2O | Convert => BaseCost::new(1, 1, 0),
		Not | Abs | PopCount | ShiftBitsRight | ShiftBitsLeft | BitSliceExtract => BaseCost::new(1, 1, 1),
		AddScalar | SubScalar | AndScalar | OrScalar | XorScalar | XnorScalar | MinScalar | MaxScalar => {
			BaseCost::new(1, 1, 1)
		},
		GtScalar | LtScalar | EqScalar | NeScalar => BaseCost::new(1, 1, 1),
		And | Or | Xor | Xnor | Add | Sub | Min | Max | Gt | Lt | Eq | Ne => BaseCost::new(2, 1, 1),
		Mul => BaseCost::new(2, 1, 2),
		MulScalar => BaseCost::new(1, 1, 2),
		Div | DivScalar if device == DeviceKind::Aquabolt => return None,
		Div => BaseCost::new(2, 1, 8),
		DivScalar => BaseCost::new(1, 1, 8),
		ScaledAdd => BaseCost::new(2, 1, 2),
		BitSliceInsert => BaseCost::new(2, 1, 1),
		CondCopy | CondSelect => BaseCost::new(3, 1, 1),
		CondBroadcast | CondSelectScalar => BaseCost::new(2, 1, 1),
		Broadcast => BaseCost::new(0, 1, 1),
		RotateElementsRight | RotateElementsLeft | ShiftElementsRight | ShiftElementsLeft => BaseCost::new(1, 1, 1),
		RedSum | RedMin | RedMax => BaseCost::new(1, 0, 1),
		PrefixSum => BaseCost::new(1, 1, 2),
		Mac => BaseCost::new(1, 0, 2),
		AesSbox | AesInverseSbox => BaseCost::new(1, 1, 4),
		CopyH2D | CopyD2H => return None,
	};

	// Fulcrum's word ALUs have no float unit
	let is_float_arith = data_type.class() == NumClass::Float && cmd.is_arithmetic();
	let cost = match device == DeviceKind::Fulcrum && is_float_arith {
		true => BaseCost::new(cost.row_reads, cost.row_writes, cost.logic_ops * 4),
		false => cost,
	};

	Some(cost)
}
