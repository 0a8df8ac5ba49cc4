//! Command kinds

// Imports
use std::fmt;

/// Defines the command kind enum, along with it's names
macro_rules! define_cmd_kinds {
	($( $(#[$meta:meta])* $variant:ident => $name:literal ),* $(,)?) => {
		/// Command kind
		#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug)]
		pub enum CmdKind {
			$( $(#[$meta])* $variant, )*
		}

		impl CmdKind {
			/// All command kinds
			pub const ALL: &'static [Self] = &[ $( Self::$variant, )* ];

			/// Returns this command's name, as reported in statistics
			pub const fn name(self) -> &'static str {
				match self {
					$( Self::$variant => $name, )*
				}
			}
		}
	};
}

define_cmd_kinds! {
	CopyH2D => "copy_h2d",
	CopyD2H => "copy_d2h",
	CopyD2D => "copy_d2d",
	CopyO2O => "copy_o2o",
	Convert => "convert_type",

	Add => "add",
	Sub => "sub",
	Mul => "mul",
	Div => "div",
	Abs => "abs",
	Not => "not",
	And => "and",
	Or => "or",
	Xor => "xor",
	Xnor => "xnor",
	Min => "min",
	Max => "max",
	AddScalar => "add_scalar",
	SubScalar => "sub_scalar",
	MulScalar => "mul_scalar",
	DivScalar => "div_scalar",
	AndScalar => "and_scalar",
	OrScalar => "or_scalar",
	XorScalar => "xor_scalar",
	XnorScalar => "xnor_scalar",
	MinScalar => "min_scalar",
	MaxScalar => "max_scalar",

	Gt => "gt",
	Lt => "lt",
	Eq => "eq",
	Ne => "ne",
	GtScalar => "gt_scalar",
	LtScalar => "lt_scalar",
	EqScalar => "eq_scalar",
	NeScalar => "ne_scalar",

	ScaledAdd => "scaled_add",
	PopCount => "popcount",
	PrefixSum => "prefix_sum",
	Mac => "mac",
	RedSum => "redsum",
	RedMin => "redmin",
	RedMax => "redmax",

	BitSliceExtract => "bit_slice_extract",
	BitSliceInsert => "bit_slice_insert",

	CondCopy => "cond_copy",
	CondBroadcast => "cond_broadcast",
	CondSelect => "cond_select",
	CondSelectScalar => "cond_select_scalar",
	Broadcast => "broadcast",

	RotateElementsRight => "rotate_elements_right",
	RotateElementsLeft => "rotate_elements_left",
	ShiftElementsRight => "shift_elements_right",
	ShiftElementsLeft => "shift_elements_left",
	ShiftBitsRight => "shift_bits_right",
	ShiftBitsLeft => "shift_bits_left",

	AesSbox => "aes_sbox",
	AesInverseSbox => "aes_inverse_sbox",
}

impl CmdKind {
	/// Returns if this command needs numeric (non-raw) operands
	pub const fn is_arithmetic(self) -> bool {
		use CmdKind::*;
		matches!(
			self,
			Convert |
				Add | Sub | Mul | Div | Abs | Min | Max |
				AddScalar | SubScalar | MulScalar | DivScalar | MinScalar | MaxScalar |
				Gt | Lt | GtScalar | LtScalar |
				ScaledAdd | PrefixSum | Mac | RedSum | RedMin | RedMax
		)
	}

	/// Returns if this command needs integer operands
	pub const fn is_bitwise_int(self) -> bool {
		matches!(
			self,
			Self::PopCount | Self::ShiftBitsLeft | Self::ShiftBitsRight | Self::AesSbox | Self::AesInverseSbox
		)
	}

	/// Returns if this command moves data between the host and the device
	pub const fn is_host_copy(self) -> bool {
		matches!(self, Self::CopyH2D | Self::CopyD2H)
	}
}

impl fmt::Display for CmdKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.pad(self.name())
	}
}
