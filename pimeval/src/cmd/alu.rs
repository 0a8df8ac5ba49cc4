//! Element arithmetic
//!
//! All functions operate on raw element bits and return bits truncated to the
//! result type's width.

// Imports
use {
	crate::{
		data_type::{DataType, NumClass},
		error::{PimError, PimResult},
	},
	pimeval_util::BitsExt,
	std::cmp::Ordering,
};

/// Binary element operation
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum BinOp {
	Add,
	Sub,
	Mul,
	Div,
	And,
	Or,
	Xor,
	Xnor,
	Min,
	Max,
	Gt,
	Lt,
	Eq,
	Ne,
}

impl BinOp {
	/// Returns if this operation produces a boolean
	pub const fn is_relational(self) -> bool {
		matches!(self, Self::Gt | Self::Lt | Self::Eq | Self::Ne)
	}

	/// Returns if this operation only looks at raw bits
	pub const fn is_bitwise(self) -> bool {
		matches!(self, Self::And | Self::Or | Self::Xor | Self::Xnor | Self::Eq | Self::Ne)
	}

	/// Applies this operation to elements `lhs` and `rhs` of `data_type`.
	///
	/// Relational operations return `0` or `1`.
	pub fn apply(self, data_type: DataType, lhs: u64, rhs: u64) -> Result<u64, DivByZero> {
		let (lhs, rhs) = (data_type.truncate(lhs), data_type.truncate(rhs));
		let bits = match self {
			Self::And => lhs & rhs,
			Self::Or => lhs | rhs,
			Self::Xor => lhs ^ rhs,
			Self::Xnor => !(lhs ^ rhs),
			Self::Eq => u64::from(self::compare(data_type, lhs, rhs) == Some(Ordering::Equal)),
			Self::Ne => u64::from(self::compare(data_type, lhs, rhs) != Some(Ordering::Equal)),
			Self::Gt => u64::from(self::compare(data_type, lhs, rhs) == Some(Ordering::Greater)),
			Self::Lt => u64::from(self::compare(data_type, lhs, rhs) == Some(Ordering::Less)),
			Self::Min => match self::compare(data_type, lhs, rhs) {
				Some(Ordering::Greater) => rhs,
				_ => lhs,
			},
			Self::Max => match self::compare(data_type, lhs, rhs) {
				Some(Ordering::Less) => rhs,
				_ => lhs,
			},
			Self::Add | Self::Sub | Self::Mul | Self::Div => match data_type.class() {
				NumClass::Float => {
					let (lhs, rhs) = (data_type.to_f32(lhs), data_type.to_f32(rhs));
					let value = match self {
						Self::Add => lhs + rhs,
						Self::Sub => lhs - rhs,
						Self::Mul => lhs * rhs,
						_ => lhs / rhs,
					};
					data_type.from_f32(value)
				},
				NumClass::Signed => {
					let (lhs, rhs) = (data_type.to_i64(lhs), data_type.to_i64(rhs));
					let value = match self {
						Self::Add => lhs.wrapping_add(rhs),
						Self::Sub => lhs.wrapping_sub(rhs),
						Self::Mul => lhs.wrapping_mul(rhs),
						_ => match rhs {
							0 => return Err(DivByZero),
							_ => lhs.wrapping_div(rhs),
						},
					};
					value as u64
				},
				NumClass::Unsigned | NumClass::Raw => match self {
					Self::Add => lhs.wrapping_add(rhs),
					Self::Sub => lhs.wrapping_sub(rhs),
					Self::Mul => lhs.wrapping_mul(rhs),
					_ => lhs.checked_div(rhs).ok_or(DivByZero)?,
				},
			},
		};

		let result_type = match self.is_relational() {
			true => DataType::Bool,
			false => data_type,
		};
		Ok(result_type.truncate(bits))
	}
}

/// Integer division by zero
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct DivByZero;

/// Compares two elements of `data_type`.
///
/// Returns `None` for unordered floats.
pub fn compare(data_type: DataType, lhs: u64, rhs: u64) -> Option<Ordering> {
	match data_type.class() {
		NumClass::Signed => Some(data_type.to_i64(lhs).cmp(&data_type.to_i64(rhs))),
		NumClass::Unsigned | NumClass::Raw => Some(data_type.truncate(lhs).cmp(&data_type.truncate(rhs))),
		NumClass::Float => data_type.to_f32(lhs).partial_cmp(&data_type.to_f32(rhs)),
	}
}

/// Returns the bitwise negation of an element
pub fn not(data_type: DataType, bits: u64) -> u64 {
	data_type.truncate(!bits)
}

/// Returns the absolute value of an element
pub fn abs(data_type: DataType, bits: u64) -> u64 {
	match data_type.class() {
		NumClass::Signed => data_type.truncate(data_type.to_i64(bits).wrapping_abs() as u64),
		NumClass::Float => data_type.from_f32(data_type.to_f32(bits).abs()),
		NumClass::Unsigned | NumClass::Raw => data_type.truncate(bits),
	}
}

/// Returns the number of set bits of an element
pub fn popcount(data_type: DataType, bits: u64) -> u64 {
	u64::from(data_type.truncate(bits).count_ones())
}

/// Shifts an element's bits left, filling with zero
pub fn shift_bits_left(data_type: DataType, bits: u64, amount: u32) -> u64 {
	match amount {
		amount if amount >= data_type.bits() => 0,
		amount => data_type.truncate(bits << amount),
	}
}

/// Shifts an element's bits right, arithmetically for signed types
pub fn shift_bits_right(data_type: DataType, bits: u64, amount: u32) -> u64 {
	match data_type.is_signed() {
		true => data_type.truncate((data_type.to_i64(bits) >> amount.min(63)) as u64),
		false => match amount {
			amount if amount >= data_type.bits() => 0,
			amount => data_type.truncate(bits) >> amount,
		},
	}
}

/// Adds two elements, wrapping at the element's width
pub fn add(data_type: DataType, lhs: u64, rhs: u64) -> u64 {
	match data_type.class() {
		NumClass::Float => data_type.from_f32(data_type.to_f32(lhs) + data_type.to_f32(rhs)),
		_ => data_type.truncate(lhs.wrapping_add(rhs)),
	}
}

/// Computes `lhs * scale + rhs`, wrapping at the element's width
pub fn scaled_add(data_type: DataType, lhs: u64, rhs: u64, scale: u64) -> u64 {
	match data_type.class() {
		NumClass::Float => {
			let value = data_type.to_f32(lhs) * data_type.to_f32(scale) + data_type.to_f32(rhs);
			data_type.from_f32(value)
		},
		_ => data_type.truncate(lhs.wrapping_mul(scale).wrapping_add(rhs)),
	}
}

/// Inserts a boolean as bit `bit_idx` of an element
pub fn insert_bit(data_type: DataType, bits: u64, bit_idx: u32, value: u64) -> u64 {
	data_type.truncate(bits.with_bit(bit_idx, value & 1 == 1))
}

/// Extracts bit `bit_idx` of an element
pub fn extract_bit(bits: u64, bit_idx: u32) -> u64 {
	u64::from(bits.bit(bit_idx))
}

/// Accumulator for reductions of elements
#[derive(Clone, Copy, Debug)]
pub enum Accumulator {
	Signed(i64),
	Unsigned(u64),
	Float(f32),
}

impl Accumulator {
	/// Creates a zero accumulator for elements of `data_type`
	pub fn zero(data_type: DataType) -> Self {
		match data_type.class() {
			NumClass::Signed => Self::Signed(0),
			NumClass::Unsigned | NumClass::Raw => Self::Unsigned(0),
			NumClass::Float => Self::Float(0.0),
		}
	}

	/// Adds an element of `data_type`
	pub fn add(self, data_type: DataType, bits: u64) -> Self {
		match self {
			Self::Signed(acc) => Self::Signed(acc.wrapping_add(data_type.to_i64(bits))),
			Self::Unsigned(acc) => Self::Unsigned(acc.wrapping_add(data_type.truncate(bits))),
			Self::Float(acc) => Self::Float(acc + data_type.to_f32(bits)),
		}
	}

	/// Returns the accumulator's raw bits, in the accumulator type of the elements
	pub fn to_bits(self) -> u64 {
		match self {
			Self::Signed(acc) => acc as u64,
			Self::Unsigned(acc) => acc,
			Self::Float(acc) => u64::from(acc.to_bits()),
		}
	}
}

/// Reduces elements of `data_type`, returning bits of its accumulator type.
///
/// Returns `None` for `Min`/`Max` over no elements.
pub fn reduce(
	op: ReduceOp,
	data_type: DataType,
	elements: impl IntoIterator<Item = u64>,
) -> PimResult<Option<u64>> {
	let accumulator = data_type.accumulator();
	let widen = |bits: u64| {
		data_type
			.convert(bits, accumulator)
			.ok_or_else(|| PimError::Unsupported(format!("Reducing {data_type} elements")))
	};

	let result = match op {
		ReduceOp::Sum => Some(
			elements
				.into_iter()
				.fold(Accumulator::zero(data_type), |acc, bits| acc.add(data_type, bits))
				.to_bits(),
		),
		ReduceOp::Min | ReduceOp::Max => {
			let wanted = match op {
				ReduceOp::Min => Ordering::Less,
				_ => Ordering::Greater,
			};
			elements
				.into_iter()
				.reduce(|best, bits| match self::compare(data_type, bits, best) == Some(wanted) {
					true => bits,
					false => best,
				})
				.map(widen)
				.transpose()?
		},
	};

	Ok(result)
}

/// Reduction operation
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ReduceOp {
	Sum,
	Min,
	Max,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn int(data_type: DataType, value: i64) -> u64 {
		data_type.truncate(value as u64)
	}

	#[test]
	fn wrapping_arithmetic() {
		let ty = DataType::Int8;
		assert_eq!(BinOp::Add.apply(ty, int(ty, 127), 1), Ok(int(ty, -128)));
		assert_eq!(BinOp::Mul.apply(ty, int(ty, -3), 5), Ok(int(ty, -15)));
		assert_eq!(BinOp::Div.apply(ty, int(ty, -7), 2), Ok(int(ty, -3)));
		assert_eq!(BinOp::Div.apply(ty, 1, 0), Err(DivByZero));
		assert_eq!(BinOp::Div.apply(DataType::Int64, i64::MIN as u64, u64::MAX), Ok(i64::MIN as u64));

		let ty = DataType::UInt16;
		assert_eq!(BinOp::Sub.apply(ty, 0, 1), Ok(0xffff));
		assert_eq!(BinOp::Xnor.apply(ty, 0xff00, 0x0f0f), Ok(0x0ff0));
	}

	#[test]
	fn signed_comparisons() {
		let ty = DataType::Int16;
		assert_eq!(BinOp::Lt.apply(ty, int(ty, -1), 1), Ok(1));
		assert_eq!(BinOp::Lt.apply(DataType::UInt16, 0xffff, 1), Ok(0));
		assert_eq!(BinOp::Max.apply(ty, int(ty, -5), int(ty, -2)), Ok(int(ty, -2)));
		assert_eq!(BinOp::Min.apply(ty, int(ty, -5), int(ty, -2)), Ok(int(ty, -5)));
	}

	#[test]
	fn floats() {
		let ty = DataType::Fp32;
		let f = |value: f32| ty.from_f32(value);
		assert_eq!(BinOp::Add.apply(ty, f(1.5), f(2.25)), Ok(f(3.75)));
		assert_eq!(BinOp::Gt.apply(ty, f(-1.0), f(-2.0)), Ok(1));
		assert_eq!(abs(ty, f(-4.5)), f(4.5));
		assert_eq!(scaled_add(ty, f(2.0), f(1.0), f(3.0)), f(7.0));
	}

	#[test]
	fn bit_manipulation() {
		let ty = DataType::Int8;
		assert_eq!(shift_bits_right(ty, int(ty, -8), 2), int(ty, -2));
		assert_eq!(shift_bits_right(DataType::UInt8, 0xf8, 2), 0x3e);
		assert_eq!(shift_bits_left(ty, 0x81, 1), 0x02);
		assert_eq!(shift_bits_left(ty, 0x81, 8), 0);
		assert_eq!(popcount(DataType::UInt32, 0xf0f0), 8);
		assert_eq!(insert_bit(ty, 0, 7, 1), 0x80);
		assert_eq!(extract_bit(0x80, 7), 1);
		assert_eq!(not(ty, 0x0f), 0xf0);
	}

	#[test]
	fn full_width_shifts() {
		assert_eq!(shift_bits_right(DataType::UInt64, 1 << 63, 64), 0);
		assert_eq!(shift_bits_right(DataType::UInt64, u64::MAX, 100), 0);
		assert_eq!(shift_bits_right(DataType::UInt64, 1 << 63, 63), 1);
		assert_eq!(shift_bits_right(DataType::UInt8, 0x80, 8), 0);
		assert_eq!(shift_bits_right(DataType::Int64, 1 << 63, 64), u64::MAX);
		assert_eq!(shift_bits_right(DataType::Int8, 0x80, 9), 0xff);
		assert_eq!(shift_bits_right(DataType::Int8, 0x40, 8), 0);
		assert_eq!(shift_bits_left(DataType::UInt64, 1, 64), 0);
	}

	#[test]
	fn reductions() {
		let ty = DataType::Int8;
		let values = [int(ty, -3), 7, int(ty, -100), 50];
		let sum = reduce(ReduceOp::Sum, ty, values).expect("Unable to reduce");
		assert_eq!(sum, Some((-46_i64) as u64));
		let min = reduce(ReduceOp::Min, ty, values).expect("Unable to reduce");
		assert_eq!(min, Some((-100_i64) as u64));
		let max = reduce(ReduceOp::Max, DataType::UInt8, [3, 200, 9]).expect("Unable to reduce");
		assert_eq!(max, Some(200));
		assert_eq!(reduce(ReduceOp::Max, ty, []).expect("Unable to reduce"), None);
	}
}
