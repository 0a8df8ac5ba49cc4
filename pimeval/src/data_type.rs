//! Element data types

// Imports
use {
	pimeval_util::BitsExt,
	std::fmt,
};

/// Element data type
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum DataType {
	Bool,
	Int8,
	Int16,
	Int32,
	Int64,
	UInt8,
	UInt16,
	UInt32,
	UInt64,
	Fp32,
	Fp16,
	Bf16,
	Fp8,
}

impl DataType {
	/// All data types
	pub const ALL: [Self; 13] = [
		Self::Bool,
		Self::Int8,
		Self::Int16,
		Self::Int32,
		Self::Int64,
		Self::UInt8,
		Self::UInt16,
		Self::UInt32,
		Self::UInt64,
		Self::Fp32,
		Self::Fp16,
		Self::Bf16,
		Self::Fp8,
	];

	/// Number of bits an element occupies on the device
	pub const fn bits(self) -> u32 {
		match self {
			Self::Bool => 1,
			Self::Int8 | Self::UInt8 | Self::Fp8 => 8,
			Self::Int16 | Self::UInt16 | Self::Fp16 | Self::Bf16 => 16,
			Self::Int32 | Self::UInt32 | Self::Fp32 => 32,
			Self::Int64 | Self::UInt64 => 64,
		}
	}

	/// Number of bits an element occupies on the host
	pub const fn host_bits(self) -> u32 {
		match self {
			Self::Bool => 8,
			_ => self.bits(),
		}
	}

	/// Number of bytes an element occupies on the host
	pub const fn host_bytes(self) -> u64 {
		self.host_bits() as u64 / 8
	}

	/// Returns the numeric class of this type
	pub const fn class(self) -> NumClass {
		match self {
			Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 => NumClass::Signed,
			Self::Bool | Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64 => NumClass::Unsigned,
			Self::Fp32 | Self::Bf16 => NumClass::Float,
			Self::Fp16 | Self::Fp8 => NumClass::Raw,
		}
	}

	/// Returns if this is a signed integer type
	pub const fn is_signed(self) -> bool {
		matches!(self.class(), NumClass::Signed)
	}

	/// Returns if this is an integer type (including bool)
	pub const fn is_int(self) -> bool {
		matches!(self.class(), NumClass::Signed | NumClass::Unsigned)
	}

	/// Returns if this type supports arithmetic
	pub const fn is_arithmetic(self) -> bool {
		!matches!(self.class(), NumClass::Raw)
	}

	/// Returns the accumulator type reductions of this type produce
	pub const fn accumulator(self) -> Self {
		match self.class() {
			NumClass::Signed => Self::Int64,
			NumClass::Unsigned => Self::UInt64,
			NumClass::Float | NumClass::Raw => Self::Fp32,
		}
	}

	/// Returns this type's name, as used by config files and reports
	pub const fn name(self) -> &'static str {
		match self {
			Self::Bool => "bool",
			Self::Int8 => "int8",
			Self::Int16 => "int16",
			Self::Int32 => "int32",
			Self::Int64 => "int64",
			Self::UInt8 => "uint8",
			Self::UInt16 => "uint16",
			Self::UInt32 => "uint32",
			Self::UInt64 => "uint64",
			Self::Fp32 => "fp32",
			Self::Fp16 => "fp16",
			Self::Bf16 => "bf16",
			Self::Fp8 => "fp8",
		}
	}

	/// Normalizes raw bits to this type's width
	pub fn truncate(self, bits: u64) -> u64 {
		bits.truncate_bits(self.bits())
	}

	/// Interprets `bits` as a signed value
	pub fn to_i64(self, bits: u64) -> i64 {
		match self.is_signed() {
			true => bits.sign_extend_bits(self.bits()),
			false => bits.truncate_bits(self.bits()) as i64,
		}
	}

	/// Interprets `bits` as a float
	///
	/// Only meaningful for [`NumClass::Float`] types.
	pub fn to_f32(self, bits: u64) -> f32 {
		match self {
			Self::Bf16 => f32::from_bits((bits.truncate_bits(16) as u32) << 16),
			_ => f32::from_bits(bits as u32),
		}
	}

	/// Converts a float to this type's raw bits
	///
	/// Only meaningful for [`NumClass::Float`] types.
	pub fn from_f32(self, value: f32) -> u64 {
		match self {
			Self::Bf16 => u64::from(self::f32_to_bf16(value)),
			_ => u64::from(value.to_bits()),
		}
	}

	/// Converts raw bits of this type into raw bits of `dst`.
	///
	/// Returns `None` if either type doesn't support numeric conversion.
	pub fn convert(self, bits: u64, dst: Self) -> Option<u64> {
		if !self.is_arithmetic() || !dst.is_arithmetic() {
			return None;
		}

		let converted = match (self.class(), dst.class()) {
			(_, NumClass::Unsigned) if dst == Self::Bool => match self.class() {
				NumClass::Float => u64::from(self.to_f32(bits) != 0.0),
				_ => u64::from(self.truncate(bits) != 0),
			},
			(NumClass::Float, NumClass::Float) => dst.from_f32(self.to_f32(bits)),
			(NumClass::Float, NumClass::Signed) => (self.to_f32(bits) as i64) as u64,
			(NumClass::Float, NumClass::Unsigned) => self.to_f32(bits) as u64,
			(NumClass::Signed, NumClass::Float) => dst.from_f32(self.to_i64(bits) as f32),
			(_, NumClass::Float) => dst.from_f32(self.truncate(bits) as f32),
			(NumClass::Signed, _) => self.to_i64(bits) as u64,
			_ => self.truncate(bits),
		};

		Some(dst.truncate(converted))
	}
}

impl fmt::Display for DataType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.pad(self.name())
	}
}

/// Numeric class of a data type
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum NumClass {
	/// Two's complement integers
	Signed,

	/// Unsigned integers and booleans
	Unsigned,

	/// Floats with arithmetic support
	Float,

	/// Floats stored as raw bits only
	Raw,
}

/// Narrows an `f32` to `bf16` bits, rounding to nearest even
fn f32_to_bf16(value: f32) -> u16 {
	let bits = value.to_bits();
	if value.is_nan() {
		// Keep it a quiet NaN
		return ((bits >> 16) as u16) | 0x40;
	}

	let rounding_bias = 0x7fff + ((bits >> 16) & 1);
	(bits.wrapping_add(rounding_bias) >> 16) as u16
}

/// Host element type
///
/// Host-side vectors used for copies, reductions and MAC results are slices of these.
pub trait Element: Copy + Default + fmt::Debug {
	/// Number of bits on the host
	const HOST_BITS: u32;

	/// Numeric class
	const CLASS: NumClass;

	/// Converts this element to raw bits
	fn to_bits(self) -> u64;

	/// Converts raw bits to this element
	fn from_bits(bits: u64) -> Self;

	/// Returns if this host type can hold elements of `data_type`
	fn is_compatible(data_type: DataType) -> bool {
		let class_matches = match (Self::CLASS, data_type.class()) {
			// Note: Raw bits can hold anything of the same width
			(NumClass::Unsigned, NumClass::Raw | NumClass::Float) => !matches!(data_type, DataType::Fp32),
			(host, dev) => host == dev,
		};
		class_matches && Self::HOST_BITS == data_type.host_bits()
	}
}

macro_rules! impl_int_element {
	($($ty:ty => $class:ident),* $(,)?) => {
		$(
			impl Element for $ty {
				const HOST_BITS: u32 = <$ty>::BITS;
				const CLASS: NumClass = NumClass::$class;

				#[allow(clippy::cast_sign_loss, clippy::cast_lossless)]
				fn to_bits(self) -> u64 {
					self as u64
				}

				#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
				fn from_bits(bits: u64) -> Self {
					bits as $ty
				}
			}
		)*
	};
}

impl_int_element! {
	u8 => Unsigned,
	u16 => Unsigned,
	u32 => Unsigned,
	u64 => Unsigned,
	i8 => Signed,
	i16 => Signed,
	i32 => Signed,
	i64 => Signed,
}

impl Element for bool {
	const CLASS: NumClass = NumClass::Unsigned;
	const HOST_BITS: u32 = 8;

	fn to_bits(self) -> u64 {
		u64::from(self)
	}

	fn from_bits(bits: u64) -> Self {
		bits & 1 == 1
	}

	fn is_compatible(data_type: DataType) -> bool {
		data_type == DataType::Bool
	}
}

impl Element for f32 {
	const CLASS: NumClass = NumClass::Float;
	const HOST_BITS: u32 = 32;

	fn to_bits(self) -> u64 {
		u64::from(f32::to_bits(self))
	}

	fn from_bits(bits: u64) -> Self {
		f32::from_bits(bits as u32)
	}
}
