//! Errors

// Imports
use crate::{data_type::DataType, device::ObjId};

/// Result of every public operation
pub type PimResult<T> = Result<T, PimError>;

/// Operation error.
///
/// Returned by every public operation. No operation that returns an error
/// has mutated any object or statistic.
#[derive(Debug, thiserror::Error)]
pub enum PimError {
	#[error("No PIM device exists")]
	NoDevice,

	#[error("A PIM device already exists")]
	DeviceExists,

	#[error("Object {0} not found")]
	ObjectNotFound(ObjId),

	#[error("Out of capacity: {0}")]
	OutOfCapacity(String),

	#[error("Size mismatch: expected {expected} elements, found {found}")]
	SizeMismatch { expected: u64, found: u64 },

	#[error("Type mismatch: expected {expected}, found {found}")]
	TypeMismatch { expected: String, found: DataType },

	#[error("Invalid index range {begin}..{end} for {len} elements")]
	InvalidRange { begin: u64, end: u64, len: u64 },

	#[error("Invalid reference: {0}")]
	InvalidReference(String),

	#[error("Unsupported operation: {0}")]
	Unsupported(String),

	#[error("No performance model for {cmd} on {data_type} with {device}")]
	Unmodeled {
		cmd:       &'static str,
		data_type: DataType,
		device:    &'static str,
	},

	#[error("Division by zero at element {0}")]
	DivisionByZero(u64),

	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	#[error("Invalid configuration")]
	Config(#[source] anyhow::Error),
}

impl PimError {
	/// Creates a type mismatch error
	pub(crate) fn type_mismatch(expected: impl ToString, found: DataType) -> Self {
		Self::TypeMismatch {
			expected: expected.to_string(),
			found,
		}
	}

	/// Creates a size mismatch error
	pub(crate) fn size_mismatch(expected: u64, found: u64) -> Self {
		Self::SizeMismatch { expected, found }
	}
}
