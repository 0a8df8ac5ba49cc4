//! Processing-in-memory simulator
//!
//! Functionally simulates operations on objects allocated in a PIM device
//! and estimates their runtime and energy from DRAM timing parameters.

// Modules
pub mod cmd;
pub mod config;
pub mod data_type;
pub mod device;
pub mod dram;
pub mod error;
pub mod fuse;
pub mod perf;
pub mod sim;
pub mod stats;

// Exports
pub use self::{
	cmd::{BinOp, CopyType, ReduceOp},
	data_type::{DataType, Element},
	device::{AllocLayout, DeviceConfig, DeviceKind, DeviceProperties, ObjId, Topology},
	dram::{DramParams, Protocol},
	error::{PimError, PimResult},
	fuse::PimProg,
	perf::PerfEnergy,
	sim::Simulator,
	stats::{Statistics, StatsSnapshot},
};
