//! Performance and energy model
//!
//! Scales the baseline cost tables by the device's DRAM timings and the
//! footprint of each command.

// Modules
pub mod tables;

// Exports
pub use self::tables::{cost_of, BaseCost};

// Imports
use {
	crate::{
		cmd::{CmdKind, CostBasis, Transfer},
		device::{Device, DeviceKind, Footprint},
		error::{PimError, PimResult},
	},
	std::ops::{Add, AddAssign},
};

/// Estimated cost of a command
#[derive(PartialEq, Clone, Copy, Default, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct PerfEnergy {
	/// Runtime (ms)
	pub runtime_ms: f64,

	/// Energy (mJ)
	pub energy_mj: f64,

	/// Fraction of cores active
	pub utilization: f64,
}

impl Add for PerfEnergy {
	type Output = Self;

	fn add(self, rhs: Self) -> Self {
		Self {
			runtime_ms:  self.runtime_ms + rhs.runtime_ms,
			energy_mj:   self.energy_mj + rhs.energy_mj,
			utilization: self.utilization.max(rhs.utilization),
		}
	}
}

impl AddAssign for PerfEnergy {
	fn add_assign(&mut self, rhs: Self) {
		*self = *self + rhs;
	}
}

/// Word ALU parameters of a bit-parallel device
#[derive(Clone, Copy, Debug)]
struct Alu {
	/// Elements processed per operation
	lanes: u32,

	/// Latency of an operation (ns)
	ns: f64,

	/// Energy of an operation (pJ)
	pj: f64,
}

impl Alu {
	/// Returns the ALU of a bit-parallel device
	fn of(device: &Device) -> Self {
		let dram = device.dram();
		match device.sim_target() {
			DeviceKind::BankLevel => Self {
				lanes: 8,
				ns:    dram.ns_ccd_l(),
				pj:    2.0,
			},
			DeviceKind::Aquabolt => Self {
				lanes: 16,
				ns:    dram.ns_ccd_l(),
				pj:    3.5,
			},
			_ => Self {
				lanes: 1,
				ns:    6.1,
				pj:    0.35,
			},
		}
	}
}

/// Estimates the cost of a command
pub fn estimate(device: &Device, basis: &CostBasis) -> PimResult<PerfEnergy> {
	let mut cost = match basis.kind {
		CmdKind::CopyH2D | CmdKind::CopyD2H => {
			let transfer = match basis.kind {
				CmdKind::CopyH2D => Transfer::HostToDevice,
				_ => Transfer::DeviceToHost,
			};
			let mut cost = self::host_transfer(device, transfer, basis.bytes);
			if basis.transpose {
				cost += self::transposition(device, basis);
			}
			cost
		},
		_ => self::compute(device, basis)?,
	};

	// Partial results read back to the host
	if basis.kind != CmdKind::CopyD2H && basis.transfer == Some(Transfer::DeviceToHost) {
		cost += self::host_transfer(device, Transfer::DeviceToHost, basis.bytes);
	}

	tracing::trace!(kind = ?basis.kind, ?basis.footprint, ?cost, "Estimated cost");
	Ok(cost)
}

/// Cost of a command computed on the device
fn compute(device: &Device, basis: &CostBasis) -> PimResult<PerfEnergy> {
	let sim_target = device.sim_target();
	let base =
		tables::cost_of(sim_target, basis.data_type, basis.kind).ok_or_else(|| PimError::Unmodeled {
			cmd:       basis.kind.name(),
			data_type: basis.data_type,
			device:    sim_target.name(),
		})?;

	let dram = device.dram();
	let Footprint {
		num_cores,
		num_passes,
		max_region_elements,
		max_region_rows,
	} = basis.footprint;

	let reads = f64::from(base.row_reads);
	let writes = f64::from(base.row_writes);
	let logic = f64::from(base.logic_ops);
	let (pass_ns, pass_pj) = match sim_target.is_bit_serial() {
		true => (
			reads * dram.ns_row_read() + writes * dram.ns_row_write() + logic * dram.ns_logic(),
			(reads + writes) * dram.pj_act_pre() + writes * dram.pj_write() + logic * dram.pj_logic(),
		),
		false => {
			let alu = Alu::of(device);
			let rows = f64::from(max_region_rows);
			let batches = max_region_elements.div_ceil(u64::from(alu.lanes)) as f64;
			(
				(reads * dram.ns_row_read() + writes * dram.ns_row_write()) * rows + logic * batches * alu.ns,
				(reads + writes) * rows * dram.pj_act_pre() + writes * rows * dram.pj_write() +
					logic * batches * alu.pj,
			)
		},
	};

	let passes = f64::from(num_passes);
	let runtime_ns = pass_ns * passes;
	let dynamic_pj = pass_pj * f64::from(num_cores) * passes;

	Ok(PerfEnergy {
		runtime_ms:  runtime_ns / 1e6,
		energy_mj:   (dynamic_pj + self::background_pj(device, runtime_ns)) / 1e9,
		utilization: self::utilization(device, num_cores),
	})
}

/// Cost of moving `bytes` bytes over the ranks' buses
fn host_transfer(device: &Device, transfer: Transfer, bytes: u64) -> PerfEnergy {
	let dram = device.dram();
	let num_ranks = f64::from(device.topology().num_ranks);

	let runtime_ns = bytes as f64 / (dram.rank_bytes_per_ns() * num_ranks);
	let bursts = (bytes as f64 / dram.bytes_per_burst()).ceil();
	let burst_pj = match transfer {
		Transfer::HostToDevice => dram.pj_write(),
		Transfer::DeviceToHost | Transfer::DeviceToDevice => dram.pj_read(),
	};

	PerfEnergy {
		runtime_ms:  runtime_ns / 1e6,
		energy_mj:   (bursts * burst_pj + self::background_pj(device, runtime_ns)) / 1e9,
		utilization: 0.0,
	}
}

/// Extra cost of transposing copied data into the object's layout.
///
/// Pays one row write per element bit per pass, on every active core.
fn transposition(device: &Device, basis: &CostBasis) -> PerfEnergy {
	let dram = device.dram();
	let Footprint {
		num_cores, num_passes, ..
	} = basis.footprint;

	let rows = f64::from(basis.data_type.bits()) * f64::from(num_passes);
	let runtime_ns = rows * dram.ns_row_write();
	let dynamic_pj = rows * (dram.pj_act_pre() + dram.pj_write()) * f64::from(num_cores);

	PerfEnergy {
		runtime_ms:  runtime_ns / 1e6,
		energy_mj:   (dynamic_pj + self::background_pj(device, runtime_ns)) / 1e9,
		utilization: self::utilization(device, num_cores),
	}
}

/// Background energy of all ranks over `runtime_ns` (pJ)
fn background_pj(device: &Device, runtime_ns: f64) -> f64 {
	device.dram().mw_background() * runtime_ns * f64::from(device.topology().num_ranks)
}

/// Fraction of the device's cores that are active
fn utilization(device: &Device, num_cores: u32) -> f64 {
	match device.shape().num_cores {
		0 => 0.0,
		total => f64::from(num_cores) / f64::from(total),
	}
}
