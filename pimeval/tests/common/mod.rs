//! Shared test helpers

// Note: Not every test uses every helper
#![allow(dead_code)]

// Imports
use {
	pimeval::{DeviceKind, Simulator, Topology},
	rand::{rngs::StdRng, SeedableRng},
};

/// Small topology: 4 subarray-level cores (2 bank-level cores) of 1024 rows by 64 columns
pub const TOPOLOGY: Topology = Topology {
	num_ranks:             1,
	num_bank_per_rank:     2,
	num_subarray_per_bank: 2,
	num_row_per_subarray:  1024,
	num_col_per_subarray:  64,
	buffer_size:           2048,
};

/// Creates a simulator with a device of kind `kind` on [`TOPOLOGY`]
pub fn sim(kind: DeviceKind) -> Simulator {
	let mut sim = Simulator::new();
	sim.create_device(kind, TOPOLOGY).expect("Unable to create device");
	sim
}

/// Returns the number of cores of the device
pub fn num_cores(sim: &Simulator) -> u64 {
	u64::from(sim.device_properties().expect("Unable to get properties").num_cores)
}

/// Creates a seeded rng
pub fn rng(seed: u64) -> StdRng {
	StdRng::seed_from_u64(seed)
}
