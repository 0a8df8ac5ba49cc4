//! Matrix-vector, multiply-accumulate and reduction tests

// Modules
mod common;

// Imports
use {
	pimeval::{AllocLayout, DataType, DeviceKind, PimError, Simulator, Topology},
	rand::Rng,
	std::ops::Range,
};

/// Computes `matrix * vector` on the device by scaled accumulation of the matrix's columns
fn gemv(sim: &mut Simulator, matrix: &[Vec<i32>], vector: &[i32]) -> Vec<i32> {
	let rows = matrix[0].len();
	let column = sim
		.alloc(AllocLayout::Auto, rows as u64, DataType::Int32)
		.expect("Unable to allocate");
	let acc = sim.alloc_associated(column, DataType::Int32).expect("Unable to allocate");
	sim.broadcast_int(acc, 0).expect("Unable to broadcast");

	for (values, &scalar) in matrix.iter().zip(vector) {
		sim.copy_host_to_device(values, column, 0..0).expect("Unable to copy");
		sim.scaled_add(column, acc, acc, scalar as u64)
			.expect("Unable to accumulate");
	}

	let mut result = vec![0; rows];
	sim.copy_device_to_host(acc, &mut result, 0..0).expect("Unable to copy");
	sim.free(column).expect("Unable to free");
	sim.free(acc).expect("Unable to free");
	result
}

#[test]
fn matrix_vector_products() {
	let mut rng = common::rng(3);
	for kind in [DeviceKind::BitsimdV, DeviceKind::Fulcrum, DeviceKind::Aquabolt] {
		let mut sim = common::sim(kind);
		for (rows, cols) in [(64, 64), (100, 37), (5, 300)] {
			let matrix = (0..cols)
				.map(|_| (0..rows).map(|_| rng.gen_range(-100..100)).collect::<Vec<i32>>())
				.collect::<Vec<_>>();
			let vector = (0..cols).map(|_| rng.gen_range(-100..100)).collect::<Vec<i32>>();

			let expected = (0..rows)
				.map(|row| {
					matrix
						.iter()
						.zip(&vector)
						.map(|(column, &scalar)| column[row] * scalar)
						.sum::<i32>()
				})
				.collect::<Vec<_>>();
			assert_eq!(
				self::gemv(&mut sim, &matrix, &vector),
				expected,
				"{rows}x{cols} product on {kind}"
			);
		}

		let stats = sim.stats();
		let scaled_add = stats.cmd("scaled_add").expect("Missing scaled add stats");
		assert_eq!(scaled_add.count, 64 + 37 + 300);
		assert!(scaled_add.runtime_ms > 0.0 && scaled_add.energy_mj > 0.0);
	}
}

/// Reduces `range` of `values` on the host, as `red_sum`, `red_min` and `red_max` would
fn host_reductions(values: &[i32], range: Range<u64>) -> (i64, Option<i64>, Option<i64>) {
	let range = match range {
		Range { start: 0, end: 0 } => 0..values.len(),
		range => range.start as usize..range.end as usize,
	};
	let values = values[range].iter().map(|&value| i64::from(value));
	(values.clone().sum(), values.clone().min(), values.max())
}

#[test]
fn reductions() {
	let mut rng = common::rng(4);
	for kind in [DeviceKind::BitsimdV, DeviceKind::Fulcrum, DeviceKind::BankLevel] {
		let mut sim = common::sim(kind);
		let values = (0..500).map(|_| rng.gen()).collect::<Vec<i32>>();
		let obj = sim.alloc(AllocLayout::Auto, 500, DataType::Int32).expect("Unable to allocate");
		sim.copy_host_to_device(&values, obj, 0..0).expect("Unable to copy");

		for range in [0..0, 0..500, 0..1, 499..500, 63..65, 100..357, 250..250] {
			let (sum, min, max) = self::host_reductions(&values, range.clone());
			assert_eq!(sim.red_sum::<i64>(obj, range.clone()).expect("Unable to sum"), sum);

			match (min, max) {
				(Some(min), Some(max)) => {
					assert_eq!(sim.red_min::<i64>(obj, range.clone()).expect("Unable to reduce"), min);
					assert_eq!(sim.red_max::<i64>(obj, range.clone()).expect("Unable to reduce"), max);
				},
				_ => {
					assert!(matches!(
						sim.red_min::<i64>(obj, range.clone()),
						Err(PimError::InvalidRange { .. })
					));
					assert!(matches!(sim.red_max::<i64>(obj, range), Err(PimError::InvalidRange { .. })));
				},
			}
		}

		assert!(matches!(
			sim.red_sum::<i64>(obj, 400..501),
			Err(PimError::InvalidRange { begin: 400, end: 501, len: 500 })
		));

		// Partial sums are read back on bit-serial devices only
		let stats = sim.stats();
		match kind.is_bit_serial() {
			true => assert!(stats.device_to_host_bytes > 0),
			false => assert_eq!(stats.device_to_host_bytes, 0),
		}
	}
}

#[test]
fn reduction_types() {
	let mut sim = common::sim(DeviceKind::Fulcrum);

	let bytes = sim.alloc(AllocLayout::Auto, 300, DataType::UInt8).expect("Unable to allocate");
	sim.broadcast_uint(bytes, 255).expect("Unable to broadcast");
	assert_eq!(sim.red_sum::<u64>(bytes, 0..0).expect("Unable to sum"), 300 * 255);

	let bools = sim.alloc(AllocLayout::Auto, 10, DataType::Bool).expect("Unable to allocate");
	sim.copy_host_to_device(&[true, false, true, true, false, false, true, false, false, true], bools, 0..0)
		.expect("Unable to copy");
	assert_eq!(sim.red_sum::<u64>(bools, 0..0).expect("Unable to sum"), 5);
	assert_eq!(sim.red_sum::<u64>(bools, 2..4).expect("Unable to sum"), 2);

	let floats = sim.alloc(AllocLayout::Auto, 4, DataType::Fp32).expect("Unable to allocate");
	sim.copy_host_to_device(&[0.5_f32, -1.25, 8.0, 3.0], floats, 0..0)
		.expect("Unable to copy");
	assert_eq!(sim.red_sum::<f32>(floats, 0..0).expect("Unable to sum"), 10.25);
	assert_eq!(sim.red_min::<f32>(floats, 0..0).expect("Unable to reduce"), -1.25);
	assert_eq!(sim.red_max::<f32>(floats, 1..3).expect("Unable to reduce"), 8.0);

	assert!(matches!(sim.red_sum::<u8>(bytes, 0..0), Err(PimError::TypeMismatch { .. })));
	let halfs = sim.alloc(AllocLayout::Auto, 4, DataType::Fp16).expect("Unable to allocate");
	assert!(matches!(sim.red_sum::<f32>(halfs, 0..0), Err(PimError::Unsupported(_))));
}

/// Aquabolt device with 4 bank-level cores, each holding 256 `i32`s per row
fn mac_sim() -> Simulator {
	let mut sim = Simulator::new();
	sim.create_device(DeviceKind::Aquabolt, Topology::new(1, 4, 2, 64, 8192))
		.expect("Unable to create device");
	sim
}

#[test]
fn multiply_accumulate() {
	let mut rng = common::rng(5);
	for layout in [AllocLayout::H1, AllocLayout::V1] {
		let mut sim = self::mac_sim();
		assert_eq!(common::num_cores(&sim), 4);

		let values = (0..1000).map(|_| rng.gen_range(-50..50)).collect::<Vec<i32>>();
		let weights = (0..256).map(|_| rng.gen_range(-50..50)).collect::<Vec<i32>>();
		let src = sim.alloc(layout, 1000, DataType::Int32).expect("Unable to allocate");
		let buffer = sim.alloc_buffer(256, DataType::Int32).expect("Unable to allocate buffer");
		sim.copy_host_to_device(&values, src, 0..0).expect("Unable to copy");
		sim.copy_host_to_device(&weights, buffer, 0..0).expect("Unable to copy");

		// Accumulators are pre-initialized by the caller
		let mut acc = [10_i32; 4];
		sim.mac(src, buffer, &mut acc).expect("Unable to multiply-accumulate");

		let expected = values
			.chunks(250)
			.map(|chunk| 10 + chunk.iter().zip(&weights).map(|(value, weight)| value * weight).sum::<i32>())
			.collect::<Vec<_>>();
		assert_eq!(acc.to_vec(), expected, "Layout {layout:?}");

		let stats = sim.stats();
		assert_eq!(stats.cmd("mac").map(|cmd| cmd.count), Some(1));
		assert_eq!(stats.device_to_host_bytes, 4 * 4);
	}
}

#[test]
fn multiply_accumulate_checks() {
	let mut sim = self::mac_sim();
	let single = sim.alloc(AllocLayout::H1, 1000, DataType::Int32).expect("Unable to allocate");
	let multi = sim.alloc(AllocLayout::H, 1000, DataType::Int32).expect("Unable to allocate");
	let buffer = sim.alloc_buffer(256, DataType::Int32).expect("Unable to allocate buffer");
	let small_buffer = sim.alloc_buffer(8, DataType::Int32).expect("Unable to allocate buffer");

	let mut acc = [0_i32; 4];
	assert!(matches!(
		sim.mac(single, buffer, &mut [0_i32; 3]),
		Err(PimError::SizeMismatch { expected: 4, found: 3 })
	));
	assert!(matches!(sim.mac(single, multi, &mut acc), Err(PimError::InvalidArgument(_))));
	assert!(matches!(sim.mac(multi, buffer, &mut acc), Err(PimError::InvalidArgument(_))));
	assert!(matches!(
		sim.mac(single, small_buffer, &mut acc),
		Err(PimError::SizeMismatch { .. })
	));
	assert!(matches!(sim.mac(single, buffer, &mut [0_u32; 4]), Err(PimError::TypeMismatch { .. })));

	// The global buffer only takes part in copies and multiply-accumulates
	assert!(matches!(sim.add(buffer, buffer, buffer), Err(PimError::InvalidArgument(_))));
	assert!(matches!(
		sim.alloc_buffer(1024, DataType::Int32),
		Err(PimError::OutOfCapacity(_))
	));
	assert!(sim.stats().cmds.is_empty());

	// Bit-serial devices can't multiply-accumulate
	let mut sim = common::sim(DeviceKind::BitsimdV);
	let src = sim.alloc(AllocLayout::V1, 4, DataType::Int32).expect("Unable to allocate");
	let buffer = sim.alloc_buffer(4, DataType::Int32).expect("Unable to allocate buffer");
	assert!(matches!(
		sim.mac(src, buffer, &mut [0_i32; 4]),
		Err(PimError::Unmodeled { cmd: "mac", .. })
	));
}

#[test]
fn functional_devices_follow_their_target() {
	let mut sim = common::sim(DeviceKind::Functional);
	let properties = sim.device_properties().expect("Unable to get properties");
	assert_eq!(properties.sim_target, DeviceKind::BitsimdV);

	let src = sim.alloc(AllocLayout::V1, 4, DataType::Int32).expect("Unable to allocate");
	let dest = sim.alloc_associated(src, DataType::Int32).expect("Unable to allocate");
	let buffer = sim.alloc_buffer(4, DataType::Int32).expect("Unable to allocate buffer");
	sim.copy_host_to_device(&[1_i32, 2, 3, 4], src, 0..0).expect("Unable to copy");

	let mut acc = [0_i32; 4];
	assert!(matches!(
		sim.mac(src, buffer, &mut acc),
		Err(PimError::Unmodeled { cmd: "mac", .. })
	));
	assert!(matches!(
		sim.prefix_sum(src, dest),
		Err(PimError::Unmodeled { cmd: "prefix_sum", .. })
	));
	assert_eq!(acc, [0; 4]);
	assert_eq!(sim.stats().cmd("mac"), None);
}
