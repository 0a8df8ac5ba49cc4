//! Elementwise operation tests

// Modules
mod common;

// Imports
use {
	pimeval::{AllocLayout, BinOp, DataType, DeviceKind, ObjId, PimError, Simulator},
	rand::Rng,
};

/// Device kinds with a cost model for every elementwise integer operation they're tested with
const KINDS: [DeviceKind; 6] = [
	DeviceKind::BitsimdV,
	DeviceKind::BitsimdVAp,
	DeviceKind::Simdram,
	DeviceKind::Fulcrum,
	DeviceKind::BankLevel,
	DeviceKind::Aquabolt,
];

/// Binary operations, along with their host reference
const BINARY_OPS: [(BinOp, fn(i32, i32) -> i32); 10] = [
	(BinOp::Add, i32::wrapping_add),
	(BinOp::Sub, i32::wrapping_sub),
	(BinOp::Mul, i32::wrapping_mul),
	(BinOp::Div, i32::wrapping_div),
	(BinOp::And, |lhs, rhs| lhs & rhs),
	(BinOp::Or, |lhs, rhs| lhs | rhs),
	(BinOp::Xor, |lhs, rhs| lhs ^ rhs),
	(BinOp::Xnor, |lhs, rhs| !(lhs ^ rhs)),
	(BinOp::Min, i32::min),
	(BinOp::Max, i32::max),
];

/// Relational operations, along with their host reference
const RELATIONAL_OPS: [(BinOp, fn(i32, i32) -> bool); 4] = [
	(BinOp::Gt, |lhs, rhs| lhs > rhs),
	(BinOp::Lt, |lhs, rhs| lhs < rhs),
	(BinOp::Eq, |lhs, rhs| lhs == rhs),
	(BinOp::Ne, |lhs, rhs| lhs != rhs),
];

/// Sizes crossing core and region boundaries
fn test_sizes(sim: &Simulator) -> Vec<u64> {
	let num_cores = common::num_cores(sim);
	let per_region = 64 * num_cores;
	vec![
		1,
		num_cores - 1,
		num_cores,
		num_cores + 1,
		per_region - 1,
		per_region,
		per_region + 1,
	]
	.into_iter()
	.filter(|&len| len > 0)
	.collect()
}

/// Allocates an object of `len` elements and fills it with `values`
fn upload_i32(sim: &mut Simulator, values: &[i32]) -> ObjId {
	let obj = sim
		.alloc(AllocLayout::Auto, values.len() as u64, DataType::Int32)
		.expect("Unable to allocate");
	sim.copy_host_to_device(values, obj, 0..0).expect("Unable to copy");
	obj
}

fn download<T: pimeval::Element>(sim: &mut Simulator, obj: ObjId, len: u64) -> Vec<T> {
	let mut values = vec![T::default(); len as usize];
	sim.copy_device_to_host(obj, &mut values, 0..0).expect("Unable to copy");
	values
}

#[test]
fn binary_ops() {
	let mut rng = common::rng(1);
	for kind in KINDS {
		let mut sim = common::sim(kind);
		for len in self::test_sizes(&sim) {
			let lhs = (0..len).map(|_| rng.gen_range(-20..20)).collect::<Vec<i32>>();
			let rhs = (0..len)
				.map(|_| match rng.gen_range(-20..20) {
					0 => 1,
					value => value,
				})
				.collect::<Vec<i32>>();
			let (src1, src2) = (upload_i32(&mut sim, &lhs), upload_i32(&mut sim, &rhs));
			let dest = sim.alloc_associated(src1, DataType::Int32).expect("Unable to allocate");
			let bool_dest = sim.alloc_associated(src1, DataType::Bool).expect("Unable to allocate");

			for (op, f) in BINARY_OPS {
				match sim.binary(op, src1, src2, dest) {
					Ok(()) => (),
					Err(PimError::Unmodeled { .. }) if kind == DeviceKind::Aquabolt && op == BinOp::Div => continue,
					Err(err) => panic!("Unable to run {op:?} on {kind}: {err:?}"),
				}

				let expected = lhs.iter().zip(&rhs).map(|(&lhs, &rhs)| f(lhs, rhs)).collect::<Vec<_>>();
				assert_eq!(download::<i32>(&mut sim, dest, len), expected, "{op:?} on {kind} with {len} elements");
			}

			for (op, f) in RELATIONAL_OPS {
				sim.binary(op, src1, src2, bool_dest)
					.unwrap_or_else(|err| panic!("Unable to run {op:?} on {kind}: {err:?}"));

				let expected = lhs.iter().zip(&rhs).map(|(&lhs, &rhs)| f(lhs, rhs)).collect::<Vec<_>>();
				assert_eq!(download::<bool>(&mut sim, bool_dest, len), expected, "{op:?} on {kind} with {len} elements");
			}

			for obj in [src1, src2, dest, bool_dest] {
				sim.free(obj).expect("Unable to free");
			}
		}
	}
}

#[test]
fn scalar_ops() {
	let mut rng = common::rng(2);
	for kind in [DeviceKind::BitsimdV, DeviceKind::Fulcrum] {
		let mut sim = common::sim(kind);
		let values = (0..300).map(|_| rng.gen_range(-100..100)).collect::<Vec<i32>>();
		let src = upload_i32(&mut sim, &values);
		let dest = sim.alloc_associated(src, DataType::Int32).expect("Unable to allocate");
		let bool_dest = sim.alloc_associated(src, DataType::Bool).expect("Unable to allocate");

		for scalar in [-7_i32, 0, 13] {
			let scalar_bits = scalar as u64;
			for (op, f) in BINARY_OPS {
				match sim.binary_scalar(op, src, dest, scalar_bits) {
					Ok(()) => (),
					Err(PimError::DivisionByZero(0)) if op == BinOp::Div && scalar == 0 => continue,
					Err(err) => panic!("Unable to run {op:?} with {scalar} on {kind}: {err:?}"),
				}

				let expected = values.iter().map(|&value| f(value, scalar)).collect::<Vec<_>>();
				assert_eq!(download::<i32>(&mut sim, dest, 300), expected, "{op:?} with {scalar} on {kind}");
			}

			for (op, f) in RELATIONAL_OPS {
				sim.binary_scalar(op, src, bool_dest, scalar_bits)
					.unwrap_or_else(|err| panic!("Unable to run {op:?} on {kind}: {err:?}"));
				let expected = values.iter().map(|&value| f(value, scalar)).collect::<Vec<_>>();
				assert_eq!(download::<bool>(&mut sim, bool_dest, 300), expected, "{op:?} with {scalar} on {kind}");
			}
		}
	}
}

#[test]
fn wrapping_and_floats() {
	let mut sim = common::sim(DeviceKind::BitsimdV);

	let bytes = sim.alloc(AllocLayout::Auto, 4, DataType::UInt8).expect("Unable to allocate");
	sim.copy_host_to_device(&[200_u8, 255, 0, 128], bytes, 0..0)
		.expect("Unable to copy");
	sim.add(bytes, bytes, bytes).expect("Unable to add");
	assert_eq!(download::<u8>(&mut sim, bytes, 4), [144, 254, 0, 0]);

	let floats = sim.alloc(AllocLayout::Auto, 4, DataType::Fp32).expect("Unable to allocate");
	let other = sim.alloc_associated(floats, DataType::Fp32).expect("Unable to allocate");
	let lhs = [1.5_f32, -2.25, 1e10, 0.1];
	let rhs = [0.5_f32, 4.0, -1e10, 0.2];
	sim.copy_host_to_device(&lhs, floats, 0..0).expect("Unable to copy");
	sim.copy_host_to_device(&rhs, other, 0..0).expect("Unable to copy");
	sim.mul(floats, other, other).expect("Unable to multiply");
	let expected = lhs.iter().zip(&rhs).map(|(lhs, rhs)| lhs * rhs).collect::<Vec<_>>();
	assert_eq!(download::<f32>(&mut sim, other, 4), expected);

	let bools = sim.alloc_associated(floats, DataType::Bool).expect("Unable to allocate");
	sim.lt(floats, other, bools).expect("Unable to compare");
	let expected = lhs.iter().zip(&expected).map(|(lhs, rhs)| lhs < rhs).collect::<Vec<_>>();
	assert_eq!(download::<bool>(&mut sim, bools, 4), expected);

	// Raw floats only support bitwise operations
	let halfs = sim.alloc(AllocLayout::Auto, 4, DataType::Fp16).expect("Unable to allocate");
	sim.xor(halfs, halfs, halfs).expect("Unable to xor");
	assert!(matches!(sim.add(halfs, halfs, halfs), Err(PimError::Unsupported(_))));
}

#[test]
fn operand_checks() {
	let mut sim = common::sim(DeviceKind::BitsimdV);
	let ints = sim.alloc(AllocLayout::Auto, 10, DataType::Int32).expect("Unable to allocate");
	let shorter = sim.alloc(AllocLayout::Auto, 9, DataType::Int32).expect("Unable to allocate");
	let longs = sim.alloc_associated(ints, DataType::Int64).expect("Unable to allocate");
	let bools = sim.alloc_associated(ints, DataType::Bool).expect("Unable to allocate");

	assert!(matches!(
		sim.add(ints, shorter, ints),
		Err(PimError::SizeMismatch { expected: 10, found: 9 })
	));
	assert!(matches!(sim.add(ints, longs, ints), Err(PimError::TypeMismatch { .. })));
	assert!(matches!(sim.gt(ints, ints, ints), Err(PimError::TypeMismatch { .. })));
	assert!(matches!(sim.add(ints, ints, bools), Err(PimError::TypeMismatch { .. })));

	// Booleans may be accumulated into integers
	sim.copy_host_to_device(&[true; 10], bools, 0..0).expect("Unable to copy");
	sim.add(ints, bools, ints).expect("Unable to add");
	sim.add(ints, bools, ints).expect("Unable to add");
	sim.sub(ints, bools, ints).expect("Unable to subtract");
	assert_eq!(download::<i32>(&mut sim, ints, 10), [1; 10]);

	assert!(sim.stats().cmd("gt").is_none());
}

#[test]
fn unary_ops() {
	let mut sim = common::sim(DeviceKind::Fulcrum);
	let values = [-5_i32, 0, 7, i32::MIN, i32::MAX, -1];
	let src = upload_i32(&mut sim, &values);
	let dest = sim.alloc_associated(src, DataType::Int32).expect("Unable to allocate");
	let counts = sim.alloc_associated(src, DataType::UInt8).expect("Unable to allocate");

	sim.abs(src, dest).expect("Unable to abs");
	assert_eq!(download::<i32>(&mut sim, dest, 6), values.map(i32::wrapping_abs));

	sim.not(src, dest).expect("Unable to not");
	assert_eq!(download::<i32>(&mut sim, dest, 6), values.map(|value| !value));

	sim.popcount(src, counts).expect("Unable to count bits");
	assert_eq!(download::<u8>(&mut sim, counts, 6), values.map(|value| value.count_ones() as u8));

	sim.shift_bits_left(src, dest, 3).expect("Unable to shift");
	assert_eq!(download::<i32>(&mut sim, dest, 6), values.map(|value| value << 3));

	sim.shift_bits_right(src, dest, 3).expect("Unable to shift");
	assert_eq!(download::<i32>(&mut sim, dest, 6), values.map(|value| value >> 3));

	let unsigned = sim.alloc_associated(src, DataType::UInt32).expect("Unable to allocate");
	sim.copy_host_to_device(&values.map(|value| value as u32), unsigned, 0..0)
		.expect("Unable to copy");
	sim.shift_bits_right(unsigned, unsigned, 3).expect("Unable to shift");
	assert_eq!(
		download::<u32>(&mut sim, unsigned, 6),
		values.map(|value| (value as u32) >> 3)
	);
}

#[test]
fn full_width_bit_shifts() {
	let mut sim = common::sim(DeviceKind::BitsimdV);
	let values = [u64::MAX, 1 << 63, 1, 0x8000_0000_0000_0001];
	let unsigned = sim.alloc(AllocLayout::Auto, 4, DataType::UInt64).expect("Unable to allocate");
	let signed = sim.alloc_associated(unsigned, DataType::Int64).expect("Unable to allocate");
	let dest = sim.alloc_associated(unsigned, DataType::UInt64).expect("Unable to allocate");
	let signed_dest = sim.alloc_associated(unsigned, DataType::Int64).expect("Unable to allocate");
	sim.copy_host_to_device(&values, unsigned, 0..0).expect("Unable to copy");
	sim.copy_host_to_device(&values.map(|value| value as i64), signed, 0..0)
		.expect("Unable to copy");

	for amount in [64, 65, 200] {
		sim.shift_bits_right(unsigned, dest, amount).expect("Unable to shift");
		assert_eq!(download::<u64>(&mut sim, dest, 4), [0; 4], "Shifting right by {amount}");

		sim.shift_bits_left(unsigned, dest, amount).expect("Unable to shift");
		assert_eq!(download::<u64>(&mut sim, dest, 4), [0; 4], "Shifting left by {amount}");

		sim.shift_bits_right(signed, signed_dest, amount).expect("Unable to shift");
		assert_eq!(download::<i64>(&mut sim, signed_dest, 4), [-1, -1, 0, -1], "Shifting right by {amount}");
	}

	sim.shift_bits_right(unsigned, dest, 63).expect("Unable to shift");
	assert_eq!(download::<u64>(&mut sim, dest, 4), [1, 1, 0, 1]);
}

#[test]
fn prefix_sums() {
	for kind in [DeviceKind::Fulcrum, DeviceKind::BankLevel, DeviceKind::Aquabolt] {
		let mut sim = common::sim(kind);
		let values = (1..=100).collect::<Vec<i32>>();
		let src = upload_i32(&mut sim, &values);
		let dest = sim.alloc_associated(src, DataType::Int32).expect("Unable to allocate");

		sim.prefix_sum(src, dest).expect("Unable to compute prefix sum");
		let expected = values
			.iter()
			.scan(0, |sum, &value| {
				*sum += value;
				Some(*sum)
			})
			.collect::<Vec<_>>();
		assert_eq!(download::<i32>(&mut sim, dest, 100), expected);
	}

	let mut sim = common::sim(DeviceKind::BitsimdV);
	let src = upload_i32(&mut sim, &[1, 2, 3]);
	assert!(matches!(sim.prefix_sum(src, src), Err(PimError::Unmodeled { .. })));
}

#[test]
fn bit_slices() {
	let mut sim = common::sim(DeviceKind::Simdram);
	let values = [0b1010_u16, 0b0110, 0xffff, 0];
	let src = sim.alloc(AllocLayout::Auto, 4, DataType::UInt16).expect("Unable to allocate");
	let bits = sim.alloc_associated(src, DataType::Bool).expect("Unable to allocate");
	sim.copy_host_to_device(&values, src, 0..0).expect("Unable to copy");

	sim.bit_slice_extract(src, bits, 1).expect("Unable to extract");
	assert_eq!(download::<bool>(&mut sim, bits, 4), [true, true, true, false]);

	sim.bit_slice_insert(bits, src, 15).expect("Unable to insert");
	assert_eq!(download::<u16>(&mut sim, src, 4), [0x800a, 0x8006, 0xffff, 0]);

	assert!(matches!(sim.bit_slice_extract(src, bits, 16), Err(PimError::InvalidArgument(_))));
}

#[test]
fn conditionals() {
	for kind in [DeviceKind::BitsimdV, DeviceKind::Fulcrum] {
		let mut sim = common::sim(kind);
		let cond = [true, false, true, false, false];
		let cond_obj = sim.alloc(AllocLayout::Auto, 5, DataType::Bool).expect("Unable to allocate");
		let src1 = sim.alloc_associated(cond_obj, DataType::Int32).expect("Unable to allocate");
		let src2 = sim.alloc_associated(cond_obj, DataType::Int32).expect("Unable to allocate");
		let dest = sim.alloc_associated(cond_obj, DataType::Int32).expect("Unable to allocate");
		sim.copy_host_to_device(&cond, cond_obj, 0..0).expect("Unable to copy");
		sim.copy_host_to_device(&[1_i32, 2, 3, 4, 5], src1, 0..0).expect("Unable to copy");
		sim.copy_host_to_device(&[-1_i32, -2, -3, -4, -5], src2, 0..0)
			.expect("Unable to copy");

		let reset = |sim: &mut Simulator| sim.broadcast_int(dest, 9).expect("Unable to broadcast");

		reset(&mut sim);
		sim.cond_copy(cond_obj, src1, dest).expect("Unable to copy");
		assert_eq!(download::<i32>(&mut sim, dest, 5), [1, 9, 3, 9, 9]);

		reset(&mut sim);
		sim.cond_broadcast(cond_obj, (-7_i32) as u64, dest).expect("Unable to broadcast");
		assert_eq!(download::<i32>(&mut sim, dest, 5), [-7, 9, -7, 9, 9]);

		reset(&mut sim);
		sim.cond_select(cond_obj, src1, src2, dest).expect("Unable to select");
		assert_eq!(download::<i32>(&mut sim, dest, 5), [1, -2, 3, -4, -5]);

		reset(&mut sim);
		sim.cond_select_scalar(cond_obj, src1, 0, dest).expect("Unable to select");
		assert_eq!(download::<i32>(&mut sim, dest, 5), [1, 0, 3, 0, 0]);

		assert!(matches!(sim.cond_copy(src1, src2, dest), Err(PimError::TypeMismatch { .. })));
	}
}

#[test]
fn broadcasts() {
	let mut sim = common::sim(DeviceKind::BankLevel);
	let ints = sim.alloc(AllocLayout::Auto, 70, DataType::Int16).expect("Unable to allocate");
	let bytes = sim.alloc_associated(ints, DataType::UInt8).expect("Unable to allocate");
	let floats = sim.alloc_associated(ints, DataType::Fp32).expect("Unable to allocate");

	sim.broadcast_int(ints, -1234).expect("Unable to broadcast");
	assert_eq!(download::<i16>(&mut sim, ints, 70), [-1234; 70]);

	sim.broadcast_uint(bytes, 300).expect("Unable to broadcast");
	assert_eq!(download::<u8>(&mut sim, bytes, 70), [44; 70]);

	sim.broadcast_fp(floats, 2.5).expect("Unable to broadcast");
	assert_eq!(download::<f32>(&mut sim, floats, 70), [2.5; 70]);

	assert!(matches!(sim.broadcast_int(floats, 1), Err(PimError::TypeMismatch { .. })));
	assert!(matches!(sim.broadcast_fp(ints, 1.0), Err(PimError::TypeMismatch { .. })));
}

#[test]
fn element_moves() {
	let mut sim = common::sim(DeviceKind::BitsimdV);
	let obj = upload_i32(&mut sim, &[1, 2, 3, 4, 5]);

	sim.rotate_elements_right(obj).expect("Unable to rotate");
	assert_eq!(download::<i32>(&mut sim, obj, 5), [5, 1, 2, 3, 4]);

	sim.rotate_elements_left(obj).expect("Unable to rotate");
	assert_eq!(download::<i32>(&mut sim, obj, 5), [1, 2, 3, 4, 5]);

	sim.shift_elements_right(obj).expect("Unable to shift");
	assert_eq!(download::<i32>(&mut sim, obj, 5), [0, 1, 2, 3, 4]);

	sim.shift_elements_left(obj).expect("Unable to shift");
	sim.shift_elements_left(obj).expect("Unable to shift");
	assert_eq!(download::<i32>(&mut sim, obj, 5), [2, 3, 4, 0, 0]);
}

#[test]
fn aes_sboxes() {
	let lut = (0..=255_u8).map(|byte| byte.wrapping_mul(7).wrapping_add(3)).collect::<Vec<_>>();
	let mut inverse_lut = vec![0; 256];
	for (byte, &substituted) in lut.iter().enumerate() {
		inverse_lut[usize::from(substituted)] = byte as u8;
	}

	let mut sim = common::sim(DeviceKind::BitsimdV);
	let values = (0..=255_u8).rev().collect::<Vec<_>>();
	let src = sim.alloc(AllocLayout::Auto, 256, DataType::UInt8).expect("Unable to allocate");
	let dest = sim.alloc_associated(src, DataType::UInt8).expect("Unable to allocate");
	sim.copy_host_to_device(&values, src, 0..0).expect("Unable to copy");

	sim.aes_sbox(src, dest, &lut).expect("Unable to substitute");
	let substituted = download::<u8>(&mut sim, dest, 256);
	assert_eq!(
		substituted,
		values.iter().map(|&byte| lut[usize::from(byte)]).collect::<Vec<_>>()
	);

	sim.aes_inverse_sbox(dest, dest, &inverse_lut).expect("Unable to substitute");
	assert_eq!(download::<u8>(&mut sim, dest, 256), values);

	assert!(matches!(sim.aes_sbox(src, dest, &lut[..255]), Err(PimError::InvalidArgument(_))));
	let ints = upload_i32(&mut sim, &[1, 2]);
	assert!(matches!(sim.aes_sbox(ints, ints, &lut), Err(PimError::TypeMismatch { .. })));
}
