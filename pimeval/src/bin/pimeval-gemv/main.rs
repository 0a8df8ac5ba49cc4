//! Matrix-vector product on a PIM device (`pimeval-gemv`)
//!
//! Computes `y = M x` by accumulating every column of `M`, scaled by the
//! matching element of `x`, into `y`.

// Modules
mod args;

// Imports
use {
	self::args::Args,
	anyhow::Context,
	clap::Parser,
	pimeval::{AllocLayout, DataType, DeviceProperties, Simulator, StatsSnapshot, Topology},
	pimeval_util::logger,
	std::fs,
};

fn main() -> Result<(), anyhow::Error> {
	// Get arguments
	let args = Args::parse();
	logger::pre_init::debug(format!("Args: {args:?}"));

	// Initialize logging
	logger::init(args.log_file.as_deref(), args.log_file_append);

	let mut sim = Simulator::new();
	match &args.config_file {
		Some(config_file) => sim
			.create_device_from_config(args.device_kind, config_file)
			.context("Unable to create device from config file")?,
		None => sim
			.create_device(args.device_kind, Topology::default())
			.context("Unable to create device")?,
	}

	let (rows, cols) = (args.rows, args.cols);
	let matrix = (0..cols)
		.map(|col| (0..rows).map(|row| self::matrix_value(row, col)).collect::<Vec<_>>())
		.collect::<Vec<_>>();
	let vector = (0..cols).map(self::vector_value).collect::<Vec<_>>();

	sim.start_timer();
	let result = self::gemv(&mut sim, rows, &matrix, &vector).context("Unable to compute gemv")?;
	sim.end_timer();

	if args.verify {
		match sim.is_analysis_mode() {
			true => tracing::warn!("Skipping verification in analysis mode"),
			false => self::verify(&matrix, &vector, &result).context("Verification failed")?,
		}
	}

	sim.show_stats();

	if let Some(output_file) = &args.output_file {
		let output = Output {
			device: sim.device_properties().context("Unable to get device properties")?,
			stats:  sim.stats(),
		};
		let output_file = fs::File::create(output_file).context("Unable to create output file")?;
		serde_json::to_writer_pretty(output_file, &output).context("Unable to write to output file")?;
	}

	Ok(())
}

/// Computes `matrix * vector`, where `matrix` is given by columns
fn gemv(sim: &mut Simulator, rows: u64, matrix: &[Vec<i32>], vector: &[i32]) -> Result<Vec<i32>, anyhow::Error> {
	let column = sim
		.alloc(AllocLayout::Auto, rows, DataType::Int32)
		.context("Unable to allocate column")?;
	let acc = sim
		.alloc_associated(column, DataType::Int32)
		.context("Unable to allocate accumulator")?;
	sim.broadcast_int(acc, 0).context("Unable to zero accumulator")?;

	for (col, (values, &scalar)) in matrix.iter().zip(vector).enumerate() {
		sim.copy_host_to_device(values, column, 0..0)
			.with_context(|| format!("Unable to copy column {col}"))?;
		sim.scaled_add(column, acc, acc, u64::from(scalar as u32))
			.with_context(|| format!("Unable to accumulate column {col}"))?;
	}

	let mut result = vec![0; rows as usize];
	sim.copy_device_to_host(acc, &mut result, 0..0)
		.context("Unable to copy result")?;

	sim.free(column).context("Unable to free column")?;
	sim.free(acc).context("Unable to free accumulator")?;

	Ok(result)
}

/// Verifies `result` against the product computed on the host
fn verify(matrix: &[Vec<i32>], vector: &[i32], result: &[i32]) -> Result<(), anyhow::Error> {
	for (row, &found) in result.iter().enumerate() {
		let expected = matrix
			.iter()
			.zip(vector)
			.fold(0_i32, |acc, (values, &scalar)| acc.wrapping_add(values[row].wrapping_mul(scalar)));
		anyhow::ensure!(found == expected, "Row {row}: expected {expected}, found {found}");
	}

	tracing::info!("Verified {} rows", result.len());
	Ok(())
}

fn matrix_value(row: u64, col: u64) -> i32 {
	((row * 31 + col * 17) % 101) as i32 - 50
}

fn vector_value(col: u64) -> i32 {
	((col * 7) % 11) as i32 - 5
}

/// Output
#[derive(serde::Serialize)]
struct Output {
	device: DeviceProperties,
	stats:  StatsSnapshot,
}
