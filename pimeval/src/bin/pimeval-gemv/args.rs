//! Arguments

// Imports
use {pimeval::DeviceKind, std::path::PathBuf};

/// Arguments
#[derive(Debug)]
#[derive(clap::Parser)]
pub struct Args {
	/// Log file
	///
	/// Specifies a file to perform verbose logging to.
	/// You can use `RUST_LOG_FILE` to set filtering options
	#[clap(long = "log-file")]
	pub log_file: Option<PathBuf>,

	/// Whether to append to the log file
	#[clap(long = "log-file-append")]
	pub log_file_append: bool,

	/// Matrix rows
	#[clap(long = "rows", default_value_t = 1024)]
	pub rows: u64,

	/// Matrix columns
	#[clap(long = "cols", default_value_t = 256)]
	pub cols: u64,

	/// Device kind
	#[clap(long = "device", default_value = "bitsimd_v", value_parser = self::parse_device_kind)]
	pub device_kind: DeviceKind,

	/// Device config file
	///
	/// Uses the default topology with DDR parameters if not given
	#[clap(long = "config")]
	pub config_file: Option<PathBuf>,

	/// Whether to verify the result against the host
	#[clap(long = "verify")]
	pub verify: bool,

	/// Output file for the statistics, as json
	#[clap(long = "output")]
	pub output_file: Option<PathBuf>,
}

/// Parses a device kind by name
fn parse_device_kind(name: &str) -> Result<DeviceKind, String> {
	DeviceKind::from_name(name).ok_or_else(|| {
		let names = DeviceKind::ALL.map(DeviceKind::name);
		format!("Unknown device kind {name:?}, expected one of {names:?}")
	})
}
