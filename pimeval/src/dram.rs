//! DRAM protocol parameters
//!
//! Each protocol family has a fixed set of timing and current constants.
//! Config files select a family through the `protocol` key and may override
//! individual constants.

// Imports
use {
	crate::config::Params,
	anyhow::Context,
	std::{fmt, path::Path},
};

/// Memory protocol family
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum Protocol {
	Ddr,
	Lpddr,
	Hbm,
	Gddr,
}

impl Protocol {
	/// Protocol names accepted by the `protocol` config key, with their family
	pub const NAMES: [(&'static str, Self); 10] = [
		("DDR3", Self::Ddr),
		("DDR4", Self::Ddr),
		("DDR5", Self::Ddr),
		("LPDDR3", Self::Lpddr),
		("LPDDR4", Self::Lpddr),
		("HBM", Self::Hbm),
		("HBM2", Self::Hbm),
		("GDDR5", Self::Gddr),
		("GDDR5X", Self::Gddr),
		("GDDR6", Self::Gddr),
	];

	/// Looks up a protocol family by its (case-sensitive) name
	pub fn from_name(name: &str) -> Option<Self> {
		Self::NAMES
			.iter()
			.find(|&&(protocol_name, _)| protocol_name == name)
			.map(|&(_, protocol)| protocol)
	}

	/// Returns the canonical name for this family
	pub const fn default_name(self) -> &'static str {
		match self {
			Self::Ddr => "DDR4",
			Self::Lpddr => "LPDDR4",
			Self::Hbm => "HBM2",
			Self::Gddr => "GDDR6",
		}
	}

	/// Returns the base timing for this family
	pub const fn timing(self) -> DramTiming {
		match self {
			// DDR4-3200, x16 8Gb
			Self::Ddr => DramTiming {
				t_ck_ns:        0.625,
				t_cl:           22,
				t_rcd:          22,
				t_rp:           22,
				t_ras:          52,
				t_wr:           24,
				t_ccd_s:        4,
				t_ccd_l:        8,
				t_refi:         12480,
				t_rfc:          560,
				burst_length:   8,
				bus_width_bits: 64,
				vdd:            1.2,
				idd0:           57.0,
				idd2n:          37.0,
				idd3n:          52.0,
				idd4r:          168.0,
				idd4w:          150.0,
				idd5b:          250.0,
			},
			// LPDDR4-3200
			Self::Lpddr => DramTiming {
				t_ck_ns:        0.625,
				t_cl:           28,
				t_rcd:          29,
				t_rp:           34,
				t_ras:          68,
				t_wr:           29,
				t_ccd_s:        8,
				t_ccd_l:        8,
				t_refi:         6248,
				t_rfc:          448,
				burst_length:   16,
				bus_width_bits: 32,
				vdd:            1.1,
				idd0:           60.0,
				idd2n:          30.0,
				idd3n:          45.0,
				idd4r:          280.0,
				idd4w:          250.0,
				idd5b:          200.0,
			},
			// HBM2, 1GHz
			Self::Hbm => DramTiming {
				t_ck_ns:        1.0,
				t_cl:           14,
				t_rcd:          14,
				t_rp:           14,
				t_ras:          33,
				t_wr:           16,
				t_ccd_s:        2,
				t_ccd_l:        4,
				t_refi:         3900,
				t_rfc:          260,
				burst_length:   4,
				bus_width_bits: 128,
				vdd:            1.2,
				idd0:           65.0,
				idd2n:          28.0,
				idd3n:          40.0,
				idd4r:          150.0,
				idd4w:          130.0,
				idd5b:          220.0,
			},
			// GDDR6, 1.75GHz command clock
			Self::Gddr => DramTiming {
				t_ck_ns:        0.571,
				t_cl:           24,
				t_rcd:          26,
				t_rp:           26,
				t_ras:          56,
				t_wr:           28,
				t_ccd_s:        2,
				t_ccd_l:        3,
				t_refi:         3327,
				t_rfc:          210,
				burst_length:   16,
				bus_width_bits: 32,
				vdd:            1.35,
				idd0:           120.0,
				idd2n:          70.0,
				idd3n:          90.0,
				idd4r:          400.0,
				idd4w:          380.0,
				idd5b:          300.0,
			},
		}
	}
}

impl fmt::Display for Protocol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.pad(self.default_name())
	}
}

/// DRAM timing and current constants.
///
/// Timings are in clock cycles unless noted, currents in mA.
#[derive(PartialEq, Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct DramTiming {
	/// Clock period (ns)
	pub t_ck_ns: f64,

	pub t_cl:    u32,
	pub t_rcd:   u32,
	pub t_rp:    u32,
	pub t_ras:   u32,
	pub t_wr:    u32,
	pub t_ccd_s: u32,
	pub t_ccd_l: u32,

	/// Refresh interval
	pub t_refi: u32,

	/// Refresh cycle time
	pub t_rfc: u32,

	pub burst_length: u32,

	/// Data bus width of a rank
	pub bus_width_bits: u32,

	/// Supply voltage (V)
	pub vdd: f64,

	pub idd0:  f64,
	pub idd2n: f64,
	pub idd3n: f64,
	pub idd4r: f64,
	pub idd4w: f64,
	pub idd5b: f64,
}

/// DRAM parameters
#[derive(PartialEq, Clone, Debug)]
pub struct DramParams {
	/// Protocol family
	protocol: Protocol,

	/// Protocol name, as selected
	name: String,

	/// Timing constants
	timing: DramTiming,
}

impl DramParams {
	/// Creates the default parameters for `protocol`
	pub fn new(protocol: Protocol) -> Self {
		Self {
			protocol,
			name: protocol.default_name().to_owned(),
			timing: protocol.timing(),
		}
	}

	/// Creates parameters from config params.
	///
	/// # Errors
	/// Returns an error if the `protocol` key is missing or unknown, or if any
	/// timing override can't be parsed.
	pub fn from_params(params: &Params) -> Result<Self, anyhow::Error> {
		let name = params.get("protocol").context("Missing DRAM protocol parameter")?;
		let protocol = Protocol::from_name(name).with_context(|| format!("Unknown protocol: {name:?}"))?;

		let mut timing = protocol.timing();
		self::apply_overrides(&mut timing, params)?;
		tracing::debug!(?protocol, ?name, ?timing, "Created DRAM parameters");

		Ok(Self {
			protocol,
			name: name.to_owned(),
			timing,
		})
	}

	/// Creates parameters from a config file
	pub fn from_config_file(path: &Path) -> Result<Self, anyhow::Error> {
		let params = Params::from_file(path)?;
		Self::from_params(&params).with_context(|| format!("Invalid DRAM config file {path:?}"))
	}

	/// Returns the protocol family
	pub fn protocol(&self) -> Protocol {
		self.protocol
	}

	/// Returns the protocol name
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the timing constants
	pub fn timing(&self) -> &DramTiming {
		&self.timing
	}

	/// Converts cycles to nanoseconds
	fn cycles_ns(&self, cycles: u32) -> f64 {
		f64::from(cycles) * self.timing.t_ck_ns
	}

	/// Latency of reading a row into the sense amplifiers and restoring it (ns)
	pub fn ns_row_read(&self) -> f64 {
		self.cycles_ns(self.timing.t_ras + self.timing.t_rp)
	}

	/// Latency of writing a row from the sense amplifiers (ns)
	pub fn ns_row_write(&self) -> f64 {
		self.cycles_ns(self.timing.t_rcd + self.timing.t_wr + self.timing.t_rp)
	}

	/// Latency of a logic operation on the row buffer (ns)
	pub fn ns_logic(&self) -> f64 {
		self.cycles_ns(self.timing.t_ccd_s)
	}

	/// Latency of a column access on the same bank group (ns)
	pub fn ns_ccd_l(&self) -> f64 {
		self.cycles_ns(self.timing.t_ccd_l)
	}

	/// Refresh interval (ns)
	pub fn ns_refresh_interval(&self) -> f64 {
		self.cycles_ns(self.timing.t_refi)
	}

	/// Duration of one refresh (ns)
	pub fn ns_refresh(&self) -> f64 {
		self.cycles_ns(self.timing.t_rfc)
	}

	/// Energy of one activate + precharge pair (pJ)
	pub fn pj_act_pre(&self) -> f64 {
		let t = &self.timing;
		let active = t.idd0 * f64::from(t.t_ras + t.t_rp);
		let background = t.idd3n * f64::from(t.t_ras) + t.idd2n * f64::from(t.t_rp);
		t.vdd * (active - background).max(0.0) * t.t_ck_ns
	}

	/// Energy of one read burst (pJ)
	pub fn pj_read(&self) -> f64 {
		let t = &self.timing;
		t.vdd * (t.idd4r - t.idd3n) * f64::from(t.burst_length / 2) * t.t_ck_ns
	}

	/// Energy of one write burst (pJ)
	pub fn pj_write(&self) -> f64 {
		let t = &self.timing;
		t.vdd * (t.idd4w - t.idd3n) * f64::from(t.burst_length / 2) * t.t_ck_ns
	}

	/// Energy of one logic operation on the row buffer (pJ)
	pub fn pj_logic(&self) -> f64 {
		let t = &self.timing;
		t.vdd * (t.idd4r - t.idd3n) * f64::from(t.t_ccd_s) * t.t_ck_ns
	}

	/// Energy of one refresh (pJ)
	pub fn pj_refresh(&self) -> f64 {
		let t = &self.timing;
		t.vdd * (t.idd5b - t.idd3n) * f64::from(t.t_rfc) * t.t_ck_ns
	}

	/// Active standby power (mW)
	pub fn mw_background(&self) -> f64 {
		self.timing.vdd * self.timing.idd3n
	}

	/// Bytes transferred per burst on a rank's bus
	pub fn bytes_per_burst(&self) -> f64 {
		f64::from(self.timing.bus_width_bits / 8 * self.timing.burst_length)
	}

	/// Peak bandwidth of a rank's bus (bytes per ns)
	pub fn rank_bytes_per_ns(&self) -> f64 {
		// Note: Double data rate, two transfers per clock
		f64::from(self.timing.bus_width_bits) / 8.0 * 2.0 / self.timing.t_ck_ns
	}
}

impl Default for DramParams {
	fn default() -> Self {
		Self::new(Protocol::Ddr)
	}
}

/// Applies any timing overrides in `params` to `timing`
fn apply_overrides(timing: &mut DramTiming, params: &Params) -> Result<(), anyhow::Error> {
	let cycles = [
		("tCL", &mut timing.t_cl),
		("tRCD", &mut timing.t_rcd),
		("tRP", &mut timing.t_rp),
		("tRAS", &mut timing.t_ras),
		("tWR", &mut timing.t_wr),
		("tCCD_S", &mut timing.t_ccd_s),
		("tCCD_L", &mut timing.t_ccd_l),
		("tREFI", &mut timing.t_refi),
		("tRFC", &mut timing.t_rfc),
		("BL", &mut timing.burst_length),
	];
	for (key, field) in cycles {
		if let Some(value) = params.parse_value::<u32>(key)? {
			*field = value;
		}
	}

	let reals = [
		("tCK", &mut timing.t_ck_ns),
		("VDD", &mut timing.vdd),
		("IDD0", &mut timing.idd0),
		("IDD2N", &mut timing.idd2n),
		("IDD3N", &mut timing.idd3n),
		("IDD4R", &mut timing.idd4r),
		("IDD4W", &mut timing.idd4w),
		("IDD5B", &mut timing.idd5b),
	];
	for (key, field) in reals {
		if let Some(value) = params.parse_value::<f64>(key)? {
			anyhow::ensure!(value.is_finite() && value >= 0.0, "Invalid value for {key:?}: {value}");
			*field = value;
		}
	}

	anyhow::ensure!(timing.t_ck_ns > 0.0, "Clock period must be positive");

	Ok(())
}
