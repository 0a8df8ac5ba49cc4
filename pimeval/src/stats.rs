//! Statistics

// Imports
use {
	crate::{
		cmd::{CostBasis, Transfer},
		device::Device,
		perf::PerfEnergy,
	},
	average::Estimate,
	itertools::Itertools,
	std::{
		collections::BTreeMap,
		fmt,
		time::{Duration, Instant},
	},
};

/// Statistics
#[derive(Clone, Debug, Default)]
pub struct Statistics {
	/// Per-command statistics, by command name
	cmds: BTreeMap<&'static str, CmdStats>,

	/// Bytes transferred, by direction
	host_to_device_bytes:   u64,
	device_to_host_bytes:   u64,
	device_to_device_bytes: u64,

	/// Number of fused batches executed
	fused_batches: u64,

	/// Start of the running timer, if any
	timer_start: Option<Instant>,

	/// All finished timer spans
	timer_spans: Vec<TimerSpan>,
}

impl Statistics {
	/// Creates new, empty, statistics
	pub fn new() -> Self {
		Self::default()
	}

	/// Records the cost of a command
	pub fn record(&mut self, basis: &CostBasis, cost: PerfEnergy) {
		let stats = self.cmds.entry(basis.kind.name()).or_default();
		stats.count += 1;
		stats.cost.runtime_ms += cost.runtime_ms;
		stats.cost.energy_mj += cost.energy_mj;
		stats.runtime.add(cost.runtime_ms);
		stats.utilization.add(cost.utilization);

		match basis.transfer {
			Some(Transfer::HostToDevice) => self.host_to_device_bytes += basis.bytes,
			Some(Transfer::DeviceToHost) => self.device_to_host_bytes += basis.bytes,
			Some(Transfer::DeviceToDevice) => self.device_to_device_bytes += basis.bytes,
			None => (),
		}
	}

	/// Records a fused batch
	pub fn record_fused(&mut self) {
		self.fused_batches += 1;
	}

	/// Starts the timer
	pub fn start_timer(&mut self) {
		if self.timer_start.is_some() {
			tracing::warn!("Timer started while already running, restarting it");
		}
		self.timer_start = Some(Instant::now());
	}

	/// Ends the timer, modeling the refreshes `device` would perform during the span
	pub fn end_timer(&mut self, device: Option<&Device>) {
		let Some(start) = self.timer_start.take() else {
			tracing::warn!("Timer ended without being started");
			return;
		};

		let span = TimerSpan::new(start.elapsed(), device);
		tracing::debug!(?span, "Ended timer");
		self.timer_spans.push(span);
	}

	/// Returns a snapshot of these statistics
	pub fn snapshot(&self) -> StatsSnapshot {
		let cmds = self
			.cmds
			.iter()
			.map(|(&name, stats)| CmdSnapshot {
				name:             name.to_owned(),
				count:            stats.count,
				runtime_ms:       stats.cost.runtime_ms,
				energy_mj:        stats.cost.energy_mj,
				mean_runtime_ms:  stats.runtime.mean(),
				mean_utilization: stats.utilization.mean(),
			})
			.collect::<Vec<_>>();

		StatsSnapshot {
			total_runtime_ms: cmds.iter().map(|cmd| cmd.runtime_ms).sum(),
			total_energy_mj: cmds.iter().map(|cmd| cmd.energy_mj).sum(),
			cmds,
			host_to_device_bytes: self.host_to_device_bytes,
			device_to_host_bytes: self.device_to_host_bytes,
			device_to_device_bytes: self.device_to_device_bytes,
			fused_batches: self.fused_batches,
			timer_spans: self.timer_spans.clone(),
		}
	}
}

impl fmt::Display for Statistics {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// Note: Start with a newline, since we're a multi-line output
		f.pad("\n")?;

		let snapshot = self.snapshot();
		writeln!(f, "Commands:")?;
		for cmd in snapshot
			.cmds
			.iter()
			.sorted_by(|lhs, rhs| rhs.runtime_ms.total_cmp(&lhs.runtime_ms))
		{
			writeln!(
				f,
				"  {:<24} {:>8} {:>14.6} ms {:>14.6} mJ ({:.2}% utilization)",
				cmd.name,
				cmd.count,
				cmd.runtime_ms,
				cmd.energy_mj,
				100.0 * cmd.mean_utilization
			)?;
		}
		writeln!(
			f,
			"  {:<24} {:>8} {:>14.6} ms {:>14.6} mJ",
			"TOTAL",
			snapshot.cmds.iter().map(|cmd| cmd.count).sum::<u64>(),
			snapshot.total_runtime_ms,
			snapshot.total_energy_mj
		)?;

		writeln!(
			f,
			"Data copy: {} bytes host to device, {} bytes device to host, {} bytes device to device",
			snapshot.host_to_device_bytes, snapshot.device_to_host_bytes, snapshot.device_to_device_bytes
		)?;
		writeln!(f, "Fused batches: {}", snapshot.fused_batches)?;

		if !snapshot.timer_spans.is_empty() {
			let host_ms = snapshot.timer_spans.iter().map(|span| span.host_ms).collect::<average::Variance>();
			let refreshes = snapshot.timer_spans.iter().map(|span| span.refreshes).sum::<u64>();
			let refresh_ms = snapshot.timer_spans.iter().map(|span| span.refresh_ms).sum::<f64>();
			writeln!(
				f,
				"Timer: {} spans of {:.4} ± {:.4} ms, {refreshes} refreshes ({refresh_ms:.6} ms)",
				snapshot.timer_spans.len(),
				host_ms.mean(),
				host_ms.error()
			)?;
		}

		Ok(())
	}
}

/// Statistics of a single command kind
#[derive(Clone, Debug, Default)]
struct CmdStats {
	/// Number of executions
	count: u64,

	/// Total cost
	cost: PerfEnergy,

	/// Runtime of each execution (ms)
	runtime: average::Mean,

	/// Utilization of each execution
	utilization: average::Mean,
}

/// A span between starting and ending the timer
#[derive(PartialEq, Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TimerSpan {
	/// Host time elapsed (ms)
	pub host_ms: f64,

	/// Refreshes the device performs during the span
	pub refreshes: u64,

	/// Time spent refreshing (ms)
	pub refresh_ms: f64,

	/// Energy spent refreshing (mJ)
	pub refresh_mj: f64,
}

impl TimerSpan {
	/// Models the refreshes of `device` during `elapsed`
	pub fn new(elapsed: Duration, device: Option<&Device>) -> Self {
		let host_ns = elapsed.as_secs_f64() * 1e9;
		let (refreshes, refresh_ns, refresh_pj) = match device {
			Some(device) => {
				let dram = device.dram();
				let refreshes = match dram.ns_refresh_interval() {
					interval if interval > 0.0 => (host_ns / interval).floor() as u64,
					_ => 0,
				};
				let num_ranks = f64::from(device.topology().num_ranks);
				(
					refreshes,
					refreshes as f64 * dram.ns_refresh(),
					refreshes as f64 * dram.pj_refresh() * num_ranks,
				)
			},
			None => (0, 0.0, 0.0),
		};

		Self {
			host_ms: host_ns / 1e6,
			refreshes,
			refresh_ms: refresh_ns / 1e6,
			refresh_mj: refresh_pj / 1e9,
		}
	}
}

/// Serializable snapshot of [`Statistics`]
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct StatsSnapshot {
	/// Per-command statistics
	pub cmds: Vec<CmdSnapshot>,

	pub total_runtime_ms: f64,
	pub total_energy_mj:  f64,

	pub host_to_device_bytes:   u64,
	pub device_to_host_bytes:   u64,
	pub device_to_device_bytes: u64,

	pub fused_batches: u64,

	pub timer_spans: Vec<TimerSpan>,
}

impl StatsSnapshot {
	/// Returns the statistics of command `name`, if it ran
	pub fn cmd(&self, name: &str) -> Option<&CmdSnapshot> {
		self.cmds.iter().find(|cmd| cmd.name == name)
	}
}

/// Snapshot of a single command's statistics
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct CmdSnapshot {
	pub name:             String,
	pub count:            u64,
	pub runtime_ms:       f64,
	pub energy_mj:        f64,
	pub mean_runtime_ms:  f64,
	pub mean_utilization: f64,
}
