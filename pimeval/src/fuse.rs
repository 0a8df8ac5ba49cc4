//! Operation fusion

// Imports
use {
	crate::{
		error::{PimError, PimResult},
		sim::Simulator,
	},
	std::fmt,
};

/// A bound operation call
type Call = Box<dyn FnOnce(&mut Simulator) -> PimResult<()>>;

/// Program of operations run as a single unit
#[derive(Default)]
pub struct PimProg {
	/// All calls, in order
	calls: Vec<Call>,
}

impl PimProg {
	/// Creates an empty program
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a call to the end of this program
	pub fn add(&mut self, call: impl FnOnce(&mut Simulator) -> PimResult<()> + 'static) {
		self.calls.push(Box::new(call));
	}

	/// Returns the number of calls
	pub fn len(&self) -> usize {
		self.calls.len()
	}

	/// Returns if there are no calls
	pub fn is_empty(&self) -> bool {
		self.calls.is_empty()
	}
}

impl fmt::Debug for PimProg {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PimProg").field("calls", &self.calls.len()).finish()
	}
}

impl Simulator {
	/// Runs every call of `prog` in order, stopping at the first failure.
	///
	/// Each call is attributed to the statistics as if run on it's own, and
	/// the whole program is recorded as a single fused batch once all calls succeed.
	pub fn fuse(&mut self, prog: PimProg) -> PimResult<()> {
		self.device()?;

		let num_calls = prog.len();
		for (call_idx, call) in prog.calls.into_iter().enumerate() {
			if let Err(err) = call(self) {
				tracing::debug!(call_idx, num_calls, ?err, "Fused call failed, skipping the rest");
				return Err(err);
			}
		}

		tracing::trace!(num_calls, "Ran fused program");
		self.record_fused();

		Ok(())
	}
}
