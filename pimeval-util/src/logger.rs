//! Logger

// Imports
use {
	std::{
		fs,
		io,
		path::Path,
		sync::{Mutex, OnceLock},
	},
	tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter},
};

/// Initializes the logger.
///
/// Logs to stderr, filtered by `RUST_LOG` (`info` by default), and,
/// if `log_file` is given, to that file, filtered by `RUST_LOG_FILE` (`debug` by default).
///
/// Any messages logged through [`pre_init`] are emitted once the logger is up.
/// Calling this more than once is a no-op for the subsequent calls.
pub fn init(log_file: Option<&Path>, log_file_append: bool) {
	static INITIALIZED: OnceLock<()> = OnceLock::new();
	if INITIALIZED.set(()).is_err() {
		return;
	}

	let term_layer = fmt::layer()
		.with_writer(io::stderr)
		.with_filter(self::env_filter("RUST_LOG", LevelFilter::INFO));

	// Open the log file, if any
	let file = log_file.and_then(|path| {
		let file = fs::OpenOptions::new()
			.create(true)
			.write(true)
			.append(log_file_append)
			.truncate(!log_file_append)
			.open(path);
		match file {
			Ok(file) => Some(file),
			Err(err) => {
				pre_init::warn(format!("Unable to open log file {path:?}: {err}"));
				None
			},
		}
	});
	let file_layer = file.map(|file| {
		fmt::layer()
			.with_ansi(false)
			.with_writer(Mutex::new(file))
			.with_filter(self::env_filter("RUST_LOG_FILE", LevelFilter::DEBUG))
	});

	// Note: If someone else already set a global subscriber (e.g. tests), we just keep theirs
	if tracing_subscriber::registry()
		.with(term_layer)
		.with(file_layer)
		.try_init()
		.is_err()
	{
		pre_init::warn("A global logger was already set".to_owned());
	}

	pre_init::flush();
}

/// Creates an env filter from `var`, falling back to `default`
fn env_filter(var: &str, default: LevelFilter) -> EnvFilter {
	EnvFilter::builder()
		.with_default_directive(default.into())
		.with_env_var(var)
		.from_env_lossy()
}

/// Pre-initialization logging.
///
/// Messages are buffered until [`init`] is called.
pub mod pre_init {
	// Imports
	use std::sync::Mutex;

	/// Buffered messages
	static MESSAGES: Mutex<Vec<(Level, String)>> = Mutex::new(vec![]);

	/// Message level
	#[derive(Clone, Copy, Debug)]
	enum Level {
		Debug,
		Warn,
	}

	/// Buffers a debug message
	pub fn debug(msg: String) {
		self::push(Level::Debug, msg);
	}

	/// Buffers a warning message
	pub fn warn(msg: String) {
		self::push(Level::Warn, msg);
	}

	fn push(level: Level, msg: String) {
		MESSAGES.lock().unwrap_or_else(|err| err.into_inner()).push((level, msg));
	}

	/// Emits all buffered messages
	pub(super) fn flush() {
		let messages = std::mem::take(&mut *MESSAGES.lock().unwrap_or_else(|err| err.into_inner()));
		for (level, msg) in messages {
			match level {
				Level::Debug => tracing::debug!("{msg}"),
				Level::Warn => tracing::warn!("{msg}"),
			}
		}
	}
}
