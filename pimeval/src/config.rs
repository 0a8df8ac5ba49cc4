//! Configuration files
//!
//! Both device and DRAM configuration use plain `key = value` lines.
//! `#` starts a comment, blank lines are ignored and later keys override earlier ones.

// Imports
use {
	anyhow::Context,
	std::{collections::BTreeMap, fs, path::Path, str::FromStr},
};

/// Parsed `key = value` parameters
#[derive(PartialEq, Eq, Clone, Default, Debug)]
pub struct Params {
	/// All parameters, by key
	params: BTreeMap<String, String>,
}

impl Params {
	/// Parses parameters from a string.
	///
	/// # Errors
	/// Returns an error if any non-empty line doesn't contain a `=`, or has an empty key.
	pub fn parse(contents: &str) -> Result<Self, anyhow::Error> {
		let mut params = BTreeMap::new();
		for (line_idx, line) in contents.lines().enumerate() {
			// Strip any comments
			let line = match line.split_once('#') {
				Some((line, _comment)) => line,
				None => line,
			};
			let line = line.trim();
			if line.is_empty() {
				continue;
			}

			let (key, value) = line
				.split_once('=')
				.with_context(|| format!("Line {} is missing a `=`: {line:?}", line_idx + 1))?;
			let key = key.trim();
			anyhow::ensure!(!key.is_empty(), "Line {} has an empty key", line_idx + 1);

			params.insert(key.to_owned(), value.trim().to_owned());
		}

		Ok(Self { params })
	}

	/// Reads and parses parameters from a file
	pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
		let contents = fs::read_to_string(path).with_context(|| format!("Unable to read config file {path:?}"))?;
		Self::parse(&contents).with_context(|| format!("Unable to parse config file {path:?}"))
	}

	/// Returns the raw value of `key`
	pub fn get(&self, key: &str) -> Option<&str> {
		self.params.get(key).map(String::as_str)
	}

	/// Parses the value of `key`, if it exists
	pub fn parse_value<T>(&self, key: &str) -> Result<Option<T>, anyhow::Error>
	where
		T: FromStr,
		T::Err: std::error::Error + Send + Sync + 'static,
	{
		self.get(key)
			.map(|value| {
				value
					.parse::<T>()
					.with_context(|| format!("Invalid value for {key:?}: {value:?}"))
			})
			.transpose()
	}

	/// Parses a boolean value of `key`, if it exists.
	///
	/// Accepts `true`/`false`/`1`/`0`.
	pub fn parse_bool(&self, key: &str) -> Result<Option<bool>, anyhow::Error> {
		self.get(key)
			.map(|value| self::parse_bool(value).with_context(|| format!("Invalid value for {key:?}: {value:?}")))
			.transpose()
	}
}

/// Parses a boolean flag
pub fn parse_bool(value: &str) -> Result<bool, anyhow::Error> {
	match value {
		"1" | "true" => Ok(true),
		"0" | "false" => Ok(false),
		_ => anyhow::bail!("Expected one of `true`, `false`, `1` or `0`"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_lines() {
		let params = Params::parse(
			"# DRAM config\n\
			 protocol = DDR4\n\
			 \n\
			 tCK=0.75 # overridden\n\
			 tCK = 0.625\n",
		)
		.expect("Unable to parse params");

		assert_eq!(params.get("protocol"), Some("DDR4"));
		assert_eq!(params.parse_value::<f64>("tCK").expect("Invalid tCK"), Some(0.625));
		assert_eq!(params.get("tRCD"), None);
	}

	#[test]
	fn malformed_lines() {
		assert!(Params::parse("protocol DDR4").is_err());
		assert!(Params::parse(" = DDR4").is_err());
		assert!(Params::parse("num_ranks = four")
			.expect("Unable to parse params")
			.parse_value::<u32>("num_ranks")
			.is_err());
	}

	#[test]
	fn bools() {
		let params = Params::parse("a = 1\nb = false\nc = maybe").expect("Unable to parse params");
		assert_eq!(params.parse_bool("a").expect("Invalid bool"), Some(true));
		assert_eq!(params.parse_bool("b").expect("Invalid bool"), Some(false));
		assert!(params.parse_bool("c").is_err());
		assert_eq!(params.parse_bool("d").expect("Invalid bool"), None);
	}
}
