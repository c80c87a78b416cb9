use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::PathBuf;

use derive_more::Deref;
use derive_more::DerefMut;

use crate::ScaffoldError;
use crate::ScaffoldResult;

/// Named switches shared by every operation of a run.
///
/// Operations with an `id` only act when their flag is set; `set_flag`
/// directives toggle entries while the file is processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut)]
pub struct Flags(
	#[deref]
	#[deref_mut]
	HashMap<String, bool>,
);

impl Flags {
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether the named flag is currently on. Unknown flags are off.
	pub fn is_enabled(&self, name: &str) -> bool {
		self.0.get(name).copied().unwrap_or(false)
	}

	pub fn set(&mut self, name: impl Into<String>, value: bool) {
		self.0.insert(name.into(), value);
	}
}

impl From<HashMap<String, bool>> for Flags {
	fn from(flags: HashMap<String, bool>) -> Self {
		Self(flags)
	}
}

impl<K: Into<String>> FromIterator<(K, bool)> for Flags {
	fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(key, value)| (key.into(), value)).collect())
	}
}

/// Opens the file referenced by an include directive.
pub type FileOpener = dyn FnMut(&str) -> io::Result<Box<dyn Read>>;

/// Caller-owned state for processing one file.
///
/// The same context may be reused for several files; flags changed by one
/// file remain visible to the next.
#[derive(Default)]
pub struct RunContext {
	/// Operation switches, read and written during the run.
	pub flags: Flags,
	/// Values looked up by condition expressions.
	pub variables: HashMap<String, serde_json::Value>,
	opener: Option<Box<FileOpener>>,
}

impl std::fmt::Debug for RunContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RunContext")
			.field("flags", &self.flags)
			.field("variables", &self.variables)
			.field("opener", &self.opener.is_some())
			.finish()
	}
}

impl RunContext {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_flags(mut self, flags: impl Into<Flags>) -> Self {
		self.flags = flags.into();
		self
	}

	#[must_use]
	pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.variables.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn with_variables(mut self, variables: HashMap<String, serde_json::Value>) -> Self {
		self.variables.extend(variables);
		self
	}

	/// Resolve include directives with a custom callback.
	#[must_use]
	pub fn with_file_opener(
		mut self,
		opener: impl FnMut(&str) -> io::Result<Box<dyn Read>> + 'static,
	) -> Self {
		self.opener = Some(Box::new(opener));
		self
	}

	/// Resolve include directives relative to `root` on the file system.
	#[must_use]
	pub fn with_include_root(self, root: impl Into<PathBuf>) -> Self {
		let root = root.into();
		self.with_file_opener(move |path| {
			let file = File::open(root.join(path))?;
			Ok(Box::new(file) as Box<dyn Read>)
		})
	}

	pub(crate) fn open(&mut self, path: &str) -> ScaffoldResult<Box<dyn Read>> {
		let Some(opener) = self.opener.as_mut() else {
			return Err(ScaffoldError::IncludeUnavailable {
				path: path.to_string(),
				reason: "no file opener was provided".to_string(),
			});
		};

		opener(path).map_err(|error| {
			ScaffoldError::IncludeUnavailable {
				path: path.to_string(),
				reason: error.to_string(),
			}
		})
	}
}
