use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Apply streaming template operations to files.",
	long_about = "scaffold runs a list of template operations (replacements, conditional blocks, \
	              regions, includes and flags) over a file in a single streaming pass.\n\nThe \
	              operations are read from a JSON configuration file.\n\nQuick start:\n  scaffold \
	              process -c template.json input.txt -o output.txt\n  scaffold tokens -c \
	              template.json"
)]
pub struct ScaffoldCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Process one file with the configured operations.
	///
	/// Reads the input file (or stdin when it is omitted or `-`) and writes
	/// the result to the output file, or to stdout when no output is given.
	/// Include directives are resolved relative to `--include-root`, which
	/// defaults to the directory of the input file.
	Process(ProcessArgs),
	/// List the tokens the configured operations watch for.
	Tokens {
		/// Path to the JSON operation configuration.
		#[arg(long, short)]
		config: PathBuf,

		/// Output format for the token list.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
}

#[derive(Args)]
pub struct ProcessArgs {
	/// Path to the JSON operation configuration.
	#[arg(long, short)]
	pub config: PathBuf,

	/// File to process. Reads stdin when omitted or `-`.
	pub input: Option<PathBuf>,

	/// Where to write the result. Writes stdout when omitted.
	#[arg(long, short)]
	pub output: Option<PathBuf>,

	/// Set a flag before processing, as `name=true` or `name=false`.
	/// Overrides the configuration.
	#[arg(long = "flag", value_name = "NAME=BOOL", value_parser = parse_flag)]
	pub flags: Vec<(String, bool)>,

	/// Set a condition variable, as `name=value`. The value is read as JSON
	/// when it parses and as a string otherwise.
	#[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_variable)]
	pub variables: Vec<(String, serde_json::Value)>,

	/// Directory include directives are resolved against.
	#[arg(long)]
	pub include_root: Option<PathBuf>,

	/// Size of the read buffer in bytes. Overrides the configuration.
	#[arg(long)]
	pub buffer_size: Option<usize>,

	/// Print the run report as JSON once the output file is written.
	#[arg(long, default_value_t = false)]
	pub report: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// One token per line, labelled with its operation.
	Text,
	/// A JSON array of `{ "operation", "token" }` objects.
	Json,
}

/// Parse `name=true` or `name=false`.
pub fn parse_flag(value: &str) -> Result<(String, bool), String> {
	let (name, flag) = split_assignment(value)?;
	let flag = flag
		.parse::<bool>()
		.map_err(|_| format!("`{flag}` is not `true` or `false`"))?;

	Ok((name, flag))
}

/// Parse `name=value`, reading the value as JSON when possible.
pub fn parse_variable(value: &str) -> Result<(String, serde_json::Value), String> {
	let (name, raw) = split_assignment(value)?;
	let parsed = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));

	Ok((name, parsed))
}

fn split_assignment(value: &str) -> Result<(String, &str), String> {
	match value.split_once('=') {
		Some((name, rest)) if !name.trim().is_empty() => Ok((name.trim().to_string(), rest.trim())),
		_ => Err(format!("expected `name=value`, got `{value}`")),
	}
}
