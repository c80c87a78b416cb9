use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use clap::Parser;
use owo_colors::OwoColorize;
use scaffold_cli::Commands;
use scaffold_cli::OutputFormat;
use scaffold_cli::ProcessArgs;
use scaffold_cli::ScaffoldCli;
use scaffold_core::AnyEmptyResult;
use scaffold_core::Processor;
use scaffold_core::RunOptions;
use scaffold_core::RunReport;
use scaffold_core::ScaffoldConfig;
use scaffold_core::ScaffoldError;
use scaffold_core::TextEncoding;
use tracing_subscriber::EnvFilter;

static USE_COLOR: AtomicBool = AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = ScaffoldCli::parse();

	// Respect NO_COLOR env var, --no-color and terminals without color.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stdout).is_some();
	if !use_color {
		USE_COLOR.store(false, Ordering::Relaxed);
	}

	let default_level = if args.verbose { "debug" } else { "warn" };
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
		)
		.with_writer(io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Process(process_args)) => run_process(process_args, args.verbose),
		Some(Commands::Tokens { config, format }) => run_tokens(config, *format),
		None => {
			eprintln!("No subcommand specified. Run `scaffold --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Render through miette for error codes and help text.
		match e.downcast::<ScaffoldError>() {
			Ok(scaffold_err) => {
				let report: miette::Report = (*scaffold_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

fn run_process(args: &ProcessArgs, verbose: bool) -> AnyEmptyResult {
	let config = ScaffoldConfig::load(&args.config)?;
	let processor = Processor::from_config(&config)?;
	let input = args
		.input
		.as_deref()
		.filter(|path| *path != Path::new("-"));

	let include_root = args
		.include_root
		.clone()
		.or_else(|| input.and_then(Path::parent).map(Path::to_path_buf))
		.unwrap_or_else(|| PathBuf::from("."));
	let mut cx = config.run_context().with_include_root(include_root);

	for (name, value) in &args.flags {
		cx.flags.set(name.as_str(), *value);
	}

	for (name, value) in &args.variables {
		cx.variables.insert(name.clone(), value.clone());
	}

	let mut options = RunOptions::default();
	if let Some(buffer_size) = args.buffer_size.or(config.buffer_size) {
		options = options.with_buffer_size(buffer_size);
	}
	if let Some(flush_threshold) = config.flush_threshold {
		options = options.with_flush_threshold(flush_threshold);
	}
	if let Some(input) = input {
		options = options.with_file(input);
	}

	let output = args.output.as_deref();
	let report = match (input, output) {
		(Some(input), Some(output)) => processor.process_file(input, output, &mut cx, &options)?,
		(Some(input), None) => {
			processor.run_to_writer(File::open(input)?, io::stdout().lock(), &mut cx, &options)?
		}
		(None, Some(output)) => {
			let target = OpenOptions::new()
				.read(true)
				.write(true)
				.create(true)
				.truncate(true)
				.open(output)?;
			processor.run_with_options(io::stdin().lock(), target, &mut cx, &options)?
		}
		(None, None) => {
			processor.run_to_writer(io::stdin().lock(), io::stdout().lock(), &mut cx, &options)?
		}
	};

	if verbose {
		print_report_summary(&report);
	}

	let Some(output) = output else {
		return Ok(());
	};

	let status = if report.modified {
		colored!("updated", green)
	} else {
		colored!("unchanged", yellow)
	};
	println!("{status} {}", output.display());

	if args.report {
		println!("{}", serde_json::to_string_pretty(&report)?);
	}

	Ok(())
}

/// Details of a run on stderr, so stdout stays usable as the output stream.
fn print_report_summary(report: &RunReport) {
	eprintln!(
		"{} encoding {}, {}",
		colored!("processed:", bold),
		report.encoding,
		if report.modified { "modified" } else { "unchanged" }
	);

	for tracked in &report.tracked {
		eprintln!(
			"  {} source byte {} -> target byte {}",
			tracked.token, tracked.source_offset, tracked.target_offset
		);
	}
}

fn run_tokens(config: &Path, format: OutputFormat) -> AnyEmptyResult {
	let config = ScaffoldConfig::load(config)?;
	let processor = Processor::from_config(&config)?;
	let tokens = processor.tokens(TextEncoding::Utf8)?;

	match format {
		OutputFormat::Text => {
			if tokens.is_empty() {
				println!("No tokens configured.");
			}

			for (operation, token) in &tokens {
				let label = format!("{operation:<20}");
				println!("{} {token}", colored!(label, bold));
			}
		}
		OutputFormat::Json => {
			let entries: Vec<serde_json::Value> = tokens
				.iter()
				.map(|(operation, token)| {
					serde_json::json!({
						"operation": operation,
						"token": token.to_string(),
					})
				})
				.collect();
			println!("{}", serde_json::to_string_pretty(&entries)?);
		}
	}

	Ok(())
}
