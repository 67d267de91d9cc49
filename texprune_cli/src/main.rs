use std::path::Path;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use texprune_cli::OutputFormat;
use texprune_cli::PruneCli;
use texprune_core::CrawlDiagnostic;
use texprune_core::CrawlReport;
use texprune_core::Crawler;
use texprune_core::DiagnosticKind;
use texprune_core::FileType;
use texprune_core::PruneConfig;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
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
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = PruneCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

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

	init_tracing(args.verbose, use_color);

	if let Err(e) = run(&args) {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<texprune_core::PruneError>() {
			Ok(prune_err) => {
				let report: miette::Report = (*prune_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_directive = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(verbose)
		.without_time()
		.init();
}

fn run(args: &PruneCli) -> Result<(), Box<dyn std::error::Error>> {
	let source_dir = args
		.source
		.parent()
		.filter(|parent| !parent.as_os_str().is_empty())
		.unwrap_or_else(|| Path::new("."));
	let config_path = PruneConfig::resolve_path(source_dir);
	let config = PruneConfig::load(source_dir)?;
	let options = args.crawl_options(config.as_ref());

	let mut crawler = Crawler::new(&args.source, &args.out_dir, options)?;
	crawler.run()?;
	let report = crawler.report();

	match args.format {
		OutputFormat::Json => {
			println!("{}", serde_json::to_string_pretty(&report)?);
		}
		OutputFormat::Text => {
			print_diagnostics(&report.diagnostics);
			print_text_report(&report, config_path.as_deref());
		}
	}

	Ok(())
}

fn print_section(title: &str) {
	println!();
	println!("{}", colored!(title, bold));
}

fn print_field(label: &str, value: impl std::fmt::Display) {
	println!("  {label:<28} {value}");
}

fn print_text_report(report: &CrawlReport, config_path: Option<&Path>) {
	let written = report
		.files
		.iter()
		.filter(|entry| entry.file_type != FileType::Ignore)
		.count();
	let failed = report
		.diagnostics
		.iter()
		.filter(|diagnostic| matches!(diagnostic.kind, DiagnosticKind::ParseFailure { .. }))
		.count();

	println!(
		"{} {} file(s) to {}",
		colored!("Wrote", green),
		written.saturating_sub(failed),
		report.out_dir.display()
	);

	if let Some(config_path) = config_path {
		print_field("Config", config_path.display());
	}

	print_section("Unused files");
	if report.unused_files.is_empty() {
		println!("  (none)");
	}
	for file in &report.unused_files {
		println!("  {}", file.display());
	}

	print_section("Statistics");
	if report.stats.is_empty() {
		println!("  (none)");
	}
	for (name, count) in report.stats.iter() {
		print_field(name, count);
	}
}

fn print_diagnostics(diagnostics: &[CrawlDiagnostic]) {
	for diagnostic in diagnostics {
		let report = diagnostic_to_report(diagnostic);
		eprintln!("{report:?}");
	}
}

/// Convert a `CrawlDiagnostic` into a warning `miette::Report` with an error
/// code and help text for rich terminal display.
fn diagnostic_to_report(diagnostic: &CrawlDiagnostic) -> miette::Report {
	let file = diagnostic.file.display();
	let location = if diagnostic.line == 0 {
		file.to_string()
	} else {
		format!("{file}:{}:{}", diagnostic.line, diagnostic.column)
	};

	let message = format!("[{location}] {}", diagnostic.message());
	let help = match &diagnostic.kind {
		DiagnosticKind::MissingInclude { .. } => {
			"paths are resolved relative to the root document, with `.tex` appended if needed"
		}
		DiagnosticKind::MissingGraphic { .. } => {
			"tried the path as written and with .pdf, .png, .jpg, .jpeg and .eps appended"
		}
		DiagnosticKind::AnomalousArguments { .. } => "the command was left in place and not followed",
		DiagnosticKind::UnresolvedArgument { .. } => {
			"macros in file names are not expanded; use --keep-file to copy the file explicitly"
		}
		DiagnosticKind::ParseFailure { .. } => "the document was skipped and not written to the output",
		DiagnosticKind::RenameSkipped { .. } => "use --clear-out-dir to start from an empty destination",
	};
	let code = match &diagnostic.kind {
		DiagnosticKind::MissingInclude { .. } => "texprune::missing_include",
		DiagnosticKind::MissingGraphic { .. } => "texprune::missing_graphic",
		DiagnosticKind::AnomalousArguments { .. } => "texprune::anomalous_arguments",
		DiagnosticKind::UnresolvedArgument { .. } => "texprune::unresolved_argument",
		DiagnosticKind::ParseFailure { .. } => "texprune::parse_failure",
		DiagnosticKind::RenameSkipped { .. } => "texprune::rename_skipped",
	};

	let diag_value = miette::MietteDiagnostic::new(message)
		.with_code(code)
		.with_help(help)
		.with_severity(miette::Severity::Warning);
	miette::Report::new(diag_value)
}
