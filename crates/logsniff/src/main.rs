use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use logsniff::analyze::{AnalysisPolicy, AnalysisSummary, AnalyzedLine, Analyzer};
use logsniff::conf::LogsniffConfig;
use logsniff::parser::timestamp::format_instant;
use logsniff::parser::{TimestampOutcome, UNKNOWN_FORMAT};
use logsniff::runtime::{build_detector, init_logging};

#[derive(Parser, Debug)]
#[command(
    name = "logsniff",
    version,
    about = "Detect the syslog format of a log file and extract its timestamps"
)]
struct Cli {
    /// Log file to analyze
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Classify every line instead of only the first, then print a summary
    #[arg(long)]
    all_lines: bool,

    /// Print results as JSON, one object per line
    #[arg(long)]
    json: bool,

    /// Configuration file (default: $LOGSNIFF_CONFIG_FILE or /etc/logsniff/logsniff.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also write diagnostics to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too, on stdout
            let code = if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
            let _ = e.print();
            return code;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = LogsniffConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = cli.log_file {
        config.logging.file = Some(path);
    }
    if cli.all_lines {
        config.policy = AnalysisPolicy::AllLines;
    }
    config.validate()?;

    let _guard = init_logging(&config.logging)?;
    info!("logsniff v{} analyzing {}", env!("CARGO_PKG_VERSION"), cli.file.display());
    match &config.source {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let detector = build_detector(&config)?;
    let analysis = Analyzer::new(&detector)
        .strip_ansi(config.strip_ansi)
        .analyze_path(&cli.file, config.policy)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut summary = AnalysisSummary::new();

    for item in analysis {
        let analyzed = item.with_context(|| format!("analyzing {}", cli.file.display()))?;
        summary.record(&analyzed.detection);
        if cli.json {
            serde_json::to_writer(&mut out, &analyzed)?;
            writeln!(out)?;
        } else {
            print_line(&mut out, &analyzed)?;
        }
    }

    if summary.lines == 0 && !cli.json {
        writeln!(out, "No non-empty lines found in {}", cli.file.display())?;
    }

    if config.policy == AnalysisPolicy::AllLines {
        if cli.json {
            serde_json::to_writer(&mut out, &serde_json::json!({ "summary": summary }))?;
            writeln!(out)?;
        } else if summary.lines > 0 {
            print_summary(&mut out, &summary)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn print_line(out: &mut impl Write, analyzed: &AnalyzedLine) -> io::Result<()> {
    let detection = &analyzed.detection;
    writeln!(out, "Detected: {} -> {}", detection.format, analyzed.line)?;

    let Some(raw) = detection.raw_timestamp.as_deref() else {
        return Ok(());
    };
    writeln!(out, "Extracted Timestamp: {}", raw)?;

    match &detection.timestamp {
        TimestampOutcome::Parsed(ts) => match ts.instant {
            Some(instant) => writeln!(out, "Parsed Timestamp: {}", format_instant(&instant)),
            None => writeln!(out, "Parsed Timestamp: unavailable (year unknown)"),
        },
        TimestampOutcome::Unparsable(failure) => {
            writeln!(out, "Parsed Timestamp: unavailable ({})", failure.reason)
        }
        TimestampOutcome::Absent => Ok(()),
    }
}

fn print_summary(out: &mut impl Write, summary: &AnalysisSummary) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Summary: {} lines", summary.lines)?;
    for count in &summary.formats {
        writeln!(out, "  {}: {}", count.format, count.lines)?;
    }
    if summary.unknown > 0 {
        writeln!(out, "  {}: {}", UNKNOWN_FORMAT, summary.unknown)?;
    }

    let ts = &summary.timestamps;
    writeln!(
        out,
        "Timestamps: {} parsed, {} unparsable, {} absent",
        ts.parsed, ts.unparsable, ts.absent
    )?;
    if let (Some(earliest), Some(latest)) = (summary.earliest, summary.latest) {
        writeln!(out, "Range: {} .. {}", format_instant(&earliest), format_instant(&latest))?;
    }
    Ok(())
}
