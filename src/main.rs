// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use jumping_standings::report::{self, OutputFormat};
use jumping_standings::telemetry::{init_tracing, level_from_verbosity};
use jumping_standings::{
    CompetitionConfig, CsvDirectorySource, DataProvider, DayResults, LoadError, ResultSource,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "jumping-standings",
    version,
    about = "Show-jumping standings: individual and team rankings from per-day result sheets"
)]
struct Cli {
    /// Directory holding the day sheets (VIERNES110.csv, EQUIPOS.csv, ...)
    #[arg(short, long, global = true, default_value = ".")]
    data_dir: PathBuf,

    /// Competition format as JSON (defaults to the three-day format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Individual standings of one category
    Individual {
        /// Category id as used in the sheet names (e.g. 110)
        category: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Write to this file, or into this directory under a dated name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Team standings
    Teams {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the principal columns of one raw result sheet
    Sheet {
        /// Day id (e.g. SABADO)
        day: String,
        category: String,
    },

    /// Loaded and missing sheets, and the data fingerprint
    Status,

    /// Interactive standings viewer
    View,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json, level_from_verbosity(cli.verbose));

    if let Err(err) = run(cli) {
        let code = err
            .downcast_ref::<LoadError>()
            .map(LoadError::exit_code)
            .unwrap_or(1);
        eprintln!("❌ {:#}", err);
        process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    debug!(days = config.days.len(), categories = config.categories.len(), "Configuration ready");

    let source = CsvDirectorySource::new(&cli.data_dir, config.clone());
    let mut provider = DataProvider::new(source, config);

    match cli.command {
        Command::Individual {
            category,
            format,
            output,
        } => run_individual(&mut provider, &category, format, output.as_deref()),
        Command::Teams { format, output } => run_teams(&mut provider, format, output.as_deref()),
        Command::Sheet { day, category } => run_sheet(&mut provider, &day, &category),
        Command::Status => run_status(&mut provider),
        Command::View => run_ui_mode(provider),
    }
}

/// Read and check the configuration. Every problem is a `LoadError::Config`.
fn load_config(path: Option<&Path>) -> Result<CompetitionConfig> {
    let (config, origin) = match path {
        Some(path) => {
            let config = CompetitionConfig::from_file(path).map_err(|e| LoadError::Config {
                path: path.to_path_buf(),
                message: format!("{:#}", e),
            })?;
            (config, path.to_path_buf())
        }
        None => (CompetitionConfig::three_day(), PathBuf::from("<built-in>")),
    };

    if let Err(problems) = config.validate() {
        return Err(LoadError::Config {
            path: origin,
            message: problems.join("; "),
        }
        .into());
    }
    Ok(config)
}

fn run_individual(
    provider: &mut DataProvider<CsvDirectorySource>,
    category: &str,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    if !provider.config().has_category(category) {
        anyhow::bail!(
            "Unknown category '{}' (expected one of: {})",
            category,
            provider.config().categories.join(", ")
        );
    }

    let standings = provider.individual_standings(category)?;
    info!(category, riders = standings.len(), "Individual standings computed");

    let config = provider.config();
    let content = match format {
        OutputFormat::Table => report::render_individual_table(category, &standings, config),
        OutputFormat::Json => report::to_json(&standings)?,
        OutputFormat::Csv => {
            let mut buffer = Vec::new();
            report::write_individual_csv(&mut buffer, &standings, config)?;
            String::from_utf8(buffer).context("CSV output is not UTF-8")?
        }
    };

    let default_name = report::individual_file_name(category, report::today(), format);
    emit(output, &default_name, &content)
}

fn run_teams(
    provider: &mut DataProvider<CsvDirectorySource>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let teams = provider.team_standings()?;

    let content = match format {
        OutputFormat::Table => report::render_team_table(&teams),
        OutputFormat::Json => report::to_json(&teams)?,
        OutputFormat::Csv => {
            let mut buffer = Vec::new();
            report::write_team_csv(&mut buffer, &teams, provider.config().team.counted_members)?;
            String::from_utf8(buffer).context("CSV output is not UTF-8")?
        }
    };

    let default_name = report::team_file_name(report::today(), format);
    emit(output, &default_name, &content)
}

fn run_sheet(provider: &mut DataProvider<CsvDirectorySource>, day: &str, category: &str) -> Result<()> {
    let snapshot = provider.snapshot()?;
    match snapshot.day_results(day, category) {
        Some(sheet) => {
            print!("{}", report::render_sheet(sheet));
            Ok(())
        }
        None => anyhow::bail!("No sheet loaded for {} {}", day, category),
    }
}

fn run_status(provider: &mut DataProvider<CsvDirectorySource>) -> Result<()> {
    let origin = provider.source().describe();
    let snapshot = provider.snapshot()?;

    println!("📂 {}", origin);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🏇 Competition: {}", snapshot.name);
    println!("🔑 Fingerprint: {}", snapshot.fingerprint);
    println!("\n✓ Loaded {} sheets ({} rows)", snapshot.sheets().len(), snapshot.row_count());
    for sheet in snapshot.sheets() {
        println!("   {:<12} {:<8} {:>4} rows", sheet.day, sheet.category, sheet.len());
    }
    println!("✓ Team membership: {} entries", snapshot.membership().len());

    if !snapshot.missing.is_empty() {
        println!("\n⏳ Not published yet ({}):", snapshot.missing.len());
        for name in &snapshot.missing {
            println!("   {}", name);
        }
    }
    Ok(())
}

/// Print to stdout, or write to `output` (a file, or a directory that gets
/// the dated default name).
fn emit(output: Option<&Path>, default_name: &str, content: &str) -> Result<()> {
    let Some(output) = output else {
        print!("{}", content);
        return Ok(());
    };

    let target = if output.is_dir() {
        output.join(default_name)
    } else {
        output.to_path_buf()
    };
    fs::write(&target, content)
        .with_context(|| format!("Failed to write output file: {:?}", target))?;
    println!("✓ Wrote {}", target.display());
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(provider: DataProvider<CsvDirectorySource>) -> Result<()> {
    println!("🖥️  Loading standings viewer...\n");

    let mut app = ui::App::new(provider);
    ui::run_ui(&mut app)?;

    println!("\n✅ Viewer closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_provider: DataProvider<CsvDirectorySource>) -> Result<()> {
    eprintln!("❌ Viewer not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    std::process::exit(1);
}
