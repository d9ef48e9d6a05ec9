use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use dslint::analyzer::{AnalysisResults, Analyzer};
use dslint::config::{Config, ConfigManager};

#[derive(Parser)]
#[command(name = "dslint")]
#[command(about = "Constructor and field analyzers with code fixes for C#", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze C# sources
    Check {
        /// File or directory to check (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Apply every available fix and write the files back
        #[arg(long, short)]
        fix: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Default)]
        format: OutputFormat,

        /// Exit with code 1 if any issues remain
        #[arg(long)]
        strict: bool,
    },

    /// Show or create configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,

        /// Write a default .dslint.toml in the current directory
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Default,
    Json,
    Github,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Check {
            path,
            fix,
            format,
            strict,
        } => run_check(&path, fix, format, strict),
        Commands::Config { show, init } => handle_config(show, init),
    };
    process::exit(code);
}

fn config_root(path: &Path) -> &Path {
    if path.is_file() {
        path.parent().unwrap_or(Path::new("."))
    } else {
        path
    }
}

fn run_check(path: &Path, fix: bool, format: OutputFormat, strict: bool) -> i32 {
    let start = Instant::now();

    let config = Config::load_or_default(config_root(path));
    let analyzer = Analyzer::new(config);

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Analyzing files...");

    let mut results = if fix {
        analyzer.analyze_path_with_autofix(path)
    } else {
        analyzer.analyze_path(path)
    };
    pb.finish_and_clear();

    if fix {
        write_fixes(&results);
        // Report what is left after fixing.
        results = analyzer.analyze_path(path);
    }

    let issue_count = results.total_issues();
    let duration = start.elapsed();

    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return 2;
            }
        },
        OutputFormat::Github => {
            for (file, issues) in sorted(&results) {
                for issue in issues {
                    println!(
                        "::{} file={},line={},col={},title={}::{}",
                        issue.severity.github_level(),
                        file.display(),
                        issue.location.line,
                        issue.location.column,
                        issue.rule,
                        issue.message
                    );
                }
            }
        }
        OutputFormat::Default => print_default(&results, fix, duration.as_secs_f64()),
    }

    if strict && issue_count > 0 {
        1
    } else {
        0
    }
}

fn sorted(results: &AnalysisResults) -> Vec<(&PathBuf, &Vec<dslint::rules::Issue>)> {
    let mut files: Vec<_> = results.file_issues.iter().collect();
    files.sort_by(|a, b| a.0.cmp(b.0));
    files
}

fn print_default(results: &AnalysisResults, fixed: bool, seconds: f64) {
    let issue_count = results.total_issues();
    if issue_count == 0 {
        println!(
            "{} {} files in {:.1}s",
            "✓ Checked".green().bold(),
            results.file_count(),
            seconds
        );
        return;
    }

    for (file, issues) in sorted(results) {
        println!("\n{}", file.display().to_string().bold());
        for issue in issues {
            println!("{}", issue.display());
        }
    }

    println!(
        "\n{} {} issues in {} files ({:.1}s)",
        "Found".red().bold(),
        issue_count,
        results.files_with_issues(),
        seconds
    );

    let fixable = results.fixable_count();
    if !fixed && fixable > 0 {
        println!("{} {} issues can be fixed with --fix", "→".yellow(), fixable);
    }
}

fn write_fixes(results: &AnalysisResults) {
    let Some(fixed_files) = &results.fixed_files else {
        return;
    };

    for (path, content) in fixed_files {
        match std::fs::write(path, content) {
            Ok(()) => tracing::info!(path = %path.display(), "fixed"),
            Err(e) => eprintln!("{} {}: {}", "error:".red().bold(), path.display(), e),
        }
    }
    println!(
        "{} Applied {} fixes in {} files",
        "✓".green().bold(),
        results.fixes_applied(),
        fixed_files.len()
    );
}

fn handle_config(show: bool, init: bool) -> i32 {
    let config_manager = ConfigManager::new();

    if init {
        match config_manager.create_default_config(Path::new(".")) {
            Ok(path) => println!("{} Created {}", "✓".green().bold(), path.display()),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return 1;
            }
        }
    } else if show {
        let config = Config::load_or_default(Path::new("."));
        match config.to_toml() {
            Ok(toml) => println!("{}", toml),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return 1;
            }
        }
    }
    0
}
