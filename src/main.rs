// File: src/main.rs
//
// Command-line front end for the Polyglot conversion engine.
// Parses arguments, loads configuration, dispatches to the library and
// prints either terminal-rendered diagnostics or JSON responses.

use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;
use polyglot::config::EngineConfig;
use polyglot::converter::{self, ConversionRequest, ConversionResponse};
use polyglot::detect;
use polyglot::errors::ConversionError;
use polyglot::language::Language;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(ClapParser)]
#[command(
    name = "polyglot",
    about = "Polyglot: convert programs between Java, C, C++ and JavaScript",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[command(arg_required_else_help = true)]
enum Commands {
    /// Convert a source file into another language
    Convert {
        /// Source file, or - for stdin
        file: PathBuf,

        /// Target language tag
        #[arg(short, long)]
        to: String,

        /// Source language tag; inferred from the extension or content when omitted
        #[arg(short, long)]
        from: Option<String>,
    },

    /// Guess the language of a source file
    Detect {
        /// Source file, or - for stdin
        file: PathBuf,
    },

    /// Execute a source file with the reference interpreter
    Run {
        /// Source file, or - for stdin
        file: PathBuf,

        /// Source language tag; inferred from the extension or content when omitted
        #[arg(short, long)]
        from: Option<String>,
    },

    /// List the supported language tags
    Languages,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{} {}", "error:".red().bold(), message);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Convert { file, to, from } => {
            let source = match read_source(&file) {
                Ok(source) => source,
                Err(message) => return fail(&message),
            };
            let request = ConversionRequest {
                source_language: from.or_else(|| extension_tag(&file)),
                source_code: source,
                target_language: to,
            };
            let response = converter::handle(&request, &config);
            if cli.json {
                print_json(&response);
            } else {
                print_response(&response, &request.source_code);
            }
            match response {
                ConversionResponse::Success { .. } => ExitCode::SUCCESS,
                ConversionResponse::Failure { .. } => ExitCode::FAILURE,
            }
        }

        Commands::Detect { file } => {
            let source = match read_source(&file) {
                Ok(source) => source,
                Err(message) => return fail(&message),
            };
            let scores = detect::scores(&source);
            let detected = detect::detect(&source, &config);
            if cli.json {
                print_json(&serde_json::json!({
                    "language": detected.as_ref().ok(),
                    "scores": scores,
                }));
            } else {
                for score in &scores {
                    println!("{:>12}  {}", score.language.display_name(), score.score);
                }
                if let Ok(language) = &detected {
                    println!("{} {}", "detected:".green().bold(), language);
                }
            }
            match detected {
                Ok(_) => ExitCode::SUCCESS,
                Err(err) => report(&err, &source, cli.json),
            }
        }

        Commands::Run { file, from } => {
            let source = match read_source(&file) {
                Ok(source) => source,
                Err(message) => return fail(&message),
            };
            let hint = match from.or_else(|| extension_tag(&file)).map(|tag| converter::parse_source(&tag)).transpose() {
                Ok(hint) => hint,
                Err(err) => return report(&err, &source, cli.json),
            };
            match converter::run_source(&source, hint, &config) {
                Ok(execution) => {
                    if cli.json {
                        print_json(&execution);
                    } else {
                        print!("{}", execution.stdout);
                    }
                    ExitCode::from(execution.exit_code.clamp(0, 255) as u8)
                }
                Err(err) => report(&err, &source, cli.json),
            }
        }

        Commands::Languages => {
            if cli.json {
                print_json(&Language::ALL);
            } else {
                for language in Language::ALL {
                    println!("{:<12} {:<12} .{}", language.tag(), language.display_name(), language.file_extension());
                }
            }
            ExitCode::SUCCESS
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    let config = match path {
        Some(path) => EngineConfig::load(path).map_err(|e| format!("{}: {}", path.display(), e))?,
        None => EngineConfig::default(),
    };
    config.with_env_overrides().map_err(|e| e.to_string())
}

fn read_source(file: &Path) -> Result<String, String> {
    if file.as_os_str() == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source).map_err(|e| format!("failed to read stdin: {}", e))?;
        return Ok(source);
    }
    fs::read_to_string(file).map_err(|e| format!("failed to read {}: {}", file.display(), e))
}

fn extension_tag(file: &Path) -> Option<String> {
    let ext = file.extension()?.to_str()?;
    Language::from_extension(ext).map(|language| language.tag().to_string())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("{} failed to serialize output: {}", "error:".red().bold(), e),
    }
}

fn print_response(response: &ConversionResponse, source: &str) {
    match response {
        ConversionResponse::Success { source_language, solutions, warnings } => {
            for warning in warnings {
                eprintln!("{} {}", "warning:".yellow().bold(), warning);
            }
            println!("{}", format!("// converted from {}", source_language).dimmed());
            for solution in solutions {
                println!("{}", format!("=== {} ===", solution.title).cyan().bold());
                println!("{}", solution.description.dimmed());
                println!();
                print!("{}", solution.code);
                println!();
            }
        }
        ConversionResponse::Failure { diagnostics } => {
            for diagnostic in diagnostics {
                eprint!("{}", diagnostic.render(source));
            }
        }
    }
}

fn report(err: &ConversionError, source: &str, json: bool) -> ExitCode {
    let diagnostics = err.diagnostics();
    if json {
        print_json(&serde_json::json!({ "diagnostics": diagnostics }));
    } else {
        for diagnostic in &diagnostics {
            eprint!("{}", diagnostic.render(source));
        }
    }
    ExitCode::FAILURE
}

fn fail(message: &str) -> ExitCode {
    eprintln!("{} {}", "error:".red().bold(), message);
    ExitCode::FAILURE
}
