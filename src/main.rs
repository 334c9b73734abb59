use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use hey::ast_printer::AstPrinter;
use hey::interpreter::Interpreter;
use hey::parser::parse;
use hey::scanner::Scanner;
use hey::{ErrorKind, HeyError};

#[derive(ClapParser, Debug)]
#[command(version, about = "Hey language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to hey.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses a Hey program and prints its tree
    Parse { filename: Option<PathBuf> },

    /// Evaluates a Hey program and prints the resulting value
    Run {
        filename: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Interrupt the evaluation after this many milliseconds
        #[arg(long, value_name = "MS")]
        timeout: Option<u64>,
    },
}

fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let source = std::fs::read_to_string(&filename)
        .with_context(|| format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("hey.log").context("Failed to create hey.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("hey::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // RUST_LOG overrides
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to hey.log");
    Ok(())
}

/// Parse failures exit with 65, evaluation failures with 70.
fn exit_code(error: &HeyError) -> i32 {
    match error.kind {
        ErrorKind::Parse => 65,
        _ => 70,
    }
}

fn no_input(command: &str) -> ! {
    info!("No filepath provided for {}", command);
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => {
            let Some(filename) = filename else {
                no_input("Tokenize")
            };

            info!("Running Tokenize subcommand");
            let source = read_file(filename)?;
            let mut tokenized = true;

            for token in Scanner::new(&source) {
                match token {
                    Ok(token) => {
                        debug!("Scanned token: {}", token);
                        println!("{}", token);
                    }

                    Err(e) => {
                        tokenized = false;
                        debug!("Tokenization debug: {}", e);
                        eprintln!("{}", e);
                        // the scanner resumes after the bad character
                    }
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            let Some(filename) = filename else {
                no_input("Parse")
            };

            info!("Running Parse subcommand");
            let source = read_file(filename)?;

            match parse(&source) {
                Ok(program) => {
                    let tree = AstPrinter::print(&program);
                    debug!("AST: {}", tree);
                    println!("{}", tree);
                }

                Err(e) => {
                    debug!("Parse debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(65);
                }
            }

            info!("Parse subcommand completed");
        }

        Commands::Run {
            filename,
            json,
            timeout,
        } => {
            let Some(filename) = filename else {
                no_input("Run")
            };

            info!("Running Run subcommand");
            let source = read_file(filename)?;
            info!("Provided input:\n {}", source);

            let mut interpreter = Interpreter::new();

            if let Some(ms) = timeout {
                let handle = interpreter.cancel_handle();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(ms));
                    handle.cancel();
                });
                info!("Watchdog armed for {} ms", ms);
            }

            match interpreter.evaluate(&source) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);

                    if json {
                        let out = serde_json::to_string_pretty(&value)
                            .context("Failed to serialize result")?;
                        println!("{}", out);
                    } else {
                        println!("{}", value);
                    }
                }

                Err(e) => {
                    debug!("Evaluation debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(exit_code(&e));
                }
            }

            info!("Program executed successfully");
        }
    }

    Ok(())
}
