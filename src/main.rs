use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use loxide::ast_printer::AstPrinter;
use loxide::parser::Parser;
use loxide::runner::Lox;
use loxide::scanner::Scanner;
use loxide::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a script, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit the token stream as JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parses a script and prints its syntax tree
    Parse { filename: PathBuf },

    /// Runs a script
    Run { filename: PathBuf },
}

/// Memory-map a script and hand it out with process lifetime; the tokens and
/// AST built from it stay borrowed for as long as the interpreter runs.
fn map_source(path: &Path) -> Result<&'static str> {
    info!("Mapping file: {:?}", path);

    let file = File::open(path).with_context(|| format!("Failed to open file {path:?}"))?;

    if file
        .metadata()
        .with_context(|| format!("Failed to stat file {path:?}"))?
        .len()
        == 0
    {
        return Ok(""); // zero-length maps are rejected by the OS
    }

    // SAFETY: the mapping is read-only and the script is not expected to be
    // mutated while the interpreter runs.
    let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {path:?}"))?;
    let bytes: &'static Mmap = Box::leak(Box::new(mmap));

    let source = std::str::from_utf8(&bytes[..])
        .with_context(|| format!("File {path:?} is not valid UTF-8"))?;

    info!("Mapped {} bytes from {:?}", source.len(), path);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("loxide::")
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
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn tokenize(filename: &Path, json: bool) -> Result<()> {
    let source = map_source(filename)?;
    let mut tokenized = true;
    let mut tokens: Vec<Token<'_>> = Vec::new();

    for item in Scanner::new(source.as_bytes()) {
        match item {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                if json {
                    tokens.push(token);
                } else {
                    println!("{token}");
                }
            }

            Err(error) => {
                tokenized = false;
                eprintln!("{error}");
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(65);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &Path) -> Result<()> {
    let source = map_source(filename)?;
    let mut had_error = false;
    let mut tokens: Vec<Token<'_>> = Vec::new();

    for item in Scanner::new(source.as_bytes()) {
        match item {
            Ok(token) => tokens.push(token),
            Err(error) => {
                had_error = true;
                eprintln!("{error}");
            }
        }
    }

    let (statements, errors) = Parser::new(&tokens).parse();
    for error in &errors {
        had_error = true;
        eprintln!("{error}");
    }

    if had_error {
        std::process::exit(65);
    }

    println!("{}", AstPrinter.print_program(&statements));

    info!("Parse subcommand completed");
    Ok(())
}

fn run_file(filename: &Path) -> Result<()> {
    let source = map_source(filename)?;

    let mut lox = Lox::new();
    lox.run(source);

    if lox.had_error() {
        std::process::exit(65);
    }
    if lox.had_runtime_error() {
        std::process::exit(70);
    }

    info!("Program executed successfully");
    Ok(())
}

/// The interactive loop: one line at a time, error flags reset per line so a
/// mistake never poisons the session.
fn run_prompt() -> Result<()> {
    let mut lox = Lox::repl();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!("end of input");
            break;
        }

        lox.run_line(line);
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.command {
        Some(Commands::Tokenize { filename, json }) => tokenize(&filename, json)?,
        Some(Commands::Parse { filename }) => parse(&filename)?,
        Some(Commands::Run { filename }) => run_file(&filename)?,
        None => run_prompt()?,
    }

    Ok(())
}
