use std::{io, process};

use clap::{AppSettings, ErrorKind, Parser};
use spinner::runner::{CommandLine, Runner};
use spinner::Terminal;
use tracing::{debug, Level};

const USAGE: &str = "Usage: spinner <command> [args...]";

/// Run a program behind a progress spinner
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(setting = AppSettings::TrailingVarArg)]
struct Args {
    /// Log what the runner is doing to stderr
    #[clap(short, long, action)]
    verbose: bool,
    /// The program that will be executed, followed by its arguments
    #[clap(value_parser, value_name = "COMMAND", multiple_values = true)]
    command: Vec<String>,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(_) => usage(),
    };

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(io::stderr)
        .with_ansi(termion::is_tty(&io::stderr()))
        .with_target(false)
        .init();

    let command = match CommandLine::from_argv(args.command) {
        Some(command) => command,
        None => usage(),
    };

    let mut runner = Runner::new(command);
    if let Err(e) = runner.run(Terminal::stdout()) {
        debug!(error = %e, state = ?runner.state(), "exiting with failure");
        process::exit(1);
    }
}

fn usage() -> ! {
    eprintln!("{USAGE}");
    process::exit(1);
}
