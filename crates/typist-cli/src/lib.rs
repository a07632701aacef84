pub mod cli;
pub mod commands;

use clap::Parser;
use cli::Typist;
use commands::handle_command;
use std::process;

/// Run the typist CLI application
pub fn run_main() {
    let args = Typist::parse();
    let result = handle_command(args.commands);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
