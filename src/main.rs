//! landcat CLI entry point
//!
//! Parses arguments, dispatches to the CLI module and exits non-zero on
//! failure. All other logic lives in `landcat::cli`.

use landcat::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
}
