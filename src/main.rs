mod archive;
mod chapter;
mod cli;
mod combine;
mod error;
mod fetch;
mod logging;
mod mangadex;
mod pathutil;
mod progress;
mod prompt;
mod scan;
mod similarity;
mod split;
mod stats;

use clap::Parser;
use cli::{Cli, Commands};
use error::CbzError;
use mangadex::FetchError;
use prompt::Terminal;

fn cancelled(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<CbzError>(), Some(CbzError::Cancelled))
        || matches!(err.downcast_ref::<FetchError>(), Some(FetchError::Cancelled))
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut term = Terminal::new();
    let res = match &cli.command {
        Commands::Combine(args) => combine::run(&args.source_dir, &mut term),
        Commands::Fetch(args) => fetch::run(args, &mut term),
        Commands::Split(args) => split::run(args, &mut term),
    };

    match res {
        Ok(()) => {}
        Err(e) if cancelled(&e) => println!("\nGoodbye!"),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
