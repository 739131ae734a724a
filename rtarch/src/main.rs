use clap::Parser;

mod flags;
mod logger;
mod parse;
mod run;

use crate::flags::{Cli, Command};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Encode(args) => {
            let flags = args.to_driver_flags();
            logger::init(flags.log_level);
            run::command_encode(flags)
        }
    };

    if let Err(err) = result {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
