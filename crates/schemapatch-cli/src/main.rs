use clap::{Parser, Subcommand};

pub mod commands;
pub mod error;
pub mod schema_io;

#[derive(Parser)]
#[command(author, version, about)]
struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mutate an object in place: template expansion, a single expression,
    /// or an `objects.apply` expression
    Mutate(commands::mutate::Opts),

    /// Convert an object from one schema version to another
    Convert(commands::convert::Opts),
}

fn main() {
    let opts: Opts = Opts::parse();

    let result = match opts.command {
        Command::Mutate(opts) => commands::mutate::execute(opts),
        Command::Convert(opts) => commands::convert::execute(opts),
    };

    std::process::exit(match result {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("\x1b[0;31mError occurred:\x1b[0m {e}");
            1
        }
    })
}
