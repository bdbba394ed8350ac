use clap::Parser;
use guardian::cli::commands::password::Encoding;
use guardian::cli::{Cli, Commands};

fn main() {
    guardian::logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { force } => guardian::cli::commands::init::execute(&cli, force),
        Commands::Get { ref id } => guardian::cli::commands::get::execute(&cli, id),
        Commands::Set { ref id, ref value } => {
            guardian::cli::commands::set::execute(&cli, id, value.as_deref())
        }
        Commands::Del { ref id } => guardian::cli::commands::delete::execute(&cli, id),
        Commands::List { plain } => guardian::cli::commands::list::execute(&cli, plain),
        Commands::Mount { ref mount_point } => {
            guardian::cli::commands::mount::execute(&cli, mount_point)
        }
        Commands::Password {
            length,
            base64,
            hex,
        } => guardian::cli::commands::password::execute(length, Encoding::from_flags(base64, hex)),
        Commands::RotateKey => guardian::cli::commands::rotate::execute(&cli),
        Commands::Keyfile { ref path } => guardian::cli::commands::keyfile::execute(path),
        Commands::Completions { ref shell } => guardian::cli::commands::completions::execute(shell),
    };

    if let Err(e) = result {
        guardian::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
