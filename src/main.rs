use clap::Parser;

use keyflock::cli::{Cli, Commands, commands, output};
use keyflock::config::settings::Settings;

fn main() {
    let args = Cli::parse();

    let settings_path = match &args.settings {
        Some(path) => path.clone(),
        None => match Settings::default_path() {
            Ok(path) => path,
            Err(e) => {
                output::error(&format!("Error: {e}"));
                std::process::exit(1);
            }
        },
    };

    let result = match &args.command {
        Commands::Add {
            fingerprint,
            url,
            keyserver,
            proxy_host,
            proxy_port,
        } => commands::add::execute(
            &settings_path,
            fingerprint,
            url,
            keyserver.as_deref(),
            proxy_host.as_deref(),
            proxy_port.as_deref(),
        ),
        Commands::Sync { url } => commands::sync::execute(&settings_path, url.as_deref()),
        Commands::Status => commands::status::execute(&settings_path),
        Commands::Remove { url } => commands::remove::execute(&settings_path, url),
        Commands::Daemon => commands::daemon::execute(&settings_path),
    };

    if let Err(e) = result {
        output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}
