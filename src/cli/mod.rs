pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Keep local GPG keyrings in sync with signed organization keylists.
#[derive(Parser, Debug)]
#[command(name = "keyflock", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to an alternative settings file
    #[arg(long, global = true, env = "KEYFLOCK_SETTINGS")]
    pub settings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate and adopt a new keylist
    Add {
        /// Authority key fingerprint the keylist must be signed by
        #[arg(long)]
        fingerprint: String,

        /// Address of the keylist
        #[arg(long)]
        url: String,

        /// Keyserver override for this keylist
        #[arg(long)]
        keyserver: Option<String>,

        /// SOCKS5 proxy host (e.g. 127.0.0.1 for Tor)
        #[arg(long, requires = "proxy_port")]
        proxy_host: Option<String>,

        /// SOCKS5 proxy port (e.g. 9050)
        #[arg(long, requires = "proxy_host")]
        proxy_port: Option<String>,
    },

    /// Sync all keylists now (or just one with --url)
    Sync {
        /// Only sync the keylist with this address
        #[arg(long)]
        url: Option<String>,
    },

    /// Show configured keylists and their sync state
    Status,

    /// Stop syncing a keylist (imported keys stay in the keyring)
    Remove {
        /// Address of the keylist to remove
        #[arg(long)]
        url: String,
    },

    /// Run in the foreground, syncing on the configured interval
    Daemon,
}
