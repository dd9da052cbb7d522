use std::path::PathBuf;

use clap::{Args, Parser};

pub const DEFAULT_PARTICIPANTS: [&str; 11] = [
    "Nawel", "Tobias", "Luca", "Lola", "Aeris", "Lionel", "Aurélie", "Sean", "Émilie", "Yves",
    "Marthe",
];

pub const DEFAULT_PORT: u16 = 15118;

/// Secret santa draw and wishlist server.
#[derive(Parser, Debug, Clone)]
#[command(name = "santa", version, about, long_about = None)]
pub struct Cli {
    /// Run the HTTP server
    #[arg(long)]
    pub serve: bool,

    /// Internal mode: random seed and listen on every interface
    #[arg(long)]
    pub internal: bool,

    /// Data file holding the roster
    #[arg(long, env = "SANTA_DATA_FILE", default_value = "people.json")]
    pub data_file: PathBuf,

    /// Directory receiving a timestamped copy of the data file on startup
    #[arg(long, env = "SANTA_BACKUP_DIR", default_value = "backups")]
    pub backup_dir: PathBuf,

    /// Listen address, overriding the one implied by --internal
    #[arg(long, env = "SANTA_ADDRESS")]
    pub address: Option<String>,

    /// Names used when no data file exists yet
    #[arg(long, value_delimiter = ',')]
    pub participants: Vec<String>,

    #[command(flatten)]
    pub admin: AdminArgs,
}

/// One-shot roster maintenance, applied before serving.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminArgs {
    /// Force saving to the data file
    #[arg(long)]
    pub save: bool,

    /// Add a person by name
    #[arg(long, value_name = "NAME")]
    pub add_person: Option<String>,

    /// Remove a person by name
    #[arg(long, value_name = "NAME")]
    pub remove_person: Option<String>,

    /// Reissue every token (everyone has to pick again)
    #[arg(long)]
    pub reset_tokens: bool,

    /// Unpick all people
    #[arg(long)]
    pub unpick_all: bool,

    /// Draw recipients again
    #[arg(long)]
    pub shuffle: bool,

    /// Print the roster with tokens
    #[arg(long)]
    pub show_people: bool,

    /// Unpick a person by name
    #[arg(long, value_name = "NAME")]
    pub unpick: Option<String>,

    /// Set the shared access key
    #[arg(long, value_name = "KEY")]
    pub set_access_key: Option<u64>,
}

impl Cli {
    pub fn participants(&self) -> Vec<String> {
        if self.participants.is_empty() {
            DEFAULT_PARTICIPANTS.iter().map(|s| s.to_string()).collect()
        } else {
            self.participants.clone()
        }
    }

    pub fn listen_address(&self) -> String {
        match &self.address {
            Some(address) => address.clone(),
            None if self.internal => format!("0.0.0.0:{DEFAULT_PORT}"),
            None => format!("localhost:{DEFAULT_PORT}"),
        }
    }
}
