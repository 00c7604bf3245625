use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("FOLIO_GIT_HASH");
    const GIT_DATE: &str = env!("FOLIO_GIT_DATE");
    const IS_RELEASE: &str = env!("FOLIO_IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "folio", bin_name = "folio", version = get_version())]
#[command(about = "A document store that keeps every record as a JSON file", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store root directory
    #[arg(short, long, global = true, env = "FOLIO_ROOT")]
    pub root: Option<PathBuf>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a JSON payload under the next id of a collection
    #[command(alias = "w")]
    Put {
        collection: String,

        /// Payload as JSON, e.g. '{"title":"MyTitle"}'
        json: String,
    },

    /// Print one record
    #[command(alias = "g")]
    Get { collection: String, id: String },

    /// Replace the payload of an existing record
    #[command(alias = "u")]
    Update {
        collection: String,
        id: String,

        /// New payload as JSON
        json: String,
    },

    /// Delete a record, or the whole collection when no id is given
    #[command(alias = "del")]
    Rm {
        collection: String,
        id: Option<String>,
    },

    /// Print every record of a collection, ordered by id
    #[command(alias = "ls")]
    List { collection: String },

    /// Remove leftover temp files and report corrupt records
    Doctor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_put() {
        let cli = Cli::try_parse_from(["folio", "--root", "/tmp/db", "put", "posts", "{}"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/db")));
        match cli.command {
            Commands::Put { collection, json } => {
                assert_eq!(collection, "posts");
                assert_eq!(json, "{}");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rm_collection() {
        let cli = Cli::try_parse_from(["folio", "rm", "posts"]).unwrap();
        match cli.command {
            Commands::Rm { collection, id } => {
                assert_eq!(collection, "posts");
                assert!(id.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["folio"]).is_err());
    }
}
