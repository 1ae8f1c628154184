//! Available subcommands.

use blockhost_core::LogSource;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Start servers and stay attached to their consoles
    ///
    /// Log lines and status changes are printed as they happen. Lines typed
    /// on stdin as `<id> <command>` are sent to that server's console; with a
    /// single server the id may be omitted. Ctrl-C stops every server.
    Run {
        /// Servers to start (all configured servers when omitted)
        ids: Vec<String>,
    },

    /// List configured servers
    List,

    /// Show the state of one server
    Status {
        /// Server identifier
        id: String,
    },

    /// Show recent log entries
    Logs {
        /// Server identifier
        id: String,
        /// Only entries from this source (stdout, stderr, system, command)
        #[arg(long)]
        source: Option<LogSource>,
        /// Case-insensitive text to search for
        #[arg(long)]
        search: Option<String>,
        /// Maximum number of entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Set entries in a server's server.properties
    SetProperty {
        /// Server identifier
        id: String,
        /// Assignments in key=value form
        #[arg(required = true)]
        pairs: Vec<String>,
    },
}
