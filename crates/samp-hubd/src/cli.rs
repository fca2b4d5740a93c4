//! Argument surface: profile toggles, port override, lockfile path
//! override. Glue, not a product.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Run a SAMP hub serving the Standard Profile, the Web Profile, or both.
#[derive(Debug, Parser)]
#[command(name = "samp-hubd", version, about)]
pub struct Cli {
    /// Don't start the Standard Profile's lockfile/XML-RPC server.
    #[arg(long)]
    pub no_standard: bool,

    /// Start the Web Profile's HTTP endpoint on this address (e.g.
    /// 127.0.0.1:21012). Omit to leave the Web Profile disabled.
    #[arg(long, value_name = "ADDR")]
    pub web: Option<SocketAddr>,

    /// Override the Standard Profile lockfile path (default: `$HOME/.samp`).
    #[arg(long, value_name = "PATH")]
    pub lockfile: Option<PathBuf>,

    /// Increase log verbosity: -v info, -vv debug, -vvv trace. Overrides
    /// `RUST_LOG` when passed at all.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
