//! # Playgraph - Playlist Co-occurrence Graph Builder
//!
//! The binary for the playgraph graph builder.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                 apps/playgraph (THE BINARY)               │
//! │                                                           │
//! │  ┌─────────────┐   ┌─────────────┐   ┌────────────────┐   │
//! │  │    CLI      │   │   Config    │   │   Progress     │   │
//! │  │   (clap)    │   │   (toml)    │   │  (indicatif)   │   │
//! │  └──────┬──────┘   └──────┬──────┘   └───────┬────────┘   │
//! │         └─────────────────┼──────────────────┘            │
//! │                           ▼                               │
//! │                  ┌────────────────┐                       │
//! │                  │ playgraph-core │                       │
//! │                  │  (THE ENGINE)  │                       │
//! │                  └────────────────┘                       │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Artist graph of the first two files in ./data
//! playgraph
//!
//! # Track graph of files 0..=9 into a redb store
//! playgraph -d mpd/data -s 0 -e 9 -t track -f redb -o graphs/tracks.redb
//! ```

use playgraph::cli::{self, Cli};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    let cli = match cli::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(code) => return ExitCode::from(code),
    };

    init_tracing(&cli);

    ExitCode::from(cli::exit_code(cli::execute(cli)))
}

/// Install the stderr subscriber. PLAYGRAPH_LOG_FORMAT=json enables
/// machine-parseable output; RUST_LOG overrides the level flags.
fn init_tracing(cli: &Cli) {
    let log_format = std::env::var("PLAYGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_level = if cli.verbose {
        "playgraph=debug,playgraph_core=debug"
    } else if cli.quiet {
        "playgraph=warn,playgraph_core=warn"
    } else {
        "playgraph=info,playgraph_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_level.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
