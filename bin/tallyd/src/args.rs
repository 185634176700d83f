//! CLI argument parsing.

use std::path::PathBuf;

use argh::FromArgs;

#[derive(Clone, Debug, FromArgs)]
#[argh(description = "Tally Layer indexer node")]
pub(crate) struct Args {
    #[argh(option, short = 'c', description = "path to configuration")]
    pub(crate) config: PathBuf,

    /// Overrides the datadir from the config toml.
    #[argh(option, short = 'd', description = "datadir used mainly for databases")]
    pub(crate) datadir: Option<PathBuf>,
}
