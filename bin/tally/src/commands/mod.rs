//! Command implementations.

pub(crate) mod replay;
pub(crate) mod run;

use eyre::Result;

use crate::cli::ConfigArgs;
use crate::config::TallyConfig;

/// Print the effective configuration.
pub(crate) fn show_config(args: &ConfigArgs) -> Result<()> {
    let config = TallyConfig::load(Some(&args.config))?;
    print!("{}", config.to_toml()?);
    Ok(())
}
