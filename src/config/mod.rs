// Config module - DEPLOYMENT PARAMETERS
// Token, crowdsale and allocation settings, loadable from TOML

mod chain;

pub use chain::{ChainConfig, ConfigError};
