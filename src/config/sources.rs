use config::Environment;
use std::env;

use super::models::RawConfig;

const CONFIG_ENV_VAR: &str = "CONFIG_FILE";

/// Build the raw, pre-defaulted configuration from the layered sources:
/// an optional file, then the flat environment variables, the latter
/// always winning.
///
/// A `.env` file is loaded first (via `dotenvy`) so locally-exported
/// variables behave the same as variables exported in the shell.
pub fn load() -> Result<RawConfig, config::ConfigError> {
    let _ = dotenvy::dotenv();

    let mut builder = config::Config::builder();

    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        builder = builder.add_source(config::File::with_name(&path).required(false));
    }

    builder = builder.add_source(Environment::default().try_parsing(true));

    builder.build()?.try_deserialize()
}
