use anyhow::{anyhow, Result};
use std::env;
use std::str::FromStr;

/// Retrieves an environment variable, treating an unset or blank value as absent.
///
/// # Arguments
/// - `var`: The name of the environment variable.
///
/// # Returns
/// - `Option<String>` with surrounding whitespace removed.
pub fn get_env_var(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Retrieves an environment variable, falling back to `default` when it is absent.
pub fn get_env_var_or(var: &str, default: &str) -> String {
    get_env_var(var).unwrap_or_else(|| default.to_string())
}

/// Retrieves and parses an environment variable.
///
/// An absent variable yields `default`; a present but unparseable one is an error,
/// so a typo in the deployment fails the run instead of silently using the default.
pub fn get_env_var_parsed<T>(var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_var(var) {
        Some(raw) => parse_value(var, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(var: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| anyhow!("Invalid value {:?} for {}: {}", raw, var, e))
}
