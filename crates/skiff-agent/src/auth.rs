//! API credential lookup

use skiff_core::{Result, SkiffError};
use std::env;

/// Read the API key from the environment variable `var_name`
pub fn api_key_from_env(var_name: &str) -> Result<String> {
    match env::var(var_name) {
        Ok(key) if !key.trim().is_empty() => {
            tracing::debug!("Using API key from {}", var_name);
            Ok(key.trim().to_string())
        }
        _ => Err(SkiffError::Auth(format!(
            "No API key found. Set {}=sk-ant-... in the environment",
            var_name
        ))),
    }
}
