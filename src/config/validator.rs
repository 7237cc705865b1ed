//! Configuration validation with aggregated errors.

use crate::config::settings::{ApiConfig, LoggingConfig, ServiceConfig, StorageConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_api(&cfg.settings.api, &mut errors);
    validate_storage(&cfg.settings.storage, &mut errors);
    if let Some(logging) = &cfg.settings.logging {
        validate_logging(logging, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_api(api: &ApiConfig, errors: &mut Vec<String>) {
    let base_url = api.base_url.trim();
    if base_url.is_empty() {
        errors.push("settings.api.base_url must not be empty".to_string());
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(format!(
            "settings.api.base_url '{}' must start with http:// or https://",
            api.base_url
        ));
    }

    if api.refresh_path.trim().is_empty() {
        errors.push("settings.api.refresh_path must not be empty".to_string());
    }
    if api.timeout_ms == 0 {
        errors.push("settings.api.timeout_ms must be > 0".to_string());
    }
}

fn validate_storage(storage: &StorageConfig, errors: &mut Vec<String>) {
    if storage.path.trim().is_empty() {
        errors.push("settings.storage.path must not be empty".to_string());
    }
    let keys = [
        ("access_token_key", &storage.access_token_key),
        ("user_key", &storage.user_key),
        ("refresh_cookie_key", &storage.refresh_cookie_key),
    ];
    for (i, (name, key)) in keys.iter().enumerate() {
        if key.is_empty() {
            errors.push(format!("settings.storage.{} must not be empty", name));
            continue;
        }
        if let Some((other, _)) = keys[..i].iter().find(|(_, earlier)| earlier == key) {
            errors.push(format!(
                "settings.storage.{} and {} must differ (both '{}')",
                other, name, key
            ));
        }
    }
}

fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "settings.logging.level '{}' must be one of {:?}",
            logging.level, LOG_LEVELS
        ));
    }
}
