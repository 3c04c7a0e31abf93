use std::{env, fmt::Display, str::FromStr};

use log::LevelFilter;
use thiserror::Error;

use crate::geo::Radius;


#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}


/// Runtime settings read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub default_radius: Radius,
    pub page_size: i64,
    pub max_page_size: i64,
    pub log_level: LevelFilter,
    pub sentry_dsn: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Settings::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String> {

        let radius_miles: f64 = try_load(&lookup, "HELPME_DEFAULT_RADIUS_MILES", "5")?;
        let default_radius = Radius::new(radius_miles)
            .map_err(|err| ConfigError::Invalid {
                key: "HELPME_DEFAULT_RADIUS_MILES",
                value: radius_miles.to_string(),
                reason: err.to_string(),
            })?;

        let page_size: i64 = try_load(&lookup, "HELPME_PAGE_SIZE", "25")?;
        let max_page_size: i64 = try_load(&lookup, "HELPME_MAX_PAGE_SIZE", "100")?;
        if page_size < 1 || max_page_size < page_size {
            return Err(ConfigError::Invalid {
                key: "HELPME_PAGE_SIZE",
                value: page_size.to_string(),
                reason: format!("must be between 1 and {}", max_page_size),
            });
        }

        Ok(Settings {
            default_radius,
            page_size,
            max_page_size,
            log_level: try_load(&lookup, "HELPME_LOG_LEVEL", "info")?,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_radius: Radius::DEFAULT,
            page_size: 25,
            max_page_size: 100,
            log_level: LevelFilter::Info,
            sentry_dsn: None,
        }
    }
}


fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
    where F: Fn(&str) -> Option<String>,
          T: FromStr,
          T::Err: Display {

    let value = lookup(key).unwrap_or_else(|| default.to_owned());

    value.trim().parse()
        .map_err(|err: T::Err| ConfigError::Invalid {
            key,
            value: value.clone(),
            reason: err.to_string(),
        })
}
