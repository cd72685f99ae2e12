//! Configuration loading from environment variables.

use crate::constants::{
    DEFAULT_BUFFER_REQUEST_SIZE, DEFAULT_MULTI_SELECT_ROW_LIMIT, DEFAULT_ROW_HEIGHT,
    DEFAULT_ROW_PADDING, DEFAULT_SCROLL_FIRE_INTERVAL_MS, DEFAULT_SCROLL_VELOCITY_LIMIT,
};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Runtime tuning for a grid view session.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// Height of one rendered row, in pixels.
    pub row_height: f64,
    /// Rows rendered above and below the middle row until the first resize.
    pub row_padding: usize,
    /// Rows per buffer chunk; the buffer snaps to multiples of this.
    pub buffer_request_size: usize,
    /// Upper bound on the rows a multi-select range may span.
    pub multi_select_row_limit: usize,
    /// Minimum spacing of scroll-driven fetches while scrolling fast.
    pub scroll_fire_interval: Duration,
    /// Pixels per millisecond under which scroll events fire immediately.
    pub scroll_velocity_limit: f64,
    pub hide_rows_not_matching_search: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_height: DEFAULT_ROW_HEIGHT,
            row_padding: DEFAULT_ROW_PADDING,
            buffer_request_size: DEFAULT_BUFFER_REQUEST_SIZE,
            multi_select_row_limit: DEFAULT_MULTI_SELECT_ROW_LIMIT,
            scroll_fire_interval: Duration::from_millis(DEFAULT_SCROLL_FIRE_INTERVAL_MS),
            scroll_velocity_limit: DEFAULT_SCROLL_VELOCITY_LIMIT,
            hide_rows_not_matching_search: true,
        }
    }
}

/// Interpret an env flag: `1`/`true`/`yes`/`on` or `0`/`false`/`no`/`off`/empty,
/// case-insensitively and trimmed. Anything else is `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Whether the flag `name` is set to a truthy value.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|raw| raw.trim().parse().ok())
}

fn positive<T: PartialOrd + Default>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v > T::default())
}

impl GridConfig {
    /// Load configuration from environment variables.
    ///
    /// Zero, negative and unparsable values fall back to the defaults.
    ///
    /// # Returns
    /// A populated [`GridConfig`].
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            row_height: positive(env_parse("GRIDVIEW_ROW_HEIGHT")).unwrap_or(defaults.row_height),
            row_padding: env_parse("GRIDVIEW_ROW_PADDING").unwrap_or(defaults.row_padding),
            buffer_request_size: positive(env_parse("GRIDVIEW_BUFFER_REQUEST_SIZE"))
                .unwrap_or(defaults.buffer_request_size),
            multi_select_row_limit: positive(env_parse("GRIDVIEW_MULTI_SELECT_ROW_LIMIT"))
                .unwrap_or(defaults.multi_select_row_limit),
            scroll_fire_interval: env_parse("GRIDVIEW_SCROLL_FIRE_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.scroll_fire_interval),
            scroll_velocity_limit: positive(env_parse("GRIDVIEW_SCROLL_VELOCITY_LIMIT"))
                .unwrap_or(defaults.scroll_velocity_limit),
            hide_rows_not_matching_search: env::var("GRIDVIEW_HIDE_ROWS_NOT_MATCHING_SEARCH")
                .ok()
                .and_then(|value| parse_env_flag(&value))
                .unwrap_or(defaults.hide_rows_not_matching_search),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{env_lock, EnvOverride};

    const ALL_VARS: [&str; 7] = [
        "GRIDVIEW_ROW_HEIGHT",
        "GRIDVIEW_ROW_PADDING",
        "GRIDVIEW_BUFFER_REQUEST_SIZE",
        "GRIDVIEW_MULTI_SELECT_ROW_LIMIT",
        "GRIDVIEW_SCROLL_FIRE_INTERVAL_MS",
        "GRIDVIEW_SCROLL_VELOCITY_LIMIT",
        "GRIDVIEW_HIDE_ROWS_NOT_MATCHING_SEARCH",
    ];

    fn cleared() -> EnvOverride {
        let vars: Vec<(&str, Option<&str>)> = ALL_VARS.iter().map(|k| (*k, None)).collect();
        EnvOverride::apply(&vars)
    }

    #[test]
    fn parse_env_flag_accepts_truthy_and_falsy_values() {
        for value in ["1", "true", "TRUE", " yes ", "on"] {
            assert_eq!(parse_env_flag(value), Some(true), "value: {}", value);
        }
        for value in ["", "0", "false", " no ", "off"] {
            assert_eq!(parse_env_flag(value), Some(false), "value: {}", value);
        }
        assert_eq!(parse_env_flag("enabled"), None);
    }

    #[test]
    fn from_env_without_overrides_matches_defaults() {
        let _lock = env_lock().lock().expect("env lock");
        let _clear = cleared();
        assert_eq!(GridConfig::from_env(), GridConfig::default());
    }

    #[test]
    fn from_env_reads_overrides_and_rejects_nonsense() {
        let _lock = env_lock().lock().expect("env lock");
        let _clear = cleared();
        let _vars = EnvOverride::apply(&[
            ("GRIDVIEW_ROW_HEIGHT", Some("40")),
            ("GRIDVIEW_BUFFER_REQUEST_SIZE", Some("0")),
            ("GRIDVIEW_SCROLL_FIRE_INTERVAL_MS", Some("250")),
            ("GRIDVIEW_SCROLL_VELOCITY_LIMIT", Some("fast")),
            ("GRIDVIEW_HIDE_ROWS_NOT_MATCHING_SEARCH", Some("off")),
        ]);
        let config = GridConfig::from_env();
        assert_eq!(config.row_height, 40.0);
        assert_eq!(config.buffer_request_size, DEFAULT_BUFFER_REQUEST_SIZE);
        assert_eq!(config.scroll_fire_interval, Duration::from_millis(250));
        assert_eq!(config.scroll_velocity_limit, DEFAULT_SCROLL_VELOCITY_LIMIT);
        assert!(!config.hide_rows_not_matching_search);
    }
}
