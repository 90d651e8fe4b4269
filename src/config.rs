use std::net::SocketAddr;

use crate::models::MergeMode;

/// Application-level constants
pub const APP_NAME: &str = "Randplan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rendered documents are named `<prefix><protocol no.><ext>`.
pub const OUTPUT_PREFIX: &str = "Randomization Plan_";
/// Stands in for the protocol number when the field is still empty.
pub const OUTPUT_PLACEHOLDER: &str = "draft";
pub const OUTPUT_EXTENSION: &str = ".docx";

const DEFAULT_ADDR: &str = "127.0.0.1:8470";
const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

/// Ceiling on the decompressed size of any single DOCX member.
pub const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "randplan_lib=info,randplan=info,tower_http=warn"
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub addr: SocketAddr,
    pub merge_mode: MergeMode,
    pub max_upload_bytes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            merge_mode: MergeMode::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl Settings {
    /// Read `RANDPLAN_ADDR`, `RANDPLAN_MERGE_MODE` and `RANDPLAN_MAX_UPLOAD_MB`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Bad values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(raw) = lookup("RANDPLAN_ADDR") {
            match raw.trim().parse::<SocketAddr>() {
                Ok(addr) => settings.addr = addr,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring invalid RANDPLAN_ADDR"),
            }
        }

        if let Some(raw) = lookup("RANDPLAN_MERGE_MODE") {
            match raw.parse::<MergeMode>() {
                Ok(mode) => settings.merge_mode = mode,
                Err(e) => tracing::warn!(error = %e, "Ignoring unknown RANDPLAN_MERGE_MODE"),
            }
        }

        if let Some(raw) = lookup("RANDPLAN_MAX_UPLOAD_MB") {
            match raw.trim().parse::<u64>().ok().filter(|mb| *mb > 0) {
                Some(mb) => match mb.checked_mul(1024 * 1024) {
                    Some(bytes) => settings.max_upload_bytes = bytes,
                    None => tracing::warn!(value = %raw, "RANDPLAN_MAX_UPLOAD_MB overflows; keeping default"),
                },
                None => tracing::warn!(value = %raw, "Ignoring invalid RANDPLAN_MAX_UPLOAD_MB"),
            }
        }

        settings
    }
}

fn default_addr() -> SocketAddr {
    DEFAULT_ADDR
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8470)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.addr.port(), 8470);
        assert_eq!(settings.merge_mode, MergeMode::FillEmpty);
        assert_eq!(settings.max_upload_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn reads_all_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("RANDPLAN_ADDR", "0.0.0.0:9000"),
            ("RANDPLAN_MERGE_MODE", "overwrite"),
            ("RANDPLAN_MAX_UPLOAD_MB", "5"),
        ]));
        assert_eq!(settings.addr.port(), 9000);
        assert_eq!(settings.merge_mode, MergeMode::Overwrite);
        assert_eq!(settings.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn invalid_values_fall_back() {
        let settings = Settings::from_lookup(lookup(&[
            ("RANDPLAN_ADDR", "not an address"),
            ("RANDPLAN_MERGE_MODE", "sometimes"),
            ("RANDPLAN_MAX_UPLOAD_MB", "0"),
        ]));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn overflowing_upload_cap_keeps_default() {
        let huge = u64::MAX.to_string();
        let settings = Settings::from_lookup(lookup(&[("RANDPLAN_MAX_UPLOAD_MB", huge.as_str())]));
        assert_eq!(settings.max_upload_bytes, 50 * 1024 * 1024);

        let settings =
            Settings::from_lookup(lookup(&[("RANDPLAN_MAX_UPLOAD_MB", "17592186044416")]));
        assert_eq!(settings.max_upload_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn app_name_is_randplan() {
        assert_eq!(APP_NAME, "Randplan");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
