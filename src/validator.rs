//! Static pre-execution scan of snippet text.
//!
//! Substring matching is evadable and is not a security boundary; it
//! blocks the common case cheaply before a worker is committed.

use crate::config::EngineConfig;

/// Returns every denylist entry found verbatim in the snippet, in
/// configuration order. Empty when sandbox mode is off.
pub fn scan(code: &str, config: &EngineConfig) -> Vec<String> {
    if !config.sandbox_mode {
        return Vec::new();
    }
    config
        .denylist_entries()
        .into_iter()
        .filter(|entry| code.contains(entry.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(denylist: &str, sandbox: bool) -> EngineConfig {
        EngineConfig {
            denylist: denylist.to_string(),
            sandbox_mode: sandbox,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_clean_snippet_passes() {
        let matches = scan("x = 1 + 2", &config("os.,exec(", true));
        assert!(matches.is_empty());
    }

    #[test]
    fn test_reports_every_match() {
        let matches = scan("exec(os.thing)", &config("os.,exec(,net.", true));
        assert_eq!(matches, vec!["os.".to_string(), "exec(".to_string()]);
    }

    #[test]
    fn test_sandbox_off_disables_scan() {
        let matches = scan("exec(os.thing)", &config("os.,exec(", false));
        assert!(matches.is_empty());
    }

    #[test]
    fn test_empty_denylist() {
        let matches = scan("anything at all", &config("", true));
        assert!(matches.is_empty());
    }
}
