use crate::config::AppConfig;

/// Split a comma separated entity list, trimming items and dropping empty ones
pub fn parse_entity_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    /// Apply overrides from process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, keeping the current value when a
    /// variable is unset or fails to parse.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HA_URL") {
            self.home_assistant.url = v;
        }
        if let Some(v) = lookup("HA_TOKEN") {
            self.home_assistant.token = v;
        }
        if let Some(v) = lookup("WHEREABOUTS_ENTITIES") {
            self.poller.entities = parse_entity_list(&v);
        }
        if let Some(v) = lookup("WHEREABOUTS_POLL_INTERVAL_MS") {
            if let Ok(n) = v.parse::<u64>() {
                self.poller.poll_interval_ms = n;
            }
        }
        if let Some(v) = lookup("WHEREABOUTS_CONCURRENCY") {
            if let Ok(n) = v.parse::<usize>() {
                self.poller.concurrency = n;
            }
        }
        if let Some(v) = lookup("WHEREABOUTS_BOOTSTRAP_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                self.poller.bootstrap_secs = n;
            }
        }
        if let Some(v) = lookup("WHEREABOUTS_RING_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                self.store.ring_size = n;
            }
        }
        if let Some(v) = lookup("WHEREABOUTS_FILTER") {
            if let Ok(b) = v.parse::<bool>() {
                self.store.filter = b;
            }
        }
        if let Some(v) = lookup("WHEREABOUTS_LISTEN") {
            self.server.listen = v;
        }
        if let Some(v) = lookup("WHEREABOUTS_LOG_LEVEL") {
            self.log_level = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_parse_entity_list() {
        assert_eq!(
            parse_entity_list("person.alice, device_tracker.phone,,  person.bob "),
            vec!["person.alice", "device_tracker.phone", "person.bob"]
        );
        assert!(parse_entity_list("").is_empty());
        assert_eq!(parse_entity_list("person.alice"), vec!["person.alice"]);
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup_from(&[
            ("HA_URL", "http://ha.local:8123"),
            ("HA_TOKEN", "secret"),
            ("WHEREABOUTS_ENTITIES", "person.alice,person.bob"),
            ("WHEREABOUTS_POLL_INTERVAL_MS", "250"),
            ("WHEREABOUTS_CONCURRENCY", "8"),
            ("WHEREABOUTS_BOOTSTRAP_SECS", "3600"),
            ("WHEREABOUTS_RING_SIZE", "10"),
            ("WHEREABOUTS_FILTER", "true"),
            ("WHEREABOUTS_LISTEN", "127.0.0.1:9000"),
            ("WHEREABOUTS_LOG_LEVEL", "trace"),
        ]));

        assert_eq!(config.home_assistant.url, "http://ha.local:8123");
        assert_eq!(config.home_assistant.token, "secret");
        assert_eq!(config.poller.entities, vec!["person.alice", "person.bob"]);
        assert_eq!(config.poller.poll_interval_ms, 250);
        assert_eq!(config.poller.concurrency, 8);
        assert_eq!(config.poller.bootstrap_secs, 3600);
        assert_eq!(config.store.ring_size, 10);
        assert!(config.store.filter);
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_unparseable_values_keep_defaults() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup_from(&[
            ("WHEREABOUTS_CONCURRENCY", "many"),
            ("WHEREABOUTS_FILTER", "yes please"),
        ]));

        assert_eq!(config.poller.concurrency, 2);
        assert!(!config.store.filter);
    }
}
