//! Static mapping from topic names to the source pages visited for them.

use tracing::warn;

/// Topics and their sources, in visiting order.
pub const TOPIC_SOURCES: &[(&str, &[&str])] = &[
    (
        "tech",
        &[
            "https://techcrunch.com",
            "https://www.businessinsider.com/startups",
        ],
    ),
    ("techcrunch-latest", &["https://techcrunch.com"]),
    (
        "techcrunch-startup",
        &["https://techcrunch.com/category/startups/"],
    ),
    ("cyprus", &["https://cyprus-mail.com"]),
    (
        "cyprus-tech",
        &["https://cyprus-mail.com/category/technology"],
    ),
    (
        "business-insider",
        &["https://www.businessinsider.com/startups"],
    ),
];

/// Lowercase and trim a topic name the way lookups expect it.
pub fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}

/// Sources for `topic`, or an empty list when the topic is unknown.
pub fn sources_for_topic(topic: &str) -> Vec<String> {
    let topic = normalize_topic(topic);
    match TOPIC_SOURCES.iter().find(|(name, _)| *name == topic) {
        Some((_, sources)) => sources.iter().map(|s| s.to_string()).collect(),
        None => {
            warn!(%topic, supported = %supported_topics().join(", "), "Unknown topic");
            Vec::new()
        }
    }
}

pub fn supported_topics() -> Vec<&'static str> {
    TOPIC_SOURCES.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyprus_has_one_source() {
        assert_eq!(sources_for_topic("cyprus"), vec!["https://cyprus-mail.com"]);
    }

    #[test]
    fn test_lookup_is_trimmed_and_case_insensitive() {
        assert_eq!(
            sources_for_topic("  Business-Insider \n"),
            vec!["https://www.businessinsider.com/startups"]
        );
    }

    #[test]
    fn test_unknown_topic_has_no_sources() {
        assert!(sources_for_topic("sports").is_empty());
    }

    #[test]
    fn test_default_topic_is_configured() {
        assert!(!sources_for_topic("tech").is_empty());
        assert!(supported_topics().contains(&"tech"));
    }
}
