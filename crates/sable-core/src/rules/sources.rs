//! Taint source rules
//!
//! Ordered regex patterns matched against canonical expression names. A
//! pattern matches only at the start of the name; the first matching rule
//! wins. The registry is extended before an analysis run and immutable
//! during it.

use regex::Regex;

#[derive(Debug, Clone)]
pub struct SourceRule {
    pub name: String,
    pattern: Regex,
}

impl SourceRule {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: pattern.to_string(),
            pattern: Regex::new(pattern)?,
        })
    }

    /// Match anchored at position zero, regardless of the pattern's own
    /// anchoring.
    pub fn matches(&self, raw: &str) -> bool {
        self.pattern.find(raw).is_some_and(|m| m.start() == 0)
    }
}

#[derive(Debug, Clone)]
pub struct SourcesRegistry {
    rules: Vec<SourceRule>,
}

impl SourcesRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        let patterns = ["^process.*$"];

        for pattern in patterns {
            if let Ok(rule) = SourceRule::new(pattern) {
                self.register(rule);
            }
        }
    }

    pub fn register(&mut self, rule: SourceRule) {
        self.rules.push(rule);
    }

    pub fn register_pattern(&mut self, pattern: &str) -> Result<(), regex::Error> {
        let rule = SourceRule::new(pattern)?;
        self.register(rule);
        Ok(())
    }

    /// First rule matching `name`, in registration order.
    pub fn find_match(&self, name: &str) -> Option<&SourceRule> {
        self.rules.iter().find(|rule| rule.matches(name))
    }

    pub fn is_source(&self, name: &str) -> bool {
        self.find_match(name).is_some()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for SourcesRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_process_paths() {
        let registry = SourcesRegistry::with_defaults();

        assert!(registry.is_source("process"));
        assert!(registry.is_source("process.argv"));
        assert!(registry.is_source("process.argv[2]"));
        assert!(registry.is_source("process.env.PATH"));
    }

    #[test]
    fn defaults_reject_non_sources() {
        let registry = SourcesRegistry::with_defaults();

        assert!(!registry.is_source("console.log"));
        assert!(!registry.is_source("fs.readFile"));
    }

    #[test]
    fn match_is_anchored_at_start() {
        let mut registry = SourcesRegistry::new();
        registry.register_pattern("argv").unwrap();

        assert!(registry.is_source("argv"));
        assert!(registry.is_source("argv[0]"));
        assert!(!registry.is_source("process.argv"));
    }

    #[test]
    fn first_match_wins() {
        let mut registry = SourcesRegistry::new();
        registry.register_pattern("^req\\.").unwrap();
        registry.register_pattern("^req\\.query").unwrap();

        let rule = registry.find_match("req.query.id").unwrap();
        assert_eq!(rule.name, "^req\\.");
    }

    #[test]
    fn custom_pattern_extends_defaults() {
        let mut registry = SourcesRegistry::with_defaults();
        registry.register_pattern("^req\\.(query|body|params)").unwrap();

        assert!(registry.is_source("process.argv"));
        assert!(registry.is_source("req.query.id"));
        assert!(!registry.is_source("request.query"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let mut registry = SourcesRegistry::new();

        assert!(registry.register_pattern("[unclosed").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn patterns_lists_in_order() {
        let mut registry = SourcesRegistry::with_defaults();
        registry.register_pattern("^flag\\.").unwrap();

        let patterns: Vec<&str> = registry.patterns().collect();
        assert_eq!(patterns, vec!["^process.*$", "^flag\\."]);
    }

    #[test]
    fn empty_registry_matches_nothing() {
        let registry = SourcesRegistry::new();

        assert!(!registry.is_source("process.argv"));
    }
}
