//! Taint sink rules
//!
//! Call expressions are tested by their canonical callee name, so module
//! calls keep their import spelling: `require('fs').readFile`,
//! `require('child_process').exec`. Same matching discipline as sources:
//! anchored at position zero, ordered, first match wins.

use regex::Regex;

#[derive(Debug, Clone)]
pub struct SinkRule {
    pub name: String,
    pattern: Regex,
}

impl SinkRule {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: pattern.to_string(),
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn matches(&self, raw: &str) -> bool {
        self.pattern.find(raw).is_some_and(|m| m.start() == 0)
    }
}

#[derive(Debug, Clone)]
pub struct SinksRegistry {
    rules: Vec<SinkRule>,
}

impl SinksRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        let patterns = [
            "^eval$",
            "^setTimeout$",
            "^clearTimeout$",
            "^setInterval$",
            "^clearInterval$",
            "^require\\('child_process'\\).exec$",
            "^require\\('http'\\).get$",
            "^require\\('fs'\\).*$",
            "^require\\('express'\\).*$",
            "^require\\('hapi'\\).*$",
            "^require\\('mongodb'\\).MongoClient.connect$",
        ];

        for pattern in patterns {
            if let Ok(rule) = SinkRule::new(pattern) {
                self.register(rule);
            }
        }
    }

    pub fn register(&mut self, rule: SinkRule) {
        self.rules.push(rule);
    }

    pub fn register_pattern(&mut self, pattern: &str) -> Result<(), regex::Error> {
        let rule = SinkRule::new(pattern)?;
        self.register(rule);
        Ok(())
    }

    pub fn find_match(&self, name: &str) -> Option<&SinkRule> {
        self.rules.iter().find(|rule| rule.matches(name))
    }

    pub fn is_sink(&self, name: &str) -> bool {
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

impl Default for SinksRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_eval_family() {
        let registry = SinksRegistry::with_defaults();

        assert!(registry.is_sink("eval"));
        assert!(registry.is_sink("setTimeout"));
        assert!(registry.is_sink("clearInterval"));
    }

    #[test]
    fn eval_pattern_is_exact() {
        let registry = SinksRegistry::with_defaults();

        assert!(!registry.is_sink("evaluate"));
        assert!(!registry.is_sink("myEval"));
    }

    #[test]
    fn defaults_match_module_call_spellings() {
        let registry = SinksRegistry::with_defaults();

        assert!(registry.is_sink("require('child_process').exec"));
        assert!(registry.is_sink("require('http').get"));
        assert!(registry.is_sink("require('fs').readFile"));
        assert!(registry.is_sink("require('fs').writeFileSync"));
        assert!(registry.is_sink("require('mongodb').MongoClient.connect"));
    }

    #[test]
    fn defaults_match_framework_wildcards() {
        let registry = SinksRegistry::with_defaults();

        assert!(registry.is_sink("require('express')().get"));
        assert!(registry.is_sink("require('hapi').Server().route"));
    }

    #[test]
    fn defaults_reject_unrelated_calls() {
        let registry = SinksRegistry::with_defaults();

        assert!(!registry.is_sink("console.log"));
        assert!(!registry.is_sink("require('path').join"));
        assert!(!registry.is_sink("JSON.parse"));
    }

    #[test]
    fn first_match_wins_in_order() {
        let mut registry = SinksRegistry::new();
        registry.register_pattern("^db\\..*$").unwrap();
        registry.register_pattern("^db\\.query$").unwrap();

        let rule = registry.find_match("db.query").unwrap();
        assert_eq!(rule.name, "^db\\..*$");
    }

    #[test]
    fn custom_pattern_extends_defaults() {
        let mut registry = SinksRegistry::with_defaults();
        registry.register_pattern("^db\\.query$").unwrap();

        assert!(registry.is_sink("eval"));
        assert!(registry.is_sink("db.query"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let mut registry = SinksRegistry::new();

        assert!(registry.register_pattern("(?P<").is_err());
    }

    #[test]
    fn default_count_is_stable() {
        let registry = SinksRegistry::with_defaults();

        assert_eq!(registry.len(), 11);
    }
}
