//! Descriptive metadata for the checks that produce findings, keyed by
//! `(category, check id)`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata for one check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub category: String,
    pub check_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<String, Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule set from `[[rules]]` entries of the config file.
    pub fn from_config(rules: &[Rule]) -> Self {
        let mut set = Self::new();
        for rule in rules {
            set.add_rule(rule.clone());
        }
        set
    }

    /// Insert a rule; a later rule with the same key replaces the earlier one.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.insert(rule_key(&rule.category, &rule.check_id), rule);
    }

    pub fn contains(&self, category: &str, check_id: &str) -> bool {
        self.rules.contains_key(&rule_key(category, check_id))
    }

    pub fn get(&self, category: &str, check_id: &str) -> Option<&Rule> {
        self.rules.get(&rule_key(category, check_id))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules ordered by category, then check id
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        let mut rules: Vec<_> = self.rules.values().collect();
        rules.sort_by(|a, b| (&a.category, &a.check_id).cmp(&(&b.category, &b.check_id)));
        rules.into_iter()
    }
}

fn rule_key(category: &str, check_id: &str) -> String {
    format!("{}#{}", category, check_id)
}

/// List all configured rules
pub fn list_rules(rules: &RuleSet) {
    println!();
    println!("📋 dryreport — Configured Rules");
    println!("{}", "━".repeat(55));
    println!();

    for rule in rules.iter() {
        println!("  {}#{}  {}", rule.category, rule.check_id, rule.name);
        if !rule.description.is_empty() {
            println!("     {}", rule.description);
        }
        if !rule.url.is_empty() {
            println!("     {}", rule.url);
        }
        println!();
    }

    println!("{}", "━".repeat(55));
    println!("  {} rules loaded", rules.len());
    println!();
    if rules.is_empty() {
        println!("  Add [[rules]] entries to .dryreport.toml to describe your checks");
        println!();
    }
}
