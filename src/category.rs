use crate::config::{CategoryRule, FALLBACK_CATEGORY};

/// Keyword lookup over an ordered rule table. Keywords are upper-cased once
/// at construction; descriptions are upper-cased per lookup.
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<(String, Vec<String>)>,
}

impl Categorizer {
    pub fn new(rules: &[CategoryRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| {
                let keywords = rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_uppercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (rule.name.clone(), keywords)
            })
            .collect();
        Self { rules }
    }

    pub fn categorize(&self, description: &str) -> &str {
        let upper = description.to_uppercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| upper.contains(k.as_str())))
            .map(|(name, _)| name.as_str())
            .unwrap_or(FALLBACK_CATEGORY)
    }
}
