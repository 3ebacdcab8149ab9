//! Keyword categorization
//!
//! Tasks are labelled by scanning the lower-cased text for keywords. Tables
//! are checked in order and the first category with a matching keyword wins.
//! Keywords match as substrings, so "know" hits `now`.

use crate::task::Category;

/// An ordered keyword table
#[derive(Debug, Clone)]
pub struct KeywordRules {
    rules: Vec<(Category, Vec<&'static str>)>,
}

impl KeywordRules {
    /// The table served by the categorization API
    pub fn service() -> Self {
        Self {
            rules: vec![
                (
                    Category::Work,
                    vec![
                        "meeting",
                        "report",
                        "email",
                        "deadline",
                        "project",
                        "presentation",
                        "client",
                    ],
                ),
                (
                    Category::Personal,
                    vec!["gym", "doctor", "appointment", "groceries", "shopping", "family"],
                ),
                (
                    Category::Urgent,
                    vec!["urgent", "asap", "immediately", "critical", "now"],
                ),
                (
                    Category::Finance,
                    vec!["bill", "payment", "invoice", "budget", "tax", "bank"],
                ),
                (
                    Category::Learning,
                    vec!["study", "learn", "course", "read", "tutorial", "skill"],
                ),
            ],
        }
    }

    /// The small table the client uses when the API is unreachable
    pub fn offline() -> Self {
        Self {
            rules: vec![
                (Category::Work, vec!["meeting", "report", "email"]),
                (Category::Personal, vec!["buy", "groceries", "gym"]),
                (Category::Urgent, vec!["urgent", "asap"]),
            ],
        }
    }

    /// Pick a category for `text`, `General` when nothing matches
    pub fn categorize(&self, text: &str) -> Category {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(Category::General)
    }
}
