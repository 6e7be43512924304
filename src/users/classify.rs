//! Heuristic affiliation classification of users.
//!
//! The rules are ordered data — a list of pattern/label pairs matched
//! against profile text fields, first match wins — so the classifier stays a
//! pure function that can be recomputed in full on every run.

use crate::Result;
use crate::users::{UserClassification, UserDetail};
use ohno::IntoAppError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Label assigned when no rule matches.
pub const FALLBACK_LABEL: &str = "unknown";

const LOG_TARGET: &str = "  classify";

/// One ordered classification rule: a case-insensitive regular expression
/// matched against a user's combined profile text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub pattern: String,
    pub label: String,
}

/// Compiled rule list.
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<(Regex, String)>,
}

impl Classifier {
    pub fn new(rules: &[ClassifierRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let regex = RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
                .into_app_err_with(|| format!("invalid classifier pattern '{}'", rule.pattern))?;
            compiled.push((regex, rule.label.clone()));
        }

        Ok(Self { rules: compiled })
    }

    /// Label a single user from their profile fields.
    #[must_use]
    pub fn classify(&self, detail: &UserDetail) -> &str {
        let haystack = [
            detail.company.as_deref(),
            detail.bio.as_deref(),
            detail.blog.as_deref(),
            detail.email.as_deref(),
            Some(detail.orgs.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n");

        self.rules
            .iter()
            .find(|(regex, _)| regex.is_match(&haystack))
            .map_or(FALLBACK_LABEL, |(_, label)| label)
    }

    /// Classify the full details table.
    #[must_use]
    pub fn classify_all(&self, details: &[UserDetail]) -> Vec<UserClassification> {
        let classifications: Vec<_> = details
            .iter()
            .map(|detail| UserClassification {
                username: detail.username.clone(),
                label: self.classify(detail).to_string(),
            })
            .collect();

        log::info!(target: LOG_TARGET, "Classified {} users", classifications.len());
        classifications
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<ClassifierRule> {
        vec![
            ClassifierRule {
                pattern: r"univ|institut|college|\.edu\b|professor|postdoc|phd".to_string(),
                label: "academia".to_string(),
            },
            ClassifierRule {
                pattern: r"ministry|government|agency".to_string(),
                label: "public-sector".to_string(),
            },
            ClassifierRule {
                pattern: r"gmbh|\binc\b|\bltd\b|consult".to_string(),
                label: "industry".to_string(),
            },
        ]
    }

    fn detail(company: Option<&str>, bio: Option<&str>, email: Option<&str>) -> UserDetail {
        UserDetail {
            username: "u".to_string(),
            name: None,
            company: company.map(String::from),
            blog: None,
            location: None,
            email: email.map(String::from),
            bio: bio.map(String::from),
            twitter_username: None,
            followers: 0,
            following: 0,
            repos: String::new(),
            orgs: String::new(),
        }
    }

    #[test]
    fn matches_are_case_insensitive() {
        let classifier = Classifier::new(&rules()).unwrap();
        assert_eq!(classifier.classify(&detail(Some("TU Berlin University"), None, None)), "academia");
        assert_eq!(classifier.classify(&detail(Some("ACME GmbH"), None, None)), "industry");
    }

    #[test]
    fn first_matching_rule_wins() {
        let classifier = Classifier::new(&rules()).unwrap();
        // Both an academia and an industry pattern match; rule order decides.
        let d = detail(Some("University spin-off GmbH"), None, None);
        assert_eq!(classifier.classify(&d), "academia");
    }

    #[test]
    fn all_profile_fields_are_considered() {
        let classifier = Classifier::new(&rules()).unwrap();
        assert_eq!(classifier.classify(&detail(None, Some("PhD student"), None)), "academia");
        assert_eq!(classifier.classify(&detail(None, None, Some("someone@example.edu"))), "academia");
    }

    #[test]
    fn unmatched_users_get_the_fallback_label() {
        let classifier = Classifier::new(&rules()).unwrap();
        assert_eq!(classifier.classify(&detail(Some("somewhere"), None, None)), FALLBACK_LABEL);
        assert_eq!(classifier.classify(&detail(None, None, None)), FALLBACK_LABEL);
    }

    #[test]
    fn classify_all_is_deterministic_and_total() {
        let classifier = Classifier::new(&rules()).unwrap();
        let details = vec![detail(Some("Uni"), None, None), detail(None, None, None)];

        let first = classifier.classify_all(&details);
        let second = classifier.classify_all(&details);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn invalid_pattern_is_a_configuration_error() {
        let bad = vec![ClassifierRule {
            pattern: "(unclosed".to_string(),
            label: "x".to_string(),
        }];
        assert!(Classifier::new(&bad).is_err());
    }
}
