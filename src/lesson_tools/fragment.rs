//! Heuristics for extracted values that look like a corrupted fragment.
//!
//! A flagged value is handed back to the editor for a manual look; nothing here
//! rejects or rewrites text.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::lesson_tools::types::{PlanField, WeeklyPlanRecord};

/// Longest single word still considered a plausible label rather than content.
const SHORT_WORD_MAX_CHARS: usize = 12;

const DANGLING_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "in", "of", "on", "or", "the",
    "to", "with",
];

static SLASH_JOINED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w'-]+(?:/[\w'-]+)+$").expect("slash joined"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FragmentRule {
    /// One short word where a sentence was expected (`Paper`).
    SingleShortWord,
    /// A lone `-ing` word (`Understanding`).
    LoneGerund,
    /// Words glued with slashes and nothing else (`Reading/Writing`).
    SlashJoined,
    /// Ends on a connective or separator, so the sentence was cut (`Identify the`).
    DanglingEnding,
    /// More opening than closing brackets (`Discuss (10 minutes`).
    UnbalancedBracket,
}

impl FragmentRule {
    pub const ALL: [FragmentRule; 5] = [
        FragmentRule::SingleShortWord,
        FragmentRule::LoneGerund,
        FragmentRule::SlashJoined,
        FragmentRule::DanglingEnding,
        FragmentRule::UnbalancedBracket,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FragmentRule::SingleShortWord => "single_short_word",
            FragmentRule::LoneGerund => "lone_gerund",
            FragmentRule::SlashJoined => "slash_joined",
            FragmentRule::DanglingEnding => "dangling_ending",
            FragmentRule::UnbalancedBracket => "unbalanced_bracket",
        }
    }

    /// Whether `text` trips this rule. Blank text never does.
    pub fn matches(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        match self {
            FragmentRule::SingleShortWord => {
                is_single_word(text) && text.chars().count() <= SHORT_WORD_MAX_CHARS
            }
            FragmentRule::LoneGerund => {
                is_single_word(text)
                    && text.chars().count() > 4
                    && text.to_lowercase().ends_with("ing")
            }
            FragmentRule::SlashJoined => SLASH_JOINED.is_match(text),
            FragmentRule::DanglingEnding => {
                if text.ends_with([',', ':', ';', '-', '/', '(']) {
                    return true;
                }
                let last = text
                    .split_whitespace()
                    .last()
                    .unwrap_or_default()
                    .to_lowercase();
                text.split_whitespace().count() > 1 && DANGLING_WORDS.contains(&last.as_str())
            }
            FragmentRule::UnbalancedBracket => {
                let open = text.matches(['(', '[']).count();
                let close = text.matches([')', ']']).count();
                open > close
            }
        }
    }
}

impl fmt::Display for FragmentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_single_word(text: &str) -> bool {
    !text.contains(char::is_whitespace) && text.chars().any(char::is_alphabetic)
}

/// Every rule `text` trips, in rule order.
pub fn fragment_flags(text: &str) -> Vec<FragmentRule> {
    FragmentRule::ALL
        .into_iter()
        .filter(|rule| rule.matches(text))
        .collect()
}

pub fn looks_like_fragment(text: &str) -> bool {
    FragmentRule::ALL.iter().any(|rule| rule.matches(text))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SuspiciousField {
    pub field: String,
    pub rules: Vec<FragmentRule>,
}

impl WeeklyPlanRecord {
    /// Content fields whose value trips at least one heuristic.
    ///
    /// Header and resource fields are short by nature and are not checked.
    pub fn suspicious_fields(&self) -> Vec<SuspiciousField> {
        PlanField::all()
            .into_iter()
            .filter(|field| {
                matches!(
                    field,
                    PlanField::Objective(_) | PlanField::Content(_) | PlanField::Step(..)
                )
            })
            .filter_map(|field| {
                let rules = fragment_flags(self.field(field));
                (!rules.is_empty()).then(|| SuspiciousField {
                    field: field.to_string(),
                    rules,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson_tools::types::SchoolDay;

    #[test]
    fn single_short_word() {
        assert!(FragmentRule::SingleShortWord.matches("Paper"));
        assert!(!FragmentRule::SingleShortWord.matches("Photosynthesis"));
        assert!(!FragmentRule::SingleShortWord.matches("Read the story"));
        assert!(!FragmentRule::SingleShortWord.matches("42"));
    }

    #[test]
    fn lone_gerund() {
        assert!(FragmentRule::LoneGerund.matches("Understanding"));
        assert!(FragmentRule::LoneGerund.matches("  reading "));
        assert!(!FragmentRule::LoneGerund.matches("Sing"));
        assert!(!FragmentRule::LoneGerund.matches("Reading aloud together"));
    }

    #[test]
    fn slash_joined() {
        assert!(FragmentRule::SlashJoined.matches("Reading/Writing"));
        assert!(FragmentRule::SlashJoined.matches("pen/paper/ruler"));
        assert!(!FragmentRule::SlashJoined.matches("Use pen/paper for notes"));
    }

    #[test]
    fn dangling_ending() {
        assert!(FragmentRule::DanglingEnding.matches("Students will identify the"));
        assert!(FragmentRule::DanglingEnding.matches("Materials:"));
        assert!(!FragmentRule::DanglingEnding.matches("Students will identify nouns."));
        assert!(!FragmentRule::DanglingEnding.matches("and"));
    }

    #[test]
    fn unbalanced_bracket() {
        assert!(FragmentRule::UnbalancedBracket.matches("Discuss (10 minutes"));
        assert!(!FragmentRule::UnbalancedBracket.matches("Discuss (10 minutes)"));
    }

    #[test]
    fn flags_collect_every_rule_and_ignore_blank_text() {
        assert_eq!(
            fragment_flags("Reading"),
            vec![FragmentRule::SingleShortWord, FragmentRule::LoneGerund]
        );
        assert!(fragment_flags("   ").is_empty());
        assert!(!looks_like_fragment(
            "Students compare fractions using number lines."
        ));
    }

    #[test]
    fn suspicious_fields_cover_day_content_only() {
        let mut record = WeeklyPlanRecord {
            school: "X".into(),
            ..Default::default()
        };
        record.day_mut(SchoolDay::Monday).objective = "Counting".into();
        record.day_mut(SchoolDay::Friday).steps[2] = "Show examples of the".into();
        record.day_mut(SchoolDay::Friday).steps[3] = "Discuss the new concept.".into();

        let flagged = record.suspicious_fields();
        let fields: Vec<&str> = flagged.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["monday.objective", "friday.step_c"]);
        assert_eq!(flagged[1].rules, vec![FragmentRule::DanglingEnding]);
    }
}
