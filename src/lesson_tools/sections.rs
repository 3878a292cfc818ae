//! Heading-delimited section extraction.
//!
//! Sections are ATX headings: `## Name` opens a top-level section and `### Name`
//! opens a subsection. A capture runs from the end of the heading line up to the
//! next heading of the same or a higher level, or the end of the text. Because
//! every capture stops at the first boundary, captures never overlap and never
//! swallow a sibling heading.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::lesson_tools::types::TimedSection;

/// Heading depth of a section table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadingLevel {
    Section,
    Subsection,
}

impl HeadingLevel {
    fn hashes(self) -> &'static str {
        match self {
            HeadingLevel::Section => "##",
            HeadingLevel::Subsection => "###",
        }
    }

    /// Any heading at this level or above ends a capture.
    fn boundary(self) -> &'static Regex {
        static SECTION: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?m)^#{1,2}[ \t]").expect("section boundary"));
        static SUBSECTION: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?m)^#{1,3}[ \t]").expect("subsection boundary"));
        match self {
            HeadingLevel::Section => &SECTION,
            HeadingLevel::Subsection => &SUBSECTION,
        }
    }
}

/// One row of an ordered section table: output key, accepted heading names, default.
#[derive(Clone, Copy, Debug)]
pub struct SectionSpec {
    pub key: &'static str,
    pub aliases: &'static [&'static str],
    pub default: &'static str,
}

impl SectionSpec {
    pub const fn new(key: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            key,
            aliases,
            default: "",
        }
    }
}

/// A compiled [`SectionSpec`].
#[derive(Debug)]
pub struct SectionMatcher {
    pub spec: SectionSpec,
    level: HeadingLevel,
    start: Regex,
}

impl SectionMatcher {
    pub fn new(spec: SectionSpec, level: HeadingLevel) -> Self {
        let names = spec
            .aliases
            .iter()
            .map(|alias| regex::escape(alias).replace(' ', r"[ \t]+"))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(
            r"(?im)^{}[ \t]+(?:\*\*)?(?:(?:[ivx]+|\d+)[.)][ \t]*)?(?:\*\*)?(?:{names})\b[^\n]*$",
            level.hashes()
        );
        let start = Regex::new(&pattern).expect("section heading pattern");
        Self { spec, level, start }
    }

    pub fn key(&self) -> &'static str {
        self.spec.key
    }

    pub fn find<'a>(&self, text: &'a str) -> Option<Span<'a>> {
        find_section(text, &self.start, self.level.boundary())
    }

    /// Trimmed capture, or the table default when the heading is absent.
    pub fn extract(&self, text: &str) -> String {
        self.find(text)
            .map(|span| span.body.trim().to_string())
            .unwrap_or_else(|| self.spec.default.to_string())
    }
}

pub fn compile_table(specs: &[SectionSpec], level: HeadingLevel) -> Vec<SectionMatcher> {
    specs
        .iter()
        .map(|spec| SectionMatcher::new(*spec, level))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span<'a> {
    /// The full line that opened the span.
    pub heading: &'a str,
    /// Everything after the opening match up to the boundary, untrimmed.
    pub body: &'a str,
}

/// Locate the first `start` match and capture until the next `boundary` line.
///
/// The boundary is only searched from the line after the opening match, so a
/// start pattern that ends mid-line keeps the rest of that line in the body.
pub fn find_section<'a>(text: &'a str, start: &Regex, boundary: &Regex) -> Option<Span<'a>> {
    let opening = start.find(text)?;
    let rest = &text[opening.end()..];
    let stop = match rest.find('\n') {
        Some(newline) => {
            let next_line = newline + 1;
            boundary
                .find(&rest[next_line..])
                .map(|m| next_line + m.start())
                .unwrap_or(rest.len())
        }
        None => rest.len(),
    };
    Some(Span {
        heading: opening.as_str(),
        body: &rest[..stop],
    })
}

/// Evaluate an ordered table; every key is present in the result.
pub fn extract_all(text: &str, table: &[SectionMatcher]) -> BTreeMap<String, String> {
    table
        .iter()
        .map(|matcher| (matcher.key().to_string(), matcher.extract(text)))
        .collect()
}

static DURATION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()\n]*\d[^()\n]*)\)").expect("duration token"));
static LEADING_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\(([^()\n]*\d[^()\n]*)\)").expect("leading duration"));

/// Second pass over a parent capture, splitting off the duration token of each subsection.
///
/// The token is taken from the heading line (`### Introduction (5 minutes)`) or,
/// failing that, from the very start of the body, where it is removed from the content.
pub fn extract_subsections(parent: &str, table: &[SectionMatcher]) -> BTreeMap<String, TimedSection> {
    table
        .iter()
        .map(|matcher| {
            let section = match matcher.find(parent) {
                Some(span) => timed_section(span),
                None => TimedSection {
                    time: String::new(),
                    content: matcher.spec.default.to_string(),
                },
            };
            (matcher.key().to_string(), section)
        })
        .collect()
}

fn timed_section(span: Span<'_>) -> TimedSection {
    if let Some(caps) = DURATION_TOKEN.captures(span.heading) {
        return TimedSection {
            time: caps[1].trim().to_string(),
            content: span.body.trim().to_string(),
        };
    }
    match LEADING_DURATION.captures(span.body) {
        Some(caps) => {
            let consumed = caps.get(0).map(|m| m.end()).unwrap_or(0);
            TimedSection {
                time: caps[1].trim().to_string(),
                content: span.body[consumed..].trim().to_string(),
            }
        }
        None => TimedSection {
            time: String::new(),
            content: span.body.trim().to_string(),
        },
    }
}

/// Build a case-insensitive `**Label:** value` line matcher; group 1 is the value.
pub fn labeled_value(labels: &[&str]) -> Regex {
    let names = labels
        .iter()
        .map(|label| regex::escape(label))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(
        r"(?im)^[ \t]*(?:[-*•][ \t]+)?\*{{0,2}}(?:{names})\*{{0,2}}[ \t]*:[ \t]*\*{{0,2}}[ \t]*(.*?)[ \t]*$"
    );
    Regex::new(&pattern).expect("labeled value pattern")
}

/// Value of the first labeled line, with stray bold markers trimmed.
pub fn extract_labeled(text: &str, pattern: &Regex) -> String {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches('*').trim().to_string())
        .unwrap_or_default()
}

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[*\-•][ \t]+").expect("bullet marker"));

/// Split a block on line-leading bullet markers, keeping order and dropping empty items.
///
/// Text before the first bullet is an introduction and is dropped; a block without
/// any bullet is returned as a single item.
pub fn extract_list(block: &str) -> Vec<String> {
    let mut fragments = BULLET.split(block);
    let preamble = fragments.next().unwrap_or_default();
    let items: Vec<String> = fragments
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() && !BULLET.is_match(block) {
        let single = preamble.trim();
        return if single.is_empty() {
            Vec::new()
        } else {
            vec![single.to_string()]
        };
    }
    items
}

/// Digits of `value` as an integer; no digits (or an overflowing run) gives `default`.
pub fn parse_number(value: &str, default: u32) -> u32 {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(default)
}

/// First match of `pattern` (group 1 when present) reduced to its digits.
pub fn extract_number(text: &str, pattern: &Regex, default: u32) -> u32 {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| parse_number(m.as_str(), default))
        .unwrap_or(default)
}
