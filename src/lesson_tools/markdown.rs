use regex::Regex;
use std::sync::LazyLock;

static LABEL_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[[^\S\n]*(?:theme|label|topic|activity|step|note|tag)\b[^\]\n]*\]")
        .expect("label annotation")
});
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*").expect("bold marker"));
static STEP_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[^\S\n]*(?:[A-J][.)][^\S\n]+)+").expect("step label"));
static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("horizontal whitespace"));
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank lines"));

/// Normalise AI output for the plan editor.
///
/// Removes `[Theme: ...]`-style annotations, bold markers and leading `A.`..`J.`
/// step labels, then collapses horizontal whitespace, trims every line and keeps
/// at most one blank line between paragraphs. Headings and line structure are
/// preserved, so the result still parses. Applying it twice changes nothing.
pub fn clean_markdown(text: &str) -> String {
    let mut current = normalize_text(text);
    // one removal can expose another (`[**Theme**]`, `*[Label]*`), so run to a fixpoint
    loop {
        let next = strip_markup(&current);
        if next == current {
            break;
        }
        current = next;
    }
    let lines = current
        .lines()
        .map(|line| HORIZONTAL_SPACE.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_RUN.replace_all(&lines, "\n\n").trim().to_string()
}

fn strip_markup(text: &str) -> String {
    let text = LABEL_ANNOTATION.replace_all(text, "");
    let text = BOLD.replace_all(&text, "");
    STEP_LABEL.replace_all(&text, "").into_owned()
}

/// `\r\n` and lone `\r` become `\n`; curly apostrophes become straight ones.
pub fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(['\u{2019}', '\u{2018}'], "'")
}
