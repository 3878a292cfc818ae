use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::ServiceResult;
use crate::lesson_tools::daily::expect_text;
use crate::lesson_tools::markdown::{clean_markdown, normalize_text};
use crate::lesson_tools::sections::{
    extract_labeled, find_section, labeled_value, HeadingLevel, SectionMatcher, SectionSpec,
};
use crate::lesson_tools::types::{
    DayPlan, PlanField, SchoolDay, WeeklyPlanForm, WeeklyPlanRecord, STEP_LABELS,
};

const OBJECTIVE: SectionSpec =
    SectionSpec::new("objective", &["Objectives", "Objective", "Learning Objectives"]);
const CONTENT: SectionSpec = SectionSpec::new("content", &["Content", "Subject Matter", "Topic"]);
const PROCEDURE: SectionSpec =
    SectionSpec::new("procedure", &["Procedures", "Procedure", "Learning Activities"]);

struct WeeklyMatchers {
    days: Vec<(SchoolDay, SectionMatcher)>,
    objective: SectionMatcher,
    content: SectionMatcher,
    procedure: SectionMatcher,
    steps: Vec<Regex>,
    step_boundary: Regex,
    header: Vec<(PlanField, Regex)>,
}

static MATCHERS: LazyLock<WeeklyMatchers> = LazyLock::new(|| {
    let days = SchoolDay::ALL
        .into_iter()
        .map(|day| {
            let spec = SectionSpec::new(day.as_str(), day_aliases(day));
            (day, SectionMatcher::new(spec, HeadingLevel::Section))
        })
        .collect();
    let [objective, content, procedure] =
        [OBJECTIVE, CONTENT, PROCEDURE].map(|spec| SectionMatcher::new(spec, HeadingLevel::Subsection));
    let steps = STEP_LABELS
        .iter()
        .map(|label| {
            Regex::new(&format!(r"(?m)^[ \t]*(?:[-*][ \t]+)?\**{label}[.)]\**(?:[ \t]+|$)"))
                .expect("step label pattern")
        })
        .collect();
    // a label needs whitespace or end of line after it, so `E.g.` stays in the step
    let step_boundary = Regex::new(r"(?m)^[ \t]*(?:[-*][ \t]+)?\**[A-J][.)]\**(?:[ \t]|$)")
        .expect("step boundary pattern");
    let header = vec![
        (PlanField::School, labeled_value(&["School Name", "School"])),
        (PlanField::Teacher, labeled_value(&["Teacher Name", "Teacher"])),
        (
            PlanField::TeachingDate,
            labeled_value(&["Teaching Dates and Time", "Teaching Dates", "Teaching Date", "Week of"]),
        ),
        (
            PlanField::Guide,
            labeled_value(&["Teacher's Guide Pages", "Teacher's Guide", "Teacher Guide", "TG"]),
        ),
        (
            PlanField::Materials,
            labeled_value(&[
                "Learner's Materials Pages",
                "Learner's Materials",
                "Learner Materials",
                "LM",
            ]),
        ),
        (
            PlanField::TextbookPages,
            labeled_value(&["Textbook Pages", "Textbook"]),
        ),
        (
            PlanField::PortalLink,
            labeled_value(&[
                "Additional Materials from Learning Resource Portal",
                "Learning Resource Portal",
                "LR Portal",
                "Portal Link",
            ]),
        ),
        (
            PlanField::Other,
            labeled_value(&["Other Learning Resources", "Other Resources"]),
        ),
    ];
    WeeklyMatchers {
        days,
        objective,
        content,
        procedure,
        steps,
        step_boundary,
        header,
    }
});

fn day_aliases(day: SchoolDay) -> &'static [&'static str] {
    match day {
        SchoolDay::Monday => &["Monday", "Day 1"],
        SchoolDay::Tuesday => &["Tuesday", "Day 2"],
        SchoolDay::Wednesday => &["Wednesday", "Day 3"],
        SchoolDay::Thursday => &["Thursday", "Day 4"],
        SchoolDay::Friday => &["Friday", "Day 5"],
    }
}

/// Parse a weekly plan from AI text alone. Every value is cleaned; absent parts stay empty.
pub fn parse_weekly_plan(text: &str) -> WeeklyPlanRecord {
    let text = normalize_text(text);
    let matchers = &*MATCHERS;
    let mut record = WeeklyPlanRecord::default();

    for (field, pattern) in &matchers.header {
        *record.field_mut(*field) = clean_markdown(&extract_labeled(&text, pattern));
    }

    for (day, matcher) in &matchers.days {
        if let Some(span) = matcher.find(&text) {
            *record.day_mut(*day) = parse_day(*day, span.body, matchers);
        }
    }

    record
}

fn parse_day(day: SchoolDay, body: &str, matchers: &WeeklyMatchers) -> DayPlan {
    let mut plan = DayPlan::new(day);
    plan.objective = clean_markdown(&matchers.objective.extract(body));
    plan.content = clean_markdown(&matchers.content.extract(body));

    // without a procedure heading the step labels are looked up in the whole day
    let procedure = matchers
        .procedure
        .find(body)
        .map(|span| span.body)
        .unwrap_or(body);
    for (slot, pattern) in plan.steps.iter_mut().zip(&matchers.steps) {
        if let Some(span) = find_section(procedure, pattern, &matchers.step_boundary) {
            *slot = clean_markdown(span.body);
        }
    }
    plan
}

/// Build the record for one generation request: extracted values win, the form fills gaps.
pub fn build_weekly_plan(text: &str, form: &WeeklyPlanForm) -> WeeklyPlanRecord {
    let mut record = parse_weekly_plan(text);
    apply_form_fallback(&mut record, form);
    record
}

pub fn build_weekly_value(value: &Value, form: &WeeklyPlanForm) -> ServiceResult<WeeklyPlanRecord> {
    Ok(build_weekly_plan(expect_text(value)?, form))
}

fn apply_form_fallback(record: &mut WeeklyPlanRecord, form: &WeeklyPlanForm) {
    let fallbacks = [
        (PlanField::School, &form.school),
        (PlanField::Teacher, &form.teacher),
        (PlanField::TeachingDate, &form.teaching_date),
        (PlanField::Guide, &form.guide),
        (PlanField::Materials, &form.materials),
        (PlanField::TextbookPages, &form.textbook_pages),
        (PlanField::PortalLink, &form.portal_link),
        (PlanField::Other, &form.other),
    ];
    for (field, value) in fallbacks {
        fill_if_empty(record.field_mut(field), value);
    }
    for (day, value) in &form.objectives {
        fill_if_empty(&mut record.day_mut(*day).objective, value);
    }
    for (day, value) in &form.content {
        fill_if_empty(&mut record.day_mut(*day).content, value);
    }
}

fn fill_if_empty(slot: &mut String, fallback: &str) {
    if slot.trim().is_empty() && !fallback.trim().is_empty() {
        *slot = fallback.trim().to_string();
    }
}
