use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::{ServiceError, ServiceResult};
use crate::lesson_tools::markdown::{clean_markdown, normalize_text};
use crate::lesson_tools::sections::{
    compile_table, extract_all, extract_labeled, extract_list, extract_number, extract_subsections,
    labeled_value, HeadingLevel, SectionMatcher, SectionSpec,
};
use crate::lesson_tools::types::{DailyLessonPlan, LessonMetadata};

/// Top-level sections, in the order they are evaluated.
pub const DAILY_SECTIONS: &[SectionSpec] = &[
    SectionSpec::new(
        "metadata",
        &["Metadata", "Lesson Information", "Lesson Details", "Lesson Overview"],
    ),
    SectionSpec::new(
        "learning_objectives",
        &["Learning Objectives", "Objectives", "Learning Competencies"],
    ),
    SectionSpec::new("subject_matter", &["Subject Matter", "Content", "Topic"]),
    SectionSpec::new(
        "materials_needed",
        &["Materials Needed", "Materials", "Learning Resources", "Resources"],
    ),
    SectionSpec::new(
        "procedure",
        &[
            "Procedure",
            "Procedures",
            "Lesson Procedure",
            "Teaching Procedure",
            "Learning Activities",
        ],
    ),
    SectionSpec::new(
        "differentiation",
        &[
            "Differentiation",
            "Differentiated Instruction",
            "Differentiation Strategies",
        ],
    ),
];

/// Subsections of `procedure`; each may carry a `(N minutes)` token.
pub const PROCEDURE_SECTIONS: &[SectionSpec] = &[
    SectionSpec::new(
        "introduction",
        &["Introduction", "Motivation", "Warm-Up", "Warm Up", "Engage"],
    ),
    SectionSpec::new(
        "instruction",
        &[
            "Direct Instruction",
            "Instruction",
            "Presentation",
            "Lesson Proper",
            "Discussion",
            "Explore",
        ],
    ),
    SectionSpec::new(
        "guided_practice",
        &["Guided Practice", "Group Activity", "Explain"],
    ),
    SectionSpec::new(
        "independent_practice",
        &["Independent Practice", "Application", "Elaborate"],
    ),
    SectionSpec::new("assessment", &["Assessment", "Evaluation", "Evaluate"]),
    SectionSpec::new(
        "closure",
        &["Closure", "Generalization", "Wrap-Up", "Wrap Up", "Summary"],
    ),
];

/// Subsections of `differentiation`, one per learner group; timed like the procedure.
pub const DIFFERENTIATION_SECTIONS: &[SectionSpec] = &[
    SectionSpec::new(
        "struggling_learners",
        &[
            "For Struggling Learners",
            "Struggling Learners",
            "Remediation",
            "Support",
        ],
    ),
    SectionSpec::new(
        "advanced_learners",
        &[
            "For Advanced Learners",
            "Advanced Learners",
            "Enrichment",
            "Extension",
        ],
    ),
    SectionSpec::new(
        "special_needs",
        &[
            "For Learners with Special Needs",
            "Learners with Special Needs",
            "Special Needs",
            "Accommodations",
            "English Language Learners",
        ],
    ),
];

static SECTIONS: LazyLock<Vec<SectionMatcher>> =
    LazyLock::new(|| compile_table(DAILY_SECTIONS, HeadingLevel::Section));
static PROCEDURE: LazyLock<Vec<SectionMatcher>> =
    LazyLock::new(|| compile_table(PROCEDURE_SECTIONS, HeadingLevel::Subsection));
static DIFFERENTIATION: LazyLock<Vec<SectionMatcher>> =
    LazyLock::new(|| compile_table(DIFFERENTIATION_SECTIONS, HeadingLevel::Subsection));

struct MetadataPatterns {
    subject: Regex,
    grade_level: Regex,
    topic: Regex,
    quarter: Regex,
    duration: Regex,
    class_size: Regex,
}

static METADATA: LazyLock<MetadataPatterns> = LazyLock::new(|| MetadataPatterns {
    subject: labeled_value(&["Subject Area", "Subject"]),
    grade_level: labeled_value(&["Grade Level", "Grade", "Year Level"]),
    topic: labeled_value(&["Topic", "Lesson Title", "Title"]),
    quarter: labeled_value(&["Quarter", "Term"]),
    duration: labeled_value(&["Duration", "Time Allotment", "Time Allocation"]),
    class_size: labeled_value(&[
        "Class Size",
        "Number of Students",
        "Number of Learners",
        "Population",
    ]),
});

/// Parse one daily lesson plan. Never fails: absent parts come back empty or zero.
pub fn parse_daily_plan(text: &str) -> DailyLessonPlan {
    let text = normalize_text(text);
    let sections = extract_all(&text, &SECTIONS);

    let metadata = &sections["metadata"];
    // some generations skip the heading and open with the labeled lines directly
    let metadata_source = if metadata.is_empty() { &text } else { metadata };

    DailyLessonPlan {
        metadata_fields: parse_metadata(metadata_source),
        learning_objectives: extract_list(&sections["learning_objectives"]),
        materials_needed: extract_list(&sections["materials_needed"]),
        procedure: extract_subsections(&sections["procedure"], &PROCEDURE),
        differentiation: extract_subsections(&sections["differentiation"], &DIFFERENTIATION),
        markdown_output: clean_markdown(&text),
        sections,
    }
}

fn parse_metadata(text: &str) -> LessonMetadata {
    let patterns = &*METADATA;
    LessonMetadata {
        subject: extract_labeled(text, &patterns.subject),
        grade_level: extract_labeled(text, &patterns.grade_level),
        topic: extract_labeled(text, &patterns.topic),
        quarter: extract_labeled(text, &patterns.quarter),
        duration_minutes: extract_number(text, &patterns.duration, 0),
        class_size: extract_number(text, &patterns.class_size, 0),
    }
}

/// Entry point for untyped callers: anything but a JSON string is an input-shape error.
pub fn parse_daily_value(value: &Value) -> ServiceResult<DailyLessonPlan> {
    Ok(parse_daily_plan(expect_text(value)?))
}

pub fn expect_text(value: &Value) -> ServiceResult<&str> {
    value.as_str().ok_or_else(|| {
        let kind = match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        };
        ServiceError::InvalidInput(format!("lesson text must be a string, got {kind}"))
    })
}
