use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ServiceError, ServiceResult};

/// Top-level keys every parsed daily plan carries, in document order.
pub const SECTION_KEYS: [&str; 6] = [
    "metadata",
    "learning_objectives",
    "subject_matter",
    "materials_needed",
    "procedure",
    "differentiation",
];

/// Labels of the ten procedure steps of a weekly plan day.
pub const STEP_LABELS: [char; 10] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J'];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimedSection {
    /// Duration token without its parentheses, e.g. `10 minutes`.
    pub time: String,
    pub content: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LessonMetadata {
    pub subject: String,
    pub grade_level: String,
    pub topic: String,
    pub quarter: String,
    pub duration_minutes: u32,
    pub class_size: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DailyLessonPlan {
    pub sections: BTreeMap<String, String>,
    pub metadata_fields: LessonMetadata,
    pub learning_objectives: Vec<String>,
    pub materials_needed: Vec<String>,
    pub procedure: BTreeMap<String, TimedSection>,
    pub differentiation: BTreeMap<String, TimedSection>,
    /// The input after `clean_markdown`, suitable for the plan editor.
    pub markdown_output: String,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum SchoolDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl SchoolDay {
    pub const ALL: [SchoolDay; 5] = [
        SchoolDay::Monday,
        SchoolDay::Tuesday,
        SchoolDay::Wednesday,
        SchoolDay::Thursday,
        SchoolDay::Friday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchoolDay::Monday => "monday",
            SchoolDay::Tuesday => "tuesday",
            SchoolDay::Wednesday => "wednesday",
            SchoolDay::Thursday => "thursday",
            SchoolDay::Friday => "friday",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SchoolDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchoolDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(SchoolDay::Monday),
            "tuesday" | "tue" => Ok(SchoolDay::Tuesday),
            "wednesday" | "wed" => Ok(SchoolDay::Wednesday),
            "thursday" | "thu" => Ok(SchoolDay::Thursday),
            "friday" | "fri" => Ok(SchoolDay::Friday),
            _ => Err(format!("Unknown school day: {s}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DayPlan {
    pub day: SchoolDay,
    pub objective: String,
    pub content: String,
    /// Steps A through J, in order.
    pub steps: [String; 10],
}

impl DayPlan {
    pub fn new(day: SchoolDay) -> Self {
        Self {
            day,
            objective: String::new(),
            content: String::new(),
            steps: Default::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WeeklyPlanRecord {
    pub school: String,
    pub teacher: String,
    pub teaching_date: String,
    pub days: [DayPlan; 5],
    pub guide: String,
    pub materials: String,
    pub textbook_pages: String,
    pub portal_link: String,
    pub other: String,
}

impl Default for WeeklyPlanRecord {
    fn default() -> Self {
        Self {
            school: String::new(),
            teacher: String::new(),
            teaching_date: String::new(),
            days: SchoolDay::ALL.map(DayPlan::new),
            guide: String::new(),
            materials: String::new(),
            textbook_pages: String::new(),
            portal_link: String::new(),
            other: String::new(),
        }
    }
}

/// User-submitted generation form; every value is a fallback for an empty extraction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WeeklyPlanForm {
    pub school: String,
    pub teacher: String,
    pub teaching_date: String,
    pub guide: String,
    pub materials: String,
    pub textbook_pages: String,
    pub portal_link: String,
    pub other: String,
    pub objectives: BTreeMap<SchoolDay, String>,
    pub content: BTreeMap<SchoolDay, String>,
}

/// Addressable field of a [`WeeklyPlanRecord`], written as `school` or `monday.step_c`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlanField {
    School,
    Teacher,
    TeachingDate,
    Guide,
    Materials,
    TextbookPages,
    PortalLink,
    Other,
    Objective(SchoolDay),
    Content(SchoolDay),
    Step(SchoolDay, usize),
}

impl PlanField {
    /// Every field in form order: header, days, then resources.
    pub fn all() -> Vec<PlanField> {
        let mut fields = vec![PlanField::School, PlanField::Teacher, PlanField::TeachingDate];
        for day in SchoolDay::ALL {
            fields.push(PlanField::Objective(day));
            fields.push(PlanField::Content(day));
            fields.extend((0..STEP_LABELS.len()).map(|step| PlanField::Step(day, step)));
        }
        fields.extend([
            PlanField::Guide,
            PlanField::Materials,
            PlanField::TextbookPages,
            PlanField::PortalLink,
            PlanField::Other,
        ]);
        fields
    }
}

impl fmt::Display for PlanField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanField::School => f.write_str("school"),
            PlanField::Teacher => f.write_str("teacher"),
            PlanField::TeachingDate => f.write_str("teaching_date"),
            PlanField::Guide => f.write_str("guide"),
            PlanField::Materials => f.write_str("materials"),
            PlanField::TextbookPages => f.write_str("textbook_pages"),
            PlanField::PortalLink => f.write_str("portal_link"),
            PlanField::Other => f.write_str("other"),
            PlanField::Objective(day) => write!(f, "{day}.objective"),
            PlanField::Content(day) => write!(f, "{day}.content"),
            PlanField::Step(day, step) => {
                let label = STEP_LABELS[*step].to_ascii_lowercase();
                write!(f, "{day}.step_{label}")
            }
        }
    }
}

impl FromStr for PlanField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim().to_ascii_lowercase();
        let field = match path.as_str() {
            "school" => PlanField::School,
            "teacher" => PlanField::Teacher,
            "teaching_date" => PlanField::TeachingDate,
            "guide" => PlanField::Guide,
            "materials" => PlanField::Materials,
            "textbook_pages" => PlanField::TextbookPages,
            "portal_link" => PlanField::PortalLink,
            "other" => PlanField::Other,
            _ => {
                let (day, rest) = path
                    .split_once('.')
                    .ok_or_else(|| format!("Unknown plan field: {s}"))?;
                let day: SchoolDay = day.parse()?;
                match rest {
                    "objective" => PlanField::Objective(day),
                    "content" => PlanField::Content(day),
                    _ => {
                        let label = rest
                            .strip_prefix("step_")
                            .filter(|l| l.len() == 1)
                            .and_then(|l| l.chars().next())
                            .map(|c| c.to_ascii_uppercase())
                            .ok_or_else(|| format!("Unknown plan field: {s}"))?;
                        let step = STEP_LABELS
                            .iter()
                            .position(|l| *l == label)
                            .ok_or_else(|| format!("Unknown procedure step: {s}"))?;
                        PlanField::Step(day, step)
                    }
                }
            }
        };
        Ok(field)
    }
}

impl WeeklyPlanRecord {
    pub fn day(&self, day: SchoolDay) -> &DayPlan {
        &self.days[day.index()]
    }

    pub fn day_mut(&mut self, day: SchoolDay) -> &mut DayPlan {
        &mut self.days[day.index()]
    }

    pub fn field(&self, field: PlanField) -> &str {
        match field {
            PlanField::School => &self.school,
            PlanField::Teacher => &self.teacher,
            PlanField::TeachingDate => &self.teaching_date,
            PlanField::Guide => &self.guide,
            PlanField::Materials => &self.materials,
            PlanField::TextbookPages => &self.textbook_pages,
            PlanField::PortalLink => &self.portal_link,
            PlanField::Other => &self.other,
            PlanField::Objective(day) => &self.day(day).objective,
            PlanField::Content(day) => &self.day(day).content,
            PlanField::Step(day, step) => &self.day(day).steps[step],
        }
    }

    pub fn field_mut(&mut self, field: PlanField) -> &mut String {
        match field {
            PlanField::School => &mut self.school,
            PlanField::Teacher => &mut self.teacher,
            PlanField::TeachingDate => &mut self.teaching_date,
            PlanField::Guide => &mut self.guide,
            PlanField::Materials => &mut self.materials,
            PlanField::TextbookPages => &mut self.textbook_pages,
            PlanField::PortalLink => &mut self.portal_link,
            PlanField::Other => &mut self.other,
            PlanField::Objective(day) => &mut self.day_mut(day).objective,
            PlanField::Content(day) => &mut self.day_mut(day).content,
            PlanField::Step(day, step) => &mut self.day_mut(day).steps[step],
        }
    }

    /// Edit a single field addressed by its path (`school`, `tuesday.step_b`, ...).
    pub fn set_field(&mut self, path: &str, value: impl Into<String>) -> ServiceResult<PlanField> {
        let field: PlanField = path.parse().map_err(ServiceError::InvalidInput)?;
        *self.field_mut(field) = value.into();
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_field_paths_round_trip_through_display() {
        for field in PlanField::all() {
            let path = field.to_string();
            assert_eq!(path.parse::<PlanField>().unwrap(), field, "path {path}");
        }
        assert_eq!(PlanField::all().len(), 3 + 5 * 12 + 5);
    }

    #[test]
    fn plan_field_rejects_unknown_paths() {
        assert!("saturday.objective".parse::<PlanField>().is_err());
        assert!("monday.step_k".parse::<PlanField>().is_err());
        assert!("monday.step_ab".parse::<PlanField>().is_err());
        assert!("principal".parse::<PlanField>().is_err());
    }

    #[test]
    fn set_field_edits_one_value() {
        let mut record = WeeklyPlanRecord::default();
        let field = record.set_field("Wednesday.Step_J", "Homework: page 12").unwrap();
        assert_eq!(field, PlanField::Step(SchoolDay::Wednesday, 9));
        assert_eq!(record.day(SchoolDay::Wednesday).steps[9], "Homework: page 12");
        assert!(record.day(SchoolDay::Tuesday).steps.iter().all(String::is_empty));

        let err = record.set_field("monday.summary", "x").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[test]
    fn default_record_has_five_ordered_days() {
        let record = WeeklyPlanRecord::default();
        let days: Vec<SchoolDay> = record.days.iter().map(|d| d.day).collect();
        assert_eq!(days, SchoolDay::ALL.to_vec());
    }
}
