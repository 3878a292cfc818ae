/// Keywords of holidays the public feed already covers. Calendar-feed events
/// whose title contains one of them are dropped so they do not show twice
/// under a slightly different name.
pub const DEFAULT_SKIP_KEYWORDS: &[&str] = &[
    "new year",
    "chinese new year",
    "edsa",
    "araw ng kagitingan",
    "day of valor",
    "maundy thursday",
    "good friday",
    "black saturday",
    "easter",
    "labor day",
    "labour day",
    "independence day",
    "ninoy aquino",
    "national heroes",
    "all saints",
    "all souls",
    "bonifacio",
    "immaculate conception",
    "christmas",
    "rizal",
    "last day of the year",
    "eid al-fitr",
    "eid al-adha",
    "eid'l",
];

/// Case-insensitive substring deny list over event titles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HolidayFilter {
    keywords: Vec<String>,
}

impl HolidayFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Parse a comma separated list; blank input keeps the defaults.
    pub fn from_list(list: &str) -> Self {
        if list.trim().is_empty() {
            Self::default()
        } else {
            Self::new(list.split(','))
        }
    }

    /// Whether the title names a holiday the public feed already carries.
    pub fn is_common_holiday(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.keywords.iter().any(|k| title.contains(k.as_str()))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for HolidayFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SKIP_KEYWORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_list_catches_national_holidays() {
        let filter = HolidayFilter::default();
        assert!(filter.is_common_holiday("Christmas Day"));
        assert!(filter.is_common_holiday("RIZAL DAY"));
        assert!(filter.is_common_holiday("Ninoy Aquino Day"));
        assert!(!filter.is_common_holiday("Sinulog Festival"));
    }

    #[test]
    fn custom_list_replaces_defaults() {
        let filter = HolidayFilter::from_list(" Foundation Day, ,sports fest ");
        assert_eq!(filter.keywords(), ["foundation day", "sports fest"]);
        assert!(filter.is_common_holiday("School Foundation Day"));
        assert!(!filter.is_common_holiday("Christmas Day"));
    }

    #[test]
    fn blank_list_keeps_defaults() {
        assert_eq!(HolidayFilter::from_list("  "), HolidayFilter::default());
    }
}
