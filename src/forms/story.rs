//! Story form
//!
//! The author and category lists are only known at request time, so the form
//! is always built around a [`StoryFormChoices`] read from the database and
//! validates submissions against it.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use super::{required_text, Choice, FieldErrors, FormData, NOT_A_VALID_CHOICE, REQUIRED};
use crate::models::{Scope, Story, StoryInput};

const TITLE_MAX: usize = 255;

/// Format used to pre-fill the creation date input
pub const CREATION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACCEPTED_DATE_FORMATS: &[&str] = &[CREATION_DATE_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Years every supported backend can store (MySQL `DATETIME`)
pub const CREATION_YEARS: std::ops::RangeInclusive<i32> = 1000..=9999;

pub const INVALID_DATE: &str = "Not a valid datetime value.";
pub const RESPONSIBILITY_REQUIRED: &str = "You must take responsibility for this story.";

/// Selectable authors and categories for the story form.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StoryFormChoices {
    pub authors: Vec<Choice>,
    pub categories: Vec<Choice>,
}

impl StoryFormChoices {
    pub fn has_author(&self, id: i64) -> bool {
        self.authors.iter().any(|c| c.value == id)
    }

    pub fn has_category(&self, id: i64) -> bool {
        self.categories.iter().any(|c| c.value == id)
    }
}

/// Parse a submitted creation date; the value is taken as UTC.
///
/// Dates outside [`CREATION_YEARS`] are rejected like unparseable ones.
pub fn parse_creation_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    ACCEPTED_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .filter(|naive| CREATION_YEARS.contains(&naive.year()))
        .map(|naive| naive.and_utc())
}

/// Add/edit story form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoryForm {
    pub story_title: String,
    pub story_content: String,
    pub story_author: String,
    pub story_topics: Vec<String>,
    pub scope: String,
    pub creation_date: String,
    pub responsibility: bool,
    /// Parsed author selection, for marking the selected option
    pub selected_author: Option<i64>,
    /// Parsed category selection, for ticking checkboxes
    pub selected_topics: Vec<i64>,
    pub choices: StoryFormChoices,
    pub errors: FieldErrors,
}

impl StoryForm {
    /// Blank form dated `now`
    pub fn new(choices: StoryFormChoices, now: DateTime<Utc>) -> Self {
        Self {
            creation_date: now.format(CREATION_DATE_FORMAT).to_string(),
            choices,
            ..Self::default()
        }
    }

    /// Bind submitted fields
    pub fn from_form(data: &FormData, choices: StoryFormChoices) -> Self {
        let story_author = data.text("story_author");
        let story_topics: Vec<String> = data
            .get_all("story_topics")
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            story_title: data.text("story_title"),
            story_content: data.text("story_content"),
            selected_author: story_author.trim().parse().ok(),
            selected_topics: story_topics
                .iter()
                .filter_map(|t| t.trim().parse().ok())
                .collect(),
            story_author,
            story_topics,
            scope: data.text("scope"),
            creation_date: data.text("creation_date"),
            responsibility: data.get("responsibility").is_some_and(is_checked),
            choices,
            errors: FieldErrors::default(),
        }
    }

    /// Pre-fill every field from a stored story, responsibility ticked
    pub fn from_story(story: &Story, choices: StoryFormChoices) -> Self {
        let topics = story.category_ids();
        Self {
            story_title: story.title.clone(),
            story_content: story.content.clone(),
            story_author: story.author_id.to_string(),
            story_topics: topics.iter().map(i64::to_string).collect(),
            scope: story.scope().as_str().to_string(),
            creation_date: story.created_at.format(CREATION_DATE_FORMAT).to_string(),
            responsibility: true,
            selected_author: Some(story.author_id),
            selected_topics: topics,
            choices,
            errors: FieldErrors::default(),
        }
    }

    /// Validate the submission against the current choices.
    ///
    /// On failure the messages are left in `errors` and `None` is returned.
    pub fn validate(&mut self) -> Option<StoryInput> {
        let mut errors = FieldErrors::default();

        let title = required_text(&mut errors, "story_title", &self.story_title, TITLE_MAX);

        if self.story_content.trim().is_empty() {
            errors.add("story_content", REQUIRED);
        }

        let author_id = self.validate_author(&mut errors);
        let category_ids = self.validate_topics(&mut errors);

        let scope = match self.scope.trim() {
            "" => None,
            value => match Scope::parse(value) {
                Some(scope) => Some(scope),
                None => {
                    errors.add("scope", NOT_A_VALID_CHOICE);
                    None
                }
            },
        };

        let created_at = match self.creation_date.trim() {
            "" => None,
            value => match parse_creation_date(value) {
                Some(date) => Some(date),
                None => {
                    errors.add("creation_date", INVALID_DATE);
                    None
                }
            },
        };

        if !self.responsibility {
            errors.add("responsibility", RESPONSIBILITY_REQUIRED);
        }

        self.errors = errors;
        if !self.errors.is_empty() {
            return None;
        }

        Some(StoryInput {
            title,
            content: self.story_content.clone(),
            author_id: author_id?,
            category_ids,
            scope,
            created_at,
        })
    }

    fn validate_author(&self, errors: &mut FieldErrors) -> Option<i64> {
        let raw = self.story_author.trim();
        if raw.is_empty() {
            errors.add("story_author", REQUIRED);
            return None;
        }

        match raw.parse::<i64>() {
            Ok(id) if self.choices.has_author(id) => Some(id),
            _ => {
                errors.add("story_author", NOT_A_VALID_CHOICE);
                None
            }
        }
    }

    fn validate_topics(&self, errors: &mut FieldErrors) -> Vec<i64> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for raw in &self.story_topics {
            match raw.trim().parse::<i64>() {
                Ok(id) if self.choices.has_category(id) => {
                    if seen.insert(id) {
                        ids.push(id);
                    }
                }
                _ => errors.add(
                    "story_topics",
                    format!("'{}' is not a valid choice for this field.", raw),
                ),
            }
        }

        ids
    }
}

fn is_checked(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "false" | "off" | "0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn choices() -> StoryFormChoices {
        StoryFormChoices {
            authors: vec![Choice::new(1, "Ada Lovelace (ada)"), Choice::new(2, "Alan Turing (alan)")],
            categories: vec![Choice::new(10, "Science"), Choice::new(11, "Technology")],
        }
    }

    fn submit(pairs: &[(&str, &str)]) -> StoryForm {
        let data = FormData::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        StoryForm::from_form(&data, choices())
    }

    fn valid_pairs() -> Vec<(&'static str, &'static str)> {
        vec![
            ("story_title", "Analytical Engine"),
            ("story_content", "It weaves algebraic patterns."),
            ("story_author", "1"),
            ("story_topics", "10"),
            ("scope", "public"),
            ("creation_date", "1843-09-01 12:00:00"),
            ("responsibility", "y"),
        ]
    }

    #[test]
    fn test_valid_submission() {
        let mut form = submit(&valid_pairs());

        let input = form.validate().expect("form should validate");

        assert_eq!(input.title, "Analytical Engine");
        assert_eq!(input.author_id, 1);
        assert_eq!(input.category_ids, vec![10]);
        assert_eq!(input.scope, Some(Scope::Public));
        assert_eq!(
            input.created_at,
            Some(Utc.with_ymd_and_hms(1843, 9, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_optional_fields_may_be_omitted() {
        let mut form = submit(&[
            ("story_title", "T"),
            ("story_content", "C"),
            ("story_author", "2"),
            ("responsibility", "y"),
        ]);

        let input = form.validate().expect("form should validate");
        assert!(input.category_ids.is_empty());
        assert!(input.scope.is_none());
        assert!(input.created_at.is_none());
    }

    #[test]
    fn test_required_fields() {
        let mut form = submit(&[]);

        assert!(form.validate().is_none());
        for field in ["story_title", "story_content", "story_author", "responsibility"] {
            assert!(form.errors.has(field), "{} should be flagged", field);
        }
    }

    #[test]
    fn test_unknown_author_is_not_a_valid_choice() {
        let mut pairs = valid_pairs();
        pairs[2] = ("story_author", "99");
        let mut form = submit(&pairs);

        assert!(form.validate().is_none());
        assert_eq!(form.errors.get("story_author"), [NOT_A_VALID_CHOICE.to_string()]);
    }

    #[test]
    fn test_unknown_topic_rejected() {
        let mut pairs = valid_pairs();
        pairs.push(("story_topics", "404"));
        let mut form = submit(&pairs);

        assert!(form.validate().is_none());
        assert!(form.errors.has("story_topics"));
    }

    #[test]
    fn test_duplicate_topics_collapsed() {
        let mut pairs = valid_pairs();
        pairs.push(("story_topics", "11"));
        pairs.push(("story_topics", "10"));
        let mut form = submit(&pairs);

        let input = form.validate().unwrap();
        assert_eq!(input.category_ids, vec![10, 11]);
    }

    #[test]
    fn test_bad_scope_is_not_a_valid_choice() {
        let mut pairs = valid_pairs();
        pairs[4] = ("scope", "secret");
        let mut form = submit(&pairs);

        assert!(form.validate().is_none());
        assert_eq!(form.errors.get("scope"), [NOT_A_VALID_CHOICE.to_string()]);
    }

    #[test]
    fn test_bad_date_rejected() {
        let mut pairs = valid_pairs();
        pairs[5] = ("creation_date", "yesterday");
        let mut form = submit(&pairs);

        assert!(form.validate().is_none());
        assert_eq!(form.errors.get("creation_date"), [INVALID_DATE.to_string()]);
    }

    #[test]
    fn test_accepted_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 0).unwrap();
        assert_eq!(parse_creation_date("2024-05-06 07:08:00"), Some(expected));
        assert_eq!(parse_creation_date("2024-05-06T07:08:00"), Some(expected));
        assert_eq!(parse_creation_date("2024-05-06T07:08"), Some(expected));
        assert_eq!(parse_creation_date("06/05/2024"), None);
    }

    #[test]
    fn test_creation_year_bounds() {
        assert!(parse_creation_date("1000-01-01 00:00:00").is_some());
        assert!(parse_creation_date("9999-12-31 23:59:59").is_some());
        assert!(parse_creation_date("2040-06-01 12:00:00").is_some());
        assert_eq!(parse_creation_date("0999-12-31 23:59:59"), None);
        assert_eq!(parse_creation_date("0001-01-01 00:00:00"), None);
        assert_eq!(parse_creation_date("+10000-01-01 00:00:00"), None);
        assert_eq!(parse_creation_date("-0001-01-01 00:00:00"), None);
    }

    #[test]
    fn test_out_of_range_date_is_field_error() {
        let mut pairs = valid_pairs();
        pairs[5] = ("creation_date", "0001-01-01 00:00:00");
        let mut form = submit(&pairs);

        assert!(form.validate().is_none());
        assert_eq!(form.errors.get("creation_date"), [INVALID_DATE.to_string()]);
        assert_eq!(form.creation_date, "0001-01-01 00:00:00");
    }

    #[test]
    fn test_unticked_responsibility_rejected() {
        let mut pairs = valid_pairs();
        pairs.retain(|(k, _)| *k != "responsibility");
        let mut form = submit(&pairs);

        assert!(form.validate().is_none());
        assert_eq!(
            form.errors.get("responsibility"),
            [RESPONSIBILITY_REQUIRED.to_string()]
        );
    }

    #[test]
    fn test_failed_submission_keeps_raw_values() {
        let mut form = submit(&[
            ("story_title", "Kept"),
            ("story_author", "2"),
            ("story_topics", "11"),
            ("scope", "private"),
        ]);

        assert!(form.validate().is_none());
        assert_eq!(form.story_title, "Kept");
        assert_eq!(form.selected_author, Some(2));
        assert_eq!(form.selected_topics, vec![11]);
        assert_eq!(form.scope, "private");
    }

    #[test]
    fn test_new_form_prefills_date() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let form = StoryForm::new(choices(), now);

        assert_eq!(form.creation_date, "2024-01-02 03:04:05");
        assert!(!form.responsibility);
        assert!(form.story_title.is_empty());
    }

    #[test]
    fn test_from_story_prefills_everything() {
        let created = Utc::now().with_nanosecond(0).unwrap();
        let story = Story {
            id: 5,
            title: "Stored".to_string(),
            content: "Body".to_string(),
            author_id: 2,
            is_private: false,
            created_at: created,
            updated_at: created,
            categories: vec![crate::models::Category {
                id: 11,
                name: "Technology".to_string(),
            }],
        };

        let mut form = StoryForm::from_story(&story, choices());

        assert_eq!(form.scope, "public");
        assert!(form.responsibility);
        assert_eq!(form.selected_topics, vec![11]);

        let input = form.validate().expect("prefilled form should validate");
        assert_eq!(input.created_at, Some(created));
        assert_eq!(input.scope, Some(Scope::Public));
    }
}
