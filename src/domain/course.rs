use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::CourseId;

/// A course as fetched from the curriculum store.
///
/// Course records are read-only here; the store owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Stable identifier.
    pub id: CourseId,
    /// Catalog number, such as `MA 153`.
    #[serde(default)]
    pub course_number: String,
    /// Catalog title.
    #[serde(default)]
    pub title: String,
    /// Credit hours, when the store knows them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<f64>,
}

/// Normalizes a course number for lookups.
///
/// Whitespace is removed and letters are uppercased, so `ma 153`, `MA153` and
/// `MA 153` all share the key `MA153`.
#[must_use]
pub fn normalize_course_number(number: &str) -> String {
    number
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Lookup tables over a set of course records.
///
/// Built once per read of the course catalog and shared by every other
/// transform in the crate.
#[derive(Debug, Default, Clone)]
pub struct CourseIndex {
    by_id: HashMap<CourseId, CourseRecord>,
    by_number: HashMap<String, CourseId>,
    by_normalized_number: HashMap<String, CourseId>,
}

/// Sort key used to order courses for display.
///
/// Course number first, then title (both case-insensitive), then the raw id.
pub type CourseSortKey = (String, String, CourseId);

impl CourseIndex {
    /// Builds the index from course records.
    ///
    /// If two records share a course number, the first one wins the number
    /// lookup; both remain reachable by id.
    #[must_use]
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = CourseRecord>,
    {
        let mut index = Self::default();
        for record in records {
            if !record.course_number.trim().is_empty() {
                index
                    .by_number
                    .entry(record.course_number.clone())
                    .or_insert(record.id);
                index
                    .by_normalized_number
                    .entry(normalize_course_number(&record.course_number))
                    .or_insert(record.id);
            }
            index.by_id.insert(record.id, record);
        }
        index
    }

    /// Retrieves a course by id.
    #[must_use]
    pub fn get(&self, id: CourseId) -> Option<&CourseRecord> {
        self.by_id.get(&id)
    }

    /// Finds a course by its number, trying the raw number before the
    /// normalized one.
    #[must_use]
    pub fn by_number(&self, number: &str) -> Option<&CourseRecord> {
        self.by_number
            .get(number)
            .or_else(|| {
                self.by_normalized_number
                    .get(&normalize_course_number(number))
            })
            .and_then(|id| self.by_id.get(id))
    }

    /// Number of indexed courses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the index holds no courses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Display sort key for a course id.
    ///
    /// Unknown ids sort with an empty number and title, i.e. ahead of known
    /// courses, and fall back to id ordering among themselves.
    #[must_use]
    pub fn sort_key(&self, id: CourseId) -> CourseSortKey {
        self.get(id).map_or_else(
            || (String::new(), String::new(), id),
            |course| {
                (
                    course.course_number.to_lowercase(),
                    course.title.to_lowercase(),
                    id,
                )
            },
        )
    }

    /// Sorts course ids in display order.
    pub fn sort_ids(&self, ids: &mut [CourseId]) {
        ids.sort_by_cached_key(|id| self.sort_key(*id));
    }

    /// Maps course ids to course numbers, skipping unknown ids.
    pub fn course_numbers<'a, I>(&'a self, ids: I) -> impl Iterator<Item = &'a str> + 'a
    where
        I: IntoIterator<Item = CourseId>,
        I::IntoIter: 'a,
    {
        ids.into_iter()
            .filter_map(|id| self.get(id).map(|course| course.course_number.as_str()))
    }

    /// Short human label for a course: its number, or its title when the
    /// number is blank, or the id when the course is unknown.
    #[must_use]
    pub fn label(&self, id: CourseId) -> String {
        match self.get(id) {
            Some(course) if !course.course_number.trim().is_empty() => {
                course.course_number.clone()
            }
            Some(course) if !course.title.trim().is_empty() => course.title.clone(),
            _ => id.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use test_case::test_case;

    use super::*;

    pub(crate) fn course(id: u128, number: &str, title: &str) -> CourseRecord {
        CourseRecord {
            id: CourseId::from_u128(id),
            course_number: number.to_string(),
            title: title.to_string(),
            credits: Some(3.0),
        }
    }

    #[test_case("MA 153", "MA153"; "strips inner space")]
    #[test_case(" ma153 ", "MA153"; "uppercases and trims")]
    #[test_case("EE\t301", "EE301"; "strips tabs")]
    fn normalizes_course_numbers(input: &str, expected: &str) {
        assert_eq!(normalize_course_number(input), expected);
    }

    #[test]
    fn looks_up_by_raw_then_normalized_number() {
        let index = CourseIndex::new([course(1, "MA 153", "Calculus I")]);

        assert_eq!(index.by_number("MA 153").unwrap().title, "Calculus I");
        assert_eq!(index.by_number("ma153").unwrap().title, "Calculus I");
        assert!(index.by_number("MA 154").is_none());
    }

    #[test]
    fn first_record_wins_duplicate_number() {
        let index = CourseIndex::new([course(1, "CH 101", "First"), course(2, "CH 101", "Second")]);

        assert_eq!(index.by_number("CH 101").unwrap().id, CourseId::from_u128(1));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn sorts_by_number_then_title_then_id() {
        let index = CourseIndex::new([
            course(1, "ma 200", "Zeta"),
            course(2, "MA 100", "Beta"),
            course(3, "", "Alpha"),
            course(4, "", "Alpha"),
        ]);
        let mut ids = vec![
            CourseId::from_u128(1),
            CourseId::from_u128(4),
            CourseId::from_u128(2),
            CourseId::from_u128(3),
        ];

        index.sort_ids(&mut ids);

        assert_eq!(
            ids,
            vec![
                CourseId::from_u128(3),
                CourseId::from_u128(4),
                CourseId::from_u128(2),
                CourseId::from_u128(1),
            ]
        );
    }

    #[test]
    fn course_numbers_skip_unknown_ids() {
        let index = CourseIndex::new([course(1, "PH 201", "Physics")]);
        let numbers: Vec<_> = index
            .course_numbers([CourseId::from_u128(9), CourseId::from_u128(1)])
            .collect();

        assert_eq!(numbers, vec!["PH 201"]);
    }
}
