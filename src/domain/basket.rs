//! Baskets: named, reusable sets of interchangeable courses.
//!
//! A basket carries a minimum-count threshold and internal substitute
//! sub-groups. Drafts coming out of the editor are checked here before they
//! may be saved or linked to a requirement.

use std::collections::HashSet;

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::domain::{
    BasketId, BasketLinkId, CourseId, CourseIndex, RequirementId, SubstituteGroup,
    SubstitutionEdge, build_groups,
};

/// A sub-group row: a primary course and the courses that may replace it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGroupRow {
    /// The course being substituted. `None` while the row is blank.
    #[serde(default)]
    pub primary_course_id: Option<CourseId>,
    /// Courses accepted in its place.
    #[serde(default)]
    pub substitute_course_ids: Vec<CourseId>,
}

impl SubGroupRow {
    /// Whether the row has neither a primary nor substitutes.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.primary_course_id.is_none() && self.substitute_course_ids.is_empty()
    }

    /// The row expressed as substitution edges.
    pub fn edges(&self) -> impl Iterator<Item = (CourseId, CourseId)> + '_ {
        self.primary_course_id.into_iter().flat_map(|primary| {
            self.substitute_course_ids
                .iter()
                .map(move |substitute| (primary, *substitute))
        })
    }
}

impl From<&SubstituteGroup> for SubGroupRow {
    fn from(group: &SubstituteGroup) -> Self {
        Self {
            primary_course_id: Some(group.primary()),
            substitute_course_ids: group.substitutes().to_vec(),
        }
    }
}

/// A basket as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    /// Stable identifier.
    pub id: BasketId,
    /// Display name.
    pub name: String,
    /// How many of the basket's courses must be taken.
    pub min_count: u32,
    /// Member courses.
    #[serde(default)]
    pub course_ids: Vec<CourseId>,
    /// Substitute sub-groups.
    #[serde(default)]
    pub sub_groups: Vec<SubGroupRow>,
}

impl Basket {
    /// Connected substitute groups formed by this basket's sub-group rows.
    #[must_use]
    pub fn substitute_groups(&self, index: &CourseIndex) -> Vec<SubstituteGroup> {
        build_groups(
            self.course_ids.iter().copied(),
            self.sub_groups.iter().flat_map(SubGroupRow::edges),
            index,
        )
    }
}

/// Seeds sub-group rows for a basket from stored substitution edges.
///
/// Only edges between the basket's own courses count; each resulting group
/// becomes one row keyed by its primary.
#[must_use]
pub fn seed_sub_groups(
    course_ids: &[CourseId],
    edges: &[SubstitutionEdge],
    index: &CourseIndex,
) -> Vec<SubGroupRow> {
    build_groups(
        course_ids.iter().copied(),
        edges.iter().map(SubstitutionEdge::endpoints),
        index,
    )
    .iter()
    .map(SubGroupRow::from)
    .collect()
}

/// An existing attachment of a basket to a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketLink {
    /// Identifier of the attachment.
    pub id: BasketLinkId,
    /// The attached basket.
    pub basket_id: BasketId,
    /// The requirement it is attached to.
    pub requirement_id: RequirementId,
}

/// A basket as edited, before validation.
///
/// `min_count` is kept as the raw text typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketDraft {
    /// Set when editing a stored basket.
    #[serde(default)]
    pub id: Option<BasketId>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Raw minimum-count input.
    #[serde(default)]
    pub min_count: String,
    /// Selected courses.
    #[serde(default)]
    pub course_ids: Vec<CourseId>,
    /// Sub-group rows.
    #[serde(default)]
    pub sub_groups: Vec<SubGroupRow>,
}

impl From<&Basket> for BasketDraft {
    fn from(basket: &Basket) -> Self {
        Self {
            id: Some(basket.id),
            name: basket.name.clone(),
            min_count: basket.min_count.to_string(),
            course_ids: basket.course_ids.clone(),
            sub_groups: basket.sub_groups.clone(),
        }
    }
}

/// Where a draft is being saved.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasketContext<'a> {
    /// Requirement the basket is being attached to.
    pub requirement_id: Option<RequirementId>,
    /// Existing basket being reused instead of creating a new one.
    pub reuse_basket_id: Option<BasketId>,
    /// Link currently being edited, if any.
    pub current_link_id: Option<BasketLinkId>,
    /// Existing basket links.
    pub links: &'a [BasketLink],
}

/// A reason a basket draft cannot be saved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BasketIssue {
    /// `min_count` is not a positive whole number.
    #[error("Min count must be a whole number greater than zero.")]
    InvalidMinCount,
    /// No course is selected.
    #[error("Select at least one basket course.")]
    NoCourses,
    /// `min_count` exceeds the number of distinct selected courses.
    #[error("Min count cannot exceed the number of selected basket courses.")]
    MinCountTooLarge,
    /// A new basket needs a name.
    #[error("Basket name is required.")]
    MissingName,
    /// The reused basket is already attached to this requirement.
    #[error("This basket is already linked to the requirement.")]
    DuplicateLink,
    /// A row has substitutes but no primary.
    #[error("Sub-group {row}: select a primary course.")]
    MissingPrimary {
        /// One-based row number.
        row: usize,
    },
    /// A row's primary is not one of the basket's courses.
    #[error("Sub-group {row}: primary course must be one of the selected basket courses.")]
    PrimaryNotSelected {
        /// One-based row number.
        row: usize,
    },
    /// A row has a primary but no substitutes.
    #[error("Sub-group {row}: select at least one substitute course.")]
    NoSubstitutes {
        /// One-based row number.
        row: usize,
    },
    /// A substitute is not one of the basket's courses.
    #[error("Sub-group {row}: substitute courses must be selected basket courses.")]
    SubstituteNotSelected {
        /// One-based row number.
        row: usize,
    },
    /// A course is listed as its own substitute.
    #[error("Sub-group {row}: a course cannot substitute for itself.")]
    SelfSubstitute {
        /// One-based row number.
        row: usize,
    },
    /// The same unordered pair already appeared.
    #[error("Sub-group {row}: duplicate substitute pair detected.")]
    DuplicatePair {
        /// One-based row number.
        row: usize,
    },
}

/// The payload for creating or updating a basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasketPayload {
    /// Set when updating a stored basket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<BasketId>,
    /// Display name.
    pub name: NonEmptyString,
    /// Minimum count.
    pub min_count: u32,
    /// Distinct selected courses, in selection order.
    pub course_ids: Vec<CourseId>,
    /// Non-blank sub-group rows.
    pub sub_groups: Vec<SubGroupRow>,
}

/// What saving a valid draft amounts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BasketSave {
    /// Create or update the basket itself.
    Save(BasketPayload),
    /// Attach an existing basket to a requirement.
    Link {
        /// The reused basket.
        basket_id: BasketId,
        /// Requirement to attach to.
        requirement_id: Option<RequirementId>,
        /// Minimum count for the attachment.
        min_count: u32,
    },
}

fn pair_key(a: CourseId, b: CourseId) -> (CourseId, CourseId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl BasketDraft {
    /// The minimum count, if it parses to a positive integer.
    #[must_use]
    pub fn parsed_min_count(&self) -> Option<u32> {
        self.min_count
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|count| *count > 0)
    }

    /// Distinct selected course ids, in selection order.
    #[must_use]
    pub fn unique_course_ids(&self) -> Vec<CourseId> {
        let mut seen = HashSet::new();
        self.course_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Checks the draft against every basket rule.
    ///
    /// Rules are all evaluated; an empty result means the draft may be
    /// saved. Row issues carry the one-based row number.
    #[must_use]
    #[instrument(level = "debug", skip_all, fields(rows = self.sub_groups.len()))]
    pub fn validate(&self, ctx: &BasketContext<'_>) -> Vec<BasketIssue> {
        let mut issues = Vec::new();
        let selected: HashSet<CourseId> = self.course_ids.iter().copied().collect();
        let min_count = self.parsed_min_count();

        if min_count.is_none() {
            issues.push(BasketIssue::InvalidMinCount);
        }
        if selected.is_empty() {
            issues.push(BasketIssue::NoCourses);
        }
        if min_count.is_some_and(|count| count as usize > selected.len()) {
            issues.push(BasketIssue::MinCountTooLarge);
        }

        match ctx.reuse_basket_id {
            None if self.name.trim().is_empty() => issues.push(BasketIssue::MissingName),
            None => {}
            Some(basket_id) => {
                let duplicate = ctx.links.iter().any(|link| {
                    link.basket_id == basket_id
                        && Some(link.requirement_id) == ctx.requirement_id
                        && Some(link.id) != ctx.current_link_id
                });
                if duplicate {
                    issues.push(BasketIssue::DuplicateLink);
                }
            }
        }

        let mut pairs = HashSet::new();
        for (position, row) in self.sub_groups.iter().enumerate() {
            let row_number = position + 1;
            if row.is_blank() {
                continue;
            }

            let Some(primary) = row.primary_course_id else {
                issues.push(BasketIssue::MissingPrimary { row: row_number });
                continue;
            };

            if !selected.contains(&primary) {
                issues.push(BasketIssue::PrimaryNotSelected { row: row_number });
                continue;
            }

            if row.substitute_course_ids.is_empty() {
                issues.push(BasketIssue::NoSubstitutes { row: row_number });
                continue;
            }

            let mut not_selected = false;
            let mut self_reference = false;
            let mut duplicate = false;
            for &substitute in &row.substitute_course_ids {
                if !selected.contains(&substitute) {
                    not_selected = true;
                } else if substitute == primary {
                    self_reference = true;
                } else if !pairs.insert(pair_key(primary, substitute)) {
                    duplicate = true;
                }
            }

            if not_selected {
                issues.push(BasketIssue::SubstituteNotSelected { row: row_number });
            }
            if self_reference {
                issues.push(BasketIssue::SelfSubstitute { row: row_number });
            }
            if duplicate {
                issues.push(BasketIssue::DuplicatePair { row: row_number });
            }
        }

        if !issues.is_empty() {
            tracing::debug!(issues = issues.len(), "basket draft rejected");
        }
        issues
    }

    /// Validates the draft and builds what should be sent to the store.
    ///
    /// # Errors
    ///
    /// Returns every [`BasketIssue`] found when the draft is not valid.
    pub fn prepare(&self, ctx: &BasketContext<'_>) -> Result<BasketSave, Vec<BasketIssue>> {
        let issues = self.validate(ctx);
        if !issues.is_empty() {
            return Err(issues);
        }
        let min_count = self
            .parsed_min_count()
            .ok_or_else(|| vec![BasketIssue::InvalidMinCount])?;

        if let Some(basket_id) = ctx.reuse_basket_id {
            return Ok(BasketSave::Link {
                basket_id,
                requirement_id: ctx.requirement_id,
                min_count,
            });
        }

        let name = NonEmptyString::new(self.name.trim().to_string())
            .map_err(|_| vec![BasketIssue::MissingName])?;

        let sub_groups = self
            .sub_groups
            .iter()
            .filter(|row| !row.is_blank())
            .cloned()
            .collect();

        Ok(BasketSave::Save(BasketPayload {
            id: self.id,
            name,
            min_count,
            course_ids: self.unique_course_ids(),
            sub_groups,
        }))
    }
}
