//! Fulfillment slots for core requirement rules.
//!
//! A slot is one unit of choice within a requirement: one of the N picks of a
//! `PICK_N`/`ANY_N` rule, or one detected substitute group otherwise. Slots
//! exist only for the length of an editing session and are saved as named
//! groups.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::domain::{
    CourseId, CourseIndex, LabelFormatter, RequirementId, RequirementNode, SubstitutionEdge,
};

/// Lowest semester a slot may be pinned to.
pub const FIRST_SEMESTER: u8 = 1;
/// Highest semester a slot may be pinned to.
pub const LAST_SEMESTER: u8 = 8;

/// One selectable option under a requirement.
///
/// `value` is the option's representative course; `group_course_ids` lists
/// every course the option stands for (just `value` for an ungrouped course).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Representative course.
    pub value: CourseId,
    /// All courses covered by this option, primary first.
    pub group_course_ids: Vec<CourseId>,
}

impl ChoiceOption {
    /// Whether this option stands for more than one course.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.group_course_ids.len() > 1
    }
}

/// Derives the choice options for a requirement's linked courses.
///
/// Each substitute group among the links becomes one option whose value is the
/// group's primary; every remaining course becomes an option of its own.
/// Options follow the order of the requirement's links.
#[must_use]
pub fn choice_options(
    node: &RequirementNode,
    edges: &[SubstitutionEdge],
    index: &CourseIndex,
) -> Vec<ChoiceOption> {
    let groups = node.course_groups(edges, index);
    let mut covered = HashSet::new();
    let mut options = Vec::new();

    for course_id in node.course_ids() {
        if !covered.insert(course_id) {
            continue;
        }
        match groups.iter().find(|group| group.contains(course_id)) {
            Some(group) => {
                covered.extend(group.iter());
                options.push(ChoiceOption {
                    value: group.primary(),
                    group_course_ids: group.to_vec(),
                });
            }
            None => options.push(ChoiceOption {
                value: course_id,
                group_course_ids: vec![course_id],
            }),
        }
    }

    options
}

/// Per-requirement slot metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPlan {
    /// The requirement the plan belongs to.
    pub requirement_id: RequirementId,
    /// How many slots the requirement's logic implies.
    pub slot_total: usize,
    /// Whether substitutes must come from the primary's detected group.
    pub restrict_to_sub_groups: bool,
    /// Whether slots are pre-populated (counted logic) or added by hand.
    pub auto_expand: bool,
}

impl SlotPlan {
    /// Computes the plan for one requirement.
    #[must_use]
    pub fn for_requirement(node: &RequirementNode, options: &[ChoiceOption]) -> Self {
        let logic = node.logic_type;
        let slot_total = if logic.is_counted() {
            (node.pick_n as usize).max(1)
        } else {
            options.iter().filter(|option| option.is_group()).count().max(1)
        };

        Self {
            requirement_id: node.id,
            slot_total,
            restrict_to_sub_groups: !logic.is_choice(),
            auto_expand: logic.is_counted(),
        }
    }
}

/// One fulfillment slot being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreRuleSlot {
    /// Owning requirement.
    pub requirement_id: RequirementId,
    /// Formatted requirement label.
    pub requirement_name: String,
    /// Zero-based position within the requirement.
    pub slot_index: usize,
    /// Number of slots the requirement's logic implies.
    pub slot_total: usize,
    /// The course that fills the slot.
    #[serde(default)]
    pub primary_course_id: Option<CourseId>,
    /// Courses accepted in place of the primary.
    #[serde(default)]
    pub substitute_course_ids: Vec<CourseId>,
    /// Whether substitutes must come from the primary's detected group.
    pub restrict_to_sub_groups: bool,
    /// Exact semester the slot is scheduled in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_semester: Option<u8>,
    /// Earliest allowed semester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_semester_min: Option<u8>,
    /// Latest allowed semester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_semester_max: Option<u8>,
}

impl CoreRuleSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn empty(
        plan: &SlotPlan,
        requirement_name: impl Into<String>,
        slot_index: usize,
    ) -> Self {
        Self {
            requirement_id: plan.requirement_id,
            requirement_name: requirement_name.into(),
            slot_index,
            slot_total: plan.slot_total,
            primary_course_id: None,
            substitute_course_ids: Vec::new(),
            restrict_to_sub_groups: plan.restrict_to_sub_groups,
            required_semester: None,
            required_semester_min: None,
            required_semester_max: None,
        }
    }
}

/// Expands requirements into editable slots.
///
/// Counted requirements (`PICK_N`, `ANY_N`) get one empty slot per pick.
/// Other requirements get none; their slots are added by the editor, and
/// [`SlotPlan::slot_total`] bounds how many.
#[must_use]
#[instrument(level = "debug", skip_all, fields(requirements = requirements.len()))]
pub fn build_slots(
    requirements: &[RequirementNode],
    options_by_requirement: &HashMap<RequirementId, Vec<ChoiceOption>>,
    formatter: &LabelFormatter,
) -> Vec<CoreRuleSlot> {
    let mut slots = Vec::new();

    for node in requirements {
        let options = options_by_requirement
            .get(&node.id)
            .map_or(&[][..], Vec::as_slice);
        let plan = SlotPlan::for_requirement(node, options);
        if !plan.auto_expand {
            continue;
        }

        let option_total = (!options.is_empty()).then_some(options.len());
        let name = formatter.format_name(&node.name, node.logic_type, node.pick_n, option_total);

        slots.extend((0..plan.slot_total).map(|index| CoreRuleSlot::empty(&plan, &*name, index)));
    }

    slots
}

/// Resolves which courses a slot stands for.
///
/// If the slot's primary belongs to a multi-course option, an explicit
/// sub-selection that is a subset of that option wins; otherwise the whole
/// option is used. An ungrouped primary stands for itself alone.
#[must_use]
pub fn selected_ids(
    slot: &CoreRuleSlot,
    options: &[ChoiceOption],
    explicit: Option<&[CourseId]>,
) -> Vec<CourseId> {
    let Some(primary) = slot.primary_course_id else {
        return Vec::new();
    };

    let group = options
        .iter()
        .find(|option| option.is_group() && option.group_course_ids.contains(&primary));

    match (group, explicit) {
        (Some(group), Some(explicit))
            if !explicit.is_empty()
                && explicit
                    .iter()
                    .all(|id| group.group_course_ids.contains(id)) =>
        {
            explicit.to_vec()
        }
        (Some(group), _) => group.group_course_ids.clone(),
        (None, _) => vec![primary],
    }
}

/// A problem with a set of edited slots.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotIssue {
    /// The slot has no primary course.
    #[error("{name} slot {slot}: select a primary course.")]
    MissingPrimary {
        /// Requirement label.
        name: String,
        /// One-based slot number.
        slot: usize,
    },
    /// A restricted slot names a substitute outside the primary's group.
    #[error("{name} slot {slot}: substitutes must come from the primary course's group.")]
    SubstituteOutsideGroup {
        /// Requirement label.
        name: String,
        /// One-based slot number.
        slot: usize,
    },
    /// A semester value lies outside the supported range.
    #[error("{name} slot {slot}: semesters must be between {FIRST_SEMESTER} and {LAST_SEMESTER}.")]
    SemesterOutOfRange {
        /// Requirement label.
        name: String,
        /// One-based slot number.
        slot: usize,
    },
    /// The semester window is inverted.
    #[error("{name} slot {slot}: earliest semester is after latest semester.")]
    InvertedSemesterWindow {
        /// Requirement label.
        name: String,
        /// One-based slot number.
        slot: usize,
    },
    /// A hand-expanded requirement carries more slots than it has groups.
    #[error("{name}: {count} slots exceed the {total} available.")]
    TooManySlots {
        /// Requirement label.
        name: String,
        /// Slots present.
        count: usize,
        /// Slots allowed.
        total: usize,
    },
}

/// Checks edited slots before they are saved as named groups.
///
/// `options_by_requirement` supplies the detected groups used for restricted
/// slots; `plans` bounds how many slots each requirement may carry. Every
/// issue is reported.
#[must_use]
pub fn validate_slots(
    slots: &[CoreRuleSlot],
    options_by_requirement: &HashMap<RequirementId, Vec<ChoiceOption>>,
    plans: &[SlotPlan],
) -> Vec<SlotIssue> {
    let mut issues = Vec::new();
    let mut counts: HashMap<RequirementId, (usize, &str)> = HashMap::new();

    for slot in slots {
        let name = slot.requirement_name.clone();
        let number = slot.slot_index + 1;
        let entry = counts
            .entry(slot.requirement_id)
            .or_insert((0, slot.requirement_name.as_str()));
        entry.0 += 1;

        let Some(primary) = slot.primary_course_id else {
            issues.push(SlotIssue::MissingPrimary { name, slot: number });
            continue;
        };

        if slot.restrict_to_sub_groups && !slot.substitute_course_ids.is_empty() {
            let options = options_by_requirement
                .get(&slot.requirement_id)
                .map_or(&[][..], Vec::as_slice);
            let group = options
                .iter()
                .find(|option| option.group_course_ids.contains(&primary));
            let inside = group.is_some_and(|group| {
                slot.substitute_course_ids
                    .iter()
                    .all(|id| group.group_course_ids.contains(id))
            });
            if !inside {
                issues.push(SlotIssue::SubstituteOutsideGroup {
                    name: name.clone(),
                    slot: number,
                });
            }
        }

        let semesters = [
            slot.required_semester,
            slot.required_semester_min,
            slot.required_semester_max,
        ];
        if semesters
            .iter()
            .flatten()
            .any(|semester| !(FIRST_SEMESTER..=LAST_SEMESTER).contains(semester))
        {
            issues.push(SlotIssue::SemesterOutOfRange {
                name: name.clone(),
                slot: number,
            });
        }

        if let (Some(min), Some(max)) = (slot.required_semester_min, slot.required_semester_max) {
            if min > max {
                issues.push(SlotIssue::InvertedSemesterWindow { name, slot: number });
            }
        }
    }

    for plan in plans.iter().filter(|plan| !plan.auto_expand) {
        if let Some((count, name)) = counts.get(&plan.requirement_id) {
            if *count > plan.slot_total {
                issues.push(SlotIssue::TooManySlots {
                    name: (*name).to_string(),
                    count: *count,
                    total: plan.slot_total,
                });
            }
        }
    }

    issues
}

/// The persisted form of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedGroup {
    /// Display name.
    pub name: String,
    /// Courses from the list needed to satisfy the group.
    pub min_count: u32,
    /// Catalog numbers of the accepted courses.
    pub course_numbers: Vec<String>,
    /// Requirement the slot came from.
    pub source_requirement_id: RequirementId,
    /// Zero-based slot position.
    pub slot_index: usize,
    /// Exact semester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_semester: Option<u8>,
    /// Earliest semester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_semester_min: Option<u8>,
    /// Latest semester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_semester_max: Option<u8>,
}

/// Converts slots into named-group payloads.
///
/// Slots without a primary are skipped. Accepted courses are the slot's
/// selected ids (see [`selected_ids`]) followed by its free-form substitutes
/// when the slot is not restricted to detected groups.
#[must_use]
pub fn named_groups(
    slots: &[CoreRuleSlot],
    options_by_requirement: &HashMap<RequirementId, Vec<ChoiceOption>>,
    selections: &HashMap<(RequirementId, usize), Vec<CourseId>>,
    index: &CourseIndex,
) -> Vec<NamedGroup> {
    slots
        .iter()
        .filter(|slot| slot.primary_course_id.is_some())
        .map(|slot| {
            let options = options_by_requirement
                .get(&slot.requirement_id)
                .map_or(&[][..], Vec::as_slice);
            let explicit = selections
                .get(&(slot.requirement_id, slot.slot_index))
                .map(Vec::as_slice);

            let mut ids = selected_ids(slot, options, explicit);
            if !slot.restrict_to_sub_groups {
                ids.extend(slot.substitute_course_ids.iter().copied());
            }
            let mut seen = HashSet::new();
            ids.retain(|id| seen.insert(*id));

            let name = if slot.slot_total > 1 {
                format!(
                    "{} (Slot {}/{})",
                    slot.requirement_name,
                    slot.slot_index + 1,
                    slot.slot_total
                )
            } else {
                slot.requirement_name.clone()
            };

            NamedGroup {
                name,
                min_count: 1,
                course_numbers: index.course_numbers(ids).map(str::to_string).collect(),
                source_requirement_id: slot.requirement_id,
                slot_index: slot.slot_index,
                required_semester: slot.required_semester,
                required_semester_min: slot.required_semester_min,
                required_semester_max: slot.required_semester_max,
            }
        })
        .collect()
}
