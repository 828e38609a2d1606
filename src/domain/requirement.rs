use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::{
    CourseId, CourseIndex, FulfillmentId, ProgramId, RequirementId, SubstituteGroup,
    SubstitutionEdge, build_groups,
};

/// How many of a requirement's items must be satisfied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicType {
    /// Every linked item is required.
    #[default]
    AllRequired,
    /// Exactly `pick_n` items.
    PickN,
    /// Any single item.
    AnyOne,
    /// Any `pick_n` items.
    AnyN,
    /// One of the listed alternatives.
    OneOf,
}

impl LogicType {
    /// Logic with an explicit pick count (`PICK_N`, `ANY_N`).
    #[must_use]
    pub const fn is_counted(self) -> bool {
        matches!(self, Self::PickN | Self::AnyN)
    }

    /// Logic that lets the student choose between items.
    #[must_use]
    pub const fn is_choice(self) -> bool {
        matches!(self, Self::PickN | Self::AnyN | Self::AnyOne | Self::OneOf)
    }

    /// The store's spelling of this logic type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllRequired => "ALL_REQUIRED",
            Self::PickN => "PICK_N",
            Self::AnyOne => "ANY_ONE",
            Self::AnyN => "ANY_N",
            Self::OneOf => "ONE_OF",
        }
    }
}

impl fmt::Display for LogicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown logic type.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown logic type '{0}'")]
pub struct UnknownLogicType(String);

impl FromStr for LogicType {
    type Err = UnknownLogicType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "ALL_REQUIRED" => Ok(Self::AllRequired),
            "PICK_N" => Ok(Self::PickN),
            "ANY_ONE" => Ok(Self::AnyOne),
            "ANY_N" => Ok(Self::AnyN),
            "ONE_OF" => Ok(Self::OneOf),
            _ => Err(UnknownLogicType(s.to_string())),
        }
    }
}

/// Top-level category a requirement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    /// Core curriculum.
    Core,
    /// Major requirements.
    Major,
    /// Physical education.
    Pe,
}

/// Whether a major node is a plain requirement or an optional track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MajorMode {
    /// A regular requirement.
    #[default]
    Requirement,
    /// An optional track within a major.
    Track,
}

/// A course attached to a requirement node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseLink {
    /// Identifier of the link itself.
    pub fulfillment_id: FulfillmentId,
    /// The linked course.
    pub course_id: CourseId,
    /// Position among the requirement's links.
    #[serde(default)]
    pub sort_order: usize,
}

/// A rule in the degree-requirement tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementNode {
    /// Stable identifier.
    pub id: RequirementId,
    /// Raw display name as stored.
    pub name: String,
    /// Satisfaction logic.
    #[serde(default)]
    pub logic_type: LogicType,
    /// Pick count for counted logic.
    #[serde(default)]
    pub pick_n: u32,
    /// Category, for top-level program nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Requirement or track, for major nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_mode: Option<MajorMode>,
    /// Track label when `major_mode` is `TRACK`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_name: Option<String>,
    /// Owning program.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<ProgramId>,
    /// Parent node; `None` at the top level.
    #[serde(default)]
    pub parent_requirement_id: Option<RequirementId>,
    /// Position among siblings.
    #[serde(default)]
    pub sort_order: usize,
    /// Requirement sub-nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RequirementNode>,
    /// Linked courses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub courses: Vec<CourseLink>,
}

impl RequirementNode {
    /// Creates a childless `ALL_REQUIRED` node.
    #[must_use]
    pub fn new(id: RequirementId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            logic_type: LogicType::AllRequired,
            pick_n: 0,
            category: None,
            major_mode: None,
            track_name: None,
            program_id: None,
            parent_requirement_id: None,
            sort_order: 0,
            children: Vec::new(),
            courses: Vec::new(),
        }
    }

    /// Whether this node is an optional track.
    #[must_use]
    pub fn is_track(&self) -> bool {
        self.major_mode == Some(MajorMode::Track)
    }

    /// Ids of the linked courses, in link order.
    pub fn course_ids(&self) -> impl Iterator<Item = CourseId> + '_ {
        self.courses.iter().map(|link| link.course_id)
    }

    /// Substitute groups among this node's linked courses.
    #[must_use]
    pub fn course_groups(
        &self,
        edges: &[SubstitutionEdge],
        index: &CourseIndex,
    ) -> Vec<SubstituteGroup> {
        build_groups(
            self.course_ids(),
            edges.iter().map(SubstitutionEdge::endpoints),
            index,
        )
    }

    /// Depth-first pre-order iterator over this node and its descendants.
    pub fn walk(&self) -> impl Iterator<Item = &Self> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// Iterates over every node of a forest in depth-first pre-order.
pub fn walk_tree(tree: &[RequirementNode]) -> impl Iterator<Item = &RequirementNode> + '_ {
    tree.iter().flat_map(RequirementNode::walk)
}

/// The key of an entry in the rendered tree.
///
/// Requirement nodes and course leaves share one tree but occupy disjoint key
/// spaces: course leaves are keyed `course:<fulfillment id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKey {
    /// A requirement node.
    Requirement(RequirementId),
    /// A linked course leaf.
    Course(FulfillmentId),
}

const COURSE_KEY_PREFIX: &str = "course:";

impl fmt::Display for TreeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requirement(id) => write!(f, "{id}"),
            Self::Course(id) => write!(f, "{COURSE_KEY_PREFIX}{id}"),
        }
    }
}

impl FromStr for TreeKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.strip_prefix(COURSE_KEY_PREFIX).map_or_else(
            || s.parse().map(Self::Requirement),
            |rest| rest.parse().map(Self::Course),
        )
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("ALL_REQUIRED", LogicType::AllRequired)]
    #[test_case("pick_n", LogicType::PickN)]
    #[test_case("Any One", LogicType::AnyOne)]
    #[test_case("any-n", LogicType::AnyN)]
    #[test_case("ONE_OF", LogicType::OneOf)]
    fn parses_logic_type(input: &str, expected: LogicType) {
        assert_eq!(input.parse::<LogicType>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_logic_type() {
        assert!("SOME".parse::<LogicType>().is_err());
    }

    #[test]
    fn deserializes_store_row() {
        let node: RequirementNode = serde_json::from_str(
            r#"{
                "id": "00000000-0000-0000-0000-000000000001",
                "name": "Core Math",
                "logic_type": "PICK_N",
                "pick_n": 2,
                "category": "CORE",
                "major_mode": "TRACK",
                "parent_requirement_id": null
            }"#,
        )
        .unwrap();

        assert_eq!(node.logic_type, LogicType::PickN);
        assert_eq!(node.category, Some(Category::Core));
        assert!(node.is_track());
        assert!(node.children.is_empty());
    }

    #[test]
    fn tree_keys_round_trip() {
        let requirement = TreeKey::Requirement(RequirementId::from_u128(7));
        let course = TreeKey::Course(FulfillmentId::from_u128(8));

        assert_eq!(requirement.to_string().parse::<TreeKey>().unwrap(), requirement);
        assert_eq!(course.to_string().parse::<TreeKey>().unwrap(), course);
        assert!(course.to_string().starts_with("course:"));
    }

    #[test]
    fn walk_is_pre_order() {
        let mut root = RequirementNode::new(RequirementId::from_u128(1), "Core");
        let mut child = RequirementNode::new(RequirementId::from_u128(2), "Math");
        child
            .children
            .push(RequirementNode::new(RequirementId::from_u128(3), "Calc"));
        root.children.push(child);
        root.children
            .push(RequirementNode::new(RequirementId::from_u128(4), "Science"));

        let order: Vec<_> = root.walk().map(|node| node.name.as_str()).collect();
        assert_eq!(order, vec!["Core", "Math", "Calc", "Science"]);
    }
}
