//! Domain models for degree plans.
//!
//! Everything in this module is a pure transform over plain data: course
//! records, requirement nodes, substitution edges, baskets and validation
//! rules go in; grouped structures, validated payloads and ordered labels come
//! out. Loading and persisting that data is the job of [`crate::storage`].

mod ids;
pub use ids::{BasketId, BasketLinkId, CourseId, FulfillmentId, ProgramId, RequirementId, RuleId};

pub(crate) mod course;
pub use course::{CourseIndex, CourseRecord, CourseSortKey, normalize_course_number};

pub mod substitution;
pub use substitution::{SubstituteGroup, SubstitutionEdge, build_groups, group_of};

mod requirement;
pub use requirement::{
    Category, CourseLink, LogicType, MajorMode, RequirementNode, TreeKey, UnknownLogicType,
    walk_tree,
};

pub mod label;
pub use label::{LabelFormatter, format_name};

pub mod slot;
pub use slot::{ChoiceOption, CoreRuleSlot, NamedGroup, SlotIssue, SlotPlan};

pub mod basket;
pub use basket::{
    Basket, BasketContext, BasketDraft, BasketIssue, BasketLink, BasketPayload, BasketSave,
    SubGroupRow,
};

pub mod tree;
pub use tree::{DropPosition, LinkPlacement, MoveError, NodePlacement, Restructure, TreeIssue};

pub mod editor;
pub use editor::{EditorForm, RequirementPayload, project_form};

pub mod rule;
pub use rule::{RuleDomain, RulePayload, ValidationRule};

mod config;
pub use config::Config;
