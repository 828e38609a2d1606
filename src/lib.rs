//! Degree plan editing core.
//!
//! A degree plan is a tree of requirement rules whose leaves are courses, some
//! of which may substitute for each other. The [`domain`] module holds the
//! pure transforms that keep that tree consistent; [`storage`] reads the
//! catalog datasets they operate on.

pub mod domain;
pub use domain::{
    Config, CourseIndex, CourseRecord, LabelFormatter, RequirementNode, SubstituteGroup,
    SubstitutionEdge, build_groups, format_name,
};

/// Filesystem storage for catalog datasets.
pub mod storage;
pub use storage::Catalog;
