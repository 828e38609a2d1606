//! Editor state for a selected requirement node.
//!
//! The form is a projection of `(selected id, tree)`. It is recomputed from
//! scratch whenever either changes, and turned back into a store payload on
//! save.

use serde::Serialize;

use crate::domain::{
    Category, LabelFormatter, LogicType, MajorMode, ProgramId, RequirementId, RequirementNode,
    label::base_name,
    tree::{find_node, parent_of},
};

/// Editable fields of a requirement node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorForm {
    /// The node being edited; `None` for a node not yet created.
    pub id: Option<RequirementId>,
    /// The bare name, without logic suffix.
    pub name: String,
    /// Logic type.
    pub logic_type: LogicType,
    /// Pick count for counted logic.
    pub pick_n: u32,
    /// Program category.
    pub category: Option<Category>,
    /// Requirement or track.
    pub major_mode: Option<MajorMode>,
    /// Track label, for tracks.
    pub track_name: Option<String>,
    /// Owning program.
    pub program_id: Option<ProgramId>,
    /// Parent node; `None` at the top level.
    pub parent_requirement_id: Option<RequirementId>,
    /// Whether the name denotes a top-level program node.
    pub is_top_level: bool,
    /// Whether children of this node may be tracks.
    pub can_hold_tracks: bool,
    /// Number of linked courses.
    pub course_count: usize,
    /// Number of selectable options (child rules and linked courses).
    pub option_total: usize,
}

/// Projects the editor form for the selected node.
///
/// Returns `None` when nothing is selected or the id is not in the tree.
#[must_use]
pub fn project_form(
    selected: Option<RequirementId>,
    tree: &[RequirementNode],
    formatter: &LabelFormatter,
) -> Option<EditorForm> {
    let id = selected?;
    let node = find_node(tree, id)?;
    let parent = parent_of(tree, id).flatten();
    let name = base_name(&node.name);

    Some(EditorForm {
        id: Some(node.id),
        is_top_level: formatter.is_top_level(&name),
        name,
        logic_type: node.logic_type,
        pick_n: node.pick_n,
        category: node.category,
        major_mode: node.major_mode,
        track_name: node.track_name.clone(),
        program_id: node.program_id,
        parent_requirement_id: parent,
        can_hold_tracks: parent.is_none(),
        course_count: node.courses.len(),
        option_total: node.children.len() + node.courses.len(),
    })
}

impl EditorForm {
    /// A form for a new node under `parent`.
    ///
    /// The child inherits the parent's category and program.
    #[must_use]
    pub fn blank(parent: Option<&RequirementNode>) -> Self {
        Self {
            id: None,
            name: String::new(),
            logic_type: LogicType::AllRequired,
            pick_n: 0,
            category: parent.and_then(|p| p.category),
            major_mode: None,
            track_name: None,
            program_id: parent.and_then(|p| p.program_id),
            parent_requirement_id: parent.map(|p| p.id),
            is_top_level: false,
            can_hold_tracks: parent.is_none(),
            course_count: 0,
            option_total: 0,
        }
    }

    /// Builds the store payload for this form.
    ///
    /// The stored name is the formatted label. Pick counts are kept only for
    /// counted logic and track names only for tracks.
    #[must_use]
    pub fn to_payload(&self, formatter: &LabelFormatter) -> RequirementPayload {
        let pick_n = if self.logic_type.is_counted() {
            self.pick_n.max(1)
        } else {
            0
        };
        let total = Some(self.option_total).filter(|total| *total > 0);
        let track_name = if self.major_mode == Some(MajorMode::Track) {
            self.track_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        } else {
            None
        };

        RequirementPayload {
            id: self.id,
            name: formatter.format_name(&self.name, self.logic_type, pick_n, total),
            logic_type: self.logic_type,
            pick_n,
            category: self.category,
            major_mode: self.major_mode,
            track_name,
            program_id: self.program_id,
            parent_requirement_id: self.parent_requirement_id,
        }
    }
}

/// A requirement node as sent to the store on create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementPayload {
    /// Absent when creating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequirementId>,
    /// Formatted label.
    pub name: String,
    /// Logic type.
    pub logic_type: LogicType,
    /// Pick count; zero unless the logic is counted.
    pub pick_n: u32,
    /// Program category.
    pub category: Option<Category>,
    /// Requirement or track.
    pub major_mode: Option<MajorMode>,
    /// Track label; only set for tracks.
    pub track_name: Option<String>,
    /// Owning program.
    pub program_id: Option<ProgramId>,
    /// Parent node.
    pub parent_requirement_id: Option<RequirementId>,
}
