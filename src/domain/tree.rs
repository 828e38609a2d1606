//! Restructuring of the requirement tree.
//!
//! The tree knows nothing about where it came from. Each drag-and-drop
//! gesture is a pure transform from one tree to another, followed by a
//! flattening step that yields the minimal payload the store needs: for every
//! affected node (or course link) its parent and its position among siblings.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::domain::{
    CourseId, CourseIndex, CourseLink, FulfillmentId, RequirementId, RequirementNode, TreeKey,
    label::base_name, walk_tree,
};

/// Where a dragged entry lands relative to the drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    /// As the first child of the target.
    Inside,
    /// As the sibling immediately before the target.
    Before,
    /// As the sibling immediately after the target.
    After,
}

impl DropPosition {
    /// Maps a tree widget's drop gesture to a position.
    ///
    /// A drop onto the node itself (not into a gap) nests the dragged entry.
    /// A gap drop goes before the target when `relative_drop_position` is
    /// negative and after it otherwise.
    #[must_use]
    pub const fn from_gesture(drop_to_gap: bool, relative_drop_position: i32) -> Self {
        if !drop_to_gap {
            Self::Inside
        } else if relative_drop_position < 0 {
            Self::Before
        } else {
            Self::After
        }
    }
}

/// Errors that reject a move outright.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// The drop target lies inside the dragged node's own subtree.
    #[error("cannot move requirement {dragged} into its own subtree (target {target})")]
    IntoOwnSubtree {
        /// The dragged node.
        dragged: RequirementId,
        /// The drop target.
        target: RequirementId,
    },
    /// The move would leave a track somewhere other than directly beneath a
    /// top-level node.
    #[error("tracks may only sit directly under a top-level requirement (moving {0})")]
    MisplacedTrack(RequirementId),
    /// Requirement nodes cannot be dropped onto course leaves.
    #[error("cannot drop requirement {0} onto a course")]
    RequirementOntoCourse(RequirementId),
}

/// A node's position after restructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodePlacement {
    /// The node.
    pub id: RequirementId,
    /// Its parent; `None` at the top level.
    pub parent_requirement_id: Option<RequirementId>,
    /// Zero-based position among its siblings.
    pub sort_order: usize,
}

/// A course link's position after restructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkPlacement {
    /// The link.
    pub fulfillment_id: FulfillmentId,
    /// The requirement it now belongs to.
    pub requirement_id: RequirementId,
    /// Zero-based position among that requirement's links.
    pub sort_order: usize,
}

/// Finds a node anywhere in the tree.
#[must_use]
pub fn find_node(tree: &[RequirementNode], id: RequirementId) -> Option<&RequirementNode> {
    walk_tree(tree).find(|node| node.id == id)
}

/// Finds a node's parent.
///
/// Returns `None` if the node does not exist, `Some(None)` for a top-level
/// node.
#[must_use]
pub fn parent_of(tree: &[RequirementNode], id: RequirementId) -> Option<Option<RequirementId>> {
    if tree.iter().any(|node| node.id == id) {
        return Some(None);
    }
    walk_tree(tree)
        .find(|node| node.children.iter().any(|child| child.id == id))
        .map(|parent| Some(parent.id))
}

fn is_top_level(tree: &[RequirementNode], id: RequirementId) -> bool {
    tree.iter().any(|node| node.id == id)
}

fn splice(nodes: &mut Vec<RequirementNode>, id: RequirementId) -> Option<RequirementNode> {
    if let Some(at) = nodes.iter().position(|node| node.id == id) {
        return Some(nodes.remove(at));
    }
    nodes
        .iter_mut()
        .find_map(|node| splice(&mut node.children, id))
}

fn insert(
    nodes: &mut Vec<RequirementNode>,
    parent: Option<RequirementId>,
    target: RequirementId,
    position: DropPosition,
    mut node: RequirementNode,
) -> Result<(), RequirementNode> {
    if let Some(at) = nodes.iter().position(|candidate| candidate.id == target) {
        match position {
            DropPosition::Inside => {
                node.parent_requirement_id = Some(target);
                nodes[at].children.insert(0, node);
            }
            DropPosition::Before => {
                node.parent_requirement_id = parent;
                nodes.insert(at, node);
            }
            DropPosition::After => {
                node.parent_requirement_id = parent;
                nodes.insert(at + 1, node);
            }
        }
        return Ok(());
    }

    for candidate in nodes.iter_mut() {
        let id = candidate.id;
        node = match insert(&mut candidate.children, Some(id), target, position, node) {
            Ok(()) => return Ok(()),
            Err(node) => node,
        };
    }
    Err(node)
}

fn renumber(nodes: &mut [RequirementNode], parent: Option<RequirementId>) {
    for (sort_order, node) in nodes.iter_mut().enumerate() {
        node.sort_order = sort_order;
        node.parent_requirement_id = parent;
        let id = node.id;
        renumber(&mut node.children, Some(id));
    }
}

/// Moves a requirement node within the tree.
///
/// The input is left untouched; the returned tree has the dragged node
/// spliced out and reinserted relative to `drop`, with every node's
/// `parent_requirement_id` and `sort_order` brought up to date.
///
/// If either node cannot be found, or a node is dropped onto itself, the tree
/// is returned unchanged.
///
/// # Errors
///
/// - [`MoveError::IntoOwnSubtree`] if `drop` is a descendant of `drag`.
/// - [`MoveError::MisplacedTrack`] if the move would place a track, or a node
///   holding tracks, below the top level.
#[instrument(level = "debug", skip(tree))]
pub fn move_node(
    tree: &[RequirementNode],
    drag: RequirementId,
    drop: RequirementId,
    position: DropPosition,
) -> Result<Vec<RequirementNode>, MoveError> {
    let Some(dragged) = find_node(tree, drag) else {
        tracing::debug!("dragged node not found; tree unchanged");
        return Ok(tree.to_vec());
    };
    if drag == drop {
        return Ok(tree.to_vec());
    }
    if dragged.walk().any(|node| node.id == drop) {
        return Err(MoveError::IntoOwnSubtree {
            dragged: drag,
            target: drop,
        });
    }
    let Some(new_parent) = (match position {
        DropPosition::Inside => find_node(tree, drop).map(|_| Some(drop)),
        DropPosition::Before | DropPosition::After => parent_of(tree, drop),
    }) else {
        tracing::debug!("drop target not found; tree unchanged");
        return Ok(tree.to_vec());
    };

    if let Some(parent) = new_parent {
        let holds_tracks = dragged.children.iter().any(RequirementNode::is_track);
        if holds_tracks || (dragged.is_track() && !is_top_level(tree, parent)) {
            return Err(MoveError::MisplacedTrack(drag));
        }
    }

    let mut moved = tree.to_vec();
    let Some(node) = splice(&mut moved, drag) else {
        return Ok(tree.to_vec());
    };
    if insert(&mut moved, None, drop, position, node).is_err() {
        return Ok(tree.to_vec());
    }
    renumber(&mut moved, None);
    Ok(moved)
}

/// Flattens the tree into the restructuring payload.
///
/// Nodes are listed in depth-first pre-order; `sort_order` is each node's
/// zero-based index among its siblings.
#[must_use]
pub fn flatten(tree: &[RequirementNode]) -> Vec<NodePlacement> {
    fn visit(
        nodes: &[RequirementNode],
        parent: Option<RequirementId>,
        out: &mut Vec<NodePlacement>,
    ) {
        for (sort_order, node) in nodes.iter().enumerate() {
            out.push(NodePlacement {
                id: node.id,
                parent_requirement_id: parent,
                sort_order,
            });
            visit(&node.children, Some(node.id), out);
        }
    }

    let mut placements = Vec::new();
    visit(tree, None, &mut placements);
    placements
}

/// Ordered course links per requirement, for every node in the tree.
#[must_use]
pub fn links_by_requirement(tree: &[RequirementNode]) -> BTreeMap<RequirementId, Vec<CourseLink>> {
    walk_tree(tree)
        .map(|node| {
            let mut links = node.courses.clone();
            links.sort_by_key(|link| link.sort_order);
            (node.id, links)
        })
        .collect()
}

/// Where a course leaf is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseDropTarget {
    /// Directly onto a requirement node: append to its links.
    OnRequirement,
    /// Before another link.
    Before(FulfillmentId),
    /// After another link.
    After(FulfillmentId),
}

/// Computes the insertion index for a dropped course leaf.
///
/// The index refers to `links` with the dragged link removed, which is the
/// list [`move_course_leaf`] inserts into. An unknown neighbour appends.
#[must_use]
pub fn course_drop_index(
    links: &[CourseLink],
    drag: FulfillmentId,
    target: CourseDropTarget,
) -> usize {
    let remaining: Vec<FulfillmentId> = links
        .iter()
        .map(|link| link.fulfillment_id)
        .filter(|id| *id != drag)
        .collect();
    let position_of = |id: FulfillmentId| remaining.iter().position(|candidate| *candidate == id);

    match target {
        CourseDropTarget::OnRequirement => remaining.len(),
        CourseDropTarget::Before(id) => position_of(id).unwrap_or(remaining.len()),
        CourseDropTarget::After(id) => position_of(id).map_or(remaining.len(), |at| at + 1),
    }
}

fn link_placements(
    requirement_id: RequirementId,
    links: &[CourseLink],
) -> impl Iterator<Item = LinkPlacement> + '_ {
    links
        .iter()
        .enumerate()
        .map(move |(sort_order, link)| LinkPlacement {
            fulfillment_id: link.fulfillment_id,
            requirement_id,
            sort_order,
        })
}

/// Moves a course leaf between (or within) requirements.
///
/// The link is removed from its source list and inserted into the target
/// list at `target_index` (clamped to the list length). Every link of the
/// source and target lists is renumbered; when source and target are the
/// same requirement only that list is returned. An unknown link or an
/// unknown target requirement yields an empty payload.
#[must_use]
#[instrument(level = "debug", skip(links))]
pub fn move_course_leaf(
    drag: FulfillmentId,
    target_requirement: RequirementId,
    target_index: usize,
    links: &BTreeMap<RequirementId, Vec<CourseLink>>,
) -> Vec<LinkPlacement> {
    let Some((source, position)) = links.iter().find_map(|(requirement, list)| {
        list.iter()
            .position(|link| link.fulfillment_id == drag)
            .map(|position| (*requirement, position))
    }) else {
        tracing::debug!("dragged course link not found");
        return Vec::new();
    };
    if !links.contains_key(&target_requirement) {
        tracing::debug!("target requirement not found");
        return Vec::new();
    }

    let mut source_list = links.get(&source).cloned().unwrap_or_default();
    let link = source_list.remove(position);

    if source == target_requirement {
        let at = target_index.min(source_list.len());
        source_list.insert(at, link);
        return link_placements(source, &source_list).collect();
    }

    let mut target_list = links
        .get(&target_requirement)
        .cloned()
        .unwrap_or_default();
    let at = target_index.min(target_list.len());
    target_list.insert(at, link);

    link_placements(source, &source_list)
        .chain(link_placements(target_requirement, &target_list))
        .collect()
}

/// The outcome of a drag-and-drop gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restructure {
    /// A requirement node moved.
    Nodes {
        /// The tree after the move.
        tree: Vec<RequirementNode>,
        /// Placement of every node.
        placements: Vec<NodePlacement>,
    },
    /// A course leaf moved.
    Links(Vec<LinkPlacement>),
}

/// Dispatches a drag-and-drop gesture by the keys of the dragged entry and
/// the drop target.
///
/// A course dropped onto a requirement node is appended to that node's links
/// whatever the position; a course dropped onto another course lands before
/// or after it in that course's requirement.
///
/// # Errors
///
/// Returns the errors of [`move_node`], and
/// [`MoveError::RequirementOntoCourse`] for a requirement dropped onto a
/// course leaf.
pub fn plan_drop(
    tree: &[RequirementNode],
    drag: TreeKey,
    drop: TreeKey,
    position: DropPosition,
) -> Result<Restructure, MoveError> {
    match (drag, drop) {
        (TreeKey::Requirement(drag), TreeKey::Requirement(drop)) => {
            let tree = move_node(tree, drag, drop, position)?;
            let placements = flatten(&tree);
            Ok(Restructure::Nodes { tree, placements })
        }
        (TreeKey::Requirement(drag), TreeKey::Course(_)) => {
            Err(MoveError::RequirementOntoCourse(drag))
        }
        (TreeKey::Course(drag), TreeKey::Requirement(target)) => {
            let links = links_by_requirement(tree);
            let index = links.get(&target).map_or(0, |list| {
                course_drop_index(list, drag, CourseDropTarget::OnRequirement)
            });
            Ok(Restructure::Links(move_course_leaf(drag, target, index, &links)))
        }
        (TreeKey::Course(drag), TreeKey::Course(neighbour)) if drag == neighbour => {
            tracing::debug!("course dropped onto itself");
            Ok(Restructure::Links(Vec::new()))
        }
        (TreeKey::Course(drag), TreeKey::Course(neighbour)) => {
            let links = links_by_requirement(tree);
            let Some((&target, list)) = links
                .iter()
                .find(|(_, list)| list.iter().any(|link| link.fulfillment_id == neighbour))
            else {
                return Ok(Restructure::Links(Vec::new()));
            };
            let drop_target = match position {
                DropPosition::Before => CourseDropTarget::Before(neighbour),
                DropPosition::Inside | DropPosition::After => CourseDropTarget::After(neighbour),
            };
            let index = course_drop_index(list, drag, drop_target);
            Ok(Restructure::Links(move_course_leaf(drag, target, index, &links)))
        }
    }
}

/// Applies course link placements to a tree.
///
/// Links named in `placements` are detached from wherever they are and
/// reattached to their new requirement with their new sort order. Each
/// node's links end up ordered by `sort_order`. A placement onto a
/// requirement missing from the tree is skipped and its link stays put.
pub fn apply_link_placements(tree: &mut [RequirementNode], placements: &[LinkPlacement]) {
    fn detach(
        nodes: &mut [RequirementNode],
        moving: &HashSet<FulfillmentId>,
        out: &mut HashMap<FulfillmentId, CourseLink>,
    ) {
        for node in nodes {
            node.courses.retain(|link| {
                if moving.contains(&link.fulfillment_id) {
                    out.insert(link.fulfillment_id, *link);
                    false
                } else {
                    true
                }
            });
            detach(&mut node.children, moving, out);
        }
    }

    fn attach(
        nodes: &mut [RequirementNode],
        placed: &mut HashMap<RequirementId, Vec<CourseLink>>,
    ) {
        for node in nodes {
            if let Some(links) = placed.remove(&node.id) {
                node.courses.extend(links);
                node.courses.sort_by_key(|link| link.sort_order);
            }
            attach(&mut node.children, placed);
        }
    }

    let known: HashSet<RequirementId> = walk_tree(tree).map(|node| node.id).collect();
    let placements: Vec<&LinkPlacement> = placements
        .iter()
        .filter(|placement| {
            let found = known.contains(&placement.requirement_id);
            if !found {
                tracing::warn!(
                    link = %placement.fulfillment_id,
                    requirement = %placement.requirement_id,
                    "placement onto unknown requirement skipped"
                );
            }
            found
        })
        .collect();

    let moving: HashSet<FulfillmentId> = placements.iter().map(|p| p.fulfillment_id).collect();
    let mut detached = HashMap::new();
    detach(tree, &moving, &mut detached);

    let mut placed: HashMap<RequirementId, Vec<CourseLink>> = HashMap::new();
    for placement in placements {
        if let Some(mut link) = detached.remove(&placement.fulfillment_id) {
            link.sort_order = placement.sort_order;
            placed.entry(placement.requirement_id).or_default().push(link);
        }
    }
    attach(tree, &mut placed);
}

/// Removes a node and its whole subtree.
///
/// Returns the remaining tree (renumbered) and the fulfillment links that
/// were detached along with the removed nodes. An unknown id leaves the tree
/// unchanged and detaches nothing.
#[must_use]
pub fn remove_node(
    tree: &[RequirementNode],
    id: RequirementId,
) -> (Vec<RequirementNode>, Vec<FulfillmentId>) {
    let mut remaining = tree.to_vec();
    let Some(removed) = splice(&mut remaining, id) else {
        return (remaining, Vec::new());
    };
    let detached = removed
        .walk()
        .flat_map(|node| node.courses.iter().map(|link| link.fulfillment_id))
        .collect();
    renumber(&mut remaining, None);
    (remaining, detached)
}

/// Builds a nested tree from flat store rows.
///
/// Rows are attached under their `parent_requirement_id`; rows whose parent
/// is absent become top-level nodes. Siblings and course links are ordered
/// by `sort_order`. Rows caught in a parent cycle are promoted to the top
/// level rather than dropped.
#[must_use]
pub fn assemble_tree(rows: Vec<RequirementNode>) -> Vec<RequirementNode> {
    fn attach(
        mut node: RequirementNode,
        by_parent: &mut HashMap<RequirementId, Vec<RequirementNode>>,
    ) -> RequirementNode {
        if let Some(children) = by_parent.remove(&node.id) {
            node.children
                .extend(children.into_iter().map(|child| attach(child, by_parent)));
        }
        node.children.sort_by_key(|child| child.sort_order);
        node.courses.sort_by_key(|link| link.sort_order);
        node
    }

    let ids: HashSet<RequirementId> = rows.iter().map(|row| row.id).collect();
    let mut roots = Vec::new();
    let mut by_parent: HashMap<RequirementId, Vec<RequirementNode>> = HashMap::new();

    for row in rows {
        match row.parent_requirement_id {
            Some(parent) if ids.contains(&parent) && parent != row.id => {
                by_parent.entry(parent).or_default().push(row);
            }
            _ => roots.push(row),
        }
    }

    let mut tree: Vec<RequirementNode> = roots
        .into_iter()
        .map(|root| attach(root, &mut by_parent))
        .collect();

    while let Some(&parent) = by_parent.keys().min() {
        let orphans = by_parent.remove(&parent).unwrap_or_default();
        tracing::warn!(%parent, count = orphans.len(), "requirement rows form a parent cycle");
        tree.extend(orphans.into_iter().map(|row| attach(row, &mut by_parent)));
    }

    tree.sort_by_key(|node| node.sort_order);
    tree
}

/// Flattens a tree back into store rows.
///
/// Each row has its children removed and its parent and sort order taken
/// from its position in the tree.
#[must_use]
pub fn into_rows(tree: Vec<RequirementNode>) -> Vec<RequirementNode> {
    fn visit(
        nodes: Vec<RequirementNode>,
        parent: Option<RequirementId>,
        out: &mut Vec<RequirementNode>,
    ) {
        for (sort_order, mut node) in nodes.into_iter().enumerate() {
            let children = std::mem::take(&mut node.children);
            node.parent_requirement_id = parent;
            node.sort_order = sort_order;
            let id = node.id;
            out.push(node);
            visit(children, Some(id), out);
        }
    }

    let mut rows = Vec::new();
    visit(tree, None, &mut rows);
    rows
}

/// A structural problem found in a requirement tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeIssue {
    /// A track sits below a non-top-level node.
    #[error("Track \"{name}\" must sit directly under a top-level requirement.")]
    MisplacedTrack {
        /// The track's name.
        name: String,
    },
    /// Two siblings share a name.
    #[error("Requirement \"{name}\" appears more than once under {parent}.")]
    DuplicateSibling {
        /// The shared bare name.
        name: String,
        /// The parent's name, or "the top level".
        parent: String,
    },
    /// A course is linked twice to one requirement.
    #[error("Course {course} is linked to \"{name}\" more than once.")]
    DuplicateCourse {
        /// The requirement's name.
        name: String,
        /// The course's label.
        course: String,
    },
}

/// Checks a tree before it is saved.
///
/// Sibling names are compared without their logic suffix and ignoring case.
#[must_use]
pub fn check_tree(tree: &[RequirementNode], index: &CourseIndex) -> Vec<TreeIssue> {
    fn check_siblings(nodes: &[RequirementNode], parent: &str, issues: &mut Vec<TreeIssue>) {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for node in nodes {
            let key = base_name(&node.name).to_lowercase();
            if !seen.insert(key.clone()) && reported.insert(key) {
                issues.push(TreeIssue::DuplicateSibling {
                    name: base_name(&node.name),
                    parent: parent.to_string(),
                });
            }
        }
    }

    fn visit(
        nodes: &[RequirementNode],
        depth: usize,
        index: &CourseIndex,
        issues: &mut Vec<TreeIssue>,
    ) {
        for node in nodes {
            if depth >= 2 && node.is_track() {
                issues.push(TreeIssue::MisplacedTrack {
                    name: node.name.clone(),
                });
            }

            let mut courses: HashSet<CourseId> = HashSet::new();
            let mut reported: HashSet<CourseId> = HashSet::new();
            for link in &node.courses {
                if !courses.insert(link.course_id) && reported.insert(link.course_id) {
                    issues.push(TreeIssue::DuplicateCourse {
                        name: node.name.clone(),
                        course: index.label(link.course_id),
                    });
                }
            }

            check_siblings(&node.children, &format!("\"{}\"", node.name), issues);
            visit(&node.children, depth + 1, index, issues);
        }
    }

    let mut issues = Vec::new();
    check_siblings(tree, "the top level", &mut issues);
    visit(tree, 0, index, &mut issues);
    issues
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use test_case::test_case;

    use super::*;
    use crate::domain::{MajorMode, course::tests::course};

    fn rid(n: u128) -> RequirementId {
        RequirementId::from_u128(n)
    }

    fn fid(n: u128) -> FulfillmentId {
        FulfillmentId::from_u128(n)
    }

    fn node(id: u128, children: Vec<RequirementNode>) -> RequirementNode {
        let mut node = RequirementNode::new(rid(id), format!("N{id}"));
        node.children = children;
        node
    }

    fn link(fulfillment: u128, course: u128, sort_order: usize) -> CourseLink {
        CourseLink {
            fulfillment_id: fid(fulfillment),
            course_id: CourseId::from_u128(course),
            sort_order,
        }
    }

    /// N1 { N3, N4 }, N2, N5 { N6 }
    fn sample() -> Vec<RequirementNode> {
        vec![
            node(1, vec![node(3, vec![]), node(4, vec![])]),
            node(2, vec![]),
            node(5, vec![node(6, vec![])]),
        ]
    }

    fn placement(placements: &[NodePlacement], id: u128) -> NodePlacement {
        *placements.iter().find(|p| p.id == rid(id)).unwrap()
    }

    fn assert_dense_and_complete(original: &[RequirementNode], placements: &[NodePlacement]) {
        let before: BTreeSet<_> = walk_tree(original).map(|node| node.id).collect();
        let after: BTreeSet<_> = placements.iter().map(|p| p.id).collect();
        assert_eq!(before, after);
        assert_eq!(placements.len(), before.len());

        let mut by_parent: HashMap<Option<RequirementId>, Vec<usize>> = HashMap::new();
        for p in placements {
            by_parent.entry(p.parent_requirement_id).or_default().push(p.sort_order);
        }
        for (_, mut orders) in by_parent {
            orders.sort_unstable();
            assert_eq!(orders, (0..orders.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn gesture_maps_to_position() {
        assert_eq!(DropPosition::from_gesture(false, -1), DropPosition::Inside);
        assert_eq!(DropPosition::from_gesture(true, -1), DropPosition::Before);
        assert_eq!(DropPosition::from_gesture(true, 0), DropPosition::After);
        assert_eq!(DropPosition::from_gesture(true, 1), DropPosition::After);
    }

    #[test]
    fn flatten_is_pre_order_with_dense_sort_orders() {
        let placements = flatten(&sample());

        let ids: Vec<_> = placements.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![rid(1), rid(3), rid(4), rid(2), rid(5), rid(6)]);
        assert_eq!(placement(&placements, 1).parent_requirement_id, None);
        assert_eq!(placement(&placements, 4).parent_requirement_id, Some(rid(1)));
        assert_eq!(placement(&placements, 4).sort_order, 1);
        assert_eq!(placement(&placements, 5).sort_order, 2);
    }

    #[test]
    fn child_moved_after_root_sibling() {
        let tree = sample();
        let before = flatten(&tree);

        let moved = move_node(&tree, rid(3), rid(2), DropPosition::from_gesture(true, 1)).unwrap();
        let after = flatten(&moved);

        let n3 = placement(&after, 3);
        assert_eq!(n3.parent_requirement_id, None);
        assert_eq!(n3.sort_order, placement(&before, 2).sort_order + 1);
        assert_eq!(placement(&after, 5).sort_order, placement(&before, 5).sort_order + 1);
        assert_eq!(placement(&after, 4).sort_order, 0);
        assert_dense_and_complete(&tree, &after);
    }

    #[test]
    fn drop_inside_becomes_first_child() {
        let moved = move_node(&sample(), rid(2), rid(5), DropPosition::Inside).unwrap();

        let n5 = find_node(&moved, rid(5)).unwrap();
        let children: Vec<_> = n5.children.iter().map(|child| child.id).collect();
        assert_eq!(children, vec![rid(2), rid(6)]);
        assert_eq!(n5.children[0].parent_requirement_id, Some(rid(5)));
        assert_eq!(n5.children[1].sort_order, 1);
    }

    #[test]
    fn drop_before_sibling() {
        let moved = move_node(&sample(), rid(4), rid(3), DropPosition::Before).unwrap();

        let n1 = find_node(&moved, rid(1)).unwrap();
        let children: Vec<_> = n1.children.iter().map(|child| child.id).collect();
        assert_eq!(children, vec![rid(4), rid(3)]);
    }

    #[test]
    fn every_move_preserves_ids_and_density() {
        let tree = sample();
        let ids: Vec<_> = walk_tree(&tree).map(|node| node.id).collect();
        let positions = [DropPosition::Inside, DropPosition::Before, DropPosition::After];

        for &drag in &ids {
            for &drop in &ids {
                for position in positions {
                    let Ok(moved) = move_node(&tree, drag, drop, position) else {
                        continue;
                    };
                    assert_dense_and_complete(&tree, &flatten(&moved));
                }
            }
        }
    }

    #[test]
    fn rejects_drop_into_own_subtree() {
        let err = move_node(&sample(), rid(1), rid(4), DropPosition::Inside).unwrap_err();

        assert_eq!(
            err,
            MoveError::IntoOwnSubtree {
                dragged: rid(1),
                target: rid(4),
            }
        );
    }

    #[test]
    fn unknown_nodes_leave_tree_unchanged() {
        let tree = sample();

        assert_eq!(move_node(&tree, rid(99), rid(1), DropPosition::Inside).unwrap(), tree);
        assert_eq!(move_node(&tree, rid(2), rid(99), DropPosition::After).unwrap(), tree);
        assert_eq!(move_node(&tree, rid(2), rid(2), DropPosition::Inside).unwrap(), tree);
    }

    #[test]
    fn tracks_stay_directly_under_top_level() {
        let mut tree = sample();
        tree[2].children[0].major_mode = Some(MajorMode::Track);

        // N6 is a track under N5; moving it under N1 (top level) is fine.
        assert!(move_node(&tree, rid(6), rid(1), DropPosition::Inside).is_ok());
        // Nesting it under N3 is not.
        assert_eq!(
            move_node(&tree, rid(6), rid(3), DropPosition::Inside).unwrap_err(),
            MoveError::MisplacedTrack(rid(6))
        );
        // Nor may N5, which holds a track, be nested.
        assert_eq!(
            move_node(&tree, rid(5), rid(2), DropPosition::Inside).unwrap_err(),
            MoveError::MisplacedTrack(rid(5))
        );
    }

    #[test]
    fn tracks_checked_on_sibling_drops() {
        let mut tree = sample();
        tree[0].children[1].children = vec![node(7, vec![])];
        tree[2].children[0].major_mode = Some(MajorMode::Track);

        // Beside N7 puts the track under N4, two levels down.
        assert_eq!(
            move_node(&tree, rid(6), rid(7), DropPosition::Before).unwrap_err(),
            MoveError::MisplacedTrack(rid(6))
        );
        assert_eq!(
            move_node(&tree, rid(6), rid(7), DropPosition::After).unwrap_err(),
            MoveError::MisplacedTrack(rid(6))
        );
        // Beside N4 puts it directly under N1.
        assert!(move_node(&tree, rid(6), rid(4), DropPosition::After).is_ok());

        // N5 holds a track, so it may sit among the roots but not below them.
        assert_eq!(
            move_node(&tree, rid(5), rid(3), DropPosition::After).unwrap_err(),
            MoveError::MisplacedTrack(rid(5))
        );
        assert!(move_node(&tree, rid(5), rid(2), DropPosition::Before).is_ok());
    }

    fn link_map() -> BTreeMap<RequirementId, Vec<CourseLink>> {
        BTreeMap::from([
            (rid(1), vec![link(10, 100, 0), link(11, 101, 1), link(12, 102, 2)]),
            (rid(2), vec![link(20, 200, 0)]),
        ])
    }

    #[test]
    fn course_moves_between_requirements() {
        let placements = move_course_leaf(fid(11), rid(2), 0, &link_map());

        assert_eq!(
            placements,
            vec![
                LinkPlacement { fulfillment_id: fid(10), requirement_id: rid(1), sort_order: 0 },
                LinkPlacement { fulfillment_id: fid(12), requirement_id: rid(1), sort_order: 1 },
                LinkPlacement { fulfillment_id: fid(11), requirement_id: rid(2), sort_order: 0 },
                LinkPlacement { fulfillment_id: fid(20), requirement_id: rid(2), sort_order: 1 },
            ]
        );
    }

    #[test]
    fn course_reordered_within_requirement_omits_duplicate_list() {
        let links = link_map();
        let index = course_drop_index(&links[&rid(1)], fid(10), CourseDropTarget::After(fid(12)));
        assert_eq!(index, 2);

        let placements = move_course_leaf(fid(10), rid(1), index, &links);

        let order: Vec<_> = placements.iter().map(|p| (p.fulfillment_id, p.sort_order)).collect();
        assert_eq!(order, vec![(fid(11), 0), (fid(12), 1), (fid(10), 2)]);
    }

    #[test]
    fn course_drop_index_variants() {
        let links = &link_map()[&rid(1)];

        assert_eq!(course_drop_index(links, fid(20), CourseDropTarget::OnRequirement), 3);
        assert_eq!(course_drop_index(links, fid(20), CourseDropTarget::Before(fid(11))), 1);
        assert_eq!(course_drop_index(links, fid(12), CourseDropTarget::Before(fid(99))), 2);
    }

    #[test]
    fn unknown_course_link_yields_empty_payload() {
        assert!(move_course_leaf(fid(99), rid(1), 0, &link_map()).is_empty());
    }

    #[test]
    fn unknown_target_requirement_yields_empty_payload() {
        assert!(move_course_leaf(fid(10), rid(99), 0, &link_map()).is_empty());
    }

    #[test]
    fn target_index_is_clamped() {
        let placements = move_course_leaf(fid(20), rid(1), 50, &link_map());

        assert_eq!(placements.len(), 4);
        assert_eq!(placements[3].fulfillment_id, fid(20));
        assert_eq!(placements[3].sort_order, 3);
    }

    fn tree_with_links() -> Vec<RequirementNode> {
        let mut tree = sample();
        tree[0].courses = vec![link(10, 100, 0), link(11, 101, 1)];
        tree[1].courses = vec![link(20, 200, 0)];
        tree
    }

    #[test]
    fn plan_drop_dispatches_by_key() {
        let tree = tree_with_links();

        let Restructure::Links(placements) = plan_drop(
            &tree,
            TreeKey::Course(fid(10)),
            TreeKey::Requirement(rid(2)),
            DropPosition::Inside,
        )
        .unwrap() else {
            panic!("expected link placements");
        };
        assert_eq!(placements.last().unwrap().fulfillment_id, fid(10));
        assert_eq!(placements.last().unwrap().sort_order, 1);

        let Restructure::Links(placements) = plan_drop(
            &tree,
            TreeKey::Course(fid(20)),
            TreeKey::Course(fid(10)),
            DropPosition::Before,
        )
        .unwrap() else {
            panic!("expected link placements");
        };
        let order: Vec<_> = placements
            .iter()
            .filter(|p| p.requirement_id == rid(1))
            .map(|p| p.fulfillment_id)
            .collect();
        assert_eq!(order, vec![fid(20), fid(10), fid(11)]);

        assert!(matches!(
            plan_drop(
                &tree,
                TreeKey::Requirement(rid(2)),
                TreeKey::Requirement(rid(1)),
                DropPosition::Inside,
            ),
            Ok(Restructure::Nodes { .. })
        ));
        assert_eq!(
            plan_drop(
                &tree,
                TreeKey::Requirement(rid(2)),
                TreeKey::Course(fid(10)),
                DropPosition::After,
            )
            .unwrap_err(),
            MoveError::RequirementOntoCourse(rid(2))
        );
    }

    #[test]
    fn course_dropped_on_missing_requirement_keeps_its_link() {
        let tree = tree_with_links();

        let result = plan_drop(
            &tree,
            TreeKey::Course(fid(10)),
            TreeKey::Requirement(rid(99)),
            DropPosition::Inside,
        )
        .unwrap();
        assert_eq!(result, Restructure::Links(Vec::new()));

        let mut applied = tree.clone();
        let stray = LinkPlacement {
            fulfillment_id: fid(10),
            requirement_id: rid(99),
            sort_order: 0,
        };
        apply_link_placements(&mut applied, &[stray]);
        assert_eq!(applied, tree);
    }

    #[test_case(DropPosition::Before; "before")]
    #[test_case(DropPosition::Inside; "inside")]
    #[test_case(DropPosition::After; "after")]
    fn course_dropped_on_itself_does_nothing(position: DropPosition) {
        let mut tree = tree_with_links();
        tree[0].courses.push(link(12, 102, 2));

        let dragged = TreeKey::Course(fid(10));

        let result = plan_drop(&tree, dragged, dragged, position);

        assert_eq!(result.unwrap(), Restructure::Links(Vec::new()));
    }

    #[test]
    fn link_placements_apply_to_tree() {
        let mut tree = tree_with_links();
        let placements = move_course_leaf(fid(11), rid(2), 0, &links_by_requirement(&tree));

        apply_link_placements(&mut tree, &placements);

        let n2: Vec<_> = find_node(&tree, rid(2))
            .unwrap()
            .courses
            .iter()
            .map(|l| l.fulfillment_id)
            .collect();
        assert_eq!(n2, vec![fid(11), fid(20)]);
        assert_eq!(find_node(&tree, rid(1)).unwrap().courses.len(), 1);
    }

    #[test]
    fn removing_node_detaches_subtree_links() {
        let mut tree = sample();
        tree[0].courses = vec![link(10, 100, 0)];
        tree[0].children[1].courses = vec![link(40, 400, 0), link(41, 401, 1)];

        let (remaining, detached) = remove_node(&tree, rid(1));

        assert_eq!(detached, vec![fid(10), fid(40), fid(41)]);
        assert!(find_node(&remaining, rid(4)).is_none());
        assert_eq!(remaining[0].id, rid(2));
        assert_eq!(remaining[0].sort_order, 0);

        let (unchanged, none) = remove_node(&tree, rid(99));
        assert_eq!(unchanged, tree);
        assert!(none.is_empty());
    }

    #[test]
    fn assemble_and_flatten_rows_round_trip() {
        let tree = sample();
        let mut rows = into_rows(tree.clone());
        rows.reverse();

        let mut assembled = assemble_tree(rows);
        renumber(&mut assembled, None);

        assert_eq!(flatten(&assembled), flatten(&tree));
    }

    #[test]
    fn rows_with_missing_parent_or_cycle_become_roots() {
        let mut orphan = RequirementNode::new(rid(1), "Orphan");
        orphan.parent_requirement_id = Some(rid(42));
        let mut a = RequirementNode::new(rid(2), "A");
        a.parent_requirement_id = Some(rid(3));
        let mut b = RequirementNode::new(rid(3), "B");
        b.parent_requirement_id = Some(rid(2));

        let tree = assemble_tree(vec![orphan, a, b]);

        let all: BTreeSet<_> = walk_tree(&tree).map(|node| node.id).collect();
        assert_eq!(all, BTreeSet::from([rid(1), rid(2), rid(3)]));
        assert!(tree.iter().any(|node| node.id == rid(1)));
    }

    #[test]
    fn check_tree_reports_structural_problems() {
        let index = CourseIndex::new([course(100, "MA 153", "Calculus")]);
        let mut tree = sample();
        tree[0].children[0].name = "Math: Pick 2".to_string();
        tree[0].children[1].name = "math".to_string();
        tree[0].children[1].children = vec![{
            let mut track = RequirementNode::new(rid(7), "Deep Track");
            track.major_mode = Some(MajorMode::Track);
            track
        }];
        tree[1].courses = vec![link(20, 100, 0), link(21, 100, 1), link(22, 100, 2)];

        let messages: Vec<_> = check_tree(&tree, &index).iter().map(ToString::to_string).collect();

        assert_eq!(
            messages,
            vec![
                "Requirement \"math\" appears more than once under \"N1\".",
                "Track \"Deep Track\" must sit directly under a top-level requirement.",
                "Course MA 153 is linked to \"N2\" more than once.",
            ]
        );
    }
}
