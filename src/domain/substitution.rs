//! Substitution edges and the equivalence groups they induce.
//!
//! A substitution edge says two courses may stand in for each other. Edges
//! are symmetric for grouping purposes, and only edges whose endpoints both
//! sit inside the universe being grouped (a basket's courses, or the courses
//! linked to one requirement) take part.

use std::collections::{BTreeSet, HashSet};

use nonempty::NonEmpty;
use petgraph::{graphmap::UnGraphMap, visit::Bfs};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{CourseId, CourseIndex};

/// A stored "may substitute for" relation between two courses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubstitutionEdge {
    /// The course being substituted.
    pub primary_course_id: CourseId,
    /// The course that may take its place.
    pub substitute_course_id: CourseId,
}

impl SubstitutionEdge {
    /// Creates an edge.
    #[must_use]
    pub const fn new(primary_course_id: CourseId, substitute_course_id: CourseId) -> Self {
        Self {
            primary_course_id,
            substitute_course_id,
        }
    }

    /// Both endpoints, in stored order.
    #[must_use]
    pub const fn endpoints(&self) -> (CourseId, CourseId) {
        (self.primary_course_id, self.substitute_course_id)
    }
}

/// A maximal set of two or more mutually substitutable courses.
///
/// Members are kept in display order; the head is the group's primary
/// course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstituteGroup {
    members: NonEmpty<CourseId>,
}

impl SubstituteGroup {
    /// The representative course (first in display order).
    #[must_use]
    pub const fn primary(&self) -> CourseId {
        self.members.head
    }

    /// Every member after the primary.
    #[must_use]
    pub fn substitutes(&self) -> &[CourseId] {
        &self.members.tail
    }

    /// Iterates over all members in display order.
    pub fn iter(&self) -> impl Iterator<Item = CourseId> + '_ {
        self.members.iter().copied()
    }

    /// Number of members. Always at least two.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always `false`; groups are never empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Whether the course belongs to this group.
    #[must_use]
    pub fn contains(&self, id: CourseId) -> bool {
        self.members.iter().any(|member| *member == id)
    }

    /// Members as an owned list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<CourseId> {
        self.iter().collect()
    }
}

/// Partitions `universe` into substitute groups using `edges`.
///
/// Edges touching an id outside the universe are ignored, as are self-edges.
/// Only connected components with at least two members are returned; an id
/// with no usable edge is implicitly its own singleton and is left out.
///
/// Members are ordered with [`CourseIndex::sort_key`], and groups are ordered
/// by their primary's sort key, so the output is deterministic.
#[instrument(level = "trace", skip_all)]
pub fn build_groups<U, E>(universe: U, edges: E, index: &CourseIndex) -> Vec<SubstituteGroup>
where
    U: IntoIterator<Item = CourseId>,
    E: IntoIterator<Item = (CourseId, CourseId)>,
{
    let universe: BTreeSet<CourseId> = universe.into_iter().collect();

    let mut graph = UnGraphMap::<CourseId, ()>::with_capacity(universe.len(), universe.len());
    for (a, b) in edges {
        if a == b || !universe.contains(&a) || !universe.contains(&b) {
            continue;
        }
        graph.add_edge(a, b, ());
    }

    let mut visited = HashSet::with_capacity(graph.node_count());
    let mut groups = Vec::new();

    for &start in &universe {
        if visited.contains(&start) || !graph.contains_node(start) {
            continue;
        }

        let mut component = Vec::new();
        let mut bfs = Bfs::new(&graph, start);
        while let Some(id) = bfs.next(&graph) {
            visited.insert(id);
            component.push(id);
        }

        if component.len() < 2 {
            continue;
        }

        index.sort_ids(&mut component);
        if let Some(members) = NonEmpty::from_vec(component) {
            groups.push(SubstituteGroup { members });
        }
    }

    groups.sort_by_cached_key(|group| index.sort_key(group.primary()));
    tracing::trace!(groups = groups.len(), "built substitute groups");
    groups
}

/// Finds the group containing `id`, if any.
#[must_use]
pub fn group_of(groups: &[SubstituteGroup], id: CourseId) -> Option<&SubstituteGroup> {
    groups.iter().find(|group| group.contains(id))
}
