use std::path::PathBuf;

use degree_plan::{
    Catalog,
    domain::{
        DropPosition, Restructure, TreeKey,
        tree::{apply_link_placements, plan_drop},
    },
};
use tracing::instrument;

use crate::cli::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Move {
    /// The dragged entry: a requirement id, or 'course:<fulfillment id>'
    drag: TreeKey,

    /// The drop target: a requirement id, or 'course:<fulfillment id>'
    drop: TreeKey,

    /// Place before the target instead of inside it
    #[arg(long, conflicts_with = "after")]
    before: bool,

    /// Place after the target instead of inside it
    #[arg(long)]
    after: bool,

    /// Print the restructuring payload without saving it
    #[arg(long)]
    dry_run: bool,
}

impl Move {
    const fn position(&self) -> DropPosition {
        let relative = if self.before { -1 } else { 1 };
        DropPosition::from_gesture(self.before || self.after, relative)
    }

    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut catalog = Catalog::open(root);
        let tree = catalog.requirement_tree()?;

        let (payload, updated) = match plan_drop(&tree, self.drag, self.drop, self.position())? {
            Restructure::Nodes { tree, placements } => {
                (serde_json::to_string_pretty(&placements)?, tree)
            }
            Restructure::Links(placements) if placements.is_empty() => {
                println!("{}", "Nothing to move".dim());
                return Ok(());
            }
            Restructure::Links(placements) => {
                let mut tree = tree;
                apply_link_placements(&mut tree, &placements);
                (serde_json::to_string_pretty(&placements)?, tree)
            }
        };

        println!("{payload}");

        if self.dry_run {
            println!("{}", "Dry run; nothing saved".dim());
            return Ok(());
        }

        catalog.save_requirements(updated)?;
        println!(
            "{}",
            format!("✅ Moved {} relative to {}", self.drag, self.drop).success()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use degree_plan::domain::{FulfillmentId, RequirementId, tree::find_node};
    use tempfile::tempdir;

    use super::*;

    const REQUIREMENTS: &str = r#"[
        {"id": "00000000-0000-0000-0000-000000000001", "name": "N1", "sort_order": 0},
        {"id": "00000000-0000-0000-0000-000000000003", "name": "N3",
         "parent_requirement_id": "00000000-0000-0000-0000-000000000001",
         "courses": [
            {"fulfillment_id": "00000000-0000-0000-0000-0000000000f1",
             "course_id": "00000000-0000-0000-0000-0000000000c1", "sort_order": 0},
            {"fulfillment_id": "00000000-0000-0000-0000-0000000000f2",
             "course_id": "00000000-0000-0000-0000-0000000000c2", "sort_order": 1}
         ]},
        {"id": "00000000-0000-0000-0000-000000000002", "name": "N2", "sort_order": 1},
        {"id": "00000000-0000-0000-0000-000000000005", "name": "N5", "sort_order": 2}
    ]"#;

    fn rid(n: u128) -> RequirementId {
        RequirementId::from_u128(n)
    }

    fn setup() -> tempfile::TempDir {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("requirements.json"), REQUIREMENTS).unwrap();
        tmp
    }

    fn command(drag: TreeKey, drop: TreeKey, after: bool, dry_run: bool) -> Move {
        Move {
            drag,
            drop,
            before: false,
            after,
            dry_run,
        }
    }

    #[test]
    fn moves_child_after_root_sibling() {
        let tmp = setup();

        command(
            TreeKey::Requirement(rid(3)),
            TreeKey::Requirement(rid(2)),
            true,
            false,
        )
        .run(tmp.path().to_path_buf())
        .unwrap();

        let tree = Catalog::open(tmp.path().to_path_buf())
            .requirement_tree()
            .unwrap();
        let order: Vec<_> = tree.iter().map(|node| node.id).collect();
        assert_eq!(order, vec![rid(1), rid(2), rid(3), rid(5)]);
        assert_eq!(find_node(&tree, rid(3)).unwrap().parent_requirement_id, None);
        assert_eq!(find_node(&tree, rid(5)).unwrap().sort_order, 3);
    }

    #[test]
    fn moves_course_leaf_onto_requirement() {
        let tmp = setup();
        let link = FulfillmentId::from_u128(0xf1);

        command(TreeKey::Course(link), TreeKey::Requirement(rid(5)), false, false)
            .run(tmp.path().to_path_buf())
            .unwrap();

        let tree = Catalog::open(tmp.path().to_path_buf())
            .requirement_tree()
            .unwrap();
        let n3 = find_node(&tree, rid(3)).unwrap();
        assert_eq!(n3.courses.len(), 1);
        assert_eq!(n3.courses[0].sort_order, 0);
        assert_eq!(find_node(&tree, rid(5)).unwrap().courses[0].fulfillment_id, link);
    }

    #[test]
    fn dry_run_saves_nothing() {
        let tmp = setup();

        command(
            TreeKey::Requirement(rid(5)),
            TreeKey::Requirement(rid(1)),
            false,
            true,
        )
        .run(tmp.path().to_path_buf())
        .unwrap();

        let saved = std::fs::read_to_string(tmp.path().join("requirements.json")).unwrap();
        assert_eq!(saved, REQUIREMENTS);
    }

    #[test]
    fn course_onto_missing_requirement_saves_nothing() {
        let tmp = setup();

        command(
            TreeKey::Course(FulfillmentId::from_u128(0xf1)),
            TreeKey::Requirement(rid(99)),
            false,
            false,
        )
        .run(tmp.path().to_path_buf())
        .unwrap();

        let saved = std::fs::read_to_string(tmp.path().join("requirements.json")).unwrap();
        assert_eq!(saved, REQUIREMENTS);
    }

    #[test]
    fn rejects_drop_into_own_subtree() {
        let tmp = setup();

        let result = command(
            TreeKey::Requirement(rid(1)),
            TreeKey::Requirement(rid(3)),
            false,
            false,
        )
        .run(tmp.path().to_path_buf());

        assert!(result.is_err());
    }
}
