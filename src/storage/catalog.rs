//! A filesystem backed cache of catalog datasets.
//!
//! The [`Catalog`] reads each dataset (courses, requirement rows, substitution
//! edges, baskets, basket links and validation rules) from a file in its data
//! directory on first access and keeps it until the dataset is explicitly
//! invalidated. Callers invalidate after every mutation so stale reads are
//! never persisted.

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::domain::{
    Basket, BasketLink, Config, CourseIndex, CourseRecord, RequirementNode, SubstitutionEdge,
    ValidationRule,
    tree::{assemble_tree, into_rows},
};

/// Directory holding the configuration file, relative to the root.
pub const CONFIG_DIR: &str = ".plan";

/// Name of the configuration file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// The datasets a catalog serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// Course records.
    Courses,
    /// Flat requirement rows.
    Requirements,
    /// Substitution edges.
    Substitutions,
    /// Stored baskets.
    Baskets,
    /// Basket to requirement attachments.
    BasketLinks,
    /// Validation rules.
    Rules,
}

impl Dataset {
    /// Every dataset.
    pub const ALL: [Self; 6] = [
        Self::Courses,
        Self::Requirements,
        Self::Substitutions,
        Self::Baskets,
        Self::BasketLinks,
        Self::Rules,
    ];

    /// The file stem the dataset is stored under.
    #[must_use]
    pub const fn stem(self) -> &'static str {
        match self {
            Self::Courses => "courses",
            Self::Requirements => "requirements",
            Self::Substitutions => "substitutions",
            Self::Baskets => "baskets",
            Self::BasketLinks => "basket_links",
            Self::Rules => "rules",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

/// Errors reading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The dataset file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// The file is not valid JSON for the dataset.
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        /// The dataset file.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },
    /// The file is not valid YAML for the dataset.
    #[error("failed to parse {}: {source}", path.display())]
    Yaml {
        /// The dataset file.
        path: PathBuf,
        /// The underlying error.
        source: serde_yaml::Error,
    },
    /// More than one file claims the dataset.
    #[error("dataset '{dataset}' is stored in more than one file: {}", format_paths(paths))]
    Ambiguous {
        /// The dataset.
        dataset: Dataset,
        /// The competing files.
        paths: Vec<PathBuf>,
    },
}

/// Errors writing a dataset.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// The dataset file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// The rows could not be serialized as JSON.
    #[error("failed to serialize {}: {source}", path.display())]
    Json {
        /// The dataset file.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },
    /// The rows could not be serialized as YAML.
    #[error("failed to serialize {}: {source}", path.display())]
    Yaml {
        /// The dataset file.
        path: PathBuf,
        /// The underlying error.
        source: serde_yaml::Error,
    },
    /// The existing file could not be located.
    #[error(transparent)]
    Locate(#[from] LoadError),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug)]
struct Cached<T> {
    records: Vec<T>,
    fetched_at: DateTime<Utc>,
}

/// A cache of catalog datasets read from a directory.
#[derive(Debug)]
pub struct Catalog {
    root: PathBuf,
    data_dir: PathBuf,
    config: Config,
    courses: Option<Cached<CourseRecord>>,
    requirements: Option<Cached<RequirementNode>>,
    substitutions: Option<Cached<SubstitutionEdge>>,
    baskets: Option<Cached<Basket>>,
    basket_links: Option<Cached<BasketLink>>,
    rules: Option<Cached<ValidationRule>>,
}

impl Catalog {
    /// Opens the catalog rooted at `root`.
    ///
    /// The configuration is read from `.plan/config.toml`; a missing or
    /// invalid file falls back to the defaults. Nothing else is read until a
    /// dataset is first requested.
    #[must_use]
    pub fn open(root: PathBuf) -> Self {
        let config = load_config(&root);
        let data_dir = config
            .data_dir
            .as_ref()
            .map_or_else(|| root.clone(), |dir| root.join(dir));

        Self {
            root,
            data_dir,
            config,
            courses: None,
            requirements: None,
            substitutions: None,
            baskets: None,
            basket_links: None,
            rules: None,
        }
    }

    /// The catalog root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory datasets are read from.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Course records.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset file exists but cannot be read or
    /// parsed.
    pub fn courses(&mut self) -> Result<&[CourseRecord], LoadError> {
        cached(&mut self.courses, &self.data_dir, Dataset::Courses)
    }

    /// Flat requirement rows, as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset file exists but cannot be read or
    /// parsed.
    pub fn requirements(&mut self) -> Result<&[RequirementNode], LoadError> {
        cached(&mut self.requirements, &self.data_dir, Dataset::Requirements)
    }

    /// Substitution edges.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset file exists but cannot be read or
    /// parsed.
    pub fn substitutions(&mut self) -> Result<&[SubstitutionEdge], LoadError> {
        cached(&mut self.substitutions, &self.data_dir, Dataset::Substitutions)
    }

    /// Stored baskets.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset file exists but cannot be read or
    /// parsed.
    pub fn baskets(&mut self) -> Result<&[Basket], LoadError> {
        cached(&mut self.baskets, &self.data_dir, Dataset::Baskets)
    }

    /// Basket attachments.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset file exists but cannot be read or
    /// parsed.
    pub fn basket_links(&mut self) -> Result<&[BasketLink], LoadError> {
        cached(&mut self.basket_links, &self.data_dir, Dataset::BasketLinks)
    }

    /// Validation rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset file exists but cannot be read or
    /// parsed.
    pub fn rules(&mut self) -> Result<&[ValidationRule], LoadError> {
        cached(&mut self.rules, &self.data_dir, Dataset::Rules)
    }

    /// An index over the course records.
    ///
    /// # Errors
    ///
    /// Returns an error if the courses cannot be loaded.
    pub fn course_index(&mut self) -> Result<CourseIndex, LoadError> {
        Ok(CourseIndex::new(self.courses()?.iter().cloned()))
    }

    /// The requirement rows assembled into a tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the requirement rows cannot be loaded.
    pub fn requirement_tree(&mut self) -> Result<Vec<RequirementNode>, LoadError> {
        Ok(assemble_tree(self.requirements()?.to_vec()))
    }

    /// Writes a requirement tree back as flat rows and invalidates the cached
    /// rows.
    ///
    /// The rows are written to the existing requirements file, keeping its
    /// format, or to `requirements.json` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be serialized or written.
    pub fn save_requirements(&mut self, tree: Vec<RequirementNode>) -> Result<PathBuf, SaveError> {
        let rows = into_rows(tree);
        let path = locate(&self.data_dir, Dataset::Requirements)?
            .unwrap_or_else(|| self.data_dir.join("requirements.json"));

        write_dataset(&path, &rows)?;
        tracing::info!(path = %path.display(), rows = rows.len(), "saved requirements");

        self.invalidate(Dataset::Requirements);
        Ok(path)
    }

    /// Drops a cached dataset so the next access reads it again.
    pub fn invalidate(&mut self, dataset: Dataset) {
        tracing::debug!(%dataset, "invalidating cached dataset");
        match dataset {
            Dataset::Courses => self.courses = None,
            Dataset::Requirements => self.requirements = None,
            Dataset::Substitutions => self.substitutions = None,
            Dataset::Baskets => self.baskets = None,
            Dataset::BasketLinks => self.basket_links = None,
            Dataset::Rules => self.rules = None,
        }
    }

    /// Drops every cached dataset.
    pub fn invalidate_all(&mut self) {
        for dataset in Dataset::ALL {
            self.invalidate(dataset);
        }
    }

    /// When a dataset was last read, if it is cached.
    #[must_use]
    pub fn fetched_at(&self, dataset: Dataset) -> Option<DateTime<Utc>> {
        match dataset {
            Dataset::Courses => self.courses.as_ref().map(|c| c.fetched_at),
            Dataset::Requirements => self.requirements.as_ref().map(|c| c.fetched_at),
            Dataset::Substitutions => self.substitutions.as_ref().map(|c| c.fetched_at),
            Dataset::Baskets => self.baskets.as_ref().map(|c| c.fetched_at),
            Dataset::BasketLinks => self.basket_links.as_ref().map(|c| c.fetched_at),
            Dataset::Rules => self.rules.as_ref().map(|c| c.fetched_at),
        }
    }
}

/// The configuration file for a catalog root.
#[must_use]
pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(CONFIG_FILE)
}

fn load_config(root: &Path) -> Config {
    Config::load(&config_path(root)).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

fn cached<'a, T: DeserializeOwned>(
    slot: &'a mut Option<Cached<T>>,
    dir: &Path,
    dataset: Dataset,
) -> Result<&'a [T], LoadError> {
    if slot.is_none() {
        let records = read_dataset(dir, dataset)?;
        *slot = Some(Cached {
            records,
            fetched_at: Utc::now(),
        });
    }
    Ok(slot
        .as_ref()
        .map(|cached| cached.records.as_slice())
        .unwrap_or_default())
}

fn locate(dir: &Path, dataset: Dataset) -> Result<Option<PathBuf>, LoadError> {
    let mut paths: Vec<PathBuf> = EXTENSIONS
        .iter()
        .map(|extension| dir.join(format!("{}.{extension}", dataset.stem())))
        .filter(|path| path.is_file())
        .collect();

    match paths.len() {
        0 => Ok(None),
        1 => Ok(paths.pop()),
        _ => Err(LoadError::Ambiguous { dataset, paths }),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "json")
}

fn read_dataset<T: DeserializeOwned>(dir: &Path, dataset: Dataset) -> Result<Vec<T>, LoadError> {
    let Some(path) = locate(dir, dataset)? else {
        tracing::debug!(%dataset, "no dataset file; treating as empty");
        return Ok(Vec::new());
    };

    let content = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
        path: path.clone(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let records: Vec<T> = if is_json(&path) {
        serde_json::from_str(&content).map_err(|source| LoadError::Json {
            path: path.clone(),
            source,
        })?
    } else {
        serde_yaml::from_str(&content).map_err(|source| LoadError::Yaml {
            path: path.clone(),
            source,
        })?
    };

    tracing::debug!(%dataset, path = %path.display(), records = records.len(), "loaded dataset");
    Ok(records)
}

fn write_dataset<T: Serialize>(path: &Path, records: &[T]) -> Result<(), SaveError> {
    let content = if is_json(path) {
        serde_json::to_string_pretty(records).map_err(|source| SaveError::Json {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_yaml::to_string(records).map_err(|source| SaveError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    };

    std::fs::write(path, content).map_err(|source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RequirementId, tree::find_node};

    const COURSES_JSON: &str = r#"[
        {"id": "00000000-0000-0000-0000-000000000001", "course_number": "MA 153", "title": "Calculus I", "credits": 4.0},
        {"id": "00000000-0000-0000-0000-000000000002", "course_number": "MA 154", "title": "Calculus II"}
    ]"#;

    const REQUIREMENTS_YAML: &str = "\
- id: 00000000-0000-0000-0000-00000000000a
  name: Core
- id: 00000000-0000-0000-0000-00000000000c
  name: 'Core Math: Pick 1'
  logic_type: PICK_N
  pick_n: 1
  parent_requirement_id: 00000000-0000-0000-0000-00000000000a
  sort_order: 1
- id: 00000000-0000-0000-0000-00000000000b
  name: Statics
  parent_requirement_id: 00000000-0000-0000-0000-00000000000a
  sort_order: 0
";

    fn rid(n: u128) -> RequirementId {
        RequirementId::from_u128(n)
    }

    #[test]
    fn missing_datasets_are_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::open(tmp.path().to_path_buf());

        assert!(catalog.courses().unwrap().is_empty());
        assert!(catalog.rules().unwrap().is_empty());
        assert!(catalog.requirement_tree().unwrap().is_empty());
    }

    #[test]
    fn reads_json_and_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("courses.json"), COURSES_JSON).unwrap();
        std::fs::write(tmp.path().join("requirements.yaml"), REQUIREMENTS_YAML).unwrap();
        let mut catalog = Catalog::open(tmp.path().to_path_buf());

        let index = catalog.course_index().unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.by_number("ma153").is_some());

        let tree = catalog.requirement_tree().unwrap();
        assert_eq!(tree.len(), 1);
        let children: Vec<_> = tree[0].children.iter().map(|child| child.name.as_str()).collect();
        assert_eq!(children, vec!["Statics", "Core Math: Pick 1"]);
    }

    #[test]
    fn datasets_are_cached_until_invalidated() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("courses.json");
        std::fs::write(&path, COURSES_JSON).unwrap();
        let mut catalog = Catalog::open(tmp.path().to_path_buf());

        assert_eq!(catalog.courses().unwrap().len(), 2);
        assert!(catalog.fetched_at(Dataset::Courses).is_some());

        std::fs::write(&path, "[]").unwrap();
        assert_eq!(catalog.courses().unwrap().len(), 2);

        catalog.invalidate(Dataset::Courses);
        assert!(catalog.fetched_at(Dataset::Courses).is_none());
        assert!(catalog.courses().unwrap().is_empty());
    }

    #[test]
    fn parse_errors_name_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("rules.json"), "{ not json").unwrap();
        let mut catalog = Catalog::open(tmp.path().to_path_buf());

        let error = catalog.rules().unwrap_err();
        assert!(matches!(error, LoadError::Json { .. }));
        assert!(error.to_string().contains("rules.json"));
    }

    #[test]
    fn competing_files_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("baskets.json"), "[]").unwrap();
        std::fs::write(tmp.path().join("baskets.yml"), "[]").unwrap();
        let mut catalog = Catalog::open(tmp.path().to_path_buf());

        assert!(matches!(
            catalog.baskets().unwrap_err(),
            LoadError::Ambiguous {
                dataset: Dataset::Baskets,
                ..
            }
        ));
    }

    #[test]
    fn saving_keeps_format_and_refreshes_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("requirements.yaml");
        std::fs::write(&path, REQUIREMENTS_YAML).unwrap();
        let mut catalog = Catalog::open(tmp.path().to_path_buf());

        let mut tree = catalog.requirement_tree().unwrap();
        tree[0].children.reverse();
        let saved = catalog.save_requirements(tree).unwrap();

        assert_eq!(saved, path);
        assert!(catalog.fetched_at(Dataset::Requirements).is_none());
        let tree = catalog.requirement_tree().unwrap();
        assert_eq!(find_node(&tree, rid(0xc)).unwrap().sort_order, 0);
        assert_eq!(find_node(&tree, rid(0xb)).unwrap().sort_order, 1);
        assert_eq!(
            find_node(&tree, rid(0xb)).unwrap().parent_requirement_id,
            Some(rid(0xa))
        );
    }

    #[test]
    fn configured_data_dir_is_used() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = Some("data".to_string());
        std::fs::create_dir_all(tmp.path().join(CONFIG_DIR)).unwrap();
        config.save(&config_path(tmp.path())).unwrap();
        std::fs::create_dir_all(tmp.path().join("data")).unwrap();
        std::fs::write(tmp.path().join("data").join("courses.json"), COURSES_JSON).unwrap();

        let mut catalog = Catalog::open(tmp.path().to_path_buf());

        assert_eq!(catalog.data_dir(), tmp.path().join("data"));
        assert_eq!(catalog.courses().unwrap().len(), 2);
    }

    #[test]
    fn saving_without_existing_file_writes_json() {
        let tmp = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::open(tmp.path().to_path_buf());

        let path = catalog
            .save_requirements(vec![RequirementNode::new(rid(1), "Core")])
            .unwrap();

        assert_eq!(path, tmp.path().join("requirements.json"));
        assert_eq!(catalog.requirements().unwrap().len(), 1);
    }
}
