//! Contract source discovery and the temporary directory layout

use crate::config::ProjectConfig;
use crate::error::{CoverageError, CoverageResult};
use std::path::{Path, PathBuf};

/// Extension of contract sources
pub const CONTRACT_EXTENSION: &str = "sol";

/// Temp contracts directory name, under the project root
pub const TEMP_CONTRACTS_DIR: &str = ".coverage_contracts";

/// Temp artifacts directory name when the project sets no `temp`
pub const TEMP_ARTIFACTS_DIR: &str = ".coverage_artifacts";

/// A contract source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the contracts directory
    pub relative_path: PathBuf,
    /// File contents
    pub source: String,
}

impl SourceFile {
    /// Create a source file
    pub fn new(relative_path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            source: source.into(),
        }
    }

    /// Relative path with `/` separators, for display and matching
    #[must_use]
    pub fn display_path(&self) -> String {
        slash_path(&self.relative_path)
    }
}

/// Contract sources split into instrumentation targets and skipped files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledFiles {
    /// Files to instrument
    pub targets: Vec<SourceFile>,
    /// Files copied as-is
    pub skipped: Vec<SourceFile>,
}

impl AssembledFiles {
    /// Total number of files
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len() + self.skipped.len()
    }

    /// Whether no contract sources were found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.skipped.is_empty()
    }
}

/// Collect the contract sources and split them by the skip list
///
/// A skip entry matches a file when it equals the file's relative path, when
/// it names a directory containing the file, or when it is a glob pattern
/// matching the relative path.
pub fn assemble_files(contracts_dir: &Path, skip_files: &[String]) -> CoverageResult<AssembledFiles> {
    if !contracts_dir.is_dir() {
        return Err(CoverageError::config(
            contracts_dir,
            "contracts directory does not exist",
        ));
    }

    let matcher = SkipMatcher::new(skip_files);
    let mut paths = Vec::new();
    scan_files_recursive(contracts_dir, CONTRACT_EXTENSION, &mut paths)?;
    paths.sort();

    let mut assembled = AssembledFiles::default();
    for path in paths {
        let relative = path
            .strip_prefix(contracts_dir)
            .map_or_else(|_| path.clone(), Path::to_path_buf);
        let source = std::fs::read_to_string(&path)?;
        let file = SourceFile::new(relative, source);

        if matcher.matches(&file.display_path()) {
            assembled.skipped.push(file);
        } else {
            assembled.targets.push(file);
        }
    }

    tracing::debug!(
        targets = assembled.targets.len(),
        skipped = assembled.skipped.len(),
        "assembled contract sources"
    );
    Ok(assembled)
}

/// Find all files with given extension recursively
pub fn scan_files_recursive(dir: &Path, extension: &str, files: &mut Vec<PathBuf>) -> CoverageResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            // Skip node_modules and hidden directories
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if !name.starts_with('.') && name != "node_modules" {
                scan_files_recursive(&path, extension, files)?;
            }
        } else if path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    Ok(())
}

struct SkipMatcher {
    entries: Vec<String>,
    patterns: Vec<glob::Pattern>,
}

impl SkipMatcher {
    fn new(skip_files: &[String]) -> Self {
        let mut entries = Vec::new();
        let mut patterns = Vec::new();
        for raw in skip_files {
            let entry = raw.trim().trim_start_matches("./").replace('\\', "/");
            if entry.is_empty() {
                continue;
            }
            if entry.contains(['*', '?', '[']) {
                match glob::Pattern::new(&entry) {
                    Ok(pattern) => patterns.push(pattern),
                    Err(e) => tracing::warn!(entry = %raw, error = %e, "ignoring invalid skip pattern"),
                }
            } else {
                entries.push(entry.trim_end_matches('/').to_string());
            }
        }
        Self { entries, patterns }
    }

    fn matches(&self, relative: &str) -> bool {
        self.entries.iter().any(|entry| {
            relative == entry
                || relative
                    .strip_prefix(entry.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        }) || self.patterns.iter().any(|p| p.matches(relative))
    }
}

/// Where instrumented sources and compiled artifacts go during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempLocations {
    /// Instrumented and skipped sources
    pub contracts: PathBuf,
    /// Compiled artifacts
    pub artifacts: PathBuf,
}

impl TempLocations {
    /// Compute the temp layout for a project
    #[must_use]
    pub fn for_project(project: &ProjectConfig) -> Self {
        let root = &project.working_directory;
        let artifacts = project
            .temp
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(TEMP_ARTIFACTS_DIR);
        Self {
            contracts: root.join(TEMP_CONTRACTS_DIR),
            artifacts: root.join(artifacts),
        }
    }

    /// Remove any previous contents and create both directories empty
    pub fn setup(&self) -> CoverageResult<()> {
        for dir in [&self.contracts, &self.artifacts] {
            remove_dir_if_exists(dir)?;
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Write files into `dest_dir` at their relative paths
pub fn save(files: &[SourceFile], dest_dir: &Path) -> CoverageResult<()> {
    for file in files {
        let dest = dest_dir.join(&file.relative_path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, &file.source)?;
    }
    Ok(())
}

/// Remove a directory tree, treating a missing directory as success
pub fn remove_dir_if_exists(dir: &Path) -> CoverageResult<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn contracts_fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Token.sol", "contract Token {}");
        write(temp.path(), "Migrations.sol", "contract Migrations {}");
        write(temp.path(), "mocks/MockToken.sol", "contract MockToken {}");
        write(temp.path(), "mocks/deep/Helper.sol", "contract Helper {}");
        write(temp.path(), "README.md", "# not a contract");
        write(temp.path(), "node_modules/dep/Lib.sol", "library Lib {}");
        write(temp.path(), ".cache/Old.sol", "contract Old {}");
        temp
    }

    fn names(files: &[SourceFile]) -> Vec<String> {
        files.iter().map(SourceFile::display_path).collect()
    }

    mod assemble_tests {
        use super::*;

        #[test]
        fn test_no_skips() {
            let temp = contracts_fixture();
            let files = assemble_files(temp.path(), &[]).unwrap();
            assert_eq!(
                names(&files.targets),
                vec![
                    "Migrations.sol",
                    "Token.sol",
                    "mocks/MockToken.sol",
                    "mocks/deep/Helper.sol"
                ]
            );
            assert!(files.skipped.is_empty());
            assert_eq!(files.len(), 4);
        }

        #[test]
        fn test_skip_single_file() {
            let temp = contracts_fixture();
            let files = assemble_files(temp.path(), &["Migrations.sol".to_string()]).unwrap();
            assert_eq!(names(&files.skipped), vec!["Migrations.sol"]);
            assert_eq!(files.targets.len(), 3);
        }

        #[test]
        fn test_skip_directory() {
            let temp = contracts_fixture();
            let files = assemble_files(temp.path(), &["mocks/".to_string()]).unwrap();
            assert_eq!(
                names(&files.skipped),
                vec!["mocks/MockToken.sol", "mocks/deep/Helper.sol"]
            );
            assert_eq!(names(&files.targets), vec!["Migrations.sol", "Token.sol"]);
        }

        #[test]
        fn test_skip_directory_is_not_a_prefix_match() {
            let temp = contracts_fixture();
            let files = assemble_files(temp.path(), &["mock".to_string()]).unwrap();
            assert!(files.skipped.is_empty());
        }

        #[test]
        fn test_skip_glob() {
            let temp = contracts_fixture();
            let files = assemble_files(temp.path(), &["**/Mock*.sol".to_string()]).unwrap();
            assert_eq!(names(&files.skipped), vec!["mocks/MockToken.sol"]);
        }

        #[test]
        fn test_leading_dot_slash() {
            let temp = contracts_fixture();
            let files = assemble_files(temp.path(), &["./Token.sol".to_string()]).unwrap();
            assert_eq!(names(&files.skipped), vec!["Token.sol"]);
        }

        #[test]
        fn test_each_file_in_exactly_one_set() {
            let temp = contracts_fixture();
            let skips = vec!["Token.sol".to_string(), "mocks".to_string()];
            let files = assemble_files(temp.path(), &skips).unwrap();
            let mut all = names(&files.targets);
            all.extend(names(&files.skipped));
            all.sort();
            let mut deduped = all.clone();
            deduped.dedup();
            assert_eq!(all, deduped);
            assert_eq!(all.len(), 4);
        }

        #[test]
        fn test_missing_contracts_dir() {
            let temp = TempDir::new().unwrap();
            let err = assemble_files(&temp.path().join("nope"), &[]).unwrap_err();
            assert!(matches!(err, CoverageError::Config { .. }));
        }
    }

    mod temp_location_tests {
        use super::*;

        #[test]
        fn test_with_temp() {
            let project = ProjectConfig::from_json_str("{}", Path::new("/proj"))
                .unwrap()
                .with_coverage_overrides();
            let locations = TempLocations::for_project(&project);
            assert_eq!(
                locations.contracts,
                PathBuf::from("/proj/.coverage_contracts")
            );
            assert_eq!(locations.artifacts, PathBuf::from("/proj/build"));
        }

        #[test]
        fn test_without_temp() {
            let project = ProjectConfig::from_json_str("{}", Path::new("/proj")).unwrap();
            let locations = TempLocations::for_project(&project);
            assert_eq!(
                locations.artifacts,
                PathBuf::from("/proj/.coverage_artifacts")
            );
        }

        #[test]
        fn test_setup_clears_previous_contents() {
            let temp = TempDir::new().unwrap();
            let locations = TempLocations {
                contracts: temp.path().join(TEMP_CONTRACTS_DIR),
                artifacts: temp.path().join(TEMP_ARTIFACTS_DIR),
            };
            write(&locations.contracts, "Stale.sol", "old");
            locations.setup().unwrap();
            assert!(locations.contracts.is_dir());
            assert!(locations.artifacts.is_dir());
            assert!(!locations.contracts.join("Stale.sol").exists());
        }
    }

    #[test]
    fn test_save_nested() {
        let temp = TempDir::new().unwrap();
        let files = vec![
            SourceFile::new("A.sol", "a"),
            SourceFile::new(Path::new("lib").join("B.sol"), "b"),
        ];
        save(&files, temp.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(temp.path().join("A.sol")).unwrap(),
            "a"
        );
        assert_eq!(
            std::fs::read_to_string(temp.path().join("lib/B.sol")).unwrap(),
            "b"
        );
    }

    #[test]
    fn test_remove_missing_dir() {
        let temp = TempDir::new().unwrap();
        remove_dir_if_exists(&temp.path().join("missing")).unwrap();
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        fn dir_strategy() -> impl Strategy<Value = String> {
            prop_oneof![Just("lib"), Just("mocks"), Just("token"), Just("mocks/deep")]
                .prop_map(ToString::to_string)
        }

        fn file_strategy() -> impl Strategy<Value = String> {
            let name = "[A-Z][a-z]{0,5}";
            prop_oneof![
                name.prop_map(|n| format!("{n}.sol")),
                (dir_strategy(), name).prop_map(|(d, n)| format!("{d}/{n}.sol")),
            ]
        }

        fn tree(files: &BTreeSet<String>) -> TempDir {
            let temp = TempDir::new().unwrap();
            for rel in files {
                write(temp.path(), rel, "contract C {}");
            }
            temp
        }

        proptest! {
            #[test]
            fn prop_targets_and_skipped_partition_sources(
                files in prop::collection::btree_set(file_strategy(), 1..12),
                skip in prop::collection::vec(
                    prop_oneof![file_strategy(), dir_strategy(), Just("*.sol".to_string())],
                    0..4,
                ),
            ) {
                let temp = tree(&files);
                let assembled = assemble_files(temp.path(), &skip).unwrap();

                let targets: BTreeSet<String> = names(&assembled.targets).into_iter().collect();
                let skipped: BTreeSet<String> = names(&assembled.skipped).into_iter().collect();
                prop_assert!(targets.is_disjoint(&skipped));
                let all: BTreeSet<String> = targets.union(&skipped).cloned().collect();
                prop_assert_eq!(all, files);
                prop_assert_eq!(assembled.len(), targets.len() + skipped.len());
            }

            #[test]
            fn prop_listed_entries_are_skipped(
                files in prop::collection::btree_set(file_strategy(), 1..12),
                dir in dir_strategy(),
                pick in any::<prop::sample::Index>(),
            ) {
                let listed = pick.get(&files.iter().collect::<Vec<_>>()).to_string();
                let temp = tree(&files);
                let assembled = assemble_files(temp.path(), &[listed.clone(), dir.clone()]).unwrap();

                let skipped = names(&assembled.skipped);
                prop_assert!(skipped.contains(&listed));
                let prefix = format!("{dir}/");
                for target in names(&assembled.targets) {
                    prop_assert!(!target.starts_with(&prefix), "{target} is under {dir}");
                }
            }

            #[test]
            fn prop_no_skips_targets_everything(
                files in prop::collection::btree_set(file_strategy(), 1..12),
            ) {
                let temp = tree(&files);
                let assembled = assemble_files(temp.path(), &[]).unwrap();
                prop_assert!(assembled.skipped.is_empty());
                prop_assert_eq!(assembled.targets.len(), files.len());
            }
        }
    }
}
