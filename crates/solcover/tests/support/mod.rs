#![allow(dead_code)]

pub mod mock_node;

use async_trait::async_trait;
use mock_node::MockNode;
use solcover::{
    CompileSettings, Compiler, CoverageConfig, CoverageError, CoverageResult, Instrumenter,
    ProjectConfig, ReportGenerator, ReportRequest, Simulator, SourceFile, Toolchain,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const MARKER: &str = "// solcover: instrumented\n";

/// Shared view of what the fakes saw
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
    pub running: Arc<AtomicBool>,
    pub instrumented: Arc<AtomicUsize>,
    pub compiles: Arc<AtomicUsize>,
    pub reports: Arc<AtomicUsize>,
    pub compile_settings: Arc<Mutex<Option<CompileSettings>>>,
    /// Relative path -> contents of the temp contracts directory at compile time
    pub temp_contents: Arc<Mutex<BTreeMap<String, String>>>,
}

impl Recorder {
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    pub fn instrumented(&self) -> usize {
        self.instrumented.load(Ordering::SeqCst)
    }

    pub fn reports(&self) -> usize {
        self.reports.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> CompileSettings {
        self.compile_settings
            .lock()
            .unwrap()
            .clone()
            .expect("compiler was not called")
    }

    pub fn temp_contents(&self) -> BTreeMap<String, String> {
        self.temp_contents.lock().unwrap().clone()
    }
}

#[derive(Debug)]
pub struct FakeSimulator {
    recorder: Recorder,
    node: Option<MockNode>,
    fail_start: bool,
}

#[async_trait]
impl Simulator for FakeSimulator {
    async fn start(&mut self) -> CoverageResult<String> {
        self.recorder.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(CoverageError::simulator("refused to start"));
        }
        let node = MockNode::start().await;
        let url = node.url();
        self.node = Some(node);
        self.recorder.running.store(true, Ordering::SeqCst);
        Ok(url)
    }

    async fn stop(&mut self) -> CoverageResult<()> {
        self.recorder.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(node) = self.node.take() {
            node.shutdown();
        }
        self.recorder.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug)]
pub struct MarkingInstrumenter {
    recorder: Recorder,
    fail: bool,
}

#[async_trait]
impl Instrumenter for MarkingInstrumenter {
    async fn instrument(&mut self, targets: Vec<SourceFile>) -> CoverageResult<Vec<SourceFile>> {
        if self.fail {
            let first = targets.first().map(SourceFile::display_path).unwrap_or_default();
            return Err(CoverageError::instrumentation(first, "unsupported syntax"));
        }
        self.recorder
            .instrumented
            .fetch_add(targets.len(), Ordering::SeqCst);
        Ok(targets
            .into_iter()
            .map(|f| SourceFile::new(f.relative_path, format!("{MARKER}{}", f.source)))
            .collect())
    }
}

#[derive(Debug)]
pub struct SnapshotCompiler {
    recorder: Recorder,
}

#[async_trait]
impl Compiler for SnapshotCompiler {
    async fn compile(&mut self, settings: &CompileSettings) -> CoverageResult<()> {
        self.recorder.compiles.fetch_add(1, Ordering::SeqCst);
        *self.recorder.compile_settings.lock().unwrap() = Some(settings.clone());

        let mut contents = BTreeMap::new();
        snapshot(&settings.contracts_directory, &settings.contracts_directory, &mut contents);
        *self.recorder.temp_contents.lock().unwrap() = contents;
        Ok(())
    }
}

fn snapshot(root: &Path, dir: &Path, out: &mut BTreeMap<String, String>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            snapshot(root, &path, out);
        } else {
            let rel = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            out.insert(rel, std::fs::read_to_string(&path).unwrap());
        }
    }
}

#[derive(Debug)]
pub struct CountingReporter {
    recorder: Recorder,
}

#[async_trait]
impl ReportGenerator for CountingReporter {
    async fn report(&mut self, _request: &ReportRequest) -> CoverageResult<()> {
        self.recorder.reports.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Knobs for the fake toolchain
#[derive(Debug, Default, Clone, Copy)]
pub struct Faults {
    pub simulator_start: bool,
    pub instrument: bool,
}

pub fn toolchain(recorder: &Recorder, faults: Faults) -> Toolchain {
    Toolchain {
        simulator: Box::new(FakeSimulator {
            recorder: recorder.clone(),
            node: None,
            fail_start: faults.simulator_start,
        }),
        instrumenter: Box::new(MarkingInstrumenter {
            recorder: recorder.clone(),
            fail: faults.instrument,
        }),
        compiler: Box::new(SnapshotCompiler {
            recorder: recorder.clone(),
        }),
        reporter: Box::new(CountingReporter {
            recorder: recorder.clone(),
        }),
    }
}

/// A project with three contracts, one of them conventionally skipped
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let contracts = dir.path().join("contracts");
        std::fs::create_dir_all(contracts.join("token")).unwrap();
        std::fs::write(contracts.join("Migrations.sol"), "contract Migrations {}\n").unwrap();
        std::fs::write(contracts.join("Vault.sol"), "contract Vault {}\n").unwrap();
        std::fs::write(contracts.join("token/Token.sol"), "contract Token {}\n").unwrap();
        std::fs::write(
            dir.path().join("truffle-config.json"),
            r#"{
                "build_tool_version": "v5.1.10",
                "compilers": { "solc": { "settings": { "optimizer": { "enabled": true, "runs": 200 } } } }
            }"#,
        )
        .unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn project(&self) -> ProjectConfig {
        ProjectConfig::load(&self.root().join("truffle-config.json")).unwrap()
    }

    pub fn temp_contracts(&self) -> PathBuf {
        self.root().join(".coverage_contracts")
    }

    /// Coverage config with shell commands that succeed quickly
    pub fn coverage(&self) -> CoverageConfig {
        CoverageConfig {
            skip_files: vec!["Migrations.sol".to_string()],
            build_command: "true".to_string(),
            test_command: "echo 'Tests: 3 passed' >&2; echo 'Force exiting Jest' >&2".to_string(),
            ..CoverageConfig::default()
        }
    }
}
