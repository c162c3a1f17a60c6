//! Test case discovery and execution.
//!
//! Each case runs through a fixed pipeline of stages. The first stage that
//! reports an error ends the case; its report keeps the warnings gathered so
//! far followed by that stage's diagnostics. Cases run concurrently, one
//! blocking task each, and reports are collected in completion order.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span};

use crate::diagnostics::{has_errors, Diagnostic};
use crate::engine::Engine;
use crate::errors::RunError;
use crate::matcher::validate;
use crate::mock;
use crate::plan::PlanAccessor;
use crate::spec::read_spec;

/// A directory holding a spec file and an optional variables file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub dir: PathBuf,
    pub vars_file: Option<PathBuf>,
    pub spec_file: PathBuf,
}

impl TestCase {
    /// Base name of the case directory
    pub fn name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.dir.display().to_string())
    }
}

/// Find the test cases under `root`: every immediate subdirectory holding a
/// `.tfspec` file, sorted by name, then `root` itself if it holds one.
pub fn find_cases(root: &Path) -> Result<Vec<TestCase>, RunError> {
    let entries = std::fs::read_dir(root).map_err(|source| RunError::SpecDir {
        path: root.to_path_buf(),
        source,
    })?;

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let mut cases: Vec<TestCase> = dirs.iter().filter_map(|dir| find_case(dir)).collect();
    cases.extend(find_case(root));

    if cases.is_empty() {
        return Err(RunError::NoCases {
            path: root.to_path_buf(),
        });
    }
    debug!(count = cases.len(), root = %root.display(), "discovered test cases");
    Ok(cases)
}

/// When several spec or variables files exist, the last by name wins
fn find_case(dir: &Path) -> Option<TestCase> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let last_with = |ext: &str| {
        files
            .iter()
            .rev()
            .find(|path| path.extension().is_some_and(|e| e == ext))
            .cloned()
    };
    Some(TestCase {
        dir: dir.to_path_buf(),
        vars_file: last_with("tfvars"),
        spec_file: last_with("tfspec")?,
    })
}

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Discovered,
    ConfigParsed,
    SpecParsed,
    MockInjected,
    Refreshed,
    Planned,
    Validated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discovered => "discovered",
            Stage::ConfigParsed => "config parsed",
            Stage::SpecParsed => "spec parsed",
            Stage::MockInjected => "mocks injected",
            Stage::Refreshed => "refreshed",
            Stage::Planned => "planned",
            Stage::Validated => "validated",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of one test case
#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    pub name: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Rendered plan text, when requested and planning succeeded
    pub plan: Option<String>,
    /// Last stage reached
    pub stage: Stage,
}

impl TestReport {
    fn new(name: String) -> Self {
        Self {
            name,
            diagnostics: Vec::new(),
            plan: None,
            stage: Stage::Discovered,
        }
    }

    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    /// Record a stage's diagnostics; true if the case must stop here
    fn absorb(&mut self, diagnostics: Vec<Diagnostic>) -> bool {
        let failed = has_errors(&diagnostics);
        self.diagnostics.extend(diagnostics);
        if failed {
            debug!(stage = %self.stage, "stage failed");
        }
        failed
    }

    fn reach(&mut self, stage: Stage) {
        debug!(stage = %stage, "stage reached");
        self.stage = stage;
    }
}

/// Settings shared by every case of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub spec_dir: PathBuf,
    /// Configuration directory handed to the engine
    pub config_dir: PathBuf,
    pub display_plan: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            spec_dir: PathBuf::from("spec"),
            config_dir: PathBuf::from("."),
            display_plan: false,
        }
    }
}

/// Run one case to completion. Blocking.
pub fn run_case(engine: &dyn Engine, case: &TestCase, options: &RunOptions) -> TestReport {
    let span = info_span!("case", name = %case.name());
    let _enter = span.enter();

    let mut report = TestReport::new(case.name());

    let mut ctx = match engine.new_context(&options.config_dir, case.vars_file.as_deref()) {
        Ok(ctx) => ctx,
        Err(diagnostics) => {
            report.absorb(diagnostics);
            return report;
        }
    };
    report.reach(Stage::ConfigParsed);

    let schemas = ctx.schemas();
    let (spec, diagnostics) = read_spec(&case.spec_file, &schemas);
    if report.absorb(diagnostics) {
        return report;
    }
    report.reach(Stage::SpecParsed);

    if !spec.mocks.is_empty() && report.absorb(mock::inject(&mut *ctx, &spec.mocks)) {
        return report;
    }
    report.reach(Stage::MockInjected);

    if report.absorb(ctx.refresh()) {
        return report;
    }
    report.reach(Stage::Refreshed);

    let plan = match ctx.plan() {
        Ok(plan) => plan,
        Err(diagnostics) => {
            report.absorb(diagnostics);
            return report;
        }
    };
    report.reach(Stage::Planned);
    if options.display_plan {
        report.plan = plan.rendered().map(str::to_string);
    }

    report.absorb(validate(&spec, &PlanAccessor::new(&plan, &schemas)));
    report.reach(Stage::Validated);

    info!(
        assertions = spec.assertions.len(),
        failed = report.has_errors(),
        "case finished"
    );
    report
}

/// Reports of a completed run, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub reports: Vec<TestReport>,
}

impl RunSummary {
    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(TestReport::has_errors)
    }

    /// `0` when no case reported an error, `1` otherwise
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_errors())
    }
}

/// Run every case concurrently, handing each report to `on_report` as it
/// arrives. A task that fails to produce a report aborts the run.
pub async fn run_all<F>(
    engine: Arc<dyn Engine>,
    cases: Vec<TestCase>,
    options: Arc<RunOptions>,
    mut on_report: F,
) -> Result<RunSummary, RunError>
where
    F: FnMut(&TestReport),
{
    let (tx, mut rx) = mpsc::unbounded_channel();

    for case in cases {
        let tx = tx.clone();
        let engine = Arc::clone(&engine);
        let options = Arc::clone(&options);
        tokio::spawn(async move {
            let name = case.name();
            let result =
                tokio::task::spawn_blocking(move || run_case(engine.as_ref(), &case, &options))
                    .await
                    .map_err(|e| RunError::Task {
                        case: name,
                        message: e.to_string(),
                    });
            // The collector is gone only after an abort
            let _ = tx.send(result);
        });
    }
    // Every case task holds a sender; the channel closes when all are done
    drop(tx);

    let mut summary = RunSummary::default();
    while let Some(result) = rx.recv().await {
        let report = result?;
        on_report(&report);
        summary.reports.push(report);
    }
    Ok(summary)
}
