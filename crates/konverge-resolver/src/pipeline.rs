//! The reconciliation pipeline.
//!
//! Stages run in a fixed order, `Loading → Resolving → Enforcing →
//! Emitting → Done`, and any fatal diagnostic moves the run to `Failed`.
//! A failed run carries every diagnostic collected by the failing stage
//! and never a partial configuration.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use konverge_core::config::OutputFormat;
use konverge_core::manifest::Manifest;
use serde::Serialize;

use crate::conflict::{ConflictReport, Diagnostic, DiagnosticKind};
use crate::emit::{emit, ResolvedConfiguration};
use crate::graph::load;
use crate::resolver::{resolve, resolve_partitioned};
use crate::toolchain::enforce;

/// A state of the reconciliation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Loading,
    Resolving,
    Enforcing,
    Emitting,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loading => "loading",
            Stage::Resolving => "resolving",
            Stage::Enforcing => "enforcing",
            Stage::Emitting => "emitting",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Shared flag for aborting a run between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Knobs for a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Resolution partitions; `1` resolves on the calling task.
    pub workers: usize,
    pub format: OutputFormat,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            format: OutputFormat::default(),
        }
    }
}

/// Available parallelism, or 1 when it cannot be determined.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// A completed run.
#[derive(Debug, Clone)]
pub struct ReconcileSuccess {
    pub configuration: ResolvedConfiguration,
    /// `configuration` serialized in the requested format.
    pub document: String,
    pub history: Vec<Stage>,
}

/// Why a run ended in `Failed`.
#[derive(Debug, Clone)]
pub enum FailureCause {
    Diagnostics(ConflictReport),
    Cancelled,
    /// The configuration could not be serialized.
    Emit(String),
}

/// A failed run: the stage that failed and everything it reported.
#[derive(Debug, Clone)]
pub struct ReconcileFailure {
    pub stage: Stage,
    pub cause: FailureCause,
    pub history: Vec<Stage>,
}

impl ReconcileFailure {
    pub fn report(&self) -> Option<&ConflictReport> {
        match self.cause {
            FailureCause::Diagnostics(ref report) => Some(report),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause, FailureCause::Cancelled)
    }
}

impl fmt::Display for ReconcileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cause {
            FailureCause::Diagnostics(ref report) => write!(
                f,
                "{} error(s) while {}",
                report.len(),
                self.stage
            ),
            FailureCause::Cancelled => write!(f, "cancelled before {}", self.stage),
            FailureCause::Emit(ref message) => f.write_str(message),
        }
    }
}

/// Tracks the stage sequence of one run.
struct Run {
    history: Vec<Stage>,
    cancel: CancelToken,
}

impl Run {
    fn current(&self) -> Stage {
        self.history.last().copied().unwrap_or(Stage::Loading)
    }

    /// Move to `next`, or fail if the run was cancelled in between.
    fn advance(&mut self, next: Stage) -> Result<(), ReconcileFailure> {
        if self.cancel.is_cancelled() {
            tracing::info!("reconciliation cancelled before {next}");
            return Err(self.fail_at(next, FailureCause::Cancelled));
        }
        tracing::debug!("stage: {next}");
        self.history.push(next);
        Ok(())
    }

    fn fail_at(&mut self, stage: Stage, cause: FailureCause) -> ReconcileFailure {
        let mut history = std::mem::take(&mut self.history);
        history.push(Stage::Failed);
        ReconcileFailure {
            stage,
            cause,
            history,
        }
    }

    fn fail(&mut self, cause: FailureCause) -> ReconcileFailure {
        let stage = self.current();
        self.fail_at(stage, cause)
    }
}

/// Runs the full pipeline over one manifest snapshot.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    options: ReconcileOptions,
    cancel: CancelToken,
}

impl Reconciler {
    pub fn new(options: ReconcileOptions) -> Self {
        Self {
            options,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    pub async fn run(&self, manifest: &Manifest) -> Result<ReconcileSuccess, ReconcileFailure> {
        let mut run = Run {
            history: Vec::new(),
            cancel: self.cancel.clone(),
        };

        run.advance(Stage::Loading)?;
        let input_hash = manifest.input_hash().map_err(|e| {
            let mut report = ConflictReport::new();
            report.add(Diagnostic::new(
                DiagnosticKind::MalformedDeclaration,
                format!("declarations cannot be hashed: {e}"),
            ));
            run.fail(FailureCause::Diagnostics(report))
        })?;
        let input = Arc::new(
            load(manifest).map_err(|report| run.fail(FailureCause::Diagnostics(report)))?,
        );

        run.advance(Stage::Resolving)?;
        let resolution = if self.options.workers > 1 {
            resolve_partitioned(Arc::clone(&input), self.options.workers).await
        } else {
            resolve(&input)
        }
        .map_err(|report| run.fail(FailureCause::Diagnostics(report)))?;

        run.advance(Stage::Enforcing)?;
        let enforcement = enforce(&input, &resolution)
            .map_err(|report| run.fail(FailureCause::Diagnostics(report)))?;

        run.advance(Stage::Emitting)?;
        let configuration =
            ResolvedConfiguration::build(input_hash, &input, &resolution, &enforcement);
        let document = emit(&configuration, self.options.format)
            .map_err(|e| run.fail(FailureCause::Emit(e.to_string())))?;

        run.advance(Stage::Done)?;
        tracing::info!(
            "reconciled {} modules (input {})",
            configuration.modules.len(),
            &configuration.input_hash[..12.min(configuration.input_hash.len())]
        );
        Ok(ReconcileSuccess {
            configuration,
            document,
            history: run.history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use konverge_core::dependency::DependencyId;
    use konverge_core::module::ModuleId;

    fn manifest(toml: &str) -> Manifest {
        Manifest::parse_toml(toml).unwrap()
    }

    fn reconciler(workers: usize) -> Reconciler {
        Reconciler::new(ReconcileOptions {
            workers,
            format: OutputFormat::Toml,
        })
    }

    const PROJECT: &str = r#"
[toolchain]
canonical = "17"

[libraries."org.example:coreLib"]
versions = ["1.0", "1.2"]
min-toolchain = "17"

[[module]]
name = ":app"
modules = [":core"]
plugins = ["com.android.application"]
attributes = { namespace = "com.example.app" }
[module.dependencies]
"org.example:libX" = "1.0"

[[module]]
name = ":core"
[module.dependencies]
"org.example:coreLib" = "[1.0,2.0)"

[[module]]
name = ":feature"
modules = [":core"]
[module.dependencies]
"org.example:libX" = "1.2"

[[override]]
dependency = "org.example:libX"
version = "1.2"
"#;

    #[tokio::test]
    async fn successful_run_visits_every_stage() {
        let ok = reconciler(1).run(&manifest(PROJECT)).await.unwrap();
        assert_eq!(
            ok.history,
            vec![
                Stage::Loading,
                Stage::Resolving,
                Stage::Enforcing,
                Stage::Emitting,
                Stage::Done
            ]
        );
        let app = &ok.configuration.modules[&ModuleId::from(":app")];
        let lib_x = DependencyId::parse("org.example:libX").unwrap();
        let core_lib = DependencyId::parse("org.example:coreLib").unwrap();
        assert_eq!(app.dependencies[&lib_x], "1.2");
        assert_eq!(app.dependencies[&core_lib], "1.2");
        assert_eq!(app.toolchain, "17");
        assert!(ok.document.contains("com.example.app"));
    }

    #[tokio::test]
    async fn conflict_fails_in_resolving_with_nothing_emitted() {
        let text = PROJECT.replace(
            "[[override]]\ndependency = \"org.example:libX\"\nversion = \"1.2\"\n",
            "",
        );
        let failure = reconciler(1).run(&manifest(&text)).await.unwrap_err();
        assert_eq!(failure.stage, Stage::Resolving);
        assert_eq!(
            failure.history,
            vec![Stage::Loading, Stage::Resolving, Stage::Failed]
        );
        let report = failure.report().unwrap();
        assert_eq!(report.count(DiagnosticKind::VersionConflict), 1);
        assert!(!failure.is_cancelled());
    }

    #[tokio::test]
    async fn loader_errors_fail_in_loading() {
        let failure = reconciler(1)
            .run(&manifest(
                r#"
[toolchain]
canonical = "17"
[[module]]
name = ":app"
[[module]]
name = ":app"
"#,
            ))
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Loading);
        assert_eq!(failure.history, vec![Stage::Loading, Stage::Failed]);
    }

    #[tokio::test]
    async fn toolchain_mismatch_fails_in_enforcing() {
        let text = PROJECT.replace("name = \":core\"\n", "name = \":core\"\ntoolchain = \"15\"\n");
        let failure = reconciler(1).run(&manifest(&text)).await.unwrap_err();
        assert_eq!(failure.stage, Stage::Enforcing);
        assert!(failure
            .report()
            .unwrap()
            .iter()
            .all(|d| d.kind == DiagnosticKind::ToolchainMismatch));
    }

    #[tokio::test]
    async fn cancelled_run_emits_nothing() {
        let token = CancelToken::new();
        token.cancel();
        let failure = reconciler(1)
            .with_cancel_token(token)
            .run(&manifest(PROJECT))
            .await
            .unwrap_err();
        assert!(failure.is_cancelled());
        assert!(failure.report().is_none());
        assert_eq!(failure.history, vec![Stage::Failed]);
    }

    #[tokio::test]
    async fn reruns_are_byte_identical() {
        let m = manifest(PROJECT);
        let first = reconciler(1).run(&m).await.unwrap();
        let second = reconciler(4).run(&m).await.unwrap();
        assert_eq!(first.document, second.document);
    }

    #[tokio::test]
    async fn module_order_does_not_change_output() {
        let reordered = r#"
[toolchain]
canonical = "17"

[libraries."org.example:coreLib"]
versions = ["1.0", "1.2"]
min-toolchain = "17"

[[module]]
name = ":feature"
modules = [":core"]
[module.dependencies]
"org.example:libX" = "1.2"

[[module]]
name = ":core"
[module.dependencies]
"org.example:coreLib" = "[1.0,2.0)"

[[module]]
name = ":app"
modules = [":core"]
plugins = ["com.android.application"]
attributes = { namespace = "com.example.app" }
[module.dependencies]
"org.example:libX" = "1.0"

[[override]]
dependency = "org.example:libX"
version = "1.2"
"#;
        let a = reconciler(1).run(&manifest(PROJECT)).await.unwrap();
        let b = reconciler(1).run(&manifest(reordered)).await.unwrap();
        assert_eq!(a.document, b.document);
    }

    #[tokio::test]
    async fn module_order_does_not_change_scoped_override_sources() {
        const A: &str = r#"
[[module]]
name = ":a"
[module.dependencies]
"org.example:libX" = "1.0"
[[module.overrides]]
dependency = "org.example:libX"
version = "1.1"
"#;
        const B: &str = r#"
[[module]]
name = ":b"
[module.dependencies]
"org.example:libX" = "1.0"
"org.example:libY" = "2.0"
[[module.overrides]]
dependency = "org.example:libY"
version = "2.1"
[[module.overrides]]
dependency = "org.example:libX"
version = "1.3"
"#;
        let header = "[toolchain]\ncanonical = \"17\"\n";
        let forward = manifest(&format!("{header}{A}{B}"));
        let backward = manifest(&format!("{header}{B}{A}"));
        assert_eq!(forward.input_hash().unwrap(), backward.input_hash().unwrap());

        let one = reconciler(1).run(&forward).await.unwrap();
        let two = reconciler(1).run(&backward).await.unwrap();
        assert_eq!(one.document, two.document);

        let lib_x = DependencyId::parse("org.example:libX").unwrap();
        let a = &one.configuration.modules[&ModuleId::from(":a")];
        let b = &one.configuration.modules[&ModuleId::from(":b")];
        assert_eq!(a.forced[&lib_x], "override #1 (prefix :a) in :a");
        assert_eq!(b.forced[&lib_x], "override #2 (prefix :b) in :b");
    }

    #[tokio::test]
    async fn json_format_is_honoured() {
        let r = Reconciler::new(ReconcileOptions {
            workers: 2,
            format: OutputFormat::Json,
        });
        let ok = r.run(&manifest(PROJECT)).await.unwrap();
        assert!(ok.document.trim_start().starts_with('{'));
        assert!(ok.document.contains("\"input-hash\""));
    }

    #[test]
    fn terminal_stages() {
        assert!(Stage::Done.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Emitting.is_terminal());
    }
}
