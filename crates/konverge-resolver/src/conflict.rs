//! Diagnostics produced by reconciliation and the report that aggregates them.

use std::fmt;

use konverge_core::dependency::DependencyId;
use konverge_core::module::ModuleId;
use serde::Serialize;

/// The class of problem a [`Diagnostic`] describes. Every kind is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DiagnosticKind {
    MalformedDeclaration,
    DuplicateModule,
    CycleDetected,
    VersionConflict,
    ConflictingOverrides,
    ToolchainMismatch,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::MalformedDeclaration => "MalformedDeclaration",
            DiagnosticKind::DuplicateModule => "DuplicateModule",
            DiagnosticKind::CycleDetected => "CycleDetected",
            DiagnosticKind::VersionConflict => "VersionConflict",
            DiagnosticKind::ConflictingOverrides => "ConflictingOverrides",
            DiagnosticKind::ToolchainMismatch => "ToolchainMismatch",
        };
        f.write_str(name)
    }
}

/// A single structured problem: enough to render a report without
/// re-running resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub modules: Vec<ModuleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency: Option<DependencyId>,
    /// The competing values, e.g. `":app requires 1.0"`.
    pub values: Vec<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            modules: Vec::new(),
            dependency: None,
            values: Vec::new(),
            message: message.into(),
        }
    }

    pub fn module(mut self, module: &ModuleId) -> Self {
        self.modules.push(module.clone());
        self
    }

    pub fn modules<'a>(mut self, modules: impl IntoIterator<Item = &'a ModuleId>) -> Self {
        self.modules.extend(modules.into_iter().cloned());
        self
    }

    pub fn dependency(mut self, dependency: &DependencyId) -> Self {
        self.dependency = Some(dependency.clone());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }

    fn sort_key(&self) -> (DiagnosticKind, Option<&DependencyId>, &[ModuleId], &str) {
        (self.kind, self.dependency.as_ref(), &self.modules, &self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if !self.values.is_empty() {
            write!(f, " [{}]", self.values.join("; "))?;
        }
        Ok(())
    }
}

/// All diagnostics collected during a reconciliation run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: ConflictReport) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Put diagnostics in a stable order so reports from parallel stages
    /// are reproducible.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }

    /// `Ok(())` when nothing was reported, the report itself otherwise.
    pub fn into_result(self) -> Result<(), ConflictReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.diagnostics.is_empty() {
            return write!(f, "No conflicts.");
        }
        writeln!(f, "Reconciliation errors ({}):", self.diagnostics.len())?;
        for d in &self.diagnostics {
            write!(f, "  {}: {}", d.kind, d.message)?;
            if !d.modules.is_empty() {
                let modules: Vec<&str> = d.modules.iter().map(ModuleId::as_str).collect();
                write!(f, " (modules: {})", modules.join(", "))?;
            }
            writeln!(f)?;
            for value in &d.values {
                writeln!(f, "      {value}")?;
            }
        }
        Ok(())
    }
}
