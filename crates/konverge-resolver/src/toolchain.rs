//! Toolchain enforcement: one compiler target per module.
//!
//! Every module gets the canonical target unless it carries an explicit
//! override. Targets never flow across module edges; a consumer is only
//! checked against what its providers target.

use std::collections::BTreeMap;

use konverge_core::dependency::DependencyId;
use konverge_core::module::ModuleId;
use konverge_core::toolchain::ToolchainTarget;

use crate::conflict::{ConflictReport, Diagnostic, DiagnosticKind};
use crate::graph::{LoadedInput, ModuleNode};
use crate::resolver::Resolution;
use crate::rules::Selection;

/// The toolchain target assigned to one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainAssignment {
    pub target: ToolchainTarget,
    /// The override that set the target; `None` means canonical.
    pub overridden_by: Option<String>,
}

/// Targets for every module, sorted by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enforcement {
    pub targets: BTreeMap<ModuleId, ToolchainAssignment>,
}

impl Enforcement {
    pub fn target_of(&self, module: &ModuleId) -> Option<&ToolchainTarget> {
        self.targets.get(module).map(|a| &a.target)
    }
}

/// Something that needs a module to target at least `target`.
struct Minimum<'a> {
    target: &'a ToolchainTarget,
    reason: String,
    dependency: Option<&'a DependencyId>,
}

fn explicit_target(
    input: &LoadedInput,
    node: &ModuleNode,
    report: &mut ConflictReport,
) -> Option<ToolchainAssignment> {
    match input.rules.select_toolchain(&node.id, node.toolchain.as_ref()) {
        Selection::None => Some(ToolchainAssignment {
            target: input.canonical.clone(),
            overridden_by: None,
        }),
        Selection::Winner { value, source } if input.allow_overrides => {
            tracing::debug!("{} targets {value} via {source}", node.id);
            Some(ToolchainAssignment {
                target: value,
                overridden_by: Some(source),
            })
        }
        // Restating the canonical target is not an override.
        Selection::Winner { value, .. } if value == input.canonical => Some(ToolchainAssignment {
            target: input.canonical.clone(),
            overridden_by: None,
        }),
        Selection::Winner { value, source } => {
            report.add(
                Diagnostic::new(
                    DiagnosticKind::ToolchainMismatch,
                    format!(
                        "toolchain override not permitted for {}: canonical target is {}",
                        node.id, input.canonical
                    ),
                )
                .module(&node.id)
                .value(format!("{source} sets {value}"))
                .value(format!("canonical {}", input.canonical)),
            );
            None
        }
        Selection::Conflict(candidates) => {
            let mut diagnostic = Diagnostic::new(
                DiagnosticKind::ConflictingOverrides,
                format!("equally specific toolchain overrides disagree for {}", node.id),
            )
            .module(&node.id);
            for (source, value) in candidates {
                diagnostic = diagnostic.value(format!("{source} sets {value}"));
            }
            report.add(diagnostic);
            None
        }
    }
}

fn minimums<'a>(
    input: &'a LoadedInput,
    resolution: &'a Resolution,
    assigned: &'a BTreeMap<ModuleId, ToolchainAssignment>,
    node: &'a ModuleNode,
) -> Vec<Minimum<'a>> {
    let mut needs = Vec::new();
    for (dep, resolved) in resolution.dependencies_of(&node.id) {
        if let Some(target) = input
            .catalog
            .get(dep)
            .and_then(|info| info.required_toolchain(&resolved.version))
        {
            needs.push(Minimum {
                target,
                reason: format!("{dep} {} requires {target}", resolved.version),
                dependency: Some(dep),
            });
        }
    }
    for plugin in &node.plugins {
        if let Some(target) = input
            .plugins
            .get(plugin)
            .and_then(|p| p.min_toolchain.as_ref())
        {
            needs.push(Minimum {
                target,
                reason: format!("plugin {plugin} requires {target}"),
                dependency: None,
            });
        }
    }
    for provider in input.graph.dependencies_of(&node.id) {
        if let Some(assignment) = assigned.get(provider) {
            needs.push(Minimum {
                target: &assignment.target,
                reason: format!("module {provider} targets {}", assignment.target),
                dependency: None,
            });
        }
    }
    needs
}

/// Assign a toolchain target to every module and check it against what
/// the module's dependencies, plugins and provider modules require.
pub fn enforce(input: &LoadedInput, resolution: &Resolution) -> Result<Enforcement, ConflictReport> {
    let mut report = ConflictReport::new();
    let modules = input.graph.modules();

    let mut assigned = BTreeMap::new();
    for node in &modules {
        if let Some(assignment) = explicit_target(input, node, &mut report) {
            assigned.insert(node.id.clone(), assignment);
        }
    }

    for node in &modules {
        let Some(assignment) = assigned.get(&node.id) else {
            continue;
        };
        for need in minimums(input, resolution, &assigned, node) {
            if assignment.target >= *need.target {
                continue;
            }
            let mut diagnostic = Diagnostic::new(
                DiagnosticKind::ToolchainMismatch,
                format!(
                    "{} targets {} but {}",
                    node.id, assignment.target, need.reason
                ),
            )
            .module(&node.id)
            .value(format!("effective {}", assignment.target))
            .value(format!("required {}", need.target));
            if let Some(dep) = need.dependency {
                diagnostic = diagnostic.dependency(dep);
            }
            report.add(diagnostic);
        }
    }

    if report.is_empty() {
        Ok(Enforcement { targets: assigned })
    } else {
        report.sort();
        Err(report)
    }
}
