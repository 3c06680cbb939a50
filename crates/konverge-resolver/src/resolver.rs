//! Version resolution: one concrete version per (dependency, module) pair.
//!
//! Each dependency identity is analysed on its own. A module requires a
//! dependency when it declares it or reaches a module that does. Modules
//! matched by a forcing override take the override's version; the rest
//! form a free group whose constraints must intersect.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use konverge_core::dependency::DependencyId;
use konverge_core::module::ModuleId;
use tokio::task::JoinSet;

use crate::conflict::{ConflictReport, Diagnostic, DiagnosticKind};
use crate::graph::{LoadedInput, ModuleGraph, Requirement, RequirementOrigin};
use crate::rules::{RuleAction, Selection};
use crate::version::{LibraryVersion, VersionConstraint, VersionRange};

/// The version chosen for one dependency of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: LibraryVersion,
    /// The override that forced this version, if any.
    pub forced_by: Option<String>,
}

/// Resolved dependency versions for every module, sorted by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub assignments: BTreeMap<ModuleId, BTreeMap<DependencyId, ResolvedVersion>>,
}

impl Resolution {
    pub fn version_of(&self, module: &ModuleId, dep: &DependencyId) -> Option<&ResolvedVersion> {
        self.assignments.get(module)?.get(dep)
    }

    /// Resolved dependencies of `module`; empty when it requires none.
    pub fn dependencies_of(
        &self,
        module: &ModuleId,
    ) -> impl Iterator<Item = (&DependencyId, &ResolvedVersion)> {
        self.assignments.get(module).into_iter().flatten()
    }
}

/// For each module, the module itself plus everything it reaches.
#[derive(Debug, Default)]
struct Closure {
    reach: BTreeMap<ModuleId, Vec<ModuleId>>,
}

impl Closure {
    fn build(graph: &ModuleGraph) -> Self {
        let reach = graph
            .modules()
            .into_iter()
            .map(|node| {
                let mut members = vec![node.id.clone()];
                members.extend(graph.reachable_from(&node.id).into_iter().cloned());
                (node.id.clone(), members)
            })
            .collect();
        Self { reach }
    }

    fn of(&self, module: &ModuleId) -> &[ModuleId] {
        self.reach.get(module).map(Vec::as_slice).unwrap_or_default()
    }
}

/// A constraint some module places on the dependency under analysis.
#[derive(Debug, Clone)]
struct Demand {
    constraint: VersionConstraint,
    label: String,
}

/// The result of analysing a single dependency identity.
#[derive(Debug, Default)]
struct Outcome {
    assignments: Vec<(ModuleId, DependencyId, ResolvedVersion)>,
    report: ConflictReport,
}

fn describe(module: &ModuleId, requirement: &Requirement) -> String {
    match requirement.origin {
        RequirementOrigin::Declared => format!("{module} requires {}", requirement.constraint),
        RequirementOrigin::Plugin(ref plugin) => format!(
            "{module} requires {} (from plugin {plugin})",
            requirement.constraint
        ),
    }
}

/// Every dependency identity that any module declares or any rule names.
fn dependency_ids(input: &LoadedInput) -> BTreeSet<DependencyId> {
    let mut ids: BTreeSet<DependencyId> = input
        .graph
        .modules()
        .into_iter()
        .flat_map(|node| node.requirements.keys().cloned())
        .collect();
    ids.extend(input.rules.iter().filter_map(|rule| match rule.action {
        RuleAction::Dependency { ref id, .. } => Some(id.clone()),
        RuleAction::Toolchain(_) => None,
    }));
    ids
}

fn warn_unmatched_rules(input: &LoadedInput) {
    let modules = input.graph.modules();
    for rule in input.rules.iter() {
        if !modules.iter().any(|node| rule.predicate.matches(&node.id)) {
            tracing::warn!("{rule} matches no module");
        }
    }
}

fn analyze(input: &LoadedInput, closure: &Closure, dep: &DependencyId) -> Outcome {
    let modules = input.graph.modules();

    let mut direct: BTreeMap<&ModuleId, Vec<Demand>> = BTreeMap::new();
    for node in &modules {
        if let Some(requirement) = node.requirements.get(dep) {
            direct.entry(&node.id).or_default().push(Demand {
                constraint: requirement.constraint.clone(),
                label: describe(&node.id, requirement),
            });
        }
        for (rule, id, version) in input.rules.injections(&node.id) {
            if id == dep {
                direct.entry(&node.id).or_default().push(Demand {
                    constraint: VersionConstraint::Exact(version.clone()),
                    label: format!("{} requires {version} (added by {rule})", node.id),
                });
            }
        }
    }

    // Overrides are checked for every module they match, whether or not
    // the module requires the dependency.
    let mut outcome = Outcome::default();
    let mut free: Vec<&ModuleId> = Vec::new();
    for node in &modules {
        let requires = closure.of(&node.id).iter().any(|m| direct.contains_key(m));
        match input.rules.select_dependency(dep, &node.id) {
            Selection::None if requires => free.push(&node.id),
            Selection::None => {}
            Selection::Winner { value, source } if requires => {
                tracing::debug!("{dep} forced to {value} in {} by {source}", node.id);
                outcome.assignments.push((
                    node.id.clone(),
                    dep.clone(),
                    ResolvedVersion {
                        version: value,
                        forced_by: Some(source),
                    },
                ));
            }
            Selection::Winner { .. } => {}
            Selection::Conflict(candidates) => {
                let mut diagnostic = Diagnostic::new(
                    DiagnosticKind::ConflictingOverrides,
                    format!(
                        "equally specific overrides force different versions of {dep} in {}",
                        node.id
                    ),
                )
                .module(&node.id)
                .dependency(dep);
                for (source, version) in candidates {
                    diagnostic = diagnostic.value(format!("{source} sets {version}"));
                }
                outcome.report.add(diagnostic);
            }
        }
    }

    if free.is_empty() {
        return outcome;
    }

    let contributors: BTreeSet<&ModuleId> = free
        .iter()
        .flat_map(|m| closure.of(m))
        .filter(|m| direct.contains_key(m))
        .collect();
    let demands: Vec<&Demand> = contributors
        .iter()
        .filter_map(|m| direct.get(*m))
        .flatten()
        .collect();

    let range = demands
        .iter()
        .fold(VersionRange::any(), |acc, d| acc.intersect(&d.constraint.range()));

    let conflict = |message: String| {
        let mut diagnostic = Diagnostic::new(DiagnosticKind::VersionConflict, message)
            .dependency(dep)
            .modules(contributors.iter().copied());
        for demand in &demands {
            diagnostic = diagnostic.value(demand.label.clone());
        }
        diagnostic
    };

    if range.is_empty() {
        outcome.report.add(conflict(format!(
            "no single version of {dep} satisfies every requirement"
        )));
        return outcome;
    }

    let mut candidates: Vec<LibraryVersion> = input
        .catalog
        .get(dep)
        .map(|info| info.versions.clone())
        .unwrap_or_default();
    candidates.extend(demands.iter().flat_map(|d| d.constraint.named_versions()));
    candidates.sort();

    let Some(chosen) = candidates.into_iter().rev().find(|v| range.contains(v)) else {
        outcome.report.add(conflict(format!(
            "no known version of {dep} satisfies {range}"
        )));
        return outcome;
    };

    tracing::debug!("{dep} resolved to {chosen} for {} modules", free.len());
    for module in free {
        outcome.assignments.push((
            module.clone(),
            dep.clone(),
            ResolvedVersion {
                version: chosen.clone(),
                forced_by: None,
            },
        ));
    }
    outcome
}

fn merge(outcomes: impl IntoIterator<Item = Outcome>) -> Result<Resolution, ConflictReport> {
    let mut resolution = Resolution::default();
    let mut report = ConflictReport::new();
    for outcome in outcomes {
        report.extend(outcome.report);
        for (module, dep, version) in outcome.assignments {
            resolution
                .assignments
                .entry(module)
                .or_default()
                .insert(dep, version);
        }
    }
    if report.is_empty() {
        Ok(resolution)
    } else {
        report.sort();
        Err(report)
    }
}

/// Resolve every dependency on the current thread.
pub fn resolve(input: &LoadedInput) -> Result<Resolution, ConflictReport> {
    warn_unmatched_rules(input);
    let closure = Closure::build(&input.graph);
    merge(
        dependency_ids(input)
            .iter()
            .map(|dep| analyze(input, &closure, dep)),
    )
}

/// Resolve with dependency identities split into `workers` disjoint
/// partitions, each analysed on a blocking task. Results are merged only
/// after every partition has finished, so the outcome equals [`resolve`].
pub async fn resolve_partitioned(
    input: Arc<LoadedInput>,
    workers: usize,
) -> Result<Resolution, ConflictReport> {
    warn_unmatched_rules(&input);
    let closure = Arc::new(Closure::build(&input.graph));
    let deps: Vec<DependencyId> = dependency_ids(&input).into_iter().collect();
    if deps.is_empty() {
        return Ok(Resolution::default());
    }

    let chunk = deps.len().div_ceil(workers.max(1));
    let mut join_set = JoinSet::new();
    for (partition, slice) in deps.chunks(chunk).enumerate() {
        let input = Arc::clone(&input);
        let closure = Arc::clone(&closure);
        let slice = slice.to_vec();
        join_set.spawn_blocking(move || {
            let outcomes: Vec<Outcome> = slice
                .iter()
                .map(|dep| analyze(&input, &closure, dep))
                .collect();
            (partition, outcomes)
        });
    }
    tracing::debug!(
        "resolving {} dependencies in {} partitions",
        deps.len(),
        join_set.len()
    );

    let mut partitions = Vec::with_capacity(join_set.len());
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(result) => partitions.push(result),
            // Tasks are never aborted, so a join error is a worker panic.
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        }
    }
    partitions.sort_by_key(|(partition, _)| *partition);
    merge(partitions.into_iter().flat_map(|(_, outcomes)| outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::load;
    use konverge_core::manifest::Manifest;

    fn input(toml: &str) -> LoadedInput {
        load(&Manifest::parse_toml(toml).unwrap()).unwrap()
    }

    fn dep(s: &str) -> DependencyId {
        DependencyId::parse(s).unwrap()
    }

    fn version(res: &Resolution, module: &str, d: &str) -> String {
        res.version_of(&ModuleId::from(module), &dep(d))
            .map(|v| v.version.to_string())
            .unwrap_or_default()
    }

    const SCENARIO_A: &str = r#"
[toolchain]
canonical = "17"

[[module]]
name = ":appModule"
[module.dependencies]
"org.example:libX" = "1.0"

[[module]]
name = ":featureModule"
[module.dependencies]
"org.example:libX" = "1.2"
"#;

    #[test]
    fn incompatible_pins_conflict() {
        let report = resolve(&input(SCENARIO_A)).unwrap_err();
        assert_eq!(report.len(), 1);
        let d = &report.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::VersionConflict);
        assert_eq!(d.dependency, Some(dep("org.example:libX")));
        assert_eq!(
            d.modules,
            vec![ModuleId::from(":appModule"), ModuleId::from(":featureModule")]
        );
        assert_eq!(d.values.len(), 2);
    }

    #[test]
    fn global_override_settles_conflict() {
        let toml = format!(
            "{SCENARIO_A}\n[[override]]\ndependency = \"org.example:libX\"\nversion = \"1.2\"\n"
        );
        let res = resolve(&input(&toml)).unwrap();
        assert_eq!(version(&res, ":appModule", "org.example:libX"), "1.2");
        assert_eq!(version(&res, ":featureModule", "org.example:libX"), "1.2");
        let forced = res
            .version_of(&ModuleId::from(":appModule"), &dep("org.example:libX"))
            .unwrap();
        assert!(forced.forced_by.as_deref().unwrap().starts_with("override #1"));
    }

    #[test]
    fn equally_specific_overrides_conflict() {
        let res = resolve(&input(
            r#"
[toolchain]
canonical = "17"

[[module]]
name = ":pluginB"
[module.dependencies]
"org.example:libX" = "1.0"

[[override]]
dependency = "org.example:libX"
version = "1.1"
module = ":pluginB"

[[override]]
dependency = "org.example:libX"
version = "1.3"
module = ":pluginB"
"#,
        ));
        let report = res.unwrap_err();
        assert_eq!(report.count(DiagnosticKind::ConflictingOverrides), 1);
        assert_eq!(report.diagnostics[0].modules, vec![ModuleId::from(":pluginB")]);
    }

    #[test]
    fn conflicting_overrides_reported_without_requirement() {
        let toml = r#"
[toolchain]
canonical = "17"

[[module]]
name = ":pluginB"

[[module]]
name = ":app"
[module.dependencies]
"org.example:other" = "2.0"

[[override]]
dependency = "org.example:libX"
version = "1.1"
module = ":pluginB"

[[override]]
dependency = "org.example:libX"
version = "1.3"
module = ":pluginB"
"#;
        let report = resolve(&input(toml)).unwrap_err();
        assert_eq!(report.len(), 1);
        let d = &report.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::ConflictingOverrides);
        assert_eq!(d.modules, vec![ModuleId::from(":pluginB")]);
        assert_eq!(d.dependency, Some(dep("org.example:libX")));
        assert_eq!(d.values.len(), 2);
    }

    #[tokio::test]
    async fn partitioned_reports_unrequired_override_conflicts() {
        let toml = r#"
[toolchain]
canonical = "17"
[[module]]
name = ":pluginB"
[[override]]
dependency = "org.example:libX"
version = "1.1"
module = ":pluginB"
[[override]]
dependency = "org.example:libX"
version = "1.3"
module = ":pluginB"
"#;
        let report = resolve_partitioned(Arc::new(input(toml)), 4)
            .await
            .unwrap_err();
        assert_eq!(report.count(DiagnosticKind::ConflictingOverrides), 1);
    }

    #[test]
    fn agreeing_override_without_requirement_assigns_nothing() {
        let toml = r#"
[toolchain]
canonical = "17"
[[module]]
name = ":pluginB"
[[override]]
dependency = "org.example:libX"
version = "1.1"
module = ":pluginB"
"#;
        let res = resolve(&input(toml)).unwrap();
        assert!(res.dependencies_of(&ModuleId::from(":pluginB")).next().is_none());
    }

    #[test]
    fn ranges_intersect_to_highest_candidate() {
        let res = resolve(&input(
            r#"
[toolchain]
canonical = "17"

[libraries."org.example:libY"]
versions = ["1.0", "1.4", "1.9", "2.0"]

[[module]]
name = ":a"
[module.dependencies]
"org.example:libY" = "[1.0,2.0)"

[[module]]
name = ":b"
[module.dependencies]
"org.example:libY" = "1.+"
"#,
        ))
        .unwrap();
        assert_eq!(version(&res, ":a", "org.example:libY"), "1.9");
        assert_eq!(version(&res, ":b", "org.example:libY"), "1.9");
    }

    #[test]
    fn range_without_known_version_conflicts() {
        let report = resolve(&input(
            r#"
[toolchain]
canonical = "17"

[[module]]
name = ":a"
[module.dependencies]
"org.example:libY" = "(1.0,2.0)"
"#,
        ))
        .unwrap_err();
        assert!(report.diagnostics[0].message.contains("no known version"));
    }

    #[test]
    fn transitive_requirers_share_the_version() {
        let res = resolve(&input(
            r#"
[toolchain]
canonical = "17"

[[module]]
name = ":app"
modules = [":core"]

[[module]]
name = ":core"
[module.dependencies]
"org.example:libX" = "[1.0,)"
"#,
        ))
        .unwrap();
        assert_eq!(version(&res, ":app", "org.example:libX"), "1.0");
        assert_eq!(version(&res, ":core", "org.example:libX"), "1.0");
    }

    #[test]
    fn transitive_requirement_conflicts_with_direct_pin() {
        let report = resolve(&input(
            r#"
[toolchain]
canonical = "17"

[[module]]
name = ":app"
modules = [":core"]
[module.dependencies]
"org.example:libX" = "2.0"

[[module]]
name = ":core"
[module.dependencies]
"org.example:libX" = "1.0"
"#,
        ))
        .unwrap_err();
        assert_eq!(report.count(DiagnosticKind::VersionConflict), 1);
    }

    #[test]
    fn exact_override_beats_global_for_one_module() {
        let res = resolve(&input(
            r#"
[toolchain]
canonical = "17"

[[module]]
name = ":app"
[module.dependencies]
"org.example:libX" = "1.0"

[[module]]
name = ":legacy"
[module.dependencies]
"org.example:libX" = "0.9"

[[override]]
dependency = "org.example:libX"
version = "1.2"

[[override]]
dependency = "org.example:libX"
version = "0.9"
module = ":legacy"
"#,
        ))
        .unwrap();
        assert_eq!(version(&res, ":app", "org.example:libX"), "1.2");
        assert_eq!(version(&res, ":legacy", "org.example:libX"), "0.9");
    }

    #[test]
    fn additive_rule_injects_requirement() {
        let res = resolve(&input(
            r#"
[toolchain]
canonical = "17"

[[module]]
name = ":feature:login"

[[module]]
name = ":app"

[[override]]
dependency = "org.example:analytics"
version = "3.1"
prefix = ":feature"
additive = true
"#,
        ))
        .unwrap();
        assert_eq!(version(&res, ":feature:login", "org.example:analytics"), "3.1");
        assert_eq!(version(&res, ":app", "org.example:analytics"), "");
    }

    #[test]
    fn declaration_order_does_not_change_result() {
        let forward = r#"
[toolchain]
canonical = "17"
[libraries."a:b"]
versions = ["1.1", "1.5"]
[[module]]
name = ":one"
[module.dependencies]
"a:b" = "[1.0,2.0)"
[[module]]
name = ":two"
[module.dependencies]
"a:b" = "1.+"
"#;
        let reversed = r#"
[toolchain]
canonical = "17"
[libraries."a:b"]
versions = ["1.1", "1.5"]
[[module]]
name = ":two"
[module.dependencies]
"a:b" = "1.+"
[[module]]
name = ":one"
[module.dependencies]
"a:b" = "[1.0,2.0)"
"#;
        assert_eq!(resolve(&input(forward)), resolve(&input(reversed)));
    }

    #[tokio::test]
    async fn partitioned_matches_serial() {
        let toml = r#"
[toolchain]
canonical = "17"
[libraries."org.example:libY"]
versions = ["1.0", "1.4"]
[[module]]
name = ":app"
modules = [":core"]
[module.dependencies]
"org.example:libX" = "1.0"
"org.example:libY" = "[1.0,2.0)"
"com.example:a" = "2.0"
"com.example:b" = "+"
[[module]]
name = ":core"
[module.dependencies]
"org.example:libZ" = "3.0"
"com.example:b" = "[1.0]"
"#;
        let loaded = Arc::new(input(toml));
        let serial = resolve(&loaded);
        for workers in [1, 2, 3, 8] {
            let parallel = resolve_partitioned(Arc::clone(&loaded), workers).await;
            assert_eq!(parallel, serial, "workers = {workers}");
        }
    }

    #[tokio::test]
    async fn partitioned_reports_match_serial() {
        let loaded = Arc::new(input(SCENARIO_A));
        let serial = resolve(&loaded).unwrap_err();
        let parallel = resolve_partitioned(loaded, 4).await.unwrap_err();
        assert_eq!(parallel, serial);
    }
}
