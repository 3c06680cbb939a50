//! Module graph construction: the loading stage of reconciliation.
//!
//! [`load`] validates raw `Konverge.toml` declarations and builds a
//! `petgraph` graph whose edges point from a consuming module to the module
//! it depends on. Every problem found is collected; a graph is only
//! returned when the declarations are completely valid.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use konverge_core::dependency::{DependencyId, DependencySpec};
use konverge_core::error::DeclarationError;
use konverge_core::manifest::Manifest;
use konverge_core::module::{ModuleDeclaration, ModuleId};
use konverge_core::overrides::ModulePredicate;
use konverge_core::toolchain::ToolchainTarget;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;

use crate::conflict::{ConflictReport, Diagnostic, DiagnosticKind};
use crate::rules::{OverrideRule, OverrideSet};
use crate::version::{LibraryVersion, VersionConstraint};

/// Where a module's requirement came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementOrigin {
    Declared,
    Plugin(String),
}

/// A version requirement a module places on one dependency.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub constraint: VersionConstraint,
    pub origin: RequirementOrigin,
}

/// A validated module.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub id: ModuleId,
    pub requirements: BTreeMap<DependencyId, Requirement>,
    /// The module's own `toolchain` field, if any.
    pub toolchain: Option<ToolchainTarget>,
    pub plugins: Vec<String>,
    pub attributes: BTreeMap<String, String>,
}

/// Known metadata for a library.
#[derive(Debug, Clone, Default)]
pub struct LibraryInfo {
    pub versions: Vec<LibraryVersion>,
    pub min_toolchain: Option<ToolchainTarget>,
    pub requires_toolchain: Vec<(LibraryVersion, ToolchainTarget)>,
}

impl LibraryInfo {
    /// Toolchain needed to consume `version` of this library.
    pub fn required_toolchain(&self, version: &LibraryVersion) -> Option<&ToolchainTarget> {
        self.requires_toolchain
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, t)| t)
            .or(self.min_toolchain.as_ref())
    }
}

/// Library metadata keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    libraries: BTreeMap<DependencyId, LibraryInfo>,
}

impl Catalog {
    pub fn get(&self, id: &DependencyId) -> Option<&LibraryInfo> {
        self.libraries.get(id)
    }

    pub fn insert(&mut self, id: DependencyId, info: LibraryInfo) {
        self.libraries.insert(id, info);
    }
}

/// Validated plugin metadata that later stages still need.
#[derive(Debug, Clone, Default)]
pub struct PluginInfo {
    pub min_toolchain: Option<ToolchainTarget>,
}

/// Everything the later stages consume, produced by [`load`].
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub graph: ModuleGraph,
    pub rules: OverrideSet,
    pub catalog: Catalog,
    pub plugins: BTreeMap<String, PluginInfo>,
    pub canonical: ToolchainTarget,
    pub allow_overrides: bool,
}

/// Directed module graph backed by petgraph.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    graph: DiGraph<ModuleNode, ()>,
    index: HashMap<ModuleId, NodeIndex>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module. Returns `None` if the identity is already present.
    pub fn add_module(&mut self, node: ModuleNode) -> Option<NodeIndex> {
        if self.index.contains_key(&node.id) {
            return None;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        Some(idx)
    }

    /// Record that `consumer` depends on `provider`.
    pub fn add_edge(&mut self, consumer: &ModuleId, provider: &ModuleId) -> bool {
        let (Some(&from), Some(&to)) = (self.index.get(consumer), self.index.get(provider)) else {
            return false;
        };
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, ());
        }
        true
    }

    pub fn module(&self, id: &ModuleId) -> Option<&ModuleNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.index.contains_key(id)
    }

    /// All modules, sorted by identity.
    pub fn modules(&self) -> Vec<&ModuleNode> {
        let mut nodes: Vec<&ModuleNode> = self.graph.node_weights().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Modules `id` depends on directly, sorted.
    pub fn dependencies_of(&self, id: &ModuleId) -> Vec<&ModuleId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Modules that depend directly on `id`, sorted.
    pub fn dependents_of(&self, id: &ModuleId) -> Vec<&ModuleId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &ModuleId, direction: Direction) -> Vec<&ModuleId> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<&ModuleId> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| &self.graph[n].id)
            .collect();
        ids.sort();
        ids
    }

    /// Every module reachable from `id` over dependency edges, excluding
    /// `id` itself.
    pub fn reachable_from(&self, id: &ModuleId) -> BTreeSet<&ModuleId> {
        let mut reached = BTreeSet::new();
        let Some(&start) = self.index.get(id) else {
            return reached;
        };
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                reached.insert(&self.graph[idx].id);
            }
        }
        reached
    }

    /// Modules no other module depends on, sorted.
    pub fn roots(&self) -> Vec<&ModuleId> {
        let mut roots: Vec<&ModuleId> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| &self.graph[idx].id)
            .collect();
        roots.sort();
        roots
    }

    /// Groups of modules that depend on each other in a loop.
    pub fn cycles(&self) -> Vec<Vec<&ModuleId>> {
        let mut cycles: Vec<Vec<&ModuleId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0])
            })
            .map(|scc| {
                let mut ids: Vec<&ModuleId> = scc.iter().map(|&i| &self.graph[i].id).collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Shortest chain of module dependencies from `from` to `to`.
    pub fn find_path(&self, from: &ModuleId, to: &ModuleId) -> Option<Vec<&ModuleId>> {
        let &start = self.index.get(from)?;
        let &target = self.index.get(to)?;
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut seen = HashSet::from([start]);
        let mut queue = std::collections::VecDeque::from([start]);
        while let Some(idx) = queue.pop_front() {
            if idx == target {
                let mut path = vec![&self.graph[idx].id];
                let mut cur = idx;
                while let Some(&p) = parent.get(&cur) {
                    path.push(&self.graph[p].id);
                    cur = p;
                }
                path.reverse();
                return Some(path);
            }
            let mut next: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
            next.sort_by(|a, b| self.graph[*a].id.cmp(&self.graph[*b].id));
            for n in next {
                if seen.insert(n) {
                    parent.insert(n, idx);
                    queue.push_back(n);
                }
            }
        }
        None
    }

    /// Render the module tree from every root, annotating each line with
    /// `annotate(node)`.
    pub fn render_tree(&self, annotate: impl Fn(&ModuleNode) -> String) -> String {
        let mut output = String::new();
        for root in self.roots() {
            let Some(&idx) = self.index.get(root) else {
                continue;
            };
            let node = &self.graph[idx];
            output.push_str(&format!("{}{}\n", node.id, annotate(node)));
            let children = self.dependencies_of(root);
            let count = children.len();
            let mut path = HashSet::from([idx]);
            for (i, child) in children.into_iter().enumerate() {
                self.render_subtree(&mut output, child, "", i == count - 1, &annotate, &mut path);
            }
        }
        output
    }

    fn render_subtree(
        &self,
        output: &mut String,
        id: &ModuleId,
        prefix: &str,
        is_last: bool,
        annotate: &impl Fn(&ModuleNode) -> String,
        path: &mut HashSet<NodeIndex>,
    ) {
        let Some(&idx) = self.index.get(id) else {
            return;
        };
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{}{}\n", node.id, annotate(node)));

        if !path.insert(idx) {
            return;
        }
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children = self.dependencies_of(id);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.render_subtree(output, child, &child_prefix, i == count - 1, annotate, path);
        }
        path.remove(&idx);
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

impl fmt::Display for ModuleGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_tree(|_| String::new()))
    }
}

fn malformed(message: impl Into<String>) -> Diagnostic {
    Diagnostic::new(DiagnosticKind::MalformedDeclaration, message)
}

/// Validate declarations and build the module graph, rule list, catalog and
/// toolchain policy. Returns every problem found when anything is invalid.
pub fn load(manifest: &Manifest) -> Result<LoadedInput, ConflictReport> {
    let mut report = ConflictReport::new();

    let canonical = match manifest.toolchain.canonical.parse::<ToolchainTarget>() {
        Ok(t) => Some(t),
        Err(e) => {
            report.add(malformed(format!("[toolchain] canonical: {e}")));
            None
        }
    };

    let (plugins, plugin_deps) = load_plugins(manifest, &mut report);
    let catalog = load_catalog(manifest, &mut report);

    let mut graph = ModuleGraph::new();
    let mut accepted: Vec<&ModuleDeclaration> = Vec::new();
    let mut first_seen: HashMap<ModuleId, usize> = HashMap::new();

    for (position, decl) in manifest.modules.iter().enumerate() {
        let name = decl.name.trim();
        if name.is_empty() {
            report.add(malformed(format!("module #{} has an empty name", position + 1)));
            continue;
        }
        let id = ModuleId::new(name);
        if let Some(&first) = first_seen.get(&id) {
            report.add(
                Diagnostic::new(
                    DiagnosticKind::DuplicateModule,
                    format!("module '{id}' is declared more than once"),
                )
                .module(&id)
                .value(format!("declaration #{}", first + 1))
                .value(format!("declaration #{}", position + 1)),
            );
            continue;
        }
        first_seen.insert(id.clone(), position);

        let node = load_module(id, decl, manifest, &plugin_deps, &mut report);
        graph.add_module(node);
        accepted.push(decl);
    }

    for decl in &accepted {
        let consumer = ModuleId::new(decl.name.trim());
        for provider in &decl.modules {
            let provider = ModuleId::new(provider.trim());
            if !graph.add_edge(&consumer, &provider) {
                report.add(
                    malformed(format!(
                        "module '{consumer}' depends on undeclared module '{provider}'"
                    ))
                    .module(&consumer),
                );
            }
        }
    }

    for cycle in graph.cycles() {
        let names: Vec<&str> = cycle.iter().map(|id| id.as_str()).collect();
        report.add(
            Diagnostic::new(
                DiagnosticKind::CycleDetected,
                format!("module dependency cycle: {}", names.join(" -> ")),
            )
            .modules(cycle.iter().copied()),
        );
    }

    let rules = load_rules(manifest, &accepted, &graph, &mut report);

    match canonical {
        Some(canonical) if report.is_empty() => {
            tracing::debug!(
                "loaded {} modules, {} override rules",
                graph.len(),
                rules.len()
            );
            Ok(LoadedInput {
                graph,
                rules,
                catalog,
                plugins,
                canonical,
                allow_overrides: manifest.toolchain.allow_overrides,
            })
        }
        _ => {
            report.sort();
            Err(report)
        }
    }
}

type PluginDependencies = BTreeMap<String, Vec<(DependencyId, VersionConstraint)>>;

fn load_plugins(
    manifest: &Manifest,
    report: &mut ConflictReport,
) -> (BTreeMap<String, PluginInfo>, PluginDependencies) {
    let mut plugins = BTreeMap::new();
    let mut contributions = BTreeMap::new();
    for (id, spec) in &manifest.plugins {
        let min_toolchain = spec.min_toolchain.as_deref().and_then(|t| {
            t.parse::<ToolchainTarget>()
                .map_err(|e| report.add(malformed(format!("plugin '{id}' min-toolchain: {e}"))))
                .ok()
        });
        let mut deps = Vec::new();
        for (key, dep) in &spec.dependencies {
            match parse_dependency(key, dep) {
                Ok(parsed) => deps.push(parsed),
                Err(e) => report.add(malformed(format!("plugin '{id}': {e}"))),
            }
        }
        plugins.insert(id.clone(), PluginInfo { min_toolchain });
        contributions.insert(id.clone(), deps);
    }
    (plugins, contributions)
}

fn load_catalog(manifest: &Manifest, report: &mut ConflictReport) -> Catalog {
    let mut catalog = Catalog::default();
    for (key, entry) in &manifest.libraries {
        let id = match DependencyId::parse(key) {
            Ok(id) => id,
            Err(e) => {
                report.add(malformed(format!("[libraries]: {e}")));
                continue;
            }
        };
        let mut info = LibraryInfo::default();
        for v in &entry.versions {
            match LibraryVersion::parse(v) {
                Ok(v) => info.versions.push(v),
                Err(e) => report.add(malformed(format!("library {id}: {e}")).dependency(&id)),
            }
        }
        if let Some(ref t) = entry.min_toolchain {
            match t.parse() {
                Ok(t) => info.min_toolchain = Some(t),
                Err(e) => {
                    report.add(malformed(format!("library {id} min-toolchain: {e}")).dependency(&id))
                }
            }
        }
        for (v, t) in &entry.requires_toolchain {
            match (LibraryVersion::parse(v), t.parse::<ToolchainTarget>()) {
                (Ok(v), Ok(t)) => info.requires_toolchain.push((v, t)),
                (Err(e), _) | (_, Err(e)) => report.add(
                    malformed(format!("library {id} requires-toolchain '{v}': {e}"))
                        .dependency(&id),
                ),
            }
        }
        catalog.insert(id, info);
    }
    catalog
}

fn parse_dependency(
    key: &str,
    spec: &DependencySpec,
) -> Result<(DependencyId, VersionConstraint), DeclarationError> {
    let (id, raw) = spec.resolve(key)?;
    let constraint =
        VersionConstraint::parse(&raw).map_err(|e| DeclarationError::Constraint {
            id: id.clone(),
            source: Box::new(e),
        })?;
    Ok((id, constraint))
}

fn load_module(
    id: ModuleId,
    decl: &ModuleDeclaration,
    manifest: &Manifest,
    plugin_deps: &PluginDependencies,
    report: &mut ConflictReport,
) -> ModuleNode {
    let toolchain = decl.toolchain.as_deref().and_then(|t| {
        t.parse::<ToolchainTarget>()
            .map_err(|e| report.add(malformed(format!("module '{id}' toolchain: {e}")).module(&id)))
            .ok()
    });

    let last = decl.plugins.len().saturating_sub(1);
    for (position, plugin) in decl.plugins.iter().enumerate() {
        let apply_last = manifest.plugins.get(plugin).is_some_and(|p| p.apply_last);
        if apply_last && position != last {
            report.add(
                malformed(format!(
                    "module '{id}' must apply plugin '{plugin}' last (found at position {} of {})",
                    position + 1,
                    decl.plugins.len()
                ))
                .module(&id),
            );
        }
    }

    let mut requirements = BTreeMap::new();
    for plugin in &decl.plugins {
        for (dep, constraint) in plugin_deps.get(plugin).into_iter().flatten() {
            requirements.entry(dep.clone()).or_insert_with(|| Requirement {
                constraint: constraint.clone(),
                origin: RequirementOrigin::Plugin(plugin.clone()),
            });
        }
    }

    let mut declared: HashSet<DependencyId> = HashSet::new();
    for (key, spec) in &decl.dependencies {
        match parse_dependency(key, spec) {
            Ok((dep, constraint)) => {
                if !declared.insert(dep.clone()) {
                    report.add(
                        malformed(format!("module '{id}' declares {dep} more than once"))
                            .module(&id)
                            .dependency(&dep),
                    );
                    continue;
                }
                requirements.insert(
                    dep,
                    Requirement {
                        constraint,
                        origin: RequirementOrigin::Declared,
                    },
                );
            }
            Err(e) => report.add(malformed(format!("module '{id}': {e}")).module(&id)),
        }
    }

    ModuleNode {
        id,
        requirements,
        toolchain,
        plugins: decl.plugins.clone(),
        attributes: decl.attributes.clone(),
    }
}

fn load_rules(
    manifest: &Manifest,
    accepted: &[&ModuleDeclaration],
    graph: &ModuleGraph,
    report: &mut ConflictReport,
) -> OverrideSet {
    let mut owners: Vec<&ModuleDeclaration> = accepted.to_vec();
    owners.sort_by(|a, b| a.name.trim().cmp(b.name.trim()));
    let scoped = owners.into_iter().flat_map(|decl| {
        let owner = ModuleId::new(decl.name.trim());
        decl.overrides
            .iter()
            .enumerate()
            .map(move |(position, o)| (position, o, Some(owner.clone())))
    });
    let declarations = manifest
        .overrides
        .iter()
        .enumerate()
        .map(|(position, o)| (position, o, None))
        .chain(scoped);

    let mut rules = Vec::new();
    for (index, (position, decl, scope)) in declarations.enumerate() {
        let label = match scope {
            Some(ref owner) => format!("override #{} in {owner}", position + 1),
            None => format!("override #{}", position + 1),
        };
        match OverrideRule::compile(index, position, decl, scope.as_ref()) {
            Ok(rule) => {
                if let ModulePredicate::Exact(ref target) = rule.predicate {
                    if !graph.contains(target) {
                        report.add(malformed(format!(
                            "{label} targets undeclared module '{target}'"
                        )));
                        continue;
                    }
                }
                rules.push(rule);
            }
            Err(e) => {
                let mut d = malformed(format!("{label}: {e}"));
                if let Some(ref owner) = scope {
                    d = d.module(owner);
                }
                report.add(d);
            }
        }
    }
    OverrideSet::new(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_str(toml: &str) -> Result<LoadedInput, ConflictReport> {
        load(&Manifest::parse_toml(toml).unwrap())
    }

    fn kinds(report: &ConflictReport) -> Vec<DiagnosticKind> {
        report.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn loads_modules_and_edges() {
        let input = load_str(
            r#"
[toolchain]
canonical = "17"

[[module]]
name = ":app"
modules = [":core"]
[module.dependencies]
"org.example:libX" = "1.0"

[[module]]
name = ":core"
"#,
        )
        .unwrap();
        let app = ModuleId::from(":app");
        let core = ModuleId::from(":core");
        assert_eq!(input.graph.len(), 2);
        assert_eq!(input.graph.dependencies_of(&app), vec![&core]);
        assert_eq!(input.graph.dependents_of(&core), vec![&app]);
        assert_eq!(input.graph.roots(), vec![&app]);
        assert_eq!(input.canonical.to_string(), "17");
        assert_eq!(input.graph.module(&app).unwrap().requirements.len(), 1);
    }

    #[test]
    fn duplicate_module_reported() {
        let err = load_str(
            r#"
[toolchain]
canonical = "17"
[[module]]
name = ":app"
[[module]]
name = ":app"
"#,
        )
        .unwrap_err();
        assert_eq!(kinds(&err), vec![DiagnosticKind::DuplicateModule]);
        assert_eq!(err.diagnostics[0].modules, vec![ModuleId::from(":app")]);
    }

    #[test]
    fn malformed_constraint_reported() {
        let err = load_str(
            r#"
[toolchain]
canonical = "17"
[[module]]
name = ":app"
[module.dependencies]
"org.example:libX" = "[1.0,"
"not-a-coordinate" = "1.0"
"#,
        )
        .unwrap_err();
        assert_eq!(err.count(DiagnosticKind::MalformedDeclaration), 2);
    }

    #[test]
    fn oversized_prefix_constraint_is_malformed() {
        let err = load_str(
            r#"
[toolchain]
canonical = "17"
[[module]]
name = ":app"
[module.dependencies]
"x:y" = "18446744073709551615.+"
"#,
        )
        .unwrap_err();
        assert_eq!(kinds(&err), vec![DiagnosticKind::MalformedDeclaration]);
        assert!(err.diagnostics[0].message.contains("no upper bound"));
    }

    #[test]
    fn undeclared_module_dependency_reported() {
        let err = load_str(
            r#"
[toolchain]
canonical = "17"
[[module]]
name = ":app"
modules = [":missing"]
"#,
        )
        .unwrap_err();
        assert!(err.diagnostics[0].message.contains("undeclared module ':missing'"));
    }

    #[test]
    fn cycle_detected() {
        let err = load_str(
            r#"
[toolchain]
canonical = "17"
[[module]]
name = ":a"
modules = [":b"]
[[module]]
name = ":b"
modules = [":c"]
[[module]]
name = ":c"
modules = [":a"]
[[module]]
name = ":d"
modules = [":d"]
"#,
        )
        .unwrap_err();
        assert_eq!(err.count(DiagnosticKind::CycleDetected), 2);
        let three = err
            .iter()
            .find(|d| d.modules.len() == 3)
            .expect("three-module cycle");
        assert_eq!(
            three.modules,
            vec![ModuleId::from(":a"), ModuleId::from(":b"), ModuleId::from(":c")]
        );
    }

    #[test]
    fn apply_last_plugin_enforced() {
        let err = load_str(
            r#"
[toolchain]
canonical = "17"
[plugins."dev.flutter.flutter-gradle-plugin"]
apply-last = true
[[module]]
name = ":app"
plugins = ["dev.flutter.flutter-gradle-plugin", "kotlin-android"]
"#,
        )
        .unwrap_err();
        assert!(err.diagnostics[0].message.contains("must apply plugin"));
    }

    #[test]
    fn plugin_contributions_merged_and_declarations_win() {
        let input = load_str(
            r#"
[toolchain]
canonical = "17"
[plugins.flutter]
apply-last = true
dependencies = { "io.flutter:embedding" = "1.0", "org.example:libX" = "0.9" }
[[module]]
name = ":app"
plugins = ["kotlin-android", "flutter"]
[module.dependencies]
"org.example:libX" = "1.0"
"#,
        )
        .unwrap();
        let app = input.graph.module(&ModuleId::from(":app")).unwrap();
        let embedding = &app.requirements[&DependencyId::parse("io.flutter:embedding").unwrap()];
        assert_eq!(embedding.origin, RequirementOrigin::Plugin("flutter".to_string()));
        let lib_x = &app.requirements[&DependencyId::parse("org.example:libX").unwrap()];
        assert_eq!(lib_x.origin, RequirementOrigin::Declared);
        assert_eq!(lib_x.constraint.to_string(), "1.0");
    }

    #[test]
    fn bad_canonical_and_override_reported_together() {
        let err = load_str(
            r#"
[toolchain]
canonical = "seventeen"
[[override]]
dependency = "org.example:libX"
[[override]]
toolchain = "21"
module = ":ghost"
"#,
        )
        .unwrap_err();
        assert_eq!(err.count(DiagnosticKind::MalformedDeclaration), 3);
    }

    #[test]
    fn scoped_rules_follow_global_rules() {
        let input = load_str(
            r#"
[toolchain]
canonical = "17"
[[override]]
dependency = "a:b"
version = "1.0"
[[module]]
name = ":feature"
[[module.overrides]]
dependency = "a:b"
version = "2.0"
"#,
        )
        .unwrap();
        let rules: Vec<_> = input.rules.iter().collect();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].index, 1);
        assert_eq!(rules[1].position, 0);
        assert_eq!(rules[1].scope, Some(ModuleId::from(":feature")));
        assert_eq!(rules[1].to_string(), "override #1 (prefix :feature) in :feature");
    }

    #[test]
    fn catalog_loaded() {
        let input = load_str(
            r#"
[toolchain]
canonical = "17"
[libraries."org.example:coreLib"]
versions = ["1.0", "2.0"]
min-toolchain = "17"
requires-toolchain = { "1.0" = "11" }
"#,
        )
        .unwrap();
        let info = input
            .catalog
            .get(&DependencyId::parse("org.example:coreLib").unwrap())
            .unwrap();
        let v1 = LibraryVersion::parse("1.0").unwrap();
        let v2 = LibraryVersion::parse("2.0").unwrap();
        assert_eq!(info.required_toolchain(&v1).unwrap().to_string(), "11");
        assert_eq!(info.required_toolchain(&v2).unwrap().to_string(), "17");
    }

    #[test]
    fn reachable_and_paths() {
        let input = load_str(
            r#"
[toolchain]
canonical = "17"
[[module]]
name = ":app"
modules = [":feature"]
[[module]]
name = ":feature"
modules = [":core"]
[[module]]
name = ":core"
"#,
        )
        .unwrap();
        let g = &input.graph;
        let app = ModuleId::from(":app");
        let core = ModuleId::from(":core");
        let reached: Vec<&str> = g.reachable_from(&app).into_iter().map(|m| m.as_str()).collect();
        assert_eq!(reached, vec![":core", ":feature"]);
        let path: Vec<&str> = g.find_path(&app, &core).unwrap().into_iter().map(|m| m.as_str()).collect();
        assert_eq!(path, vec![":app", ":feature", ":core"]);
        assert!(g.find_path(&core, &app).is_none());

        let tree = g.to_string();
        assert!(tree.starts_with(":app\n"));
        assert!(tree.contains("└── :feature"));
        assert!(tree.contains("    └── :core"));
    }
}
