//! Operation: display the module graph.

use std::path::{Path, PathBuf};

use konverge_core::dependency::DependencyId;
use konverge_core::module::ModuleId;
use konverge_resolver::graph::{self, LoadedInput, ModuleNode};
use konverge_resolver::resolver::{self, Resolution};
use konverge_resolver::toolchain::{self, Enforcement};
use konverge_util::errors::KonvergeError;

use crate::ops_setup;

/// Options for `konverge tree`.
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    pub manifest_path: Option<PathBuf>,
    /// Show how a module is reached, or which modules require a dependency.
    pub why: Option<String>,
    /// List resolved dependency versions after each module.
    pub dependencies: bool,
}

/// Render the module tree (or the `--why` answer) for the project.
pub fn tree(cwd: &Path, opts: &TreeOptions) -> miette::Result<String> {
    let project = ops_setup::load_project(cwd, opts.manifest_path.as_deref())?;
    let input = graph::load(&project.manifest).map_err(|report| {
        eprint!("{report}");
        KonvergeError::Reconcile {
            message: format!("{} error(s) while loading", report.len()),
        }
    })?;

    let resolution = resolver::resolve(&input).ok();
    let enforcement = resolution
        .as_ref()
        .and_then(|r| toolchain::enforce(&input, r).ok());
    if enforcement.is_none() {
        konverge_util::progress::status_warn(
            "Warning",
            "project does not reconcile; showing declared values (run `konverge check`)",
        );
    }

    let rendered = match opts.why {
        Some(ref target) => why(&input, resolution.as_ref(), target),
        None => input.graph.render_tree(|node| {
            annotate(
                node,
                &input,
                resolution.as_ref(),
                enforcement.as_ref(),
                opts.dependencies,
            )
        }),
    };
    Ok(rendered)
}

fn annotate(
    node: &ModuleNode,
    input: &LoadedInput,
    resolution: Option<&Resolution>,
    enforcement: Option<&Enforcement>,
    dependencies: bool,
) -> String {
    let target = enforcement
        .and_then(|e| e.target_of(&node.id))
        .or(node.toolchain.as_ref())
        .unwrap_or(&input.canonical);
    let mut line = format!(" (toolchain {target})");
    if dependencies {
        let deps: Vec<String> = match resolution {
            Some(r) => r
                .dependencies_of(&node.id)
                .map(|(dep, v)| format!("{dep}:{}", v.version))
                .collect(),
            None => node
                .requirements
                .iter()
                .map(|(dep, req)| format!("{dep} {}", req.constraint))
                .collect(),
        };
        if !deps.is_empty() {
            line.push_str(&format!(" [{}]", deps.join(", ")));
        }
    }
    line
}

fn why(input: &LoadedInput, resolution: Option<&Resolution>, target: &str) -> String {
    let graph = &input.graph;
    let module = ModuleId::new(target);
    if graph.contains(&module) {
        let mut out = String::new();
        for root in graph.roots() {
            if let Some(path) = graph.find_path(root, &module) {
                out.push_str(&format!("Path to {module}:\n"));
                for (i, id) in path.iter().enumerate() {
                    out.push_str(&format!("{}{id}\n", "  ".repeat(i)));
                }
            }
        }
        return out;
    }

    let Ok(dep) = DependencyId::parse(target) else {
        return format!("'{target}' is neither a module nor a dependency.\n");
    };
    let mut out = String::new();
    for node in graph.modules() {
        let declared = node.requirements.get(&dep);
        let resolved = resolution.and_then(|r| r.version_of(&node.id, &dep));
        if declared.is_none() && resolved.is_none() {
            continue;
        }
        out.push_str(&node.id.to_string());
        if let Some(req) = declared {
            out.push_str(&format!(" requires {}", req.constraint));
        }
        if let Some(v) = resolved {
            out.push_str(&format!(" -> {}", v.version));
            if let Some(ref source) = v.forced_by {
                out.push_str(&format!(" (forced by {source})"));
            }
        }
        out.push('\n');
    }
    if out.is_empty() {
        out = format!("Dependency '{dep}' is not used by any module.\n");
    }
    out
}
