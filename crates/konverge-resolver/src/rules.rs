//! Compiled override rules and most-specific-wins selection.
//!
//! Rules are kept as an explicit, ordered list rather than mutated global
//! state: global `[[override]]` entries first in file order, then each
//! module's `[[module.overrides]]` grouped by owning module identity.

use std::fmt;

use konverge_core::dependency::DependencyId;
use konverge_core::error::DeclarationError;
use konverge_core::module::ModuleId;
use konverge_core::overrides::{ModulePredicate, OverrideDeclaration, Specificity};
use konverge_core::toolchain::ToolchainTarget;

use crate::version::LibraryVersion;

/// What a rule forces.
#[derive(Debug, Clone)]
pub enum RuleAction {
    Dependency {
        id: DependencyId,
        version: LibraryVersion,
    },
    Toolchain(ToolchainTarget),
}

/// A validated override rule.
#[derive(Debug, Clone)]
pub struct OverrideRule {
    /// Position in the ordered rule list.
    pub index: usize,
    /// Position within the declaring list: the file's `[[override]]`
    /// entries, or the owning module's `[[module.overrides]]`.
    pub position: usize,
    pub predicate: ModulePredicate,
    pub action: RuleAction,
    pub additive: bool,
    /// Owning module for module-scoped rules.
    pub scope: Option<ModuleId>,
    pub reason: Option<String>,
}

impl OverrideRule {
    pub fn compile(
        index: usize,
        position: usize,
        decl: &OverrideDeclaration,
        scope: Option<&ModuleId>,
    ) -> Result<Self, DeclarationError> {
        let predicate = ModulePredicate::from_declaration(decl, scope)?;
        let action = match (&decl.dependency, &decl.toolchain) {
            (Some(_), Some(_)) => return Err(DeclarationError::BothActions),
            (None, None) => return Err(DeclarationError::NoAction),
            (Some(dep), None) => {
                let id = DependencyId::parse(dep)?;
                let version = decl
                    .version
                    .as_deref()
                    .ok_or_else(|| DeclarationError::MissingVersion(id.clone()))?;
                RuleAction::Dependency {
                    version: LibraryVersion::parse(version)?,
                    id,
                }
            }
            (None, Some(target)) => {
                if decl.version.is_some() {
                    return Err(DeclarationError::StrayVersion);
                }
                if decl.additive {
                    return Err(DeclarationError::AdditiveToolchain);
                }
                RuleAction::Toolchain(target.parse()?)
            }
        };
        Ok(Self {
            index,
            position,
            predicate,
            action,
            additive: decl.additive,
            scope: scope.cloned(),
            reason: decl.reason.clone(),
        })
    }

    pub fn specificity(&self) -> Specificity {
        self.predicate.specificity()
    }

    pub fn targets_dependency(&self, dep: &DependencyId) -> bool {
        matches!(&self.action, RuleAction::Dependency { id, .. } if id == dep)
    }
}

impl fmt::Display for OverrideRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "override #{} ({})", self.position + 1, self.predicate)?;
        if let Some(ref owner) = self.scope {
            write!(f, " in {owner}")?;
        }
        Ok(())
    }
}

/// Outcome of picking the winning override for one target.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<T> {
    /// Nothing applies.
    None,
    Winner { value: T, source: String },
    /// The most specific tier disagrees: `(source, value)` per candidate.
    Conflict(Vec<(String, T)>),
}

/// A candidate value for [`select`].
pub struct Candidate<T> {
    pub specificity: Specificity,
    pub index: usize,
    pub source: String,
    pub value: T,
}

/// Most specific candidate wins. Equal-specificity candidates must agree;
/// when they do, the earliest declaration is reported as the source.
pub fn select<T: PartialEq + Clone>(mut candidates: Vec<Candidate<T>>) -> Selection<T> {
    let Some(top) = candidates.iter().map(|c| c.specificity).max() else {
        return Selection::None;
    };
    candidates.retain(|c| c.specificity == top);
    candidates.sort_by_key(|c| c.index);

    let first = &candidates[0];
    if candidates.iter().all(|c| c.value == first.value) {
        return Selection::Winner {
            value: first.value.clone(),
            source: first.source.clone(),
        };
    }
    Selection::Conflict(
        candidates
            .into_iter()
            .map(|c| (c.source, c.value))
            .collect(),
    )
}

/// The ordered rule list handed to the resolution and enforcement passes.
#[derive(Debug, Clone, Default)]
pub struct OverrideSet {
    rules: Vec<OverrideRule>,
}

impl OverrideSet {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &OverrideRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Additive rules that inject `dep` into `module`.
    pub fn injections<'a>(
        &'a self,
        module: &'a ModuleId,
    ) -> impl Iterator<Item = (&'a OverrideRule, &'a DependencyId, &'a LibraryVersion)> + 'a {
        self.rules.iter().filter_map(move |rule| match &rule.action {
            RuleAction::Dependency { id, version }
                if rule.additive && rule.predicate.matches(module) =>
            {
                Some((rule, id, version))
            }
            _ => None,
        })
    }

    /// Pick the forced version of `dep` for `module`, if any.
    pub fn select_dependency(
        &self,
        dep: &DependencyId,
        module: &ModuleId,
    ) -> Selection<LibraryVersion> {
        let candidates = self
            .rules
            .iter()
            .filter(|rule| !rule.additive && rule.predicate.matches(module))
            .filter_map(|rule| match &rule.action {
                RuleAction::Dependency { id, version } if id == dep => Some(Candidate {
                    specificity: rule.specificity(),
                    index: rule.index,
                    source: rule.to_string(),
                    value: version.clone(),
                }),
                _ => None,
            })
            .collect();
        select(candidates)
    }

    /// Pick the explicit toolchain target for `module`. The module's own
    /// `toolchain` field counts as an exact-match rule declared first.
    pub fn select_toolchain(
        &self,
        module: &ModuleId,
        own: Option<&ToolchainTarget>,
    ) -> Selection<ToolchainTarget> {
        let mut candidates: Vec<Candidate<ToolchainTarget>> = own
            .map(|target| Candidate {
                specificity: Specificity::Exact,
                index: 0,
                source: format!("toolchain field of {module}"),
                value: target.clone(),
            })
            .into_iter()
            .collect();
        candidates.extend(self.rules.iter().filter_map(|rule| match &rule.action {
            RuleAction::Toolchain(target) if rule.predicate.matches(module) => Some(Candidate {
                specificity: rule.specificity(),
                // Offset so the module's own field sorts first.
                index: rule.index + 1,
                source: rule.to_string(),
                value: target.clone(),
            }),
            _ => None,
        }));
        select(candidates)
    }
}
