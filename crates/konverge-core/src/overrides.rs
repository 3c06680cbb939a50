//! Override rule declarations and the module predicates they target.

use std::fmt;

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::error::DeclarationError;
use crate::module::ModuleId;

/// An `[[override]]` (or `[[module.overrides]]`) entry as written.
///
/// Exactly one of `dependency` (with `version`) or `toolchain` must be set.
/// At most one of `module`, `prefix` or `pattern` narrows the rule; with
/// none set the rule applies to every module in its scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OverrideDeclaration {
    #[serde(default)]
    pub dependency: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub toolchain: Option<String>,

    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,

    /// Additive dependency rules inject a requirement instead of competing
    /// for the winning override slot.
    #[serde(default)]
    pub additive: bool,

    #[serde(default)]
    pub reason: Option<String>,
}

/// How much of the module space a predicate covers. Ordered from least to
/// most specific; longer path prefixes are more specific than shorter ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Specificity {
    Wildcard,
    Prefix(usize),
    Exact,
}

/// A compiled predicate over module identity.
#[derive(Debug, Clone)]
pub enum ModulePredicate {
    All,
    Exact(ModuleId),
    Prefix(String),
    Pattern { glob: String, matcher: GlobMatcher },
}

impl ModulePredicate {
    /// Build the predicate for a declaration. `scope` is the owning module
    /// for module-scoped rules; it becomes the default prefix.
    pub fn from_declaration(
        decl: &OverrideDeclaration,
        scope: Option<&ModuleId>,
    ) -> Result<Self, DeclarationError> {
        let selected = [&decl.module, &decl.prefix, &decl.pattern]
            .iter()
            .filter(|s| s.is_some())
            .count();
        if selected > 1 {
            return Err(DeclarationError::AmbiguousPredicate);
        }

        let predicate = if let Some(ref module) = decl.module {
            ModulePredicate::Exact(ModuleId::new(module.trim()))
        } else if let Some(ref prefix) = decl.prefix {
            ModulePredicate::Prefix(prefix.trim().to_string())
        } else if let Some(ref pattern) = decl.pattern {
            let glob = Glob::new(pattern.trim())
                .map_err(|e| DeclarationError::ModulePattern {
                    pattern: pattern.clone(),
                    reason: e.kind().to_string(),
                })?;
            ModulePredicate::Pattern {
                glob: pattern.trim().to_string(),
                matcher: glob.compile_matcher(),
            }
        } else if let Some(owner) = scope {
            ModulePredicate::Prefix(owner.as_str().to_string())
        } else {
            ModulePredicate::All
        };

        if let Some(owner) = scope {
            if !predicate.stays_within(owner) {
                return Err(DeclarationError::OutsideScope(owner.clone()));
            }
        }
        Ok(predicate)
    }

    pub fn matches(&self, module: &ModuleId) -> bool {
        match self {
            ModulePredicate::All => true,
            ModulePredicate::Exact(id) => id == module,
            ModulePredicate::Prefix(prefix) => module.is_within(prefix),
            ModulePredicate::Pattern { matcher, .. } => matcher.is_match(module.as_str()),
        }
    }

    pub fn specificity(&self) -> Specificity {
        match self {
            ModulePredicate::All | ModulePredicate::Pattern { .. } => Specificity::Wildcard,
            ModulePredicate::Prefix(prefix) => Specificity::Prefix(prefix.len()),
            ModulePredicate::Exact(_) => Specificity::Exact,
        }
    }

    /// Module-scoped rules must not reach outside their owner's subtree.
    /// Patterns cannot be checked statically, so they are rejected there.
    fn stays_within(&self, owner: &ModuleId) -> bool {
        match self {
            ModulePredicate::All | ModulePredicate::Pattern { .. } => false,
            ModulePredicate::Exact(id) => id.is_within(owner.as_str()),
            ModulePredicate::Prefix(prefix) => ModuleId::new(prefix.as_str()).is_within(owner.as_str()),
        }
    }
}

impl fmt::Display for ModulePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModulePredicate::All => f.write_str("*"),
            ModulePredicate::Exact(id) => write!(f, "module {id}"),
            ModulePredicate::Prefix(prefix) => write!(f, "prefix {prefix}"),
            ModulePredicate::Pattern { glob, .. } => write!(f, "pattern {glob}"),
        }
    }
}
