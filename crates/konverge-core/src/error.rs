//! Errors raised while interpreting individual declarations.
//!
//! These are value-level problems (a bad version string, a malformed
//! dependency key). The loader collects them into `MalformedDeclaration`
//! diagnostics instead of stopping at the first one.

use thiserror::Error;

use crate::dependency::DependencyId;
use crate::module::ModuleId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("dependency '{0}' is not of the form 'group:artifact'")]
    DependencyKey(String),

    #[error("dependency '{0}' must have a non-empty group and artifact")]
    EmptyCoordinate(String),

    #[error("dependency '{0}' must have exactly one ':' separator")]
    ExtraSeparator(String),

    #[error("dependency '{0}' must declare both 'group' and 'artifact', or neither")]
    PartialCoordinates(String),

    #[error("dependency {id} has no valid version syntax: {source}")]
    Constraint {
        id: DependencyId,
        source: Box<DeclarationError>,
    },

    #[error("empty version")]
    EmptyVersion,

    #[error("'{0}' is not a valid version")]
    InvalidVersion(String),

    #[error("'{0}' has no version segments")]
    NoSegments(String),

    #[error("'{0}' is not a version range")]
    NotARange(String),

    #[error("range '{0}' is not closed with ']' or ')'")]
    UnclosedRange(String),

    #[error("exact range '{0}' must use '[' and ']'")]
    OpenExactRange(String),

    #[error("range '{0}' has more than two bounds")]
    TooManyBounds(String),

    #[error("range '{0}' admits no version")]
    EmptyRange(String),

    #[error("prefix '{0}.+' must end in a numeric segment")]
    NonNumericPrefix(String),

    #[error("prefix '{0}.+' has no upper bound: its last segment is too large")]
    PrefixOverflow(String),

    #[error("invalid toolchain target '{0}'")]
    ToolchainTarget(String),

    #[error("unknown output format '{0}' (expected toml or json)")]
    OutputFormat(String),

    #[error("set at most one of 'module', 'prefix' or 'pattern'")]
    AmbiguousPredicate,

    #[error("invalid module pattern '{pattern}': {reason}")]
    ModulePattern { pattern: String, reason: String },

    #[error("rule declared in module '{0}' may only target '{0}' or its descendants")]
    OutsideScope(ModuleId),

    #[error("set either 'dependency' or 'toolchain', not both")]
    BothActions,

    #[error("must set 'dependency' or 'toolchain'")]
    NoAction,

    #[error("override for {0} is missing 'version'")]
    MissingVersion(DependencyId),

    #[error("'version' is only valid together with 'dependency'")]
    StrayVersion,

    #[error("toolchain overrides cannot be additive")]
    AdditiveToolchain,
}
