//! Library version parsing, ordering, ranges and constraints.
//!
//! Versions use Maven ordering rather than semver:
//! - Segments are split on `.` and `-`
//! - Numeric segments compare as numbers
//! - String qualifiers have a special ordering:
//!   `alpha` < `beta` < `milestone` < `rc` < `snapshot` < `""` (release) < `sp`
//! - Trailing zero segments are insignificant (`1.0` == `1.0.0`)
//!
//! A constraint is one of: an exact pin (`1.2.0`), a Maven range
//! (`[1.0,2.0)`), a prefix (`1.+`) or "any" (`+` / `latest`). Every
//! constraint maps onto a [`VersionRange`], which is what intersection
//! works on.

use std::cmp::Ordering;
use std::fmt;

use konverge_core::error::DeclarationError;

/// A parsed library version with comparable segments.
#[derive(Debug, Clone)]
pub struct LibraryVersion {
    original: String,
    segments: Vec<Segment>,
}

impl PartialEq for LibraryVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LibraryVersion {}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Qualifier(QualifierKind),
    Text(String),
}

/// Well-known qualifiers with defined ordering.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
enum QualifierKind {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

const RESERVED: &[char] = &['[', ']', '(', ')', ',', '+', '*', '=', '<', '>'];

impl LibraryVersion {
    /// Parse a concrete version. Range and dynamic syntax is rejected.
    pub fn parse(version: &str) -> Result<Self, DeclarationError> {
        let v = version.trim();
        if v.is_empty() {
            return Err(DeclarationError::EmptyVersion);
        }
        if v.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c)) {
            return Err(DeclarationError::InvalidVersion(v.to_string()));
        }
        let segments = parse_segments(v);
        if segments.is_empty() {
            return Err(DeclarationError::NoSegments(v.to_string()));
        }
        Ok(Self {
            original: v.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for LibraryVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let ord = compare_segments(self.segments.get(i), other.segments.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for LibraryVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

fn compare_segment_to_empty(seg: &Segment) -> Ordering {
    match seg {
        Segment::Numeric(0) => Ordering::Equal,
        Segment::Numeric(_) => Ordering::Greater,
        Segment::Qualifier(q) => q.cmp(&QualifierKind::Release),
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Qualifier(a), Segment::Qualifier(b)) => a.cmp(b),
        (Segment::Numeric(_), _) => Ordering::Greater,
        (_, Segment::Numeric(_)) => Ordering::Less,
        (Segment::Text(a), Segment::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Segment::Qualifier(q), Segment::Text(_)) => {
            if *q >= QualifierKind::Release {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Segment::Text(_), Segment::Qualifier(q)) => {
            if *q >= QualifierKind::Release {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

fn parse_segments(version: &str) -> Vec<Segment> {
    version
        .split(['.', '-'])
        .filter(|token| !token.is_empty())
        .map(classify)
        .collect()
}

fn classify(token: &str) -> Segment {
    if let Ok(n) = token.parse::<u64>() {
        return Segment::Numeric(n);
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Segment::Qualifier(QualifierKind::Alpha),
        "beta" | "b" => Segment::Qualifier(QualifierKind::Beta),
        "milestone" | "m" => Segment::Qualifier(QualifierKind::Milestone),
        "rc" | "cr" => Segment::Qualifier(QualifierKind::Rc),
        "snapshot" => Segment::Qualifier(QualifierKind::Snapshot),
        "ga" | "final" | "release" => Segment::Qualifier(QualifierKind::Release),
        "sp" => Segment::Qualifier(QualifierKind::Sp),
        _ => Segment::Text(token.to_string()),
    }
}

/// One end of a [`VersionRange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: LibraryVersion,
    pub inclusive: bool,
}

/// A version interval. `None` on either side means unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl VersionRange {
    /// The unbounded range.
    pub fn any() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    pub fn exact(version: LibraryVersion) -> Self {
        Self {
            lower: Some(Bound {
                version: version.clone(),
                inclusive: true,
            }),
            upper: Some(Bound {
                version,
                inclusive: true,
            }),
        }
    }

    /// Parse Maven range syntax: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.0]`.
    pub fn parse(spec: &str) -> Result<Self, DeclarationError> {
        let s = spec.trim();
        let open_inclusive = match s.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(DeclarationError::NotARange(s.to_string())),
        };
        let close_inclusive = match s.chars().last() {
            Some(']') => true,
            Some(')') if s.len() > 1 => false,
            _ => return Err(DeclarationError::UnclosedRange(s.to_string())),
        };
        let inner = &s[1..s.len() - 1];

        let Some((lower, upper)) = inner.split_once(',') else {
            if !open_inclusive || !close_inclusive {
                return Err(DeclarationError::OpenExactRange(s.to_string()));
            }
            return Ok(Self::exact(LibraryVersion::parse(inner)?));
        };
        if upper.contains(',') {
            return Err(DeclarationError::TooManyBounds(s.to_string()));
        }

        let parse_bound = |text: &str, inclusive: bool| -> Result<Option<Bound>, DeclarationError> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            Ok(Some(Bound {
                version: LibraryVersion::parse(text)?,
                inclusive,
            }))
        };
        let range = Self {
            lower: parse_bound(lower, open_inclusive)?,
            upper: parse_bound(upper, close_inclusive)?,
        };
        if range.is_empty() {
            return Err(DeclarationError::EmptyRange(s.to_string()));
        }
        Ok(range)
    }

    /// Check if a version satisfies this range.
    pub fn contains(&self, version: &LibraryVersion) -> bool {
        if let Some(ref lower) = self.lower {
            match version.cmp(&lower.version) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(ref upper) = self.upper {
            match version.cmp(&upper.version) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }

    /// The overlap of two ranges. The result may be empty; check with
    /// [`VersionRange::is_empty`].
    pub fn intersect(&self, other: &VersionRange) -> VersionRange {
        let lower = match (&self.lower, &other.lower) {
            (None, b) => b.clone(),
            (a, None) => a.clone(),
            (Some(a), Some(b)) => Some(match a.version.cmp(&b.version) {
                Ordering::Greater => a.clone(),
                Ordering::Less => b.clone(),
                Ordering::Equal => Bound {
                    version: a.version.clone(),
                    inclusive: a.inclusive && b.inclusive,
                },
            }),
        };
        let upper = match (&self.upper, &other.upper) {
            (None, b) => b.clone(),
            (a, None) => a.clone(),
            (Some(a), Some(b)) => Some(match a.version.cmp(&b.version) {
                Ordering::Less => a.clone(),
                Ordering::Greater => b.clone(),
                Ordering::Equal => Bound {
                    version: a.version.clone(),
                    inclusive: a.inclusive && b.inclusive,
                },
            }),
        };
        VersionRange { lower, upper }
    }

    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) => match lower.version.cmp(&upper.version) {
                Ordering::Greater => true,
                Ordering::Equal => !(lower.inclusive && upper.inclusive),
                Ordering::Less => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(lower), Some(upper)) = (&self.lower, &self.upper) {
            if lower.inclusive && upper.inclusive && lower.version == upper.version {
                return write!(f, "[{}]", lower.version);
            }
        }
        match &self.lower {
            Some(b) => write!(f, "{}{}", if b.inclusive { '[' } else { '(' }, b.version)?,
            None => f.write_str("(")?,
        }
        f.write_str(",")?;
        match &self.upper {
            Some(b) => write!(f, "{}{}", b.version, if b.inclusive { ']' } else { ')' }),
            None => f.write_str(")"),
        }
    }
}

/// A declared version requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// A bare version: strict pin.
    Exact(LibraryVersion),
    Range(VersionRange),
    /// `1.2.+`: any version starting with the prefix.
    Prefix { prefix: LibraryVersion, range: VersionRange },
    /// `+` or `latest`: any version.
    Latest,
}

impl VersionConstraint {
    pub fn parse(spec: &str) -> Result<Self, DeclarationError> {
        let s = spec.trim();
        if s == "+" || s.eq_ignore_ascii_case("latest") {
            return Ok(VersionConstraint::Latest);
        }
        if s.starts_with('[') || s.starts_with('(') {
            return VersionRange::parse(s).map(VersionConstraint::Range);
        }
        if let Some(prefix) = s.strip_suffix(".+") {
            return prefix_constraint(prefix);
        }
        LibraryVersion::parse(s).map(VersionConstraint::Exact)
    }

    /// The interval of versions this constraint admits.
    pub fn range(&self) -> VersionRange {
        match self {
            VersionConstraint::Exact(v) => VersionRange::exact(v.clone()),
            VersionConstraint::Range(r) => r.clone(),
            VersionConstraint::Prefix { range, .. } => range.clone(),
            VersionConstraint::Latest => VersionRange::any(),
        }
    }

    /// Concrete versions named by the constraint itself: the pin, or the
    /// inclusive bounds of a range or prefix.
    pub fn named_versions(&self) -> Vec<LibraryVersion> {
        match self {
            VersionConstraint::Exact(v) => vec![v.clone()],
            VersionConstraint::Range(range) | VersionConstraint::Prefix { range, .. } => [
                range.lower.as_ref(),
                range.upper.as_ref(),
            ]
            .into_iter()
            .flatten()
            .filter(|b| b.inclusive)
            .map(|b| b.version.clone())
            .collect(),
            VersionConstraint::Latest => Vec::new(),
        }
    }
}

/// `1.2` (from `1.2.+`) becomes `[1.2,1.3)`.
fn prefix_constraint(prefix: &str) -> Result<VersionConstraint, DeclarationError> {
    let lower = LibraryVersion::parse(prefix)?;
    let (head, last) = match prefix.rfind(['.', '-']) {
        Some(idx) => (&prefix[..=idx], &prefix[idx + 1..]),
        None => ("", prefix),
    };
    let last: u64 = last
        .parse()
        .map_err(|_| DeclarationError::NonNumericPrefix(prefix.to_string()))?;
    let next = last
        .checked_add(1)
        .ok_or_else(|| DeclarationError::PrefixOverflow(prefix.to_string()))?;
    let upper = LibraryVersion::parse(&format!("{head}{next}"))?;
    Ok(VersionConstraint::Prefix {
        prefix: lower.clone(),
        range: VersionRange {
            lower: Some(Bound {
                version: lower,
                inclusive: true,
            }),
            upper: Some(Bound {
                version: upper,
                inclusive: false,
            }),
        },
    })
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Exact(v) => write!(f, "{v}"),
            VersionConstraint::Range(r) => write!(f, "{r}"),
            VersionConstraint::Prefix { prefix, .. } => write!(f, "{prefix}.+"),
            VersionConstraint::Latest => f.write_str("+"),
        }
    }
}
