//! Auto-resolution classifier.
//!
//! Rules are tried in a fixed order; the first that matches wins:
//!
//! 1. [`Rule::Identical`]: both sides are the exact same line sequence.
//! 2. [`Rule::OneSided`]: one side is empty or blank-only, the other is
//!    non-empty; keep the non-empty side.
//! 3. [`Rule::Declarations`]: both sides are only blanks, comments, or
//!    declaration-style lines; concatenate ours then theirs and drop exact
//!    duplicates, first seen wins.
//!
//! Anything else stays unresolved. Every rule is a pure function of the two
//! sides and the [`DeclarationPolicy`].

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::model::ConflictBlock;

// ---------------------------------------------------------------------------
// DeclarationPolicy
// ---------------------------------------------------------------------------

/// Line prefixes treated as order-insensitive declarations.
///
/// Matched against the whitespace-trimmed line. Blank lines always qualify.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclarationPolicy {
    prefixes: Vec<String>,
}

impl DeclarationPolicy {
    /// Build a policy from explicit prefixes. Empty prefixes are ignored.
    #[must_use]
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// The built-in prefix list (scripting-language imports, var/const
    /// declarations, preloads, `@onready` annotations, `#` comments).
    #[must_use]
    pub fn default_prefixes() -> Vec<String> {
        [
            "import ", "from ", "using ", "var ", "const ", "preload(", "@onready", "#",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect()
    }

    /// The configured prefixes.
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// `true` if the line is blank or starts with a declaration prefix.
    #[must_use]
    pub fn is_declaration_line(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.is_empty() || self.prefixes.iter().any(|p| trimmed.starts_with(p.as_str()))
    }

    /// `true` if every line qualifies.
    #[must_use]
    pub fn is_declaration_block(&self, lines: &[String]) -> bool {
        lines.iter().all(|l| self.is_declaration_line(l))
    }
}

impl Default for DeclarationPolicy {
    fn default() -> Self {
        Self::new(Self::default_prefixes())
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Which rule produced a resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Both sides identical.
    Identical,
    /// Only one side has content.
    OneSided,
    /// Both sides are declaration blocks; merged and deduplicated.
    Declarations,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identical => write!(f, "identical"),
            Self::OneSided => write!(f, "one-sided addition"),
            Self::Declarations => write!(f, "declaration merge"),
        }
    }
}

/// A successful classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    /// The rule that matched.
    pub rule: Rule,
    /// The chosen final lines.
    pub lines: Vec<String>,
}

type RuleFn = fn(&DeclarationPolicy, &[String], &[String]) -> Option<Vec<String>>;

/// Priority-ordered rule table.
const RULES: [(Rule, RuleFn); 3] = [
    (Rule::Identical, identical as RuleFn),
    (Rule::OneSided, one_sided as RuleFn),
    (Rule::Declarations, declarations as RuleFn),
];

fn identical(_: &DeclarationPolicy, ours: &[String], theirs: &[String]) -> Option<Vec<String>> {
    (ours == theirs).then(|| ours.to_vec())
}

fn is_blank(lines: &[String]) -> bool {
    lines.iter().all(|l| l.trim().is_empty())
}

fn one_sided(_: &DeclarationPolicy, ours: &[String], theirs: &[String]) -> Option<Vec<String>> {
    if is_blank(ours) && !theirs.is_empty() {
        Some(theirs.to_vec())
    } else if is_blank(theirs) && !ours.is_empty() {
        Some(ours.to_vec())
    } else {
        None
    }
}

fn declarations(
    policy: &DeclarationPolicy,
    ours: &[String],
    theirs: &[String],
) -> Option<Vec<String>> {
    if !(policy.is_declaration_block(ours) && policy.is_declaration_block(theirs)) {
        return None;
    }
    let mut seen = HashSet::new();
    Some(
        ours.iter()
            .chain(theirs)
            .filter(|line| seen.insert(line.as_str()))
            .cloned()
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Decides whether a conflict block has a safe automatic resolution.
#[derive(Clone, Debug, Default)]
pub struct Classifier {
    policy: DeclarationPolicy,
}

impl Classifier {
    /// A classifier using the given declaration policy.
    #[must_use]
    pub const fn new(policy: DeclarationPolicy) -> Self {
        Self { policy }
    }

    /// Classify one pair of sides. `None` means leave it for a human.
    #[must_use]
    pub fn classify(&self, ours: &[String], theirs: &[String]) -> Option<Classification> {
        RULES.iter().find_map(|(rule, apply)| {
            apply(&self.policy, ours, theirs).map(|lines| Classification { rule: *rule, lines })
        })
    }

    /// Classify a block and record the resolution on it when one exists.
    pub fn resolve_block(&self, block: &mut ConflictBlock) -> Option<Rule> {
        let classification = self.classify(&block.ours, &block.theirs)?;
        block.resolve(classification.lines);
        Some(classification.rule)
    }
}
