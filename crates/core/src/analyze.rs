//! Semantic analysis: cross-check invocations and block types against the
//! canon.
//!
//! Both checks are exhaustive. Every violation in the ritual is collected
//! before failing, so a single run reports everything that needs fixing.

use crate::canon::{CanonLocation, CanonRules};
use crate::error::{RitualError, Violation, ViolationKind};
use crate::lexer::{Token, TokenKind};
use crate::parser::{ParseBlock, ParseTree};
use crate::source::SourceProvider;
use std::path::Path;
use std::sync::Arc;

/// `::school:operation`, viewed from its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub school: &'a str,
    pub operation: &'a str,
    pub line: u32,
    pub column: u32,
}

impl<'a> Invocation<'a> {
    /// `None` unless `token` is a well-formed school invocation.
    pub fn from_token(token: &'a Token) -> Option<Self> {
        if token.kind != TokenKind::SchoolInvocation {
            return None;
        }
        let (school, operation) = token.text.strip_prefix("::")?.split_once(':')?;
        Some(Invocation {
            school,
            operation,
            line: token.line,
            column: token.column,
        })
    }
}

/// All invocations in a token stream, in source order.
pub fn invocations(tokens: &[Token]) -> impl Iterator<Item = Invocation<'_>> {
    tokens.iter().filter_map(Invocation::from_token)
}

/// Normalized block type for a parser kind: `python_block` -> `PYTHON`.
pub fn block_type_of(kind: &str) -> String {
    kind.strip_suffix("_block").unwrap_or(kind).to_uppercase()
}

/// First failing check for one invocation, if any.
pub fn check_invocation(rules: &CanonRules, inv: &Invocation<'_>) -> Option<Violation> {
    let at = Some((inv.line, inv.column));
    if !rules.has_school(inv.school) {
        return Some(Violation::new(
            ViolationKind::UnknownSchool,
            at,
            format!(
                "School '{}' not found in canon ({} valid schools)",
                inv.school,
                rules.schools().len()
            ),
        ));
    }
    if !rules.has_operation(inv.operation) {
        return Some(Violation::new(
            ViolationKind::UnknownOperation,
            at,
            format!("Operation '{}' not found in canon", inv.operation),
        ));
    }
    if let Some(allowed) = rules.operations_for(inv.school) {
        if !allowed.contains(&inv.operation.to_lowercase()) {
            return Some(Violation::new(
                ViolationKind::OperationNotInSchool,
                at,
                format!(
                    "School '{}' does not support operation '{}' (valid: {})",
                    inv.school,
                    inv.operation,
                    allowed.iter().cloned().collect::<Vec<_>>().join(", ")
                ),
            ));
        }
    }
    None
}

pub fn check_block(rules: &CanonRules, block: &ParseBlock) -> Option<Violation> {
    let block_type = block_type_of(&block.kind);
    if rules.accepts_block_type(&block_type) {
        return None;
    }
    Some(Violation::new(
        ViolationKind::UnknownBlockType,
        Some((block.line, block.column)),
        format!(
            "Block type '{}' not recognized by runtime (valid: {})",
            block_type,
            rules
                .block_types()
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        ),
    ))
}

/// Every violation in the ritual: invocations first, then blocks.
pub fn collect_violations(rules: &CanonRules, tree: &ParseTree, tokens: &[Token]) -> Vec<Violation> {
    let mut violations: Vec<Violation> = invocations(tokens)
        .filter_map(|inv| check_invocation(rules, &inv))
        .collect();
    violations.extend(tree.blocks.iter().filter_map(|b| check_block(rules, b)));
    violations
}

/// Validates parse trees against an optional canon. Without a canon the
/// analyzer passes trees through unchanged.
#[derive(Debug, Clone, Default)]
pub struct SemanticAnalyzer {
    canon: Option<Arc<CanonRules>>,
}

impl SemanticAnalyzer {
    pub fn new(canon: Option<Arc<CanonRules>>) -> Self {
        SemanticAnalyzer { canon }
    }

    pub fn with_rules(rules: CanonRules) -> Self {
        Self::new(Some(Arc::new(rules)))
    }

    /// Load the canon at `path`. A missing file yields a pass-through
    /// analyzer and a warning; a malformed one is an error.
    pub fn from_canon_path(
        path: &Path,
        provider: &dyn SourceProvider,
    ) -> Result<Self, RitualError> {
        Self::from_location(&CanonLocation::File(path.to_path_buf()), provider)
    }

    pub fn from_location(
        location: &CanonLocation,
        provider: &dyn SourceProvider,
    ) -> Result<Self, RitualError> {
        let canon = location.load(provider)?;
        if canon.is_none() {
            tracing::warn!(
                path = %location,
                "canon rules not found; semantic validation disabled"
            );
        }
        Ok(Self::new(canon.map(Arc::new)))
    }

    pub fn canon(&self) -> Option<&CanonRules> {
        self.canon.as_deref()
    }

    pub fn analyze(&self, tree: ParseTree, tokens: &[Token]) -> Result<ParseTree, RitualError> {
        let Some(rules) = self.canon.as_deref() else {
            tracing::debug!("no canon rules loaded; skipping semantic checks");
            return Ok(tree);
        };

        let violations = collect_violations(rules, &tree, tokens);
        if !violations.is_empty() {
            tracing::debug!(count = violations.len(), "constitutional violations");
            return Err(RitualError::Constitutional(violations));
        }
        Ok(tree)
    }
}

/// One-shot form of [`SemanticAnalyzer::analyze`].
pub fn analyze(
    tree: ParseTree,
    tokens: &[Token],
    canon: Option<&CanonRules>,
) -> Result<ParseTree, RitualError> {
    SemanticAnalyzer::new(canon.map(|c| Arc::new(c.clone()))).analyze(tree, tokens)
}
