//! Route pattern compilation.
//!
//! # Responsibilities
//! - Turn `/literal/:param/:param2(regex)` into one anchored regular expression
//! - Collect parameter names in marker order
//! - Reject patterns whose capture groups would not line up with their names
//!
//! # Design Decisions
//! - Literal segments are copied verbatim, so they are regex syntax too
//! - A custom expression runs to the end of its segment; it cannot contain `/`
//! - Index 0 of the name list is a placeholder for capture group 0 (whole match)
//! - The whole path must match: the expression is wrapped in `^(?:...)$` so a
//!   top-level `|` in a custom expression cannot escape the anchors

use regex::Regex;

use crate::error::CompileError;
use crate::routing::Params;

/// Marks a parameter segment.
const PARAM_PREFIX: char = ':';

/// Capture used when a parameter has no custom expression.
///
/// `\w` is Unicode-aware, so letters from any script (CJK included) are
/// accepted alongside ASCII word characters. Whitespace is accepted too;
/// paths are matched as sent, so a percent-encoded space (`%20`) still fails.
pub const DEFAULT_PARAM_EXPR: &str = r"([\w\s]+)";

/// A pattern compiled into a matcher and its parameter names.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: String,
    matcher: Regex,
    param_names: Vec<String>,
    literal_segments: usize,
}

/// Compile a route pattern.
pub fn compile(pattern: &str) -> Result<CompiledPattern, CompileError> {
    let mut param_names = vec![String::new()];
    let mut exprs = Vec::new();
    let mut literal_segments = 0;

    for segment in pattern.split('/') {
        let Some(param) = segment.strip_prefix(PARAM_PREFIX) else {
            if !segment.is_empty() {
                literal_segments += 1;
            }
            exprs.push(segment);
            continue;
        };

        let (name, expr) = match param.find('(') {
            Some(idx) => (&param[..idx], &param[idx..]),
            None => (param, DEFAULT_PARAM_EXPR),
        };

        if name.is_empty() {
            return Err(CompileError::EmptyParamName {
                pattern: pattern.to_string(),
            });
        }
        if param_names.iter().any(|n| n == name) {
            return Err(CompileError::DuplicateParam {
                pattern: pattern.to_string(),
                name: name.to_string(),
            });
        }

        exprs.push(expr);
        param_names.push(name.to_string());
    }

    let source = format!("^(?:{})$", exprs.join("/"));
    let matcher = Regex::new(&source).map_err(|source| CompileError::InvalidExpression {
        pattern: pattern.to_string(),
        source,
    })?;

    if matcher.captures_len() != param_names.len() {
        return Err(CompileError::GroupMismatch {
            pattern: pattern.to_string(),
            expected: param_names.len() - 1,
            found: matcher.captures_len() - 1,
        });
    }

    Ok(CompiledPattern {
        pattern: pattern.to_string(),
        matcher,
        param_names,
        literal_segments,
    })
}

impl CompiledPattern {
    /// The pattern string this was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The anchored expression used for matching.
    pub fn as_regex(&self) -> &Regex {
        &self.matcher
    }

    /// Parameter names in marker order, without the placeholder.
    pub fn param_names(&self) -> &[String] {
        &self.param_names[1..]
    }

    /// Number of non-empty literal segments.
    pub fn literal_segments(&self) -> usize {
        self.literal_segments
    }

    /// Match a request path, binding each capture group to its name.
    ///
    /// Groups that did not participate in the match bind to an empty string.
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let caps = self.matcher.captures(path)?;

        let params = self
            .param_names
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, name)| {
                let value = caps.get(i).map_or("", |m| m.as_str());
                (name.as_str(), value)
            })
            .collect();

        Some(params)
    }
}
