use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{DeployError, DeployResult};

/// Configuration variables for an app, keyed by variable name.
pub type EnvVarMap = IndexMap<String, String>;

static LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)=(.*)$").expect("static regex"));

/// Parse a newline-delimited `KEY=VALUE` block.
///
/// Lines are trimmed and blank lines skipped. Everything after the
/// first `=` is the value, so values may contain `=` and may be
/// empty. When a key repeats, the last occurrence wins.
///
/// The parse is all-or-nothing: the first malformed line fails the
/// whole block with [`DeployError::EnvVarParse`], naming its index
/// among the non-blank lines.
pub fn parse(input: &str) -> DeployResult<EnvVarMap> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| {
            LINE.captures(line)
                .map(|caps| (caps[1].to_string(), caps[2].to_string()))
                .ok_or_else(|| DeployError::EnvVarParse {
                    line: index,
                    content: line.to_string(),
                })
        })
        .collect()
}
