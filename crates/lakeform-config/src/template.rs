//! Placeholder templating against accumulated resource outputs.
//!
//! Supports placeholders like:
//! - `${storage.account_name}` - an output captured from resource `storage`
//! - `${run.id}` - the current run ID
//! - `${timestamp}` - Unix timestamp
//! - `${date}` - ISO date (YYYY-MM-DD)
//! - `${datetime}` - ISO datetime
//!
//! Rendering is strict: an unresolvable placeholder is an error, never left
//! in place. A payload with a stray `${...}` reaching the data plane would
//! fail in a far less diagnosable way.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

// Regex for matching ${...} placeholders
static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_-]*(?:\.[a-zA-Z_][a-zA-Z0-9_-]*)?)\}").unwrap()
});

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unresolved placeholder '${{{0}}}'")]
    UnresolvedPlaceholder(String),
}

/// Resolution context for placeholder rendering: the outputs accumulated so
/// far (keys namespaced `node.key`) plus a few built-ins.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// The current run ID, as text.
    pub run_id: String,
    outputs: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            outputs: BTreeMap::new(),
        }
    }

    /// Record an output value under a namespaced key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.outputs.insert(key.into(), value.into());
    }

    /// Whether a namespaced output key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.outputs.contains_key(key)
    }

    /// The accumulated outputs.
    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    /// Resolve a placeholder name to its value.
    fn resolve(&self, name: &str) -> Option<String> {
        match name {
            "run.id" => Some(self.run_id.clone()),
            "timestamp" => Some(chrono::Utc::now().timestamp().to_string()),
            "date" => Some(chrono::Utc::now().format("%Y-%m-%d").to_string()),
            "datetime" => Some(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            _ => self.outputs.get(name).cloned(),
        }
    }

    /// Render all placeholders in `input`. Strict: the first unresolvable
    /// placeholder fails the render.
    pub fn render(&self, input: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(input.len());
        let mut last = 0;
        for m in VAR_REGEX.find_iter(input) {
            // Strip the surrounding "${" and "}" to get the placeholder name.
            let name = &input[m.start() + 2..m.end() - 1];
            let value = self
                .resolve(name)
                .ok_or_else(|| TemplateError::UnresolvedPlaceholder(name.to_string()))?;
            out.push_str(&input[last..m.start()]);
            out.push_str(&value);
            last = m.end();
        }
        out.push_str(&input[last..]);
        Ok(out)
    }

    /// Render every value in a map, keeping keys as-is.
    pub fn render_map(
        &self,
        map: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, TemplateError> {
        map.iter()
            .map(|(k, v)| Ok((k.clone(), self.render(v)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(pairs: &[(&str, &str)]) -> TemplateContext {
        let mut ctx = TemplateContext::new("run-1");
        for (k, v) in pairs {
            ctx.insert(*k, *v);
        }
        ctx
    }

    #[test]
    fn test_basic_render() {
        let ctx = ctx_with(&[("storage.account_name", "lakedata01")]);
        let result = ctx.render("account: ${storage.account_name}").unwrap();
        assert_eq!(result, "account: lakedata01");
    }

    #[test]
    fn test_multiple_placeholders() {
        let ctx = ctx_with(&[
            ("storage.dfs_endpoint", "https://lake.dfs.example.net"),
            ("identity.principal_id", "abc-123"),
        ]);
        let result = ctx
            .render("${identity.principal_id} -> ${storage.dfs_endpoint}")
            .unwrap();
        assert_eq!(result, "abc-123 -> https://lake.dfs.example.net");
    }

    #[test]
    fn test_unresolved_placeholder_is_error() {
        let ctx = ctx_with(&[]);
        let err = ctx.render("endpoint: ${storage.dfs_endpoint}").unwrap_err();
        let TemplateError::UnresolvedPlaceholder(name) = err;
        assert_eq!(name, "storage.dfs_endpoint");
    }

    #[test]
    fn test_run_id_builtin() {
        let ctx = TemplateContext::new("0192-abc");
        assert_eq!(ctx.render("run ${run.id}").unwrap(), "run 0192-abc");
    }

    #[test]
    fn test_nested_braces_in_json() {
        let ctx = ctx_with(&[("storage.account_name", "lakedata01")]);
        let result = ctx
            .render(r#"{"account": "${storage.account_name}"}"#)
            .unwrap();
        assert_eq!(result, r#"{"account": "lakedata01"}"#);
    }

    #[test]
    fn test_text_without_placeholders_passes_through() {
        let ctx = ctx_with(&[]);
        let input = "CREATE DATABASE analytics;";
        assert_eq!(ctx.render(input).unwrap(), input);
    }

    #[test]
    fn test_render_map() {
        let ctx = ctx_with(&[("storage.account_name", "lakedata01")]);
        let mut params = BTreeMap::new();
        params.insert("account".to_string(), "${storage.account_name}".to_string());
        params.insert("location".to_string(), "eastus2".to_string());

        let rendered = ctx.render_map(&params).unwrap();
        assert_eq!(rendered["account"], "lakedata01");
        assert_eq!(rendered["location"], "eastus2");
    }

    #[test]
    fn test_date_builtin_shape() {
        let ctx = TemplateContext::new("run-1");
        let result = ctx.render("${date}").unwrap();
        assert_eq!(result.len(), 10);
        assert_eq!(result.as_bytes()[4], b'-');
    }
}
