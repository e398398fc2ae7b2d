//! Placeholder substitution for command templates.
//!
//! A template declares the closed set of keys it uses. `{key}` is replaced by
//! its binding; `${NAME}` belongs to the build engine and is copied through
//! untouched. Substituted values are never rescanned.
//!
//! Rendering fails if the body references an undeclared key, a declared key
//! is unused or unbound, or a binding names a key the template does not
//! declare.

use std::collections::BTreeMap;

use crate::error::{substitution, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    pub body: &'static str,
    pub keys: &'static [&'static str],
}

impl Template {
    pub const fn new(
        name: &'static str,
        body: &'static str,
        keys: &'static [&'static str],
    ) -> Self {
        Self { name, body, keys }
    }

    /// Substitute `bindings` into the body.
    pub fn render(&self, bindings: &[(&str, &str)]) -> Result<String> {
        let mut values: BTreeMap<&str, &str> = BTreeMap::new();
        for &(key, value) in bindings {
            if !self.keys.iter().any(|declared| *declared == key) {
                return Err(substitution(
                    self.name,
                    key,
                    "binding is not a key of this template",
                ));
            }
            if values.insert(key, value).is_some() {
                return Err(substitution(self.name, key, "bound more than once"));
            }
        }
        if let Some(missing) = self.keys.iter().find(|key| !values.contains_key(**key)) {
            return Err(substitution(self.name, missing, "no binding supplied"));
        }

        let mut out = String::with_capacity(self.body.len());
        let mut used: Vec<&str> = Vec::new();
        let mut rest = self.body;

        while let Some(pos) = rest.find(['{', '$']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(var) = tail.strip_prefix("${") {
                // Engine variable: copy `${...}` verbatim.
                let end = var.find('}').map(|i| i + 3).unwrap_or(tail.len());
                out.push_str(&tail[..end]);
                rest = &tail[end..];
                continue;
            }
            if tail.starts_with('$') {
                out.push('$');
                rest = &tail[1..];
                continue;
            }

            let inner = &tail[1..];
            let close = inner
                .find('}')
                .ok_or_else(|| substitution(self.name, inner, "unterminated placeholder"))?;
            let key = &inner[..close];
            let value = values.get(key).ok_or_else(|| {
                substitution(self.name, key, "placeholder is not declared by this template")
            })?;
            out.push_str(value);
            if !used.contains(&key) {
                used.push(key);
            }
            rest = &inner[close + 1..];
        }
        out.push_str(rest);

        if let Some(unused) = self.keys.iter().find(|key| !used.contains(*key)) {
            return Err(substitution(
                self.name,
                unused,
                "declared key never appears in the body",
            ));
        }

        Ok(out)
    }
}
