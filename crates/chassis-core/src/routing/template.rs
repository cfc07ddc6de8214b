//! Text-template routing generator.
//!
//! Regeneration is normalize-then-substitute. Every registered concrete URL
//! (either environment) is first turned back into its `{{NAME}}` token, and
//! then every known token is replaced with the target environment's URL.
//! Because the endpoint registry is bijective, the output depends only on
//! the template and the target, never on which environment produced the
//! input.

use std::path::Path;

use regex::{Captures, Regex};
use tracing::{debug, info, warn};

use super::endpoint::{is_url_continuation, EndpointRegistry};
use super::{write_output, RoutingReport};
use crate::environment::EnvironmentKind;
use crate::error::{ChassisError, Result};

/// Result of rendering a template blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Placeholder names not bound to any endpoint, left as-is.
    pub unmanaged: Vec<String>,
}

/// Generator for `{{NAME}}` templates over an [`EndpointRegistry`].
#[derive(Debug, Clone)]
pub struct TemplateGenerator {
    registry: EndpointRegistry,
    placeholder: Regex,
    /// `(url, token)` pairs, longest URL first.
    reverse: Vec<(String, String)>,
}

impl TemplateGenerator {
    pub fn new(registry: EndpointRegistry) -> Self {
        let mut reverse: Vec<(String, String)> = registry
            .iter()
            .flat_map(|endpoint| {
                EnvironmentKind::ALL
                    .into_iter()
                    .map(move |env| (endpoint.url(env).to_string(), endpoint.token()))
            })
            .collect();
        reverse.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Self {
            registry,
            placeholder: Regex::new(r"\{\{([A-Z][A-Z0-9_]*)\}\}").expect("static regex"),
            reverse,
        }
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Replace every registered concrete URL with its placeholder token.
    ///
    /// Only exact, whole-URL occurrences are replaced: a match preceded by
    /// an alphanumeric or followed by a host/port character
    /// (`https://a.example.org` when `https://a.example` is registered)
    /// is left alone.
    pub fn normalize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        'scan: while i < text.len() {
            let rest = &text[i..];
            for (url, token) in &self.reverse {
                if rest.starts_with(url.as_str()) && is_url_boundary(text, i, i + url.len()) {
                    out.push_str(token);
                    i += url.len();
                    continue 'scan;
                }
            }
            let Some(ch) = rest.chars().next() else {
                break;
            };
            out.push(ch);
            i += ch.len_utf8();
        }
        out
    }

    /// Replace every known placeholder with `env`'s URL.
    ///
    /// Fails when a known token sits where the substituted URL would not be
    /// recognized by [`normalize`](Self::normalize) on the next run
    /// (e.g. `{{ASSETS_URL}}.map`), since that would break idempotence.
    pub fn substitute(&self, text: &str, env: EnvironmentKind) -> Result<Rendered> {
        for m in self.placeholder.find_iter(text) {
            let name = &text[m.start() + 2..m.end() - 2];
            if self.registry.by_placeholder(name).is_some()
                && !is_url_boundary(text, m.start(), m.end())
            {
                return Err(ChassisError::Template(format!(
                    "placeholder {{{{{name}}}}} at byte {} is glued to surrounding text; \
                     its URL could not be recovered on regeneration",
                    m.start()
                )));
            }
        }

        let mut unmanaged = Vec::new();
        let text = self
            .placeholder
            .replace_all(text, |caps: &Captures| match self.registry.by_placeholder(&caps[1]) {
                Some(endpoint) => endpoint.url(env).to_string(),
                None => {
                    unmanaged.push(caps[1].to_string());
                    caps[0].to_string()
                }
            })
            .into_owned();

        unmanaged.sort();
        unmanaged.dedup();
        Ok(Rendered { text, unmanaged })
    }

    /// Normalize then substitute.
    pub fn render(&self, text: &str, env: EnvironmentKind) -> Result<Rendered> {
        self.substitute(&self.normalize(text), env)
    }

    /// Render `source` for `env` and write the result to `output`.
    ///
    /// `source` may be `output` itself (in-place regeneration). JSON outputs
    /// are parsed before writing; an unparsable result is refused and the
    /// existing file is left untouched.
    pub fn regenerate(
        &self,
        source: &Path,
        output: &Path,
        env: EnvironmentKind,
    ) -> Result<RoutingReport> {
        let content = std::fs::read_to_string(source).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ChassisError::Config(format!("template file {} not found", source.display()))
            } else {
                ChassisError::Io(e)
            }
        })?;

        info!(
            source = %source.display(),
            output = %output.display(),
            environment = %env,
            "Generating routing config from template"
        );

        let rendered = self.render(&content, env)?;
        for name in &rendered.unmanaged {
            warn!(placeholder = %name, "Placeholder has no registered endpoint, leaving it untouched");
        }
        for endpoint in self.registry.iter() {
            debug!(placeholder = %endpoint.placeholder, url = %endpoint.url(env), "Substituted");
        }

        if output.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str::<serde_json::Value>(&rendered.text).map_err(|e| {
                ChassisError::Template(format!(
                    "generated {} is not valid JSON: {e}",
                    output.display()
                ))
            })?;
        }

        write_output(output, &rendered.text, env, rendered.unmanaged)
    }
}

/// Whether `text[start..end]` stands alone as a URL: not preceded by an
/// alphanumeric character and not followed by a character that would extend
/// the host or port.
fn is_url_boundary(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric());
    let after_ok = text[end..]
        .chars()
        .next()
        .map_or(true, |c| !is_url_continuation(c));
    before_ok && after_ok
}
