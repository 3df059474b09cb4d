//! Destination resolution and rendering.
//!
//! A destination is either *structured* (encode the decoded mapping in a
//! registered codec format) or a *template* (substitute the mapping into a
//! [tera] template loaded from disk). The decision is made once, at
//! construction, never per write.
//!
//! # Escaping policy
//!
//! Templates are registered under their file name with a trailing `.tera`
//! extension stripped, and tera's default autoescaping applies: output is
//! HTML-escaped when the registered name ends in `.html`, `.htm`, or `.xml`,
//! and left verbatim for any other name. Undefined variables are a
//! deterministic render-time [`RenderError::Template`].

mod error;

use std::path::Path;

use tera::Tera;

use confsync_core::{Format, Mapping, RenderSpec};

pub use error::RenderError;

use crate::error::io_err;

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum RenderMode {
    Structured(Format),
    Template { tera: Tera, name: String },
}

/// Renders decoded mappings into destination text.
///
/// Create once per object with [`Renderer::from_spec`] and reuse; template
/// files are loaded and parsed exactly once.
#[derive(Debug)]
pub struct Renderer {
    mode: RenderMode,
}

impl Renderer {
    /// Resolve a [`RenderSpec`] into a ready renderer, loading and parsing
    /// the template file when the spec names one.
    pub fn from_spec(spec: &RenderSpec) -> Result<Self, RenderError> {
        let mode = match spec {
            RenderSpec::Structured(format) => RenderMode::Structured(*format),
            RenderSpec::Template(path) => {
                let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
                let name = template_name(path);
                let mut tera = Tera::default();
                tera.add_raw_template(&name, &contents)?;
                tracing::debug!(template = %name, path = %path.display(), "loaded template");
                RenderMode::Template { tera, name }
            }
        };
        Ok(Renderer { mode })
    }

    /// Render the mapping to destination text.
    pub fn render(&self, data: &Mapping) -> Result<String, RenderError> {
        match &self.mode {
            RenderMode::Structured(format) => Ok(format.encode(data)?),
            RenderMode::Template { tera, name } => {
                let ctx = tera::Context::from_serialize(serde_json::Value::Object(data.clone()))?;
                Ok(tera.render(name, &ctx)?)
            }
        }
    }

    /// Short human-readable description, e.g. `(format: json)` or
    /// `(template: nginx.conf)`.
    pub fn describe(&self) -> String {
        match &self.mode {
            RenderMode::Structured(format) => format!("(format: {format})"),
            RenderMode::Template { name, .. } => format!("(template: {name})"),
        }
    }
}

/// Template registration name: the file name, with a trailing `.tera`
/// stripped so autoescaping keys off the real target extension.
fn template_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match file_name.strip_suffix(".tera") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => file_name,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use serde_json::{json, Value};
    use tempfile::TempDir;

    use super::*;

    fn mapping(value: Value) -> Mapping {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn structured_mode_encodes_with_the_codec() {
        let renderer =
            Renderer::from_spec(&RenderSpec::Structured(Format::Json)).expect("resolve");
        let out = renderer.render(&mapping(json!({"k": 1}))).expect("render");
        let parsed: Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(parsed, json!({"k": 1}));
    }

    #[test]
    fn template_mode_substitutes_variables() {
        let dir = TempDir::new().expect("tempdir");
        let template = dir.path().join("value.txt.tera");
        fs::write(&template, "{{k}}").expect("write template");

        let renderer = Renderer::from_spec(&RenderSpec::Template(template)).expect("resolve");
        let out = renderer.render(&mapping(json!({"k": 1}))).expect("render");
        assert_eq!(out, "1");
    }

    #[test]
    fn undefined_variable_is_a_render_error() {
        let dir = TempDir::new().expect("tempdir");
        let template = dir.path().join("broken.txt.tera");
        fs::write(&template, "{{missing}}").expect("write template");

        let renderer = Renderer::from_spec(&RenderSpec::Template(template)).expect("resolve");
        let err = renderer.render(&mapping(json!({"k": 1}))).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }

    #[test]
    fn malformed_template_fails_at_load_time() {
        let dir = TempDir::new().expect("tempdir");
        let template = dir.path().join("broken.tera");
        fs::write(&template, "{% if %}").expect("write template");

        let err = Renderer::from_spec(&RenderSpec::Template(template)).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }

    #[test]
    fn missing_template_file_is_io_error() {
        let err =
            Renderer::from_spec(&RenderSpec::Template(PathBuf::from("/nonexistent.tera")))
                .unwrap_err();
        assert!(matches!(err, RenderError::Io { .. }));
    }

    #[test]
    fn html_targets_are_autoescaped_and_text_targets_are_not() {
        let dir = TempDir::new().expect("tempdir");
        let html = dir.path().join("page.html.tera");
        let text = dir.path().join("page.txt.tera");
        fs::write(&html, "{{v}}").expect("write html template");
        fs::write(&text, "{{v}}").expect("write text template");

        let data = mapping(json!({"v": "<b>"}));

        let html_out = Renderer::from_spec(&RenderSpec::Template(html))
            .expect("resolve")
            .render(&data)
            .expect("render");
        assert_eq!(html_out, "&lt;b&gt;");

        let text_out = Renderer::from_spec(&RenderSpec::Template(text))
            .expect("resolve")
            .render(&data)
            .expect("render");
        assert_eq!(text_out, "<b>");
    }

    #[test]
    fn raw_structured_mode_round_trips_content() {
        let renderer = Renderer::from_spec(&RenderSpec::Structured(Format::Raw)).expect("resolve");
        let out = renderer
            .render(&mapping(json!({"content": "verbatim text"})))
            .expect("render");
        assert_eq!(out, "verbatim text");
    }
}
