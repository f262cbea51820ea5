//! Page templates
//!
//! The site's Tera templates are compiled into the binary from `templates/`.
//! A directory configured as `site.templates_path` may replace any of them:
//! a file there with the same relative name wins over the built-in one, and
//! extra files become available to `{% extends %}` and `{% include %}`.

use rust_embed::RustEmbed;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::TemplateError;

/// Story listing
pub const ALL_NEWS_PAGE: &str = "all-news-page.html";
pub const ADD_USER_PAGE: &str = "add-user-page.html";
pub const EDIT_USER_PAGE: &str = "edit-user-page.html";
pub const ADD_STORY_PAGE: &str = "add-story-page.html";
pub const EDIT_STORY_PAGE: &str = "edit-story-page.html";
pub const PAGE_NOT_FOUND: &str = "page-not-found.html";

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct BuiltinTemplates;

/// Renders the site's pages
pub struct TemplateEngine {
    tera: Tera,
    site_name: String,
}

impl TemplateEngine {
    /// Load the built-in templates, overlaid with any `*.html` files found
    /// under `override_dir`.
    pub fn new(
        site_name: impl Into<String>,
        override_dir: Option<&Path>,
    ) -> Result<Self, TemplateError> {
        let mut templates = builtin_templates()?;

        if let Some(dir) = override_dir {
            if dir.is_dir() {
                let mut overrides = Vec::new();
                collect_templates_from_dir(dir, dir, &mut overrides)?;
                for (name, content) in overrides {
                    tracing::debug!("Template '{}' overridden from {:?}", name, dir);
                    templates.insert(name, content);
                }
            } else {
                tracing::warn!(
                    "Template directory {:?} does not exist, using built-in templates",
                    dir
                );
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates).map_err(|e| TemplateError::Invalid {
            name: "templates".to_string(),
            message: error_chain(&e),
        })?;

        Ok(Self {
            tera,
            site_name: site_name.into(),
        })
    }

    /// Render `template`; `site_name` is always available to it.
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, TemplateError> {
        let mut full_context = context.clone();
        full_context.insert("site_name", &self.site_name);

        self.tera.render(template, &full_context).map_err(|e| {
            TemplateError::Render(format!("Failed to render '{}': {}", template, error_chain(&e)))
        })
    }

    #[cfg(test)]
    fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

fn builtin_templates() -> Result<BTreeMap<String, String>, TemplateError> {
    let mut templates = BTreeMap::new();
    for name in BuiltinTemplates::iter() {
        let Some(file) = BuiltinTemplates::get(&name) else {
            continue;
        };
        let content = String::from_utf8(file.data.into_owned()).map_err(|e| {
            TemplateError::Invalid {
                name: name.to_string(),
                message: e.to_string(),
            }
        })?;
        templates.insert(name.to_string(), content);
    }
    Ok(templates)
}

/// Collect `*.html` files below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), TemplateError> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let Ok(relative_path) = path.strip_prefix(base_path) else {
                continue;
            };
            let name = relative_path.to_string_lossy().replace('\\', "/");
            templates.push((name, fs::read_to_string(&path)?));
        }
    }
    Ok(())
}

fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// Last-resort HTML page used when a template cannot be rendered.
///
/// Both strings are escaped.
pub fn simple_error_page(title: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
        body {{ font-family: sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; }}
        .error-box {{ border-left: 4px solid #c0392b; padding: 12px 20px; background: #fafafa; }}
        h1 {{ color: #c0392b; margin-top: 0; font-size: 1.4em; }}
    </style>
</head>
<body>
    <div class="error-box">
        <h1>{title}</h1>
        <p>{message}</p>
        <p><a href="/index">Back to all stories</a></p>
    </div>
</body>
</html>"#,
        title = tera::escape_html(title),
        message = tera::escape_html(message),
    )
}
