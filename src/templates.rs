//! Embedded HTML templates for directory listings and error pages

use crate::error::AppError;
use crate::utils::encode_path_segment;
use std::collections::HashMap;

const DIRECTORY_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Directory Listing for {{PATH}}</title>
    <base href="{{BASE_HREF}}">
    <style>
        body { font-family: sans-serif; background: #1a1a1a; color: #f1f5f9; margin: 0; padding: 20px; }
        .container { max-width: 960px; margin: 0 auto; padding: 24px; background: #2d2d2d; border-radius: 8px; }
        h1 { color: #ff9800; font-size: 1.4rem; margin-bottom: 16px; word-break: break-all; }
        ul { list-style: none; padding: 0; margin: 0; }
        li { padding: 6px 8px; border-bottom: 1px solid #444; }
        li:hover { background: #3a3a3a; }
        a { color: #93c5fd; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .size { color: #9ca3af; margin-left: 8px; }
        .count { color: #9ca3af; font-size: 0.85rem; margin-top: 12px; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Directory Listing for {{PATH}}</h1>
        <ul>
{{ENTRIES}}
        </ul>
        <p class="count">{{ENTRY_COUNT}} entries</p>
    </div>
</body>
</html>
"#;

const ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Error {{STATUS_CODE}}</title>
    <style>
        body { font-family: sans-serif; background: #1e293b; color: #f1f5f9; text-align: center; padding: 2rem; }
        h1 { font-size: 3rem; margin-bottom: 0.5rem; }
        a { color: #60a5fa; }
    </style>
</head>
<body>
    <h1>{{STATUS_CODE}}</h1>
    <h2>{{STATUS_TEXT}}</h2>
    <p>{{DESCRIPTION}}</p>
    <a href="/">Back to Files</a>
</body>
</html>
"#;

/// One row of a directory listing.
pub enum ListingRow<'a> {
    Directory(&'a str),
    File { name: &'a str, size: u64 },
}

/// Template renderer backed by the templates compiled into the binary
pub struct TemplateEngine {
    templates: HashMap<&'static str, &'static str>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        templates.insert("directory_index", DIRECTORY_INDEX);
        templates.insert("error_page", ERROR_PAGE);
        Self { templates }
    }

    /// Render a template with variables
    pub fn render(
        &self,
        template_name: &str,
        variables: &HashMap<String, String>,
    ) -> Result<String, AppError> {
        let template = self.templates.get(template_name).ok_or_else(|| {
            AppError::InternalServerError(format!("Template '{template_name}' not found"))
        })?;

        // Single pass over {{VARIABLE_NAME}} placeholders; substituted text is never rescanned.
        let mut rendered = String::with_capacity(template.len());
        let mut rest = *template;
        while let Some(open) = rest.find("{{") {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            match after.find("}}") {
                Some(close) => {
                    let key = &after[..close];
                    match variables.get(key) {
                        Some(value) => rendered.push_str(value),
                        None => rendered.push_str(&rest[open..open + close + 4]),
                    }
                    rest = &after[close + 2..];
                }
                None => {
                    rendered.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        rendered.push_str(rest);

        Ok(rendered)
    }

    /// Generate directory listing HTML. Rows are rendered in the order given.
    pub fn render_directory_listing(
        &self,
        path: &str,
        rows: &[ListingRow<'_>],
    ) -> Result<String, AppError> {
        let mut variables = HashMap::new();
        variables.insert("PATH".to_string(), html_escape(path));
        variables.insert("BASE_HREF".to_string(), html_escape(&base_href(path)));
        variables.insert("ENTRY_COUNT".to_string(), rows.len().to_string());

        let mut entries_html = String::new();

        // Add parent directory link if not at root
        if path != "/" && !path.is_empty() {
            entries_html.push_str("            <li><a href=\"../\">../</a></li>\n");
        }

        for row in rows {
            match row {
                ListingRow::Directory(name) => entries_html.push_str(&format!(
                    "            <li><a href=\"{}/\">{}/</a></li>\n",
                    html_escape(&encode_path_segment(name)),
                    html_escape(name)
                )),
                ListingRow::File { name, size } => entries_html.push_str(&format!(
                    "            <li><a href=\"{}\">{}</a><span class=\"size\">({} MB)</span></li>\n",
                    html_escape(&encode_path_segment(name)),
                    html_escape(name),
                    format_mebibytes(*size)
                )),
            }
        }

        variables.insert("ENTRIES".to_string(), entries_html);

        self.render("directory_index", &variables)
    }

    /// Generate error page HTML using template
    pub fn render_error_page(
        &self,
        status_code: u16,
        status_text: &str,
        description: &str,
    ) -> Result<String, AppError> {
        let mut variables = HashMap::new();
        variables.insert("STATUS_CODE".to_string(), status_code.to_string());
        variables.insert("STATUS_TEXT".to_string(), html_escape(status_text));
        variables.insert("DESCRIPTION".to_string(), html_escape(description));

        self.render("error_page", &variables)
    }
}

// Absolute href of the listed directory, always ending in '/', so relative
// entry links work whether or not the request carried a trailing slash.
fn base_href(path: &str) -> String {
    let encoded = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(encode_path_segment)
        .collect::<Vec<_>>();
    if encoded.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", encoded.join("/"))
    }
}

/// File size in mebibytes with one decimal place.
pub fn format_mebibytes(size: u64) -> String {
    format!("{:.1}", size as f64 / (1024.0 * 1024.0))
}

/// Simple HTML entity escaping
pub fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Get human-friendly error descriptions
pub fn get_error_description(status_code: u16) -> &'static str {
    match status_code {
        400 => "The request could not be understood due to malformed syntax.",
        403 => "Access to this resource is forbidden.",
        404 => "The requested file or directory could not be found.",
        405 => "Only GET, HEAD and OPTIONS requests are supported.",
        416 => "None of the requested byte ranges fit the resource.",
        500 => "An internal server error occurred while processing your request.",
        _ => "An unexpected error occurred while processing your request.",
    }
}
