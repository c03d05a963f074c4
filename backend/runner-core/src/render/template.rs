//! Fixed pieces of the generated document.

use std::fmt::Write;

pub const PYSCRIPT_RELEASES_URL: &str = "https://pyscript.net/releases";
pub const BOOTSTRAP_CSS_URL: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css";
pub const VALUES_ELEMENT_ID: &str = "pys-values";
pub const LOADING_DIALOG_ID: &str = "loading";

const INDENT: &str = "    ";

/// Everything the skeleton needs, already validated.
pub(crate) struct Parts<'a> {
    pub version: &'a str,
    pub viewport: &'a str,
    pub background: &'a str,
    pub script_type: &'static str,
    pub config_element: &'static str,
    pub ready_event: &'static str,
    pub stylesheets: &'a [String],
    pub style: Option<&'a str>,
    pub script_sources: &'a [String],
    pub loader_extra: Option<&'a str>,
    pub config: Option<&'a str>,
    pub values: Option<&'a str>,
    pub script: &'a str,
}

pub(crate) fn assemble(parts: &Parts<'_>) -> String {
    let mut html = String::with_capacity(2048 + parts.script.len());
    let runtime = format!("{PYSCRIPT_RELEASES_URL}/{}", parts.version);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    line(&mut html, 1, r#"<meta charset="UTF-8" />"#);
    line(
        &mut html,
        1,
        &format!(r#"<meta name="viewport" content="{}" />"#, escape_attr(parts.viewport)),
    );
    line(
        &mut html,
        1,
        &format!(
            r#"<link rel="stylesheet" href="{BOOTSTRAP_CSS_URL}" crossorigin="anonymous" />"#
        ),
    );
    line(
        &mut html,
        1,
        &format!(r#"<link rel="stylesheet" href="{runtime}/core.css" />"#),
    );
    for href in parts.stylesheets {
        line(
            &mut html,
            1,
            &format!(r#"<link rel="stylesheet" href="{}" />"#, escape_attr(href)),
        );
    }
    if let Some(style) = parts.style {
        line(&mut html, 1, "<style>");
        html.push_str(style);
        html.push('\n');
        line(&mut html, 1, "</style>");
    }
    line(
        &mut html,
        1,
        &format!(r#"<script type="module" src="{runtime}/core.js"></script>"#),
    );
    for src in parts.script_sources {
        line(
            &mut html,
            1,
            &format!(r#"<script src="{}"></script>"#, escape_attr(src)),
        );
    }
    line(&mut html, 1, r#"<script type="module">"#);
    line(
        &mut html,
        2,
        &format!("const loading = document.getElementById('{LOADING_DIALOG_ID}');"),
    );
    line(
        &mut html,
        2,
        &format!("addEventListener('{}', () => loading.close());", parts.ready_event),
    );
    line(&mut html, 2, "loading.showModal();");
    if let Some(extra) = parts.loader_extra {
        html.push_str(extra);
        html.push('\n');
    }
    line(&mut html, 1, "</script>");
    if let Some(config) = parts.config {
        let _ = writeln!(
            html,
            "{INDENT}<{tag}>{config}\n{INDENT}</{tag}>",
            tag = parts.config_element,
            config = escape_script_text(config),
        );
    }
    html.push_str("</head>\n");

    let _ = writeln!(
        html,
        r#"<body style="background:{};">"#,
        escape_attr(parts.background)
    );
    line(
        &mut html,
        1,
        &format!(
            r#"<dialog id="{LOADING_DIALOG_ID}" style="outline:none; border:none; background:transparent;">"#
        ),
    );
    line(&mut html, 2, r#"<div class="spinner-border" role="status"></div>"#);
    line(&mut html, 2, r#"<span class="sr-only">Loading PyScript...</span>"#);
    line(&mut html, 1, "</dialog>");
    if let Some(values) = parts.values {
        line(
            &mut html,
            1,
            &format!(
                r#"<script type="application/json" id="{VALUES_ELEMENT_ID}">{}</script>"#,
                escape_script_text(values)
            ),
        );
    }
    line(
        &mut html,
        1,
        &format!(r#"<script type="{}">"#, parts.script_type),
    );
    html.push_str(parts.script);
    html.push('\n');
    line(&mut html, 1, "</script>");
    html.push_str("</body>\n</html>");

    html
}

fn line(html: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        html.push_str(INDENT);
    }
    html.push_str(text);
    html.push('\n');
}

/// Escape text placed inside a double-quoted attribute.
pub fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Keep embedded JSON from closing its script element early.
pub fn escape_script_text(value: &str) -> String {
    value.replace("</", "<\\/")
}
