//! Flat HTML report: metadata table plus the raw body as preformatted text.

use super::ReportMetadata;

const STYLE: &str = "body { font-family: Arial, sans-serif; margin: 40px; }\n\
h1 { color: #2c3e50; border-bottom: 2px solid #3498db; }\n\
h2 { color: #34495e; margin-top: 30px; }\n\
table { border-collapse: collapse; width: 100%; margin: 20px 0; }\n\
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }\n\
th { background-color: #3498db; color: white; }\n\
.metadata { background-color: #f8f9fa; padding: 15px; border-radius: 5px; }\n";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub fn render(title: &str, meta: &ReportMetadata, body: &str) -> String {
    let rows: String = meta
        .rows()
        .iter()
        .map(|(key, value)| format!("<tr><th>{}</th><td>{}</td></tr>\n", key, escape(value)))
        .collect();

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>\n{style}</style>\n</head>\n<body>\n<h1>{title}</h1>\n<div class=\"metadata\">\n<table>\n{rows}</table>\n</div>\n<h2>Content</h2>\n<pre style=\"white-space: pre-wrap;\">{body}</pre>\n</body>\n</html>\n",
        title = escape(title),
        style = STYLE,
        rows = rows,
        body = escape(body),
    )
}
