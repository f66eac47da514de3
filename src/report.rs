//! HTML rendering of query results.

use std::fmt::Write;

use crate::sql::{self, DataSource, QueryDefinition, QueryResult, fmt::format_query};

const BOOTSTRAP_CSS: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0-alpha1/dist/css/bootstrap.min.css";

/// A titled set of query definitions and the database they run against.
#[derive(Clone, Debug)]
pub struct Report {
    pub title: String,
    pub definitions: Vec<QueryDefinition>,
    pub source: DataSource,
}

impl Report {
    /// Run every query of the report.
    pub async fn results(&self) -> Result<Vec<QueryResult>, sql::Error> {
        let results = sql::execute_report(&self.source, &self.definitions).await?;
        tracing::info!(
            queries = self.definitions.len(),
            succeeded = results.len(),
            "report executed"
        );
        Ok(results)
    }

    /// Run every query and render the full page.
    pub async fn render(&self) -> Result<String, sql::Error> {
        let results = self.results().await?;
        Ok(render_page(&self.title, &results))
    }
}

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Render result rows as a striped table with equally wide columns.
pub fn render_table(header: &[String], rows: &[Vec<Option<String>>]) -> String {
    let mut table =
        String::from(r#"<table class="table table-striped" style="width: 100%;"><thead><tr>"#);

    if !header.is_empty() {
        let column_width = 100.0 / header.len() as f64;
        for name in header {
            let _ = write!(
                table,
                r#"<th style="width: {column_width}%; text-align: center;">{}</th>"#,
                escape_html(name)
            );
        }
    }
    table.push_str("</tr></thead><tbody>");

    for row in rows {
        table.push_str("<tr>");
        for cell in row {
            let _ = write!(
                table,
                r#"<td style="text-align: center;">{}</td>"#,
                escape_html(cell.as_deref().unwrap_or("null"))
            );
        }
        table.push_str("</tr>");
    }
    table.push_str("</tbody></table>");

    table
}

/// Render one numbered query block: description, formatted query, and table.
pub fn render_query_block(number: usize, result: &QueryResult) -> String {
    // Entities start with `&` and end with `;`, so escaping first leaves the
    // formatter's word boundaries and line structure intact while its `<b>`
    // markers stay markup.
    let query = format_query(&escape_html(&result.query));
    let description = escape_html(&result.description);
    let table = render_table(&result.header, &result.rows);

    format!(
        r#"
    <div class="row justify-content-center mb-5 mt-5">
        <div class="d-flex justify-content-center align-items-center">
            <div class="text-left" style="width: 100%; font-size: 24px; padding-bottom: 20px;">
                <b><u>Query {number}:</u></b>
                <span style="font-size: 16px; padding-left: 18px;">{description}</span>
            </div>
        </div>
        <div class="row alert alert-dark justify-content-center">
            <div class="col-md-6 d-flex flex-column justify-content-center" style="height: 100%;">
                <div class="container-fluid d-flex justify-content-center align-items-center" style="flex-grow: 1;">
                    <pre style="font-family: inherit; margin: 0; text-align: left;">{query}</pre>
                </div>
            </div>
            <div class="col-md-6">
                <div class="row mb-2">
                    <div class="text-center" style="width: 100%;">
                        <b><u>Output Table:</u></b>
                    </div>
                </div>
                <div class="container-fluid d-flex justify-content-center align-items-center">
                    <div class="alert alert-light" style="width: 100%;">
                        {table}
                    </div>
                </div>
            </div>
        </div>
    </div>
"#
    )
}

/// Render the complete HTML document, numbering blocks from 1.
pub fn render_page(title: &str, results: &[QueryResult]) -> String {
    let title = escape_html(title);
    let blocks: String = results
        .iter()
        .enumerate()
        .map(|(index, result)| render_query_block(index + 1, result))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <link href="{BOOTSTRAP_CSS}" rel="stylesheet">
    <title>{title}</title>
    <style>
        body {{
            background-color: #fff;
            color: #333;
        }}
    </style>
</head>
<body>
    <nav class="navbar navbar-dark navbar-expand-md bg-dark" data-bs-theme="dark">
        <div class="container-fluid">
            <a class="navbar-brand">{title}</a>
        </div>
    </nav>
    <div class="container-fluid d-flex flex-column justify-content-center" style="padding-right: 100px; padding-left: 100px;">
        <div class="query-container">{blocks}</div>
    </div>
</body>
</html>
"#
    )
}
