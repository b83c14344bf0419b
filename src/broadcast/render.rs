//! Channel names and post bodies.

use crate::models::Task;

pub const DEFAULT_DEPARTMENT: &str = "Uncategorized";

/// Blank or placeholder departments fall back to [`DEFAULT_DEPARTMENT`].
pub fn normalize_department(department: Option<&str>) -> String {
    match department.map(str::trim) {
        Some(d) if !d.is_empty() && d != "undefined" => d.to_string(),
        _ => DEFAULT_DEPARTMENT.to_string(),
    }
}

pub fn channel_name(department: &str, deadline: Option<&str>) -> String {
    match deadline {
        Some(deadline) => format!("{} - {}", department, deadline),
        None => format!("{} - No Deadline", department),
    }
}

pub fn teaser(department: &str, store_count: usize, deadline: Option<&str>) -> String {
    format!(
        "Category: {}; Targeted Stores: {}; Deadline: {}",
        department,
        store_count,
        deadline.unwrap_or("None")
    )
}

/// Post title, a rule, then the action items as a list.
pub fn post_body(title: &str, tasks: &[Task]) -> String {
    let mut html = format!("{}<hr>", escape_html(title));
    if tasks.is_empty() {
        return html;
    }

    html.push_str("<h3>Action Items</h3><ul>");
    for task in tasks {
        html.push_str("<li><strong>");
        html.push_str(&escape_html(&task.title));
        html.push_str("</strong><br>");
        html.push_str(&escape_html(&task.description));
        if let Some(due) = task.due_date {
            html.push_str(&format!(
                " <span style=\"color:#666; font-size:0.9em;\">(Due: {})</span>",
                due.format("%-m/%-d/%Y")
            ));
        }
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
