use serde_json::Value;

use report_spec::{HeaderSet, ResultRecord};

/// Renders one CSV table: the header labels, then one row per record in column order.
pub fn render_csv(headers: &HeaderSet, records: &[&ResultRecord]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        headers
            .column_headers
            .iter()
            .map(|descriptor| escape(&descriptor.header)),
    );
    for record in records {
        push_line(
            &mut out,
            headers
                .column_headers
                .iter()
                .map(|descriptor| cell(record.processed_results.get(&descriptor.key))),
        );
    }
    out
}

fn push_line(out: &mut String, cells: impl Iterator<Item = String>) {
    let line = cells.collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push('\n');
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => escape(text),
        Some(other) => escape(&other.to_string()),
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
