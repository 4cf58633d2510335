//! Terminal rendering for results

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use tessera_core::{DmlSummary, DocumentPage, QueryResult, RecordPage, Value};

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) => format!("0x{}", hex_prefix(bytes)),
        other => other.to_string(),
    }
}

/// First 16 bytes, hex encoded, with an ellipsis for longer values.
fn hex_prefix(bytes: &[u8]) -> String {
    let shown = hex::encode(&bytes[..bytes.len().min(16)]);
    if bytes.len() > 16 {
        format!("{}…", shown)
    } else {
        shown
    }
}

pub fn render_result(result: &QueryResult) -> String {
    // Statements carry no row total; an empty SELECT does.
    if result.columns.is_empty() && result.total_rows.is_none() {
        return format!(
            "{} ({} ms)",
            DmlSummary {
                affected_rows: result.affected_rows,
                execution_time_ms: result.execution_time_ms,
            },
            result.execution_time_ms
        );
    }

    if result.columns.is_empty() {
        return format!("0 rows ({} ms)", result.execution_time_ms);
    }

    let mut table = table();
    table.set_header(result.columns.iter().map(|c| c.name.as_str()));
    for row in &result.rows {
        table.add_row(row.values.iter().map(cell_text));
    }
    format!(
        "{}\n{} ({} ms)",
        table,
        row_count(result.rows.len() as u64),
        result.execution_time_ms
    )
}

pub fn render_page(page: &RecordPage) -> String {
    let shown = page.result.rows.len() as u64;
    let mut out = render_result(&page.result);
    if page.total_count > shown {
        out.push_str(&format!(" of {} total", page.total_count));
    }
    out
}

pub fn render_documents(page: &DocumentPage) -> String {
    let mut out = String::new();
    for document in &page.documents {
        // serde_json::Value always serializes
        out.push_str(&serde_json::to_string_pretty(document).unwrap_or_default());
        out.push('\n');
    }
    out.push_str(&format!(
        "{} of {} documents",
        page.documents.len(),
        page.total_count
    ));
    out
}

pub fn render_list<S: AsRef<str>>(header: &str, items: &[S]) -> String {
    let mut table = table();
    table.set_header(vec![header]);
    for item in items {
        table.add_row(vec![item.as_ref()]);
    }
    table.to_string()
}

fn row_count(n: u64) -> String {
    match n {
        1 => "1 row".to_string(),
        n => format!("{} rows", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_core::{ColumnMeta, Row};

    fn result() -> QueryResult {
        let columns = vec!["id".to_string(), "name".to_string()];
        QueryResult::from_rows(
            vec![ColumnMeta::new("id", "INTEGER", 0), ColumnMeta::new("name", "TEXT", 1)],
            vec![
                Row::new(columns.clone(), vec![Value::Int64(1), Value::from("Ada")]),
                Row::new(columns, vec![Value::Int64(2), Value::Null]),
            ],
            3,
        )
    }

    #[test]
    fn test_result_table_has_header_and_nulls() {
        let out = render_result(&result());
        assert!(out.contains("name"));
        assert!(out.contains("Ada"));
        assert!(out.contains("NULL"));
        assert!(out.ends_with("2 rows (3 ms)"));
    }

    #[test]
    fn test_statement_without_columns_reports_affected_rows() {
        let mut result = QueryResult::empty();
        result.affected_rows = 1;
        assert_eq!(render_result(&result), "1 row affected (0 ms)");
    }

    #[test]
    fn test_page_mentions_total_when_truncated() {
        let page = RecordPage {
            result: result(),
            total_count: 500,
            executed_query: String::new(),
        };
        assert!(render_page(&page).ends_with("2 rows (3 ms) of 500 total"));
    }

    #[test]
    fn test_long_binary_values_are_truncated() {
        assert_eq!(cell_text(&Value::Bytes(vec![0xab; 2])), "0xabab");
        assert!(cell_text(&Value::Bytes(vec![0; 40])).ends_with('…'));
    }

    #[test]
    fn test_documents_footer() {
        let page = DocumentPage {
            documents: vec![serde_json::json!({"_id": 1})],
            total_count: 4,
        };
        assert!(render_documents(&page).ends_with("1 of 4 documents"));
    }
}
