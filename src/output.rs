//! Output formats for segment results
//!
//! Three formats: a human-readable aligned table, JSON for machine parsing,
//! and CSV for spreadsheet analysis.

use crate::rank::RenderRow;

/// Render rows as an aligned text table with a title line
pub fn format_text(title: &str, rows: &[RenderRow]) -> String {
    let label_width = rows
        .iter()
        .map(|r| r.label.len())
        .chain(std::iter::once("segment".len()))
        .max()
        .unwrap_or(7);

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&format!(
        "{:<label_width$} {:>11} {:>11} {:>11}  significant\n",
        "segment", "mean diff", "ci low", "ci high"
    ));
    out.push_str(&format!(
        "{} ----------- ----------- -----------  -----------\n",
        "-".repeat(label_width)
    ));
    for row in rows {
        out.push_str(&format!(
            "{:<label_width$} {:>11.2} {:>11.2} {:>11.2}  {}\n",
            row.label,
            row.mean_difference,
            row.ci_low,
            row.ci_high,
            if row.significant { "yes" } else { "" }
        ));
    }
    out
}

/// Render rows as pretty-printed JSON
pub fn format_json(rows: &[RenderRow]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(rows)
}

/// Quote a CSV field if it contains a comma, quote, or newline
fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render rows as CSV with a header
pub fn format_csv(rows: &[RenderRow]) -> String {
    let mut out = String::from("segment,mean_difference,ci_low,ci_high,significant\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            escape_csv(&row.label),
            row.mean_difference,
            row.ci_low,
            row.ci_high,
            row.significant
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<RenderRow> {
        vec![
            RenderRow {
                label: "12 AM".to_string(),
                mean_difference: 12.345,
                ci_low: 2.0,
                ci_high: 22.7,
                significant: true,
            },
            RenderRow {
                label: "1 AM".to_string(),
                mean_difference: 0.0,
                ci_low: 0.0,
                ci_high: 0.0,
                significant: false,
            },
        ]
    }

    #[test]
    fn test_format_text_contains_rows_and_title() {
        let text = format_text("Upvote difference by hour", &rows());
        assert!(text.starts_with("Upvote difference by hour\n"));
        assert!(text.contains("12 AM"));
        assert!(text.contains("12.35"));
        assert!(text.contains("yes"));
    }

    #[test]
    fn test_format_json_round_trips() {
        let json = format_json(&rows()).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["label"], "12 AM");
        assert_eq!(parsed[0]["significant"], true);
    }

    #[test]
    fn test_format_csv_header_and_rows() {
        let csv = format_csv(&rows());
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "segment,mean_difference,ci_low,ci_high,significant"
        );
        assert!(lines.next().unwrap().starts_with("12 AM,12.345,"));
    }

    #[test]
    fn test_format_csv_quotes_embedded_commas() {
        let row = RenderRow {
            label: "tag, with comma".to_string(),
            mean_difference: 1.0,
            ci_low: 0.5,
            ci_high: 1.5,
            significant: false,
        };
        let csv = format_csv(&[row]);
        assert!(csv.contains("\"tag, with comma\""));
    }

    #[test]
    fn test_escape_csv_doubles_quotes() {
        assert_eq!(escape_csv("a\"b"), "\"a\"\"b\"");
        assert_eq!(escape_csv("plain"), "plain");
    }
}
