//! Delimited text parser producing ordered field->value records.
//!
//! Deliberately lenient: malformed input never raises, it degrades to fewer
//! (worst case zero) records. The calling adapter's `validate` step is
//! responsible for rejecting an empty record set.

use std::collections::HashMap;

/// Candidate delimiters, checked against the header line. Comma wins ties.
const DELIMITERS: [char; 3] = [',', ';', '\t'];

/// A parsed delimited table.
///
/// `headers` preserves column order (normalized); `records` are keyed by the
/// normalized header names.
#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub records: Vec<HashMap<String, String>>,
    pub delimiter: char,
}

impl ParsedTable {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True if the table has a column with this normalized name.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

/// Parse delimited text into ordered records.
///
/// The first line is the header row; each subsequent non-empty line is one
/// record. Records whose field count does not match the header count are
/// silently skipped, as are records with every field empty.
#[must_use]
pub fn parse(text: &str) -> ParsedTable {
    let mut lines = text.lines();
    let Some(header_line) = lines.find(|l| !l.trim().is_empty()) else {
        return ParsedTable::default();
    };

    let delimiter = sniff_delimiter(header_line);
    let headers: Vec<String> = split_fields(header_line, delimiter)
        .into_iter()
        .map(|h| normalize_header(&h))
        .collect();

    if headers.is_empty() {
        return ParsedTable::default();
    }

    let mut records = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_fields(line, delimiter);
        if fields.len() != headers.len() {
            // Best-effort tolerance for malformed trailing lines
            continue;
        }
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let record: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(fields.into_iter().map(|f| f.trim().to_string()))
            .collect();
        records.push(record);
    }

    ParsedTable { headers, records, delimiter }
}

/// Pick the delimiter with the most out-of-quote occurrences in the header
/// line. Comma wins ties, and is the fallback when nothing matches.
fn sniff_delimiter(header_line: &str) -> char {
    let mut best = ',';
    let mut best_count = 0;
    for candidate in DELIMITERS {
        let mut in_quotes = false;
        let count = header_line
            .chars()
            .filter(|&c| {
                if c == '"' {
                    in_quotes = !in_quotes;
                }
                c == candidate && !in_quotes
            })
            .count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Split one line into fields, treating delimiters inside double quotes as
/// literal content.
fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            fields.push(current.clone());
            current.clear();
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields
}

/// Normalize a header into a stable record key: trimmed, lowercased, with
/// anything outside `[a-z0-9_]` replaced by `_`.
#[must_use]
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Field Splitting Tests ====================

    #[test]
    fn test_quoted_field_keeps_delimiter() {
        let fields = split_fields("A,\"B,C\",D", ',');
        assert_eq!(fields, vec!["A", "B,C", "D"]);
    }

    #[test]
    fn test_unterminated_quote_does_not_panic() {
        let fields = split_fields("A,\"B,C", ',');
        assert_eq!(fields, vec!["A", "B,C"]);
    }

    // ==================== Header Normalization Tests ====================

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Threat Name "), "threat_name");
        assert_eq!(normalize_header("Risk (1-5)"), "risk__1_5_");
        assert_eq!(normalize_header("ASSET"), "asset");
    }

    // ==================== Parse Tests ====================

    #[test]
    fn test_parse_basic_table() {
        let table = parse("Threat,Asset\nSQL Injection,Web API\nXSS,Frontend\n");
        assert_eq!(table.headers, vec!["threat", "asset"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0]["threat"], "SQL Injection");
        assert_eq!(table.records[1]["asset"], "Frontend");
    }

    #[test]
    fn test_parse_skips_mismatched_field_count() {
        let table = parse("A,B\n1,2\nonly-one-field\n3,4\n");
        assert_eq!(table.records.len(), 2);
    }

    #[test]
    fn test_parse_skips_all_empty_records() {
        let table = parse("A,B\n1,2\n,\n");
        assert_eq!(table.records.len(), 1);
    }

    #[test]
    fn test_parse_empty_input_yields_zero_records() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n").is_empty());
    }

    #[test]
    fn test_parse_header_only_yields_zero_records() {
        let table = parse("Threat,Category,Asset\n");
        assert_eq!(table.headers.len(), 3);
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_sniffs_semicolon_delimiter() {
        let table = parse("Threat;Asset\nSQLi;API\n");
        assert_eq!(table.delimiter, ';');
        assert_eq!(table.records[0]["asset"], "API");
    }

    #[test]
    fn test_parse_sniffs_tab_delimiter() {
        let table = parse("Threat\tAsset\nSQLi\tAPI\n");
        assert_eq!(table.delimiter, '\t');
        assert_eq!(table.records[0]["threat"], "SQLi");
    }

    #[test]
    fn test_parse_trims_field_values() {
        let table = parse("A,B\n 1 , 2 \n");
        assert_eq!(table.records[0]["a"], "1");
        assert_eq!(table.records[0]["b"], "2");
    }

    #[test]
    fn test_parse_structured_document_yields_garbage_free_zero_or_few_records() {
        // JSON handed to the text parser must not panic; validate() rejects
        // the result downstream.
        let table = parse("{\"elements\": []}");
        assert!(table.records.is_empty());
    }
}
