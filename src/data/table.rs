//! Header-keyed parsing of delimited artifact text.
//!
//! The parser never fails: rows that do not line up with the header are
//! still delivered and the irregularity is recorded as a [`ParseWarning`].

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;

/// A scalar cell after dynamic type inference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Bool(bool),
    Text(String),
    Empty,
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// One data line keyed by header names, in header order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    fields: Vec<(String, Cell)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, cell: Cell) -> Self {
        self.insert(name, cell);
        self
    }

    pub fn insert(&mut self, name: &str, cell: Cell) {
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = cell,
            None => self.fields.push((name.to_string(), cell)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    TooFewFields,
    TooManyFields,
    Malformed,
    DuplicateHeader,
    MissingHeader,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::TooFewFields => "too_few_fields",
            WarningKind::TooManyFields => "too_many_fields",
            WarningKind::Malformed => "malformed",
            WarningKind::DuplicateHeader => "duplicate_header",
            WarningKind::MissingHeader => "missing_header",
        }
    }
}

/// Non-fatal parse diagnostic; `line` is 1-based in the input text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseWarning {
    pub line: u64,
    pub kind: WarningKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedDataset {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedDataset {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse header + data lines into records. Blank lines produce nothing.
pub fn parse_table(text: &str) -> ParsedDataset {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut out = ParsedDataset::default();
    if text.trim().is_empty() {
        return out;
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut raw = StringRecord::new();
    let mut header_seen = false;
    loop {
        let line = raw.position().map(|p| p.line()).unwrap_or(0);
        match reader.read_record(&mut raw) {
            Ok(false) => break,
            Ok(true) => {}
            Err(err) => {
                out.warnings.push(ParseWarning {
                    line: err.position().map(|p| p.line()).unwrap_or(line),
                    kind: WarningKind::Malformed,
                    message: err.to_string(),
                });
                continue;
            }
        }
        if is_blank(&raw) {
            continue;
        }
        let line = raw.position().map(|p| p.line()).unwrap_or(0);
        if !header_seen {
            out.headers = header_names(&raw, line, &mut out.warnings);
            header_seen = true;
            continue;
        }
        out.records.push(build_record(&out.headers, &raw, line, &mut out.warnings));
    }
    out
}

fn is_blank(raw: &StringRecord) -> bool {
    raw.len() <= 1 && raw.iter().all(|f| f.trim().is_empty())
}

fn header_names(raw: &StringRecord, line: u64, warnings: &mut Vec<ParseWarning>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, field) in raw.iter().enumerate() {
        let mut name = field.trim().to_string();
        if name.is_empty() {
            name = format!("column_{}", idx + 1);
            warnings.push(ParseWarning {
                line,
                kind: WarningKind::MissingHeader,
                message: format!("column {} has no header name, using {}", idx + 1, name),
            });
        }
        if names.contains(&name) {
            let base = name.clone();
            let mut n = 1;
            while names.contains(&name) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            warnings.push(ParseWarning {
                line,
                kind: WarningKind::DuplicateHeader,
                message: format!("duplicate header {} renamed to {}", base, name),
            });
        }
        names.push(name);
    }
    names
}

fn build_record(
    headers: &[String],
    raw: &StringRecord,
    line: u64,
    warnings: &mut Vec<ParseWarning>,
) -> Record {
    if raw.len() < headers.len() {
        warnings.push(ParseWarning {
            line,
            kind: WarningKind::TooFewFields,
            message: format!("expected {} fields, got {}", headers.len(), raw.len()),
        });
    } else if raw.len() > headers.len() {
        warnings.push(ParseWarning {
            line,
            kind: WarningKind::TooManyFields,
            message: format!("expected {} fields, got {}", headers.len(), raw.len()),
        });
    }

    let mut record = Record::new();
    for (idx, name) in headers.iter().enumerate() {
        let cell = raw.get(idx).map(infer_cell).unwrap_or(Cell::Empty);
        record.insert(name, cell);
    }
    record
}

/// Dynamic typing for one raw field.
pub fn infer_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    match trimmed {
        "true" | "TRUE" => return Cell::Bool(true),
        "false" | "FALSE" => return Cell::Bool(false),
        _ => {}
    }
    match parse_decimal(trimmed) {
        Some(n) => Cell::Number(n),
        None => Cell::Text(raw.to_string()),
    }
}

/// Strict decimal literal: `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`.
/// Spellings such as `inf` or `NaN` that `f64::from_str` would accept are rejected.
pub fn parse_decimal(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;
    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = "policy,n_episodes,mean_final_equity,median_final_equity,mean_max_drawdown,median_max_drawdown
ppo,200,1.1021,1.0876,0.1412,0.1307
buy_hold,200,1.0544,1.0312,0.2215,0.2050
";

    #[test]
    fn parses_header_and_rows() {
        let ds = parse_table(SUMMARY);
        assert_eq!(ds.headers.len(), 6);
        assert_eq!(ds.records.len(), 2);
        assert!(ds.warnings.is_empty());
        let first = &ds.records[0];
        assert_eq!(first.get("policy"), Some(&Cell::Text("ppo".to_string())));
        assert_eq!(first.get("n_episodes"), Some(&Cell::Number(200.0)));
        assert_eq!(first.get("mean_max_drawdown"), Some(&Cell::Number(0.1412)));
        assert_eq!(first.get("policy").and_then(Cell::as_number), None);
    }

    #[test]
    fn records_keep_header_order() {
        let ds = parse_table(SUMMARY);
        let keys: Vec<&str> = ds.records[1].keys().collect();
        assert_eq!(keys, ds.headers.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn blank_and_whitespace_lines_are_skipped() {
        let text = "policy,v\n\na,1\n   \n\nb,2\n\n";
        let ds = parse_table(text);
        assert_eq!(ds.records.len(), 2);
        assert!(ds.warnings.is_empty());
    }

    #[test]
    fn empty_input_yields_nothing() {
        for text in ["", "   ", "\n\n  \n", "\u{feff}"] {
            let ds = parse_table(text);
            assert!(ds.records.is_empty());
            assert!(ds.headers.is_empty());
            assert!(ds.warnings.is_empty());
        }
    }

    #[test]
    fn header_only_yields_zero_records() {
        let ds = parse_table("policy,n_episodes\n");
        assert_eq!(ds.headers, vec!["policy", "n_episodes"]);
        assert!(ds.records.is_empty());
    }

    #[test]
    fn short_row_is_padded_and_warned() {
        let ds = parse_table("a,b,c\n1,2\n");
        assert_eq!(ds.records.len(), 1);
        assert_eq!(ds.records[0].get("c"), Some(&Cell::Empty));
        assert_eq!(ds.warnings.len(), 1);
        assert_eq!(ds.warnings[0].kind, WarningKind::TooFewFields);
        assert_eq!(ds.warnings[0].line, 2);
    }

    #[test]
    fn long_row_is_truncated_and_warned() {
        let ds = parse_table("a,b\n1,2,3\n4,5\n");
        assert_eq!(ds.records.len(), 2);
        assert_eq!(ds.records[0].len(), 2);
        assert_eq!(ds.warnings.len(), 1);
        assert_eq!(ds.warnings[0].kind, WarningKind::TooManyFields);
    }

    #[test]
    fn quoted_fields_keep_delimiters() {
        let ds = parse_table("policy,note\nppo,\"wins, mostly\"\n");
        assert_eq!(
            ds.records[0].get("note"),
            Some(&Cell::Text("wins, mostly".to_string()))
        );
    }

    #[test]
    fn duplicate_and_missing_headers_are_renamed() {
        let ds = parse_table("v,v,\n1,2,3\n");
        assert_eq!(ds.headers, vec!["v", "v_1", "column_3"]);
        let kinds: Vec<WarningKind> = ds.warnings.iter().map(|w| w.kind).collect();
        assert!(kinds.contains(&WarningKind::DuplicateHeader));
        assert!(kinds.contains(&WarningKind::MissingHeader));
        assert_eq!(ds.records[0].get("v_1"), Some(&Cell::Number(2.0)));
    }

    #[test]
    fn infers_scalar_types() {
        assert_eq!(infer_cell("42"), Cell::Number(42.0));
        assert_eq!(infer_cell(" -0.5 "), Cell::Number(-0.5));
        assert_eq!(infer_cell("1e-3"), Cell::Number(0.001));
        assert_eq!(infer_cell(".25"), Cell::Number(0.25));
        assert_eq!(infer_cell("true"), Cell::Bool(true));
        assert_eq!(infer_cell("FALSE"), Cell::Bool(false));
        assert_eq!(infer_cell(""), Cell::Empty);
        assert_eq!(infer_cell("ppo"), Cell::Text("ppo".to_string()));
        assert_eq!(infer_cell("NaN"), Cell::Text("NaN".to_string()));
        assert_eq!(infer_cell("inf"), Cell::Text("inf".to_string()));
        assert_eq!(infer_cell("1.2.3"), Cell::Text("1.2.3".to_string()));
    }

    #[test]
    fn decimal_literal_rejects_partial_forms() {
        assert_eq!(parse_decimal("."), None);
        assert_eq!(parse_decimal("-"), None);
        assert_eq!(parse_decimal("1e"), None);
        assert_eq!(parse_decimal("1e+"), None);
        assert_eq!(parse_decimal("12abc"), None);
        assert_eq!(parse_decimal("3."), Some(3.0));
        assert_eq!(parse_decimal("+7"), Some(7.0));
    }
}
