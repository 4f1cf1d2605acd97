//! CSV export of record lists
//!
//! The header is the union of all record keys in first-seen order, minus the
//! excluded keys. Fields containing a comma, quote or line break are wrapped
//! in quotes with inner quotes doubled.

use crate::error::ExportError;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::{Map, Value};

/// Serialize records to CSV text
///
/// # Errors
/// - `ExportError::Serialize` if a record cannot be serialized
/// - `ExportError::NotARecord` if a record is not a key/value object
pub fn to_csv<T, S>(rows: &[T], exclude: &[S]) -> Result<String, ExportError>
where
    T: Serialize,
    S: AsRef<str>,
{
    let objects: Vec<Map<String, Value>> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| match serde_json::to_value(row)? {
            Value::Object(map) => Ok(map),
            _ => Err(ExportError::NotARecord(i)),
        })
        .collect::<Result<_, _>>()?;

    let mut header: IndexSet<&str> = IndexSet::new();
    for object in &objects {
        for key in object.keys() {
            if !exclude.iter().any(|x| x.as_ref() == key) {
                header.insert(key.as_str());
            }
        }
    }
    if header.is_empty() {
        return Ok(String::new());
    }

    let mut out = String::new();
    write_line(&mut out, header.iter().map(|k| (*k).to_string()));
    for object in &objects {
        write_line(
            &mut out,
            header
                .iter()
                .map(|key| object.get(*key).map(cell).unwrap_or_default()),
        );
    }
    Ok(out)
}

/// Parse CSV text into rows of fields
///
/// # Errors
/// `ExportError::Malformed` on an unterminated quoted field or text after a
/// closing quote
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, ExportError> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut after_quote = false;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => {
                    in_quotes = false;
                    after_quote = true;
                }
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !after_quote => in_quotes = true,
            ',' => {
                row.push(std::mem::take(&mut field));
                after_quote = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                after_quote = false;
                line += 1;
            }
            _ if after_quote => {
                return Err(ExportError::Malformed {
                    line,
                    reason: format!("unexpected '{c}' after closing quote"),
                });
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ExportError::Malformed {
            line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !row.is_empty() || after_quote {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}

/// Parse CSV text with a header row into keyed records
///
/// # Errors
/// `ExportError::Malformed` if the text is malformed or a row's width
/// differs from the header's
pub fn read_records(text: &str) -> Result<Vec<IndexMap<String, String>>, ExportError> {
    let mut rows = parse_csv(text)?.into_iter();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    rows.enumerate()
        .map(|(i, row)| {
            if row.len() != header.len() {
                return Err(ExportError::Malformed {
                    line: i + 2,
                    reason: format!("expected {} fields, found {}", header.len(), row.len()),
                });
            }
            Ok(header.iter().cloned().zip(row).collect())
        })
        .collect()
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn write_line(out: &mut String, fields: impl Iterator<Item = String>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(&field);
        }
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn quotes_commas_and_round_trips() {
        let rows = vec![json!({"a": "x,y", "b": 1})];
        let csv = to_csv(&rows, &[] as &[&str]).unwrap();
        assert_eq!(csv, "a,b\n\"x,y\",1\n");

        let records = read_records(&csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["a"], "x,y");
        assert_eq!(records[0]["b"], "1");
    }

    #[test]
    fn doubles_inner_quotes_and_keeps_newlines() {
        let rows = vec![json!({"title": "The \"meat\" paradox\nrevisited"})];
        let csv = to_csv(&rows, &[] as &[&str]).unwrap();
        assert_eq!(csv, "title\n\"The \"\"meat\"\" paradox\nrevisited\"\n");

        let records = read_records(&csv).unwrap();
        assert_eq!(records[0]["title"], "The \"meat\" paradox\nrevisited");
    }

    #[test]
    fn header_is_key_union_minus_excluded() {
        let rows = vec![
            json!({"id": 1, "title": "A", "secret": "s"}),
            json!({"id": 2, "year": 2020}),
        ];
        let csv = to_csv(&rows, &["secret"]).unwrap();
        assert_eq!(csv, "id,title,year\n1,A,\n2,,2020\n");
    }

    #[test]
    fn nulls_and_bools() {
        let rows = vec![json!({"flag": true, "missing": null})];
        assert_eq!(to_csv(&rows, &[] as &[&str]).unwrap(), "flag,missing\ntrue,\n");
    }

    #[test]
    fn empty_input() {
        let rows: Vec<Value> = Vec::new();
        assert_eq!(to_csv(&rows, &[] as &[&str]).unwrap(), "");
        assert!(read_records("").unwrap().is_empty());
    }

    #[test]
    fn non_object_rows_are_rejected() {
        let rows = vec![json!(3)];
        assert!(matches!(
            to_csv(&rows, &[] as &[&str]),
            Err(ExportError::NotARecord(0))
        ));
    }

    #[test]
    fn malformed_input() {
        assert!(parse_csv("a,\"b\n").is_err());
        assert!(parse_csv("\"a\"x,b\n").is_err());
        assert!(read_records("a,b\n1\n").is_err());
    }

    #[test]
    fn crlf_line_endings() {
        let rows = parse_csv("a,b\r\n1,2\r\n").unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }
}
