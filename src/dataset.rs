use crate::error::BuildWarning;
use crate::models::DatasetRow;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Rows read from a dataset file, plus the lines that could not be read.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    pub path: PathBuf,
    pub sha256: String,
    pub rows: Vec<DatasetRow>,
    pub rejected: Vec<BuildWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Json,
}

impl DatasetFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DatasetFormat::Json,
            _ => DatasetFormat::Csv,
        }
    }
}

pub fn load_dataset(path: &Path) -> Result<DatasetSource> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read page map: {:?}", path))?;

    let (rows, rejected) = match DatasetFormat::from_path(path) {
        DatasetFormat::Json => {
            parse_json(&content).with_context(|| format!("Invalid JSON page map: {:?}", path))?
        }
        DatasetFormat::Csv => {
            parse_csv(&content).with_context(|| format!("Invalid CSV page map: {:?}", path))?
        }
    };

    Ok(DatasetSource {
        path: path.to_path_buf(),
        sha256: sha256_hex(content.as_bytes()),
        rows,
        rejected,
    })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// JSON array of `{"page": 1287, "ref": "John 3:16", "spill": false}`.
/// Elements that do not fit that shape are returned as warnings.
pub fn parse_json(content: &str) -> Result<(Vec<DatasetRow>, Vec<BuildWarning>)> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(content).context("Expected an array of {page, ref, spill} objects")?;

    let mut rows = Vec::new();
    let mut rejected = Vec::new();

    for (index, value) in values.into_iter().enumerate() {
        let line = index + 1;
        let reference = value
            .get("ref")
            .and_then(|r| r.as_str())
            .unwrap_or_default()
            .to_string();

        match serde_json::from_value::<DatasetRow>(value) {
            Ok(mut row) => {
                row.line = line;
                rows.push(row);
            }
            Err(err) => rejected.push(BuildWarning::RowInvalid {
                line,
                reference,
                reason: err.to_string(),
            }),
        }
    }

    Ok((rows, rejected))
}

/// CSV with a `page,ref[,spill]` header in any column order. Lines whose
/// page number does not parse are returned as warnings.
///
/// Each record is one physical line: a quoted field may hold commas and
/// doubled quotes but not a line break. A line that ends inside quotes is
/// rejected with a warning rather than joined to the next line.
pub fn parse_csv(content: &str) -> Result<(Vec<DatasetRow>, Vec<BuildWarning>)> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim_start_matches('\u{feff}')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().context("Page map is empty")?;
    let columns: Vec<String> = split_csv_line(header)
        .context("Unterminated quoted field in header")?
        .into_iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    let column = |name: &str| columns.iter().position(|c| c == name);
    let page_col = column("page").context("Missing 'page' column")?;
    let ref_col = column("ref").context("Missing 'ref' column")?;
    let spill_col = column("spill");

    let mut rows = Vec::new();
    let mut rejected = Vec::new();

    for (line, text) in lines {
        let fields = match split_csv_line(text) {
            Some(fields) => fields,
            None => {
                rejected.push(BuildWarning::RowInvalid {
                    line,
                    reference: text.trim().to_string(),
                    reason: "unterminated quoted field (fields cannot span lines)".to_string(),
                });
                continue;
            }
        };
        let reference = fields.get(ref_col).map(|f| f.trim().to_string()).unwrap_or_default();
        let page_field = fields.get(page_col).map(|f| f.trim()).unwrap_or("");

        let page = match page_field.parse::<u32>() {
            Ok(page) => page,
            Err(_) => {
                rejected.push(BuildWarning::RowInvalid {
                    line,
                    reference,
                    reason: format!("invalid page number {:?}", page_field),
                });
                continue;
            }
        };

        let spill = spill_col
            .and_then(|col| fields.get(col))
            .map_or(false, |f| parse_spill_flag(f));

        rows.push(DatasetRow {
            line,
            page,
            reference,
            spill,
        });
    }

    Ok((rows, rejected))
}

/// `1`, `true`, `yes`, `y` (any case, surrounding whitespace ignored).
pub fn parse_spill_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

/// Accepts `true`/`false`, numbers, the string forms of `parse_spill_flag`,
/// or null.
pub fn deserialize_spill<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SpillValue {
        Bool(bool),
        Number(i64),
        Text(String),
    }

    Ok(match Option::<SpillValue>::deserialize(deserializer)? {
        Some(SpillValue::Bool(flag)) => flag,
        Some(SpillValue::Number(n)) => n == 1,
        Some(SpillValue::Text(text)) => parse_spill_flag(&text),
        None => false,
    })
}

/// `None` when the line ends inside an open quote.
fn split_csv_line(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(ch),
        }
    }
    if in_quotes {
        return None;
    }
    fields.push(field);
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_csv_line() {
        assert_eq!(split_csv_line("1,John 3:16,1").unwrap(), vec!["1", "John 3:16", "1"]);
        assert_eq!(
            split_csv_line(r#"2,"Matthew 5:1-7:10",no"#).unwrap(),
            vec!["2", "Matthew 5:1-7:10", "no"]
        );
        assert_eq!(split_csv_line(r#""a ""b"" c",x"#).unwrap(), vec![r#"a "b" c"#, "x"]);
        assert_eq!(split_csv_line("3,Jude 1,").unwrap(), vec!["3", "Jude 1", ""]);
        assert_eq!(split_csv_line(r#"4,"John 3:16"#), None);
    }

    #[test]
    fn test_parse_spill_flag() {
        for yes in ["1", "true", "TRUE", " yes ", "Y"] {
            assert!(parse_spill_flag(yes), "{} should be truthy", yes);
        }
        for no in ["", "0", "false", "no", "spill"] {
            assert!(!parse_spill_flag(no), "{} should be falsy", no);
        }
    }

    #[test]
    fn test_parse_csv() {
        let content = "page,ref,spill\n1287,John 3:16,\n1288,\"John 3:17-21\",yes\n\nabc,John 4:1,\n";
        let (rows, rejected) = parse_csv(content).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].page, 1287);
        assert_eq!(rows[0].reference, "John 3:16");
        assert!(!rows[0].spill);
        assert_eq!(rows[1].line, 3);
        assert!(rows[1].spill);

        assert_eq!(rejected.len(), 1);
        match &rejected[0] {
            BuildWarning::RowInvalid { line, reference, .. } => {
                assert_eq!(*line, 5);
                assert_eq!(reference, "John 4:1");
            }
            other => panic!("unexpected warning {:?}", other),
        }
    }

    #[test]
    fn test_parse_csv_rejects_fields_spanning_lines() {
        let content = "page,ref,spill\n1287,John 3:16,\n1288,\"John 3:17\n-21\",no\n1289,John 3:22,\n";
        let (rows, rejected) = parse_csv(content).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].reference, "John 3:16");
        assert_eq!((rows[1].line, rows[1].reference.as_str()), (5, "John 3:22"));

        let lines: Vec<usize> = rejected
            .iter()
            .map(|w| match w {
                BuildWarning::RowInvalid { line, .. } => *line,
                other => panic!("unexpected warning {:?}", other),
            })
            .collect();
        assert_eq!(lines, vec![3, 4]);

        assert!(parse_csv("\"page,ref\n1,John 3:16\n").is_err());
    }

    #[test]
    fn test_parse_csv_column_order_and_optional_spill() {
        let (rows, _) = parse_csv("REF,Page\nGenesis 1,1\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].page, 1);
        assert_eq!(rows[0].reference, "Genesis 1");
        assert!(!rows[0].spill);
    }

    #[test]
    fn test_parse_csv_requires_header_columns() {
        assert!(parse_csv("").is_err());
        assert!(parse_csv("page,verse\n1,John 3:16\n").is_err());
    }

    #[test]
    fn test_parse_json() {
        let content = r#"[
            {"page": 100, "ref": "Psalms 23"},
            {"page": 101, "ref": "Psalms 24:1-5", "spill": "y"},
            {"page": 102, "ref": "Psalms 24:6-10", "spill": true},
            {"page": 103, "ref": "Psalms 25:1-3", "spill": null}
        ]"#;
        let (rows, rejected) = parse_json(content).unwrap();
        assert!(rejected.is_empty());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].line, 1);
        assert!(!rows[0].spill);
        assert!(rows[1].spill);
        assert!(rows[2].spill);
        assert!(!rows[3].spill);

        assert!(parse_json(r#"{"page": 1}"#).is_err());
    }

    #[test]
    fn test_parse_json_skips_bad_elements() {
        let content = r#"[
            {"page": 1287, "ref": "John 3:16"},
            {"page": -1, "ref": "John 3:17"},
            {"ref": "John 3:18"},
            "John 3:19",
            {"page": 1288, "ref": "John 3:20"}
        ]"#;
        let (rows, rejected) = parse_json(content).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].line, rows[0].page), (1, 1287));
        assert_eq!((rows[1].line, rows[1].page), (5, 1288));

        assert_eq!(rejected.len(), 3);
        match &rejected[0] {
            BuildWarning::RowInvalid { line, reference, .. } => {
                assert_eq!(*line, 2);
                assert_eq!(reference, "John 3:17");
            }
            other => panic!("unexpected warning {:?}", other),
        }
        assert!(matches!(&rejected[2], BuildWarning::RowInvalid { line: 4, reference, .. } if reference.is_empty()));
    }

    #[test]
    fn test_load_dataset_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("page_map.csv");
        fs::write(&csv_path, "page,ref\n1287,John 3:16\n").unwrap();

        let source = load_dataset(&csv_path).unwrap();
        assert_eq!(source.rows.len(), 1);
        assert_eq!(source.sha256.len(), 64);
        assert_eq!(source.sha256, sha256_hex(b"page,ref\n1287,John 3:16\n"));

        let json_path = temp_dir.path().join("page_map.JSON");
        fs::write(&json_path, r#"[{"page": 1287, "ref": "John 3:16"}]"#).unwrap();
        assert_eq!(DatasetFormat::from_path(&json_path), DatasetFormat::Json);
        let json_rows = load_dataset(&json_path).unwrap().rows;
        assert_eq!(json_rows[0].page, source.rows[0].page);
        assert_eq!(json_rows[0].reference, source.rows[0].reference);

        assert!(load_dataset(&temp_dir.path().join("missing.csv")).is_err());
    }
}
