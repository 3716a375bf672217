//! CSV export of result tables

use crate::SearchError;
use serde::Serialize;
use snippy_domain::Record;
use std::io::Write;
use std::path::Path;

/// One exported row
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    title: &'a str,
    journal: &'a str,
    year: String,
    tier: &'static str,
    link: &'a str,
}

impl<'a> From<&'a Record> for ExportRow<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            title: &record.title,
            journal: &record.journal,
            year: record.year_display(),
            tier: record.tier.as_str(),
            link: record.link_or_placeholder(),
        }
    }
}

/// Write `records` as CSV with a `title,journal,year,tier,link` header
///
/// Returns the number of rows written.
pub fn write_csv<W: Write>(writer: W, records: &[&Record]) -> Result<usize, SearchError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);

    if records.is_empty() {
        wtr.write_record(["title", "journal", "year", "tier", "link"])?;
    }
    for record in records {
        wtr.serialize(ExportRow::from(*record))?;
    }

    wtr.flush()?;
    Ok(records.len())
}

/// Write `records` to a CSV file at `path`
pub fn export_csv(path: &Path, records: &[&Record]) -> Result<usize, SearchError> {
    let file = std::fs::File::create(path)?;
    let written = write_csv(file, records)?;
    tracing::info!(path = %path.display(), rows = written, "Exported CSV");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snippy_domain::{Tier, NO_LINK};

    fn record(title: &str, year: Option<i32>, link: Option<&str>, tier: Tier) -> Record {
        Record {
            title: title.to_string(),
            journal: "Journal of Graph Theory".to_string(),
            year,
            link: link.map(str::to_string),
            tier,
            author: None,
        }
    }

    #[test]
    fn test_write_csv() {
        let records = [
            record("Minors, \"part\" I", Some(1983), Some("https://doi.org/10.1/a"), Tier::Level3),
            record("Untitled", None, None, Tier::Unranked),
        ];
        let refs: Vec<&Record> = records.iter().collect();

        let mut out = Vec::new();
        let written = write_csv(&mut out, &refs).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "title,journal,year,tier,link");
        assert_eq!(
            lines[1],
            "\"Minors, \"\"part\"\" I\",Journal of Graph Theory,1983,3,https://doi.org/10.1/a"
        );
        assert_eq!(
            lines[2],
            format!("Untitled,Journal of Graph Theory,N/A,unranked,{}", NO_LINK)
        );
    }

    #[test]
    fn test_write_csv_empty_has_header() {
        let mut out = Vec::new();
        assert_eq!(write_csv(&mut out, &[]).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "title,journal,year,tier,link\n");
    }
}
