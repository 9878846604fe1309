use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDate;
use error_stack::{Report, ResultExt};
use serde::Serialize;
use tracing::info;

use crate::error::ReportError;
use crate::model::StockRecord;
use crate::presenter::RecordView;

#[derive(Serialize)]
struct TopStocksReport {
    date: String,
    top_stocks: Vec<RecordView>,
}

/// Write `records` to `path` as `{ "date": "YYYY-MM-DD", "top_stocks": [...] }`.
///
/// An existing file is overwritten.
pub fn save_report(
    records: &[&StockRecord],
    path: &Path,
    date: NaiveDate,
) -> Result<(), Report<ReportError>> {
    let report = TopStocksReport {
        date: date.format("%Y-%m-%d").to_string(),
        top_stocks: records.iter().map(|r| RecordView::from(*r)).collect(),
    };

    let file = File::create(path)
        .change_context(ReportError::Create)
        .attach_with(|| format!("path: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report).change_context(ReportError::Write)?;
    writer.flush().change_context(ReportError::Write)?;

    info!(path = %path.display(), records = records.len(), "report saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::record;

    #[test]
    fn report_contains_date_and_records() {
        let path = std::env::temp_dir().join(format!("top_stocks_{}.json", std::process::id()));
        let a = record("AAPL", "US");
        let b = record("MSFT", "US");
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        save_report(&[&a, &b], &path, date).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["date"], "2024-03-15");
        assert_eq!(value["top_stocks"].as_array().unwrap().len(), 2);
        assert_eq!(value["top_stocks"][0]["symbol"], "AAPL");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unwritable_path_is_create_error() {
        let path = Path::new("/nonexistent-dir/report.json");
        let err = save_report(&[], path, NaiveDate::MIN).unwrap_err();
        assert!(matches!(err.current_context(), ReportError::Create));
    }
}
