use crate::model::StockRecord;
use crate::presenter::{NO_RESULTS_MESSAGE, Presenter, RecordView};

/// Prints the result set as a JSON array on stdout.
pub struct JsonPresenter;

pub fn render(records: &[&StockRecord]) -> Result<String, serde_json::Error> {
    let views: Vec<RecordView> = records.iter().map(|r| RecordView::from(*r)).collect();
    serde_json::to_string_pretty(&views)
}

impl Presenter for JsonPresenter {
    fn present(&self, records: &[&StockRecord]) {
        match render(records) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "failed to serialize results"),
        }
    }

    fn no_results(&self) {
        tracing::info!("{NO_RESULTS_MESSAGE}");
        println!("[]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::record;

    #[test]
    fn empty_result_is_empty_array() {
        assert_eq!(render(&[]).unwrap(), "[]");
    }

    #[test]
    fn renders_one_object_per_record() {
        let a = record("AAPL", "US");
        let b = record("NOVO-B.CO", "Danish");
        let value: serde_json::Value = serde_json::from_str(&render(&[&a, &b]).unwrap()).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["market"], "Danish");
    }
}
