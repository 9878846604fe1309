use std::fmt::Write;

use crate::model::StockRecord;
use crate::presenter::{NO_RESULTS_MESSAGE, Presenter};

/// Human-readable listing on stdout.
pub struct TerminalPresenter;

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".into(), |v| format!("{v:.2}"))
}

/// One block of text per record.
pub fn render_record(rank: usize, r: &StockRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{rank:>2}. {} ({}) [{}]", r.name, r.symbol, r.market);
    let _ = writeln!(
        out,
        "    {}  price {:.2}  target {:.2} ({:+.1}%)  range {:.2}..{:.2} ({:+.1}%..{:+.1}%)",
        r.recommendation.display(),
        r.current_price,
        r.targets.mean,
        r.returns.mean_pct,
        r.targets.low,
        r.targets.high,
        r.returns.low_pct,
        r.returns.high_pct,
    );
    let _ = writeln!(
        out,
        "    analysts {:.1}/5.0 ({})  RSI {}  SMA {} / {}  trend {}",
        r.analyst.mean,
        r.analyst.analyst_count,
        fmt_opt(r.indicators.rsi),
        fmt_opt(r.indicators.sma_short),
        fmt_opt(r.indicators.sma_long),
        r.trend,
    );
    for reason in &r.recommendation.reasons {
        let _ = writeln!(out, "      - {reason}");
    }
    let _ = writeln!(out, "    {} / {}", r.company.sector, r.company.industry);
    out
}

impl Presenter for TerminalPresenter {
    fn present(&self, records: &[&StockRecord]) {
        if records.is_empty() {
            return self.no_results();
        }
        for (i, record) in records.iter().enumerate() {
            print!("{}", render_record(i + 1, record));
        }
        tracing::info!(shown = records.len(), "results presented");
    }

    fn no_results(&self) {
        println!("{NO_RESULTS_MESSAGE}");
    }
}
