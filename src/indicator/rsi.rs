use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, close_prices};
use crate::model::Bar;

/// Neutral reading used when a window holds neither gains nor losses.
const FLAT_WINDOW_RSI: f64 = 50.0;

/// RSI (Relative Strength Index) with simple-mean averaging of gains and losses.
///
/// Each output value covers a trailing window of `period` price changes, so
/// `period + 1` closes yield the first value.
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }

    /// Calculate RSI values from a close-price slice.
    pub fn calculate_prices(&self, prices: &[f64]) -> Result<Vec<f64>, Report<IndicatorError>> {
        if prices.len() < self.required_bars() {
            bail!(IndicatorError::InsufficientData {
                required: self.required_bars(),
                available: prices.len(),
            });
        }

        let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
        let gains: Vec<f64> = deltas.iter().map(|&d| d.max(0.0)).collect();
        let losses: Vec<f64> = deltas.iter().map(|&d| (-d).max(0.0)).collect();

        let period = self.period as f64;
        Ok(gains
            .windows(self.period)
            .zip(losses.windows(self.period))
            .map(|(g, l)| {
                let avg_gain = g.iter().sum::<f64>() / period;
                let avg_loss = l.iter().sum::<f64>() / period;
                rsi_value(avg_gain, avg_loss)
            })
            .collect())
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn required_bars(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, bars: &[Bar]) -> Result<Vec<f64>, Report<IndicatorError>> {
        self.calculate_prices(&close_prices(bars))
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return FLAT_WINDOW_RSI;
        }
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::tests::bars_from_closes;

    #[test]
    fn rsi_insufficient_data() {
        let rsi = Rsi::new(14).unwrap();
        let bars = bars_from_closes(&[1.0; 14]);
        assert!(rsi.calculate(&bars).is_err());
    }

    #[test]
    fn rsi_period_zero_invalid() {
        assert!(Rsi::new(0).is_err());
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let rsi = Rsi::new(3).unwrap();
        let bars = bars_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        let values = rsi.calculate(&bars).unwrap();
        assert_eq!(values, vec![100.0]);
    }

    #[test]
    fn rsi_gains_without_losses_returns_100() {
        let rsi = Rsi::new(3).unwrap();
        // deltas 0, 0, +1: avg_loss = 0 with some gain
        let values = rsi.calculate_prices(&[10.0, 10.0, 10.0, 11.0]).unwrap();
        assert_eq!(values, vec![100.0]);
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let rsi = Rsi::new(3).unwrap();
        let values = rsi.calculate_prices(&[4.0, 3.0, 2.0, 1.0]).unwrap();
        assert!(values[0].abs() < 1e-9);
    }

    #[test]
    fn rsi_flat_series_returns_50() {
        let rsi = Rsi::new(14).unwrap();
        let values = rsi.calculate_prices(&[100.0; 20]).unwrap();
        assert!(values.iter().all(|&v| v == 50.0));
    }

    #[test]
    fn rsi_known_value() {
        let rsi = Rsi::new(3).unwrap();
        // deltas +1, -1, +1 -> avg_gain 2/3, avg_loss 1/3 -> rs 2 -> 66.67
        let values = rsi.calculate_prices(&[1.0, 2.0, 1.0, 2.0]).unwrap();
        assert!((values[0] - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_window_slides_to_latest_point() {
        let rsi = Rsi::new(2).unwrap();
        // deltas +1, +1, -2: first window all gains, last window +1/-2
        let values = rsi.calculate_prices(&[1.0, 2.0, 3.0, 1.0]).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], 100.0);
        // avg_gain 0.5, avg_loss 1.0 -> rs 0.5 -> 33.33
        assert!((values[1] - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_output_length() {
        let rsi = Rsi::new(14).unwrap();
        let values = rsi.calculate_prices(&[100.0_f64; 20]).unwrap();
        // 20 prices -> 19 deltas -> 6 windows of 14
        assert_eq!(values.len(), 20 - 14);
    }
}
