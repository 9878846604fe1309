use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, close_prices};
use crate::model::Bar;

fn checked_window(window: usize) -> Result<usize, Report<IndicatorError>> {
    if window == 0 {
        bail!(IndicatorError::InvalidParameter {
            name: "window must be > 0".into(),
        });
    }
    Ok(window)
}

fn ensure_filled(prices: &[f64], window: usize) -> Result<(), Report<IndicatorError>> {
    if prices.len() < window {
        bail!(IndicatorError::InsufficientData {
            required: window,
            available: prices.len(),
        });
    }
    Ok(())
}

/// Trailing arithmetic mean over `window` closes.
pub struct Sma {
    window: usize,
}

impl Sma {
    pub fn new(window: usize) -> Result<Self, Report<IndicatorError>> {
        Ok(Self {
            window: checked_window(window)?,
        })
    }

    /// One mean per full window, oldest first.
    ///
    /// Single pass: the running sum gains the entering close and drops the
    /// leaving one.
    pub fn calculate_prices(&self, prices: &[f64]) -> Result<Vec<f64>, Report<IndicatorError>> {
        ensure_filled(prices, self.window)?;

        let n = self.window as f64;
        let mut sum: f64 = prices[..self.window].iter().sum();
        let mut means = Vec::with_capacity(prices.len() - self.window + 1);
        means.push(sum / n);
        for (leaving, entering) in prices.iter().zip(&prices[self.window..]) {
            sum += entering - leaving;
            means.push(sum / n);
        }
        Ok(means)
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "sma"
    }

    fn required_bars(&self) -> usize {
        self.window
    }

    fn calculate(&self, bars: &[Bar]) -> Result<Vec<f64>, Report<IndicatorError>> {
        self.calculate_prices(&close_prices(bars))
    }
}

/// Exponential moving average, smoothing `2 / (window + 1)`.
///
/// The first value is the SMA of the first `window` closes.
pub struct Ema {
    window: usize,
}

impl Ema {
    pub fn new(window: usize) -> Result<Self, Report<IndicatorError>> {
        Ok(Self {
            window: checked_window(window)?,
        })
    }

    fn alpha(&self) -> f64 {
        2.0 / (self.window as f64 + 1.0)
    }

    pub fn calculate_prices(&self, prices: &[f64]) -> Result<Vec<f64>, Report<IndicatorError>> {
        ensure_filled(prices, self.window)?;

        let (head, tail) = prices.split_at(self.window);
        let seed = head.iter().sum::<f64>() / self.window as f64;
        let alpha = self.alpha();
        let smoothed = tail.iter().scan(seed, |ema, &close| {
            *ema += alpha * (close - *ema);
            Some(*ema)
        });
        Ok(std::iter::once(seed).chain(smoothed).collect())
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "ema"
    }

    fn required_bars(&self) -> usize {
        self.window
    }

    fn calculate(&self, bars: &[Bar]) -> Result<Vec<f64>, Report<IndicatorError>> {
        self.calculate_prices(&close_prices(bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::tests::bars_from_closes;

    #[test]
    fn zero_window_rejected() {
        assert!(Sma::new(0).is_err());
        assert!(Ema::new(0).is_err());
    }

    #[test]
    fn short_series_is_insufficient() {
        let err = Sma::new(5).unwrap().calculate_prices(&[1.0; 4]).unwrap_err();
        assert!(matches!(
            err.current_context(),
            IndicatorError::InsufficientData {
                required: 5,
                available: 4
            }
        ));
        assert!(Ema::new(5).unwrap().calculate_prices(&[1.0; 4]).is_err());
    }

    #[test]
    fn sma_rolls_one_close_at_a_time() {
        let means = Sma::new(3)
            .unwrap()
            .calculate_prices(&[1.0, 2.0, 3.0, 4.0, 11.0])
            .unwrap();
        assert_eq!(means.len(), 3);
        assert!((means[0] - 2.0).abs() < 1e-9);
        assert!((means[1] - 3.0).abs() < 1e-9);
        assert!((means[2] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn rolling_sum_matches_direct_mean_on_long_series() {
        let closes: Vec<f64> = (0..500).map(|i| 100.0 + (i as f64 * 0.37).sin() * 12.5).collect();
        let means = Sma::new(20).unwrap().calculate_prices(&closes).unwrap();
        for (i, mean) in means.iter().enumerate() {
            let direct = closes[i..i + 20].iter().sum::<f64>() / 20.0;
            assert!((mean - direct).abs() < 1e-9, "window {i}");
        }
    }

    #[test]
    fn sma_aligned_leaves_first_window_minus_one_undefined() {
        let sma = Sma::new(3).unwrap();
        let aligned = sma.aligned(&bars_from_closes(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(aligned, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn ema_seed_is_the_first_sma() {
        let values = Ema::new(3).unwrap().calculate_prices(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        // seed (1+2+3)/3 = 2, then 2 + 0.5 * (4 - 2) = 3
        assert_eq!(values, vec![2.0, 3.0]);
    }

    #[test]
    fn ema_converges_on_a_constant_close() {
        let mut closes = vec![0.0; 4];
        closes.extend([10.0; 40]);
        let latest = Ema::new(4).unwrap().latest(&bars_from_closes(&closes)).unwrap();
        assert!((latest - 10.0).abs() < 1e-6);
    }
}
