//! Sentiment normalization and color classification.
//!
//! Maps final sector performance (a percent) onto a bounded score in
//! [-1, 1] via a configured linear scale, then into the five-tier color
//! and its trading signal.

use crate::config::CalcConfig;
use crate::types::{SentimentColor, TradingSignal};

/// Normalized sentiment with its discrete classification.
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    /// Bounded sentiment score in [-1, 1].
    pub score: f64,
    /// Five-tier color.
    pub color: SentimentColor,
    /// Trading signal mapped from the color.
    pub signal: TradingSignal,
}

/// Normalize a final performance percent and classify it.
pub fn classify(final_performance: f64, calc: &CalcConfig) -> Classification {
    let scale = if calc.normalization_scale_pct > 0.0 {
        calc.normalization_scale_pct
    } else {
        1.0
    };
    let score = (final_performance / scale).clamp(-1.0, 1.0);
    let color = SentimentColor::from_score(score);

    Classification {
        score,
        color,
        signal: color.signal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_normalization() {
        let calc = CalcConfig::default(); // scale: 5.0
        assert!((classify(2.5, &calc).score - 0.5).abs() < 1e-9);
        assert!((classify(-2.5, &calc).score - -0.5).abs() < 1e-9);
        assert_eq!(classify(0.0, &calc).score, 0.0);
    }

    #[test]
    fn test_score_is_bounded() {
        let calc = CalcConfig::default();
        assert_eq!(classify(100.0, &calc).score, 1.0);
        assert_eq!(classify(-100.0, &calc).score, -1.0);
    }

    #[test]
    fn test_classification_flows_to_signal() {
        let calc = CalcConfig::default();

        let deep_red = classify(-4.0, &calc);
        assert_eq!(deep_red.color, SentimentColor::DarkRed);
        assert_eq!(deep_red.signal, TradingSignal::PrimeShortingEnvironment);

        let neutral = classify(0.5, &calc);
        assert_eq!(neutral.color, SentimentColor::BlueNeutral);
        assert_eq!(neutral.signal, TradingSignal::NeutralCautious);

        let strong = classify(4.0, &calc);
        assert_eq!(strong.color, SentimentColor::DarkGreen);
        assert_eq!(strong.signal, TradingSignal::DoNotShort);
    }
}
