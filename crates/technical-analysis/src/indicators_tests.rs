#[cfg(test)]
mod tests {
    use super::super::indicators::*;

    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    fn trending_prices(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + i as f64 * 0.5 + (i as f64 * 0.9).sin() * 2.0)
            .collect()
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 0.001);
        assert!((result[1] - 3.0).abs() < 0.001);
        assert!((result[2] - 4.0).abs() < 0.001);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        assert!(sma(&data, 5).is_empty());
        assert!(sma(&data, 0).is_empty());
    }

    #[test]
    fn test_sma_real_prices() {
        let prices = sample_prices();
        let result = sma(&prices, 5);

        let expected_first = (44.34 + 44.09 + 44.15 + 43.61 + 44.33) / 5.0;
        assert!((result[0] - expected_first).abs() < 0.01);
        assert_eq!(result.len(), prices.len() - 4);
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let data = vec![22.0, 24.0, 23.0, 25.0, 26.0];
        let result = ema(&data, 3);

        assert_eq!(result.len(), 3);
        let seed = (22.0 + 24.0 + 23.0) / 3.0;
        assert!((result[0] - seed).abs() < 1e-9);
        // multiplier 0.5
        let next = (25.0 - seed) * 0.5 + seed;
        assert!((result[1] - next).abs() < 1e-9);
        assert!((result[2] - ((26.0 - next) * 0.5 + next)).abs() < 1e-9);
    }

    #[test]
    fn test_ema_empty_data() {
        let data: Vec<f64> = vec![];
        assert!(ema(&data, 5).is_empty());
        assert!(ema(&[1.0, 2.0], 5).is_empty());
    }

    #[test]
    fn test_ema_increases_with_uptrend() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let result = ema(&data, 3);

        for i in 1..result.len() {
            assert!(result[i] > result[i - 1]);
        }
    }

    #[test]
    fn test_ewm_starts_at_first_value() {
        let result = ewm(&[10.0, 20.0, 30.0], 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 10.0).abs() < 1e-9);
        assert!((result[1] - 15.0).abs() < 1e-9);
        assert!((result[2] - 22.5).abs() < 1e-9);
        assert!(ewm(&[], 3).is_empty());
    }

    #[test]
    fn test_rsi_bounds() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        assert_eq!(result.len(), prices.len() - 14);
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let data = vec![1.0, 2.0, 3.0];
        assert!(rsi(&data, 14).is_empty());
    }

    #[test]
    fn test_rsi_extremes() {
        let uptrend: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert!((rsi(&uptrend, 14).last().unwrap() - 100.0).abs() < 1e-9);

        let downtrend: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        assert!(rsi(&downtrend, 14).last().unwrap().abs() < 1e-9);

        let flat = vec![10.0; 20];
        assert!(rsi(&flat, 14).last().unwrap().is_nan());
    }

    #[test]
    fn test_rsi_first_value_uses_simple_averages() {
        // gains 1, 0, 2 ; losses 0, 1, 0 over period 3
        let data = vec![10.0, 11.0, 10.0, 12.0];
        let result = rsi(&data, 3);

        assert_eq!(result.len(), 1);
        let expected = 100.0 - 100.0 / (1.0 + 1.0 / (1.0 / 3.0));
        assert!((result[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_macd_alignment() {
        let prices = trending_prices(60);
        let result = macd(&prices, 12, 26, 9);

        assert_eq!(result.macd_line.len(), 60 - 25);
        assert_eq!(result.signal_line.len(), result.macd_line.len() - 8);
        assert_eq!(result.histogram.len(), result.signal_line.len());

        let fast = ema(&prices, 12);
        let slow = ema(&prices, 26);
        let last_macd = fast.last().unwrap() - slow.last().unwrap();
        assert!((result.macd_line.last().unwrap() - last_macd).abs() < 1e-9);
    }

    #[test]
    fn test_macd_histogram() {
        let prices = trending_prices(60);
        let result = macd(&prices, 12, 26, 9);

        let offset = result.macd_line.len() - result.signal_line.len();
        for (i, &hist) in result.histogram.iter().enumerate() {
            let expected = result.macd_line[i + offset] - result.signal_line[i];
            assert!((hist - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_macd_insufficient_data() {
        let result = macd(&sample_prices(), 12, 26, 9);
        assert!(result.macd_line.is_empty());
        assert!(result.signal_line.is_empty());

        let result = macd(&trending_prices(30), 12, 26, 9);
        assert_eq!(result.macd_line.len(), 5);
        assert!(result.signal_line.is_empty());
        assert!(result.histogram.is_empty());
    }

    #[test]
    fn test_bollinger_bands_ordering() {
        let prices = sample_prices();
        let result = bollinger_bands(&prices, 10, 2.0);

        assert_eq!(result.upper.len(), result.middle.len());
        assert_eq!(result.middle.len(), result.lower.len());
        for i in 0..result.upper.len() {
            assert!(result.upper[i] > result.middle[i]);
            assert!(result.middle[i] > result.lower[i]);
        }
    }

    #[test]
    fn test_bollinger_bands_population_std() {
        // mean 3, population variance 2
        let result = bollinger_bands(&[1.0, 2.0, 3.0, 4.0, 5.0], 5, 2.0);

        assert_eq!(result.middle.len(), 1);
        assert!((result.middle[0] - 3.0).abs() < 1e-9);
        assert!((result.upper[0] - (3.0 + 2.0 * 2f64.sqrt())).abs() < 1e-9);
        assert!((result.lower[0] - (3.0 - 2.0 * 2f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn test_bollinger_bands_flat() {
        let prices = vec![100.0; 20];
        let result = bollinger_bands(&prices, 10, 2.0);

        for i in 0..result.upper.len() {
            assert_eq!(result.upper[i], result.lower[i]);
        }
    }
}
