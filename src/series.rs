//! Scan primitives shared by the snapshot and event aggregations.

/// Replace gaps with the last seen value, scanning strictly left to right.
/// The running value starts at 0, so leading gaps resolve to 0.
pub fn forward_fill(values: &[Option<f64>]) -> Vec<f64> {
    let mut last_seen = 0.0;
    values
        .iter()
        .map(|value| {
            if let Some(v) = *value {
                last_seen = v;
            }
            last_seen
        })
        .collect()
}

/// Trailing fixed-window mean. Index `i` holds the mean of
/// `values[i - window + 1 ..= i]` once the window is full, `None` before
/// that. No partial-window averages.
pub fn rolling_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if window == 0 || i + 1 < window {
                None
            } else {
                let slice = &values[i + 1 - window..=i];
                Some(slice.iter().sum::<f64>() / window as f64)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_fill_carries_last_value() {
        let filled = forward_fill(&[Some(100.0), None, None, Some(200.0)]);
        assert_eq!(filled, vec![100.0, 100.0, 100.0, 200.0]);
    }

    #[test]
    fn test_forward_fill_leading_gaps_are_zero() {
        let filled = forward_fill(&[None, None, Some(100.0)]);
        assert_eq!(filled, vec![0.0, 0.0, 100.0]);
    }

    #[test]
    fn test_forward_fill_empty() {
        assert!(forward_fill(&[]).is_empty());
    }

    #[test]
    fn test_rolling_average_window_edges() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0];
        let averages = rolling_average(&values, 6);

        assert_eq!(averages.len(), values.len());
        for average in averages.iter().take(5) {
            assert!(average.is_none());
        }
        assert_eq!(averages[5], Some(35.0));
        assert_eq!(averages[6], Some(45.0));
        assert_eq!(averages[7], Some(55.0));
    }

    #[test]
    fn test_rolling_average_window_of_one() {
        let averages = rolling_average(&[5.0, 7.0], 1);
        assert_eq!(averages, vec![Some(5.0), Some(7.0)]);
    }

    #[test]
    fn test_rolling_average_window_larger_than_input() {
        let averages = rolling_average(&[5.0, 7.0], 6);
        assert_eq!(averages, vec![None, None]);
    }
}
