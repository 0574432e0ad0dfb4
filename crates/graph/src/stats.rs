use crate::errors::{GraphError, Result};

/// Median of a sample
///
/// Even-length samples take the mean of the two middle values. An empty
/// sample has no median.
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(GraphError::EmptySample);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n % 2 == 1 {
        Ok(sorted[n / 2])
    } else {
        Ok((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_length() {
        assert_eq!(median(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
        assert_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
    }

    #[test]
    fn test_even_length_takes_mean() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 2.5);
        assert_eq!(median(&[0.9, 0.1]).unwrap(), 0.5);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(median(&[]), Err(GraphError::EmptySample)));
    }
}
