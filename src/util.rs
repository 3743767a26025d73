pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;

            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}

/// Sample standard deviation (n - 1 denominator); needs at least two values.
pub fn sample_std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let data_mean = mean(data)?;
    let sum_sq = data.iter().map(|value| (value - data_mean).powi(2)).sum::<f64>();

    Some((sum_sq / (data.len() - 1) as f64).sqrt())
}

/// Inter-character intervals without the leading zero of each trace.
pub fn typing_intervals(inter_char_ms: &[i64]) -> Vec<f64> {
    inter_char_ms.iter().skip(1).map(|&ms| ms as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
        assert_eq!(mean(&[42.0]), Some(42.0));
        assert_eq!(mean(&[-10.0, 0.0, 10.0]), Some(0.0));
    }

    #[test]
    fn test_mean_empty_slice() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(
            std_dev(&[100., 120., 90., 102., 94.]),
            Some(10.322790320451151)
        );
        assert_eq!(std_dev(&[5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn test_sample_std_dev() {
        assert_eq!(sample_std_dev(&[1.0, 3.0]), Some(2f64.sqrt()));
        assert_eq!(sample_std_dev(&[5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(sample_std_dev(&[7.0]), None);
        assert_eq!(sample_std_dev(&[]), None);
    }

    #[test]
    fn test_typing_intervals_drops_first() {
        assert_eq!(typing_intervals(&[0, 250, 150]), vec![250.0, 150.0]);
        assert!(typing_intervals(&[0]).is_empty());
        assert!(typing_intervals(&[]).is_empty());
    }
}
