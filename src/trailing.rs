//! Expanding-window averages of a single statistic.
//!
//! For fight `i` (0-based) the pre-fight average is the mean of fights
//! `0..i`, i.e. the form a fighter carries into that fight. Fight 0 has no
//! history and stays undefined here; fight 1 carries exactly `series[0]`.
//! The post-fight average of fight `i` is the mean of `0..=i`, which is the
//! pre-fight average of fight `i + 1`.

use crate::error::{FeatureError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct TrailingAverages {
    /// `post[i]` = mean of `series[0..=i]`
    post: Vec<f64>,
}

impl TrailingAverages {
    /// Needs at least two values; shorter histories are the caller's to skip.
    pub fn build(series: &[f64]) -> Result<Self> {
        if series.len() < 2 {
            return Err(FeatureError::InsufficientHistory { len: series.len() });
        }
        let mut sum = 0.0;
        let post = series
            .iter()
            .enumerate()
            .map(|(i, v)| {
                sum += v;
                sum / (i + 1) as f64
            })
            .collect();
        Ok(TrailingAverages { post })
    }

    pub fn len(&self) -> usize {
        self.post.len()
    }

    pub fn is_empty(&self) -> bool {
        self.post.is_empty()
    }

    /// Average entering fight `i`; `None` for fight 0 or out of range.
    pub fn pre(&self, i: usize) -> Option<f64> {
        if i == 0 || i >= self.post.len() {
            return None;
        }
        Some(self.post[i - 1])
    }

    /// Average after fight `i`.
    pub fn post(&self, i: usize) -> Option<f64> {
        self.post.get(i).copied()
    }

    /// The first defined pre-fight value, equal to `series[0]`.
    pub fn entering_second(&self) -> f64 {
        self.post[0]
    }

    /// Pre-fight averages for every fight, index 0 undefined.
    pub fn pre_fight(&self) -> Vec<Option<f64>> {
        (0..self.len()).map(|i| self.pre(i)).collect()
    }

    /// Aligned `(pre, post)` for fights `1..len`.
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.post.windows(2).map(|w| (w[0], w[1]))
    }

    /// `(pre[i-1], pre[i])` for fights `2..len`: the average entering one
    /// recorded fight against the average entering the next.
    pub fn transitions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let end = self.post.len() - 1;
        self.post[..end].windows(2).map(|w| (w[0], w[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn three_fight_scenario() {
        let avgs = TrailingAverages::build(&[0.40, 0.60, 0.50]).unwrap();
        assert_eq!(avgs.pre(0), None);
        assert_eq!(avgs.pre(1), Some(0.40));
        assert!(close(avgs.pre(2).unwrap(), 0.50));
        assert_eq!(avgs.pre(3), None);
    }

    #[test]
    fn second_fight_carries_first_value_exactly() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let len = rng.random_range(2..12);
            let series: Vec<f64> = (0..len).map(|_| rng.random::<f64>()).collect();
            let avgs = TrailingAverages::build(&series).unwrap();
            assert_eq!(avgs.pre(1), Some(series[0]));
            assert_eq!(avgs.entering_second(), series[0]);
        }
    }

    #[test]
    fn pre_fight_average_is_mean_of_prior_fights() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let len = rng.random_range(3..20);
            let series: Vec<f64> = (0..len).map(|_| rng.random::<f64>()).collect();
            let avgs = TrailingAverages::build(&series).unwrap();
            for i in 1..len {
                let mean = series[..i].iter().sum::<f64>() / i as f64;
                assert!((avgs.pre(i).unwrap() - mean).abs() < 1e-9, "index {i}");
            }
        }
    }

    #[test]
    fn post_is_next_pre() {
        let series = [0.2, 0.9, 0.4, 0.7, 0.1];
        let avgs = TrailingAverages::build(&series).unwrap();
        for i in 0..series.len() - 1 {
            assert_eq!(avgs.post(i), avgs.pre(i + 1));
        }
        assert!(close(avgs.post(4).unwrap(), 2.3 / 5.0));
    }

    #[test]
    fn pairs_drop_first_fight() {
        let avgs = TrailingAverages::build(&[0.40, 0.60, 0.50]).unwrap();
        let pairs: Vec<(f64, f64)> = avgs.pairs().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, 0.40);
        assert!(close(pairs[0].1, 0.50));
        assert!(close(pairs[1].0, 0.50));
        assert!(close(pairs[1].1, 0.50));
    }

    #[test]
    fn two_fights_give_one_pair_and_no_transitions() {
        let avgs = TrailingAverages::build(&[0.30, 0.70]).unwrap();
        let pairs: Vec<(f64, f64)> = avgs.pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, 0.30);
        assert!(close(pairs[0].1, 0.50));
        assert_eq!(avgs.transitions().count(), 0);
        assert_eq!(avgs.pre_fight(), vec![None, Some(0.30)]);
    }

    #[test]
    fn transitions_pair_consecutive_pre_fight_averages() {
        let series = [0.40, 0.60, 0.50, 0.30];
        let avgs = TrailingAverages::build(&series).unwrap();
        let t: Vec<(f64, f64)> = avgs.transitions().collect();
        assert_eq!(t.len(), 2);
        for (k, (x, y)) in t.into_iter().enumerate() {
            let i = k + 2;
            assert_eq!(Some(x), avgs.pre(i - 1));
            assert_eq!(Some(y), avgs.pre(i));
        }
    }

    #[test]
    fn identical_values_stay_flat() {
        let avgs = TrailingAverages::build(&[0.5; 4]).unwrap();
        assert!(avgs.pairs().all(|(pre, post)| pre == 0.5 && post == 0.5));
    }

    #[test]
    fn short_history_is_rejected() {
        assert!(matches!(
            TrailingAverages::build(&[0.5]),
            Err(FeatureError::InsufficientHistory { len: 1 })
        ));
        assert!(matches!(
            TrailingAverages::build(&[]),
            Err(FeatureError::InsufficientHistory { len: 0 })
        ));
    }
}
