use serde::{Deserialize, Serialize};

/// Plaintext aggregates of one question after an authorized decryption.
///
/// `frequencies[k - 1]` counts ratings equal to `k`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedStatistics {
    pub total: u32,
    pub sum_squares: u32,
    pub min: u32,
    pub max: u32,
    pub frequencies: Vec<u32>,
}

impl DecryptedStatistics {
    pub fn respondents(&self) -> u32 {
        self.frequencies.iter().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        match self.respondents() {
            0 => None,
            n => Some(self.total as f64 / n as f64),
        }
    }

    /// Population variance, `E[v²] - E[v]²`.
    pub fn variance(&self) -> Option<f64> {
        let n = self.respondents();
        let mean = self.mean()?;
        Some((self.sum_squares as f64 / n as f64 - mean * mean).max(0.0))
    }

    /// Histogram-weighted sum; equals `total` for a consistent snapshot.
    pub fn weighted_total(&self) -> u32 {
        self.frequencies
            .iter()
            .enumerate()
            .map(|(k, count)| (k as u32 + 1) * count)
            .sum()
    }

    pub fn is_consistent(&self) -> bool {
        self.weighted_total() == self.total
    }
}
