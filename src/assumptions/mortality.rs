//! Mortality decrement model built from a one-year mortality rate table
//!
//! The table separates:
//! - Raw one-year mortality rates qx by age (validated at construction)
//! - Derived cohort survivorship lx (anchored at 1 at the first age)
//! - Derived survival and death probability surfaces, indexed
//!   [duration][age offset]
//!
//! The surfaces are banded matrices built once when the table is constructed:
//! row t of the survival surface is the t-year-shifted survivorship ratio, so
//! any (age, duration) query is a single lookup rather than a cumulative
//! product. One-time cost is O(n^2) in the table length; per-policy queries
//! are O(1) amortized.

use crate::error::ModelError;
use crate::matrix::Matrix;

/// Immutable mortality table with memoized probability surfaces.
///
/// Safe to share read-only across any number of concurrent consumers; all
/// queries are pure functions of the construction-time inputs.
#[derive(Debug, Clone)]
pub struct MortalityTable {
    /// Tabulated ages, strictly increasing
    ages: Vec<u32>,

    /// One-year mortality rate per age, each in [0, 1]; the final rate is 1
    qx: Vec<f64>,

    /// Table name, e.g. "AM92"
    name: String,

    /// Cohort survivorship: lx[k] = probability of surviving k years from the
    /// first tabulated age. Length n + 1, lx[0] = 1, lx[n] = 0.
    lx: Vec<f64>,

    /// survival[t][c] = probability of surviving t years from age index c
    survival: Matrix,

    /// death[t][c] = probability of dying in year t exactly, from age index c
    death: Matrix,
}

impl MortalityTable {
    /// Build a table from ages and one-year rates, validating and memoizing
    /// the probability surfaces.
    pub fn new(ages: Vec<u32>, qx: Vec<f64>, name: impl Into<String>) -> Result<Self, ModelError> {
        Self::validate(&ages, &qx)?;

        let n = qx.len();
        let mut lx = Vec::with_capacity(n + 1);
        lx.push(1.0);
        for &rate in &qx {
            let last = *lx.last().unwrap();
            lx.push(last * (1.0 - rate));
        }

        // Banded surfaces: entries with c + t > n are zero (the cohort is
        // extinct past the terminal age).
        let mut survival = Matrix::zeros(n + 1, n);
        let mut death = Matrix::zeros(n + 1, n);
        for c in 0..n {
            for t in 0..=(n - c) {
                survival.set(t, c, lx[c + t] / lx[c]);
                if t >= 1 {
                    death.set(t, c, qx[c + t - 1] * survival.get(t - 1, c));
                }
            }
        }

        Ok(Self {
            ages,
            qx,
            name: name.into(),
            lx,
            survival,
            death,
        })
    }

    fn validate(ages: &[u32], qx: &[f64]) -> Result<(), ModelError> {
        if ages.is_empty() || qx.is_empty() {
            return Err(ModelError::Validation(
                "mortality table must not be empty".into(),
            ));
        }
        if ages.len() != qx.len() {
            return Err(ModelError::Validation(
                "ages and qx must have the same length".into(),
            ));
        }
        if !ages.windows(2).all(|w| w[0] < w[1]) {
            return Err(ModelError::Validation(
                "ages must be strictly increasing".into(),
            ));
        }
        if qx.iter().any(|&q| !(0.0..=1.0).contains(&q)) {
            return Err(ModelError::Validation("qx must be between 0 and 1".into()));
        }
        if *qx.last().unwrap() != 1.0 {
            return Err(ModelError::Validation("terminal qx value must be 1".into()));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_age(&self) -> u32 {
        self.ages[0]
    }

    pub fn max_age(&self) -> u32 {
        *self.ages.last().unwrap()
    }

    /// Number of tabulated ages
    pub fn len(&self) -> usize {
        self.qx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qx.is_empty()
    }

    /// Cohort survivorship curve, length `len() + 1`, anchored at 1
    pub fn lx(&self) -> &[f64] {
        &self.lx
    }

    /// Years until the table runs out from `age` (clamped), including the
    /// terminal year in which death is certain. Used to resolve open-ended
    /// policy terms.
    pub fn remaining_lifetime(&self, age: u32) -> u32 {
        self.max_age() - self.clamp_age(age) + 1
    }

    fn clamp_age(&self, age: u32) -> u32 {
        age.clamp(self.min_age(), self.max_age())
    }

    fn age_index(&self, age: u32) -> usize {
        (self.clamp_age(age) - self.min_age()) as usize
    }

    fn clamp_duration(&self, duration: u32) -> usize {
        (duration as usize).min(self.len())
    }

    fn check_lengths(&self, ages: &[u32], durations: &[u32]) -> Result<(), ModelError> {
        if ages.len() != durations.len() {
            return Err(ModelError::Input(format!(
                "ages ({}) and durations ({}) must have the same length",
                ages.len(),
                durations.len()
            )));
        }
        Ok(())
    }

    /// Probability of surviving exactly `durations[j]` years from `ages[j]`,
    /// one value per policy.
    pub fn survival_probability(
        &self,
        ages: &[u32],
        durations: &[u32],
    ) -> Result<Vec<f64>, ModelError> {
        self.check_lengths(ages, durations)?;
        Ok(ages
            .iter()
            .zip(durations)
            .map(|(&age, &dur)| {
                self.survival
                    .get(self.clamp_duration(dur), self.age_index(age))
            })
            .collect())
    }

    /// Full survival path: a [max duration x policies] matrix where row t - 1
    /// holds the probability of surviving t years, per policy. Entries beyond
    /// a policy's own duration are masked to zero, so ragged batches never
    /// leak probability past their own horizon.
    pub fn survival_path(&self, ages: &[u32], durations: &[u32]) -> Result<Matrix, ModelError> {
        self.check_lengths(ages, durations)?;
        Ok(self.path(&self.survival, ages, durations))
    }

    /// Probability of dying in year `durations[j]` exactly (between years
    /// `durations[j] - 1` and `durations[j]`) from `ages[j]`.
    pub fn death_probability(
        &self,
        ages: &[u32],
        durations: &[u32],
    ) -> Result<Vec<f64>, ModelError> {
        self.check_lengths(ages, durations)?;
        Ok(ages
            .iter()
            .zip(durations)
            .map(|(&age, &dur)| {
                self.death
                    .get(self.clamp_duration(dur), self.age_index(age))
            })
            .collect())
    }

    /// Full death path: row t - 1 holds the probability of dying in year t,
    /// per policy, masked to zero beyond each policy's own duration.
    pub fn death_path(&self, ages: &[u32], durations: &[u32]) -> Result<Matrix, ModelError> {
        self.check_lengths(ages, durations)?;
        Ok(self.path(&self.death, ages, durations))
    }

    fn path(&self, surface: &Matrix, ages: &[u32], durations: &[u32]) -> Matrix {
        let clamped: Vec<usize> = durations.iter().map(|&d| self.clamp_duration(d)).collect();
        let max_duration = clamped.iter().copied().max().unwrap_or(0);

        let mut out = Matrix::zeros(max_duration, ages.len());
        for (col, (&age, &dur)) in ages.iter().zip(&clamped).enumerate() {
            let idx = self.age_index(age);
            for t in 1..=dur {
                out.set(t - 1, col, surface.get(t, idx));
            }
        }
        out
    }
}

#[cfg(test)]
pub(crate) fn am92_subset() -> MortalityTable {
    // AM92 ultimate rates for ages 30..=77, terminal rate forced to 1 so the
    // cohort is extinct at the table boundary.
    let ages: Vec<u32> = (30..=77).collect();
    let qx = vec![
        0.000582, 0.000599, 0.000617, 0.000638, // 30-33
        0.000660, 0.000689, 0.000724, // 34-36
        0.000765, 0.000813, 0.000870, 0.000936, 0.001014, 0.001104, 0.001208, 0.001327,
        0.001465, // 37-45
        0.001622, // 46
        0.001802, 0.002008, 0.002241, // 47-49
        0.002508, 0.002809, 0.003152, 0.003539, 0.003976, 0.004469, 0.005025, 0.005650,
        0.006352, 0.007140, 0.008022, 0.009009, 0.010112, 0.011344, 0.012716, 0.014243,
        0.015940, 0.017824, 0.019913, 0.022226, 0.024783, 0.027607, 0.030720, // 50-72
        0.034144, 0.037911, 0.042046, // 73-75
        0.046589, // 76
        1.0, // 77 terminal
    ];
    MortalityTable::new(ages, qx, "AM92 subset").unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_validation_rules() {
        // non-monotonic ages
        let err = MortalityTable::new(vec![30, 30, 32], vec![0.1, 0.2, 1.0], "bad").unwrap_err();
        assert!(matches!(err, ModelError::Validation(_)));

        // rate out of range
        let err = MortalityTable::new(vec![30, 31, 32], vec![0.1, 1.2, 1.0], "bad").unwrap_err();
        assert!(matches!(err, ModelError::Validation(_)));

        // missing terminal rate
        let err = MortalityTable::new(vec![30, 31, 32], vec![0.1, 0.2, 0.9], "bad").unwrap_err();
        assert!(matches!(err, ModelError::Validation(_)));

        // mismatched lengths
        let err = MortalityTable::new(vec![30, 31], vec![0.1, 0.2, 1.0], "bad").unwrap_err();
        assert!(matches!(err, ModelError::Validation(_)));
    }

    #[test]
    fn test_lx_anchoring() {
        let table = MortalityTable::new(vec![60, 61, 62], vec![0.1, 0.2, 1.0], "tiny").unwrap();
        let lx = table.lx();
        assert_eq!(lx.len(), 4);
        assert_eq!(lx[0], 1.0);
        assert_abs_diff_eq!(lx[1], 0.9, epsilon = 1e-12);
        assert_abs_diff_eq!(lx[2], 0.72, epsilon = 1e-12);
        assert_abs_diff_eq!(lx[3], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_survival_terminal_regression() {
        let table = am92_subset();

        let actual = table
            .survival_probability(&[34, 47, 73], &[3, 3, 3])
            .unwrap();
        let expected = [0.99792843, 0.99396115, 0.89016863];
        for (a, e) in actual.iter().zip(expected) {
            assert_abs_diff_eq!(*a, e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_death_in_year_regression() {
        let table = am92_subset();

        let actual = table.death_probability(&[34, 47, 73], &[3, 3, 3]).unwrap();
        let expected = [0.00072302, 0.00223247, 0.0390708];
        for (a, e) in actual.iter().zip(expected) {
            assert_abs_diff_eq!(*a, e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_full_paths_match_reference_grid() {
        let table = am92_subset();

        let surv = table.survival_path(&[34, 47, 73], &[3, 3, 3]).unwrap();
        assert_eq!((surv.rows(), surv.cols()), (3, 3));
        let surv_expected = [
            [0.99934, 0.998198, 0.965856],
            [0.99865145, 0.99619362, 0.92923943],
            [0.99792843, 0.99396115, 0.89016863],
        ];
        for (t, row) in surv_expected.iter().enumerate() {
            for (j, e) in row.iter().enumerate() {
                assert_abs_diff_eq!(surv.get(t, j), *e, epsilon = 1e-6);
            }
        }

        let death = table.death_path(&[34, 47, 73], &[3, 3, 3]).unwrap();
        let death_expected = [
            [0.00066, 0.001802, 0.034144],
            [0.00068855, 0.00200438, 0.03661657],
            [0.00072302, 0.00223247, 0.0390708],
        ];
        for (t, row) in death_expected.iter().enumerate() {
            for (j, e) in row.iter().enumerate() {
                assert_abs_diff_eq!(death.get(t, j), *e, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_ragged_durations_masked() {
        let table = am92_subset();

        let surv = table.survival_path(&[34, 47, 73], &[1, 3, 2]).unwrap();
        assert_eq!(surv.rows(), 3);

        // Column 0 masked past duration 1, column 2 past duration 2
        assert!(surv.get(0, 0) > 0.0);
        assert_eq!(surv.get(1, 0), 0.0);
        assert_eq!(surv.get(2, 0), 0.0);
        assert!(surv.get(2, 1) > 0.0);
        assert_eq!(surv.get(2, 2), 0.0);
    }

    #[test]
    fn test_probability_mass_conservation() {
        let table = am92_subset();

        for &age in &[30u32, 45, 60, 73, 77] {
            let horizon = table.remaining_lifetime(age);
            let surv = table.survival_probability(&[age], &[horizon]).unwrap()[0];
            let deaths = table.death_path(&[age], &[horizon]).unwrap();

            let death_mass: f64 = (0..deaths.rows()).map(|t| deaths.get(t, 0)).sum();
            assert_abs_diff_eq!(surv + death_mass, 1.0, epsilon = 1e-12);
            // The terminal rate of 1 extinguishes the cohort
            assert_abs_diff_eq!(surv, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_partial_mass_identity() {
        // sum of death-in-year through T equals 1 - survival to T, for any T
        let table = am92_subset();

        for t in [1u32, 5, 10, 20] {
            let surv = table.survival_probability(&[50], &[t]).unwrap()[0];
            let deaths = table.death_path(&[50], &[t]).unwrap();
            let death_mass: f64 = (0..deaths.rows()).map(|r| deaths.get(r, 0)).sum();
            assert_abs_diff_eq!(death_mass, 1.0 - surv, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_survival_monotonic_in_duration() {
        let table = am92_subset();
        let horizon = table.remaining_lifetime(40);

        let mut previous = 1.0;
        for t in 1..=horizon {
            let s = table.survival_probability(&[40], &[t]).unwrap()[0];
            assert!(s <= previous, "survival increased at duration {}", t);
            previous = s;
        }
    }

    #[test]
    fn test_clamp_idempotence() {
        let table = am92_subset();

        // Above the table maximum behaves exactly as the maximum
        let high = table.survival_probability(&[200], &[2]).unwrap();
        let max = table
            .survival_probability(&[table.max_age()], &[2])
            .unwrap();
        assert_eq!(high, max);

        // Below the minimum behaves as the minimum
        let low = table.death_probability(&[10], &[2]).unwrap();
        let min = table.death_probability(&[table.min_age()], &[2]).unwrap();
        assert_eq!(low, min);

        // Durations past the table clamp to the full span
        let far = table.survival_probability(&[30], &[10_000]).unwrap()[0];
        assert_eq!(far, 0.0);
    }

    #[test]
    fn test_remaining_lifetime() {
        let table = am92_subset();
        assert_eq!(table.remaining_lifetime(77), 1);
        assert_eq!(table.remaining_lifetime(73), 5);
        assert_eq!(table.remaining_lifetime(30), 48);
        // Clamped on both sides
        assert_eq!(table.remaining_lifetime(120), 1);
        assert_eq!(table.remaining_lifetime(0), 48);
    }

    #[test]
    fn test_length_mismatch_is_input_error() {
        let table = am92_subset();
        let err = table.survival_probability(&[34, 47], &[3]).unwrap_err();
        assert!(matches!(err, ModelError::Input(_)));
    }
}
