// 🔺 Age Distribution Synthesizer
//
// The census dataset has no per-age statistics. This module fabricates a
// deterministic breakdown of a total over an inclusive age range using a
// triangular weight curve:
//
//   weight[i] = i + 1   for i <= n / 2
//   weight[i] = n - i   otherwise
//
// persons[i] = floor(total * weight[i] / sum(weights)), then the residue
// (total - sum(persons) < n) is handed out one person at a time starting at
// the lowest age. The output must be bit-for-bit stable: sum is always exact.

use crate::error::{CensusError, Result};
use serde::{Deserialize, Serialize};

/// One row of the age table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBucket {
    pub age: i32,
    pub persons: u64,
}

/// Triangular weights for `n` ages
pub fn triangular_weights(n: usize) -> Vec<u64> {
    let mid = n / 2;
    (0..n)
        .map(|i| if i <= mid { (i + 1) as u64 } else { (n - i) as u64 })
        .collect()
}

/// Spread `total_population` over every age in `age_min..=age_max`
pub fn synthesize(total_population: u64, age_min: i32, age_max: i32) -> Result<Vec<AgeBucket>> {
    if age_max < age_min {
        return Err(CensusError::invalid_range(
            age_min,
            age_max,
            "age_max is below age_min",
        ));
    }

    let n = (i64::from(age_max) - i64::from(age_min) + 1) as usize;
    let weights = triangular_weights(n);
    let weight_sum: u128 = weights.iter().map(|&w| u128::from(w)).sum();
    let total = u128::from(total_population);

    // floor(total * w / sum) <= total, so the narrowing cast is lossless
    let mut persons: Vec<u64> = weights
        .iter()
        .map(|&w| (total * u128::from(w) / weight_sum) as u64)
        .collect();

    let allocated: u64 = persons.iter().sum();
    let mut residue = total_population - allocated;

    for slot in persons.iter_mut() {
        if residue == 0 {
            break;
        }
        *slot += 1;
        residue -= 1;
    }

    Ok((age_min..=age_max)
        .zip(persons)
        .map(|(age, persons)| AgeBucket { age, persons })
        .collect())
}
