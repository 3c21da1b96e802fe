//! Bundle cost allocation: equal, price-weighted, and user-entered splits

use crate::error::{GameledgerError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tolerance when comparing a sum of per-title amounts to the aggregate
pub const SPLIT_TOLERANCE: f64 = 0.01;

/// One title's share of a bundle's aggregate cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostShare {
    pub title: String,
    pub amount: f64,
}

/// Result of validating a manual split against the aggregate
#[derive(Debug, Clone, PartialEq)]
pub enum SplitCheck {
    /// Entered amounts sum to the aggregate within tolerance
    Balanced,
    /// Sum deviates beyond tolerance; surfaced to the user, not rejected
    Mismatch { entered: f64, difference: f64 },
}

/// Terminal state of handling one bundle purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleOutcome {
    Equal,
    Weighted,
    Manual,
    BaseGamePlusAddons,
    Cancelled,
}

/// Divide `aggregate` evenly across `titles`.
///
/// Shares are plain division and may not sum to the aggregate exactly;
/// callers validating the total must allow `SPLIT_TOLERANCE` per title.
#[must_use]
pub fn equal_split(titles: &[String], aggregate: f64) -> Vec<CostShare> {
    if titles.is_empty() {
        return Vec::new();
    }
    let amount = aggregate / titles.len() as f64;
    titles
        .iter()
        .map(|title| CostShare {
            title: title.clone(),
            amount,
        })
        .collect()
}

/// Allocate `aggregate` across titles in proportion to their reference
/// prices.
///
/// # Errors
/// Returns a validation error if the reference prices sum to zero or less;
/// a partial weighted allocation is never produced.
pub fn weighted_split(priced_titles: &[(String, f64)], aggregate: f64) -> Result<Vec<CostShare>> {
    let total_value: f64 = priced_titles.iter().map(|(_, price)| price).sum();
    if total_value <= 0.0 {
        return Err(GameledgerError::validation(
            "reference prices sum to zero; weighted split is inapplicable",
        ));
    }

    Ok(priced_titles
        .iter()
        .map(|(title, price)| {
            let weight = price / total_value;
            let amount = aggregate * weight;
            debug!(%title, price, weight, amount, "weighted share");
            CostShare {
                title: title.clone(),
                amount,
            }
        })
        .collect())
}

/// Validate user-entered shares against the aggregate.
///
/// Negative amounts are rejected outright; a sum that misses the aggregate
/// by more than `SPLIT_TOLERANCE` comes back as a `Mismatch` for the caller
/// to confirm with the user.
///
/// # Errors
/// Returns a validation error if any share is negative
pub fn check_manual_split(shares: &[CostShare], aggregate: f64) -> Result<SplitCheck> {
    for share in shares {
        if share.amount < 0.0 {
            return Err(GameledgerError::validation(format!(
                "negative amount {:.2} entered for '{}'",
                share.amount, share.title
            )));
        }
    }

    let entered: f64 = shares.iter().map(|share| share.amount).sum();
    let difference = entered - aggregate;
    if difference.abs() > SPLIT_TOLERANCE {
        Ok(SplitCheck::Mismatch {
            entered,
            difference,
        })
    } else {
        Ok(SplitCheck::Balanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_equal_split_sums_within_tolerance() {
        let titles = titles(&["A", "B", "C"]);
        let shares = equal_split(&titles, 10.0);
        assert_eq!(shares.len(), 3);
        let sum: f64 = shares.iter().map(|s| s.amount).sum();
        assert!((sum - 10.0).abs() < SPLIT_TOLERANCE * 3.0);
    }

    #[test]
    fn test_equal_split_empty() {
        assert!(equal_split(&[], 10.0).is_empty());
    }

    #[test]
    fn test_weighted_split_proportional() {
        let priced = vec![("A".to_string(), 30.0), ("B".to_string(), 10.0)];
        let shares = weighted_split(&priced, 20.0).unwrap();
        assert!((shares[0].amount - 15.0).abs() < 1e-9);
        assert!((shares[1].amount - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_split_equal_prices_degenerates_to_equal() {
        let priced = vec![
            ("A".to_string(), 19.99),
            ("B".to_string(), 19.99),
            ("C".to_string(), 19.99),
        ];
        let shares = weighted_split(&priced, 30.0).unwrap();
        for share in &shares {
            assert!((share.amount - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_weighted_split_zero_value_fails() {
        let priced = vec![("A".to_string(), 0.0), ("B".to_string(), 0.0)];
        assert!(weighted_split(&priced, 20.0).is_err());
        assert!(weighted_split(&[], 20.0).is_err());
    }

    #[test]
    fn test_manual_split_balanced() {
        let shares = vec![
            CostShare {
                title: "A".to_string(),
                amount: 7.0,
            },
            CostShare {
                title: "B".to_string(),
                amount: 3.0,
            },
        ];
        assert_eq!(check_manual_split(&shares, 10.0).unwrap(), SplitCheck::Balanced);
        // Off by less than a cent still balances.
        assert_eq!(
            check_manual_split(&shares, 10.005).unwrap(),
            SplitCheck::Balanced
        );
    }

    #[test]
    fn test_manual_split_mismatch_is_not_an_error() {
        let shares = vec![CostShare {
            title: "A".to_string(),
            amount: 12.0,
        }];
        match check_manual_split(&shares, 10.0).unwrap() {
            SplitCheck::Mismatch {
                entered,
                difference,
            } => {
                assert!((entered - 12.0).abs() < 1e-9);
                assert!((difference - 2.0).abs() < 1e-9);
            }
            SplitCheck::Balanced => panic!("expected a mismatch"),
        }
    }

    #[test]
    fn test_manual_split_rejects_negative_amounts() {
        let shares = vec![CostShare {
            title: "A".to_string(),
            amount: -1.0,
        }];
        assert!(check_manual_split(&shares, 10.0).is_err());
    }
}
