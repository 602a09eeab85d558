//! Encrypted winner determination.
//!
//! Scans a batch left to right keeping a running highest bid. A candidate
//! replaces the running highest whenever `candidate >= highest` holds under
//! encryption, so on exact ties the later bid wins. Amounts are only ever
//! handled as ciphertext handles.

use adx_fhe::{FheError, FheExecutor};
use adx_types::{Address, Bid, CiphertextHandle};

/// The winning bid of a batch. The amount is still encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWinner {
    /// Position of the winning bid in submission order
    pub index: usize,
    pub encrypted_amount: CiphertextHandle,
    pub bidder: Address,
}

/// Determine the highest bid. Returns `None` for an empty batch.
pub fn resolve_winner<F>(fhe: &F, bids: &[Bid]) -> Result<Option<ResolvedWinner>, FheError>
where
    F: FheExecutor + ?Sized,
{
    let Some(first) = bids.first() else {
        return Ok(None);
    };

    let mut highest_index = 0;
    let mut highest = first;

    for (index, candidate) in bids.iter().enumerate().skip(1) {
        let is_higher = fhe.ge(&candidate.encrypted_bid_amount, &highest.encrypted_bid_amount)?;
        if fhe.decrypt_bool(&is_higher)? {
            highest_index = index;
            highest = candidate;
        }
    }

    Ok(Some(ResolvedWinner {
        index: highest_index,
        encrypted_amount: highest.encrypted_bid_amount,
        bidder: highest.bidder,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adx_fhe::MockCoprocessor;
    use adx_types::EncryptedBool;
    use std::cell::Cell;

    /// Counts comparisons performed through the capability.
    struct CountingFhe {
        inner: MockCoprocessor,
        comparisons: Cell<usize>,
    }

    impl FheExecutor for CountingFhe {
        fn is_initialized(&self, handle: &CiphertextHandle) -> bool {
            self.inner.is_initialized(handle)
        }

        fn ge(
            &self,
            lhs: &CiphertextHandle,
            rhs: &CiphertextHandle,
        ) -> Result<EncryptedBool, FheError> {
            self.comparisons.set(self.comparisons.get() + 1);
            self.inner.ge(lhs, rhs)
        }

        fn decrypt_bool(&self, value: &EncryptedBool) -> Result<bool, FheError> {
            self.inner.decrypt_bool(value)
        }
    }

    fn counting() -> CountingFhe {
        CountingFhe {
            inner: MockCoprocessor::new(),
            comparisons: Cell::new(0),
        }
    }

    fn bids_with_amounts(fhe: &MockCoprocessor, amounts: &[u64]) -> Vec<Bid> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| Bid {
                encrypted_bid_amount: fhe.encrypt_u64(*amount),
                encrypted_targeting_score: fhe.encrypt_u64(1),
                bidder: [i as u8 + 1; 20],
            })
            .collect()
    }

    #[test]
    fn test_empty_batch_has_no_winner() {
        let fhe = MockCoprocessor::new();
        assert_eq!(resolve_winner(&fhe, &[]).unwrap(), None);
    }

    #[test]
    fn test_single_bid_wins_without_comparison() {
        let fhe = counting();
        let bids = bids_with_amounts(&fhe.inner, &[5]);

        let winner = resolve_winner(&fhe, &bids).unwrap().unwrap();
        assert_eq!(winner.index, 0);
        assert_eq!(winner.bidder, bids[0].bidder);
        assert_eq!(fhe.comparisons.get(), 0);
    }

    #[test]
    fn test_latest_equal_bid_wins() {
        let fhe = counting();
        let bids = bids_with_amounts(&fhe.inner, &[10, 30, 20, 30]);

        let winner = resolve_winner(&fhe, &bids).unwrap().unwrap();
        assert_eq!(winner.index, 3);
        assert_eq!(winner.bidder, bids[3].bidder);
        assert_eq!(winner.encrypted_amount, bids[3].encrypted_bid_amount);
        assert_eq!(fhe.comparisons.get(), 3);
    }

    #[test]
    fn test_first_bid_can_win() {
        let fhe = MockCoprocessor::new();
        let bids = bids_with_amounts(&fhe, &[50, 10, 49]);

        let winner = resolve_winner(&fhe, &bids).unwrap().unwrap();
        assert_eq!(winner.index, 0);
    }

    #[test]
    fn test_unknown_handle_propagates() {
        let fhe = MockCoprocessor::new();
        let mut bids = bids_with_amounts(&fhe, &[1, 2]);
        bids[1].encrypted_bid_amount = CiphertextHandle([4u8; 32]);

        assert!(matches!(
            resolve_winner(&fhe, &bids),
            Err(FheError::UnknownHandle(_))
        ));
    }
}
