//! Call handlers for the exchange module.
//!
//! These functions implement the business logic for each call type. Every
//! handler performs all of its checks before touching state, so a rejected
//! call leaves the exchange exactly as it found it.

use adx_fhe::{DecryptionOracle, FheExecutor};
use adx_types::{
    cleartext, compute_state_hash, format_address, Address, AuctionEvent, AuctionOutcome,
    BatchId, BatchStatus, Bid, CallbackSelector, CiphertextHandle, DecryptionContext,
    DecryptionProof, RequestId,
};
use tracing::{debug, warn};

use crate::call::{AuctionCall, CallOutput};
use crate::error::AuctionError;
use crate::resolver::{resolve_winner, ResolvedWinner};
use crate::state::{ExchangeState, RateLimitedAction};

/// Signature of the callback the oracle invokes with decrypted results.
pub const AUCTION_RESULT_CALLBACK: &str = "resolveAuctionCallback(uint256,bytes,bytes)";

/// Selector the exchange registers with every decryption request.
pub fn auction_result_callback() -> CallbackSelector {
    CallbackSelector::from_signature(AUCTION_RESULT_CALLBACK)
}

/// Context provided by the runtime for each call.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Sender of the transaction
    pub sender: Address,
    /// Current block height
    pub block_height: u64,
    /// Current timestamp (seconds)
    pub timestamp: u64,
}

/// External capabilities the exchange calls into.
pub struct Capabilities<'a, F: ?Sized, O: ?Sized> {
    pub fhe: &'a F,
    pub oracle: &'a mut O,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

// =========================
// GUARDS
// =========================

fn ensure_owner(state: &ExchangeState, ctx: &CallContext) -> HandlerResult<()> {
    if state.is_owner(&ctx.sender) {
        Ok(())
    } else {
        Err(AuctionError::NotOwner)
    }
}

fn ensure_provider(state: &ExchangeState, ctx: &CallContext) -> HandlerResult<()> {
    if state.is_provider(&ctx.sender) {
        Ok(())
    } else {
        Err(AuctionError::NotProvider)
    }
}

fn ensure_not_paused(state: &ExchangeState) -> HandlerResult<()> {
    if state.config.paused {
        Err(AuctionError::Paused)
    } else {
        Ok(())
    }
}

/// Reject the action if the sender's cooldown has not elapsed.
fn ensure_cooldown_elapsed(
    state: &ExchangeState,
    ctx: &CallContext,
    action: RateLimitedAction,
) -> HandlerResult<()> {
    match state.cooldown_ready_at(action, &ctx.sender) {
        Some(ready_at) if ctx.timestamp < ready_at => Err(AuctionError::CooldownActive { ready_at }),
        _ => Ok(()),
    }
}

// =========================
// ACCESS CONTROL
// =========================

/// Handle TransferOwnership call. `new_owner` is taken as given.
pub fn handle_transfer_ownership(
    state: &mut ExchangeState,
    ctx: &CallContext,
    new_owner: Address,
) -> HandlerResult<()> {
    ensure_owner(state, ctx)?;

    let previous_owner = state.config.owner;
    state.config.owner = new_owner;
    state.emit(AuctionEvent::OwnershipTransferred {
        previous_owner,
        new_owner,
    });
    Ok(())
}

/// Handle AddProvider call. Adding an existing provider succeeds.
pub fn handle_add_provider(
    state: &mut ExchangeState,
    ctx: &CallContext,
    provider: Address,
) -> HandlerResult<()> {
    ensure_owner(state, ctx)?;

    state.providers.insert(provider);
    state.emit(AuctionEvent::ProviderAdded { provider });
    Ok(())
}

/// Handle RemoveProvider call. Removing a non-provider succeeds.
pub fn handle_remove_provider(
    state: &mut ExchangeState,
    ctx: &CallContext,
    provider: Address,
) -> HandlerResult<()> {
    ensure_owner(state, ctx)?;

    state.providers.remove(&provider);
    state.emit(AuctionEvent::ProviderRemoved { provider });
    Ok(())
}

/// Handle SetPaused call.
pub fn handle_set_paused(
    state: &mut ExchangeState,
    ctx: &CallContext,
    paused: bool,
) -> HandlerResult<()> {
    ensure_owner(state, ctx)?;

    state.config.paused = paused;
    state.emit(AuctionEvent::PausedSet { paused });
    Ok(())
}

/// Handle SetCooldownSeconds call.
pub fn handle_set_cooldown_seconds(
    state: &mut ExchangeState,
    ctx: &CallContext,
    cooldown_seconds: u64,
) -> HandlerResult<()> {
    ensure_owner(state, ctx)?;

    state.config.cooldown_seconds = cooldown_seconds;
    state.emit(AuctionEvent::CooldownSet { cooldown_seconds });
    Ok(())
}

// =========================
// BATCH LIFECYCLE
// =========================

/// Handle OpenBatch call. A batch id can be opened exactly once.
pub fn handle_open_batch(
    state: &mut ExchangeState,
    ctx: &CallContext,
    batch_id: BatchId,
) -> HandlerResult<()> {
    ensure_provider(state, ctx)?;
    ensure_not_paused(state)?;

    if state.batch_status(batch_id) != BatchStatus::Unopened {
        return Err(AuctionError::InvalidBatch(batch_id));
    }

    state.batches.entry(batch_id).or_default().status = BatchStatus::Active;
    state.emit(AuctionEvent::BatchOpened { batch_id });
    Ok(())
}

/// Handle CloseBatch call.
pub fn handle_close_batch(
    state: &mut ExchangeState,
    ctx: &CallContext,
    batch_id: BatchId,
) -> HandlerResult<()> {
    ensure_provider(state, ctx)?;
    ensure_not_paused(state)?;

    let batch = state
        .batches
        .get_mut(&batch_id)
        .filter(|b| b.is_active())
        .ok_or(AuctionError::InvalidBatch(batch_id))?;
    batch.status = BatchStatus::Closed;

    state.emit(AuctionEvent::BatchClosed { batch_id });
    Ok(())
}

/// Handle SubmitBid call. Returns the bid's position in the batch.
///
/// The submission limiter is evaluated before the batch check; its charge is
/// committed together with the bid.
pub fn handle_submit_bid<F>(
    state: &mut ExchangeState,
    ctx: &CallContext,
    fhe: &F,
    batch_id: BatchId,
    encrypted_bid_amount: CiphertextHandle,
    encrypted_targeting_score: CiphertextHandle,
) -> HandlerResult<usize>
where
    F: FheExecutor + ?Sized,
{
    ensure_not_paused(state)?;
    ensure_cooldown_elapsed(state, ctx, RateLimitedAction::Submission)?;

    if state.batch_status(batch_id) != BatchStatus::Active {
        return Err(AuctionError::InvalidBatch(batch_id));
    }

    if !fhe.is_initialized(&encrypted_bid_amount) || !fhe.is_initialized(&encrypted_targeting_score)
    {
        return Err(AuctionError::NotInitialized);
    }

    state.record_action(RateLimitedAction::Submission, ctx.sender, ctx.timestamp);

    let bids = &mut state.batches.entry(batch_id).or_default().bids;
    bids.push(Bid {
        encrypted_bid_amount,
        encrypted_targeting_score,
        bidder: ctx.sender,
    });
    let index = bids.len() - 1;

    state.emit(AuctionEvent::BidSubmitted {
        bidder: ctx.sender,
        batch_id,
    });
    Ok(index)
}

// =========================
// DECRYPTION ORACLE BRIDGE
// =========================

/// Resolve the winner of a batch and commit to its encrypted amount.
fn winner_commitment<F>(
    state: &ExchangeState,
    fhe: &F,
    batch_id: BatchId,
) -> HandlerResult<Option<(ResolvedWinner, [u8; 32])>>
where
    F: FheExecutor + ?Sized,
{
    let bids = state
        .get_batch(batch_id)
        .map(|b| b.bids.as_slice())
        .unwrap_or_default();

    Ok(resolve_winner(fhe, bids)?.map(|winner| {
        let hash = compute_state_hash(&[winner.encrypted_amount], &state.contract_address);
        (winner, hash)
    }))
}

/// Handle RequestAuctionResultDecryption call.
///
/// Only the winning amount ciphertext is submitted for decryption.
pub fn handle_request_decryption<F, O>(
    state: &mut ExchangeState,
    ctx: &CallContext,
    fhe: &F,
    oracle: &mut O,
    batch_id: BatchId,
) -> HandlerResult<RequestId>
where
    F: FheExecutor + ?Sized,
    O: DecryptionOracle + ?Sized,
{
    ensure_provider(state, ctx)?;
    ensure_not_paused(state)?;
    ensure_cooldown_elapsed(state, ctx, RateLimitedAction::DecryptionRequest)?;

    if state.batch_status(batch_id) != BatchStatus::Closed {
        return Err(AuctionError::InvalidBatch(batch_id));
    }

    let (winner, state_hash) =
        winner_commitment(state, fhe, batch_id)?.ok_or(AuctionError::InvalidBatch(batch_id))?;

    let request_id =
        oracle.request_decryption(vec![winner.encrypted_amount], auction_result_callback())?;

    debug!(
        request_id,
        batch_id,
        winner_index = winner.index,
        state_hash = %hex::encode(state_hash),
        "Recorded decryption context"
    );

    state.record_action(RateLimitedAction::DecryptionRequest, ctx.sender, ctx.timestamp);
    state
        .decryption_contexts
        .insert(request_id, DecryptionContext::new(batch_id, state_hash));
    state.emit(AuctionEvent::DecryptionRequested {
        request_id,
        batch_id,
    });
    Ok(request_id)
}

/// Handle the oracle's decryption callback.
///
/// Not access-gated: the stored state commitment and the oracle proof are
/// what make an arbitrary delivery safe.
pub fn handle_decryption_callback<F, O>(
    state: &mut ExchangeState,
    ctx: &CallContext,
    fhe: &F,
    oracle: &O,
    request_id: RequestId,
    cleartexts: &[u8],
    proof: &DecryptionProof,
) -> HandlerResult<AuctionOutcome>
where
    F: FheExecutor + ?Sized,
    O: DecryptionOracle + ?Sized,
{
    let result = verify_callback(state, fhe, oracle, request_id, cleartexts, proof);
    let (batch_id, winner, winning_amount) = match result {
        Ok(verified) => verified,
        Err(e) => {
            warn!(
                request_id,
                relayer = %format_address(&ctx.sender),
                error = %e,
                "Rejected decryption callback"
            );
            return Err(e);
        }
    };

    let outcome = AuctionOutcome {
        batch_id,
        winner: winner.bidder,
        winning_amount,
    };

    // Checked in verify_callback; the flag flips in the same call.
    if let Some(context) = state.decryption_contexts.get_mut(&request_id) {
        context.processed = true;
        context.outcome = Some(outcome.clone());
    }

    state.emit(AuctionEvent::DecryptionCompleted {
        request_id,
        batch_id,
        winning_amount,
        winner: winner.bidder,
    });
    Ok(outcome)
}

/// Run every callback check in order without mutating state.
fn verify_callback<F, O>(
    state: &ExchangeState,
    fhe: &F,
    oracle: &O,
    request_id: RequestId,
    cleartexts: &[u8],
    proof: &DecryptionProof,
) -> HandlerResult<(BatchId, ResolvedWinner, u64)>
where
    F: FheExecutor + ?Sized,
    O: DecryptionOracle + ?Sized,
{
    let context = state
        .decryption_contexts
        .get(&request_id)
        .ok_or(AuctionError::UnknownRequest(request_id))?;

    if context.processed {
        return Err(AuctionError::ReplayDetected);
    }

    let (winner, recomputed_hash) =
        winner_commitment(state, fhe, context.batch_id)?.ok_or(AuctionError::InvalidState)?;
    if recomputed_hash != context.state_hash {
        return Err(AuctionError::InvalidState);
    }

    if !oracle.verify_signatures(request_id, cleartexts, proof) {
        return Err(AuctionError::InvalidProof);
    }

    let winning_amount = cleartext::decode_u64_word(cleartexts, 0)
        .map_err(|e| AuctionError::MalformedCleartext(e.to_string()))?;

    Ok((context.batch_id, winner, winning_amount))
}

// =========================
// DISPATCH
// =========================

/// Route a call message to its handler.
pub fn dispatch<F, O>(
    state: &mut ExchangeState,
    ctx: &CallContext,
    caps: &mut Capabilities<'_, F, O>,
    call: AuctionCall,
) -> HandlerResult<CallOutput>
where
    F: FheExecutor + ?Sized,
    O: DecryptionOracle + ?Sized,
{
    debug!(
        method = call.name(),
        sender = %format_address(&ctx.sender),
        block_height = ctx.block_height,
        "Dispatching call"
    );

    match call {
        AuctionCall::TransferOwnership { new_owner } => {
            handle_transfer_ownership(state, ctx, new_owner).map(|_| CallOutput::Unit)
        }
        AuctionCall::AddProvider { provider } => {
            handle_add_provider(state, ctx, provider).map(|_| CallOutput::Unit)
        }
        AuctionCall::RemoveProvider { provider } => {
            handle_remove_provider(state, ctx, provider).map(|_| CallOutput::Unit)
        }
        AuctionCall::SetPaused { paused } => {
            handle_set_paused(state, ctx, paused).map(|_| CallOutput::Unit)
        }
        AuctionCall::SetCooldownSeconds { cooldown_seconds } => {
            handle_set_cooldown_seconds(state, ctx, cooldown_seconds).map(|_| CallOutput::Unit)
        }
        AuctionCall::OpenBatch { batch_id } => {
            handle_open_batch(state, ctx, batch_id).map(|_| CallOutput::Unit)
        }
        AuctionCall::CloseBatch { batch_id } => {
            handle_close_batch(state, ctx, batch_id).map(|_| CallOutput::Unit)
        }
        AuctionCall::SubmitBid {
            batch_id,
            encrypted_bid_amount,
            encrypted_targeting_score,
        } => handle_submit_bid(
            state,
            ctx,
            caps.fhe,
            batch_id,
            encrypted_bid_amount,
            encrypted_targeting_score,
        )
        .map(CallOutput::BidIndex),
        AuctionCall::RequestAuctionResultDecryption { batch_id } => {
            handle_request_decryption(state, ctx, caps.fhe, &mut *caps.oracle, batch_id)
                .map(CallOutput::RequestId)
        }
        AuctionCall::DecryptionCallback {
            request_id,
            cleartexts,
            proof,
        } => handle_decryption_callback(
            state,
            ctx,
            caps.fhe,
            &*caps.oracle,
            request_id,
            &cleartexts,
            &proof,
        )
        .map(CallOutput::Outcome),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adx_fhe::{MockCoprocessor, OracleError};
    use adx_types::cleartext::encode_words;
    use std::collections::HashMap;

    const CONTRACT: Address = [0xcc; 20];
    const OWNER: Address = [1u8; 20];
    const PROVIDER: Address = [2u8; 20];
    const BIDDER: Address = [3u8; 20];
    const OTHER_BIDDER: Address = [4u8; 20];

    /// Oracle double: records requests and accepts proofs equal to the
    /// request id followed by the cleartexts.
    #[derive(Default)]
    struct StubOracle {
        next_id: RequestId,
        requests: HashMap<RequestId, Vec<CiphertextHandle>>,
    }

    impl StubOracle {
        fn proof_for(request_id: RequestId, cleartexts: &[u8]) -> DecryptionProof {
            let mut bytes = request_id.to_be_bytes().to_vec();
            bytes.extend_from_slice(cleartexts);
            DecryptionProof(bytes)
        }
    }

    impl DecryptionOracle for StubOracle {
        fn request_decryption(
            &mut self,
            handles: Vec<CiphertextHandle>,
            callback: CallbackSelector,
        ) -> Result<RequestId, OracleError> {
            assert_eq!(callback, auction_result_callback());
            self.next_id += 1;
            self.requests.insert(self.next_id, handles);
            Ok(self.next_id)
        }

        fn verify_signatures(
            &self,
            request_id: RequestId,
            cleartexts: &[u8],
            proof: &DecryptionProof,
        ) -> bool {
            *proof == Self::proof_for(request_id, cleartexts)
        }
    }

    fn ctx(sender: Address, timestamp: u64) -> CallContext {
        CallContext {
            sender,
            block_height: timestamp / 12,
            timestamp,
        }
    }

    fn setup_state() -> ExchangeState {
        let mut state = ExchangeState::new(CONTRACT, OWNER);
        handle_add_provider(&mut state, &ctx(OWNER, 0), PROVIDER).unwrap();
        state
    }

    fn submit(
        state: &mut ExchangeState,
        fhe: &MockCoprocessor,
        bidder: Address,
        timestamp: u64,
        batch_id: BatchId,
        amount: u64,
    ) -> HandlerResult<usize> {
        let amount = fhe.encrypt_u64(amount);
        let score = fhe.encrypt_u64(1);
        handle_submit_bid(state, &ctx(bidder, timestamp), fhe, batch_id, amount, score)
    }

    /// Opens batch 1, submits the amounts from distinct bidders, closes it.
    fn closed_batch(fhe: &MockCoprocessor, amounts: &[u64]) -> ExchangeState {
        let mut state = setup_state();
        handle_open_batch(&mut state, &ctx(PROVIDER, 10), 1).unwrap();
        for (i, amount) in amounts.iter().enumerate() {
            submit(&mut state, fhe, [0x10 + i as u8; 20], 20, 1, *amount).unwrap();
        }
        handle_close_batch(&mut state, &ctx(PROVIDER, 30), 1).unwrap();
        state
    }

    #[test]
    fn test_owner_only_operations() {
        let mut state = setup_state();
        let stranger = ctx(BIDDER, 0);

        assert_eq!(
            handle_transfer_ownership(&mut state, &stranger, BIDDER),
            Err(AuctionError::NotOwner)
        );
        assert_eq!(
            handle_add_provider(&mut state, &stranger, BIDDER),
            Err(AuctionError::NotOwner)
        );
        assert_eq!(
            handle_remove_provider(&mut state, &stranger, PROVIDER),
            Err(AuctionError::NotOwner)
        );
        assert_eq!(handle_set_paused(&mut state, &stranger, true), Err(AuctionError::NotOwner));
        assert_eq!(
            handle_set_cooldown_seconds(&mut state, &stranger, 5),
            Err(AuctionError::NotOwner)
        );

        assert!(state.is_owner(&OWNER));
        assert!(state.is_provider(&PROVIDER));
        assert!(!state.config.paused);
        assert_eq!(state.config.cooldown_seconds, 0);
    }

    #[test]
    fn test_transfer_ownership() {
        let mut state = setup_state();
        handle_transfer_ownership(&mut state, &ctx(OWNER, 0), BIDDER).unwrap();

        assert!(state.is_owner(&BIDDER));
        assert_eq!(
            state.events.last(),
            Some(&AuctionEvent::OwnershipTransferred {
                previous_owner: OWNER,
                new_owner: BIDDER
            })
        );
        assert_eq!(
            handle_set_paused(&mut state, &ctx(OWNER, 0), true),
            Err(AuctionError::NotOwner)
        );
    }

    #[test]
    fn test_provider_management_is_idempotent() {
        let mut state = setup_state();
        let owner = ctx(OWNER, 0);

        handle_add_provider(&mut state, &owner, PROVIDER).unwrap();
        assert_eq!(state.providers.len(), 1);

        handle_remove_provider(&mut state, &owner, BIDDER).unwrap();
        handle_remove_provider(&mut state, &owner, PROVIDER).unwrap();
        handle_remove_provider(&mut state, &owner, PROVIDER).unwrap();
        assert!(!state.is_provider(&PROVIDER));
    }

    #[test]
    fn test_open_batch_twice_fails() {
        let mut state = setup_state();
        let provider = ctx(PROVIDER, 0);

        handle_open_batch(&mut state, &provider, 7).unwrap();
        let events_before = state.events.len();

        assert_eq!(
            handle_open_batch(&mut state, &provider, 7),
            Err(AuctionError::InvalidBatch(7))
        );
        assert_eq!(state.batch_status(7), BatchStatus::Active);
        assert_eq!(state.events.len(), events_before);
    }

    #[test]
    fn test_closed_batch_cannot_reopen() {
        let mut state = setup_state();
        let provider = ctx(PROVIDER, 0);

        handle_open_batch(&mut state, &provider, 7).unwrap();
        handle_close_batch(&mut state, &provider, 7).unwrap();
        assert_eq!(
            handle_open_batch(&mut state, &provider, 7),
            Err(AuctionError::InvalidBatch(7))
        );
        assert_eq!(state.batch_status(7), BatchStatus::Closed);
    }

    #[test]
    fn test_close_batch_requires_active() {
        let mut state = setup_state();
        let provider = ctx(PROVIDER, 0);

        assert_eq!(
            handle_close_batch(&mut state, &provider, 3),
            Err(AuctionError::InvalidBatch(3))
        );
        assert!(state.get_batch(3).is_none());

        handle_open_batch(&mut state, &provider, 3).unwrap();
        handle_close_batch(&mut state, &provider, 3).unwrap();
        assert_eq!(
            handle_close_batch(&mut state, &provider, 3),
            Err(AuctionError::InvalidBatch(3))
        );
    }

    #[test]
    fn test_batch_management_requires_provider() {
        let mut state = setup_state();
        assert_eq!(
            handle_open_batch(&mut state, &ctx(OWNER, 0), 1),
            Err(AuctionError::NotProvider)
        );
        assert_eq!(
            handle_close_batch(&mut state, &ctx(BIDDER, 0), 1),
            Err(AuctionError::NotProvider)
        );
    }

    #[test]
    fn test_submit_bid_success() {
        let fhe = MockCoprocessor::new();
        let mut state = setup_state();
        handle_open_batch(&mut state, &ctx(PROVIDER, 0), 1).unwrap();

        assert_eq!(submit(&mut state, &fhe, BIDDER, 100, 1, 25), Ok(0));
        assert_eq!(submit(&mut state, &fhe, OTHER_BIDDER, 100, 1, 30), Ok(1));

        let batch = state.get_batch(1).unwrap();
        assert_eq!(batch.bids.len(), 2);
        assert_eq!(batch.bids[0].bidder, BIDDER);
        assert_eq!(state.last_submission.get(&BIDDER), Some(&100));
        assert_eq!(
            state.events.last(),
            Some(&AuctionEvent::BidSubmitted {
                bidder: OTHER_BIDDER,
                batch_id: 1
            })
        );
    }

    #[test]
    fn test_submit_bid_requires_active_batch() {
        let fhe = MockCoprocessor::new();
        let mut state = setup_state();

        assert_eq!(
            submit(&mut state, &fhe, BIDDER, 100, 1, 25),
            Err(AuctionError::InvalidBatch(1))
        );

        handle_open_batch(&mut state, &ctx(PROVIDER, 0), 1).unwrap();
        handle_close_batch(&mut state, &ctx(PROVIDER, 0), 1).unwrap();
        assert_eq!(
            submit(&mut state, &fhe, BIDDER, 100, 1, 25),
            Err(AuctionError::InvalidBatch(1))
        );
        assert!(state.get_batch(1).unwrap().bids.is_empty());
    }

    #[test]
    fn test_rejected_submission_leaves_no_cooldown() {
        let fhe = MockCoprocessor::new();
        let mut state = setup_state();
        handle_set_cooldown_seconds(&mut state, &ctx(OWNER, 0), 60).unwrap();

        assert_eq!(
            submit(&mut state, &fhe, BIDDER, 100, 1, 25),
            Err(AuctionError::InvalidBatch(1))
        );
        assert_eq!(state.last_submission.get(&BIDDER), None);

        handle_open_batch(&mut state, &ctx(PROVIDER, 0), 1).unwrap();
        assert_eq!(submit(&mut state, &fhe, BIDDER, 101, 1, 25), Ok(0));
    }

    #[test]
    fn test_submit_bid_uninitialized_ciphertext() {
        let fhe = MockCoprocessor::new();
        let mut state = setup_state();
        handle_open_batch(&mut state, &ctx(PROVIDER, 0), 1).unwrap();

        let valid = fhe.encrypt_u64(10);
        let result = handle_submit_bid(
            &mut state,
            &ctx(BIDDER, 0),
            &fhe,
            1,
            valid,
            CiphertextHandle::ZERO,
        );
        assert_eq!(result, Err(AuctionError::NotInitialized));

        let result = handle_submit_bid(
            &mut state,
            &ctx(BIDDER, 0),
            &fhe,
            1,
            CiphertextHandle([7u8; 32]),
            valid,
        );
        assert_eq!(result, Err(AuctionError::NotInitialized));
        assert!(state.get_batch(1).unwrap().bids.is_empty());
    }

    #[test]
    fn test_submission_cooldown() {
        let fhe = MockCoprocessor::new();
        let mut state = setup_state();
        handle_set_cooldown_seconds(&mut state, &ctx(OWNER, 0), 30).unwrap();
        handle_open_batch(&mut state, &ctx(PROVIDER, 0), 1).unwrap();

        submit(&mut state, &fhe, BIDDER, 100, 1, 10).unwrap();
        assert_eq!(
            submit(&mut state, &fhe, BIDDER, 129, 1, 10),
            Err(AuctionError::CooldownActive { ready_at: 130 })
        );

        // Other addresses are unaffected
        submit(&mut state, &fhe, OTHER_BIDDER, 101, 1, 10).unwrap();

        // Exactly cooldown_seconds later is allowed
        submit(&mut state, &fhe, BIDDER, 130, 1, 10).unwrap();
        assert_eq!(state.get_batch(1).unwrap().bids.len(), 3);
    }

    #[test]
    fn test_pause_blocks_operations_and_preserves_state() {
        let fhe = MockCoprocessor::new();
        let mut oracle = StubOracle::default();
        let mut state = setup_state();
        let provider = ctx(PROVIDER, 0);

        handle_open_batch(&mut state, &provider, 1).unwrap();
        submit(&mut state, &fhe, BIDDER, 0, 1, 10).unwrap();
        handle_open_batch(&mut state, &provider, 2).unwrap();
        handle_close_batch(&mut state, &provider, 2).unwrap();

        handle_set_paused(&mut state, &ctx(OWNER, 0), true).unwrap();

        assert_eq!(handle_open_batch(&mut state, &provider, 3), Err(AuctionError::Paused));
        assert_eq!(handle_close_batch(&mut state, &provider, 1), Err(AuctionError::Paused));
        assert_eq!(
            submit(&mut state, &fhe, OTHER_BIDDER, 0, 1, 10),
            Err(AuctionError::Paused)
        );
        assert_eq!(
            handle_request_decryption(&mut state, &provider, &fhe, &mut oracle, 2),
            Err(AuctionError::Paused)
        );

        handle_set_paused(&mut state, &ctx(OWNER, 0), false).unwrap();

        assert_eq!(state.get_batch(1).unwrap().bids.len(), 1);
        submit(&mut state, &fhe, OTHER_BIDDER, 0, 1, 10).unwrap();
        handle_close_batch(&mut state, &provider, 1).unwrap();
        handle_open_batch(&mut state, &provider, 3).unwrap();
        assert!(handle_request_decryption(&mut state, &provider, &fhe, &mut oracle, 1).is_ok());
    }

    #[test]
    fn test_request_decryption_requires_closed_nonempty_batch() {
        let fhe = MockCoprocessor::new();
        let mut oracle = StubOracle::default();
        let mut state = setup_state();
        let provider = ctx(PROVIDER, 0);

        assert_eq!(
            handle_request_decryption(&mut state, &provider, &fhe, &mut oracle, 1),
            Err(AuctionError::InvalidBatch(1))
        );

        handle_open_batch(&mut state, &provider, 1).unwrap();
        submit(&mut state, &fhe, BIDDER, 0, 1, 10).unwrap();
        assert_eq!(
            handle_request_decryption(&mut state, &provider, &fhe, &mut oracle, 1),
            Err(AuctionError::InvalidBatch(1))
        );

        handle_open_batch(&mut state, &provider, 2).unwrap();
        handle_close_batch(&mut state, &provider, 2).unwrap();
        assert_eq!(
            handle_request_decryption(&mut state, &provider, &fhe, &mut oracle, 2),
            Err(AuctionError::InvalidBatch(2))
        );

        assert!(oracle.requests.is_empty());
        assert!(state.decryption_contexts.is_empty());
    }

    #[test]
    fn test_request_decryption_submits_only_winning_amount() {
        let fhe = MockCoprocessor::new();
        let mut oracle = StubOracle::default();
        let mut state = closed_batch(&fhe, &[10, 30, 20, 30]);

        let request_id =
            handle_request_decryption(&mut state, &ctx(PROVIDER, 40), &fhe, &mut oracle, 1)
                .unwrap();

        let winning_bid = &state.get_batch(1).unwrap().bids[3];
        assert_eq!(
            oracle.requests.get(&request_id),
            Some(&vec![winning_bid.encrypted_bid_amount])
        );

        let context = state.decryption_contexts.get(&request_id).unwrap();
        assert_eq!(context.batch_id, 1);
        assert!(!context.processed);
        assert_eq!(
            context.state_hash,
            compute_state_hash(&[winning_bid.encrypted_bid_amount], &CONTRACT)
        );
        assert_eq!(
            state.events.last(),
            Some(&AuctionEvent::DecryptionRequested {
                request_id,
                batch_id: 1
            })
        );
    }

    #[test]
    fn test_request_decryption_cooldown_is_independent() {
        let fhe = MockCoprocessor::new();
        let mut oracle = StubOracle::default();
        let mut state = closed_batch(&fhe, &[10]);
        handle_set_cooldown_seconds(&mut state, &ctx(OWNER, 0), 100).unwrap();

        // A recent submission by the provider does not block a request
        state.record_action(RateLimitedAction::Submission, PROVIDER, 50);

        handle_request_decryption(&mut state, &ctx(PROVIDER, 50), &fhe, &mut oracle, 1).unwrap();
        assert_eq!(
            handle_request_decryption(&mut state, &ctx(PROVIDER, 60), &fhe, &mut oracle, 1),
            Err(AuctionError::CooldownActive { ready_at: 150 })
        );
        handle_request_decryption(&mut state, &ctx(PROVIDER, 150), &fhe, &mut oracle, 1).unwrap();
    }

    #[test]
    fn test_request_decryption_requires_provider() {
        let fhe = MockCoprocessor::new();
        let mut oracle = StubOracle::default();
        let mut state = closed_batch(&fhe, &[10]);

        assert_eq!(
            handle_request_decryption(&mut state, &ctx(BIDDER, 50), &fhe, &mut oracle, 1),
            Err(AuctionError::NotProvider)
        );
    }

    #[test]
    fn test_callback_completes_once() {
        let fhe = MockCoprocessor::new();
        let mut oracle = StubOracle::default();
        let mut state = closed_batch(&fhe, &[10, 30, 20, 30]);
        let request_id =
            handle_request_decryption(&mut state, &ctx(PROVIDER, 40), &fhe, &mut oracle, 1)
                .unwrap();

        let cleartexts = encode_words(&[30]);
        let proof = StubOracle::proof_for(request_id, &cleartexts);
        let relayer = ctx([0xee; 20], 50);

        let outcome = handle_decryption_callback(
            &mut state, &relayer, &fhe, &oracle, request_id, &cleartexts, &proof,
        )
        .unwrap();

        assert_eq!(outcome.winning_amount, 30);
        assert_eq!(outcome.winner, [0x13; 20]);
        let context = state.decryption_contexts.get(&request_id).unwrap();
        assert!(context.processed);
        assert_eq!(context.outcome, Some(outcome));
        assert_eq!(
            state.events.last(),
            Some(&AuctionEvent::DecryptionCompleted {
                request_id,
                batch_id: 1,
                winning_amount: 30,
                winner: [0x13; 20],
            })
        );

        // Replays fail regardless of payload
        let events_before = state.events.len();
        assert_eq!(
            handle_decryption_callback(
                &mut state, &relayer, &fhe, &oracle, request_id, &cleartexts, &proof,
            ),
            Err(AuctionError::ReplayDetected)
        );
        assert_eq!(
            handle_decryption_callback(
                &mut state,
                &relayer,
                &fhe,
                &oracle,
                request_id,
                &[],
                &DecryptionProof::default(),
            ),
            Err(AuctionError::ReplayDetected)
        );
        assert_eq!(state.events.len(), events_before);
    }

    #[test]
    fn test_callback_with_bad_proof() {
        let fhe = MockCoprocessor::new();
        let mut oracle = StubOracle::default();
        let mut state = closed_batch(&fhe, &[10, 20]);
        let request_id =
            handle_request_decryption(&mut state, &ctx(PROVIDER, 40), &fhe, &mut oracle, 1)
                .unwrap();

        let cleartexts = encode_words(&[20]);
        let forged = StubOracle::proof_for(request_id, &encode_words(&[99]));

        assert_eq!(
            handle_decryption_callback(
                &mut state,
                &ctx(BIDDER, 50),
                &fhe,
                &oracle,
                request_id,
                &cleartexts,
                &forged,
            ),
            Err(AuctionError::InvalidProof)
        );
        assert!(!state.decryption_contexts.get(&request_id).unwrap().processed);

        // The genuine response is still accepted afterwards
        let proof = StubOracle::proof_for(request_id, &cleartexts);
        assert!(handle_decryption_callback(
            &mut state,
            &ctx(BIDDER, 60),
            &fhe,
            &oracle,
            request_id,
            &cleartexts,
            &proof,
        )
        .is_ok());
    }

    #[test]
    fn test_callback_state_mismatch() {
        let fhe = MockCoprocessor::new();
        let mut oracle = StubOracle::default();
        let mut state = closed_batch(&fhe, &[10, 20]);
        let request_id =
            handle_request_decryption(&mut state, &ctx(PROVIDER, 40), &fhe, &mut oracle, 1)
                .unwrap();

        // Point the context at a commitment the batch never produced
        state
            .decryption_contexts
            .get_mut(&request_id)
            .unwrap()
            .state_hash = compute_state_hash(&[fhe.encrypt_u64(20)], &CONTRACT);

        let cleartexts = encode_words(&[20]);
        let proof = StubOracle::proof_for(request_id, &cleartexts);
        assert_eq!(
            handle_decryption_callback(
                &mut state,
                &ctx(BIDDER, 50),
                &fhe,
                &oracle,
                request_id,
                &cleartexts,
                &proof,
            ),
            Err(AuctionError::InvalidState)
        );
        assert!(!state.decryption_contexts.get(&request_id).unwrap().processed);
    }

    #[test]
    fn test_callback_unknown_request() {
        let fhe = MockCoprocessor::new();
        let oracle = StubOracle::default();
        let mut state = setup_state();

        let cleartexts = encode_words(&[1]);
        assert_eq!(
            handle_decryption_callback(
                &mut state,
                &ctx(BIDDER, 0),
                &fhe,
                &oracle,
                42,
                &cleartexts,
                &StubOracle::proof_for(42, &cleartexts),
            ),
            Err(AuctionError::UnknownRequest(42))
        );
    }

    #[test]
    fn test_callback_malformed_cleartext() {
        let fhe = MockCoprocessor::new();
        let mut oracle = StubOracle::default();
        let mut state = closed_batch(&fhe, &[10]);
        let request_id =
            handle_request_decryption(&mut state, &ctx(PROVIDER, 40), &fhe, &mut oracle, 1)
                .unwrap();

        let cleartexts = vec![1u8; 8];
        let proof = StubOracle::proof_for(request_id, &cleartexts);
        assert!(matches!(
            handle_decryption_callback(
                &mut state,
                &ctx(BIDDER, 50),
                &fhe,
                &oracle,
                request_id,
                &cleartexts,
                &proof,
            ),
            Err(AuctionError::MalformedCleartext(_))
        ));
        assert!(!state.decryption_contexts.get(&request_id).unwrap().processed);
    }

    #[test]
    fn test_dispatch_routes_calls() {
        let fhe = MockCoprocessor::new();
        let mut oracle = StubOracle::default();
        let mut state = setup_state();
        let mut caps = Capabilities {
            fhe: &fhe,
            oracle: &mut oracle,
        };
        let provider = ctx(PROVIDER, 0);

        assert_eq!(
            dispatch(&mut state, &provider, &mut caps, AuctionCall::OpenBatch { batch_id: 5 }),
            Ok(CallOutput::Unit)
        );

        let call = AuctionCall::SubmitBid {
            batch_id: 5,
            encrypted_bid_amount: fhe.encrypt_u64(8),
            encrypted_targeting_score: fhe.encrypt_u64(2),
        };
        assert_eq!(
            dispatch(&mut state, &ctx(BIDDER, 0), &mut caps, call),
            Ok(CallOutput::BidIndex(0))
        );

        dispatch(&mut state, &provider, &mut caps, AuctionCall::CloseBatch { batch_id: 5 }).unwrap();
        let output = dispatch(
            &mut state,
            &provider,
            &mut caps,
            AuctionCall::RequestAuctionResultDecryption { batch_id: 5 },
        )
        .unwrap();
        let CallOutput::RequestId(request_id) = output else {
            panic!("expected request id, got {output:?}");
        };

        let cleartexts = encode_words(&[8]);
        let call = AuctionCall::DecryptionCallback {
            request_id,
            proof: StubOracle::proof_for(request_id, &cleartexts),
            cleartexts,
        };
        assert_eq!(
            dispatch(&mut state, &ctx(OTHER_BIDDER, 0), &mut caps, call),
            Ok(CallOutput::Outcome(AuctionOutcome {
                batch_id: 5,
                winner: BIDDER,
                winning_amount: 8,
            }))
        );
    }
}
