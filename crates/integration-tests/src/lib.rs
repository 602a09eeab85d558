//! End-to-end integration tests for the sealed-bid batch exchange.
//!
//! These tests exercise the full batch lifecycle across crates:
//! 1. Genesis and KMS committee setup
//! 2. Batch opening and sealed bid submission
//! 3. Encrypted winner resolution and the decryption request
//! 4. Threshold-signed oracle response
//! 5. Verified callback delivery

use adx_decryption_oracle::{fulfil_pending, DecryptionGateway, DecryptionResponse, KmsCommittee};
use adx_fhe::MockCoprocessor;
use adx_module::{
    dispatch, AuctionCall, AuctionError, AuctionGenesisConfig, CallContext, CallOutput,
    Capabilities, ExchangeState, HandlerResult,
};
use adx_types::{cleartext, Address, AuctionEvent, AuctionOutcome, BatchId, RequestId};
use borsh::BorshDeserialize;
use rand::rngs::OsRng;

const CONTRACT: Address = [0xad; 20];
const OWNER: Address = [0x01; 20];
const PROVIDER: Address = [0x02; 20];
const RELAYER: Address = [0xee; 20];

/// One deployment wired to a mock coprocessor and a threshold oracle.
struct Harness {
    state: ExchangeState,
    fhe: MockCoprocessor,
    gateway: DecryptionGateway,
    committee: KmsCommittee,
    timestamp: u64,
}

impl Harness {
    fn new(contract: Address) -> Self {
        let committee = KmsCommittee::generate(2, 3, &mut OsRng).unwrap();
        let gateway = DecryptionGateway::new(committee.master_public_key().clone());
        Self::with_oracle(contract, committee, gateway)
    }

    fn with_oracle(contract: Address, committee: KmsCommittee, gateway: DecryptionGateway) -> Self {
        let mut genesis = AuctionGenesisConfig::new(contract, OWNER);
        genesis.providers.push(PROVIDER);

        Self {
            state: genesis.build_state().unwrap(),
            fhe: MockCoprocessor::new(),
            gateway,
            committee,
            timestamp: 1_000,
        }
    }

    fn call(&mut self, sender: Address, call: AuctionCall) -> HandlerResult<CallOutput> {
        let ctx = CallContext {
            sender,
            block_height: self.timestamp / 12,
            timestamp: self.timestamp,
        };
        let mut caps = Capabilities {
            fhe: &self.fhe,
            oracle: &mut self.gateway,
        };
        dispatch(&mut self.state, &ctx, &mut caps, call)
    }

    fn bid(&mut self, bidder: Address, batch_id: BatchId, amount: u64) -> HandlerResult<CallOutput> {
        let call = AuctionCall::SubmitBid {
            batch_id,
            encrypted_bid_amount: self.fhe.encrypt_u64(amount),
            encrypted_targeting_score: self.fhe.encrypt_u64(amount / 2),
        };
        self.call(bidder, call)
    }

    /// Open a batch, bid each amount from a distinct address and close it.
    fn run_batch(&mut self, batch_id: BatchId, amounts: &[u64]) -> Vec<Address> {
        self.call(PROVIDER, AuctionCall::OpenBatch { batch_id }).unwrap();
        let bidders: Vec<Address> = (0..amounts.len())
            .map(|i| {
                let mut addr = [0x40 + i as u8; 20];
                addr[0] = batch_id as u8;
                addr
            })
            .collect();
        for (bidder, amount) in bidders.iter().zip(amounts) {
            self.bid(*bidder, batch_id, *amount).unwrap();
        }
        self.call(PROVIDER, AuctionCall::CloseBatch { batch_id }).unwrap();
        bidders
    }

    fn request(&mut self, batch_id: BatchId) -> RequestId {
        match self.call(PROVIDER, AuctionCall::RequestAuctionResultDecryption { batch_id }) {
            Ok(CallOutput::RequestId(id)) => id,
            other => panic!("decryption request failed: {other:?}"),
        }
    }

    fn fulfil(&mut self) -> Vec<DecryptionResponse> {
        fulfil_pending(&mut self.gateway, &self.committee, &self.fhe, &mut OsRng)
    }

    fn deliver(&mut self, response: &DecryptionResponse) -> HandlerResult<CallOutput> {
        self.call(
            RELAYER,
            AuctionCall::DecryptionCallback {
                request_id: response.request_id,
                cleartexts: response.cleartexts.clone(),
                proof: response.proof.clone(),
            },
        )
    }
}

/// Test the complete batch flow with mock components.
#[test]
fn test_full_exchange_flow() {
    // ========================================
    // Phase 1: Setup and bidding
    // ========================================

    let mut h = Harness::new(CONTRACT);
    let bidders = h.run_batch(1, &[10, 30, 20, 30]);
    println!("Batch 1 closed with {} bids", bidders.len());

    // ========================================
    // Phase 2: Decryption request
    // ========================================

    let request_id = h.request(1);
    assert_eq!(request_id, 1);
    assert_eq!(h.state.pending_requests(), vec![request_id]);

    // Only the winning amount is sent to the oracle
    let winning_handle = h.state.get_batch(1).unwrap().bids[3].encrypted_bid_amount;
    assert_eq!(h.gateway.get(request_id).unwrap().handles, vec![winning_handle]);

    // ========================================
    // Phase 3: Oracle response and callback
    // ========================================

    let responses = h.fulfil();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].cleartexts, cleartext::encode_words(&[30]));

    let output = h.deliver(&responses[0]).unwrap();
    assert_eq!(
        output,
        CallOutput::Outcome(AuctionOutcome {
            batch_id: 1,
            winner: bidders[3],
            winning_amount: 30,
        })
    );
    println!("Batch 1 resolved: winning amount 30");

    assert!(h.state.pending_requests().is_empty());
    assert_eq!(
        h.state.events.last(),
        Some(&AuctionEvent::DecryptionCompleted {
            request_id,
            batch_id: 1,
            winning_amount: 30,
            winner: bidders[3],
        })
    );

    // ========================================
    // Phase 4: Replay
    // ========================================

    let events_before = h.state.events.len();
    assert_eq!(h.deliver(&responses[0]), Err(AuctionError::ReplayDetected));
    assert_eq!(h.state.events.len(), events_before);
}

#[test]
fn test_event_sequence() {
    let mut h = Harness::new(CONTRACT);
    let bidders = h.run_batch(5, &[3]);
    let request_id = h.request(5);
    let response = h.fulfil().remove(0);
    h.deliver(&response).unwrap();

    let names: Vec<&str> = h.state.events.iter().map(|e| e.name()).collect();
    let expected: Vec<&str> = [
        AuctionEvent::BatchOpened { batch_id: 5 },
        AuctionEvent::BidSubmitted {
            bidder: bidders[0],
            batch_id: 5,
        },
        AuctionEvent::BatchClosed { batch_id: 5 },
        AuctionEvent::DecryptionRequested {
            request_id,
            batch_id: 5,
        },
        AuctionEvent::DecryptionCompleted {
            request_id,
            batch_id: 5,
            winning_amount: 3,
            winner: bidders[0],
        },
    ]
    .iter()
    .map(|e| e.name())
    .collect();

    assert_eq!(names, expected);
}

#[test]
fn test_tampered_cleartext_rejected() {
    let mut h = Harness::new(CONTRACT);
    h.run_batch(1, &[5, 8]);
    let request_id = h.request(1);
    let genuine = h.fulfil().remove(0);

    let mut forged = genuine.clone();
    forged.cleartexts = cleartext::encode_words(&[1]);
    assert_eq!(h.deliver(&forged), Err(AuctionError::InvalidProof));
    assert!(!h.state.decryption_contexts[&request_id].processed);

    // The genuine response still lands
    assert!(h.deliver(&genuine).is_ok());
}

#[test]
fn test_proof_bound_to_request() {
    let mut h = Harness::new(CONTRACT);
    h.run_batch(1, &[5]);
    h.run_batch(2, &[5]);
    let first = h.request(1);
    let second = h.request(2);

    let responses = h.fulfil();
    assert_eq!(responses.len(), 2);

    // Same cleartext, but the proof of request 2 does not cover request 1
    let mut swapped = responses[1].clone();
    swapped.request_id = first;
    assert_eq!(h.deliver(&swapped), Err(AuctionError::InvalidProof));

    assert!(h.deliver(&responses[0]).is_ok());
    assert!(h.deliver(&responses[1]).is_ok());
    assert!(h.state.decryption_contexts[&second].processed);
}

#[test]
fn test_pause_does_not_block_callback() {
    let mut h = Harness::new(CONTRACT);
    h.run_batch(1, &[12]);
    h.request(1);
    h.call(OWNER, AuctionCall::SetPaused { paused: true }).unwrap();

    let response = h.fulfil().remove(0);
    assert!(matches!(
        h.deliver(&response),
        Ok(CallOutput::Outcome(AuctionOutcome { winning_amount: 12, .. }))
    ));

    assert_eq!(
        h.call(PROVIDER, AuctionCall::OpenBatch { batch_id: 2 }),
        Err(AuctionError::Paused)
    );
}

#[test]
fn test_cooldown_spans_batches() {
    let mut h = Harness::new(CONTRACT);
    h.call(OWNER, AuctionCall::SetCooldownSeconds { cooldown_seconds: 60 })
        .unwrap();
    h.call(PROVIDER, AuctionCall::OpenBatch { batch_id: 1 }).unwrap();
    h.call(PROVIDER, AuctionCall::OpenBatch { batch_id: 2 }).unwrap();

    let bidder = [0x77; 20];
    h.bid(bidder, 1, 10).unwrap();

    h.timestamp += 10;
    assert_eq!(
        h.bid(bidder, 2, 10),
        Err(AuctionError::CooldownActive { ready_at: 1_060 })
    );

    h.timestamp += 50;
    assert_eq!(h.bid(bidder, 2, 10), Ok(CallOutput::BidIndex(0)));
}

#[test]
fn test_foreign_request_unknown() {
    // Two deployments sharing one oracle
    let committee = KmsCommittee::generate(2, 3, &mut OsRng).unwrap();
    let gateway = DecryptionGateway::new(committee.master_public_key().clone());

    let mut a = Harness::with_oracle(CONTRACT, committee.clone(), gateway);
    a.run_batch(1, &[9]);
    a.request(1);
    let response = a.fulfil().remove(0);

    let mut b = Harness::with_oracle([0xbb; 20], committee, a.gateway.clone());
    b.run_batch(1, &[9]);

    assert_eq!(
        b.deliver(&response),
        Err(AuctionError::UnknownRequest(response.request_id))
    );
    assert!(a.deliver(&response).is_ok());
}

#[test]
fn test_response_rejected_by_other_gateway_of_same_committee() {
    // Two deployments, each with its own gateway, signed by one committee
    let committee = KmsCommittee::generate(2, 3, &mut OsRng).unwrap();
    let mut a = Harness::with_oracle(
        CONTRACT,
        committee.clone(),
        DecryptionGateway::new(committee.master_public_key().clone()),
    );
    let mut b = Harness::with_oracle(
        [0xbb; 20],
        committee.clone(),
        DecryptionGateway::new(committee.master_public_key().clone()),
    );

    a.run_batch(1, &[999]);
    b.run_batch(1, &[5]);
    let a_request = a.request(1);
    let b_request = b.request(1);
    assert_eq!(a_request, b_request);

    let a_response = a.fulfil().remove(0);
    assert_eq!(b.deliver(&a_response), Err(AuctionError::InvalidProof));
    assert!(!b.state.decryption_contexts[&b_request].processed);

    let b_response = b.fulfil().remove(0);
    assert!(matches!(
        b.deliver(&b_response),
        Ok(CallOutput::Outcome(AuctionOutcome { winning_amount: 5, .. }))
    ));
    assert!(a.deliver(&a_response).is_ok());
}

#[test]
fn test_borsh_encoded_transactions() {
    let mut h = Harness::new(CONTRACT);

    let tx = borsh::to_vec(&AuctionCall::OpenBatch { batch_id: 3 }).unwrap();
    let call = AuctionCall::try_from_slice(&tx).unwrap();
    assert_eq!(h.call(PROVIDER, call), Ok(CallOutput::Unit));

    let tx = borsh::to_vec(&AuctionCall::AddProvider { provider: [9u8; 20] }).unwrap();
    let call = AuctionCall::try_from_slice(&tx).unwrap();
    assert_eq!(h.call(PROVIDER, call), Err(AuctionError::NotOwner));
}
