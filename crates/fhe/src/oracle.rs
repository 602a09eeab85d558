//! Decryption oracle capability.

use adx_types::{CallbackSelector, CiphertextHandle, DecryptionProof, RequestId};

use crate::error::OracleError;

/// Asynchronous decryption service.
///
/// A request returns immediately with an oracle-issued id. The oracle later
/// delivers `(request_id, cleartexts, proof)` to the named callback on its own
/// schedule; the receiver authenticates that payload with
/// [`DecryptionOracle::verify_signatures`].
pub trait DecryptionOracle {
    fn request_decryption(
        &mut self,
        handles: Vec<CiphertextHandle>,
        callback: CallbackSelector,
    ) -> Result<RequestId, OracleError>;

    fn verify_signatures(
        &self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> bool;
}
