//! Validation of user-supplied identifiers before they reach the chain.

use adx_types::{format_address, parse_address, CiphertextHandle, ParseError};

/// Parse an address and return its canonical `0x` form.
pub fn canonical_address(input: &str) -> Result<String, ParseError> {
    parse_address(input.trim()).map(|addr| format_address(&addr))
}

/// Parse a ciphertext handle and return its canonical `0x` form.
pub fn canonical_handle(input: &str) -> Result<String, ParseError> {
    CiphertextHandle::from_hex(input.trim()).map(|h| h.to_hex())
}
