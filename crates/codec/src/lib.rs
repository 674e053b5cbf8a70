//! Binary codec for the social-feed contract: everything that must byte-match the node.
//!
//! - **Arguments**: typed contract-call arguments to and from their raw byte slots
//!   ([args]), including a hand-written UTF-8 codec ([utf8]).
//! - **Attachments**: `CallContract` and `StoreToIpfs` payloads ([attachment]).
//! - **Transaction**: protobuf wire format, keccak256 hash, deterministic secp256k1
//!   signatures, sender recovery and gas ([transaction], [crypto]).
//!
//! All functions are stateless and return [CodecError] instead of panicking on untrusted input.

pub mod args;
pub mod attachment;
pub mod crypto;
pub mod error;
pub mod hexutil;
pub mod json;
pub mod proto;
pub mod transaction;
pub mod utf8;

pub use args::{
    argument_from_bytes, argument_to_bytes, arguments_from_bytes, arguments_to_bytes,
    ArgumentFormat, ContractArgument,
};
pub use attachment::{CallContractAttachment, StoreToIpfsAttachment};
pub use crypto::{private_key_to_address, private_key_to_public_key, Address};
pub use error::CodecError;
pub use hexutil::{
    dna_to_float_string, float_string_to_dna, hex_to_bytes, hex_to_decimal, to_hex_string,
    DNA_BASE,
};
pub use json::JsonTransaction;
pub use transaction::{Transaction, TransactionType};
