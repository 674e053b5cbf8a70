//! Protobuf transaction: encoding, signing, hashing, sender recovery and gas.

use crate::attachment::StoreToIpfsAttachment;
use crate::crypto::{self, Address};
use crate::error::CodecError;
use crate::hexutil::{hex_to_bytes, to_hex_string};
use crate::proto::{ProtoTransaction, ProtoTransactionData};
use num_bigint::BigUint;
use num_traits::Zero;
use prost::Message;

/// Bytes added to the size of an unsigned transaction to account for the missing signature.
pub const UNSIGNED_SIZE_SURCHARGE: usize = 67;
pub const DELETE_FLIP_SIZE_SURCHARGE: usize = 1024 * 120;
pub const MAX_STORE_TO_IPFS_SIZE: f64 = 1024.0 * 1024.0;
const STORE_TO_IPFS_SIZE_FACTOR: f64 = 0.2;
const GAS_PER_BYTE: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum TransactionType {
    #[default]
    Send = 0x0,
    Activation = 0x1,
    Invite = 0x2,
    Kill = 0x3,
    SubmitFlip = 0x4,
    SubmitAnswersHash = 0x5,
    SubmitShortAnswers = 0x6,
    SubmitLongAnswers = 0x7,
    Evidence = 0x8,
    OnlineStatus = 0x9,
    KillInvitee = 0xa,
    ChangeGodAddress = 0xb,
    Burn = 0xc,
    ChangeProfile = 0xd,
    DeleteFlip = 0xe,
    DeployContract = 0xf,
    CallContract = 0x10,
    TerminateContract = 0x11,
    Delegate = 0x12,
    Undelegate = 0x13,
    KillDelegator = 0x14,
    StoreToIpfs = 0x15,
}

impl TransactionType {
    const ALL: [TransactionType; 22] = [
        Self::Send,
        Self::Activation,
        Self::Invite,
        Self::Kill,
        Self::SubmitFlip,
        Self::SubmitAnswersHash,
        Self::SubmitShortAnswers,
        Self::SubmitLongAnswers,
        Self::Evidence,
        Self::OnlineStatus,
        Self::KillInvitee,
        Self::ChangeGodAddress,
        Self::Burn,
        Self::ChangeProfile,
        Self::DeleteFlip,
        Self::DeployContract,
        Self::CallContract,
        Self::TerminateContract,
        Self::Delegate,
        Self::Undelegate,
        Self::KillDelegator,
        Self::StoreToIpfs,
    ];

    pub fn from_u32(n: u32) -> Option<Self> {
        Self::ALL.get(n as usize).copied()
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Node JSON name for this type (`"callContract"`, `"send"`, ...).
    pub fn json_name(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Activation => "activation",
            Self::Invite => "invite",
            Self::Kill => "kill",
            Self::SubmitFlip => "submitFlip",
            Self::SubmitAnswersHash => "submitAnswersHash",
            Self::SubmitShortAnswers => "submitShortAnswers",
            Self::SubmitLongAnswers => "submitLongAnswers",
            Self::Evidence => "evidence",
            Self::OnlineStatus => "onlineStatus",
            Self::KillInvitee => "killInvitee",
            Self::ChangeGodAddress => "changeGodAddress",
            Self::Burn => "burn",
            Self::ChangeProfile => "changeProfile",
            Self::DeleteFlip => "deleteFlip",
            Self::DeployContract => "deployContract",
            Self::CallContract => "callContract",
            Self::TerminateContract => "terminateContract",
            Self::Delegate => "delegate",
            Self::Undelegate => "undelegate",
            Self::KillDelegator => "killDelegator",
            Self::StoreToIpfs => "storeToIpfs",
        }
    }

    /// Inverse of [TransactionType::json_name]. Unknown or empty names map to `Send`.
    pub fn from_json_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.json_name() == name)
            .unwrap_or_default()
    }
}

/// Ledger transaction. Amounts are atomic units (10^-18 DNA).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    pub nonce: u32,
    pub epoch: u32,
    pub tx_type: TransactionType,
    pub to: Option<Address>,
    pub amount: BigUint,
    pub max_fee: BigUint,
    pub tips: BigUint,
    pub payload: Vec<u8>,
    pub(crate) signature: Vec<u8>,
}

fn amount_bytes(value: &BigUint) -> Vec<u8> {
    if value.is_zero() {
        Vec::new()
    } else {
        value.to_bytes_be()
    }
}

impl Transaction {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let proto = ProtoTransaction::decode(bytes)
            .map_err(|e| CodecError::malformed(format!("transaction: {e}")))?;
        let data = proto.data.unwrap_or_default();
        let tx_type = TransactionType::from_u32(data.r#type)
            .ok_or_else(|| CodecError::malformed(format!("unknown transaction type {}", data.r#type)))?;
        let to = match data.to.len() {
            0 => None,
            20 => {
                let mut address = [0u8; 20];
                address.copy_from_slice(&data.to);
                Some(address)
            }
            n => return Err(CodecError::malformed(format!("recipient must be 20 bytes, got {n}"))),
        };
        Ok(Self {
            nonce: data.nonce,
            epoch: data.epoch,
            tx_type,
            to,
            amount: BigUint::from_bytes_be(&data.amount),
            max_fee: BigUint::from_bytes_be(&data.max_fee),
            tips: BigUint::from_bytes_be(&data.tips),
            payload: data.payload,
            signature: proto.signature,
        })
    }

    pub fn from_hex(hex: &str) -> Result<Self, CodecError> {
        Self::from_bytes(&hex_to_bytes(hex)?)
    }

    fn proto_data(&self) -> ProtoTransactionData {
        ProtoTransactionData {
            nonce: self.nonce,
            epoch: self.epoch,
            r#type: self.tx_type.as_u32(),
            to: self.to.map(|a| a.to_vec()).unwrap_or_default(),
            amount: amount_bytes(&self.amount),
            max_fee: amount_bytes(&self.max_fee),
            tips: amount_bytes(&self.tips),
            payload: self.payload.clone(),
        }
    }

    /// Encoding of the signed portion only.
    pub fn data_bytes(&self) -> Vec<u8> {
        self.proto_data().encode_to_vec()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        ProtoTransaction {
            data: Some(self.proto_data()),
            signature: self.signature.clone(),
        }
        .encode_to_vec()
    }

    pub fn to_hex(&self, with_prefix: bool) -> String {
        to_hex_string(&self.to_bytes(), with_prefix)
    }

    /// Sign the data portion with a raw 32-byte secp256k1 key, replacing any existing signature.
    pub fn sign(&mut self, private_key: &[u8]) -> Result<&mut Self, CodecError> {
        self.signature = crypto::sign(&self.data_bytes(), private_key)?.to_vec();
        Ok(self)
    }

    pub fn signature(&self) -> Option<&[u8]> {
        if self.signature.is_empty() {
            None
        } else {
            Some(&self.signature)
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// keccak256 of the full encoding, signature included.
    pub fn hash(&self) -> [u8; 32] {
        crypto::keccak256(&self.to_bytes())
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }

    /// Signer address, `None` when unsigned or when the signature does not recover.
    pub fn sender(&self) -> Option<Address> {
        if self.signature.is_empty() {
            return None;
        }
        crypto::sender(&self.data_bytes(), &self.signature).ok()
    }

    pub fn gas(&self) -> u64 {
        let mut size = self.to_bytes().len() as f64;
        if self.signature.is_empty() {
            size += UNSIGNED_SIZE_SURCHARGE as f64;
        }
        match self.tx_type {
            TransactionType::DeleteFlip => size += DELETE_FLIP_SIZE_SURCHARGE as f64,
            TransactionType::StoreToIpfs => size += self.store_to_ipfs_surcharge(),
            _ => {}
        }
        (size.trunc() as u64) * GAS_PER_BYTE
    }

    fn store_to_ipfs_surcharge(&self) -> f64 {
        if self.payload.is_empty() {
            return MAX_STORE_TO_IPFS_SIZE;
        }
        match StoreToIpfsAttachment::from_bytes(&self.payload) {
            Ok(attachment) => {
                let surcharge = f64::from(attachment.size) * STORE_TO_IPFS_SIZE_FACTOR;
                if surcharge == 0.0 {
                    MAX_STORE_TO_IPFS_SIZE
                } else {
                    surcharge
                }
            }
            Err(_) => MAX_STORE_TO_IPFS_SIZE,
        }
    }
}
