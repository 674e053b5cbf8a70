//! Transaction payload attachments.

use crate::args::{arguments_from_bytes, arguments_to_bytes, ArgumentFormat, ContractArgument};
use crate::error::CodecError;
use crate::proto::{ProtoCallContractAttachment, ProtoStoreToIpfsAttachment};
use prost::Message;

/// Payload of a `CallContract` transaction: method name plus raw argument slots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallContractAttachment {
    pub method: String,
    pub args: Vec<Vec<u8>>,
}

impl CallContractAttachment {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: Vec::new(),
        }
    }

    /// Replace the argument slots with the encoding of `args`.
    pub fn set_args(&mut self, args: &[ContractArgument]) -> Result<&mut Self, CodecError> {
        self.args = arguments_to_bytes(args)?;
        Ok(self)
    }

    /// Decode the argument slots using one format per position.
    pub fn get_args(&self, formats: &[ArgumentFormat]) -> Result<Vec<ContractArgument>, CodecError> {
        arguments_from_bytes(formats, &self.args)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let proto = ProtoCallContractAttachment::decode(bytes)
            .map_err(|e| CodecError::malformed(format!("call contract attachment: {e}")))?;
        Ok(Self {
            method: proto.method,
            args: proto.args,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        ProtoCallContractAttachment {
            method: self.method.clone(),
            args: self.args.clone(),
        }
        .encode_to_vec()
    }
}

/// Payload of a `StoreToIpfs` transaction; `size` drives the gas surcharge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreToIpfsAttachment {
    pub cid: Vec<u8>,
    pub size: u32,
}

impl StoreToIpfsAttachment {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let proto = ProtoStoreToIpfsAttachment::decode(bytes)
            .map_err(|e| CodecError::malformed(format!("store to ipfs attachment: {e}")))?;
        Ok(Self {
            cid: proto.cid,
            size: proto.size,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        ProtoStoreToIpfsAttachment {
            cid: self.cid.clone(),
            size: self.size,
        }
        .encode_to_vec()
    }
}
