//! Protobuf wire messages shared with the node.
//!
//! Field numbers are fixed by the node's `models.proto`; proto3 rules apply, so zero
//! integers and empty byte strings are omitted from the encoding.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoTransaction {
    #[prost(message, optional, tag = "1")]
    pub data: ::core::option::Option<ProtoTransactionData>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: ::prost::alloc::vec::Vec<u8>,
}

/// Signed portion of a transaction (`ProtoTransaction.Data`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoTransactionData {
    #[prost(uint32, tag = "1")]
    pub nonce: u32,
    #[prost(uint32, tag = "2")]
    pub epoch: u32,
    #[prost(uint32, tag = "3")]
    pub r#type: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub to: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub amount: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "6")]
    pub max_fee: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "7")]
    pub tips: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "8")]
    pub payload: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoCallContractAttachment {
    #[prost(string, tag = "1")]
    pub method: ::prost::alloc::string::String,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub args: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoStoreToIpfsAttachment {
    #[prost(bytes = "vec", tag = "1")]
    pub cid: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub size: u32,
}
