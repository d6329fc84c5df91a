//! Protobuf payload schemas.
//!
//! Fields are proto2 `optional` so zero values are still written and a
//! missing field can be told apart from a zero one.

/// Payload of a sender key distribution message
#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct DistributionPayload {
    #[prost(int32, optional, tag = "1")]
    pub(crate) id: Option<i32>,
    #[prost(uint32, optional, tag = "2")]
    pub(crate) iteration: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub(crate) chain_key: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub(crate) signing_key: Option<Vec<u8>>,
}

/// Payload of a sender key message (without version byte and signature)
#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SenderKeyPayload {
    #[prost(int32, optional, tag = "1")]
    pub(crate) id: Option<i32>,
    #[prost(uint32, optional, tag = "2")]
    pub(crate) iteration: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub(crate) ciphertext: Option<Vec<u8>>,
}
