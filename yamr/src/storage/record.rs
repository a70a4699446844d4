//! Payload messages for Node and Leaf chunks.
//!
//! Payloads are protobuf-encoded so that the record layout is self-describing
//! and tolerant of added fields.

/// An internal node: the low child plus separator → child offset pairs.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct NodeRecord {
    /// Offset of the child holding every key below the first separator.
    #[prost(uint64, tag = "1")]
    pub rest: u64,
    /// Separators in ascending order.
    #[prost(message, repeated, tag = "2")]
    pub entries: Vec<NodeEntry>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct NodeEntry {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub child: u64,
}

/// A leaf: key → value pairs in ascending key order.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct LeafRecord {
    #[prost(message, repeated, tag = "1")]
    pub entries: Vec<LeafEntry>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct LeafEntry {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// A list of strings, the value type of `Database`.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct StringList {
    #[prost(string, repeated, tag = "1")]
    pub items: Vec<String>,
}
