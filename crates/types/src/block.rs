//! Block: a header plus the opaque payloads the executor consumes.

use crate::{BlockHash, Bytes, Hashable, Header};
use serde::{Deserialize, Serialize};

/// A block as handed to the engine by external producers.
///
/// The header chain only indexes the header; transaction payloads pass
/// through untouched to the block executor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    header: Header,
    transactions: Vec<Bytes>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Bytes>) -> Self {
        Self { header, transactions }
    }

    /// A block carrying no payloads, useful when only the header matters.
    pub fn from_header(header: Header) -> Self {
        Self { header, transactions: Vec::new() }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn transactions(&self) -> &[Bytes] {
        &self.transactions
    }

    pub fn into_header(self) -> Header {
        self.header
    }

    /// A block's identity is its header's identity.
    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }
}

impl Hashable for Block {
    fn hash(&self) -> BlockHash {
        Block::hash(self)
    }
}
