//! Removes a node from the network address book.

use super::chunk::ChunkRange;
use super::lifecycle::{single_chunk, unexpected_body, Transaction, TransactionData};
use crate::codec::{BodyData, NodeDeleteData};
use crate::error::{Error, Result};
use crate::id::{LedgerId, ValidateChecksums};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDelete {
    pub node_id: Option<u64>,
}

pub type NodeDeleteTransaction = Transaction<NodeDelete>;

impl Transaction<NodeDelete> {
    pub fn set_node_id(&mut self, node_id: u64) -> Result<&mut Self> {
        self.data_mut()?.node_id = Some(node_id);
        Ok(self)
    }

    pub fn node_id(&self) -> Result<u64> {
        self.data().node_id.ok_or_else(|| {
            Error::state(format!("{}: 'nodeId' has not been set", NodeDelete::NAME))
        })
    }
}

impl ValidateChecksums for NodeDelete {
    fn validate_checksums(&self, _ledger: &LedgerId) -> Result<()> {
        Ok(())
    }
}

impl TransactionData for NodeDelete {
    const NAME: &'static str = "NodeDeleteTransaction";

    fn check_freeze(&self) -> Result<()> {
        if self.node_id.is_none() {
            return Err(Error::state(format!(
                "{}: 'nodeId' must be explicitly set before calling freeze()",
                Self::NAME
            )));
        }
        Ok(())
    }

    fn body_data(&self, _chunk: &ChunkRange) -> Result<BodyData> {
        Ok(BodyData::NodeDelete(NodeDeleteData {
            node_id: self.node_id,
        }))
    }

    fn from_body_data(chunks: Vec<BodyData>) -> Result<Self> {
        match single_chunk::<Self>(chunks)? {
            BodyData::NodeDelete(data) => Ok(Self {
                node_id: data.node_id,
            }),
            other => Err(unexpected_body::<Self>(&other)),
        }
    }
}
