//! Changes an existing node's address book entry. Unset fields are left
//! alone by the network; empty endpoint lists mean "keep the current ones".

use super::chunk::ChunkRange;
use super::endpoint::{
    endpoints_from_wire, validate_description, validate_gossip_ca_certificate,
    validate_gossip_endpoints, validate_grpc_certificate_hash, validate_service_endpoints,
    Endpoint,
};
use super::lifecycle::{single_chunk, unexpected_body, Transaction, TransactionData};
use super::node_create::push_endpoint;
use crate::codec::{BodyData, NodeUpdateData};
use crate::config;
use crate::crypto::PublicKey;
use crate::error::{Error, Result};
use crate::id::{AccountId, LedgerId, ValidateChecksums};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeUpdate {
    pub node_id: Option<u64>,
    pub account_id: Option<AccountId>,
    pub description: Option<String>,
    pub gossip_endpoints: Vec<Endpoint>,
    pub service_endpoints: Vec<Endpoint>,
    pub gossip_ca_certificate: Option<Vec<u8>>,
    pub grpc_certificate_hash: Option<Vec<u8>>,
    pub admin_key: Option<PublicKey>,
    pub decline_reward: Option<bool>,
    pub grpc_web_proxy_endpoint: Option<Endpoint>,
}

pub type NodeUpdateTransaction = Transaction<NodeUpdate>;

impl Transaction<NodeUpdate> {
    pub fn set_node_id(&mut self, node_id: u64) -> Result<&mut Self> {
        self.data_mut()?.node_id = Some(node_id);
        Ok(self)
    }

    pub fn node_id(&self) -> Result<u64> {
        self.data().node_id.ok_or_else(|| {
            Error::state(format!("{}: 'nodeId' has not been set", NodeUpdate::NAME))
        })
    }

    pub fn set_account_id(&mut self, account_id: AccountId) -> Result<&mut Self> {
        self.data_mut()?.account_id = Some(account_id);
        Ok(self)
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        let description = description.into();
        validate_description(&description)?;
        self.data_mut()?.description = Some(description);
        Ok(self)
    }

    pub fn set_gossip_endpoints(&mut self, endpoints: Vec<Endpoint>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        validate_gossip_endpoints(&endpoints)?;
        self.data_mut()?.gossip_endpoints = endpoints;
        Ok(self)
    }

    pub fn add_gossip_endpoint(&mut self, endpoint: Endpoint) -> Result<&mut Self> {
        let data = self.data_mut()?;
        push_endpoint(
            &mut data.gossip_endpoints,
            endpoint,
            config::MAX_GOSSIP_ENDPOINTS,
            "Gossip",
        )?;
        Ok(self)
    }

    pub fn set_service_endpoints(&mut self, endpoints: Vec<Endpoint>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        validate_service_endpoints(&endpoints)?;
        self.data_mut()?.service_endpoints = endpoints;
        Ok(self)
    }

    pub fn add_service_endpoint(&mut self, endpoint: Endpoint) -> Result<&mut Self> {
        let data = self.data_mut()?;
        push_endpoint(
            &mut data.service_endpoints,
            endpoint,
            config::MAX_SERVICE_ENDPOINTS,
            "Service",
        )?;
        Ok(self)
    }

    pub fn set_gossip_ca_certificate(&mut self, certificate: Vec<u8>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        validate_gossip_ca_certificate(&certificate)?;
        self.data_mut()?.gossip_ca_certificate = Some(certificate);
        Ok(self)
    }

    pub fn set_grpc_certificate_hash(&mut self, hash: Vec<u8>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        validate_grpc_certificate_hash(&hash)?;
        self.data_mut()?.grpc_certificate_hash = Some(hash);
        Ok(self)
    }

    pub fn set_admin_key(&mut self, key: PublicKey) -> Result<&mut Self> {
        self.data_mut()?.admin_key = Some(key);
        Ok(self)
    }

    pub fn set_decline_reward(&mut self, decline_reward: bool) -> Result<&mut Self> {
        self.data_mut()?.decline_reward = Some(decline_reward);
        Ok(self)
    }

    pub fn set_grpc_web_proxy_endpoint(&mut self, endpoint: Endpoint) -> Result<&mut Self> {
        self.require_not_frozen()?;
        endpoint.validate()?;
        self.data_mut()?.grpc_web_proxy_endpoint = Some(endpoint);
        Ok(self)
    }
}

impl ValidateChecksums for NodeUpdate {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.account_id.validate_checksums(ledger)
    }
}

impl TransactionData for NodeUpdate {
    const NAME: &'static str = "NodeUpdateTransaction";

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
        Ok(BodyData::NodeUpdate(NodeUpdateData {
            node_id: self.node_id,
            account_id: self.account_id.clone(),
            description: self.description.clone(),
            gossip_endpoints: self.gossip_endpoints.iter().map(Endpoint::to_wire).collect(),
            service_endpoints: self.service_endpoints.iter().map(Endpoint::to_wire).collect(),
            gossip_ca_certificate: self.gossip_ca_certificate.clone(),
            grpc_certificate_hash: self.grpc_certificate_hash.clone(),
            admin_key: self.admin_key,
            decline_reward: self.decline_reward,
            grpc_web_proxy_endpoint: self.grpc_web_proxy_endpoint.as_ref().map(Endpoint::to_wire),
        }))
    }

    fn from_body_data(chunks: Vec<BodyData>) -> Result<Self> {
        let data = match single_chunk::<Self>(chunks)? {
            BodyData::NodeUpdate(data) => data,
            other => return Err(unexpected_body::<Self>(&other)),
        };
        Ok(Self {
            node_id: data.node_id,
            account_id: data.account_id,
            description: data.description,
            gossip_endpoints: endpoints_from_wire(data.gossip_endpoints)?,
            service_endpoints: endpoints_from_wire(data.service_endpoints)?,
            gossip_ca_certificate: data.gossip_ca_certificate,
            grpc_certificate_hash: data.grpc_certificate_hash,
            admin_key: data.admin_key,
            decline_reward: data.decline_reward,
            grpc_web_proxy_endpoint: data
                .grpc_web_proxy_endpoint
                .map(Endpoint::from_wire)
                .transpose()?,
        })
    }
}
