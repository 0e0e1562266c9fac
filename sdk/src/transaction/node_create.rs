//! Adds a node to the network address book.
//!
//! Gossip endpoints given only by domain name are sent with the first
//! service endpoint's address instead, when one exists. The rewrite happens at encode time only, so a decoded copy holds the
//! rewritten endpoint.

use std::net::Ipv4Addr;

use super::chunk::ChunkRange;
use super::endpoint::{
    endpoints_from_wire, validate_description, validate_gossip_ca_certificate,
    validate_gossip_endpoints, validate_grpc_certificate_hash, validate_service_endpoints,
    Endpoint,
};
use super::lifecycle::{single_chunk, unexpected_body, Transaction, TransactionData};
use crate::codec::{BodyData, NodeCreateData, WireEndpoint};
use crate::config;
use crate::crypto::PublicKey;
use crate::error::{Error, Result};
use crate::id::{AccountId, LedgerId, ValidateChecksums};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeCreate {
    pub account_id: Option<AccountId>,
    pub description: String,
    pub gossip_endpoints: Vec<Endpoint>,
    pub service_endpoints: Vec<Endpoint>,
    pub gossip_ca_certificate: Option<Vec<u8>>,
    pub grpc_certificate_hash: Option<Vec<u8>>,
    pub admin_key: Option<PublicKey>,
    pub decline_reward: bool,
    pub grpc_web_proxy_endpoint: Option<Endpoint>,
}

pub type NodeCreateTransaction = Transaction<NodeCreate>;

/// Appends one endpoint, keeping the list under `max`.
pub(crate) fn push_endpoint(
    list: &mut Vec<Endpoint>,
    endpoint: Endpoint,
    max: usize,
    what: &str,
) -> Result<()> {
    endpoint.validate()?;
    if list.len() >= max {
        return Err(Error::argument(format!(
            "{what} endpoints list must not contain more than {max} entries"
        )));
    }
    list.push(endpoint);
    Ok(())
}

impl Transaction<NodeCreate> {
    pub fn set_account_id(&mut self, account_id: AccountId) -> Result<&mut Self> {
        self.data_mut()?.account_id = Some(account_id);
        Ok(self)
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        let description = description.into();
        validate_description(&description)?;
        self.data_mut()?.description = description;
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
        self.data_mut()?.decline_reward = decline_reward;
        Ok(self)
    }

    pub fn set_grpc_web_proxy_endpoint(&mut self, endpoint: Endpoint) -> Result<&mut Self> {
        self.require_not_frozen()?;
        endpoint.validate()?;
        self.data_mut()?.grpc_web_proxy_endpoint = Some(endpoint);
        Ok(self)
    }

    pub fn gossip_endpoints(&self) -> &[Endpoint] {
        &self.data().gossip_endpoints
    }

    pub fn service_endpoints(&self) -> &[Endpoint] {
        &self.data().service_endpoints
    }

    pub fn description(&self) -> &str {
        &self.data().description
    }
}

/// Gossip endpoints as sent: domain-only entries take the first service
/// address, keeping their port. Everything else goes out untouched.
fn gossip_to_wire(gossip: &[Endpoint], service: &[Endpoint]) -> Vec<WireEndpoint> {
    let fallback: Option<Ipv4Addr> = service.iter().find_map(|e| e.address);
    gossip
        .iter()
        .map(|endpoint| match fallback {
            Some(address) if endpoint.address.is_none() && endpoint.has_domain() => {
                Endpoint::from_ip(address, endpoint.port).to_wire()
            }
            _ => endpoint.to_wire(),
        })
        .collect()
}

impl ValidateChecksums for NodeCreate {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.account_id.validate_checksums(ledger)
    }
}

impl TransactionData for NodeCreate {
    const NAME: &'static str = "NodeCreateTransaction";

    fn body_data(&self, _chunk: &ChunkRange) -> Result<BodyData> {
        Ok(BodyData::NodeCreate(NodeCreateData {
            account_id: self.account_id.clone(),
            description: self.description.clone(),
            gossip_endpoints: gossip_to_wire(&self.gossip_endpoints, &self.service_endpoints),
            service_endpoints: self.service_endpoints.iter().map(Endpoint::to_wire).collect(),
            gossip_ca_certificate: self.gossip_ca_certificate.clone().unwrap_or_default(),
            grpc_certificate_hash: self.grpc_certificate_hash.clone().unwrap_or_default(),
            admin_key: self.admin_key,
            decline_reward: self.decline_reward,
            grpc_web_proxy_endpoint: self.grpc_web_proxy_endpoint.as_ref().map(Endpoint::to_wire),
        }))
    }

    fn from_body_data(chunks: Vec<BodyData>) -> Result<Self> {
        let data = match single_chunk::<Self>(chunks)? {
            BodyData::NodeCreate(data) => data,
            other => return Err(unexpected_body::<Self>(&other)),
        };
        Ok(Self {
            account_id: data.account_id,
            description: data.description,
            gossip_endpoints: endpoints_from_wire(data.gossip_endpoints)?,
            service_endpoints: endpoints_from_wire(data.service_endpoints)?,
            gossip_ca_certificate: Some(data.gossip_ca_certificate).filter(|c| !c.is_empty()),
            grpc_certificate_hash: Some(data.grpc_certificate_hash).filter(|h| !h.is_empty()),
            admin_key: data.admin_key,
            decline_reward: data.decline_reward,
            grpc_web_proxy_endpoint: data
                .grpc_web_proxy_endpoint
                .map(Endpoint::from_wire)
                .transpose()?,
        })
    }
}
