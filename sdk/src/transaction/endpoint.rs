//! Node endpoints for node-management transactions.

use std::fmt;
use std::net::Ipv4Addr;

use crate::codec::WireEndpoint;
use crate::config;
use crate::error::{Error, Result};

/// Where a node can be reached: an IPv4 address *or* a domain name, plus a
/// port. Never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Endpoint {
    pub address: Option<Ipv4Addr>,
    pub domain_name: String,
    pub port: u32,
}

impl Endpoint {
    /// Validating constructor.
    pub fn new(address: Option<Ipv4Addr>, domain_name: impl Into<String>, port: u32) -> Result<Self> {
        let endpoint = Self {
            address,
            domain_name: domain_name.into(),
            port,
        };
        endpoint.validate()?;
        Ok(endpoint)
    }

    pub fn from_ip(address: Ipv4Addr, port: u32) -> Self {
        Self {
            address: Some(address),
            domain_name: String::new(),
            port,
        }
    }

    pub fn from_domain(domain_name: impl Into<String>, port: u32) -> Self {
        Self {
            address: None,
            domain_name: domain_name.into(),
            port,
        }
    }

    pub fn has_domain(&self) -> bool {
        !self.domain_name.is_empty()
    }

    /// Rejects an endpoint that names both an address and a domain.
    pub fn validate(&self) -> Result<()> {
        if self.address.is_some() && self.has_domain() {
            return Err(Error::argument(
                "Endpoint must not contain both ipAddressV4 and domainName",
            ));
        }
        Ok(())
    }

    pub(crate) fn to_wire(&self) -> WireEndpoint {
        WireEndpoint {
            ip_address_v4: self.address.map(|a| a.octets().to_vec()).unwrap_or_default(),
            domain_name: self.domain_name.clone(),
            port: self.port,
        }
    }

    pub(crate) fn from_wire(wire: WireEndpoint) -> Result<Self> {
        let address = match wire.ip_address_v4.as_slice() {
            [] => None,
            [a, b, c, d] => Some(Ipv4Addr::new(*a, *b, *c, *d)),
            other => {
                return Err(Error::decoding(format!(
                    "ipAddressV4 must be 4 bytes, found {}",
                    other.len()
                )))
            }
        };
        Ok(Self {
            address,
            domain_name: wire.domain_name,
            port: wire.port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            Some(address) => write!(f, "{address}:{}", self.port),
            None => write!(f, "{}:{}", self.domain_name, self.port),
        }
    }
}

// ---------------------------------------------------------------------------
// List & Field Validation
// ---------------------------------------------------------------------------

pub(crate) fn validate_gossip_endpoints(endpoints: &[Endpoint]) -> Result<()> {
    if endpoints.is_empty() {
        return Err(Error::argument("Gossip endpoints list must not be empty"));
    }
    if endpoints.len() > config::MAX_GOSSIP_ENDPOINTS {
        return Err(Error::argument(format!(
            "Gossip endpoints list must not contain more than {} entries",
            config::MAX_GOSSIP_ENDPOINTS
        )));
    }
    endpoints.iter().try_for_each(Endpoint::validate)
}

pub(crate) fn validate_service_endpoints(endpoints: &[Endpoint]) -> Result<()> {
    if endpoints.is_empty() {
        return Err(Error::argument("Service endpoints list must not be empty"));
    }
    if endpoints.len() > config::MAX_SERVICE_ENDPOINTS {
        return Err(Error::argument(format!(
            "Service endpoints list must not contain more than {} entries",
            config::MAX_SERVICE_ENDPOINTS
        )));
    }
    endpoints.iter().try_for_each(Endpoint::validate)
}

pub(crate) fn validate_description(description: &str) -> Result<()> {
    if description.len() > config::MAX_NODE_DESCRIPTION_BYTES {
        return Err(Error::argument(format!(
            "Description must not exceed {} bytes when encoded as UTF-8",
            config::MAX_NODE_DESCRIPTION_BYTES
        )));
    }
    Ok(())
}

pub(crate) fn validate_gossip_ca_certificate(certificate: &[u8]) -> Result<()> {
    if certificate.is_empty() {
        return Err(Error::argument("Gossip CA certificate must not be null or empty"));
    }
    Ok(())
}

pub(crate) fn validate_grpc_certificate_hash(hash: &[u8]) -> Result<()> {
    if hash.len() != config::GRPC_CERTIFICATE_HASH_LENGTH {
        return Err(Error::argument(format!(
            "gRPC certificate hash must be exactly {} bytes (SHA-384)",
            config::GRPC_CERTIFICATE_HASH_LENGTH
        )));
    }
    Ok(())
}

pub(crate) fn endpoints_from_wire(wire: Vec<WireEndpoint>) -> Result<Vec<Endpoint>> {
    wire.into_iter().map(Endpoint::from_wire).collect()
}
