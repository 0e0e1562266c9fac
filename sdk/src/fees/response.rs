//! The mirror's fee estimate document.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which fee model the mirror should estimate with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeEstimateMode {
    /// Uses current network state (account existence, token associations...).
    #[default]
    State,
    /// Looks at the transaction bytes alone.
    Intrinsic,
}

impl FeeEstimateMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::State => "STATE",
            Self::Intrinsic => "INTRINSIC",
        }
    }
}

impl fmt::Display for FeeEstimateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One itemized surcharge on top of a base fee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeeExtra {
    pub name: String,
    /// Units covered by the base fee.
    pub included: u64,
    pub count: u64,
    /// Units actually billed, `count - included` floored at zero.
    pub charged: u64,
    pub fee_per_unit: u64,
    pub subtotal: u64,
}

/// A base fee and its extras.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub base: u64,
    #[serde(default)]
    pub extras: Vec<FeeExtra>,
}

impl FeeEstimate {
    /// Base plus every extra's subtotal. Saturates rather than wrapping.
    pub fn subtotal(&self) -> u64 {
        self.extras
            .iter()
            .fold(self.base, |acc, extra| acc.saturating_add(extra.subtotal))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFee {
    pub multiplier: u64,
    pub subtotal: u64,
}

/// Estimated fees in tinybars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimateResponse {
    #[serde(default)]
    pub mode: FeeEstimateMode,
    pub network: NetworkFee,
    pub node: FeeEstimate,
    pub service: FeeEstimate,
    #[serde(default)]
    pub notes: Vec<String>,
    pub total: u64,
}

impl FeeEstimateResponse {
    /// The component sum the total should equal.
    pub fn expected_total(&self) -> u64 {
        self.network
            .subtotal
            .saturating_add(self.node.subtotal())
            .saturating_add(self.service.subtotal())
    }

    /// Whether `total` adds up. A mismatch means we read something other
    /// than what the mirror meant to send.
    pub fn is_consistent(&self) -> bool {
        self.total == self.expected_total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_documented_shape() {
        let json = r#"{
            "mode": "STATE",
            "network": {"multiplier": 2, "subtotal": 12},
            "node": {"base": 6, "extras": []},
            "service": {"base": 8, "extras": []},
            "notes": [],
            "total": 26
        }"#;
        let response: FeeEstimateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.mode, FeeEstimateMode::State);
        assert_eq!(response.network.multiplier, 2);
        assert_eq!(response.total, 26);
        assert!(response.is_consistent());
    }

    #[test]
    fn extras_count_toward_the_subtotal() {
        let json = r#"{
            "mode": "INTRINSIC",
            "network": {"multiplier": 1, "subtotal": 5},
            "node": {"base": 5, "extras": [
                {"name": "SIGNATURES", "included": 1, "count": 3, "charged": 2, "feePerUnit": 4, "subtotal": 8}
            ]},
            "service": {"base": 10},
            "total": 28
        }"#;
        let response: FeeEstimateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.node.extras[0].fee_per_unit, 4);
        assert_eq!(response.node.subtotal(), 13);
        assert!(response.is_consistent());
        assert!(response.notes.is_empty());
    }

    #[test]
    fn wrong_total_is_inconsistent() {
        let response = FeeEstimateResponse {
            mode: FeeEstimateMode::State,
            network: NetworkFee {
                multiplier: 2,
                subtotal: 12,
            },
            node: FeeEstimate {
                base: 6,
                extras: vec![],
            },
            service: FeeEstimate {
                base: 8,
                extras: vec![],
            },
            notes: vec![],
            total: 25,
        };
        assert!(!response.is_consistent());
        assert_eq!(response.expected_total(), 26);
    }

    #[test]
    fn mode_renders_uppercase() {
        assert_eq!(FeeEstimateMode::Intrinsic.to_string(), "INTRINSIC");
        assert_eq!(
            serde_json::to_string(&FeeEstimateMode::State).unwrap(),
            "\"STATE\""
        );
    }
}
