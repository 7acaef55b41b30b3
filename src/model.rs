//! Domain types mirrored from the LifelineDAG contract.
//!
//! Everything here is authoritative on-chain; the client only holds copies
//! for display.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a sector or emergency type cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Responder sector an identity registers under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Healthcare,
    Security,
    Government,
    Ngo,
    Volunteer,
    Research,
}

impl Sector {
    pub const ALL: [Sector; 6] = [
        Sector::Healthcare,
        Sector::Security,
        Sector::Government,
        Sector::Ngo,
        Sector::Volunteer,
        Sector::Research,
    ];

    /// Contract encoding.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Sector::Healthcare => "Healthcare & Medical",
            Sector::Security => "Security & Defense",
            Sector::Government => "Government Agency",
            Sector::Ngo => "NGO & Humanitarian",
            Sector::Volunteer => "Volunteer Responder",
            Sector::Research => "Research & Academia",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Sector::Healthcare => "healthcare",
            Sector::Security => "security",
            Sector::Government => "government",
            Sector::Ngo => "ngo",
            Sector::Volunteer => "volunteer",
            Sector::Research => "research",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Sector {
    type Err = ParseEnumError;

    /// Accepts the slug (`ngo`) or the contract code (`3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if let Ok(code) = s.parse::<u8>() {
            if let Some(sector) = Self::from_code(code) {
                return Ok(sector);
            }
        }
        Self::ALL
            .into_iter()
            .find(|sector| sector.slug() == s)
            .ok_or(ParseEnumError { kind: "sector", value: s })
    }
}

/// Category of a declared crisis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyType {
    NaturalDisaster,
    Medical,
    Security,
    Infrastructure,
    Wildfire,
    Flood,
}

impl EmergencyType {
    pub const ALL: [EmergencyType; 6] = [
        EmergencyType::NaturalDisaster,
        EmergencyType::Medical,
        EmergencyType::Security,
        EmergencyType::Infrastructure,
        EmergencyType::Wildfire,
        EmergencyType::Flood,
    ];

    /// Contract encoding.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            EmergencyType::NaturalDisaster => "Natural Disaster",
            EmergencyType::Medical => "Medical Emergency",
            EmergencyType::Security => "Security Threat",
            EmergencyType::Infrastructure => "Infrastructure Failure",
            EmergencyType::Wildfire => "Wildfire Emergency",
            EmergencyType::Flood => "Flood Emergency",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            EmergencyType::NaturalDisaster => "natural-disaster",
            EmergencyType::Medical => "medical",
            EmergencyType::Security => "security",
            EmergencyType::Infrastructure => "infrastructure",
            EmergencyType::Wildfire => "wildfire",
            EmergencyType::Flood => "flood",
        }
    }
}

impl fmt::Display for EmergencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EmergencyType {
    type Err = ParseEnumError;

    /// Accepts the slug (`natural-disaster`, `natural_disaster`) or the contract code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase().replace('_', "-");
        if let Ok(code) = s.parse::<u8>() {
            if let Some(kind) = Self::from_code(code) {
                return Ok(kind);
            }
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or(ParseEnumError { kind: "emergency type", value: s })
    }
}

/// A registered responder identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub wallet: Address,
    pub did: String,
    pub sector: Sector,
    pub metadata_uri: Option<String>,
    pub verified: bool,
    /// Unix seconds.
    pub registered_at: u64,
    /// Unix seconds; zero when never verified.
    pub last_verified: u64,
}

/// A declared crisis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crisis {
    pub id: U256,
    pub emergency_type: EmergencyType,
    pub location: String,
    pub encrypted_data: Option<String>,
    pub data_hash: Option<String>,
    pub declared_by: Address,
    /// Unix seconds.
    pub declared_at: u64,
    pub verified: bool,
    pub verification_count: u64,
}

/// One access grant against a crisis, either explicit or break-glass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub crisis_id: U256,
    pub user: Address,
    pub granted_at: u64,
    pub expires_at: u64,
    /// Set for break-glass access.
    pub emergency: bool,
}

impl AccessLogEntry {
    pub fn is_active_at(&self, now: u64) -> bool {
        self.expires_at > now
    }
}

/// Crisis identifier reported back from a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisIdOutcome {
    Assigned(U256),
    /// The receipt carried no decodable `CrisisDeclared` log.
    Unknown,
}

impl fmt::Display for CrisisIdOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrisisIdOutcome::Assigned(id) => write!(f, "{}", id),
            CrisisIdOutcome::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Local input problems caught before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("DID must start with \"did:\" prefix")]
    InvalidDid,

    #[error("Location is required")]
    MissingLocation,

    #[error("Access duration must be greater than zero")]
    ZeroDuration,
}

/// State-changing contract actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    RegisterIdentity {
        did: String,
        sector: Sector,
        metadata_uri: Option<String>,
    },
    DeclareEmergency {
        emergency_type: EmergencyType,
        location: String,
        encrypted_data: Option<String>,
        data_hash: Option<String>,
        initial_responders: Vec<Address>,
    },
    VerifyCrisis {
        crisis_id: U256,
        signatures: Vec<Bytes>,
    },
    GrantAccess {
        crisis_id: U256,
        grantee: Address,
        duration_secs: u64,
    },
    /// Break-glass access for the caller.
    EmergencyAccess { crisis_id: U256 },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::RegisterIdentity { .. } => ActionKind::RegisterIdentity,
            Action::DeclareEmergency { .. } => ActionKind::DeclareEmergency,
            Action::VerifyCrisis { .. } => ActionKind::VerifyCrisis,
            Action::GrantAccess { .. } => ActionKind::GrantAccess,
            Action::EmergencyAccess { .. } => ActionKind::EmergencyAccess,
        }
    }

    /// Check the parameters without touching the network.
    pub fn validate(&self) -> Result<(), InputError> {
        match self {
            Action::RegisterIdentity { did, .. } => {
                if !did.starts_with("did:") || did.len() == "did:".len() {
                    return Err(InputError::InvalidDid);
                }
            }
            Action::DeclareEmergency { location, .. } => {
                if location.trim().is_empty() {
                    return Err(InputError::MissingLocation);
                }
            }
            Action::GrantAccess { duration_secs, .. } => {
                if *duration_secs == 0 {
                    return Err(InputError::ZeroDuration);
                }
            }
            Action::VerifyCrisis { .. } | Action::EmergencyAccess { .. } => {}
        }
        Ok(())
    }
}

/// Type tag of an action, used in the transaction log and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    RegisterIdentity,
    DeclareEmergency,
    VerifyCrisis,
    GrantAccess,
    EmergencyAccess,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::RegisterIdentity => "register_identity",
            ActionKind::DeclareEmergency => "declare_emergency",
            ActionKind::VerifyCrisis => "verify_crisis",
            ActionKind::GrantAccess => "grant_access",
            ActionKind::EmergencyAccess => "emergency_access",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only contract views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    AllCrises,
    Crisis(U256),
    CrisisCount,
    Identity(Address),
    IsVerified(Address),
    CanAccess { crisis_id: U256, user: Address },
    AccessLogs(U256),
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::AllCrises => "all_crises",
            View::Crisis(_) => "crisis",
            View::CrisisCount => "crisis_count",
            View::Identity(_) => "identity",
            View::IsVerified(_) => "is_verified",
            View::CanAccess { .. } => "can_access",
            View::AccessLogs(_) => "access_logs",
        }
    }
}

/// Decoded result of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "view", content = "value")]
pub enum ViewOutput {
    Crises(Vec<Crisis>),
    Crisis(Option<Crisis>),
    Count(U256),
    Identity(Option<Identity>),
    Verified(bool),
    CanAccess(bool),
    AccessLogs(Vec<AccessLogEntry>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_parsing() {
        assert_eq!("ngo".parse::<Sector>().unwrap(), Sector::Ngo);
        assert_eq!("3".parse::<Sector>().unwrap(), Sector::Ngo);
        assert_eq!(" Research ".parse::<Sector>().unwrap(), Sector::Research);
        assert!("9".parse::<Sector>().is_err());
        assert_eq!(
            "pilot".parse::<Sector>().unwrap_err().to_string(),
            "unknown sector 'pilot'"
        );
    }

    #[test]
    fn test_emergency_type_codes() {
        for kind in EmergencyType::ALL {
            assert_eq!(EmergencyType::from_code(kind.code()), Some(kind));
        }
        assert_eq!(EmergencyType::Flood.code(), 5);
        assert_eq!(
            "natural_disaster".parse::<EmergencyType>().unwrap(),
            EmergencyType::NaturalDisaster
        );
        assert_eq!(EmergencyType::from_code(6), None);
    }

    #[test]
    fn test_declare_requires_location() {
        let action = Action::DeclareEmergency {
            emergency_type: EmergencyType::Flood,
            location: "   ".into(),
            encrypted_data: None,
            data_hash: None,
            initial_responders: vec![],
        };
        assert_eq!(action.validate(), Err(InputError::MissingLocation));
    }

    #[test]
    fn test_register_requires_did_prefix() {
        let action = |did: &str| Action::RegisterIdentity {
            did: did.into(),
            sector: Sector::Healthcare,
            metadata_uri: None,
        };
        assert_eq!(action("ethr:0x1").validate(), Err(InputError::InvalidDid));
        assert_eq!(action("did:").validate(), Err(InputError::InvalidDid));
        assert!(action("did:ethr:0x1").validate().is_ok());
    }

    #[test]
    fn test_crisis_id_outcome_display() {
        assert_eq!(CrisisIdOutcome::Assigned(U256::from(7)).to_string(), "7");
        assert_eq!(CrisisIdOutcome::Unknown.to_string(), "Unknown");
    }
}
