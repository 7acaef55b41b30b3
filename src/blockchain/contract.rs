//! LifelineDAG contract bindings.
//!
//! The ABI below mirrors the deployed contract; conversions turn its raw
//! tuples into the crate's domain types.

use alloy::primitives::{Address, U256};
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;

use crate::blockchain::types::{BackendError, BackendResult};
use crate::model::{AccessLogEntry, Crisis, CrisisIdOutcome, EmergencyType, Identity, Sector};

sol! {
    #[sol(rpc)]
    contract LifelineDAG {
        struct Identity {
            address wallet;
            string did;
            uint8 sector;
            string metadataURI;
            bool verified;
            uint256 registrationDate;
            uint256 lastVerified;
        }

        struct Crisis {
            uint256 crisisId;
            uint8 emergencyType;
            string location;
            string encryptedData;
            string dataHash;
            address declaredBy;
            uint256 timestamp;
            bool verified;
            uint256 verificationCount;
        }

        struct AccessLog {
            address user;
            uint256 crisisId;
            uint256 grantedAt;
            uint256 expiresAt;
            bool emergency;
        }

        event IdentityRegistered(address indexed wallet, string did, uint8 sector);
        event CrisisDeclared(uint256 indexed crisisId, address indexed declaredBy, uint8 emergencyType, string location);
        event CrisisVerified(uint256 indexed crisisId, address indexed verifier, uint256 verificationCount);
        event AccessGranted(uint256 indexed crisisId, address indexed user, uint256 expiresAt);
        event EmergencyAccessUsed(uint256 indexed crisisId, address indexed user, uint256 timestamp);

        function registerIdentity(string calldata did, uint8 sector, string calldata metadataURI) external;
        function declareEmergency(uint8 emergencyType, string calldata location, string calldata encryptedData, string calldata dataHash, address[] calldata initialResponders) external returns (uint256);
        function verifyCrisis(uint256 crisisId, bytes[] calldata signatures) external;
        function grantCrisisAccess(uint256 crisisId, address user, uint256 duration) external;
        function emergencyAccess(uint256 crisisId) external;

        function getAllCrises() external view returns (Crisis[] memory);
        function getCrisis(uint256 crisisId) external view returns (Crisis memory);
        function getCrisisCount() external view returns (uint256);
        function getIdentity(address wallet) external view returns (Identity memory);
        function isIdentityVerified(address wallet) external view returns (bool);
        function canAccessCrisis(uint256 crisisId, address user) external view returns (bool);
        function getCrisisAccessLogs(uint256 crisisId) external view returns (AccessLog[] memory);
    }
}

fn seconds(value: U256) -> u64 {
    value.try_into().unwrap_or(u64::MAX)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn decode_error(what: &str, code: u8) -> BackendError {
    BackendError::Rpc {
        code: None,
        message: format!("contract returned unknown {} code {}", what, code),
    }
}

/// Convert a raw identity; a zero wallet means "not registered".
pub fn identity_from_raw(raw: LifelineDAG::Identity) -> BackendResult<Option<Identity>> {
    if raw.wallet == Address::ZERO {
        return Ok(None);
    }
    let sector = Sector::from_code(raw.sector).ok_or_else(|| decode_error("sector", raw.sector))?;
    Ok(Some(Identity {
        wallet: raw.wallet,
        did: raw.did,
        sector,
        metadata_uri: non_empty(raw.metadataURI),
        verified: raw.verified,
        registered_at: seconds(raw.registrationDate),
        last_verified: seconds(raw.lastVerified),
    }))
}

/// Convert a raw crisis; a zero declarer means the id does not exist.
pub fn crisis_from_raw(raw: LifelineDAG::Crisis) -> BackendResult<Option<Crisis>> {
    if raw.declaredBy == Address::ZERO {
        return Ok(None);
    }
    let emergency_type = EmergencyType::from_code(raw.emergencyType)
        .ok_or_else(|| decode_error("emergency type", raw.emergencyType))?;
    Ok(Some(Crisis {
        id: raw.crisisId,
        emergency_type,
        location: raw.location,
        encrypted_data: non_empty(raw.encryptedData),
        data_hash: non_empty(raw.dataHash),
        declared_by: raw.declaredBy,
        declared_at: seconds(raw.timestamp),
        verified: raw.verified,
        verification_count: seconds(raw.verificationCount),
    }))
}

pub fn access_log_from_raw(raw: LifelineDAG::AccessLog) -> AccessLogEntry {
    AccessLogEntry {
        crisis_id: raw.crisisId,
        user: raw.user,
        granted_at: seconds(raw.grantedAt),
        expires_at: seconds(raw.expiresAt),
        emergency: raw.emergency,
    }
}

/// Pull the newly assigned crisis id out of a declaration receipt.
pub fn crisis_id_from_logs(logs: &[Log]) -> CrisisIdOutcome {
    logs.iter()
        .find_map(|log| log.log_decode::<LifelineDAG::CrisisDeclared>().ok())
        .map(|decoded| CrisisIdOutcome::Assigned(decoded.inner.data.crisisId))
        .unwrap_or(CrisisIdOutcome::Unknown)
}

/// Build the log a `CrisisDeclared` emission produces.
pub fn crisis_declared_log(contract: Address, event: &LifelineDAG::CrisisDeclared) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: contract,
            data: event.encode_log_data(),
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, LogData};

    const DECLARER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    #[test]
    fn test_crisis_id_decoded_from_declaration_log() {
        let event = LifelineDAG::CrisisDeclared {
            crisisId: U256::from(42),
            declaredBy: DECLARER,
            emergencyType: EmergencyType::Flood.code(),
            location: "Northern River Basin".into(),
        };
        let logs = vec![crisis_declared_log(Address::ZERO, &event)];
        assert_eq!(crisis_id_from_logs(&logs), CrisisIdOutcome::Assigned(U256::from(42)));
    }

    #[test]
    fn test_unrelated_logs_yield_unknown() {
        let unrelated = Log {
            inner: alloy::primitives::Log {
                address: Address::ZERO,
                data: LogData::new_unchecked(vec![], Default::default()),
            },
            ..Default::default()
        };
        assert_eq!(crisis_id_from_logs(&[unrelated]), CrisisIdOutcome::Unknown);
        assert_eq!(crisis_id_from_logs(&[]), CrisisIdOutcome::Unknown);
    }

    #[test]
    fn test_unregistered_identity_is_none() {
        let raw = LifelineDAG::Identity {
            wallet: Address::ZERO,
            did: String::new(),
            sector: 0,
            metadataURI: String::new(),
            verified: false,
            registrationDate: U256::ZERO,
            lastVerified: U256::ZERO,
        };
        assert_eq!(identity_from_raw(raw).unwrap(), None);
    }

    #[test]
    fn test_unknown_emergency_code_is_an_error() {
        let raw = LifelineDAG::Crisis {
            crisisId: U256::from(1),
            emergencyType: 9,
            location: "Metro".into(),
            encryptedData: String::new(),
            dataHash: String::new(),
            declaredBy: DECLARER,
            timestamp: U256::from(1_700_000_000u64),
            verified: false,
            verificationCount: U256::ZERO,
        };
        assert!(crisis_from_raw(raw).is_err());
    }
}
