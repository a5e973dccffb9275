//! Owner identity: a single designated owner sealed in a tamper-evident record.
//!
//! The record stores the owner id and an HMAC-SHA256 of it keyed by
//! `SHA256(secret || salt)`. The secret is provisioned by the operator in
//! config; nothing is derived from host identifiers. Any mismatch between the
//! record and the configured owner is treated as tampering.

use chrono::{DateTime, Utc};
use herald_core::error::HeraldError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

const RECORD_SALT: &str = "herald/owner-record/v1";

/// Persisted owner record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub owner_id: String,
    pub integrity_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Why a verification came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyReason {
    Verified,
    NotOwner,
    /// The record was missing and has just been created.
    RecordRecreated,
    /// The record does not match the configured owner and secret.
    IntegrityFailure,
    /// The record could not be read or parsed.
    Unreadable(String),
}

impl fmt::Display for VerifyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => write!(f, "owner verified"),
            Self::NotOwner => write!(f, "not the owner"),
            Self::RecordRecreated => write!(f, "record recreated"),
            Self::IntegrityFailure => write!(f, "owner record integrity check failed"),
            Self::Unreadable(e) => write!(f, "owner record unreadable: {e}"),
        }
    }
}

/// Outcome of `OwnerVerifier::verify`.
#[derive(Debug, Clone)]
pub struct Verification {
    pub is_owner: bool,
    pub reason: VerifyReason,
}

impl Verification {
    fn deny(reason: VerifyReason) -> Self {
        Self {
            is_owner: false,
            reason,
        }
    }
}

/// Health of the owner record.
#[derive(Debug, Clone)]
pub struct OwnerReport {
    pub record_exists: bool,
    pub readable: bool,
    pub hash_valid: bool,
    pub owner_id_matches: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl OwnerReport {
    pub fn is_secure(&self) -> bool {
        self.record_exists && self.readable && self.hash_valid && self.owner_id_matches
    }
}

/// Result of an emergency reset.
#[derive(Debug, Clone)]
pub struct ResetOutcome {
    /// Where the previous record was copied, if there was one.
    pub backup: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

/// Confirms whether an actor is the designated owner.
pub struct OwnerVerifier {
    owner_id: String,
    key: Vec<u8>,
    path: PathBuf,
}

impl OwnerVerifier {
    /// Build a verifier and bootstrap the record if it does not exist yet.
    pub fn open(owner_id: &str, secret: &str, path: &Path) -> Result<Self, HeraldError> {
        if secret.is_empty() {
            return Err(HeraldError::Config("owner secret is empty".into()));
        }
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(HeraldError::Config("owner id is empty".into()));
        }

        let material = format!("{secret}{RECORD_SALT}");
        let verifier = Self {
            owner_id: owner_id.to_string(),
            key: Sha256::digest(material.as_bytes()).to_vec(),
            path: path.to_path_buf(),
        };

        if !verifier.path.exists() {
            verifier.write_record()?;
            info!("owner record created at {}", verifier.path.display());
        }

        Ok(verifier)
    }

    /// The configured owner identifier.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Path of the persisted record.
    pub fn record_path(&self) -> &Path {
        &self.path
    }

    /// Decide whether `actor_id` is the owner.
    ///
    /// Actors that differ from the configured owner are rejected without
    /// touching the record. The configured owner is only confirmed against an
    /// intact record: a missing record is recreated (without granting
    /// ownership for this call) and a tampered or unreadable record denies.
    pub fn verify(&self, actor_id: &str) -> Verification {
        if actor_id.trim() != self.owner_id {
            debug!("not owner: {actor_id}");
            return Verification::deny(VerifyReason::NotOwner);
        }

        let record = match self.load_record() {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(
                    "owner record missing at {}, recreating",
                    self.path.display()
                );
                if let Err(e) = self.write_record() {
                    warn!("failed to recreate owner record: {e}");
                }
                return Verification::deny(VerifyReason::RecordRecreated);
            }
            Err(e) => {
                warn!("owner record unreadable for actor {actor_id}: {e}");
                return Verification::deny(VerifyReason::Unreadable(e.to_string()));
            }
        };

        if !self.is_sealed(&record) {
            warn!(
                "owner record tampered or corrupted (actor {actor_id}, record owner {})",
                record.owner_id
            );
            return Verification::deny(VerifyReason::IntegrityFailure);
        }

        debug!("owner verified: {actor_id}");
        Verification {
            is_owner: true,
            reason: VerifyReason::Verified,
        }
    }

    /// Shorthand for `verify(actor_id).is_owner`.
    pub fn is_owner(&self, actor_id: &str) -> bool {
        self.verify(actor_id).is_owner
    }

    /// Back up the current record beside the original and recreate it from
    /// the configured owner.
    ///
    /// Callers must gate this on ownership; the verifier cannot check itself.
    pub fn emergency_reset(&self) -> Result<ResetOutcome, HeraldError> {
        let backup = if self.path.exists() {
            let mut name = self.path.as_os_str().to_owned();
            name.push(".backup");
            let backup = PathBuf::from(name);
            std::fs::copy(&self.path, &backup)?;
            warn!("owner record backed up to {}", backup.display());
            Some(backup)
        } else {
            None
        };

        let record = self.write_record()?;
        warn!("owner record emergency reset performed");

        Ok(ResetOutcome {
            backup,
            created_at: record.created_at,
        })
    }

    /// Inspect the record without changing it.
    pub fn report(&self) -> OwnerReport {
        let mut report = OwnerReport {
            record_exists: self.path.exists(),
            readable: false,
            hash_valid: false,
            owner_id_matches: false,
            created_at: None,
        };

        if let Ok(Some(record)) = self.load_record() {
            report.readable = true;
            report.hash_valid = self.hash_matches(&record.owner_id, &record.integrity_hash);
            report.owner_id_matches = record.owner_id == self.owner_id;
            report.created_at = Some(record.created_at);
        }

        report
    }

    fn mac(&self) -> Result<HmacSha256, HeraldError> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|e| HeraldError::Integrity(format!("invalid record key: {e}")))
    }

    fn seal(&self, owner_id: &str) -> Result<String, HeraldError> {
        let mut mac = self.mac()?;
        mac.update(owner_id.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn hash_matches(&self, owner_id: &str, integrity_hash: &str) -> bool {
        let Ok(expected) = hex::decode(integrity_hash) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(owner_id.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    fn is_sealed(&self, record: &OwnerRecord) -> bool {
        record.owner_id == self.owner_id
            && self.hash_matches(&record.owner_id, &record.integrity_hash)
    }

    fn load_record(&self) -> Result<Option<OwnerRecord>, HeraldError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write_record(&self) -> Result<OwnerRecord, HeraldError> {
        let record = OwnerRecord {
            owner_id: self.owner_id.clone(),
            integrity_hash: self.seal(&self.owner_id)?,
            created_at: Utc::now(),
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&record)?)?;
        Ok(record)
    }
}
