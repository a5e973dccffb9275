//! The combined authorization check.

use crate::abuse::AbuseTracker;
use crate::identity::OwnerVerifier;
use crate::limiter::{RateDecision, RateLimiter};
use crate::permissions::{PermissionSource, PermissionTable};
use crate::role::{Role, RoleResolver};
use crate::safety::{self, SafetyReport};
use herald_core::config::GuardConfig;
use herald_core::error::HeraldError;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Why an invocation was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The actor is on the block list. No role was resolved.
    Blocked,
    /// The gate is locked down and the actor is not the owner.
    Lockdown { role: Role },
    /// The actor's role may not run this command.
    Forbidden { role: Role, command: String },
    /// Too many invocations of this command in the window.
    RateLimited { role: Role, retry_after_secs: u64 },
}

impl Denial {
    /// The resolved role, if resolution happened before the rejection.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Blocked => None,
            Self::Lockdown { role }
            | Self::Forbidden { role, .. }
            | Self::RateLimited { role, .. } => Some(*role),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Lockdown { .. } => "lockdown",
            Self::Forbidden { .. } => "forbidden",
            Self::RateLimited { .. } => "rate_limited",
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocked => write!(f, "actor is blocked"),
            Self::Lockdown { .. } => write!(f, "lockdown active"),
            Self::Forbidden { role, command } => write!(f, "role {role} may not run '{command}'"),
            Self::RateLimited { retry_after_secs, .. } => {
                write!(f, "rate limited, retry in {retry_after_secs}s")
            }
        }
    }
}

impl From<Denial> for HeraldError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Blocked | Denial::Lockdown { .. } => HeraldError::Blocked,
            Denial::Forbidden { role, command } => HeraldError::Forbidden {
                command,
                role: role.to_string(),
            },
            Denial::RateLimited {
                retry_after_secs, ..
            } => HeraldError::RateLimited { retry_after_secs },
        }
    }
}

/// Point-in-time view of guard state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityStatus {
    pub blocked: usize,
    pub rate_keys: usize,
    pub suspicious_events: usize,
    pub permission_count: usize,
    pub lockdown: Option<String>,
}

/// Authorization gate: block list, role, lockdown, permission, then rate.
pub struct Gate {
    resolver: RoleResolver,
    permissions: PermissionTable,
    abuse: Arc<AbuseTracker>,
    limiter: RateLimiter,
    lockdown: RwLock<Option<String>>,
}

impl Gate {
    pub fn new(verifier: Arc<OwnerVerifier>, config: &GuardConfig) -> Self {
        let abuse = Arc::new(AbuseTracker::new(
            config.abuse_threshold,
            Duration::from_secs(config.abuse_window_secs),
        ));
        let limiter = RateLimiter::new(
            config.rate_limit,
            Duration::from_secs(config.rate_window_secs),
            abuse.clone(),
        );
        Self {
            resolver: RoleResolver::new(verifier),
            permissions: PermissionTable::default(),
            abuse,
            limiter,
            lockdown: RwLock::new(None),
        }
    }

    pub fn authorize(&self, actor_id: &str, command: &str, admins: &[String]) -> Result<Role, Denial> {
        self.authorize_at(actor_id, command, admins, Instant::now())
    }

    /// Short-circuits on the first failing check. Blocked actors never touch
    /// their rate window.
    pub fn authorize_at(
        &self,
        actor_id: &str,
        command: &str,
        admins: &[String],
        now: Instant,
    ) -> Result<Role, Denial> {
        let command = command.to_ascii_lowercase();

        if self.abuse.is_blocked(actor_id) {
            info!("denied {actor_id} '{command}': blocked");
            return Err(Denial::Blocked);
        }

        let role = self.resolver.resolve(actor_id, admins);

        if role != Role::Owner && self.is_locked_down() {
            info!("denied {actor_id} ({role}) '{command}': lockdown");
            return Err(Denial::Lockdown { role });
        }

        let permission = self.permissions.lookup(&command);
        if permission.source == PermissionSource::DefaultOwnerOnly {
            warn!(
                actor = actor_id,
                command = command.as_str(),
                role = role.as_str(),
                "unknown command, applying owner-only default"
            );
        }
        if !permission.allows(role) {
            warn!(
                actor = actor_id,
                command = command.as_str(),
                role = role.as_str(),
                "forbidden"
            );
            return Err(Denial::Forbidden { role, command });
        }

        match self.limiter.check_at(actor_id, &command, now) {
            RateDecision::Allowed { remaining } => {
                debug!("allowed {actor_id} ({role}) '{command}', {remaining} left in window");
                Ok(role)
            }
            RateDecision::Limited { retry_after_secs } => {
                warn!(
                    actor = actor_id,
                    command = command.as_str(),
                    retry_after_secs,
                    "rate limited"
                );
                Err(Denial::RateLimited {
                    role,
                    retry_after_secs,
                })
            }
        }
    }

    /// Role of an actor without charging any window.
    pub fn role_of(&self, actor_id: &str, admins: &[String]) -> Role {
        self.resolver.resolve(actor_id, admins)
    }

    /// Pattern inspection of a raw command; may escalate the actor to blocked.
    pub fn inspect(&self, actor_id: &str, command: &str, args: &[&str]) -> SafetyReport {
        safety::inspect(&self.abuse, actor_id, command, args)
    }

    pub fn log_suspicious(&self, actor_id: &str, kind: &str, detail: &str) -> bool {
        self.abuse.log_suspicious(actor_id, kind, detail)
    }

    pub fn block(&self, actor_id: &str, reason: &str) -> bool {
        self.abuse.block(actor_id, reason)
    }

    pub fn unblock(&self, actor_id: &str) -> bool {
        self.abuse.unblock(actor_id)
    }

    pub fn is_blocked(&self, actor_id: &str) -> bool {
        self.abuse.is_blocked(actor_id)
    }

    /// Enter lockdown: only the owner passes. Clears the block list and
    /// returns how many actors were released.
    pub fn lockdown(&self, reason: &str) -> usize {
        let released = self.abuse.clear_blocks();
        *self
            .lockdown
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(reason.to_string());
        warn!("security lockdown: {reason} ({released} blocks cleared)");
        released
    }

    /// Leave lockdown. Clears the block list and returns how many actors were released.
    pub fn lift_lockdown(&self) -> usize {
        let released = self.abuse.clear_blocks();
        *self
            .lockdown
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        info!("security lockdown lifted ({released} blocks cleared)");
        released
    }

    pub fn lockdown_reason(&self) -> Option<String> {
        self.lockdown
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_locked_down(&self) -> bool {
        self.lockdown
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Drop abandoned rate and abuse windows. Returns keys removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        self.limiter.sweep(now) + self.abuse.sweep(now)
    }

    pub fn status(&self) -> SecurityStatus {
        SecurityStatus {
            blocked: self.abuse.blocked_count(),
            rate_keys: self.limiter.tracked_keys(),
            suspicious_events: self.abuse.total_events(),
            permission_count: self.permissions.len(),
            lockdown: self.lockdown_reason(),
        }
    }

    pub fn verifier(&self) -> &Arc<OwnerVerifier> {
        self.resolver.verifier()
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    pub fn abuse(&self) -> &AbuseTracker {
        &self.abuse
    }
}
