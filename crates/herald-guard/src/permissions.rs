//! Static command → allowed-roles table.

use crate::role::Role;
use std::collections::HashMap;

const EVERYONE: &[Role] = &[Role::User, Role::Operator, Role::Owner];
const OPERATORS: &[Role] = &[Role::Operator, Role::Owner];
const OWNER_ONLY: &[Role] = &[Role::Owner];

/// Where a permission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionSource {
    /// The command is listed in the table.
    Listed,
    /// The command is unknown; the owner-only default applies.
    DefaultOwnerOnly,
}

/// Roles allowed to invoke one command.
#[derive(Debug, Clone, Copy)]
pub struct Permission {
    pub roles: &'static [Role],
    pub source: PermissionSource,
}

impl Permission {
    pub fn allows(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// The command permission table.
#[derive(Debug, Clone)]
pub struct PermissionTable {
    entries: HashMap<&'static str, &'static [Role]>,
}

impl Default for PermissionTable {
    fn default() -> Self {
        let entries: &[(&'static str, &'static [Role])] = &[
            ("help", EVERYONE),
            ("info", EVERYONE),
            ("ping", EVERYONE),
            ("startfun", OPERATORS),
            ("stopfun", OPERATORS),
            ("funlist", OPERATORS),
            ("updatefun", OPERATORS),
            ("stats", OPERATORS),
            ("emergencystop", OWNER_ONLY),
            ("addadmin", OWNER_ONLY),
            ("removeadmin", OWNER_ONLY),
            ("admins", OWNER_ONLY),
            ("block", OWNER_ONLY),
            ("unblock", OWNER_ONLY),
            ("lockdown", OWNER_ONLY),
            ("unlock", OWNER_ONLY),
            ("security", OWNER_ONLY),
            ("resetowner", OWNER_ONLY),
            ("reload", OWNER_ONLY),
            ("shutdown", OWNER_ONLY),
        ];
        Self {
            entries: entries.iter().copied().collect(),
        }
    }
}

impl PermissionTable {
    /// Look up a command (case-insensitive). Unknown commands get the
    /// explicit owner-only default.
    pub fn lookup(&self, command: &str) -> Permission {
        match self.entries.get(command.to_ascii_lowercase().as_str()) {
            Some(&roles) => Permission {
                roles,
                source: PermissionSource::Listed,
            },
            None => Permission {
                roles: OWNER_ONLY,
                source: PermissionSource::DefaultOwnerOnly,
            },
        }
    }

    /// Listed commands a role may run, sorted.
    pub fn commands_for(&self, role: Role) -> Vec<&'static str> {
        let mut commands: Vec<&'static str> = self
            .entries
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(name, _)| *name)
            .collect();
        commands.sort_unstable();
        commands
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
