//! Permission groups, the owner override and the global blacklist.

use crate::config::GroupConfig;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Name of the group used for callers no other group claims.
pub const DEFAULT_GROUP: &str = "Default";

/// Name reported for the owner's implicit profile.
pub const OWNER_GROUP: &str = "Owner (auto)";

/// Commands withheld from callers when no `Default` group is configured.
const ADMIN_COMMANDS: [&str; 3] = ["setname", "broadcast", "archive"];

/// Effective permissions of one caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionProfile {
    pub name: String,
    /// `None` means every command is allowed.
    pub command_whitelist: Option<HashSet<String>>,
    pub command_blacklist: HashSet<String>,
    pub ignore_non_voice: HashSet<String>,
    pub user_list: HashSet<String>,
    pub granted_to_roles: HashSet<String>,
}

impl PermissionProfile {
    pub fn from_config(name: &str, group: &GroupConfig) -> Self {
        let lowered = |items: &[String]| -> HashSet<String> {
            items.iter().map(|i| i.to_lowercase()).collect()
        };

        let whitelist = lowered(&group.command_whitelist);
        Self {
            name: name.to_string(),
            command_whitelist: (!whitelist.is_empty()).then_some(whitelist),
            command_blacklist: lowered(&group.command_blacklist),
            ignore_non_voice: lowered(&group.ignore_non_voice),
            user_list: group.user_list.iter().cloned().collect(),
            granted_to_roles: group.granted_to_roles.iter().cloned().collect(),
        }
    }

    /// Unrestricted profile.
    pub fn unrestricted(name: &str) -> Self {
        Self {
            name: name.to_string(),
            command_whitelist: None,
            command_blacklist: HashSet::new(),
            ignore_non_voice: HashSet::new(),
            user_list: HashSet::new(),
            granted_to_roles: HashSet::new(),
        }
    }

    /// Built-in default: everything except the administrative commands.
    pub fn builtin_default() -> Self {
        Self {
            command_blacklist: ADMIN_COMMANDS.iter().map(|c| c.to_string()).collect(),
            ..Self::unrestricted(DEFAULT_GROUP)
        }
    }

    /// Whether `command` may run under this profile, with the reason if not.
    pub fn check(&self, command: &str) -> Result<(), String> {
        if self.command_blacklist.contains(command) {
            return Err(format!(
                "This command is disabled for your group ({}).",
                self.name
            ));
        }

        if let Some(whitelist) = &self.command_whitelist {
            if !whitelist.contains(command) {
                return Err(format!(
                    "This command is not enabled for your group ({}).",
                    self.name
                ));
            }
        }

        Ok(())
    }

    pub fn allows(&self, command: &str) -> bool {
        self.check(command).is_ok()
    }

    pub fn requires_voice(&self, command: &str) -> bool {
        self.ignore_non_voice.contains(command)
    }
}

/// Maps a caller to a [`PermissionProfile`].
///
/// Recomputed on every call from static configuration, so two calls with the
/// same identity return equal profiles.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    owner_id: String,
    groups: Vec<PermissionProfile>,
    default: PermissionProfile,
}

impl PermissionResolver {
    pub fn new(owner_id: impl Into<String>, groups: &HashMap<String, GroupConfig>) -> Self {
        let mut default = None;
        let mut profiles = Vec::new();

        for (name, group) in groups {
            let profile = PermissionProfile::from_config(name, group);
            if name.eq_ignore_ascii_case(DEFAULT_GROUP) {
                default = Some(profile);
            } else {
                profiles.push(profile);
            }
        }
        // HashMap order is arbitrary; keep membership resolution stable.
        profiles.sort_by(|a, b| a.name.cmp(&b.name));

        let default = default.unwrap_or_else(|| {
            debug!("No Default permission group configured, using built-in");
            PermissionProfile::builtin_default()
        });

        info!("Loaded {} permission groups", profiles.len());
        Self {
            owner_id: owner_id.into(),
            groups: profiles,
            default,
        }
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Profile for `user_id` holding `roles`.
    ///
    /// The owner always gets an unrestricted profile. Otherwise the first
    /// group listing the user, then the first group granted to one of the
    /// roles, then the default.
    pub fn resolve(&self, user_id: &str, roles: &[String]) -> PermissionProfile {
        if self.is_owner(user_id) {
            return PermissionProfile::unrestricted(OWNER_GROUP);
        }

        if let Some(group) = self.groups.iter().find(|g| g.user_list.contains(user_id)) {
            return group.clone();
        }

        // Roles arrive highest first.
        for role in roles {
            if let Some(group) = self.groups.iter().find(|g| g.granted_to_roles.contains(role)) {
                return group.clone();
            }
        }

        self.default.clone()
    }
}

/// Globally ignored identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    ids: HashSet<String>,
}

impl Blacklist {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// One id per line; blank lines and `#` comments are skipped.
    pub fn parse(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(|line| line.split('#').next().unwrap_or("").trim())
                .filter(|line| !line.is_empty()),
        )
    }

    /// Read the blacklist file; a missing file is an empty blacklist.
    pub async fn load(path: &Path) -> std::io::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let blacklist = Self::parse(&contents);
                info!("Loaded {} blacklisted ids", blacklist.len());
                Ok(blacklist)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Blacklist file {} not found, starting empty", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.ids.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
