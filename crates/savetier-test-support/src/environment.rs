//! In-memory capability environment with scriptable failures.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use savetier_fsops::{
    IntermediateStorage, PermissionAuthority, PermissionState, PlatformClass, PlatformInfo,
    PrimaryStorage, ShareCapability, StagedLocation, StorageArea, StorageCapabilities,
};

const STAGING_PREFIX: &str = "staging/";

/// Capability call observed by [`FakeEnvironment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `PlatformInfo::query`.
    QueryPlatform,
    /// `PermissionAuthority::check`.
    CheckPermission,
    /// `PermissionAuthority::request`.
    RequestPermission,
    /// `IntermediateStorage::write`.
    Stage {
        /// Staged file name.
        name: String,
    },
    /// `IntermediateStorage::uri_of`.
    UriOf {
        /// Location asked about.
        location: String,
    },
    /// `ShareCapability::share`.
    Share {
        /// Share title.
        title: String,
        /// Shared location.
        url: String,
    },
    /// `PrimaryStorage::write`.
    Write {
        /// Logical path.
        path: String,
        /// Target area.
        area: StorageArea,
    },
}

/// Which capabilities should return an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Failures {
    /// Fail `PlatformInfo::query`.
    pub platform_query: bool,
    /// Fail `PermissionAuthority::check`.
    pub permission_check: bool,
    /// Fail `PermissionAuthority::request`.
    pub permission_request: bool,
    /// Fail `IntermediateStorage::write`.
    pub stage: bool,
    /// Fail `ShareCapability::share`.
    pub share: bool,
    /// Fail every `PrimaryStorage::write`.
    pub primary_write: bool,
    /// Fail `PrimaryStorage::write` into [`StorageArea::Documents`] only.
    pub documents_write: bool,
}

#[derive(Debug)]
struct FakeState {
    capabilities: StorageCapabilities,
    grant_on_prompt: bool,
    failures: Failures,
    calls: Vec<Call>,
    staged: HashMap<String, Vec<u8>>,
    files: HashMap<(StorageArea, String), Vec<u8>>,
}

/// Environment driven by a [`StorageCapabilities`] snapshot.
///
/// A granted prompt replaces the snapshot with a new one; earlier copies
/// returned by [`FakeEnvironment::capabilities`] are unaffected.
#[derive(Debug)]
pub struct FakeEnvironment {
    state: Mutex<FakeState>,
}

impl FakeEnvironment {
    /// Build an environment that reports `capabilities` and never fails.
    #[must_use]
    pub fn new(capabilities: StorageCapabilities) -> Self {
        Self {
            state: Mutex::new(FakeState {
                capabilities,
                grant_on_prompt: false,
                failures: Failures::default(),
                calls: Vec::new(),
                staged: HashMap::new(),
                files: HashMap::new(),
            }),
        }
    }

    /// Shorthand for a snapshot built from its three fields.
    #[must_use]
    pub fn with(platform_class: PlatformClass, permission: bool, can_prompt: bool) -> Self {
        Self::new(StorageCapabilities {
            platform_class,
            has_public_storage_permission: permission,
            can_prompt_for_permission: can_prompt,
        })
    }

    /// Whether a prompt grants the permission.
    #[must_use]
    pub fn grant_on_prompt(self, grant: bool) -> Self {
        self.lock().grant_on_prompt = grant;
        self
    }

    /// Script capability failures.
    #[must_use]
    pub fn failing(self, failures: Failures) -> Self {
        self.lock().failures = failures;
        self
    }

    /// Current snapshot.
    #[must_use]
    pub fn capabilities(&self) -> StorageCapabilities {
        self.lock().capabilities
    }

    /// Every call observed so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Primary storage writes observed so far, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, StorageArea)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Write { path, area } => Some((path.clone(), *area)),
                _ => None,
            })
            .collect()
    }

    /// Contents persisted at `path` in `area`.
    #[must_use]
    pub fn file(&self, area: StorageArea, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&(area, path.to_string())).cloned()
    }

    /// Contents staged under `name`.
    #[must_use]
    pub fn staged(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().staged.get(name).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: Call) -> MutexGuard<'_, FakeState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }
}

#[async_trait]
impl PlatformInfo for FakeEnvironment {
    async fn query(&self) -> Result<PlatformClass> {
        let state = self.record(Call::QueryPlatform);
        if state.failures.platform_query {
            bail!("platform query unavailable");
        }
        Ok(state.capabilities.platform_class)
    }
}

#[async_trait]
impl PermissionAuthority for FakeEnvironment {
    async fn check(&self) -> Result<PermissionState> {
        let state = self.record(Call::CheckPermission);
        if state.failures.permission_check {
            bail!("permission check unavailable");
        }
        Ok(permission_of(&state.capabilities))
    }

    async fn request(&self) -> Result<PermissionState> {
        let mut state = self.record(Call::RequestPermission);
        if state.failures.permission_request {
            bail!("permission prompt crashed");
        }
        if !state.capabilities.can_prompt_for_permission {
            bail!("permission prompt not available");
        }
        if state.grant_on_prompt {
            state.capabilities = StorageCapabilities {
                has_public_storage_permission: true,
                ..state.capabilities
            };
        }
        Ok(permission_of(&state.capabilities))
    }

    fn can_prompt(&self) -> bool {
        self.lock().capabilities.can_prompt_for_permission
    }
}

#[async_trait]
impl IntermediateStorage for FakeEnvironment {
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<StagedLocation> {
        let mut state = self.record(Call::Stage {
            name: name.to_string(),
        });
        if state.failures.stage {
            bail!("staging area full");
        }
        state.staged.insert(name.to_string(), bytes.to_vec());
        Ok(StagedLocation::new(format!("{STAGING_PREFIX}{name}")))
    }

    async fn uri_of(&self, location: &StagedLocation) -> Result<String> {
        let state = self.record(Call::UriOf {
            location: location.as_str().to_string(),
        });
        let name = location
            .as_str()
            .strip_prefix(STAGING_PREFIX)
            .ok_or_else(|| anyhow!("unknown staging location {location}"))?;
        if !state.staged.contains_key(name) {
            bail!("nothing staged under {name}");
        }
        Ok(format!("content://fake/{name}"))
    }
}

#[async_trait]
impl ShareCapability for FakeEnvironment {
    async fn share(&self, title: &str, _text: &str, url: &str) -> Result<()> {
        let state = self.record(Call::Share {
            title: title.to_string(),
            url: url.to_string(),
        });
        if state.failures.share {
            bail!("share sheet dismissed");
        }
        Ok(())
    }
}

#[async_trait]
impl PrimaryStorage for FakeEnvironment {
    async fn write(&self, path: &str, bytes: &[u8], area: StorageArea) -> Result<()> {
        let mut state = self.record(Call::Write {
            path: path.to_string(),
            area,
        });
        let failing = state.failures.primary_write
            || (area == StorageArea::Documents && state.failures.documents_write);
        if failing {
            bail!("disk full");
        }
        state.files.insert((area, path.to_string()), bytes.to_vec());
        Ok(())
    }
}

const fn permission_of(capabilities: &StorageCapabilities) -> PermissionState {
    if capabilities.has_public_storage_permission {
        PermissionState::Granted
    } else {
        PermissionState::Denied
    }
}
