//! Filesystem-backed capability adapters rooted at a single directory.
//!
//! Layout under the root: `.cache` (staging), `external` (general storage),
//! `documents` (default-dir fallback), `outbox` (one JSON record per share).

use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use savetier_config::LocalEnvironmentConfig;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::capability::{
    IntermediateStorage, PermissionAuthority, PlatformInfo, PrimaryStorage, ShareCapability,
};
use crate::model::{PermissionState, PlatformClass, StagedLocation, StorageArea};

const CACHE_DIR: &str = ".cache";
const EXTERNAL_DIR: &str = "external";
const DOCUMENTS_DIR: &str = "documents";
const OUTBOX_DIR: &str = "outbox";

/// Share delegation captured by [`LocalFs`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    /// Title passed to the share surface.
    pub title: String,
    /// Content preview.
    pub text: String,
    /// Location that was shared.
    pub url: String,
    /// When the delegation happened.
    pub shared_at: DateTime<Utc>,
}

/// Every capability implemented against a local directory tree.
#[derive(Debug)]
pub struct LocalFs {
    root: PathBuf,
    platform: PlatformClass,
    permission: Mutex<PermissionState>,
    can_prompt: bool,
    grant_on_prompt: bool,
}

impl LocalFs {
    /// Open platform with permission granted.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            platform: PlatformClass::Open,
            permission: Mutex::new(PermissionState::Granted),
            can_prompt: false,
            grant_on_prompt: false,
        }
    }

    /// Build from the `local` configuration section.
    #[must_use]
    pub fn from_config(config: &LocalEnvironmentConfig) -> Self {
        let permission = if config.storage_permission {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        };
        Self {
            root: config.root.clone(),
            platform: config.platform,
            permission: Mutex::new(permission),
            can_prompt: config.can_prompt,
            grant_on_prompt: config.grant_on_prompt,
        }
    }

    /// Override the reported platform.
    #[must_use]
    pub const fn with_platform(mut self, platform: PlatformClass) -> Self {
        self.platform = platform;
        self
    }

    /// Override the permission state and prompt behaviour.
    #[must_use]
    pub fn with_permission(
        mut self,
        state: PermissionState,
        can_prompt: bool,
        grant_on_prompt: bool,
    ) -> Self {
        self.permission = Mutex::new(state);
        self.can_prompt = can_prompt;
        self.grant_on_prompt = grant_on_prompt;
        self
    }

    /// Root directory of the tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk directory backing `area`.
    #[must_use]
    pub fn area_dir(&self, area: StorageArea) -> PathBuf {
        match area {
            StorageArea::ExternalGeneral => self.root.join(EXTERNAL_DIR),
            StorageArea::Documents => self.root.join(DOCUMENTS_DIR),
        }
    }

    /// Directory holding share records.
    #[must_use]
    pub fn outbox_dir(&self) -> PathBuf {
        self.root.join(OUTBOX_DIR)
    }

    /// Read back every share record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error when the outbox cannot be listed or a record is malformed.
    pub async fn share_records(&self) -> anyhow::Result<Vec<ShareRecord>> {
        let outbox = self.outbox_dir();
        let mut records = Vec::new();
        let mut entries = match fs::read_dir(&outbox).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(err) => {
                return Err(err).with_context(|| format!("listing {}", outbox.display()));
            }
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let bytes = fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let record: ShareRecord = serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing {}", path.display()))?;
            records.push(record);
        }
        records.sort_by_key(|record| record.shared_at);
        Ok(records)
    }

    fn lock_permission(&self) -> MutexGuard<'_, PermissionState> {
        self.permission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PlatformInfo for LocalFs {
    async fn query(&self) -> anyhow::Result<PlatformClass> {
        Ok(self.platform)
    }
}

#[async_trait]
impl PermissionAuthority for LocalFs {
    async fn check(&self) -> anyhow::Result<PermissionState> {
        Ok(*self.lock_permission())
    }

    async fn request(&self) -> anyhow::Result<PermissionState> {
        if !self.can_prompt {
            bail!("permission prompt not available");
        }
        let mut state = self.lock_permission();
        if self.grant_on_prompt {
            *state = PermissionState::Granted;
        }
        Ok(*state)
    }

    fn can_prompt(&self) -> bool {
        self.can_prompt
    }
}

#[async_trait]
impl IntermediateStorage for LocalFs {
    async fn write(&self, name: &str, bytes: &[u8]) -> anyhow::Result<StagedLocation> {
        let target = join_relative(&self.root.join(CACHE_DIR), name)?;
        write_file(&target, bytes).await?;
        Ok(StagedLocation::new(target.to_string_lossy()))
    }

    async fn uri_of(&self, location: &StagedLocation) -> anyhow::Result<String> {
        let path = Path::new(location.as_str());
        if !path.starts_with(self.root.join(CACHE_DIR)) {
            bail!("location {location} is outside intermediate storage");
        }
        Ok(format!("file://{}", path.display()))
    }
}

#[async_trait]
impl ShareCapability for LocalFs {
    async fn share(&self, title: &str, text: &str, url: &str) -> anyhow::Result<()> {
        let record = ShareRecord {
            title: title.to_string(),
            text: text.to_string(),
            url: url.to_string(),
            shared_at: Utc::now(),
        };
        let target = self.outbox_dir().join(format!("{}.json", Uuid::new_v4()));
        let bytes = serde_json::to_vec_pretty(&record).context("serialising share record")?;
        write_file(&target, &bytes).await?;
        debug!(record = %target.display(), url, "share recorded");
        Ok(())
    }
}

#[async_trait]
impl PrimaryStorage for LocalFs {
    async fn write(&self, path: &str, bytes: &[u8], area: StorageArea) -> anyhow::Result<()> {
        let target = join_relative(&self.area_dir(area), path)?;
        write_file(&target, bytes).await
    }
}

/// Join a `/`-separated logical path under `base`, refusing anything that
/// would escape it.
fn join_relative(base: &Path, relative: &str) -> anyhow::Result<PathBuf> {
    let mut joined = base.to_path_buf();
    for segment in relative.split('/') {
        if segment.is_empty() {
            bail!("empty path segment in {relative:?}");
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => joined.push(part),
            (Some(Component::CurDir), None) => {}
            _ => bail!("segment {segment:?} of {relative:?} is not a plain name"),
        }
    }
    if joined == base {
        bail!("path {relative:?} names no file");
    }
    Ok(joined)
}

async fn write_file(target: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(target, bytes)
        .await
        .with_context(|| format!("writing {}", target.display()))
}
