//! Capability traits the save chain is written against.
//!
//! Each trait covers one external effect so adapters can be mixed and faked
//! independently; [`CapabilityProvider`] bundles them for the writer.

use anyhow::bail;
use async_trait::async_trait;

use crate::model::{
    PermissionState, PlatformClass, StagedLocation, StorageArea, StorageCapabilities,
};

/// Reports the platform class of the running environment.
#[async_trait]
pub trait PlatformInfo: Send + Sync {
    /// Classify the environment.
    async fn query(&self) -> anyhow::Result<PlatformClass>;
}

/// Grants or refuses public storage access.
#[async_trait]
pub trait PermissionAuthority: Send + Sync {
    /// Current permission state without prompting.
    async fn check(&self) -> anyhow::Result<PermissionState>;

    /// Prompt for permission; default implementation reports lack of support.
    async fn request(&self) -> anyhow::Result<PermissionState> {
        bail!("permission prompts not supported by this environment");
    }

    /// Whether [`PermissionAuthority::request`] may be called.
    fn can_prompt(&self) -> bool {
        false
    }
}

/// Scratch storage used to stage content before share delegation.
#[async_trait]
pub trait IntermediateStorage: Send + Sync {
    /// Persist `bytes` under `name`, replacing any previous file.
    async fn write(&self, name: &str, bytes: &[u8]) -> anyhow::Result<StagedLocation>;

    /// Shareable URI for a staged file.
    async fn uri_of(&self, location: &StagedLocation) -> anyhow::Result<String>;
}

/// User-mediated share surface.
#[async_trait]
pub trait ShareCapability: Send + Sync {
    /// Hand `url` to the share surface; default implementation reports lack of support.
    async fn share(&self, title: &str, text: &str, url: &str) -> anyhow::Result<()> {
        let _ = (title, text, url);
        bail!("share delegation not supported by this environment");
    }
}

/// Durable storage addressed by logical path.
#[async_trait]
pub trait PrimaryStorage: Send + Sync {
    /// Write `bytes` at `path` inside `area`, creating parents as needed.
    async fn write(&self, path: &str, bytes: &[u8], area: StorageArea) -> anyhow::Result<()>;
}

/// Everything the tiered writer needs from its environment.
pub trait CapabilityProvider:
    PlatformInfo + PermissionAuthority + IntermediateStorage + ShareCapability + PrimaryStorage
{
}

impl<T> CapabilityProvider for T where
    T: PlatformInfo
        + PermissionAuthority
        + IntermediateStorage
        + ShareCapability
        + PrimaryStorage
        + ?Sized
{
}

impl StorageCapabilities {
    /// Take a snapshot of what `env` permits right now.
    ///
    /// # Errors
    ///
    /// Propagates platform or permission query failures.
    pub async fn probe<E>(env: &E) -> anyhow::Result<Self>
    where
        E: PlatformInfo + PermissionAuthority + ?Sized,
    {
        let platform_class = env.query().await?;
        let permission = env.check().await?;
        Ok(Self {
            platform_class,
            has_public_storage_permission: permission == PermissionState::Granted,
            can_prompt_for_permission: env.can_prompt(),
        })
    }
}
