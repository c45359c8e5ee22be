//! Ordered provisioning of a new collection.
//!
//! ```text
//! Absent ─copy_configset─▶ ConfigsetCopied ─create─▶ Created
//!        ─update_schema─▶ SchemaLoaded ─reload─▶ Ready
//! ```
//!
//! [`Provisioning`] only allows each step from its predecessor state and
//! rejects anything else locally with [`ProvisionError::OutOfOrder`], before
//! any request. A failed step leaves the state unchanged. The underlying
//! [`AdminClient`] calls stay unchecked.

use std::fmt;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::client::{AdminClient, IndexAdmin};
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Absent,
    ConfigsetCopied,
    Created,
    SchemaLoaded,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    CopyConfigset,
    Create,
    UpdateSchema,
    Reload,
}

impl ProvisionStep {
    /// State the step must start from.
    pub fn requires(&self) -> CollectionState {
        match self {
            ProvisionStep::CopyConfigset => CollectionState::Absent,
            ProvisionStep::Create => CollectionState::ConfigsetCopied,
            ProvisionStep::UpdateSchema => CollectionState::Created,
            ProvisionStep::Reload => CollectionState::SchemaLoaded,
        }
    }

    pub fn produces(&self) -> CollectionState {
        match self {
            ProvisionStep::CopyConfigset => CollectionState::ConfigsetCopied,
            ProvisionStep::Create => CollectionState::Created,
            ProvisionStep::UpdateSchema => CollectionState::SchemaLoaded,
            ProvisionStep::Reload => CollectionState::Ready,
        }
    }
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisionStep::CopyConfigset => "copy configset",
            ProvisionStep::Create => "create",
            ProvisionStep::UpdateSchema => "update schema",
            ProvisionStep::Reload => "reload",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("cannot {step} collection '{name}' in state {state:?} (requires {required:?})")]
    OutOfOrder {
        name: String,
        step: ProvisionStep,
        state: CollectionState,
        required: CollectionState,
    },

    #[error("collection '{0}' already exists")]
    AlreadyExists(String),

    #[error("{step} failed for collection '{name}': {source}")]
    Step {
        name: String,
        step: ProvisionStep,
        #[source]
        source: ClientError,
    },
}

/// Drives one collection through the provisioning steps.
pub struct Provisioning<'a> {
    admin: &'a AdminClient,
    name: String,
    state: CollectionState,
}

impl<'a> Provisioning<'a> {
    /// Starts from [`CollectionState::Absent`] without asking the backend.
    pub fn new(admin: &'a AdminClient, name: impl Into<String>) -> Self {
        Self {
            admin,
            name: name.into(),
            state: CollectionState::Absent,
        }
    }

    /// Starts from `Absent` after confirming the backend has no such collection.
    pub async fn begin(admin: &'a AdminClient, name: &str) -> Result<Self, ProvisionError> {
        let existing = admin
            .find_by_name(name)
            .await
            .map_err(|source| ProvisionError::Step {
                name: name.to_string(),
                step: ProvisionStep::CopyConfigset,
                source,
            })?;
        if existing.is_some() {
            return Err(ProvisionError::AlreadyExists(name.to_string()));
        }
        Ok(Self::new(admin, name))
    }

    pub fn state(&self) -> CollectionState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, step: ProvisionStep) -> Result<(), ProvisionError> {
        if self.state != step.requires() {
            return Err(ProvisionError::OutOfOrder {
                name: self.name.clone(),
                step,
                state: self.state,
                required: step.requires(),
            });
        }
        Ok(())
    }

    fn advance<T>(
        &mut self,
        step: ProvisionStep,
        result: Result<T, ClientError>,
    ) -> Result<T, ProvisionError> {
        let value = result.map_err(|source| ProvisionError::Step {
            name: self.name.clone(),
            step,
            source,
        })?;
        self.state = step.produces();
        info!(core = %self.name, %step, state = ?self.state, "provisioning step done");
        Ok(value)
    }

    pub async fn copy_configset(&mut self) -> Result<(), ProvisionError> {
        let step = ProvisionStep::CopyConfigset;
        self.check(step)?;
        let r = self.admin.copy_configset_from_default(&self.name).await;
        self.advance(step, r).map(|_| ())
    }

    pub async fn create(&mut self) -> Result<(), ProvisionError> {
        let step = ProvisionStep::Create;
        self.check(step)?;
        let r = IndexAdmin::create(self.admin, &self.name).await;
        self.advance(step, r).map(|_| ())
    }

    pub async fn update_schema(&mut self, schema: &Path) -> Result<(), ProvisionError> {
        let step = ProvisionStep::UpdateSchema;
        self.check(step)?;
        let r = self.admin.update_schema(&self.name, schema).await;
        self.advance(step, r)
    }

    pub async fn reload(&mut self) -> Result<(), ProvisionError> {
        let step = ProvisionStep::Reload;
        self.check(step)?;
        let r = self.admin.reload(&self.name).await;
        self.advance(step, r).map(|_| ())
    }

    /// Runs the remaining steps in order, stopping at the first failure.
    pub async fn run(&mut self, schema: &Path) -> Result<(), ProvisionError> {
        if self.state == CollectionState::Absent {
            self.copy_configset().await?;
        }
        if self.state == CollectionState::ConfigsetCopied {
            self.create().await?;
        }
        if self.state == CollectionState::Created {
            self.update_schema(schema).await?;
        }
        if self.state == CollectionState::SchemaLoaded {
            self.reload().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn admin() -> AdminClient {
        // Unroutable; every test here must fail before any request.
        AdminClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn steps_chain() {
        let mut state = CollectionState::Absent;
        for step in [
            ProvisionStep::CopyConfigset,
            ProvisionStep::Create,
            ProvisionStep::UpdateSchema,
            ProvisionStep::Reload,
        ] {
            assert_eq!(step.requires(), state);
            state = step.produces();
        }
        assert_eq!(state, CollectionState::Ready);
    }

    #[tokio::test]
    async fn reload_before_schema_is_rejected_locally() {
        let admin = admin();
        let mut p = Provisioning::new(&admin, "catalog");
        let err = p.reload().await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::OutOfOrder {
                step: ProvisionStep::Reload,
                state: CollectionState::Absent,
                required: CollectionState::SchemaLoaded,
                ..
            }
        ));
        assert_eq!(p.state(), CollectionState::Absent);
    }

    #[tokio::test]
    async fn schema_before_create_is_rejected_locally() {
        let admin = admin();
        let mut p = Provisioning::new(&admin, "catalog");
        let err = p
            .update_schema(Path::new("schema.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::OutOfOrder { .. }));
        assert!(err.to_string().contains("update schema"));
    }
}
