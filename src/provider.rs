//! The provider service driven by the host.
//!
//! [`ProviderService`] is the surface the host's plugin protocol calls into.
//! [`AapProvider`] implements it by dispatching to the resources and data
//! sources in [`crate::resources`].

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::client::ProviderHttpClient;
use crate::config::ProviderConfig;
use crate::diagnostics::{has_errors, Diagnostic};
use crate::error::ProviderError;
use crate::resources::inventory::{InventoryDataSource, InventoryResource};
use crate::resources::job::JobResource;
use crate::resources::{self, DataSource, Resource};
use crate::types::{PlanResult, ProviderMetadata};

/// Operations the host invokes on a provider.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Names of the resources and data sources this provider serves.
    fn metadata(&self) -> ProviderMetadata;

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Plan changes for a resource.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    ///
    /// A `null` result means the resource no longer exists.
    async fn read(&self, resource_type: &str, current_state: Value)
        -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value)
        -> Result<(), ProviderError>;

    /// Read data from a data source.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: Value,
    ) -> Result<Value, ProviderError> {
        Err(ProviderError::UnknownResource(format!(
            "Unknown data source type: {}",
            data_source_type
        )))
    }
}

/// Provider for Ansible Automation Platform.
pub struct AapProvider {
    client: RwLock<Option<Arc<dyn ProviderHttpClient>>>,
    resources: Vec<Box<dyn Resource>>,
    data_sources: Vec<Box<dyn DataSource>>,
}

impl Default for AapProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AapProvider {
    /// An unconfigured provider.
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
            resources: vec![Box::new(InventoryResource), Box::new(JobResource)],
            data_sources: vec![Box::new(InventoryDataSource)],
        }
    }

    /// A provider already configured with `client`.
    pub fn with_client(client: Arc<dyn ProviderHttpClient>) -> Self {
        Self {
            client: RwLock::new(Some(client)),
            ..Self::new()
        }
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .iter()
            .find(|r| r.type_name() == resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .iter()
            .find(|d| d.type_name() == data_source_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }

    async fn client(&self) -> Result<Arc<dyn ProviderHttpClient>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider has not been configured".to_string())
        })
    }
}

#[async_trait::async_trait]
impl ProviderService for AapProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: self.resources.iter().map(|r| r.type_name().to_string()).collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|d| d.type_name().to_string())
                .collect(),
        }
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(ProviderConfig::from_value(config)?.with_env_fallbacks().validate())
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = ProviderConfig::from_value(config)?.with_env_fallbacks();
        let diagnostics = config.validate();
        if has_errors(&diagnostics) {
            warn!(errors = diagnostics.len(), "provider configuration rejected");
            return Ok(diagnostics);
        }

        let client = config.build_client()?;
        info!(host = client.host_url(), "provider configured");
        *self.client.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }

    #[instrument(skip(self, prior_state, proposed_state, _config))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let plan = resources::plan(resource.attributes(), prior_state, proposed_state)?;
        debug!(
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "plan computed"
        );
        Ok(plan)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.create(client.as_ref(), planned_state).await
    }

    #[instrument(skip(self, current_state))]
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        match resource.read(client.as_ref(), current_state).await {
            Err(err) if err.is_not_found() => {
                warn!(error = %err, "resource no longer exists, removing it from state");
                Ok(Value::Null)
            },
            result => result,
        }
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource
            .update(client.as_ref(), prior_state, planned_state)
            .await
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.delete(client.as_ref(), current_state).await
    }

    #[instrument(skip(self, config))]
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let client = self.client().await?;
        data_source.read(client.as_ref(), config).await
    }
}
