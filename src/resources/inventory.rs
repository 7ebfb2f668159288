//! `aap_inventory` resource and data source.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{decode, encode, reconcile, AttributeSpec, DataSource, Resource};
use crate::client::ProviderHttpClient;
use crate::customtypes::CustomStringValue;
use crate::error::ProviderError;

/// Resource and data source type name.
pub const TYPE_NAME: &str = "aap_inventory";

const API_PATH: &str = "api/v2/inventories/";

static ATTRIBUTES: &[AttributeSpec] = &[
    AttributeSpec::computed("id"),
    AttributeSpec::plain("organization"),
    AttributeSpec::plain("name"),
    AttributeSpec::plain("description"),
    AttributeSpec::semantic("variables"),
    AttributeSpec::computed("url"),
];

/// Inventory state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryModel {
    /// Server-assigned id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Owning organization id.
    pub organization: i64,
    /// Inventory name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Inventory variables as JSON or YAML text.
    #[serde(default)]
    pub variables: CustomStringValue,
    /// API URL of the inventory.
    #[serde(default)]
    pub url: Option<String>,
}

impl InventoryModel {
    fn id(&self) -> Result<i64, ProviderError> {
        self.id
            .ok_or_else(|| ProviderError::Validation("inventory state has no id".to_string()))
    }
}

/// Inventory as the AAP API reads and writes it.
#[derive(Debug, Serialize, Deserialize)]
struct InventoryApiModel {
    #[serde(default, skip_serializing)]
    id: i64,
    organization: i64,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    variables: String,
    #[serde(default, skip_serializing)]
    url: String,
}

impl InventoryApiModel {
    fn from_model(model: &InventoryModel) -> Self {
        Self {
            id: model.id.unwrap_or_default(),
            organization: model.organization,
            name: model.name.clone(),
            description: model.description.clone().unwrap_or_default(),
            variables: model.variables.value_string().to_string(),
            url: String::new(),
        }
    }

    /// Convert to state.
    ///
    /// Variables equivalent to `prior` keep the prior text. The API echoes
    /// unset text fields as `""`, which maps to null unless `prior` holds an
    /// empty string.
    fn into_model(self, prior: Option<&InventoryModel>) -> InventoryModel {
        let prior_variables = prior.map(|p| &p.variables);
        let variables = if self.variables.is_empty() {
            if prior_variables.and_then(CustomStringValue::as_known) == Some("") {
                CustomStringValue::new("")
            } else {
                CustomStringValue::null()
            }
        } else {
            let fresh = CustomStringValue::new(self.variables);
            match prior_variables {
                Some(prior) => reconcile(prior, fresh),
                None => fresh,
            }
        };
        let description = if self.description.is_empty() {
            prior
                .and_then(|p| p.description.clone())
                .filter(String::is_empty)
        } else {
            Some(self.description)
        };

        InventoryModel {
            id: Some(self.id),
            organization: self.organization,
            name: self.name,
            description,
            variables,
            url: Some(self.url).filter(|u| !u.is_empty()),
        }
    }
}

fn inventory_path(id: i64) -> String {
    format!("{}{}/", API_PATH, id)
}

async fn fetch(
    client: &dyn ProviderHttpClient,
    id: i64,
) -> Result<InventoryApiModel, ProviderError> {
    let response = client.do_request(Method::GET, &inventory_path(id), None).await?;
    if response.status == 404 {
        return Err(ProviderError::NotFound(format!("inventory {}", id)));
    }
    Ok(serde_json::from_slice(&response.expect_status(&[200])?)?)
}

/// The `aap_inventory` resource.
#[derive(Debug, Default)]
pub struct InventoryResource;

#[async_trait]
impl Resource for InventoryResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn attributes(&self) -> &'static [AttributeSpec] {
        ATTRIBUTES
    }

    #[instrument(skip_all)]
    async fn create(
        &self,
        client: &dyn ProviderHttpClient,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let planned: InventoryModel = decode(planned_state)?;
        let body = serde_json::to_vec(&InventoryApiModel::from_model(&planned))?;
        let response = client.do_request(Method::POST, API_PATH, Some(body)).await?;
        let created: InventoryApiModel = serde_json::from_slice(&response.expect_status(&[201])?)?;
        debug!(id = created.id, "inventory created");
        encode(&created.into_model(Some(&planned)))
    }

    #[instrument(skip_all)]
    async fn read(
        &self,
        client: &dyn ProviderHttpClient,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let current: InventoryModel = decode(current_state)?;
        let fetched = fetch(client, current.id()?).await?;
        encode(&fetched.into_model(Some(&current)))
    }

    #[instrument(skip_all)]
    async fn update(
        &self,
        client: &dyn ProviderHttpClient,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let id = decode::<InventoryModel>(prior_state)?.id()?;
        let planned: InventoryModel = decode(planned_state)?;
        let body = serde_json::to_vec(&InventoryApiModel::from_model(&planned))?;
        let response = client
            .do_request(Method::PUT, &inventory_path(id), Some(body))
            .await?;
        let updated: InventoryApiModel = serde_json::from_slice(&response.expect_status(&[200])?)?;
        encode(&updated.into_model(Some(&planned)))
    }

    #[instrument(skip_all)]
    async fn delete(
        &self,
        client: &dyn ProviderHttpClient,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let id = decode::<InventoryModel>(current_state)?.id()?;
        let response = client
            .do_request(Method::DELETE, &inventory_path(id), None)
            .await?;
        if response.status == 404 {
            debug!(id, "inventory already deleted");
            return Ok(());
        }
        response.expect_status(&[202, 204])?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct InventoryLookup {
    id: i64,
}

/// The `aap_inventory` data source: looks up one inventory by id.
#[derive(Debug, Default)]
pub struct InventoryDataSource;

#[async_trait]
impl DataSource for InventoryDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    #[instrument(skip_all)]
    async fn read(
        &self,
        client: &dyn ProviderHttpClient,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let lookup: InventoryLookup = decode(config)?;
        let fetched = fetch(client, lookup.id).await?;
        encode(&fetched.into_model(None))
    }
}
