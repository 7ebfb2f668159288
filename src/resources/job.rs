//! `aap_job` resource: launches a job template.
//!
//! Creating the resource launches the template; changing any configured
//! attribute launches it again. Deleting only forgets the job, since finished
//! jobs cannot be undone.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{decode, encode, AttributeSpec, Resource};
use crate::client::ProviderHttpClient;
use crate::customtypes::CustomStringValue;
use crate::error::ProviderError;

/// Resource type name.
pub const TYPE_NAME: &str = "aap_job";

static ATTRIBUTES: &[AttributeSpec] = &[
    AttributeSpec::plain("job_template_id").force_new(),
    AttributeSpec::plain("inventory_id"),
    AttributeSpec::semantic("extra_vars"),
    AttributeSpec::computed("id"),
    AttributeSpec::computed("job_type"),
    AttributeSpec::computed("url"),
    AttributeSpec::computed("status"),
];

/// Job state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobModel {
    /// Template to launch.
    pub job_template_id: i64,
    /// Inventory to run against, if not the template's default.
    #[serde(default)]
    pub inventory_id: Option<i64>,
    /// Extra variables as JSON or YAML text.
    #[serde(default)]
    pub extra_vars: CustomStringValue,
    /// Id of the launched job.
    #[serde(default)]
    pub id: Option<i64>,
    /// `run` or `check`.
    #[serde(default)]
    pub job_type: Option<String>,
    /// API URL of the job.
    #[serde(default)]
    pub url: Option<String>,
    /// Last known job status.
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
struct LaunchRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    inventory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra_vars: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct JobApiModel {
    id: i64,
    #[serde(default)]
    job_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl JobApiModel {
    fn apply_to(self, model: &mut JobModel) {
        model.id = Some(self.id);
        model.job_type = self.job_type;
        model.url = self.url;
        model.status = self.status;
    }
}

async fn launch(
    client: &dyn ProviderHttpClient,
    mut model: JobModel,
) -> Result<Value, ProviderError> {
    let request = LaunchRequest {
        inventory: model.inventory_id,
        extra_vars: model.extra_vars.as_known(),
    };
    let body = serde_json::to_vec(&request)?;
    let path = format!("api/v2/job_templates/{}/launch/", model.job_template_id);
    let response = client.do_request(Method::POST, &path, Some(body)).await?;
    let launched: JobApiModel = serde_json::from_slice(&response.expect_status(&[201])?)?;
    info!(
        job_template_id = model.job_template_id,
        job_id = launched.id,
        "job launched"
    );
    launched.apply_to(&mut model);
    encode(&model)
}

/// The `aap_job` resource.
#[derive(Debug, Default)]
pub struct JobResource;

#[async_trait]
impl Resource for JobResource {
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
        launch(client, decode(planned_state)?).await
    }

    #[instrument(skip_all)]
    async fn read(
        &self,
        client: &dyn ProviderHttpClient,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let mut current: JobModel = decode(current_state)?;
        let id = current
            .id
            .ok_or_else(|| ProviderError::Validation("job state has no id".to_string()))?;
        let response = client
            .do_request(Method::GET, &format!("api/v2/jobs/{}/", id), None)
            .await?;
        if response.status == 404 {
            return Err(ProviderError::NotFound(format!("job {}", id)));
        }
        let job: JobApiModel = serde_json::from_slice(&response.expect_status(&[200])?)?;
        job.apply_to(&mut current);
        encode(&current)
    }

    #[instrument(skip_all)]
    async fn update(
        &self,
        client: &dyn ProviderHttpClient,
        _prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        launch(client, decode(planned_state)?).await
    }

    #[instrument(skip_all)]
    async fn delete(
        &self,
        _client: &dyn ProviderHttpClient,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let job: JobModel = decode(current_state)?;
        debug!(job_id = ?job.id, "removing job from state");
        Ok(())
    }
}
