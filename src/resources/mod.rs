//! Resources and data sources served by the provider.
//!
//! Each resource declares its attributes as a static [`AttributeSpec`] table.
//! The table drives [`plan`]: attributes of kind [`AttributeKind::Semantic`]
//! are compared with [`StringSemanticEquals`] instead of byte equality, and
//! when they match the prior value is carried into the planned state.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::client::ProviderHttpClient;
use crate::customtypes::{CustomStringType, CustomStringValue};
use crate::diagnostics::Diagnostic;
use crate::error::ProviderError;
use crate::types::{AttributeChange, PlanResult};
use crate::value::StringSemanticEquals;

pub mod inventory;
pub mod job;

/// How an attribute takes part in planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Configurable; compared byte for byte.
    Plain,
    /// Configurable JSON/YAML text; compared by structure.
    Semantic,
    /// Set by the server; never configured.
    Computed,
}

/// One attribute of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    /// Attribute name in state.
    pub name: &'static str,
    /// Planning behaviour.
    pub kind: AttributeKind,
    /// Changing the attribute replaces the resource.
    pub force_new: bool,
}

impl AttributeSpec {
    /// A plain configurable attribute.
    pub const fn plain(name: &'static str) -> Self {
        Self {
            name,
            kind: AttributeKind::Plain,
            force_new: false,
        }
    }

    /// A configurable attribute holding JSON or YAML text.
    pub const fn semantic(name: &'static str) -> Self {
        Self {
            name,
            kind: AttributeKind::Semantic,
            force_new: false,
        }
    }

    /// A server-computed attribute.
    pub const fn computed(name: &'static str) -> Self {
        Self {
            name,
            kind: AttributeKind::Computed,
            force_new: false,
        }
    }

    /// Mark the attribute as forcing replacement when changed.
    pub const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }
}

/// A managed AAP object.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Resource type name, e.g. `aap_inventory`.
    fn type_name(&self) -> &'static str;

    /// The attribute table used for planning.
    fn attributes(&self) -> &'static [AttributeSpec];

    /// Create the object and return its state.
    async fn create(
        &self,
        client: &dyn ProviderHttpClient,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Refresh the state from the server.
    ///
    /// Returns [`ProviderError::NotFound`] when the object no longer exists.
    async fn read(
        &self,
        client: &dyn ProviderHttpClient,
        current_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Apply the planned state to an existing object.
    async fn update(
        &self,
        client: &dyn ProviderHttpClient,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the object.
    async fn delete(
        &self,
        client: &dyn ProviderHttpClient,
        current_state: Value,
    ) -> Result<(), ProviderError>;
}

/// A read-only lookup.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Data source type name.
    fn type_name(&self) -> &'static str;

    /// Look up data described by `config`.
    async fn read(
        &self,
        client: &dyn ProviderHttpClient,
        config: Value,
    ) -> Result<Value, ProviderError>;
}

/// Plan a create, update or delete from the attribute table.
///
/// A missing or null prior state plans a create; a null proposed state plans
/// a delete.
pub fn plan(
    attributes: &[AttributeSpec],
    prior_state: Option<Value>,
    proposed_state: Value,
) -> Result<PlanResult, ProviderError> {
    match prior_state.filter(|prior| !prior.is_null()) {
        None => plan_create(attributes, proposed_state),
        Some(prior) if proposed_state.is_null() => plan_delete(attributes, prior),
        Some(prior) => plan_update(attributes, prior, proposed_state),
    }
}

fn plan_create(
    attributes: &[AttributeSpec],
    proposed_state: Value,
) -> Result<PlanResult, ProviderError> {
    let mut planned = into_object(proposed_state)?;
    let mut changes = Vec::new();

    for attr in attributes {
        if attr.kind == AttributeKind::Computed {
            // Known after apply.
            planned.insert(attr.name.to_string(), Value::Null);
        } else if let Some(value) = planned.get(attr.name).filter(|v| !v.is_null()) {
            changes.push(AttributeChange::added(attr.name, value.clone()));
        }
    }

    Ok(PlanResult::with_changes(Value::Object(planned), changes, false))
}

fn plan_delete(attributes: &[AttributeSpec], prior_state: Value) -> Result<PlanResult, ProviderError> {
    let prior = into_object(prior_state)?;
    let changes = attributes
        .iter()
        .filter_map(|attr| {
            prior
                .get(attr.name)
                .filter(|v| !v.is_null())
                .map(|v| AttributeChange::removed(attr.name, v.clone()))
        })
        .collect();

    Ok(PlanResult::with_changes(Value::Null, changes, false))
}

fn plan_update(
    attributes: &[AttributeSpec],
    prior_state: Value,
    proposed_state: Value,
) -> Result<PlanResult, ProviderError> {
    let prior = into_object(prior_state)?;
    let mut planned = into_object(proposed_state)?;
    let mut changes = Vec::new();
    let mut diagnostics = Vec::new();
    let mut requires_replace = false;

    for attr in attributes.iter().filter(|a| a.kind != AttributeKind::Computed) {
        let before = prior.get(attr.name).cloned().unwrap_or(Value::Null);
        let after = planned.get(attr.name).cloned().unwrap_or(Value::Null);
        if before == after {
            continue;
        }

        if attr.kind == AttributeKind::Semantic {
            let (matched, diags) = semantically_equal(&before, &after)?;
            diagnostics.extend(diags.into_iter().map(|d| d.with_attribute(attr.name)));
            if matched {
                debug!(attribute = attr.name, "semantically equal, keeping prior value");
                planned.insert(attr.name.to_string(), before);
                continue;
            }
        }

        requires_replace |= attr.force_new;
        changes.push(AttributeChange::modified(attr.name, before, after));
    }

    for attr in attributes.iter().filter(|a| a.kind == AttributeKind::Computed) {
        let value = if requires_replace {
            Value::Null
        } else {
            prior.get(attr.name).cloned().unwrap_or(Value::Null)
        };
        planned.insert(attr.name.to_string(), value);
    }

    Ok(PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
        .with_diagnostics(diagnostics))
}

fn semantically_equal(before: &Value, after: &Value) -> Result<(bool, Vec<Diagnostic>), ProviderError> {
    let prior = CustomStringType.value_from_json(before)?;
    let proposed = CustomStringType.value_from_json(after)?;
    Ok(prior.string_semantic_equals(&proposed))
}

/// Keep `prior` when the server's `fresh` text means the same thing.
///
/// Servers reformat payloads on write; storing their text verbatim would make
/// the next plan compare configuration against a reformatted copy.
pub fn reconcile(prior: &CustomStringValue, fresh: CustomStringValue) -> CustomStringValue {
    if prior.is_unknown() || prior == &fresh {
        return fresh;
    }
    let (matched, diagnostics) = prior.string_semantic_equals(&fresh);
    for diagnostic in &diagnostics {
        warn!(summary = %diagnostic.summary, detail = ?diagnostic.detail, "semantic comparison");
    }
    if matched {
        prior.clone()
    } else {
        fresh
    }
}

fn into_object(state: Value) -> Result<Map<String, Value>, ProviderError> {
    match state {
        Value::Object(map) => Ok(map),
        other => Err(ProviderError::Validation(format!(
            "expected an object for resource state, got {}",
            other
        ))),
    }
}

/// Decode state into a typed model.
pub(crate) fn decode<T: DeserializeOwned>(state: Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(state)?)
}

/// Encode a typed model as state.
pub(crate) fn encode<T: Serialize>(model: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(model)?)
}
