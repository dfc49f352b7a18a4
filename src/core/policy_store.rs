//! Process-wide holder for the active relocation policy.
//!
//! Readers take an `Arc` snapshot and keep using it for the whole invocation;
//! a refresh swaps the reference and never mutates a published policy.

use aws_sdk_ssm::Client as SsmClient;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use super::config::{AppConfig, RelocationPolicy};
use crate::errors::WranglerError;

#[derive(Debug, Default)]
pub struct PolicyStore {
    current: RwLock<Arc<RelocationPolicy>>,
}

impl PolicyStore {
    #[must_use]
    pub fn new(policy: RelocationPolicy) -> Self {
        Self {
            current: RwLock::new(Arc::new(policy)),
        }
    }

    /// The policy in force right now.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RelocationPolicy> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Publishes a new policy. Snapshots already handed out are unaffected.
    pub fn replace(&self, policy: RelocationPolicy) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(policy);
    }

    /// Re-reads the policy from its configured source and publishes it.
    ///
    /// With no SSM parameter configured the policy comes from the environment.
    /// A failed SSM read keeps the previous policy in force.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment holds an invalid policy setting.
    pub async fn refresh(&self, config: &AppConfig) -> Result<Arc<RelocationPolicy>, WranglerError> {
        let Some(name) = config.policy_parameter_name.as_deref() else {
            let policy = RelocationPolicy::from_env().map_err(WranglerError::Config)?;
            self.replace(policy);
            return Ok(self.snapshot());
        };

        match load_policy_parameter(name).await {
            Ok(Some(policy)) => {
                info!(parameter = %name, "Loaded relocation policy from SSM");
                self.replace(policy);
            }
            Ok(None) => {
                warn!(parameter = %name, "Policy parameter not found; keeping current policy");
            }
            Err(e) => {
                warn!(parameter = %name, error = %e, "Failed to load policy; keeping current policy");
            }
        }

        Ok(self.snapshot())
    }
}

/// Reads a JSON policy document from SSM Parameter Store.
///
/// # Errors
///
/// Returns an error if the SSM call fails or the document is not valid JSON.
pub async fn load_policy_parameter(name: &str) -> Result<Option<RelocationPolicy>, WranglerError> {
    let shared = aws_config::from_env().load().await;
    let client = SsmClient::new(&shared);

    match client
        .get_parameter()
        .name(name)
        .with_decryption(true)
        .send()
        .await
    {
        Ok(resp) => {
            let Some(param) = resp.parameter else {
                return Ok(None);
            };
            let Some(value) = param.value() else {
                return Ok(None);
            };
            parse_policy_document(value).map(Some)
        }
        Err(e) => {
            let msg = format!("{e}");
            if msg.contains("ParameterNotFound") {
                Ok(None)
            } else {
                Err(WranglerError::Aws(format!("ssm get_parameter: {e}")))
            }
        }
    }
}

/// # Errors
///
/// Returns an error if `raw` is not a JSON policy document.
pub fn parse_policy_document(raw: &str) -> Result<RelocationPolicy, WranglerError> {
    serde_json::from_str(raw).map_err(|e| WranglerError::Config(format!("policy document: {e}")))
}
