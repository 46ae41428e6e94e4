//! Computer account operations

use super::{AdSession, CommandResult};
use crate::constants::AD_OPERATION_TIMEOUT;
use crate::core::interpret;
use crate::core::script::{self, NewComputer};
use crate::models::AdComputer;
use crate::utils::AdError;
use serde::Serialize;

/// Result of a computer creation, echoing the created record on success
#[derive(Debug, Serialize)]
pub struct CreateComputerResult {
    #[serde(flatten)]
    pub result: CommandResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computer: Option<AdComputer>,
}

impl AdSession {
    /// Create a computer account, with best-effort group memberships.
    pub async fn create_computer(&self, request: &NewComputer) -> CreateComputerResult {
        match self.try_create_computer(request).await {
            Ok(outcome) => outcome,
            Err(e) => CreateComputerResult {
                result: CommandResult::from(&e),
                computer: None,
            },
        }
    }

    async fn try_create_computer(
        &self,
        request: &NewComputer,
    ) -> Result<CreateComputerResult, AdError> {
        if request.name.trim().is_empty() {
            return Err(AdError::Validation("Computer name is required".to_string()));
        }
        self.guard().await?;

        let script = script::create_computer(request, self.config().parent_ou.as_deref());
        let classification = self.run_action(script, AD_OPERATION_TIMEOUT).await?;

        let computer = classification.success.then(|| AdComputer {
            name: request.name.clone(),
            sam_account_name: format!("{}$", request.name.trim_end_matches('$')),
            description: request.description.clone(),
            enabled: true,
            ..Default::default()
        });

        Ok(CreateComputerResult {
            result: CommandResult::from_classification(classification),
            computer,
        })
    }

    /// Update one field on a computer object (allow-listed fields map to
    /// dedicated parameters, anything else goes through `-Replace`).
    pub async fn update_computer_field(
        &self,
        identity: &str,
        field: &str,
        value: &str,
    ) -> CommandResult {
        let outcome = async {
            require_identity(identity, "Computer name")?;
            self.guard().await?;
            let script = script::update_computer_field(identity, field, value)?;
            self.run_action(script, AD_OPERATION_TIMEOUT).await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Delete a computer account: existence check, delete, re-check.
    pub async fn delete_computer(&self, identity: &str) -> CommandResult {
        let outcome = async {
            require_identity(identity, "Computer name")?;
            self.guard().await?;
            self.run_action(script::delete_computer(identity), AD_OPERATION_TIMEOUT)
                .await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// List computer accounts, optionally filtered by name substring.
    pub async fn list_computers(&self, filter: Option<&str>) -> Result<Vec<AdComputer>, AdError> {
        self.guard().await?;
        let raw = self
            .run_query(script::list_computers(filter), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed(&raw)
    }

    /// Fetch a single computer account.
    pub async fn get_computer(&self, identity: &str) -> Result<AdComputer, AdError> {
        require_identity(identity, "Computer name")?;
        self.guard().await?;
        let raw = self
            .run_query(script::get_computer(identity), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed::<AdComputer>(&raw)?
            .into_iter()
            .next()
            .ok_or_else(|| AdError::Parse(format!("No record returned for {}", identity)))
    }
}

pub(crate) fn require_identity(value: &str, what: &str) -> Result<(), AdError> {
    if value.trim().is_empty() {
        Err(AdError::Validation(format!("{} is required", what)))
    } else {
        Ok(())
    }
}
