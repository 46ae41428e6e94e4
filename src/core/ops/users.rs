//! User account operations

use super::computers::require_identity;
use super::{AdSession, CommandResult};
use crate::constants::AD_OPERATION_TIMEOUT;
use crate::core::interpret;
use crate::core::script::{self, NewUser};
use crate::models::{AdUser, SecureString};
use crate::utils::AdError;
use serde::Serialize;
use serde_json::json;

/// Result of a user creation, echoing the created record on success
#[derive(Debug, Serialize)]
pub struct CreateUserResult {
    #[serde(flatten)]
    pub result: CommandResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AdUser>,
}

impl AdSession {
    /// Create a user account, with best-effort group memberships.
    ///
    /// `initial_password` rides the stdin payload when
    /// `request.set_initial_password` is set; it never enters script
    /// text or process arguments.
    pub async fn create_user(
        &self,
        request: &NewUser,
        initial_password: Option<&SecureString>,
    ) -> CreateUserResult {
        match self.try_create_user(request, initial_password).await {
            Ok(outcome) => outcome,
            Err(e) => CreateUserResult {
                result: CommandResult::from(&e),
                user: None,
            },
        }
    }

    async fn try_create_user(
        &self,
        request: &NewUser,
        initial_password: Option<&SecureString>,
    ) -> Result<CreateUserResult, AdError> {
        if request.name.trim().is_empty() {
            return Err(AdError::Validation("User name is required".to_string()));
        }
        if request.sam_account_name.trim().is_empty() {
            return Err(AdError::Validation(
                "SAM account name is required".to_string(),
            ));
        }
        if request.set_initial_password && initial_password.is_none() {
            return Err(AdError::Validation(
                "Initial password is required when set_initial_password is enabled".to_string(),
            ));
        }
        self.guard().await?;

        let script = script::create_user(request, self.config().parent_ou.as_deref());
        let extras = match initial_password.filter(|_| request.set_initial_password) {
            Some(password) => json!({ "initial_password": password.as_str() }),
            None => json!({}),
        };
        let classification = self
            .run_action_with(script, extras, AD_OPERATION_TIMEOUT)
            .await?;

        let user = classification.success.then(|| AdUser {
            name: request.name.clone(),
            sam_account_name: request.sam_account_name.clone(),
            description: request.description.clone(),
            title: request.title.clone(),
            department: request.department.clone(),
            email: request.email.clone(),
            enabled: request.enabled,
            ..Default::default()
        });

        Ok(CreateUserResult {
            result: CommandResult::from_classification(classification),
            user,
        })
    }

    /// Update one field on a user object.
    pub async fn update_user_field(
        &self,
        identity: &str,
        field: &str,
        value: &str,
    ) -> CommandResult {
        let outcome = async {
            require_identity(identity, "User identity")?;
            self.guard().await?;
            let script = script::update_user_field(identity, field, value)?;
            self.run_action(script, AD_OPERATION_TIMEOUT).await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Delete a user account: existence check, delete, re-check.
    pub async fn delete_user(&self, identity: &str) -> CommandResult {
        let outcome = async {
            require_identity(identity, "User identity")?;
            self.guard().await?;
            self.run_action(script::delete_user(identity), AD_OPERATION_TIMEOUT)
                .await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Enable or disable a user account.
    pub async fn set_user_enabled(&self, identity: &str, enabled: bool) -> CommandResult {
        let outcome = async {
            require_identity(identity, "User identity")?;
            self.guard().await?;
            self.run_action(
                script::set_user_enabled(identity, enabled),
                AD_OPERATION_TIMEOUT,
            )
            .await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Reset a user's password.
    ///
    /// Coordinates the `PasswordNeverExpires` flag around the reset;
    /// each best-effort step is reported in `steps`. The new password
    /// travels via the stdin payload.
    pub async fn reset_password(
        &self,
        identity: &str,
        new_password: &SecureString,
        force_change: bool,
    ) -> CommandResult {
        let outcome = async {
            require_identity(identity, "User identity")?;
            if new_password.is_empty() {
                return Err(AdError::Validation("New password is required".to_string()));
            }
            self.guard().await?;
            let script = script::reset_password(identity, force_change);
            self.run_action_with(
                script,
                json!({ "new_password": new_password.as_str() }),
                AD_OPERATION_TIMEOUT,
            )
            .await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// List user accounts, optionally filtered by name substring.
    pub async fn list_users(&self, filter: Option<&str>) -> Result<Vec<AdUser>, AdError> {
        self.guard().await?;
        let raw = self
            .run_query(script::list_users(filter), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed(&raw)
    }

    /// Fetch a single user account.
    pub async fn get_user(&self, identity: &str) -> Result<AdUser, AdError> {
        require_identity(identity, "User identity")?;
        self.guard().await?;
        let raw = self
            .run_query(script::get_user(identity), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed::<AdUser>(&raw)?
            .into_iter()
            .next()
            .ok_or_else(|| AdError::Parse(format!("No record returned for {}", identity)))
    }
}
