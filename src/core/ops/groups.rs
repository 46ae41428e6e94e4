//! Group operations

use super::computers::require_identity;
use super::{AdSession, CommandResult};
use crate::constants::AD_OPERATION_TIMEOUT;
use crate::core::interpret;
use crate::core::script::{self, NewGroup};
use crate::models::{AdGroup, GroupMember};
use crate::utils::AdError;

impl AdSession {
    /// Create a group.
    pub async fn create_group(&self, request: &NewGroup) -> CommandResult {
        let outcome = async {
            require_identity(&request.name, "Group name")?;
            self.guard().await?;
            let script = script::create_group(request, self.config().parent_ou.as_deref());
            self.run_action(script, AD_OPERATION_TIMEOUT).await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Delete a group: existence check, delete, re-check.
    pub async fn delete_group(&self, identity: &str) -> CommandResult {
        let outcome = async {
            require_identity(identity, "Group name")?;
            self.guard().await?;
            self.run_action(script::delete_group(identity), AD_OPERATION_TIMEOUT)
                .await
        }
        .await;
        match outcome {
            Ok(c) => CommandResult::from_classification(c),
            Err(e) => CommandResult::from(&e),
        }
    }

    /// Add a member (user, computer, or group) to a group.
    pub async fn add_group_member(&self, group: &str, member: &str) -> CommandResult {
        let outcome = async {
            require_identity(group, "Group name")?;
            require_identity(member, "Member identity")?;
            self.guard().await?;
            self.run_action(
                script::add_group_member(group, member),
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

    /// Remove a member from a group.
    pub async fn remove_group_member(&self, group: &str, member: &str) -> CommandResult {
        let outcome = async {
            require_identity(group, "Group name")?;
            require_identity(member, "Member identity")?;
            self.guard().await?;
            self.run_action(
                script::remove_group_member(group, member),
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

    /// List groups, optionally filtered by name substring.
    pub async fn list_groups(&self, filter: Option<&str>) -> Result<Vec<AdGroup>, AdError> {
        self.guard().await?;
        let raw = self
            .run_query(script::list_groups(filter), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed(&raw)
    }

    /// List the members of a group.
    pub async fn get_group_members(&self, group: &str) -> Result<Vec<GroupMember>, AdError> {
        require_identity(group, "Group name")?;
        self.guard().await?;
        let raw = self
            .run_query(script::group_members(group), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed(&raw)
    }
}
