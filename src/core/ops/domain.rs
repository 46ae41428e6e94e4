//! Domain-level queries: domain info, OU enumeration, object counts

use super::AdSession;
use crate::constants::AD_OPERATION_TIMEOUT;
use crate::core::interpret;
use crate::core::script;
use crate::models::{DomainInfo, ObjectCounts, OrganizationalUnit};
use crate::utils::AdError;

impl AdSession {
    /// Fetch the domain summary.
    pub async fn get_domain_info(&self) -> Result<DomainInfo, AdError> {
        self.guard().await?;
        let raw = self
            .run_query(script::domain_info(), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed::<DomainInfo>(&raw)?
            .into_iter()
            .next()
            .ok_or_else(|| AdError::Parse("No domain record returned".to_string()))
    }

    /// List the organizational units of the domain.
    pub async fn list_organizational_units(&self) -> Result<Vec<OrganizationalUnit>, AdError> {
        self.guard().await?;
        let raw = self
            .run_query(script::list_organizational_units(), AD_OPERATION_TIMEOUT)
            .await?;
        interpret::parse_typed(&raw)
    }

    /// Aggregate object counts.
    ///
    /// The three count queries run concurrently and join; a failed
    /// branch contributes 0 and logs a warning rather than failing the
    /// aggregate. There is no cancellation propagation between branches.
    pub async fn object_counts(&self) -> ObjectCounts {
        // One gate check covers all three branches; a Kerberos-only
        // session without a ticket reports all-zero counts.
        if let Err(e) = self.guard().await {
            tracing::warn!(error = %e, "count fan-out rejected by precondition gate");
            return ObjectCounts::default();
        }

        let (users, computers, groups) = tokio::join!(
            self.count_branch("Get-ADUser", "users"),
            self.count_branch("Get-ADComputer", "computers"),
            self.count_branch("Get-ADGroup", "groups"),
        );
        ObjectCounts {
            users,
            computers,
            groups,
        }
    }

    async fn count_branch(&self, get_cmdlet: &str, label: &str) -> u64 {
        let outcome = async {
            let raw = self
                .run_query(script::count_objects(get_cmdlet), AD_OPERATION_TIMEOUT)
                .await?;
            raw.trim()
                .parse::<u64>()
                .map_err(|_| AdError::Parse(format!("Count query returned non-numeric: {}", raw)))
        }
        .await;

        match outcome {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(kind = label, error = %e, "count query failed; substituting 0");
                0
            }
        }
    }
}
