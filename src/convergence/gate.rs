//! # Managed Gate
//!
//! Precondition for every pass: the collection must be owned by this controller.

use crate::convergence::error::ConvergenceError;
use async_trait::async_trait;

/// Reports whether the resource collection's lifecycle is owned by this controller
#[async_trait]
pub trait ManagedGate: Send + Sync {
    /// # Errors
    /// Returns an error if the managed state cannot be determined.
    async fn is_managed(&self) -> anyhow::Result<bool>;
}

/// Evaluate the gate, failing closed when the managed state is unknown.
///
/// # Errors
/// Returns [`ConvergenceError::ManagedCheck`] when the gate errors.
pub async fn check_managed<G: ManagedGate + ?Sized>(
    gate: &G,
    service_name: &str,
) -> Result<bool, ConvergenceError> {
    gate.is_managed()
        .await
        .map_err(|source| ConvergenceError::ManagedCheck {
            service: service_name.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<bool>);

    #[async_trait]
    impl ManagedGate for Fixed {
        async fn is_managed(&self) -> anyhow::Result<bool> {
            self.0.ok_or_else(|| anyhow::anyhow!("vnet lookup failed"))
        }
    }

    #[tokio::test]
    async fn test_check_managed_passes_through_answer() {
        assert!(check_managed(&Fixed(Some(true)), "securitygroups").await.unwrap());
        assert!(!check_managed(&Fixed(Some(false)), "securitygroups").await.unwrap());
    }

    #[tokio::test]
    async fn test_check_managed_fails_closed() {
        let err = check_managed(&Fixed(None), "securitygroups")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to check if securitygroups are managed: vnet lookup failed"
        );
    }
}
