//! Ownership guard for owner routes.
//!
//! Runs the resource loader, then applies [`dinehub_auth::ensure_owned`]
//! against the caller's business. Denials become `403` with the route's
//! message; whether the resource exists is not revealed.

use std::future::Future;

use dinehub_auth::ensure_owned;
use dinehub_core::BusinessOwned;
use dinehub_infra::StoreError;

use crate::app::errors::ApiError;
use crate::context::BusinessContext;

/// Load a resource and require that it belongs to the caller's business.
pub async fn load_owned<T, F, Fut>(ctx: &BusinessContext, denial: &'static str, load: F) -> Result<T, ApiError>
where
    T: BusinessOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>, StoreError>>,
{
    let resource = load().await?;

    ensure_owned(resource, ctx.business_id()).map_err(|e| {
        tracing::warn!(
            business_id = %ctx.business_id(),
            owner_id = %ctx.owner_id(),
            reason = %e,
            "{denial}"
        );
        ApiError::Forbidden(denial.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dinehub_core::{BusinessId, OwnerId};

    struct Owned(BusinessId);

    impl BusinessOwned for Owned {
        fn owner_business_id(&self) -> BusinessId {
            self.0
        }
    }

    fn ctx(business: i64) -> BusinessContext {
        BusinessContext::new(OwnerId::new(1), BusinessId::new(business))
    }

    #[tokio::test]
    async fn owned_resource_passes_through() {
        let got = load_owned(&ctx(1), "nope", || async { Ok(Some(Owned(BusinessId::new(1)))) }).await;
        assert!(got.is_ok());
    }

    #[tokio::test]
    async fn missing_and_foreign_resources_are_forbidden_alike() {
        let missing = load_owned::<Owned, _, _>(&ctx(1), "nope", || async { Ok(None) }).await;
        let foreign = load_owned(&ctx(1), "nope", || async { Ok(Some(Owned(BusinessId::new(2)))) }).await;

        for result in [missing, foreign] {
            match result {
                Err(ApiError::Forbidden(msg)) => assert_eq!(msg, "nope"),
                Err(other) => panic!("expected forbidden, got {other:?}"),
                Ok(_) => panic!("expected forbidden, got Ok"),
            }
        }
    }

    #[tokio::test]
    async fn loader_failures_are_not_authorization_failures() {
        let got = load_owned::<Owned, _, _>(&ctx(1), "nope", || async {
            Err(StoreError::Backend("down".to_string()))
        })
        .await;
        assert!(matches!(got, Err(ApiError::Store(StoreError::Backend(_)))));
    }
}
