//! Ownership-scoped authorization.
//!
//! Every owner route follows the same rule: load the parent resource, then
//! allow the call only if that resource belongs to the caller's business.
//! A missing resource and a foreign one are both denials.

use thiserror::Error;

use dinehub_core::{BusinessId, BusinessOwned};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    #[error("resource not found")]
    Missing,

    #[error("resource belongs to business {owner}, caller acts for {caller}")]
    BusinessMismatch { owner: BusinessId, caller: BusinessId },
}

/// Authorize `caller` against an optionally-loaded resource.
///
/// - No IO
/// - No panics
pub fn ensure_owned<T: BusinessOwned>(resource: Option<T>, caller: BusinessId) -> Result<T, AuthzError> {
    let resource = resource.ok_or(AuthzError::Missing)?;

    let owner = resource.owner_business_id();
    if owner != caller {
        tracing::debug!(%owner, %caller, "ownership check denied");
        return Err(AuthzError::BusinessMismatch { owner, caller });
    }

    Ok(resource)
}
