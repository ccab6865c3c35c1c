//! Business ownership of persisted resources.

use crate::id::BusinessId;

/// A resource scoped to exactly one business.
///
/// Authorization compares this against the caller's business; see
/// `dinehub_auth::ensure_owned`.
pub trait BusinessOwned {
    fn owner_business_id(&self) -> BusinessId;
}

impl<T: BusinessOwned + ?Sized> BusinessOwned for &T {
    fn owner_business_id(&self) -> BusinessId {
        (**self).owner_business_id()
    }
}

impl<T: BusinessOwned + ?Sized> BusinessOwned for Box<T> {
    fn owner_business_id(&self) -> BusinessId {
        (**self).owner_business_id()
    }
}
