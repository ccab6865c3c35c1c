use dinehub_core::{BusinessId, OwnerId};

/// Authenticated business-owner context for a request.
///
/// Inserted by the auth middleware; immutable and present for all owner routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BusinessContext {
    owner_id: OwnerId,
    business_id: BusinessId,
}

impl BusinessContext {
    pub fn new(owner_id: OwnerId, business_id: BusinessId) -> Self {
        Self { owner_id, business_id }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    pub fn business_id(&self) -> BusinessId {
        self.business_id
    }
}
