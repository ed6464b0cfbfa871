use uuid::Uuid;

/// Ownership filter derived from a verified session.
///
/// Task queries take an `OwnerScope` instead of a bare user id, so every read,
/// update and delete carries the caller's identity alongside the resource id.
/// The only way to obtain one outside this module is from an
/// [`AuthUser`](super::extractors::AuthUser).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerScope(Uuid);

impl OwnerScope {
    pub(super) fn new(owner: Uuid) -> Self {
        Self(owner)
    }

    pub fn owner(&self) -> Uuid {
        self.0
    }

    /// Whether a stored record's owner field matches this scope.
    pub fn permits(&self, owner_id: Uuid) -> bool {
        self.0 == owner_id
    }

    #[cfg(test)]
    pub fn for_tests(owner: Uuid) -> Self {
        Self(owner)
    }
}
