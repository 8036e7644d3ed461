//! # Handle Access Control
//!
//! Tracks which principals may decrypt each handle and which handles are
//! publicly decryptable. Both sets only grow.

use std::collections::{BTreeSet, HashMap, HashSet};

use parking_lot::RwLock;

use cvault_core::{AccountId, EncryptedHandle};

use crate::traits::GatewayError;

/// Access list plus public-decryption set for a gateway's handles.
#[derive(Debug, Default)]
pub struct AccessControl {
    grants: RwLock<HashMap<EncryptedHandle, BTreeSet<AccountId>>>,
    public: RwLock<HashSet<EncryptedHandle>>,
}

impl AccessControl {
    /// Create empty access state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a freshly issued handle with no grants.
    pub fn register(&self, handle: EncryptedHandle) {
        self.grants.write().entry(handle).or_default();
    }

    /// Whether the handle was issued by this gateway.
    pub fn is_known(&self, handle: &EncryptedHandle) -> bool {
        self.grants.read().contains_key(handle)
    }

    /// Grant `principal` access to `handle`. Granting twice is a no-op.
    pub fn grant(
        &self,
        handle: &EncryptedHandle,
        principal: &AccountId,
    ) -> Result<(), GatewayError> {
        let mut grants = self.grants.write();
        let principals = grants
            .get_mut(handle)
            .ok_or(GatewayError::UnknownHandle(*handle))?;
        principals.insert(*principal);
        Ok(())
    }

    /// Whether `principal` holds a grant on `handle`.
    pub fn has_access(&self, handle: &EncryptedHandle, principal: &AccountId) -> bool {
        self.grants
            .read()
            .get(handle)
            .is_some_and(|principals| principals.contains(principal))
    }

    /// Mark `handle` publicly decryptable. Marking twice is a no-op.
    pub fn mark_public(&self, handle: &EncryptedHandle) -> Result<(), GatewayError> {
        if !self.is_known(handle) {
            return Err(GatewayError::UnknownHandle(*handle));
        }
        self.public.write().insert(*handle);
        Ok(())
    }

    /// Whether `handle` is publicly decryptable.
    pub fn is_public(&self, handle: &EncryptedHandle) -> bool {
        self.public.read().contains(handle)
    }
}
