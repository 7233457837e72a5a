//! Per-slot capability checks.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use upvault_shared::types::PrincipalId;
use upvault_shared::{AppError, Claims};

use super::catalog::ResourceCatalog;
use super::types::{Capability, SlotConfig};

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Principal ID.
    pub id: PrincipalId,
    /// Role name matched against slot visibility.
    pub role: String,
}

impl Principal {
    /// Create a principal.
    #[must_use]
    pub fn new(id: PrincipalId, role: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
        }
    }
}

impl From<&Claims> for Principal {
    fn from(claims: &Claims) -> Self {
        Self::new(PrincipalId::from_uuid(claims.principal_id()), claims.role.clone())
    }
}

/// Authorization failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// Unknown resource type.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Unknown slot on a known resource.
    #[error("field not found: {resource}.{slot}")]
    SlotNotFound {
        /// Resource type.
        resource: String,
        /// Slot name.
        slot: String,
    },

    /// Slot hidden from the principal's role.
    #[error("field {0} is not visible to this principal")]
    NotVisible(String),

    /// Slot does not grant the capability.
    #[error("capability '{capability}' not granted on field {slot}")]
    CapabilityDenied {
        /// Slot name.
        slot: String,
        /// Requested capability.
        capability: Capability,
    },
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::ResourceNotFound(_) | AccessError::SlotNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            AccessError::NotVisible(_) | AccessError::CapabilityDenied { .. } => {
                Self::Forbidden(err.to_string())
            }
        }
    }
}

/// Resolves a slot and checks a capability for a principal.
///
/// Stateless apart from the shared catalog; every request is checked on its
/// own and capabilities are never inherited between slots.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    catalog: Arc<ResourceCatalog>,
}

impl AccessGuard {
    /// Create a guard over a validated catalog.
    #[must_use]
    pub fn new(catalog: Arc<ResourceCatalog>) -> Self {
        Self { catalog }
    }

    /// The catalog the guard checks against.
    #[must_use]
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// Resolve `resource.slot` and require `capability`.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound`/`SlotNotFound` for unknown names, `NotVisible` when
    /// the role is outside the slot's visibility list, `CapabilityDenied` when
    /// the slot does not grant `capability`.
    pub fn authorize(
        &self,
        principal: &Principal,
        resource: &str,
        slot: &str,
        capability: Capability,
    ) -> Result<&SlotConfig, AccessError> {
        if !self.catalog.has_resource(resource) {
            return Err(AccessError::ResourceNotFound(resource.to_string()));
        }
        let config = self
            .catalog
            .slot(resource, slot)
            .ok_or_else(|| AccessError::SlotNotFound {
                resource: resource.to_string(),
                slot: slot.to_string(),
            })?;

        if !config.is_visible_to(&principal.role) {
            debug!(principal = %principal.id, role = %principal.role, resource, slot, "slot hidden");
            return Err(AccessError::NotVisible(slot.to_string()));
        }
        if !config.grants(capability) {
            debug!(principal = %principal.id, resource, slot, %capability, "capability denied");
            return Err(AccessError::CapabilityDenied {
                slot: slot.to_string(),
                capability,
            });
        }

        Ok(config)
    }
}
