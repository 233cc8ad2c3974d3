// src/proxy/mixin.rs
//! Mixin composition
//!
//! The descriptor records one type per mixin slot. Instances are bound per
//! proxy and must be assignable to the recorded slot type.

use crate::model::{Target, TypeInfo};
use crate::utils::errors::{ProxyError, Result};
use std::sync::Arc;

/// Validates and orders mixin instances for a descriptor
pub struct MixinComposer<'a> {
    slots: &'a [Arc<TypeInfo>],
}

impl<'a> MixinComposer<'a> {
    pub fn new(slots: &'a [Arc<TypeInfo>]) -> Self {
        Self { slots }
    }

    /// Check `instances` against the slots, in slot order
    pub fn bind(&self, instances: Vec<Arc<dyn Target>>) -> Result<Vec<Arc<dyn Target>>> {
        if instances.len() != self.slots.len() {
            let slot = instances.len().min(self.slots.len());
            return Err(ProxyError::MixinTypeMismatch {
                slot,
                expected: self
                    .slots
                    .get(slot)
                    .map(|t| t.name().to_string())
                    .unwrap_or_else(|| "no mixin".to_string()),
                actual: instances
                    .get(slot)
                    .map(|m| m.type_info().name().to_string())
                    .unwrap_or_else(|| "no mixin".to_string()),
            });
        }

        for (slot, (expected, instance)) in self.slots.iter().zip(&instances).enumerate() {
            let actual = instance.type_info();
            if !actual.is_assignable_to(expected) {
                return Err(ProxyError::MixinTypeMismatch {
                    slot,
                    expected: expected.name().to_string(),
                    actual: actual.name().to_string(),
                });
            }
        }

        Ok(instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemberBuilder, Object, TypeBuilder, Value};

    fn class(name: &str) -> Arc<TypeInfo> {
        TypeBuilder::class(name)
            .member(MemberBuilder::method("Ping").body(|_, _| Ok(Value::Unit)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_bind_checks_slot_types() {
        let audit = class("Audit");
        let clock = class("Clock");
        let slots = vec![audit.clone(), clock.clone()];
        let composer = MixinComposer::new(&slots);

        let audit_obj: Arc<dyn Target> = Object::new(&audit, &[]).unwrap();
        let clock_obj: Arc<dyn Target> = Object::new(&clock, &[]).unwrap();

        let bound = composer
            .bind(vec![audit_obj.clone(), clock_obj.clone()])
            .unwrap();
        assert_eq!(bound.len(), 2);

        let swapped = composer.bind(vec![clock_obj, audit_obj.clone()]);
        assert!(matches!(
            swapped,
            Err(ProxyError::MixinTypeMismatch { slot: 0, .. })
        ));

        let missing = composer.bind(vec![audit_obj]);
        assert!(matches!(
            missing,
            Err(ProxyError::MixinTypeMismatch { slot: 1, .. })
        ));
    }

    #[test]
    fn test_derived_instance_fits_slot() {
        let audit = class("Audit");
        let derived = TypeBuilder::class("FileAudit").extends(&audit).build().unwrap();
        let slots = vec![audit];

        let instance: Arc<dyn Target> = Object::new(&derived, &[]).unwrap();
        assert!(MixinComposer::new(&slots).bind(vec![instance]).is_ok());
    }
}
