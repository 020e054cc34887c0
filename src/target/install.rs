//! Writing wrappers into owner slots and putting originals back.

use std::fmt;

use crate::coroutine::Coroutine;

use super::Resolved;

/// Installs a wrapper into the resolved slot and restores the original.
///
/// Free-standing targets have no slot: both operations do nothing and
/// report `false`.
pub(crate) struct Installer<A, R, E> {
    resolved: Resolved<A, R, E>,
    proxy: Coroutine<A, R, E>,
}

impl<A, R, E> Installer<A, R, E> {
    pub(crate) fn new(resolved: Resolved<A, R, E>, proxy: Coroutine<A, R, E>) -> Self {
        Self { resolved, proxy }
    }

    pub(crate) fn resolved(&self) -> &Resolved<A, R, E> {
        &self.resolved
    }

    pub(crate) fn proxy(&self) -> &Coroutine<A, R, E> {
        &self.proxy
    }

    /// Write the wrapper into the owner's slot.
    pub(crate) fn install(&self) -> bool {
        let Some(slot) = &self.resolved.slot else {
            return false;
        };
        slot.owner.assign(&slot.name, self.proxy.clone());
        tracing::debug!(member = %slot.name, proxy = ?self.proxy.name(), "installed proxy");
        true
    }

    /// Write the original coroutine back into the owner's slot.
    pub(crate) fn restore(&self) -> bool {
        let Some(slot) = &self.resolved.slot else {
            return false;
        };
        slot.owner.assign(&slot.name, self.resolved.original.clone());
        tracing::debug!(member = %slot.name, "restored original");
        true
    }

    /// Returns true if the owner's slot currently holds this wrapper.
    pub(crate) fn is_installed(&self) -> bool {
        self.resolved.slot.as_ref().is_some_and(|slot| {
            slot.owner
                .member(&slot.name)
                .and_then(|member| member.as_coroutine().map(|c| c.ptr_eq(&self.proxy)))
                .unwrap_or(false)
        })
    }
}

impl<A, R, E> fmt::Debug for Installer<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installer")
            .field("target", &self.resolved.label())
            .field("owned", &self.resolved.slot.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::target::{Object, SlotOwner, Target};

    type Co = Coroutine<(), u8, ()>;

    fn constant(value: u8) -> Co {
        Coroutine::new(move |(), _| async move { Ok(value) })
    }

    #[test]
    fn test_install_and_restore_owned_slot() {
        let original = constant(1);
        let proxy = constant(2);
        let owner = Arc::new(Object::new().with_method("gen", original.clone()));

        let resolved = Target::member(&owner, "gen").resolve(None).unwrap();
        let installer = Installer::new(resolved, proxy.clone());

        assert!(!installer.is_installed());
        assert!(installer.install());
        assert!(installer.is_installed());
        assert!(owner.method("gen").unwrap().ptr_eq(&proxy));

        assert!(installer.restore());
        assert!(!installer.is_installed());
        assert!(owner.method("gen").unwrap().ptr_eq(&original));
    }

    #[test]
    fn test_free_target_is_never_installed() {
        let resolved = Target::from(constant(1)).resolve(None).unwrap();
        let installer = Installer::new(resolved, constant(2));

        assert!(!installer.install());
        assert!(!installer.restore());
        assert!(!installer.is_installed());
    }

    #[test]
    fn test_last_install_wins() {
        let owner = Arc::new(Object::new().with_method("gen", constant(1)));
        let first = Installer::new(
            Target::member(&owner, "gen").resolve(None).unwrap(),
            constant(2),
        );
        let second = Installer::new(
            Target::member(&owner, "gen").resolve(None).unwrap(),
            constant(3),
        );

        first.install();
        second.install();

        assert!(!first.is_installed());
        assert!(second.is_installed());
        assert!(owner.member("gen").is_some());
    }
}
