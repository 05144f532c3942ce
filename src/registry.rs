//! Proxy Registry
//!
//! Owns every registered [`VolumeProxy`]. The registry lives on the rendering
//! thread and is only mutated by commands drained from the render queue, so
//! a frame always sees a stable list: nothing is added or removed while a
//! frame is being recorded.
//!
//! Registration order is preserved; it is the tie-break order when proxies
//! are sorted by depth.

use rustc_hash::FxHashSet;

use crate::errors::{OverlayError, Result};
use crate::host::RenderDevice;
use crate::proxy::{ProxyId, VolumeProxy};

#[derive(Debug, Default)]
pub struct ProxyRegistry {
    proxies: Vec<VolumeProxy>,
    ids: FxHashSet<ProxyId>,
}

impl ProxyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `proxy`, rejecting an id that is already registered.
    pub fn try_add(&mut self, proxy: VolumeProxy) -> Result<()> {
        let id = proxy.id();
        if !self.ids.insert(id) {
            return Err(OverlayError::DuplicateProxy(id));
        }
        self.proxies.push(proxy);
        Ok(())
    }

    /// Appends `proxy`. Registering the same id twice is a contract violation:
    /// it asserts in debug builds and is dropped with an error log otherwise.
    pub fn add(&mut self, proxy: VolumeProxy) {
        if let Err(err) = self.try_add(proxy) {
            debug_assert!(false, "{err}");
            log::error!("{err}");
        }
    }

    /// Removes the proxy with `id`; absent ids are ignored.
    pub fn remove(&mut self, id: ProxyId) -> Option<VolumeProxy> {
        if !self.ids.remove(&id) {
            return None;
        }
        let index = self.proxies.iter().position(|p| p.id() == id)?;
        Some(self.proxies.remove(index))
    }

    /// Removes the proxy and returns its offscreen targets to `device`.
    pub fn remove_and_release(&mut self, id: ProxyId, device: &mut dyn RenderDevice) -> bool {
        match self.remove(id) {
            Some(mut proxy) => {
                proxy.targets.release(device);
                true
            }
            None => false,
        }
    }

    /// Clears per-frame visibility on every proxy. Called once per frame,
    /// before the host computes scene visibility.
    pub fn reset_visibility(&mut self) {
        for proxy in &mut self.proxies {
            proxy.visibility.reset();
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: ProxyId) -> bool {
        self.ids.contains(&id)
    }

    #[must_use]
    pub fn get(&self, id: ProxyId) -> Option<&VolumeProxy> {
        self.proxies.iter().find(|p| p.id() == id)
    }

    pub fn get_mut(&mut self, id: ProxyId) -> Option<&mut VolumeProxy> {
        self.proxies.iter_mut().find(|p| p.id() == id)
    }

    /// The full list, in registration order.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> &[VolumeProxy] {
        &self.proxies
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, VolumeProxy> {
        self.proxies.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, VolumeProxy> {
        self.proxies.iter_mut()
    }

    /// Mutable access for the frame loop.
    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [VolumeProxy] {
        &mut self.proxies
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Ids in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<ProxyId> {
        self.proxies.iter().map(VolumeProxy::id).collect()
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;
    use crate::proxy::VolumeParams;

    fn proxy(id: ProxyId) -> VolumeProxy {
        VolumeProxy::new(id, Mat4::IDENTITY, VolumeParams::default()).unwrap()
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut registry = ProxyRegistry::new();
        let id = ProxyId::next();
        registry.try_add(proxy(id)).unwrap();
        assert!(matches!(
            registry.try_add(proxy(id)),
            Err(OverlayError::DuplicateProxy(dup)) if dup == id
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already registered")]
    fn duplicate_add_asserts_in_debug() {
        let mut registry = ProxyRegistry::new();
        let id = ProxyId::next();
        registry.add(proxy(id));
        registry.add(proxy(id));
    }

    #[test]
    fn removing_absent_is_noop() {
        let mut registry = ProxyRegistry::new();
        let kept = ProxyId::next();
        registry.add(proxy(kept));

        assert!(registry.remove(ProxyId::next()).is_none());
        assert_eq!(registry.ids(), vec![kept]);

        assert!(registry.remove(kept).is_some());
        assert!(registry.remove(kept).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn preserves_registration_order() {
        let mut registry = ProxyRegistry::new();
        let ids: Vec<_> = (0..4).map(|_| ProxyId::next()).collect();
        for id in &ids {
            registry.add(proxy(*id));
        }
        registry.remove(ids[1]);
        assert_eq!(registry.ids(), vec![ids[0], ids[2], ids[3]]);
    }
}
