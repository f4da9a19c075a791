//! Cache keys for GPU objects.
//!
//! wgpu handles have no stable identity that can be hashed, so every view,
//! sampler, buffer and layout the blitter binds is wrapped in [`Keyed`].
//! Bind groups are then cached by the [`ResourceKey`]s of what they bind.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one GPU object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ResourceKey(u64);

impl ResourceKey {
    fn next() -> Self {
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// A GPU object paired with its [`ResourceKey`].
///
/// Clones share the key: they refer to the same underlying object.
#[derive(Debug, Clone)]
pub struct Keyed<T> {
    key: ResourceKey,
    inner: T,
}

impl<T> Keyed<T> {
    pub fn new(inner: T) -> Self {
        Self {
            key: ResourceKey::next(),
            inner,
        }
    }

    #[inline]
    pub fn key(&self) -> ResourceKey {
        self.key
    }
}

impl<T> Deref for Keyed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_a_key_new_wraps_do_not() {
        let a = Keyed::new(1u8);
        let b = a.clone();
        let c = Keyed::new(1u8);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert_eq!(*c, 1);
    }
}
