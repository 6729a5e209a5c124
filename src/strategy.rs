use alloc::boxed::Box;
use core::ptr::NonNull;

// -----------------------------------------------------------------------------
// Traits

/// Strategy for destroying an owned implementation instance.
///
/// A release strategy is a plain value stored inside a wrapper and invoked
/// exactly once when the wrapper drops or replaces its instance. The default
/// is [`BoxRelease`]; a bare `unsafe fn` pointer ([`ReleaseFn`]) or any user
/// type implementing this trait works as well, so the strategy can carry
/// state.
pub trait Release<T> {
    /// Destroys the instance behind `ptr` and frees its storage.
    ///
    /// # Safety
    /// - `ptr` must point to a live instance owned by the caller.
    /// - `ptr` must match the allocation scheme this strategy releases,
    ///   and must not be used afterwards.
    unsafe fn release(&mut self, ptr: NonNull<T>);
}

/// Strategy for producing an independent copy of an owned instance.
///
/// Invoked when a wrapper is cloned. The returned pointer must be a freshly
/// allocated instance; the source and the copy must never alias.
pub trait Duplicate<T> {
    /// Allocates and returns an independent copy of the instance at `src`.
    ///
    /// # Safety
    /// - `src` must point to a live instance.
    /// - The returned pointer must be releasable by the same release
    ///   strategy that manages `src`.
    unsafe fn duplicate(&self, src: NonNull<T>) -> NonNull<T>;
}

// -----------------------------------------------------------------------------
// Default strategies

/// The default release strategy: frees the instance as a [`Box`] allocation.
///
/// Only usable with instances that were allocated through `Box`, which is
/// what [`ImplPtr::new`](crate::ImplPtr::new) and
/// [`UniqueImplPtr::new`](crate::UniqueImplPtr::new) produce.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct BoxRelease;

impl<T> Release<T> for BoxRelease {
    #[inline]
    unsafe fn release(&mut self, ptr: NonNull<T>) {
        // SAFETY: the caller guarantees `ptr` came from a Box allocation
        // and is not used again.
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

/// The default duplication strategy: copies the instance via [`Clone`]
/// into a fresh [`Box`] allocation.
///
/// Requires `T: Clone`; a wrapper over a non-cloneable type simply cannot
/// be cloned with this strategy in place.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct CloneDuplicate;

impl<T: Clone> Duplicate<T> for CloneDuplicate {
    #[inline]
    unsafe fn duplicate(&self, src: NonNull<T>) -> NonNull<T> {
        // SAFETY: the caller guarantees `src` points to a live instance.
        let value = unsafe { src.as_ref() }.clone();
        NonNull::from(Box::leak(Box::new(value)))
    }
}

// -----------------------------------------------------------------------------
// Function-pointer strategies

/// A release strategy expressed as a bare function pointer.
pub type ReleaseFn<T> = unsafe fn(NonNull<T>);

/// A duplication strategy expressed as a bare function pointer.
pub type DuplicateFn<T> = unsafe fn(NonNull<T>) -> NonNull<T>;

impl<T> Release<T> for ReleaseFn<T> {
    #[inline]
    unsafe fn release(&mut self, ptr: NonNull<T>) {
        // SAFETY: forwarded to the pointed-to function under the same contract.
        unsafe { (*self)(ptr) }
    }
}

impl<T> Duplicate<T> for DuplicateFn<T> {
    #[inline]
    unsafe fn duplicate(&self, src: NonNull<T>) -> NonNull<T> {
        // SAFETY: forwarded to the pointed-to function under the same contract.
        unsafe { (*self)(src) }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn box_release_frees_box_allocations() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Probe;
        impl Drop for Probe {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::Relaxed);
            }
        }

        let ptr = NonNull::from(Box::leak(Box::new(Probe)));
        unsafe { BoxRelease.release(ptr) };
        assert_eq!(DROPS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn clone_duplicate_yields_independent_instance() {
        let src = NonNull::from(Box::leak(Box::new(41i32)));
        let dup = unsafe { CloneDuplicate.duplicate(src) };

        assert_ne!(src, dup);
        assert_eq!(unsafe { *dup.as_ref() }, 41);

        unsafe {
            BoxRelease.release(src);
            BoxRelease.release(dup);
        }
    }

    #[test]
    fn fn_pointer_strategies_forward() {
        unsafe fn release_box(ptr: NonNull<i32>) {
            unsafe { BoxRelease.release(ptr) };
        }
        unsafe fn duplicate_box(src: NonNull<i32>) -> NonNull<i32> {
            unsafe { CloneDuplicate.duplicate(src) }
        }

        let mut release: ReleaseFn<i32> = release_box;
        let duplicate: DuplicateFn<i32> = duplicate_box;

        let src = NonNull::from(Box::leak(Box::new(3i32)));
        let dup = unsafe { duplicate.duplicate(src) };
        assert_eq!(unsafe { *dup.as_ref() }, 3);

        unsafe {
            release.release(src);
            release.release(dup);
        }
    }
}
