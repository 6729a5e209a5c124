use alloc::boxed::Box;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop};
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

use crate::error::IntoInnerError;
use crate::impl_ptr::{ImplPtr, empty_pointee};
use crate::strategy::{BoxRelease, Duplicate, Release};

// -----------------------------------------------------------------------------
// UniqueImplPtr

/// The exclusive ownership wrapper: a hidden implementation instance that
/// must never be duplicated.
///
/// The copy-disabled counterpart of [`ImplPtr`]: it carries only a release
/// strategy and intentionally has **no `Clone` impl**, so duplicating the
/// owned instance is rejected at compile time. Ownership still transfers by
/// move, [`take`](Self::take) and [`swap`](Self::swap).
///
/// Comparison, ordering and hashing use the owned address and are only
/// defined between wrappers of the same configuration.
///
/// # Examples
///
/// ```
/// use pimpl::UniqueImplPtr;
///
/// struct Session {
///     id: u32,
/// }
///
/// let mut e1 = UniqueImplPtr::new(Session { id: 3 });
/// let e2 = e1.take();
///
/// assert!(e1.is_empty());
/// assert_eq!(e2.id, 3);
/// ```
///
/// Duplication is rejected at compile time:
///
/// ```compile_fail
/// use pimpl::UniqueImplPtr;
///
/// let e1 = UniqueImplPtr::new(3u32);
/// let e2: UniqueImplPtr<u32> = e1.clone(); // no `Clone` impl
/// ```
pub struct UniqueImplPtr<T, D = BoxRelease>
where
    D: Release<T>,
{
    ptr: Option<NonNull<T>>,
    release: D,
    _marker: PhantomData<T>,
}

// SAFETY: same reasoning as `ImplPtr`, minus the duplication strategy.
unsafe impl<T: Send, D: Release<T> + Send> Send for UniqueImplPtr<T, D> {}

// SAFETY: `&UniqueImplPtr` hands out only `&T` and `&D`.
unsafe impl<T: Sync, D: Release<T> + Sync> Sync for UniqueImplPtr<T, D> {}

impl<T, D: Release<T>> Drop for UniqueImplPtr<T, D> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: the Owning state guarantees `ptr` is the exclusively
            // owned instance matching this release strategy.
            unsafe { self.release.release(ptr) };
        }
    }
}

impl<T, D: Release<T>> UniqueImplPtr<T, D> {
    /// Creates an empty wrapper owning nothing.
    #[inline]
    pub fn empty() -> Self
    where
        D: Default,
    {
        Self {
            ptr: None,
            release: D::default(),
            _marker: PhantomData,
        }
    }

    /// Takes ownership of a raw instance together with its release
    /// strategy. A null `ptr` produces an empty wrapper.
    ///
    /// # Safety
    /// A non-null `ptr` must point to a live instance the caller owns, and
    /// `release` must be able to free that allocation.
    #[inline]
    pub unsafe fn from_raw_parts<D2>(ptr: *mut T, release: D2) -> Self
    where
        D2: Into<D>,
    {
        Self {
            ptr: NonNull::new(ptr),
            release: release.into(),
            _marker: PhantomData,
        }
    }

    /// Transfers the owned instance out, leaving `self` empty.
    ///
    /// The release strategy is cloned into the returned wrapper; nothing
    /// is released during the transfer.
    #[inline]
    pub fn take(&mut self) -> Self
    where
        D: Clone,
    {
        Self {
            ptr: self.ptr.take(),
            release: self.release.clone(),
            _marker: PhantomData,
        }
    }

    /// Exchanges the complete state of two wrappers.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Relinquishes ownership of the instance, leaving the wrapper empty.
    ///
    /// The caller becomes responsible for releasing the returned pointer
    /// with a strategy compatible with this wrapper's.
    #[inline]
    pub fn release(&mut self) -> Option<NonNull<T>> {
        self.ptr.take()
    }

    /// Decomposes the wrapper into its raw instance pointer and release
    /// strategy. The pointer is null if the wrapper was empty.
    #[inline]
    pub fn into_raw_parts(self) -> (*mut T, D) {
        let (ptr, release) = self.into_parts();
        (ptr.map_or(ptr::null_mut(), NonNull::as_ptr), release)
    }

    /// Upgrades into the duplicable form by supplying the missing
    /// duplication strategy. The owned instance transfers without copying.
    ///
    /// # Examples
    ///
    /// ```
    /// use pimpl::{CloneDuplicate, ImplPtr, UniqueImplPtr};
    ///
    /// let unique = UniqueImplPtr::new(2u32);
    /// let dup: ImplPtr<u32> = unique.into_duplicable(CloneDuplicate);
    ///
    /// assert_eq!(*dup.clone(), 2);
    /// ```
    #[inline]
    pub fn into_duplicable<C>(self, duplicate: C) -> ImplPtr<T, D, C>
    where
        C: Duplicate<T>,
    {
        let (ptr, release) = self.into_parts();
        ImplPtr::from_parts(ptr, release, duplicate)
    }

    /// Whether the wrapper currently owns no instance.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// The address of the owned instance, without transferring ownership.
    /// Null when the wrapper is empty.
    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Borrows the owned instance, or `None` when empty.
    #[inline]
    pub fn as_ref(&self) -> Option<&T> {
        // SAFETY: the Owning state guarantees a live, exclusively owned
        // instance for as long as `self` is borrowed.
        self.ptr.map(|ptr| unsafe { ptr.as_ref() })
    }

    /// Mutably borrows the owned instance, or `None` when empty.
    #[inline]
    pub fn as_mut(&mut self) -> Option<&mut T> {
        // SAFETY: same as `as_ref`, and `&mut self` makes the borrow unique.
        self.ptr.map(|mut ptr| unsafe { ptr.as_mut() })
    }

    /// Borrows the owned instance without checking for the empty state.
    ///
    /// # Safety
    /// The wrapper must be non-empty.
    #[cfg_attr(debug_assertions, track_caller)]
    #[cfg_attr(not(debug_assertions), inline(always))]
    pub unsafe fn get_unchecked(&self) -> &T {
        debug_assert!(!self.is_empty(), "called `get_unchecked` on an empty pointer");
        // SAFETY: the caller guarantees the Owning state.
        unsafe { self.ptr.unwrap_unchecked().as_ref() }
    }

    /// Mutably borrows the owned instance without checking for the empty
    /// state.
    ///
    /// # Safety
    /// The wrapper must be non-empty.
    #[cfg_attr(debug_assertions, track_caller)]
    #[cfg_attr(not(debug_assertions), inline(always))]
    pub unsafe fn get_unchecked_mut(&mut self) -> &mut T {
        debug_assert!(!self.is_empty(), "called `get_unchecked_mut` on an empty pointer");
        // SAFETY: the caller guarantees the Owning state.
        unsafe { self.ptr.unwrap_unchecked().as_mut() }
    }

    /// Borrows the release strategy.
    #[inline]
    pub fn release_strategy(&self) -> &D {
        &self.release
    }

    /// Mutably borrows the release strategy.
    #[inline]
    pub fn release_strategy_mut(&mut self) -> &mut D {
        &mut self.release
    }

    /// Reassembles a wrapper from previously extracted parts.
    #[inline]
    pub(crate) fn from_parts(ptr: Option<NonNull<T>>, release: D) -> Self {
        Self {
            ptr,
            release,
            _marker: PhantomData,
        }
    }

    /// Destructures without running `Drop`.
    pub(crate) fn into_parts(self) -> (Option<NonNull<T>>, D) {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped and each field is read exactly once.
        unsafe { (ptr::read(&this.ptr), ptr::read(&this.release)) }
    }

    #[inline]
    fn addr(&self) -> usize {
        self.ptr.map_or(0, |ptr| ptr.as_ptr() as usize)
    }
}

// -----------------------------------------------------------------------------
// Default-manageable operations

impl<T> UniqueImplPtr<T> {
    /// Constructs a new instance on the heap and wraps it with the default
    /// release strategy.
    ///
    /// # Examples
    ///
    /// ```
    /// use pimpl::UniqueImplPtr;
    ///
    /// let ptr = UniqueImplPtr::new(3u32);
    /// assert_eq!(*ptr, 3);
    /// ```
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            ptr: Some(NonNull::from(Box::leak(Box::new(value)))),
            release: BoxRelease,
            _marker: PhantomData,
        }
    }

    /// Takes ownership of a raw instance, managing it with the default
    /// release strategy. A null `ptr` produces an empty wrapper.
    ///
    /// # Safety
    /// A non-null `ptr` must come from a `Box<T>` allocation the caller
    /// owns; ownership transfers to the wrapper.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        // SAFETY: a Box allocation is exactly what `BoxRelease` manages.
        unsafe { Self::from_raw_parts(ptr, BoxRelease) }
    }

    /// Converts back into the underlying `Box`.
    ///
    /// Fails with [`IntoInnerError::Empty`] on an empty wrapper.
    #[inline]
    pub fn try_into_box(self) -> Result<Box<T>, IntoInnerError> {
        let (ptr, _release) = self.into_parts();
        match ptr {
            // SAFETY: default-manageable instances are Box allocations and
            // `into_parts` transferred ownership to us.
            Some(ptr) => Ok(unsafe { Box::from_raw(ptr.as_ptr()) }),
            None => Err(IntoInnerError::Empty),
        }
    }

    /// Takes the owned value back out of the wrapper.
    ///
    /// Fails with [`IntoInnerError::Empty`] on an empty wrapper.
    #[inline]
    pub fn try_into_inner(self) -> Result<T, IntoInnerError> {
        self.try_into_box().map(|boxed| *boxed)
    }
}

impl<T> From<Box<T>> for UniqueImplPtr<T> {
    /// Transfers ownership out of a `Box`, adopting the default release
    /// strategy.
    #[inline]
    fn from(boxed: Box<T>) -> Self {
        Self {
            ptr: Some(NonNull::from(Box::leak(boxed))),
            release: BoxRelease,
            _marker: PhantomData,
        }
    }
}

// -----------------------------------------------------------------------------
// Value-semantics impls

impl<T, D: Release<T> + Default> Default for UniqueImplPtr<T, D> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<T, D: Release<T>> Deref for UniqueImplPtr<T, D> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        match self.ptr {
            // SAFETY: the Owning state guarantees a live instance.
            Some(ptr) => unsafe { ptr.as_ref() },
            None => empty_pointee(),
        }
    }
}

impl<T, D: Release<T>> DerefMut for UniqueImplPtr<T, D> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        match self.ptr {
            // SAFETY: the Owning state guarantees a live instance, and
            // `&mut self` makes the borrow unique.
            Some(mut ptr) => unsafe { ptr.as_mut() },
            None => empty_pointee(),
        }
    }
}

// -----------------------------------------------------------------------------
// Identity comparison

impl<T, D: Release<T>> PartialEq for UniqueImplPtr<T, D> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl<T, D: Release<T>> Eq for UniqueImplPtr<T, D> {}

impl<T, D: Release<T>> PartialOrd for UniqueImplPtr<T, D> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, D: Release<T>> Ord for UniqueImplPtr<T, D> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.addr().cmp(&other.addr())
    }
}

impl<T, D: Release<T>> Hash for UniqueImplPtr<T, D> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

// -----------------------------------------------------------------------------
// Formatting

impl<T, D: Release<T>> fmt::Pointer for UniqueImplPtr<T, D> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}

impl<T, D: Release<T>> fmt::Debug for UniqueImplPtr<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniqueImplPtr({:?})", self.as_ptr())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use core::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    // `UniqueImplPtr` has no `Clone` impl, so `e1.clone()` fails to
    // compile; duplication can only be regained explicitly through
    // `into_duplicable`.

    #[test]
    fn move_transfers_ownership() {
        let mut e1 = UniqueImplPtr::new(3u32);
        let addr = e1.as_ptr();

        let e2 = e1.take();

        assert!(e1.is_empty());
        assert_eq!(e2.as_ptr(), addr);
        assert_eq!(*e2, 3);
    }

    #[test]
    fn swap_exchanges_addresses() {
        let mut a = UniqueImplPtr::new(1u32);
        let mut b = UniqueImplPtr::new(2u32);
        let pa = a.as_ptr();
        let pb = b.as_ptr();

        a.swap(&mut b);

        assert_eq!(a.as_ptr(), pb);
        assert_eq!(b.as_ptr(), pa);
    }

    #[test]
    fn custom_release_runs_once_on_drop() {
        static RELEASES: AtomicUsize = AtomicUsize::new(0);

        struct CountingRelease;
        impl<T> Release<T> for CountingRelease {
            unsafe fn release(&mut self, ptr: NonNull<T>) {
                RELEASES.fetch_add(1, AtomicOrdering::Relaxed);
                // SAFETY: forwarded under the caller's contract.
                unsafe { BoxRelease.release(ptr) };
            }
        }

        let ptr = unsafe {
            UniqueImplPtr::<u32, CountingRelease>::from_raw_parts(
                Box::into_raw(Box::new(8u32)),
                CountingRelease,
            )
        };
        assert_eq!(RELEASES.load(AtomicOrdering::Relaxed), 0);

        drop(ptr);
        assert_eq!(RELEASES.load(AtomicOrdering::Relaxed), 1);
    }

    #[test]
    fn into_duplicable_enables_cloning() {
        use crate::strategy::CloneDuplicate;

        let unique = UniqueImplPtr::new(5u32);
        let addr = unique.as_ptr();

        let dup = unique.into_duplicable(CloneDuplicate);
        assert_eq!(dup.as_ptr(), addr);

        let copy = dup.clone();
        assert_ne!(copy.as_ptr(), addr);
        assert_eq!(*copy, 5);
    }

    #[test]
    fn box_round_trip() {
        let ptr = UniqueImplPtr::from(Box::new(10u32));
        let addr = ptr.as_ptr();

        let boxed = ptr.try_into_box().expect("wrapper owned an instance");
        assert_eq!(&raw const *boxed, addr.cast_const());

        let empty = UniqueImplPtr::<u32>::empty();
        assert_eq!(empty.try_into_inner(), Err(IntoInnerError::Empty));
    }

    #[test]
    fn empties_compare_equal() {
        let a = UniqueImplPtr::<u32>::empty();
        let b = UniqueImplPtr::<u32>::default();

        assert_eq!(a, b);
        assert!(a.as_ptr().is_null());
    }

    #[test]
    #[should_panic(expected = "dereferenced an empty pointer")]
    fn deref_of_empty_panics() {
        let empty = UniqueImplPtr::<u32>::empty();
        let _ = *empty;
    }
}
