use alloc::boxed::Box;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop};
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

use crate::error::IntoInnerError;
use crate::strategy::{BoxRelease, CloneDuplicate, Duplicate, Release};
use crate::unique::UniqueImplPtr;

// -----------------------------------------------------------------------------
// ImplPtr

/// An ownership wrapper for a hidden implementation instance.
///
/// Owns at most one heap instance of `T` together with two strategy values:
/// `D` destroys the instance ([`Release`]), `C` produces an independent copy
/// of it when the wrapper is cloned ([`Duplicate`]). With the default
/// strategies the wrapper manages ordinary `Box` allocations of a `Clone`
/// type.
///
/// # Ownership
///
/// A non-empty wrapper always owns its instance exclusively: the instance
/// was either constructed for this wrapper or produced by a duplication
/// strategy from another wrapper's instance. Two wrappers never share one
/// instance. Dropping a non-empty wrapper invokes the release strategy
/// exactly once.
///
/// # Empty state
///
/// A wrapper can be empty ([`empty`](Self::empty), after
/// [`release`](Self::release) or [`take`](Self::take)). [`Deref`] on an
/// empty wrapper panics; check with [`is_empty`](Self::is_empty) or use
/// [`as_ref`](Self::as_ref) first. Empty wrappers compare equal to each
/// other and order before every non-empty wrapper.
///
/// # Comparison
///
/// Equality, ordering and hashing use the owned **address**, never the
/// pointee value. Cloned wrappers therefore compare unequal even though
/// their instances hold equal values.
///
/// # Examples
///
/// ```
/// use pimpl::ImplPtr;
///
/// #[derive(Clone)]
/// struct State {
///     counter: u32,
/// }
///
/// let mut a = ImplPtr::new(State { counter: 7 });
/// let b = a.clone();
///
/// a.counter = 8;
/// assert_eq!(b.counter, 7);
/// assert_ne!(a, b);
/// ```
pub struct ImplPtr<T, D = BoxRelease, C = CloneDuplicate>
where
    D: Release<T>,
{
    ptr: Option<NonNull<T>>,
    release: D,
    duplicate: C,
    _marker: PhantomData<T>,
}

// SAFETY: the wrapper owns its instance exclusively and adds no shared
// state of its own, so it is as thread-transferable as its instance and
// strategy values are.
unsafe impl<T: Send, D: Release<T> + Send, C: Send> Send for ImplPtr<T, D, C> {}

// SAFETY: `&ImplPtr` hands out only `&T` and shared strategy references.
unsafe impl<T: Sync, D: Release<T> + Sync, C: Sync> Sync for ImplPtr<T, D, C> {}

impl<T, D: Release<T>, C> Drop for ImplPtr<T, D, C> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: the Owning state guarantees `ptr` is the exclusively
            // owned instance matching this release strategy.
            unsafe { self.release.release(ptr) };
        }
    }
}

impl<T, D: Release<T>, C> ImplPtr<T, D, C> {
    /// Creates an empty wrapper owning nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use pimpl::ImplPtr;
    ///
    /// let ptr = ImplPtr::<u32>::empty();
    /// assert!(ptr.is_empty());
    /// ```
    #[inline]
    pub fn empty() -> Self
    where
        D: Default,
        C: Default,
    {
        Self {
            ptr: None,
            release: D::default(),
            duplicate: C::default(),
            _marker: PhantomData,
        }
    }

    /// Takes ownership of a raw instance together with its strategies.
    ///
    /// The strategy arguments may be any types convertible into the
    /// wrapper's configured strategy types. A null `ptr` produces an empty
    /// wrapper.
    ///
    /// # Safety
    /// - A non-null `ptr` must point to a live instance the caller owns,
    ///   and ownership transfers to the wrapper.
    /// - `release` must be able to free that allocation, and `duplicate`
    ///   must produce copies releasable by `release`.
    #[inline]
    pub unsafe fn from_raw_parts<D2, C2>(ptr: *mut T, release: D2, duplicate: C2) -> Self
    where
        D2: Into<D>,
        C2: Into<C>,
    {
        Self {
            ptr: NonNull::new(ptr),
            release: release.into(),
            duplicate: duplicate.into(),
            _marker: PhantomData,
        }
    }

    /// Transfers the owned instance out, leaving `self` empty.
    ///
    /// The strategies are cloned into the returned wrapper; no release
    /// strategy runs during the transfer.
    ///
    /// # Examples
    ///
    /// ```
    /// use pimpl::ImplPtr;
    ///
    /// let mut a = ImplPtr::new(3u32);
    /// let b = a.take();
    ///
    /// assert!(a.is_empty());
    /// assert_eq!(*b, 3);
    /// ```
    #[inline]
    pub fn take(&mut self) -> Self
    where
        D: Clone,
        C: Clone,
    {
        Self {
            ptr: self.ptr.take(),
            release: self.release.clone(),
            duplicate: self.duplicate.clone(),
            _marker: PhantomData,
        }
    }

    /// Exchanges the complete state of two wrappers.
    ///
    /// Addresses and both strategy values swap; no instance is released or
    /// duplicated.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Relinquishes ownership of the instance, leaving the wrapper empty.
    ///
    /// The caller becomes responsible for releasing the returned pointer
    /// with a strategy compatible with this wrapper's. The strategy values
    /// stay in place for later reuse.
    #[inline]
    pub fn release(&mut self) -> Option<NonNull<T>> {
        self.ptr.take()
    }

    /// Decomposes the wrapper into its raw instance pointer and strategy
    /// values.
    ///
    /// The pointer is null if the wrapper was empty. Round-trips with
    /// [`from_raw_parts`](Self::from_raw_parts).
    #[inline]
    pub fn into_raw_parts(self) -> (*mut T, D, C) {
        let (ptr, release, duplicate) = self.into_parts();
        (ptr.map_or(ptr::null_mut(), NonNull::as_ptr), release, duplicate)
    }

    /// Relinquishes ownership into the exclusive form, keeping the release
    /// strategy and discarding the duplication strategy.
    #[inline]
    pub fn into_unique(self) -> UniqueImplPtr<T, D> {
        let (ptr, release, _duplicate) = self.into_parts();
        UniqueImplPtr::from_parts(ptr, release)
    }

    /// Moves the wrapper into a different strategy configuration.
    ///
    /// Available only when both strategies convert into the target types;
    /// otherwise the call is rejected at compile time. The owned instance
    /// transfers without duplication.
    #[inline]
    pub fn convert<D2, C2>(self) -> ImplPtr<T, D2, C2>
    where
        D2: Release<T>,
        D: Into<D2>,
        C: Into<C2>,
    {
        let (ptr, release, duplicate) = self.into_parts();
        ImplPtr {
            ptr,
            release: release.into(),
            duplicate: duplicate.into(),
            _marker: PhantomData,
        }
    }

    /// Takes ownership of an exclusive handle, supplying the duplication
    /// strategy the handle lacks.
    ///
    /// The handle's release strategy converts into this wrapper's release
    /// type.
    #[inline]
    pub fn from_unique_with<D2, C2>(handle: UniqueImplPtr<T, D2>, duplicate: C2) -> Self
    where
        D2: Release<T> + Into<D>,
        C2: Into<C>,
    {
        let (ptr, release) = handle.into_parts();
        Self {
            ptr,
            release: release.into(),
            duplicate: duplicate.into(),
            _marker: PhantomData,
        }
    }

    /// Whether the wrapper currently owns no instance.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// The address of the owned instance, without transferring ownership.
    ///
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

    /// Borrows the duplication strategy.
    #[inline]
    pub fn duplicate_strategy(&self) -> &C {
        &self.duplicate
    }

    /// Mutably borrows the duplication strategy.
    #[inline]
    pub fn duplicate_strategy_mut(&mut self) -> &mut C {
        &mut self.duplicate
    }

    /// Reassembles a wrapper from previously extracted parts.
    #[inline]
    pub(crate) fn from_parts(ptr: Option<NonNull<T>>, release: D, duplicate: C) -> Self {
        Self {
            ptr,
            release,
            duplicate,
            _marker: PhantomData,
        }
    }

    /// Destructures without running `Drop`.
    fn into_parts(self) -> (Option<NonNull<T>>, D, C) {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped and each field is read exactly once.
        unsafe {
            (
                ptr::read(&this.ptr),
                ptr::read(&this.release),
                ptr::read(&this.duplicate),
            )
        }
    }

    /// The numeric address compared and hashed by the identity impls.
    /// Empty wrappers use 0, the null sentinel.
    #[inline]
    fn addr(&self) -> usize {
        self.ptr.map_or(0, |ptr| ptr.as_ptr() as usize)
    }
}

// -----------------------------------------------------------------------------
// Default-manageable operations

impl<T> ImplPtr<T> {
    /// Constructs a new instance on the heap and wraps it with the default
    /// strategies.
    ///
    /// # Examples
    ///
    /// ```
    /// use pimpl::ImplPtr;
    ///
    /// let ptr = ImplPtr::new(7u32);
    /// assert_eq!(*ptr, 7);
    /// ```
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            ptr: Some(NonNull::from(Box::leak(Box::new(value)))),
            release: BoxRelease,
            duplicate: CloneDuplicate,
            _marker: PhantomData,
        }
    }

    /// Takes ownership of a raw instance, managing it with the default
    /// strategies.
    ///
    /// Only available on the default-manageable configuration; wrappers
    /// with custom strategy types must use
    /// [`from_raw_parts`](Self::from_raw_parts). A null `ptr` produces an
    /// empty wrapper.
    ///
    /// # Safety
    /// A non-null `ptr` must come from a `Box<T>` allocation the caller
    /// owns; ownership transfers to the wrapper.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        // SAFETY: a Box allocation is exactly what the default strategies manage.
        unsafe { Self::from_raw_parts(ptr, BoxRelease, CloneDuplicate) }
    }

    /// Converts back into the underlying `Box`.
    ///
    /// Fails with [`IntoInnerError::Empty`] on an empty wrapper.
    #[inline]
    pub fn try_into_box(self) -> Result<Box<T>, IntoInnerError> {
        let (ptr, _release, _duplicate) = self.into_parts();
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
    ///
    /// # Examples
    ///
    /// ```
    /// use pimpl::ImplPtr;
    ///
    /// let ptr = ImplPtr::new(5u32);
    /// assert_eq!(ptr.try_into_inner(), Ok(5));
    /// ```
    #[inline]
    pub fn try_into_inner(self) -> Result<T, IntoInnerError> {
        self.try_into_box().map(|boxed| *boxed)
    }
}

impl<T> From<Box<T>> for ImplPtr<T> {
    /// Transfers ownership out of a `Box`, adopting the default strategies.
    #[inline]
    fn from(boxed: Box<T>) -> Self {
        Self {
            ptr: Some(NonNull::from(Box::leak(boxed))),
            release: BoxRelease,
            duplicate: CloneDuplicate,
            _marker: PhantomData,
        }
    }
}

impl<T> From<UniqueImplPtr<T>> for ImplPtr<T> {
    /// Transfers ownership out of a default-manageable exclusive handle.
    #[inline]
    fn from(handle: UniqueImplPtr<T>) -> Self {
        Self::from_unique_with(handle, CloneDuplicate)
    }
}

// -----------------------------------------------------------------------------
// Value-semantics impls

impl<T, D, C> Clone for ImplPtr<T, D, C>
where
    D: Release<T> + Clone,
    C: Duplicate<T> + Clone,
{
    /// Duplicates the owned instance through the duplication strategy and
    /// wraps the copy with clones of both strategies.
    ///
    /// Cloning an empty wrapper yields an empty wrapper. The clone never
    /// shares its instance with `self`.
    fn clone(&self) -> Self {
        let ptr = self.ptr.map(|src| {
            // SAFETY: `src` is the live, exclusively owned instance.
            let dup = unsafe { self.duplicate.duplicate(src) };
            if dup == src {
                log::warn!(
                    "duplication strategy returned the source address {:p}, wrappers now alias one instance",
                    src
                );
            }
            dup
        });
        Self {
            ptr,
            release: self.release.clone(),
            duplicate: self.duplicate.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, D: Release<T> + Default, C: Default> Default for ImplPtr<T, D, C> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<T, D: Release<T>, C> Deref for ImplPtr<T, D, C> {
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

impl<T, D: Release<T>, C> DerefMut for ImplPtr<T, D, C> {
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

/// Dereferencing an empty wrapper is a programmer error, reported by panic.
#[cold]
#[inline(never)]
pub(crate) fn empty_pointee() -> ! {
    panic!("dereferenced an empty pointer, no implementation instance is owned");
}

// -----------------------------------------------------------------------------
// Identity comparison

impl<T, U, D1, C1, D2, C2> PartialEq<ImplPtr<U, D2, C2>> for ImplPtr<T, D1, C1>
where
    D1: Release<T>,
    D2: Release<U>,
{
    #[inline]
    fn eq(&self, other: &ImplPtr<U, D2, C2>) -> bool {
        self.addr() == other.addr()
    }
}

impl<T, D: Release<T>, C> Eq for ImplPtr<T, D, C> {}

impl<T, U, D1, C1, D2, C2> PartialOrd<ImplPtr<U, D2, C2>> for ImplPtr<T, D1, C1>
where
    D1: Release<T>,
    D2: Release<U>,
{
    #[inline]
    fn partial_cmp(&self, other: &ImplPtr<U, D2, C2>) -> Option<Ordering> {
        Some(self.addr().cmp(&other.addr()))
    }
}

impl<T, D: Release<T>, C> Ord for ImplPtr<T, D, C> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.addr().cmp(&other.addr())
    }
}

impl<T, D: Release<T>, C> Hash for ImplPtr<T, D, C> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

// -----------------------------------------------------------------------------
// Formatting

impl<T, D: Release<T>, C> fmt::Pointer for ImplPtr<T, D, C> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}

impl<T, D: Release<T>, C> fmt::Debug for ImplPtr<T, D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImplPtr({:?})", self.as_ptr())
    }
}

// -----------------------------------------------------------------------------
// Tests
