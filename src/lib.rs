//! This crate provides the ownership wrappers behind the
//! "pointer to implementation" idiom.
//!
//! A public type keeps its representation in a separately defined, usually
//! private implementation type, and owns exactly one heap instance of it
//! through a wrapper. The wrapper restores the value semantics the public
//! type wants to expose: duplication on clone, ownership transfer on move,
//! comparison and hashing by instance identity.
//!
//! **ImplPtr**
//!
//! [`ImplPtr<T, D, C>`] owns one instance of `T` together with two strategy
//! values: a release strategy `D` (how the instance is destroyed) and a
//! duplication strategy `C` (how an independent copy is produced when the
//! wrapper is cloned). The defaults, [`BoxRelease`] and [`CloneDuplicate`],
//! delegate to `Box` deallocation and to `T::clone`.
//!
//! **UniqueImplPtr**
//!
//! [`UniqueImplPtr<T, D>`] is the exclusive form for implementation types
//! that must never be duplicated. It carries only a release strategy and has
//! no `Clone` impl, so copying it is rejected at compile time.
//!
//! **pimpl!**
//!
//! [`pimpl!`] declares a public type with a hidden implementation field and
//! a `DUPLICABLE` capability constant, in both a duplicable and a `unique`
//! form.
//!
//! Two wrappers never share an owned instance: a clone always goes through
//! the duplication strategy, and moves leave the source empty.
#![expect(unsafe_code, reason = "Owning raw pointers is inherently unsafe.")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod impl_ptr;
mod macros;
mod strategy;
mod unique;

// -----------------------------------------------------------------------------
// Top-level exports

pub use error::IntoInnerError;
pub use impl_ptr::ImplPtr;
pub use strategy::{BoxRelease, CloneDuplicate, Duplicate, DuplicateFn, Release, ReleaseFn};
pub use unique::UniqueImplPtr;
