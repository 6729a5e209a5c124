/// Declares a public type whose representation lives in a hidden
/// implementation type.
///
/// The macro expands to a struct with a single private field owning the
/// implementation instance, plus a `DUPLICABLE` constant reporting whether
/// the type copies its hidden state on clone.
///
/// Two forms exist:
///
/// - the plain form stores an [`ImplPtr`](crate::ImplPtr) and emits a
///   [`Clone`] impl that duplicates the hidden instance (the implementation
///   type must be `Clone`);
/// - the `unique` form stores a [`UniqueImplPtr`](crate::UniqueImplPtr)
///   and emits no [`Clone`] impl, so copying the type is rejected at
///   compile time.
///
/// The declared visibility applies to the type; the field stays private to
/// the declaring module, which is where the type's methods construct and
/// access it.
///
/// # Examples
///
/// ## Duplicable
///
/// ```
/// use pimpl::{ImplPtr, pimpl};
///
/// #[derive(Clone)]
/// struct CounterState {
///     value: u32,
/// }
///
/// pimpl! {
///     /// A counter with a hidden representation.
///     pub struct Counter {
///         state: CounterState,
///     }
/// }
///
/// impl Counter {
///     pub fn new(value: u32) -> Self {
///         Self {
///             state: ImplPtr::new(CounterState { value }),
///         }
///     }
///
///     pub fn value(&self) -> u32 {
///         self.state.value
///     }
///
///     pub fn bump(&mut self) {
///         self.state.value += 1;
///     }
/// }
///
/// let mut a = Counter::new(7);
/// let b = a.clone();
///
/// a.bump();
/// assert_eq!(a.value(), 8);
/// assert_eq!(b.value(), 7);
/// assert!(Counter::DUPLICABLE);
/// ```
///
/// ## Exclusive
///
/// ```
/// use pimpl::{UniqueImplPtr, pimpl};
///
/// struct PortState {
///     fd: i32,
/// }
///
/// pimpl! {
///     /// An exclusive port handle.
///     pub struct Port {
///         unique state: PortState,
///     }
/// }
///
/// impl Port {
///     pub fn open(fd: i32) -> Self {
///         Self {
///             state: UniqueImplPtr::new(PortState { fd }),
///         }
///     }
///
///     pub fn fd(&self) -> i32 {
///         self.state.fd
///     }
/// }
///
/// let p1 = Port::open(3);
/// let p2 = p1; // ownership moves, `Port` has no `Clone`
///
/// assert_eq!(p2.fd(), 3);
/// assert!(!Port::DUPLICABLE);
/// ```
#[macro_export]
macro_rules! pimpl {
    {
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            unique $field:ident: $impl_ty:ty $(,)?
        }
    } => {
        $(#[$meta])*
        $vis struct $name {
            $field: $crate::UniqueImplPtr<$impl_ty>,
        }

        impl $name {
            /// Whether this type duplicates its hidden state on clone.
            pub const DUPLICABLE: bool = false;
        }
    };
    {
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $field:ident: $impl_ty:ty $(,)?
        }
    } => {
        $(#[$meta])*
        $vis struct $name {
            $field: $crate::ImplPtr<$impl_ty>,
        }

        impl $name {
            /// Whether this type duplicates its hidden state on clone.
            pub const DUPLICABLE: bool = true;
        }

        impl ::core::clone::Clone for $name {
            #[inline]
            fn clone(&self) -> Self {
                Self {
                    $field: ::core::clone::Clone::clone(&self.$field),
                }
            }
        }
    };
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::{ImplPtr, UniqueImplPtr};

    #[derive(Clone)]
    struct WidgetState {
        level: u32,
    }

    pimpl! {
        /// A widget with a hidden representation.
        pub struct Widget {
            state: WidgetState,
        }
    }

    impl Widget {
        fn new(level: u32) -> Self {
            Self {
                state: ImplPtr::new(WidgetState { level }),
            }
        }
    }

    struct DeviceState {
        slot: u8,
    }

    pimpl! {
        struct Device {
            unique state: DeviceState,
        }
    }

    impl Device {
        fn claim(slot: u8) -> Self {
            Self {
                state: UniqueImplPtr::new(DeviceState { slot }),
            }
        }
    }

    #[test]
    fn capability_constants() {
        assert!(Widget::DUPLICABLE);
        assert!(!Device::DUPLICABLE);
    }

    #[test]
    fn duplicable_form_clones_independently() {
        let w1 = Widget::new(7);
        let mut w2 = w1.clone();

        w2.state.level = 8;

        assert_eq!(w1.state.level, 7);
        assert_eq!(w2.state.level, 8);
        assert_ne!(w1.state.as_ptr(), w2.state.as_ptr());
    }

    #[test]
    fn exclusive_form_moves() {
        let d1 = Device::claim(3);
        let addr = d1.state.as_ptr();

        // `Device` has no `Clone` impl; ownership can only move.
        let d2 = d1;

        assert_eq!(d2.state.slot, 3);
        assert_eq!(d2.state.as_ptr(), addr);
    }
}
