//! Utility
//!
//! **This module is exempt from the API stability guarantee.** It's exposed
//! only so that ports can reuse the priority bitmap.
mod prio_bitmap;
pub use self::prio_bitmap::*;

/// Trait for types having a constant default value. This is essentially a
/// constant version of `Default`.
pub trait Init {
    /// The default value.
    const INIT: Self;
}

impl<T> Init for Option<T> {
    const INIT: Self = None;
}

impl Init for bool {
    const INIT: Self = false;
}
