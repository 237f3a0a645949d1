//! Lock-free cells shared between the control plane and the audio path.
//!
//! Each cell sits on its own cache line. Writers publish with `Release`,
//! the audio path reads with `Acquire`.

use atomic_float::{AtomicF32, AtomicF64};
use core::sync::atomic::{AtomicBool, Ordering};

macro_rules! atomic_cell {
    ($(#[$meta:meta])* $name:ident, $atomic:ty, $value:ty, $default:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        #[repr(align(64))]
        pub struct $name($atomic);

        impl $name {
            pub fn new(value: $value) -> Self {
                Self(<$atomic>::new(value))
            }

            #[inline]
            pub fn get(&self) -> $value {
                self.0.load(Ordering::Acquire)
            }

            #[inline]
            pub fn set(&self, value: $value) {
                self.0.store(value, Ordering::Release);
            }
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                Self::new(self.get())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new($default)
            }
        }
    };
}

atomic_cell!(
    /// Channel-strip values: volume, pan, send amounts, effect parameters.
    AtomicFloat, AtomicF32, f32, 0.0
);

atomic_cell!(
    /// Mute, solo and loop switches.
    AtomicFlag, AtomicBool, bool, false
);

atomic_cell!(
    /// Tempo and loop bounds.
    AtomicDouble, AtomicF64, f64, 0.0
);
