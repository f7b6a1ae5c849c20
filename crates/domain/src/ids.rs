//! Tagged integer newtypes.
//!
//! `uid`, `pid`, `gid` and `feature` are all plain integers at the OS
//! boundary, but mixing them up is a real bug class (passing a `pid`
//! where a `uid` is expected compiles fine if both are `u32`). Each gets
//! its own zero-cost wrapper so the compiler catches the mistake.

use std::fmt;

macro_rules! tagged_integer {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub $inner);

        impl $name {
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

tagged_integer!(Uid, u32);
tagged_integer!(Pid, i32);
tagged_integer!(Gid, u32);
tagged_integer!(Feature, u64);
