//! Purpose: Define the measurement value capability shared by every entity type.
//! Exports: `Numeric`.
//! Role: Lets one generic model serve integer and floating-point plates.
//! Invariants: `Display` output parses back through `FromStr` to an equal value.
//! Invariants: serde encoding stays a plain JSON number for every implementor.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;

pub trait Numeric:
    Copy
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + FromStr
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Short type name used in parse diagnostics.
    const NAME: &'static str;

    fn parse_value(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

macro_rules! impl_numeric {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Numeric for $ty {
                const NAME: &'static str = stringify!($ty);
            }
        )*
    };
}

impl_numeric!(i32, i64, f32, f64);
