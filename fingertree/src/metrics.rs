//! This module only contains macros wrapping those of the `metrics` crate, if
//! the `metrics` feature is enabled.
//!
//! Rebalancing paths bump a counter each time they fire, which makes it easy
//! to see how often a workload splits, merges or underflows leaves.

#[cfg(feature = "metrics")]
#[macro_export]
macro_rules! increment {
    ( $counter:expr ) => {
        $crate::metrics::increment!($counter, 1)
    };
    ( $counter:expr, $count:expr ) => {
        ::metrics::counter!($counter).increment($count)
    };
}

#[cfg(not(feature = "metrics"))]
#[macro_export]
macro_rules! increment {
    ( $( $args:expr ),+ ) => {};
}

pub use increment;
