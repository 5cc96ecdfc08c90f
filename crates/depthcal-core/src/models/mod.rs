//! Camera model building blocks.
//!
//! Only the pinhole intrinsics used for back-projection live here; the
//! world → screen path goes through full view/projection matrices instead
//! (see [`crate::projector`]).

mod intrinsics;

pub use intrinsics::*;
