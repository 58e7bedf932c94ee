//! Wall-clock access for the control loop.
//!
//! All controller logic takes the current local time as an argument; only the
//! host loop and the logger read it from the global source defined here, which is
//! either the real clock or a simulated one for `--simulate`.

pub mod source;
