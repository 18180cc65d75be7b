//! Control core: transfer function, cancellation, flash sequence, the
//! sense → decide → act loop and its lifecycle.

pub mod cancel;
pub mod control_loop;
pub mod flash;
pub mod lifecycle;
pub mod transfer;
