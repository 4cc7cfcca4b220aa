//! Typed bitfield shadows over the BP, CP and XF GPU register files.
//!
//! Every register here matches its hardware bit layout exactly; none of them
//! know how to derive higher-level material state (that is `gx-codec`'s job).
//! The one invariant this layer owns is the BP masked-write rule (see
//! [`bp::Bp::write_masked`]).

pub mod bp;
pub mod cp;
pub mod xf;

pub use bp::Bp;
pub use cp::Cp;
pub use xf::Xf;
