//! The unrecoverable channel.
//!
//! Validation errors are values. A broken ledger invariant (an output that
//! validation said was new turning out to be live, a checksum that no
//! longer matches what was just computed) means the code is wrong, and
//! carrying on would persist a corrupt ledger. Those go here: logged at
//! `error`, then a panic. Release builds set `panic = "abort"`.

use std::fmt::Display;

use tracing::error;

#[cold]
#[track_caller]
pub(crate) fn violated(what: impl Display) -> ! {
    error!(invariant = %what, "ledger invariant violated, aborting");
    panic!("ledger invariant violated: {what}");
}
