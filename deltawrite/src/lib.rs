//! Per-observer delta update streams.
//!
//! Given an observer's last acknowledged snapshot (possibly none) and the
//! snapshot to send, the writer walks both visible-slot lists with a
//! two-cursor merge and classifies every slot as entering view, leaving
//! view, changed, or preserved. Only the first three emit records; a
//! preserved slot's absence is itself the signal.
//!
//! Stream grammar, bits most-significant first:
//!
//! ```text
//! update   := ( '1' gap:varu32 record )* '0' deletions?
//! record   := '1' destroy:bit                      leave
//!           | '0' '1' class:16 serial:varu32 body  enter
//!           | '0' '0' count:varu32 prop:varu32* payload delta
//! body     := '1' payload                          full create
//!           | '0' count:varu32 prop:varu32* payload  from acked baseline
//! payload  := bitlen:varu32 bit*
//! deletions := ( '1' slot:varu32 )* '0'            delta mode only
//! ```
//!
//! `gap` is the slot-index distance from the previous record; slots are
//! strictly ascending. The deletion pass covers slots destroyed without
//! ever being visible to the observer.

mod classify;
mod decode;
mod error;
mod writer;

pub use classify::UpdateKind;
pub use decode::{read_update_stream, UpdateRecord};
pub use error::{DeltaError, DeltaResult};
pub use writer::{write_delta, write_full, AckedBaselines, DeltaBase, DeltaStats};
