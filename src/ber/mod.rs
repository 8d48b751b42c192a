//! BER (Basic Encoding Rules) primitives for SNMP community messages.
//!
//! Encoding writes into a reverse buffer; decoding slices a shared `Bytes`
//! without copying. Parsing is permissive in the places net-snmp is
//! permissive (non-minimal integers and lengths) and strict elsewhere.

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::*;
pub use encode::*;
pub use length::*;
