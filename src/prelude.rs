//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use async_snmp_manager::prelude::*;
//! ```
//!
//! This imports:
//! - Manager side: [`Manager`], [`ManagerConfig`], [`ManagerContext`]
//! - Listener side: [`Trapd`], [`Trap`], [`HandlerResult`]
//! - Core types: [`Oid`], [`Value`], [`VarBind`], [`Version`]
//! - Error handling: [`Error`], [`Result`]
//! - The [`oid!`] macro for compile-time OID construction

pub use crate::error::{Error, Result};
pub use crate::manager::{Manager, ManagerConfig, ManagerContext};
pub use crate::oid::Oid;
pub use crate::trapd::{HandlerResult, Trap, Trapd};
pub use crate::value::Value;
pub use crate::varbind::VarBind;
pub use crate::version::Version;

#[doc(no_inline)]
pub use crate::oid;
