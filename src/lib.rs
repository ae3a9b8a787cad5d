//! Quickbridge: a native-interface bridge onto a JavaScript object model
//!
//! Quickbridge exposes the surface native add-ons program against (handle
//! scopes, value creation and coercion, properties, wrapped native data,
//! callables, exceptions, symbols, strings and promises) over an in-process
//! engine heap. Native code never holds engine data directly: every value it
//! sees is a scope-owned [`Value`] handle resolved through an [`Env`].
//!
//! # Quick Start
//!
//! ```no_run
//! use quickbridge::{Env, Result};
//!
//! fn main() -> Result<()> {
//!     let mut env = Env::new();
//!     let add = env.create_function(Some("add"), |env, info| {
//!         let a = env.as_double(info.arg(0))?;
//!         let b = env.as_double(info.arg(1))?;
//!         Ok(env.double(a + b))
//!     });
//!     let undefined = env.undefined();
//!     let (two, three) = (env.int32(2), env.int32(3));
//!     let sum = env.call(add, undefined, &[two, three])?;
//!     println!("2 + 3 = {}", env.as_double(sum)?);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! | Category | Modules |
//! |----------|---------|
//! | **Values** | [`runtime`], [`scope`], [`coerce`], [`codec`] |
//! | **Objects** | [`object`], [`wrap`], [`reference`], [`gc`] |
//! | **Calls** | [`callable`], [`exception`], [`promise`] |
//! | **Ambient** | [`config`], [`error`](Error) |
// Clippy configuration for the bridge.
//
// - type_complexity: callback and finalizer signatures are spelled out in full
// - new_without_default: queue types are only built by Env
#![allow(clippy::type_complexity)]
#![allow(clippy::new_without_default)]

pub mod callable;
pub mod codec;
pub mod coerce;
pub mod config;
pub mod exception;
pub mod gc;
pub mod object;
pub mod prelude;
pub mod promise;
pub mod reference;
pub mod runtime;
pub mod scope;
pub mod wrap;

mod error;

pub use callable::{CallableKind, CallbackInfo, ScriptFnKind};
pub use codec::StringCopy;
pub use config::{BridgeConfig, Capabilities, ThisCoercion};
pub use error::{messages, Error, ErrorKind, ExpectedType, Result};
pub use gc::GcStats;
pub use object::{KeyCollectionMode, KeyConversion, KeyFilter, OwnPropertyDescriptor, PropertyDescriptor, PropertyName};
pub use promise::{Deferred, PromiseStatus};
pub use reference::Reference;
pub use runtime::{Env, PropertyAttributes, ValueType, API_VERSION};
pub use scope::{EscapableHandleScope, HandleScope, Value};
pub use wrap::{finalizer, Finalizer, NativeData, TypeTag};

/// Quickbridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
