//! Prelude module for convenient imports
//!
//! The types a native add-on touches on almost every call. Import everything
//! from this module for quick access:
//!
//! ```no_run
//! use quickbridge::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut env = Env::new();
//!     let greeting = env.string_utf8("hello")?;
//!     let exports = env.object();
//!     env.set_named_property(exports, "greeting", greeting)?;
//!     Ok(())
//! }
//! ```

// Environment and handles
pub use crate::runtime::{Env, ValueType};
pub use crate::scope::{EscapableHandleScope, HandleScope, Value};

// Error handling
pub use crate::error::{Error, ErrorKind, ExpectedType, Result};

// Configuration
pub use crate::config::{BridgeConfig, ThisCoercion};

// Properties
pub use crate::object::{KeyCollectionMode, KeyConversion, KeyFilter, PropertyDescriptor};
pub use crate::runtime::PropertyAttributes;

// Callables
pub use crate::callable::{CallbackInfo, ScriptFnKind};

// Native data
pub use crate::wrap::{finalizer, Finalizer, NativeData, TypeTag};
pub use crate::reference::Reference;

// Promises
pub use crate::promise::{Deferred, PromiseStatus};

// Version constant
pub use crate::VERSION;
