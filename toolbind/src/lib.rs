//! Expose native functions as schema-described tools for LLM function calling.
//!
//! A [`ToolRegistry`] adapts plain Rust functions into named tools. Each tool
//! publishes a JSON-schema-like description of its parameters and accepts
//! untyped, string-keyed arguments which are coerced into the exact parameter
//! types before the function runs. Leading parameters whose types a [`Scope`]
//! provides are injected instead of being supplied by the caller.
//!
//! ```
//! use serde_json::json;
//! use toolbind::{Scope, ToolArg, ToolRegistry, tool, tool_id};
//!
//! #[derive(Clone, ToolArg)]
//! #[tool_arg(opaque)]
//! struct Caller(String);
//!
//! /// Greets someone
//! /// name: who to greet
//! #[tool]
//! fn greet(caller: Caller, name: String) -> String {
//!     format!("{} greets {name}", caller.0)
//! }
//!
//! let scope = Scope::new().with(Caller("root".into())).unwrap();
//! let mut registry = ToolRegistry::from_inventory(scope);
//! registry.add(tool_id!(greet), greet).unwrap();
//!
//! let args = json!({ "name": "ada" }).as_object().cloned().unwrap();
//! let out = registry.invoke(None, "greet", args).unwrap();
//! assert_eq!(out, Some(json!("root greets ada")));
//! ```

#![warn(missing_docs, clippy::pedantic)]

extern crate self as toolbind;

mod adapter;
mod arg;
mod callable;
mod config;
mod convert;
mod describe;
mod docs;
mod error;
mod registry;
mod scope;

/// Schema model and type descriptors.
pub use toolbind_schema as schema;

pub use toolbind_macros::{ToolArg, tool};

pub use adapter::{Invoker, Tool};
pub use arg::{ToolArg, deserialize_canonical, opaque_canonical};
pub use callable::{
    Callable, FnCallable, IntoCallable, Json, ParamSpec, ResultKind, Return, Signature, ToolOutput,
};
pub use config::{ConfigError, RegistryConfig};
pub use convert::{ConvertError, ConvertErrorKind, Converter, PathSegment, build_converter};
pub use describe::describe;
pub use docs::{
    DocProvider, FunctionDoc, FunctionDocEntry, InventoryDocs, ParamDoc, StaticDocs,
    StructDocEntry,
};
pub use error::{
    BoxError, ErrorKind, InvokeError, InvokeResult, RegistrationError, RegistrationResult,
};
pub use registry::{ToolGroup, ToolRegistry};
pub use scope::{Scope, ScopeError};

/// Fully qualified identifier of a function in the current module, as
/// recorded by [`macro@tool`].
#[macro_export]
macro_rules! tool_id {
    ($name:ident) => {
        concat!(module_path!(), "::", stringify!($name))
    };
}

#[doc(hidden)]
pub mod __private {
    pub use crate::arg::guard_descriptor;
    pub use inventory;
    pub use serde::de::DeserializeOwned;
    pub use serde_json::Value;
}
