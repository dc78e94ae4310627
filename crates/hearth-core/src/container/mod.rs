//! # Hearth Binding Container
//!
//! The `container` module maps abstract keys to construction recipes and
//! cached instances, and is the registry every other kernel subsystem is
//! resolved through.
//!
//! ## Key Components:
//!
//! - **[`Container`]**: the binding registry. Binds factories (transient or
//!   singleton), resolves them with [`Container::make`], force-installs values
//!   with [`Container::instance`] and drops cached singletons with
//!   [`Container::release`].
//! - **[`Instance`]**: a type-erased, reference-counted resolved value. An
//!   instance may carry extra typed *views* of itself so that independent
//!   subsystems can recognise capabilities without the container knowing
//!   about them.
//! - **[`BindingRef`]**: a handle returned by `bind`/`singleton` for chaining
//!   per-binding resolving and release hooks.
//! - **Hooks**: resolving hooks run right after an instance is built, release
//!   hooks run before a cached instance is discarded. Both exist per key and
//!   globally; see [`Container::on_resolving_any`] and
//!   [`Container::on_release_any`].
//! - **Errors**: [`ContainerError`] in the `error` submodule.
pub mod binding;
pub mod error;
pub mod instance;
pub mod registry;

pub use binding::{BindingRef, Factory, Hook, HookError, TypeFinder};
pub use error::{ContainerError, HookPhase, Result};
pub use instance::{Instance, InstanceId};
pub use registry::{Container, type_key};

#[cfg(test)]
mod tests;
