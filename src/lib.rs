// Copyright 2025 The dotlink Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![deny(unsafe_code)]

//! # dotlink
//!
//! A metadata resolution and cross-reference graph engine for .NET-style binary
//! modules. `dotlink` consumes module declarations through a reader trait and
//! links them into one deduplicated semantic graph: types with their base,
//! interface, nesting, generic and attribute relationships, members with their
//! signatures and usage edges, and derived override and
//! interface-implementation matches - every edge paired with its back edge.
//!
//! ## Features
//!
//! - **🔑 Identity-keyed nodes** - One node per entity per session; asking twice
//!   returns the same instance
//! - **🧩 Sentinel-complete edges** - Unresolvable references point to Missing
//!   nodes, absent references to the Null node; walks never hit dangling links
//! - **🔗 Derived matching** - Override and interface-implementation edges
//!   computed from resolved signatures, not textual comparison
//! - **🧵 Bounded parallelism** - Idempotent build steps batched on a capped
//!   worker pool, with identical results sequential or parallel
//! - **📋 Fault diagnostics** - Severity-tagged faults instead of failures;
//!   resolution always completes
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dotlink::prelude::*;
//!
//! let source = MemorySource::new().with_module(
//!     MemoryModule::new("app")
//!         .with_type(TypeDecl::interface("App", "IWidget"))
//!         .with_type(
//!             TypeDecl::new("App", "Widget").with_interface(TypeRefSig::named("App.IWidget")),
//!         ),
//! );
//!
//! let registry = NodeRegistry::new(Arc::new(source));
//! registry.load_module_by_name("app");
//! registry.process_all(true, false);
//!
//! let widget = registry
//!     .get_type(&type_key("app", "App.Widget"))
//!     .unwrap();
//! assert_eq!(widget.interfaces()[0].full_name(), "App.IWidget");
//! assert_eq!(widget.interfaces()[0].implementations()[0].full_name(), "App.Widget");
//! ```
//!
//! ## Architecture
//!
//! - [`graph`] - The node registry, node kinds, matching, rules and diagnostics
//! - [`source`] - The reader boundary: declaration values and the
//!   [`source::ModuleReader`]/[`source::ModuleLocator`] traits, plus in-memory
//!   implementations
//!
//! The engine never parses binary formats itself; plug a format parser in behind
//! [`source::ModuleReader`] and the graph takes it from there.

#[macro_use]
mod macros;

#[macro_use]
mod error;

pub mod graph;
pub mod source;
pub mod prelude;

pub use error::Error;

/// Result type alias for this crate, defaulting the error to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
