// Copyright 2025 dexscope contributors
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
#![deny(unsafe_code)]

//! # dexscope
//!
//! [![Crates.io](https://img.shields.io/crates/v/dexscope.svg)](https://crates.io/crates/dexscope)
//! [![Documentation](https://docs.rs/dexscope/badge.svg)](https://docs.rs/dexscope)
//!
//! A framework for abstract interpretation of Dalvik bytecode with side-effect
//! classification. `dexscope` executes registered method bodies op by op,
//! tracking registers, static fields, and an abstract heap per execution path,
//! and classifies what each method *does* on a three-point scale - the
//! foundation a deobfuscator needs to decide which code is safe to fold away.
//!
//! ## Features
//!
//! - **🧪 Abstract execution** - run Dalvik ops against tracked registers,
//!   statics, and heap objects without a device or runtime
//! - **🏷️ Side-effect classification** - every execution folds to
//!   [`SideEffectLevel::None`], [`Weak`](SideEffectLevel::Weak), or
//!   [`Strong`](SideEffectLevel::Strong)
//! - **⚙️ Faithful class initialization** - lazy, idempotent `<clinit>`
//!   semantics, with fail-safe conservative classification when an
//!   initializer cannot be analyzed
//! - **🌿 Cheap path forking** - contexts derive in O(1) through
//!   structurally-shared state, so speculative paths cost almost nothing
//! - **🛡️ Adversarial-input hardened** - call-depth and op budgets turn
//!   hostile initializer chains and decrypt loops into ordinary failures
//! - **⚡ Parallel batch analysis** - classify whole registries of methods
//!   concurrently, one isolated context per method
//!
//! ## Quick Start
//!
//! Add `dexscope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! dexscope = "0.1"
//! ```
//!
//! Register a class, execute a method, read the classification:
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use dexscope::prelude::*;
//!
//! let registry = ClassRegistry::new();
//! registry.register(
//!     ClassDefinition::builder("Lcom/example/Main;")
//!         .static_field("greeting", "I", None)
//!         .method(MethodDefinition::new(
//!             "Lcom/example/Main;-><clinit>()V",
//!             AccessFlags::STATIC | AccessFlags::CONSTRUCTOR,
//!             1,
//!             vec![
//!                 Op::new(0, 2, OpKind::Const { dest: 0, literal: 42 }),
//!                 Op::new(
//!                     2,
//!                     4,
//!                     OpKind::StaticPut {
//!                         source: 0,
//!                         field: FieldRef::new("Lcom/example/Main;", "greeting", "I"),
//!                     },
//!                 ),
//!                 Op::new(4, 5, OpKind::ReturnVoid),
//!             ],
//!         ))
//!         .method(MethodDefinition::new(
//!             "Lcom/example/Main;->make()V",
//!             AccessFlags::PUBLIC,
//!             1,
//!             vec![
//!                 Op::new(
//!                     0,
//!                     2,
//!                     OpKind::NewInstance {
//!                         dest: 0,
//!                         class_name: "Lcom/example/Main;".into(),
//!                     },
//!                 ),
//!                 Op::new(2, 3, OpKind::ReturnVoid),
//!             ],
//!         ))
//!         .build(),
//! );
//!
//! let vm = Arc::new(DexVm::new(registry, ExecutionLimits::default()));
//! let graph = DexVm::run_method(&vm, "Lcom/example/Main;->make()V").expect("method is registered");
//!
//! // Instantiating Main ran its initializer; the initializer's static store
//! // makes the whole execution a weak effect.
//! assert_eq!(graph.strongest_side_effect(), SideEffectLevel::Weak);
//! ```
//!
//! The execution state is also usable directly, without an engine:
//!
//! ```rust
//! use dexscope::execution::{Heap, HeapObject, Value};
//!
//! let mut heap = Heap::new();
//! let session = heap.alloc(HeapObject::local_instance("Lcom/example/Session;"));
//! heap.set_instance_field(session, "token", Value::Int(7))?;
//!
//! // Forks resolve the same references but never see later mutations.
//! let snapshot = heap.fork();
//! assert_eq!(snapshot.instance_field(session, "token")?, Some(&Value::Int(7)));
//! # Ok::<(), dexscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `dexscope` is organized into a few focused modules:
//!
//! - [`prelude`] - convenient re-exports of the commonly used types
//! - [`execution`] - per-path state (values, heap, statics, registers) and
//!   the op catalog that mutates it
//! - [`vm`] - the [`ClassRegistry`](vm::ClassRegistry) of analyzed input and
//!   the [`DexVm`](vm::DexVm) engine that walks method bodies
//! - [`types`] - Dalvik type-name format handling
//! - [`Error`] and [`Result`] - error handling
//!
//! ### Execution Layer
//!
//! An [`execution::ExecutionContext`] is one path's complete mutable state.
//! Ops execute against it and report an [`execution::OpOutcome`]: successor
//! addresses plus the side effect of that particular execution. Class
//! initialization goes through
//! [`execution::ExecutionContext::statically_initialize_class_if_necessary`],
//! which runs `<clinit>` lazily, exactly once per path, and records the
//! initializer's strongest effect for the class. Engines stay behind the
//! [`execution::VirtualMachine`] trait, so the state machinery tests against
//! doubles and admits alternative engines.
//!
//! ### Engine Layer
//!
//! [`vm::DexVm`] resolves descriptors against a [`vm::ClassRegistry`], walks
//! bodies under [`vm::ExecutionLimits`], and folds op outcomes into an
//! [`execution::ExecutionGraph`]. A failed execution - unknown method,
//! exceeded budget, malformed body - surfaces as `None`, and callers
//! classify conservatively rather than abort; one unanalyzable method must
//! never wedge a whole analysis run.
//!
//! ## Error Handling
//!
//! Structural misuse of the crate's own state (dangling heap references,
//! out-of-range registers) returns [`Result<T, Error>`](Result). Failure to
//! analyze *target* code is not an `Error`: engines report it as a missing
//! result and the affected class or method classifies as
//! [`SideEffectLevel::Strong`]. See [`Error`] for the distinction.
//!
//! ## Testing
//!
//! ```bash
//! cargo test
//! cargo bench  # criterion benchmarks for fork and initialization costs
//! ```

pub(crate) mod error;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use dexscope::prelude::*;
///
/// let registry = ClassRegistry::new();
/// assert!(registry.is_empty());
/// ```
pub mod prelude;

/// Per-path execution state and the op catalog.
///
/// Everything a single analyzed path carries: [`execution::Value`]s, the
/// abstract [`execution::Heap`], per-class [`execution::ClassState`], the
/// [`execution::MethodState`] register frame, and the
/// [`execution::ExecutionContext`] that bundles them together with
/// side-effect bookkeeping.
pub mod execution;

/// Dalvik type-name formats and conversions.
///
/// Internal (`Lcom/example/Main;`), binary (`com.example.Main`), and source
/// (`com.example.Main[]`) formats, with conversions between them and
/// primitive/wrapper classification.
pub mod types;

/// The engine: class registry, definitions, limits, and [`vm::DexVm`].
pub mod vm;

/// `dexscope` Result type
///
/// # Example
///
/// ```rust
/// use dexscope::execution::{MethodState, Value};
///
/// fn first_register(state: &MethodState) -> dexscope::Result<Value> {
///     Ok(state.read_register(0)?.clone())
/// }
///
/// let state = MethodState::new(1);
/// assert!(first_register(&state).is_ok());
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dexscope` Error type
pub use error::Error;

/// The three-point side-effect classification every execution folds to.
pub use execution::SideEffectLevel;

/// One path's complete mutable execution state.
pub use execution::ExecutionContext;

/// The concrete execution engine.
pub use vm::DexVm;

/// The registry of analyzed classes and method bodies.
pub use vm::ClassRegistry;
