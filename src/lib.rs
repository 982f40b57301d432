//! # FuzzKit Fuzzy Inference Engine
//!
//! A runtime for fuzzy rulebases expressed in Fuzzy Control Language
//! (FCL, IEC 61131-7): load a model, feed it crisp inputs, read back one
//! defuzzified crisp output.
//!
//! ## Pipeline
//!
//! ```text
//! FCL Source
//!     |
//! [fcl]        -> Model (variables, sets, rule table, ops)
//!     |
//! [curve]      -> every term rasterized onto the x-grid
//!     |
//! [infer]      -> fire-all-rules traversal over a Session
//!     |
//! [defuzz]     -> COG / MOM over precomputed per-set tables
//!     |
//! crisp output (or NoOutput)
//! ```
//!
//! Inference is table-driven end to end: fuzzification is an array lookup
//! into each set's sample array, rule resolution is integer arithmetic on a
//! flat mixed-radix table, and defuzzification reads per-set tables built
//! when the sets were. The per-query cost scales with the number of active
//! sets, not with the grid width.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fuzzkit::{ModelRegistry, RegistryConfig};
//!
//! let registry = ModelRegistry::default();
//! let model = registry.new_model();
//! registry.load_fcl_file(model, "aiwisdom.fcl")?;
//!
//! let child = registry.new_child(model)?;
//! registry.set_value(model, child, 0, 50.0)?;
//! registry.set_value(model, child, 1, 50.0)?;
//!
//! match registry.get_output_value(model, child)? {
//!     Some(value) => println!("output: {value}"),
//!     None => println!("no output set active"),
//! }
//! ```
//!
//! Models can equally be built programmatically through
//! [`ModelRegistry::with_model_mut`] or by owning a [`Model`] directly; the
//! registry exists so that callers juggling several models and sessions get
//! stable handles and a shared error-message channel.

// Core entities, dependency order
pub mod grid;
pub mod curve;
pub mod set;
pub mod defuzz;
pub mod variable;
pub mod rules;
pub mod model;

// Evaluation
pub mod infer;
pub mod session;

// Surface
pub mod config;
pub mod error;
pub mod fcl;
pub mod registry;

// Re-export the types most callers need
pub use config::Config;
pub use curve::{MemberFunc, Node, Ramp, Shape};
pub use defuzz::{CompositionOp, DefuzzMethod};
pub use error::{EofSite, FuzzyError, Result};
pub use grid::{Dom, DomainMap, GridSpec};
pub use model::{InferenceOp, Model, VarRef};
pub use registry::{ModelHandle, ModelRegistry, RegistryConfig, SessionHandle};
pub use session::Session;
