//! # Hourglass Trust - Light VerSec Schemas
//!
//! ## Purpose
//!
//! The trust-schema engine: a textual language describing hierarchical
//! naming and signing relationships, a compiler producing a deterministic
//! binary automaton, and a checker matching names and deciding whether a
//! key may sign a packet.
//!
//! ```text
//! schema text → [grammar] → AST → [compiler] → LvsModel → [checker]
//!                                      ↓                      ↓
//!                              deterministic TLV        match / check
//! ```
//!
//! A typical load:
//!
//! ```
//! use trust::{compile_lvs, default_user_fns, Checker};
//!
//! let model = compile_lvs(r#"
//!     #root: "blog"/"KEY"/_
//!     #post: "blog"/author/post <= #root
//! "#).unwrap();
//! let checker = Checker::new(model, default_user_fns()).unwrap();
//! assert!(checker.check(
//!     &types::Name::from_str("/blog/alice/hello").unwrap(),
//!     &types::Name::from_str("/blog/KEY/k1").unwrap(),
//! ));
//! ```

pub mod ast;
pub mod checker;
pub mod compiler;
pub mod error;
pub mod grammar;
pub mod model;

pub use checker::{default_user_fns, Checker, UserFn};
pub use compiler::{compile_lvs, top_order};
pub use error::{LvsError, LvsResult};
pub use grammar::parse_lvs;
pub use model::{LvsModel, MIN_SUPPORTED_VERSION, VERSION};
