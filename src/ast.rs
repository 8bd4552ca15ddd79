//! # Expression Language - Abstract Syntax Tree
//!
//! This module defines the tokens the lexer produces and the tree the parser
//! builds from them.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Typed lexemes with their 1-based source cursor
//! - **[stream]** - Read cursor over a token list, always terminated by an
//!   end-of-expression token
//! - **[operators]** - Unary and binary operators with their precedence table
//! - **[node]** - The twelve node kinds of a parsed expression
//! - **[dump]** - Canonical textual rendering of a tree
//!
//! ## Quick Start
//!
//! ```text
//! user.age >= 18 and user?.address.country in ["FR", "DE"]
//! ```
//!
//! parses to
//!
//! ```text
//! Binary(and)
//!     Binary(>=)
//!         GetAttr(property) user . age
//!         Constant 18
//!     Binary(in)
//!         GetAttr(property) (GetAttr(property) user ?. address) . country
//!         Array ["FR", "DE"]
//! ```
//!
//! ## Null-safety
//!
//! Accesses marked with `?.`, and every access on the left-hand side of a
//! `??`, evaluate to `null` instead of failing when their base is `null`.
//! Once a chain short-circuits, the remaining accesses of that chain are
//! skipped as well, so `a?.b.c` is `null` whenever `a` is.
//!
//! ## Arrays and hashes
//!
//! `[a, b]` and `{key: value}` produce the same node kind. A node that has at
//! least one explicit key evaluates to an object and compiles to a hash
//! literal; otherwise it is a list.
pub mod dump;
pub mod node;
pub mod operators;
pub mod stream;
pub mod tokens;

pub use node::{ArrayElement, GetAttrKind, Node};
pub use operators::{Associativity, BinaryOperator, UnaryOperator};
pub use stream::TokenStream;
pub use tokens::{Token, TokenKind};
