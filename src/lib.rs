//! Compiler front-end for Dyva, an indentation-sensitive,
//! expression-oriented language.
//!
//! The pipeline runs per module: the [`lexer`] turns source text into a
//! token stream with synthetic layout tokens, the [`parser`] builds an
//! arena-backed syntax tree ([`ast`]), the [`scope`] pass materializes
//! lexical parent relationships, [`lower`] produces a typed control-flow
//! [`ir`] in SSA style, and the [`analysis`] passes close access regions,
//! drop dead accesses, and check subscript projection coherence.
//! Diagnostics accumulate per module ([`diagnostic`]); the [`program`]
//! orchestrates loading, including imports.

pub mod analysis;
pub mod ast;
pub mod cli;
pub mod diagnostic;
pub mod intern;
pub mod ir;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod program;
pub mod scope;
pub mod source;
pub mod style;
pub mod token;
pub mod visitor;
