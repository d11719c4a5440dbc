//! Query grammar for series metadata.
//!
//! Text flows through [`lexer`] and [`parser`] into an [`Expression`] tree.
//! The tree can be evaluated to a [`Value`] against a [`Scope`], rendered
//! back to text, or compiled by [`Compiler`] into a
//! [`metadata::MetadataRequest`].
//!
//! ```
//! use grammar::{Scope, Value, parse};
//!
//! let expr = parse("let y = 2 + 3; y * 2").unwrap();
//! assert_eq!(expr.eval(&Scope::new()).unwrap(), Value::Integer(10));
//! ```

pub mod ast;
pub mod compiler;
pub mod context;
pub mod duration;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod scope;
pub mod token;
pub mod value;
pub mod visitor;

pub use ast::{BinaryOp, Expression, ExpressionKind, Literal, TagOp, UnaryOp};
pub use compiler::{CompileOptions, Compiler, FilterCompiler};
pub use context::Context;
pub use duration::{Duration, TimeUnit};
pub use error::{Error, ErrorKind, Result};
pub use eval::{Evaluator, eval};
pub use lexer::{Lexer, tokenize};
pub use parser::{Limits, Parser, parse, parse_with_limits};
pub use render::Renderer;
pub use scope::{Binding, Scope};
pub use token::{Token, TokenKind};
pub use value::Value;
pub use visitor::{FreeReferences, Visitor};
