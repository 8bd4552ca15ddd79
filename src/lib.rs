//! An embeddable expression language.
//!
//! Expressions are tokenized by the [`lexer`], turned into a [`Node`] tree by
//! the [`parser`], and then either evaluated against a set of [`Values`] or
//! compiled to JavaScript-compatible source. [`ExpressionLanguage`] ties the
//! stages together behind a cache of parsed trees.

pub mod ast;
pub mod cache;
pub mod compiler;
pub mod convert;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod functions;
pub mod language;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{ArrayElement, BinaryOperator, GetAttrKind, Node, Token, TokenKind, TokenStream, UnaryOperator};
pub use cache::{CacheConfig, ExpressionCache};
pub use compiler::Compiler;
pub use convert::{to_json, values_from_json};
pub use error::{Error, EvalError, Result, SyntaxError};
pub use evaluator::Evaluator;
pub use expression::{Expression, ParsedExpression, SerializedParsedExpression};
pub use functions::{BuiltinFunctionProvider, ExpressionFunction, ExpressionFunctionProvider, FunctionRegistry};
pub use language::ExpressionLanguage;
pub use lexer::{Lexer, tokenize};
pub use parser::{DeclaredName, ParseFlags, Parser};
pub use value::{NativeFunction, Value, Values};
