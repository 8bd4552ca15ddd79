//! The embedding entry point.
//!
//! ```
//! use expression_language::{ExpressionLanguage, Value, Values};
//!
//! let language = ExpressionLanguage::new();
//! let mut values = Values::new();
//! values.insert("price".to_string(), Value::Integer(40));
//!
//! let total = language.evaluate("price * 2 + 1", &values).unwrap();
//! assert_eq!(total, Value::Integer(81));
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tracing::debug;

use crate::cache::ExpressionCache;
use crate::error::{Error, Result};
use crate::expression::{Expression, ParsedExpression};
use crate::functions::{ExpressionFunction, ExpressionFunctionProvider, FunctionRegistry};
use crate::lexer;
use crate::parser::{DeclaredName, ParseFlags, Parser};
use crate::value::{Value, Values};

const DEFAULT_FUNCTIONS: [&str; 3] = ["min", "max", "now"];

/// Parses, caches, evaluates and compiles expressions.
///
/// Functions can only be registered until the first call to `parse`,
/// `lint`, `evaluate` or `compile`; from then on the function set is frozen.
pub struct ExpressionLanguage {
    cache: ExpressionCache,
    functions: FunctionRegistry,
    parser: OnceLock<Parser>,
}

impl ExpressionLanguage {
    pub fn new() -> Self {
        Self::with_cache(ExpressionCache::default())
    }

    pub fn with_cache(cache: ExpressionCache) -> Self {
        let mut functions = FunctionRegistry::new();
        for function in DEFAULT_FUNCTIONS.iter().filter_map(|name| ExpressionFunction::builtin(name)) {
            functions.insert(function.name().to_string(), function);
        }
        ExpressionLanguage {
            cache,
            functions,
            parser: OnceLock::new(),
        }
    }

    pub fn with_providers<I>(providers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn ExpressionFunctionProvider>>,
    {
        let mut language = Self::new();
        for provider in providers {
            for function in provider.functions() {
                language.functions.insert(function.name().to_string(), function);
            }
        }
        language
    }

    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    fn parser(&self) -> &Parser {
        self.parser.get_or_init(|| {
            debug!(functions = self.functions.len(), "function registry sealed");
            Parser::new(self.functions.names())
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.parser.get().is_some() {
            return Err(Error::RegistrationSealed);
        }
        Ok(())
    }

    /// Registers a function from its compile and evaluate callbacks.
    pub fn register<C, E>(&mut self, name: &str, compiler: C, evaluator: E) -> Result<()>
    where
        C: Fn(&[String]) -> String + Send + Sync + 'static,
        E: Fn(&Values, &[Value]) -> std::result::Result<Value, crate::error::EvalError> + Send + Sync + 'static,
    {
        self.add_function(ExpressionFunction::new(name, compiler, evaluator))
    }

    pub fn add_function(&mut self, function: ExpressionFunction) -> Result<()> {
        self.ensure_open()?;
        self.functions.insert(function.name().to_string(), function);
        Ok(())
    }

    pub fn register_provider<P>(&mut self, provider: &P) -> Result<()>
    where
        P: ExpressionFunctionProvider + ?Sized,
    {
        self.ensure_open()?;
        for function in provider.functions() {
            self.functions.insert(function.name().to_string(), function);
        }
        Ok(())
    }

    /// Parses an expression, reusing a cached tree when the same source was
    /// parsed before with the same names and flags.
    pub fn parse(
        &self,
        expression: impl Into<Expression>,
        names: &[DeclaredName],
        flags: ParseFlags,
    ) -> Result<Arc<ParsedExpression>> {
        let parser = self.parser();
        let source = match expression.into() {
            Expression::Parsed(parsed) => return Ok(parsed),
            Expression::Source(source) => source,
        };

        let key = cache_key(&source, names, flags);
        if let Some(parsed) = self.cache.get(&key) {
            debug!(expression = %source, "expression cache hit");
            return Ok(parsed);
        }

        let start = Instant::now();
        let stream = lexer::tokenize(&source)?;
        let nodes = parser.parse(stream, names, flags)?;
        debug!(expression = %source, elapsed = ?start.elapsed(), "parsed expression");

        let parsed = Arc::new(ParsedExpression::new(source, nodes));
        self.cache.insert(key, Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Validates an expression without caching it.
    ///
    /// `None` for `names` is deprecated; pass
    /// [`ParseFlags::IGNORE_UNKNOWN_VARIABLES`] instead.
    pub fn lint(&self, expression: impl Into<Expression>, names: Option<&[DeclaredName]>, flags: ParseFlags) -> Result<()> {
        let parser = self.parser();
        let source = match expression.into() {
            Expression::Parsed(_) => return Ok(()),
            Expression::Source(source) => source,
        };
        let stream = lexer::tokenize(&source)?;
        parser.lint(stream, names, flags)?;
        Ok(())
    }

    /// Evaluates an expression; every key of `values` is a declared name.
    pub fn evaluate(&self, expression: impl Into<Expression>, values: &Values) -> Result<Value> {
        let names: Vec<DeclaredName> = values.keys().map(|name| DeclaredName::from(name.as_str())).collect();
        let parsed = self.parse(expression, &names, ParseFlags::NONE)?;
        Ok(parsed.nodes().evaluate(&self.functions, values)?)
    }

    /// Compiles an expression to source.
    pub fn compile(&self, expression: impl Into<Expression>, names: &[DeclaredName]) -> Result<String> {
        let parsed = self.parse(expression, names, ParseFlags::NONE)?;
        Ok(parsed.nodes().compile(&self.functions))
    }
}

impl Default for ExpressionLanguage {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache key for a parse: the source plus its sorted names, so the order
/// names are declared in does not matter.
fn cache_key(source: &str, names: &[DeclaredName], flags: ParseFlags) -> String {
    let mut tokens: Vec<String> = names.iter().map(DeclaredName::cache_token).collect();
    tokens.sort();
    let mut key = format!("{}//{}", source, tokens.join("|"));
    if flags.bits() != 0 {
        key.push_str(&format!("#{}", flags.bits()));
    }
    url::form_urlencoded::byte_serialize(key.as_bytes()).collect()
}
