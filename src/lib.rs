pub mod ast;
pub mod cache;
pub mod config;
pub mod evaluator;
pub mod lexer;
pub mod macros;
pub mod output;
pub mod params;
pub mod parser;
pub mod record;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod rules;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Expr, Identifier, Literal, Operator, Token};
pub use cache::RuleCache;
pub use config::{ConfigError, EngineConfig};
pub use evaluator::{EvalContext, EvalError, Evaluator};
pub use lexer::{LexError, Lexer, Position};
pub use macros::{Clock, FixedClock, SystemClock};
pub use output::to_filter_string;
pub use parser::{ParseError, ParseOptions, Parser, parse};
pub use record::{Record, Relation};
pub use registry::{RegistryError, RuleRegistry};
pub use request::RequestInfo;
pub use resolver::{JoinError, JoinResolver, NoJoins, StaticJoins};
pub use rules::{
    Action, Caller, CollectionDef, CollectionKind, CollectionRules, CompileError, CompiledRule,
    Decision, Denial, ListAccess, Predicate, Rule, RuleGate,
};
pub use value::Value;
