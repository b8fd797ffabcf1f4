//! Callback-parameter source rules
//!
//! Some sinks hand untrusted data to a callback instead of returning it:
//! `fs.readFile` passes file contents, an express route handler receives
//! the request. A callback rule names which argument is the callback and
//! which of the callback's parameters is the source; the engine then walks
//! the callback body with that parameter pre-tainted. Structural cases
//! (hapi's handler-inside-options-object routes) use a custom handler
//! function instead.

use regex::Regex;
use swc_common::Span;

use crate::engine::value::{SymbolicValue, ValueKind};
use crate::engine::{EngineError, Interpreter};
use crate::engine::scope::ScopeId;

/// Position of an argument or parameter in a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSlot {
    Index(usize),
    Last,
}

impl ArgSlot {
    pub fn resolve(self, len: usize) -> Option<usize> {
        match self {
            ArgSlot::Index(i) if i < len => Some(i),
            ArgSlot::Index(_) => None,
            ArgSlot::Last => len.checked_sub(1),
        }
    }
}

/// Call-site view handed to custom handlers.
pub struct CallSite<'a> {
    /// Canonical callee name, e.g. `require('hapi').Server().route`.
    pub name: &'a str,
    pub args: &'a [SymbolicValue],
    pub span: Span,
}

pub type CustomHandler =
    fn(&mut Interpreter<'_>, ScopeId, &CallSite<'_>) -> Result<(), EngineError>;

#[derive(Debug, Clone, Copy)]
pub enum CallbackHandler {
    /// The callback is `callback`-th argument; its `source`-th parameter
    /// receives untrusted data.
    Params { callback: ArgSlot, source: ArgSlot },
    Custom(CustomHandler),
}

#[derive(Debug, Clone)]
pub struct CallbackRule {
    pub name: String,
    pattern: Regex,
    pub handler: CallbackHandler,
}

impl CallbackRule {
    pub fn new(pattern: &str, handler: CallbackHandler) -> Result<Self, regex::Error> {
        Ok(Self {
            name: pattern.to_string(),
            pattern: Regex::new(pattern)?,
            handler,
        })
    }

    pub fn matches(&self, raw: &str) -> bool {
        self.pattern.find(raw).is_some_and(|m| m.start() == 0)
    }
}

#[derive(Debug, Clone)]
pub struct CallbacksRegistry {
    rules: Vec<CallbackRule>,
}

impl CallbacksRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        let defaults: [(&str, CallbackHandler); 3] = [
            (
                "^require\\('fs'\\)\\.readFile",
                CallbackHandler::Params {
                    callback: ArgSlot::Last,
                    source: ArgSlot::Index(1),
                },
            ),
            (
                "^require\\('express'\\).*\\.(get|post)$",
                CallbackHandler::Params {
                    callback: ArgSlot::Last,
                    source: ArgSlot::Index(0),
                },
            ),
            (
                "^require\\('hapi'\\).*\\.route$",
                CallbackHandler::Custom(hapi_route),
            ),
        ];

        for (pattern, handler) in defaults {
            if let Ok(rule) = CallbackRule::new(pattern, handler) {
                self.register(rule);
            }
        }
    }

    pub fn register(&mut self, rule: CallbackRule) {
        self.rules.push(rule);
    }

    pub fn find_match(&self, name: &str) -> Option<&CallbackRule> {
        self.rules.iter().find(|rule| rule.matches(name))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for CallbacksRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn object_prop<'a>(
    props: &'a [(String, SymbolicValue)],
    name: &str,
) -> Option<&'a SymbolicValue> {
    props
        .iter()
        .find_map(|(key, value)| (key == name).then_some(value))
}

/// Hapi routes carry the handler inside an options object, either directly
/// or nested under `config`:
///
/// ```js
/// server.route({ method: 'GET', path: '/', handler: function (req, reply) { ... } })
/// ```
///
/// The handler's first parameter is the request.
fn hapi_route(
    interp: &mut Interpreter<'_>,
    scope: ScopeId,
    call: &CallSite<'_>,
) -> Result<(), EngineError> {
    let Some(options) = call.args.first() else {
        return Ok(());
    };
    let ValueKind::Object { props } = &options.kind else {
        return Ok(());
    };

    let handler = object_prop(props, "handler").or_else(|| {
        object_prop(props, "config").and_then(|config| match &config.kind {
            ValueKind::Object { props } => object_prop(props, "handler"),
            _ => None,
        })
    });

    let Some(handler) = handler else {
        return Ok(());
    };

    if let Some(func) = interp.resolve_function(scope, handler) {
        interp.simulate_tainted_callback(&func, ArgSlot::Index(0), call.span)?;
    }
    Ok(())
}
