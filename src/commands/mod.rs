pub mod lpop;
pub mod lpush;
pub mod lrange;
pub mod rpop;
pub mod rpush;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error as ThisError;

use crate::reply::{ClientErrorCode, Reply};
use crate::store::ListEngine;

use lpop::Lpop;
use lpush::Lpush;
use lrange::Lrange;
use rpop::Rpop;
use rpush::Rpush;

/// A decoded client request: the command name followed by its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub command: String,
    pub args: Vec<String>,
}

impl Request {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Request {
        Request {
            command: command.into(),
            args,
        }
    }

    /// Fails unless exactly `n` arguments were sent.
    pub fn validate_exact(&self, n: usize) -> Result<(), CommandError> {
        if self.args.len() != n {
            return Err(self.wrong_arity());
        }
        Ok(())
    }

    /// Fails unless at least `n` arguments were sent.
    pub fn validate_min(&self, n: usize) -> Result<(), CommandError> {
        if self.args.len() < n {
            return Err(self.wrong_arity());
        }
        Ok(())
    }

    /// Parses the argument at `index` as a base-10 signed integer.
    pub fn integer_arg(&self, index: usize) -> Result<i64, CommandError> {
        let argument = self.args.get(index).ok_or_else(|| self.wrong_arity())?;

        argument
            .parse::<i64>()
            .map_err(|_| CommandError::InvalidInteger {
                command: self.command.clone(),
                argument: argument.clone(),
            })
    }

    fn wrong_arity(&self) -> CommandError {
        CommandError::Protocol {
            message: format!(
                "wrong number of arguments for '{}' command, got {}",
                self.command,
                self.args.len()
            ),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {:?}", arg)?;
        }
        Ok(())
    }
}

/// One command implementation. Handlers validate their own arguments, so every command can
/// enforce its own arity and parsing rules.
pub trait Handler: Send + Sync {
    fn serve(&self, request: &Request) -> Result<Reply, CommandError>;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Result<Reply, CommandError> + Send + Sync,
{
    fn serve(&self, request: &Request) -> Result<Reply, CommandError> {
        self(request)
    }
}

/// Routes requests to the handler registered for their command name. Command names are matched
/// exactly, `lpush` and `LPUSH` are different commands.
///
/// The table is meant to be filled once before the server starts accepting connections and only
/// read afterwards.
#[derive(Default)]
pub struct Mux {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl Mux {
    pub fn new() -> Mux {
        Mux {
            handlers: HashMap::new(),
        }
    }

    /// Builds a router serving every list command against `engine`.
    pub fn with_list_commands(engine: Arc<dyn ListEngine>) -> Mux {
        let mut mux = Mux::new();
        mux.add("LPUSH", Lpush::new(engine.clone()));
        mux.add("RPUSH", Rpush::new(engine.clone()));
        mux.add("LPOP", Lpop::new(engine.clone()));
        mux.add("RPOP", Rpop::new(engine.clone()));
        mux.add("LRANGE", Lrange::new(engine));
        mux
    }

    /// Registers `handler` for `command`, replacing any previous registration.
    pub fn add(&mut self, command: impl Into<String>, handler: impl Handler + 'static) {
        self.handlers.insert(command.into(), Box::new(handler));
    }

    pub fn dispatch(&self, request: &Request) -> Result<Reply, CommandError> {
        match self.handlers.get(&request.command) {
            Some(handler) => handler.serve(request),
            None => Err(CommandError::NotSupported {
                command: request.command.clone(),
            }),
        }
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl fmt::Debug for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut commands: Vec<_> = self.commands().collect();
        commands.sort_unstable();
        f.debug_struct("Mux").field("commands", &commands).finish()
    }
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum CommandError {
    #[error("{command} not supported")]
    NotSupported { command: String },
    #[error("protocol error; {message}")]
    Protocol { message: String },
    #[error("protocol error; value is not an integer for '{command}' command: {argument}")]
    InvalidInteger { command: String, argument: String },
}

impl CommandError {
    pub fn code(&self) -> ClientErrorCode {
        match self {
            CommandError::NotSupported { .. } => ClientErrorCode::NOT_SUPPORTED,
            CommandError::Protocol { .. } | CommandError::InvalidInteger { .. } => {
                ClientErrorCode::PROTOCOL_ERROR
            }
        }
    }
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        Reply::error(err.code(), err.to_string())
    }
}
