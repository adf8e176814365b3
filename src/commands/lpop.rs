use std::sync::Arc;

use crate::commands::{CommandError, Handler, Request};
use crate::reply::Reply;
use crate::store::ListEngine;

/// Removes and returns the first element of the list stored at `key`. Replies with nil when the
/// key does not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/lpop/>
pub struct Lpop {
    engine: Arc<dyn ListEngine>,
}

impl Lpop {
    pub fn new(engine: Arc<dyn ListEngine>) -> Self {
        Self { engine }
    }
}

impl Handler for Lpop {
    fn serve(&self, request: &Request) -> Result<Reply, CommandError> {
        request.validate_exact(1)?;

        let key = &request.args[0];

        match self.engine.lpop(key) {
            Some(value) => Ok(Reply::Bulk(value)),
            None => Ok(Reply::Nil),
        }
    }
}
