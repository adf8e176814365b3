use std::sync::Arc;

use crate::commands::{CommandError, Handler, Request};
use crate::reply::Reply;
use crate::store::ListEngine;

/// Insert all the specified values at the tail of the list stored at `key`, creating it when
/// needed. Replies with the length of the list after the push.
///
/// Ref: <https://redis.io/docs/latest/commands/rpush/>
pub struct Rpush {
    engine: Arc<dyn ListEngine>,
}

impl Rpush {
    pub fn new(engine: Arc<dyn ListEngine>) -> Self {
        Self { engine }
    }
}

impl Handler for Rpush {
    fn serve(&self, request: &Request) -> Result<Reply, CommandError> {
        request.validate_min(2)?;

        let (key, values) = (&request.args[0], &request.args[1..]);
        let len = self.engine.rpush(key, values.to_vec());

        Ok(Reply::Integer(len as i64))
    }
}
