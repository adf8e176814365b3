use std::sync::Arc;

use crate::commands::{CommandError, Handler, Request};
use crate::reply::Reply;
use crate::store::ListEngine;

/// Insert all the specified values at the head of the list stored at `key`. If `key` does not
/// exist, it is created as empty list before performing the push operations. Elements are
/// inserted one after the other, so `LPUSH mylist a b c` leaves `c` as the first element.
///
/// Ref: <https://redis.io/docs/latest/commands/lpush/>
pub struct Lpush {
    engine: Arc<dyn ListEngine>,
}

impl Lpush {
    pub fn new(engine: Arc<dyn ListEngine>) -> Self {
        Self { engine }
    }
}

impl Handler for Lpush {
    fn serve(&self, request: &Request) -> Result<Reply, CommandError> {
        request.validate_min(2)?;

        let key = &request.args[0];
        let values = request.args[1..].to_vec();

        let len = self.engine.lpush(key, values);

        Ok(Reply::Integer(len as i64))
    }
}
