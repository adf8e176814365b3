use std::sync::Arc;

use crate::commands::{CommandError, Handler, Request};
use crate::reply::Reply;
use crate::store::ListEngine;

/// Returns the specified elements of the list stored at `key`. The offsets `start` and `stop` are
/// zero-based indexes, with 0 being the first element of the list, 1 being the next element and
/// so on. They can also be negative numbers indicating offsets starting at the end of the list.
/// Out of range indexes will not produce an error, they are clamped to the list bounds.
///
/// Ref: <https://redis.io/docs/latest/commands/lrange/>
pub struct Lrange {
    engine: Arc<dyn ListEngine>,
}

impl Lrange {
    pub fn new(engine: Arc<dyn ListEngine>) -> Self {
        Self { engine }
    }
}

impl Handler for Lrange {
    fn serve(&self, request: &Request) -> Result<Reply, CommandError> {
        request.validate_exact(3)?;

        let key = &request.args[0];
        let start = request.integer_arg(1)?;
        let stop = request.integer_arg(2)?;

        let values = self.engine.lrange(key, start, stop);

        Ok(Reply::Array(values))
    }
}
