use std::sync::Arc;

use crate::commands::{CommandError, Handler, Request};
use crate::reply::Reply;
use crate::store::ListEngine;

/// Removes and returns the last element of the list stored at `key`.
///
/// Ref: <https://redis.io/docs/latest/commands/rpop/>
pub struct Rpop {
    engine: Arc<dyn ListEngine>,
}

impl Rpop {
    pub fn new(engine: Arc<dyn ListEngine>) -> Self {
        Self { engine }
    }
}

impl Handler for Rpop {
    fn serve(&self, request: &Request) -> Result<Reply, CommandError> {
        request.validate_exact(1)?;

        let value = self.engine.rpop(&request.args[0]);

        Ok(value.map_or(Reply::Nil, Reply::Bulk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::request;
    use crate::store::Store;

    #[test]
    fn pops_from_the_tail_until_nil() {
        let store = Store::new();
        let rpop = Rpop::new(Arc::new(store.clone()));
        store.rpush("key1", vec![String::from("a"), String::from("b")]);

        let replies: Vec<_> = (0..3)
            .map(|_| rpop.serve(&request("RPOP", &["key1"])).unwrap())
            .collect();

        assert_eq!(
            replies,
            vec![
                Reply::Bulk(String::from("b")),
                Reply::Bulk(String::from("a")),
                Reply::Nil
            ]
        );
        assert!(!store.lock().exists("key1"));
    }

    #[test]
    fn missing_key() {
        let store = Store::new();
        let rpop = Rpop::new(Arc::new(store.clone()));

        let result = rpop.serve(&request("RPOP", &["missing"])).unwrap();

        assert_eq!(result, Reply::Nil);
        assert!(!store.lock().exists("missing"));
    }

    #[test]
    fn wrong_number_of_arguments() {
        let rpop = Rpop::new(Arc::new(Store::new()));

        let err = rpop.serve(&request("RPOP", &[])).unwrap_err();

        assert_eq!(
            err,
            CommandError::Protocol {
                message: String::from("wrong number of arguments for 'RPOP' command, got 0")
            }
        );
    }
}
