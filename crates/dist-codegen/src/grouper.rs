//! Grouping of declared functions by owning server.

use distributor_core::{Function, ServerId};
use std::collections::HashMap;

/// Functions of each server, in declaration order.
///
/// Built once per session and never mutated afterwards. A server without
/// functions has no entry.
///
/// # Examples
///
/// ```
/// use distributor_codegen::FunctionMap;
/// use distributor_core::{Function, ServerId, Transport};
///
/// let functions = vec![
///     Function::new("add", "S1", Transport::Rabbit, &["a", "b"]),
///     Function::new("fetch", "S2", Transport::from("http"), &[]),
///     Function::new("sub", "S1", Transport::Rabbit, &["a", "b"]),
/// ];
///
/// let map = FunctionMap::build(&functions);
/// let names: Vec<_> = map
///     .functions(&ServerId::new("S1"))
///     .iter()
///     .map(|f| f.name.as_str())
///     .collect();
/// assert_eq!(names, vec!["add", "sub"]);
/// assert_eq!(map.server_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FunctionMap {
    by_server: HashMap<ServerId, Vec<Function>>,
}

impl FunctionMap {
    /// Groups `functions` under their owning server.
    #[must_use]
    pub fn build(functions: &[Function]) -> Self {
        let mut by_server: HashMap<ServerId, Vec<Function>> = HashMap::new();
        for function in functions {
            by_server
                .entry(function.server.clone())
                .or_default()
                .push(function.clone());
        }
        Self { by_server }
    }

    /// All functions of `server`, any transport.
    #[must_use]
    pub fn functions(&self, server: &ServerId) -> &[Function] {
        self.by_server.get(server).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Functions of `server` that use the queue transport, in order.
    #[must_use]
    pub fn queue_functions(&self, server: &ServerId) -> Vec<&Function> {
        self.functions(server)
            .iter()
            .filter(|f| f.uses_queue())
            .collect()
    }

    /// Number of servers with at least one function.
    #[must_use]
    pub fn server_count(&self) -> usize {
        self.by_server.len()
    }

    /// Returns `true` if no function was grouped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_server.is_empty()
    }

    /// Server ids present in the map, sorted.
    #[must_use]
    pub fn servers(&self) -> Vec<&ServerId> {
        let mut servers: Vec<_> = self.by_server.keys().collect();
        servers.sort();
        servers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use distributor_core::Transport;

    #[test]
    fn test_empty_input() {
        let map = FunctionMap::build(&[]);
        assert!(map.is_empty());
        assert!(map.functions(&ServerId::new("S1")).is_empty());
    }

    #[test]
    fn test_preserves_declaration_order() {
        let functions = vec![
            Function::new("c", "S1", Transport::Rabbit, &[]),
            Function::new("a", "S1", Transport::Rabbit, &[]),
            Function::new("b", "S1", Transport::Rabbit, &[]),
        ];
        let map = FunctionMap::build(&functions);
        let names: Vec<_> = map
            .functions(&ServerId::new("S1"))
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_queue_functions_filters_transport() {
        let functions = vec![
            Function::new("a", "S1", Transport::Rabbit, &[]),
            Function::new("b", "S1", Transport::from("http"), &[]),
            Function::new("c", "S1", Transport::from("rabbit"), &[]),
        ];
        let map = FunctionMap::build(&functions);
        let names: Vec<_> = map
            .queue_functions(&ServerId::new("S1"))
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(map.functions(&ServerId::new("S1")).len(), 3);
    }

    #[test]
    fn test_servers_sorted() {
        let functions = vec![
            Function::new("a", "zeta", Transport::Rabbit, &[]),
            Function::new("b", "alpha", Transport::Rabbit, &[]),
        ];
        let map = FunctionMap::build(&functions);
        let servers: Vec<_> = map.servers().iter().map(|s| s.as_str()).collect();
        assert_eq!(servers, vec!["alpha", "zeta"]);
    }
}
