//! Declaration model: remote functions and the servers that host them.
//!
//! The model is read-only input to a generation session. It is validated
//! once at construction and indexes functions by name and servers by id so
//! the generator resolves declaration sites with a single lookup.
//!
//! # Examples
//!
//! ```
//! use distributor_core::{DeclarationModel, Function, Server, Transport};
//!
//! let model = DeclarationModel::new(
//!     vec![Function::new("add", "S1", Transport::Rabbit, &["a", "b"])],
//!     vec![Server::rabbit("S1", "jobs")],
//! )?;
//!
//! let add = model.function("add").unwrap();
//! assert_eq!(add.parameter_names(), vec!["a", "b"]);
//! assert!(model.server(&add.server).is_some());
//! # Ok::<(), distributor_core::Error>(())
//! ```

use crate::types::{FunctionName, ServerId, is_js_identifier};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Transport tag attached to a function.
///
/// Tags are matched case-insensitively; anything other than `rabbit` is kept
/// verbatim so sibling generators can still see it.
///
/// # Examples
///
/// ```
/// use distributor_core::Transport;
///
/// assert_eq!(Transport::from("Rabbit"), Transport::Rabbit);
/// assert_eq!(Transport::from("http"), Transport::Other("http".to_string()));
/// assert!(Transport::from("RABBIT").is_queue());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Transport {
    /// Message-queue transport (`RABBIT`).
    Rabbit,
    /// Any other transport, handled elsewhere.
    Other(String),
}

impl Transport {
    /// Returns `true` for the queue transport.
    #[must_use]
    pub const fn is_queue(&self) -> bool {
        matches!(self, Self::Rabbit)
    }

    /// Returns the tag as written in declaration files.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Rabbit => "RABBIT",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for Transport {
    fn from(tag: String) -> Self {
        if tag.trim().eq_ignore_ascii_case("rabbit") {
            Self::Rabbit
        } else {
            Self::Other(tag)
        }
    }
}

impl From<&str> for Transport {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<Transport> for String {
    fn from(transport: Transport) -> Self {
        transport.as_str().to_string()
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared function parameter.
///
/// Accepts either a bare string or an object with a `name` field when
/// deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ParameterRepr")]
pub struct Parameter {
    /// Parameter name, used as a destructuring binding in generated code
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParameterRepr {
    Name(String),
    Object { name: String },
}

impl From<ParameterRepr> for Parameter {
    fn from(repr: ParameterRepr) -> Self {
        match repr {
            ParameterRepr::Name(name) | ParameterRepr::Object { name } => Self { name },
        }
    }
}

impl From<&str> for Parameter {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// A remote function declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Function name, unique within a run
    pub name: FunctionName,
    /// Id of the owning server
    pub server: ServerId,
    /// Transport tag
    pub method: Transport,
    /// Ordered parameters
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Function {
    /// Creates a function declaration from plain values.
    #[must_use]
    pub fn new(
        name: impl Into<FunctionName>,
        server: impl Into<ServerId>,
        method: Transport,
        parameters: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            method,
            parameters: parameters.iter().copied().map(Parameter::from).collect(),
        }
    }

    /// Returns `true` if the function is invoked over the message queue.
    #[must_use]
    pub const fn uses_queue(&self) -> bool {
        self.method.is_queue()
    }

    /// Returns parameter names in declaration order.
    #[must_use]
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Queue transport settings of a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTransport {
    /// Broker URL; the generator default applies when absent or empty
    #[serde(default)]
    pub connection_url: Option<String>,
    /// Queue the worker consumes from and replies to
    pub queue: String,
}

impl QueueTransport {
    /// Returns the configured URL, or `default` when none is set.
    ///
    /// # Examples
    ///
    /// ```
    /// use distributor_core::QueueTransport;
    ///
    /// let transport = QueueTransport { connection_url: Some(String::new()), queue: "q".into() };
    /// assert_eq!(transport.connection_url_or("amqp://localhost"), "amqp://localhost");
    /// ```
    #[must_use]
    pub fn connection_url_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.connection_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => default,
        }
    }
}

/// A server hosting remote functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Server id referenced by functions
    pub id: ServerId,
    /// Queue transport configuration, if the server speaks it
    #[serde(default)]
    pub rabbitmq: Option<QueueTransport>,
}

impl Server {
    /// Creates a queue-transport server using the default broker URL.
    #[must_use]
    pub fn rabbit(id: impl Into<ServerId>, queue: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rabbitmq: Some(QueueTransport {
                connection_url: None,
                queue: queue.into(),
            }),
        }
    }

    /// Sets the broker URL of a queue-transport server.
    #[must_use]
    pub fn with_connection_url(mut self, url: impl Into<String>) -> Self {
        if let Some(transport) = self.rabbitmq.as_mut() {
            transport.connection_url = Some(url.into());
        }
        self
    }
}

/// Raw shape of a declaration file, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeclarationFile {
    /// Function declarations in source order
    #[serde(default)]
    pub functions: Vec<Function>,
    /// Server registry
    #[serde(default)]
    pub servers: Vec<Server>,
}

/// Validated declaration list and server registry with lookup indexes.
///
/// Deserializing a `DeclarationModel` runs the same validation as
/// [`DeclarationModel::new`].
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "DeclarationFile")]
pub struct DeclarationModel {
    functions: Vec<Function>,
    servers: Vec<Server>,
    function_index: HashMap<FunctionName, usize>,
    server_index: HashMap<ServerId, usize>,
}

impl TryFrom<DeclarationFile> for DeclarationModel {
    type Error = Error;

    fn try_from(file: DeclarationFile) -> Result<Self> {
        Self::new(file.functions, file.servers)
    }
}

impl DeclarationModel {
    /// Builds and validates the model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if:
    /// - two functions share a name
    /// - two servers share an id
    /// - a function or parameter name is not a valid JavaScript identifier
    /// - a function or parameter name collides with a name the generated
    ///   worker binds itself (`amqp`, `channel`, `message`, ...)
    /// - a function declares the same parameter twice
    /// - a queue-transport server has an empty queue name
    pub fn new(functions: Vec<Function>, servers: Vec<Server>) -> Result<Self> {
        let mut function_index = HashMap::with_capacity(functions.len());
        for (position, function) in functions.iter().enumerate() {
            validate_function(function)?;
            if function_index
                .insert(function.name.clone(), position)
                .is_some()
            {
                return Err(Error::ValidationError {
                    field: "functions".to_string(),
                    reason: format!("duplicate function name '{}'", function.name),
                });
            }
        }

        let mut server_index = HashMap::with_capacity(servers.len());
        for (position, server) in servers.iter().enumerate() {
            if let Some(transport) = &server.rabbitmq
                && transport.queue.trim().is_empty()
            {
                return Err(Error::ValidationError {
                    field: "servers.rabbitmq.queue".to_string(),
                    reason: format!("server '{}' has an empty queue name", server.id),
                });
            }
            if server_index.insert(server.id.clone(), position).is_some() {
                return Err(Error::ValidationError {
                    field: "servers".to_string(),
                    reason: format!("duplicate server id '{}'", server.id),
                });
            }
        }

        tracing::debug!(
            functions = functions.len(),
            servers = servers.len(),
            "declaration model built"
        );

        Ok(Self {
            functions,
            servers,
            function_index,
            server_index,
        })
    }

    /// Parses and validates a JSON declaration document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationError`] for malformed JSON and the
    /// validation errors of [`DeclarationModel::new`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: DeclarationFile =
            serde_json::from_str(json).map_err(|e| Error::SerializationError {
                message: format!("invalid declaration document: {e}"),
                source: Some(e),
            })?;
        Self::try_from(file)
    }

    /// All functions in declaration order.
    #[must_use]
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// All servers in registry order.
    #[must_use]
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.function_index
            .get(name)
            .map(|&i| &self.functions[i])
    }

    /// Looks up a server by id.
    #[must_use]
    pub fn server(&self, id: &ServerId) -> Option<&Server> {
        self.server_index.get(id).map(|&i| &self.servers[i])
    }
}

/// Names bound at module or callback scope of a generated worker.
///
/// A function or parameter with one of these names would redeclare or
/// shadow a binding the worker itself relies on.
const WORKER_BINDINGS: &[&str] = &[
    "amqp",
    "shared",
    "connection",
    "channel",
    "queueName",
    "msg",
    "message",
    "console",
    "JSON",
    "Buffer",
];

/// Prefix of every worker start routine.
const START_ROUTINE_PREFIX: &str = "waitForCall";

fn validate_function(function: &Function) -> Result<()> {
    let name = function.name.as_str();
    if !is_js_identifier(name) {
        return Err(Error::ValidationError {
            field: "functions.name".to_string(),
            reason: format!("'{name}' is not a valid identifier"),
        });
    }
    if WORKER_BINDINGS.contains(&name) || name.starts_with(START_ROUTINE_PREFIX) {
        return Err(Error::ValidationError {
            field: "functions.name".to_string(),
            reason: format!("'{name}' collides with a binding of the generated worker"),
        });
    }

    let locals = [format!("result{name}"), format!("response{name}")];
    let mut seen = HashSet::with_capacity(function.parameters.len());
    for parameter in &function.parameters {
        let param = parameter.name.as_str();
        if !is_js_identifier(param) {
            return Err(Error::ValidationError {
                field: "functions.parameters".to_string(),
                reason: format!("parameter '{param}' of '{name}' is not a valid identifier"),
            });
        }
        if !seen.insert(param) {
            return Err(Error::ValidationError {
                field: "functions.parameters".to_string(),
                reason: format!("duplicate parameter '{param}' of '{name}'"),
            });
        }
        if WORKER_BINDINGS.contains(&param) || param == name || locals.iter().any(|l| l == param) {
            return Err(Error::ValidationError {
                field: "functions.parameters".to_string(),
                reason: format!(
                    "parameter '{param}' of '{name}' collides with a binding of the generated worker"
                ),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> DeclarationModel {
        DeclarationModel::new(
            vec![
                Function::new("add", "S1", Transport::Rabbit, &["a", "b"]),
                Function::new("fetch", "S2", Transport::from("http"), &["url"]),
            ],
            vec![
                Server::rabbit("S1", "jobs"),
                Server {
                    id: ServerId::new("S2"),
                    rabbitmq: None,
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_by_name() {
        let model = sample_model();
        assert_eq!(model.function("add").unwrap().server.as_str(), "S1");
        assert!(model.function("missing").is_none());
    }

    #[test]
    fn test_lookup_server() {
        let model = sample_model();
        assert!(model.server(&ServerId::new("S2")).is_some());
        assert!(model.server(&ServerId::new("S3")).is_none());
    }

    #[test]
    fn test_duplicate_function_names_rejected() {
        let err = DeclarationModel::new(
            vec![
                Function::new("add", "S1", Transport::Rabbit, &[]),
                Function::new("add", "S2", Transport::Rabbit, &[]),
            ],
            vec![],
        )
        .unwrap_err();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("duplicate function name 'add'"));
    }

    #[test]
    fn test_duplicate_server_ids_rejected() {
        let err = DeclarationModel::new(
            vec![],
            vec![Server::rabbit("S1", "a"), Server::rabbit("S1", "b")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate server id"));
    }

    #[test]
    fn test_invalid_parameter_rejected() {
        let err = DeclarationModel::new(
            vec![Function::new("add", "S1", Transport::Rabbit, &["a b"])],
            vec![],
        )
        .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_empty_queue_rejected() {
        let err = DeclarationModel::new(vec![], vec![Server::rabbit("S1", "  ")]).unwrap_err();
        assert!(err.to_string().contains("empty queue name"));
    }

    #[test]
    fn test_transport_case_insensitive() {
        assert!(Transport::from("rabbit").is_queue());
        assert!(Transport::from(" RaBbIt ").is_queue());
        assert!(!Transport::from("direct").is_queue());
    }

    #[test]
    fn test_from_json_accepts_both_parameter_shapes() {
        let json = r#"{
            "functions": [
                {"name": "add", "server": "S1", "method": "RABBIT", "parameters": [{"name": "a"}, "b"]}
            ],
            "servers": [
                {"id": "S1", "rabbitmq": {"connectionUrl": "amqp://broker:5672", "queue": "jobs"}}
            ]
        }"#;

        let model = DeclarationModel::from_json_str(json).unwrap();
        let add = model.function("add").unwrap();
        assert_eq!(add.parameter_names(), vec!["a", "b"]);
        assert!(add.uses_queue());

        let server = model.server(&ServerId::new("S1")).unwrap();
        let transport = server.rabbitmq.as_ref().unwrap();
        assert_eq!(transport.connection_url_or("x"), "amqp://broker:5672");
        assert_eq!(transport.queue, "jobs");
    }

    #[test]
    fn test_from_json_runs_validation() {
        let json = r#"{"functions": [
            {"name": "f", "server": "S1", "method": "rabbit"},
            {"name": "f", "server": "S1", "method": "rabbit"}
        ]}"#;
        assert!(DeclarationModel::from_json_str(json).unwrap_err().is_validation_error());
    }

    #[test]
    fn test_from_json_malformed() {
        let err = DeclarationModel::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, Error::SerializationError { .. }));
    }

    #[test]
    fn test_function_named_like_worker_import_rejected() {
        for name in ["amqp", "shared", "waitForCallS1"] {
            let err = DeclarationModel::new(
                vec![Function::new(name, "S1", Transport::Rabbit, &[])],
                vec![],
            )
            .unwrap_err();
            assert!(err.is_validation_error());
            assert!(err.to_string().contains(&format!("'{name}' collides")));
        }
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err = DeclarationModel::new(
            vec![Function::new("add", "S1", Transport::Rabbit, &["a", "a"])],
            vec![],
        )
        .unwrap_err();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("duplicate parameter 'a' of 'add'"));
    }

    #[test]
    fn test_parameter_shadowing_worker_local_rejected() {
        for param in ["channel", "message", "msg", "connection", "queueName"] {
            let err = DeclarationModel::new(
                vec![Function::new("send", "S1", Transport::Rabbit, &[param])],
                vec![],
            )
            .unwrap_err();
            assert!(err.to_string().contains(&format!("parameter '{param}' of 'send' collides")));
        }
    }

    #[test]
    fn test_parameter_shadowing_handler_locals_rejected() {
        for param in ["resultadd", "responseadd", "add"] {
            let err = DeclarationModel::new(
                vec![Function::new("add", "S1", Transport::Rabbit, &[param])],
                vec![],
            )
            .unwrap_err();
            assert!(err.is_validation_error(), "{param} accepted");
        }
    }

    #[test]
    fn test_handler_locals_of_other_functions_allowed() {
        let model = DeclarationModel::new(
            vec![
                Function::new("add", "S1", Transport::Rabbit, &["resultsub"]),
                Function::new("sub", "S1", Transport::Rabbit, &["a"]),
            ],
            vec![],
        );
        assert!(model.is_ok());
    }

    #[test]
    fn test_transport_serializes_as_tag() {
        let json = serde_json::to_string(&Transport::Rabbit).unwrap();
        assert_eq!(json, "\"RABBIT\"");
    }
}
