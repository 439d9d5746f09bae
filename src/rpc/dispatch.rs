//! Request dispatch
//!
//! Turns a request body into zero or more JSON-RPC responses by validating
//! each request, binding its params and calling the backend.

use crate::rpc::backend::NotebookBackend;
use crate::rpc::protocol::*;
use crate::types::BridgeError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// The notebook methods and their parameter names, in positional order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Tables,
    Views,
    Columns,
    Execute,
    Metadata,
    Count,
    Page,
    Finish,
    Quit,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "tables" => Method::Tables,
            "views" => Method::Views,
            "columns" => Method::Columns,
            "execute" => Method::Execute,
            "metadata" => Method::Metadata,
            "count" => Method::Count,
            "page" => Method::Page,
            "finish" => Method::Finish,
            "quit" => Method::Quit,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Tables => "tables",
            Method::Views => "views",
            Method::Columns => "columns",
            Method::Execute => "execute",
            Method::Metadata => "metadata",
            Method::Count => "count",
            Method::Page => "page",
            Method::Finish => "finish",
            Method::Quit => "quit",
        }
    }

    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            Method::Columns => &["catalog", "schema", "table"],
            Method::Execute => &["sql"],
            Method::Page => &["max"],
            _ => &[],
        }
    }
}

/// What goes back over the wire for one HTTP request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Single(JsonRpcResponse),
    Batch(Vec<JsonRpcResponse>),
}

pub struct Dispatcher {
    backend: Arc<dyn NotebookBackend>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// `shutdown` is cancelled after a successful `quit`.
    pub fn new(backend: Arc<dyn NotebookBackend>, shutdown: CancellationToken) -> Self {
        Self { backend, shutdown }
    }

    /// Handle a raw body. `None` means nothing should be sent back (a single
    /// notification). A batch always answers with an array, possibly empty.
    pub async fn handle_body(&self, body: &[u8]) -> Option<Reply> {
        let payload: Value = match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("Unparseable request body: {}", e);
                return Some(Reply::Single(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, e),
                )));
            }
        };

        match payload {
            Value::Array(requests) => {
                debug!("Processing batch of {} request(s)", requests.len());
                let mut responses = Vec::with_capacity(requests.len());
                for request in requests {
                    if let Some(response) = self.handle_request(request).await {
                        responses.push(response);
                    }
                }
                Some(Reply::Batch(responses))
            }
            Value::Object(_) => self.handle_request(payload).await.map(Reply::Single),
            _ => Some(Reply::Single(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::invalid_request("Request must be an object or an array"),
            ))),
        }
    }

    async fn handle_request(&self, raw: Value) -> Option<JsonRpcResponse> {
        let request = match JsonRpcRequest::validate(&raw) {
            Ok(request) => request,
            Err(error) => return Some(JsonRpcResponse::failure(Value::Null, error)),
        };

        let outcome = self.call(&request).await;
        if request.is_notification() {
            return None;
        }

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::failure(request.id, error),
        })
    }

    async fn call(&self, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        let method = Method::from_name(&request.method)
            .ok_or_else(|| JsonRpcError::method_not_found(&request.method))?;
        let mut args = bind_params(method, request.params.clone())?.into_iter();

        debug!("Calling {}()", method.name());

        let result = match method {
            Method::Tables => encode(self.backend.tables().await),
            Method::Views => encode(self.backend.views().await),
            Method::Columns => {
                let catalog: Option<String> = next_arg(method, "catalog", &mut args)?;
                let schema: Option<String> = next_arg(method, "schema", &mut args)?;
                let table: Option<String> = next_arg(method, "table", &mut args)?;
                encode(self.backend.columns(catalog, schema, table).await)
            }
            Method::Execute => {
                let sql: String = next_arg(method, "sql", &mut args)?;
                acknowledge(self.backend.execute(sql).await)
            }
            Method::Metadata => encode(self.backend.metadata().await),
            Method::Count => encode(self.backend.count().await),
            Method::Page => {
                let max: i64 = next_arg(method, "max", &mut args)?;
                // Non-positive sizes become 0, which the backend rejects once
                // it has checked for an active query.
                let max = usize::try_from(max).unwrap_or(0);
                encode(self.backend.page(max).await)
            }
            Method::Finish => acknowledge(self.backend.finish().await),
            Method::Quit => {
                let result = acknowledge(self.backend.quit().await);
                if result.is_ok() {
                    info!("quit() received; shutting down");
                    self.shutdown.cancel();
                }
                result
            }
        };

        if let Err(e) = &result {
            error!("{}() failed: {}", method.name(), e);
        }

        result.map_err(JsonRpcError::internal)
    }
}

/// Match params to `method`'s parameter list, the way a positional or
/// keyword call would.
fn bind_params(method: Method, params: Option<Value>) -> Result<Vec<Value>, JsonRpcError> {
    let names = method.param_names();

    match params {
        None if names.is_empty() => Ok(Vec::new()),
        None => Err(JsonRpcError::invalid_params(format!(
            "{}() missing required argument(s): {}",
            method.name(),
            names.join(", ")
        ))),
        Some(Value::Array(values)) => {
            if values.len() != names.len() {
                return Err(JsonRpcError::invalid_params(format!(
                    "{}() takes {} positional argument(s) but {} were given",
                    method.name(),
                    names.len(),
                    values.len()
                )));
            }
            Ok(values)
        }
        Some(Value::Object(mut named)) => {
            let mut bound = Vec::with_capacity(names.len());
            for name in names {
                let value = named.remove(*name).ok_or_else(|| {
                    JsonRpcError::invalid_params(format!(
                        "{}() missing required argument: '{}'",
                        method.name(),
                        name
                    ))
                })?;
                bound.push(value);
            }
            if let Some(unexpected) = named.keys().next() {
                return Err(JsonRpcError::invalid_params(format!(
                    "{}() got an unexpected argument '{}'",
                    method.name(),
                    unexpected
                )));
            }
            Ok(bound)
        }
        Some(_) => Err(JsonRpcError::invalid_params(
            "params must be an array or an object",
        )),
    }
}

fn next_arg<T: DeserializeOwned>(
    method: Method,
    name: &str,
    args: &mut impl Iterator<Item = Value>,
) -> Result<T, JsonRpcError> {
    let value = args.next().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        JsonRpcError::invalid_params(format!("{}(): invalid '{}': {}", method.name(), name, e))
    })
}

fn encode<T: Serialize>(result: Result<T, BridgeError>) -> Result<Value, BridgeError> {
    Ok(serde_json::to_value(result?)?)
}

fn acknowledge(result: Result<(), BridgeError>) -> Result<Value, BridgeError> {
    result.map(|()| Value::Bool(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odbc::{ColumnInfo, ResultColumn, Row, TableInfo};
    use crate::types::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory backend with one canned result set.
    #[derive(Default)]
    struct FakeBackend {
        state: Mutex<FakeState>,
    }

    #[derive(Default)]
    struct FakeState {
        active: bool,
        cursor: usize,
        calls: Vec<String>,
    }

    const ROWS: [&str; 3] = ["a", "b", "c"];

    #[async_trait]
    impl NotebookBackend for FakeBackend {
        async fn tables(&self) -> Result<Vec<TableInfo>> {
            self.state.lock().unwrap().calls.push("tables".into());
            Ok(vec![TableInfo {
                catalog: String::new(),
                schema: "main".into(),
                table: "orders".into(),
            }])
        }

        async fn views(&self) -> Result<Vec<TableInfo>> {
            Ok(Vec::new())
        }

        async fn columns(
            &self,
            catalog: Option<String>,
            schema: Option<String>,
            table: Option<String>,
        ) -> Result<Vec<ColumnInfo>> {
            Ok(vec![ColumnInfo {
                catalog: catalog.unwrap_or_default(),
                schema: schema.unwrap_or_default(),
                table: table.unwrap_or_default(),
                column: "id".into(),
                datatype: "INTEGER".into(),
            }])
        }

        async fn execute(&self, sql: String) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if state.active {
                return Err(BridgeError::QueryActive("execute"));
            }
            state.calls.push(sql);
            state.active = true;
            state.cursor = 0;
            Ok(())
        }

        async fn metadata(&self) -> Result<Vec<ResultColumn>> {
            if !self.state.lock().unwrap().active {
                return Err(BridgeError::NoActiveQuery("metadata"));
            }
            Ok(vec![ResultColumn {
                column: "letter".into(),
                datatype: "str".into(),
            }])
        }

        async fn count(&self) -> Result<i64> {
            if !self.state.lock().unwrap().active {
                return Err(BridgeError::NoActiveQuery("count"));
            }
            Ok(-1)
        }

        async fn page(&self, max: usize) -> Result<Vec<Row>> {
            let mut state = self.state.lock().unwrap();
            if !state.active {
                return Err(BridgeError::NoActiveQuery("page"));
            }
            if max == 0 {
                return Err(BridgeError::InvalidPageSize);
            }
            let start = state.cursor;
            let end = (start + max).min(ROWS.len());
            state.cursor = end;
            Ok(ROWS[start..end]
                .iter()
                .map(|letter| {
                    let mut row = Row::new();
                    row.insert("letter".into(), json!(letter));
                    row
                })
                .collect())
        }

        async fn finish(&self) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if !state.active {
                return Err(BridgeError::NoActiveQuery("finish"));
            }
            state.active = false;
            Ok(())
        }

        async fn quit(&self) -> Result<()> {
            if self.state.lock().unwrap().active {
                return Err(BridgeError::QueryActive("quit"));
            }
            Ok(())
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<FakeBackend>, CancellationToken) {
        let backend = Arc::new(FakeBackend::default());
        let token = CancellationToken::new();
        (
            Dispatcher::new(backend.clone(), token.clone()),
            backend,
            token,
        )
    }

    async fn call(dispatcher: &Dispatcher, request: Value) -> Value {
        let reply = dispatcher
            .handle_body(request.to_string().as_bytes())
            .await
            .expect("expected a reply");
        serde_json::to_value(reply).unwrap()
    }

    fn request(id: i64, method: &str, params: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
    }

    #[tokio::test]
    async fn test_tables_without_params() {
        let (dispatcher, _, _) = dispatcher();
        let reply = call(
            &dispatcher,
            json!({"jsonrpc": "2.0", "id": "t", "method": "tables"}),
        )
        .await;

        assert_eq!(reply["id"], json!("t"));
        assert_eq!(
            reply["result"],
            json!([{"catalog": "", "schema": "main", "table": "orders"}])
        );
    }

    #[tokio::test]
    async fn test_query_lifecycle() {
        let (dispatcher, _, _) = dispatcher();

        let reply = call(&dispatcher, request(1, "execute", json!(["SELECT 1"]))).await;
        assert_eq!(reply["result"], json!(true));

        let reply = call(&dispatcher, request(2, "metadata", json!([]))).await;
        assert_eq!(reply["result"], json!([{"column": "letter", "datatype": "str"}]));

        let reply = call(&dispatcher, request(3, "page", json!({"max": 2}))).await;
        assert_eq!(reply["result"], json!([{"letter": "a"}, {"letter": "b"}]));

        let reply = call(&dispatcher, request(4, "page", json!([2]))).await;
        assert_eq!(reply["result"], json!([{"letter": "c"}]));

        let reply = call(&dispatcher, request(5, "page", json!([2]))).await;
        assert_eq!(reply["result"], json!([]));

        let reply = call(&dispatcher, request(6, "count", json!([]))).await;
        assert_eq!(reply["result"], json!(-1));

        let reply = call(&dispatcher, request(7, "finish", json!([]))).await;
        assert_eq!(reply["result"], json!(true));
    }

    #[tokio::test]
    async fn test_state_violations_are_internal_errors() {
        let (dispatcher, _, _) = dispatcher();

        let reply = call(&dispatcher, request(1, "page", json!([10]))).await;
        assert_eq!(reply["error"]["code"], json!(INTERNAL_ERROR));
        assert_eq!(reply["error"]["message"], json!("Internal Error"));
        assert_eq!(
            reply["error"]["data"]["stacktrace"],
            json!("Must have active query before calling page()")
        );

        call(&dispatcher, request(2, "execute", json!(["SELECT 1"]))).await;
        let reply = call(&dispatcher, request(3, "execute", json!(["SELECT 2"]))).await;
        assert_eq!(reply["error"]["code"], json!(INTERNAL_ERROR));

        let reply = call(&dispatcher, request(4, "page", json!([0]))).await;
        assert_eq!(
            reply["error"]["data"]["stacktrace"],
            json!("Page size must be a positive integer")
        );

        let reply = call(&dispatcher, request(5, "page", json!([-3]))).await;
        assert_eq!(reply["error"]["code"], json!(INTERNAL_ERROR));
    }

    #[tokio::test]
    async fn test_param_binding_errors() {
        let (dispatcher, _, _) = dispatcher();

        let cases = [
            request(1, "execute", json!([])),
            request(2, "execute", json!(["a", "b"])),
            request(3, "execute", json!({"query": "SELECT 1"})),
            request(4, "execute", json!({"sql": "SELECT 1", "extra": 1})),
            request(5, "page", json!(["ten"])),
            request(6, "tables", json!([1])),
            json!({"jsonrpc": "2.0", "id": 7, "method": "columns"}),
        ];

        for case in cases {
            let reply = call(&dispatcher, case.clone()).await;
            assert_eq!(reply["error"]["code"], json!(INVALID_PARAMS), "case {}", case);
            assert_eq!(reply["id"], case["id"]);
        }
    }

    #[tokio::test]
    async fn test_columns_accepts_nulls() {
        let (dispatcher, _, _) = dispatcher();
        let reply = call(
            &dispatcher,
            request(1, "columns", json!({"catalog": null, "schema": "dbo", "table": "t"})),
        )
        .await;
        assert_eq!(reply["result"][0]["schema"], json!("dbo"));
        assert_eq!(reply["result"][0]["catalog"], json!(""));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (dispatcher, _, _) = dispatcher();
        let reply = call(&dispatcher, request(9, "drop_everything", json!([]))).await;
        assert_eq!(reply["error"]["code"], json!(METHOD_NOT_FOUND));
        assert_eq!(reply["id"], json!(9));
    }

    #[tokio::test]
    async fn test_parse_error() {
        let (dispatcher, _, _) = dispatcher();
        let reply = dispatcher.handle_body(b"{not json").await.unwrap();
        let reply = serde_json::to_value(reply).unwrap();
        assert_eq!(reply["error"]["code"], json!(PARSE_ERROR));
        assert_eq!(reply["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_scalar_payload_is_invalid_request() {
        let (dispatcher, _, _) = dispatcher();
        let reply = call(&dispatcher, json!(42)).await;
        assert_eq!(reply["error"]["code"], json!(INVALID_REQUEST));
    }

    #[tokio::test]
    async fn test_invalid_request_always_answers_with_null_id() {
        let (dispatcher, _, _) = dispatcher();
        let reply = call(&dispatcher, json!({"jsonrpc": "1.0", "id": 3, "method": "tables"})).await;
        assert_eq!(reply["error"]["code"], json!(INVALID_REQUEST));
        assert_eq!(reply["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_notification_runs_but_gets_no_reply() {
        let (dispatcher, backend, _) = dispatcher();
        let body = json!({"jsonrpc": "2.0", "method": "execute", "params": ["SELECT 1"]});
        assert!(dispatcher.handle_body(body.to_string().as_bytes()).await.is_none());
        assert!(backend.state.lock().unwrap().active);

        let body = json!({"jsonrpc": "2.0", "id": null, "method": "nope"});
        assert!(dispatcher.handle_body(body.to_string().as_bytes()).await.is_none());
    }

    #[tokio::test]
    async fn test_batch_drops_notification_responses() {
        let (dispatcher, backend, _) = dispatcher();
        let reply = call(
            &dispatcher,
            json!([
                {"jsonrpc": "2.0", "id": 1, "method": "tables"},
                {"jsonrpc": "2.0", "method": "tables"},
                {"jsonrpc": "2.0", "id": 2, "method": "nope"},
                {"bogus": true}
            ]),
        )
        .await;

        let responses = reply.as_array().unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], json!(1));
        assert_eq!(responses[1]["error"]["code"], json!(METHOD_NOT_FOUND));
        assert_eq!(responses[2]["error"]["code"], json!(INVALID_REQUEST));
        assert_eq!(backend.state.lock().unwrap().calls, vec!["tables", "tables"]);
    }

    #[tokio::test]
    async fn test_batch_of_notifications_answers_empty_array() {
        let (dispatcher, _, _) = dispatcher();
        let reply = call(&dispatcher, json!([{"jsonrpc": "2.0", "method": "tables"}])).await;
        assert_eq!(reply, json!([]));
    }

    #[tokio::test]
    async fn test_quit_cancels_shutdown_token() {
        let (dispatcher, _, token) = dispatcher();

        call(&dispatcher, request(1, "execute", json!(["SELECT 1"]))).await;
        let reply = call(&dispatcher, request(2, "quit", json!([]))).await;
        assert_eq!(reply["error"]["code"], json!(INTERNAL_ERROR));
        assert!(!token.is_cancelled());

        call(&dispatcher, request(3, "finish", json!([]))).await;
        let reply = call(&dispatcher, request(4, "quit", json!([]))).await;
        assert_eq!(reply["result"], json!(true));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in [
            Method::Tables,
            Method::Views,
            Method::Columns,
            Method::Execute,
            Method::Metadata,
            Method::Count,
            Method::Page,
            Method::Finish,
            Method::Quit,
        ] {
            assert_eq!(Method::from_name(method.name()), Some(method));
        }
        assert_eq!(Method::from_name("set_shutdown"), None);
    }
}
