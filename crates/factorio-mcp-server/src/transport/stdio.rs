//! stdio transport for MCP JSON-RPC
//!
//! One JSON object per line in each direction. Lines that do not parse are
//! logged and skipped; requests without an id are notifications and are
//! never answered.

use crate::FactorioMcpServer;
use crate::error::{Result, ServerError, error_codes};
use crate::mcp::{
    DEFAULT_PROTOCOL_VERSION, InitializeParams, InitializeResult, Request, RequestId, Response,
    ServerCapabilities, ToolsCapability,
};
use crate::tools::handle_tool_call;
use factorio_rcon::CommandExecutor;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Run the MCP server on stdio
pub async fn run<X: CommandExecutor>(server: &FactorioMcpServer<X>) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();

    info!("Factorio MCP server starting on stdio");

    serve(server, reader, writer).await
}

/// Serve requests from `reader` until EOF, answering on `writer`.
///
/// The executor is shut down once the input ends.
pub async fn serve<X, R, W>(server: &FactorioMcpServer<X>, mut reader: R, mut writer: W) -> Result<()>
where
    X: CommandExecutor,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| ServerError::Io(format!("Failed to read stdin: {}", e)))?;

        if bytes_read == 0 {
            info!("Client disconnected (EOF)");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        debug!("Received: {}", trimmed);

        let request: Request = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                continue;
            }
        };

        let Some(id) = request.id.clone() else {
            debug!("Notification: {}", request.method);
            continue;
        };

        let response = handle_request(&request, id, server).await;
        let response_json = serde_json::to_string(&response)?;

        debug!("Sending: {}", response_json);

        writer
            .write_all(response_json.as_bytes())
            .await
            .map_err(|e| ServerError::Io(format!("Failed to write stdout: {}", e)))?;
        writer
            .write_all(b"\n")
            .await
            .map_err(|e| ServerError::Io(format!("Failed to write newline: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| ServerError::Io(format!("Failed to flush stdout: {}", e)))?;
    }

    server.executor().shutdown().await;

    Ok(())
}

async fn handle_request<X: CommandExecutor>(
    request: &Request,
    id: RequestId,
    server: &FactorioMcpServer<X>,
) -> Response {
    match request.method.as_str() {
        "initialize" => handle_initialize(request, id, server),
        "ping" => Response::success(id, serde_json::json!({})),
        "tools/list" => handle_tools_list(id, server),
        "tools/call" => handle_tools_call(request, id, server).await,
        _ => Response::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        ),
    }
}

fn handle_initialize<X: CommandExecutor>(
    request: &Request,
    id: RequestId,
    server: &FactorioMcpServer<X>,
) -> Response {
    let params: InitializeParams = if request.params.is_null() {
        InitializeParams::default()
    } else {
        match serde_json::from_value(request.params.clone()) {
            Ok(p) => p,
            Err(e) => {
                return Response::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid initialize params: {}", e),
                );
            }
        }
    };

    if let Some(client) = &params.client_info {
        info!("Client connected: {} {}", client.name, client.version);
    }

    let result = InitializeResult {
        protocol_version: params
            .protocol_version
            .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string()),
        capabilities: ServerCapabilities {
            tools: ToolsCapability {
                list_changed: false,
            },
        },
        server_info: server.info().clone(),
    };

    to_response(id, &result)
}

fn handle_tools_list<X: CommandExecutor>(id: RequestId, server: &FactorioMcpServer<X>) -> Response {
    let tools = server.registry().definitions();
    Response::success(id, serde_json::json!({ "tools": tools }))
}

async fn handle_tools_call<X: CommandExecutor>(
    request: &Request,
    id: RequestId,
    server: &FactorioMcpServer<X>,
) -> Response {
    #[derive(Deserialize)]
    struct ToolCallParams {
        name: String,
        #[serde(default)]
        arguments: serde_json::Value,
    }

    let params: ToolCallParams = match serde_json::from_value(request.params.clone()) {
        Ok(p) => p,
        Err(e) => {
            return Response::error(
                id,
                error_codes::INVALID_PARAMS,
                format!("Invalid tool call params: {}", e),
            );
        }
    };

    handle_tool_call(
        &params.name,
        params.arguments,
        id,
        server.executor().as_ref(),
        server.registry(),
    )
    .await
}

fn to_response<T: serde::Serialize>(id: RequestId, result: &T) -> Response {
    match serde_json::to_value(result) {
        Ok(value) => Response::success(id, value),
        Err(e) => Response::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use factorio_rcon::{RconError, Result as RconResult};
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct FakeConsole {
        commands: Mutex<Vec<String>>,
        shut_down: AtomicBool,
    }

    #[async_trait]
    impl CommandExecutor for FakeConsole {
        async fn execute(&self, command: &str) -> RconResult<String> {
            self.commands.lock().unwrap().push(command.to_string());
            match command {
                "/time" => Ok("1 hour".to_string()),
                "/broken" => Err(RconError::Connection("Connection closed".to_string())),
                _ => Ok(String::new()),
            }
        }

        async fn shutdown(&self) {
            self.shut_down.store(true, Ordering::SeqCst);
        }
    }

    async fn exchange(input: &str) -> (Vec<serde_json::Value>, Arc<FakeConsole>) {
        let console = Arc::new(FakeConsole::default());
        let server = FactorioMcpServer::new(console.clone(), "factorio-test");
        let mut output = Vec::new();

        serve(&server, input.as_bytes(), &mut output).await.unwrap();

        let responses = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (responses, console)
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let (responses, _) = exchange(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"agent","version":"1.0"}}}"#,
            "\n"
        ))
        .await;

        let result = &responses[0]["result"];
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "factorio-test");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_initialize_without_params() {
        let (responses, _) = exchange("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\"}\n").await;
        assert_eq!(responses[0]["result"]["protocolVersion"], DEFAULT_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_notifications_and_garbage_get_no_reply() {
        let (responses, _) = exchange(concat!(
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "this is not json\n",
            "\n",
            "{\"jsonrpc\":\"2.0\",\"id\":\"p\",\"method\":\"ping\"}\n",
        ))
        .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], "p");
        assert_eq!(responses[0]["result"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_tools_list() {
        let (responses, _) =
            exchange("{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n").await;

        let tools = responses[0]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 7);
        assert_eq!(tools[0]["name"], "execute_command");
        assert_eq!(tools[0]["inputSchema"]["required"][0], "command");
    }

    #[tokio::test]
    async fn test_tools_call_roundtrip() {
        let (responses, console) = exchange(concat!(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"execute_command","arguments":{"command":"/time"}}}"#,
            "\n"
        ))
        .await;

        assert_eq!(responses[0]["id"], 3);
        assert_eq!(
            responses[0]["result"],
            serde_json::json!({ "content": [{ "type": "text", "text": "1 hour" }] })
        );
        assert_eq!(*console.commands.lock().unwrap(), ["/time"]);
    }

    #[tokio::test]
    async fn test_tool_failure_is_a_result_not_an_rpc_error() {
        let (responses, _) = exchange(concat!(
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"execute_command","arguments":{"command":"/broken"}}}"#,
            "\n"
        ))
        .await;

        let result = &responses[0]["result"];
        assert!(responses[0].get("error").is_none());
        assert_eq!(result["isError"], true);
        assert_eq!(
            result["content"][0]["text"],
            "Error: Connection error: Connection closed"
        );
    }

    #[tokio::test]
    async fn test_bad_call_params_and_unknown_method() {
        let (responses, _) = exchange(concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":5,\"method\":\"tools/call\",\"params\":{}}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":6,\"method\":\"resources/list\"}\n",
        ))
        .await;

        assert_eq!(responses[0]["error"]["code"], error_codes::INVALID_PARAMS);
        assert_eq!(responses[1]["error"]["code"], error_codes::METHOD_NOT_FOUND);
        assert_eq!(
            responses[1]["error"]["message"],
            "Method not found: resources/list"
        );
    }

    #[tokio::test]
    async fn test_eof_shuts_down_executor() {
        let (responses, console) = exchange("").await;
        assert!(responses.is_empty());
        assert!(console.shut_down.load(Ordering::SeqCst));
    }

    struct Tick;

    #[async_trait]
    impl crate::ToolHandler for Tick {
        async fn call(
            &self,
            rcon: &dyn CommandExecutor,
            _args: serde_json::Value,
        ) -> crate::Result<String> {
            Ok(rcon.lua("rcon.print(game.tick)").await?)
        }
    }

    #[tokio::test]
    async fn test_custom_registry_replaces_builtin_tools() {
        let mut registry = crate::ToolRegistry::new();
        registry.register(
            crate::ToolDef {
                name: "tick".into(),
                description: "Current tick".into(),
                input_schema: serde_json::json!({ "type": "object", "properties": {} }),
            },
            Tick,
        );

        let console = Arc::new(FakeConsole::default());
        let server =
            FactorioMcpServer::new(console.clone(), "factorio-test").with_registry(registry);
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"tick\"}}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"tools/call\",\"params\":{\"name\":\"get_players\"}}\n",
        );
        let mut output = Vec::new();
        serve(&server, input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        let tools = responses[0]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "tick");
        assert_eq!(responses[1]["result"]["content"][0]["text"], "");
        assert_eq!(responses[2]["error"]["code"], error_codes::INVALID_PARAMS);
        assert_eq!(
            *console.commands.lock().unwrap(),
            ["/c rcon.print(game.tick)"]
        );
    }
}
