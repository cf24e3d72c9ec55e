//! MCP tool handlers for the Factorio console

use crate::error::{Result, ServerError, error_codes};
use crate::mcp::{CallToolResult, RequestId, Response};
use crate::registry::{ToolDef, ToolHandler, ToolRegistry};
use async_trait::async_trait;
use factorio_rcon::CommandExecutor;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{error, info};

/// Shown for commands that print nothing
const NO_OUTPUT: &str = "(no output)";

/// Item used by get_production when none is given
const DEFAULT_PRODUCTION_ITEM: &str = "iron-plate";

/// Build the registry with every Factorio tool
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(
        ToolDef {
            name: "execute_command".into(),
            description: "Execute a Factorio console command".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The console command to execute"
                    }
                },
                "required": ["command"]
            }),
        },
        ExecuteCommand,
    );

    registry.register(
        ToolDef {
            name: "get_game_info".into(),
            description: "Get current game information and statistics".into(),
            input_schema: empty_schema(),
        },
        GetGameInfo,
    );

    registry.register(
        ToolDef {
            name: "get_players".into(),
            description: "Get list of online players and their status".into(),
            input_schema: empty_schema(),
        },
        GetPlayers,
    );

    registry.register(
        ToolDef {
            name: "run_lua".into(),
            description: "Execute Lua code in the Factorio environment".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Lua code to execute"
                    },
                    "print_result": {
                        "type": "boolean",
                        "description": "Whether to return the result via rcon.print (default: true)"
                    }
                },
                "required": ["code"]
            }),
        },
        RunLua,
    );

    registry.register(
        ToolDef {
            name: "get_evolution".into(),
            description: "Get current evolution factor and enemy statistics".into(),
            input_schema: empty_schema(),
        },
        GetEvolution,
    );

    registry.register(
        ToolDef {
            name: "get_research".into(),
            description: "Get current and queued research progress".into(),
            input_schema: empty_schema(),
        },
        GetResearch,
    );

    registry.register(
        ToolDef {
            name: "get_production".into(),
            description:
                "Get production statistics for items (requires production statistics to be enabled)"
                    .into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "item": {
                        "type": "string",
                        "description": "Optional: specific item to get stats for (e.g., \"iron-plate\")"
                    }
                }
            }),
        },
        GetProduction,
    );

    registry
}

fn empty_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {}
    })
}

/// Handle a tools/call request
pub async fn handle_tool_call(
    name: &str,
    args: serde_json::Value,
    id: RequestId,
    rcon: &dyn CommandExecutor,
    registry: &ToolRegistry,
) -> Response {
    info!("Tool called: {}", name);

    let result = match registry.call(name, rcon, args).await {
        Ok(text) => CallToolResult::text(text),
        Err(ServerError::UnknownTool(tool)) => {
            return Response::error(
                id,
                error_codes::INVALID_PARAMS,
                format!("Unknown tool: {}", tool),
            );
        }
        Err(e) => {
            error!(tool = name, error = %e, "Tool call failed");
            CallToolResult::error(format!("Error: {}", e))
        }
    };

    match serde_json::to_value(result) {
        Ok(value) => Response::success(id, value),
        Err(e) => Response::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}

/// Parse tool arguments; a missing argument object means all defaults
fn parse_args<T: DeserializeOwned + Default>(args: serde_json::Value) -> Result<T> {
    if args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args).map_err(|e| ServerError::InvalidArguments(e.to_string()))
}

/// Quote a value for interpolation into a Lua chunk
fn lua_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn or_unknown(value: String) -> String {
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        value
    }
}

fn or_no_output(value: String) -> String {
    if value.is_empty() {
        NO_OUTPUT.to_string()
    } else {
        value
    }
}

/// execute_command: run a raw console command
pub struct ExecuteCommand;

#[derive(Debug, Default, Deserialize)]
struct ExecuteCommandParams {
    #[serde(default)]
    command: String,
}

#[async_trait]
impl ToolHandler for ExecuteCommand {
    async fn call(&self, rcon: &dyn CommandExecutor, args: serde_json::Value) -> Result<String> {
        let p: ExecuteCommandParams = parse_args(args)?;
        if p.command.trim().is_empty() {
            return Err(ServerError::InvalidArguments("Command is required".to_string()));
        }

        Ok(or_no_output(rcon.execute(&p.command).await?))
    }
}

/// get_game_info: tick, speed and player count
pub struct GetGameInfo;

#[async_trait]
impl ToolHandler for GetGameInfo {
    async fn call(&self, rcon: &dyn CommandExecutor, _args: serde_json::Value) -> Result<String> {
        let tick = rcon.lua("rcon.print(game.tick)").await?;
        let speed = rcon.lua("rcon.print(game.speed)").await?;
        let players = rcon.execute("/players count").await?;

        Ok(format!(
            "Game Info:\n- Tick: {}\n- Speed: {}\n- Players: {}",
            or_unknown(tick),
            or_unknown(speed),
            or_unknown(players)
        ))
    }
}

/// get_players: player list with totals
pub struct GetPlayers;

#[async_trait]
impl ToolHandler for GetPlayers {
    async fn call(&self, rcon: &dyn CommandExecutor, _args: serde_json::Value) -> Result<String> {
        let list = rcon.execute("/players").await?;
        let total = rcon.lua("rcon.print(#game.players)").await?;
        let connected = rcon.lua("rcon.print(#game.connected_players)").await?;

        Ok(format!(
            "Players:\n- Total: {}\n- Connected: {}\n\n{}",
            total, connected, list
        ))
    }
}

/// run_lua: execute a Lua chunk, printing its value by default
pub struct RunLua;

#[derive(Debug, Default, Deserialize)]
struct RunLuaParams {
    #[serde(default)]
    code: String,
    #[serde(default)]
    print_result: Option<bool>,
}

impl RunLuaParams {
    fn chunk(&self) -> String {
        if self.print_result.unwrap_or(true) && !self.code.contains("rcon.print") {
            format!("rcon.print(tostring({}))", self.code)
        } else {
            self.code.clone()
        }
    }
}

#[async_trait]
impl ToolHandler for RunLua {
    async fn call(&self, rcon: &dyn CommandExecutor, args: serde_json::Value) -> Result<String> {
        let p: RunLuaParams = parse_args(args)?;
        if p.code.trim().is_empty() {
            return Err(ServerError::InvalidArguments("Lua code is required".to_string()));
        }

        Ok(or_no_output(rcon.lua(&p.chunk()).await?))
    }
}

/// get_evolution: enemy evolution factor and kills
pub struct GetEvolution;

#[async_trait]
impl ToolHandler for GetEvolution {
    async fn call(&self, rcon: &dyn CommandExecutor, _args: serde_json::Value) -> Result<String> {
        let factor = rcon
            .lua(r#"rcon.print(game.forces["enemy"].evolution_factor)"#)
            .await?;
        let kills = rcon
            .lua(r#"rcon.print(game.forces["enemy"].kill_count_statistics.get_input_count("character"))"#)
            .await?;

        Ok(format!(
            "Evolution:\n- Factor: {}\n- Player kills: {}",
            factor, kills
        ))
    }
}

/// get_research: current research and its progress
pub struct GetResearch;

#[async_trait]
impl ToolHandler for GetResearch {
    async fn call(&self, rcon: &dyn CommandExecutor, _args: serde_json::Value) -> Result<String> {
        let current = rcon
            .lua(r#"local r = game.forces["player"].current_research; rcon.print(r and r.name or "none")"#)
            .await?;
        let progress = rcon
            .lua(r#"rcon.print(game.forces["player"].research_progress)"#)
            .await?;

        Ok(format!(
            "Research:\n- Current: {}\n- Progress: {}",
            current, progress
        ))
    }
}

/// get_production: produced/consumed counts for one item.
///
/// Older saves have no production statistics; the tool then reports the
/// number of assembling machines instead. Failures are returned as text.
pub struct GetProduction;

#[derive(Debug, Default, Deserialize)]
struct GetProductionParams {
    #[serde(default)]
    item: Option<String>,
}

#[async_trait]
impl ToolHandler for GetProduction {
    async fn call(&self, rcon: &dyn CommandExecutor, args: serde_json::Value) -> Result<String> {
        let p: GetProductionParams = parse_args(args)?;
        let item = p
            .item
            .filter(|item| !item.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PRODUCTION_ITEM.to_string());

        match production_stats(rcon, &item).await {
            Ok(text) => Ok(text),
            Err(e) => Ok(format!("Unable to get production statistics: {}", e)),
        }
    }
}

async fn production_stats(rcon: &dyn CommandExecutor, item: &str) -> Result<String> {
    let available = rcon
        .lua(concat!(
            r#"if game.forces["player"].item_production_statistics then "#,
            r#"rcon.print("available") else rcon.print("unavailable") end"#
        ))
        .await?;

    if available == "unavailable" {
        let machines = rcon
            .lua(concat!(
                r#"local count = game.surfaces[1].count_entities_filtered({type="assembling-machine"}); "#,
                r#"rcon.print("Factory has " .. count .. " assembling machines")"#
            ))
            .await?;
        return Ok(format!(
            "Production statistics not available in this Factorio version.\n{}",
            machines
        ));
    }

    let item_literal = lua_string(item);
    let stats = rcon
        .lua(&format!(
            concat!(
                r#"local stats = game.forces["player"].item_production_statistics; "#,
                "local input = stats.get_input_count({item}); ",
                "local output = stats.get_output_count({item}); ",
                r#"rcon.print("Produced: " .. output .. ", Consumed: " .. input)"#
            ),
            item = item_literal
        ))
        .await?;

    Ok(format!("Production stats for '{}':\n{}", item, stats))
}
