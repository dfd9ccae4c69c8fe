//! Sample tool host: prints tool schemas or invokes a tool with JSON arguments.
//!
//! ```text
//! basic-tools schema
//! basic-tools call add --args '{"a": "3", "b": 4}'
//! basic-tools call get_chat_id --chat-id 42
//! RUST_LOG=toolbind=debug basic-tools --separator _ call math_div --args '{"a": 1, "b": 0}'
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use toolbind::{Json, RegistryConfig, Scope, ToolArg, ToolRegistry, tool, tool_id};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "basic-tools")]
#[command(about = "Expose sample functions as LLM tools", long_about = None)]
struct Cli {
    /// Separator between group prefixes and tool names
    #[arg(long, default_value = ".")]
    separator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every tool schema as JSON
    Schema,
    /// Invoke a tool
    Call {
        /// Tool name
        name: String,
        /// Argument object
        #[arg(short, long, default_value = "{}")]
        args: String,
        /// Chat the call belongs to
        #[arg(long)]
        chat_id: Option<String>,
    },
}

/// Identifies the conversation a call belongs to.
#[derive(Clone, Debug, ToolArg)]
#[tool_arg(opaque)]
struct ChatId(String);

#[derive(Clone, Copy, Debug, Deserialize, Serialize, ToolArg)]
#[serde(rename_all = "lowercase")]
enum Priority {
    Low,
    Normal,
    Urgent,
}

#[derive(Debug, Deserialize, Serialize, ToolArg)]
struct Order {
    /// Catalogue item name
    item: String,
    /// How many units to ship
    quantity: u32,
    /// Shipping priority
    priority: Priority,
    /// Extra delivery instructions
    #[serde(rename = "note")]
    instructions: String,
}

/// Get the chat id
#[tool]
fn get_chat_id(chat: ChatId) -> String {
    chat.0
}

/// Adds two integers
/// a: the first term
/// b: the second term
#[tool]
fn add(a: i64, b: i64) -> i64 {
    a + b
}

/// Places an order and echoes the normalized request
/// order: what to ship
#[tool]
fn place_order(chat: ChatId, order: Order) -> Result<Json<Order>> {
    if order.quantity == 0 {
        bail!("chat {} ordered zero units of {}", chat.0, order.item);
    }
    Ok(Json(order))
}

/// Multiplies two numbers
/// a: the first factor
/// b: the second factor
#[tool]
fn mul(a: f64, b: f64) -> f64 {
    a * b
}

/// Divides two numbers
/// a: the dividend
/// b: the divisor
#[tool]
fn div(a: f64, b: f64) -> Result<f64> {
    if b == 0.0 {
        bail!("division by zero");
    }
    Ok(a / b)
}

fn build_registry(separator: &str) -> Result<ToolRegistry> {
    // Placeholder chat so registration knows `ChatId` is injected.
    let scope = Scope::new().with(ChatId(String::new()))?;
    let config = RegistryConfig::new().with_group_separator(separator);
    let mut registry = ToolRegistry::from_inventory(scope).with_config(config)?;

    registry.add(tool_id!(get_chat_id), get_chat_id)?;
    registry.add(tool_id!(add), add)?;
    registry.add(tool_id!(place_order), place_order)?;

    let mut math = registry.group("math");
    math.add(tool_id!(mul), mul)?;
    math.add(tool_id!(div), div)?;

    info!(tools = registry.len(), "registry ready");
    Ok(registry)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = build_registry(&cli.separator)?;

    match cli.command {
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&registry.schema_json()?)?);
        }
        Commands::Call {
            name,
            args,
            chat_id,
        } => {
            let args: Map<String, Value> =
                serde_json::from_str(&args).context("arguments must be a JSON object")?;
            let mut request = registry.scope().child();
            if let Some(chat_id) = chat_id {
                request.provide(ChatId(chat_id))?;
            }
            let out = registry.invoke(Some(&request), &name, args)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&out.unwrap_or(Value::Null))?
            );
        }
    }
    Ok(())
}
