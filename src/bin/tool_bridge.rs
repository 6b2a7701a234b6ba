//! tool-bridge: 工具调用解析、JSON 修复与提示词生成的命令行工具
//!
//! Usage:
//!   tool-bridge repair                       Repair JSON read from stdin
//!   tool-bridge parse [--native]             Parse tool calls from a model reply on stdin
//!   tool-bridge prompt <tools.json>          Render the prompt-injection prompt for stdin
//!   tool-bridge call <tools.json> <reply>    Dry-run the orchestrator against a canned reply

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use ai_tool_bridge::orchestrator::{invoke_fn, probe_fn, InvokeRequest};
use ai_tool_bridge::repair::{repair_json_with_stage, RepairStage};
use ai_tool_bridge::{
    FunctionCallingAdapter, OrchestratorConfig, PromptInjectionAdapter, RawResponse, ToolAdapter,
    ToolDescriptor, ToolOrchestrator,
};

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }
    if let Err(e) = ai_tool_bridge::telemetry::init_tracing_with_default("warn") {
        eprintln!("warning: {e}");
    }

    let outcome = match args[1].as_str() {
        "repair" => cmd_repair(),
        "parse" => cmd_parse(&args[2..]),
        "prompt" => cmd_prompt(&args[2..]).await,
        "call" => cmd_call(&args[2..]).await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"tool-bridge: 工具调用命令行工具

USAGE:
    tool-bridge <COMMAND> [OPTIONS]

COMMANDS:
    repair                      Repair the JSON on stdin and print it
    parse [--native]            Parse tool calls from the model reply on stdin
    prompt <tools.json>         Render the prompt-injection prompt for the message on stdin
    call <tools.json> <reply>   Run one orchestrated call against a canned reply file
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    RUST_LOG                        Log filter (default: warn)
    TOOL_BRIDGE_CACHE_TTL_HOURS     Capability cache TTL in hours
    TOOL_BRIDGE_AUTO_FALLBACK       Enable native-to-textual fallback
    TOOL_BRIDGE_DEGRADE_POLICY      always | structural"#
    );
}

fn cmd_version() {
    println!("tool-bridge {}", env!("CARGO_PKG_VERSION"));
}

fn read_stdin() -> anyhow::Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

/// A reply that decodes to a JSON object is treated as a chat-completions body.
fn reply_from_text(text: String) -> RawResponse {
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value @ serde_json::Value::Object(_)) => RawResponse::Json(value),
        _ => RawResponse::Text(text),
    }
}

async fn load_tools(path: &Path) -> anyhow::Result<Vec<ToolDescriptor>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid tool list in {}", path.display()))
}

fn cmd_repair() -> anyhow::Result<()> {
    let input = read_stdin()?;
    let repaired = repair_json_with_stage(input.trim_end_matches('\n'));
    eprintln!("stage: {}", repaired.stage);
    println!("{}", repaired.text);
    if repaired.stage == RepairStage::Exhausted {
        bail!("input could not be repaired into valid JSON");
    }
    Ok(())
}

fn cmd_parse(args: &[String]) -> anyhow::Result<()> {
    let native = args.iter().any(|a| a == "--native");
    let response = reply_from_text(read_stdin()?);
    let result = if native {
        FunctionCallingAdapter::new().parse_tool_calls(&response)
    } else {
        PromptInjectionAdapter::new().parse_tool_calls(&response)
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn cmd_prompt(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = args.first() else {
        bail!("usage: tool-bridge prompt <tools.json>");
    };
    let tools = load_tools(Path::new(path)).await?;
    let message = read_stdin()?;
    let prompt = PromptInjectionAdapter::new().format_tools_for_prompt(&tools, message.trim());
    println!("{prompt}");
    Ok(())
}

async fn cmd_call(args: &[String]) -> anyhow::Result<()> {
    let (Some(tools_path), Some(reply_path)) = (args.first(), args.get(1)) else {
        bail!("usage: tool-bridge call <tools.json> <reply-file>");
    };
    let tools = load_tools(Path::new(tools_path)).await?;
    let reply_text = tokio::fs::read_to_string(reply_path)
        .await
        .with_context(|| format!("failed to read {reply_path}"))?;
    let reply = reply_from_text(reply_text);
    let message = read_stdin()?;

    let orchestrator = ToolOrchestrator::try_new(OrchestratorConfig::from_env()?)?;
    let probe_reply = reply.clone();
    let probe = probe_fn(move || {
        let r = probe_reply.clone();
        async move { Ok::<_, ai_tool_bridge::Error>(r) }
    });
    let invoke_reply = reply.clone();
    let invoker = invoke_fn(move |req: InvokeRequest| {
        let r = invoke_reply.clone();
        async move {
            tracing::info!(native = req.is_native(), chars = req.message.len(), "dry-run invocation");
            Ok::<_, ai_tool_bridge::Error>(r)
        }
    });

    let result = orchestrator
        .call_with_fallback("cli", &tools, message.trim(), &invoker, Some(&probe))
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    eprintln!(
        "{}",
        serde_json::to_string_pretty(&orchestrator.cache_stats()?)?
    );
    Ok(())
}
