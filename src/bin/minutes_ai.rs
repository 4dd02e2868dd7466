//! minutes-ai: 议事录 AI 操作的命令行入口
//!
//! Usage:
//!   minutes-ai summarize <file|->              Summarize minutes
//!   minutes-ai actions <file|->                Extract action items
//!   minutes-ai ask <file|-> <question>         Answer a question from the minutes
//!   minutes-ai config                          Show effective configuration

use std::io::Read;
use std::sync::Arc;

use anyhow::{bail, Context};
use minutes_ai::config::{CookieConfig, GuardConfig, ProviderConfig};
use minutes_ai::identity::{AuthenticatedUser, IdentityResolver, MemoryCookieJar, GUEST_COOKIE_NAME};
use minutes_ai::{AiGuard, GeminiProvider, MinutesAssistant};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "summarize" | "actions" | "ask" => cmd_action(&args[1], &args[2..]).await,
        "config" => cmd_config(),
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

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"minutes-ai: 议事录 AI 命令行工具

USAGE:
    minutes-ai <COMMAND> [OPTIONS]

COMMANDS:
    summarize <file|->          Summarize meeting minutes
    actions <file|->            Extract action items with evidence
    ask <file|-> <question>     Answer a question using only the minutes
    config                      Show effective configuration
    version                     Show version information
    help                        Show this help message

OPTIONS:
    --guest-id <id>             Reuse a guest identity
    --user <id>                 Act as an authenticated user

ENVIRONMENT:
    GEMINI_API_KEY              Provider key (the OS keyring is tried first)
    GEMINI_MODEL                Model name (default gemini-2.5-flash)
    AI_RATE_LIMIT_PER_DAY       Daily invocations per identity
    AI_DEBOUNCE_SECONDS         Minimum spacing between invocations
    RUST_LOG                    Log filter (logs go to stderr)"#
    );
}

fn cmd_version() {
    println!("minutes-ai {}", env!("CARGO_PKG_VERSION"));
}

fn cmd_config() -> anyhow::Result<()> {
    let guard = GuardConfig::from_env();
    let provider = ProviderConfig::from_env();
    let cookies = CookieConfig::from_env();

    println!("=== Guard ===");
    println!("raw text max chars : {}", guard.raw_text_max_chars);
    println!("question max chars : {}", guard.question_max_chars);
    println!("rate limit per day : {}", guard.rate_limit_per_day);
    println!("debounce           : {}s", guard.debounce.as_secs());
    println!("cache ttl          : {}s", guard.cache_ttl.as_secs());
    println!("evict corrupt      : {}", guard.evict_corrupt_entries);
    println!("\n=== Provider ===");
    println!("model              : {}", provider.model);
    println!("base url           : {}", provider.base_url);
    println!("timeout            : {}s", provider.timeout.as_secs());
    let has_key = GeminiProvider::new(&provider)
        .map(|p| p.has_api_key())
        .unwrap_or(false);
    println!("api key            : {}", if has_key { "configured" } else { "missing" });
    println!("\n=== Cookies ===");
    println!("secure             : {}", cookies.secure);
    Ok(())
}

struct ActionArgs {
    source: String,
    question: Option<String>,
    guest_id: Option<String>,
    user: Option<String>,
}

fn parse_action_args(args: &[String]) -> anyhow::Result<ActionArgs> {
    let mut positional = Vec::new();
    let mut guest_id = None;
    let mut user = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--guest-id" => guest_id = Some(iter.next().context("--guest-id needs a value")?.clone()),
            "--user" => user = Some(iter.next().context("--user needs a value")?.clone()),
            _ => positional.push(arg.clone()),
        }
    }
    let mut positional = positional.into_iter();
    let Some(source) = positional.next() else {
        bail!("missing input file (use - for stdin)");
    };
    let question = positional.next();
    Ok(ActionArgs {
        source,
        question,
        guest_id,
        user,
    })
}

fn read_source(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(source).with_context(|| format!("failed to read {source}"))
}

async fn cmd_action(command: &str, args: &[String]) -> anyhow::Result<()> {
    let args = parse_action_args(args)?;
    if command == "ask" && args.question.is_none() {
        bail!("ask needs a question");
    }
    let raw_text = read_source(&args.source)?;

    let provider = GeminiProvider::new(&ProviderConfig::from_env())?;
    let guard = AiGuard::builder(Arc::new(provider))
        .with_config(GuardConfig::from_env())
        .build();
    let assistant = MinutesAssistant::new(
        Arc::new(guard),
        IdentityResolver::new(CookieConfig::from_env()),
    );

    let jar = match &args.guest_id {
        Some(id) => MemoryCookieJar::new().with_cookie(GUEST_COOKIE_NAME, id.as_str()),
        None => MemoryCookieJar::new(),
    };
    let user = args.user.map(AuthenticatedUser::new);
    let identity = assistant.identify(&jar, user.as_ref());
    for cookie in jar.set_cookies() {
        eprintln!("Set-Cookie: {}", cookie.to_header_value());
    }
    tracing::debug!(identity = %identity, command, "running action");

    let output = match command {
        "summarize" => serde_json::to_string_pretty(&assistant.summarize(&identity, &raw_text).await)?,
        "actions" => serde_json::to_string_pretty(&assistant.extract_actions(&identity, &raw_text).await)?,
        _ => {
            let question = args.question.unwrap_or_default();
            serde_json::to_string_pretty(&assistant.answer_question(&identity, &raw_text, &question).await)?
        }
    };
    println!("{output}");
    Ok(())
}
