//! `dce chat` command - Conversations with the AI estimate assistant

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::chat::{converse, EstimateContext, HttpChatClient};
use crate::cli::helpers::{confirm, print_structured, print_table, truncate_str, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::security::RateLimiter;
use crate::core::store::Store;
use crate::entities::conversation::{ChatRole, Conversation};
use crate::entities::estimate::Estimate;

#[derive(Subcommand, Debug)]
pub enum ChatCommands {
    /// Send a message to the assistant
    Send(SendArgs),

    /// List saved conversations
    List,

    /// Show a conversation transcript
    Show(IdArg),

    /// Delete a conversation
    Delete(IdArg),
}

#[derive(clap::Args, Debug)]
pub struct SendArgs {
    /// Message text
    pub message: String,

    /// Estimate to discuss (EST id or prefix)
    #[arg(long, short = 'e')]
    pub estimate: Option<String>,

    /// Continue an existing conversation (CONV id or prefix)
    #[arg(long, short = 'c')]
    pub conversation: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArg {
    /// Conversation ID (or unique prefix)
    pub id: String,
}

pub fn run(cmd: ChatCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ChatCommands::Send(args) => run_send(args, global),
        ChatCommands::List => run_list(global),
        ChatCommands::Show(args) => run_show(args, global),
        ChatCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_send(args: SendArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let client = HttpChatClient::from_config(&ctx.config.chat)?;

    let mut conversation = match args.conversation {
        Some(ref id) => ctx.store.get::<Conversation>(id)?,
        None => Conversation::start(&args.message, None, ctx.user()),
    };

    let estimate_ref = args
        .estimate
        .clone()
        .or_else(|| conversation.estimate_id.as_ref().map(|id| id.to_string()));
    let estimate: Option<Estimate> = match estimate_ref {
        Some(ref id) => Some(ctx.store.get(id)?),
        None => None,
    };
    if let Some(ref est) = estimate {
        conversation.estimate_id = Some(est.id.clone());
    }

    let mut limiter = RateLimiter::load(&ctx.workspace);
    limiter.check(
        &format!("chat:{}", ctx.user()),
        ctx.config.chat.max_requests(),
        ctx.config.chat.window(),
        chrono::Utc::now(),
    )?;
    if let Err(e) = limiter.save(&ctx.workspace) {
        tracing::warn!(error = %e, "could not persist rate limit state");
    }

    let reply = converse(
        &client,
        &mut conversation,
        &args.message,
        estimate.as_ref().map(EstimateContext::from_estimate),
    )?;
    ctx.store.save(&conversation)?;

    if print_structured(&reply, global.format)? {
        return Ok(());
    }
    if global.format == OutputFormat::Id {
        println!("{}", conversation.id);
        return Ok(());
    }

    println!("{}", reply.response);
    if !reply.suggestions.is_empty() {
        println!();
        println!("{}", style("Suggestions:").bold());
        for s in &reply.suggestions {
            println!("  • {}", s);
        }
    }
    if !reply.actions.is_empty() {
        println!();
        println!("{}", style("Proposed actions:").bold());
        for action in &reply.actions {
            println!(
                "  {} {}",
                style(&action.kind).cyan(),
                style(serde_json::Value::Object(action.fields.clone())).dim()
            );
        }
    }
    if !global.quiet {
        println!();
        println!(
            "{} continue with {}",
            style(&conversation.id).dim(),
            style(format!("dce chat send --conversation {} \"...\"", conversation.id)).yellow()
        );
    }
    Ok(())
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let mut conversations: Vec<Conversation> = ctx.store.list()?;
    conversations.sort_by(|a, b| b.updated.cmp(&a.updated));

    if print_structured(&conversations, global.format)? {
        return Ok(());
    }

    let rows = conversations
        .iter()
        .map(|c| {
            vec![
                c.id.to_string(),
                truncate_str(&c.title, 40),
                c.messages.len().to_string(),
                c.estimate_id
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                c.updated.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    print_table(
        &["ID", "TITLE", "MESSAGES", "ESTIMATE", "UPDATED"],
        rows,
        global.format,
    )?;
    Ok(())
}

fn run_show(args: IdArg, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let conversation: Conversation = ctx.store.get(&args.id)?;

    if print_structured(&conversation, global.format)? {
        return Ok(());
    }

    println!("{}", style(&conversation.title).bold());
    if let Some(ref est) = conversation.estimate_id {
        println!("{} {}", style("about").dim(), style(est).cyan());
    }
    for message in &conversation.messages {
        println!();
        let who = match message.role {
            ChatRole::User => style("you").green().bold(),
            ChatRole::Assistant => style("assistant").cyan().bold(),
        };
        println!(
            "{} {}",
            who,
            style(message.timestamp.format("%Y-%m-%d %H:%M")).dim()
        );
        println!("{}", message.content);
    }
    Ok(())
}

fn run_delete(args: IdArg, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(global)?;
    let id = ctx.store.delete::<Conversation>(&args.id)?;
    confirm(global, format!("Deleted conversation {}", style(&id).cyan()));
    Ok(())
}
