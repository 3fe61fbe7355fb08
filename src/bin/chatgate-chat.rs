//! Terminal chat client for the proxy gateway.
//!
//! Each line typed is one turn: it is sent to the gateway and the reply (or an
//! apology, if anything goes wrong) is printed below it.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local gateway
//! chatgate-chat
//!
//! # Point at another gateway
//! chatgate-chat --gateway-url http://chat.example.com/message
//!
//! # Disable colors (useful for piping output)
//! chatgate-chat --no-color
//! ```
//!
//! # Commands
//!
//! - `/history` - Show the conversation so far
//! - `/stats` - Show session statistics
//! - `/help` - Show available commands
//! - `/quit` - Exit the application

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use chatgate::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("chatgate-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let session = ChatSession::connect(config)?;
    let mut rl = DefaultEditor::new()?;

    renderer.print_info("Type /help for commands, /quit to exit\n");
    for message in session.transcript() {
        renderer.render_message(&message);
    }

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            renderer.print_info("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                renderer.print_info(&format!("    {}", line));
                            }
                        }
                        ChatCommand::History => {
                            for message in session.transcript() {
                                renderer.render_message(&message);
                            }
                        }
                        ChatCommand::Stats => session.print_stats(&mut renderer),
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // The typed line has already been echoed by the editor; the session
                // renders it again as a transcript entry with its timestamp.
                session.submit(line, &mut renderer).await;
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                renderer.print_info("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}
