//! Interactive chat loop.

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize;

use bomi_common::api::CompareClient;
use bomi_common::config::BomiConfig;
use bomi_common::dialogue::{run_turn, ChatState};
use bomi_common::view::Role;

use crate::render::render_vm;

const EXIT_WORDS: &[&str] = &["exit", "quit", "종료", "끝"];

/// Run the chat REPL until the user exits. One `ChatState` per session;
/// the state machine owns all conversation logic.
pub async fn run(config: BomiConfig) -> Result<()> {
    let client = CompareClient::new(&config)?;
    let term = Term::stdout();
    let mut state = ChatState::new();

    term.write_line(&format!(
        "{}",
        "보미에게 보험 비교를 물어보세요. (종료: exit)".green()
    ))?;

    loop {
        term.write_str(&format!("{} ", "나>".bold()))?;
        let line = term.read_line()?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&input.to_lowercase().as_str()) {
            term.write_line("안녕히 가세요!")?;
            return Ok(());
        }

        let output = run_turn(&mut state, input, &client, &config).await;
        for message in &output.messages {
            if message.role == Role::Assistant {
                term.write_line(&format!("{} {}", "보미>".cyan().bold(), message.content))?;
            }
        }
        if let Some(vm) = &output.view_model {
            term.write_line(&render_vm(vm))?;
        }
    }
}

/// One-shot turn: send a single message through a fresh conversation and
/// print whatever comes back.
pub async fn ask(config: BomiConfig, text: &str) -> Result<()> {
    let client = CompareClient::new(&config)?;
    let mut state = ChatState::new();
    let output = run_turn(&mut state, text, &client, &config).await;

    for message in &output.messages {
        if message.role == Role::Assistant {
            println!("{}", message.content);
        }
    }
    if let Some(vm) = &output.view_model {
        println!("{}", render_vm(vm));
    }
    Ok(())
}
