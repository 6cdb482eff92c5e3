use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use zakia::config::AssistConfig;
use zakia::error::Result;
use zakia::flow::{ChatEvent, ChoiceOption, FlowEngine, IntentSignal, Reply, StepKey};
use zakia::services::{HttpReminderStore, LznkClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AssistConfig::from_env()?;

    eprintln!("🕌 ZAKIA v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.lznk_base_url);
    eprintln!("   Taip 'menu' untuk senarai pengiraan, 'batal' untuk membatalkan,");
    eprintln!("   nombor untuk memilih butang, '/quit' untuk keluar.\n");

    let lznk = Arc::new(LznkClient::new(&config)?);
    let store = Arc::new(HttpReminderStore::new(&config)?);
    let mut engine = FlowEngine::new(lznk.clone(), lznk, store, config);

    // Last offered choice list; cleared once a selection is dispatched so a
    // second selection for the same step has nothing to map to.
    let mut pending_choices: Option<(StepKey, Vec<ChoiceOption>)> = None;

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    eprint!("> ");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        if line == "/quit" {
            break;
        }

        let event = if line.eq_ignore_ascii_case("menu") {
            Some(ChatEvent::Intent(IntentSignal::ShowMenu))
        } else if line.eq_ignore_ascii_case("batal") {
            pending_choices = None;
            Some(ChatEvent::Cancel)
        } else if let Ok(n) = line.parse::<usize>() {
            match pending_choices.take() {
                Some((step, options)) => match options.get(n.wrapping_sub(1)) {
                    Some(option) => Some(ChatEvent::Choice {
                        step,
                        value: option.value.clone(),
                    }),
                    None => {
                        println!("Pilihan tidak sah. Sila pilih nombor dari senarai.");
                        pending_choices = Some((step, options));
                        None
                    }
                },
                None => Some(ChatEvent::Text(line.clone())),
            }
        } else {
            Some(ChatEvent::Text(line.clone()))
        };

        if let Some(event) = event {
            let turn = engine.handle(event).await;
            for reply in turn.replies {
                render(reply, &mut pending_choices);
            }
            if !turn.consumed {
                println!("(Taip 'menu' untuk senarai pengiraan zakat.)");
            }
        }
        eprint!("> ");
    }

    Ok(())
}

fn render(reply: Reply, pending_choices: &mut Option<(StepKey, Vec<ChoiceOption>)>) {
    match reply {
        Reply::Notice(text) => println!("ℹ️  {text}"),
        Reply::Result(text) => println!("\n{text}\n"),
        Reply::Prompt { text, error, .. } => {
            if let Some(err) = error {
                println!("⚠️  {err}");
            }
            println!("{text}");
        }
        Reply::Choices {
            step,
            title,
            options,
        } => {
            println!("{title}");
            for (i, option) in options.iter().enumerate() {
                println!("  {}. {}", i + 1, option.label);
            }
            *pending_choices = Some((step, options));
        }
    }
}
