//! Save and recall companion memories from the command line.
//!
//! Usage:
//!   OPENAI_API_KEY=sk-... SUPABASE_URL=https://xyz.supabase.co SUPABASE_ANON_KEY=... \
//!     cargo run --example recall -- save --user <uuid> --sentiment happy "I got the job!"
//!   ... cargo run --example recall -- recall --user <uuid> "how did the interview go?"
//!   cargo run --example recall -- --local chat --user <uuid>
//!
//! `--local` swaps Supabase for an in-process store; only useful with `chat`,
//! since nothing outlives the process.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand, ValueEnum};
use companion_memory::{
    CompanionMemory, InMemoryStore, MemoryConfig, NewNote, NoteKind, OpenAiEmbedder,
};

#[derive(Parser)]
#[command(name = "recall", about = "Save and recall companion memories")]
struct Cli {
    /// Use an in-process store instead of Supabase
    #[arg(long)]
    local: bool,

    /// Override the default result cap
    #[arg(long)]
    limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Persist a note
    Save {
        #[arg(long)]
        user: String,
        #[arg(long, value_enum, default_value_t = Kind::Message)]
        kind: Kind,
        #[arg(long)]
        sentiment: Option<String>,
        #[arg(long)]
        topic: Option<String>,
        content: String,
    },
    /// Print the context block for a message
    Recall {
        #[arg(long)]
        user: String,
        message: String,
    },
    /// Every line is saved, then the next one recalls against everything so far
    Chat {
        #[arg(long)]
        user: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Message,
    Summary,
}

impl From<Kind> for NoteKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Message => NoteKind::Message,
            Kind::Summary => NoteKind::Summary,
        }
    }
}

fn build_memory(cli: &Cli) -> CompanionMemory {
    let mut config = MemoryConfig::from_env().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    if let Some(limit) = cli.limit {
        config.retrieval.match_count = limit;
    }

    let memory = if cli.local {
        CompanionMemory::new(
            InMemoryStore::new(),
            OpenAiEmbedder::from_config(&config.embedding),
        )
        .with_retrieval_config(config.retrieval)
    } else {
        CompanionMemory::from_config(&config)
    };

    memory.unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let memory = build_memory(&cli);

    match cli.command {
        Command::Save {
            user,
            kind,
            sentiment,
            topic,
            content,
        } => {
            let mut note = NewNote::new(user, content, kind.into());
            note.sentiment = sentiment;
            note.topic = topic;
            match memory.save_note(note).await {
                Ok(id) if id.is_empty() => eprintln!("store disabled, note dropped"),
                Ok(id) => println!("{id}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Recall { user, message } => match memory.recall_context(&user, &message).await {
            Ok(context) => println!("{context}"),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        },
        Command::Chat { user } => {
            let stdin = io::stdin();
            let mut lines = stdin.lock().lines();

            loop {
                eprint!("\x1b[1;36myou>\x1b[0m ");
                io::stderr().flush().ok();

                let line = match lines.next() {
                    Some(Ok(line)) => line,
                    _ => break,
                };

                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if matches!(trimmed, "exit" | "quit" | "/q") {
                    break;
                }

                match memory.recall_context(&user, trimmed).await {
                    Ok(context) => eprintln!("\x1b[2m{context}\x1b[0m"),
                    Err(e) => eprintln!("\x1b[1;31merror:\x1b[0m {e}"),
                }

                if let Err(e) = memory
                    .save_note(NewNote::new(&user, trimmed, NoteKind::Message))
                    .await
                {
                    eprintln!("\x1b[1;31merror:\x1b[0m {e}");
                }
            }

            eprintln!("bye.");
        }
    }
}
