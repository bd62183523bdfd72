use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use shared::{
    calls,
    domain::{Bell, Stroke, TowerId},
};
use tower_core::RingingTower;
use tracing::{info, warn};

#[derive(Parser, Debug)]
struct Cli {
    /// Base address of the tower service.
    #[arg(long, default_value = "ringingroom.com")]
    url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sit in a tower and answer anyone who says hello in chat.
    Chatbot {
        tower_id: i64,
        #[arg(long, default_value = "Towerbot")]
        name: String,
    },
    /// Ring rounds on all the bells until someone calls stand.
    Rounds {
        tower_id: i64,
        /// Seconds between bell strokes.
        #[arg(long, default_value_t = 0.3)]
        gap: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Chatbot { tower_id, name } => run_chatbot(TowerId(tower_id), &cli.url, name).await,
        Command::Rounds { tower_id, gap } => {
            run_rounds(TowerId(tower_id), &cli.url, Duration::from_secs_f64(gap)).await
        }
    }
}

async fn run_chatbot(tower_id: TowerId, url: &str, name: String) -> Result<()> {
    let tower = RingingTower::new(tower_id, url).await?;

    let replier = Arc::clone(&tower);
    let bot_name = name.clone();
    tower.on_chat(move |sender, message| {
        info!(sender, message, "chat");
        if sender == bot_name || !message.eq_ignore_ascii_case("hello") {
            return;
        }
        let greeting = format!("Hello, {sender}!");
        let tower = Arc::clone(&replier);
        let bot_name = bot_name.clone();
        // Callbacks must not block the event stream; reply from a task.
        tokio::spawn(async move {
            if let Err(err) = tower.chat(&bot_name, &greeting).await {
                warn!(%err, "failed to send greeting");
            }
        });
    });

    tower.connect().await?;
    tower.wait_until_ready(Duration::from_secs(2)).await?;
    info!(tower = %tower.tower_name(), "chatbot joined, ctrl-c to leave");

    tokio::signal::ctrl_c().await?;
    tower.close().await;
    Ok(())
}

async fn run_rounds(tower_id: TowerId, url: &str, gap: Duration) -> Result<()> {
    let tower = RingingTower::new(tower_id, url).await?;

    let stand = Arc::new(AtomicBool::new(false));
    {
        let stand = Arc::clone(&stand);
        tower.on_call(calls::STAND, move || {
            stand.store(true, Ordering::SeqCst);
        });
    }

    tower.connect().await?;
    tower.wait_until_ready(Duration::from_secs(2)).await?;
    info!(
        tower = %tower.tower_name(),
        bells = tower.number_of_bells(),
        "ringing rounds"
    );

    tower.set_at_hand().await?;
    tower.call_look_to().await?;
    tokio::time::sleep(Duration::from_secs(3)).await;

    let mut row_index = 0;
    while !stand.load(Ordering::SeqCst) {
        let stroke = Stroke::from_index(row_index);
        // Leave the customary gap before each handstroke row.
        if stroke.is_hand() {
            tokio::time::sleep(gap).await;
        }
        for index in 0..tower.number_of_bells() {
            if let Some(bell) = Bell::from_index(index) {
                tower.ring_bell(bell, Some(stroke)).await?;
            }
            tokio::time::sleep(gap).await;
        }
        row_index += 1;
    }

    info!("stand called, leaving the tower");
    tower.close().await;
    Ok(())
}
