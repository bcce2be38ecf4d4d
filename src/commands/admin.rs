use crate::client::http_store::HttpStore;
use crate::commands::{is_confirmation, parse_admin, AdminCommand, ADMIN_HELP};
use crate::config::Config;
use crate::models::TallyState;
use crate::store::VoteStore;
use crate::tasks::poller::{spawn_poller, Revalidator};
use crate::voting::history::render_history;
use crate::voting::leaderboard::{render_leaderboard, top_items, LEADERBOARD_SIZE};
use log::error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub async fn run(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let store: Arc<dyn VoteStore> = Arc::new(HttpStore::new(&config.server_url)?);
    let revalidator = Revalidator::default();
    let poll = spawn_poller(Arc::clone(&store), config.poll_interval, revalidator.clone());
    let printer = spawn_leaderboard_printer(poll.subscribe());

    println!("{}", ADMIN_HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_admin(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        let result = match command {
            AdminCommand::Quit => break,
            AdminCommand::Help => {
                println!("{}", ADMIN_HELP);
                Ok(())
            }
            AdminCommand::Board => {
                match poll.latest() {
                    Some(state) => print_items(&state),
                    None => println!("Loading..."),
                }
                Ok(())
            }
            AdminCommand::Label { id, label } => store.relabel(id, &label).await,
            AdminCommand::Reset => {
                println!("Reset every vote to zero? [y/N]");
                let answer = lines.next_line().await?.unwrap_or_default();
                if is_confirmation(&answer) {
                    store.reset_all().await
                } else {
                    println!("Cancelled");
                    Ok(())
                }
            }
            AdminCommand::SetMode(mode) => {
                println!("Switching to {} mode clears every vote. Continue? [y/N]", mode);
                let answer = lines.next_line().await?.unwrap_or_default();
                if is_confirmation(&answer) {
                    store.set_mode(mode).await
                } else {
                    println!("Cancelled");
                    Ok(())
                }
            }
            AdminCommand::Finalize => store.finalize_round().await.map(|snapshot| {
                println!("Round saved to history:");
                print!("{}", render_history(&snapshot));
            }),
            AdminCommand::History => store.list_history().await.map(|history| {
                if history.is_empty() {
                    println!("No finished rounds yet.");
                }
                for snapshot in &history {
                    print!("{}", render_history(snapshot));
                }
            }),
            AdminCommand::Delete(id) => store.delete_history(id).await,
        };

        match result {
            Ok(()) => revalidator.revalidate(),
            Err(e) => {
                error!("Admin command failed: {}", e);
                println!("Failed: {}", e);
            }
        }
    }

    printer.abort();
    Ok(())
}

fn print_items(state: &TallyState) {
    println!("--- mode: {} / {} votes ---", state.mode, state.total_votes());
    for item in &state.items {
        println!("{:>3}  {:<20} {}", item.id, item.label, item.count);
    }
}

fn spawn_leaderboard_printer(mut updates: watch::Receiver<Option<TallyState>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        println!("Loading...");
        let mut shown = None;
        while updates.changed().await.is_ok() {
            let latest = updates.borrow_and_update().clone();
            if let Some(state) = latest {
                let standings = top_items(&state.items, LEADERBOARD_SIZE);
                if shown.as_ref() != Some(&standings) {
                    print!("{}", render_leaderboard(&standings));
                    shown = Some(standings);
                }
            }
        }
    })
}
