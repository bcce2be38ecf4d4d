use crate::client::http_store::HttpStore;
use crate::client::reconciler::Reconciler;
use crate::client::session::Session;
use crate::client::storage::{FileStorage, LocalStorage};
use crate::commands::{parse_participant, ParticipantCommand, PARTICIPANT_HELP};
use crate::config::Config;
use crate::models::TallyState;
use crate::store::VoteStore;
use crate::voting::leaderboard::render_board;
use log::{error, info};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub async fn run(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let store: Arc<dyn VoteStore> = Arc::new(HttpStore::new(&config.server_url)?);
    let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::open(&config.profile_path)?);
    let mut session = Session::start(store, storage, config.poll_interval, config.debounce)?;
    info!("Participant {} connected to {}", session.profile.user_id, config.server_url);

    println!("{}", PARTICIPANT_HELP);
    if session.profile.user_name.is_empty() {
        println!("Enter your name first: name <your name>");
    } else {
        println!("Voting as {}", session.profile.user_name);
    }

    let printer = spawn_board_printer(session.updates(), Arc::clone(&session.reconciler));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_participant(&line) {
            Ok(ParticipantCommand::Quit) => break,
            Ok(ParticipantCommand::Toggle(id)) => {
                let Some(state) = session.latest() else {
                    println!("Loading...");
                    continue;
                };
                if state.item(id).is_none() {
                    println!("There is no item {}", id);
                    continue;
                }
                match session.reconciler.toggle(id, &session.profile.user_name) {
                    Ok(selection) => print!("{}", render_board(&state.items, &selection)),
                    Err(e) => println!("{}", e),
                }
            }
            Ok(ParticipantCommand::Name(name)) => {
                if let Err(e) = session.profile.set_name(&name) {
                    error!("Failed to save name: {}", e);
                }
                println!("Voting as {}", session.profile.user_name);
            }
            Ok(ParticipantCommand::Board) => match session.latest() {
                Some(state) => print!("{}", render_board(&state.items, &session.reconciler.selection())),
                None => println!("Loading..."),
            },
            Ok(ParticipantCommand::Help) => println!("{}", PARTICIPANT_HELP),
            Err(message) => println!("{}", message),
        }
    }

    printer.abort();
    Ok(())
}

// Redraw whenever the server's view changes, not on every poll
fn spawn_board_printer(
    mut updates: watch::Receiver<Option<TallyState>>,
    reconciler: Arc<Reconciler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        println!("Loading...");
        let mut shown: Option<TallyState> = None;
        while updates.changed().await.is_ok() {
            let latest = updates.borrow_and_update().clone();
            if let Some(state) = latest {
                if shown.as_ref() != Some(&state) {
                    println!("--- mode: {} ---", state.mode);
                    print!("{}", render_board(&state.items, &reconciler.selection()));
                    shown = Some(state);
                }
            }
        }
    })
}
