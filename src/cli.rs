use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "live-tally: a live voting board", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub role: Option<Role>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Run the HTTP vote server (default).
    Serve,
    /// Join the board as a participant.
    #[command(alias = "vote")]
    Participant,
    /// Watch the leaderboard and manage rounds.
    Admin,
}

impl Cli {
    pub fn role(&self) -> Role {
        self.role.unwrap_or(Role::Serve)
    }
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Serve => "serve",
            Role::Participant => "participant",
            Role::Admin => "admin",
        }
    }
}
