mod config;
mod errors;
mod models;
mod seed;
mod session;
mod state;
mod store;
mod summary;
#[cfg(test)]
mod tests;
mod tui;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use config::Config;
use models::{MemberDraft, MemberPatch, Mood, NoteDraft};
use session::{Session, SessionFile};
use state::{MemberRoster, NoteLog};
use store::{ApiStore, MemberStore, NoteStore};
use summary::TeamSummary;

#[derive(Parser)]
#[command(name = "teamdiary")]
#[command(about = "Track team members and the notes from your one-on-ones")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage team members
    Members {
        #[command(subcommand)]
        command: MemberCommands,
    },

    /// Manage one-on-one notes
    Notes {
        #[command(subcommand)]
        command: NoteCommands,
    },

    /// Show the team digest: note counts, flagged counts, last mood
    Summary,

    /// Insert the sample team into the backend
    Seed,

    /// Store a backend token for this machine
    Login {
        /// Account email, shown by `whoami`
        #[arg(long)]
        email: String,

        /// Bearer token obtained from the backend's identity provider
        #[arg(long)]
        token: String,
    },

    /// Remove the stored session
    Logout,

    /// Show who is signed in
    Whoami,

    /// Open the interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum MemberCommands {
    /// List the team, ordered by name
    List,

    /// Show one member and their note digest
    Show {
        /// Member ID
        id: String,
    },

    /// Add a member
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        role: String,

        /// YYYY-MM-DD
        #[arg(long)]
        birthday: NaiveDate,

        /// YYYY-MM-DD
        #[arg(long)]
        hiring_date: NaiveDate,

        #[arg(long, default_value = "")]
        location: String,
    },

    /// Edit a member; only the given fields change
    Edit {
        /// Member ID
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        role: Option<String>,

        /// YYYY-MM-DD
        #[arg(long)]
        birthday: Option<NaiveDate>,

        /// YYYY-MM-DD
        #[arg(long)]
        hiring_date: Option<NaiveDate>,

        #[arg(long)]
        location: Option<String>,
    },

    /// Delete a member (their notes are kept)
    Rm {
        /// Member ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// List one member's notes, newest first
    List {
        /// Member ID
        member_id: String,
    },

    /// Add a note
    Add {
        /// Member the conversation was with
        member_id: String,

        /// YYYY-MM-DD; defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        talking_points: String,

        /// happy, neutral, sad, frustrated or tired
        #[arg(long, default_value = "neutral")]
        mood: String,

        /// Mark the note for follow-up
        #[arg(long)]
        flag: bool,

        /// Why the note is flagged; required with --flag
        #[arg(long)]
        flag_description: Option<String>,

        /// Repeatable; ':: YYYY-MM-DD' attaches a due date
        #[arg(long = "action-item")]
        action_items: Vec<String>,
    },

    /// Delete a note
    Rm {
        /// Note ID
        id: String,

        /// Member the note belongs to
        #[arg(long)]
        member: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Resolve a note's flag without editing the rest of it
    Resolve {
        /// Note ID
        id: String,

        /// Member the note belongs to
        #[arg(long)]
        member: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build the async runtime")?;

    let sessions = SessionFile::new(config.session_path.clone());

    match cli.command {
        Commands::Login { email, token } => {
            sessions.sign_in(&Session {
                email: email.clone(),
                token,
            })?;
            println!("Signed in as {email}.");
        }

        Commands::Logout => {
            sessions.sign_out()?;
            println!("Signed out.");
        }

        Commands::Whoami => match sessions.current_user()? {
            Some(session) => println!("{}", session.email),
            None => println!("Not signed in."),
        },

        Commands::Members { command } => {
            let store = open_store(&config, &sessions)?;
            run_member_command(&rt, &store, command)?;
        }

        Commands::Notes { command } => {
            let store = open_store(&config, &sessions)?;
            run_note_command(&rt, &store, command)?;
        }

        Commands::Summary => {
            let store = open_store(&config, &sessions)?;
            let roster = refreshed_roster(&rt, &store)?;
            let mut summary = TeamSummary::new(Arc::new(store));
            let ids: Vec<String> = roster.members().iter().map(|m| m.id.clone()).collect();
            rt.block_on(summary.refresh(&ids));

            if roster.members().is_empty() {
                println!("No members yet.");
            } else {
                println!(
                    "{:<24} {:>6} {:>8}  {:<12}",
                    "NAME", "NOTES", "FLAGGED", "LAST MOOD"
                );
                println!("{}", "-".repeat(54));
                for member in roster.members() {
                    let digest = summary.get(&member.id).copied().unwrap_or_default();
                    let mood = digest.last_note_mood.map(|m| m.label()).unwrap_or("-");
                    println!(
                        "{:<24} {:>6} {:>8}  {:<12}",
                        truncate(&member.name, 22),
                        digest.total_notes,
                        digest.flagged_notes,
                        mood
                    );
                }
            }
        }

        Commands::Seed => {
            let store = open_store(&config, &sessions)?;
            let mut roster = MemberRoster::new(Arc::new(store));
            rt.block_on(seed::seed(&mut roster))?;
        }

        Commands::Tui => {
            let store = open_store(&config, &sessions)?;
            let note_store: Arc<dyn NoteStore> = Arc::new(store.clone());
            let mut roster = MemberRoster::new(Arc::new(store));
            tui::run(&rt, &mut roster, note_store)?;
        }
    }

    Ok(())
}

fn run_member_command(rt: &Runtime, store: &ApiStore, command: MemberCommands) -> Result<()> {
    match command {
        MemberCommands::List => {
            let roster = refreshed_roster(rt, store)?;
            if roster.members().is_empty() {
                println!("No members yet.");
            } else {
                println!(
                    "{:<10} {:<24} {:<28} {:<12} {:<20}",
                    "ID", "NAME", "ROLE", "HIRED", "LOCATION"
                );
                println!("{}", "-".repeat(96));
                for member in roster.members() {
                    println!(
                        "{:<10} {:<24} {:<28} {:<12} {:<20}",
                        truncate(&member.id, 8),
                        truncate(&member.name, 22),
                        truncate(&member.role, 26),
                        member.hiring_date,
                        truncate(&member.location, 18)
                    );
                }
            }
        }

        MemberCommands::Show { id } => match rt.block_on(MemberStore::get(store, &id))? {
            Some(member) => {
                println!("{} ({})", member.name, member.id);
                println!("Role: {}", member.role);
                println!("Birthday: {}", member.birthday);
                println!("Hired: {}", member.hiring_date);
                println!("Location: {}", member.location);

                let mut summary = TeamSummary::new(Arc::new(store.clone()));
                rt.block_on(summary.refresh(std::slice::from_ref(&member.id)));
                if let Some(digest) = summary.get(&member.id) {
                    println!(
                        "Notes: {} ({} flagged)",
                        digest.total_notes, digest.flagged_notes
                    );
                    if let Some(mood) = digest.last_note_mood {
                        println!("Last mood: {}", mood.label());
                    }
                }
            }
            None => println!("Member '{id}' not found."),
        },

        MemberCommands::Add {
            name,
            role,
            birthday,
            hiring_date,
            location,
        } => {
            let mut roster = MemberRoster::new(Arc::new(store.clone()));
            let member = rt.block_on(roster.create(MemberDraft {
                name,
                role,
                birthday,
                hiring_date,
                location,
            }))?;
            println!("Added {} ({}).", member.name, member.id);
        }

        MemberCommands::Edit {
            id,
            name,
            role,
            birthday,
            hiring_date,
            location,
        } => {
            let patch = MemberPatch {
                name,
                role,
                birthday,
                hiring_date,
                location,
            };
            if patch.is_empty() {
                bail!(
                    "Nothing to change; pass at least one of --name/--role/--birthday/--hiring-date/--location"
                );
            }
            let mut roster = refreshed_roster(rt, store)?;
            if roster.find(&id).is_none() {
                bail!("Member '{id}' not found");
            }
            rt.block_on(roster.update(&id, patch))?;
            let member = roster.find(&id).expect("updated member stays in the roster");
            println!("Updated {} ({}).", member.name, member.id);
        }

        MemberCommands::Rm { id, yes } => {
            let mut roster = refreshed_roster(rt, store)?;
            let Some(member) = roster.find(&id) else {
                bail!("Member '{id}' not found");
            };
            let name = member.name.clone();
            if !yes && !confirm(&format!("Delete {name}? Their one-on-one notes are kept."))? {
                println!("Aborted.");
                return Ok(());
            }
            rt.block_on(roster.delete(&id))?;
            println!("Deleted {name}.");
        }
    }
    Ok(())
}

fn run_note_command(rt: &Runtime, store: &ApiStore, command: NoteCommands) -> Result<()> {
    match command {
        NoteCommands::List { member_id } => {
            let log = refreshed_log(rt, store, member_id)?;
            if log.notes().is_empty() {
                println!("No notes yet.");
            } else {
                println!(
                    "{:<10} {:<12} {:<12} {:<6} {:<40}",
                    "ID", "DATE", "MOOD", "FLAG", "TALKING POINTS"
                );
                println!("{}", "-".repeat(82));
                for note in log.notes() {
                    println!(
                        "{:<10} {:<12} {:<12} {:<6} {:<40}",
                        truncate(&note.id, 8),
                        note.date,
                        note.mood.label(),
                        if note.flag { "FLAG" } else { "" },
                        truncate(note.talking_points.lines().next().unwrap_or(""), 38)
                    );
                }
            }
        }

        NoteCommands::Add {
            member_id,
            date,
            talking_points,
            mood,
            flag,
            flag_description,
            action_items,
        } => {
            let mood = Mood::parse(&mood).ok_or_else(|| {
                anyhow!("Unknown mood '{mood}' (happy, neutral, sad, frustrated, tired)")
            })?;
            if talking_points.trim().is_empty() {
                bail!("Talking points are required");
            }
            if flag && flag_description.as_deref().is_none_or(|d| d.trim().is_empty()) {
                bail!("--flag-description is required when --flag is set");
            }
            let action_items =
                tui::parse_action_items(&action_items.join("\n")).map_err(|e| anyhow!(e))?;

            let mut log = NoteLog::new(Arc::new(store.clone()), member_id.clone());
            let note = rt.block_on(log.create(NoteDraft {
                member_id,
                date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                talking_points,
                mood,
                flag,
                flag_description: flag.then(|| flag_description.unwrap_or_default()),
                action_items,
            }))?;
            println!("Added note {} dated {}.", note.id, note.date);
        }

        NoteCommands::Rm { id, member, yes } => {
            let mut log = refreshed_log(rt, store, member)?;
            let Some(note) = log.find(&id) else {
                bail!("Note '{id}' not found for that member");
            };
            let date = note.date;
            if !yes && !confirm(&format!("Delete the note from {date}?"))? {
                println!("Aborted.");
                return Ok(());
            }
            rt.block_on(log.delete(&id))?;
            println!("Deleted the note from {date}.");
        }

        NoteCommands::Resolve { id, member } => {
            let mut log = refreshed_log(rt, store, member)?;
            let Some(note) = log.find(&id) else {
                bail!("Note '{id}' not found for that member");
            };
            if !note.flag {
                println!("Note {id} is not flagged.");
                return Ok(());
            }
            rt.block_on(log.resolve_flag(&id))?;
            println!("Resolved the flag on note {id}.");
        }
    }
    Ok(())
}

/// Token precedence: TEAMDIARY_TOKEN, then the stored session.
fn open_store(config: &Config, sessions: &SessionFile) -> Result<ApiStore> {
    let token = match &config.token {
        Some(token) => token.clone(),
        None => match sessions.current_user()? {
            Some(session) => session.token,
            None => {
                bail!("Not signed in. Run `teamdiary login --email <email> --token <token>` first.")
            }
        },
    };
    ApiStore::new(&config.api_url, &token)
}

fn refreshed_roster(rt: &Runtime, store: &ApiStore) -> Result<MemberRoster> {
    let mut roster = MemberRoster::new(Arc::new(store.clone()));
    rt.block_on(roster.refresh());
    if let Some(error) = roster.error() {
        bail!("{error}");
    }
    Ok(roster)
}

fn refreshed_log(rt: &Runtime, store: &ApiStore, member_id: String) -> Result<NoteLog> {
    let mut log = NoteLog::new(Arc::new(store.clone()), member_id);
    rt.block_on(log.refresh());
    if let Some(error) = log.error() {
        bail!("{error}");
    }
    Ok(log)
}

fn confirm(prompt: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        bail!("Refusing to prompt without a terminal; pass --yes");
    }
    print!("{prompt} [y/N]: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
