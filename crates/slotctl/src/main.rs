//! slotctl - command-line client for slotkeeperd

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use slotkeeper_api::{Command, EventPayload, ResponsePayload, SlotView};
use slotkeeper_core::render_calendar;
use slotkeeper_ipc::IpcClient;
use slotkeeper_util::{default_socket_path, format_clock_time, format_date};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "slotctl")]
#[command(about = "Search, book and cancel appointment slots", long_about = None)]
struct Cli {
    /// Socket path (or set SLOTKEEPER_SOCKET env var)
    #[arg(short, long, env = "SLOTKEEPER_SOCKET")]
    socket: Option<PathBuf>,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Free slots closest to a desired time
    Slots {
        /// Desired start time (HH:MM)
        desired: String,

        /// Day to search (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<String>,

        /// How many slots to return (default 5)
        #[arg(short = 'n', long)]
        count: Option<i64>,
    },
    /// Book the slot starting at a given time
    Book {
        /// Slot start time (HH:MM)
        start_time: String,

        #[arg(short, long)]
        client: String,

        /// Day of the slot (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(short, long)]
        advisor: Option<String>,
    },
    /// Cancel a booking made under the given client name
    Cancel {
        /// Slot start time (HH:MM)
        start_time: String,

        #[arg(short, long)]
        client: String,

        /// Day of the slot (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Print the whole calendar
    Show {
        /// Only show booked slots
        #[arg(long)]
        booked: bool,
    },
    /// Regenerate the calendar from today, dropping every booking
    Reset,
    /// Print calendar events as they happen
    Watch,
    /// Check that the service is up
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let socket = cli.socket.clone().unwrap_or_else(default_socket_path);
    let colored = !cli.no_color && std::io::stdout().is_terminal();

    debug!(socket = %socket.display(), "Connecting to slotkeeperd");
    let mut client = IpcClient::connect(&socket)
        .await
        .with_context(|| format!("Failed to connect to slotkeeperd at {}", socket.display()))?;

    match cli.command {
        Commands::Slots { desired, date, count } => {
            let payload = client
                .call(Command::FindSlots { date, desired, count })
                .await
                .context("Search failed")?;
            let slots = match payload {
                ResponsePayload::Slots { slots } => slots,
                other => bail!("Unexpected response: {:?}", other),
            };
            if slots.is_empty() {
                println!("No free slots");
            }
            for slot in &slots {
                println!("{}", slot_line(slot));
            }
        }

        Commands::Book {
            start_time,
            client: name,
            date,
            description,
            advisor,
        } => {
            client
                .call(Command::Book {
                    date,
                    start_time: start_time.clone(),
                    client: Some(name.clone()),
                    description,
                    advisor,
                })
                .await
                .context("Booking failed")?;
            println!("Booked {} for {}", start_time, name);
        }

        Commands::Cancel {
            start_time,
            client: name,
            date,
        } => {
            client
                .call(Command::Cancel {
                    date,
                    start_time: start_time.clone(),
                    client: name.clone(),
                })
                .await
                .context("Cancellation failed")?;
            println!("Cancelled {} for {}", start_time, name);
        }

        Commands::Show { booked } => {
            let payload = client.call(Command::GetCalendar).await?;
            let snapshot = match payload {
                ResponsePayload::Calendar(snapshot) => snapshot,
                other => bail!("Unexpected response: {:?}", other),
            };
            let slots: Vec<SlotView> = snapshot
                .slots
                .into_iter()
                .filter(|s| !booked || s.booked)
                .collect();
            print!("{}", render_calendar(&slots, colored));
        }

        Commands::Reset => {
            let payload = client.call(Command::ResetCalendar).await.context("Reset failed")?;
            if let ResponsePayload::CalendarReset { slot_count } = payload {
                println!("Calendar reset: {} free slots", slot_count);
            }
        }

        Commands::Watch => {
            let mut events = client.subscribe().await?;
            loop {
                let event = events.next().await.context("Lost connection to slotkeeperd")?;
                let stamp = event.timestamp.format("%H:%M:%S");
                match event.payload {
                    EventPayload::SlotBooked { slot } => {
                        println!("[{}] booked    {}", stamp, slot_line(&slot));
                    }
                    EventPayload::SlotCancelled { date, start_time } => {
                        println!(
                            "[{}] cancelled {} {}",
                            stamp,
                            format_date(date),
                            format_clock_time(start_time)
                        );
                    }
                    EventPayload::CalendarReset { slot_count } => {
                        println!("[{}] reset     {} slots", stamp, slot_count);
                    }
                    EventPayload::Shutdown => {
                        println!("[{}] slotkeeperd shutting down", stamp);
                        break;
                    }
                }
            }
        }

        Commands::Ping => {
            client.call(Command::Ping).await?;
            println!("pong");
        }
    }

    Ok(())
}

fn slot_line(slot: &SlotView) -> String {
    let mut line = format!(
        "{} {} - {}",
        format_date(slot.date),
        format_clock_time(slot.start_time),
        format_clock_time(slot.end_time)
    );
    if slot.booked {
        line.push_str(&format!("  {}", slot.client));
        if !slot.advisor.is_empty() {
            line.push_str(&format!(" with {}", slot.advisor));
        }
    }
    line
}
