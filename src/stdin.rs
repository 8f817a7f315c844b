//! Line-based command front end on standard input.

use crate::event::{Event, EventBus};
use crate::session::SessionAction;
use crate::transport::TransportAction;
use crate::visualizer::{self, VizFrame};
use crate::voice::VoiceName;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

/// Actions for text the user should see.
#[derive(Clone, Debug)]
pub enum UiAction {
    Say(String),
}

const HELP_TEXT: &str = "\
===== funny-voice commands =====
speak <text>      Generate speech for <text> with the selected voice
voice <name>      Select a voice (see: voices)
voices            List the voice catalog
play / pause      Control playback
toggle            Flip between play and pause
stop              Stop and rewind
seek <secs>       Jump to a position in seconds
rate <x>          Set the playback rate, 0.5 to 2.0
download          Write the current audio as a WAV file
export-json       Write the current audio as a JSON document
history           List recent generations
load <id>         Replay a generation from history
rm <id>           Remove a generation from history
viz               Print one spectrum frame
status            Show session status
theme             Toggle dark mode
help              This text
================================";

/// Initialize the stdin module. Parses command lines from stdin onto the
/// bus, prints Say output and spectrum frames to stdout.
pub fn init(bus: &EventBus, frames: watch::Receiver<VizFrame>) {
    input_loop(bus.clone(), frames);
    output_loop(bus.clone());
}

fn input_loop(bus: EventBus, frames: watch::Receiver<VizFrame>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("Stdin closed");
                    return;
                }
                Err(e) => {
                    error!("Error {:?} while reading stdin", e);
                    return;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            // The spectrum frame is read locally instead of being routed
            // over the bus.
            if line.trim() == "viz" {
                println!("{}", visualizer::render_bars(&frames.borrow(), 64));
                continue;
            }

            match line_to_event(&line) {
                Some(event) => bus.send(event),
                None => println!("Unknown command. Try: help"),
            }
        }
    });
}

fn output_loop(bus: EventBus) {
    let mut bus_rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            if let Event::Ui(UiAction::Say(text)) = bus_rx.recv().await {
                println!("{text}");
            }
        }
    });
}

/// Parses one input line into a bus event.
pub fn line_to_event(line: &str) -> Option<Event> {
    let mut split = line.split_whitespace();
    let cmd = split.next()?;
    let rest = split.collect::<Vec<&str>>().join(" ");

    match cmd {
        "speak" | "say" => Some(Event::Session(SessionAction::Generate { text: rest })),
        "voice" => match rest.parse::<VoiceName>() {
            Ok(voice) => Some(Event::Session(SessionAction::SetVoice { voice })),
            Err(_) => Some(Event::Ui(UiAction::Say(format!(
                "Unknown voice \"{rest}\". See: voices"
            )))),
        },
        "voices" => Some(Event::Session(SessionAction::ListVoices)),
        "play" => Some(Event::Transport(TransportAction::Play)),
        "pause" => Some(Event::Transport(TransportAction::Pause)),
        "toggle" => Some(Event::Transport(TransportAction::Toggle)),
        "stop" => Some(Event::Transport(TransportAction::Stop)),
        "seek" => match rest.parse::<f64>() {
            Ok(secs) => Some(Event::Transport(TransportAction::Seek { secs })),
            Err(_) => Some(Event::Ui(UiAction::Say("Usage: seek <secs>".to_string()))),
        },
        "rate" => match rest.parse::<f64>() {
            Ok(rate) => Some(Event::Transport(TransportAction::SetRate { rate })),
            Err(_) => Some(Event::Ui(UiAction::Say("Usage: rate <x>".to_string()))),
        },
        "download" => Some(Event::Session(SessionAction::Download)),
        "export-json" => Some(Event::Session(SessionAction::ExportJson)),
        "history" | "ls" => Some(Event::Session(SessionAction::ListHistory)),
        "load" => Some(Event::Session(SessionAction::LoadHistory { id: rest })),
        "rm" => Some(Event::Session(SessionAction::DeleteHistory { id: rest })),
        "status" => Some(Event::Session(SessionAction::Status)),
        "theme" => Some(Event::Session(SessionAction::ToggleDarkMode)),
        "help" => Some(Event::Ui(UiAction::Say(HELP_TEXT.to_string()))),
        _ => None,
    }
}
