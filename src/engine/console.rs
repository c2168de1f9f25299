// Interactive console: commands arrive from another thread and are drained once per frame

use glam::DVec2;
use log::{debug, info};
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

/// Console parsing errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Missing argument for '{0}'")]
    MissingArgument(&'static str),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

/// A parsed console command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Pause,
    Resume,
    Step,
    Quit,
    ToggleFps,
    Stats,
    CameraMove(DVec2),
    CameraPosition(DVec2),
    CameraScale(DVec2),
    CameraRotate(f64),
    CameraReset,
}

impl Command {
    /// Parse a single console line
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let head = words.next().ok_or(CommandError::Empty)?;

        match head.to_ascii_lowercase().as_str() {
            "pause" => Ok(Command::Pause),
            "resume" | "unpause" => Ok(Command::Resume),
            "step" => Ok(Command::Step),
            "quit" | "exit" => Ok(Command::Quit),
            "fps" => Ok(Command::ToggleFps),
            "stats" => Ok(Command::Stats),
            "camera" => {
                let sub = words.next().ok_or(CommandError::MissingArgument("camera"))?;
                match sub.to_ascii_lowercase().as_str() {
                    "move" => Ok(Command::CameraMove(parse_vec(&mut words, "camera move")?)),
                    "pos" => Ok(Command::CameraPosition(parse_vec(&mut words, "camera pos")?)),
                    "scale" => Ok(Command::CameraScale(parse_vec(&mut words, "camera scale")?)),
                    "rotate" => Ok(Command::CameraRotate(parse_number(
                        words.next(),
                        "camera rotate",
                    )?)),
                    "reset" => Ok(Command::CameraReset),
                    other => Err(CommandError::Unknown(format!("camera {}", other))),
                }
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_number(word: Option<&str>, command: &'static str) -> Result<f64, CommandError> {
    let word = word.ok_or(CommandError::MissingArgument(command))?;
    word.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::InvalidNumber(word.to_string()))
}

fn parse_vec<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
) -> Result<DVec2, CommandError> {
    let x = parse_number(words.next(), command)?;
    let y = parse_number(words.next(), command)?;
    Ok(DVec2::new(x, y))
}

/// Receiving end of the command queue
pub struct Console {
    receiver: Receiver<String>,
    disconnected: bool,
}

impl Console {
    /// Create a console and the sender used to feed it
    pub fn channel() -> (Sender<String>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            sender,
            Self {
                receiver,
                disconnected: false,
            },
        )
    }

    /// Create a console fed by lines read from stdin on a background thread
    pub fn spawn_stdin() -> std::io::Result<Self> {
        let (sender, console) = Self::channel();
        thread::Builder::new()
            .name("console-stdin".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if sender.send(line).is_err() {
                        break;
                    }
                }
            })?;
        info!("Console listening on stdin");
        Ok(console)
    }

    /// Take the next pending line without blocking
    pub fn poll(&mut self) -> Option<String> {
        if self.disconnected {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                debug!("Console input closed");
                self.disconnected = true;
                None
            }
        }
    }
}
