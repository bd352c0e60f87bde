//! Line-oriented host for the session. Reads one command per line and prints
//! every reply and event as a single JSON line.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::broadcast::error::RecvError,
};

use crate::{acquisition::AcquisitionMode, session::commands, AppState};

const HELP: &str = "commands: camera | upload | back | start | stop | reload | analyze | \
submit <path> | list | play <id> | open <id> | volume <0..1> | state | settings | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Camera,
    Upload,
    Back,
    StartCamera,
    StopCamera,
    ReloadCamera,
    Analyze,
    Submit(PathBuf),
    List,
    Play(String),
    Open(String),
    Volume(f32),
    State,
    Settings,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let argument = |name: &str| {
            if rest.is_empty() {
                Err(format!("{} needs an argument", name))
            } else {
                Ok(rest.to_string())
            }
        };

        match word.to_ascii_lowercase().as_str() {
            "camera" => Ok(Self::Camera),
            "upload" => Ok(Self::Upload),
            "back" => Ok(Self::Back),
            "start" => Ok(Self::StartCamera),
            "stop" => Ok(Self::StopCamera),
            "reload" => Ok(Self::ReloadCamera),
            "analyze" => Ok(Self::Analyze),
            "submit" => argument("submit").map(|p| Self::Submit(PathBuf::from(p))),
            "list" => Ok(Self::List),
            "play" => argument("play").map(Self::Play),
            "open" => argument("open").map(Self::Open),
            "volume" => argument("volume")?
                .parse::<f32>()
                .map(Self::Volume)
                .map_err(|_| format!("invalid volume '{}'", rest)),
            "state" => Ok(Self::State),
            "settings" => Ok(Self::Settings),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command '{}'", other)),
        }
    }
}

fn reply<T: Serialize>(result: Result<T, String>) -> Value {
    match result {
        Ok(value) => json!({ "ok": value }),
        Err(message) => json!({ "error": message }),
    }
}

/// Runs one command against the app. `None` means the host should exit.
pub async fn execute(state: &AppState, command: ConsoleCommand) -> Option<Value> {
    let value = match command {
        ConsoleCommand::Camera => reply(commands::select_mode(state, AcquisitionMode::Camera).await),
        ConsoleCommand::Upload => reply(commands::select_mode(state, AcquisitionMode::Upload).await),
        ConsoleCommand::Back => reply(commands::deselect_mode(state).await),
        ConsoleCommand::StartCamera => reply(commands::start_camera(state).await),
        ConsoleCommand::StopCamera => reply(commands::stop_camera(state).await),
        ConsoleCommand::ReloadCamera => reply(commands::reload_camera(state).await),
        ConsoleCommand::Analyze => reply(commands::capture_and_analyze(state).await),
        ConsoleCommand::Submit(path) => reply(commands::submit_file(state, path).await),
        ConsoleCommand::List => reply(commands::get_recommendations(state).await),
        ConsoleCommand::Play(id) => reply(commands::select_preview(state, id).await),
        ConsoleCommand::Open(id) => reply(commands::open_external(state, id).await),
        ConsoleCommand::Volume(volume) => reply(commands::set_volume(state, volume).await),
        ConsoleCommand::State => reply(commands::get_session_snapshot(state).await),
        ConsoleCommand::Settings => reply(commands::get_settings(state)),
        ConsoleCommand::Help => json!({ "help": HELP }),
        ConsoleCommand::Quit => return None,
    };
    Some(value)
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, value: &Value) -> anyhow::Result<()> {
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}

/// Serves commands from `input` until EOF or `quit`, interleaving session and
/// playback events as they arrive.
pub async fn run_console<R, W>(state: &AppState, input: R, mut output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut session_events = state.session.subscribe_events();
    let mut playback_events = state.session.playback().subscribe_events();

    write_line(&mut output, &json!({ "help": HELP })).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let value = match ConsoleCommand::parse(&line) {
                    Ok(command) => match execute(state, command).await {
                        Some(value) => value,
                        None => break,
                    },
                    Err(message) => json!({ "error": message }),
                };
                write_line(&mut output, &value).await?;
            }
            event = session_events.recv() => match event {
                Ok(event) => {
                    write_line(&mut output, &json!({ "event": event.name(), "payload": event })).await?;
                }
                Err(RecvError::Lagged(skipped)) => log::warn!("console skipped {} session events", skipped),
                Err(RecvError::Closed) => break,
            },
            event = playback_events.recv() => match event {
                Ok(event) => {
                    write_line(&mut output, &json!({ "event": "playback", "payload": event })).await?;
                }
                Err(RecvError::Lagged(skipped)) => log::warn!("console skipped {} playback events", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(
            ConsoleCommand::parse("submit  /tmp/face one.png"),
            Ok(ConsoleCommand::Submit(PathBuf::from("/tmp/face one.png")))
        );
        assert_eq!(ConsoleCommand::parse("PLAY 3"), Ok(ConsoleCommand::Play("3".into())));
        assert_eq!(ConsoleCommand::parse("volume 0.5"), Ok(ConsoleCommand::Volume(0.5)));
        assert_eq!(ConsoleCommand::parse("  quit "), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ConsoleCommand::parse("play").is_err());
        assert!(ConsoleCommand::parse("volume loud").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
    }

    #[tokio::test]
    async fn test_console_replies_and_stops_at_quit() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::build(dir.path()).unwrap();
        let script: &[u8] = b"upload\nplay 999\nquit\nback\n";
        let mut out = Vec::new();

        run_console(&state, script, &mut out).await.unwrap();

        let replies: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .filter(|value: &Value| value.get("event").is_none())
            .collect();
        assert!(replies[0].get("help").is_some());
        assert_eq!(replies[1]["ok"]["mode"], "upload");
        assert_eq!(replies[2]["error"], "unknown track: 999");
        assert_eq!(replies.len(), 3, "nothing after quit runs");

        state.shutdown().await;
    }
}
