//! UCI engine subprocess client.
//!
//! Spawns the engine with piped stdio, reads stdout on a dedicated thread and
//! hands lines over a channel so every wait can be bounded. The process is
//! asked to quit on `close` (and on drop) and killed if it does not.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::chess_errors::ChessErrors;
use crate::config::CoreConfig;
use crate::oracles::move_oracle::{MoveOracle, SearchLimit};

/// Grace period granted on top of a `movetime` search.
const MOVETIME_SLACK: Duration = Duration::from_secs(5);
const QUIT_GRACE: Duration = Duration::from_millis(500);
/// Shortest wait for `bestmove` after a timed-out search was stopped.
const STOP_GRACE: Duration = Duration::from_secs(2);

pub struct UciEngine {
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    rx: Receiver<String>,
    command: PathBuf,
    name: String,
    timeout: Duration,
}

impl UciEngine {
    /// Uses the command, arguments and timeout from `config`.
    pub fn from_config(config: &CoreConfig) -> Result<Self, ChessErrors> {
        let command = config
            .engine_command
            .as_deref()
            .ok_or_else(|| ChessErrors::Config("no engine_command configured".to_owned()))?;
        Self::spawn(command, &config.engine_args, config.engine_timeout())
    }

    /// Spawns the engine and runs the `uci`/`isready` handshake.
    pub fn spawn(command: &Path, args: &[String], timeout: Duration) -> Result<Self, ChessErrors> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .map(BufWriter::new)
            .ok_or_else(|| ChessErrors::OracleFailure("engine stdin unavailable".to_owned()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ChessErrors::OracleFailure("engine stdout unavailable".to_owned()))?;

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("uci-engine-reader".to_owned())
            .spawn(move || {
                let reader = BufReader::new(stdout);
                for line in reader.lines().map_while(Result::ok) {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })?;

        let mut engine = UciEngine {
            child: Some(child),
            stdin: Some(stdin),
            rx,
            command: command.to_path_buf(),
            name: command.display().to_string(),
            timeout,
        };

        if let Err(err) = engine.handshake() {
            engine.close();
            return Err(err);
        }
        info!("engine '{}' ready ({})", engine.name, engine.command.display());
        Ok(engine)
    }

    fn handshake(&mut self) -> Result<(), ChessErrors> {
        self.send("uci")?;
        let deadline = Instant::now() + self.timeout;
        loop {
            let line = self.next_line(deadline, "uciok")?;
            if let Some(name) = line.strip_prefix("id name ") {
                self.name = name.trim().to_owned();
            } else if line.trim() == "uciok" {
                break;
            }
        }
        self.is_ready()
    }

    fn send(&mut self, command: &str) -> Result<(), ChessErrors> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ChessErrors::OracleFailure("engine already closed".to_owned()))?;
        debug!("> {command}");
        writeln!(stdin, "{command}")?;
        stdin.flush()?;
        Ok(())
    }

    fn next_line(&self, deadline: Instant, waiting_for: &str) -> Result<String, ChessErrors> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Ok(line) => {
                debug!("< {line}");
                Ok(line)
            }
            Err(RecvTimeoutError::Timeout) => Err(ChessErrors::OracleFailure(format!(
                "timed out waiting for '{waiting_for}' from {}",
                self.name
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(ChessErrors::OracleFailure(format!(
                "{} exited while waiting for '{waiting_for}'",
                self.name
            ))),
        }
    }

    fn wait_for(&self, expected: &str, timeout: Duration) -> Result<String, ChessErrors> {
        let deadline = Instant::now() + timeout;
        loop {
            let line = self.next_line(deadline, expected)?;
            if line.split_whitespace().next() == Some(expected) {
                return Ok(line);
            }
        }
    }

    pub fn is_ready(&mut self) -> Result<(), ChessErrors> {
        self.send("isready")?;
        self.wait_for("readyok", self.timeout).map(|_| ())
    }

    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), ChessErrors> {
        self.send(&format!("setoption name {name} value {value}"))?;
        self.is_ready()
    }

    pub fn is_closed(&self) -> bool {
        self.child.is_none()
    }

    /// Stops a search that overran its deadline and swallows its late
    /// `bestmove`. An engine that does not answer is closed.
    fn abort_search(&mut self) {
        if self.is_closed() {
            return;
        }
        let stopped = self
            .send("stop")
            .and_then(|()| self.wait_for("bestmove", self.timeout.max(STOP_GRACE)));
        match stopped {
            Ok(line) => debug!("discarded late answer from {}: {line}", self.name),
            Err(err) => {
                warn!("{} did not stop its search ({err}), closing it", self.name);
                self.close();
            }
        }
    }
}

impl MoveOracle for UciEngine {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn new_game(&mut self) -> Result<(), ChessErrors> {
        self.send("ucinewgame")?;
        self.is_ready()
    }

    fn position_fen(&mut self, fen: &str) -> Result<(), ChessErrors> {
        self.send(&format!("position fen {fen}"))
    }

    fn best_move(&mut self, limit: SearchLimit) -> Result<String, ChessErrors> {
        let (go, timeout) = match limit {
            SearchLimit::Depth(depth) => (format!("go depth {depth}"), self.timeout),
            SearchLimit::MoveTime(time) => (
                format!("go movetime {}", time.as_millis()),
                self.timeout.max(time + MOVETIME_SLACK),
            ),
            SearchLimit::EngineDefault => ("go".to_owned(), self.timeout),
        };
        // Syncing first also drains output left over from an earlier search.
        self.is_ready()?;
        self.send(&go)?;

        let line = match self.wait_for("bestmove", timeout) {
            Ok(line) => line,
            Err(err) => {
                self.abort_search();
                return Err(err);
            }
        };
        match line.split_whitespace().nth(1) {
            Some("(none)") | Some("0000") | None => Err(ChessErrors::OracleFailure(format!(
                "{} has no move: {line}",
                self.name
            ))),
            Some(best) => Ok(best.to_owned()),
        }
    }

    fn close(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(err) = self.send("quit") {
            debug!("quit not delivered to {}: {err}", self.name);
        }
        self.stdin = None;

        let deadline = Instant::now() + QUIT_GRACE;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                Ok(None) | Err(_) => {
                    warn!("engine {} did not quit, killing it", self.name);
                    if let Err(err) = child.kill() {
                        warn!("failed to kill {}: {err}", self.name);
                    }
                    let _ = child.wait();
                    break;
                }
            }
        }
        info!("engine '{}' closed", self.name);
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::UciEngine;
    use crate::chess_errors::ChessErrors;
    use crate::oracles::move_oracle::{MoveOracle, SearchLimit};

    const FAKE_ENGINE: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "id name FakeFish 1.0"; echo "id author nobody"; echo "uciok" ;;
    isready) echo "readyok" ;;
    "go depth"*) echo "info depth 1 score cp 20"; echo "bestmove e2e4 ponder e7e5" ;;
    "go movetime"*) echo "bestmove (none)" ;;
    go) echo "bestmove g1f3" ;;
    quit) exit 0 ;;
  esac
done
"#;

    fn fake_engine(script: &str, timeout: Duration) -> Result<UciEngine, ChessErrors> {
        UciEngine::spawn(
            Path::new("sh"),
            &["-c".to_owned(), script.to_owned()],
            timeout,
        )
    }

    #[test]
    fn handshake_and_best_move() {
        let mut engine = fake_engine(FAKE_ENGINE, Duration::from_secs(5)).expect("fake engine should start");
        assert_eq!(engine.name(), "FakeFish 1.0");

        engine.new_game().expect("ucinewgame should succeed");
        engine
            .position_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("position should be sent");
        assert_eq!(
            engine.best_move(SearchLimit::Depth(4)).expect("engine should answer"),
            "e2e4"
        );
        assert_eq!(
            engine.best_move(SearchLimit::EngineDefault).expect("engine should answer"),
            "g1f3"
        );
        engine.set_option("Hash", "16").expect("setoption should succeed");
    }

    #[test]
    fn no_move_is_an_oracle_failure() {
        let mut engine = fake_engine(FAKE_ENGINE, Duration::from_secs(5)).expect("fake engine should start");
        let answer = engine.best_move(SearchLimit::MoveTime(Duration::from_millis(10)));
        assert!(matches!(answer, Err(ChessErrors::OracleFailure(_))));
    }

    #[test]
    fn close_is_idempotent() {
        let mut engine = fake_engine(FAKE_ENGINE, Duration::from_secs(5)).expect("fake engine should start");
        engine.close();
        assert!(engine.is_closed());
        engine.close();
        assert!(matches!(
            engine.best_move(SearchLimit::Depth(1)),
            Err(ChessErrors::OracleFailure(_))
        ));
    }

    #[test]
    fn silent_engine_times_out() {
        let started = fake_engine("sleep 5", Duration::from_millis(200));
        assert!(matches!(started, Err(ChessErrors::OracleFailure(_))));
    }

    const SLOW_FIRST_SEARCH: &str = r#"
searches=0
while read -r line; do
  case "$line" in
    uci) echo "id name Sleepy"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*)
      searches=$((searches + 1))
      if [ "$searches" -eq 1 ]; then sleep 1; echo "bestmove a2a3"; else echo "bestmove h2h4"; fi ;;
    quit) exit 0 ;;
  esac
done
"#;

    const NEVER_ANSWERS: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    quit) exit 0 ;;
  esac
done
"#;

    #[test]
    fn late_answer_is_not_returned_for_the_next_search() {
        let mut engine =
            fake_engine(SLOW_FIRST_SEARCH, Duration::from_millis(300)).expect("fake engine should start");
        assert!(matches!(
            engine.best_move(SearchLimit::Depth(1)),
            Err(ChessErrors::OracleFailure(_))
        ));
        assert!(!engine.is_closed());
        assert_eq!(
            engine.best_move(SearchLimit::Depth(1)).expect("engine should answer"),
            "h2h4"
        );
    }

    #[test]
    fn engine_ignoring_stop_is_closed() {
        let mut engine =
            fake_engine(NEVER_ANSWERS, Duration::from_millis(200)).expect("fake engine should start");
        assert!(matches!(
            engine.best_move(SearchLimit::EngineDefault),
            Err(ChessErrors::OracleFailure(_))
        ));
        assert!(engine.is_closed());
        assert!(engine.best_move(SearchLimit::EngineDefault).is_err());
    }

    #[test]
    fn missing_binary_is_an_io_error() {
        let started = UciEngine::spawn(
            Path::new("/nonexistent/engine-binary"),
            &[],
            Duration::from_secs(1),
        );
        assert!(matches!(started, Err(ChessErrors::Io(_))));
    }
}
