use std::io::{self, BufRead};
use std::thread;

use crossbeam_channel::{Receiver, unbounded};

/// Requests typed on stdin while the queue plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    PlayPause,
    Next,
    Prev,
}

impl ControlCmd {
    /// One command per line: `q`, `p`, `l` and `h`, or their long names.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "q" | "quit" => Some(Self::Quit),
            "p" | "pause" => Some(Self::PlayPause),
            "l" | "next" => Some(Self::Next),
            "h" | "prev" => Some(Self::Prev),
            _ => None,
        }
    }
}

/// Read commands from stdin on a background thread. The receiver disconnects
/// when stdin closes.
pub fn spawn_stdin_reader() -> Receiver<ControlCmd> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("stdin: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match ControlCmd::parse(&line) {
                Some(cmd) => {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                None => log::warn!("unknown command {:?} (q, p, l, h)", line.trim()),
            }
        }
        log::debug!("stdin closed");
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_forms() {
        assert_eq!(ControlCmd::parse("q"), Some(ControlCmd::Quit));
        assert_eq!(ControlCmd::parse("  quit\n"), Some(ControlCmd::Quit));
        assert_eq!(ControlCmd::parse("p"), Some(ControlCmd::PlayPause));
        assert_eq!(ControlCmd::parse("next"), Some(ControlCmd::Next));
        assert_eq!(ControlCmd::parse("h"), Some(ControlCmd::Prev));
        assert_eq!(ControlCmd::parse("x"), None);
        assert_eq!(ControlCmd::parse(""), None);
    }
}
