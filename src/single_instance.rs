//! One window per user session.
//!
//! The first process binds a loopback port and listens on it. Later launches
//! find the port taken, send their file path (or just an activation request)
//! as one text line, and exit.

use crate::bridge::ShellEvent;
use anyhow::Context as _;
use crossbeam_channel::Sender;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INSTANCE_PORT: u16 = 47813;
pub const INSTANCE_PORT_ENV: &str = "MDREADER_INSTANCE_PORT";

const ACTIVATE_LINE: &str = "ACTIVATE";
const OPEN_PREFIX: &str = "OPEN ";
const MAX_MESSAGE_BYTES: u64 = 64 * 1024;
const IO_TIMEOUT: Duration = Duration::from_secs(2);

pub fn instance_port() -> u16 {
    std::env::var(INSTANCE_PORT_ENV)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(DEFAULT_INSTANCE_PORT)
}

pub enum InstanceRole {
    /// We own the lock and should show the window.
    Primary(InstanceLock),
    /// Another instance took our request; exit quietly.
    Secondary,
}

/// The primary instance's listening socket.
pub struct InstanceLock {
    listener: TcpListener,
}

/// Become the primary instance, or hand `file` to the one already running.
pub fn acquire(port: u16, file: Option<&Path>) -> anyhow::Result<InstanceRole> {
    match TcpListener::bind((Ipv4Addr::LOCALHOST, port)) {
        Ok(listener) => Ok(InstanceRole::Primary(InstanceLock { listener })),
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            forward(port, file)
                .with_context(|| format!("port {port} is taken but no instance answered"))?;
            Ok(InstanceRole::Secondary)
        }
        Err(err) => Err(err).with_context(|| format!("Failed to bind instance port {port}")),
    }
}

/// Send one request line to the primary instance.
pub fn forward(port: u16, file: Option<&Path>) -> anyhow::Result<()> {
    let mut stream = TcpStream::connect_timeout(&(Ipv4Addr::LOCALHOST, port).into(), IO_TIMEOUT)?;
    stream.set_write_timeout(Some(IO_TIMEOUT))?;
    let line = encode_message(file.map(absolute_path).as_deref());
    stream.write_all(line.as_bytes())?;
    stream.flush()?;
    Ok(())
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

pub fn encode_message(file: Option<&Path>) -> String {
    match file {
        Some(path) => format!("{OPEN_PREFIX}{}\n", path.to_string_lossy()),
        None => format!("{ACTIVATE_LINE}\n"),
    }
}

/// Every message brings the window forward; `OPEN` lines also carry a file.
pub fn decode_message(line: &str) -> Vec<ShellEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut events = vec![ShellEvent::Activate];
    if let Some(path) = line.strip_prefix(OPEN_PREFIX) {
        if !path.is_empty() {
            events.push(ShellEvent::OpenFile(PathBuf::from(path)));
        }
    }
    events
}

impl InstanceLock {
    pub fn port(&self) -> Option<u16> {
        self.listener.local_addr().ok().map(|addr| addr.port())
    }

    /// Accept forwarded requests on a background thread. `wake` runs after
    /// each delivered message so the UI can repaint.
    pub fn spawn_listener<F>(
        self,
        events: Sender<ShellEvent>,
        wake: F,
    ) -> anyhow::Result<std::thread::JoinHandle<()>>
    where
        F: Fn() + Send + 'static,
    {
        let listener = self.listener;
        let handle = std::thread::Builder::new()
            .name("instance-listener".into())
            .spawn(move || {
                for stream in listener.incoming() {
                    let stream = match stream {
                        Ok(stream) => stream,
                        Err(err) => {
                            log::debug!("Instance connection failed: {err}");
                            continue;
                        }
                    };
                    let line = match read_message(stream) {
                        Ok(line) => line,
                        Err(err) => {
                            log::debug!("Instance message unreadable: {err}");
                            continue;
                        }
                    };
                    for event in decode_message(&line) {
                        if events.send(event).is_err() {
                            return;
                        }
                    }
                    wake();
                }
            })
            .context("Failed to spawn instance listener")?;
        Ok(handle)
    }
}

fn read_message(stream: TcpStream) -> std::io::Result<String> {
    stream.set_read_timeout(Some(IO_TIMEOUT))?;
    let mut reader = BufReader::new(stream.take(MAX_MESSAGE_BYTES));
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_message_round_trip() {
        let path = PathBuf::from("/docs/read me.md");
        assert_eq!(
            decode_message(&encode_message(Some(&path))),
            vec![ShellEvent::Activate, ShellEvent::OpenFile(path)]
        );
        assert_eq!(
            decode_message(&encode_message(None)),
            vec![ShellEvent::Activate]
        );
    }

    #[test]
    fn test_unknown_message_still_activates() {
        assert_eq!(decode_message("HELLO\r\n"), vec![ShellEvent::Activate]);
        assert_eq!(decode_message("OPEN \n"), vec![ShellEvent::Activate]);
    }

    #[test]
    fn test_relative_paths_are_made_absolute() {
        let path = absolute_path(Path::new("notes.md"));
        assert!(path.is_absolute());
        assert!(path.ends_with("notes.md"));
    }

    #[test]
    fn test_second_launch_forwards_to_primary() {
        let InstanceRole::Primary(lock) = acquire(0, None).expect("bind") else {
            panic!("port 0 always binds");
        };
        let port = lock.port().expect("port");
        let (tx, rx) = crossbeam_channel::unbounded();
        let _listener = lock.spawn_listener(tx, || {}).expect("listener");

        let file = std::env::temp_dir().join("forwarded.md");
        let role = acquire(port, Some(&file)).expect("forward");
        assert!(matches!(role, InstanceRole::Secondary));

        let first = rx.recv_timeout(Duration::from_secs(5)).expect("activate");
        let second = rx.recv_timeout(Duration::from_secs(5)).expect("open");
        assert_eq!(first, ShellEvent::Activate);
        assert_eq!(second, ShellEvent::OpenFile(file));
    }
}
