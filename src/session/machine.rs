//! Per-connection session state machine.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{ExecState, SessionId};
use crate::api::types::{ClientMessage, ServerMessage};
use crate::execution::{
    Command, ExecEvent, ProcessHandle, ShellExecutor, EVENT_BUFFER, INTERRUPT_KEY,
};
use crate::workspace::{parse_cd, Completer, Navigator, WorkingDirectory};

/// Collaborators shared by every session of a server.
#[derive(Debug, Clone)]
pub struct ShellEnv {
    pub cwd: WorkingDirectory,
    pub navigator: Navigator,
    pub completer: Completer,
    pub executor: ShellExecutor,
}

impl ShellEnv {
    pub fn new(cwd: WorkingDirectory, home: impl Into<PathBuf>, executor: ShellExecutor) -> Self {
        Self {
            navigator: Navigator::new(cwd.clone(), home),
            completer: Completer::new(cwd.clone()),
            cwd,
            executor,
        }
    }
}

/// Server-side state of one connection.
///
/// Messages are handled strictly in the order they are passed in.
/// Replies and subprocess output go to the outbox in generation order.
/// Events from the running subprocess arrive on the receiver returned
/// by [`ShellSession::new`] and must be fed back through
/// [`ShellSession::handle_event`].
pub struct ShellSession {
    id: SessionId,
    env: ShellEnv,
    state: ExecState,
    process: Option<ProcessHandle>,
    outbox: mpsc::UnboundedSender<ServerMessage>,
    events: mpsc::Sender<ExecEvent>,
}

impl ShellSession {
    pub fn new(
        id: SessionId,
        env: ShellEnv,
        outbox: mpsc::UnboundedSender<ServerMessage>,
    ) -> (Self, mpsc::Receiver<ExecEvent>) {
        let (events, events_rx) = mpsc::channel(EVENT_BUFFER);
        let session = Self {
            id,
            env,
            state: ExecState::Idle,
            process: None,
            outbox,
            events,
        };
        (session, events_rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    /// Pid of the running subprocess, if any.
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(ProcessHandle::pid)
    }

    /// Send the initial prompt.
    pub fn greet(&self) {
        self.send(ServerMessage::greeting(self.env.cwd.prompt()));
    }

    /// Dispatch one client message.
    pub async fn handle(&mut self, message: ClientMessage) {
        debug!(session = %self.id, ?message, "received");
        match message {
            ClientMessage::Prompt => {
                self.send(ServerMessage::prompt(self.env.cwd.prompt()));
            }
            ClientMessage::Key { key } => self.press(&key),
            ClientMessage::Tab { start } => {
                let candidates = self.env.completer.complete(&start).await;
                self.send(ServerMessage::completion(candidates));
            }
            ClientMessage::Command { command } => self.command(&command).await,
        }
    }

    /// Apply an event from the running subprocess.
    pub fn handle_event(&mut self, event: ExecEvent) {
        match event {
            ExecEvent::Output(chunk) => self.send(ServerMessage::output(chunk.text)),
            ExecEvent::Exited(exit) => {
                debug!(
                    session = %self.id,
                    code = ?exit.exit_code,
                    interrupted = exit.interrupted,
                    "command finished"
                );
                self.process = None;
                self.state.transition_to(ExecState::Idle);
                self.send(ServerMessage::finished(self.env.cwd.prompt()));
            }
        }
    }

    /// Release the session's subprocess, interrupting it if still running.
    pub fn close(&mut self) {
        if let Some(process) = self.process.take() {
            debug!(session = %self.id, pid = ?process.pid(), "terminating process on close");
            process.interrupt();
        }
    }

    fn press(&mut self, key: &str) {
        let Some(process) = &self.process else {
            return;
        };
        if key == INTERRUPT_KEY {
            debug!(session = %self.id, pid = ?process.pid(), "interrupt requested");
            process.interrupt();
        } else if !process.write(key.as_bytes()) {
            debug!(session = %self.id, "process input closed, key dropped");
        }
    }

    async fn command(&mut self, command_line: &str) {
        if let Some(target) = parse_cd(command_line) {
            let reply = match self.env.navigator.change_directory(target).await {
                Ok(_) => ServerMessage::prompt(self.env.cwd.prompt()),
                Err(e) => ServerMessage::failure(e.to_string(), self.env.cwd.prompt()),
            };
            self.send(reply);
            return;
        }

        if command_line.is_empty() {
            return;
        }
        if !self.state.can_execute() {
            debug!(session = %self.id, "command dropped, already executing");
            return;
        }

        self.state.transition_to(ExecState::Executing);
        self.send(ServerMessage::executing());

        let command = Command::from_input(command_line).working_dir(self.env.cwd.get());
        match self.env.executor.spawn(&command, self.events.clone()) {
            Ok(process) => self.process = Some(process),
            Err(e) => {
                warn!(session = %self.id, "{}", e);
                self.send(ServerMessage::output(format!("{}\n", e)));
                self.state.transition_to(ExecState::Idle);
                self.send(ServerMessage::finished(self.env.cwd.prompt()));
            }
        }
    }

    fn send(&self, message: ServerMessage) {
        // The receiver only goes away while the connection is being torn down.
        let _ = self.outbox.send(message);
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        session: ShellSession,
        events: mpsc::Receiver<ExecEvent>,
        outbox: mpsc::UnboundedReceiver<ServerMessage>,
        dir: TempDir,
        home: TempDir,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_executor(ShellExecutor::system_default())
        }

        fn with_executor(executor: ShellExecutor) -> Self {
            let dir = TempDir::new().unwrap();
            let home = TempDir::new().unwrap();
            let cwd = WorkingDirectory::new(dir.path().canonicalize().unwrap());
            let env = ShellEnv::new(cwd, home.path(), executor);
            let (tx, outbox) = mpsc::unbounded_channel();
            let (session, events) = ShellSession::new(SessionId::from_raw(1), env, tx);
            Self {
                session,
                events,
                outbox,
                dir,
                home,
            }
        }

        fn prompt_for(path: &std::path::Path) -> String {
            format!("{}>", path.canonicalize().unwrap().display())
        }

        fn drain(&mut self) -> Vec<ServerMessage> {
            let mut out = Vec::new();
            while let Ok(msg) = self.outbox.try_recv() {
                out.push(msg);
            }
            out
        }

        /// Feed subprocess events until the session is idle again.
        async fn run_to_idle(&mut self) -> Vec<ServerMessage> {
            while self.session.state().is_executing() {
                let event = tokio::time::timeout(Duration::from_secs(10), self.events.recv())
                    .await
                    .expect("command did not finish in time")
                    .expect("event channel closed");
                self.session.handle_event(event);
            }
            self.drain()
        }

        async fn command(&mut self, line: &str) {
            self.session
                .handle(ClientMessage::Command {
                    command: line.to_string(),
                })
                .await;
        }
    }

    #[tokio::test]
    async fn test_greeting_and_prompt() {
        let mut h = Harness::new();
        h.session.greet();
        h.session.handle(ClientMessage::Prompt).await;

        let prompt = Harness::prompt_for(h.dir.path());
        assert_eq!(
            h.drain(),
            vec![
                ServerMessage::greeting(prompt.clone()),
                ServerMessage::prompt(prompt)
            ]
        );
    }

    #[tokio::test]
    async fn test_tab_completion() {
        let mut h = Harness::new();
        for name in ["file10", "file2", "file1", "other"] {
            std::fs::write(h.dir.path().join(name), "").unwrap();
        }
        h.session
            .handle(ClientMessage::Tab { start: "fi".into() })
            .await;

        assert_eq!(
            h.drain(),
            vec![ServerMessage::completion(vec![
                "file1".into(),
                "file2".into(),
                "file10".into()
            ])]
        );
    }

    #[tokio::test]
    async fn test_cd_home() {
        let mut h = Harness::new();
        h.command("cd ").await;

        let prompt = Harness::prompt_for(h.home.path());
        assert_eq!(h.drain(), vec![ServerMessage::prompt(prompt)]);
        assert_eq!(h.session.state(), ExecState::Idle);
    }

    #[tokio::test]
    async fn test_cd_missing_keeps_directory() {
        let mut h = Harness::new();
        h.command("cd /does/not/exist").await;
        h.session.handle(ClientMessage::Prompt).await;

        let prompt = Harness::prompt_for(h.dir.path());
        assert_eq!(
            h.drain(),
            vec![
                ServerMessage::failure("cd /does/not/exist: No such directory", prompt.clone()),
                ServerMessage::prompt(prompt),
            ]
        );
    }

    #[tokio::test]
    async fn test_key_while_idle_is_ignored() {
        let mut h = Harness::new();
        h.session.handle(ClientMessage::Key { key: "x".into() }).await;
        h.session
            .handle(ClientMessage::Key {
                key: INTERRUPT_KEY.into(),
            })
            .await;
        assert!(h.drain().is_empty());
    }

    #[tokio::test]
    async fn test_empty_command_is_ignored() {
        let mut h = Harness::new();
        h.command("").await;
        assert!(h.drain().is_empty());
        assert_eq!(h.session.state(), ExecState::Idle);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_then_finished() {
        let mut h = Harness::new();
        h.command("printf 'a\\nb\\n'").await;
        assert_eq!(h.session.state(), ExecState::Executing);
        assert!(h.session.pid().is_some());

        let mut messages = h.drain();
        messages.extend(h.run_to_idle().await);

        assert_eq!(messages.first(), Some(&ServerMessage::executing()));
        let prompt = Harness::prompt_for(h.dir.path());
        assert_eq!(messages.last(), Some(&ServerMessage::finished(prompt)));

        let output: String = messages
            .iter()
            .filter(|m| m.error == Some(true))
            .filter_map(|m| m.data.clone())
            .collect();
        assert_eq!(output, "a\nb\n");
        assert!(h.session.pid().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_second_command_dropped_while_executing() {
        let mut h = Harness::new();
        h.command("echo run >> marker; sleep 0.3").await;
        h.command("echo run >> marker; sleep 0.3").await;

        let messages = h.run_to_idle().await;
        let started = messages
            .iter()
            .filter(|m| m.is_executing == Some(true))
            .count();
        assert_eq!(started, 1);

        let marker = std::fs::read_to_string(h.dir.path().join("marker")).unwrap();
        assert_eq!(marker, "run\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupt_stops_long_command() {
        let mut h = Harness::new();
        h.command("sleep 30").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.session
            .handle(ClientMessage::Key {
                key: INTERRUPT_KEY.into(),
            })
            .await;

        let started = std::time::Instant::now();
        let messages = h.run_to_idle().await;
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(
            messages.last().and_then(|m| m.is_executing),
            Some(false)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_keys_reach_stdin() {
        let mut h = Harness::new();
        h.command("read line; echo got $line").await;
        for key in ["h", "i", "\n"] {
            h.session.handle(ClientMessage::Key { key: key.into() }).await;
        }

        let messages = h.run_to_idle().await;
        assert!(messages
            .iter()
            .any(|m| m.data.as_deref() == Some("got hi\n")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_runs_in_shared_directory() {
        let mut h = Harness::new();
        std::fs::create_dir(h.dir.path().join("inner")).unwrap();
        h.command("cd inner").await;
        h.command("pwd -P").await;

        let messages = h.run_to_idle().await;
        let expected = format!(
            "{}\n",
            h.dir.path().join("inner").canonicalize().unwrap().display()
        );
        assert!(messages.iter().any(|m| m.data.as_deref() == Some(expected.as_str())));
    }

    #[tokio::test]
    async fn test_spawn_failure_reported_in_band() {
        let mut h = Harness::with_executor(ShellExecutor::new("/nonexistent/shell", "-c"));
        h.command("ls").await;

        let messages = h.drain();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], ServerMessage::executing());
        assert_eq!(messages[1].error, Some(true));
        assert!(messages[1]
            .data
            .as_deref()
            .unwrap()
            .contains("failed to spawn shell"));
        assert_eq!(messages[2].is_executing, Some(false));
        assert_eq!(h.session.state(), ExecState::Idle);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_close_terminates_process() {
        let mut h = Harness::new();
        h.command("sleep 30").await;
        h.session.close();

        let exit = loop {
            let event = tokio::time::timeout(Duration::from_secs(10), h.events.recv())
                .await
                .unwrap()
                .unwrap();
            if let ExecEvent::Exited(exit) = event {
                break exit;
            }
        };
        assert!(exit.interrupted);
    }
}
