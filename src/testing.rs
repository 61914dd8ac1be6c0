//! In-memory stand-ins for the network, the terminal and key generation.
//!
//! Every fake hands out cheap clones sharing one state, so a test keeps a
//! handle for scripting and inspection while the `App` owns another.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use crate::features::config::credential_store::CredentialStore;
use crate::features::config::settings::Settings;
use crate::features::context::App;
use crate::tools::console::Console;
use crate::tools::errors::{ConnectError, KeyError, PromptError, SessionError};
use crate::tools::keys::{ForgedKey, KeyForge};
use crate::tools::macros::{plain_msg, OutputLevel};
use crate::tools::network::{DiscoveredHost, Ipv4Network, Scanner};
use crate::tools::prompt::{Prompter, Validator};
use crate::tools::session::{RemoteShell, Session, Transport};
use crate::tools::types::{Auth, CommandOutput, Target};

/// How the fake network answers a connection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Accept,
    RejectAuth,
    Unreachable,
}

/// How the fake device answers a command
#[derive(Debug, Clone)]
pub enum Script {
    Output(CommandOutput),
    /// The transport dies mid-command
    Drop,
    /// The command goes silent past the idle timeout
    Idle,
}

impl Script {
    pub fn output(output: CommandOutput) -> Self {
        Script::Output(output)
    }

    pub fn stdout(lines: &[&str]) -> Self {
        Script::Output(CommandOutput {
            stdout: lines.iter().map(|l| l.to_string()).collect(),
            stderr: vec![],
            exit_status: Some(0),
        })
    }

    pub fn stderr(lines: &[&str], exit_status: u32) -> Self {
        Script::Output(CommandOutput {
            stdout: vec![],
            stderr: lines.iter().map(|l| l.to_string()).collect(),
            exit_status: Some(exit_status),
        })
    }
}

/// One recorded connection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub address: String,
    pub user: String,
    pub method: &'static str,
}

#[derive(Default)]
struct NetworkState {
    fallback: HashMap<String, Reply>,
    queued: HashMap<String, VecDeque<Reply>>,
    scripts: Vec<(String, VecDeque<Script>)>,
    attempts: Vec<Attempt>,
    commands: Vec<String>,
    closed: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeNetwork {
    state: Rc<RefCell<NetworkState>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every attempt on `address` with `reply` once the queue is empty
    pub fn reply(&self, address: &str, reply: Reply) {
        self.state
            .borrow_mut()
            .fallback
            .insert(address.to_string(), reply);
    }

    /// Answer the next attempts on `address` with `replies`, in order
    pub fn then(&self, address: &str, replies: Vec<Reply>) {
        self.state
            .borrow_mut()
            .queued
            .entry(address.to_string())
            .or_default()
            .extend(replies);
    }

    /// Answer commands starting with `prefix`; successive calls queue
    /// successive answers and the last one sticks
    pub fn respond(&self, prefix: &str, script: Script) {
        let mut state = self.state.borrow_mut();
        match state.scripts.iter_mut().find(|(p, _)| p == prefix) {
            Some((_, queue)) => queue.push_back(script),
            None => state
                .scripts
                .push((prefix.to_string(), VecDeque::from([script]))),
        }
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.state.borrow().attempts.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    /// Whether a command starting with `prefix` ran
    pub fn ran(&self, prefix: &str) -> bool {
        self.state
            .borrow()
            .commands
            .iter()
            .any(|c| c.starts_with(prefix))
    }

    /// Addresses whose sessions were closed cleanly, in order
    pub fn closed(&self) -> Vec<String> {
        self.state.borrow().closed.clone()
    }
}

impl Transport for FakeNetwork {
    fn open(&self, target: &Target, auth: &Auth) -> Result<Box<dyn RemoteShell>, ConnectError> {
        let mut state = self.state.borrow_mut();
        state.attempts.push(Attempt {
            address: target.address.clone(),
            user: target.user.clone(),
            method: auth.method(),
        });
        let queued = state
            .queued
            .get_mut(&target.address)
            .and_then(VecDeque::pop_front);
        let reply = queued
            .or_else(|| state.fallback.get(&target.address).cloned())
            .unwrap_or(Reply::Unreachable);

        match reply {
            Reply::Accept => Ok(Box::new(FakeShell {
                address: target.address.clone(),
                state: self.state.clone(),
            })),
            Reply::RejectAuth => Err(ConnectError::Authentication {
                reason: "Permission denied".into(),
                stored_credential: false,
            }),
            Reply::Unreachable => Err(ConnectError::Unreachable("Connection refused".into())),
        }
    }
}

struct FakeShell {
    address: String,
    state: Rc<RefCell<NetworkState>>,
}

impl RemoteShell for FakeShell {
    fn exec(
        &mut self,
        command: &str,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<CommandOutput, SessionError> {
        let script = {
            let mut state = self.state.borrow_mut();
            state.commands.push(command.to_string());
            state
                .scripts
                .iter_mut()
                .find(|(prefix, _)| command.starts_with(prefix.as_str()))
                .and_then(|(_, queue)| {
                    if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    }
                })
        };

        match script {
            None => Ok(CommandOutput {
                exit_status: Some(0),
                ..Default::default()
            }),
            Some(Script::Output(output)) => {
                for line in &output.stdout {
                    on_line(line);
                }
                Ok(output)
            }
            Some(Script::Drop) => Err(SessionError::ConnectionLost("Connection reset by peer".into())),
            Some(Script::Idle) => Err(SessionError::IdleTimeout(Duration::from_secs(900))),
        }
    }

    fn close(&mut self) {
        self.state.borrow_mut().closed.push(self.address.clone());
    }
}

/// Console keeping every message as plain text
#[derive(Clone, Default)]
pub struct RecordingConsole {
    log: Rc<RefCell<Vec<String>>>,
    spinning: Rc<Cell<bool>>,
}

impl RecordingConsole {
    pub fn lines(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Streamed remote output, without the marker
    pub fn remote_lines(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter_map(|l| l.strip_prefix("> ").map(str::to_string))
            .collect()
    }

    pub fn count(&self, line: &str) -> usize {
        self.log.borrow().iter().filter(|l| *l == line).count()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.log.borrow().iter().any(|l| l.contains(fragment))
    }

    pub fn is_spinning(&self) -> bool {
        self.spinning.get()
    }
}

impl Console for RecordingConsole {
    fn print(&mut self, level: OutputLevel, message: &str) {
        self.spinning.set(false);
        self.log.borrow_mut().push(plain_msg(level, message));
    }

    fn remote_line(&mut self, line: &str) {
        self.log.borrow_mut().push(format!("> {}", line));
    }

    fn headline(&mut self, message: &str) {
        self.spinning.set(false);
        self.log.borrow_mut().push(format!("# {}", message));
    }

    fn start_progress(&mut self, message: &str) {
        self.spinning.set(true);
        self.log.borrow_mut().push(format!("~ {}", message));
    }

    fn stop_progress(&mut self) {
        self.spinning.set(false);
    }
}

/// A scripted operator answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Secret(String),
    Confirm(bool),
    Select(Option<usize>),
    Abort,
}

#[derive(Default)]
struct PromptState {
    answers: VecDeque<Answer>,
    asked: Vec<String>,
    rejected: Vec<String>,
    pauses: usize,
}

/// Prompter answering from a queue; validators run like on the terminal
#[derive(Clone, Default)]
pub struct ScriptedPrompter {
    state: Rc<RefCell<PromptState>>,
}

impl ScriptedPrompter {
    pub fn push(&self, answer: Answer) {
        self.state.borrow_mut().answers.push_back(answer);
    }

    pub fn text(&self, answer: &str) {
        self.push(Answer::Text(answer.to_string()));
    }

    pub fn secret(&self, answer: &str) {
        self.push(Answer::Secret(answer.to_string()));
    }

    pub fn confirm(&self, answer: bool) {
        self.push(Answer::Confirm(answer));
    }

    pub fn select(&self, answer: Option<usize>) {
        self.push(Answer::Select(answer));
    }

    pub fn abort(&self) {
        self.push(Answer::Abort);
    }

    /// Every prompt shown, including re-asks after rejected answers
    pub fn asked(&self) -> Vec<String> {
        self.state.borrow().asked.clone()
    }

    /// Validation messages of rejected answers
    pub fn rejected(&self) -> Vec<String> {
        self.state.borrow().rejected.clone()
    }

    pub fn remaining(&self) -> usize {
        self.state.borrow().answers.len()
    }

    pub fn pauses(&self) -> usize {
        self.state.borrow().pauses
    }

    fn next(&self, prompt: &str) -> Result<Answer, PromptError> {
        let mut state = self.state.borrow_mut();
        state.asked.push(prompt.to_string());
        match state.answers.pop_front() {
            None | Some(Answer::Abort) => Err(PromptError::Aborted(prompt.to_string())),
            Some(answer) => Ok(answer),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn text(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> Result<String, PromptError> {
        loop {
            let answer = match self.next(prompt)? {
                Answer::Text(answer) => answer,
                other => panic!("expected a text answer for {:?}, got {:?}", prompt, other),
            };
            let answer = match (answer.is_empty(), default) {
                (true, Some(default)) => default.to_string(),
                _ => answer,
            };
            match validate(&answer) {
                Ok(()) => return Ok(answer),
                Err(message) => self.state.borrow_mut().rejected.push(message),
            }
        }
    }

    fn secret(&mut self, prompt: &str) -> Result<String, PromptError> {
        match self.next(prompt)? {
            Answer::Secret(answer) => Ok(answer),
            other => panic!("expected a secret for {:?}, got {:?}", prompt, other),
        }
    }

    fn confirm(&mut self, prompt: &str, _default: bool) -> Result<bool, PromptError> {
        match self.next(prompt)? {
            Answer::Confirm(answer) => Ok(answer),
            other => panic!("expected a confirmation for {:?}, got {:?}", prompt, other),
        }
    }

    fn select(&mut self, prompt: &str, items: &[String]) -> Result<Option<usize>, PromptError> {
        match self.next(prompt)? {
            Answer::Select(answer) => {
                if let Some(index) = answer {
                    assert!(index < items.len(), "no item {} in {:?}", index, items);
                }
                Ok(answer)
            }
            other => panic!("expected a selection for {:?}, got {:?}", prompt, other),
        }
    }

    fn pause(&mut self, _message: &str) -> Result<(), PromptError> {
        self.state.borrow_mut().pauses += 1;
        Ok(())
    }
}

/// Key forge writing placeholder key files
#[derive(Clone, Default)]
pub struct StubKeyForge {
    forged: Rc<Cell<usize>>,
    failing: Rc<Cell<bool>>,
}

impl StubKeyForge {
    pub fn forged(&self) -> usize {
        self.forged.get()
    }

    pub fn fail(&self) {
        self.failing.set(true);
    }
}

impl KeyForge for StubKeyForge {
    fn forge(&self, dir: &Path) -> Result<ForgedKey, KeyError> {
        if self.failing.get() {
            return Err(KeyError::Generate("entropy source unavailable".into()));
        }
        let n = self.forged.get() + 1;
        self.forged.set(n);

        let file_name = format!("id_rsa_stub{}", n);
        let key = ForgedKey {
            private_path: dir.join(&file_name),
            public_path: dir.join(format!("{}.pub", file_name)),
            public_blob: format!("AAAAstub{}", n),
            file_name,
        };
        let write_error = |source| KeyError::Write {
            path: dir.display().to_string(),
            source,
        };
        fs::create_dir_all(dir).map_err(write_error)?;
        fs::write(&key.private_path, "stub private key").map_err(write_error)?;
        fs::write(&key.public_path, &key.public_blob).map_err(write_error)?;
        Ok(key)
    }
}

/// Scanner returning a fixed host list for a fixed local network
#[derive(Clone, Default)]
pub struct FakeScanner {
    hosts: Rc<RefCell<Vec<DiscoveredHost>>>,
    scanned: Rc<RefCell<Vec<String>>>,
}

impl FakeScanner {
    pub fn add(&self, address: &str, banner: Option<&str>) {
        let address = address.parse::<Ipv4Addr>().unwrap();
        self.hosts.borrow_mut().push(DiscoveredHost {
            address,
            banner: banner.map(str::to_string),
        });
    }

    /// Networks scanned so far
    pub fn scanned(&self) -> Vec<String> {
        self.scanned.borrow().clone()
    }
}

impl Scanner for FakeScanner {
    fn local_network(&self) -> Option<Ipv4Network> {
        Some(Ipv4Network::around(Ipv4Addr::new(192, 168, 1, 10)))
    }

    fn scan(&self, network: &Ipv4Network) -> Vec<DiscoveredHost> {
        self.scanned.borrow_mut().push(network.to_string());
        self.hosts.borrow().clone()
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with every tracing event down to `debug` rendered into a string
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}

/// A complete fake environment for building `App`s
pub struct TestBed {
    pub dir: TempDir,
    pub settings: Settings,
    pub network: FakeNetwork,
    pub prompts: ScriptedPrompter,
    pub console: RecordingConsole,
    pub keys: StubKeyForge,
    pub scanner: FakeScanner,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl TestBed {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            ssh_dir: dir.path().join("ssh").display().to_string(),
            known_hosts_file: dir.path().join("known_hosts").display().to_string(),
            ..Settings::default()
        };
        Self {
            dir,
            settings,
            network: FakeNetwork::new(),
            prompts: ScriptedPrompter::default(),
            console: RecordingConsole::default(),
            keys: StubKeyForge::default(),
            scanner: FakeScanner::default(),
            sleeps: Rc::default(),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("pacli").join("configs.json")
    }

    pub fn ssh_dir(&self) -> PathBuf {
        self.settings.ssh_dir()
    }

    pub fn store(&self) -> CredentialStore {
        CredentialStore::load(self.store_path())
    }

    /// Pauses requested through `App::pause`
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn app(&self) -> App {
        let sleeps = self.sleeps.clone();
        App {
            session: Default::default(),
            store: self.store(),
            settings: self.settings.clone(),
            transport: Box::new(self.network.clone()),
            keys: Box::new(self.keys.clone()),
            scanner: Box::new(self.scanner.clone()),
            console: Box::new(self.console.clone()),
            prompter: Box::new(self.prompts.clone()),
            sleep: Box::new(move |duration| sleeps.borrow_mut().push(duration)),
        }
    }

    /// An `App` already holding a session to `address` (consumes one reply)
    pub fn connected_app(&self, address: &str) -> App {
        let mut app = self.app();
        let target = Target {
            address: address.to_string(),
            port: 22,
            user: "pi".into(),
        };
        let shell = app
            .transport
            .open(&target, &Auth::Password("raspberry".into()))
            .unwrap();
        app.session.replace(Session::new(target, shell));
        app
    }

    /// Store a credential record whose key file exists
    pub fn remember(&self, address: &str, user: &str) -> PathBuf {
        let key_file = format!("id_rsa_known_{}", address.replace('.', "_"));
        let key_path = self.ssh_dir().join(&key_file);
        fs::create_dir_all(self.ssh_dir()).unwrap();
        fs::write(&key_path, "stored private key").unwrap();
        self.store()
            .upsert(
                address,
                crate::tools::types::CredentialRecord {
                    key_file,
                    user: user.into(),
                    added_at: None,
                },
            )
            .unwrap();
        key_path
    }
}
