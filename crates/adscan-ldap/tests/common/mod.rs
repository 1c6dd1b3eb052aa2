//! In-memory directory backend for tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use adscan_ldap::{
    CertificateTrustPolicy, ConnectionConfig, DirectoryBackend, DirectoryEntryRaw, DirectoryError,
    DirectoryResult, DirectorySession, EntryStep, EntryStream, SearchRequest,
};

/// DER bytes presented by an untrusted test server.
pub const SELF_SIGNED_DER: &[u8] = &[0x30, 0x82, 0x03, 0x1c, 0x30, 0x82, 0x02, 0x04];

/// How the simulated server behaves at connect time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerBehavior {
    /// Certificate chains to the platform trust store (or no TLS).
    Trusted,
    /// Certificate fails platform validation and presents these bytes.
    Untrusted(Vec<u8>),
    /// Host unreachable.
    Unreachable,
}

#[derive(Debug)]
struct State {
    behavior: ServerBehavior,
    password: String,
    script: Vec<EntryStep>,
    hang_after_script: bool,
    search_failure: Option<String>,
    connect_attempts: Vec<Option<&'static str>>,
    requests: Vec<SearchRequest>,
}

/// Scripted backend. Clones share state so tests can inspect calls.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    state: Arc<Mutex<State>>,
    binds: Arc<AtomicUsize>,
    searches: Arc<AtomicUsize>,
    unbinds: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new(behavior: ServerBehavior) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                behavior,
                password: "correct horse".to_string(),
                script: Vec::new(),
                hang_after_script: false,
                search_failure: None,
                connect_attempts: Vec::new(),
                requests: Vec::new(),
            })),
            binds: Arc::new(AtomicUsize::new(0)),
            searches: Arc::new(AtomicUsize::new(0)),
            unbinds: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn trusted() -> Self {
        Self::new(ServerBehavior::Trusted)
    }

    pub fn with_script(self, script: Vec<EntryStep>) -> Self {
        self.state.lock().unwrap().script = script;
        self
    }

    pub fn hanging(self) -> Self {
        self.state.lock().unwrap().hang_after_script = true;
        self
    }

    pub fn failing_search(self, message: &str) -> Self {
        self.state.lock().unwrap().search_failure = Some(message.to_string());
        self
    }

    /// Policy names passed to each connect attempt, `None` for the platform store.
    pub fn connect_attempts(&self) -> Vec<Option<&'static str>> {
        self.state.lock().unwrap().connect_attempts.clone()
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn bind_calls(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn unbind_calls(&self) -> usize {
        self.unbinds.load(Ordering::SeqCst)
    }
}

impl DirectoryBackend for ScriptedBackend {
    type Session = ScriptedSession;

    async fn connect(
        &self,
        config: &ConnectionConfig,
        trust: Option<Arc<dyn CertificateTrustPolicy>>,
    ) -> DirectoryResult<ScriptedSession> {
        let behavior = {
            let mut state = self.state.lock().unwrap();
            state
                .connect_attempts
                .push(trust.as_ref().map(|p| p.name()));
            state.behavior.clone()
        };

        match behavior {
            ServerBehavior::Unreachable => Err(DirectoryError::network(
                config.target(),
                "connection refused",
            )),
            ServerBehavior::Untrusted(der) if config.use_tls() => match trust {
                Some(policy) if policy.accept(&der) => Ok(self.session()),
                _ => Err(DirectoryError::certificate(
                    config.target(),
                    "invalid peer certificate: UnknownIssuer",
                )),
            },
            _ => Ok(self.session()),
        }
    }
}

impl ScriptedBackend {
    fn session(&self) -> ScriptedSession {
        ScriptedSession {
            backend: self.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ScriptedSession {
    backend: ScriptedBackend,
}

impl DirectorySession for ScriptedSession {
    type Entries = ScriptedEntries;

    async fn bind(&mut self, _dn: &str, password: &str) -> DirectoryResult<()> {
        self.backend.binds.fetch_add(1, Ordering::SeqCst);
        let expected = self.backend.state.lock().unwrap().password.clone();
        if password == expected {
            Ok(())
        } else {
            Err(DirectoryError::Bind {
                rc: 49,
                message: "invalid credentials".to_string(),
            })
        }
    }

    async fn search(&mut self, request: &SearchRequest) -> DirectoryResult<ScriptedEntries> {
        self.backend.searches.fetch_add(1, Ordering::SeqCst);
        let mut state = self.backend.state.lock().unwrap();
        state.requests.push(request.clone());
        if let Some(message) = &state.search_failure {
            return Err(DirectoryError::search(message.clone()));
        }
        Ok(ScriptedEntries {
            steps: state.script.iter().cloned().collect(),
            hang: state.hang_after_script,
        })
    }

    async fn unbind(&mut self) -> DirectoryResult<()> {
        self.backend.unbinds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug)]
pub struct ScriptedEntries {
    steps: VecDeque<EntryStep>,
    hang: bool,
}

impl EntryStream for ScriptedEntries {
    async fn next_step(&mut self) -> Option<EntryStep> {
        match self.steps.pop_front() {
            Some(step) => Some(step),
            None if self.hang => std::future::pending().await,
            None => None,
        }
    }
}

/// Trust policy that counts how often it is asked.
#[derive(Debug, Default)]
pub struct CountingPolicy {
    pub accept: bool,
    pub calls: AtomicUsize,
}

impl CountingPolicy {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            accept: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CertificateTrustPolicy for CountingPolicy {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn accept(&self, certificate_der: &[u8]) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accept && !certificate_der.is_empty()
    }
}

pub fn config(use_tls: bool, force_tls: bool) -> ConnectionConfig {
    ConnectionConfig::builder()
        .host("dc1.ad.example.org")
        .use_tls(use_tls)
        .force_tls(force_tls)
        .bind_dn("CN=svc-reader,OU=Service Accounts,DC=ad,DC=example,DC=org")
        .password("correct horse")
        .build()
        .unwrap()
}

pub fn account(name: &str, uid_number: u32) -> DirectoryEntryRaw {
    DirectoryEntryRaw::new(format!("CN={name},OU=Staff,DC=ad,DC=example,DC=org"))
        .with_attr("cn", name)
        .with_attr("mail", format!("{}@example.com", name.to_lowercase()))
        .with_attr("uidNumber", uid_number.to_string())
        .with_attr("whenCreated", "20180312094501.0Z")
}

pub fn referral(host: &str) -> EntryStep {
    EntryStep::Referral(vec![format!("ldap://{host}/DC=partition,DC=example,DC=org")])
}

pub fn protocol_error(message: &str) -> EntryStep {
    EntryStep::ProtocolError(message.to_string())
}

pub fn search_failed(rc: u32, text: &str) -> EntryStep {
    EntryStep::SearchFailed {
        rc,
        message: format!("result code {rc}: {text}"),
    }
}
