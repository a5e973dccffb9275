use super::*;
use async_trait::async_trait;
use herald_broadcast::JsonLineSets;
use herald_core::error::HeraldError;
use herald_guard::OwnerVerifier;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const OWNER: &str = "1000000001";
const ADMIN: &str = "2000000002";
const USER: &str = "3000000003";
const CHAT: &str = "-100500";

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_dir() -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "__herald_gateway_test_{}_{n}__",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<OutgoingMessage>>,
    /// Inbound side handed out by `start`, for driving the event loop.
    inbound: Mutex<Option<mpsc::Sender<IncomingMessage>>>,
}

impl Recorder {
    fn last_reply(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|m| m.text.clone())
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Channel for Recorder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, HeraldError> {
        let (tx, rx) = mpsc::channel(16);
        *self.inbound.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), HeraldError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn stop(&self) -> Result<(), HeraldError> {
        Ok(())
    }
}

struct Harness {
    gateway: Arc<Gateway>,
    recorder: Arc<Recorder>,
    dir: PathBuf,
}

impl Harness {
    async fn new() -> Self {
        let dir = temp_dir();
        let mut config = Config::default();
        config.herald.data_dir = dir.to_string_lossy().into_owned();
        config.owner.id = OWNER.to_string();
        config.owner.secret = "test-secret".to_string();
        config.guard.admins = vec![ADMIN.to_string()];
        // Long enough that no broadcast line fires during a test.
        config.broadcast.min_delay_ms = 60_000;
        config.broadcast.max_delay_ms = 60_000;
        config.memory.db_path = dir.join("herald.db").to_string_lossy().into_owned();

        let verifier = Arc::new(
            OwnerVerifier::open(OWNER, &config.owner.secret, &config.owner_record_path()).unwrap(),
        );
        let gate = Arc::new(Gate::new(verifier, &config.guard));
        let roster = Arc::new(AdminRoster::open(&config.admins_path(), &config.guard.admins).unwrap());

        let line_sets = JsonLineSets::new(config.lines_dir());
        line_sets.append("chor", "x").unwrap();
        line_sets.append("chor", "y").unwrap();

        let store = Store::new(&config.memory).await.unwrap();

        let recorder = Arc::new(Recorder::default());
        let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
        channels.insert("mock".to_string(), recorder.clone());

        let gateway = Gateway::new(
            &config,
            channels,
            gate,
            roster,
            Arc::new(line_sets),
            store,
        );

        Self {
            gateway: Arc::new(gateway),
            recorder,
            dir,
        }
    }

    async fn say(&self, sender: &str, text: &str) -> Option<String> {
        let before = self.recorder.count();
        self.gateway
            .handle_message(IncomingMessage::text("mock", sender, CHAT, text))
            .await;
        if self.recorder.count() > before {
            self.recorder.last_reply()
        } else {
            None
        }
    }

    fn scheduler(&self) -> &BroadcastScheduler {
        &self.gateway.schedulers["mock"]
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

#[tokio::test]
async fn test_plain_chat_is_ignored() {
    let h = Harness::new().await;
    assert_eq!(h.say(USER, "hello everyone").await, None);
    assert_eq!(h.say(USER, "!").await, None);
}

#[tokio::test]
async fn test_operator_starts_and_stops_broadcast() {
    let h = Harness::new().await;

    let reply = h.say(ADMIN, "!startfun chor").await.unwrap();
    assert!(reply.contains("'chor' started (2 lines)"), "{reply}");
    assert!(h.scheduler().is_active(CHAT).await);

    let reply = h.say(ADMIN, "/stopfun").await.unwrap();
    assert!(reply.contains("'chor' stopped"), "{reply}");
    assert!(!h.scheduler().is_active(CHAT).await);
}

#[tokio::test]
async fn test_user_emergency_stop_is_forbidden() {
    let h = Harness::new().await;
    h.say(ADMIN, "!startfun chor").await.unwrap();

    let reply = h.say(USER, "!emergencystop").await.unwrap();
    assert!(reply.contains("'emergencystop' is not available to users"), "{reply}");
    assert!(h.scheduler().is_active(CHAT).await);

    let (ok, denied, error) = h.gateway.audit.totals().await.unwrap();
    assert_eq!((ok, denied, error), (1, 1, 0));
}

#[tokio::test]
async fn test_owner_emergency_stop_halts_everything() {
    let h = Harness::new().await;
    h.say(ADMIN, "!startfun chor").await.unwrap();

    let reply = h.say(OWNER, "!emergencystop").await.unwrap();
    assert!(reply.contains("1 broadcasts halted"), "{reply}");
    assert!(h.scheduler().active().await.is_empty());
}

#[tokio::test]
async fn test_user_cannot_start_broadcast() {
    let h = Harness::new().await;
    let reply = h.say(USER, "!startfun chor").await.unwrap();
    assert!(reply.contains("not available"), "{reply}");
    assert!(!h.scheduler().is_active(CHAT).await);
}

#[tokio::test]
async fn test_unknown_command_is_owner_only() {
    let h = Harness::new().await;

    let reply = h.say(OWNER, "!selfdestruct").await.unwrap();
    assert!(reply.contains("Unknown command 'selfdestruct'"), "{reply}");

    let reply = h.say(ADMIN, "!selfdestruct").await.unwrap();
    assert!(reply.contains("not available to operators"), "{reply}");
}

#[tokio::test]
async fn test_promoted_user_gains_operator_commands() {
    let h = Harness::new().await;

    let reply = h.say(OWNER, &format!("!addadmin {USER}")).await.unwrap();
    assert!(reply.contains("Admin added"), "{reply}");

    let reply = h.say(USER, "!startfun chor").await.unwrap();
    assert!(reply.contains("started"), "{reply}");
}

#[tokio::test]
async fn test_lockdown_admits_only_owner() {
    let h = Harness::new().await;

    h.say(OWNER, "!lockdown drill").await.unwrap();
    let reply = h.say(ADMIN, "!help").await.unwrap();
    assert!(reply.contains("Lockdown active"), "{reply}");

    let reply = h.say(OWNER, "!ping").await.unwrap();
    assert!(reply.contains("Pong"), "{reply}");

    h.say(OWNER, "!unlock").await.unwrap();
    let reply = h.say(ADMIN, "!ping").await.unwrap();
    assert!(reply.contains("Pong"), "{reply}");
}

#[tokio::test]
async fn test_blocked_actor_is_rejected() {
    let h = Harness::new().await;

    h.say(OWNER, &format!("!block {USER}")).await.unwrap();
    let reply = h.say(USER, "!ping").await.unwrap();
    assert!(reply.contains("actor is blocked"), "{reply}");

    h.say(OWNER, &format!("!unblock {USER}")).await.unwrap();
    let reply = h.say(USER, "!ping").await.unwrap();
    assert!(reply.contains("Pong"), "{reply}");
}

#[tokio::test]
async fn test_owner_cannot_be_blocked_by_command() {
    let h = Harness::new().await;
    let reply = h.say(OWNER, &format!("!block {OWNER}")).await.unwrap();
    assert!(reply.contains("Cannot block the owner"), "{reply}");
    assert!(!h.gateway.gate.is_blocked(OWNER));
}

#[tokio::test]
async fn test_rate_limit_reply_carries_retry() {
    let h = Harness::new().await;
    for _ in 0..10 {
        let reply = h.say(USER, "!ping").await.unwrap();
        assert!(reply.contains("Pong"));
    }
    let reply = h.say(USER, "!ping").await.unwrap();
    assert!(reply.contains("Try again in"), "{reply}");

    // Other commands have their own window.
    let reply = h.say(USER, "!help").await.unwrap();
    assert!(reply.contains("commands (user)"), "{reply}");
}

#[tokio::test]
async fn test_handler_error_is_reported_and_audited() {
    let h = Harness::new().await;
    let reply = h.say(ADMIN, "!startfun nosuchset").await.unwrap();
    assert!(reply.starts_with("❌"), "{reply}");
    assert!(!h.scheduler().is_active(CHAT).await);

    let (ok, denied, error) = h.gateway.audit.totals().await.unwrap();
    assert_eq!((ok, denied, error), (0, 0, 1));
}

#[tokio::test]
async fn test_dangerous_arguments_are_recorded() {
    let h = Harness::new().await;
    // Three suspicious events inside the abuse window block the actor.
    for _ in 0..3 {
        h.say(ADMIN, "!updatefun chor eval(1)").await.unwrap();
    }
    assert!(h.gateway.gate.is_blocked(ADMIN));
    let reply = h.say(ADMIN, "!ping").await.unwrap();
    assert!(reply.contains("actor is blocked"), "{reply}");
}

#[tokio::test]
async fn test_shutdown_rejects_out_of_range_delay() {
    let h = Harness::new().await;
    let reply = h.say(OWNER, "!shutdown 99").await.unwrap();
    assert!(reply.contains("1-60"), "{reply}");
    let reply = h.say(OWNER, "!shutdown soon").await.unwrap();
    assert!(reply.contains("1-60"), "{reply}");

    let reply = h.say(ADMIN, "!shutdown 1").await.unwrap();
    assert!(reply.contains("not available to operators"), "{reply}");
}

#[tokio::test]
async fn test_owner_shutdown_ends_event_loop() {
    let h = Harness::new().await;
    let run = tokio::spawn(h.gateway.clone().run());

    let inbound = loop {
        if let Some(tx) = h.recorder.inbound.lock().unwrap().clone() {
            break tx;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    inbound
        .send(IncomingMessage::text("mock", ADMIN, CHAT, "!startfun chor"))
        .await
        .unwrap();
    for _ in 0..200 {
        if h.scheduler().is_active(CHAT).await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(h.scheduler().is_active(CHAT).await);

    inbound
        .send(IncomingMessage::text("mock", OWNER, CHAT, "!shutdown 1"))
        .await
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("event loop did not stop");
    assert!(result.unwrap().is_ok());
    assert!(h.scheduler().active().await.is_empty());

    let replies: Vec<String> = h
        .recorder
        .sent
        .lock()
        .unwrap()
        .iter()
        .map(|m| m.text.clone())
        .collect();
    assert!(replies.iter().any(|r| r.contains("Shutdown in 1s")), "{replies:?}");
}

#[tokio::test]
async fn test_reload_reads_edited_roster() {
    let h = Harness::new().await;
    let reply = h.say(USER, "!startfun chor").await.unwrap();
    assert!(reply.contains("not available"), "{reply}");

    let path = h.gateway.roster.path().to_path_buf();
    std::fs::write(&path, format!(r#"["{ADMIN}", "{USER}"]"#)).unwrap();

    let reply = h.say(OWNER, "!reload").await.unwrap();
    assert!(reply.contains("reloaded: 2 admins"), "{reply}");

    let reply = h.say(USER, "!startfun chor").await.unwrap();
    assert!(reply.contains("started"), "{reply}");
}

#[tokio::test]
async fn test_funlist_and_security_report_runtime_figures() {
    let h = Harness::new().await;

    let reply = h.say(ADMIN, "!funlist").await.unwrap();
    assert!(reply.contains("Pace: 60000-60000ms"), "{reply}");

    let reply = h.say(OWNER, "!security").await.unwrap();
    assert!(reply.contains("Audit database:"), "{reply}");
}
