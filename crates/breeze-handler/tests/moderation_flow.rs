//! End-to-end moderation tests
//!
//! Drive a [`Moderator`] the way a host would, with mock participants,
//! mock handlers and a counting detection layer.

use async_trait::async_trait;
use breeze_core::{LayerId, Result as CoreResult, Token};
use breeze_filters::{
    CensorMask, CensorOptions, DetectionLayer, DetectionService, LayerToggles,
    LonglistLayer, WordList,
};
use breeze_handler::{
    BreezeConfig, CancelReason, ChatHandler, DefaultHandler, HandlerError, HandlerInput,
    HandlerOutput, HandlerState, Moderator, Participant, PluginCatalog, SenderStateStore,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A chat participant that records the notices it receives
pub struct TestPlayer {
    name: String,
    notices: Mutex<Vec<String>>,
}

impl TestPlayer {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            notices: Mutex::new(Vec::new()),
        })
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }
}

impl Participant for TestPlayer {
    fn id(&self) -> &str {
        &self.name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn send_message(&self, text: &str) {
        self.notices.lock().push(text.to_string());
    }
}

/// Longlist layer that counts how often it is consulted
pub struct CountingLayer {
    inner: LonglistLayer,
    calls: AtomicU32,
}

impl CountingLayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: LonglistLayer::new(&WordList::builtin_longlist()).unwrap(),
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DetectionLayer for CountingLayer {
    fn id(&self) -> LayerId {
        LayerId::Longlist
    }

    async fn is_profane(&self, tokens: &[Token]) -> CoreResult<bool> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.is_profane(tokens).await
    }

    async fn mask(&self, tokens: &[Token], options: &CensorOptions) -> CoreResult<CensorMask> {
        self.inner.mask(tokens, options).await
    }
}

fn moderator() -> Moderator {
    Moderator::from_config(BreezeConfig::default()).unwrap()
}

fn started(mut moderator: Moderator) -> Moderator {
    moderator.start(&PluginCatalog::new(), None);
    moderator
}

#[tokio::test]
async fn test_alice_profanity_is_censored() {
    let moderator = started(moderator());
    let alice = TestPlayer::new("Alice");

    let output = moderator
        .on_chat(HandlerInput::new(alice.clone(), "you are an a$$hole"))
        .await;

    assert!(output.is_bad);
    assert!(!output.fully_cancel_message);
    assert_eq!(output.original_message, "you are an a$$hole");
    assert!(output.finished_message.ends_with(" #######"));
    assert!(!output.finished_message.contains("a$$hole"));
    assert_eq!(
        output.finished_message.chars().count(),
        output.original_message.chars().count()
    );
    assert!(output.worth_recording);
    assert!(alice.notices().is_empty());
    assert_eq!(moderator.stats().flagged, 1);
}

#[tokio::test(start_paused = true)]
async fn test_bob_second_message_is_throttled_before_detection() {
    let layer = CountingLayer::new();
    let detection = DetectionService::builder()
        .with_layer(layer.clone())
        .build()
        .unwrap();
    let moderator = started(Moderator::new(BreezeConfig::default(), detection));
    let bob = TestPlayer::new("Bob");

    let first = moderator.on_chat(HandlerInput::new(bob.clone(), "hello everyone")).await;
    assert!(!first.fully_cancel_message);
    assert_eq!(layer.calls(), 1);

    tokio::time::advance(Duration::from_millis(100)).await;
    let second = moderator.on_chat(HandlerInput::new(bob.clone(), "good game")).await;

    assert!(second.fully_cancel_message);
    assert_eq!(second.cancel_reason, Some(CancelReason::RateLimited));
    assert!(!second.is_bad);
    assert_eq!(layer.calls(), 1);
    assert_eq!(bob.notices(), vec!["You're sending messages too fast!".to_string()]);
    assert_eq!(moderator.sender_state("Bob").unwrap().last_message, "good game");
    assert_eq!(moderator.stats().rate_limited, 1);
}

#[tokio::test(start_paused = true)]
async fn test_message_after_cooldown_passes() {
    let moderator = started(moderator());
    let bob = TestPlayer::new("Bob");

    moderator.on_chat(HandlerInput::new(bob.clone(), "hello")).await;
    tokio::time::advance(Duration::from_millis(600)).await;
    let output = moderator.on_chat(HandlerInput::new(bob.clone(), "hello again")).await;

    assert!(!output.fully_cancel_message);
    assert!(bob.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_join_resets_and_quit_forgets() {
    let moderator = started(moderator());
    let carol = TestPlayer::new("Carol");

    moderator.on_chat(HandlerInput::new(carol.clone(), "hello")).await;
    moderator.on_join("Carol");

    let state = moderator.sender_state("Carol").unwrap();
    assert_eq!(state.last_message, "");
    assert_eq!(state.last_message_time, None);

    let output = moderator.on_chat(HandlerInput::new(carol.clone(), "hello again")).await;
    assert!(!output.fully_cancel_message);

    moderator.on_quit("Carol");
    assert!(moderator.sender_state("Carol").is_none());
}

#[tokio::test]
async fn test_all_layers_disabled_passes_everything() {
    let mut config = BreezeConfig::default();
    for layer in LayerId::ALL {
        match layer {
            LayerId::Toxicity => config.detection.layers.toxicity.enabled = false,
            LayerId::Statistical => config.detection.layers.statistical.enabled = false,
            LayerId::Extralist => config.detection.layers.extralist.enabled = false,
            LayerId::Longlist => config.detection.layers.longlist.enabled = false,
        }
    }
    let moderator = started(Moderator::from_config(config).unwrap());

    let output = moderator
        .on_chat(HandlerInput::new(TestPlayer::new("Alice"), "you are an a$$hole"))
        .await;

    assert!(!output.is_bad);
    assert_eq!(output.finished_message, output.original_message);
}

#[tokio::test]
async fn test_toggled_default_handler_passes_everything() {
    let detection = DetectionService::builtin().unwrap();
    let senders = SenderStateStore::new();
    let handler = DefaultHandler::default().with_toggles(LayerToggles::all_disabled());

    let output = handler
        .evaluate(
            &HandlerInput::new(TestPlayer::new("Alice"), "f>u>c>k this"),
            &senders,
            &detection,
        )
        .await;

    assert!(!output.is_bad);
    assert_eq!(output.finished_message, "f>u>c>k this");
}

enum Fault {
    Error,
    Panic,
    Hang,
    Malformed,
    DelegateThenMalformed,
}

struct FaultyHandler {
    fault: Fault,
}

#[async_trait]
impl ChatHandler for FaultyHandler {
    fn name(&self) -> &str {
        "faulty"
    }

    async fn handle(
        &self,
        input: &HandlerInput,
        senders: &SenderStateStore,
        detection: &DetectionService,
    ) -> Result<HandlerOutput, HandlerError> {
        match self.fault {
            Fault::Error => Err(anyhow::anyhow!("classifier backend unreachable").into()),
            Fault::Panic => panic!("custom handler bug"),
            Fault::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(HandlerOutput::pass(&input.message))
            }
            Fault::Malformed => Ok(HandlerOutput::pass("something else")),
            Fault::DelegateThenMalformed => {
                let mut output = DefaultHandler::default().evaluate(input, senders, detection).await;
                output.original_message.push('!');
                Ok(output)
            }
        }
    }
}

async fn assert_falls_back(fault: Fault) {
    let mut custom = moderator();
    custom.set_custom_handler(Arc::new(FaultyHandler { fault }));
    assert_eq!(custom.handler_state(), HandlerState::Custom);
    let reference = started(moderator());

    let message = "you are an a$$hole";
    let expected = reference
        .on_chat(HandlerInput::new(TestPlayer::new("Alice"), message))
        .await;
    let actual = custom
        .on_chat(HandlerInput::new(TestPlayer::new("Alice"), message))
        .await;

    assert_eq!(actual, expected);
    assert_eq!(custom.stats().fallbacks, 1);
    assert_eq!(custom.sender_state("Alice").unwrap().last_message, message);
}

#[tokio::test]
async fn test_failing_custom_handler_falls_back() {
    assert_falls_back(Fault::Error).await;
}

#[tokio::test]
async fn test_panicking_custom_handler_falls_back() {
    assert_falls_back(Fault::Panic).await;
}

#[tokio::test(start_paused = true)]
async fn test_hanging_custom_handler_falls_back() {
    assert_falls_back(Fault::Hang).await;
}

#[tokio::test]
async fn test_malformed_custom_output_falls_back() {
    assert_falls_back(Fault::Malformed).await;
}

#[tokio::test]
async fn test_fallback_is_not_throttled_by_the_failed_attempt() {
    assert_falls_back(Fault::DelegateThenMalformed).await;
}

#[tokio::test]
async fn test_events_wrap_every_decision() {
    let moderator = started(moderator());
    let log = Arc::new(Mutex::new(Vec::new()));

    {
        let log = log.clone();
        moderator.events().on_message_received("test", move |event| {
            log.lock().push(format!("received {}", event.message));
            Ok(())
        });
    }
    moderator.events().on_message_received("broken", |_| anyhow::bail!("observer bug"));
    {
        let log = log.clone();
        moderator.events().on_message_processed("test", move |event| {
            log.lock().push(format!("processed {} {} {}", event.handler, event.is_bad, event.output.finished_message));
            Ok(())
        });
    }

    let output = moderator
        .on_chat(HandlerInput::new(TestPlayer::new("Dave"), "good game"))
        .await;

    assert!(!output.is_bad);
    assert_eq!(
        *log.lock(),
        vec![
            "received good game".to_string(),
            "processed default false good game".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_messages_from_one_sender_pass_the_gate_once() {
    let moderator = started(moderator());
    let bob = TestPlayer::new("Bob");

    let (first, second) = tokio::join!(
        moderator.on_chat(HandlerInput::new(bob.clone(), "hello")),
        moderator.on_chat(HandlerInput::new(bob.clone(), "hello again")),
    );

    let cancelled = [&first, &second]
        .iter()
        .filter(|output| output.fully_cancel_message)
        .count();
    assert_eq!(cancelled, 1);
    assert_eq!(bob.notices().len(), 1);
}

/// Fails slowly on one message and delegates to the default handler otherwise
struct SlowFailure;

#[async_trait]
impl ChatHandler for SlowFailure {
    fn name(&self) -> &str {
        "slow-failure"
    }

    async fn handle(
        &self,
        input: &HandlerInput,
        senders: &SenderStateStore,
        detection: &DetectionService,
    ) -> Result<HandlerOutput, HandlerError> {
        if input.message == "slow" {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Err(anyhow::anyhow!("backend timed out").into());
        }
        Ok(DefaultHandler::default().evaluate(input, senders, detection).await)
    }
}

#[tokio::test(start_paused = true)]
async fn test_fallback_does_not_reopen_the_gate_for_a_concurrent_message() {
    let mut moderator = moderator();
    moderator.set_custom_handler(Arc::new(SlowFailure));
    let bob = TestPlayer::new("Bob");

    let (slow, fast) = tokio::join!(
        moderator.on_chat(HandlerInput::new(bob.clone(), "slow")),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            moderator
                .on_chat(HandlerInput::new(bob.clone(), "fast"))
                .await
        },
    );

    assert!(
        slow.fully_cancel_message || fast.fully_cancel_message,
        "two messages 10ms apart both passed the cooldown"
    );
    assert!(!slow.fully_cancel_message);
    assert!(fast.fully_cancel_message);
    assert_eq!(moderator.stats().fallbacks, 1);
    assert_eq!(moderator.sender_state("Bob").unwrap().last_message, "fast");
}

#[tokio::test(start_paused = true)]
async fn test_join_during_failed_attempt_is_kept() {
    let mut moderator = moderator();
    moderator.set_custom_handler(Arc::new(SlowFailure));
    let bob = TestPlayer::new("Bob");

    moderator.on_chat(HandlerInput::new(bob.clone(), "hello")).await;
    tokio::time::advance(Duration::from_secs(1)).await;

    let (output, ()) = tokio::join!(
        moderator.on_chat(HandlerInput::new(bob.clone(), "slow")),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            moderator.on_join("Bob");
        },
    );

    assert!(!output.fully_cancel_message);
    assert!(moderator.sender_state("Bob").is_some());
    assert_eq!(moderator.sender_state("Bob").unwrap().last_message, "slow");
}
