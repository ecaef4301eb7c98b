//! Workflow integration tests
//!
//! These tests drive the orchestrator through the public API with
//! in-process agents and generators:
//! - Parallel phases overlap their agents
//! - A failed phase stops the run before later agents start
//! - Notification sink errors, panics and stalls never change the outcome
//! - Concurrent runs keep separate state
//! - Generation-backed agents thread parsed replies through the phases, and
//!   complete a run using their default outputs when replies are unusable

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fabri8_api::agents::{Agent, AgentRegistry, AgentResult, AgentRole, ExecutionContext};
use fabri8_api::config::AppConfig;
use fabri8_api::llm::{Generation, GenerationError, GenerationRequest, Generator};
use fabri8_api::workflow::{
    BroadcastNotifier, Notification, NotificationKind, NotificationSink, NotifyError,
    Orchestrator, RunStatus, StateKey, WorkflowError, WorkflowPlan,
};
use serde_json::json;

const AGENT_DELAY: Duration = Duration::from_millis(200);

/// Sleeps, counts its calls, and echoes the run prompt
struct SlowAgent {
    role: AgentRole,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Agent for SlowAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    fn preferred_model(&self) -> &str {
        "stub"
    }

    async fn execute(&self, context: &ExecutionContext) -> AgentResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(AGENT_DELAY).await;
        if self.fail {
            return AgentResult::failed(self.role, "stub generation error");
        }

        let prompt = context
            .get(StateKey::Prompt)
            .cloned()
            .or_else(|| {
                context
                    .get(StateKey::ProjectBrief)
                    .and_then(|brief| brief.get("prompt").cloned())
            })
            .unwrap_or_default();
        AgentResult::completed(
            self.role,
            json!({ "role": self.role.key(), "prompt": prompt, "html": "<p>stub</p>" }),
        )
    }
}

/// Records every notification with the instant it arrived
#[derive(Default)]
struct TimedRecorder {
    seen: Mutex<Vec<(Instant, Notification)>>,
}

impl TimedRecorder {
    fn seen(&self) -> Vec<(Instant, Notification)> {
        self.seen.lock().unwrap().clone()
    }

    fn instant_of(&self, phase: u8, kind: NotificationKind) -> Instant {
        self.seen()
            .into_iter()
            .find(|(_, n)| n.phase == phase && n.kind == kind)
            .map(|(at, _)| at)
            .unwrap_or_else(|| panic!("no {kind:?} notification for phase {phase}"))
    }
}

#[async_trait]
impl NotificationSink for TimedRecorder {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.seen
            .lock()
            .unwrap()
            .push((Instant::now(), notification.clone()));
        Ok(())
    }
}

/// Rejects every notification
struct BrokenSink;

#[async_trait]
impl NotificationSink for BrokenSink {
    async fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("socket closed".to_string()))
    }
}

/// Panics on every notification
struct PanickingSink;

#[async_trait]
impl NotificationSink for PanickingSink {
    async fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        panic!("subscriber crashed");
    }
}

/// Never finishes accepting a notification
struct StalledSink;

#[async_trait]
impl NotificationSink for StalledSink {
    async fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

type RoleCalls = Vec<(AgentRole, Arc<AtomicUsize>)>;

fn slow_registry(failing: Option<AgentRole>) -> (AgentRegistry, Arc<AtomicUsize>, RoleCalls) {
    let total = Arc::new(AtomicUsize::new(0));
    let mut per_role = Vec::new();
    let mut registry = AgentRegistry::new();

    for role in AgentRole::ALL {
        let calls = Arc::new(AtomicUsize::new(0));
        per_role.push((role, calls.clone()));
        registry.register(Arc::new(CountingAgent {
            inner: SlowAgent {
                role,
                fail: failing == Some(role),
                calls,
            },
            total: total.clone(),
        }));
    }

    (registry, total, per_role)
}

/// Wraps an agent and counts calls across the whole team
struct CountingAgent {
    inner: SlowAgent,
    total: Arc<AtomicUsize>,
}

#[async_trait]
impl Agent for CountingAgent {
    fn role(&self) -> AgentRole {
        self.inner.role()
    }

    fn preferred_model(&self) -> &str {
        self.inner.preferred_model()
    }

    async fn execute(&self, context: &ExecutionContext) -> AgentResult {
        self.total.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(context).await
    }
}

fn calls_for(per_role: &[(AgentRole, Arc<AtomicUsize>)], role: AgentRole) -> usize {
    per_role
        .iter()
        .find(|(r, _)| *r == role)
        .map(|(_, calls)| calls.load(Ordering::SeqCst))
        .unwrap_or_default()
}

#[tokio::test]
async fn test_parallel_phases_overlap_their_agents() {
    let recorder = Arc::new(TimedRecorder::default());
    let (registry, _, _) = slow_registry(None);
    let orchestrator =
        Orchestrator::new(WorkflowPlan::standard(Duration::ZERO), registry, recorder.clone())
            .unwrap();

    let outcome = orchestrator.start("run-parallel", "bakery").await.unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);

    // two 200ms agents per phase; sequential execution would need 400ms
    for phase in [2, 3] {
        let started = recorder.instant_of(phase, NotificationKind::PhaseStarted);
        let completed = recorder.instant_of(phase, NotificationKind::PhaseCompleted);
        let elapsed = completed.duration_since(started);
        assert!(elapsed >= AGENT_DELAY, "phase {phase} took {elapsed:?}");
        assert!(
            elapsed < Duration::from_millis(350),
            "phase {phase} took {elapsed:?}"
        );
    }
}

#[tokio::test]
async fn test_phase_two_failure_stops_the_run() {
    let recorder = Arc::new(TimedRecorder::default());
    let (registry, _, per_role) = slow_registry(Some(AgentRole::Backend));
    let orchestrator =
        Orchestrator::new(WorkflowPlan::standard(Duration::ZERO), registry, recorder.clone())
            .unwrap();

    let err = orchestrator.start("run-fail", "bakery").await.unwrap_err();

    match &err {
        WorkflowError::PhaseFailed { phase, role, cause } => {
            assert_eq!(*phase, 2);
            assert_eq!(*role, AgentRole::Backend);
            assert!(cause.contains("stub generation error"));
        }
        other => panic!("expected phase failure, got {other:?}"),
    }

    // the ui sibling still ran to completion
    assert_eq!(calls_for(&per_role, AgentRole::Ui), 1);
    assert_eq!(calls_for(&per_role, AgentRole::Frontend), 0);
    assert_eq!(calls_for(&per_role, AgentRole::Writer), 0);

    let seen = recorder.seen();
    let (_, failure) = seen
        .iter()
        .find(|(_, n)| n.kind == NotificationKind::PhaseFailed)
        .expect("phase failure notification");
    assert_eq!(failure.phase, 2);
    assert!(seen.iter().all(|(_, n)| n.phase <= 2));
    assert!(!seen
        .iter()
        .any(|(_, n)| n.kind == NotificationKind::RunCompleted));
}

#[tokio::test]
async fn test_broken_sink_does_not_change_outcome() {
    let (registry, total, _) = slow_registry(None);
    let orchestrator =
        Orchestrator::new(WorkflowPlan::standard(Duration::ZERO), registry, Arc::new(BrokenSink))
            .unwrap();

    let outcome = orchestrator.start("run-broken-sink", "bakery").await.unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(total.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_panicking_sink_does_not_change_outcome() {
    let (registry, total, _) = slow_registry(None);
    let orchestrator = Arc::new(
        Orchestrator::new(
            WorkflowPlan::standard(Duration::ZERO),
            registry,
            Arc::new(PanickingSink),
        )
        .unwrap(),
    );

    let run = tokio::spawn(async move { orchestrator.start("run-panicking-sink", "bakery").await });
    let outcome = run.await.expect("run task survives the sink").unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(total.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_stalled_sink_does_not_block_the_run() {
    let (registry, total, _) = slow_registry(None);
    let orchestrator = Orchestrator::new(
        WorkflowPlan::standard(Duration::ZERO),
        registry,
        Arc::new(StalledSink),
    )
    .unwrap()
    .with_delivery_timeout(Duration::from_millis(100));

    // six 200ms agent rounds plus at most two delivery timeouts of flushing
    let outcome = tokio::time::timeout(
        Duration::from_secs(3),
        orchestrator.start("run-stalled-sink", "bakery"),
    )
    .await
    .expect("run finished despite the stalled sink")
    .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(total.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_concurrent_runs_keep_separate_state() {
    let notifier = Arc::new(BroadcastNotifier::new());
    let mut bakery_events = notifier.subscribe_run("run-bakery");
    let (registry, total, _) = slow_registry(None);
    let orchestrator = Arc::new(
        Orchestrator::new(WorkflowPlan::standard(Duration::ZERO), registry, notifier.clone())
            .unwrap(),
    );

    let bakery = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.start("run-bakery", "bakery site").await })
    };
    let garage = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.start("run-garage", "garage site").await })
    };

    let bakery = bakery.await.unwrap().unwrap();
    let garage = garage.await.unwrap().unwrap();

    assert_eq!(bakery.run_id, "run-bakery");
    assert_eq!(garage.run_id, "run-garage");
    assert_eq!(total.load(Ordering::SeqCst), 16);

    // each run's brief carries its own prompt into phase 3
    assert_eq!(bakery.frontend_code["prompt"], "bakery site");
    assert_eq!(garage.frontend_code["prompt"], "garage site");

    let mut bakery_phases = Vec::new();
    while let Ok(Some(notification)) =
        tokio::time::timeout(Duration::from_millis(50), bakery_events.recv()).await
    {
        assert_eq!(notification.run_id, "run-bakery");
        bakery_phases.push(notification.phase);
    }
    assert!(!bakery_phases.is_empty());
    assert!(bakery_phases.windows(2).all(|pair| pair[0] <= pair[1]));
}

/// Answers every request with text no role can parse
struct GarbageGenerator {
    requests: AtomicUsize,
}

#[async_trait]
impl Generator for GarbageGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        assert_eq!(request.messages.len(), 2);
        Ok(Generation {
            content: "Sorry, I had trouble with that one.".to_string(),
        })
    }
}

#[tokio::test]
async fn test_generation_backed_run_completes_with_default_outputs() {
    let config = AppConfig {
        integration_delay: Duration::ZERO,
        ..AppConfig::new("test-key")
    };
    let generator = Arc::new(GarbageGenerator {
        requests: AtomicUsize::new(0),
    });
    let notifier = Arc::new(BroadcastNotifier::new());
    let mut events = notifier.subscribe_run("run-bakery");
    let orchestrator = Orchestrator::from_config(&config, generator.clone(), notifier).unwrap();

    let prompt = "Build a landing page for a family bakery in Lisbon";
    let outcome = orchestrator.start("run-bakery", prompt).await.unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(generator.requests.load(Ordering::SeqCst), 8);

    let html = outcome.frontend_code["html"].as_str().unwrap();
    assert!(!html.is_empty());
    assert!(html.contains("family bakery"));
    assert!(!outcome.content.is_null());
    assert!(!outcome.test_plan.is_null());
    assert!(!outcome.review_summary.is_null());
    assert!(!outcome.fixes.is_null());

    let mut brief_summary = None;
    while let Ok(Some(notification)) =
        tokio::time::timeout(Duration::from_millis(50), events.recv()).await
    {
        if notification.phase == 1 && notification.kind == NotificationKind::PhaseCompleted {
            brief_summary = notification
                .data
                .as_ref()
                .and_then(|data| data["project_brief"]["summary"].as_str())
                .map(str::to_string);
        }
    }
    assert_eq!(brief_summary.as_deref(), Some(prompt));
}

/// Answers each role with a well-formed reply, keyed by the role named in
/// the system message
#[derive(Default)]
struct ScriptedGenerator {
    pm_requests: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn role_of(request: &GenerationRequest) -> Option<AgentRole> {
        let system = &request.messages.first()?.content;
        AgentRole::ALL
            .into_iter()
            .find(|role| system.starts_with(&format!("You are a {}.", role.display_name())))
    }

    fn reply_for(role: AgentRole) -> String {
        match role {
            AgentRole::Pm => r#"Here is the brief:
{"summary": "Bakery landing page", "target_users": "Local families", "key_features": ["Menu", "Opening hours"], "design_direction": "Warm and rustic"}"#
                .to_string(),
            AgentRole::Ui => r##"{"layout": "Hero + Menu + Visit us", "colors": {"primary": "#8b4513"}, "components": ["Hero", "Menu"]}"##
                .to_string(),
            AgentRole::Frontend => "```html\n<!DOCTYPE html><html><body><h1>Crumbs</h1></body></html>\n```\n\
                 ```css\nh1 { color: #8b4513; }\n```\n\
                 ```javascript\nconsole.log('fresh');\n```"
                .to_string(),
            AgentRole::Backend => r#"{"models": ["Order"], "endpoints": ["/api/orders"], "authentication": "none"}"#
                .to_string(),
            AgentRole::Writer => r#"{"page_title": "Crumbs Bakery", "hero_headline": "Fresh bread every morning"}"#
                .to_string(),
            AgentRole::Reviewer => r#"{"score": 9, "issues": []}"#.to_string(),
            AgentRole::Qa => r#"{"happy_path": ["Browse the menu"]}"#.to_string(),
            AgentRole::Debugger => r#"{"fixes": [], "optimizations": ["Lazy-load images"]}"#.to_string(),
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        let role = Self::role_of(request)
            .ok_or_else(|| GenerationError::Other("unknown role".to_string()))?;
        if role == AgentRole::Pm {
            self.pm_requests
                .lock()
                .unwrap()
                .push(request.messages[1].content.clone());
        }
        Ok(Generation {
            content: Self::reply_for(role),
        })
    }
}

#[tokio::test]
async fn test_generation_backed_run_threads_parsed_outputs() {
    let config = AppConfig {
        integration_delay: Duration::ZERO,
        ..AppConfig::new("test-key")
    };
    let generator = Arc::new(ScriptedGenerator::default());
    let recorder = Arc::new(TimedRecorder::default());
    let orchestrator =
        Orchestrator::from_config(&config, generator.clone(), recorder.clone()).unwrap();

    let prompt = "Build a landing page for a bakery";
    let outcome = orchestrator.start("run-scripted", prompt).await.unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    let pm_requests = generator.pm_requests.lock().unwrap().clone();
    assert_eq!(pm_requests.len(), 1);
    assert!(pm_requests[0].contains(prompt));

    let completed_data = |phase: u8| {
        recorder
            .seen()
            .into_iter()
            .map(|(_, n)| n)
            .find(|n| n.phase == phase && n.kind == NotificationKind::PhaseCompleted)
            .and_then(|n| n.data)
            .unwrap_or_else(|| panic!("no data for phase {phase}"))
    };

    let design = completed_data(2);
    assert_eq!(design["design_spec"]["layout"], "Hero + Menu + Visit us");
    assert_eq!(design["design_spec"]["colors"]["primary"], "#8b4513");
    assert_eq!(design["backend_design"]["endpoints"][0], "/api/orders");

    let implementation = completed_data(3);
    assert_eq!(implementation["content"]["page_title"], "Crumbs Bakery");
    assert_eq!(
        implementation["frontend_code"]["html"],
        "<!DOCTYPE html><html><body><h1>Crumbs</h1></body></html>"
    );
    assert_eq!(implementation["frontend_code"]["js"], "console.log('fresh');");

    assert_eq!(outcome.review_summary["score"], 9);
    assert_eq!(outcome.test_plan["happy_path"][0], "Browse the menu");
    assert_eq!(outcome.fixes["optimizations"][0], "Lazy-load images");
}
