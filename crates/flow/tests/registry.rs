use flow::{BackgroundTaskRegistry, FlowEvent, FlowEventBus, SupersedePolicy, TaskOutcome, TaskStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn registry() -> BackgroundTaskRegistry<u32> {
  BackgroundTaskRegistry::new(FlowEventBus::new(16))
}

/// Tarea que espera a `release` y luego devuelve `value`.
fn held(release: Arc<Notify>, value: u32) -> impl FnOnce(tokio_util::sync::CancellationToken)
  -> std::pin::Pin<Box<dyn std::future::Future<Output = TaskOutcome<u32>> + Send>> {
  move |_token| {
    Box::pin(async move {
      release.notified().await;
      TaskOutcome::Completed(value)
    })
  }
}

#[tokio::test]
async fn set_task_supersedes_and_cancels_previous() {
  let reg = registry();
  let gate = Arc::new(Notify::new());
  let t1 = reg.spawn("shot_rater:wrist", SupersedePolicy::Cancel, held(gate.clone(), 1));
  let t2 = reg.spawn("shot_rater:wrist", SupersedePolicy::Cancel, held(gate.clone(), 2));

  assert_eq!(reg.len(), 1);
  assert_eq!(reg.get_task("shot_rater:wrist").map(|h| h.id()), Some(t2.id()));
  assert_eq!(t1.wait().await, TaskOutcome::Cancelled);

  gate.notify_one();
  assert_eq!(t2.wait().await, TaskOutcome::Completed(2));
}

#[tokio::test]
async fn orphan_policy_lets_previous_finish() {
  let reg = registry();
  let t1 = reg.spawn("coach:front", SupersedePolicy::Cancel, |_t| async { TaskOutcome::Completed(7) });
  let t2 = reg.spawn("coach:front", SupersedePolicy::Orphan, |_t| async { TaskOutcome::Completed(8) });
  assert_eq!(t1.wait().await, TaskOutcome::Completed(7));
  assert_eq!(t2.wait().await, TaskOutcome::Completed(8));
  assert_eq!(reg.get_task("coach:front").map(|h| h.id()), Some(t2.id()));
}

#[tokio::test]
async fn cancelling_completed_task_is_noop() {
  let reg = registry();
  let t = reg.spawn("stick", SupersedePolicy::Cancel, |_t| async { TaskOutcome::Completed(42) });
  assert_eq!(t.wait().await, TaskOutcome::Completed(42));

  assert!(reg.cancel_analysis("stick", false));
  // segunda cancelación: no hay entrada, no es error
  assert!(!reg.cancel_analysis("stick", false));
  t.cancel();
  assert_eq!(t.status(), TaskStatus::Completed(42));
  assert_eq!(t.wait().await, TaskOutcome::Completed(42));
}

#[tokio::test]
async fn cancel_broadcasts_once() {
  let reg = registry();
  let mut events = reg.bus().subscribe();
  let gate = Arc::new(Notify::new());
  let t = reg.spawn("shot_rater:slap", SupersedePolicy::Cancel, held(gate, 3));
  assert_eq!(events.recv().await.expect("started"),
             FlowEvent::AnalysisStarted { kind: "shot_rater:slap".into() });

  assert!(reg.cancel_analysis("shot_rater:slap", true));
  assert_eq!(events.recv().await.expect("cancelled"),
             FlowEvent::AnalysisCancelled { kind: "shot_rater:slap".into() });
  assert_eq!(t.wait().await, TaskOutcome::Cancelled);

  // un oyente que vuelva a cancelar no genera otro evento
  assert!(!reg.cancel_analysis("shot_rater:slap", true));
  let next = tokio::time::timeout(Duration::from_millis(50), events.recv()).await;
  assert!(next.is_err(), "no se esperaba otro evento");
}

#[tokio::test]
async fn cooperative_cancellation_suppresses_result() {
  let reg = registry();
  let t = reg.spawn("slow", SupersedePolicy::Cancel, |token| async move {
               token.cancelled().await;
               // aunque la tarea "termine", ya estaba cancelada
               TaskOutcome::Completed(99)
             });
  assert!(!t.is_finished());
  t.cancel();
  assert_eq!(t.wait().await, TaskOutcome::Cancelled);
}

#[tokio::test]
async fn finish_only_clears_matching_task() {
  let reg = registry();
  let old = reg.spawn("k", SupersedePolicy::Orphan, |_t| async { TaskOutcome::Completed(1) });
  let new = reg.spawn("k", SupersedePolicy::Orphan, |_t| async { TaskOutcome::Completed(2) });
  assert!(!reg.finish("k", old.id()));
  assert_eq!(reg.len(), 1);
  assert!(reg.finish("k", new.id()));
  assert!(reg.is_empty());
}

#[tokio::test]
async fn several_watchers_observe_the_same_task() {
  let reg = registry();
  let gate = Arc::new(Notify::new());
  let t = reg.spawn("shared", SupersedePolicy::Cancel, held(gate.clone(), 5));
  let again = reg.get_task("shared").expect("registrada");
  assert_eq!(t.id(), again.id());
  gate.notify_one();
  let (a, b) = tokio::join!(t.wait(), again.wait());
  assert_eq!(a, TaskOutcome::Completed(5));
  assert_eq!(b, TaskOutcome::Completed(5));
  assert_eq!(reg.active_kinds(), vec!["shared".to_string()]);
}
