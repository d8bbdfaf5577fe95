use flow::{FlowContext, FlowDefinition, FlowKey, FlowState, FlowValue, LinearFlow, MediaKind, MediaReference,
           PipelineError, PipelineResult, SelectionOption, Stage, StageCatalog, Transition};
use std::sync::Arc;

fn capture_flow() -> Arc<dyn FlowDefinition> {
  let stages = vec![Stage::selection("type",
                                     "Tipo",
                                     vec![SelectionOption::new("wrist", "Muñeca"), SelectionOption::new("slap", "Slap")]),
                    Stage::media_capture("capture", "Graba", vec![MediaKind::Video], 1, 1, "de perfil"),
                    Stage::processing("processing", "Analizando", "..."),
                    Stage::results("results", "Resultado")];
  Arc::new(LinearFlow::new("capture-flow", stages).expect("definición válida")
                                                   .retaining(vec![FlowKey::pre_selection("type")]))
}

fn video() -> FlowValue {
  FlowValue::Media(vec![MediaReference::new("/tmp/shot.mov", MediaKind::Video)])
}

#[test]
fn duplicate_stage_ids_are_rejected() {
  let res = StageCatalog::new(vec![Stage::results("a", "A"), Stage::results("a", "B")]);
  assert!(res.is_err());
  assert!(LinearFlow::new("empty", vec![]).is_err());
}

#[test]
fn next_and_previous_are_pure() {
  let def = capture_flow();
  let mut ctx = FlowContext::new();
  ctx.set(FlowKey::stage("type"), FlowValue::Choice("wrist".into()));
  for id in ["type", "capture", "processing", "results"] {
    let a = def.next_stage(Some(id), &ctx).map(|s| s.id.clone());
    let b = def.next_stage(Some(id), &ctx).map(|s| s.id.clone());
    assert_eq!(a, b);
    let p1 = def.previous_stage(id, &ctx).map(|s| s.id.clone());
    let p2 = def.previous_stage(id, &ctx).map(|s| s.id.clone());
    assert_eq!(p1, p2);
  }
  assert_eq!(def.next_stage(None, &ctx).map(|s| s.id.as_str()), Some("type"));
  assert!(def.next_stage(Some("results"), &ctx).is_none());
  assert!(def.previous_stage("type", &ctx).is_none());
}

#[test]
fn rejected_proceed_never_moves() {
  let mut state = FlowState::new(capture_flow());
  assert!(state.current_stage().is_none());
  state.start();
  assert_eq!(state.current_stage_id(), Some("type"));

  // sin selección
  match state.proceed() {
    Transition::Rejected { reason } => assert!(!reason.is_empty()),
    other => panic!("esperaba rechazo, obtuve {:?}", other),
  }
  assert_eq!(state.current_stage_id(), Some("type"));

  // opción desconocida
  state.set_data(FlowKey::stage("type"), FlowValue::Choice("backhand".into()));
  assert!(matches!(state.proceed(), Transition::Rejected { .. }));
  assert_eq!(state.current_stage_id(), Some("type"));
}

#[test]
fn go_back_after_proceed_returns_to_origin() {
  let mut state = FlowState::new(capture_flow());
  state.start();
  state.set_data(FlowKey::stage("type"), FlowValue::Choice("slap".into()));
  let before = state.context().clone();

  let t = state.proceed();
  assert_eq!(t, Transition::Advanced { from: Some("type".into()), to: "capture".into() });
  assert!(state.go_back());
  assert_eq!(state.current_stage_id(), Some("type"));
  assert_eq!(state.context(), &before);
}

#[test]
fn media_capture_validates_count_and_kind() {
  let mut state = FlowState::new(capture_flow());
  state.start();
  state.set_data(FlowKey::stage("type"), FlowValue::Choice("wrist".into()));
  state.proceed();

  assert!(matches!(state.proceed(), Transition::Rejected { .. }));
  state.set_data(FlowKey::stage("capture"),
                 FlowValue::Media(vec![MediaReference::new("/tmp/a.jpg", MediaKind::Image)]));
  assert!(matches!(state.proceed(), Transition::Rejected { .. }));
  state.set_data(FlowKey::stage("capture"), video());
  assert!(matches!(state.proceed(), Transition::Advanced { .. }));
  assert_eq!(state.current_stage_id(), Some("processing"));
}

#[test]
fn go_back_is_blocked_where_stage_forbids_it() {
  let mut state = FlowState::new(capture_flow());
  state.jump_to("processing").expect("jump");
  assert!(!state.go_back());
  assert_eq!(state.current_stage_id(), Some("processing"));

  let mut fresh = FlowState::new(capture_flow());
  assert!(!fresh.go_back());
  fresh.start();
  assert!(!fresh.go_back());
}

#[test]
fn proceed_from_results_completes() {
  let mut state = FlowState::new(capture_flow());
  state.jump_to("results").expect("jump");
  assert_eq!(state.proceed(), Transition::Completed);
  assert!(state.is_on_results());
}

#[test]
fn restart_keeps_only_retained_keys() {
  let mut state = FlowState::new(capture_flow());
  state.set_data(FlowKey::pre_selection("type"), FlowValue::Choice("wrist".into()));
  state.set_data(FlowKey::stage("type"), FlowValue::Choice("wrist".into()));
  state.set_data(FlowKey::stage("capture"), video());
  state.store_result(PipelineResult::Failure(PipelineError::NetworkIssue("offline".into())));
  state.jump_to("results").expect("jump");

  state.restart();
  assert_eq!(state.current_stage_id(), Some("type"));
  assert_eq!(state.context().len(), 1);
  assert_eq!(state.context().choice(&FlowKey::pre_selection("type")), Some("wrist"));
}

#[test]
fn jump_to_unknown_stage_fails_and_keeps_cursor() {
  let mut state = FlowState::new(capture_flow());
  state.start();
  assert!(state.jump_to("nope").is_err());
  assert_eq!(state.current_stage_id(), Some("type"));
}

#[test]
fn result_is_consumed_once() {
  let mut state = FlowState::new(capture_flow());
  state.store_result(PipelineResult::Success(serde_json::json!({"score": 80})));
  assert!(state.context().outcome().is_some());
  assert!(state.take_result().is_some());
  assert!(state.take_result().is_none());
}

#[test]
fn custom_stage_requires_declared_keys() {
  let def = LinearFlow::new("custom",
                            vec![Stage::custom("profile", "Perfil", "player_profile", vec![FlowKey::input("height_cm")]),
                                 Stage::results("results", "Resultado")]).expect("def");
  let mut state = FlowState::new(Arc::new(def));
  state.start();
  assert!(matches!(state.proceed(), Transition::Rejected { .. }));
  state.set_data(FlowKey::input("height_cm"), FlowValue::Number(180.0));
  assert!(matches!(state.proceed(), Transition::Advanced { .. }));
}

#[test]
fn optional_stage_is_not_validated() {
  let def = LinearFlow::new("optional",
                            vec![Stage::custom("notes", "Notas", "notes", vec![FlowKey::input("notes")]).optional(),
                                 Stage::results("results", "Resultado")]).expect("def");
  let mut state = FlowState::new(Arc::new(def));
  state.start();
  assert!(matches!(state.proceed(), Transition::Advanced { .. }));
}

#[test]
fn processing_waits_for_the_pipeline_result() {
  let mut state = FlowState::new(capture_flow());
  state.jump_to("processing").expect("jump");
  assert!(matches!(state.proceed(), Transition::Rejected { .. }));
  assert_eq!(state.current_stage_id(), Some("processing"));

  state.store_result(PipelineResult::Success(serde_json::json!({"score": 64})));
  assert_eq!(state.proceed(), Transition::Advanced { from: Some("processing".into()), to: "results".into() });
}

#[test]
fn results_stage_does_not_go_back() {
  let mut state = FlowState::new(capture_flow());
  state.jump_to("results").expect("jump");
  assert!(!state.go_back());
  assert_eq!(state.current_stage_id(), Some("results"));
  assert!(!Stage::results("r", "R").can_go_back);
}
