use flow::errors::FlowError;
use flow::{BackgroundTaskRegistry, FlowEventBus, FlowState, FlowValue, LinearFlow, MediaKind, MediaReference,
           PipelineResult, SelectionOption, Stage, SupersedePolicy, TaskOutcome};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), FlowError> {
    // Definición lineal: elegir -> grabar -> analizar -> resultado
    let def = LinearFlow::new("demo",
                              vec![Stage::selection("kind",
                                                    "Tipo de tiro",
                                                    vec![SelectionOption::new("wrist", "Muñeca"),
                                                         SelectionOption::new("slap", "Slap")]),
                                   Stage::media_capture("capture", "Graba tu tiro", vec![MediaKind::Video], 1, 1, "De perfil"),
                                   Stage::processing("processing", "Analizando", "Un momento..."),
                                   Stage::results("results", "Resultado")])?;
    let mut state = FlowState::new(Arc::new(def));
    state.start();
    println!("stage inicial: {:?}", state.current_stage_id());

    // sin elección el stage requerido no deja avanzar
    println!("proceed sin datos: {:?}", state.proceed());
    state.set_data(flow::FlowKey::stage("kind"), FlowValue::Choice("wrist".into()));
    println!("proceed: {:?}", state.proceed());
    state.set_data(flow::FlowKey::stage("capture"),
                   FlowValue::Media(vec![MediaReference::new("/tmp/tiro.mp4", MediaKind::Video)]));
    println!("proceed: {:?}", state.proceed());

    // El análisis corre en el registro, no en el estado
    let registry: BackgroundTaskRegistry<PipelineResult> = BackgroundTaskRegistry::new(FlowEventBus::default());
    let mut events = registry.bus().subscribe();
    let handle = registry.spawn("demo:wrist", SupersedePolicy::Cancel, |_token| async move {
                             TaskOutcome::Completed(PipelineResult::Success(json!({ "overall_score": 80 })))
                         });
    println!("evento: {:?}", events.recv().await);
    if let TaskOutcome::Completed(result) = handle.wait().await {
        registry.finish("demo:wrist", handle.id());
        state.store_result(result);
        println!("proceed: {:?}", state.proceed());
    }
    println!("en resultados: {}, resultado: {:?}", state.is_on_results(), state.take_result());
    Ok(())
}
