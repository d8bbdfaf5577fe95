use anyhow::{anyhow, Context, Result};
use coach_domain::{FeatureKind, PlayerProfile, Position};
use coach_workflow::{CoachServices, FeatureSession, SessionStep};
use flow::{GateDecision, MediaKind, PipelineResult, ScriptedAnalysisService, StaticAccessProvider};
use serde_json::{json, Value as JsonValue};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

/// Menú interactivo para recorrer una feature de análisis de punta a punta.
///
/// El análisis lo resuelve un servicio guionizado (no hay IA real detrás) y
/// el acceso de pago se pregunta en la consola. Media y snapshots se guardan
/// bajo `COACH_STORAGE_DIR`.
///
/// Con `--demo <feature>` recorre el flujo sin preguntar nada.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("--demo") {
        let feature: FeatureKind = args.get(1).map(String::as_str).unwrap_or("shot_rater").parse()?;
        let services = CoachServices::from_env(scripted(feature), Arc::new(StaticAccessProvider::granting()))?;
        let result = run_scripted(feature, services).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let feature: FeatureKind = prompt("Feature (shot_rater | stick_analyzer | ai_coach): ")?.parse()?;
    let services = CoachServices::from_env(scripted(feature), Arc::new(StaticAccessProvider::granting()))?;
    let mut session = FeatureSession::open(feature, services, None)?;

    loop {
        print_stage(&session);
        println!("1) Elegir opción");
        println!("2) Capturar media (ruta local)");
        println!("3) Cargar perfil (stick analyzer)");
        println!("4) Continuar");
        println!("5) Volver");
        println!("6) Esperar resultado");
        println!("7) Cancelar análisis");
        println!("8) Reintentar");
        println!("9) Reiniciar");
        println!("0) Salir (el análisis sigue en segundo plano)");
        // fin de la entrada: se sale como con la opción 0
        let choice = prompt_line("Elige una opción: ")?.unwrap_or_else(|| "0".to_string());
        let outcome = match choice.trim() {
            "1" => {
                let id = prompt("Opción: ")?;
                session.select(id.trim()).map(|_| None)
            }
            "2" => capture_from_disk(&mut session).await.map(|_| None),
            "3" => load_profile(&mut session).map(|_| None),
            "4" => match session.proceed() {
                Ok(SessionStep::Gated { trigger_id, capability }) => {
                    let answer = prompt(&format!("'{}' requiere acceso de pago. ¿Comprar? (s/n): ", capability))?;
                    let decision = if answer.trim().eq_ignore_ascii_case("s") {
                        GateDecision::Granted
                    } else {
                        GateDecision::Dismissed
                    };
                    session.resolve_gate(trigger_id, decision).map(Some)
                }
                other => other.map(Some),
            },
            "5" => {
                if !session.go_back() {
                    println!("No se puede volver desde aquí");
                }
                Ok(None)
            }
            "6" => session.await_result().await.map(Some),
            "7" => session.cancel().map(|c| Some(if c { SessionStep::Cancelled } else { SessionStep::Stayed })),
            "8" => session.retry().map(Some),
            "9" => session.restart().map(Some),
            "0" => {
                if let Some(task) = session.dismiss()? {
                    log::info!("la tarea {} sigue en segundo plano", task);
                }
                break;
            }
            _ => {
                println!("Opción no válida");
                Ok(None)
            }
        };
        match outcome {
            Ok(Some(step)) => println!("-> {:?}", step),
            Ok(None) => {}
            Err(e) => eprintln!("Error: {}", e),
        }
        if let Some(result) = session.result() {
            print_result(result);
        }
    }
    Ok(())
}

/// Lee una línea ya recortada. None al llegar al final de la entrada.
fn read_trimmed(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn prompt_line(label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush().ok();
    Ok(read_trimmed(&mut io::stdin().lock())?)
}

/// Como `prompt_line`, pero el fin de la entrada es un error.
fn prompt(label: &str) -> Result<String> {
    prompt_line(label)?.ok_or_else(|| anyhow!("entrada cerrada"))
}

fn print_stage(session: &FeatureSession) {
    match session.current_stage() {
        Some(stage) => println!("\n== {} / {} ({}) ==", session.feature(), stage.title, stage.id),
        None => println!("\n== {} (sin empezar) ==", session.feature()),
    }
}

fn print_result(result: &PipelineResult) {
    match result {
        PipelineResult::Success(payload) => println!("Resultado: {}", payload),
        PipelineResult::Failure(e) => println!("Fallo: {} (acciones: {:?})", e, e.recovery_actions()),
    }
}

async fn capture_from_disk(session: &mut FeatureSession) -> Result<(), coach_workflow::WorkflowError> {
    let raw = prompt("Ruta del archivo: ").map_err(|e| coach_workflow::WorkflowError::Other(e.to_string()))?;
    let path = Path::new(&raw);
    let bytes = std::fs::read(path).map_err(|e| coach_workflow::WorkflowError::Other(format!("{}: {}", raw, e)))?;
    let identifier = path.file_name().and_then(|n| n.to_str()).unwrap_or("captura").to_string();
    let kind = if session.feature() == FeatureKind::StickAnalyzer { MediaKind::Image } else { MediaKind::Video };
    let saved = session.capture(&bytes, &identifier, kind).await?;
    println!("Guardado en {}", saved.display());
    Ok(())
}

fn load_profile(session: &mut FeatureSession) -> Result<(), coach_workflow::WorkflowError> {
    let ask = |label: &str| prompt(label).map_err(|e| coach_workflow::WorkflowError::Other(e.to_string()));
    let number = |raw: String| {
        raw.parse::<f64>().map_err(|_| coach_workflow::WorkflowError::Validation(format!("número inválido: {}", raw)))
    };
    let height = number(ask("Altura (cm): ")?)?;
    let weight = number(ask("Peso (kg): ")?)?;
    let position: Position = ask("Posición (forward | defense | goalie): ")?.parse()?;
    session.set_profile(&PlayerProfile::new(height, weight, position)?)
}

/// Respuesta fija del servicio guionizado para cada feature.
fn demo_payload(feature: FeatureKind) -> JsonValue {
    match feature {
        FeatureKind::ShotRater => json!({
            "shot_type": "wrist", "overall_score": 78, "technique": 81, "power": 69, "accuracy": 84,
            "tips": ["Transfiere el peso a la pierna delantera", "Sigue el tiro con la pala"]
        }),
        FeatureKind::StickAnalyzer => json!({
            "flex": 75, "curve": "mid", "lie": 5, "length_in": 57.0,
            "rationale": "Altura y peso medios: flex 75 y curva media"
        }),
        FeatureKind::AiCoach => json!({
            "summary": "Buena postura, zancada corta",
            "strengths": ["Rodillas flexionadas"],
            "improvements": ["Extender la zancada"],
            "drills": ["Crossovers en círculo", "Zancadas con banda elástica"]
        }),
    }
}

fn scripted(feature: FeatureKind) -> Arc<ScriptedAnalysisService> {
    Arc::new(ScriptedAnalysisService::new().with_analysis(PipelineResult::Success(demo_payload(feature))))
}

/// Recorre la feature con datos de ejemplo hasta el resultado.
async fn run_scripted(feature: FeatureKind, services: CoachServices) -> Result<JsonValue> {
    let mut session = FeatureSession::open(feature, services, None)?;
    match feature {
        FeatureKind::ShotRater => session.select("wrist")?,
        FeatureKind::AiCoach => session.select("skating")?,
        FeatureKind::StickAnalyzer => session.set_profile(&PlayerProfile::new(180.0, 82.0, Position::Forward)?)?,
    }
    println!("-> {:?}", session.proceed()?);
    let angles: &[&str] = if feature == FeatureKind::AiCoach { &["front.mp4", "side.mp4"] } else { &["demo.mp4"] };
    for angle in angles {
        let kind = if feature == FeatureKind::StickAnalyzer { MediaKind::Image } else { MediaKind::Video };
        session.capture(b"demo", angle, kind).await?;
    }
    let trigger_id = match session.proceed()? {
        SessionStep::Gated { trigger_id, .. } => trigger_id,
        other => return Err(anyhow!("se esperaba el gate de pago, hubo {:?}", other)),
    };
    println!("-> {:?}", session.request_access(trigger_id).await?);
    println!("-> {:?}", session.await_result().await?);
    match session.take_result().context("el análisis no dejó resultado")? {
        PipelineResult::Success(payload) => Ok(payload),
        PipelineResult::Failure(e) => Err(anyhow!("análisis fallido: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_domain::{AnalysisPayload, CoachReport, ShotAnalysis, StickRecommendation};
    use flow::{InMemoryMediaStore, InMemorySnapshotStore};
    use coach_workflow::WorkflowConfig;

    fn services(feature: FeatureKind) -> CoachServices {
        CoachServices::new(WorkflowConfig::default(),
                           scripted(feature),
                           Arc::new(StaticAccessProvider::granting()),
                           Arc::new(InMemoryMediaStore::new()),
                           Arc::new(InMemorySnapshotStore::new()))
    }

    #[test]
    fn end_of_input_is_distinguished_from_an_empty_line() {
        let mut input = io::Cursor::new(b"  4 \n\n".to_vec());
        assert_eq!(tokio_test::assert_ok!(read_trimmed(&mut input)), Some("4".to_string()));
        assert_eq!(tokio_test::assert_ok!(read_trimmed(&mut input)), Some(String::new()));
        assert_eq!(tokio_test::assert_ok!(read_trimmed(&mut input)), None);
    }

    #[test]
    fn demo_payloads_decode() {
        tokio_test::assert_ok!(ShotAnalysis::recover_from(&demo_payload(FeatureKind::ShotRater)));
        tokio_test::assert_ok!(StickRecommendation::recover_from(&demo_payload(FeatureKind::StickAnalyzer)));
        tokio_test::assert_ok!(CoachReport::recover_from(&demo_payload(FeatureKind::AiCoach)));
    }

    #[test]
    fn scripted_run_reaches_results_for_every_feature() {
        for feature in FeatureKind::ALL {
            let payload = tokio_test::block_on(run_scripted(feature, services(feature)));
            assert_eq!(tokio_test::assert_ok!(payload), demo_payload(feature));
        }
    }
}
