//! Scripted session simulator and spatial-index stress test

use crate::config::EngineConfig;
use crate::engine::WorkspaceEngine;
use crate::error::EngineError;
use canvas_model::{
    ContentType, GenerationKind, NewNode, Node, Point, ProjectId, Rect, Size, ViewType, Viewport,
    WorkspacePersistence,
};
use canvas_spatial::SpatialIndex;
use canvas_tasks::{GenerationOutput, GenerationRequest, TaskStatus};
use canvas_test_utils::{
    analysis, complete_artifact, note, sample_snapshot, InMemoryPersistence, ScriptedProducer,
};
use canvas_workspace::UserMessage;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

const KINDS: [GenerationKind; 7] = [
    GenerationKind::Summary,
    GenerationKind::MindMap,
    GenerationKind::Podcast,
    GenerationKind::Flashcards,
    GenerationKind::Quiz,
    GenerationKind::Timeline,
    GenerationKind::Report,
];

/// Simulated session shape
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SimulationConfig {
    /// Chat turns, each drafting one thinking step
    pub turns: usize,
    /// Generations launched after the turns
    pub generations: usize,
    /// Start a new topic every this many turns (0 = never)
    pub topic_every: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            turns: 12,
            generations: 6,
            topic_every: 4,
        }
    }
}

/// Outcome of a simulated session
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationReport {
    pub free_nodes: usize,
    pub thinking_nodes: usize,
    pub edges: usize,
    pub drafts_pending: usize,
    pub restored_artifacts: usize,
    pub tasks: BTreeMap<String, usize>,
    pub selected: usize,
    pub backend_calls: usize,
    pub violations: Vec<String>,
}

impl SimulationReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Canvas Session Simulation ===\n\n");
        let _ = writeln!(report, "Free nodes: {}", self.free_nodes);
        let _ = writeln!(report, "Thinking nodes: {}", self.thinking_nodes);
        let _ = writeln!(report, "Edges: {}", self.edges);
        let _ = writeln!(report, "Drafts pending: {}", self.drafts_pending);
        let _ = writeln!(report, "Restored artifacts: {}", self.restored_artifacts);
        for (status, count) in &self.tasks {
            let _ = writeln!(report, "Tasks {status}: {count}");
        }
        let _ = writeln!(report, "Box-selected: {}", self.selected);
        let _ = writeln!(report, "Backend calls: {}", self.backend_calls);

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {}", i + 1, v);
            }
        }
        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// Run a scripted session against in-memory persistence
///
/// # Errors
/// Propagates engine errors; the in-memory backend does not inject any.
pub async fn run_simulation(
    engine_config: EngineConfig,
    sim: SimulationConfig,
) -> Result<SimulationReport, EngineError> {
    let project = ProjectId::new("demo");
    let persistence = Arc::new(
        InMemoryPersistence::new()
            .with_workspace(project.clone(), sample_snapshot())
            .with_artifacts(
                project.clone(),
                vec![
                    complete_artifact("art-1", GenerationKind::Summary),
                    complete_artifact("art-2", GenerationKind::Timeline),
                ],
            ),
    );
    let mut engine = WorkspaceEngine::new(
        project,
        Arc::clone(&persistence) as Arc<dyn WorkspacePersistence>,
        engine_config,
    );
    let mut report = SimulationReport::default();

    let loaded = engine.load().await?;
    report.restored_artifacts = loaded.restored_artifacts;

    engine.store_mut().add_node(note("Scratch", 900.0, 120.0));

    // Chat turns; the last draft is left pending
    for turn in 0..sim.turns {
        if sim.topic_every > 0 && turn > 0 && turn % sim.topic_every == 0 {
            engine.start_new_topic();
        }
        let message = UserMessage::new(format!("m{turn}"), format!("Question {turn}\nDetails"));
        engine.append_draft_step(&message);
        if turn + 1 < sim.turns {
            let finalized =
                engine.finalize_thinking_step(&message.id, analysis(&format!("Claim {turn}")));
            if finalized.is_none() {
                report.violations.push(format!("turn {turn}: draft not found on finalize"));
            }
        }
    }

    // Generations, alternating success and failure
    let mut handles = Vec::with_capacity(sim.generations);
    for i in 0..sim.generations {
        let kind = KINDS[i % KINDS.len()];
        let position = engine.tasks().grid().position(loaded.restored_artifacts + i);
        let producer = if i % 3 == 2 {
            Arc::new(ScriptedProducer::failing("backend busy"))
        } else {
            Arc::new(ScriptedProducer::succeeding(
                GenerationOutput::new(json!({ "index": i })).titled(format!("{kind} #{i}")),
            ))
        };
        let request = GenerationRequest::from_sources(["doc-1"]);
        let (_, handle) = engine.launch_generation(producer, kind, position, request);
        handles.push(handle);
    }
    for handle in handles {
        if let Err(err) = handle.await {
            report.violations.push(format!("generation task panicked: {err}"));
        }
    }
    if let Some(failed) = engine
        .tasks()
        .tasks()
        .into_iter()
        .find(|t| t.status == TaskStatus::Error)
    {
        engine.remove_task(failed.id);
    }

    // View round trip must restore the free viewport exactly
    let viewport = Viewport::new(250.0, -75.0, 1.5);
    engine.switch_view(ViewType::Free);
    engine.store_mut().set_viewport(viewport);
    engine.switch_view(ViewType::Thinking);
    engine.switch_view(ViewType::Free);
    if engine.store().viewport() != viewport {
        report.violations.push("free viewport lost across view switch".into());
    }

    let everything = Rect::from_corners(Point::new(-1e6, -1e6), Point::new(1e6, 1e6));
    report.selected = engine.store_mut().select_in_rect(everything, false).len();

    let first_step = engine
        .store()
        .nodes_in_view(ViewType::Thinking)
        .next()
        .map(Node::id);
    if let Some(first_step) = first_step {
        engine.navigate_to_node(first_step)?;
    }

    check_invariants(&engine, &mut report);
    report.free_nodes = engine.store().nodes_in_view(ViewType::Free).count();
    report.thinking_nodes = engine.store().nodes_in_view(ViewType::Thinking).count();
    report.edges = engine.store().edge_count();
    report.drafts_pending = engine.store().nodes().filter(|n| n.is_draft()).count();
    for task in engine.tasks().tasks() {
        *report.tasks.entry(task.status.to_string()).or_default() += 1;
    }
    report.backend_calls = persistence.calls().len();

    tracing::info!(
        "Simulation finished: {} nodes, {} violations",
        engine.store().node_count(),
        report.violations.len()
    );
    Ok(report)
}

fn check_invariants(engine: &WorkspaceEngine, report: &mut SimulationReport) {
    for node in engine.store().nodes() {
        if let Some(step) = node.thinking_step() {
            if !step.is_draft() && node.has_tag(Node::DRAFT_TAG) {
                report
                    .violations
                    .push(format!("finalized step {} still tagged draft", node.id()));
            }
            if let Some(parent) = step.parent_step {
                let linked = engine
                    .store()
                    .edges()
                    .any(|e| e.source == parent && e.target == node.id());
                if engine.store().node(parent).is_some() && !linked {
                    report
                        .violations
                        .push(format!("step {} missing edge from parent", node.id()));
                }
            }
        }
    }
    for task in engine.tasks().tasks() {
        if task.is_active() {
            report
                .violations
                .push(format!("task {} still {} after its producer finished", task.id, task.status));
        }
    }
    if engine.store().active_view() != ViewType::Thinking {
        report
            .violations
            .push("navigation did not switch to the thinking view".into());
    }
}

/// Spatial index stress results
#[derive(Debug, Clone, Serialize)]
pub struct StressReport {
    pub nodes: usize,
    pub queries: usize,
    pub build_ms: u128,
    pub query_total_us: u128,
    pub hits: usize,
    pub success: bool,
}

/// Bulk-load an index over `nodes` grid-placed nodes and sweep box queries
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn run_stress(nodes: usize, queries: usize) -> StressReport {
    let columns = (nodes as f64).sqrt().ceil().max(1.0) as usize;
    let now = Utc::now();
    let items: Vec<Node> = (0..nodes)
        .map(|i| {
            let x = (i % columns) as f64 * 300.0;
            let y = (i / columns) as f64 * 200.0;
            Node::create(
                NewNode::content(format!("n{i}"), "", ContentType::Note)
                    .at(Point::new(x, y))
                    .sized(Size::new(200.0, 120.0)),
                ViewType::Free,
                now,
            )
        })
        .collect();

    let started = Instant::now();
    let index = SpatialIndex::build(&items, 280.0, 160.0);
    let build_ms = started.elapsed().as_millis();

    let extent = columns as f64 * 300.0;
    let started = Instant::now();
    let mut hits = 0;
    for q in 0..queries {
        let t = (q as f64 / queries.max(1) as f64) * extent;
        let rect = Rect::from_origin_size(Point::new(t, t * 0.5), Size::new(1_200.0, 800.0));
        hits += index.query(rect).len();
    }
    let query_total_us = started.elapsed().as_micros();

    StressReport {
        nodes,
        queries,
        build_ms,
        query_total_us,
        hits,
        success: index.len() == nodes,
    }
}
