//! Testing utilities for the canvas workspace
//!
//! Shared backend doubles, scripted producers and fixtures.

#![allow(missing_docs)]

mod persistence;
mod producers;

pub use persistence::{Call, InMemoryPersistence, Operation};
pub use producers::{GatedProducer, ScriptedProducer};

use canvas_model::{
    Analysis, Artifact, ArtifactId, ArtifactStatus, ContentType, Edge, GenerationKind, MessageId,
    NewNode, Node, NodeKind, Point, StepAnalysis, ThinkingFields, ThinkingStep, ViewType,
    Viewport, WorkspaceSnapshot,
};
use chrono::Utc;
use serde_json::json;

/// Complete artifact whose data echoes its id
pub fn complete_artifact(id: &str, kind: GenerationKind) -> Artifact {
    Artifact {
        id: ArtifactId::new(id),
        kind,
        title: Some(format!("{kind} {id}")),
        data: json!({ "id": id }),
        status: ArtifactStatus::Complete,
        created_at: Utc::now(),
    }
}

pub fn note(title: &str, x: f64, y: f64) -> NewNode {
    NewNode::content(title, format!("{title} body"), ContentType::Note).at(Point::new(x, y))
}

pub fn analysis(claim: &str) -> StepAnalysis {
    StepAnalysis {
        title: Some(claim.to_string()),
        fields: ThinkingFields {
            claim: Some(claim.to_string()),
            ..ThinkingFields::default()
        },
        related_concepts: Vec::new(),
        suggested_branches: Vec::new(),
    }
}

/// Stored workspace with two linked free notes and one analyzed thinking step
pub fn sample_snapshot() -> WorkspaceSnapshot {
    let now = Utc::now();
    let a = Node::create(note("Sources", 0.0, 0.0), ViewType::Free, now);
    let b = Node::create(note("Questions", 400.0, 0.0), ViewType::Free, now);
    let step = Node::create(
        NewNode::with_kind(
            "Why does X hold?",
            "Why does X hold?",
            NodeKind::ThinkingStep(ThinkingStep {
                step_number: 4,
                depth: 0,
                parent_step: None,
                message_id: Some(MessageId::new("m-old")),
                analysis: Analysis::Analyzed(ThinkingFields::default()),
                related_concepts: Vec::new(),
                suggested_branches: Vec::new(),
            }),
        )
        .at(Point::new(80.0, 80.0)),
        ViewType::Thinking,
        now,
    );
    let edge = Edge::new(a.id(), b.id(), Some("informs".into()));

    WorkspaceSnapshot {
        nodes: vec![a, b, step],
        edges: vec![edge],
        viewport: Viewport::new(-120.0, 40.0, 0.75),
        ..WorkspaceSnapshot::default()
    }
}
