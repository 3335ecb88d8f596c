//! Roadmap listing and import, the glue between generation output and the
//! store.

use crate::status::RoadmapProgress;
use anyhow::Context;
use pathpdf_core::response::DEFAULT_CHUNK_CHARS;
use pathpdf_core::{
    RoadmapData, RoadmapId, RoadmapSummary, StatusSnapshot, chunk_content, parse_roadmap_response,
};
use pathpdf_graph::{GraphLayout, mini_preview};
use pathpdf_storage::{RoadmapSource, StatusStore, Storage};
use serde::Serialize;

/// One entry of the roadmap list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadmapCard {
    pub summary: RoadmapSummary,
    pub progress: RoadmapProgress,
    pub preview: GraphLayout,
}

/// Cards for every stored roadmap. Roadmaps that fail to load are skipped.
pub fn roadmap_cards(storage: &Storage) -> anyhow::Result<Vec<RoadmapCard>> {
    let summaries = storage.list_roadmaps().context("Failed to list roadmaps")?;

    let mut cards = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let roadmap = match storage.load_roadmap(&summary.id) {
            Ok(roadmap) => roadmap,
            Err(e) => {
                tracing::warn!("Skipping roadmap {}: {e}", summary.id);
                continue;
            }
        };
        let remote = storage.load_node_status(&summary.id).unwrap_or_else(|e| {
            tracing::warn!("No progress for roadmap {}: {e}", summary.id);
            Default::default()
        });
        let statuses = StatusSnapshot {
            completed: remote.completed,
            bookmarked: remote.bookmarked,
            ..Default::default()
        };

        cards.push(RoadmapCard {
            progress: RoadmapProgress::compute(&roadmap.root_node, &statuses),
            preview: mini_preview(Some(&roadmap.root_node)),
            summary,
        });
    }
    Ok(cards)
}

/// The slice of extracted document text sent for generation. Only the first
/// chunk is used; blank documents yield nothing.
pub fn generation_input(content: &str) -> Option<String> {
    chunk_content(content, DEFAULT_CHUNK_CHARS)
        .into_iter()
        .next()
        .filter(|chunk| !chunk.trim().is_empty())
}

/// Parses a generation reply, repairs it and stores it under `id`.
pub fn import_generated(
    storage: &Storage,
    id: &RoadmapId,
    reply: &str,
) -> anyhow::Result<RoadmapData> {
    let roadmap = parse_roadmap_response(reply).context("Generated roadmap is unusable")?;
    storage
        .save_roadmap(id, &roadmap)
        .with_context(|| format!("Failed to store roadmap {id}"))?;
    tracing::info!("Imported roadmap {} ({})", id, roadmap.title);
    Ok(roadmap)
}
