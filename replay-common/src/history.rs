use log::{debug, warn};

use crate::snapshot::GenerationSnapshot;

/// Fitness over the generations seen so far.
///
/// Three parallel sequences of equal length; generation ids strictly increase.
/// A fitness the trainer did not record is stored as NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySeries {
    generations: Vec<u32>,
    avg_fitness: Vec<f64>,
    best_fitness: Vec<f64>,
}

impl HistorySeries {
    pub fn generations(&self) -> &[u32] {
        &self.generations
    }

    pub fn avg_fitness(&self) -> &[f64] {
        &self.avg_fitness
    }

    pub fn best_fitness(&self) -> &[f64] {
        &self.best_fitness
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn last_generation(&self) -> Option<u32> {
        self.generations.last().copied()
    }

    fn push(&mut self, generation: u32, avg: f64, best: f64) {
        self.generations.push(generation);
        self.avg_fitness.push(avg);
        self.best_fitness.push(best);
    }
}

/// Topology size of one genome in the current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivitySample {
    pub species_id: u32,
    pub node_count: usize,
    pub connection_count: usize,
}

/// Accumulates derived series from snapshots as playback reaches them.
///
/// Only generation transitions feed it, never frame advances.
#[derive(Debug, Default)]
pub struct HistoryAggregator {
    series: HistorySeries,
    samples: Vec<ConnectivitySample>,
}

impl HistoryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self) -> &HistorySeries {
        &self.series
    }

    pub fn samples(&self) -> &[ConnectivitySample] {
        &self.samples
    }

    /// Records a newly displayed generation. Returns whether the series grew.
    pub fn on_generation_changed(&mut self, snapshot: &GenerationSnapshot) -> bool {
        let appended = match self.series.last_generation() {
            Some(last) if last == snapshot.generation => false,
            Some(last) if last > snapshot.generation => {
                warn!(
                    "Generation {} arrived after {}; fitness history left unchanged",
                    snapshot.generation, last
                );
                false
            }
            _ => {
                self.series.push(
                    snapshot.generation,
                    snapshot.avg_raw_fit.unwrap_or(f64::NAN),
                    snapshot.best_raw_fit.unwrap_or(f64::NAN),
                );
                true
            }
        };

        self.samples = connectivity_samples(snapshot);
        debug!(
            "History: {} generations, {} connectivity samples",
            self.series.len(),
            self.samples.len()
        );
        appended
    }
}

/// One sample per genome across every species of `snapshot`.
pub fn connectivity_samples(snapshot: &GenerationSnapshot) -> Vec<ConnectivitySample> {
    snapshot
        .species
        .iter()
        .flat_map(|species| {
            species.members.iter().map(move |member| ConnectivitySample {
                species_id: species.id,
                node_count: member.nodes.len(),
                connection_count: member.connections.len(),
            })
        })
        .collect()
}
