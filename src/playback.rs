use log::{error, info, trace};
use replay_common::{GenerationSnapshot, HistoryAggregator, SnapshotStore, StoreError};

/// Anything that can hand out generation records by id.
pub trait GenerationSource {
    fn load_generation(&self, generation: u32) -> Result<GenerationSnapshot, StoreError>;
}

impl GenerationSource for SnapshotStore {
    fn load_generation(&self, generation: u32) -> Result<GenerationSnapshot, StoreError> {
        SnapshotStore::load_generation(self, generation)
    }
}

/// Why playback stopped for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExhaustReason {
    /// No record exists for the next generation; the normal end of a run.
    EndOfRun { next: u32 },
    /// The next record exists but could not be read or parsed.
    Unreadable { generation: u32, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Exhausted(ExhaustReason),
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    FrameAdvanced,
    GenerationAdvanced,
    /// Paused or already exhausted; nothing moved.
    Idle,
    /// This tick found no further generation.
    Exhausted,
}

/// Nested playback cursor: a frame within the resident generation, and the
/// generation within the run.
///
/// Exactly one snapshot is held at a time.
pub struct PlaybackController<S> {
    source: S,
    gen_step: u32,
    snapshot: GenerationSnapshot,
    frame_index: usize,
    paused: bool,
    exhausted: Option<ExhaustReason>,
}

impl<S: GenerationSource> PlaybackController<S> {
    /// Loads `start_generation` and feeds it to `history`.
    pub fn start(
        source: S,
        start_generation: u32,
        gen_step: u32,
        history: &mut HistoryAggregator,
    ) -> Result<Self, StoreError> {
        let snapshot = source.load_generation(start_generation)?;
        info!(
            "Starting playback at generation {} ({} frames), stepping by {}",
            snapshot.generation,
            snapshot.frame_count(),
            gen_step
        );
        history.on_generation_changed(&snapshot);
        Ok(PlaybackController {
            source,
            gen_step: gen_step.max(1),
            snapshot,
            frame_index: 0,
            paused: false,
            exhausted: None,
        })
    }

    pub fn generation(&self) -> u32 {
        self.snapshot.generation
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn snapshot(&self) -> &GenerationSnapshot {
        &self.snapshot
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted.is_some()
    }

    pub fn exhaust_reason(&self) -> Option<&ExhaustReason> {
        self.exhausted.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        match (&self.exhausted, self.paused) {
            (Some(reason), _) => PlaybackState::Exhausted(reason.clone()),
            (None, true) => PlaybackState::Paused,
            (None, false) => PlaybackState::Playing,
        }
    }

    /// Flips pause. Has no effect once exhausted. Returns whether playback is now paused.
    pub fn toggle_pause(&mut self) -> bool {
        if self.exhausted.is_none() {
            self.paused = !self.paused;
            info!(
                "Playback {} at generation {} frame {}",
                if self.paused { "paused" } else { "resumed" },
                self.generation(),
                self.frame_index
            );
        }
        self.paused
    }

    /// Advances one frame, or one generation once the frames run out.
    pub fn tick(&mut self, history: &mut HistoryAggregator) -> TickOutcome {
        if self.paused || self.exhausted.is_some() {
            return TickOutcome::Idle;
        }

        if self.frame_index < self.snapshot.frame_count() {
            self.frame_index += 1;
            trace!("Generation {} frame {}", self.generation(), self.frame_index);
            return TickOutcome::FrameAdvanced;
        }

        let next = self.generation().saturating_add(self.gen_step);
        match self.source.load_generation(next) {
            Ok(snapshot) => {
                // the previous snapshot is dropped here
                self.snapshot = snapshot;
                self.frame_index = 0;
                history.on_generation_changed(&self.snapshot);
                info!(
                    "Generation {} ({} frames, {} genomes)",
                    self.generation(),
                    self.snapshot.frame_count(),
                    self.snapshot.population()
                );
                TickOutcome::GenerationAdvanced
            }
            Err(err) => {
                let reason = if err.is_not_found() {
                    info!("No generation {} recorded; end of run", next);
                    ExhaustReason::EndOfRun { next }
                } else {
                    error!("Generation {} is unreadable, stopping playback: {}", next, err);
                    ExhaustReason::Unreadable { generation: next, message: err.to_string() }
                };
                self.exhausted = Some(reason);
                TickOutcome::Exhausted
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_common::{Member, ReplayFrame, Species};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// In-memory generations plus a log of every id requested.
    struct FakeRun {
        generations: HashMap<u32, GenerationSnapshot>,
        corrupt: Vec<u32>,
        requests: RefCell<Vec<u32>>,
    }

    impl FakeRun {
        fn new(frames_per_generation: &[(u32, usize)]) -> Self {
            FakeRun {
                generations: frames_per_generation
                    .iter()
                    .map(|&(g, frames)| (g, snapshot(g, frames)))
                    .collect(),
                corrupt: Vec::new(),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl GenerationSource for &FakeRun {
        fn load_generation(&self, generation: u32) -> Result<GenerationSnapshot, StoreError> {
            self.requests.borrow_mut().push(generation);
            let path = PathBuf::from(format!("gen_{}.json", generation));
            if self.corrupt.contains(&generation) {
                return Err(StoreError::Invalid { path, reason: "corrupt".into() });
            }
            self.generations
                .get(&generation)
                .cloned()
                .ok_or(StoreError::NotFound { path })
        }
    }

    fn snapshot(generation: u32, frames: usize) -> GenerationSnapshot {
        let mut snap: GenerationSnapshot = serde_json::from_str("{}").unwrap();
        snap.generation = generation;
        snap.avg_raw_fit = Some(1.0);
        snap.best_raw_fit = Some(2.0);
        snap.replay = (0..frames)
            .map(|i| ReplayFrame {
                frame: Some(i as u32),
                rotation: 90.0,
                rocket_x: 10.0,
                rocket_y: 10.0 + i as f32,
                target_x: 50.0,
                target_y: 50.0,
                vertices: None,
            })
            .collect();
        snap.species = vec![Species {
            id: generation,
            members: vec![Member { nodes: Vec::new(), connections: Vec::new(), fitness: None }],
        }];
        snap
    }

    #[test]
    fn three_frames_then_missing_generation_exhausts() {
        let run = FakeRun::new(&[(0, 3)]);
        let mut history = HistoryAggregator::new();
        let mut playback = PlaybackController::start(&run, 0, 20, &mut history).unwrap();

        for expected in 1..=3 {
            assert_eq!(playback.tick(&mut history), TickOutcome::FrameAdvanced);
            assert_eq!(playback.frame_index(), expected);
        }
        assert_eq!(playback.state(), PlaybackState::Playing);

        assert_eq!(playback.tick(&mut history), TickOutcome::Exhausted);
        assert_eq!(*run.requests.borrow(), vec![0, 20]);
        assert_eq!(
            playback.state(),
            PlaybackState::Exhausted(ExhaustReason::EndOfRun { next: 20 })
        );

        for _ in 0..5 {
            assert_eq!(playback.tick(&mut history), TickOutcome::Idle);
        }
        assert_eq!(playback.frame_index(), 3);
        assert_eq!(playback.generation(), 0);
        assert_eq!(run.requests.borrow().len(), 2);
    }

    #[test]
    fn generation_transition_resets_frame_and_feeds_history() {
        let run = FakeRun::new(&[(0, 1), (20, 2), (40, 0)]);
        let mut history = HistoryAggregator::new();
        let mut playback = PlaybackController::start(&run, 0, 20, &mut history).unwrap();

        playback.tick(&mut history);
        assert_eq!(playback.tick(&mut history), TickOutcome::GenerationAdvanced);
        assert_eq!(playback.frame_index(), 0);
        assert_eq!(playback.snapshot().generation, 20);
        assert_eq!(history.series().generations(), &[0, 20]);

        playback.tick(&mut history);
        playback.tick(&mut history);
        assert_eq!(playback.tick(&mut history), TickOutcome::GenerationAdvanced);
        assert_eq!(playback.generation(), 40);
        assert_eq!(playback.frame_index(), 0);
        assert_eq!(history.samples()[0].species_id, 40);
    }

    #[test]
    fn frame_advances_do_not_touch_history() {
        let run = FakeRun::new(&[(0, 5)]);
        let mut history = HistoryAggregator::new();
        let mut playback = PlaybackController::start(&run, 0, 20, &mut history).unwrap();
        let before = history.series().clone();
        for _ in 0..5 {
            playback.tick(&mut history);
        }
        assert_eq!(history.series(), &before);
    }

    #[test]
    fn pause_freezes_cursor() {
        let run = FakeRun::new(&[(0, 2), (20, 2)]);
        let mut history = HistoryAggregator::new();
        let mut playback = PlaybackController::start(&run, 0, 20, &mut history).unwrap();
        playback.tick(&mut history);

        assert!(playback.toggle_pause());
        assert_eq!(playback.state(), PlaybackState::Paused);
        for _ in 0..10 {
            assert_eq!(playback.tick(&mut history), TickOutcome::Idle);
        }
        assert_eq!((playback.generation(), playback.frame_index()), (0, 1));

        assert!(!playback.toggle_pause());
        assert_eq!(playback.tick(&mut history), TickOutcome::FrameAdvanced);
        assert_eq!(playback.frame_index(), 2);
    }

    #[test]
    fn unreadable_generation_is_reported_distinctly() {
        let mut run = FakeRun::new(&[(0, 0), (50, 4)]);
        run.corrupt.push(50);
        let mut history = HistoryAggregator::new();
        let mut playback = PlaybackController::start(&run, 0, 50, &mut history).unwrap();
        assert_eq!(playback.tick(&mut history), TickOutcome::Exhausted);
        assert!(matches!(
            playback.exhaust_reason(),
            Some(ExhaustReason::Unreadable { generation: 50, .. })
        ));
    }

    #[test]
    fn pause_cannot_leave_exhausted() {
        let run = FakeRun::new(&[(0, 0)]);
        let mut history = HistoryAggregator::new();
        let mut playback = PlaybackController::start(&run, 0, 20, &mut history).unwrap();
        playback.tick(&mut history);
        assert!(!playback.toggle_pause());
        assert!(playback.is_exhausted());
    }

    #[test]
    fn missing_start_generation_fails_start() {
        let run = FakeRun::new(&[]);
        let mut history = HistoryAggregator::new();
        let err = PlaybackController::start(&run, 0, 20, &mut history).err().unwrap();
        assert!(err.is_not_found());
        assert!(history.series().is_empty());
    }
}
