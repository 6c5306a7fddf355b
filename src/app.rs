use anyhow::Result;
use indicatif::ProgressBar;
use log::{debug, info};
use replay_common::HistoryAggregator;
use replay_visualizer::{FrameCompositor, PanelInputs, Presenter};
use std::time::Instant;

use crate::input::{map_event, Command, EventSource};
use crate::playback::{ExhaustReason, GenerationSource, PlaybackController, PlaybackState, TickOutcome};
use crate::timing::{FpsCounter, FrameLimiter};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEnd {
    Quit,
    Exhausted(ExhaustReason),
    TickLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub frames_presented: u64,
    pub last_generation: u32,
    pub generations_seen: usize,
    pub end: RunEnd,
}

/// Everything the replay loop owns. Built once at startup and driven one tick at a time.
pub struct ReplayApp<S> {
    playback: PlaybackController<S>,
    history: HistoryAggregator,
    compositor: FrameCompositor,
    presenter: Box<dyn Presenter>,
    events: Box<dyn EventSource>,
    show_legend: bool,
    limiter: FrameLimiter,
    fps: FpsCounter,
    max_ticks: Option<u64>,
    ticks: u64,
    progress: ProgressBar,
}

impl<S: GenerationSource> ReplayApp<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        playback: PlaybackController<S>,
        history: HistoryAggregator,
        compositor: FrameCompositor,
        presenter: Box<dyn Presenter>,
        events: Box<dyn EventSource>,
        show_legend: bool,
        limiter: FrameLimiter,
        max_ticks: Option<u64>,
        progress: ProgressBar,
    ) -> Self {
        ReplayApp {
            playback,
            history,
            compositor,
            presenter,
            events,
            show_legend,
            limiter,
            fps: FpsCounter::new(),
            max_ticks,
            ticks: 0,
            progress,
        }
    }

    pub fn playback(&self) -> &PlaybackController<S> {
        &self.playback
    }

    pub fn history(&self) -> &HistoryAggregator {
        &self.history
    }

    pub fn show_legend(&self) -> bool {
        self.show_legend
    }

    /// Runs until quit, end of data, or the tick limit, then finalizes the presenter.
    pub fn run(&mut self) -> Result<RunSummary> {
        let end = loop {
            if let Some(end) = self.step()? {
                break end;
            }
            self.limiter.wait();
        };
        self.progress.finish_and_clear();
        self.presenter.finish()?;

        Ok(RunSummary {
            ticks: self.ticks,
            frames_presented: self.presenter.frames_presented(),
            last_generation: self.playback.generation(),
            generations_seen: self.history.series().len(),
            end,
        })
    }

    /// One loop iteration: input, playback tick, compose, present.
    pub fn step(&mut self) -> Result<Option<RunEnd>> {
        for event in self.events.poll_events()? {
            match map_event(event) {
                Some(Command::Quit) => {
                    info!("Quit requested at generation {}", self.playback.generation());
                    return Ok(Some(RunEnd::Quit));
                }
                Some(Command::TogglePause) => {
                    self.playback.toggle_pause();
                }
                Some(Command::ToggleLegend) => {
                    self.show_legend = !self.show_legend;
                    debug!("Scatter legend {}", if self.show_legend { "shown" } else { "hidden" });
                }
                None => debug!("Ignoring input {:?}", event),
            }
        }

        let outcome = self.playback.tick(&mut self.history);
        self.ticks += 1;

        let inputs = PanelInputs {
            snapshot: self.playback.snapshot(),
            frame_index: self.playback.frame_index(),
            series: self.history.series(),
            samples: self.history.samples(),
            show_legend: self.show_legend,
            fps: self.fps.fps(),
        };
        let frame = self.compositor.compose(&inputs);
        self.presenter.present(frame)?;
        self.fps.record(Instant::now());

        self.progress.set_message(format!(
            "generation {} frame {}/{}{}",
            self.playback.generation(),
            self.playback.frame_index(),
            self.playback.snapshot().frame_count(),
            if self.playback.state() == PlaybackState::Paused { " [paused]" } else { "" }
        ));
        self.progress.tick();

        if outcome == TickOutcome::Exhausted {
            if let Some(reason) = self.playback.exhaust_reason() {
                return Ok(Some(RunEnd::Exhausted(reason.clone())));
            }
        }
        if self.max_ticks.is_some_and(|max| self.ticks >= max) {
            info!("Tick limit of {} reached", self.ticks);
            return Ok(Some(RunEnd::TickLimit));
        }
        Ok(None)
    }
}
