/*
Lookahead Scheduler
===================

A software timer is coarse: it wakes "around" every 25 ms, sometimes later.
Triggering each note from the timer would put that jitter straight into the
rhythm. Instead each wake-up schedules every step that falls inside a short
window ahead of the audio clock, stamping each note with its *exact* start
time. The graph then starts the voice on the precise sample.

  audio clock ──────|now|──────────────|now + lookahead|────────→
                        ▲     ▲     ▲
                        step  step  step    (scheduled this tick)

Rules:
  - while next_time < now + lookahead: fire the current step at next_time,
    advance next_time by one step (step_beats · 60 / tempo), advance the
    cursor, wrap after loop_steps
  - re-arm after a fixed tick interval, independent of tempo

Because the tick interval is much shorter than the window, a late wake-up
still finds its steps inside the window: nothing is skipped and, since
next_time only ever moves forward, nothing fires twice.

Tempo is read once per tick from the snapshot, so a tempo change affects the
next computed step interval and never moves steps that were already sent.
*/

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::clock::AudioClock;
use crate::composition::store::{LayerState, ParamStore, Snapshot};
use crate::composition::Note;
use crate::config::SchedulerConfig;
use crate::graph::command::GraphHandle;
use crate::synth::NoteSynth;

/// Clock-free scheduler core: the step cursor and the next trigger time.
#[derive(Debug, Clone)]
pub struct Lookahead {
    config: SchedulerConfig,
    step: u32,
    next_time: f64,
    playing: bool,
}

impl Lookahead {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            step: 0,
            next_time: 0.0,
            playing: false,
        }
    }

    /// Begin playback at clock time `now`. Returns the time of step 0, or
    /// `None` if already playing.
    pub fn start(&mut self, now: f64) -> Option<f64> {
        if self.playing {
            return None;
        }
        self.step = 0;
        self.next_time = now + self.config.start_offset_secs;
        self.playing = true;
        Some(self.next_time)
    }

    /// Returns whether playback was running.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.playing, false)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// The step the next trigger will fire.
    pub fn current_step(&self) -> u32 {
        self.step
    }

    pub fn next_time(&self) -> f64 {
        self.next_time
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn step_duration(&self, tempo_bpm: f64) -> f64 {
        self.config.step_beats * 60.0 / tempo_bpm
    }

    /// Fire every step inside the window `[.., now + lookahead)`, calling
    /// `on_step(step, time)` for each. Returns the number of steps fired.
    pub fn tick<F>(&mut self, now: f64, tempo_bpm: f64, mut on_step: F) -> usize
    where
        F: FnMut(u32, f64),
    {
        if !self.playing {
            return 0;
        }
        let horizon = now + self.config.lookahead_secs;
        let step_duration = self.step_duration(tempo_bpm);
        let mut fired = 0;

        while self.next_time < horizon {
            on_step(self.step, self.next_time);
            self.next_time += step_duration;
            self.step = (self.step + 1) % self.config.loop_steps;
            fired += 1;
        }
        fired
    }
}

/// Notes of active synthesized layers that land on `step`, in layer order
/// then note order.
pub fn notes_at_step<'a>(
    snapshot: &'a Snapshot,
    config: &SchedulerConfig,
    step: u32,
) -> impl Iterator<Item = (&'a LayerState, &'a Note)> {
    let beat = step as f64 * config.step_beats;
    let tolerance = config.step_tolerance_beats;
    snapshot.active_synth_layers().flat_map(move |state| {
        state
            .layer
            .notes
            .iter()
            .filter(move |note| (note.start_time - beat).abs() < tolerance)
            .map(move |note| (state, note))
    })
}

/// Everything a tick needs besides the cursor.
#[derive(Clone)]
struct TickContext {
    store: Arc<ParamStore>,
    handle: GraphHandle,
    clock: AudioClock,
    synth: NoteSynth,
}

impl TickContext {
    fn run(&self, lookahead: &mut Lookahead) -> usize {
        let snapshot = self.store.load();
        let config = lookahead.config().clone();
        let mut notes = 0;

        lookahead.tick(self.clock.now(), snapshot.tempo_bpm, |step, at| {
            for (state, note) in notes_at_step(&snapshot, &config, step) {
                match self.synth.play(&self.handle, state, note, snapshot.tempo_bpm, at) {
                    Ok(true) => notes += 1,
                    Ok(false) => {}
                    Err(e) => warn!(layer = %state.layer.id, "note dropped: {e}"),
                }
            }
        });
        notes
    }
}

struct TickThread {
    cancel: Sender<()>,
    join: JoinHandle<()>,
}

/// Drives a [`Lookahead`] against the audio clock.
///
/// In threaded mode a timer thread ticks every `tick_interval_ms`; in manual
/// mode the owner calls [`Scheduler::tick`] (offline rendering, tests).
pub struct Scheduler {
    lookahead: Arc<Mutex<Lookahead>>,
    ctx: TickContext,
    tick_interval: Duration,
    thread: Option<TickThread>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        store: Arc<ParamStore>,
        handle: GraphHandle,
        clock: AudioClock,
    ) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            lookahead: Arc::new(Mutex::new(Lookahead::new(config))),
            ctx: TickContext {
                store,
                handle,
                clock,
                synth: NoteSynth::new(),
            },
            thread: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lookahead> {
        self.lookahead
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start at the current clock time and run the first tick immediately.
    /// Returns the time of step 0, or `None` if already playing.
    pub fn start(&mut self, threaded: bool) -> Option<f64> {
        let at = {
            let mut lookahead = self.lock();
            let at = lookahead.start(self.ctx.clock.now())?;
            self.ctx.run(&mut lookahead);
            at
        };
        debug!(at, threaded, "scheduler started");

        if threaded {
            self.spawn();
        }
        Some(at)
    }

    fn spawn(&mut self) {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let lookahead = Arc::clone(&self.lookahead);
        let ctx = self.ctx.clone();
        let interval = self.tick_interval;

        let spawned = thread::Builder::new()
            .name("loopdeck-scheduler".into())
            .spawn(move || loop {
                match cancelled.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let mut state = lookahead
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        if !state.is_playing() {
                            break;
                        }
                        ctx.run(&mut state);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(join) => self.thread = Some(TickThread { cancel, join }),
            Err(e) => warn!("failed to spawn scheduler thread, ticks must be pumped manually: {e}"),
        }
    }

    /// Run one tick. Returns the number of notes sent.
    pub fn tick(&self) -> usize {
        let mut lookahead = self.lock();
        self.ctx.run(&mut lookahead)
    }

    /// Stop ticking and cancel the timer thread. Idempotent; returns whether
    /// playback was running.
    pub fn stop(&mut self) -> bool {
        let was_playing = self.lock().stop();
        if let Some(thread) = self.thread.take() {
            // The thread may already have exited, a failed send is fine
            let _ = thread.cancel.send(());
            if thread.join.join().is_err() {
                warn!("scheduler thread panicked");
            }
        }
        if was_playing {
            debug!("scheduler stopped");
        }
        was_playing
    }

    pub fn is_playing(&self) -> bool {
        self.lock().is_playing()
    }

    pub fn current_step(&self) -> u32 {
        self.lock().current_step()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{Composition, Layer};

    fn lookahead() -> Lookahead {
        Lookahead::new(SchedulerConfig::default())
    }

    #[test]
    fn start_is_a_no_op_while_playing() {
        let mut la = lookahead();
        assert_eq!(la.start(1.0), Some(1.05));
        assert_eq!(la.start(2.0), None);
        assert!((la.next_time() - 1.05).abs() < 1e-12);
    }

    #[test]
    fn tick_fires_steps_inside_the_window_only() {
        let mut la = lookahead();
        la.start(0.0);

        // 120 BPM: 0.125 s per step, window 0.1 s → only step 0 at 0.05
        let mut fired = Vec::new();
        la.tick(0.0, 120.0, |step, at| fired.push((step, at)));
        assert_eq!(fired, vec![(0, 0.05)]);

        // Same clock time again: nothing new
        assert_eq!(la.tick(0.0, 120.0, |_, _| {}), 0);
    }

    #[test]
    fn stopped_scheduler_does_not_fire() {
        let mut la = lookahead();
        la.start(0.0);
        assert!(la.stop());
        assert!(!la.stop());
        assert_eq!(la.tick(10.0, 120.0, |_, _| panic!("fired while stopped")), 0);
    }

    #[test]
    fn restart_resets_the_cursor() {
        let mut la = lookahead();
        la.start(0.0);
        la.tick(1.0, 120.0, |_, _| {});
        assert_ne!(la.current_step(), 0);

        la.stop();
        la.start(5.0);
        assert_eq!(la.current_step(), 0);
    }

    #[test]
    fn tempo_change_applies_to_the_next_interval() {
        let mut la = lookahead();
        la.start(0.0);
        let mut times = Vec::new();
        la.tick(0.0, 120.0, |_, at| times.push(at));
        la.tick(0.1, 60.0, |_, at| times.push(at));

        // Step 0 at 0.05; step 1 was computed with 120 BPM (0.125 s)
        assert!((times[1] - 0.175).abs() < 1e-9);
    }

    #[test]
    fn notes_match_steps_within_tolerance() {
        let snapshot = Snapshot::from_composition(Composition::new(
            120.0,
            vec![
                Layer::synthesized(
                    "a",
                    "lead",
                    100,
                    vec![
                        Note::new(60, 0.0, 1.0, 100),
                        Note::new(62, 0.26, 1.0, 100),
                        Note::new(64, 0.5, 1.0, 100),
                    ],
                ),
                Layer::synthesized("b", "kick", 100, vec![Note::new(36, 0.24, 1.0, 100)]),
                Layer::synthesized("c", "bass", 100, vec![Note::new(36, 0.25, 1.0, 100)])
                    .with_active(false),
            ],
        ));
        let config = SchedulerConfig::default();

        let step1: Vec<_> = notes_at_step(&snapshot, &config, 1)
            .map(|(state, note)| (state.layer.id.as_str(), note.pitch))
            .collect();
        assert_eq!(step1, [("a", 62), ("b", 36)]);

        assert_eq!(notes_at_step(&snapshot, &config, 3).count(), 0);
    }
}
