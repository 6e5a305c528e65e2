//! # Carousel Playback
//!
//! A pure playback state machine plus the async runner that drives it.
//! The state machine owns every timing-independent decision (which slide
//! comes next, when playback finishes, how gestures pause the rotation) so
//! it can be tested without a clock; the runner supplies the clock with a
//! tokio interval and tears down cleanly through a cancellation token.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Duration, interval};
use tokio_util::sync::CancellationToken;

use crate::config::CarouselTimingConfig;
use crate::models::carousel_config::{CarouselDocument, LoopPolicy};

/// Direction the rotation is currently moving in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Playback state of a carousel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No slides, or playback has not started.
    Idle,
    /// The timer is advancing slides.
    Playing,
    /// A gesture is in progress; the timer is suspended.
    Paused,
    /// A play-once rotation reached its final slide.
    Done,
}

/// The carousel playback state machine.
///
/// Indices are 0-based internally; the stored document uses 1-based `idx`
/// values purely for display ordering.
#[derive(Debug, Clone)]
pub struct CarouselPlayer {
    slide_count: usize,
    policy: LoopPolicy,
    state: PlaybackState,
    index: usize,
    direction: Direction,
}

impl CarouselPlayer {
    /// Build a player for `slide_count` slides under the given loop policy.
    /// Zero slides leaves the player idle forever.
    pub fn new(slide_count: usize, policy: LoopPolicy) -> Self {
        let state = if slide_count == 0 {
            PlaybackState::Idle
        } else {
            PlaybackState::Playing
        };

        Self {
            slide_count,
            policy,
            state,
            index: 0,
            direction: Direction::Forward,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the automatic timer should be running right now.
    pub fn timer_armed(&self) -> bool {
        self.state == PlaybackState::Playing && self.slide_count > 1
    }

    /// Advance one step under the loop policy. Called by the timer.
    pub fn tick(&mut self) {
        if self.state != PlaybackState::Playing || self.slide_count <= 1 {
            return;
        }

        let last = self.slide_count - 1;

        match self.policy {
            LoopPolicy::Infinite => {
                self.index = (self.index + 1) % self.slide_count;
            }
            LoopPolicy::Rewind => {
                // Reverse at either end instead of wrapping.
                match self.direction {
                    Direction::Forward => {
                        if self.index >= last {
                            self.direction = Direction::Backward;
                            self.index = self.index.saturating_sub(1);
                        } else {
                            self.index += 1;
                        }
                    }
                    Direction::Backward => {
                        if self.index == 0 {
                            self.direction = Direction::Forward;
                            self.index = 1.min(last);
                        } else {
                            self.index -= 1;
                        }
                    }
                }
            }
            LoopPolicy::Once => {
                if self.index >= last {
                    self.state = PlaybackState::Done;
                } else {
                    self.index += 1;
                    if self.index == last {
                        self.state = PlaybackState::Done;
                    }
                }
            }
        }
    }

    /// Manual forward navigation. Always wraps, regardless of policy, and
    /// never restarts a finished play-once rotation.
    pub fn next(&mut self) {
        if self.slide_count == 0 {
            return;
        }
        self.index = (self.index + 1) % self.slide_count;
        self.direction = Direction::Forward;
    }

    /// Manual backward navigation. Always wraps, regardless of policy.
    pub fn prev(&mut self) {
        if self.slide_count == 0 {
            return;
        }
        self.index = (self.index + self.slide_count - 1) % self.slide_count;
        self.direction = Direction::Backward;
    }

    /// A drag gesture started; suspend the timer.
    pub fn gesture_start(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// The drag gesture ended after moving `dx` pixels horizontally.
    /// A movement at or past the threshold counts as a swipe: dragging left
    /// advances, dragging right goes back. The timer resumes either way.
    pub fn gesture_end(&mut self, dx: i32, threshold_px: u32) {
        if dx.unsigned_abs() >= threshold_px {
            if dx < 0 {
                self.next();
            } else {
                self.prev();
            }
        }

        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Playing;
        }
    }
}

/// Commands a client can send to a running carousel.
#[derive(Debug, Clone, Copy)]
pub enum CarouselCommand {
    Next,
    Prev,
    GestureStart,
    GestureEnd { dx: i32 },
}

/// Handle to a running carousel task.
pub struct CarouselHandle {
    player: Arc<Mutex<CarouselPlayer>>,
    commands: mpsc::Sender<CarouselCommand>,
    cancel: CancellationToken,
}

impl CarouselHandle {
    /// Current slide index.
    pub async fn index(&self) -> usize {
        self.player.lock().await.index()
    }

    /// Current playback state.
    pub async fn state(&self) -> PlaybackState {
        self.player.lock().await.state()
    }

    /// Send a command to the running carousel. Returns false when the task
    /// has already shut down.
    pub async fn send(&self, command: CarouselCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Stop the carousel task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for CarouselHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn a carousel task for the given document.
///
/// The configured interval is clamped to the deployment floor. Manual
/// navigation and swipes reset the timer so the freshly shown slide gets a
/// full interval on screen.
pub fn spawn_carousel(
    document: &CarouselDocument,
    timing: &CarouselTimingConfig,
    parent_cancel: &CancellationToken,
) -> CarouselHandle {
    let interval_seconds = document
        .config
        .interval
        .max(timing.min_interval_seconds);
    let threshold_px = timing.swipe_threshold_px;
    let show_nav = document.config.nav;

    let player = Arc::new(Mutex::new(CarouselPlayer::new(
        document.items.len(),
        document.config.loop_policy,
    )));
    let (tx, mut rx) = mpsc::channel::<CarouselCommand>(16);
    let cancel = parent_cancel.child_token();

    let task_player = Arc::clone(&player);
    let task_cancel = cancel.clone();

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_seconds));
        // The first interval tick fires immediately; consume it so the
        // first slide gets a full interval on screen.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = task_cancel.cancelled() => {
                    tracing::debug!("Carousel task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let mut player = task_player.lock().await;
                    if player.timer_armed() {
                        player.tick();
                        counter!("carousel_ticks_total").increment(1);
                    }
                }
                command = rx.recv() => {
                    let Some(command) = command else { break };
                    let applied = {
                        let mut player = task_player.lock().await;
                        match command {
                            // Arrow navigation only exists when the config
                            // shows it; swipes are always live.
                            CarouselCommand::Next | CarouselCommand::Prev if !show_nav => false,
                            CarouselCommand::Next => {
                                player.next();
                                true
                            }
                            CarouselCommand::Prev => {
                                player.prev();
                                true
                            }
                            CarouselCommand::GestureStart => {
                                player.gesture_start();
                                true
                            }
                            CarouselCommand::GestureEnd { dx } => {
                                player.gesture_end(dx, threshold_px);
                                true
                            }
                        }
                    };
                    if applied {
                        counter!("carousel_commands_total").increment(1);
                        // Manual interaction restarts the full interval.
                        ticker.reset();
                    }
                }
            }
        }
    });

    CarouselHandle {
        player,
        commands: tx,
        cancel,
    }
}

/// Owns the carousel task of one rendered page, rebuilding it whenever the
/// configuration document is replaced.
pub struct CarouselService {
    timing: CarouselTimingConfig,
    cancel: CancellationToken,
    handle: Option<CarouselHandle>,
}

impl CarouselService {
    pub fn new(timing: CarouselTimingConfig) -> Self {
        Self {
            timing,
            cancel: CancellationToken::new(),
            handle: None,
        }
    }

    /// Tear down the previous carousel, if any, and start one for the new
    /// document.
    pub fn rebuild(&mut self, document: &CarouselDocument) -> &CarouselHandle {
        if let Some(old) = self.handle.take() {
            old.shutdown();
        }

        let handle = spawn_carousel(document, &self.timing, &self.cancel);
        self.handle.insert(handle)
    }

    pub fn handle(&self) -> Option<&CarouselHandle> {
        self.handle.as_ref()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
