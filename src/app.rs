//! Event loop that feeds activations into the controller.
//!
//! Activation sources never touch the controller. They send [`AppEvent`]s
//! into one channel and the loop awaits each dispatch before taking the next
//! event, so activations are handled strictly one at a time.

use crate::control::{parse_command, TerminalCommand};
use crate::controller::{Control, ToggleController};
use crate::cursor::CursorService;
use crate::keep_alive::KeepAlive;
use colored::Colorize;
use std::future::Future;
use std::io::BufRead;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Terminal,
    Hotkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Activate(Source),
    Quit,
}

pub struct App<C, S> {
    controller: ToggleController<C, S>,
    keep_alive: Option<KeepAlive>,
}

impl<C, S> App<C, S>
where
    C: Control,
    S: CursorService,
{
    pub fn new(controller: ToggleController<C, S>, keep_alive: Option<KeepAlive>) -> Self {
        Self {
            controller,
            keep_alive,
        }
    }

    /// Run until a `Quit` event, every sender is gone, or `shutdown` resolves.
    ///
    /// Hands the controller back so the caller can inspect the final state.
    pub async fn run(
        mut self,
        mut events: UnboundedReceiver<AppEvent>,
        shutdown: impl Future<Output = ()>,
    ) -> ToggleController<C, S> {
        let mut ticker = self.keep_alive.as_ref().map(|k| {
            let mut ticker = interval_at(Instant::now() + k.interval(), k.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(AppEvent::Activate(source)) => self.dispatch(source).await,
                    Some(AppEvent::Quit) | None => break,
                },
                _ = next_tick(&mut ticker) => self.nudge().await,
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        self.controller
    }

    async fn dispatch(&mut self, source: Source) {
        match self.controller.activate().await {
            Ok(state) => debug!(?source, ?state, "activation handled"),
            Err(e) => {
                warn!(?source, error = %e, "activation failed");
                eprintln!("{} {}", "✗".red(), e);
            }
        }
    }

    async fn nudge(&mut self) {
        let Some(keep_alive) = self.keep_alive.as_mut() else {
            return;
        };
        if let Err(e) = self.controller.keep_alive(keep_alive).await {
            warn!(error = %e, "keep-alive nudge failed");
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Read terminal lines on a plain thread and turn them into events.
///
/// A blocking stdin read would otherwise hold up runtime shutdown.
pub fn spawn_terminal_reader(events: UnboundedSender<AppEvent>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("terminal-reader".into())
        .spawn(move || {
            forward_lines(std::io::stdin().lock(), &events);
            debug!("terminal reader stopped");
        })?;
    Ok(())
}

/// Turn terminal lines into events until EOF, a read failure, or the loop
/// going away. Lines that are not valid UTF-8 are skipped.
fn forward_lines<R: BufRead>(mut reader: R, events: &UnboundedSender<AppEvent>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "terminal input failed, only the hotkey remains");
                break;
            }
        }

        let Ok(line) = std::str::from_utf8(&buf) else {
            warn!("skipping terminal line that is not valid UTF-8");
            continue;
        };
        let event = match parse_command(line) {
            TerminalCommand::Activate => AppEvent::Activate(Source::Terminal),
            TerminalCommand::Quit => AppEvent::Quit,
            TerminalCommand::Unknown(command) => {
                eprintln!(
                    "{} unknown command '{}' (enter toggles, q quits)",
                    "?".yellow(),
                    command
                );
                continue;
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }
}

/// Resolve when `signal` fires.
///
/// If the handler could not be installed this never resolves, so a missing
/// Ctrl-C handler does not end the loop.
pub async fn wait_for_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(error = %e, "could not install Ctrl-C handler, use q to quit");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Affordance, ToggleState};
    use crate::cursor::fake::FakeCursor;
    use crate::cursor::Position;
    use crate::error::CursorError;
    use std::time::Duration;
    use tokio::sync::mpsc::unbounded_channel;

    #[derive(Default)]
    struct NullControl {
        label: String,
    }

    impl Control for NullControl {
        fn bind(&mut self, _role: Affordance) {}

        fn set_label(&mut self, label: &str) {
            self.label = label.to_string();
        }
    }

    fn app(cursor: FakeCursor, keep_alive: Option<KeepAlive>) -> App<NullControl, FakeCursor> {
        App::new(
            ToggleController::new(NullControl::default(), cursor),
            keep_alive,
        )
    }

    #[tokio::test]
    async fn test_events_are_dispatched_in_order() {
        let (tx, rx) = unbounded_channel();
        tx.send(AppEvent::Activate(Source::Terminal)).unwrap();
        tx.send(AppEvent::Activate(Source::Hotkey)).unwrap();
        tx.send(AppEvent::Activate(Source::Terminal)).unwrap();
        tx.send(AppEvent::Quit).unwrap();
        tx.send(AppEvent::Activate(Source::Terminal)).unwrap();

        let controller = app(FakeCursor::at(500, 300), None)
            .run(rx, std::future::pending())
            .await;

        assert_eq!(controller.state(), ToggleState::Running);
        assert_eq!(controller.control().label, "Stop");
        assert_eq!(
            controller.cursor().moves,
            vec![Position::new(500, 400), Position::new(500, 500)]
        );
    }

    #[tokio::test]
    async fn test_failed_activation_does_not_end_loop() {
        let (tx, rx) = unbounded_channel();
        tx.send(AppEvent::Activate(Source::Terminal)).unwrap();
        tx.send(AppEvent::Activate(Source::Terminal)).unwrap();
        drop(tx);

        let cursor = FakeCursor::failing(CursorError::device_unavailable("no display"));
        let controller = app(cursor, None).run(rx, std::future::pending()).await;

        assert_eq!(controller.state(), ToggleState::Idle);
        assert_eq!(controller.cursor().reads, 2);
    }

    #[tokio::test]
    async fn test_shutdown_future_ends_loop() {
        let (_tx, rx) = unbounded_channel();
        let controller = app(FakeCursor::at(0, 0), None)
            .run(rx, std::future::ready(()))
            .await;
        assert_eq!(controller.state(), ToggleState::Idle);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let (tx, mut rx) = unbounded_channel();
        let input: &[u8] = b"\xff\xfe\n\nq\n";

        forward_lines(input, &tx);

        assert_eq!(rx.try_recv(), Ok(AppEvent::Activate(Source::Terminal)));
        assert_eq!(rx.try_recv(), Ok(AppEvent::Quit));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unknown_lines_send_nothing() {
        let (tx, mut rx) = unbounded_channel();
        let input: &[u8] = b"stop\nnonsense";

        forward_lines(input, &tx);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_signal_install_never_resolves() {
        let failed = async { Err(std::io::Error::other("no signal driver")) };
        let waited =
            tokio::time::timeout(Duration::from_secs(60), wait_for_signal(failed)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_signal_resolves_wait() {
        wait_for_signal(async { Ok(()) }).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_ticks_while_running() {
        let (tx, rx) = unbounded_channel();
        let keep_alive = KeepAlive::new(Duration::from_secs(1), 10);

        let driver = async {
            tx.send(AppEvent::Activate(Source::Hotkey)).unwrap();
            tokio::time::sleep(Duration::from_millis(2500)).await;
            tx.send(AppEvent::Quit).unwrap();
        };
        let (controller, ()) = tokio::join!(
            app(FakeCursor::at(100, 100), Some(keep_alive)).run(rx, std::future::pending()),
            driver
        );

        assert_eq!(
            controller.cursor().moves,
            vec![
                Position::new(100, 200),
                Position::new(110, 200),
                Position::new(100, 200)
            ]
        );
    }
}
