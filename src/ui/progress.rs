use crate::ui::progress_message::{ProgressMessage, ProgressPhase, ProgressSink};
use crate::ui::{is_quiet, theme};
use crate::ui::Icons;
use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

const BAR_TEMPLATE: &str = "{msg:<20} [{bar:40}] {pos}/{len}";

fn visible() -> bool {
    console::Term::stdout().is_term() && !is_quiet()
}

fn phase_bar(mp: &MultiProgress, phase: ProgressPhase) -> ProgressBar {
    if !visible() {
        return ProgressBar::hidden();
    }
    let pb = mp.add(ProgressBar::new(0).with_message(phase.label()));
    if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

/// Renders merge progress on stdout from messages sent over a channel
pub struct ProgressManager {
    mp: MultiProgress,
    scan: ProgressBar,
    tx: crossbeam::channel::Sender<ProgressMessage>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ProgressManager {
    pub fn new() -> (Self, ProgressSink) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let mp = MultiProgress::new();
        let scan = if visible() {
            mp.add(ProgressBar::new_spinner().with_message("Reading source"))
        } else {
            ProgressBar::hidden()
        };
        let places = phase_bar(&mp, ProgressPhase::Places);
        let visits = phase_bar(&mp, ProgressPhase::Visits);
        let from_visits = phase_bar(&mp, ProgressPhase::FromVisits);

        let scan_clone = scan.clone();
        let handle = thread::spawn(move || {
            let bar = |phase: ProgressPhase| match phase {
                ProgressPhase::Places => &places,
                ProgressPhase::Visits => &visits,
                ProgressPhase::FromVisits => &from_visits,
            };

            for msg in rx {
                match msg {
                    ProgressMessage::Started { phase, total } => {
                        let pb = bar(phase);
                        pb.set_length(total as u64);
                        pb.set_position(0);
                    }
                    ProgressMessage::Progress { phase, current } => {
                        bar(phase).set_position(current as u64);
                    }
                    ProgressMessage::Finished { phase } => {
                        bar(phase).finish_with_message(format!("{} done", phase.label()));
                    }
                    ProgressMessage::StillWorking => {
                        if scan_clone.is_hidden() {
                            tracing::info!("Still working...");
                        } else {
                            scan_clone.set_message("Still working...");
                            scan_clone.tick();
                        }
                    }
                    ProgressMessage::Exit => break,
                }
            }
        });

        (
            Self {
                mp,
                scan,
                tx: tx.clone(),
                handle: Some(handle),
            },
            ProgressSink::new(tx),
        )
    }

    pub fn clear(&self) {
        self.scan.finish_and_clear();
        self.mp.clear().ok();
    }

    /// Stop the render thread once every queued message has been drawn
    pub fn finish(mut self) {
        let _ = self.tx.send(ProgressMessage::Exit);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.clear();
    }

    pub fn finish_with_summary(self, duration: Duration, places: usize, visits: usize) {
        self.finish();
        if is_quiet() {
            return;
        }
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success)
        );
        println!(
            "  {} {} places  {} {} visits",
            Icons::PACKAGE.style(theme().count),
            places,
            Icons::LINK.style(theme().count),
            visits
        );
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        if !visible() {
            return Self { pb: ProgressBar::hidden() };
        }
        let pb = ProgressBar::new_spinner();
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}
