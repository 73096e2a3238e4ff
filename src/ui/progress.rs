use crate::output::is_quiet;
use crate::ui::progress_message::{ProgressMessage, ProgressPhase, ProgressSink};
use indicatif::{HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

const BAR_TEMPLATE: &str = "{msg:>8} {bar:40} {pos}/{len} [{elapsed_precise}]";

fn visible() -> bool {
    !is_quiet() && console::Term::stderr().is_term()
}

/// Progress display on stderr fed by sync progress reports.
///
/// Spins with `message` until the operation reports its total, then
/// switches to a bar.
pub struct ProgressManager {
    bar: ProgressBar,
    started: Instant,
}

impl ProgressManager {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_message(message.to_string());
        if visible() {
            bar.enable_steady_tick(Duration::from_millis(100));
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }

        Self {
            bar,
            started: Instant::now(),
        }
    }

    /// Wall time since the manager was created
    pub fn elapsed(&self) -> HumanDuration {
        HumanDuration(self.started.elapsed())
    }
}

impl ProgressSink for ProgressManager {
    fn report(&mut self, message: ProgressMessage) {
        match message {
            ProgressMessage::Started { phase, total } => {
                self.bar.disable_steady_tick();
                let style = ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar());
                self.bar.set_style(style);
                self.bar.set_length(total as u64);
                self.bar.set_position(0);
                self.bar.set_message(match phase {
                    ProgressPhase::Loading => "paths",
                    ProgressPhase::Restoring => "records",
                });
            }
            ProgressMessage::Progress { current, entity, .. } => {
                self.bar.set_position(current as u64);
                if let Some(entity) = entity {
                    tracing::trace!("Synced {}", entity);
                }
            }
            ProgressMessage::Finished { .. } => {
                self.bar.finish_and_clear();
            }
        }
    }
}

impl Drop for ProgressManager {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
