use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use forgemap::sync::SyncProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::pass_label;

/// State for one provider/organization pass.
struct PassBar {
    bar: ProgressBar,
    failed: usize,
}

/// Interactive progress reporter using indicatif.
///
/// All mutable state lives behind a single mutex so that events from
/// concurrent passes update bars consistently.
pub struct InteractiveReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, PassBar>>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    /// Reporter that tracks bars without drawing them.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()))
    }

    fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the bar for a pass, starting as a spinner.
    fn bar<'a>(&self, bars: &'a mut HashMap<String, PassBar>, label: String) -> &'a mut PassBar {
        bars.entry(label).or_insert_with_key(|label| {
            let bar = self.multi.add(ProgressBar::new_spinner());
            bar.set_style(Self::spinner_style());
            bar.set_prefix(label.clone());
            bar.enable_steady_tick(Duration::from_millis(100));
            PassBar { bar, failed: 0 }
        })
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::PassStarted {
                provider,
                organization,
            } => {
                let pass = self.bar(&mut bars, pass_label(provider, &organization));
                pass.bar.set_message("starting");
            }

            SyncProgress::ListingRepos {
                provider,
                organization,
            } => {
                let pass = self.bar(&mut bars, pass_label(provider, &organization));
                pass.bar.set_message("listing repositories...");
            }

            SyncProgress::ListingComplete {
                provider,
                organization,
                total,
            } => {
                let pass = self.bar(&mut bars, pass_label(provider, &organization));
                pass.bar.disable_steady_tick();
                pass.bar.set_length(total as u64);
                pass.bar.set_position(0);
                pass.bar.set_style(Self::bar_style());
                pass.bar.set_message(format!("{} repos", total));
            }

            SyncProgress::RepoSynced {
                provider,
                organization,
                full_name,
                position,
                ..
            } => {
                let pass = self.bar(&mut bars, pass_label(provider, &organization));
                pass.bar.set_position(position as u64);
                pass.bar.set_message(full_name);
            }

            SyncProgress::RepoFailed {
                provider,
                organization,
                id,
                ..
            } => {
                let pass = self.bar(&mut bars, pass_label(provider, &organization));
                pass.failed += 1;
                pass.bar.inc(1);
                pass.bar
                    .set_message(format!("{} failed ({} errors)", id, pass.failed));
            }

            SyncProgress::PassCancelled {
                provider,
                organization,
                remaining,
            } => {
                let pass = self.bar(&mut bars, pass_label(provider, &organization));
                pass.bar
                    .abandon_with_message(format!("cancelled, {} not attempted", remaining));
            }

            SyncProgress::PassComplete {
                provider,
                organization,
                upserted,
                errors,
            } => {
                let pass = self.bar(&mut bars, pass_label(provider, &organization));
                let message = if errors > 0 {
                    format!("{} synced, {} errors", upserted, errors)
                } else {
                    format!("{} synced", upserted)
                };
                if pass.bar.is_finished() {
                    pass.bar.set_message(message);
                } else {
                    pass.bar.finish_with_message(message);
                }
            }

            SyncProgress::PassFailed {
                provider,
                organization,
                reason,
            } => {
                let pass = self.bar(&mut bars, pass_label(provider, &organization));
                pass.bar.disable_steady_tick();
                pass.bar.abandon_with_message(format!("failed: {}", reason));
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        for pass in bars.values() {
            if !pass.bar.is_finished() {
                pass.bar.finish();
            }
        }
    }

    #[cfg(test)]
    pub fn bar_position(&self, label: &str) -> Option<u64> {
        let bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        bars.get(label).map(|pass| pass.bar.position())
    }

    #[cfg(test)]
    pub fn bar_length(&self, label: &str) -> Option<u64> {
        let bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        bars.get(label).and_then(|pass| pass.bar.length())
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
