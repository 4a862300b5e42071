//! Preload progress reporting with `indicatif`.

use std::io::{BufRead, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bundlekit_loader::{PreloadDecision, PreloadObserver, PreloadPlan};
use indicatif::{ProgressBar, ProgressStyle};

use super::tables::format_bytes;

/// Terminal observer: confirms the plan, then draws a progress bar.
pub struct PreloadProgress {
    assume_yes: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl PreloadProgress {
    /// Prompt before downloading unless `assume_yes`.
    pub const fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            bar: Mutex::new(None),
        }
    }

    fn bar(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} packages")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }

    fn confirm(plan: &PreloadPlan) -> bool {
        print!(
            "Download {} package(s), {}? [y/N] ",
            plan.downloads.len(),
            format_bytes(plan.total_bytes)
        );
        let _ = std::io::stdout().flush();
        let mut answer = String::new();
        let read = tokio::task::block_in_place(|| std::io::stdin().lock().read_line(&mut answer));
        read.is_ok() && matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

impl PreloadObserver for PreloadProgress {
    fn before_start(&self, plan: &PreloadPlan, decision: PreloadDecision) {
        for name in &plan.stale_resident {
            println!("  {name}: content changed since it was loaded; unload to refresh");
        }
        if plan.downloads.is_empty() {
            decision.proceed();
            return;
        }
        if !self.assume_yes && !Self::confirm(plan) {
            decision.cancel();
            return;
        }
        *self.bar() = Some(Self::create_bar(plan.downloads.len() as u64));
        decision.proceed();
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn on_progress(&self, progress: f64) {
        if let Some(bar) = self.bar().as_ref() {
            let len = bar.length().unwrap_or(0);
            bar.set_position((progress * len as f64).round() as u64);
        }
    }

    fn on_done(&self) {
        if let Some(bar) = self.bar().take() {
            bar.finish();
        }
    }

    fn on_list_failed(&self, code: i32, reason: &str) {
        eprintln!("Preload list failed ({code}): {reason}");
    }

    fn on_package_failed(&self, name: &str, code: i32, reason: &str) {
        let line = format!("  {name}: failed ({code}) {reason}");
        match self.bar().as_ref() {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}
