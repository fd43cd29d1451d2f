//! One-shot duplicate check driven from command-line flags.

use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, RecvTimeoutError};
use indicatif::{ProgressBar, ProgressStyle};

use crate::controller::{Banner, FormController};
use crate::results::{PostCard, ResultsView, NO_DUPLICATES_MESSAGE};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckArgs {
    pub subreddits: Vec<String>,
    pub url: Option<String>,
    pub image: Option<PathBuf>,
}

impl CheckArgs {
    pub fn is_requested(&self) -> bool {
        !self.subreddits.is_empty() || self.url.is_some() || self.image.is_some()
    }
}

pub fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

/// Runs one submission cycle. Returns false when the check was rejected or
/// failed; the reason has already been written to `out`.
pub fn run_check(
    controller: &mut FormController,
    args: &CheckArgs,
    pb: &ProgressBar,
    out: &mut dyn Write,
) -> Result<bool> {
    for name in &args.subreddits {
        if !controller.add_subreddit(name) {
            return report_banner(controller, out);
        }
    }
    controller.confirm_subreddits();

    if let Some(path) = &args.image {
        let Some(pending) = controller.select_file(path.clone()) else {
            return report_banner(controller, out);
        };
        controller.finish_preview(pending.run());
        if let Some(preview) = controller.preview() {
            writeln!(out, "Image: {}", preview.label())?;
        }
    }
    if let Some(url) = &args.url {
        controller.set_url(url);
    }

    let pending = match controller.submit(Instant::now()) {
        Ok(pending) => pending,
        Err(_) => return report_banner(controller, out),
    };
    let generation = pending.generation;

    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(pending.run());
    });

    let outcome = loop {
        if let Some(progress) = controller.progress() {
            pb.set_prefix(progress.headline());
            pb.set_message(format!("[{}/4] {}", progress.step() + 1, progress.stage_label()));
        }
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(outcome) => break outcome,
            Err(RecvTimeoutError::Timeout) => {
                controller.tick(Instant::now());
                pb.tick();
            }
            Err(RecvTimeoutError::Disconnected) => {
                pb.finish_and_clear();
                anyhow::bail!("duplicate check worker {generation} exited without a result");
            }
        }
    };
    pb.finish_and_clear();

    controller.finish_check(outcome);
    match controller.results() {
        Some(view) => {
            out.write_all(render_text(view).as_bytes())
                .context("write results")?;
            Ok(true)
        }
        None => report_banner(controller, out),
    }
}

fn report_banner(controller: &FormController, out: &mut dyn Write) -> Result<bool> {
    if let Some(banner) = controller.banner() {
        write_banner(banner, out)?;
    }
    Ok(false)
}

fn write_banner(banner: &Banner, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Error: {}", banner.message)?;
    if let Some(details) = &banner.details {
        writeln!(out, "  {details}")?;
    }
    Ok(())
}

pub fn render_text(view: &ResultsView) -> String {
    let mut text = String::from("Original Post\n");
    match view {
        ResultsView::NoDuplicates => {
            text.push_str(&format!("  {NO_DUPLICATES_MESSAGE}\n"));
        }
        ResultsView::Found {
            original,
            duplicates,
        } => {
            push_card(&mut text, original);
            if !duplicates.is_empty() {
                text.push_str(&format!("\nDuplicates ({})\n", duplicates.len()));
                for card in duplicates {
                    push_card(&mut text, card);
                }
            }
        }
    }
    text
}

fn push_card(text: &mut String, card: &PostCard) {
    let marker = if card.original { "*" } else { "-" };
    text.push_str(&format!("  {marker} {}\n", card.title));
    let subreddit = card
        .subreddit
        .as_deref()
        .map(|name| format!(" in r/{name}"))
        .unwrap_or_default();
    text.push_str(&format!(
        "    {} on {}{}\n",
        card.author_line, card.date_label, subreddit
    ));
    if !card.link.is_empty() {
        text.push_str(&format!("    {}\n", card.link));
    }
    if !card.image_url.is_empty() {
        text.push_str(&format!("    image: {}\n", card.image_url));
    }
}
