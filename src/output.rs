use std::cell::RefCell;
use std::io::{self, Write};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::fetch::{ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Renders download progress on stderr: a byte bar when the server sends a
/// length, a spinner otherwise.
#[derive(Default)]
pub struct BarProgress {
    bar: RefCell<Option<ProgressBar>>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(&self) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish();
        }
    }

    fn start(&self, event: &ProgressEvent) -> ProgressBar {
        let bar = match event.total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar().template(
                    "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                ) {
                    bar.set_style(style.progress_chars("#>-"));
                }
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) =
                    ProgressStyle::default_spinner().template("{spinner:.green} {msg} {bytes}")
                {
                    bar.set_style(style);
                }
                bar
            }
        };
        bar.set_message(event.message.clone());
        bar
    }
}

impl ProgressSink for BarProgress {
    fn event(&self, event: ProgressEvent) {
        let mut slot = self.bar.borrow_mut();
        match event.transferred {
            Some(0) => {
                if let Some(previous) = slot.take() {
                    previous.finish();
                }
                *slot = Some(self.start(&event));
            }
            Some(transferred) => {
                slot.get_or_insert_with(|| self.start(&event))
                    .set_position(transferred);
            }
            None => {
                if let Some(previous) = slot.take() {
                    previous.finish();
                }
                eprintln!("{}", event.message);
            }
        }
    }
}
