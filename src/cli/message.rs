use std::time::Duration;

use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

use crate::summary::{MessageLevel, MessageSink, Summary};

/// Prints summaries to stderr, colored by level. The display duration has no
/// meaning on a terminal and is only logged.
pub struct TerminalSink {
    writer: BufferWriter,
}

impl TerminalSink {
    pub fn new(color: ColorChoice) -> Self {
        TerminalSink {
            writer: BufferWriter::stderr(color),
        }
    }
}

impl MessageSink for TerminalSink {
    fn push(&mut self, summary: &Summary, duration: Duration) {
        log::trace!("Showing summary for {:?}", duration);

        let mut buffer = self.writer.buffer();
        let result = write_summary(&mut buffer, summary).and_then(|()| self.writer.print(&buffer));

        if let Err(err) = result {
            log::warn!("Could not print summary: {}", err);
        }
    }
}

fn level_color(level: MessageLevel) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match level {
        MessageLevel::Info => {}
        MessageLevel::Success => {
            spec.set_fg(Some(Color::Green));
        }
        MessageLevel::Warning => {
            spec.set_fg(Some(Color::Yellow));
        }
        MessageLevel::Critical => {
            spec.set_fg(Some(Color::Red)).set_bold(true);
        }
    }
    spec
}

fn write_summary(out: &mut impl WriteColor, summary: &Summary) -> std::io::Result<()> {
    out.set_color(&level_color(summary.level))?;
    write!(out, "{}:", summary.title)?;
    out.reset()?;
    writeln!(out, " {}", summary.message)
}
