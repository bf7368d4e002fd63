// Panel rendering.
// The coordinator hands each decided view to a renderer; the console one prints it.

use std::io::{self, Stdout, Write};

use serde_json::Value;
use tracing::warn;

use crate::state::{PanelProps, PanelView};

/// Displays one panel at a time.
pub trait PanelRenderer {
    fn show(&mut self, view: &PanelView);
}

/// Plain-text renderer for terminals.
pub struct ConsoleRenderer<W: Write> {
    out: W,
}

impl ConsoleRenderer<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_view(&mut self, view: &PanelView) -> io::Result<()> {
        writeln!(self.out, "== {} ==", view.panel.title())?;

        match &view.props {
            PanelProps::None => {}
            PanelProps::Tailor {
                job_description,
                busy,
            } => {
                if *busy {
                    writeln!(self.out, "Tailoring in progress...")?;
                }
                if let Some(text) = job_description {
                    writeln!(self.out, "Job description:")?;
                    writeln!(self.out, "{}", text)?;
                }
            }
            PanelProps::Upload { busy } => {
                if *busy {
                    writeln!(self.out, "Upload in progress...")?;
                } else {
                    writeln!(self.out, "Choose a PDF, DOC, DOCX or TXT file (max 5 MB)")?;
                }
            }
            PanelProps::Results { payload } => {
                let text = match payload {
                    Value::String(s) => s.clone(),
                    other => serde_json::to_string_pretty(other).unwrap_or_default(),
                };
                writeln!(self.out, "{}", text)?;
            }
            PanelProps::Error { message } => {
                writeln!(self.out, "Error: {}", message)?;
            }
        }

        self.out.flush()
    }
}

impl<W: Write> PanelRenderer for ConsoleRenderer<W> {
    fn show(&mut self, view: &PanelView) {
        if let Err(e) = self.write_view(view) {
            warn!(error = %e, "Failed to render panel");
        }
    }
}
