// Panel definitions.
// The popup shows exactly one panel at a time; props carry what the renderer needs to fill it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::session::OperationKind;

/// A mutually exclusive popup view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    #[default]
    Auth,
    Upload,
    Ready,
    Tailor,
    Results,
    Settings,
    Error,
}

impl Panel {
    /// Get the display title for this panel.
    pub fn title(&self) -> &'static str {
        match self {
            Panel::Auth => "Sign in",
            Panel::Upload => "Upload resume",
            Panel::Ready => "Home",
            Panel::Tailor => "Tailor resume",
            Panel::Results => "Tailored results",
            Panel::Settings => "Settings",
            Panel::Error => "Something went wrong",
        }
    }

    /// The panel that hosts a long operation of the given kind.
    pub fn for_operation(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Upload => Panel::Upload,
            OperationKind::Tailor => Panel::Tailor,
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Data handed to the renderer alongside the panel.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PanelProps {
    #[default]
    None,
    /// Tailor panel pre-filled with job text. `busy` disables the submit button
    /// and shows the spinner, including for an operation resumed from an
    /// earlier popup whose outcome is unknown.
    Tailor {
        job_description: Option<String>,
        busy: bool,
    },
    /// Upload panel; `busy` as for Tailor.
    Upload { busy: bool },
    Results { payload: Value },
    Error { message: String },
}

impl PanelProps {
    /// Whether the panel must render in its disabled, spinner-visible sub-state.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            PanelProps::Tailor { busy: true, .. } | PanelProps::Upload { busy: true }
        )
    }
}

/// A panel together with its props.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub panel: Panel,
    pub props: PanelProps,
}

impl PanelView {
    pub fn new(panel: Panel, props: PanelProps) -> Self {
        Self { panel, props }
    }

    pub fn plain(panel: Panel) -> Self {
        Self::new(panel, PanelProps::None)
    }
}
