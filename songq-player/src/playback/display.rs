//! Display slot: holds at most one mounted widget
//!
//! Clearing the slot drops the widget, which is how a widget is torn down.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::widget::Widget;

/// Public view of the mounted widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NowPlaying {
    pub session_id: Uuid,
    pub identifier: String,
    pub started_at: DateTime<Utc>,
}

pub(crate) struct MountedWidget {
    pub info: NowPlaying,
    pub widget: Box<dyn Widget>,
}

#[derive(Default)]
pub struct DisplaySlot {
    mounted: Option<MountedWidget>,
}

impl DisplaySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// Session id of the mounted widget
    pub fn session(&self) -> Option<Uuid> {
        self.mounted.as_ref().map(|m| m.info.session_id)
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.mounted.as_ref().map(|m| &m.info)
    }

    pub(crate) fn widget_mut(&mut self) -> Option<&mut Box<dyn Widget>> {
        self.mounted.as_mut().map(|m| &mut m.widget)
    }

    /// Mount a widget; the slot must be empty
    pub(crate) fn mount(&mut self, session_id: Uuid, widget: Box<dyn Widget>) -> &NowPlaying {
        debug_assert!(self.mounted.is_none(), "display slot already mounted");
        let info = NowPlaying {
            session_id,
            identifier: widget.identifier().to_string(),
            started_at: Utc::now(),
        };
        &self.mounted.insert(MountedWidget { info, widget }).info
    }

    /// Empty the slot, dropping the widget
    pub fn clear(&mut self) -> Option<NowPlaying> {
        self.mounted.take().map(|m| m.info)
    }
}
