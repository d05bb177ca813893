// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::grouping::GroupBy;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub group_by: GroupBy,
    pub pending_changes: usize,
    pub help_visible: bool,
    pub status_line: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextGrouping,
    PrevGrouping,
    SetGrouping(GroupBy),
    ToggleHelp,
    SetPending(usize),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    GroupingChanged(GroupBy),
    HelpVisibilityChanged(bool),
    PendingChanged(usize),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextGrouping => self.set_grouping(self.group_by.rotate(1)),
            AppCommand::PrevGrouping => self.set_grouping(self.group_by.rotate(-1)),
            AppCommand::SetGrouping(group_by) => self.set_grouping(group_by),
            AppCommand::ToggleHelp => {
                self.help_visible = !self.help_visible;
                vec![AppEvent::HelpVisibilityChanged(self.help_visible)]
            }
            AppCommand::SetPending(count) => {
                if self.pending_changes == count {
                    return Vec::new();
                }
                self.pending_changes = count;
                vec![AppEvent::PendingChanged(count)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn set_grouping(&mut self, group_by: GroupBy) -> Vec<AppEvent> {
        if self.group_by == group_by {
            return Vec::new();
        }
        self.group_by = group_by;
        vec![
            AppEvent::GroupingChanged(group_by),
            self.set_status(&format!("grouped by {}", group_by.label())),
        ]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
