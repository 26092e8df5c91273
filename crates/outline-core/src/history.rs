use serde::Deserialize;
use tracing::debug;

use crate::command::Command;

pub const DEFAULT_MAX_UNDO: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Entries kept on the undo stack; the oldest are dropped first.
    pub max_undo: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undo: DEFAULT_MAX_UNDO,
        }
    }
}

impl HistoryConfig {
    /// Replace zero values with the defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = DEFAULT_MAX_UNDO;
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct CommandGroup<Cmd> {
    name: String,
    commands: Vec<Cmd>,
}

impl<Cmd> CommandGroup<Cmd> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Cmd] {
        &self.commands
    }

    /// Run every command in order. On failure, the commands already run are undone.
    fn run<C>(&mut self, ctx: &mut C) -> bool
    where
        Cmd: Command<C>,
    {
        for ix in 0..self.commands.len() {
            if !self.commands[ix].run(ctx) {
                debug!(group = %self.name, index = ix, "group run failed, rolling back");
                for done in self.commands[..ix].iter_mut().rev() {
                    done.undo(ctx);
                }
                return false;
            }
        }
        true
    }

    /// Undo every command in reverse order. On failure, the commands already
    /// undone are run again.
    fn undo<C>(&mut self, ctx: &mut C) -> bool
    where
        Cmd: Command<C>,
    {
        for ix in (0..self.commands.len()).rev() {
            if !self.commands[ix].undo(ctx) {
                debug!(group = %self.name, index = ix, "group undo failed, rolling forward");
                for undone in self.commands[ix + 1..].iter_mut() {
                    undone.run(ctx);
                }
                return false;
            }
        }
        true
    }

    fn rollback<C>(&mut self, ctx: &mut C)
    where
        Cmd: Command<C>,
    {
        for command in self.commands.iter_mut().rev() {
            command.undo(ctx);
        }
        self.commands.clear();
    }
}

#[derive(Debug, Clone)]
pub enum HistoryEntry<Cmd> {
    Single(Cmd),
    Group(CommandGroup<Cmd>),
}

impl<Cmd> HistoryEntry<Cmd> {
    fn run<C>(&mut self, ctx: &mut C) -> bool
    where
        Cmd: Command<C>,
    {
        match self {
            HistoryEntry::Single(command) => command.run(ctx),
            HistoryEntry::Group(group) => group.run(ctx),
        }
    }

    fn undo<C>(&mut self, ctx: &mut C) -> bool
    where
        Cmd: Command<C>,
    {
        match self {
            HistoryEntry::Single(command) => command.undo(ctx),
            HistoryEntry::Group(group) => group.undo(ctx),
        }
    }
}

/// Undo/redo history of commands.
///
/// Commands submitted through [`CommandManager::run`] are executed first and
/// recorded only when they succeed. A successful command is offered to the
/// top undo entry for coalescing and clears the redo stack.
///
/// Groups collect the commands run between [`begin_group`](Self::begin_group)
/// and [`end_group`](Self::end_group) into one entry that undoes and redoes
/// atomically. If a command fails inside a group, the commands already in the
/// group are rolled back and the rest of the group is refused until it is
/// ended; nothing is recorded for it.
#[derive(Debug)]
pub struct CommandManager<Cmd> {
    done: Vec<HistoryEntry<Cmd>>,
    undone: Vec<HistoryEntry<Cmd>>,
    group: Option<CommandGroup<Cmd>>,
    group_depth: usize,
    group_failed: bool,
    config: HistoryConfig,
}

impl<Cmd> Default for CommandManager<Cmd> {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl<Cmd> CommandManager<Cmd> {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            done: Vec::new(),
            undone: Vec::new(),
            group: None,
            group_depth: 0,
            group_failed: false,
            config: config.with_defaults(),
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty() && self.undone.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.done.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }

    pub fn is_grouping(&self) -> bool {
        self.group_depth > 0
    }

    /// Undo entries, most recent first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &HistoryEntry<Cmd>> {
        self.done.iter().rev()
    }

    /// Redo entries, next to redo first.
    pub fn redo_entries(&self) -> impl Iterator<Item = &HistoryEntry<Cmd>> {
        self.undone.iter().rev()
    }

    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
        self.group = None;
        self.group_depth = 0;
        self.group_failed = false;
    }

    /// Open a group. Nested calls extend the outermost group.
    pub fn begin_group(&mut self, name: impl Into<String>) {
        self.group_depth += 1;
        if self.group_depth == 1 {
            let group = CommandGroup::new(name);
            debug!(group = %group.name, "begin group");
            self.group = Some(group);
            self.group_failed = false;
        }
    }

    /// Close the current group, recording it if it holds anything.
    pub fn end_group(&mut self) {
        if self.group_depth == 0 {
            return;
        }
        self.group_depth -= 1;
        if self.group_depth > 0 {
            return;
        }
        let failed = std::mem::take(&mut self.group_failed);
        let Some(mut group) = self.group.take() else {
            return;
        };
        if failed {
            debug!(group = %group.name, "dropping failed group");
            return;
        }
        match group.commands.len() {
            0 => debug!(group = %group.name, "dropping empty group"),
            1 => {
                if let Some(command) = group.commands.pop() {
                    self.push_done(HistoryEntry::Single(command));
                }
            }
            len => {
                debug!(group = %group.name, len, "end group");
                self.push_done(HistoryEntry::Group(group));
            }
        }
    }

    fn force_end_group(&mut self) {
        if self.group_depth > 0 {
            self.group_depth = 1;
            self.end_group();
        }
    }

    fn push_done(&mut self, entry: HistoryEntry<Cmd>) {
        self.done.push(entry);
        if self.done.len() > self.config.max_undo {
            let excess = self.done.len() - self.config.max_undo;
            self.done.drain(..excess);
        }
    }

    /// Run `command` against `ctx` and record it on success.
    pub fn run<C>(&mut self, mut command: Cmd, ctx: &mut C) -> bool
    where
        Cmd: Command<C>,
    {
        let kind = command.kind();
        if self.group_failed {
            debug!(command = %kind, "refused: enclosing group failed");
            return false;
        }
        if !command.run(ctx) {
            debug!(command = %kind, "run failed");
            if let Some(group) = self.group.as_mut() {
                group.rollback(ctx);
                self.group_failed = true;
            }
            return false;
        }
        debug!(command = %kind, "run");
        self.undone.clear();

        if let Some(group) = self.group.as_mut() {
            if group
                .commands
                .last_mut()
                .is_some_and(|last| last.coalesce(&command))
            {
                debug!(command = %kind, "coalesced");
                return true;
            }
            group.commands.push(command);
            return true;
        }

        let coalesced = match self.done.last_mut() {
            Some(HistoryEntry::Single(last)) => last.coalesce(&command),
            _ => false,
        };
        if coalesced {
            debug!(command = %kind, "coalesced");
            return true;
        }
        self.push_done(HistoryEntry::Single(command));
        true
    }

    /// Undo the most recent entry. An open group is closed first.
    pub fn undo<C>(&mut self, ctx: &mut C) -> bool
    where
        Cmd: Command<C>,
    {
        self.force_end_group();
        let Some(mut entry) = self.done.pop() else {
            return false;
        };
        if entry.undo(ctx) {
            debug!(undo_depth = self.done.len(), "undo");
            self.undone.push(entry);
            true
        } else {
            debug!("undo failed");
            self.done.push(entry);
            false
        }
    }

    /// Redo the most recently undone entry. An open group is closed first.
    pub fn redo<C>(&mut self, ctx: &mut C) -> bool
    where
        Cmd: Command<C>,
    {
        self.force_end_group();
        let Some(mut entry) = self.undone.pop() else {
            return false;
        };
        if entry.run(ctx) {
            debug!(redo_depth = self.undone.len(), "redo");
            self.done.push(entry);
            true
        } else {
            debug!("redo failed");
            self.undone.push(entry);
            false
        }
    }
}
