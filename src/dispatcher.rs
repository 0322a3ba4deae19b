//! Routes parsed commands and button callbacks onto the item store.
//!
//! Nothing in here touches the network: every entry point returns the
//! replies the transport should deliver, in order.

use log::{error, info, warn};
use teloxide::types::InlineKeyboardMarkup;

use crate::helpers::*;
use crate::store::{ItemStore, RemoveOutcome, StoreResult, ToggleOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChatKind {
    Group,
    Direct,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Start,
    Help,
    Add(String),
    Remove,
    List,
    Clear,
}

impl Command {
    /// Parse `/name[@bot] args...`. Arguments are re-joined with single spaces.
    /// A command addressed to a different bot yields `None`.
    pub(crate) fn parse(text: &str, bot_username: &str) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        let first = tokens.next()?;
        let name = first.strip_prefix('/')?;
        let name = match name.split_once('@') {
            Some((name, target)) if target.eq_ignore_ascii_case(bot_username) => name,
            Some(_) => return None,
            None => name,
        };
        let args = tokens.collect::<Vec<_>>().join(" ");
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "add" => Some(Command::Add(args)),
            "remove" => Some(Command::Remove),
            "list" => Some(Command::List),
            "clear" => Some(Command::Clear),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Add(_) => "add",
            Command::Remove => "remove",
            Command::List => "list",
            Command::Clear => "clear",
        }
    }

    fn requires_group(&self) -> bool {
        !matches!(self, Command::Start | Command::Help)
    }
}

/// Decoded `<action>_<id>` button payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CallbackAction {
    Toggle(i64),
    Remove(i64),
}

impl CallbackAction {
    pub(crate) fn parse(data: &str) -> Option<Self> {
        let (action, id) = data.rsplit_once('_')?;
        let id = id.parse::<i64>().ok()?;
        match action {
            "toggle" => Some(CallbackAction::Toggle(id)),
            "remove" => Some(CallbackAction::Remove(id)),
            _ => None,
        }
    }

    pub(crate) fn payload(&self) -> String {
        match self {
            CallbackAction::Toggle(id) => format!("toggle_{}", id),
            CallbackAction::Remove(id) => format!("remove_{}", id),
        }
    }
}

/// HTML text plus an optional inline keyboard.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Reply {
    pub(crate) text: String,
    pub(crate) keyboard: Option<InlineKeyboardMarkup>,
}

impl Reply {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Reply {
            text: text.into(),
            keyboard: None,
        }
    }

    pub(crate) fn with_keyboard(text: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Self {
        Reply {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

pub(crate) struct ActionDispatcher {
    store: ItemStore,
}

impl ActionDispatcher {
    pub(crate) fn new(store: ItemStore) -> Self {
        ActionDispatcher { store }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &ItemStore {
        &self.store
    }

    pub(crate) fn handle_command(&self, chat_id: i64, kind: ChatKind, command: &Command) -> Reply {
        if kind == ChatKind::Direct && command.requires_group() {
            return Reply::text(PRIVATE_CHAT_REFUSAL);
        }

        let result = match command {
            Command::Start => Ok(Reply::text(WELCOME_TEXT)),
            Command::Help => {
                info!("chat {}: help requested", chat_id);
                Ok(Reply::text(HELP_TEXT))
            }
            Command::Add(args) => self.add_items(chat_id, args),
            Command::List => self.show_toggle_list(chat_id),
            Command::Remove => self.show_remove_list(chat_id),
            Command::Clear => self.clear_items(chat_id),
        };

        result.unwrap_or_else(|err| {
            error!("chat {}: /{} failed: {:#}", chat_id, command.name(), err);
            Reply::text(GENERIC_FAILURE)
        })
    }

    /// Replies are edits to the message carrying the button. An empty vec
    /// means the payload was dropped.
    pub(crate) fn handle_callback(&self, chat_id: i64, data: &str) -> Vec<Reply> {
        let Some(action) = CallbackAction::parse(data) else {
            warn!("chat {}: invalid callback data: {:?}", chat_id, data);
            return Vec::new();
        };

        match self.apply_callback(chat_id, action) {
            Ok(replies) => {
                info!("chat {}: callback {}", chat_id, action.payload());
                replies
            }
            Err(err) => {
                error!("chat {}: callback {} failed: {:#}", chat_id, data, err);
                vec![Reply::text(GENERIC_FAILURE)]
            }
        }
    }

    fn apply_callback(&self, chat_id: i64, action: CallbackAction) -> StoreResult<Vec<Reply>> {
        match action {
            CallbackAction::Toggle(id) => match self.store.toggle_completed(chat_id, id)? {
                ToggleOutcome::NotFound => Ok(vec![Reply::text(ITEM_NOT_FOUND)]),
                ToggleOutcome::Toggled(completed) => {
                    let items = self.store.list(chat_id)?;
                    Ok(vec![
                        Reply::text(toggled_text(completed)),
                        build_toggle_view(&items),
                    ])
                }
            },
            CallbackAction::Remove(id) => match self.store.remove(chat_id, id)? {
                RemoveOutcome::NotFound => Ok(vec![Reply::text(ITEM_NOT_FOUND)]),
                RemoveOutcome::Removed(name) => {
                    let items = self.store.list(chat_id)?;
                    Ok(vec![
                        Reply::text(removed_text(&name)),
                        build_remove_view(&items),
                    ])
                }
            },
        }
    }

    fn add_items(&self, chat_id: i64, args: &str) -> StoreResult<Reply> {
        if args.trim().is_empty() {
            return Ok(Reply::text(ADD_USAGE));
        }
        let items = split_items(args);
        let Some(first) = items.first() else {
            return Ok(Reply::text(ADD_NO_ITEMS));
        };

        let (added, existing) = self.store.add_many(chat_id, &items)?;
        info!("chat {}: added {}, existing {}", chat_id, added, existing);
        Ok(Reply::text(add_summary_text(first, added, existing)))
    }

    fn show_toggle_list(&self, chat_id: i64) -> StoreResult<Reply> {
        let items = self.store.list(chat_id)?;
        info!("chat {}: listed {} items with toggle buttons", chat_id, items.len());
        Ok(build_toggle_view(&items))
    }

    fn show_remove_list(&self, chat_id: i64) -> StoreResult<Reply> {
        let items = self.store.list(chat_id)?;
        info!("chat {}: listed {} items with remove buttons", chat_id, items.len());
        Ok(build_remove_view(&items))
    }

    fn clear_items(&self, chat_id: i64) -> StoreResult<Reply> {
        if self.store.count(chat_id)? == 0 {
            return Ok(Reply::text(LIST_ALREADY_EMPTY));
        }
        let removed = self.store.clear(chat_id)?;
        info!("chat {}: cleared {} items", chat_id, removed);
        Ok(Reply::text(cleared_text(removed)))
    }
}
