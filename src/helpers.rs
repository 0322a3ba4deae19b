use super::*;
use teloxide::utils::html;

pub(super) const WELCOME_TEXT: &str = "👋 Welcome to GroceryBot!\n\n\
    I help manage shared grocery lists in group chats.\n\n\
    Use /help to see available commands.";

pub(super) const HELP_TEXT: &str = "🛒 <b>GroceryBot Help</b>\n\n\
    I help manage a shared grocery list for your group!\n\n\
    <b>Commands:</b>\n\n\
    • <code>/add &lt;item&gt;</code> - Add item(s) to the list\n  \
    Example: <code>/add milk, eggs</code>\n  \
    Example: <code>/add bread</code>\n\n\
    • <code>/remove</code> - Show list with remove buttons to delete items\n\n\
    • <code>/list</code> - Show list with toggle buttons to mark items done/undone\n\n\
    • <code>/clear</code> - Clear all items from the list\n\n\
    • <code>/help</code> - Show this help message\n\n\
    <b>How it works:</b>\n\
    - Use <code>/list</code> to mark items as done/undone (tap the item button)\n\
    - Use <code>/remove</code> to delete items (tap the 🗑️ button)\n\
    - Each group has its own separate list\n\
    - Items are case-insensitive\n\n\
    <b>Made with ❤️ for group shopping lists!</b>";

pub(super) const PRIVATE_CHAT_REFUSAL: &str = "❌ This bot only works in group chats. \
    Please add me to a group and use the commands there!";

pub(super) const LIST_EMPTY: &str =
    "📝 Your grocery list is empty!\n\nUse /add &lt;item&gt; to add items to the list.";
pub(super) const LIST_HEADER: &str = "🛒 Your Grocery List:\n\n";
pub(super) const LIST_ALREADY_EMPTY: &str = "📝 The grocery list is already empty!";

pub(super) const ADD_USAGE: &str = "Usage: /add &lt;item&gt; or /add &lt;item1&gt;, &lt;item2&gt;, &lt;item3&gt;\n\
    Example: /add milk, eggs, bread";
pub(super) const ADD_NO_ITEMS: &str = "Please provide items to add.\nUsage: /add &lt;item&gt;";
pub(super) const ALL_ITEMS_EXIST: &str = "⚠️ All items are already in the list!";

pub(super) const ITEM_NOT_FOUND: &str = "❌ Item not found!";
pub(super) const GENERIC_FAILURE: &str = "❌ An error occurred. Please try again.";

/// Split the argument of `/add` into trimmed, non-empty items.
pub(super) fn split_items(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub(super) fn add_summary_text(first: &str, added: usize, existing: usize) -> String {
    let first = html::escape(first);
    match (added, existing) {
        (0, 1) => format!("⚠️ '{}' is already in the list!", first),
        (1, 0) => format!("✅ Added '{}' to the grocery list!", first),
        (added, 0) if added > 0 => format!("✅ Added {} items to the grocery list!", added),
        (added, existing) if added > 0 => format!(
            "✅ Added {} item(s). {} item(s) were already in the list.",
            added, existing
        ),
        _ => ALL_ITEMS_EXIST.to_string(),
    }
}

pub(super) fn toggled_text(completed: bool) -> String {
    let status = if completed { "completed ✅" } else { "uncompleted" };
    format!("Item marked as {}", status)
}

pub(super) fn removed_text(name: &str) -> String {
    format!("✅ Removed '{}' from the list!", html::escape(name))
}

pub(super) fn cleared_text(removed: usize) -> String {
    format!("🗑️ Cleared {} item(s) from the grocery list!", removed)
}

/// List with one toggle button per item.
pub(super) fn build_toggle_view(items: &[ListItem]) -> Reply {
    if items.is_empty() {
        return Reply::text(LIST_EMPTY);
    }

    let rows: Vec<Vec<InlineKeyboardButton>> = items
        .iter()
        .map(|item| {
            let label = if item.completed {
                format!("✅ {}", item.name)
            } else {
                item.name.clone()
            };
            vec![InlineKeyboardButton::callback(
                label,
                CallbackAction::Toggle(item.id).payload(),
            )]
        })
        .collect();

    let mut text = String::from(LIST_HEADER);
    text.push_str(&format!("📊 Total: {} item(s)\n", items.len()));
    text.push_str("Tap to mark items done/undone");
    Reply::with_keyboard(text, InlineKeyboardMarkup::new(rows))
}

/// Numbered list with one remove button per item.
pub(super) fn build_remove_view(items: &[ListItem]) -> Reply {
    if items.is_empty() {
        return Reply::text(LIST_EMPTY);
    }

    let mut text = String::from(LIST_HEADER);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let name = html::escape(&item.name);
        if item.completed {
            text.push_str(&format!("{}. ✅ <s>{}</s>\n", index + 1, name));
        } else {
            text.push_str(&format!("{}. {}\n", index + 1, name));
        }
        rows.push(vec![InlineKeyboardButton::callback(
            format!("🗑️ {}", item.name),
            CallbackAction::Remove(item.id).payload(),
        )]);
    }

    text.push_str(&format!("\n📊 Total: {} item(s)\n", items.len()));
    text.push_str("Tap to remove items");
    Reply::with_keyboard(text, InlineKeyboardMarkup::new(rows))
}
