use super::*;

pub(super) async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> Result<()> {
    let command = match msg
        .text()
        .and_then(|text| Command::parse(text, &state.bot_username))
    {
        Some(command) => command,
        None => return Ok(()),
    };

    let chat_id = msg.chat.id;
    let kind = if msg.chat.is_private() {
        ChatKind::Direct
    } else {
        ChatKind::Group
    };

    // SQLite calls block, keep them off the async workers.
    let reply = tokio::task::spawn_blocking(move || {
        state.dispatcher.handle_command(chat_id.0, kind, &command)
    })
    .await
    .context("command task failed")?;

    send_reply(&bot, chat_id, reply).await
}

async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> Result<()> {
    let request = bot
        .send_message(chat_id, reply.text)
        .parse_mode(ParseMode::Html);
    match reply.keyboard {
        Some(kb) => {
            request.reply_markup(kb).await?;
        }
        None => {
            request.await?;
        }
    }
    Ok(())
}
