use super::*;
use teloxide::types::MessageId;

pub(super) async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> Result<()> {
    // Always answer so the client stops its loading spinner.
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message.clone() else {
        return Ok(());
    };
    let Some(data) = q.data.clone() else {
        return Ok(());
    };

    let chat_id = message.chat.id;
    let replies = tokio::task::spawn_blocking(move || {
        state.dispatcher.handle_callback(chat_id.0, &data)
    })
    .await
    .context("callback task failed")?;

    for reply in replies {
        edit_reply(&bot, chat_id, message.id, reply).await?;
    }
    Ok(())
}

async fn edit_reply(bot: &Bot, chat_id: ChatId, message_id: MessageId, reply: Reply) -> Result<()> {
    let request = bot
        .edit_message_text(chat_id, message_id, reply.text)
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
