//! Panel, modal and reply builders, plus modal submission parsing.

use reelcore::core::utils::extract_url;
use serenity::all::{
    ButtonStyle, CreateActionRow, CreateButton, CreateCommand, CreateInputText, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, CreateModal, InputTextStyle, Permissions,
};
use url::Url;

pub const SETUP_COMMAND: &str = "setup_panel";
pub const PANEL_BUTTON_ID: &str = "reel_panel_open";
pub const URL_MODAL_ID: &str = "reel_url_modal";
pub const URL_INPUT_ID: &str = "reel_url_input";

const PANEL_TEXT: &str = "🎬 **Video downloader**\n\
    Press the button below and paste a TikTok, Instagram, X or YouTube Shorts link.\n\
    The video will be sent to you in a private message.";

pub const ACCEPTED_REPLY: &str = "✅ Got it! Your video will be sent to you privately.";
pub const INVALID_URL_REPLY: &str = "❌ That doesn't look like a video link. Paste a full http(s) URL.";
pub const BUSY_REPLY: &str = "⏳ The bot is busy right now. Try again in a few minutes.";
pub const RESTARTING_REPLY: &str = "🔧 The bot is restarting. Try again shortly.";
pub const NO_PERMISSION_REPLY: &str = "⛔ You need the Manage Server permission to post the panel.";
pub const GUILD_ONLY_REPLY: &str = "⛔ Use this command inside a server.";
pub const PANEL_POSTED_REPLY: &str = "✅ Panel posted.";

/// `/setup_panel`, hidden from members without Manage Server
pub fn setup_command() -> CreateCommand {
    CreateCommand::new(SETUP_COMMAND)
        .description("Post the video download panel in this channel")
        .default_member_permissions(Permissions::MANAGE_GUILD)
}

fn panel_components() -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![CreateButton::new(PANEL_BUTTON_ID)
        .label("Download video")
        .emoji('📥')
        .style(ButtonStyle::Primary)])]
}

/// The persistent panel message posted into a channel
pub fn panel_message() -> CreateMessage {
    CreateMessage::new().content(PANEL_TEXT).components(panel_components())
}

pub fn url_modal() -> CreateModal {
    let input = CreateInputText::new(InputTextStyle::Short, "Video link", URL_INPUT_ID)
        .placeholder("https://www.tiktok.com/@user/video/...")
        .min_length(8)
        .max_length(2000)
        .required(true);

    CreateModal::new(URL_MODAL_ID, "Download a video").components(vec![CreateActionRow::InputText(input)])
}

/// Reply only the invoking user can see
pub fn ephemeral(text: &str) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().content(text).ephemeral(true))
}

/// Picks the URL out of submitted `(custom_id, value)` pairs.
///
/// The value may contain surrounding text; the first http(s) link wins.
pub fn submitted_url<'a, I>(fields: I) -> Option<Url>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    fields
        .into_iter()
        .find(|(id, _)| *id == URL_INPUT_ID)
        .and_then(|(_, value)| value)
        .and_then(extract_url)
}
