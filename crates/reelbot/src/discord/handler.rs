use std::sync::Arc;

use reelcore::{AppError, JobQueue, Request, Requester};
use serenity::all::{
    ActionRow, ActionRowComponent, Command, CommandInteraction, ComponentInteraction, Context, CreateInteractionResponse,
    EventHandler, GatewayIntents, Interaction, ModalInteraction, Ready,
};
use serenity::async_trait;

use super::courier::DiscordCourier;
use super::panel::{
    self, ephemeral, ACCEPTED_REPLY, BUSY_REPLY, GUILD_ONLY_REPLY, INVALID_URL_REPLY, NO_PERMISSION_REPLY,
    PANEL_BUTTON_ID, PANEL_POSTED_REPLY, RESTARTING_REPLY, SETUP_COMMAND, URL_MODAL_ID,
};

/// Routes panel interactions into the job queue
pub struct Handler {
    queue: Arc<JobQueue>,
}

impl Handler {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self { queue }
    }

    /// Interactions arrive without privileged intents
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
    }

    async fn on_setup_panel(&self, ctx: &Context, command: &CommandInteraction) {
        if command.guild_id.is_none() {
            reply(command.create_response(&ctx.http, ephemeral(GUILD_ONLY_REPLY)).await);
            return;
        }

        let allowed = command
            .member
            .as_ref()
            .and_then(|m| m.permissions)
            .is_some_and(|p| p.manage_guild());
        if !allowed {
            log::warn!("⛔ {} tried /{} without Manage Server", command.user.name, SETUP_COMMAND);
            reply(command.create_response(&ctx.http, ephemeral(NO_PERMISSION_REPLY)).await);
            return;
        }

        match command.channel_id.send_message(&ctx.http, panel::panel_message()).await {
            Ok(_) => {
                log::info!("📋 Panel posted in channel {} by {}", command.channel_id, command.user.name);
                reply(command.create_response(&ctx.http, ephemeral(PANEL_POSTED_REPLY)).await);
            }
            Err(e) => {
                log::error!("❌ Failed to post panel in {}: {}", command.channel_id, e);
                let text = format!("❌ Could not post the panel here: {}", e);
                reply(command.create_response(&ctx.http, ephemeral(&text)).await);
            }
        }
    }

    async fn on_panel_button(&self, ctx: &Context, component: &ComponentInteraction) {
        let modal = CreateInteractionResponse::Modal(panel::url_modal());
        reply(component.create_response(&ctx.http, modal).await);
    }

    async fn on_url_submitted(&self, ctx: &Context, modal: &ModalInteraction) {
        let Some(url) = panel::submitted_url(modal_fields(&modal.data.components)) else {
            log::info!("🚫 {} submitted an invalid link", modal.user.name);
            reply(modal.create_response(&ctx.http, ephemeral(INVALID_URL_REPLY)).await);
            return;
        };

        let requester = Requester {
            id: modal.user.id.get(),
            name: modal.user.name.clone(),
        };
        let request = Request::new(url, requester);
        let courier = Arc::new(DiscordCourier::new(Arc::clone(&ctx.http)));

        let text = match self.queue.submit(request, courier) {
            Ok(position) => {
                log::debug!("📥 Queued, {} pending", position);
                ACCEPTED_REPLY
            }
            Err(AppError::QueueFull(pending)) => {
                log::warn!("⏳ Queue full ({} pending), turning away {}", pending, modal.user.name);
                BUSY_REPLY
            }
            Err(e) => {
                log::warn!("🔧 Submission refused: {}", e);
                RESTARTING_REPLY
            }
        };
        reply(modal.create_response(&ctx.http, ephemeral(text)).await);
    }
}

/// Flattens the input fields of a submitted modal
fn modal_fields(rows: &[ActionRow]) -> Vec<(&str, Option<&str>)> {
    rows.iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            ActionRowComponent::InputText(input) => Some((input.custom_id.as_str(), input.value.as_deref())),
            _ => None,
        })
        .collect()
}

fn reply(result: serenity::Result<()>) {
    if let Err(e) = result {
        log::warn!("⚠️ Failed to answer interaction: {}", e);
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        log::info!("🤖 Connected as {} ({} guilds)", ready.user.name, ready.guilds.len());

        match Command::create_global_command(&ctx.http, panel::setup_command()).await {
            Ok(cmd) => log::info!("✅ Registered /{} ({})", cmd.name, cmd.id),
            Err(e) => log::error!("❌ Failed to register /{}: {}", SETUP_COMMAND, e),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) if command.data.name == SETUP_COMMAND => {
                self.on_setup_panel(&ctx, &command).await;
            }
            Interaction::Component(component) if component.data.custom_id == PANEL_BUTTON_ID => {
                self.on_panel_button(&ctx, &component).await;
            }
            Interaction::Modal(modal) if modal.data.custom_id == URL_MODAL_ID => {
                self.on_url_submitted(&ctx, &modal).await;
            }
            _ => {}
        }
    }
}
