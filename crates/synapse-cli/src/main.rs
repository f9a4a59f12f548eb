mod command;
mod config;
mod render;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

use synapse_db::Database;
use synapse_store::{LocalAuthService, LocalChatStore};
use synapse_sync::{
    ChannelListController, ChannelListEvent, ChatController, ChatEvent, SessionController,
    SessionEvent, SyncClient,
};
use synapse_types::models::Channel;

use command::{Command, HELP};
use config::Config;

struct App {
    session: SessionController,
    channels: ChannelListController,
    chat: ChatController,
    own_id: watch::Sender<Option<String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging; stdout belongs to the chat
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "synapse=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;

    // Init database and the local backend
    let db = Arc::new(Database::open(&config.db_path)?);
    let store = Arc::new(LocalChatStore::new(db.clone()));
    let auth = Arc::new(LocalAuthService::open(db.clone())?);
    let client = SyncClient::new(store, auth, db, config.sync).await;
    info!("Synapse using {}", config.db_path.display());

    let (own_id, own_id_rx) = watch::channel(None);
    let app = App {
        session: client.session_controller(),
        channels: client.channel_list_controller(),
        chat: client.chat_controller(),
        own_id,
    };

    let mut session_events = app.session.take_events().context("session events taken")?;
    let mut channel_events = app.channels.take_events().context("channel events taken")?;
    let mut chat_events = app.chat.take_events().context("chat events taken")?;

    tokio::spawn(render::session(app.session.state()));
    tokio::spawn(render::channel_list(app.channels.state()));
    tokio::spawn(render::chat(app.chat.state(), own_id_rx));

    if !app.session.restore().await {
        println!("Enter the access code with /verify <code>  (/help for commands)");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(command) = Command::parse(&line) else { continue };
                if !app.handle(command).await {
                    break;
                }
            }
            Some(event) = session_events.recv() => match event {
                SessionEvent::NavigateToMain(session_id) => {
                    info!("session {} active", session_id);
                    app.channels.start().await;
                }
            },
            Some(event) = channel_events.recv() => match event {
                ChannelListEvent::NavigateToChat(channel) => app.open(&channel).await,
                ChannelListEvent::NavigateToVerification => {
                    app.chat.close();
                    println!("Signed out. Enter the access code with /verify <code>");
                }
                ChannelListEvent::Notice(text) => println!("! {}", text),
            },
            Some(event) = chat_events.recv() => {
                if event == ChatEvent::MessageSent(false) {
                    println!("! message not sent");
                }
            }
        }
    }

    info!("bye");
    Ok(())
}

impl App {
    /// Returns false when the user asked to quit.
    async fn handle(&self, command: Command) -> bool {
        match command {
            Command::Verify(code) => self.session.verify_code(&code).await,
            Command::Channels => {
                self.channels.refresh().await;
            }
            Command::Create { name, description } => {
                if let Some(id) = self.channels.create_channel(&name, description.as_deref()).await {
                    println!("created #{} ({})", name.trim(), id);
                }
            }
            Command::Join(target) => match self.find_channel(&target) {
                Some(channel) => self.channels.select_channel(channel),
                None => println!("! no channel '{}', see /channels", target),
            },
            Command::SignOut => match self.session.sign_out().await {
                // Re-checking the identity sends the list back to verification.
                Ok(()) => {
                    self.channels.refresh().await;
                }
                Err(e) => {
                    warn!("sign out failed: {}", e);
                    println!("! {}", e);
                }
            },
            Command::Say(text) => {
                if self.chat.current_channel_id().is_none() {
                    println!("! join a channel first, see /channels");
                } else {
                    self.chat.send_message(&text).await;
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Unknown(name) => println!("! unknown command /{}, try /help", name),
            Command::Quit => return false,
        }
        true
    }

    async fn open(&self, channel: &Channel) {
        println!("-- #{} --", channel.name);
        if let Some(description) = &channel.description {
            println!("   {}", description);
        }
        self.chat.load_messages(&channel.id).await;
        self.own_id.send_replace(self.chat.current_user_id());
    }

    /// By list position (1-based), then id, then name.
    fn find_channel(&self, target: &str) -> Option<Channel> {
        let state = self.channels.current_state();
        let channels = state.items();
        if let Ok(position) = target.parse::<usize>() {
            if let Some(channel) = position.checked_sub(1).and_then(|i| channels.get(i)) {
                return Some(channel.clone());
            }
        }
        let name = target.trim_start_matches('#');
        channels
            .iter()
            .find(|c| c.id == target)
            .or_else(|| channels.iter().find(|c| c.name == name))
            .cloned()
    }
}
