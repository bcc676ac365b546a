//! Outbound notifications

mod discord;

pub use self::discord::DiscordNotifier;
