pub mod discord;

pub use discord::DiscordFeed;
