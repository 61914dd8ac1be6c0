pub mod alice;
pub mod config;
pub mod connect;
pub mod context;
pub mod device;
pub mod discover;
pub mod gate;
pub mod menu;
pub mod reconnect;
pub mod sd_card;
