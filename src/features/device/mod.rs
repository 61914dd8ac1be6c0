pub mod hostname;
pub mod password;
pub mod reboot;
pub mod sound_device;
pub mod system;
