pub mod app;
pub mod play_panel;
pub mod settings;
pub mod settings_io;
pub mod setup_panel;
