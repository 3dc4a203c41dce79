//! UIコンポーネント

pub mod chat_panel;
pub mod header;
pub mod history_panel;
pub mod progress_bar;
pub mod results_panel;
pub mod toast_stack;
pub mod upload_area;
