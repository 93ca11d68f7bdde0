//! Application state module

mod app_state;
mod catalog;
mod dialog;
mod forms;
mod inventory;
mod notification;

pub use app_state::*;
pub use dialog::*;
pub use forms::*;
pub use inventory::*;
pub use notification::*;
