pub mod archive;
pub mod draft_control;
pub mod history;
pub mod lan;
pub mod store;
pub mod websocket;
