pub mod draft_dto;
pub mod history_dto;
pub mod lenient;
pub mod match_dto;
pub mod update_dto;
