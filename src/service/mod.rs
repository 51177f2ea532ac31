pub mod chat_service;
pub mod document_service;
pub mod history_service;
