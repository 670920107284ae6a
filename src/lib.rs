pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use crate::services::{
    form_service::FormService, response_service::ResponseService, session_service::SessionService,
};
use crate::storage::{AnswerStore, FormStore, ResponseStore};

#[derive(Clone)]
pub struct AppState {
    pub form_service: FormService,
    pub session_service: SessionService,
    pub response_service: ResponseService,
}

impl AppState {
    /// Wire the services over any store that implements all three
    /// collaborator contracts: `PgStore` in production, `MemoryStore` in
    /// the test suites.
    pub fn new<S>(store: Arc<S>, session_token_length: usize) -> Self
    where
        S: FormStore + ResponseStore + AnswerStore + 'static,
    {
        let forms: Arc<dyn FormStore> = store.clone();
        let responses: Arc<dyn ResponseStore> = store.clone();
        let answers: Arc<dyn AnswerStore> = store;

        let form_service = FormService::new(forms.clone(), responses.clone());
        let session_service = SessionService::new(
            forms.clone(),
            responses.clone(),
            answers.clone(),
            session_token_length,
        );
        let response_service = ResponseService::new(forms, responses, answers);

        Self {
            form_service,
            session_service,
            response_service,
        }
    }
}
