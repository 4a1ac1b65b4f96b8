#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod import_service;
pub mod study_loop;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ImportError, StudyError};
pub use import_service::{ImportService, ImportedQuiz};
pub use study_loop::{StudyAnswerResult, StudyLoopService, StudySession};
