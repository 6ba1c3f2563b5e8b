pub mod attempt;
pub mod loaders;
pub mod question;
pub mod record;

pub use attempt::{AttemptSeed, ExamAttempt, Stage};
pub use loaders::{bank_path, list_banks, load_bank, save_bank};
pub use question::{Question, QuestionTag, RawQuestion};
pub use record::{
    ApplicationRecord, ApplicationStatus, Credential, LedgerFile, RecordPatch, TestStatus,
};
