pub mod credential_store;
pub mod ledger;
pub mod notifier;
pub mod question_bank;
pub mod question_generator;
pub mod scorer;
pub mod violation_detector;

pub use credential_store::CredentialStore;
pub use ledger::{FileLedger, Ledger};
pub use notifier::{Notifier, OutboxNotifier};
pub use question_bank::{BankBuildReport, QuestionBank};
pub use question_generator::{LlmQuestionGenerator, QuestionGenerator};
pub use violation_detector::{Verdict, ViolationDetector, ViolationState};
