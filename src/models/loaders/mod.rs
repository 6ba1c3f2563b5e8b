pub mod bank_loader;

pub use bank_loader::{bank_path, list_banks, load_bank, save_bank};
