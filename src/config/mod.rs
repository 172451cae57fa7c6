//! Configuration module for Earshot.

mod settings;

pub use settings::{
    GeneralSettings, ImportSettings, IndexSettings, Settings, StoreSettings, TranscriptionSettings,
};
