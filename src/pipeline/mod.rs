pub mod generation;
pub mod import;
pub mod assembly;
pub mod speaker_notes;
