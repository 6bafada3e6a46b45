pub mod consent;
pub mod meetings;
pub mod recordings;
pub mod rooms;
pub mod transcripts;
