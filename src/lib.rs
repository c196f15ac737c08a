pub mod args;
pub mod cleanup;
pub mod cover;
pub mod failed;
pub mod filename;
pub mod metadata;
pub mod processor;
pub mod prompt;
pub mod tagger;
pub mod transcoder;
