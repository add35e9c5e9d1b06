pub mod frontmatter;
pub mod media;
pub mod sample;
pub mod slug;
pub mod storage;
pub mod types;
