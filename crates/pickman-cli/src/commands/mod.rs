pub mod pick;
pub mod version;
