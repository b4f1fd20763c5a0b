pub mod codec;
pub mod grid;
pub mod tape;
pub mod puzzle;
pub mod machine;
