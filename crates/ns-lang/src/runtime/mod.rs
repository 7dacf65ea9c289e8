pub mod value;
pub mod storage;
pub mod interpreter;
