pub mod encrypt;
pub mod font;
pub mod inspect;
pub mod writer;
