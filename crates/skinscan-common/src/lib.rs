pub mod ids;
pub mod model;
pub mod openai;
