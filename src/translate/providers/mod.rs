pub mod bulk;
pub mod cloud;
pub mod llm;
