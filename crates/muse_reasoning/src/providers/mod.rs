pub mod mock;
pub mod openai;

pub use mock::MockGenerator;
pub use openai::OpenAiGenerator;
