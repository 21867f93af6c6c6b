pub mod error;
pub mod openai;
pub mod traits;
pub mod util;

pub use error::AiError;
pub use openai::{OpenAi, StructuredOutput};
pub use traits::TextGenerator;
pub use util::{strip_code_blocks, truncate_chars};
