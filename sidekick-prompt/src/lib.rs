mod template;

pub use template::PromptTemplate;
